use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::models::{ApiErrorBody, UnrestrictResponse};
use super::{AddedTorrent, DebridApi, DirectLink, MagnetLink, RemoteTorrent};
use crate::config::DebridConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};

pub struct RealDebridClient {
    client: Client,
    base_url: String,
    list_limit: u32,
    credentials: Arc<CredentialStore>,
}

impl RealDebridClient {
    pub fn new(config: &DebridConfig, credentials: Arc<CredentialStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("rdjd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            list_limit: config.list_limit,
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer token, failing early when none is stored.
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.credentials.get().ok_or(Error::Unauthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        Ok(self.authorize(request)?.send().await?)
    }
}

/// Read the body and fail on a non-2xx status or an in-band `error` field.
async fn read_json(response: Response) -> Result<Option<Value>> {
    let status = response.status();
    let body = response.text().await?;

    if body.trim().is_empty() {
        if status.is_success() {
            return Ok(None);
        }
        return Err(remote_error(status, None));
    }

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) if status.is_success() => return Err(Error::Decode(e.to_string())),
        Err(_) => {
            return Err(Error::Remote {
                code: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
    };

    let in_band = value.as_object().is_some_and(|obj| {
        ["error", "error_code"]
            .iter()
            .any(|key| obj.get(*key).is_some_and(|v| !v.is_null()))
    });

    if !status.is_success() || in_band {
        return Err(remote_error(status, Some(error_body(&value))));
    }

    Ok(Some(value))
}

/// Typed view of an error payload. Fields of an unexpected shape are kept as
/// their raw JSON text so the remote message is never dropped.
fn error_body(value: &Value) -> ApiErrorBody {
    if let Ok(body) = serde_json::from_value::<ApiErrorBody>(value.clone()) {
        return body;
    }

    let raw = |key: &str| {
        value.get(key).filter(|v| !v.is_null()).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    };

    let error_code = value.get("error_code").and_then(Value::as_i64);
    let error = match (raw("error"), raw("error_code")) {
        (Some(error), Some(code)) if error_code.is_none() => {
            Some(format!("{} (error_code {})", error, code))
        }
        (Some(error), _) => Some(error),
        (None, Some(code)) if error_code.is_none() => Some(format!("error_code {}", code)),
        (None, _) => None,
    };

    ApiErrorBody { error, error_code }
}

fn remote_error(status: StatusCode, body: Option<ApiErrorBody>) -> Error {
    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let message = match body {
        Some(ApiErrorBody {
            error: Some(error),
            error_code: Some(code),
        }) => format!("{} (error_code {})", error, code),
        Some(ApiErrorBody {
            error: Some(error), ..
        }) => error,
        Some(ApiErrorBody {
            error_code: Some(code),
            ..
        }) => format!("{} (error_code {})", reason, code),
        _ => format!("HTTP Error: {} {}", status.as_u16(), reason),
    };

    Error::Remote {
        code: status.as_u16(),
        message,
    }
}

fn decode<T: DeserializeOwned>(value: Option<Value>) -> Result<T> {
    let value = value.ok_or_else(|| Error::Decode("empty response body".to_string()))?;
    serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
}

#[async_trait]
impl DebridApi for RealDebridClient {
    async fn add_magnet(&self, magnet: &MagnetLink) -> Result<AddedTorrent> {
        let request = self
            .client
            .post(self.url("/torrents/addMagnet"))
            .form(&[("magnet", magnet.as_str())]);

        let added: AddedTorrent = decode(read_json(self.send(request).await?).await?)?;
        debug!(torrent_id = %added.id, "Magnet added");
        Ok(added)
    }

    async fn select_all_files(&self, id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/torrents/selectFiles/{}", id)))
            .form(&[("files", "all")]);

        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            debug!(torrent_id = %id, "Files selected (204)");
            return Ok(());
        }

        read_json(response).await?;
        debug!(torrent_id = %id, "Files selected");
        Ok(())
    }

    async fn get_info(&self, id: &str) -> Result<RemoteTorrent> {
        let request = self
            .client
            .get(self.url(&format!("/torrents/info/{}", id)));

        decode(read_json(self.send(request).await?).await?)
    }

    async fn unrestrict(&self, link: &str) -> Result<DirectLink> {
        let request = self
            .client
            .post(self.url("/unrestrict/link"))
            .form(&[("link", link)]);

        let response: UnrestrictResponse = decode(read_json(self.send(request).await?).await?)?;
        let url = response
            .download
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::Decode("unrestrict response has no download URL".to_string()))?;

        Ok(DirectLink {
            url,
            filename: response.filename,
            filesize: response.filesize,
        })
    }

    async fn list_torrents(&self) -> Result<Vec<RemoteTorrent>> {
        let request = self
            .client
            .get(self.url("/torrents"))
            .query(&[("limit", self.list_limit)]);

        let value = match read_json(self.send(request).await?).await? {
            Some(value) => value,
            None => return Ok(Vec::new()),
        };

        // An invalid token occasionally comes back as an array holding one error object.
        if let Some(message) = value
            .as_array()
            .and_then(|items| items.first())
            .and_then(|first| first.get("error"))
            .and_then(Value::as_str)
        {
            return Err(Error::Remote {
                code: StatusCode::OK.as_u16(),
                message: message.to_string(),
            });
        }

        decode(Some(value))
    }
}
