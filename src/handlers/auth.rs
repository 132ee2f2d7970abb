use crate::cli::AuthAction;
use anyhow::Result;
use console::{Term, style};
use dialoguer::{Confirm, Password};
use rdjd::CredentialStore;
use rdjd::credentials::mask_token;

pub async fn handle_auth(credentials: &CredentialStore, action: AuthAction) -> Result<()> {
    let term = Term::stdout();

    match action {
        AuthAction::Set { token } => {
            let token = match token {
                Some(token) => token,
                None => Password::new()
                    .with_prompt("Real-Debrid API token")
                    .interact()?,
            };

            credentials.set(&token)?;
            term.write_line(&format!(
                "{} API token saved to {}",
                style("✅").green(),
                credentials.path().display()
            ))?;
        }

        AuthAction::Show => match credentials.get() {
            Some(token) => {
                term.write_line(&format!(
                    "{} API token: {}",
                    style("🔑").cyan(),
                    style(mask_token(&token)).bold()
                ))?;
                if std::env::var_os("RDJD_TOKEN").is_some() {
                    term.write_line(&format!(
                        "{} Using RDJD_TOKEN from the environment",
                        style("💡").yellow()
                    ))?;
                }
            }
            None => {
                term.write_line(&format!("{} No API token configured", style("❌").red()))?;
                term.write_line(&format!(
                    "{} Get one at https://real-debrid.com/apitoken and run 'rdjd auth set'",
                    style("💡").yellow()
                ))?;
            }
        },

        AuthAction::Clear { yes } => {
            if !credentials.is_set() {
                term.write_line(&format!("{} No API token to clear", style("ℹ️").blue()))?;
                return Ok(());
            }

            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Remove the stored API token?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    term.write_line(&format!("{} Operation cancelled", style("❌").red()))?;
                    return Ok(());
                }
            }

            credentials.clear()?;
            term.write_line(&format!("{} API token removed", style("🗑️").green()))?;
        }
    }
    Ok(())
}
