use scraper::{Html, Selector};
use std::collections::HashSet;

use crate::debrid::MagnetLink;
use crate::error::{Error, Result};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(e.to_string()))
}

/// Magnet of the first plain (`tr.default`) row in a search results table.
/// Trusted (`success`) and remake (`danger`) rows are never picked.
pub fn first_result_magnet(html: &str) -> Result<Option<MagnetLink>> {
    let document = Html::parse_document(html);
    let row_selector = selector("table tbody tr.default")?;
    let magnet_selector = selector(r#"td a[href^="magnet:"]"#)?;

    let Some(row) = document.select(&row_selector).next() else {
        return Ok(None);
    };

    Ok(row
        .select(&magnet_selector)
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| MagnetLink::parse(href).ok()))
}

/// Every distinct `magnet:?` anchor on a page, in document order.
pub fn extract_magnet_links(html: &str) -> Result<Vec<MagnetLink>> {
    let document = Html::parse_document(html);
    let anchor_selector = selector("a[href]")?;

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for href in document
        .select(&anchor_selector)
        .filter_map(|a| a.value().attr("href"))
    {
        if let Ok(magnet) = MagnetLink::parse(href) {
            if seen.insert(magnet.as_str().to_string()) {
                links.push(magnet);
            }
        }
    }

    Ok(links)
}
