use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Read product identifiers, one per line. Blank lines and repeats are
/// dropped with a warning; order of first appearance is kept.
pub fn load_product_ids(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read product list {}", path.display()))?;
    Ok(parse_product_ids(&text))
}

/// Identifiers become a URL path segment and a file name, so only ASCII
/// letters, digits, `-` and `_` are accepted.
pub fn check_product_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("product identifier is empty".into());
    }
    match id.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_')) {
        Some(c) => Err(format!("product identifier {:?} contains {:?}", id, c)),
        None => Ok(()),
    }
}

pub fn parse_product_ids(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let id = line.trim();
        if id.is_empty() {
            warn!("Product list line {} is blank, skipping", n + 1);
            continue;
        }
        if let Err(reason) = check_product_id(id) {
            warn!("Product list line {}: {}, skipping", n + 1, reason);
            continue;
        }
        if !seen.insert(id.to_string()) {
            warn!("Product {} listed again on line {}, skipping", id, n + 1);
            continue;
        }
        ids.push(id.to_string());
    }
    ids
}
