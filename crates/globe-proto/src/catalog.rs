use std::path::Path;

use tracing::{info, warn};

use crate::model::Station;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to fetch catalog: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog is not a JSON array: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog server returned HTTP {0}")]
    Status(u16),
}

/// Parses a JSON array of station records.  Individual records that do not
/// deserialize are skipped with a warning; a document that is not an array
/// is an error.
pub fn parse_catalog(content: &str) -> Result<Vec<Station>, CatalogError> {
    let records: Vec<serde_json::Value> = serde_json::from_str(content)?;
    let total = records.len();
    let stations: Vec<Station> = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value::<Station>(record) {
            Ok(station) => Some(station),
            Err(e) => {
                warn!("skipping catalog record {}: {}", idx, e);
                None
            }
        })
        .collect();
    if stations.len() != total {
        info!("catalog: kept {} of {} records", stations.len(), total);
    }
    Ok(stations)
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Loads the catalog from an `http(s)://` URL or a local file path.
pub async fn load_catalog(source: &str) -> Result<Vec<Station>, CatalogError> {
    let stations = if is_remote(source) {
        fetch_catalog_url(source).await?
    } else {
        load_catalog_file(Path::new(source)).await?
    };
    info!("Loaded {} stations from {}", stations.len(), source);
    Ok(stations)
}

async fn fetch_catalog_url(url: &str) -> Result<Vec<Station>, CatalogError> {
    let response = reqwest::Client::new()
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(CatalogError::Status(response.status().as_u16()));
    }
    let text = response.text().await?;
    parse_catalog(&text)
}

async fn load_catalog_file(path: &Path) -> Result<Vec<Station>, CatalogError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_catalog(&content)
}
