//! Catalogue import from a remote JSON document
//!
//! Expected shape: `{ "images": [ { "id": "...", "url": "https://..." } ] }`.
//! Images whose URL is already an active candidate are skipped.

use anyhow::{Context, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::candidates;

const USER_AGENT: &str = concat!("catmash/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogueImage {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Catalogue {
    pub images: Vec<CatalogueImage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub fetched: usize,
    pub created: usize,
    pub skipped: usize,
}

/// Fetch the catalogue at `url` and import it
pub async fn import_from_url(db: &SqlitePool, url: &str) -> Result<ImportSummary> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    let catalogue: Catalogue = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch catalogue from {}", url))?
        .error_for_status()
        .with_context(|| format!("Catalogue server rejected {}", url))?
        .json()
        .await
        .context("Catalogue is not valid JSON")?;

    import_images(db, &catalogue.images).await
}

/// Create a candidate for every image not already present
///
/// Invalid URLs are counted as skipped rather than failing the batch.
pub async fn import_images(db: &SqlitePool, images: &[CatalogueImage]) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        fetched: images.len(),
        ..Default::default()
    };

    for image in images {
        if candidates::find_by_image_ref(db, &image.url).await?.is_some() {
            summary.skipped += 1;
            continue;
        }

        match candidates::create(db, &image.url).await {
            Ok(_) => summary.created += 1,
            Err(e @ catmash_common::Error::InvalidInput(_)) => {
                warn!(id = ?image.id, "Skipping catalogue image: {}", e);
                summary.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        fetched = summary.fetched,
        created = summary.created,
        skipped = summary.skipped,
        "Catalogue import finished"
    );
    Ok(summary)
}
