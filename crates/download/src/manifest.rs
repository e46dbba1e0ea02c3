//! JSON manifests describing a batch.
//!
//! Either an object with an optional collection name:
//!
//! ```json
//! { "collection": "Smith Wedding", "items": [{ "id": "p1", "name": "Vows", "url": "https://..." }] }
//! ```
//!
//! or a bare array of items. Missing ids default to the 1-based position.

use std::path::Path;

use serde::Deserialize;

use crate::{
    asset::asset_from_url,
    error::{Context, Result},
    item::DownloadItem,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub collection: Option<String>,
    pub items: Vec<ManifestItem>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Full(Manifest),
    Items(Vec<ManifestItem>),
}

impl Manifest {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(match serde_json::from_str::<ManifestFile>(raw)? {
            ManifestFile::Full(manifest) => manifest,
            ManifestFile::Items(items) => Self {
                collection: None,
                items,
            },
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Resolve every entry to a [`DownloadItem`], in manifest order.
    pub fn into_items(self, client: &reqwest::Client) -> Result<Vec<DownloadItem>> {
        self.items
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let asset = asset_from_url(&entry.url, client)?;
                let id = entry.id.unwrap_or_else(|| (index + 1).to_string());
                Ok(DownloadItem::new(id, entry.name, asset))
            })
            .collect()
    }
}
