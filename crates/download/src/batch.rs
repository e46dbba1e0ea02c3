//! Batch orchestration.
//!
//! Items are downloaded strictly one after another with a fixed pause in
//! between, so large images are never decoded concurrently and the remote end
//! sees a steady trickle of requests. A failing item is logged, recorded in
//! the [`BatchReport`] and skipped; only an empty batch fails the whole call.

use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};

use {
    serde::Serialize,
    tracing::{debug, info, warn},
};

use folio_config::{FolioConfig, schema::DEFAULT_DELAY_MS};

use crate::{
    error::{Error, Result},
    fetch::{Fetcher, HttpFetcher},
    filename::{item_filename, sanitize},
    item::{DownloadItem, ItemDownloader},
    sink::DirectorySink,
};

/// Emitted once per attempted item, success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// 1-based count of items attempted so far.
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedItem {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedItem {
    pub id: String,
    pub filename: String,
    pub error: String,
}

/// Outcome of a finished batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub collection: String,
    pub succeeded: Vec<SavedItem>,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.succeeded.is_empty() && !self.failed.is_empty()
    }
}

/// In-flight state of one `download_all` call.
struct BatchRun<'a> {
    collection: String,
    items: &'a [DownloadItem],
    completed: usize,
}

impl<'a> BatchRun<'a> {
    fn start(collection: &str, items: &'a [DownloadItem]) -> Self {
        Self {
            collection: sanitize(collection),
            items,
            completed: 0,
        }
    }

    fn filename(&self, index: usize) -> String {
        item_filename(&self.collection, index, &self.items[index].name)
    }

    fn advance(&mut self) -> Progress {
        self.completed += 1;
        Progress {
            current: self.completed,
            total: self.items.len(),
        }
    }
}

/// Downloads whole collections through an [`ItemDownloader`].
#[derive(Clone)]
pub struct BatchDownloader {
    item: ItemDownloader,
    delay: Duration,
}

impl BatchDownloader {
    #[must_use]
    pub fn new(item: ItemDownloader) -> Self {
        Self {
            item,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
        }
    }

    /// Pause between consecutive items. Zero disables pacing.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// HTTP fetcher and directory sink wired from config.
    pub fn from_config(config: &FolioConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(&config.download)?;
        Ok(Self::from_config_with_fetcher(config, Arc::new(fetcher)))
    }

    /// Like [`Self::from_config`] but reuses a fetcher the caller already
    /// built, e.g. the one whose client resolved the manifest's assets.
    #[must_use]
    pub fn from_config_with_fetcher(config: &FolioConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let sink = DirectorySink::new(config.output.dir.clone());
        let item = ItemDownloader::new(fetcher, Arc::new(sink))
            .with_jpeg_quality(config.download.jpeg_quality);
        Self::new(item).with_delay(config.download.delay())
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Download every item of `collection` in order.
    ///
    /// Files are named `{collection}_{n}_{name}.jpg` with both parts
    /// sanitized and `n` 1-based. `on_progress` is called after every item,
    /// including failed ones. Returns [`Error::EmptyBatch`] without touching
    /// anything when `items` is empty; otherwise always returns a report.
    pub async fn download_all(
        &self,
        items: &[DownloadItem],
        collection: &str,
        mut on_progress: Option<&mut (dyn FnMut(Progress) + Send)>,
    ) -> Result<BatchReport> {
        if items.is_empty() {
            return Err(Error::EmptyBatch);
        }
        warn_on_duplicate_ids(items);

        let mut run = BatchRun::start(collection, items);
        let mut report = BatchReport {
            collection: run.collection.clone(),
            ..BatchReport::default()
        };
        info!(collection = %run.collection, total = items.len(), "batch download started");

        for (index, item) in items.iter().enumerate() {
            let filename = run.filename(index);
            match self.item.download_one(item.asset.as_ref(), &filename).await {
                Ok(path) => {
                    debug!(id = %item.id, %filename, "item saved");
                    report.succeeded.push(SavedItem {
                        id: item.id.clone(),
                        filename,
                        path,
                    });
                },
                Err(e) => {
                    warn!(id = %item.id, %filename, error = %e, "item download failed, continuing");
                    report.failed.push(FailedItem {
                        id: item.id.clone(),
                        filename,
                        error: e.to_string(),
                    });
                },
            }

            let progress = run.advance();
            if let Some(report_progress) = on_progress.as_deref_mut() {
                report_progress(progress);
            }

            if index + 1 < items.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            collection = %report.collection,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch download finished"
        );
        Ok(report)
    }
}

fn warn_on_duplicate_ids(items: &[DownloadItem]) {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id.as_str()) {
            warn!(id = %item.id, "duplicate item id in batch");
        }
    }
}
