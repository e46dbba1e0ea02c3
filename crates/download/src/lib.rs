//! Batch media download: resolve remote assets, normalize them to JPEG, and
//! save them one at a time with progress reporting.
//!
//! The pipeline is split along three injected seams so callers (and tests)
//! can swap any stage:
//!
//! - [`RemoteAsset`]: where the content lives (`url()` / `bytes()`)
//! - [`Fetcher`]: how a URL turns into bytes plus a declared MIME type
//! - [`MediaSink`]: where normalized files end up

pub mod asset;
pub mod batch;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod item;
pub mod manifest;
pub mod sink;

pub use {
    asset::{FileAsset, HttpAsset, InlineAsset, RemoteAsset, asset_from_url},
    batch::{BatchDownloader, BatchReport, FailedItem, Progress, SavedItem},
    error::{Error, Result, Stage},
    fetch::{Fetched, Fetcher, HttpFetcher},
    filename::{force_jpg_extension, item_filename, sanitize},
    item::{DownloadItem, ItemDownloader},
    manifest::{Manifest, ManifestItem},
    sink::{DirectorySink, MediaSink},
};
