use std::{
    ffi::OsStr,
    io::Write,
    path::{Path, PathBuf},
};

use {async_trait::async_trait, tracing::debug};

use crate::error::{Error, Result};

/// Destination for normalized media.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Persist `data` under `filename` and return where it ended up.
    async fn save(&self, filename: &str, data: Vec<u8>) -> Result<PathBuf>;
}

/// Writes files into a single directory.
///
/// Each save goes to a hidden temporary file next to the target and is renamed
/// into place once fully written. A temporary file that never gets renamed is
/// removed when it goes out of scope, whatever path the save took.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn save_error(filename: &str, source: folio_common::Error) -> Error {
    Error::Save {
        filename: filename.to_string(),
        source,
    }
}

#[async_trait]
impl MediaSink for DirectorySink {
    async fn save(&self, filename: &str, data: Vec<u8>) -> Result<PathBuf> {
        if filename.is_empty() || Path::new(filename).file_name() != Some(OsStr::new(filename)) {
            return Err(save_error(
                filename,
                folio_common::Error::message("filename must not contain path components"),
            ));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| save_error(filename, folio_common::Error::io_at(&self.dir, e)))?;

        let dir = self.dir.clone();
        let target = self.dir.join(filename);
        let len = data.len();
        let written = tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &data))
            .await
            .map_err(|e| {
                save_error(filename, folio_common::Error::message(format!("save task failed: {e}")))
            })?
            .map_err(|e| save_error(filename, e))?;

        debug!(path = %written.display(), bytes = len, "saved");
        Ok(written)
    }
}

fn write_atomically(dir: &Path, target: &Path, data: &[u8]) -> folio_common::Result<PathBuf> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".folio-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| folio_common::Error::io_at(dir, e))?;
    tmp.write_all(data)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| folio_common::Error::io_at(tmp.path(), e))?;
    tmp.persist(target)
        .map_err(|e| folio_common::Error::io_at(target, e.error))?;
    Ok(target.to_path_buf())
}
