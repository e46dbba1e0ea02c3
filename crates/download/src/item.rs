//! Single-item pipeline: resolve, fetch, normalize, save.

use std::{fmt, path::PathBuf, sync::Arc};

use tracing::debug;

use folio_media::normalize::{JPEG_QUALITY, normalize_with_quality};

use crate::{
    asset::RemoteAsset,
    error::{Error, Result, Stage},
    fetch::Fetcher,
    filename::force_jpg_extension,
    sink::MediaSink,
};

/// One entry of a batch.
#[derive(Clone)]
pub struct DownloadItem {
    /// Unique within a batch.
    pub id: String,
    /// Human label; sanitized before it becomes part of a filename.
    pub name: String,
    pub asset: Arc<dyn RemoteAsset>,
}

impl DownloadItem {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, asset: Arc<dyn RemoteAsset>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            asset,
        }
    }
}

impl fmt::Debug for DownloadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("asset", &self.asset)
            .finish()
    }
}

/// Downloads one asset to one JPEG file. Never retries.
#[derive(Clone)]
pub struct ItemDownloader {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn MediaSink>,
    jpeg_quality: u8,
}

impl ItemDownloader {
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, sink: Arc<dyn MediaSink>) -> Self {
        Self {
            fetcher,
            sink,
            jpeg_quality: JPEG_QUALITY,
        }
    }

    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Fetch `asset`, normalize it to JPEG and save it as `filename` with its
    /// extension forced to `.jpg`. Any failure comes back as
    /// [`Error::Download`] naming the stage that failed.
    pub async fn download_one(&self, asset: &dyn RemoteAsset, filename: &str) -> Result<PathBuf> {
        let filename = force_jpg_extension(filename);
        let url = asset.url();

        debug!(%filename, stage = %Stage::Fetching, "item stage");
        let fetched = self
            .fetcher
            .fetch(&url)
            .await
            .map_err(|e| wrap(&filename, Stage::Fetching, e))?;
        let mime = fetched.mime().to_string();

        debug!(%filename, stage = %Stage::Normalizing, %mime, bytes = fetched.data.len(), "item stage");
        let quality = self.jpeg_quality;
        let normalized =
            tokio::task::spawn_blocking(move || normalize_with_quality(fetched.data, &mime, quality))
                .await
                .map_err(|e| {
                    wrap(
                        &filename,
                        Stage::Normalizing,
                        Error::message(format!("normalize task failed: {e}")),
                    )
                })?
                .map_err(|e| wrap(&filename, Stage::Normalizing, Error::Decode(e)))?;

        debug!(%filename, stage = %Stage::Saving, transcoded = normalized.transcoded, "item stage");
        self.sink
            .save(&filename, normalized.data)
            .await
            .map_err(|e| wrap(&filename, Stage::Saving, e))
    }
}

fn wrap(filename: &str, stage: Stage, source: Error) -> Error {
    Error::Download {
        filename: filename.to_string(),
        stage,
        source: Box::new(source),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use std::{collections::HashMap, io::Cursor, sync::Mutex};

    use {
        super::*,
        crate::{asset::InlineAsset, fetch::Fetched},
        async_trait::async_trait,
        image::{DynamicImage, ImageFormat, Rgb, RgbImage},
    };

    pub(crate) fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    /// Serves canned responses keyed by URL; unknown URLs 404.
    #[derive(Default)]
    pub(crate) struct StubFetcher {
        pub responses: HashMap<String, Fetched>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub(crate) fn with(mut self, url: &str, data: Vec<u8>, mime: &str) -> Self {
            self.responses.insert(url.to_string(), Fetched {
                data,
                content_type: Some(mime.to_string()),
            });
            self
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Fetched> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses.get(url).cloned().ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                status: Some(404),
                reason: "HTTP 404 Not Found".into(),
            })
        }
    }

    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl MemorySink {
        pub(crate) fn names(&self) -> Vec<String> {
            self.saved
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MediaSink for MemorySink {
        async fn save(&self, filename: &str, data: Vec<u8>) -> Result<PathBuf> {
            self.saved
                .lock()
                .unwrap()
                .push((filename.to_string(), data));
            Ok(PathBuf::from(filename))
        }
    }

    #[derive(Debug)]
    pub(crate) struct UrlAsset(pub String);

    #[async_trait]
    impl RemoteAsset for UrlAsset {
        fn url(&self) -> String {
            self.0.clone()
        }

        async fn bytes(&self) -> Result<Vec<u8>> {
            Err(Error::retrieval(&self.0, "stub"))
        }
    }

    #[tokio::test]
    async fn jpeg_is_saved_verbatim_with_forced_extension() {
        let fetcher = Arc::new(StubFetcher::default().with("u://1", b"jpegish".to_vec(), "image/jpeg"));
        let sink = Arc::new(MemorySink::default());
        let dl = ItemDownloader::new(fetcher, sink.clone());

        let path = dl.download_one(&UrlAsset("u://1".into()), "shot.png").await.unwrap();
        assert_eq!(path, PathBuf::from("shot.jpg"));
        let saved = sink.saved.lock().unwrap();
        assert_eq!(saved[0], ("shot.jpg".to_string(), b"jpegish".to_vec()));
    }

    #[tokio::test]
    async fn png_is_transcoded_before_saving() {
        let fetcher = Arc::new(StubFetcher::default().with("u://p", png_bytes(), "image/png"));
        let sink = Arc::new(MemorySink::default());
        let dl = ItemDownloader::new(fetcher, sink.clone());

        dl.download_one(&UrlAsset("u://p".into()), "p.jpg").await.unwrap();
        let saved = sink.saved.lock().unwrap();
        assert_eq!(image::guess_format(&saved[0].1).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn inline_asset_goes_through_its_data_url() {
        let fetcher = Arc::new(crate::fetch::HttpFetcher::default());
        let sink = Arc::new(MemorySink::default());
        let dl = ItemDownloader::new(fetcher, sink.clone());

        let asset = InlineAsset::new(png_bytes(), "image/png");
        dl.download_one(&asset, "inline").await.unwrap();
        assert_eq!(sink.names(), vec!["inline.jpg"]);
    }

    #[tokio::test]
    async fn fetch_failure_is_wrapped_with_stage() {
        let dl = ItemDownloader::new(
            Arc::new(StubFetcher::default()),
            Arc::new(MemorySink::default()),
        );
        let err = dl
            .download_one(&UrlAsset("u://missing".into()), "m.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Download {
            stage: Stage::Fetching,
            ..
        }));
        assert!(matches!(err.root(), Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn undecodable_payload_never_reaches_sink() {
        let fetcher = Arc::new(StubFetcher::default().with("u://bad", b"garbage".to_vec(), "image/png"));
        let sink = Arc::new(MemorySink::default());
        let dl = ItemDownloader::new(fetcher, sink.clone());

        let err = dl
            .download_one(&UrlAsset("u://bad".into()), "bad.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Download {
            stage: Stage::Normalizing,
            ..
        }));
        assert!(matches!(err.root(), Error::Decode(_)));
        assert!(sink.names().is_empty());
    }

    #[tokio::test]
    async fn relative_path_item_is_fetched_through_its_file_url() {
        let dir = tempfile::tempdir_in(".").unwrap();
        std::fs::write(dir.path().join("frame.png"), png_bytes()).unwrap();
        let relative = dir.path().strip_prefix(".").unwrap().join("frame.png");
        assert!(relative.is_relative());

        let asset = crate::asset::asset_from_url(relative.to_str().unwrap(), &reqwest::Client::new())
            .unwrap();
        assert!(asset.url().starts_with("file:///"), "{}", asset.url());

        let sink = Arc::new(MemorySink::default());
        let dl = ItemDownloader::new(Arc::new(crate::fetch::HttpFetcher::default()), sink.clone());
        dl.download_one(asset.as_ref(), "Event_1_frame").await.unwrap();

        let saved = sink.saved.lock().unwrap();
        assert_eq!(saved[0].0, "Event_1_frame.jpg");
        assert_eq!(image::guess_format(&saved[0].1).unwrap(), ImageFormat::Jpeg);
    }
}
