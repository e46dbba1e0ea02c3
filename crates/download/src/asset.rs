//! Remote asset handles.
//!
//! A [`RemoteAsset`] is an opaque reference to content held somewhere else.
//! It can always name a fetchable URL without doing any I/O, and it can pull
//! its raw bytes on demand.

use std::{fmt, path::PathBuf, sync::Arc};

use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD},
    url::Url,
};

use crate::error::{Error, Result};

#[async_trait]
pub trait RemoteAsset: Send + Sync + fmt::Debug {
    /// A URL the content can be fetched from. Never fails, never blocks.
    fn url(&self) -> String;

    /// Retrieve the raw content.
    async fn bytes(&self) -> Result<Vec<u8>>;
}

/// Object reachable over HTTP(S).
#[derive(Clone)]
pub struct HttpAsset {
    url: Url,
    client: reqwest::Client,
}

impl HttpAsset {
    #[must_use]
    pub fn new(url: Url, client: reqwest::Client) -> Self {
        Self { url, client }
    }
}

impl fmt::Debug for HttpAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAsset")
            .field("url", &self.url.as_str())
            .finish()
    }
}

#[async_trait]
impl RemoteAsset for HttpAsset {
    fn url(&self) -> String {
        self.url.to_string()
    }

    async fn bytes(&self) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::retrieval(self.url.as_str(), e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::retrieval(self.url.as_str(), format!("HTTP {status}")));
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::retrieval(self.url.as_str(), e))?;
        Ok(body.to_vec())
    }
}

/// Content already held in memory.
#[derive(Clone)]
pub struct InlineAsset {
    data: Arc<[u8]>,
    mime: String,
}

impl InlineAsset {
    #[must_use]
    pub fn new(data: impl Into<Arc<[u8]>>, mime: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime: mime.into(),
        }
    }

    /// Parse a `data:` URL. Only base64 payloads are decoded; anything else
    /// is taken verbatim.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let (mime, data) = decode_data_url(url)?;
        Ok(Self::new(data, mime))
    }
}

impl fmt::Debug for InlineAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineAsset")
            .field("mime", &self.mime)
            .field("len", &self.data.len())
            .finish()
    }
}

#[async_trait]
impl RemoteAsset for InlineAsset {
    fn url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.data))
    }

    async fn bytes(&self) -> Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}

/// File on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileAsset {
    path: PathBuf,
}

impl FileAsset {
    /// Relative paths are resolved against the working directory now, so
    /// `url()` stays valid even if the process later changes directory.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = std::path::absolute(&path).unwrap_or(path);
        Self { path }
    }
}

#[async_trait]
impl RemoteAsset for FileAsset {
    fn url(&self) -> String {
        Url::from_file_path(&self.path)
            .map(String::from)
            .unwrap_or_else(|()| format!("file://{}", self.path.display()))
    }

    async fn bytes(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|e| Error::retrieval(self.url(), e))
    }
}

/// Build the matching asset handle for a `http(s)`, `file` or `data` URL.
/// A string without a scheme is treated as a local path.
pub fn asset_from_url(raw: &str, client: &reqwest::Client) -> Result<Arc<dyn RemoteAsset>> {
    if raw.starts_with("data:") {
        return Ok(Arc::new(InlineAsset::from_data_url(raw)?));
    }
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Ok(Arc::new(FileAsset::new(raw)));
        },
        Err(e) => return Err(Error::retrieval(raw, e)),
    };
    match url.scheme() {
        "http" | "https" => Ok(Arc::new(HttpAsset::new(url, client.clone()))),
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| Error::retrieval(raw, "not a local file path"))?;
            Ok(Arc::new(FileAsset::new(path)))
        },
        other => Err(Error::retrieval(raw, format!("unsupported scheme: {other}"))),
    }
}

/// Split a `data:[<mime>][;base64],<payload>` URL into MIME type and bytes.
/// Payloads without `;base64` are percent-decoded (RFC 2397).
pub(crate) fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::retrieval(url, "not a data URL"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::retrieval(truncate(url), "data URL has no payload separator"))?;

    let (mime, is_base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    let mime = if mime.is_empty() {
        "text/plain".to_string()
    } else {
        mime.to_string()
    };

    let data = if is_base64 {
        STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::retrieval(truncate(url), e))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };
    Ok((mime, data))
}

/// Data URLs can be megabytes long; keep error messages readable.
fn truncate(url: &str) -> String {
    match url.char_indices().nth(48) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_asset_round_trips_through_data_url() {
        let asset = InlineAsset::new(vec![1u8, 2, 3, 250], "image/png");
        let url = asset.url();
        assert_eq!(url, "data:image/png;base64,AQID+g==");

        let parsed = InlineAsset::from_data_url(&url).unwrap();
        assert_eq!(parsed.bytes().await.unwrap(), vec![1, 2, 3, 250]);
        assert_eq!(parsed.mime, "image/png");
    }

    #[test]
    fn data_url_without_base64_is_percent_decoded() {
        let (mime, data) = decode_data_url("data:,hello").unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(data, b"hello");

        let (mime, data) = decode_data_url("data:image/svg+xml,%3Csvg%20%2F%3E%FF").unwrap();
        assert_eq!(mime, "image/svg+xml");
        assert_eq!(data, b"<svg />\xFF");
    }

    #[test]
    fn malformed_data_urls_are_retrieval_errors() {
        assert!(matches!(
            decode_data_url("data:image/png;base64"),
            Err(Error::Retrieval { .. })
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,@@@"),
            Err(Error::Retrieval { .. })
        ));
    }

    #[tokio::test]
    async fn file_asset_reads_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.bin");
        std::fs::write(&path, b"frame").unwrap();

        let asset = FileAsset::new(&path);
        assert!(asset.url().starts_with("file://"));
        assert_eq!(asset.bytes().await.unwrap(), b"frame");

        let missing = FileAsset::new(dir.path().join("nope.bin"));
        assert!(matches!(
            missing.bytes().await,
            Err(Error::Retrieval { .. })
        ));
    }

    #[tokio::test]
    async fn http_asset_fetches_bytes() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/a.png")
            .with_status(200)
            .with_body(b"pixels")
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/gone.png")
            .with_status(410)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let asset = asset_from_url(&format!("{}/a.png", server.url()), &client).unwrap();
        assert_eq!(asset.bytes().await.unwrap(), b"pixels");
        ok.assert_async().await;

        let gone = asset_from_url(&format!("{}/gone.png", server.url()), &client).unwrap();
        let err = gone.bytes().await.unwrap_err();
        assert!(err.to_string().contains("410"), "{err}");
    }

    #[test]
    fn asset_from_url_dispatches_on_scheme() {
        let client = reqwest::Client::new();
        let http = asset_from_url("https://cdn.example/x.jpg", &client).unwrap();
        assert_eq!(http.url(), "https://cdn.example/x.jpg");

        let inline = asset_from_url("data:image/gif;base64,R0lG", &client).unwrap();
        assert!(inline.url().starts_with("data:image/gif;base64,"));

        let relative = asset_from_url("shots/x.png", &client).unwrap();
        assert!(relative.url().contains("shots/x.png"));

        assert!(asset_from_url("ftp://host/x", &client).is_err());
    }
}
