use std::time::Duration;

use {async_trait::async_trait, tracing::debug, url::Url};

use {
    folio_config::DownloadConfig,
    folio_media::mime::sniff_mime,
};

use crate::{
    asset::decode_data_url,
    error::{Error, Result},
};

/// Fallback when neither the response nor the payload names a type.
const OCTET_STREAM: &str = "application/octet-stream";

/// Response body plus the MIME type the source declared for it.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

impl Fetched {
    /// Declared type, else sniffed from the payload, else
    /// `application/octet-stream`.
    #[must_use]
    pub fn mime(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .or_else(|| sniff_mime(&self.data))
            .unwrap_or(OCTET_STREAM)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Fetched>;
}

/// Fetches `http(s)` URLs with reqwest, decodes `data:` URLs inline and
/// reads `file:` URLs from disk.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client carrying the configured user agent and timeout.
    pub fn from_config(config: &DownloadConfig) -> Result<Self> {
        Ok(Self::new(build_client(&config.user_agent, config.fetch_timeout())?))
    }

    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn fetch_http(&self, url: Url) -> Result<Fetched> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::fetch(url.as_str(), e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("HTTP {status}"),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = resp
            .bytes()
            .await
            .map_err(|e| Error::fetch(url.as_str(), e))?
            .to_vec();

        Ok(Fetched { data, content_type })
    }
}

pub fn build_client(user_agent: &str, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(user_agent);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| Error::message(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched> {
        if url.starts_with("data:") {
            let (mime, data) = decode_data_url(url).map_err(|e| Error::fetch("data:", e))?;
            return Ok(Fetched {
                data,
                content_type: Some(mime),
            });
        }

        let parsed = Url::parse(url).map_err(|e| Error::fetch(url, e))?;
        debug!(url, "fetching");
        match parsed.scheme() {
            "http" | "https" => self.fetch_http(parsed).await,
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| Error::fetch(url, "not a local file path"))?;
                let data = tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::fetch(url, e))?;
                Ok(Fetched {
                    data,
                    content_type: None,
                })
            },
            other => Err(Error::fetch(url, format!("unsupported scheme: {other}"))),
        }
    }
}
