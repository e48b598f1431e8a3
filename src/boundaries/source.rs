//! Where the boundary topology comes from.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::BoundaryError;

/// Default user agent for boundary requests.
pub const USER_AGENT: &str = concat!("civicmap/", env!("CARGO_PKG_VERSION"));

/// Fetches the raw bytes of a boundary topology.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, BoundaryError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// Boundary topology served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpBoundarySource {
    client: Client,
    url: Url,
}

/// Builder for [`HttpBoundarySource`].
pub struct HttpBoundarySourceBuilder {
    url: Url,
    user_agent: Option<String>,
    timeout: Option<Duration>,
}

impl HttpBoundarySourceBuilder {
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.user_agent = Some(ua.to_string());
        self
    }

    /// Per-request timeout. Without one, a request runs to completion.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpBoundarySource, BoundaryError> {
        let mut builder =
            Client::builder().user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(HttpBoundarySource {
            client: builder.build()?,
            url: self.url,
        })
    }
}

impl HttpBoundarySource {
    pub fn builder(url: Url) -> HttpBoundarySourceBuilder {
        HttpBoundarySourceBuilder {
            url,
            user_agent: None,
            timeout: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl BoundarySource for HttpBoundarySource {
    async fn fetch(&self) -> Result<Vec<u8>, BoundaryError> {
        tracing::debug!("Fetching boundaries from {}", self.url);
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BoundaryError::Status {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Boundary topology stored on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileBoundarySource {
    path: PathBuf,
}

impl FileBoundarySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BoundarySource for FileBoundarySource {
    async fn fetch(&self) -> Result<Vec<u8>, BoundaryError> {
        tracing::debug!("Reading boundaries from {}", self.path.display());
        Ok(tokio::fs::read(&self.path).await?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A resolved boundary location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryLocation {
    Remote(Url),
    Local(PathBuf),
}

impl BoundaryLocation {
    /// Resolve `location` the way a page resolves a relative fetch.
    ///
    /// - absolute `http(s)` URLs are used as-is;
    /// - with a base URL, anything else is joined onto it
    ///   (`./boundaries.json` sits next to the page);
    /// - otherwise the location is a filesystem path.
    pub fn resolve(location: &str, base: Option<&Url>) -> Result<Self, BoundaryError> {
        if let Ok(url) = Url::parse(location) {
            return match url.scheme() {
                "http" | "https" => Ok(Self::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Local)
                    .map_err(|_| BoundaryError::InvalidLocation(location.to_string())),
                _ => Err(BoundaryError::InvalidLocation(location.to_string())),
            };
        }

        match base {
            Some(base) => base
                .join(location)
                .map(Self::Remote)
                .map_err(|_| BoundaryError::InvalidLocation(location.to_string())),
            None => Ok(Self::Local(PathBuf::from(
                shellexpand::tilde(location).into_owned(),
            ))),
        }
    }

    /// Build the matching source.
    pub fn into_source(
        self,
        user_agent: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn BoundarySource>, BoundaryError> {
        match self {
            Self::Remote(url) => {
                let mut builder = HttpBoundarySource::builder(url);
                if let Some(ua) = user_agent {
                    builder = builder.user_agent(ua);
                }
                if let Some(timeout) = timeout {
                    builder = builder.timeout(timeout);
                }
                Ok(Box::new(builder.build()?))
            }
            Self::Local(path) => Ok(Box::new(FileBoundarySource::new(path))),
        }
    }
}
