//! Application settings.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::boundaries::{
    BoundaryLoader, BoundaryLocation, DEFAULT_BOUNDARIES_PATH, DEFAULT_OBJECT_NAME, USER_AGENT,
};
use crate::error::{BoundaryError, OfficialsError};
use crate::layers::LayerRegistry;
use crate::officials::OfficialDirectory;

/// Environment variable overriding the page base URL.
pub const ENV_BASE_URL: &str = "CIVICMAP_BASE_URL";
/// Environment variable overriding the officials dataset path.
pub const ENV_OFFICIALS: &str = "CIVICMAP_OFFICIALS";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Page URL that relative boundary locations resolve against.
    pub base_url: Option<Url>,
    /// Boundary topology location.
    pub boundaries: String,
    /// Topology object holding the boundaries.
    pub boundaries_object: String,
    /// Officials dataset. `None` means an empty directory.
    pub officials_path: Option<PathBuf>,
    /// User agent for HTTP requests.
    pub user_agent: String,
    /// Request timeout. `None` lets a request run to completion.
    pub request_timeout: Option<Duration>,
    /// Boundary layers and their district formatters.
    pub layers: LayerRegistry,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: None,
            boundaries: DEFAULT_BOUNDARIES_PATH.to_string(),
            boundaries_object: DEFAULT_OBJECT_NAME.to_string(),
            officials_path: None,
            user_agent: USER_AGENT.to_string(),
            request_timeout: None,
            layers: LayerRegistry::builtin(),
        }
    }
}

impl Settings {
    /// Apply `CIVICMAP_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(base) = std::env::var(ENV_BASE_URL).ok().filter(|s| !s.is_empty()) {
            match Url::parse(&base) {
                Ok(url) => self.base_url = Some(url),
                Err(e) => tracing::error!("Invalid {} '{}': {}", ENV_BASE_URL, base, e),
            }
        }
        if let Some(path) = std::env::var(ENV_OFFICIALS).ok().filter(|s| !s.is_empty()) {
            self.officials_path = Some(PathBuf::from(shellexpand::tilde(&path).into_owned()));
        }
        self
    }

    /// Resolve where the boundary topology lives.
    pub fn boundary_location(&self) -> Result<BoundaryLocation, BoundaryError> {
        BoundaryLocation::resolve(&self.boundaries, self.base_url.as_ref())
    }

    /// Build a loader for the configured boundary topology.
    pub fn boundary_loader(&self) -> Result<BoundaryLoader, BoundaryError> {
        let source = self
            .boundary_location()?
            .into_source(Some(&self.user_agent), self.request_timeout)?;
        Ok(BoundaryLoader::from_boxed(source, &self.boundaries_object))
    }

    /// Load the officials dataset, or an empty one when none is configured.
    pub async fn load_officials(&self) -> Result<OfficialDirectory, OfficialsError> {
        match self.officials_path {
            Some(ref path) => OfficialDirectory::load(path).await,
            None => {
                tracing::debug!("No officials dataset configured");
                Ok(OfficialDirectory::default())
            }
        }
    }
}
