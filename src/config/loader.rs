//! Configuration loading logic.

use std::path::PathBuf;

use super::{Config, Settings};

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

/// Load settings with auto-discovered config.
pub async fn load_settings() -> Settings {
    match load_settings_with_options(&LoadOptions::default()).await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("{}", e);
            Settings::default().with_env_overrides()
        }
    }
}

/// Load settings.
///
/// Priority: explicit `--config` file, then a discovered config file, then
/// defaults. Environment overrides apply last. An explicit config file
/// that cannot be read or parsed is an error; a discovered one is skipped.
pub async fn load_settings_with_options(options: &LoadOptions) -> Result<Settings, String> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config.base_dir().unwrap_or_else(|| {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    });

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    Ok(settings.with_env_overrides())
}
