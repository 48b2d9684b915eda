use std::path::{Path, PathBuf};

use anyhow::Context;
use bibdup_core::DetectorConfig;

/// Platform config path: `<config_dir>/bibdup/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bibdup").join("config.toml"))
}

/// Load the detector configuration.
///
/// An explicit path must exist and parse. Without one, the platform file is
/// used when present and defaults otherwise.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<DetectorConfig> {
    match explicit {
        Some(path) => load_from_path(path),
        None => match config_path() {
            Some(path) if path.is_file() => load_from_path(&path),
            _ => Ok(DetectorConfig::default()),
        },
    }
}

fn load_from_path(path: &Path) -> anyhow::Result<DetectorConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let config = if is_json {
        DetectorConfig::from_json(&content)
    } else {
        DetectorConfig::from_toml(&content)
    }
    .with_context(|| format!("failed to load config {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}
