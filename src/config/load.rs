use std::path::Path;

use anyhow::Context as _;
use tracing::info;

use super::AppConfig;

/// Load declarative configuration from a YAML or JSON file, chosen by
/// extension.
///
/// The loaded configuration still needs factories and listeners
/// installed before it can start; see
/// [`AppConfig::register_factory`](super::AppConfig::register_factory).
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration from {}", path.display()))?;

    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if yaml {
        AppConfig::from_yaml(&content)?
    } else {
        AppConfig::from_json(&content)?
    };

    info!(
        path = %path.display(),
        application = %config.name,
        handlers = config.handlers.len(),
        constraints = config.constraints.len(),
        "Configuration loaded"
    );
    Ok(config)
}

impl AppConfig {
    /// Parse configuration from a YAML document.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("parsing YAML configuration")
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).context("parsing JSON configuration")
    }
}
