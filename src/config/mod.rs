mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use url::Url;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./jellystream.toml",
        "~/.config/jellystream/config.toml",
        "/etc/jellystream/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(url) = &config.server.url {
        let parsed = Url::parse(url).with_context(|| format!("Invalid server url '{}'", url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            anyhow::bail!("Server url must be http or https, got '{}'", parsed.scheme());
        }
    }

    if config.client.request_timeout_secs == 0 {
        anyhow::bail!("client.request_timeout_secs cannot be 0");
    }
    if config.client.client_name.trim().is_empty() {
        anyhow::bail!("client.client_name cannot be empty");
    }

    config.playback.validate()?;

    Ok(())
}
