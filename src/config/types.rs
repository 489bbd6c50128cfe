use jellystream_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Media server base URL, e.g. `http://jellyfin.local:8096`
    #[serde(default)]
    pub url: Option<String>,

    /// Default user to sign in as
    #[serde(default)]
    pub username: Option<String>,
}

/// How this client identifies itself in the `X-Emby-Authorization` header.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_client_name")]
    pub client_name: String,

    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default = "default_device_id")]
    pub device_id: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Timeout for REST requests (default: 10)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            device_name: default_device_name(),
            device_id: default_device_id(),
            version: default_version(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_client_name() -> String {
    "JellyStream".to_string()
}

fn default_device_name() -> String {
    "Web".to_string()
}

fn default_device_id() -> String {
    "JellyStream-Web".to_string()
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
