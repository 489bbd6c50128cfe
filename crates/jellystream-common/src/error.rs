//! Error taxonomy shared by the playback core and the server client.
//!
//! Playback failures (`Network`, `Decode`, `FormatUnsupported`, `LoadTimeout`)
//! are recoverable by switching streaming strategy. The rest are either
//! surfaced immediately or terminal.

/// Common error type for jellystream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Stream URL inputs were missing or malformed. Never retried.
    #[error("Invalid stream request: {0}")]
    InvalidStreamRequest(String),

    /// The media primitive or segment engine failed to fetch data.
    #[error("Network error: {0}")]
    Network(String),

    /// The media primitive could not decode the stream.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The stream's container or codecs are not playable.
    #[error("Unsupported format: {0}")]
    FormatUnsupported(String),

    /// The loading watchdog expired before the stream became ready.
    #[error("Load timed out after {timeout_ms} ms")]
    LoadTimeout {
        /// The watchdog duration that elapsed.
        timeout_ms: u64,
    },

    /// Playback start was rejected by an autoplay policy.
    #[error("Autoplay blocked: {0}")]
    AutoplayBlocked(String),

    /// Every automatic retry was used up.
    #[error("Retry ceiling exceeded after {attempts} failed attempts")]
    RetryCeilingExceeded {
        /// Number of consecutive failed attempts.
        attempts: u32,
    },

    /// The server rejected the supplied credentials or was unreachable.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A library, item, or image request failed.
    #[error("Listing fetch failed: {0}")]
    ListingFetchFailed(String),

    /// Configuration could not be read or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new InvalidStreamRequest error.
    pub fn invalid_stream_request<S: Into<String>>(msg: S) -> Self {
        Self::InvalidStreamRequest(msg.into())
    }

    /// Create a new Network error.
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new AuthenticationFailed error.
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create a new ListingFetchFailed error.
    pub fn listing<S: Into<String>>(msg: S) -> Self {
        Self::ListingFetchFailed(msg.into())
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether switching to another streaming strategy may fix this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Decode(_)
                | Error::FormatUnsupported(_)
                | Error::LoadTimeout { .. }
        )
    }

    /// Human-readable message for the error panel.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidStreamRequest(_) => {
                "This item cannot be streamed: the playback request is incomplete.".to_string()
            }
            Error::Network(_) => "The stream could not be loaded from the server.".to_string(),
            Error::Decode(_) => "The stream could not be decoded.".to_string(),
            Error::FormatUnsupported(_) => {
                "This stream format is not supported by the player.".to_string()
            }
            Error::LoadTimeout { timeout_ms } => format!(
                "The stream did not start within {}.",
                describe_duration(*timeout_ms)
            ),
            Error::AutoplayBlocked(_) => {
                "Autoplay was blocked by the browser. Click play to start playback.".to_string()
            }
            Error::RetryCeilingExceeded { .. } => {
                "Unable to play this item with any available streaming method.".to_string()
            }
            Error::AuthenticationFailed(_) => {
                "Login failed. Check your credentials and that the server is reachable."
                    .to_string()
            }
            Error::ListingFetchFailed(_) => "Unable to load content.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Whole seconds rounded up, or milliseconds below one second.
fn describe_duration(ms: u64) -> String {
    match ms {
        0..=999 => format!("{ms} milliseconds"),
        1000 => "1 second".to_string(),
        _ => format!("{} seconds", ms.div_ceil(1000)),
    }
}
