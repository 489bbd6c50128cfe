//! Typed ID wrappers for identifiers that travel to and from the server.
//!
//! Jellyfin hands out opaque string IDs, so unlike a locally generated UUID
//! these wrap a `String`. Each type still prevents mixing (e.g. passing a
//! `UserId` where an `ItemId` is expected).

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a newtype ID wrapper over `String`.
///
/// The macro produces a struct with:
/// - `new()` taking anything `Into<String>`
/// - `as_str()` and `is_empty()` accessors
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Serialize`, `Deserialize`
/// - `Display` plus `From<&str>` / `From<String>` conversions
macro_rules! string_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                /// Wrap an existing identifier.
                #[must_use]
                pub fn new(id: impl Into<String>) -> Self {
                    Self(id.into())
                }

                /// Borrow the identifier as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }

                /// Whether the identifier is empty or whitespace only.
                #[must_use]
                pub fn is_empty(&self) -> bool {
                    self.0.trim().is_empty()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<&str> for $name {
                fn from(s: &str) -> Self {
                    Self(s.to_string())
                }
            }

            impl From<String> for $name {
                fn from(s: String) -> Self {
                    Self(s)
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

string_id! {
    /// Server-issued identifier for a library item (movie, episode, folder).
    ItemId,
    /// Server-issued identifier for a user.
    UserId,
    /// Client device identifier sent with every stream request.
    DeviceId,
    /// Per-attempt identifier distinguishing playback attempts on the server.
    PlaySessionId,
}

const DEVICE_PREFIX: &str = "jellystream-web";
const PLAY_SESSION_PREFIX: &str = "jellystream";

impl DeviceId {
    /// Generate a randomized device identifier.
    #[must_use]
    pub fn random() -> Self {
        let suffix: u32 = rand::thread_rng().gen();
        Self(format!("{DEVICE_PREFIX}-{suffix:08x}"))
    }
}

impl PlaySessionId {
    /// Generate a fresh play session identifier.
    ///
    /// The millisecond timestamp keeps IDs roughly ordered in server logs; the
    /// UUID suffix makes two IDs generated in the same millisecond distinct.
    #[must_use]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        Self(format!(
            "{PLAY_SESSION_PREFIX}-{millis}-{}",
            Uuid::new_v4().simple()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_string_id_accessors() {
        let id = ItemId::new("abc123");
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(id.to_string(), "abc123");
        assert!(!id.is_empty());
        assert!(ItemId::new("  ").is_empty());
        assert_eq!(ItemId::from("abc123"), id);
    }

    #[test]
    fn test_string_id_serde_transparent() {
        let id = UserId::new("u-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"u-1\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_play_session_ids_are_unique() {
        let ids: HashSet<_> = (0..1000).map(|_| PlaySessionId::generate()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.as_str().starts_with("jellystream-")));
    }

    #[test]
    fn test_device_id_format() {
        let id = DeviceId::random();
        let suffix = id.as_str().strip_prefix("jellystream-web-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
