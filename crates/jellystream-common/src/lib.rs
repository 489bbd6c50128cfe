//! jellystream-common: shared types, IDs, and errors.
//!
//! This crate provides common functionality used across jellystream:
//!
//! - **Typed IDs**: String-backed wrappers for server-issued item and user IDs,
//!   plus generated device and play-session identifiers
//! - **Core Types**: Streaming strategies, the playback state machine, image types
//! - **Error Handling**: The playback/client error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use jellystream_common::{Error, ItemId, PlaybackState, Result, StreamingStrategy};
//!
//! let item = ItemId::new("abc123");
//! assert_eq!(item.as_str(), "abc123");
//!
//! assert_eq!(StreamingStrategy::Adaptive.next(), StreamingStrategy::Progressive);
//! assert!(PlaybackState::Loading.can_transition_to(PlaybackState::Ready));
//!
//! fn build() -> Result<()> {
//!     Err(Error::invalid_stream_request("missing item id"))
//! }
//! assert!(build().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
