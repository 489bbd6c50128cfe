//! JellyStream - media server client with adaptive playback
//!
//! The playback core lives in `jellystream-playback`; this crate adds the REST
//! client, configuration and a headless media backend, and exposes them for
//! integration testing.

pub mod client;
pub mod config;
pub mod context;
pub mod headless;

pub use context::SessionContext;
