//! Authenticated session context.
//!
//! A [`SessionContext`] only comes out of a successful
//! [`JellyfinClient::authenticate`](crate::client::JellyfinClient::authenticate)
//! and is passed explicitly to every call that needs the server address or
//! credentials. Logging out consumes it.

use std::fmt;

use jellystream_common::UserId;
use jellystream_playback::StreamTarget;

use crate::client::UserDto;

#[derive(Clone)]
pub struct SessionContext {
    server: String,
    user: UserDto,
    access_token: String,
}

impl SessionContext {
    pub(crate) fn new(server: String, user: UserDto, access_token: String) -> Self {
        Self {
            server,
            user,
            access_token,
        }
    }

    /// Server base URL without a trailing slash.
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn user(&self) -> &UserDto {
        &self.user
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Address and credentials for building stream URLs.
    pub fn stream_target(&self) -> StreamTarget {
        StreamTarget::new(self.server.clone(), self.access_token.clone())
    }

    /// End the session. The context cannot be used afterwards.
    pub fn logout(self) {
        tracing::info!(user = %self.user.name, server = %self.server, "Logged out");
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
