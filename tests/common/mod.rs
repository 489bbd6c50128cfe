//! Shared test harness for integration tests.
//!
//! [`TestServer`] starts a `wiremock` server that answers the login endpoint,
//! so tests can obtain a real [`SessionContext`] and then mount whatever
//! library or stream responses they need.

#![allow(dead_code)]

use jellystream::client::{Credentials, JellyfinClient};
use jellystream::config::ClientConfig;
use jellystream::SessionContext;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USER_ID: &str = "u1";
pub const TOKEN: &str = "test-token";

pub struct TestServer {
    pub server: MockServer,
    pub client: JellyfinClient,
}

impl TestServer {
    /// Start a mock media server that accepts any login.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Users/AuthenticateByName"))
            .respond_with(ResponseTemplate::new(200).set_body_json(auth_response()))
            .mount(&server)
            .await;

        Self {
            server,
            client: JellyfinClient::new(&ClientConfig::default()),
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            server_url: format!("{}/", self.uri()),
            username: "alice".to_string(),
            password: "secret".to_string(),
        }
    }

    /// Sign in against the mock server.
    pub async fn login(&self) -> SessionContext {
        self.client
            .authenticate(&self.credentials())
            .await
            .expect("mock login failed")
    }
}

pub fn auth_response() -> serde_json::Value {
    json!({
        "User": {"Id": USER_ID, "Name": "alice", "ServerId": "srv"},
        "AccessToken": TOKEN,
        "SessionInfo": {}
    })
}

pub fn item(id: &str, name: &str, item_type: &str) -> serde_json::Value {
    json!({"Id": id, "Name": name, "Type": item_type, "ImageTags": {"Primary": format!("tag-{id}")}})
}

pub fn page(items: Vec<serde_json::Value>) -> serde_json::Value {
    let count = items.len();
    json!({"Items": items, "TotalRecordCount": count})
}
