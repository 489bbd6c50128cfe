//! REST client for the media server.
//!
//! Every request carries the `X-Emby-Authorization` client identification
//! header; authenticated requests add `X-Emby-Token`. Failures map onto the
//! shared error taxonomy: login problems are `AuthenticationFailed`, anything
//! that lists or loads content is `ListingFetchFailed`.

mod types;

pub use types::*;

use std::time::Duration;

use bytes::Bytes;
use jellystream_common::{Error, ImageType, ItemId, Result};
use rand::seq::SliceRandom;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

use crate::config::ClientConfig;
use crate::context::SessionContext;

/// Library names the home view looks for, in the order they are tried.
pub const MOVIE_LIBRARY_NAMES: &[&str] = &["Movies", "Films"];
pub const TV_LIBRARY_NAMES: &[&str] = &["TV Shows", "Series", "Séries"];

/// Items per home row.
const HOME_ROW_LIMIT: u32 = 30;

pub struct JellyfinClient {
    client: Client,
    authorization: String,
}

/// What the home page shows: the libraries plus recent movies and shows.
#[derive(Debug, Clone, Default)]
pub struct HomeView {
    pub libraries: Vec<MediaItem>,
    pub movies: Vec<MediaItem>,
    pub tv_shows: Vec<MediaItem>,
    pub featured: Option<MediaItem>,
}

impl JellyfinClient {
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        let authorization = format!(
            r#"MediaBrowser Client="{}", Device="{}", DeviceId="{}", Version="{}""#,
            config.client_name, config.device_name, config.device_id, config.version
        );

        Self {
            client,
            authorization,
        }
    }

    /// Value of the `X-Emby-Authorization` header.
    pub fn authorization(&self) -> &str {
        &self.authorization
    }

    fn get(&self, ctx: &SessionContext, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}{}", ctx.server(), path))
            .header("X-Emby-Authorization", &self.authorization)
            .header("X-Emby-Token", ctx.access_token())
    }

    /// Sign in with username and password.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<SessionContext> {
        let server = normalize_server(&credentials.server_url).map_err(Error::authentication)?;
        tracing::debug!(server = %server, username = %credentials.username, "Authenticating");

        let response = self
            .client
            .post(format!("{}/Users/AuthenticateByName", server))
            .header("X-Emby-Authorization", &self.authorization)
            .json(&AuthenticateByName {
                username: &credentials.username,
                pw: &credentials.password,
            })
            .send()
            .await
            .map_err(|e| Error::authentication(format!("server unreachable: {e}")))?;

        let response = check_status(response)
            .await
            .map_err(Error::authentication)?;

        let result: AuthenticationResult = response
            .json()
            .await
            .map_err(|e| Error::authentication(format!("invalid login response: {e}")))?;

        tracing::info!(user = %result.user.name, server = %server, "Authenticated");
        Ok(SessionContext::new(server, result.user, result.access_token))
    }

    /// Reachability check against the public system info endpoint.
    pub async fn check_server(&self, ctx: &SessionContext) -> Result<PublicSystemInfo> {
        let response = self
            .get(ctx, "/System/Info/Public")
            .send()
            .await
            .map_err(|e| Error::listing(format!("server unreachable: {e}")))?;
        decode(response).await
    }

    /// List items under `parent`, or the user's libraries when `parent` is `None`.
    pub async fn get_items(
        &self,
        ctx: &SessionContext,
        parent: Option<&ItemId>,
        query: &ItemsQuery,
    ) -> Result<ItemsPage> {
        let params = items_params(ctx, parent, query);
        tracing::debug!(parent = ?parent, "Fetching items");

        let response = self
            .get(ctx, "/Items")
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::listing(format!("items request failed: {e}")))?;
        decode(response).await
    }

    pub async fn get_libraries(&self, ctx: &SessionContext) -> Result<Vec<MediaItem>> {
        let page = self.get_items(ctx, None, &ItemsQuery::default()).await?;
        Ok(page.items)
    }

    pub async fn get_item(&self, ctx: &SessionContext, id: &ItemId) -> Result<MediaItem> {
        let response = self
            .get(ctx, &format!("/Items/{}", id))
            .send()
            .await
            .map_err(|e| Error::listing(format!("item request failed: {e}")))?;
        decode(response).await
    }

    /// Libraries, newest movies and shows, and a random featured item.
    pub async fn home(&self, ctx: &SessionContext) -> Result<HomeView> {
        self.check_server(ctx).await?;

        let libraries = self.get_libraries(ctx).await?;
        if libraries.is_empty() {
            return Err(Error::listing(
                "no libraries found; check the user's permissions",
            ));
        }

        let recent = ItemsQuery::recently_added(HOME_ROW_LIMIT);
        let mut view = HomeView::default();
        if let Some(library) = find_library(&libraries, MOVIE_LIBRARY_NAMES) {
            view.movies = self.get_items(ctx, Some(&library.id), &recent).await?.items;
        }
        if let Some(library) = find_library(&libraries, TV_LIBRARY_NAMES) {
            view.tv_shows = self.get_items(ctx, Some(&library.id), &recent).await?.items;
        }

        let mut rng = rand::thread_rng();
        view.featured = view
            .movies
            .choose(&mut rng)
            .or_else(|| view.tv_shows.choose(&mut rng))
            .cloned();
        view.libraries = libraries;
        Ok(view)
    }

    /// Download image bytes.
    pub async fn fetch_image(
        &self,
        ctx: &SessionContext,
        id: &ItemId,
        image_type: ImageType,
        tag: &str,
    ) -> Result<Bytes> {
        let response = self
            .get(ctx, &format!("/Items/{}/Images/{}", id, image_type.as_path()))
            .query(&[("tag", tag), ("quality", "90")])
            .send()
            .await
            .map_err(|e| Error::listing(format!("image request failed: {e}")))?;
        let response = check_status(response).await.map_err(Error::listing)?;
        response
            .bytes()
            .await
            .map_err(|e| Error::listing(format!("image download failed: {e}")))
    }
}

/// Card image URL. `Primary` falls back to `Thumb`; `None` means use a placeholder.
pub fn image_url(ctx: &SessionContext, item: &MediaItem, image_type: ImageType) -> Option<String> {
    let (image_type, tag) = match (image_type, item.image_tags.get(image_type)) {
        (_, Some(tag)) => (image_type, tag),
        (ImageType::Primary, None) => (ImageType::Thumb, item.image_tags.thumb.as_deref()?),
        _ => return None,
    };
    Some(format!(
        "{}/Items/{}/Images/{}?tag={}&quality=90&maxHeight=300",
        ctx.server(),
        item.id,
        image_type.as_path(),
        tag
    ))
}

/// Full-size backdrop URL, or `None` when the item has no backdrop.
pub fn backdrop_url(ctx: &SessionContext, item: &MediaItem) -> Option<String> {
    let tag = item.backdrop_tag()?;
    Some(format!(
        "{}/Items/{}/Images/Backdrop?tag={}&quality=90",
        ctx.server(),
        item.id,
        tag
    ))
}

/// First library whose name matches one of `names` (case-insensitive).
pub fn find_library<'a>(libraries: &'a [MediaItem], names: &[&str]) -> Option<&'a MediaItem> {
    names.iter().find_map(|name| {
        libraries
            .iter()
            .find(|library| library.name.eq_ignore_ascii_case(name))
    })
}

fn normalize_server(raw: &str) -> std::result::Result<String, String> {
    let server = raw.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err("missing server address".to_string());
    }
    let parsed = Url::parse(server).map_err(|e| format!("invalid server address '{server}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("unsupported server scheme '{}'", parsed.scheme()));
    }
    Ok(server.to_string())
}

/// Default `/Items` parameters with the caller's overrides applied.
fn items_params(
    ctx: &SessionContext,
    parent: Option<&ItemId>,
    query: &ItemsQuery,
) -> Vec<(String, String)> {
    let nested = parent.is_some();
    let mut params: Vec<(String, String)> = [
        ("ParentId", parent.map(ItemId::as_str).unwrap_or_default()),
        ("UserId", ctx.user_id().as_str()),
        (
            "IncludeItemTypes",
            if nested { "Movie,Episode" } else { "CollectionFolder" },
        ),
        ("Recursive", if nested { "true" } else { "false" }),
        (
            "Fields",
            "Overview,PrimaryImageAspectRatio,ProductionYear,BasicSyncInfo,BackdropImageTags",
        ),
        ("ImageTypeLimit", "1"),
        ("EnableImageTypes", "Primary,Backdrop,Thumb"),
        ("Limit", "50"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (key, value) in query.overrides() {
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => params.push((key, value)),
        }
    }
    params
}

async fn check_status(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("server returned {}: {}", status, body))
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await.map_err(Error::listing)?;
    response
        .json()
        .await
        .map_err(|e| Error::listing(format!("invalid response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jellystream_common::UserId;

    fn ctx() -> SessionContext {
        SessionContext::new(
            "http://media.local:8096".to_string(),
            UserDto {
                id: UserId::new("u1"),
                name: "alice".to_string(),
                server_id: None,
            },
            "tok".to_string(),
        )
    }

    fn item(json: &str) -> MediaItem {
        serde_json::from_str(json).unwrap()
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_authorization_header() {
        let client = JellyfinClient::new(&ClientConfig::default());
        assert_eq!(
            client.authorization(),
            r#"MediaBrowser Client="JellyStream", Device="Web", DeviceId="JellyStream-Web", Version="1.0.0""#
        );
    }

    #[test]
    fn test_library_params() {
        let params = items_params(&ctx(), None, &ItemsQuery::default());
        assert_eq!(param(&params, "ParentId"), Some(""));
        assert_eq!(param(&params, "UserId"), Some("u1"));
        assert_eq!(param(&params, "IncludeItemTypes"), Some("CollectionFolder"));
        assert_eq!(param(&params, "Recursive"), Some("false"));
        assert_eq!(param(&params, "Limit"), Some("50"));
    }

    #[test]
    fn test_nested_params_with_overrides() {
        let parent = ItemId::new("lib1");
        let mut query = ItemsQuery::recently_added(30);
        query.extra.push(("IsPlayed".to_string(), "false".to_string()));
        let params = items_params(&ctx(), Some(&parent), &query);

        assert_eq!(param(&params, "ParentId"), Some("lib1"));
        assert_eq!(param(&params, "IncludeItemTypes"), Some("Movie,Episode"));
        assert_eq!(param(&params, "Recursive"), Some("true"));
        assert_eq!(param(&params, "Limit"), Some("30"));
        assert_eq!(param(&params, "SortBy"), Some("DateCreated"));
        assert_eq!(param(&params, "IsPlayed"), Some("false"));
        assert_eq!(params.iter().filter(|(k, _)| k == "Limit").count(), 1);
    }

    #[test]
    fn test_image_urls() {
        let ctx = ctx();
        let with_primary = item(r#"{"Id":"a","Name":"A","ImageTags":{"Primary":"p"}}"#);
        assert_eq!(
            image_url(&ctx, &with_primary, ImageType::Primary).as_deref(),
            Some("http://media.local:8096/Items/a/Images/Primary?tag=p&quality=90&maxHeight=300")
        );

        let thumb_only = item(r#"{"Id":"b","Name":"B","ImageTags":{"Thumb":"t"}}"#);
        assert_eq!(
            image_url(&ctx, &thumb_only, ImageType::Primary).as_deref(),
            Some("http://media.local:8096/Items/b/Images/Thumb?tag=t&quality=90&maxHeight=300")
        );

        let bare = item(r#"{"Id":"c","Name":"C"}"#);
        assert_eq!(image_url(&ctx, &bare, ImageType::Primary), None);
        assert_eq!(backdrop_url(&ctx, &bare), None);

        let backdrop = item(r#"{"Id":"d","Name":"D","BackdropImageTags":["bd"]}"#);
        assert_eq!(
            backdrop_url(&ctx, &backdrop).as_deref(),
            Some("http://media.local:8096/Items/d/Images/Backdrop?tag=bd&quality=90")
        );
    }

    #[test]
    fn test_find_library() {
        let libraries = vec![
            item(r#"{"Id":"1","Name":"Music"}"#),
            item(r#"{"Id":"2","Name":"Films"}"#),
            item(r#"{"Id":"3","Name":"Séries"}"#),
        ];
        assert_eq!(
            find_library(&libraries, MOVIE_LIBRARY_NAMES).map(|l| l.id.as_str()),
            Some("2")
        );
        assert_eq!(
            find_library(&libraries, TV_LIBRARY_NAMES).map(|l| l.id.as_str()),
            Some("3")
        );
        assert!(find_library(&libraries, &["Books"]).is_none());
    }

    #[test]
    fn test_normalize_server() {
        assert_eq!(
            normalize_server("http://media.local:8096/").unwrap(),
            "http://media.local:8096"
        );
        assert!(normalize_server("").is_err());
        assert!(normalize_server("ftp://media").is_err());
    }
}
