//! Media server data transfer objects.

use std::fmt;

use jellystream_common::{ImageType, ItemId, UserId};
use serde::{Deserialize, Serialize};

/// Runtime ticks per second (100ns ticks).
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Login form input.
#[derive(Clone)]
pub struct Credentials {
    pub server_url: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AuthenticateByName<'a> {
    pub username: &'a str,
    pub pw: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AuthenticationResult {
    pub user: UserDto,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDto {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub server_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicSystemInfo {
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop: Option<String>,
}

impl ImageTags {
    pub fn get(&self, image_type: ImageType) -> Option<&str> {
        match image_type {
            ImageType::Primary => self.primary.as_deref(),
            ImageType::Thumb => self.thumb.as_deref(),
            ImageType::Backdrop => self.backdrop.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameIdPair {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// A library, movie, series or episode.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaItem {
    pub id: ItemId,
    pub name: String,
    #[serde(rename = "Type", default)]
    pub item_type: String,
    #[serde(default)]
    pub image_tags: ImageTags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backdrop_image_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_time_ticks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub studios: Vec<NameIdPair>,
}

impl MediaItem {
    /// Formatted runtime, if the server reported one.
    pub fn runtime(&self) -> Option<String> {
        self.run_time_ticks.and_then(format_runtime)
    }

    /// Tag of the first backdrop, from either place the server puts it.
    pub fn backdrop_tag(&self) -> Option<&str> {
        self.backdrop_image_tags
            .first()
            .map(String::as_str)
            .or(self.image_tags.backdrop.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsPage {
    #[serde(default)]
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub total_record_count: usize,
}

/// Caller overrides for an `/Items` listing. Set fields replace the defaults.
#[derive(Debug, Clone, Default)]
pub struct ItemsQuery {
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub filters: Option<String>,
    pub fields: Option<String>,
    /// Any other query parameter, applied last.
    pub extra: Vec<(String, String)>,
}

impl ItemsQuery {
    /// Newest first, as shown in the home rows.
    pub fn recently_added(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            sort_by: Some("DateCreated".to_string()),
            sort_order: Some("Descending".to_string()),
            ..Default::default()
        }
    }

    pub(crate) fn overrides(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(limit) = self.limit {
            out.push(("Limit".to_string(), limit.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            out.push(("SortBy".to_string(), sort_by.clone()));
        }
        if let Some(sort_order) = &self.sort_order {
            out.push(("SortOrder".to_string(), sort_order.clone()));
        }
        if let Some(filters) = &self.filters {
            out.push(("Filters".to_string(), filters.clone()));
        }
        if let Some(fields) = &self.fields {
            out.push(("Fields".to_string(), fields.clone()));
        }
        out.extend(self.extra.iter().cloned());
        out
    }
}

/// Format runtime ticks as `"1h 5m"` or `"42m"`. `None` for missing or zero.
pub fn format_runtime(ticks: i64) -> Option<String> {
    if ticks <= 0 {
        return None;
    }
    let total_minutes = ticks / TICKS_PER_SECOND / 60;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    Some(if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(0), None);
        assert_eq!(format_runtime(42 * 60 * TICKS_PER_SECOND).as_deref(), Some("42m"));
        assert_eq!(format_runtime(65 * 60 * TICKS_PER_SECOND).as_deref(), Some("1h 5m"));
        assert_eq!(format_runtime(2 * 3600 * TICKS_PER_SECOND).as_deref(), Some("2h 0m"));
        // Seconds are truncated.
        assert_eq!(format_runtime(59 * TICKS_PER_SECOND).as_deref(), Some("0m"));
    }

    #[test]
    fn test_item_deserialize() {
        let json = r#"{
            "Id": "abc123",
            "Name": "Big Buck Bunny",
            "Type": "Movie",
            "ImageTags": {"Primary": "p1"},
            "BackdropImageTags": ["b1"],
            "ProductionYear": 2008,
            "RunTimeTicks": 5964000000,
            "Genres": ["Animation"],
            "Studios": [{"Name": "Blender", "Id": "s1"}]
        }"#;
        let item: MediaItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "abc123");
        assert_eq!(item.item_type, "Movie");
        assert_eq!(item.image_tags.get(ImageType::Primary), Some("p1"));
        assert_eq!(item.backdrop_tag(), Some("b1"));
        assert_eq!(item.runtime().as_deref(), Some("9m"));
        assert_eq!(item.studios[0].name, "Blender");
    }

    #[test]
    fn test_overrides_order() {
        let mut query = ItemsQuery::recently_added(30);
        query.extra.push(("Limit".to_string(), "5".to_string()));
        let overrides = query.overrides();
        assert_eq!(overrides[0], ("Limit".to_string(), "30".to_string()));
        assert_eq!(overrides.last().unwrap(), &("Limit".to_string(), "5".to_string()));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            server_url: "http://media".into(),
            username: "alice".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
