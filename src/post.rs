use std::cmp::Ordering;
use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::text_utils::{format_date_time, parse_date_time};

/// Visibility stored with an indexed post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostState {
    Public,
    Private,
}

/// What the first-line directive asks for. `Delete` never reaches the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
    Delete,
}

impl From<PostState> for Visibility {
    fn from(value: PostState) -> Self {
        match value {
            PostState::Public => Visibility::Public,
            PostState::Private => Visibility::Private,
        }
    }
}

impl Display for PostState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PostState::Public => write!(f, "public"),
            PostState::Private => write!(f, "private"),
        }
    }
}

/// Last modification time, second precision, `YYYY-MM-DD HH:MM:SS` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        // Second precision, so a round trip through the index file is lossless
        Timestamp(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        parse_date_time(text).map(Timestamp)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_date_time(&self.0))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(Error::custom)
    }
}

/// One entry of the post index.
///
/// Field names on disk follow the layout of the existing `postsList.json`
/// files so that a cached index can be loaded by older and newer builds alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "Name")]
    pub id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Body")]
    pub excerpt_html: String,
    #[serde(rename = "Banner")]
    pub banner_path: String,
    #[serde(rename = "Mtime")]
    pub last_modified: Timestamp,
    #[serde(rename = "State")]
    pub state: PostState,
}

impl Post {
    /// Record for a post directory without a primary document.
    pub fn stub(id: &str, last_modified: Timestamp) -> Post {
        Post {
            id: id.to_string(),
            title: String::new(),
            excerpt_html: String::new(),
            banner_path: String::new(),
            last_modified,
            state: PostState::Private,
        }
    }

    pub fn is_public(&self) -> bool {
        self.state == PostState::Public
    }

    /// Newest first.
    pub fn cmp_recency(&self, other: &Post) -> Ordering {
        other.last_modified.cmp(&self.last_modified)
    }
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "id={}, state={}, mtime={}, title={}",
               self.id,
               self.state,
               self.last_modified,
               self.title,
        )
    }
}

/// A post id names one directory in both the content and repository roots,
/// so it must be a single plain path component.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains('/')
        && !id.contains('\\')
        && !id.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(text: &str) -> Timestamp {
        Timestamp::parse(text).unwrap()
    }

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("hello-world"));
        assert!(is_valid_id("2024_post.v2"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(".pages"));
        assert!(!is_valid_id(".."));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id("a\\b"));
    }

    #[test]
    fn test_serialized_layout() {
        let post = Post {
            id: "first".to_string(),
            title: "First".to_string(),
            excerpt_html: "<p>Hello</p>".to_string(),
            banner_path: "cover.png".to_string(),
            last_modified: ts("2024-03-01 10:00:00"),
            state: PostState::Public,
        };

        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["Name"], "first");
        assert_eq!(json["Title"], "First");
        assert_eq!(json["Body"], "<p>Hello</p>");
        assert_eq!(json["Banner"], "cover.png");
        assert_eq!(json["Mtime"], "2024-03-01 10:00:00");
        assert_eq!(json["State"], "public");
    }

    #[test]
    fn test_deleted_state_is_not_loadable() {
        let json = r#"{"Name":"x","Title":"","Body":"","Banner":"","Mtime":"2024-03-01 10:00:00","State":"delete"}"#;
        assert!(serde_json::from_str::<Post>(json).is_err());
    }

    #[test]
    fn test_recency_order() {
        let older = Post::stub("older", ts("2023-01-01 00:00:00"));
        let newer = Post::stub("newer", ts("2024-01-01 00:00:00"));
        assert_eq!(newer.cmp_recency(&older), Ordering::Less);
        assert_eq!(older.cmp_recency(&newer), Ordering::Greater);
        assert_eq!(older.cmp_recency(&older.clone()), Ordering::Equal);
    }

    #[test]
    fn test_now_has_second_precision() {
        let now = Timestamp::now();
        assert_eq!(Timestamp::parse(&now.to_string()).unwrap(), now);
    }
}
