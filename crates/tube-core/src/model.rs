//! Data model for metadata payloads.
//!
//! Mirrors the flat-playlist JSON emitted by the metadata source. Entries
//! are tolerant of missing fields: anything optional in the payload is
//! optional here.

use serde::Deserialize;

/// One video entry from a search or playlist page.
///
/// Immutable once fetched; the list ordinal shown during selection is a
/// display-only annotation applied elsewhere, never stored here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub live_status: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thumbnail {
    #[serde(default)]
    pub url: String,
}

/// Live status reported by the metadata source. Anything the source sends
/// beyond the two live markers collapses to [`LiveStatus::NotLive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    IsLive,
    WasLive,
    NotLive,
}

impl VideoEntry {
    /// Highest-resolution thumbnail — the source orders them ascending.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnails
            .last()
            .map(|t| t.url.as_str())
            .filter(|u| !u.is_empty())
    }

    pub fn live_status(&self) -> LiveStatus {
        match self.live_status.as_deref() {
            Some("is_live") => LiveStatus::IsLive,
            Some("was_live") => LiveStatus::WasLive,
            _ => LiveStatus::NotLive,
        }
    }
}

/// A fetched `[start, end]` window of results for one query url.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultPage {
    pub entries: Vec<VideoEntry>,
    pub start: u32,
    pub end: u32,
    pub query_url: String,
}

impl SearchResultPage {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserializes_with_missing_fields() {
        let entry: VideoEntry =
            serde_json::from_str(r#"{"id":"abc","title":"A Video","url":"https://example.com/v"}"#)
                .unwrap();
        assert_eq!(entry.id, "abc");
        assert_eq!(entry.duration, None);
        assert_eq!(entry.live_status(), LiveStatus::NotLive);
        assert!(entry.thumbnail_url().is_none());
    }

    #[test]
    fn test_live_status_mapping() {
        let entry: VideoEntry =
            serde_json::from_str(r#"{"id":"x","live_status":"is_live"}"#).unwrap();
        assert_eq!(entry.live_status(), LiveStatus::IsLive);

        let entry: VideoEntry =
            serde_json::from_str(r#"{"id":"x","live_status":"was_live"}"#).unwrap();
        assert_eq!(entry.live_status(), LiveStatus::WasLive);

        // Unknown statuses collapse to NotLive rather than failing the parse.
        let entry: VideoEntry =
            serde_json::from_str(r#"{"id":"x","live_status":"post_live"}"#).unwrap();
        assert_eq!(entry.live_status(), LiveStatus::NotLive);
    }

    #[test]
    fn test_last_thumbnail_wins() {
        let entry: VideoEntry = serde_json::from_str(
            r#"{"id":"x","thumbnails":[{"url":"small.jpg"},{"url":"large.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(entry.thumbnail_url(), Some("large.jpg"));
    }
}
