//! Metadata source port and its yt-dlp implementation.
//!
//! One fetch = one subprocess run over a query url and a `[start, end]`
//! window. Transport errors, non-zero exits, and malformed payloads all
//! collapse into the same "unavailable" outcome; the payload gets a single
//! salvage attempt (skip to the first `{`) before giving up.

use std::path::PathBuf;
use std::process::Stdio;

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};
use tube_core::model::{SearchResultPage, VideoEntry};

use crate::error::SessionError;

/// Port for fetching pages of video entries.
pub trait MetadataSource {
    fn fetch(
        &self,
        url: &str,
        start: u32,
        end: u32,
    ) -> impl std::future::Future<Output = Result<SearchResultPage, SessionError>>;
}

/// Fetches pages by shelling out to yt-dlp in flat-playlist mode.
pub struct YtDlpSource {
    binary: PathBuf,
    cookie_browser: Option<String>,
}

impl YtDlpSource {
    pub fn new(binary: PathBuf, cookie_browser: Option<String>) -> Self {
        Self {
            binary,
            cookie_browser,
        }
    }
}

impl MetadataSource for YtDlpSource {
    async fn fetch(
        &self,
        url: &str,
        start: u32,
        end: u32,
    ) -> Result<SearchResultPage, SessionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(url)
            .arg("-J")
            .arg("--flat-playlist")
            .arg("--extractor-args")
            .arg("youtubetab:approximate_date")
            .arg("--playlist-start")
            .arg(start.to_string())
            .arg("--playlist-end")
            .arg(end.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(browser) = &self.cookie_browser {
            cmd.arg("--cookies-from-browser").arg(browser);
        }

        debug!("fetching window [{start}, {end}] of {url}");
        let output = cmd.output().await.map_err(|e| {
            warn!("failed to spawn yt-dlp: {e}");
            SessionError::FetchUnavailable
        })?;

        if !output.status.success() {
            warn!(
                "yt-dlp exited with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(SessionError::FetchUnavailable);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = parse_payload(&stdout)?;
        Ok(SearchResultPage {
            entries: entries_from_payload(&payload),
            start,
            end,
            query_url: url.to_string(),
        })
    }
}

/// Parse the JSON payload, salvaging once from mixed output by skipping to
/// the first structural opening token.
pub fn parse_payload(raw: &str) -> Result<Value, SessionError> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }
    if let Some(idx) = raw.find('{') {
        if let Ok(value) = serde_json::from_str(&raw[idx..]) {
            debug!("salvaged payload from mixed output at byte {idx}");
            return Ok(value);
        }
    }
    Err(SessionError::ParseFailure)
}

/// Flatten the payload's entry list, skipping holes and entries that do not
/// deserialize.
pub fn entries_from_payload(payload: &Value) -> Vec<VideoEntry> {
    let Some(raw_entries) = payload.get("entries").and_then(Value::as_array) else {
        return Vec::new();
    };
    raw_entries
        .iter()
        .filter(|v| !v.is_null())
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_payload() {
        let payload = parse_payload(r#"{"entries":[{"id":"a","title":"T"}]}"#).unwrap();
        assert_eq!(entries_from_payload(&payload).len(), 1);
    }

    #[test]
    fn test_salvage_from_mixed_output() {
        let raw = "Loading...\nsome noise\n{\"entries\":[{\"id\":\"a\",\"title\":\"T\"}]}";
        let payload = parse_payload(raw).unwrap();
        let entries = entries_from_payload(&payload);
        assert_eq!(entries[0].id, "a");
    }

    #[test]
    fn test_unsalvageable_payload_is_parse_failure() {
        assert!(matches!(
            parse_payload("no json here at all"),
            Err(SessionError::ParseFailure)
        ));
        assert!(matches!(
            parse_payload("prefix { still : not json"),
            Err(SessionError::ParseFailure)
        ));
    }

    #[test]
    fn test_holes_are_skipped() {
        let payload = parse_payload(
            r#"{"entries":[null,{"id":"a","title":"A"},null,{"id":"b","title":"B"}]}"#,
        )
        .unwrap();
        let entries = entries_from_payload(&payload);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, "b");
    }

    #[test]
    fn test_missing_entries_key_is_empty_page() {
        let payload = parse_payload(r#"{"title":"playlist"}"#).unwrap();
        assert!(entries_from_payload(&payload).is_empty());
    }
}
