//! Pagination over a query url.
//!
//! The controller owns the `[start, end]` window and re-fetches from the
//! metadata source on every step — there is no page cache, so each
//! navigation sees fresh results at the cost of a remote round trip.

use tube_core::model::{SearchResultPage, VideoEntry};

use crate::error::SessionError;
use crate::metadata::MetadataSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationController {
    start: u32,
    end: u32,
    page_size: u32,
}

impl PaginationController {
    pub fn new(page_size: u32) -> Self {
        let page_size = page_size.max(1);
        Self {
            start: 1,
            end: page_size,
            page_size,
        }
    }

    pub fn window(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    pub fn advance(&mut self) {
        self.start += self.page_size;
        self.end += self.page_size;
    }

    /// Move back one page, clamped so the window never leaves the first
    /// page. Retreating at `start == 1` is a no-op.
    pub fn retreat(&mut self) {
        self.start = self.start.saturating_sub(self.page_size).max(1);
        self.end = (self.end.saturating_sub(self.page_size)).max(self.page_size);
    }

    pub async fn fetch_current<M: MetadataSource>(
        &self,
        source: &M,
        url: &str,
    ) -> Result<SearchResultPage, SessionError> {
        source.fetch(url, self.start, self.end).await
    }

    pub async fn next<M: MetadataSource>(
        &mut self,
        source: &M,
        url: &str,
    ) -> Result<SearchResultPage, SessionError> {
        self.advance();
        self.fetch_current(source, url).await
    }

    pub async fn previous<M: MetadataSource>(
        &mut self,
        source: &M,
        url: &str,
    ) -> Result<SearchResultPage, SessionError> {
        self.retreat();
        self.fetch_current(source, url).await
    }
}

/// Display labels for a page: 1-based ordinal prefix plus the title with
/// newlines collapsed. Ordinals are zero-padded to two digits when the page
/// holds fewer than ten entries so single-digit pages still align. The
/// prefix is display-only and must be stripped before hashing.
pub fn annotate_titles(entries: &[VideoEntry]) -> Vec<String> {
    let pad = entries.len() < 10;
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let ordinal = i + 1;
            let title = entry.title.replace('\n', " ");
            if pad && ordinal < 10 {
                format!("0{ordinal} {title}")
            } else {
                format!("{ordinal} {title}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> VideoEntry {
        serde_json::from_value(serde_json::json!({ "id": "x", "title": title })).unwrap()
    }

    #[test]
    fn test_window_invariant_over_navigation() {
        let mut pager = PaginationController::new(30);
        for step in 0..20 {
            if step % 3 == 0 {
                pager.retreat();
            } else {
                pager.advance();
            }
            let (start, end) = pager.window();
            assert!(start >= 1);
            assert_eq!(end - start, 29);
        }
    }

    #[test]
    fn test_previous_at_first_page_is_a_floor() {
        let mut pager = PaginationController::new(30);
        pager.retreat();
        assert_eq!(pager.window(), (1, 30));
        pager.retreat();
        assert_eq!(pager.window(), (1, 30));
    }

    #[test]
    fn test_next_twice_then_previous() {
        let mut pager = PaginationController::new(30);
        pager.advance();
        pager.advance();
        assert_eq!(pager.window(), (61, 90));
        pager.retreat();
        assert_eq!(pager.window(), (31, 60));
    }

    #[test]
    fn test_short_page_ordinals_are_zero_padded() {
        let entries: Vec<VideoEntry> = (0..5).map(|i| entry(&format!("Video {i}"))).collect();
        let labels = annotate_titles(&entries);
        assert_eq!(labels[0], "01 Video 0");
        assert_eq!(labels[4], "05 Video 4");
    }

    #[test]
    fn test_full_page_ordinals_are_plain() {
        let entries: Vec<VideoEntry> = (0..12).map(|i| entry(&format!("Video {i}"))).collect();
        let labels = annotate_titles(&entries);
        assert_eq!(labels[0], "1 Video 0");
        assert_eq!(labels[11], "12 Video 11");
    }

    #[test]
    fn test_annotation_collapses_newlines() {
        let labels = annotate_titles(&[entry("Two\nLines")]);
        assert_eq!(labels[0], "01 Two Lines");
    }
}
