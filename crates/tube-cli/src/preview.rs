//! Content-addressed preview cache.
//!
//! Every page entry gets a rendered text artifact keyed by the sha256 of
//! its normalized title, and (when available) a thumbnail image keyed by
//! the sha256 of the raw thumbnail url. The two namespaces are kept apart
//! by file extension under one flat cache directory.
//!
//! Text artifacts are written synchronously during `populate`; thumbnails
//! go through a scratch manifest consumed by a detached fetch task with no
//! completion signal. A reader that races the fetch sees a missing image
//! and renders a loading placeholder — absence means "still loading",
//! never "corrupt": images land via a temp-file rename.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use futures_util::StreamExt;
use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::debug;
use tube_core::model::{LiveStatus, SearchResultPage, VideoEntry};

const MAX_ARTIFACT_AGE_SECS: u64 = 24 * 60 * 60;
const DIVIDER_WIDTH: usize = 64;
const MANIFEST_NAME: &str = "pending-fetch.list";
const FETCH_CONCURRENCY: usize = 4;

pub struct PreviewCache {
    dir: PathBuf,
}

impl PreviewCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn text_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.txt"))
    }

    fn image_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.jpg"))
    }

    /// Render and store text artifacts for every entry missing one, then
    /// kick off a single detached batch fetch for the missing thumbnails.
    ///
    /// Cache write failures are logged and swallowed: previews are
    /// best-effort and must never block navigation. Requires a tokio
    /// runtime when any thumbnail needs fetching.
    pub fn populate(&self, page: &SearchResultPage, now: i64) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            debug!("cannot create preview dir {}: {e}", self.dir.display());
            return;
        }

        for entry in &page.entries {
            let key = sha256_hex(&normalize_title(&entry.title));
            let path = self.text_path(&key);
            if path.exists() {
                continue;
            }
            let image = self.image_path(&sha256_hex(entry.thumbnail_url().unwrap_or("")));
            if let Err(e) = std::fs::write(&path, render_text_artifact(entry, now, &image)) {
                debug!("preview cache write failed for {}: {e}", path.display());
            }
        }

        let pending = self.collect_pending(page);
        if let Some(manifest) = self.write_manifest(&pending) {
            tokio::spawn(run_fetch_batch(manifest));
        }
    }

    /// Thumbnail urls on the page with no cached image yet.
    fn collect_pending(&self, page: &SearchResultPage) -> Vec<(String, PathBuf)> {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for entry in &page.entries {
            let Some(url) = entry.thumbnail_url() else {
                continue;
            };
            let dest = self.image_path(&sha256_hex(url));
            if dest.exists() || !seen.insert(dest.clone()) {
                continue;
            }
            pending.push((url.to_string(), dest));
        }
        pending
    }

    /// Replace the scratch manifest with this batch's jobs. Returns the
    /// manifest path when there is anything to fetch.
    fn write_manifest(&self, pending: &[(String, PathBuf)]) -> Option<PathBuf> {
        let manifest = self.dir.join(MANIFEST_NAME);
        let _ = std::fs::remove_file(&manifest);
        if pending.is_empty() {
            return None;
        }
        let mut body = String::new();
        for (url, dest) in pending {
            body.push_str(url);
            body.push('\t');
            body.push_str(&dest.display().to_string());
            body.push('\n');
        }
        match std::fs::write(&manifest, body) {
            Ok(()) => Some(manifest),
            Err(e) => {
                debug!("manifest write failed: {e}");
                None
            }
        }
    }

    /// Render the preview for one selector line: strip the ordinal, hash
    /// the normalized title, and read the stored artifact. The image line
    /// is resolved at read time (the fetch may still be in flight) and
    /// divider lines are refit to the preview pane width.
    pub fn render_for_line(&self, line: &str) -> String {
        let key = sha256_hex(&normalize_title(line));
        let Ok(content) = std::fs::read_to_string(self.text_path(&key)) else {
            return "Loading Preview...".to_string();
        };

        let width = std::env::var("FZF_PREVIEW_COLUMNS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&w| w > 0)
            .unwrap_or(DIVIDER_WIDTH);

        let mut out = String::new();
        for (i, line) in content.lines().enumerate() {
            if i == 0 {
                if Path::new(line).exists() {
                    out.push_str(line);
                } else {
                    out.push_str("loading preview image...");
                }
            } else if is_divider(line) {
                out.push_str(&"─".repeat(width));
            } else {
                out.push_str(line);
            }
            out.push('\n');
        }
        out
    }

    /// Remove artifacts older than 24 hours. Best-effort: every failure is
    /// ignored so a corrupt cache can never block the session.
    pub fn sweep(&self) {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return;
        };
        let now = std::time::SystemTime::now();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_artifact = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("jpg")
            );
            if !is_artifact {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            if let Ok(age) = now.duration_since(modified) {
                if age.as_secs() > MAX_ARTIFACT_AGE_SECS {
                    let _ = std::fs::remove_file(&path);
                }
            }
        }
    }
}

/// Consume the manifest and fetch each thumbnail, bounded concurrency,
/// temp-file-then-rename per image. Unsupervised by design: no retry, no
/// completion signal, failures logged at debug and dropped.
async fn run_fetch_batch(manifest: PathBuf) {
    let Ok(body) = tokio::fs::read_to_string(&manifest).await else {
        return;
    };
    let _ = tokio::fs::remove_file(&manifest).await;

    let jobs: Vec<(String, PathBuf)> = body
        .lines()
        .filter_map(|line| line.split_once('\t'))
        .map(|(url, dest)| (url.to_string(), PathBuf::from(dest)))
        .collect();
    if jobs.is_empty() {
        return;
    }

    let Ok(client) = reqwest::Client::builder().build() else {
        return;
    };
    futures_util::stream::iter(jobs)
        .for_each_concurrent(FETCH_CONCURRENCY, |(url, dest)| {
            let client = client.clone();
            async move {
                if let Err(e) = fetch_one(&client, &url, &dest).await {
                    debug!("thumbnail fetch failed for {url}: {e}");
                }
            }
        })
        .await;
}

async fn fetch_one(client: &reqwest::Client, url: &str, dest: &Path) -> anyhow::Result<()> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("thumbnail fetch returned status: {}", response.status());
    }
    let bytes = response.bytes().await?;
    let tmp = PathBuf::from(format!("{}.part", dest.display()));
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, dest).await?;
    Ok(())
}

/// Title normalization shared by artifact writes and preview reads: strip
/// the leading list ordinal, collapse newlines. Two titles differing only
/// by ordinal or embedded newlines share one artifact.
pub fn normalize_title(raw: &str) -> String {
    static ORDINAL: OnceLock<Regex> = OnceLock::new();
    let re = ORDINAL.get_or_init(|| Regex::new(r"^[0-9]+ ").unwrap());
    re.replace(raw, "").replace('\n', " ")
}

pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

fn render_text_artifact(entry: &VideoEntry, now: i64, image_path: &Path) -> String {
    let divider = "─".repeat(DIVIDER_WIDTH);
    let title = normalize_title(&entry.title);
    let uploaded = entry
        .timestamp
        .map(|ts| relative_time(now - ts))
        .unwrap_or_default();
    let live = match entry.live_status() {
        LiveStatus::IsLive => "Online",
        LiveStatus::WasLive => "Offline",
        LiveStatus::NotLive => "False",
    };

    let mut out = format!(
        "{image}\n{divider}\n{title}\n{divider}\n\
         Channel: {channel}\n\
         Duration: {duration}\n\
         View Count: {views} views\n\
         Live Status: {live}\n\
         Uploaded: {uploaded}\n\
         {divider}\n",
        image = image_path.display(),
        channel = entry.channel,
        duration = format_duration(entry.duration),
        views = format_view_count(entry.view_count),
    );

    if let Some(description) = entry.description.as_deref() {
        if description != "null" && !description.is_empty() {
            out.push_str(&description.replace(['\n', '\r'], " "));
            out.push('\n');
        }
    }
    out
}

fn format_duration(duration: Option<f64>) -> String {
    match duration {
        Some(d) if d >= 3600.0 => format!("{} hours", (d / 3600.0) as u64),
        Some(d) if d >= 60.0 => format!("{} mins", (d / 60.0) as u64),
        Some(d) if d > 0.0 => format!("{} secs", d as u64),
        _ => "Unknown".to_string(),
    }
}

fn format_view_count(count: Option<u64>) -> String {
    match count {
        Some(n) => group_thousands(n),
        None => "Unknown".to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Bucketed relative time: integer division, no rounding up.
fn relative_time(delta: i64) -> String {
    if delta < 60 {
        "just now".to_string()
    } else if delta < 3_600 {
        format!("{} minutes ago", delta / 60)
    } else if delta < 86_400 {
        format!("{} hours ago", delta / 3_600)
    } else if delta < 604_800 {
        format!("{} days ago", delta / 86_400)
    } else if delta < 2_635_200 {
        format!("{} weeks ago", delta / 604_800)
    } else if delta < 31_622_400 {
        format!("{} months ago", delta / 2_635_200)
    } else {
        format!("{} years ago", delta / 31_622_400)
    }
}

fn is_divider(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c == '─')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(json: serde_json::Value) -> VideoEntry {
        serde_json::from_value(json).unwrap()
    }

    fn page(entries: Vec<VideoEntry>) -> SearchResultPage {
        SearchResultPage {
            entries,
            start: 1,
            end: 30,
            query_url: "https://example.com/q".to_string(),
        }
    }

    #[test]
    fn test_normalization_strips_ordinal_and_newlines() {
        assert_eq!(normalize_title("01 Song A"), "Song A");
        assert_eq!(normalize_title("17 Song A"), "Song A");
        assert_eq!(normalize_title("Song\nA"), "Song A");
        // Only a leading ordinal is stripped, not numbers inside the title.
        assert_eq!(normalize_title("Top 10 Songs"), "Top 10 Songs");
    }

    #[test]
    fn test_hashing_is_normalization_stable() {
        let a = sha256_hex(&normalize_title("01 Song A"));
        let b = sha256_hex(&normalize_title("17 Song A"));
        let c = sha256_hex(&normalize_title("Song\nA"));
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, sha256_hex(&normalize_title("Song B")));
    }

    #[test]
    fn test_shared_normalized_title_shares_one_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());
        let page = page(vec![
            entry(serde_json::json!({ "id": "a", "title": "01 Song A" })),
            entry(serde_json::json!({ "id": "b", "title": "17 Song A" })),
        ]);
        cache.populate(&page, 1_700_000_000);

        let artifacts: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|x| x == "txt"))
            .collect();
        assert_eq!(artifacts.len(), 1);
    }

    #[test]
    fn test_relative_time_buckets() {
        assert_eq!(relative_time(5), "just now");
        assert_eq!(relative_time(59), "just now");
        assert_eq!(relative_time(60), "1 minutes ago");
        assert_eq!(relative_time(5_000), "1 hours ago");
        assert_eq!(relative_time(90_000), "1 days ago");
        assert_eq!(relative_time(700_000), "1 weeks ago");
        assert_eq!(relative_time(3_000_000), "1 months ago");
        assert_eq!(relative_time(32_000_000), "1 years ago");
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(Some(45.0)), "45 secs");
        assert_eq!(format_duration(Some(300.0)), "5 mins");
        assert_eq!(format_duration(Some(7_500.0)), "2 hours");
        assert_eq!(format_duration(None), "Unknown");
        assert_eq!(format_duration(Some(0.0)), "Unknown");
    }

    #[test]
    fn test_view_count_grouping() {
        assert_eq!(format_view_count(Some(7)), "7");
        assert_eq!(format_view_count(Some(1_234)), "1,234");
        assert_eq!(format_view_count(Some(1_234_567)), "1,234,567");
        assert_eq!(format_view_count(None), "Unknown");
    }

    #[test]
    fn test_artifact_line_order() {
        let e = entry(serde_json::json!({
            "id": "a",
            "title": "03 A Video",
            "channel": "A Channel",
            "duration": 300.0,
            "view_count": 1234u64,
            "live_status": "was_live",
            "timestamp": 1_699_995_000i64,
            "description": "about the video",
        }));
        let body = render_text_artifact(&e, 1_700_000_000, Path::new("/cache/abc.jpg"));
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "/cache/abc.jpg");
        assert!(is_divider(lines[1]));
        assert_eq!(lines[2], "A Video");
        assert!(is_divider(lines[3]));
        assert_eq!(lines[4], "Channel: A Channel");
        assert_eq!(lines[5], "Duration: 5 mins");
        assert_eq!(lines[6], "View Count: 1,234 views");
        assert_eq!(lines[7], "Live Status: Offline");
        assert_eq!(lines[8], "Uploaded: 1 hours ago");
        assert!(is_divider(lines[9]));
        assert_eq!(lines[10], "about the video");
    }

    #[test]
    fn test_null_description_is_omitted() {
        let e = entry(serde_json::json!({ "id": "a", "title": "T", "description": "null" }));
        let body = render_text_artifact(&e, 0, Path::new("/x.jpg"));
        assert!(is_divider(body.lines().last().unwrap()));
    }

    #[test]
    fn test_render_for_line_miss_is_loading() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());
        assert_eq!(cache.render_for_line("01 Nothing Here"), "Loading Preview...");
    }

    #[test]
    fn test_render_substitutes_missing_image() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());
        let page = page(vec![entry(serde_json::json!({ "id": "a", "title": "A Video" }))]);
        cache.populate(&page, 0);

        let rendered = cache.render_for_line("02 A Video");
        assert!(rendered.starts_with("loading preview image..."));
        assert!(rendered.contains("A Video"));
    }

    #[test]
    fn test_collect_pending_skips_cached_and_duplicates() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());

        let cached_url = "https://img.example/cached.jpg";
        std::fs::write(cache.image_path(&sha256_hex(cached_url)), b"jpg").unwrap();

        let page = page(vec![
            entry(serde_json::json!({ "id": "a", "title": "A", "thumbnails": [{"url": cached_url}] })),
            entry(serde_json::json!({ "id": "b", "title": "B", "thumbnails": [{"url": "https://img.example/new.jpg"}] })),
            entry(serde_json::json!({ "id": "c", "title": "C", "thumbnails": [{"url": "https://img.example/new.jpg"}] })),
            entry(serde_json::json!({ "id": "d", "title": "D" })),
        ]);
        let pending = cache.collect_pending(&page);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].0, "https://img.example/new.jpg");
    }

    #[test]
    fn test_manifest_written_and_replaced() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());
        let dest = cache.image_path("aa");
        let manifest = cache
            .write_manifest(&[("https://img.example/a.jpg".to_string(), dest.clone())])
            .unwrap();
        let body = std::fs::read_to_string(&manifest).unwrap();
        assert_eq!(
            body,
            format!("https://img.example/a.jpg\t{}\n", dest.display())
        );

        // An empty batch clears the scratch file.
        assert!(cache.write_manifest(&[]).is_none());
        assert!(!manifest.exists());
    }

    #[test]
    fn test_sweep_removes_only_stale_artifacts() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());
        let two_days_ago =
            std::time::SystemTime::now() - std::time::Duration::from_secs(2 * 24 * 60 * 60);

        let stale = cache.text_path("cafe");
        std::fs::write(&stale, "old artifact").unwrap();
        let file = std::fs::File::options().write(true).open(&stale).unwrap();
        file.set_modified(two_days_ago).unwrap();
        drop(file);

        // Non-artifact files are never the sweep's business, however old.
        let scratch = dir.path().join(MANIFEST_NAME);
        std::fs::write(&scratch, "job").unwrap();
        let file = std::fs::File::options().write(true).open(&scratch).unwrap();
        file.set_modified(two_days_ago).unwrap();
        drop(file);

        cache.sweep();
        assert!(!stale.exists());
        assert!(scratch.exists());
    }

    #[test]
    fn test_sweep_keeps_fresh_files_and_tolerates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let cache = PreviewCache::new(dir.path().to_path_buf());
        let fresh = cache.text_path("deadbeef");
        std::fs::write(&fresh, "artifact").unwrap();
        cache.sweep();
        assert!(fresh.exists());

        PreviewCache::new(dir.path().join("not-there")).sweep();
    }
}
