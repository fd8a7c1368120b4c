//! Player port: blocking playback of one url through mpv or vlc.
//!
//! Playback blocks the session until the player process exits. A ctrl-c
//! during the wait kills only the player child; the session itself keeps
//! running and falls through to a graceful stop of the playback loop.

use std::path::PathBuf;

use tokio::process::Command;
use tracing::{info, warn};

use crate::error::SessionError;

/// How a playback attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    /// Non-zero exit status. Stops autoplay regardless of mode.
    Failed(i32),
    /// User interrupt during the blocking wait.
    Interrupted,
}

pub struct PlaybackRequest<'a> {
    pub url: &'a str,
    pub title: &'a str,
    pub audio_only: bool,
    pub quality: &'a str,
}

pub trait Player {
    fn play(
        &self,
        request: &PlaybackRequest<'_>,
    ) -> impl std::future::Future<Output = Result<PlaybackOutcome, SessionError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Mpv,
    Vlc,
}

impl PlayerKind {
    pub fn from_config(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "vlc" => PlayerKind::Vlc,
            _ => PlayerKind::Mpv,
        }
    }
}

pub struct ProcessPlayer {
    kind: PlayerKind,
    binary: PathBuf,
}

impl ProcessPlayer {
    pub fn new(kind: PlayerKind, binary: PathBuf) -> Self {
        Self { kind, binary }
    }
}

impl Player for ProcessPlayer {
    async fn play(&self, request: &PlaybackRequest<'_>) -> Result<PlaybackOutcome, SessionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(request.url);
        match self.kind {
            PlayerKind::Mpv => {
                if request.audio_only {
                    cmd.arg("--no-video").arg("--force-window=no");
                } else if let Some(expr) = format_selection(request.quality) {
                    cmd.arg(format!("--ytdl-format={expr}"));
                }
            }
            PlayerKind::Vlc => {
                cmd.arg("--video-title").arg(request.title);
                if request.audio_only {
                    cmd.arg("--no-video");
                }
            }
        }

        info!("playing {} ({})", request.title, request.url);
        let mut child = cmd.spawn()?;

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = tokio::signal::ctrl_c() => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Ok(PlaybackOutcome::Interrupted);
            }
        };

        if status.success() {
            Ok(PlaybackOutcome::Finished)
        } else {
            let code = status.code().unwrap_or(-1);
            warn!("player exited with status {code}");
            Ok(PlaybackOutcome::Failed(code))
        }
    }
}

/// Height-capped format expression shared by playback and download so both
/// paths resolve the same streams. Non-numeric quality settings mean "let
/// the source pick".
pub fn format_selection(quality: &str) -> Option<String> {
    if quality.is_empty() || !quality.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "bestvideo[height<={quality}]+bestaudio/best[height<={quality}]/best"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_quality_builds_capped_expression() {
        assert_eq!(
            format_selection("720").as_deref(),
            Some("bestvideo[height<=720]+bestaudio/best[height<=720]/best")
        );
    }

    #[test]
    fn test_non_numeric_quality_has_no_expression() {
        assert_eq!(format_selection("best"), None);
        assert_eq!(format_selection(""), None);
        assert_eq!(format_selection("720p"), None);
    }
}
