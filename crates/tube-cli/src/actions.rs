//! Action menu over a selected video: watch, toggle preferences, download.
//!
//! Menu labels carry the current toggle state and the menu re-renders after
//! every toggle. Selections map back to commands by exact label equality,
//! never by substring.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};
use tube_core::config::Config;
use tube_core::model::VideoEntry;

use crate::autoplay;
use crate::error::SessionError;
use crate::metadata::MetadataSource;
use crate::player::{format_selection, Player};
use crate::preview::normalize_title;
use crate::selector::Selector;
use crate::session::{clear_screen, notify, BrowseState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Watch,
    ToggleAudioOnly,
    ToggleAutoplay,
    Download,
    Back,
    Exit,
}

/// How a menu (or the whole browse flow) was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Back,
    Exit,
}

fn menu_items(config: &Config) -> Vec<(MenuCommand, String)> {
    let audio_state = if config.audio_only_mode { "[x]" } else { "[ ]" };
    vec![
        (MenuCommand::Watch, "Watch".to_string()),
        (
            MenuCommand::ToggleAudioOnly,
            format!("Toggle Audio Only {audio_state}"),
        ),
        (
            MenuCommand::ToggleAutoplay,
            format!("Toggle Autoplay {}", config.autoplay_mode.label()),
        ),
        (MenuCommand::Download, "Download".to_string()),
        (MenuCommand::Back, "Back".to_string()),
        (MenuCommand::Exit, "Exit".to_string()),
    ]
}

fn command_for(items: &[(MenuCommand, String)], selection: &str) -> Option<MenuCommand> {
    if selection.is_empty() {
        return Some(MenuCommand::Back);
    }
    items
        .iter()
        .find(|(_, label)| label == selection)
        .map(|(command, _)| *command)
}

/// Run the per-video action menu until the user backs out or exits.
pub async fn run_menu<M: MetadataSource, S: Selector, P: Player>(
    source: &M,
    selector: &S,
    player: &P,
    downloader: &Downloader,
    config: &mut Config,
    state: &mut BrowseState,
    index: usize,
) -> Result<MenuOutcome, SessionError> {
    loop {
        let items = menu_items(config);
        let labels: Vec<String> = items.iter().map(|(_, label)| label.clone()).collect();
        let selection = selector
            .choose(&labels, "Select Media Action", false)
            .await?;
        clear_screen();

        let Some(command) = command_for(&items, &selection) else {
            continue;
        };
        match command {
            MenuCommand::Back => return Ok(MenuOutcome::Back),
            MenuCommand::Exit => return Ok(MenuOutcome::Exit),
            MenuCommand::ToggleAudioOnly => {
                config.audio_only_mode = !config.audio_only_mode;
                persist(config);
            }
            MenuCommand::ToggleAutoplay => {
                config.autoplay_mode = config.autoplay_mode.cycled();
                persist(config);
            }
            MenuCommand::Watch => {
                autoplay::run_playback(source, player, config, state, index).await?;
                return Ok(MenuOutcome::Back);
            }
            MenuCommand::Download => {
                let Some(entry) = state.page.entries.get(index) else {
                    return Ok(MenuOutcome::Back);
                };
                downloader.start(config, entry);
                let title = normalize_title(&entry.title);
                notify(config, &format!("Started downloading {title}")).await;
            }
        }
    }
}

fn persist(config: &Config) {
    if let Err(e) = config.save() {
        warn!("could not save config: {e}");
    }
}

/// Detached yt-dlp download job. Fire-and-forget by design: the caller is
/// told the download started, never that it finished or failed, and the
/// child's exit status is never observed.
pub struct Downloader {
    binary: PathBuf,
    cookie_browser: Option<String>,
}

impl Downloader {
    pub fn new(binary: PathBuf, cookie_browser: Option<String>) -> Self {
        Self {
            binary,
            cookie_browser,
        }
    }

    pub fn start(&self, config: &Config, entry: &VideoEntry) {
        let (output_template, format_args) = build_download_args(config);
        let mut cmd = Command::new(&self.binary);
        cmd.arg(&entry.url)
            .arg("--output")
            .arg(&output_template)
            .args(&format_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(browser) = &self.cookie_browser {
            cmd.arg("--cookies-from-browser").arg(browser);
        }

        match cmd.spawn() {
            Ok(child) => {
                info!(
                    "download started for {} -> {}",
                    entry.url,
                    output_template.display()
                );
                // Dropping the handle detaches the job; the runtime reaps it.
                drop(child);
            }
            Err(e) => warn!("could not start download for {}: {e}", entry.url),
        }
    }
}

/// Output template and format arguments for a download. Uses the same
/// format-selection expression as playback so both paths resolve the same
/// streams.
fn build_download_args(config: &Config) -> (PathBuf, Vec<String>) {
    let folder = if config.audio_only_mode {
        "audio"
    } else {
        "videos"
    };
    let output_template = config
        .download_directory
        .join(folder)
        .join("individual")
        .join("%(channel)s")
        .join("%(title)s.%(ext)s");

    let format_args = if config.audio_only_mode {
        vec![
            "-x".to_string(),
            "-f".to_string(),
            "bestaudio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
        ]
    } else {
        match format_selection(&config.video_quality) {
            Some(expr) => vec!["-f".to_string(), expr],
            None => Vec::new(),
        }
    };

    (output_template, format_args)
}
