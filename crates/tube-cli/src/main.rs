mod actions;
mod autoplay;
mod error;
mod metadata;
mod pagination;
mod player;
mod preview;
mod search;
mod selector;
mod session;

use std::path::PathBuf;

use clap::Parser;
use tube_core::config::Config;
use tube_core::platform;

use crate::actions::Downloader;
use crate::error::SessionError;
use crate::metadata::YtDlpSource;
use crate::player::{PlayerKind, ProcessPlayer};
use crate::preview::PreviewCache;
use crate::search::SearchHistory;
use crate::selector::{ProcessSelector, SelectorKind};
use crate::session::Session;

#[derive(Parser)]
#[command(name = "tubr", version, about = "Browse youtube from the terminal")]
struct Args {
    /// Search for a video, skipping the top-level menu
    #[arg(short = 'S', long)]
    search: Option<String>,

    /// Open the config file in $EDITOR and exit
    #[arg(short = 'e', long)]
    edit_config: bool,

    /// Render the cached preview artifact for one selector line
    #[arg(long, value_name = "LINE", hide = true)]
    preview_artifact: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(line) = args.preview_artifact {
        // Invoked by the selector for every highlighted line: stay quiet
        // and fast, no logging or dependency checks.
        let cache = PreviewCache::new(platform::preview_dir());
        print!("{}", cache.render_for_line(&line));
        return Ok(());
    }

    if let Err(SessionError::MissingDependencies(missing)) = check_dependencies() {
        eprintln!("Error: Missing dependencies: {}", missing.join(", "));
        eprintln!("Please install them via your package manager.");
        std::process::exit(1);
    }

    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    std::fs::create_dir_all(platform::preview_dir())?;

    let log_path = data_dir.join("tubr.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress
    // noisy connection-level DEBUG from HTTP client internals.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("tubr log: {}", log_path.display());
    tracing::info!("tubr starting…");

    let config = Config::load().unwrap_or_default();

    if args.edit_config {
        let _ = tokio::process::Command::new(&config.editor)
            .arg(Config::config_path())
            .status()
            .await;
        return Ok(());
    }

    let cache = PreviewCache::new(platform::preview_dir());
    cache.sweep();

    let cookie_browser =
        (!config.preferred_browser.is_empty()).then(|| config.preferred_browser.clone());
    let yt_dlp = resolve_binary("yt-dlp");

    let source = YtDlpSource::new(yt_dlp.clone(), cookie_browser.clone());
    let selector_kind = SelectorKind::from_config(&config.preferred_selector);
    let selector_name = match selector_kind {
        SelectorKind::Fzf => "fzf",
        SelectorKind::Rofi => "rofi",
    };
    let selector = ProcessSelector::new(selector_kind, resolve_binary(selector_name));
    let player_kind = PlayerKind::from_config(&config.player);
    let player = ProcessPlayer::new(player_kind, resolve_binary(&config.player));
    let downloader = Downloader::new(yt_dlp, cookie_browser);
    let history = SearchHistory::load(platform::search_history_path());

    let session = Session::new(config, source, selector, player, downloader, cache, history);
    session.run(args.search).await
}

fn resolve_binary(name: &str) -> PathBuf {
    platform::find_binary(name).unwrap_or_else(|| PathBuf::from(name))
}

/// Verify every required external tool before any state is touched.
fn check_dependencies() -> Result<(), SessionError> {
    let mut missing = Vec::new();
    for tool in ["yt-dlp", "fzf"] {
        if platform::find_binary(tool).is_none() {
            missing.push(tool.to_string());
        }
    }
    if platform::find_binary("mpv").is_none() && platform::find_binary("vlc").is_none() {
        missing.push("mpv OR vlc".to_string());
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SessionError::MissingDependencies(missing))
    }
}
