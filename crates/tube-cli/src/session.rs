//! Session wiring: the top-level menu, the search flow, and the browse
//! loop over fetched pages.
//!
//! Everything the components need travels through this context — there is
//! no ambient mutable state. The loop is sequential: metadata fetches,
//! selector invocations, and playback block one at a time; only the
//! thumbnail batch and download jobs run detached.

use std::io::Write as _;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;
use tube_core::config::Config;
use tube_core::model::SearchResultPage;

use crate::actions::{self, Downloader, MenuOutcome};
use crate::error::SessionError;
use crate::metadata::MetadataSource;
use crate::pagination::{annotate_titles, PaginationController};
use crate::player::Player;
use crate::preview::PreviewCache;
use crate::search::{build_query_url, parse_recall, split_filter, SearchHistory};
use crate::selector::{parse_list_selection, ListCommand, Selector};

/// The materialized browse position: window controller, current page, and
/// whether previews need regenerating on the next draw.
pub struct BrowseState {
    pub pager: PaginationController,
    pub page: SearchResultPage,
    pub previews_stale: bool,
}

pub fn clear_screen() {
    print!("\x1bc");
    let _ = std::io::stdout().flush();
}

/// Transient stderr notification, held long enough to read.
pub async fn notify(config: &Config, message: &str) {
    eprintln!("\x1b[94m[Info]\x1b[0m {message}");
    tokio::time::sleep(Duration::from_secs(config.notification_duration)).await;
}

pub struct Session<M, S, P> {
    config: Config,
    source: M,
    selector: S,
    player: P,
    downloader: Downloader,
    cache: PreviewCache,
    history: SearchHistory,
}

impl<M: MetadataSource, S: Selector, P: Player> Session<M, S, P> {
    pub fn new(
        config: Config,
        source: M,
        selector: S,
        player: P,
        downloader: Downloader,
        cache: PreviewCache,
        history: SearchHistory,
    ) -> Self {
        Self {
            config,
            source,
            selector,
            player,
            downloader,
            cache,
            history,
        }
    }

    /// Top-level menu loop. An initial search term (from `--search`) skips
    /// the menu once, then the session continues normally.
    pub async fn run(mut self, initial_search: Option<String>) -> anyhow::Result<()> {
        let mut pending_search = initial_search;
        loop {
            clear_screen();
            let outcome = if let Some(term) = pending_search.take() {
                self.search_flow(Some(term)).await?
            } else {
                let options: Vec<String> = ["Search", "Edit Config", "Exit"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                let selection = self
                    .selector
                    .choose(&options, "Select Action", false)
                    .await?;
                match selection.as_str() {
                    "Search" => self.search_flow(None).await?,
                    "Edit Config" => {
                        self.edit_config().await;
                        MenuOutcome::Back
                    }
                    "Exit" => MenuOutcome::Exit,
                    _ => MenuOutcome::Back,
                }
            };
            if outcome == MenuOutcome::Exit {
                break;
            }
        }
        clear_screen();
        Ok(())
    }

    async fn search_flow(&mut self, term: Option<String>) -> Result<MenuOutcome, SessionError> {
        clear_screen();
        let raw = match term {
            Some(t) => t,
            None => {
                let hint = self
                    .config
                    .search_history
                    .then(|| self.history.hint())
                    .flatten();
                self.selector
                    .input("Enter term to search for", hint.as_deref())
                    .await?
            }
        };
        let raw = raw.trim().to_string();
        if raw.is_empty() {
            return Ok(MenuOutcome::Back);
        }

        // `!<n>` recalls from history; with nothing recorded yet the input
        // is searched literally.
        let term = match parse_recall(&raw) {
            Some(n) => self.history.recall(n).map(str::to_string).unwrap_or(raw),
            None => raw,
        };

        let (filter, literal) = split_filter(&term);
        if self.config.search_history {
            self.history.record(&literal);
        }
        let url = build_query_url(&literal, filter);

        let mut pager = PaginationController::new(self.config.no_of_search_results);
        let page = match pager.fetch_current(&self.source, &url).await {
            Ok(page) => page,
            Err(e) => {
                self.notify_fetch_error(&e).await;
                return Ok(MenuOutcome::Back);
            }
        };

        let mut state = BrowseState {
            pager,
            page,
            previews_stale: true,
        };
        self.browse(&mut state).await
    }

    async fn browse(&mut self, state: &mut BrowseState) -> Result<MenuOutcome, SessionError> {
        loop {
            if state.page.entries.is_empty() {
                break;
            }

            let preview = self.config.enable_preview && self.selector.supports_preview();
            if preview && state.previews_stale {
                self.cache.populate(&state.page, Utc::now().timestamp());
                state.previews_stale = false;
            }

            let mut options = annotate_titles(&state.page.entries);
            options.extend(["Next", "Previous", "Back", "Exit"].iter().map(|s| s.to_string()));
            let selection = self.selector.choose(&options, "select video", preview).await?;
            clear_screen();

            let Some(command) = parse_list_selection(&selection, state.page.entries.len()) else {
                continue;
            };
            match command {
                ListCommand::Back => break,
                ListCommand::Exit => return Ok(MenuOutcome::Exit),
                ListCommand::Next => {
                    let url = state.page.query_url.clone();
                    match state.pager.next(&self.source, &url).await {
                        Ok(page) => {
                            state.page = page;
                            state.previews_stale = true;
                        }
                        Err(e) => {
                            self.notify_fetch_error(&e).await;
                            break;
                        }
                    }
                }
                ListCommand::Previous => {
                    let url = state.page.query_url.clone();
                    match state.pager.previous(&self.source, &url).await {
                        Ok(page) => {
                            state.page = page;
                            state.previews_stale = true;
                        }
                        Err(e) => {
                            self.notify_fetch_error(&e).await;
                            break;
                        }
                    }
                }
                ListCommand::Entry(index) => {
                    let outcome = actions::run_menu(
                        &self.source,
                        &self.selector,
                        &self.player,
                        &self.downloader,
                        &mut self.config,
                        state,
                        index,
                    )
                    .await?;
                    if outcome == MenuOutcome::Exit {
                        return Ok(MenuOutcome::Exit);
                    }
                }
            }
        }
        Ok(MenuOutcome::Back)
    }

    async fn notify_fetch_error(&self, error: &SessionError) {
        let message = match error {
            SessionError::ParseFailure => "Failed to parse API response.",
            _ => "Failed to fetch data. Check connection or update yt-dlp.",
        };
        notify(&self.config, message).await;
    }

    async fn edit_config(&mut self) {
        let path = Config::config_path();
        let result = tokio::process::Command::new(&self.config.editor)
            .arg(&path)
            .status()
            .await;
        if let Err(e) = result {
            warn!("could not launch editor {}: {e}", self.config.editor);
        }
        match Config::load() {
            Ok(config) => self.config = config,
            Err(e) => warn!("could not reload config: {e}"),
        }
    }
}
