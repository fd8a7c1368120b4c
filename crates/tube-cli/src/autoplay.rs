//! Autoplay engine: decides what (if anything) plays after each playback
//! ends.
//!
//! Three modes. `Off` stops after one playback. `Playlist` walks the
//! current page and crosses page boundaries through the pagination
//! controller. `Related` reseeds from a short mix listing keyed by the
//! current video's id. A failed player exit always stops the loop, no
//! matter the mode.

use tracing::info;
use tube_core::config::{AutoplayMode, Config};
use tube_core::model::VideoEntry;

use crate::error::SessionError;
use crate::metadata::MetadataSource;
use crate::player::{PlaybackOutcome, PlaybackRequest, Player};
use crate::preview::normalize_title;
use crate::session::{notify, BrowseState};

/// Size of the related/mix listing requested per advance.
const RELATED_WINDOW: u32 = 5;

pub fn related_mix_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}&list=RD{id}")
}

/// First mix entry that is not the video we just played.
pub fn next_related<'a>(current_id: &str, mix: &'a [VideoEntry]) -> Option<&'a VideoEntry> {
    mix.iter().find(|entry| entry.id != current_id)
}

/// Play the entry at `start_index`, then keep advancing per the configured
/// mode until something stops the loop. Page fetches during playlist mode
/// mutate the browse state so the list view resumes where autoplay left it.
pub async fn run_playback<M: MetadataSource, P: Player>(
    source: &M,
    player: &P,
    config: &Config,
    state: &mut BrowseState,
    start_index: usize,
) -> Result<(), SessionError> {
    let mut index = start_index;
    let Some(mut current) = state.page.entries.get(index).cloned() else {
        return Ok(());
    };

    loop {
        let title = normalize_title(&current.title);
        println!("Now playing: {title}");

        let outcome = player
            .play(&PlaybackRequest {
                url: &current.url,
                title: &title,
                audio_only: config.audio_only_mode,
                quality: &config.video_quality,
            })
            .await?;

        match outcome {
            PlaybackOutcome::Interrupted => {
                println!("\nStopping playback...");
                break;
            }
            PlaybackOutcome::Failed(code) => {
                info!("stopping autoplay on player failure ({code})");
                println!("Player exited with error. Stopping autoplay.");
                break;
            }
            PlaybackOutcome::Finished => {}
        }

        match config.autoplay_mode {
            AutoplayMode::Off => break,
            AutoplayMode::Playlist => {
                index += 1;
                if index >= state.page.entries.len() {
                    println!("End of current list. Fetching next page...");
                    let url = state.page.query_url.clone();
                    match state.pager.next(source, &url).await {
                        Ok(page) if !page.is_empty() => {
                            state.page = page;
                            state.previews_stale = true;
                            index = 0;
                        }
                        _ => break,
                    }
                }
                current = state.page.entries[index].clone();
            }
            AutoplayMode::Related => {
                println!("Fetching related video...");
                match source.fetch(&related_mix_url(&current.id), 1, RELATED_WINDOW).await {
                    Ok(mix) => match next_related(&current.id, &mix.entries) {
                        Some(next) => current = next.clone(),
                        None => {
                            notify(config, "No related videos found.").await;
                            break;
                        }
                    },
                    Err(_) => {
                        notify(config, "Failed to fetch related videos.").await;
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}
