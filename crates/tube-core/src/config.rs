//! Settings and persistent preferences.
//!
//! The store is plain `key: value` text, one pair per line. `#` lines are
//! comments, keys are never quoted, and keys this version does not know
//! about are carried through a rewrite untouched so newer/older builds can
//! share one file.

use std::path::PathBuf;

use super::platform;

/// What plays after the current item finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoplayMode {
    #[default]
    Off,
    Playlist,
    Related,
}

impl AutoplayMode {
    /// Toggle order: off → playlist → related → off.
    pub fn cycled(self) -> Self {
        match self {
            AutoplayMode::Off => AutoplayMode::Playlist,
            AutoplayMode::Playlist => AutoplayMode::Related,
            AutoplayMode::Related => AutoplayMode::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AutoplayMode::Off => "off",
            AutoplayMode::Playlist => "playlist",
            AutoplayMode::Related => "related",
        }
    }

    /// Menu label fragment, e.g. `[Playlist]`.
    pub fn label(self) -> &'static str {
        match self {
            AutoplayMode::Off => "[Off]",
            AutoplayMode::Playlist => "[Playlist]",
            AutoplayMode::Related => "[Related]",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "playlist" => AutoplayMode::Playlist,
            "related" => AutoplayMode::Related,
            _ => AutoplayMode::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub image_renderer: String,
    pub editor: String,
    pub preferred_selector: String,
    pub video_quality: String,
    pub enable_preview: bool,
    pub player: String,
    /// Browser name for cookie passthrough (empty = none).
    pub preferred_browser: String,
    pub no_of_search_results: u32,
    pub notification_duration: u64,
    pub search_history: bool,
    pub download_directory: PathBuf,
    // Persistent preferences, mutated by the action menu toggles.
    pub audio_only_mode: bool,
    pub autoplay_mode: AutoplayMode,
    /// Keys we do not understand, preserved in file order.
    unknown: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_renderer: String::new(),
            editor: platform::default_editor(),
            preferred_selector: "fzf".to_string(),
            video_quality: "720".to_string(),
            enable_preview: false,
            player: "mpv".to_string(),
            preferred_browser: String::new(),
            no_of_search_results: 30,
            notification_duration: 5,
            search_history: true,
            download_directory: platform::default_download_dir(),
            audio_only_mode: false,
            autoplay_mode: AutoplayMode::Off,
            unknown: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let mut config = Self::default();
            config.detect_renderer();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config = Self::from_lines(&content);
        config.detect_renderer();
        config.download_directory = expand_home(&config.download_directory);
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, self.to_lines())?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join(format!("{}.conf", platform::APP_NAME))
    }

    /// Parse the `key: value` line format. Bad values fall back to defaults
    /// rather than failing the load.
    pub fn from_lines(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "image_renderer" => config.image_renderer = value.to_string(),
                "editor" => config.editor = value.to_string(),
                "preferred_selector" => config.preferred_selector = value.to_string(),
                "video_quality" => config.video_quality = value.to_string(),
                "enable_preview" => config.enable_preview = value == "true",
                "player" => config.player = value.to_string(),
                "preferred_browser" => config.preferred_browser = value.to_string(),
                "no_of_search_results" => {
                    config.no_of_search_results =
                        value.parse().unwrap_or(config.no_of_search_results).max(1)
                }
                "notification_duration" => {
                    config.notification_duration =
                        value.parse().unwrap_or(config.notification_duration)
                }
                "search_history" => config.search_history = value == "true",
                "download_directory" => config.download_directory = PathBuf::from(value),
                "audio_only_mode" => config.audio_only_mode = value == "true",
                "autoplay_mode" => config.autoplay_mode = AutoplayMode::parse(value),
                _ => config.unknown.push((key.to_string(), value.to_string())),
            }
        }
        config
    }

    pub fn to_lines(&self) -> String {
        let mut out = String::new();
        let mut push = |key: &str, value: String| {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value);
            out.push('\n');
        };
        push("image_renderer", self.image_renderer.clone());
        push("editor", self.editor.clone());
        push("preferred_selector", self.preferred_selector.clone());
        push("video_quality", self.video_quality.clone());
        push("enable_preview", self.enable_preview.to_string());
        push("player", self.player.clone());
        push("preferred_browser", self.preferred_browser.clone());
        push("no_of_search_results", self.no_of_search_results.to_string());
        push(
            "notification_duration",
            self.notification_duration.to_string(),
        );
        push("search_history", self.search_history.to_string());
        push(
            "download_directory",
            self.download_directory.display().to_string(),
        );
        push("audio_only_mode", self.audio_only_mode.to_string());
        push("autoplay_mode", self.autoplay_mode.as_str().to_string());
        for (key, value) in &self.unknown {
            push(key, value.clone());
        }
        out
    }

    /// Pick an image renderer when none is configured: kitty terminals get
    /// icat, everything else chafa.
    fn detect_renderer(&mut self) {
        if self.image_renderer.is_empty() {
            self.image_renderer = if std::env::var("KITTY_WINDOW_ID").is_ok() {
                "icat".to_string()
            } else {
                "chafa".to_string()
            };
        }
    }
}

fn expand_home(path: &PathBuf) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip() {
        let config = Config::default();
        let parsed = Config::from_lines(&config.to_lines());
        // detect_renderer only runs on load, so the raw round trip is exact.
        assert_eq!(parsed.no_of_search_results, 30);
        assert_eq!(parsed.preferred_selector, "fzf");
        assert_eq!(parsed.autoplay_mode, AutoplayMode::Off);
        assert!(!parsed.audio_only_mode);
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let config = Config::from_lines(
            "# a comment\n\nplayer: vlc\n# another: fake\nvideo_quality: 1080\n",
        );
        assert_eq!(config.player, "vlc");
        assert_eq!(config.video_quality, "1080");
    }

    #[test]
    fn test_unknown_keys_survive_rewrite() {
        let config = Config::from_lines("player: mpv\ncustom_theme: solarized\n");
        let rewritten = config.to_lines();
        assert!(rewritten.contains("custom_theme: solarized"));
        let reparsed = Config::from_lines(&rewritten);
        assert_eq!(reparsed.unknown, vec![(
            "custom_theme".to_string(),
            "solarized".to_string()
        )]);
    }

    #[test]
    fn test_bad_numeric_values_fall_back() {
        let config = Config::from_lines("no_of_search_results: lots\nnotification_duration: 2\n");
        assert_eq!(config.no_of_search_results, 30);
        assert_eq!(config.notification_duration, 2);
    }

    #[test]
    fn test_autoplay_cycle_returns_home_after_three() {
        let mode = AutoplayMode::Off;
        assert_eq!(mode.cycled().cycled().cycled(), AutoplayMode::Off);
        assert_eq!(AutoplayMode::Off.cycled(), AutoplayMode::Playlist);
        assert_eq!(AutoplayMode::Playlist.cycled(), AutoplayMode::Related);
    }

    #[test]
    fn test_values_containing_colons_parse_on_first_colon() {
        let config = Config::from_lines("download_directory: /data/my:videos\n");
        assert_eq!(config.download_directory, PathBuf::from("/data/my:videos"));
    }
}
