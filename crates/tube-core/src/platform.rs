use std::path::PathBuf;

pub const APP_NAME: &str = "tubr";

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/tubr/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_NAME)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }
}

pub fn cache_dir() -> PathBuf {
    // On macOS and Linux, use ~/.cache/tubr/ (XDG standard)
    // instead of macOS ~/Library/Caches/ for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(".cache")
            .join(APP_NAME)
    }

    #[cfg(windows)]
    {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_NAME)
    }
}

pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_NAME)
    }

    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }
}

/// Flat directory holding every preview artifact (`<hex>.txt` / `<hex>.jpg`).
pub fn preview_dir() -> PathBuf {
    cache_dir().join("previews")
}

pub fn search_history_path() -> PathBuf {
    cache_dir().join("search_history.txt")
}

pub fn default_download_dir() -> PathBuf {
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Videos")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Locate a binary on PATH.
///
/// Searches in order:
/// 1. Beside current executable
/// 2. PATH
pub fn find_binary(name: &str) -> Option<PathBuf> {
    let names = candidate_names(name);

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            for candidate in names.iter().map(|n| dir.join(n)) {
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
    }

    if let Ok(path) = std::env::var("PATH") {
        #[cfg(unix)]
        let separator = ':';
        #[cfg(windows)]
        let separator = ';';

        for dir in path.split(separator) {
            for candidate in names.iter().map(|n| PathBuf::from(dir).join(n)) {
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
    }

    None
}

fn candidate_names(name: &str) -> Vec<String> {
    #[cfg(windows)]
    return vec![format!("{name}.exe"), name.to_string()];

    #[cfg(not(windows))]
    return vec![name.to_string()];
}

/// The editor used for `Edit Config`, from `$EDITOR` with a portable default.
pub fn default_editor() -> String {
    std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_end_with_app_name() {
        assert!(config_dir().ends_with(APP_NAME));
        assert!(cache_dir().ends_with(APP_NAME));
        assert!(preview_dir().ends_with("previews"));
    }

    #[test]
    fn test_find_binary_misses_nonsense() {
        assert!(find_binary("definitely-not-a-real-tool-xyz").is_none());
    }
}
