//! Search orchestration: time-filter tokens, query url construction, and
//! the bounded recency-ordered search history.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

pub const HISTORY_CAP: usize = 10;

/// Upload-time filter, carried as an opaque `sp` parameter on the query
/// url. The constants come from the provider's own result-filter encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    /// All time, video results only.
    #[default]
    AllTime,
    Hour,
    Today,
    Week,
    Month,
    Year,
}

impl TimeFilter {
    pub fn sp_param(self) -> &'static str {
        match self {
            TimeFilter::AllTime => "EgIQAQ%253D%253D",
            TimeFilter::Hour => "EgIIAQ%253D%253D",
            TimeFilter::Today => "EgIIAg%253D%253D",
            TimeFilter::Week => "EgIIAw%253D%253D",
            TimeFilter::Month => "EgIIBA%253D%253D",
            TimeFilter::Year => "EgIIBQ%253D%253D",
        }
    }

    fn from_token(token: &str) -> Self {
        match token {
            ":hour" => TimeFilter::Hour,
            ":today" => TimeFilter::Today,
            ":week" => TimeFilter::Week,
            ":month" => TimeFilter::Month,
            ":year" => TimeFilter::Year,
            _ => TimeFilter::AllTime,
        }
    }
}

/// Split an optional leading `:token` off the raw query. Unrecognized
/// tokens are consumed and fall back to the default filter; a token with
/// no following term is left in the query as literal text.
pub fn split_filter(raw: &str) -> (TimeFilter, String) {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN.get_or_init(|| Regex::new(r"^(:[a-z]+)\s+(.+)$").unwrap());
    match re.captures(raw) {
        Some(caps) => (
            TimeFilter::from_token(&caps[1]),
            caps[2].trim().to_string(),
        ),
        None => (TimeFilter::AllTime, raw.trim().to_string()),
    }
}

pub fn build_query_url(term: &str, filter: TimeFilter) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}&sp={}",
        urlencoding::encode(term),
        filter.sp_param()
    )
}

/// `!<n>` recall syntax: n-th most recent history entry, 1 = most recent.
pub fn parse_recall(input: &str) -> Option<usize> {
    static RECALL: OnceLock<Regex> = OnceLock::new();
    let re = RECALL.get_or_init(|| Regex::new(r"^!([0-9]{1,2})$").unwrap());
    let n: usize = re.captures(input)?[1].parse().ok()?;
    (1..=HISTORY_CAP).contains(&n).then_some(n)
}

/// Past query terms, most-recent-last, deduplicated, capped at
/// [`HISTORY_CAP`]. Persisted one term per line.
pub struct SearchHistory {
    path: PathBuf,
    terms: Vec<String>,
}

impl SearchHistory {
    pub fn load(path: PathBuf) -> Self {
        let terms = std::fs::read_to_string(&path)
            .map(|content| {
                content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Self { path, terms }
    }

    /// The n-th most recent term (1 = most recent).
    pub fn recall(&self, n: usize) -> Option<&str> {
        if n == 0 {
            return None;
        }
        self.terms
            .len()
            .checked_sub(n)
            .map(|idx| self.terms[idx].as_str())
    }

    /// Record a successful literal search: drop any identical entry, append
    /// at the recent end, truncate oldest-first to the cap, persist.
    pub fn record(&mut self, term: &str) {
        self.terms.retain(|t| t != term);
        self.terms.push(term.to_string());
        if self.terms.len() > HISTORY_CAP {
            let excess = self.terms.len() - HISTORY_CAP;
            self.terms.drain(..excess);
        }
        self.save();
    }

    fn save(&self) {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let body = self.terms.join("\n") + "\n";
        if let Err(e) = std::fs::write(&self.path, body) {
            warn!("could not save search history: {e}");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Hint block for the search prompt: most-recent-first, numbered to
    /// match the `!<n>` recall syntax.
    pub fn hint(&self) -> Option<String> {
        if self.terms.is_empty() {
            return None;
        }
        let listed: Vec<String> = self
            .terms
            .iter()
            .rev()
            .enumerate()
            .map(|(i, term)| format!("{}. {}", i + 1, term))
            .collect();
        Some(format!(
            "Search history:\n{}\n(Enter !<n> to select from history. Example: !1)",
            listed.join("\n")
        ))
    }

    #[cfg(test)]
    fn terms(&self) -> &[String] {
        &self.terms
    }
}
