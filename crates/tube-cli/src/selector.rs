//! Selector port: presents a list of lines and returns the user's choice.
//!
//! Backed by fzf or rofi as an external process. Selections come back as
//! the chosen line verbatim; `parse_list_selection` turns them into typed
//! commands so nothing downstream matches on label substrings.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::warn;

use crate::error::SessionError;

/// Port for the interactive picker and the free-text prompt.
pub trait Selector {
    /// Returns the chosen line verbatim, or an empty string on cancel.
    fn choose(
        &self,
        options: &[String],
        prompt: &str,
        preview: bool,
    ) -> impl std::future::Future<Output = Result<String, SessionError>>;

    /// Free-text input with an optional hint block shown alongside.
    fn input(
        &self,
        prompt: &str,
        hint: Option<&str>,
    ) -> impl std::future::Future<Output = Result<String, SessionError>>;

    /// Whether this backend can drive a preview pane.
    fn supports_preview(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Fzf,
    Rofi,
}

impl SelectorKind {
    pub fn from_config(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "rofi" => SelectorKind::Rofi,
            _ => SelectorKind::Fzf,
        }
    }
}

pub struct ProcessSelector {
    kind: SelectorKind,
    binary: PathBuf,
}

impl ProcessSelector {
    pub fn new(kind: SelectorKind, binary: PathBuf) -> Self {
        Self { kind, binary }
    }

    async fn choose_fzf(
        &self,
        options: &[String],
        prompt: &str,
        preview: bool,
    ) -> Result<String, SessionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--info=hidden")
            .arg("--layout=reverse")
            .arg("--height=100%")
            .arg(format!("--prompt={prompt}: "))
            .arg("--header-first")
            .arg("--header=")
            .arg("--exact")
            .arg("--cycle")
            .arg("--ansi");
        if preview {
            let exe = std::env::current_exe()?;
            cmd.arg("--preview-window=left,35%,wrap")
                .arg("--bind=right:accept")
                .arg("--expect=shift-left,shift-right")
                .arg("--tabstop=1")
                .arg(format!("--preview={} --preview-artifact {{}}", exe.display()));
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(options.join("\n").as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<&str> = stdout.lines().collect();
        // With --expect the first output line is the key pressed.
        let selection = if preview && lines.len() >= 2 {
            lines[1]
        } else {
            lines.first().copied().unwrap_or("")
        };
        Ok(selection.to_string())
    }

    async fn choose_rofi(&self, options: &[String], prompt: &str) -> Result<String, SessionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-sort")
            .arg("-matching")
            .arg("fuzzy")
            .arg("-dmenu")
            .arg("-i")
            .arg("-p")
            .arg("")
            .arg("-mesg")
            .arg(prompt)
            .arg("-sorting-method")
            .arg("fzf")
            .arg("-width")
            .arg("1500")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            let clean: Vec<String> = options.iter().map(|o| strip_ansi(o)).collect();
            stdin.write_all(clean.join("\n").as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        let selection = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if selection.is_empty() {
            Ok("Exit".to_string())
        } else {
            Ok(selection)
        }
    }
}

impl Selector for ProcessSelector {
    async fn choose(
        &self,
        options: &[String],
        prompt: &str,
        preview: bool,
    ) -> Result<String, SessionError> {
        match self.kind {
            SelectorKind::Fzf => self.choose_fzf(options, prompt, preview).await,
            SelectorKind::Rofi => self.choose_rofi(options, prompt).await,
        }
    }

    async fn input(&self, prompt: &str, hint: Option<&str>) -> Result<String, SessionError> {
        if self.kind == SelectorKind::Rofi {
            let mut cmd = Command::new(&self.binary);
            cmd.arg("-dmenu").arg("-p").arg(format!("{prompt}: "));
            if let Some(hint) = hint {
                cmd.arg("-mesg").arg(hint);
            }
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit());
            let output = cmd.output().await?;
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        if let Some(hint) = hint {
            eprintln!("{hint}");
        }
        eprint!("{prompt}: ");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        if let Err(e) = reader.read_line(&mut line).await {
            warn!("stdin prompt failed: {e}");
            return Ok(String::new());
        }
        Ok(line.trim().to_string())
    }

    fn supports_preview(&self) -> bool {
        self.kind == SelectorKind::Fzf
    }
}

/// Typed rendition of a browse-list selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    Entry(usize),
    Next,
    Previous,
    Back,
    Exit,
}

/// Map the selector's verbatim line to a command. Returns `None` for lines
/// that parse to nothing actionable (the caller re-renders the list).
pub fn parse_list_selection(selection: &str, entry_count: usize) -> Option<ListCommand> {
    match selection.trim() {
        "" | "Back" => return Some(ListCommand::Back),
        "Exit" => return Some(ListCommand::Exit),
        "Next" => return Some(ListCommand::Next),
        "Previous" => return Some(ListCommand::Previous),
        _ => {}
    }
    let ordinal: usize = selection.split_whitespace().next()?.parse().ok()?;
    if ordinal >= 1 && ordinal <= entry_count {
        Some(ListCommand::Entry(ordinal - 1))
    } else {
        None
    }
}

fn strip_ansi(s: &str) -> String {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re = ANSI.get_or_init(|| Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap());
    re.replace_all(s, "").into_owned()
}
