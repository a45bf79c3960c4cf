//! Slide-transcript conversion: tagged plaintext → hierarchical Markdown.
//!
//! Transcripts exported from the slide decks use a small set of bold,
//! bracketed tags:
//!
//! ```text
//! **[DIAPORAMA] Sémiotique**        → # Sémiotique
//! **[DIAPOSITIVE 3]**               → ## Diapositive 3
//! **[TITRE]** Le signe              → ### Le signe
//! **[TITRE]**                       → (the next non-blank line is the title)
//! **[CONTENU]** Texte libre         → Texte libre
//! ---                               → ---
//! ```
//!
//! This is a best-effort transcoder. Lines that match no tag are kept
//! verbatim, blank lines included, so nothing is lost when a transcript
//! strays from the convention.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

use crate::error::Warning;
use crate::pipeline::extract::{Extraction, Extractor, SourceType};
use crate::pipeline::normalize::normalise_line_endings;

static RE_ESCAPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([\[\]_*`\\])").unwrap());

static RE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\\?-{3,}\s*$").unwrap());

static RE_DIAPORAMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\*\*\[DIAPORAMA\]\s*(.+?)\s*\*\*$").unwrap());

static RE_DIAPOSITIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\*\*\[DIAPOSITIVE\s+(\d+)\]\*\*$").unwrap());

static RE_TITRE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\*\*\[TITRE\]\*\*\s*(.*)$").unwrap());

static RE_CONTENU: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\*\*\[CONTENU\]\*\*\s*").unwrap());

/// Whether the converter is waiting for a deferred slide title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TitleState {
    Normal,
    /// A bare `**[TITRE]**` was seen; the next non-blank untagged line is
    /// the title.
    AwaitingTitle,
}

/// Remove the backslash escaping some exporters add before Markdown
/// metacharacters (`\*\*\[TITRE\]\*\*` → `**[TITRE]**`).
pub fn unescape_light_markdown(text: &str) -> String {
    RE_ESCAPED.replace_all(text, "$1").into_owned()
}

/// Convert a tagged transcript to Markdown.
pub fn transcript_to_markdown(text: &str) -> String {
    let text = unescape_light_markdown(&normalise_line_endings(text));
    let mut out: Vec<String> = Vec::new();
    let mut state = TitleState::Normal;

    for raw in text.lines() {
        let line = raw.trim_end();

        if RE_RULE.is_match(line) {
            out.push("---".to_string());
            state = TitleState::Normal;
            continue;
        }

        if let Some(caps) = RE_DIAPORAMA.captures(line) {
            out.push(format!("# {}", caps[1].trim()));
            state = TitleState::Normal;
            continue;
        }

        if let Some(caps) = RE_DIAPOSITIVE.captures(line) {
            out.push(format!("## Diapositive {}", &caps[1]));
            state = TitleState::Normal;
            continue;
        }

        if let Some(caps) = RE_TITRE.captures(line) {
            let title = caps[1].trim();
            if title.is_empty() {
                state = TitleState::AwaitingTitle;
            } else {
                out.push(format!("### {title}"));
                state = TitleState::Normal;
            }
            continue;
        }

        if RE_CONTENU.is_match(line) {
            state = TitleState::Normal;
            let rest = RE_CONTENU.replace(line, "");
            let rest = rest.trim();
            if !rest.is_empty() {
                out.push(rest.to_string());
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.starts_with("**[") {
            // Unknown tag: kept verbatim, but it still ends a pending title.
            state = TitleState::Normal;
            out.push(line.to_string());
            continue;
        }

        match state {
            TitleState::AwaitingTitle if !trimmed.is_empty() => {
                out.push(format!("### {trimmed}"));
                state = TitleState::Normal;
            }
            _ => out.push(line.to_string()),
        }
    }

    let joined = out.join("\n");
    format!("{}\n", joined.trim())
}

/// `.txt` transcripts: lossy UTF-8, one whole-document chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptExtractor;

impl Extractor for TranscriptExtractor {
    fn source_type(&self) -> SourceType {
        SourceType::Txt
    }

    fn extract(&self, path: &Path) -> Extraction {
        match std::fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                Extraction::single(transcript_to_markdown(&text), Vec::new())
            }
            Err(e) => {
                debug!(path = %path.display(), "transcript unreadable: {e}");
                Extraction::skipped(Warning::TextReadFailed(e.to_string()))
            }
        }
    }
}
