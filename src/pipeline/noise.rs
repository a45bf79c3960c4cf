//! Noise-line filter shared by the Word and PDF extractors.
//!
//! Word exports and PDF text layers leave behind table-of-contents headers,
//! unrendered `PAGEREF` field codes, "Erreur ! Signet non défini." artefacts
//! and bare page numbers. The patterns are tied to the document templates of
//! the corpus, so they live in [`NoiseRules`] (serde-loadable) rather than in
//! code.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KbPrepError;

/// A broken cross-reference artefact: the line is dropped when it contains
/// `marker` and at least one of `qualifiers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenReference {
    pub marker: String,
    pub qualifiers: Vec<String>,
}

/// Configurable patterns for [`NoiseRules::should_drop`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseRules {
    /// Case-insensitive prefixes of table-of-contents headers.
    pub toc_headers: Vec<String>,

    /// Substrings left by unrendered field codes.
    pub field_codes: Vec<String>,

    /// Field instructions matched as a whole word at the start of the line.
    pub field_instructions: Vec<String>,

    /// Broken cross-reference artefacts.
    pub broken_references: Vec<BrokenReference>,

    /// Drop lines made of 1–4 digits (page numbers).
    pub drop_page_numbers: bool,
}

impl Default for NoiseRules {
    fn default() -> Self {
        Self {
            toc_headers: vec!["table des matières".into()],
            field_codes: vec!["PAGEREF".into()],
            field_instructions: vec!["TOC".into()],
            broken_references: vec![BrokenReference {
                marker: "Erreur !".into(),
                qualifiers: vec!["Signet".into(), "signet".into()],
            }],
            drop_page_numbers: true,
        }
    }
}

static RE_PAGE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,4}$").unwrap());

impl NoiseRules {
    /// Load rules from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, KbPrepError> {
        let raw = std::fs::read_to_string(path).map_err(|e| KbPrepError::NoiseRulesInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| KbPrepError::NoiseRulesInvalid {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Whether `line` is noise. Blank lines are never noise.
    pub fn should_drop(&self, line: &str) -> bool {
        let s = line.trim();
        if s.is_empty() {
            return false;
        }

        let lower = s.to_lowercase();
        if self
            .toc_headers
            .iter()
            .any(|h| lower.starts_with(&h.to_lowercase()))
        {
            return true;
        }

        if self.field_codes.iter().any(|c| s.contains(c.as_str())) {
            return true;
        }

        if self
            .field_instructions
            .iter()
            .any(|f| starts_with_word(s, f))
        {
            return true;
        }

        if self.broken_references.iter().any(|r| {
            s.contains(r.marker.as_str()) && r.qualifiers.iter().any(|q| s.contains(q.as_str()))
        }) {
            return true;
        }

        self.drop_page_numbers && RE_PAGE_NUMBER.is_match(s)
    }

    /// Drop noise lines from a block of text, keeping line order.
    pub fn filter_lines(&self, text: &str) -> String {
        text.lines()
            .filter(|l| !self.should_drop(l))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// `word` at the start of `s`, followed by a non-word character or the end.
fn starts_with_word(s: &str, word: &str) -> bool {
    match s.strip_prefix(word) {
        Some(rest) => !rest
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_'),
        None => false,
    }
}
