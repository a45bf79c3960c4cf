//! Manifest model and writers: `manifest.json`, `manifest.csv`, `report.txt`.
//!
//! One [`ManifestEntry`] per written artifact. The JSON file wraps the
//! entries with run-level metadata; the CSV carries the same entries in flat
//! form for spreadsheets; the report is the plain-text list of skips and
//! warnings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::KbPrepError;

/// Length of the content-addressed id (a prefix of the sha256 hex digest).
pub const ID_LEN: usize = 16;

pub const MANIFEST_JSON: &str = "manifest.json";
pub const MANIFEST_CSV: &str = "manifest.csv";
pub const REPORT_TXT: &str = "report.txt";

static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

/// One written (or, in a dry run, would-be-written) artifact.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    /// `/`-separated, relative to the input root.
    pub source_path: String,
    /// `/`-separated, relative to the output root.
    pub output_path: String,
    pub source_type: String,
    pub output_type: String,
    pub redacted: bool,
    pub sha256: String,
    pub bytes: usize,
    pub chars: usize,
    pub words: usize,
    pub created_at: String,
    /// `;`-joined warning tokens, empty when clean.
    pub warnings: String,
}

/// The `manifest.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    pub source_root: String,
    pub output_root: String,
    pub redacted: bool,
    pub documents: Vec<ManifestEntry>,
}

/// Size and hash of an artifact's full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetrics {
    pub sha256: String,
    pub bytes: usize,
    pub chars: usize,
    pub words: usize,
}

impl ContentMetrics {
    pub fn measure(content: &str) -> Self {
        Self {
            sha256: content_digest(content.as_bytes()),
            bytes: content.len(),
            chars: content.chars().count(),
            words: word_count(content),
        }
    }

    /// Content-addressed id: the first [`ID_LEN`] hex characters.
    pub fn id(&self) -> String {
        self.sha256[..ID_LEN].to_string()
    }
}

/// Lowercase hex sha256 of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Number of Unicode `\w+` runs.
pub fn word_count(text: &str) -> usize {
    RE_WORD.find_iter(text).count()
}

impl Manifest {
    /// Pretty-printed UTF-8 JSON with a trailing newline.
    pub fn write_json(&self, path: &Path) -> Result<(), KbPrepError> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| manifest_err(path, e))?;
        json.push('\n');
        std::fs::write(path, json).map_err(|e| manifest_err(path, e))
    }

    /// One row per entry. With no entries only an `id` header is written.
    pub fn write_csv(&self, path: &Path) -> Result<(), KbPrepError> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| manifest_err(path, e))?;
        if self.documents.is_empty() {
            writer.write_record(["id"]).map_err(|e| manifest_err(path, e))?;
        }
        for entry in &self.documents {
            writer.serialize(entry).map_err(|e| manifest_err(path, e))?;
        }
        writer.flush().map_err(|e| manifest_err(path, e))
    }
}

/// Report lines joined with `\n` plus a trailing newline; empty file when
/// there is nothing to report.
pub fn render_report(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n").trim())
    }
}

pub fn write_report(path: &Path, lines: &[String]) -> Result<(), KbPrepError> {
    std::fs::write(path, render_report(lines)).map_err(|e| manifest_err(path, e))
}

fn manifest_err(path: &Path, e: impl std::fmt::Display) -> KbPrepError {
    KbPrepError::ManifestWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> ManifestEntry {
        ManifestEntry {
            id: id.into(),
            title: "Notes, \"brouillon\"".into(),
            source_path: "Psychologie/notes.txt".into(),
            output_path: "psychologie/notes.md".into(),
            source_type: "txt".into(),
            output_type: "md".into(),
            redacted: true,
            sha256: "ab".repeat(32),
            bytes: 120,
            chars: 118,
            words: 17,
            created_at: "2024-05-01T12:00:00+00:00".into(),
            warnings: String::new(),
        }
    }

    fn manifest(documents: Vec<ManifestEntry>) -> Manifest {
        Manifest {
            generated_at: "2024-05-01T12:00:00+00:00".into(),
            source_root: "/kb".into(),
            output_root: "/kb_clean".into(),
            redacted: true,
            documents,
        }
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            content_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn metrics_count_scalars_and_words() {
        let m = ContentMetrics::measure("Été: l'été, 2024!\n");
        assert_eq!(m.bytes, "Été: l'été, 2024!\n".len());
        assert_eq!(m.chars, 18);
        assert_eq!(m.words, 4);
        assert_eq!(m.id().len(), ID_LEN);
        assert!(m.sha256.starts_with(&m.id()));
    }

    #[test]
    fn csv_has_field_header_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_CSV);
        manifest(vec![entry("0123456789abcdef")]).write_csv(&path).unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,title,source_path,output_path,source_type,output_type,redacted,sha256,bytes,chars,words,created_at,warnings"
        );
        assert!(lines.next().unwrap().starts_with("0123456789abcdef,\"Notes, \"\"brouillon\"\"\","));
    }

    #[test]
    fn empty_csv_is_id_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_CSV);
        manifest(Vec::new()).write_csv(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n");
    }

    #[test]
    fn json_is_pretty_with_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_JSON);
        let m = manifest(vec![entry("0123456789abcdef")]);
        m.write_json(&path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("{\n  \"generated_at\""));
        assert!(raw.ends_with("}\n"));
        let back: Manifest = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn json_keeps_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_JSON);
        let mut e = entry("0123456789abcdef");
        e.title = "Épistémologie".into();
        manifest(vec![e]).write_json(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("Épistémologie"));
    }

    #[test]
    fn report_rendering() {
        assert_eq!(render_report(&[]), "");
        let lines = vec!["SKIP unsupported: a.png".to_string(), "WARN pdf b.pdf: pdf-empty".to_string()];
        assert_eq!(render_report(&lines), "SKIP unsupported: a.png\nWARN pdf b.pdf: pdf-empty\n");
    }

    #[test]
    fn unwritable_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join(REPORT_TXT);
        let err = write_report(&path, &["x".to_string()]).unwrap_err();
        assert!(matches!(err, KbPrepError::ManifestWriteFailed { .. }));
    }
}
