//! Error types for the kbprep library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`KbPrepError`] — **Fatal**: the run cannot proceed at all (input root
//!   missing, document list unparsable, output tree not writable). Returned
//!   as `Err(KbPrepError)` from [`crate::prepare()`] and
//!   [`crate::catalog::Catalog::load`].
//!
//! * [`Warning`] — **Non-fatal**: a single document (or a single PDF page)
//!   could not be read the way we hoped. Warnings travel with the document's
//!   chunks into the manifest and the report; the run carries on with the
//!   next document.
//!
//! Warnings render as short machine-parsable tokens (`docx-empty-output`,
//! `pdf-chunk-empty:41-80`) because downstream tooling splits the manifest's
//! `warnings` column on `;` and matches on the prefix before `:`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the kbprep library.
#[derive(Debug, Error)]
pub enum KbPrepError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input root does not exist.
    #[error("Input folder not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// The document list consumed by the cover tooling does not exist.
    #[error("Document list not found: '{path}'")]
    CatalogNotFound { path: PathBuf },

    /// The document list exists but is not the expected JSON shape.
    #[error("Document list '{path}' could not be parsed: {detail}")]
    CatalogInvalid { path: PathBuf, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialise or write one of the manifest files.
    #[error("Failed to write manifest '{path}': {detail}")]
    ManifestWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pinned generation timestamp was not RFC 3339.
    #[error("Invalid timestamp '{value}': expected RFC 3339 (e.g. 2024-05-01T12:00:00+00:00)")]
    InvalidTimestamp { value: String },

    /// The noise-rule file could not be read or parsed.
    #[error("Failed to load noise rules from '{path}': {detail}")]
    NoiseRulesInvalid { path: PathBuf, detail: String },
}

/// A non-fatal condition recorded against one document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// The `.docx` file is not a zip archive.
    #[error("not-a-zip-docx:{file}")]
    NotAZip { file: String },

    /// The archive opened but `word/document.xml` could not be read.
    #[error("docx-read-failed:{0}")]
    DocxReadFailed(String),

    /// The document body is not well-formed XML.
    #[error("docx-xml-parse-failed:{0}")]
    DocxXmlParseFailed(String),

    /// The document parsed but every paragraph was empty or noise.
    #[error("docx-empty-output")]
    DocxEmptyOutput,

    /// The pdfium library could not be bound.
    #[error("pdf-engine-unavailable")]
    PdfEngineUnavailable,

    /// pdfium refused to open the file.
    #[error("pdf-open-failed:{0}")]
    PdfOpenFailed(String),

    /// The PDF has no pages.
    #[error("pdf-empty")]
    PdfEmpty,

    /// Text extraction failed for one page; it contributes no text.
    #[error("pdf-page-failed:{page}")]
    PdfPageFailed { page: usize },

    /// A page range produced no text after noise filtering.
    #[error("pdf-chunk-empty:{start}-{end}")]
    PdfChunkEmpty { start: usize, end: usize },

    /// A text transcript could not be read from disk.
    #[error("txt-read-failed:{0}")]
    TextReadFailed(String),

    /// The file name yields no usable title.
    #[error("title-empty")]
    TitleEmpty,
}

/// Join warnings into the `;`-separated form stored in the manifest.
pub fn join_warnings(warnings: &[Warning]) -> String {
    warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(";")
}
