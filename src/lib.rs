//! # kbprep
//!
//! Normalise a heterogeneous document corpus (slide transcripts, Word
//! documents, PDFs) into a clean Markdown knowledge base with a verifiable
//! manifest.
//!
//! ## Why this crate?
//!
//! A knowledge base assembled over years mixes `.txt` exports with ad-hoc
//! tags, Word files full of table-of-contents debris, and book-length PDFs.
//! Indexing them as-is gives poor retrieval and leaks personal data. This
//! crate converts every source to Markdown with front-matter, redacts e-mail
//! addresses and phone numbers, drops layout noise, splits long PDFs into
//! page-range chunks, and records a content hash for every artifact so that
//! downstream consumers can verify what they load.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input tree
//!  │
//!  ├─ 1. Discover   sorted walk, hidden and ignored names skipped
//!  ├─ 2. Extract    .txt / .docx / .pdf → chunks + warnings
//!  ├─ 3. Clean      newline/whitespace canonicalisation, PII redaction
//!  ├─ 4. Assemble   front-matter + body, deterministic output path
//!  ├─ 5. Write      artifact (skipped in dry-run mode)
//!  └─ 6. Record     manifest.json, manifest.csv, report.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kbprep::{prepare, PrepareConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PrepareConfig::builder()
//!         .input_root("knowledgebase")
//!         .output_root("knowledgebase_clean")
//!         .build()?;
//!     let output = prepare(&config)?;
//!     println!("{}", output.summary());
//!     for line in &output.report_lines {
//!         eprintln!("{line}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `kbprep` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! kbprep = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF support
//!
//! PDF text comes from pdfium, bound at runtime. Point `PDFIUM_LIB_PATH` (or
//! [`PrepareConfigBuilder::pdfium_library`]) at a `libpdfium` build, or
//! install one on the system library path. Without it, PDF sources are
//! reported as `pdf-engine-unavailable` and skipped; everything else still
//! runs.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod prepare;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{Catalog, CatalogBook, CoverStatus, CoverSummary};
pub use config::{parse_generated_at, PrepareConfig, PrepareConfigBuilder};
pub use error::{KbPrepError, Warning};
pub use manifest::{content_digest, Manifest, ManifestEntry};
pub use pipeline::docx::{ParagraphKind, StyleMap, StyleRule};
pub use pipeline::extract::{
    DocumentChunk, Extraction, Extractor, ExtractorRegistry, PageRange, SourceType,
};
pub use pipeline::noise::NoiseRules;
pub use prepare::{prepare, prepare_with_registry, PrepareOutput, PrepareStats};
pub use progress::{NoopProgressCallback, PrepareProgressCallback, ProgressCallback};
