//! The extractor seam: one implementation per source format.
//!
//! The orchestrator never branches on file extensions itself. It asks the
//! [`ExtractorRegistry`] for the extractor registered for a path and hands the
//! path over; every format-specific failure comes back as a [`Warning`]
//! inside the [`Extraction`], never as an `Err`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::config::PrepareConfig;
use crate::error::Warning;
use crate::pipeline::docx::DocxExtractor;
use crate::pipeline::pdf::PdfExtractor;
use crate::pipeline::transcript::TranscriptExtractor;

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Txt,
    Docx,
    Pdf,
}

impl SourceType {
    /// Map a file extension (without the dot, any case) to a source type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(SourceType::Txt),
            "docx" => Some(SourceType::Docx),
            "pdf" => Some(SourceType::Pdf),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Tag stored in the manifest's `source_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Txt => "txt",
            SourceType::Docx => "docx",
            SourceType::Pdf => "pdf",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive, 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn len(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One unit of output. Whole documents have no page range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub pages: Option<PageRange>,
    pub markdown: String,
}

/// What an extractor produced for one source file.
///
/// An empty `chunks` list means the source must be skipped entirely; a chunk
/// with empty text is still an artifact and must carry a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub chunks: Vec<DocumentChunk>,
    pub warnings: Vec<Warning>,
}

impl Extraction {
    /// A whole-document result.
    pub fn single(markdown: String, warnings: Vec<Warning>) -> Self {
        Self {
            chunks: vec![DocumentChunk {
                pages: None,
                markdown,
            }],
            warnings,
        }
    }

    /// Nothing usable; the caller skips the source.
    pub fn skipped(warning: Warning) -> Self {
        Self {
            chunks: Vec::new(),
            warnings: vec![warning],
        }
    }
}

/// A format-specific extractor. Implementations read only their one input
/// file and never fail the run.
pub trait Extractor {
    fn source_type(&self) -> SourceType;

    fn extract(&self, path: &Path) -> Extraction;
}

/// Extension → extractor routing table.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// An empty registry; see [`ExtractorRegistry::from_config`] for the
    /// standard set.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry with the transcript, Word and PDF extractors.
    pub fn from_config(config: &PrepareConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(TranscriptExtractor));
        registry.register(Box::new(
            DocxExtractor::new(config.noise.clone()).with_styles(config.docx_styles.clone()),
        ));
        registry.register(Box::new(PdfExtractor::new(
            config.chunk_pages,
            config.noise.clone(),
            config.pdfium_library.clone(),
        )));
        registry
    }

    /// Add an extractor; a later registration for the same type wins.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        let ty = extractor.source_type();
        self.extractors.retain(|e| e.source_type() != ty);
        self.extractors.push(extractor);
    }

    /// The extractor responsible for `path`, if its extension is supported.
    pub fn for_path(&self, path: &Path) -> Option<&dyn Extractor> {
        let ty = SourceType::from_path(path)?;
        self.extractors
            .iter()
            .find(|e| e.source_type() == ty)
            .map(|e| e.as_ref())
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
