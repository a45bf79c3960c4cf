//! PDF text extraction in fixed-size page-range chunks.
//!
//! Long books are split so that each artifact stays a manageable unit for
//! downstream indexing. Chunking runs over the [`PageSource`] trait so the
//! partition and failure-isolation logic can be exercised without pdfium.
//!
//! ## Failure isolation
//!
//! | Failure                     | Effect                                      |
//! |-----------------------------|---------------------------------------------|
//! | pdfium library not bindable | no chunks, `pdf-engine-unavailable`         |
//! | file does not open          | no chunks, `pdf-open-failed:<detail>`       |
//! | zero pages                  | no chunks, `pdf-empty`                      |
//! | one page fails              | page contributes nothing, `pdf-page-failed` |
//! | chunk empty after filtering | chunk still emitted, `pdf-chunk-empty`      |
//!
//! The library is bound lazily, once per extractor, on the first PDF seen.
//! A corpus without PDFs never touches pdfium at all.

use once_cell::unsync::OnceCell;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::Warning;
use crate::pipeline::extract::{DocumentChunk, Extraction, Extractor, PageRange, SourceType};
use crate::pipeline::noise::NoiseRules;

/// Random access to the text layer of a paged document.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Text of the 0-based page `index`. The error string is diagnostic only.
    fn page_text(&self, index: usize) -> Result<String, String>;
}

/// Partition pages `1..=total` into contiguous ranges of `chunk` pages.
///
/// `chunk` is clamped to at least 1; the last range may be shorter.
pub fn page_ranges(total: usize, chunk: usize) -> Vec<PageRange> {
    let chunk = chunk.max(1);
    (0..total)
        .step_by(chunk)
        .map(|start0| PageRange {
            start: start0 + 1,
            end: (start0 + chunk).min(total),
        })
        .collect()
}

/// Extract every page of `source` into chunks of `chunk` pages.
pub fn chunk_pages(source: &dyn PageSource, chunk: usize, noise: &NoiseRules) -> Extraction {
    let total = source.page_count();
    if total == 0 {
        return Extraction::skipped(Warning::PdfEmpty);
    }

    let mut extraction = Extraction::default();
    for range in page_ranges(total, chunk) {
        let mut pages: Vec<String> = Vec::with_capacity(range.len());
        for page_no in range.start..=range.end {
            match source.page_text(page_no - 1) {
                Ok(text) => {
                    if !text.trim().is_empty() {
                        pages.push(text);
                    }
                }
                Err(detail) => {
                    warn!("PDF page {page_no} failed: {detail}");
                    extraction.warnings.push(Warning::PdfPageFailed { page: page_no });
                }
            }
        }

        let joined = pages.join("\n\n").replace('\x0c', "\n");
        let filtered = noise.filter_lines(&joined);
        let trimmed = filtered.trim();
        let markdown = format!("{trimmed}\n");

        if trimmed.is_empty() {
            extraction.warnings.push(Warning::PdfChunkEmpty {
                start: range.start,
                end: range.end,
            });
        }
        debug!("PDF chunk {range}: {} chars", markdown.len());
        extraction.chunks.push(DocumentChunk {
            pages: Some(range),
            markdown,
        });
    }
    extraction
}

/// [`PageSource`] over an open pdfium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    pub fn new(document: PdfDocument<'a>) -> Self {
        Self { document }
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        let page = self
            .document
            .pages()
            .get(index as u16)
            .map_err(|e| format!("{e:?}"))?;
        let text = page.text().map_err(|e| format!("{e:?}"))?;
        Ok(text.all())
    }
}

/// Bind pdfium from an explicit library path (a file, or a directory holding
/// the platform library) or from the system search path.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match library {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    };
    bindings.map(Pdfium::new).map_err(|e| e.to_string())
}

/// `.pdf` sources, split into page-range chunks.
pub struct PdfExtractor {
    chunk_pages: usize,
    noise: NoiseRules,
    library_path: Option<PathBuf>,
    engine: OnceCell<Option<Pdfium>>,
}

impl PdfExtractor {
    pub fn new(chunk_pages: usize, noise: NoiseRules, library_path: Option<PathBuf>) -> Self {
        Self {
            chunk_pages,
            noise,
            library_path,
            engine: OnceCell::new(),
        }
    }

    fn engine(&self) -> Option<&Pdfium> {
        self.engine
            .get_or_init(|| match bind_pdfium(self.library_path.as_deref()) {
                Ok(pdfium) => {
                    info!("pdfium bound");
                    Some(pdfium)
                }
                Err(e) => {
                    warn!("pdfium unavailable, PDF sources will be skipped: {e}");
                    None
                }
            })
            .as_ref()
    }
}

impl Extractor for PdfExtractor {
    fn source_type(&self) -> SourceType {
        SourceType::Pdf
    }

    fn extract(&self, path: &Path) -> Extraction {
        let Some(pdfium) = self.engine() else {
            return Extraction::skipped(Warning::PdfEngineUnavailable);
        };

        let document = match pdfium.load_pdf_from_file(path, None) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), "PDF did not open: {e:?}");
                return Extraction::skipped(Warning::PdfOpenFailed(format!("{e:?}")));
            }
        };

        let source = PdfiumDocument::new(document);
        info!(path = %path.display(), "PDF loaded: {} pages", source.page_count());
        chunk_pages(&source, self.chunk_pages, &self.noise)
    }
}
