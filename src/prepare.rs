//! The preparation run: discover, extract, clean, write, record.
//!
//! [`prepare`] is the library's main entry point. It walks the input tree in
//! sorted order, routes each file to its extractor, turns every chunk into a
//! front-matter + Markdown artifact, and collects one [`ManifestEntry`] per
//! artifact. Extraction problems never abort the run; they travel as warning
//! tokens into the manifest and the report. Only an unusable input root or an
//! unwritable output tree is fatal.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::PrepareConfig;
use crate::error::{join_warnings, KbPrepError, Warning};
use crate::manifest::{
    self, ContentMetrics, Manifest, ManifestEntry, MANIFEST_CSV, MANIFEST_JSON, REPORT_TXT,
};
use crate::pipeline::extract::{DocumentChunk, ExtractorRegistry, SourceType};
use crate::pipeline::frontmatter::FrontMatter;
use crate::pipeline::normalize;
use crate::pipeline::paths::{self, build_output_path, page_range_suffix, to_posix};

/// Output type tag recorded for every artifact.
pub const OUTPUT_TYPE: &str = "md";

/// Run-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareStats {
    /// Files found under the input root, supported or not.
    pub discovered: usize,
    /// Sources that produced at least one artifact.
    pub documents: usize,
    /// Manifest entries (PDF chunks count individually).
    pub artifacts: usize,
    /// Files with an unsupported extension.
    pub unsupported: usize,
    /// Supported sources that produced no artifact.
    pub empty: usize,
    /// Sources carrying at least one warning.
    pub warned: usize,
    /// Directory entries that could not be read.
    pub unreadable: usize,
    pub duration_ms: u64,
}

/// Result of [`prepare`].
#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub manifest: Manifest,
    pub report_lines: Vec<String>,
    /// Absolute output root.
    pub output_root: PathBuf,
    pub dry_run: bool,
    pub stats: PrepareStats,
}

impl PrepareOutput {
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.manifest.documents
    }

    /// The one-line summary printed by the CLI.
    pub fn summary(&self) -> String {
        format!(
            "Prepared {} documents in {}",
            self.manifest.documents.len(),
            self.output_root.display()
        )
    }
}

/// Files found by discovery, relative to the input root and sorted.
#[derive(Debug, Default)]
struct Discovery {
    files: Vec<PathBuf>,
    unreadable: Vec<String>,
}

/// Walk `root`, skipping hidden entries (and everything below hidden
/// directories) and the configured ignore list.
fn discover(root: &Path, config: &PrepareConfig) -> Discovery {
    let mut found = Discovery::default();
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let shown = e
                    .path()
                    .map(|p| to_posix(p.strip_prefix(root).unwrap_or(p)))
                    .unwrap_or_else(|| e.to_string());
                warn!("Unreadable entry {shown}: {e}");
                found.unreadable.push(shown);
                continue;
            }
        };

        if !entry.path().is_file() {
            continue;
        }
        if config.is_ignored_name(&entry.file_name().to_string_lossy()) {
            debug!("Ignoring {}", entry.path().display());
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            found.files.push(rel.to_path_buf());
        }
    }

    found.files.sort();
    found
}

/// Per-run values shared by every artifact.
struct RunContext<'a> {
    config: &'a PrepareConfig,
    source_root: PathBuf,
    output_root: PathBuf,
    /// Name of the input root, the category of top-level files.
    root_name: String,
    generated_at: String,
}

impl RunContext<'_> {
    /// Build, measure and (unless dry-running) write one artifact.
    fn emit(
        &self,
        rel: &Path,
        source_type: SourceType,
        title: &str,
        category: &str,
        chunk: &DocumentChunk,
        warnings: &str,
    ) -> Result<ManifestEntry, KbPrepError> {
        let body = normalize::clean(&chunk.markdown, self.config.redact);

        let mut front = FrontMatter::new()
            .field("title", title)
            .field("source", to_posix(rel))
            .field("category", category)
            .field("redacted", self.config.redact)
            .field("generated_at", self.generated_at.as_str());
        let suffix = match chunk.pages {
            Some(range) => {
                front = front.field("pages", range.to_string());
                page_range_suffix(range.start, range.end)
            }
            None => paths::markdown_suffix(),
        };
        let content = format!("{}{}", front.render(), body);

        let out_path = build_output_path(&self.output_root, rel, &suffix);
        if !self.config.dry_run {
            write_artifact(&out_path, &content)?;
        }

        let metrics = ContentMetrics::measure(&content);
        let output_rel = out_path
            .strip_prefix(&self.output_root)
            .map(to_posix)
            .unwrap_or_else(|_| to_posix(&out_path));

        Ok(ManifestEntry {
            id: metrics.id(),
            title: title.to_string(),
            source_path: to_posix(rel),
            output_path: output_rel,
            source_type: source_type.as_str().to_string(),
            output_type: OUTPUT_TYPE.to_string(),
            redacted: self.config.redact,
            sha256: metrics.sha256,
            bytes: metrics.bytes,
            chars: metrics.chars,
            words: metrics.words,
            created_at: self.generated_at.clone(),
            warnings: warnings.to_string(),
        })
    }
}

fn write_artifact(path: &Path, content: &str) -> Result<(), KbPrepError> {
    let io_err = |source: std::io::Error| KbPrepError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, content).map_err(io_err)
}

/// Prepare a knowledge base export.
///
/// # Returns
/// `Ok(PrepareOutput)` on success, even if individual documents were
/// skipped or carry warnings (see `output.report_lines`).
///
/// # Errors
/// Returns `Err(KbPrepError)` only for fatal errors:
/// - input root missing
/// - an artifact or manifest file could not be written
pub fn prepare(config: &PrepareConfig) -> Result<PrepareOutput, KbPrepError> {
    prepare_with_registry(config, &ExtractorRegistry::from_config(config))
}

/// [`prepare`] with a caller-supplied extractor set, e.g. to add a format or
/// to replace the pdfium-backed PDF extractor.
pub fn prepare_with_registry(
    config: &PrepareConfig,
    registry: &ExtractorRegistry,
) -> Result<PrepareOutput, KbPrepError> {
    let total_start = Instant::now();

    // ── Step 1: Resolve roots ────────────────────────────────────────────
    let source_root = std::fs::canonicalize(&config.input_root)
        .ok()
        .filter(|p| p.is_dir())
        .ok_or_else(|| KbPrepError::InputNotFound {
            path: config.input_root.clone(),
        })?;
    let output_root = std::path::absolute(&config.output_root).map_err(|e| {
        KbPrepError::OutputWriteFailed {
            path: config.output_root.clone(),
            source: e,
        }
    })?;
    let generated_at = config.generated_at.unwrap_or_else(Utc::now).to_rfc3339();
    info!(
        "Preparing {} → {}{}",
        source_root.display(),
        output_root.display(),
        if config.dry_run { " (dry run)" } else { "" }
    );

    let ctx = RunContext {
        config,
        root_name: source_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        source_root,
        output_root,
        generated_at,
    };

    // ── Step 2: Discover ─────────────────────────────────────────────────
    let discovery = discover(&ctx.source_root, config);
    let total = discovery.files.len();
    info!("Discovered {} files", total);

    let mut stats = PrepareStats {
        discovered: total,
        unreadable: discovery.unreadable.len(),
        ..PrepareStats::default()
    };
    let mut report_lines: Vec<String> = discovery
        .unreadable
        .iter()
        .map(|p| format!("SKIP unreadable: {p}"))
        .collect();
    let mut entries: Vec<ManifestEntry> = Vec::new();

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    // ── Step 3: Extract and emit, one document at a time ────────────────
    for (i, rel) in discovery.files.iter().enumerate() {
        let index = i + 1;
        let rel_posix = to_posix(rel);

        let Some(extractor) = registry.for_path(rel) else {
            debug!("Unsupported: {rel_posix}");
            report_lines.push(format!("SKIP unsupported: {rel_posix}"));
            stats.unsupported += 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_skipped(index, total, &rel_posix, "unsupported");
            }
            continue;
        };
        let source_type = extractor.source_type();
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, &rel_posix);
        }

        let extraction = extractor.extract(&ctx.source_root.join(rel));

        let title = paths::infer_title(rel);
        let mut warnings = extraction.warnings;
        if title.is_empty() {
            warnings.push(Warning::TitleEmpty);
        }
        let category = rel
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| ctx.root_name.clone());

        let tokens = join_warnings(&warnings);
        if !warnings.is_empty() {
            warn!("{rel_posix}: {tokens}");
            report_lines.push(format!("WARN {source_type} {rel_posix}: {tokens}"));
            stats.warned += 1;
        }

        if extraction.chunks.is_empty() {
            report_lines.push(format!("SKIP {source_type} empty: {rel_posix}"));
            stats.empty += 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_document_skipped(index, total, &rel_posix, "empty");
            }
            continue;
        }

        for chunk in &extraction.chunks {
            let entry = ctx.emit(rel, source_type, &title, &category, chunk, &tokens)?;
            debug!("{} → {} ({} bytes)", rel_posix, entry.output_path, entry.bytes);
            entries.push(entry);
        }
        stats.documents += 1;
        stats.artifacts += extraction.chunks.len();

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_complete(index, total, &rel_posix, extraction.chunks.len());
        }
    }

    // ── Step 4: Manifest, CSV and report ─────────────────────────────────
    let manifest = Manifest {
        generated_at: ctx.generated_at.clone(),
        source_root: ctx.source_root.to_string_lossy().into_owned(),
        output_root: ctx.output_root.to_string_lossy().into_owned(),
        redacted: config.redact,
        documents: entries,
    };

    if !config.dry_run {
        std::fs::create_dir_all(&ctx.output_root).map_err(|e| KbPrepError::OutputWriteFailed {
            path: ctx.output_root.clone(),
            source: e,
        })?;
        manifest.write_json(&ctx.output_root.join(MANIFEST_JSON))?;
        manifest.write_csv(&ctx.output_root.join(MANIFEST_CSV))?;
        manifest::write_report(&ctx.output_root.join(REPORT_TXT), &report_lines)?;
    }

    stats.duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Preparation complete: {} artifacts from {}/{} files, {}ms",
        stats.artifacts, stats.documents, stats.discovered, stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.documents, stats.artifacts);
    }

    Ok(PrepareOutput {
        manifest,
        report_lines,
        output_root: ctx.output_root,
        dry_run: config.dry_run,
        stats,
    })
}
