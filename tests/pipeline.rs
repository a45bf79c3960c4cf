//! Integration tests for the full preparation run.
//!
//! Every test builds its own input tree in a temporary directory and pins
//! the generation timestamp, so outputs are byte-stable.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use chrono::{TimeZone, Utc};
use kbprep::{
    content_digest, prepare, prepare_with_registry, DocumentChunk, Extraction, Extractor,
    ExtractorRegistry, KbPrepError, PageRange, ParagraphKind, PrepareConfig,
    PrepareProgressCallback, SourceType, StyleMap, StyleRule, Warning,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Tree {
    dir: TempDir,
}

impl Tree {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("knowledgebase")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("knowledgebase_clean")
    }

    fn file(&self, rel: &str, contents: &[u8]) -> &Self {
        let path = self.input().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    fn config(&self) -> kbprep::PrepareConfigBuilder {
        PrepareConfig::builder()
            .input_root(self.input())
            .output_root(self.output())
            .generated_at(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn read_out(&self, rel: &str) -> String {
        std::fs::read_to_string(self.output().join(rel)).unwrap()
    }
}

fn docx(paragraphs: &[(&str, &str)]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|(style, text)| {
            format!(
                r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
            )
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn transcript_is_redacted_and_categorised() {
    let tree = Tree::new();
    tree.file(
        "Psychologie/notes.txt",
        "**[TITRE]** Mémoire\nContact : jean@example.com ou 06 12 34 56 78\n".as_bytes(),
    );

    let out = prepare(&tree.config().build().unwrap()).unwrap();
    assert_eq!(out.entries().len(), 1);
    let entry = &out.entries()[0];
    assert_eq!(entry.output_path, "psychologie/notes.md");
    assert_eq!(entry.source_type, "txt");
    assert_eq!(entry.output_type, "md");
    assert!(entry.redacted);
    assert!(entry.warnings.is_empty());

    let md = tree.read_out("psychologie/notes.md");
    assert!(md.contains("category: \"Psychologie\"\n"), "{md}");
    assert!(md.contains("### Mémoire\n"), "{md}");
    assert!(md.contains("[EMAIL]"), "{md}");
    assert!(md.contains("[TELEPHONE]"), "{md}");
    assert!(!md.contains("jean@example.com"), "{md}");
}

#[test]
fn no_redact_keeps_contact_details() {
    let tree = Tree::new();
    tree.file("a/notes.txt", b"jean@example.com\n");

    let out = prepare(&tree.config().redact(false).build().unwrap()).unwrap();
    assert!(!out.entries()[0].redacted);
    let md = tree.read_out("a/notes.md");
    assert!(md.contains("redacted: false\n"), "{md}");
    assert!(md.contains("jean@example.com"), "{md}");
}

#[test]
fn docx_headings_and_lists() {
    let tree = Tree::new();
    tree.file(
        "Cours/Plan du cours.docx",
        &docx(&[
            ("Title", "Plan"),
            ("TOC1", "Introduction 3"),
            ("Heading2", "Objectifs"),
            ("Normal", "Comprendre les biais"),
        ]),
    );

    let out = prepare(&tree.config().build().unwrap()).unwrap();
    let entry = &out.entries()[0];
    assert_eq!(entry.output_path, "cours/plan-du-cours.md");
    assert_eq!(entry.source_type, "docx");
    assert_eq!(entry.title, "Plan du cours");

    let md = tree.read_out("cours/plan-du-cours.md");
    assert!(md.ends_with("\n\n# Plan\n## Objectifs\nComprendre les biais\n"), "{md}");
    assert!(!md.contains("Introduction 3"), "{md}");
}

#[test]
fn broken_docx_is_written_with_warning() {
    let tree = Tree::new();
    tree.file("x/faux.docx", b"plain text, not a zip");

    let out = prepare(&tree.config().build().unwrap()).unwrap();
    assert_eq!(out.entries().len(), 1);
    assert_eq!(out.entries()[0].warnings, "not-a-zip-docx:faux.docx");
    assert!(out
        .report_lines
        .contains(&"WARN docx x/faux.docx: not-a-zip-docx:faux.docx".to_string()));
}

#[test]
fn unsupported_files_are_reported() {
    let tree = Tree::new();
    tree.file("a/photo.jpg", b"\xff\xd8").file("a/notes.txt", b"texte");

    let out = prepare(&tree.config().build().unwrap()).unwrap();
    assert_eq!(out.entries().len(), 1);
    assert_eq!(out.stats.unsupported, 1);
    assert_eq!(out.report_lines, vec!["SKIP unsupported: a/photo.jpg".to_string()]);

    let report = tree.read_out("report.txt");
    assert_eq!(report, "SKIP unsupported: a/photo.jpg\n");
}

#[test]
fn pdf_without_engine_is_skipped() {
    let tree = Tree::new();
    tree.file("livres/x.pdf", b"%PDF-1.4\n%%EOF\n");

    let config = tree
        .config()
        .pdfium_library(tree.dir.path().join("no-such-libpdfium.so"))
        .build()
        .unwrap();
    let out = prepare(&config).unwrap();
    assert!(out.entries().is_empty());
    assert_eq!(
        out.report_lines,
        vec![
            "WARN pdf livres/x.pdf: pdf-engine-unavailable".to_string(),
            "SKIP pdf empty: livres/x.pdf".to_string(),
        ]
    );
    assert_eq!(out.stats.empty, 1);
}

#[test]
fn dry_run_matches_written_run() {
    let tree = Tree::new();
    tree.file("A/un.txt", b"**[TITRE]** Un\nbonjour\n")
        .file("B/deux.txt", b"deux mots\n");

    let dry = prepare(&tree.config().dry_run(true).build().unwrap()).unwrap();
    assert!(dry.dry_run);
    assert!(!tree.output().exists());

    let wet = prepare(&tree.config().build().unwrap()).unwrap();
    assert_eq!(dry.entries(), wet.entries());

    for entry in wet.entries() {
        let bytes = std::fs::read(tree.output().join(&entry.output_path)).unwrap();
        assert_eq!(bytes.len(), entry.bytes);
        assert_eq!(content_digest(&bytes), entry.sha256, "{}", entry.output_path);
        assert_eq!(entry.id, entry.sha256[..16]);
    }
}

#[test]
fn manifest_files_are_written() {
    let tree = Tree::new();
    tree.file("A/un.txt", b"bonjour le monde\n");

    prepare(&tree.config().build().unwrap()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&tree.read_out("manifest.json")).unwrap();
    assert_eq!(json["generated_at"], "2024-05-01T12:00:00+00:00");
    assert_eq!(json["redacted"], true);
    assert_eq!(json["documents"][0]["source_path"], "A/un.txt");
    assert_eq!(json["documents"][0]["output_path"], "a/un.md");

    let csv = tree.read_out("manifest.csv");
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some(
            "id,title,source_path,output_path,source_type,output_type,redacted,\
             sha256,bytes,chars,words,created_at,warnings"
        )
    );
    assert!(lines.next().unwrap().contains(",A/un.txt,a/un.md,txt,md,true,"));
}

#[test]
fn empty_input_writes_header_only_csv() {
    let tree = Tree::new();
    std::fs::create_dir_all(tree.input()).unwrap();

    let out = prepare(&tree.config().build().unwrap()).unwrap();
    assert!(out.entries().is_empty());
    assert_eq!(tree.read_out("manifest.csv").trim_end(), "id");
    assert_eq!(tree.read_out("report.txt"), "");
    assert_eq!(
        out.summary(),
        format!("Prepared 0 documents in {}", out.output_root.display())
    );
}

#[test]
fn missing_input_root_is_fatal() {
    let tree = Tree::new();
    let err = prepare(&tree.config().build().unwrap()).unwrap_err();
    assert!(matches!(err, KbPrepError::InputNotFound { .. }));
    assert!(!tree.output().exists());
}

#[test]
fn input_root_that_is_a_file_is_fatal() {
    let tree = Tree::new();
    std::fs::write(tree.dir.path().join("knowledgebase"), b"x").unwrap();
    let err = prepare(&tree.config().build().unwrap()).unwrap_err();
    assert!(matches!(err, KbPrepError::InputNotFound { .. }));
}

#[derive(Default)]
struct Counting {
    started: AtomicUsize,
    completed: AtomicUsize,
    skipped: AtomicUsize,
    total: AtomicUsize,
}

impl PrepareProgressCallback for Counting {
    fn on_run_start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }
    fn on_document_start(&self, _index: usize, _total: usize, _rel: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_complete(&self, _index: usize, _total: usize, _rel: &str, _artifacts: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_document_skipped(&self, _index: usize, _total: usize, _rel: &str, _reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn progress_callback_sees_every_file() {
    let tree = Tree::new();
    tree.file("a/un.txt", b"un")
        .file("a/deux.txt", b"deux")
        .file("a/trois.xlsx", b"?");

    let counter = Arc::new(Counting::default());
    let config = tree
        .config()
        .progress_callback(counter.clone())
        .build()
        .unwrap();
    prepare(&config).unwrap();

    assert_eq!(counter.total.load(Ordering::SeqCst), 3);
    assert_eq!(counter.started.load(Ordering::SeqCst), 2);
    assert_eq!(counter.completed.load(Ordering::SeqCst), 2);
    assert_eq!(counter.skipped.load(Ordering::SeqCst), 1);
}

#[test]
fn output_root_is_reported_absolute() {
    let tree = Tree::new();
    tree.file("a/un.txt", b"un");
    let out = prepare(&tree.config().build().unwrap()).unwrap();
    assert!(Path::new(&out.manifest.output_root).is_absolute());
    assert!(Path::new(&out.manifest.source_root).is_absolute());
}

#[test]
fn custom_docx_styles_from_config() {
    let tree = Tree::new();
    tree.file(
        "Cours/styles.docx",
        &docx(&[("Chapitre", "Introduction"), ("Title", "Plan")]),
    );

    let styles = StyleMap::new(vec![StyleRule::Exact {
        name: "chapitre".into(),
        kind: ParagraphKind::Heading(2),
    }]);
    prepare(&tree.config().docx_styles(styles).build().unwrap()).unwrap();

    let md = tree.read_out("cours/styles.md");
    assert!(md.ends_with("\n\n## Introduction\nPlan\n"), "{md}");
}

/// Stands in for the pdfium extractor: three ranges over a 95-page book,
/// the middle one without text.
struct ChunkedBook;

impl Extractor for ChunkedBook {
    fn source_type(&self) -> SourceType {
        SourceType::Pdf
    }

    fn extract(&self, _path: &Path) -> Extraction {
        let chunk = |start, end, text: &str| DocumentChunk {
            pages: Some(PageRange { start, end }),
            markdown: text.to_string(),
        };
        Extraction {
            chunks: vec![
                chunk(1, 40, "Premier tome"),
                chunk(41, 80, ""),
                chunk(81, 95, "Épilogue"),
            ],
            warnings: vec![
                Warning::PdfPageFailed { page: 50 },
                Warning::PdfChunkEmpty { start: 41, end: 80 },
            ],
        }
    }
}

#[test]
fn pdf_chunks_become_page_range_artifacts() {
    let tree = Tree::new();
    tree.file("Livres/Sapiens.pdf", b"%PDF-1.4\n");

    let mut registry = ExtractorRegistry::new();
    registry.register(Box::new(ChunkedBook));
    let out = prepare_with_registry(&tree.config().build().unwrap(), &registry).unwrap();

    let paths: Vec<&str> = out.entries().iter().map(|e| e.output_path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "livres/sapiens-p0001-p0040.md",
            "livres/sapiens-p0041-p0080.md",
            "livres/sapiens-p0081-p0095.md",
        ]
    );
    for entry in out.entries() {
        assert_eq!(entry.source_type, "pdf");
        assert_eq!(entry.source_path, "Livres/Sapiens.pdf");
        assert_eq!(entry.warnings, "pdf-page-failed:50;pdf-chunk-empty:41-80");
    }
    assert_eq!(out.stats.documents, 1);
    assert_eq!(out.stats.artifacts, 3);
    assert_eq!(
        out.report_lines,
        vec!["WARN pdf Livres/Sapiens.pdf: pdf-page-failed:50;pdf-chunk-empty:41-80".to_string()]
    );

    let first = tree.read_out("livres/sapiens-p0001-p0040.md");
    assert!(first.contains("category: \"Livres\"\n"), "{first}");
    assert!(first.contains("generated_at: \"2024-05-01T12:00:00+00:00\"\npages: \"1-40\"\n---\n"), "{first}");
    assert!(first.ends_with("---\n\nPremier tome\n"), "{first}");

    let empty = tree.read_out("livres/sapiens-p0041-p0080.md");
    assert!(empty.contains("pages: \"41-80\"\n"), "{empty}");
    assert!(empty.ends_with("---\n\n\n"), "{empty}");

    let last = tree.read_out("livres/sapiens-p0081-p0095.md");
    assert!(last.contains("pages: \"81-95\"\n"), "{last}");
    assert!(last.ends_with("Épilogue\n"), "{last}");
}
