//! Word (`.docx`) extraction: paragraph tree → Markdown lines.
//!
//! Only `word/document.xml` is read. Each `w:p` becomes at most one output
//! line; its paragraph style is looked up in a [`StyleMap`] to decide whether
//! it is a heading, a table-of-contents entry to drop, or body text.
//!
//! Paragraphs nested inside another paragraph (text boxes, for instance) are
//! emitted on their own, in the order their start tags appear, and their text
//! is not repeated in the enclosing paragraph.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use crate::error::Warning;
use crate::pipeline::extract::{Extraction, Extractor, SourceType};
use crate::pipeline::noise::NoiseRules;

/// WordprocessingML main namespace (transitional and strict).
const W_NS: &[u8] = b"http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const W_NS_STRICT: &[u8] = b"http://purl.oclc.org/ooxml/wordprocessingml/main";

const DOCUMENT_PART: &str = "word/document.xml";

/// How a paragraph is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphKind {
    /// `# text`
    Title,
    /// `#`×level, level in `1..=6`
    Heading(u8),
    /// Dropped.
    TocEntry,
    Body,
}

/// One entry of the style lookup table. Keys are compared after
/// [`normalize_style`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleRule {
    /// The whole key equals `name`.
    Exact { name: String, kind: ParagraphKind },
    /// The key starts with `prefix`.
    Prefix { prefix: String, kind: ParagraphKind },
    /// `prefix` followed by at least one digit and nothing else.
    Numbered { prefix: String, kind: ParagraphKind },
    /// `prefix` followed by a level number; without digits the paragraph is
    /// a heading of `fallback_level` when one is set.
    Heading {
        prefix: String,
        fallback_level: Option<u8>,
    },
}

impl StyleRule {
    fn classify(&self, key: &str) -> Option<ParagraphKind> {
        match self {
            StyleRule::Exact { name, kind } => (key == name).then_some(*kind),
            StyleRule::Prefix { prefix, kind } => key.starts_with(prefix.as_str()).then_some(*kind),
            StyleRule::Numbered { prefix, kind } => {
                let rest = key.strip_prefix(prefix.as_str())?;
                (!rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())).then_some(*kind)
            }
            StyleRule::Heading {
                prefix,
                fallback_level,
            } => {
                let rest = key.strip_prefix(prefix.as_str())?;
                let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    fallback_level.map(ParagraphKind::Heading)
                } else {
                    Some(ParagraphKind::Heading(clamp_level(&digits)))
                }
            }
        }
    }
}

/// Clamp a decimal level to `1..=6`; values too large to parse count as 6.
fn clamp_level(digits: &str) -> u8 {
    digits
        .parse::<u32>()
        .map(|n| n.clamp(1, 6) as u8)
        .unwrap_or(6)
}

/// Lowercase, whitespace removed: `"Heading 1"` and `"heading1"` are the
/// same style.
pub fn normalize_style(style: &str) -> String {
    style
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ordered style lookup table; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleMap {
    rules: Vec<StyleRule>,
}

impl Default for StyleMap {
    /// English style ids plus the French aliases Word uses for the same
    /// built-in styles (`Titre`, `Titre1`, `TM1`).
    fn default() -> Self {
        Self {
            rules: vec![
                StyleRule::Exact {
                    name: "title".into(),
                    kind: ParagraphKind::Title,
                },
                StyleRule::Exact {
                    name: "titre".into(),
                    kind: ParagraphKind::Title,
                },
                StyleRule::Prefix {
                    prefix: "toc".into(),
                    kind: ParagraphKind::TocEntry,
                },
                StyleRule::Numbered {
                    prefix: "tm".into(),
                    kind: ParagraphKind::TocEntry,
                },
                StyleRule::Heading {
                    prefix: "heading".into(),
                    fallback_level: Some(2),
                },
                StyleRule::Heading {
                    prefix: "titre".into(),
                    fallback_level: None,
                },
            ],
        }
    }
}

impl StyleMap {
    pub fn new(rules: Vec<StyleRule>) -> Self {
        Self { rules }
    }

    /// Classify a raw `w:pStyle` value. Unstyled paragraphs are body text.
    pub fn classify(&self, style: Option<&str>) -> ParagraphKind {
        let Some(style) = style else {
            return ParagraphKind::Body;
        };
        let key = normalize_style(style);
        self.rules
            .iter()
            .find_map(|rule| rule.classify(&key))
            .unwrap_or(ParagraphKind::Body)
    }
}

/// A paragraph as collected from the XML stream.
#[derive(Debug, Default)]
struct Paragraph {
    style: Option<String>,
    is_list: bool,
    text: String,
}

impl Paragraph {
    fn render(&self, styles: &StyleMap, noise: &NoiseRules) -> Option<String> {
        let kind = styles.classify(self.style.as_deref());
        if kind == ParagraphKind::TocEntry {
            return None;
        }

        let text = self.text.replace('\u{a0}', " ");
        let text = text.trim();
        if text.is_empty() || noise.should_drop(text) {
            return None;
        }

        Some(match kind {
            ParagraphKind::Title => format!("# {text}"),
            ParagraphKind::Heading(level) => format!("{} {text}", "#".repeat(level as usize)),
            _ if self.is_list => format!("- {text}"),
            _ => text.to_string(),
        })
    }
}

/// Walk state for the paragraph tree.
#[derive(Default)]
struct Walker {
    paragraphs: Vec<Paragraph>,
    /// Indices into `paragraphs` of the currently open `w:p` elements.
    open: Vec<usize>,
    ppr_depth: usize,
    run_depth: usize,
    in_text: bool,
}

impl Walker {
    fn current(&mut self) -> Option<&mut Paragraph> {
        let idx = *self.open.last()?;
        self.paragraphs.get_mut(idx)
    }

    fn push_text(&mut self, s: &str) {
        if let Some(p) = self.current() {
            p.text.push_str(s);
        }
    }

    /// Start tags and self-closing tags alike.
    fn element(&mut self, e: &BytesStart<'_>, self_closing: bool) {
        match e.local_name().as_ref() {
            b"p" => {
                self.paragraphs.push(Paragraph::default());
                if !self_closing {
                    self.open.push(self.paragraphs.len() - 1);
                }
            }
            b"pPr" if !self_closing => self.ppr_depth += 1,
            b"pStyle" if self.ppr_depth == 1 => {
                let style = style_value(e);
                if let Some(p) = self.current() {
                    p.style = style;
                }
            }
            b"numPr" if self.ppr_depth == 1 => {
                if let Some(p) = self.current() {
                    p.is_list = true;
                }
            }
            b"r" if !self_closing => self.run_depth += 1,
            b"t" if !self_closing && self.run_depth > 0 => self.in_text = true,
            b"tab" if self.in_run() => self.push_text("\t"),
            b"br" | b"cr" if self.in_run() => self.push_text("\n"),
            _ => {}
        }
    }

    fn end(&mut self, local: &[u8]) {
        match local {
            b"p" => {
                self.open.pop();
            }
            b"pPr" => self.ppr_depth = self.ppr_depth.saturating_sub(1),
            b"r" => self.run_depth = self.run_depth.saturating_sub(1),
            b"t" => self.in_text = false,
            _ => {}
        }
    }

    fn in_run(&self) -> bool {
        self.run_depth > 0 && self.ppr_depth == 0
    }
}

fn style_value(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

fn is_word_namespace(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(n)) if *n == W_NS || *n == W_NS_STRICT)
}

/// Collect paragraphs from a `word/document.xml` body.
fn collect_paragraphs(xml: &str) -> Result<Vec<Paragraph>, String> {
    let mut reader = NsReader::from_str(xml);
    let mut walker = Walker::default();

    loop {
        let (in_word_ns, event) = match reader.read_resolved_event() {
            Ok((ns, event)) => (is_word_namespace(&ns), event),
            Err(e) => return Err(e.to_string()),
        };

        match event {
            Event::Start(e) if in_word_ns => walker.element(&e, false),
            Event::Empty(e) if in_word_ns => walker.element(&e, true),
            Event::End(e) if in_word_ns => walker.end(e.local_name().as_ref()),
            Event::Text(t) if walker.in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                walker.push_text(&text);
            }
            Event::CData(t) if walker.in_text => {
                walker.push_text(&String::from_utf8_lossy(&t));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(walker.paragraphs)
}

/// Convert the bytes of a `.docx` file to Markdown.
///
/// Never fails: every problem becomes a [`Warning`] and the text is empty
/// (or whatever was salvageable).
pub fn docx_bytes_to_markdown(
    file_name: &str,
    bytes: &[u8],
    styles: &StyleMap,
    noise: &NoiseRules,
) -> (String, Vec<Warning>) {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(a) => a,
        Err(_) => {
            return (
                String::new(),
                vec![Warning::NotAZip {
                    file: file_name.to_string(),
                }],
            )
        }
    };

    let mut raw = Vec::new();
    let read = archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| e.to_string())
        .and_then(|mut part| part.read_to_end(&mut raw).map_err(|e| e.to_string()));
    if let Err(detail) = read {
        return (String::new(), vec![Warning::DocxReadFailed(detail)]);
    }

    let xml = match String::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => return (String::new(), vec![Warning::DocxXmlParseFailed(e.to_string())]),
    };

    let paragraphs = match collect_paragraphs(&xml) {
        Ok(p) => p,
        Err(detail) => return (String::new(), vec![Warning::DocxXmlParseFailed(detail)]),
    };
    debug!("{file_name}: {} paragraphs", paragraphs.len());

    let lines: Vec<String> = paragraphs
        .iter()
        .filter_map(|p| p.render(styles, noise))
        .collect();

    if lines.is_empty() {
        return ("\n".to_string(), vec![Warning::DocxEmptyOutput]);
    }
    (format!("{}\n", lines.join("\n").trim()), Vec::new())
}

/// `.docx` sources: always exactly one chunk, possibly empty.
pub struct DocxExtractor {
    noise: NoiseRules,
    styles: StyleMap,
}

impl DocxExtractor {
    pub fn new(noise: NoiseRules) -> Self {
        Self {
            noise,
            styles: StyleMap::default(),
        }
    }

    pub fn with_styles(mut self, styles: StyleMap) -> Self {
        self.styles = styles;
        self
    }
}

impl Extractor for DocxExtractor {
    fn source_type(&self) -> SourceType {
        SourceType::Docx
    }

    fn extract(&self, path: &Path) -> Extraction {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (markdown, warnings) = match std::fs::read(path) {
            Ok(bytes) => docx_bytes_to_markdown(&file_name, &bytes, &self.styles, &self.noise),
            Err(e) => (String::new(), vec![Warning::DocxReadFailed(e.to_string())]),
        };
        Extraction::single(markdown, warnings)
    }
}
