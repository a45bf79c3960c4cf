//! Pipeline stages for turning one source file into Markdown.
//!
//! Each submodule implements one transformation step and is testable on its
//! own; [`crate::prepare`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//!            ┌─ transcript (.txt) ─┐
//! extract ───┼─ docx      (.docx) ─┼──▶ normalize ──▶ frontmatter ──▶ paths
//! (routing)  └─ pdf       (.pdf)  ─┘     (clean,        (metadata)     (output
//!                  ▲                      redact)                       location)
//!                  └── noise (shared line filter)
//! ```
//!
//! 1. [`extract`]    — the `Extractor` trait and extension routing
//! 2. [`transcript`] — tagged slide transcripts → headings
//! 3. [`docx`]       — Word paragraph tree → Markdown lines
//! 4. [`pdf`]        — page-range chunking over pdfium's text layer
//! 5. [`noise`]      — TOC headers, field codes and page numbers to drop
//! 6. [`normalize`]  — whitespace canonicalisation and PII redaction
//! 7. [`frontmatter`] — the `---` metadata block
//! 8. [`paths`]      — slugs, titles, output paths, asset references

pub mod docx;
pub mod extract;
pub mod frontmatter;
pub mod noise;
pub mod normalize;
pub mod paths;
pub mod pdf;
pub mod transcript;
