//! YAML-style front-matter for generated artifacts.
//!
//! Only flat scalar maps are needed, so the block is rendered by hand rather
//! than through a YAML serialiser: keys keep insertion order, booleans are
//! bare `true`/`false`, strings are double-quoted.

use std::fmt::Write as _;

/// A scalar front-matter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontMatterValue {
    Text(String),
    Bool(bool),
}

impl From<&str> for FrontMatterValue {
    fn from(v: &str) -> Self {
        FrontMatterValue::Text(v.to_string())
    }
}

impl From<String> for FrontMatterValue {
    fn from(v: String) -> Self {
        FrontMatterValue::Text(v)
    }
}

impl From<bool> for FrontMatterValue {
    fn from(v: bool) -> Self {
        FrontMatterValue::Bool(v)
    }
}

/// Ordered key/value pairs rendered as a `---` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    fields: Vec<(String, FrontMatterValue)>,
}

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field. Keys are not deduplicated.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FrontMatterValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Render the block followed by one blank line, ready to prefix a body.
    pub fn render(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            let _ = match value {
                FrontMatterValue::Bool(b) => writeln!(out, "{key}: {b}"),
                FrontMatterValue::Text(s) => writeln!(out, "{key}: \"{}\"", escape(s)),
            };
        }
        out.push_str("---\n\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
