//! Configuration for a preparation run.
//!
//! Every knob lives in [`PrepareConfig`], built via [`PrepareConfigBuilder`].
//! The CLI maps its flags and `KBPREP_*` environment variables onto the
//! builder; library callers set only what they need and rely on the defaults
//! documented per field.

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::KbPrepError;
use crate::pipeline::docx::StyleMap;
use crate::pipeline::noise::NoiseRules;
use crate::progress::ProgressCallback;

/// File names skipped during discovery regardless of extension.
pub const DEFAULT_IGNORED_NAMES: &[&str] = &[".DS_Store", "Icon", "Icon\r"];

/// Configuration for [`crate::prepare()`].
///
/// # Example
/// ```rust
/// use kbprep::PrepareConfig;
///
/// let config = PrepareConfig::builder()
///     .input_root("knowledgebase")
///     .output_root("knowledgebase_clean")
///     .chunk_pages(25)
///     .dry_run(true)
///     .build()
///     .unwrap();
/// assert!(config.redact);
/// ```
#[derive(Clone)]
pub struct PrepareConfig {
    /// Root of the source tree. Default: `knowledgebase`.
    pub input_root: PathBuf,

    /// Root of the cleaned tree and the manifest files. Default:
    /// `knowledgebase_clean`.
    pub output_root: PathBuf,

    /// Replace e-mail addresses and phone numbers with placeholders.
    /// Default: true.
    pub redact: bool,

    /// Pages per PDF chunk, at least 1. Default: 40.
    pub chunk_pages: usize,

    /// Extract and measure everything but write nothing. Default: false.
    pub dry_run: bool,

    /// Timestamp stamped into front-matter and the manifest. Default: None,
    /// meaning the wall clock at the start of the run.
    ///
    /// Pinning it makes artifact bytes, and therefore ids, reproducible.
    pub generated_at: Option<DateTime<Utc>>,

    /// pdfium shared library (file, or directory containing it). Default:
    /// None, meaning the system library search path.
    pub pdfium_library: Option<PathBuf>,

    /// Noise-line patterns for Word and PDF text. Default: French corpus
    /// defaults, see [`NoiseRules::default`].
    pub noise: NoiseRules,

    /// Word paragraph style → Markdown rules. Default: English style ids
    /// plus the French aliases, see [`StyleMap::default`].
    pub docx_styles: StyleMap,

    /// Exact file names never treated as documents. Default:
    /// [`DEFAULT_IGNORED_NAMES`].
    pub ignored_names: Vec<String>,

    /// Optional per-document progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("knowledgebase"),
            output_root: PathBuf::from("knowledgebase_clean"),
            redact: true,
            chunk_pages: 40,
            dry_run: false,
            generated_at: None,
            pdfium_library: None,
            noise: NoiseRules::default(),
            docx_styles: StyleMap::default(),
            ignored_names: DEFAULT_IGNORED_NAMES.iter().map(|s| s.to_string()).collect(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PrepareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareConfig")
            .field("input_root", &self.input_root)
            .field("output_root", &self.output_root)
            .field("redact", &self.redact)
            .field("chunk_pages", &self.chunk_pages)
            .field("dry_run", &self.dry_run)
            .field("generated_at", &self.generated_at)
            .field("pdfium_library", &self.pdfium_library)
            .field("noise", &self.noise)
            .field("docx_styles", &self.docx_styles)
            .field("ignored_names", &self.ignored_names)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PrepareProgressCallback>"),
            )
            .finish()
    }
}

impl PrepareConfig {
    /// Create a new builder for `PrepareConfig`.
    pub fn builder() -> PrepareConfigBuilder {
        PrepareConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether `name` is in the ignore list or hidden.
    pub fn is_ignored_name(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignored_names.iter().any(|n| n == name)
    }
}

/// Builder for [`PrepareConfig`].
#[derive(Debug)]
pub struct PrepareConfigBuilder {
    config: PrepareConfig,
}

impl PrepareConfigBuilder {
    pub fn input_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_root = path.into();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn redact(mut self, v: bool) -> Self {
        self.config.redact = v;
        self
    }

    /// Not clamped: [`Self::build`] rejects 0.
    pub fn chunk_pages(mut self, n: usize) -> Self {
        self.config.chunk_pages = n;
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.config.dry_run = v;
        self
    }

    pub fn generated_at(mut self, ts: DateTime<Utc>) -> Self {
        self.config.generated_at = Some(ts);
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    pub fn noise(mut self, rules: NoiseRules) -> Self {
        self.config.noise = rules;
        self
    }

    pub fn docx_styles(mut self, styles: StyleMap) -> Self {
        self.config.docx_styles = styles;
        self
    }

    /// Load noise rules from a JSON file; absent keys keep their defaults.
    pub fn noise_rules_file(mut self, path: &Path) -> Result<Self, KbPrepError> {
        self.config.noise = NoiseRules::from_json_file(path)?;
        Ok(self)
    }

    pub fn ignored_names(mut self, names: Vec<String>) -> Self {
        self.config.ignored_names = names;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PrepareConfig, KbPrepError> {
        let c = &self.config;
        if c.chunk_pages == 0 {
            return Err(KbPrepError::InvalidConfig(
                "chunk_pages must be ≥ 1".into(),
            ));
        }
        if c.input_root.as_os_str().is_empty() {
            return Err(KbPrepError::InvalidConfig(
                "input_root must not be empty".into(),
            ));
        }
        if c.output_root.as_os_str().is_empty() {
            return Err(KbPrepError::InvalidConfig(
                "output_root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Parse a pinned generation timestamp (RFC 3339, any offset) into UTC.
pub fn parse_generated_at(value: &str) -> Result<DateTime<Utc>, KbPrepError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| KbPrepError::InvalidTimestamp {
            value: value.to_string(),
        })
}
