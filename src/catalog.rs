//! Read-only check of the book catalog consumed by the cover tooling.
//!
//! The catalog is a JSON document of the form
//! `{"livres": [{"titre", "auteur", "image", "url_amazon"}, ...]}`. Each
//! book's `image` field names where its cover should live, relative to the
//! project root (the parent of the catalog's directory). This module resolves
//! those destinations and reports which covers are present; it never touches
//! the network.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::KbPrepError;
use crate::pipeline::paths::resolve_asset_path;

/// Extensions a cover destination must end with.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Title shown for books without one.
pub const UNTITLED: &str = "(sans titre)";

static RE_ASIN_DP: Lazy<Regex> = Lazy::new(|| Regex::new(r"/dp/([A-Z0-9]{10})").unwrap());
static RE_ASIN_GP: Lazy<Regex> = Lazy::new(|| Regex::new(r"/gp/product/([A-Z0-9]{10})").unwrap());

/// One catalog entry. Every field is optional; scalars of other JSON types
/// are kept in their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBook {
    pub titre: Option<String>,
    pub auteur: Option<String>,
    pub image: Option<String>,
    pub url_amazon: Option<String>,
}

impl CatalogBook {
    fn from_value(v: &Value) -> Self {
        let field = |key: &str| match v.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };
        Self {
            titre: field("titre"),
            auteur: field("auteur"),
            image: field("image"),
            url_amazon: field("url_amazon"),
        }
    }

    /// Trimmed title, or [`UNTITLED`].
    pub fn display_title(&self) -> &str {
        self.titre
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
    }

    /// ASIN from the Amazon product URL, if any.
    pub fn asin(&self) -> Option<String> {
        asin_from_url(self.url_amazon.as_deref()?.trim())
    }

    /// Where this book's cover belongs.
    pub fn cover_destination(&self, project_root: &Path) -> PathBuf {
        resolve_asset_path(self.image.as_deref().unwrap_or(""), project_root)
    }

    /// Inspect the cover destination on disk.
    pub fn cover_status(&self, project_root: &Path) -> CoverStatus {
        let dest = self.cover_destination(project_root);
        let dest_str = dest.to_string_lossy();
        if !IMAGE_EXTENSIONS.iter().any(|ext| dest_str.ends_with(ext)) {
            return CoverStatus::Invalid {
                image: self.image.clone().unwrap_or_default(),
            };
        }

        let present = std::fs::metadata(&dest)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if present {
            return CoverStatus::Present { dest };
        }

        let asin = self.asin();
        let fallback_url = asin.as_deref().map(openlibrary_cover_url);
        CoverStatus::Missing {
            dest,
            asin,
            fallback_url,
        }
    }
}

/// State of one book's cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverStatus {
    /// The destination exists and is non-empty.
    Present { dest: PathBuf },
    /// The destination is absent or empty; `fallback_url` is where a cover
    /// could be fetched from when the product URL carries an ASIN.
    Missing {
        dest: PathBuf,
        asin: Option<String>,
        fallback_url: Option<String>,
    },
    /// The declared image path does not name an image file.
    Invalid { image: String },
}

/// Extract a 10-character ASIN from `/dp/…` or `/gp/product/…` URLs.
pub fn asin_from_url(url: &str) -> Option<String> {
    RE_ASIN_DP
        .captures(url)
        .or_else(|| RE_ASIN_GP.captures(url))
        .map(|c| c[1].to_string())
}

/// OpenLibrary large-cover URL for an ISBN-10/ASIN; 404s instead of
/// returning a placeholder image.
pub fn openlibrary_cover_url(asin: &str) -> String {
    format!("https://covers.openlibrary.org/b/isbn/{asin}-L.jpg?default=false")
}

/// A parsed catalog and the project root its paths resolve against.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub path: PathBuf,
    pub project_root: PathBuf,
    pub books: Vec<CatalogBook>,
}

/// Counts over a catalog's covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverSummary {
    pub present: usize,
    pub missing: usize,
    pub invalid: usize,
}

impl Catalog {
    /// Load and validate a catalog file.
    pub fn load(path: &Path) -> Result<Self, KbPrepError> {
        if !path.exists() {
            return Err(KbPrepError::CatalogNotFound {
                path: path.to_path_buf(),
            });
        }
        let invalid = |detail: String| KbPrepError::CatalogInvalid {
            path: path.to_path_buf(),
            detail,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let json: Value = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        let books = json
            .get("livres")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing or non-array 'livres' key".into()))?
            .iter()
            .map(CatalogBook::from_value)
            .collect::<Vec<_>>();

        let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let project_root = resolved
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!(
            "catalog {}: {} books, project root {}",
            path.display(),
            books.len(),
            project_root.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            project_root,
            books,
        })
    }

    /// Status of every book, in catalog order.
    pub fn cover_statuses(&self) -> Vec<(&CatalogBook, CoverStatus)> {
        self.books
            .iter()
            .map(|b| (b, b.cover_status(&self.project_root)))
            .collect()
    }

    pub fn summarize(statuses: &[(&CatalogBook, CoverStatus)]) -> CoverSummary {
        let mut summary = CoverSummary::default();
        for (_, status) in statuses {
            match status {
                CoverStatus::Present { .. } => summary.present += 1,
                CoverStatus::Missing { .. } => summary.missing += 1,
                CoverStatus::Invalid { .. } => summary.invalid += 1,
            }
        }
        summary
    }
}
