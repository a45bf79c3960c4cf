//! Deterministic naming: slugs, titles, output paths and asset references.
//!
//! Everything here is a pure function of its arguments so that re-running the
//! pipeline over an unchanged tree lands every artifact at the same path.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Slug used when a name reduces to nothing.
pub const FALLBACK_SLUG: &str = "document";

/// Asset used when a catalog entry declares no image, relative to the
/// project root.
pub const FALLBACK_ASSET: &str = "img/books/unknown.jpg";

static RE_SLUG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-']").unwrap());
static RE_SLUG_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());
static RE_SLUG_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());
static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Turn arbitrary text into a lowercase, hyphenated path segment.
///
/// Never returns an empty string and never starts or ends with `-`.
/// Apostrophes survive (`L’épistémologie` → `l'épistémologie`).
/// `\w` is Unicode-aware and includes combining marks, so a name made only
/// of combining accents keeps them instead of falling back to `document`.
pub fn slugify(text: &str) -> String {
    let s = text.trim().to_lowercase().replace('\u{2019}', "'");
    let s = RE_SLUG_STRIP.replace_all(&s, " ");
    let s = RE_SLUG_SEP.replace_all(&s, "-");
    let s = RE_SLUG_DASHES.replace_all(&s, "-");
    let s = s.trim_matches('-');
    if s.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        s.to_string()
    }
}

/// Title inferred from a file name: stem with underscores as spaces,
/// trimmed, runs of whitespace collapsed.
pub fn infer_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.replace('_', " ");
    RE_MULTI_SPACE.replace_all(stem.trim(), " ").into_owned()
}

/// `/`-separated form of a relative path, independent of the host OS.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Output suffix for a whole-document artifact.
pub fn markdown_suffix() -> String {
    ".md".to_string()
}

/// Output suffix for a PDF page range, e.g. `-p0041-p0080.md`.
pub fn page_range_suffix(start: usize, end: usize) -> String {
    format!("-p{start:04}-p{end:04}.md")
}

/// Mirror `rel_source` under `output_root`, slugifying every directory
/// segment and the file stem, then appending `suffix`.
pub fn build_output_path(output_root: &Path, rel_source: &Path, suffix: &str) -> PathBuf {
    let mut out = output_root.to_path_buf();
    if let Some(parent) = rel_source.parent() {
        for segment in parent.components() {
            if let Component::Normal(name) = segment {
                out.push(slugify(&name.to_string_lossy()));
            }
        }
    }
    let stem = rel_source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    out.push(format!("{}{}", slugify(&stem), suffix));
    out
}

/// Resolve an asset reference declared in source metadata.
///
/// * empty → [`FALLBACK_ASSET`] under `project_root`
/// * absolute → unchanged
/// * a leading `..` segment is dropped, then the rest is joined to
///   `project_root` and normalised lexically
///
/// This repairs references written relative to a sibling directory; it is
/// not a sandbox (inner `..` segments still climb).
pub fn resolve_asset_path(raw: &str, project_root: &Path) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() {
        return project_root.join(FALLBACK_ASSET);
    }

    let path = Path::new(raw);
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let mut components = path.components().peekable();
    if matches!(components.peek(), Some(Component::ParentDir)) {
        components.next();
    }
    let relative: PathBuf = components.collect();
    normalize_lexically(&project_root.join(relative))
}

/// Collapse `.` and `..` components without touching the file system.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Sociologie Générale  Vol_1"), "sociologie-générale-vol-1");
        assert_eq!(slugify("L’épistémologie"), "l'épistémologie");
        assert_eq!(slugify("  --Hello,   World!--  "), "hello-world");
    }

    #[test]
    fn slugify_never_empty() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify("---"), FALLBACK_SLUG);
        assert_eq!(slugify("___"), FALLBACK_SLUG);
    }

    #[test]
    fn slugify_keeps_combining_marks() {
        assert_eq!(slugify("\u{301}"), "\u{301}");
        assert_eq!(slugify("Cafe\u{301} noir"), "cafe\u{301}-noir");
    }

    #[test]
    fn slugify_is_total() {
        let inputs = [
            "",
            " ",
            "-a-",
            "Été 2024 — Bilan (final).docx",
            "C'est quoi la sérendipité?",
            "\t\n",
            "ÉCOLE__Normale",
            "a--b__c  d",
            "日本語 テキスト",
        ];
        for input in inputs {
            let slug = slugify(input);
            assert!(!slug.is_empty(), "{input:?}");
            assert!(!slug.starts_with('-') && !slug.ends_with('-'), "{input:?} → {slug}");
            assert!(!slug.contains("--"), "{input:?} → {slug}");
            assert!(
                slug.chars()
                    .all(|c| c == '-' || c == '\'' || c.is_alphanumeric() || c == '_'),
                "{input:?} → {slug}"
            );
            assert_eq!(slug, slug.to_lowercase(), "{input:?}");
        }
    }

    #[test]
    fn infer_title_from_file_name() {
        assert_eq!(infer_title(Path::new("a/Le_rasoir__d_Occam.pdf")), "Le rasoir d Occam");
        assert_eq!(infer_title(Path::new("notes.txt")), "notes");
    }

    #[test]
    fn output_path_mirrors_hierarchy() {
        let out = build_output_path(
            Path::new("/out"),
            Path::new("Psychologie/Cours Magistral/Séance_1.docx"),
            &markdown_suffix(),
        );
        assert_eq!(out, PathBuf::from("/out/psychologie/cours-magistral/séance-1.md"));
    }

    #[test]
    fn output_path_for_pdf_chunk() {
        let out = build_output_path(Path::new("/out"), Path::new("Hasard/Antifragile.pdf"), &page_range_suffix(41, 80));
        assert_eq!(out, PathBuf::from("/out/hasard/antifragile-p0041-p0080.md"));
    }

    #[test]
    fn to_posix_joins_with_slashes() {
        let p: PathBuf = ["a", "b", "c.txt"].iter().collect();
        assert_eq!(to_posix(&p), "a/b/c.txt");
    }

    #[test]
    fn resolve_empty_reference() {
        let root = Path::new("/site");
        assert_eq!(resolve_asset_path("", root), PathBuf::from("/site/img/books/unknown.jpg"));
    }

    #[test]
    fn resolve_absolute_reference() {
        let root = Path::new("/site");
        assert_eq!(resolve_asset_path("/var/covers/a.jpg", root), PathBuf::from("/var/covers/a.jpg"));
    }

    #[test]
    fn resolve_strips_leading_parent() {
        let root = Path::new("/site");
        assert_eq!(
            resolve_asset_path("../img/books/sapiens.jpg", root),
            PathBuf::from("/site/img/books/sapiens.jpg")
        );
        assert_eq!(
            resolve_asset_path("img/./books/nexus.jpg", root),
            PathBuf::from("/site/img/books/nexus.jpg")
        );
    }
}
