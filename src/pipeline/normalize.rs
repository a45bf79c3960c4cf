//! Normalisation: canonical whitespace plus optional PII redaction.
//!
//! Every extractor output passes through [`clean`] before front-matter is
//! attached, so the rules here are the only place where line endings,
//! blank-line runs and personal data are handled.
//!
//! ## Rule Order
//!
//! Non-breaking spaces must become plain spaces *before* trailing whitespace
//! is trimmed, otherwise a line ending in U+00A0 would only lose it on a
//! second pass and `clean` would not be idempotent.

use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder substituted for e-mail addresses.
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL]";

/// Placeholder substituted for phone numbers.
pub const PHONE_PLACEHOLDER: &str = "[TELEPHONE]";

/// Apply all normalisation rules.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Replace non-breaking spaces with spaces
/// 3. Trim spaces and tabs before each newline
/// 4. Collapse 3+ consecutive newlines to one blank line
/// 5. Redact e-mails and phone numbers (when `redact` is set)
/// 6. Trim the whole text and end with exactly one newline
///
/// `clean(&clean(x, r), r) == clean(x, r)` for every input.
pub fn clean(input: &str, redact: bool) -> String {
    let s = normalise_line_endings(input);
    let s = replace_non_breaking_spaces(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = if redact { redact_pii(&s) } else { s };
    ensure_single_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

/// CRLF and lone CR become LF.
pub fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Non-breaking spaces ──────────────────────────────────────────────

fn replace_non_breaking_spaces(input: &str) -> String {
    input.replace('\u{00A0}', " ")
}

// ── Rule 3: Trim trailing whitespace before newlines ─────────────────────────

static RE_TRAILING_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());

fn trim_trailing_whitespace(input: &str) -> String {
    RE_TRAILING_WS.replace_all(input, "\n").into_owned()
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 5: PII redaction ────────────────────────────────────────────────────
//
// Heuristic patterns, not validated grammars: a long digit run that happens to
// look like a French number will be redacted, and exotic address syntax will
// slip through.

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").unwrap()
});

static RE_FR_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+33|0)\s*[1-9](?:[\s.\-]*\d{2}){4}\b").unwrap()
});

static RE_INTL_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+\d{1,3}[\s.\-]?\d(?:[\s.\-]*\d){6,}").unwrap());

/// Replace e-mail addresses and phone numbers with fixed placeholders.
pub fn redact_pii(input: &str) -> String {
    let s = RE_EMAIL.replace_all(input, EMAIL_PLACEHOLDER);
    let s = RE_FR_PHONE.replace_all(&s, PHONE_PLACEHOLDER);
    let s = RE_INTL_PHONE.replace_all(&s, PHONE_PLACEHOLDER);
    s.into_owned()
}

// ── Rule 6: Single final newline ─────────────────────────────────────────────

fn ensure_single_final_newline(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("a  \t\nb \nc"), "a\nb\nc");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb\n\nc"), "a\n\nb\n\nc");
    }

    #[test]
    fn test_final_newline() {
        assert_eq!(ensure_single_final_newline("\n\nhello\n\n\n"), "hello\n");
        assert_eq!(ensure_single_final_newline("   "), "\n");
    }

    #[test]
    fn test_nbsp_before_newline_is_trimmed_in_one_pass() {
        assert_eq!(clean("mot\u{00A0}\nsuite", false), "mot\nsuite\n");
    }

    #[test]
    fn test_redacts_email() {
        let out = clean("contact: jean@example.com", true);
        assert!(out.contains(EMAIL_PLACEHOLDER));
        assert!(!out.contains("jean@example.com"));
    }

    #[test]
    fn test_redacts_french_phones() {
        for phone in ["06 12 34 56 78", "01.23.45.67.89", "+33 6 12 34 56 78", "0612345678"] {
            let out = clean(&format!("Appelez le {phone} demain"), true);
            assert!(out.contains(PHONE_PLACEHOLDER), "{phone} → {out}");
            assert!(!out.contains(phone), "{phone} survived: {out}");
        }
    }

    #[test]
    fn test_redacts_international_phone() {
        let out = clean("Bureau: +44 20 7946 0958", true);
        assert!(out.contains(PHONE_PLACEHOLDER), "got {out}");
        assert!(!out.contains("7946"));
    }

    #[test]
    fn test_no_redaction_when_disabled() {
        let out = clean("jean@example.com 06 12 34 56 78", false);
        assert_eq!(out, "jean@example.com 06 12 34 56 78\n");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let samples = [
            "",
            "\n\n\n",
            "  titre  \r\n\r\n\r\n\r\ncorps\u{00A0}\t \nfin",
            "# Titre\n\n\n\n- a \n- b\t\n",
            "mail: a.b@c.fr, tel 06 12 34 56 78, +1 555 123 4567\n\n\n\nok",
            "\u{00A0}\u{00A0}\n\u{00A0}x\u{00A0}\u{00A0}\n",
            "ligne\r\rligne\r\n \n \n \nligne",
        ];
        for redact in [true, false] {
            for s in samples {
                let once = clean(s, redact);
                assert_eq!(clean(&once, redact), once, "not idempotent for {s:?}");
            }
        }
    }

    #[test]
    fn test_output_ends_with_exactly_one_newline() {
        let out = clean("a\n\n\n", true);
        assert!(out.ends_with('\n'));
        assert!(!out.ends_with("\n\n"));
    }
}
