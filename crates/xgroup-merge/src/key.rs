//! Grouping keys.
//!
//! A key is derived only from an element's own children, never from its
//! identity in memory, so the same document always groups the same way.

use std::fmt;

use serde::{Deserialize, Serialize};

use xgroup_tree::{Document, Element, ElementId};

/// How key text is compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyMatch {
    /// Trimmed text, case-sensitive.
    #[default]
    Exact,
    /// Trimmed text, compared after Unicode lowercasing.
    CaseInsensitive,
    /// Numbers compare by value (`007`, `7` and `7.0` are one key); other
    /// text falls back to exact comparison.
    Numeric,
}

impl KeyMatch {
    /// Normalize already-trimmed key text for comparison.
    pub fn normalize(&self, raw: &str) -> String {
        match self {
            Self::Exact => raw.to_string(),
            Self::CaseInsensitive => raw.to_lowercase(),
            Self::Numeric => normalize_number(raw).unwrap_or_else(|| raw.to_string()),
        }
    }
}

impl fmt::Display for KeyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::CaseInsensitive => "case-insensitive",
            Self::Numeric => "numeric",
        })
    }
}

fn normalize_number(raw: &str) -> Option<String> {
    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    if let Some(exact) = canonical_decimal(unsigned) {
        return Some(exact);
    }
    // Exponent forms only; plain decimals never reach f64.
    let value = unsigned.parse::<f64>().ok().filter(|v| v.is_finite())?;
    // Collapse -0 into 0.
    Some(format!("{}", value + 0.0))
}

/// Canonical text of a plain decimal (`-?digits[.digits]`) of any length:
/// no leading zeros in the integer part, no trailing zeros in the fraction.
fn canonical_decimal(text: &str) -> Option<String> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');
    let int_part = if int_part.is_empty() { "0" } else { int_part };

    let mut out = String::new();
    if negative && (int_part != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(int_part);
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    Some(out)
}

/// The identity an element is grouped under, scoped to one parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GroupKey {
    /// Normalized key text.
    Value(String),
    /// Position among the key-less siblings; such an element is never
    /// grouped with anything else.
    Ordinal(usize),
}

impl GroupKey {
    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::Ordinal(_))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:?}"),
            Self::Ordinal(n) => write!(f, "<unkeyed #{n}>"),
        }
    }
}

/// The trimmed key text of `element`, if it has a usable one.
///
/// With a `key_field`, this is the text of the first direct child with that
/// tag. Without one, it is the text of the first direct child whose text is
/// not blank.
pub fn derive_key<'d>(
    doc: &'d Document,
    element: ElementId,
    key_field: Option<&str>,
) -> Option<&'d str> {
    match key_field {
        Some(field) => doc
            .first_child_by_tag(element, field)
            .and_then(|c| doc.element(c))
            .and_then(Element::trimmed_text),
        None => doc
            .children(element)
            .iter()
            .filter_map(|&c| doc.element(c))
            .find_map(Element::trimmed_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(xml: &str) -> (Document, ElementId) {
        let doc = Document::parse_str(xml).unwrap();
        let root = doc.root();
        (doc, root)
    }

    #[test]
    fn explicit_field_uses_first_matching_child() {
        let (doc, e) = employee("<E><Name>Ann</Name><XRefCode> E1 </XRefCode><XRefCode>E2</XRefCode></E>");
        assert_eq!(derive_key(&doc, e, Some("XRefCode")), Some("E1"));
    }

    #[test]
    fn explicit_field_with_blank_text_has_no_key() {
        let (doc, e) = employee("<E><XRefCode>  </XRefCode><XRefCode>E2</XRefCode></E>");
        assert_eq!(derive_key(&doc, e, Some("XRefCode")), None);
    }

    #[test]
    fn explicit_field_missing_has_no_key() {
        let (doc, e) = employee("<E><Name>Ann</Name></E>");
        assert_eq!(derive_key(&doc, e, Some("XRefCode")), None);
    }

    #[test]
    fn heuristic_takes_first_non_blank_child() {
        let (doc, e) = employee("<E><Empty/><Blank> </Blank><Name>Ann</Name><Id>7</Id></E>");
        assert_eq!(derive_key(&doc, e, None), Some("Ann"));
    }

    #[test]
    fn heuristic_ignores_own_text() {
        let (doc, e) = employee("<E>self<Empty/></E>");
        assert_eq!(derive_key(&doc, e, None), None);
    }

    #[test]
    fn exact_match_is_case_sensitive() {
        assert_ne!(KeyMatch::Exact.normalize("e1"), KeyMatch::Exact.normalize("E1"));
    }

    #[test]
    fn case_insensitive_folds_case() {
        assert_eq!(
            KeyMatch::CaseInsensitive.normalize("Straße"),
            KeyMatch::CaseInsensitive.normalize("STRAßE")
        );
    }

    #[test]
    fn numeric_compares_by_value() {
        let m = KeyMatch::Numeric;
        assert_eq!(m.normalize("007"), m.normalize("7"));
        assert_eq!(m.normalize("7.0"), m.normalize("7"));
        assert_eq!(m.normalize("+7"), m.normalize("7"));
        assert_eq!(m.normalize("-0.0"), m.normalize("0"));
        assert_ne!(
            m.normalize("12345678901234567890"),
            m.normalize("12345678901234567891")
        );
    }

    #[test]
    fn numeric_keeps_long_integers_distinct() {
        let m = KeyMatch::Numeric;
        let a = "1234567890123456789012345678901234567890";
        let b = "1234567890123456789012345678901234567891";
        assert_ne!(m.normalize(a), m.normalize(b));
        assert_eq!(m.normalize(&format!("000{a}")), m.normalize(a));
        assert_eq!(m.normalize(&format!("{a}.000")), a);
    }

    #[test]
    fn numeric_canonicalizes_decimals_and_exponents() {
        let m = KeyMatch::Numeric;
        assert_eq!(m.normalize("7.50"), "7.5");
        assert_eq!(m.normalize(".5"), "0.5");
        assert_eq!(m.normalize("-000.0"), "0");
        assert_eq!(m.normalize("1e3"), m.normalize("1000"));
        assert_eq!(m.normalize("."), ".");
    }

    #[test]
    fn numeric_falls_back_to_text() {
        assert_eq!(KeyMatch::Numeric.normalize("E7"), "E7");
        assert_eq!(KeyMatch::Numeric.normalize("NaN"), "NaN");
    }

    #[test]
    fn group_key_display() {
        assert_eq!(GroupKey::Value("E1".into()).to_string(), "\"E1\"");
        assert_eq!(GroupKey::Ordinal(3).to_string(), "<unkeyed #3>");
        assert!(GroupKey::Ordinal(0).is_ordinal());
    }
}
