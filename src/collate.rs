//! String and identifier orderings used for every published collection.
//!
//! [`locale_cmp`] approximates the root-locale collation of the web client
//! consuming these artifacts: base letters first, then accents, then case
//! (lowercase first), with a plain code-point comparison as final tie-break
//! so the order is total. Accents compare left to right with the root
//! table's weights (acute before grave); the French backwards-accent rule
//! is not applied.

use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical decomposition, combining marks removed, lowercased.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Spaces and punctuation sort before digits, digits before letters.
fn char_class(c: char) -> u8 {
    if c.is_alphabetic() {
        2
    } else if c.is_numeric() {
        1
    } else {
        0
    }
}

fn primary_key(s: &str) -> Vec<(u8, char)> {
    fold(s).chars().map(|c| (char_class(c), c)).collect()
}

/// Accent weights in the order of the root collation table: acute, grave,
/// breve, circumflex, caron, ring, diaeresis, double acute, tilde, dot
/// above, cedilla, ogonek, macron.
const MARK_ORDER: &[char] = &[
    '\u{0301}', '\u{0300}', '\u{0306}', '\u{0302}', '\u{030C}', '\u{030A}', '\u{0308}',
    '\u{030B}', '\u{0303}', '\u{0307}', '\u{0327}', '\u{0328}', '\u{0304}',
];

/// 0 for base characters; listed marks by [`MARK_ORDER`], other marks after
/// them by code point.
fn mark_weight(c: char) -> u32 {
    if !is_combining_mark(c) {
        return 0;
    }
    match MARK_ORDER.iter().position(|m| *m == c) {
        Some(i) => i as u32 + 1,
        None => 0x1000 + c as u32,
    }
}

fn secondary_key(s: &str) -> Vec<u32> {
    s.nfd().map(mark_weight).collect()
}

fn tertiary_key(s: &str) -> Vec<bool> {
    s.nfd().map(char::is_uppercase).collect()
}

pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    primary_key(a)
        .cmp(&primary_key(b))
        .then_with(|| secondary_key(a).cmp(&secondary_key(b)))
        .then_with(|| tertiary_key(a).cmp(&tertiary_key(b)))
        .then_with(|| a.cmp(b))
}

/// Leading integer of `s`, read the way a lenient `parseInt` would:
/// optional whitespace and sign, then as many digits as present.
pub fn numeric_prefix(s: &str) -> Option<i128> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse::<i128>().ok().map(|n| sign * n)
}

/// Numeric ids ascending; ids without a numeric prefix after all numeric
/// ones and equal to each other, so a stable sort keeps their input order.
pub fn cmp_numeric_ids(a: &str, b: &str) -> Ordering {
    match (numeric_prefix(a), numeric_prefix(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
