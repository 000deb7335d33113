#![forbid(unsafe_code)]

//! The set of characters that terminate a tag.
//!
//! Both the tokenizer and the boundary checks read from the same tables, and
//! regex classes are produced through [`TagCharClass`] rather than by pasting
//! strings together.

use std::fmt::Write as _;

const DISALLOWED_ASCII: &str = "'!\"#$%&()*+,.:;<=>?@^`{|}~[]\\";

// General Punctuation and Supplemental Punctuation blocks.
const DISALLOWED_RANGES: &[(char, char)] = &[('\u{2000}', '\u{206F}'), ('\u{2E00}', '\u{2E7F}')];

pub fn is_tag_char(ch: char) -> bool {
    if ch.is_whitespace() || DISALLOWED_ASCII.contains(ch) {
        return false;
    }
    !DISALLOWED_RANGES
        .iter()
        .any(|(lo, hi)| (*lo..=*hi).contains(&ch))
}

/// True for `#` followed by at least one tag character and nothing else.
pub fn is_tag(text: &str) -> bool {
    let Some(body) = text.strip_prefix('#') else {
        return false;
    };
    !body.is_empty() && body.chars().all(is_tag_char)
}

pub fn is_horizontal_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t')
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagCharClass {
    /// Characters allowed inside a tag body.
    Body,
    /// Characters that end a tag.
    Boundary,
}

impl TagCharClass {
    /// Regex character class for this set, e.g. `[^\s\x{27}...]`.
    pub fn to_regex(self) -> String {
        let mut out = String::from("[");
        if self == Self::Body {
            out.push('^');
        }
        out.push_str(r"\s");
        for ch in DISALLOWED_ASCII.chars() {
            push_escaped(&mut out, ch);
        }
        for (lo, hi) in DISALLOWED_RANGES {
            push_escaped(&mut out, *lo);
            out.push('-');
            push_escaped(&mut out, *hi);
        }
        out.push(']');
        out
    }

    pub fn contains(self, ch: char) -> bool {
        match self {
            Self::Body => is_tag_char(ch),
            Self::Boundary => !is_tag_char(ch),
        }
    }
}

fn push_escaped(out: &mut String, ch: char) {
    let _ = write!(out, r"\x{{{:X}}}", ch as u32);
}
