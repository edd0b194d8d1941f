//! Single-pass tokenizer for the fixture tag markup.
//!
//! Tags look like `<AS:0>`, `</AS:0>`, `<ER:0.1,2.0>`, `<TS:3>`. The scanner
//! emits every tag literal once, in source order, and [`match_tags`] pairs
//! them with a stack. Everything else is plain text.

use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use crate::error::{EncError, EncResult};
use crate::text::TextSpan;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(/?)(AS|ER|TS):([0-9.,]+)>").expect("valid tag pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `AS`: active statement body.
    ActiveStatement,
    /// `ER`: exception region of an active statement.
    ExceptionRegion,
    /// `TS`: editor tracking span.
    TrackingSpan,
}

impl TagKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "AS" => Some(TagKind::ActiveStatement),
            "ER" => Some(TagKind::ExceptionRegion),
            "TS" => Some(TagKind::TrackingSpan),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TagKind::ActiveStatement => "AS",
            TagKind::ExceptionRegion => "ER",
            TagKind::TrackingSpan => "TS",
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tag literal found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagToken<'a> {
    pub kind: TagKind,
    pub closing: bool,
    /// The id list as written, e.g. `0,1` or `0.1`.
    pub ids: &'a str,
    /// Byte range of the literal, brackets included.
    pub range: Range<usize>,
}

impl fmt::Display for TagToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slash = if self.closing { "/" } else { "" };
        write!(f, "<{}{}:{}>", slash, self.kind, self.ids)
    }
}

/// A matched open/close pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedSpan<'a> {
    pub kind: TagKind,
    pub ids: &'a str,
    /// Byte range between the opening and closing literal.
    pub content: TextSpan,
    /// Byte offset of the opening literal.
    pub offset: usize,
    /// Number of enclosing tag pairs.
    pub depth: usize,
}

/// Every tag literal in source order.
pub fn scan(source: &str) -> Vec<TagToken<'_>> {
    TAG_PATTERN
        .captures_iter(source)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            Some(TagToken {
                kind: TagKind::from_name(captures.get(2)?.as_str())?,
                closing: !captures.get(1)?.as_str().is_empty(),
                ids: captures.get(3)?.as_str(),
                range: whole.range(),
            })
        })
        .collect()
}

/// Pair opening and closing tags.
///
/// Tags must nest: a closing tag has to match the innermost open tag in
/// both kind and id list. Overlapping, unbalanced and unclosed tags are
/// errors. Pairs are returned in order of their opening tag.
pub fn match_tags(source: &str) -> EncResult<Vec<TaggedSpan<'_>>> {
    let mut open: Vec<TagToken<'_>> = Vec::new();
    let mut matched: Vec<TaggedSpan<'_>> = Vec::new();

    for token in scan(source) {
        if !token.closing {
            open.push(token);
            continue;
        }

        let Some(opening) = open.pop() else {
            return Err(EncError::fixture(
                token.range.start,
                format!("{} has no opening tag", token),
            ));
        };
        if opening.kind != token.kind || opening.ids != token.ids {
            return Err(EncError::fixture(
                token.range.start,
                format!("{} overlaps or mismatches {} opened at {}", token, opening, opening.range.start),
            ));
        }

        matched.push(TaggedSpan {
            kind: opening.kind,
            ids: opening.ids,
            content: TextSpan::new(opening.range.end, token.range.start),
            offset: opening.range.start,
            depth: open.len(),
        });
    }

    if let Some(unclosed) = open.pop() {
        return Err(EncError::fixture(
            unclosed.range.start,
            format!("{} is never closed", unclosed),
        ));
    }

    matched.sort_by_key(|tag| tag.offset);
    Ok(matched)
}

/// Replace every tag literal with spaces, keeping all offsets intact.
pub fn clear_tags(source: &str) -> String {
    let mut cleared = String::with_capacity(source.len());
    let mut last = 0;
    for token in scan(source) {
        cleared.push_str(&source[last..token.range.start]);
        cleared.extend(std::iter::repeat_n(' ', token.range.len()));
        last = token.range.end;
    }
    cleared.push_str(&source[last..]);
    cleared
}
