//! Tracking spans through text edits.
//!
//! The edit between a base text and its current version is reconstructed
//! with a character-level diff, then span endpoints are carried across the
//! changed hunks. This is how active statement and exception region spans
//! follow the user's typing between the base snapshot and the current one.

use similar::{ChangeTag, TextDiff};

use super::mapper::PositionMapper;
use super::position::{LinePositionSpan, TextSpan};

/// Which side of an insertion an offset sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Span starts move past text inserted exactly at them.
    Start,
    /// Span ends stay before text inserted exactly at them.
    End,
}

/// One contiguous changed region: `old` bytes were replaced by `new` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Hunk {
    old_start: usize,
    old_end: usize,
    new_start: usize,
    new_end: usize,
}

impl Hunk {
    fn delta(&self) -> isize {
        (self.new_end - self.new_start) as isize - (self.old_end - self.old_start) as isize
    }

    fn is_insertion_only(&self) -> bool {
        self.old_start == self.old_end
    }
}

/// The set of changed hunks between two texts, ordered by old offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextChangeMap {
    hunks: Vec<Hunk>,
}

impl TextChangeMap {
    /// Reconstruct the changes between two texts.
    ///
    /// Adjacent deletes and inserts merge into one replace hunk.
    pub fn between(old_text: &str, new_text: &str) -> Self {
        if old_text == new_text {
            return Self::default();
        }

        // NOTE: from_chars() for character-level diff (byte positions tracked via .len())
        let diff = TextDiff::from_chars(old_text, new_text);

        let mut hunks: Vec<Hunk> = Vec::new();
        let mut current: Option<Hunk> = None;
        let mut old_byte = 0;
        let mut new_byte = 0;

        for change in diff.iter_all_changes() {
            let len = change.value().len();
            match change.tag() {
                ChangeTag::Equal => {
                    if let Some(hunk) = current.take() {
                        hunks.push(hunk);
                    }
                    old_byte += len;
                    new_byte += len;
                }
                ChangeTag::Delete => {
                    let hunk = current.get_or_insert(Hunk {
                        old_start: old_byte,
                        old_end: old_byte,
                        new_start: new_byte,
                        new_end: new_byte,
                    });
                    old_byte += len;
                    hunk.old_end = old_byte;
                }
                ChangeTag::Insert => {
                    let hunk = current.get_or_insert(Hunk {
                        old_start: old_byte,
                        old_end: old_byte,
                        new_start: new_byte,
                        new_end: new_byte,
                    });
                    new_byte += len;
                    hunk.new_end = new_byte;
                }
            }
        }
        if let Some(hunk) = current {
            hunks.push(hunk);
        }

        Self { hunks }
    }

    /// True when the texts were identical.
    pub fn is_identity(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Carry an old offset into the new text.
    pub fn map_offset(&self, offset: usize, affinity: Affinity) -> usize {
        let mut delta: isize = 0;

        for hunk in &self.hunks {
            if offset < hunk.old_start {
                break;
            }
            if offset == hunk.old_start {
                return match (hunk.is_insertion_only(), affinity) {
                    (true, Affinity::Start) => hunk.new_end,
                    _ => hunk.new_start,
                };
            }
            if offset < hunk.old_end {
                return match affinity {
                    Affinity::Start => hunk.new_start,
                    Affinity::End => hunk.new_end,
                };
            }
            delta += hunk.delta();
        }

        apply_delta(offset, delta)
    }

    pub fn map_span(&self, span: TextSpan) -> TextSpan {
        let start = self.map_offset(span.start, Affinity::Start);
        let end = self.map_offset(span.end, Affinity::End).max(start);
        TextSpan::new(start, end)
    }
}

/// Apply a signed delta to a byte position with underflow protection.
fn apply_delta(position: usize, delta: isize) -> usize {
    (position as isize).saturating_add(delta).max(0) as usize
}

/// Tracks line spans from one text version to another.
pub struct SpanTracker<'a> {
    old: PositionMapper<'a>,
    new: PositionMapper<'a>,
    changes: TextChangeMap,
}

impl<'a> SpanTracker<'a> {
    pub fn new(old_text: &'a str, new_text: &'a str) -> Self {
        Self {
            old: PositionMapper::new(old_text),
            new: PositionMapper::new(new_text),
            changes: TextChangeMap::between(old_text, new_text),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.changes.is_identity()
    }

    /// Track a span of the old text into the new text.
    ///
    /// Returns `None` if the span does not fit the old text.
    pub fn track(&self, span: LinePositionSpan) -> Option<LinePositionSpan> {
        if self.changes.is_identity() {
            return Some(span);
        }
        let old_span = self.old.line_span_to_span(span)?;
        let new_span = self.changes.map_span(old_span);
        self.new.span_to_line_span(new_span)
    }
}
