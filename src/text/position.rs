//! Line/column positions and spans.
//!
//! Positions are zero-based; `character` counts UTF-16 code units the way
//! the debugger's sequence points do.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A zero-based line and UTF-16 column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LinePosition {
    pub line: u32,
    pub character: u32,
}

impl LinePosition {
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Shift the line by a signed delta, keeping the column.
    ///
    /// Clamps to line 0 rather than underflowing.
    pub fn add_line_delta(self, delta: i32) -> Self {
        Self {
            line: apply_delta(self.line, delta),
            character: self.character,
        }
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.line, self.character)
    }
}

/// A span between two line positions; `start <= end`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LinePositionSpan {
    pub start: LinePosition,
    pub end: LinePosition,
}

impl LinePositionSpan {
    pub fn new(start: LinePosition, end: LinePosition) -> Self {
        debug_assert!(start <= end, "span start {start} is after end {end}");
        Self { start, end }
    }

    /// Convenience constructor from raw `(line, column)` pairs.
    pub fn from_bounds(start: (u32, u32), end: (u32, u32)) -> Self {
        Self::new(
            LinePosition::new(start.0, start.1),
            LinePosition::new(end.0, end.1),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the spans share at least one position.
    pub fn overlaps(&self, other: &LinePositionSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &LinePositionSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_position(&self, position: LinePosition) -> bool {
        self.start <= position && position < self.end
    }

    /// Shift both endpoints by `delta` lines; columns are unchanged.
    pub fn add_line_delta(self, delta: i32) -> Self {
        Self {
            start: self.start.add_line_delta(delta),
            end: self.end.add_line_delta(delta),
        }
    }

    /// Whole-line distance from `self` to `new`, measured on the start line.
    pub fn line_delta_to(&self, new: &LinePositionSpan) -> i32 {
        (i64::from(new.start.line) - i64::from(self.start.line)) as i32
    }
}

impl fmt::Display for LinePositionSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A half-open byte range in a source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Apply a signed delta to a line number with underflow protection.
fn apply_delta(line: u32, delta: i32) -> u32 {
    (i64::from(line) + i64::from(delta)).clamp(0, i64::from(u32::MAX)) as u32
}
