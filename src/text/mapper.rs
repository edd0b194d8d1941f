use super::position::{LinePosition, LinePositionSpan, TextSpan};

/// Maps between byte offsets and UTF-16 line positions of one text.
pub struct PositionMapper<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> PositionMapper<'a> {
    /// Create a new mapper with pre-computed line starts
    pub fn new(text: &'a str) -> Self {
        let line_starts = compute_line_starts(text);
        Self { text, line_starts }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Get the byte offset of a line start
    fn get_line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    fn line_text(&self, line: usize) -> Option<&'a str> {
        let line_start = self.get_line_start(line)?;
        let line_end = if line + 1 < self.line_starts.len() {
            self.line_starts[line + 1] - 1 // Exclude the newline
        } else {
            self.text.len()
        };
        let line_text = &self.text[line_start..line_end];
        Some(line_text.strip_suffix('\r').unwrap_or(line_text))
    }

    /// Convert a line position to a byte offset.
    ///
    /// Columns past the end of the line clamp to the line end.
    pub fn position_to_byte(&self, position: LinePosition) -> Option<usize> {
        let line = position.line as usize;
        let line_start = self.get_line_start(line)?;
        let line_text = self.line_text(line)?;

        match convert_utf16_to_byte_in_line(line_text, position.character as usize) {
            Some(byte_offset) => Some(line_start + byte_offset),
            None => Some(line_start + line_text.len()),
        }
    }

    pub fn byte_to_position(&self, offset: usize) -> Option<LinePosition> {
        if offset > self.text.len() {
            return None;
        }

        // Binary search for the line containing this offset
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_start = self.get_line_start(line)?;
        let line_text = self.line_text(line)?;
        let line_offset = (offset - line_start).min(line_text.len());

        // Offsets inside a multi-byte character snap back to its start
        let mut utf16_offset = 0;
        let mut byte_count = 0;
        for ch in line_text.chars() {
            let ch_bytes = ch.len_utf8();
            if byte_count + ch_bytes > line_offset {
                break;
            }
            byte_count += ch_bytes;
            utf16_offset += ch.len_utf16();
        }

        Some(LinePosition::new(line as u32, utf16_offset as u32))
    }

    pub fn span_to_line_span(&self, span: TextSpan) -> Option<LinePositionSpan> {
        let start = self.byte_to_position(span.start)?;
        let end = self.byte_to_position(span.end)?;
        Some(LinePositionSpan::new(start, end))
    }

    pub fn line_span_to_span(&self, span: LinePositionSpan) -> Option<TextSpan> {
        let start = self.position_to_byte(span.start)?;
        let end = self.position_to_byte(span.end)?;
        Some(TextSpan::new(start, end.max(start)))
    }
}

/// Compute line start offsets for efficient position mapping
pub fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut line_starts = vec![0];
    line_starts.extend(
        text.bytes()
            .enumerate()
            .filter(|(_, b)| *b == b'\n')
            .map(|(i, _)| i + 1),
    );
    line_starts
}

/// Convert UTF-16 position to byte position within a line
/// Returns None if the UTF-16 position is beyond the line
#[inline(always)]
pub fn convert_utf16_to_byte_in_line(line_text: &str, utf16_pos: usize) -> Option<usize> {
    let mut byte_offset = 0;
    let mut utf16_offset = 0;

    for ch in line_text.chars() {
        if utf16_offset >= utf16_pos {
            return Some(byte_offset);
        }
        utf16_offset += ch.len_utf16();
        byte_offset += ch.len_utf8();
    }

    if utf16_offset == utf16_pos {
        Some(byte_offset)
    } else {
        None
    }
}
