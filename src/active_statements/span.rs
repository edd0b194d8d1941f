use serde::Serialize;
use std::collections::HashMap;

use super::statement::ActiveStatementId;
use crate::debugger::ActiveStatementFlags;
use crate::text::LinePositionSpan;
use crate::workspace::DocumentId;

/// Position of an active statement as shown to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStatementSpan {
    pub id: ActiveStatementId,
    pub span: LinePositionSpan,
    pub flags: ActiveStatementFlags,
}

impl ActiveStatementSpan {
    pub fn new(id: ActiveStatementId, span: LinePositionSpan, flags: ActiveStatementFlags) -> Self {
        Self { id, span, flags }
    }
}

impl Serialize for ActiveStatementSpan {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ActiveStatementSpan", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("span", &self.span)?;
        state.serialize_field("flags", &self.flags.names())?;
        state.end()
    }
}

/// Live editor tracking spans, which drift with typing independently of
/// the recomputed active statement spans.
pub trait ActiveStatementSpanProvider: Send + Sync {
    /// Tracking spans for the document, or `None` if the editor isn't
    /// tracking it.
    fn tracking_spans(&self, document: DocumentId, path: &str) -> Option<Vec<ActiveStatementSpan>>;
}

/// Provider for callers without an editor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrackingSpans;

impl ActiveStatementSpanProvider for NoTrackingSpans {
    fn tracking_spans(&self, _document: DocumentId, _path: &str) -> Option<Vec<ActiveStatementSpan>> {
        None
    }
}

/// Tracking spans keyed by file path.
#[derive(Debug, Default, Clone)]
pub struct TrackingSpans {
    by_path: HashMap<String, Vec<ActiveStatementSpan>>,
}

impl TrackingSpans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, spans: Vec<ActiveStatementSpan>) {
        self.by_path.insert(path.into(), spans);
    }
}

impl ActiveStatementSpanProvider for TrackingSpans {
    fn tracking_spans(&self, _document: DocumentId, path: &str) -> Option<Vec<ActiveStatementSpan>> {
        self.by_path.get(path).cloned()
    }
}
