//! Building engine inputs from tagged sources.

use std::sync::Arc;

use super::markers::SourceMarkers;
use crate::active_statements::{ActiveStatement, ActiveStatementId, ActiveStatementSpan, TrackingSpans};
use crate::debugger::{
    ActiveStatementDebugInfo, ActiveStatementFlags, ManagedInstructionId, ManagedMethodId,
    MethodToken, ModuleId,
};
use crate::error::{EncError, EncResult};
use crate::remap::{ChangedDocument, NewActiveStatementSpans};
use crate::text::{LinePositionSpan, PositionMapper, TextSpan};
use crate::workspace::DocumentId;

/// Module used when a fixture doesn't name one.
pub const FIXTURE_MODULE: ModuleId = ModuleId(0x0000_0001_0000_0000_0000_0000_0000_0001);

/// Where and how one fixture active statement executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementDescription {
    pub module: ModuleId,
    /// Row in the MethodDef table.
    pub method_row: u32,
    pub method_version: u32,
    pub il_offset: u32,
    pub flags: ActiveStatementFlags,
}

impl StatementDescription {
    /// Statement `id` runs in its own method, row `id + 1`. Statement 0 is
    /// the leaf frame, the others are its callers.
    pub fn for_ordinal(id: usize) -> Self {
        Self {
            module: FIXTURE_MODULE,
            method_row: id as u32 + 1,
            method_version: 1,
            il_offset: 0,
            flags: if id == 0 {
                ActiveStatementFlags::LEAF_FRAME
            } else {
                ActiveStatementFlags::NON_LEAF_FRAME
            },
        }
    }

    pub fn with_module(mut self, module: ModuleId) -> Self {
        self.module = module;
        self
    }

    pub fn with_method_row(mut self, method_row: u32) -> Self {
        self.method_row = method_row;
        self
    }

    pub fn with_method_version(mut self, method_version: u32) -> Self {
        self.method_version = method_version;
        self
    }

    pub fn with_il_offset(mut self, il_offset: u32) -> Self {
        self.il_offset = il_offset;
        self
    }

    pub fn with_flags(mut self, flags: ActiveStatementFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn method(&self) -> ManagedMethodId {
        ManagedMethodId::new(
            self.module,
            MethodToken::from_method_row(self.method_row),
            self.method_version,
        )
    }

    pub fn instruction(&self) -> ManagedInstructionId {
        ManagedInstructionId::new(self.method(), self.il_offset)
    }
}

/// A tagged source file together with its cleared text.
#[derive(Debug, Clone)]
pub struct MarkedSource {
    path: String,
    tagged: String,
    text: String,
    markers: SourceMarkers,
}

impl MarkedSource {
    pub fn parse(path: impl Into<String>, tagged: impl Into<String>) -> EncResult<Self> {
        let tagged = tagged.into();
        let markers = SourceMarkers::parse(&tagged)?;
        let text = SourceMarkers::clear(&tagged);
        Ok(Self {
            path: path.into(),
            tagged,
            text,
            markers,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn tagged(&self) -> &str {
        &self.tagged
    }

    /// Source with the tags blanked out.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn markers(&self) -> &SourceMarkers {
        &self.markers
    }

    pub fn line_span(&self, span: TextSpan) -> EncResult<LinePositionSpan> {
        PositionMapper::new(&self.text)
            .span_to_line_span(span)
            .ok_or_else(|| EncError::fixture(span.start, "span is outside the source"))
    }

    pub fn active_statement_span(&self, id: usize) -> EncResult<Option<LinePositionSpan>> {
        self.markers
            .active_statement(id)
            .map(|span| self.line_span(span))
            .transpose()
    }

    /// Exception regions of active statement `id`, by region index.
    pub fn exception_region_spans(&self, id: usize) -> EncResult<Vec<LinePositionSpan>> {
        self.markers
            .exception_regions(id)
            .iter()
            .map(|&span| self.line_span(span))
            .collect()
    }
}

/// Debug infos for every active statement tagged in `sources`, in id order.
///
/// `describe` supplies the method and flags of each statement id.
pub fn active_statement_debug_infos<F>(sources: &[MarkedSource], describe: F) -> EncResult<Vec<ActiveStatementDebugInfo>>
where
    F: Fn(usize) -> StatementDescription,
{
    let mut statements: Vec<(usize, ActiveStatementDebugInfo)> = Vec::new();

    for source in sources {
        for (id, span) in source.markers.active_statements() {
            if statements.iter().any(|(existing, _)| *existing == id) {
                return Err(EncError::fixture(
                    span.start,
                    format!("active statement {} is tagged in more than one source", id),
                ));
            }
            let description = describe(id);
            statements.push((
                id,
                ActiveStatementDebugInfo {
                    instruction: description.instruction(),
                    document_name: Some(source.path.clone()),
                    span: source.line_span(span)?,
                    flags: description.flags,
                },
            ));
        }
    }

    statements.sort_by_key(|(id, _)| *id);
    Ok(statements.into_iter().map(|(_, info)| info).collect())
}

/// Editor tracking spans from the `TS` tags of `sources`.
pub fn tracking_spans(sources: &[MarkedSource]) -> EncResult<TrackingSpans> {
    let mut tracking = TrackingSpans::new();
    for source in sources {
        let spans = source
            .markers
            .tracking_spans()
            .map(|(id, span)| {
                Ok(ActiveStatementSpan::new(
                    ActiveStatementId(id),
                    source.line_span(span)?,
                    ActiveStatementFlags::empty(),
                ))
            })
            .collect::<EncResult<Vec<_>>>()?;
        if !spans.is_empty() {
            tracking.insert(source.path.clone(), spans);
        }
    }
    Ok(tracking)
}

/// New spans of a document's base statements, read from the tags of its
/// edited source. The `AS` and `ER` ids of the edited source are the
/// statement ordinals.
pub fn changed_document(
    document: DocumentId,
    base_statements: &[Arc<ActiveStatement>],
    new_source: &MarkedSource,
) -> EncResult<ChangedDocument> {
    let statements = base_statements
        .iter()
        .map(|statement| {
            let id = statement.id.0;
            let span = new_source.active_statement_span(id)?.ok_or_else(|| {
                EncError::fixture(0, format!("active statement {} is missing from {}", id, new_source.path))
            })?;
            Ok(NewActiveStatementSpans::new(span, new_source.exception_region_spans(id)?))
        })
        .collect::<EncResult<Vec<_>>>()?;

    Ok(ChangedDocument {
        document,
        statements,
    })
}
