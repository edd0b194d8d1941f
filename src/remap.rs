//! Recomputation of active statement and exception region spans after an
//! edit.
//!
//! Statements of methods the edit recompiled are remapped through
//! [`ActiveStatementUpdate`]s and [`ExceptionRegionUpdate`]s. Statements of
//! methods it left alone keep running the old IL, so their new positions
//! are recorded as [`NonRemappableRegion`]s keyed by the running method
//! version.
//!
//! The computation is pure and synchronous; the session owns committing its
//! result.

use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::active_statements::{ActiveStatementId, ActiveStatementsMap};
use crate::debugger::{ManagedInstructionId, ManagedMethodId, MethodToken, ModuleId};
use crate::exception_regions::BaseExceptionRegions;
use crate::ledger::{NonRemappableRegion, NonRemappableRegions};
use crate::text::LinePositionSpan;
use crate::workspace::DocumentId;

/// Post-edit spans of one base active statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActiveStatementSpans {
    pub span: LinePositionSpan,
    /// New spans of the statement's exception regions, in base order.
    /// Ignored when the base regions are out of sync.
    pub exception_regions: Vec<LinePositionSpan>,
}

impl NewActiveStatementSpans {
    pub fn new(span: LinePositionSpan, exception_regions: Vec<LinePositionSpan>) -> Self {
        Self {
            span,
            exception_regions,
        }
    }
}

/// New spans of every base active statement of an edited document.
///
/// `statements` is positionally aligned with
/// [`ActiveStatementsMap::document_statements`] for the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedDocument {
    pub document: DocumentId,
    pub statements: Vec<NewActiveStatementSpans>,
}

/// New position of an active statement in a recompiled method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveStatementUpdate {
    pub statement: ActiveStatementId,
    /// Base instruction; the debugger maps its IL offset into the new body.
    pub instruction: ManagedInstructionId,
    pub new_span: LinePositionSpan,
}

/// New position of an exception region in a recompiled method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRegionUpdate {
    /// The method version produced by this edit.
    pub method: ManagedMethodId,
    pub statement: ActiveStatementId,
    /// Index of the region among the statement's exception regions.
    pub region_index: usize,
    pub new_span: LinePositionSpan,
    /// New start line minus base start line.
    pub line_delta: i32,
}

/// Inputs of one recomputation.
#[derive(Debug, Clone, Copy)]
pub struct RemapRequest<'a> {
    /// Only statements of methods in this module are processed.
    pub module: ModuleId,
    pub base_active_statements: &'a ActiveStatementsMap,
    pub base_exception_regions: &'a BaseExceptionRegions,
    /// Methods the edit recompiled.
    pub updated_method_tokens: &'a HashSet<MethodToken>,
    /// Ledger as of the start of the edit session.
    pub previous_non_remappable_regions: &'a NonRemappableRegions,
    pub changed_documents: &'a [ChangedDocument],
}

/// Everything produced by one recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemapResult {
    pub active_statement_updates: Vec<ActiveStatementUpdate>,
    pub exception_region_updates: Vec<ExceptionRegionUpdate>,
    /// Regions added by this edit, in statement order.
    #[serde(skip)]
    pub appended_regions: Vec<(ManagedMethodId, NonRemappableRegion)>,
    /// Previous ledger plus `appended_regions`.
    pub non_remappable_regions: NonRemappableRegions,
}

/// Recompute spans for every active statement of `request.module` in the
/// changed documents.
///
/// Statements are processed once each, in ordinal order, even when they
/// appear in several linked documents; the first changed document listing
/// a statement supplies its new spans. Statements in unchanged documents
/// are skipped, so their ledger entries carry over unchanged.
///
/// # Panics
///
/// If a changed document's statement list doesn't match the base document
/// statements in length, or a statement's new exception regions don't
/// match its base regions in count.
pub fn compute_updates(request: &RemapRequest<'_>) -> RemapResult {
    let mut new_spans: BTreeMap<ActiveStatementId, &NewActiveStatementSpans> = BTreeMap::new();

    for changed in request.changed_documents {
        let base = request
            .base_active_statements
            .document_statements(changed.document);
        assert_eq!(
            base.len(),
            changed.statements.len(),
            "document {} has {} base active statements but {} new spans",
            changed.document,
            base.len(),
            changed.statements.len()
        );

        for (statement, spans) in base.iter().zip(&changed.statements) {
            if statement.method().module == request.module {
                new_spans.entry(statement.id).or_insert(spans);
            }
        }
    }

    let mut result = RemapResult::default();

    for (id, new) in new_spans {
        let entry = request
            .base_exception_regions
            .get(id)
            .unwrap_or_else(|| panic!("no exception regions for {}", id));
        let statement = &entry.statement;
        let method = statement.method();
        let base_regions = entry.exception_regions.spans();

        if let Some(base_regions) = base_regions {
            assert_eq!(
                base_regions.len(),
                new.exception_regions.len(),
                "{} has {} base exception regions but {} new spans",
                id,
                base_regions.len(),
                new.exception_regions.len()
            );
        }
        let regions = base_regions
            .unwrap_or(&[])
            .iter()
            .zip(&new.exception_regions)
            .enumerate();

        if request.updated_method_tokens.contains(&method.token) {
            result.active_statement_updates.push(ActiveStatementUpdate {
                statement: id,
                instruction: statement.instruction,
                new_span: new.span,
            });

            let new_version = method.next_version();
            for (region_index, (base_span, new_span)) in regions {
                result.exception_region_updates.push(ExceptionRegionUpdate {
                    method: new_version,
                    statement: id,
                    region_index,
                    new_span: *new_span,
                    line_delta: base_span.line_delta_to(new_span),
                });
            }
        } else {
            result.appended_regions.push((
                method,
                NonRemappableRegion::new(statement.span, statement.span.line_delta_to(&new.span), false),
            ));
            for (_, (base_span, new_span)) in regions {
                result.appended_regions.push((
                    method,
                    NonRemappableRegion::new(*base_span, base_span.line_delta_to(new_span), true),
                ));
            }
        }
    }

    result.non_remappable_regions = request
        .previous_non_remappable_regions
        .with_appended(result.appended_regions.iter().copied());

    debug!(
        target: "enc_remap::remap",
        "Module {}: {} active statement updates, {} exception region updates, {} non-remappable regions appended",
        request.module,
        result.active_statement_updates.len(),
        result.exception_region_updates.len(),
        result.appended_regions.len()
    );

    result
}
