//! Exception regions of the base active statements.
//!
//! Each active statement is paired with the try/catch/finally spans that
//! enclose it in the base snapshot, so the two can never disagree in
//! count or order.

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::active_statements::{ActiveStatement, ActiveStatementId, ActiveStatementsMap};
use crate::syntax::SyntaxRegistry;
use crate::text::{LinePositionSpan, PositionMapper};
use crate::workspace::{CommittedDocumentState, DocumentId, WorkspaceService};

/// Exception regions enclosing one active statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExceptionRegions {
    /// The document doesn't match the debuggee; regions are unknown.
    OutOfSync,
    /// Enclosing regions, innermost first.
    Spans(Vec<LinePositionSpan>),
}

impl ExceptionRegions {
    pub fn empty() -> Self {
        ExceptionRegions::Spans(Vec::new())
    }

    pub fn is_out_of_sync(&self) -> bool {
        matches!(self, ExceptionRegions::OutOfSync)
    }

    pub fn spans(&self) -> Option<&[LinePositionSpan]> {
        match self {
            ExceptionRegions::OutOfSync => None,
            ExceptionRegions::Spans(spans) => Some(spans),
        }
    }
}

/// An active statement bound to its exception regions.
#[derive(Debug, Clone)]
pub struct StatementRegions {
    pub statement: Arc<ActiveStatement>,
    pub exception_regions: ExceptionRegions,
}

/// Exception regions of every base active statement, in ordinal order.
#[derive(Debug, Default)]
pub struct BaseExceptionRegions {
    entries: Vec<StatementRegions>,
}

impl BaseExceptionRegions {
    /// Pair statements with precomputed regions.
    ///
    /// Entries must be in ordinal order, one per statement.
    pub fn from_entries(entries: Vec<StatementRegions>) -> Self {
        debug_assert!(
            entries
                .iter()
                .enumerate()
                .all(|(ordinal, entry)| entry.statement.id.0 == ordinal)
        );
        Self { entries }
    }

    pub fn entries(&self) -> &[StatementRegions] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ActiveStatementId) -> Option<&StatementRegions> {
        self.entries.get(id.0)
    }
}

/// Compute the exception regions of every statement against the base text.
///
/// Statements are grouped by primary document and documents are analyzed
/// in parallel. Out-of-sync documents yield [`ExceptionRegions::OutOfSync`];
/// documents in a language without exception-handling syntax yield no
/// regions.
pub fn resolve_exception_regions<W>(
    map: &ActiveStatementsMap,
    workspace: &W,
    syntax: &SyntaxRegistry,
) -> BaseExceptionRegions
where
    W: WorkspaceService + ?Sized,
{
    let mut by_document: HashMap<DocumentId, Vec<&Arc<ActiveStatement>>> = HashMap::new();
    for statement in map.statements() {
        by_document
            .entry(statement.primary_document())
            .or_default()
            .push(statement);
    }

    let computed: Vec<(ActiveStatementId, ExceptionRegions)> = by_document
        .par_iter()
        .flat_map_iter(|(&document, statements)| {
            let regions = document_regions(document, statements, workspace, syntax);
            statements
                .iter()
                .map(|statement| statement.id)
                .zip(regions)
                .collect::<Vec<_>>()
        })
        .collect();

    let mut slots: Vec<Option<ExceptionRegions>> = vec![None; map.len()];
    for (id, regions) in computed {
        slots[id.0] = Some(regions);
    }

    let entries = map
        .statements()
        .iter()
        .zip(slots)
        .map(|(statement, regions)| StatementRegions {
            statement: Arc::clone(statement),
            exception_regions: regions.unwrap_or_else(ExceptionRegions::empty),
        })
        .collect::<Vec<_>>();

    debug!(
        target: "enc_remap::exception_regions",
        "Computed exception regions for {} statements in {} documents",
        entries.len(),
        by_document.len()
    );

    BaseExceptionRegions { entries }
}

fn document_regions<W>(
    document: DocumentId,
    statements: &[&Arc<ActiveStatement>],
    workspace: &W,
    syntax: &SyntaxRegistry,
) -> Vec<ExceptionRegions>
where
    W: WorkspaceService + ?Sized,
{
    let unknown = || vec![ExceptionRegions::empty(); statements.len()];

    if workspace.committed_document_state(document) == CommittedDocumentState::OutOfSync {
        debug!(
            target: "enc_remap::exception_regions",
            "Document {} is out of sync; exception regions unavailable",
            document
        );
        return vec![ExceptionRegions::OutOfSync; statements.len()];
    }

    let Some(text) = workspace.base_source_text(document) else {
        warn!(
            target: "enc_remap::exception_regions",
            "No base text for document {}",
            document
        );
        return unknown();
    };

    let Some(language) = syntax.for_document(workspace, document) else {
        debug!(
            target: "enc_remap::exception_regions",
            "No exception-handling syntax for document {}",
            document
        );
        return unknown();
    };

    let Some(tree) = language.parse(&text) else {
        return unknown();
    };
    let mapper = PositionMapper::new(&text);

    statements
        .iter()
        .map(|statement| {
            ExceptionRegions::Spans(language.exception_regions(
                &tree,
                &mapper,
                statement.span,
                statement.is_non_leaf(),
            ))
        })
        .collect()
}
