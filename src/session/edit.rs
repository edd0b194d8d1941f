//! One edit session: the break-state snapshot the debugger is paused in.
//!
//! The active statement map and its exception regions are computed lazily,
//! once, and shared by every query of the session. Concurrent first
//! requests await a single computation.

use arc_swap::ArcSwap;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use super::module_readers::ModuleReader;
use crate::active_statements::{ActiveStatementSpan, ActiveStatementSpanProvider, ActiveStatementsMap};
use crate::debugger::{DebuggerService, ModuleId};
use crate::error::{EncError, EncResult, LockResultExt};
use crate::exception_regions::{BaseExceptionRegions, resolve_exception_regions};
use crate::ledger::NonRemappableRegions;
use crate::remap::{ChangedDocument, NewActiveStatementSpans, RemapResult};
use crate::syntax::SyntaxRegistry;
use crate::text::SpanTracker;
use crate::workspace::{CommittedDocumentState, DocumentId, WorkspaceService};

type RegionsCell = OnceCell<Arc<BaseExceptionRegions>>;

/// A computed update of one module waiting to be committed or discarded.
#[derive(Debug)]
pub struct PendingUpdate {
    pub module: ModuleId,
    pub result: Arc<RemapResult>,
    /// Documents whose edits the update was computed from.
    pub documents: Vec<DocumentId>,
    pub(crate) module_reader: Arc<ModuleReader>,
}

pub struct EditSession {
    id: Ulid,
    base_ledger: Arc<NonRemappableRegions>,
    active_statements: OnceCell<Arc<ActiveStatementsMap>>,
    exception_regions: ArcSwap<RegionsCell>,
    pending: Mutex<BTreeMap<ModuleId, PendingUpdate>>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("id", &self.id)
            .field("active_statements", &self.active_statements.initialized())
            .field("exception_regions", &self.exception_regions.load().initialized())
            .finish()
    }
}

impl EditSession {
    pub(crate) fn new(base_ledger: Arc<NonRemappableRegions>) -> Self {
        let id = Ulid::new();
        info!(target: "enc_remap::session", "Edit session {} started", id);
        Self {
            id,
            base_ledger,
            active_statements: OnceCell::new(),
            exception_regions: ArcSwap::new(Arc::new(RegionsCell::new())),
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    /// Ledger as of the start of this session.
    pub fn base_ledger(&self) -> &Arc<NonRemappableRegions> {
        &self.base_ledger
    }

    /// The session's active statement map, built on first request.
    ///
    /// A cancelled request leaves the map unbuilt for the next caller.
    pub async fn active_statements<D, W>(
        &self,
        debugger: &D,
        workspace: &W,
        cancel: &CancellationToken,
    ) -> EncResult<Arc<ActiveStatementsMap>>
    where
        D: DebuggerService,
        W: WorkspaceService + ?Sized,
    {
        let init = self.active_statements.get_or_try_init(|| async {
            let debug_infos = debugger.active_statements().await?;
            let map = ActiveStatementsMap::build(debug_infos, |path| {
                workspace.document_ids_for_path(path)
            });
            Ok::<_, EncError>(Arc::new(map))
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EncError::Cancelled),
            result = init => result.cloned(),
        }
    }

    /// Exception regions of the base active statements, computed on first
    /// request and again after [`invalidate_exception_regions`](Self::invalidate_exception_regions).
    pub async fn exception_regions<W>(
        &self,
        map: Arc<ActiveStatementsMap>,
        workspace: Arc<W>,
        syntax: Arc<SyntaxRegistry>,
        cancel: &CancellationToken,
    ) -> EncResult<Arc<BaseExceptionRegions>>
    where
        W: WorkspaceService + 'static,
    {
        let cell = self.exception_regions.load_full();
        let init = cell.get_or_try_init(|| async move {
            let regions = tokio::task::spawn_blocking(move || {
                resolve_exception_regions(&map, workspace.as_ref(), &syntax)
            })
            .await
            .map_err(|e| EncError::internal(format!("exception region analysis failed: {}", e)))?;
            Ok::<_, EncError>(Arc::new(regions))
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(EncError::Cancelled),
            result = init => result.cloned(),
        }
    }

    /// Forget computed exception regions; the next request recomputes them.
    pub fn invalidate_exception_regions(&self) {
        let previous = self.exception_regions.swap(Arc::new(RegionsCell::new()));
        if previous.initialized() {
            debug!(
                target: "enc_remap::session",
                "Edit session {}: exception regions invalidated",
                self.id
            );
        }
    }

    /// Hold the update of `update.module`, replacing an earlier one of the
    /// same module. Updates of other modules are kept.
    pub(crate) fn set_pending(&self, update: PendingUpdate) -> EncResult<()> {
        let mut pending = self.pending.lock().recover_poison("EditSession::set_pending")?;
        if pending.insert(update.module, update).is_some() {
            debug!(
                target: "enc_remap::session",
                "Edit session {}: replacing uncommitted update",
                self.id
            );
        }
        Ok(())
    }

    /// Remove every pending update, in module order.
    pub(crate) fn take_pending(&self) -> EncResult<Vec<PendingUpdate>> {
        let mut pending = self.pending.lock().recover_poison("EditSession::take_pending")?;
        Ok(std::mem::take(&mut *pending).into_values().collect())
    }

    /// The base ledger plus the regions of pending updates of modules other
    /// than `module`.
    pub(crate) fn ledger_with_pending(&self, module: ModuleId) -> EncResult<NonRemappableRegions> {
        let pending = self.pending.lock().recover_poison("EditSession::ledger_with_pending")?;
        Ok(self.base_ledger.with_appended(
            pending
                .values()
                .filter(|update| update.module != module)
                .flat_map(|update| update.result.appended_regions.iter().copied()),
        ))
    }

    /// The update of `module` awaiting commit, if any.
    pub fn pending_result(&self, module: ModuleId) -> EncResult<Option<Arc<RemapResult>>> {
        let pending = self.pending.lock().recover_poison("EditSession::pending_result")?;
        Ok(pending.get(&module).map(|update| Arc::clone(&update.result)))
    }

    /// Modules with an update awaiting commit.
    pub fn pending_modules(&self) -> EncResult<Vec<ModuleId>> {
        let pending = self.pending.lock().recover_poison("EditSession::pending_modules")?;
        Ok(pending.keys().copied().collect())
    }
}

/// Whether the current text of a document can be used for span queries.
pub(crate) fn is_trackable<W>(workspace: &W, syntax: &SyntaxRegistry, document: DocumentId, text: &str) -> bool
where
    W: WorkspaceService + ?Sized,
{
    if workspace.committed_document_state(document) == CommittedDocumentState::OutOfSync {
        return false;
    }
    match syntax.for_document(workspace, document) {
        Some(language) => !language.has_syntax_errors(text),
        None => true,
    }
}

/// New spans of the base statements of every edited document.
///
/// Documents that are out of sync or whose current text doesn't parse are
/// left out, as are documents whose text didn't change.
pub(crate) fn changed_documents<W>(
    map: &ActiveStatementsMap,
    regions: &BaseExceptionRegions,
    workspace: &W,
    syntax: &SyntaxRegistry,
) -> Vec<ChangedDocument>
where
    W: WorkspaceService + ?Sized,
{
    let mut changed = Vec::new();

    for document in map.documents() {
        let (Some(base), Some(current)) = (
            workspace.base_source_text(document),
            workspace.current_source_text(document),
        ) else {
            continue;
        };
        if base == current {
            continue;
        }
        if !is_trackable(workspace, syntax, document, &current) {
            debug!(
                target: "enc_remap::session",
                "Skipping document {}: out of sync or has syntax errors",
                document
            );
            continue;
        }

        let tracker = SpanTracker::new(&base, &current);
        let statements = map
            .document_statements(document)
            .iter()
            .map(|statement| {
                let span = tracker.track(statement.span).unwrap_or(statement.span);
                let exception_regions = regions
                    .get(statement.id)
                    .and_then(|entry| entry.exception_regions.spans())
                    .unwrap_or(&[])
                    .iter()
                    .map(|region| tracker.track(*region).unwrap_or(*region))
                    .collect();
                NewActiveStatementSpans::new(span, exception_regions)
            })
            .collect();

        changed.push(ChangedDocument {
            document,
            statements,
        });
    }

    changed
}

/// Current spans of a document's active statements.
///
/// Editor tracking spans win over spans tracked through the text diff.
pub(crate) fn adjusted_spans<W, P>(
    map: &ActiveStatementsMap,
    workspace: &W,
    syntax: &SyntaxRegistry,
    document: DocumentId,
    provider: &P,
) -> Vec<ActiveStatementSpan>
where
    W: WorkspaceService + ?Sized,
    P: ActiveStatementSpanProvider + ?Sized,
{
    let statements = map.document_statements(document);
    if statements.is_empty() {
        return Vec::new();
    }
    let (Some(base), Some(current)) = (
        workspace.base_source_text(document),
        workspace.current_source_text(document),
    ) else {
        return Vec::new();
    };
    if !is_trackable(workspace, syntax, document, &current) {
        return Vec::new();
    }

    let tracking = workspace
        .document_path(document)
        .and_then(|path| provider.tracking_spans(document, &path))
        .unwrap_or_default();
    let tracker = SpanTracker::new(&base, &current);

    statements
        .iter()
        .filter_map(|statement| {
            let span = match tracking.iter().find(|tracked| tracked.id == statement.id) {
                Some(tracked) => tracked.span,
                None => tracker.track(statement.span)?,
            };
            Some(ActiveStatementSpan::new(statement.id, span, statement.flags))
        })
        .collect()
}
