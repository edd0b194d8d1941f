//! Debugging session: everything that outlives a single break state.
//!
//! Owns the non-remappable region ledger and the retained module readers.
//! Edit sessions run one at a time inside it.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

use super::edit::{EditSession, PendingUpdate, adjusted_spans, changed_documents};
use super::module_readers::ModuleReaderRegistry;
use crate::active_statements::{ActiveStatementSpan, ActiveStatementSpanProvider, ActiveStatementsMap};
use crate::debugger::{
    DebuggerService, EncAvailabilityStatus, ManagedInstructionId, ManagedMethodId, MethodToken,
    ModuleId,
};
use crate::error::{EncError, EncResult, LockResultExt};
use crate::exception_regions::BaseExceptionRegions;
use crate::ledger::{NonRemappableRegion, NonRemappableRegionLedger, NonRemappableRegions};
use crate::remap::{RemapRequest, RemapResult, compute_updates};
use crate::syntax::SyntaxRegistry;
use crate::text::LinePositionSpan;
use crate::workspace::{DocumentId, WorkspaceService};

pub struct DebuggingSession<D, W> {
    id: Ulid,
    debugger: Arc<D>,
    workspace: Arc<W>,
    syntax: Arc<SyntaxRegistry>,
    ledger: NonRemappableRegionLedger,
    module_readers: ModuleReaderRegistry,
    edit_session: Mutex<Option<Arc<EditSession>>>,
}

impl<D, W> std::fmt::Debug for DebuggingSession<D, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebuggingSession")
            .field("id", &self.id)
            .field("ledger", &self.ledger)
            .field("module_readers", &self.module_readers)
            .finish()
    }
}

impl<D, W> DebuggingSession<D, W>
where
    D: DebuggerService,
    W: WorkspaceService + 'static,
{
    pub fn new(debugger: Arc<D>, workspace: Arc<W>, syntax: Arc<SyntaxRegistry>) -> Self {
        let id = Ulid::new();
        info!(target: "enc_remap::session", "Debugging session {} started", id);
        Self {
            id,
            debugger,
            workspace,
            syntax,
            ledger: NonRemappableRegionLedger::new(),
            module_readers: ModuleReaderRegistry::new(),
            edit_session: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn workspace(&self) -> &Arc<W> {
        &self.workspace
    }

    pub fn module_readers(&self) -> &ModuleReaderRegistry {
        &self.module_readers
    }

    /// Enter break state.
    pub fn start_edit_session(&self) -> EncResult<Arc<EditSession>> {
        let mut current = self
            .edit_session
            .lock()
            .recover_poison("DebuggingSession::start_edit_session")?;
        if current.is_some() {
            return Err(EncError::EditSessionInProgress);
        }
        let session = Arc::new(EditSession::new(self.ledger.snapshot()));
        *current = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Leave break state, discarding any uncommitted update.
    pub fn end_edit_session(&self) -> EncResult<()> {
        let session = self
            .edit_session
            .lock()
            .recover_poison("DebuggingSession::end_edit_session")?
            .take()
            .ok_or(EncError::NoEditSession)?;
        let discarded = session.take_pending()?;
        if !discarded.is_empty() {
            info!(
                target: "enc_remap::session",
                "Edit session {} ended with {} uncommitted updates; discarded",
                session.id(),
                discarded.len()
            );
        }
        info!(target: "enc_remap::session", "Edit session {} ended", session.id());
        Ok(())
    }

    /// The edit session in progress.
    pub fn edit_session(&self) -> EncResult<Arc<EditSession>> {
        self.edit_session
            .lock()
            .recover_poison("DebuggingSession::edit_session")?
            .clone()
            .ok_or(EncError::NoEditSession)
    }

    pub fn in_edit_session(&self) -> bool {
        self.edit_session().is_ok()
    }

    /// A document's committed state changed; its exception regions must be
    /// recomputed.
    pub fn notify_document_state_changed(&self, document: DocumentId) {
        if let Ok(session) = self.edit_session() {
            debug!(
                target: "enc_remap::session",
                "Committed state of document {} changed",
                document
            );
            session.invalidate_exception_regions();
        }
    }

    pub async fn module_availability(&self, module: ModuleId) -> EncResult<EncAvailabilityStatus> {
        if !self.debugger.is_module_loaded(module) {
            return Ok(EncAvailabilityStatus::ModuleNotLoaded);
        }
        self.debugger.availability(module).await
    }

    /// The current edit session's active statement map.
    pub async fn active_statements(&self, cancel: &CancellationToken) -> EncResult<Arc<ActiveStatementsMap>> {
        let session = self.edit_session()?;
        session
            .active_statements(self.debugger.as_ref(), self.workspace.as_ref(), cancel)
            .await
    }

    /// The current edit session's exception regions.
    pub async fn exception_regions(&self, cancel: &CancellationToken) -> EncResult<Arc<BaseExceptionRegions>> {
        let session = self.edit_session()?;
        let map = session
            .active_statements(self.debugger.as_ref(), self.workspace.as_ref(), cancel)
            .await?;
        session
            .exception_regions(
                map,
                Arc::clone(&self.workspace),
                Arc::clone(&self.syntax),
                cancel,
            )
            .await
    }

    /// Base spans of the active statements of each document, in the order
    /// of `documents`.
    pub async fn base_active_statement_spans(
        &self,
        documents: &[DocumentId],
        cancel: &CancellationToken,
    ) -> EncResult<Vec<Vec<ActiveStatementSpan>>> {
        let map = self.active_statements(cancel).await?;
        Ok(documents
            .iter()
            .map(|&document| {
                map.document_statements(document)
                    .iter()
                    .map(|statement| ActiveStatementSpan::new(statement.id, statement.span, statement.flags))
                    .collect()
            })
            .collect())
    }

    /// Spans of a document's active statements in its current text.
    ///
    /// Empty for documents that are out of sync or don't parse.
    pub async fn adjusted_active_statement_spans<P>(
        &self,
        document: DocumentId,
        provider: &P,
        cancel: &CancellationToken,
    ) -> EncResult<Vec<ActiveStatementSpan>>
    where
        P: ActiveStatementSpanProvider + ?Sized,
    {
        let map = self.active_statements(cancel).await?;
        Ok(adjusted_spans(
            &map,
            self.workspace.as_ref(),
            &self.syntax,
            document,
            provider,
        ))
    }

    /// Current span of one active instruction, or `None` if it isn't an
    /// active statement or its document can't be tracked.
    pub async fn current_active_statement_position<P>(
        &self,
        provider: &P,
        instruction: &ManagedInstructionId,
        cancel: &CancellationToken,
    ) -> EncResult<Option<LinePositionSpan>>
    where
        P: ActiveStatementSpanProvider + ?Sized,
    {
        let map = self.active_statements(cancel).await?;
        let Some(statement) = map.get(instruction) else {
            return Ok(None);
        };
        let spans = adjusted_spans(
            &map,
            self.workspace.as_ref(),
            &self.syntax,
            statement.primary_document(),
            provider,
        );
        Ok(spans
            .into_iter()
            .find(|span| span.id == statement.id)
            .map(|span| span.span))
    }

    /// Compute the update for `module` given the methods the edit
    /// recompiled, and hold it until [`commit_update`](Self::commit_update)
    /// or [`discard_update`](Self::discard_update).
    ///
    /// Updates of several modules can be pending together; each is computed
    /// on top of the regions the others append. Preparing a module again
    /// replaces its pending update.
    pub async fn prepare_update(
        &self,
        module: ModuleId,
        updated_method_tokens: &HashSet<MethodToken>,
        cancel: &CancellationToken,
    ) -> EncResult<Arc<RemapResult>> {
        let status = self.module_availability(module).await?;
        if !status.is_available() {
            return Err(EncError::ModuleUnavailable { module, status });
        }

        let session = self.edit_session()?;
        let map = session
            .active_statements(self.debugger.as_ref(), self.workspace.as_ref(), cancel)
            .await?;
        let regions = session
            .exception_regions(
                Arc::clone(&map),
                Arc::clone(&self.workspace),
                Arc::clone(&self.syntax),
                cancel,
            )
            .await?;
        if cancel.is_cancelled() {
            return Err(EncError::Cancelled);
        }

        let changed = changed_documents(&map, &regions, self.workspace.as_ref(), &self.syntax);
        let previous = session.ledger_with_pending(module)?;
        let result = Arc::new(compute_updates(&RemapRequest {
            module,
            base_active_statements: &map,
            base_exception_regions: &regions,
            updated_method_tokens,
            previous_non_remappable_regions: &previous,
            changed_documents: &changed,
        }));

        session.set_pending(PendingUpdate {
            module,
            result: Arc::clone(&result),
            documents: changed.iter().map(|document| document.document).collect(),
            module_reader: self.module_readers.open(module),
        })?;

        Ok(result)
    }

    /// Apply every pending update: the ledger is replaced in one step, the
    /// edited documents become the new baseline and the edit session
    /// restarts on it.
    pub fn commit_update(&self) -> EncResult<()> {
        let mut current = self
            .edit_session
            .lock()
            .recover_poison("DebuggingSession::commit_update")?;
        let session = current.as_ref().ok_or(EncError::NoEditSession)?;
        let pending = session.take_pending()?;
        if pending.is_empty() {
            return Err(EncError::NoPendingUpdate);
        }

        let base_ledger = Arc::clone(session.base_ledger());
        let updated = Arc::new(base_ledger.with_appended(
            pending
                .iter()
                .flat_map(|update| update.result.appended_regions.iter().copied()),
        ));
        if let Err(e) = self.ledger.commit(&base_ledger, updated) {
            warn!(
                target: "enc_remap::session",
                "Updates of {} modules discarded: {}",
                pending.len(),
                e
            );
            return Err(e);
        }

        let mut documents: Vec<DocumentId> = pending
            .iter()
            .flat_map(|update| update.documents.iter().copied())
            .collect();
        documents.sort();
        documents.dedup();
        self.workspace.commit_documents(&documents);

        let appended: usize = pending.iter().map(|update| update.result.appended_regions.len()).sum();
        let modules: Vec<ModuleId> = pending.iter().map(|update| update.module).collect();
        self.module_readers
            .retain(pending.into_iter().map(|update| update.module_reader));

        info!(
            target: "enc_remap::session",
            "Committed updates of modules {:?}: {} regions appended, {} documents rebased",
            modules,
            appended,
            documents.len()
        );

        *current = Some(Arc::new(EditSession::new(self.ledger.snapshot())));
        Ok(())
    }

    /// Drop every pending update. The ledger and the baseline are left as
    /// they were.
    pub fn discard_update(&self) -> EncResult<()> {
        let session = self.edit_session()?;
        let pending = session.take_pending()?;
        if pending.is_empty() {
            return Err(EncError::NoPendingUpdate);
        }
        for update in &pending {
            info!(
                target: "enc_remap::session",
                "Discarded update of module {}",
                update.module
            );
        }
        Ok(())
    }

    /// Current ledger snapshot.
    pub fn non_remappable_regions(&self) -> Arc<NonRemappableRegions> {
        self.ledger.snapshot()
    }

    /// Regions recorded for exactly this method version.
    pub fn regions_for_method(&self, method: &ManagedMethodId) -> Vec<NonRemappableRegion> {
        self.ledger.regions_for(method)
    }

    /// Detach from the debuggee: end any edit session, clear the ledger and
    /// release module readers.
    pub fn end(self) {
        if self.in_edit_session() {
            let _ = self.end_edit_session();
        }
        self.ledger.clear();
        self.module_readers.release_all();
        info!(target: "enc_remap::session", "Debugging session {} ended", self.id);
    }
}
