use std::future::Future;

use super::flags::ActiveStatementFlags;
use super::ids::{ManagedInstructionId, ModuleId};
use crate::error::EncResult;
use crate::text::LinePositionSpan;

/// An active instruction as reported by the debugger, before it is resolved
/// into workspace documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStatementDebugInfo {
    pub instruction: ManagedInstructionId,
    /// Path of the document recorded in the module's PDB, if any.
    pub document_name: Option<String>,
    /// Span of the statement in the debuggee's PDB.
    pub span: LinePositionSpan,
    pub flags: ActiveStatementFlags,
}

impl ActiveStatementDebugInfo {
    /// False for frames with no sequence point (hidden code, missing PDB).
    pub fn has_source_location(&self) -> bool {
        self.document_name.as_deref().is_some_and(|name| !name.is_empty())
            && self.span != LinePositionSpan::default()
    }
}

/// Whether a module can receive an edit-and-continue delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum EncAvailabilityStatus {
    Available,
    ModuleNotLoaded,
    ModuleReloaded,
    InRunMode,
    Optimized,
    NotSupportedForModule,
}

impl EncAvailabilityStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, EncAvailabilityStatus::Available)
    }
}

/// The debugger side of the session.
pub trait DebuggerService: Send + Sync {
    /// Every active instruction across all threads and frames.
    fn active_statements(
        &self,
    ) -> impl Future<Output = EncResult<Vec<ActiveStatementDebugInfo>>> + Send;

    fn availability(
        &self,
        module: ModuleId,
    ) -> impl Future<Output = EncResult<EncAvailabilityStatus>> + Send;

    fn is_module_loaded(&self, module: ModuleId) -> bool;
}
