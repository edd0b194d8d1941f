//! An in-memory debugger that replays a recorded break state.

use dashmap::{DashMap, DashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::ids::ModuleId;
use super::service::{ActiveStatementDebugInfo, DebuggerService, EncAvailabilityStatus};
use crate::error::{EncResult, LockResultExt};

/// Debugger backed by a fixed list of active statements.
///
/// Counts how often the active statement list is requested so callers can
/// check that per-session caches collapse concurrent requests.
#[derive(Default)]
pub struct RecordedDebugger {
    statements: Mutex<Vec<ActiveStatementDebugInfo>>,
    loaded_modules: DashSet<ModuleId>,
    availability: DashMap<ModuleId, EncAvailabilityStatus>,
    active_statement_requests: AtomicUsize,
    latency: Option<Duration>,
}

impl RecordedDebugger {
    pub fn new(statements: Vec<ActiveStatementDebugInfo>) -> Self {
        Self {
            statements: Mutex::new(statements),
            ..Default::default()
        }
    }

    /// Delay every active statement request by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Replace the break state seen by the next edit session.
    pub fn set_active_statements(&self, statements: Vec<ActiveStatementDebugInfo>) {
        match self
            .statements
            .lock()
            .recover_poison("RecordedDebugger::set_active_statements")
        {
            Ok(mut current) => *current = statements,
            Err(e) => log::error!(target: "enc_remap::debugger", "{}", e),
        }
    }

    pub fn load_module(&self, module: ModuleId) {
        self.loaded_modules.insert(module);
    }

    pub fn unload_module(&self, module: ModuleId) {
        self.loaded_modules.remove(&module);
    }

    pub fn set_availability(&self, module: ModuleId, status: EncAvailabilityStatus) {
        self.availability.insert(module, status);
    }

    pub fn active_statement_requests(&self) -> usize {
        self.active_statement_requests.load(Ordering::SeqCst)
    }
}

impl DebuggerService for RecordedDebugger {
    async fn active_statements(&self) -> EncResult<Vec<ActiveStatementDebugInfo>> {
        self.active_statement_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let statements = self
            .statements
            .lock()
            .recover_poison("RecordedDebugger::active_statements")?;
        Ok(statements.clone())
    }

    async fn availability(&self, module: ModuleId) -> EncResult<EncAvailabilityStatus> {
        if !self.is_module_loaded(module) {
            return Ok(EncAvailabilityStatus::ModuleNotLoaded);
        }
        Ok(self
            .availability
            .get(&module)
            .map(|status| *status)
            .unwrap_or(EncAvailabilityStatus::Available))
    }

    fn is_module_loaded(&self, module: ModuleId) -> bool {
        self.loaded_modules.contains(&module)
    }
}
