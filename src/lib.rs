pub mod active_statements;
pub mod config;
pub mod debugger;
pub mod error;
pub mod exception_regions;
pub mod fixtures;
pub mod ledger;
pub mod remap;
pub mod session;
pub mod syntax;
pub mod text;
pub mod workspace;

// Re-export the main engine types
pub use active_statements::{ActiveStatement, ActiveStatementId, ActiveStatementSpan, ActiveStatementsMap};
pub use error::{EncError, EncResult};
pub use exception_regions::{BaseExceptionRegions, ExceptionRegions, resolve_exception_regions};
pub use ledger::{NonRemappableRegion, NonRemappableRegionLedger, NonRemappableRegions};
pub use remap::{
    ActiveStatementUpdate, ChangedDocument, ExceptionRegionUpdate, NewActiveStatementSpans,
    RemapRequest, RemapResult, compute_updates,
};
pub use session::{DebuggingSession, EditSession};
