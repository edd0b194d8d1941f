//! Session lifecycle: a debugging session owns the ledger; each break state
//! is an edit session with its own lazily built snapshots.

pub mod debugging;
pub mod edit;
pub mod module_readers;

pub use debugging::DebuggingSession;
pub use edit::{EditSession, PendingUpdate};
pub use module_readers::{ModuleReader, ModuleReaderRegistry};
