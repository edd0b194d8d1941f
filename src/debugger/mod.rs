pub mod flags;
pub mod ids;
pub mod recorded;
pub mod service;

// Re-export main types
pub use flags::ActiveStatementFlags;
pub use ids::{ManagedInstructionId, ManagedMethodId, MethodToken, ModuleId};
pub use recorded::RecordedDebugger;
pub use service::{ActiveStatementDebugInfo, DebuggerService, EncAvailabilityStatus};
