pub mod map;
pub mod span;
pub mod statement;

// Re-export main types
pub use map::ActiveStatementsMap;
pub use span::{ActiveStatementSpan, ActiveStatementSpanProvider, NoTrackingSpans, TrackingSpans};
pub use statement::{ActiveStatement, ActiveStatementId};
