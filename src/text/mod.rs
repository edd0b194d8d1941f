pub mod mapper;
pub mod position;
pub mod tracking;

// Re-export main types and functions
pub use mapper::{PositionMapper, compute_line_starts};
pub use position::{LinePosition, LinePositionSpan, TextSpan};
pub use tracking::{Affinity, SpanTracker, TextChangeMap};
