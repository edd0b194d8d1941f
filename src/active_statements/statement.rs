use serde::Serialize;
use std::fmt;

use crate::debugger::{ActiveStatementFlags, ManagedInstructionId, ManagedMethodId};
use crate::text::LinePositionSpan;
use crate::workspace::DocumentId;

/// Ordinal of an active statement within one edit session's map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ActiveStatementId(pub usize);

impl fmt::Display for ActiveStatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS:{}", self.0)
    }
}

/// An active instruction resolved into workspace documents.
///
/// Immutable once the map is built; both views of the map share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveStatement {
    pub id: ActiveStatementId,
    pub instruction: ManagedInstructionId,
    /// Union of the flags of every frame executing this instruction.
    pub flags: ActiveStatementFlags,
    /// Primary document first, then linked documents of the same file.
    pub document_ids: Vec<DocumentId>,
    /// Span in the base snapshot.
    pub span: LinePositionSpan,
}

impl ActiveStatement {
    pub fn primary_document(&self) -> DocumentId {
        self.document_ids[0]
    }

    pub fn method(&self) -> ManagedMethodId {
        self.instruction.method
    }

    pub fn is_leaf(&self) -> bool {
        self.flags.is_leaf()
    }

    pub fn is_non_leaf(&self) -> bool {
        self.flags.is_non_leaf()
    }
}
