//! Workspace capability consumed by the engine.
//!
//! The engine never loads files itself: it asks the workspace which
//! documents a debugger-reported path maps to, and for the base (last
//! committed) and current text of those documents.

pub mod store;

pub use store::InMemoryWorkspace;

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Identifier of one workspace document.
///
/// Linked files (one path compiled into several projects) have one id per
/// project.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DocumentId(pub u32);

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a document's committed text relates to what the debuggee runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CommittedDocumentState {
    /// The committed text is what the loaded PDB was built from.
    MatchesBuildOutput,
    /// The committed text differs from the loaded build.
    OutOfSync,
    /// The document isn't part of any build output.
    #[default]
    None,
}

/// Document access for the active statement engine.
pub trait WorkspaceService: Send + Sync {
    /// All documents sharing this file path; empty for unknown paths.
    fn document_ids_for_path(&self, path: &str) -> Vec<DocumentId>;

    fn document_path(&self, document: DocumentId) -> Option<String>;

    /// Language name used to pick the exception-handling syntax.
    fn language(&self, document: DocumentId) -> Option<String>;

    /// Text of the last committed snapshot.
    fn base_source_text(&self, document: DocumentId) -> Option<Arc<str>>;

    /// Text as currently edited.
    fn current_source_text(&self, document: DocumentId) -> Option<Arc<str>>;

    fn committed_document_state(&self, document: DocumentId) -> CommittedDocumentState;

    /// An update built from these documents was applied to the debuggee;
    /// their current text becomes the base text.
    fn commit_documents(&self, documents: &[DocumentId]);
}
