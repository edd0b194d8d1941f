use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{CommittedDocumentState, DocumentId, WorkspaceService};

#[derive(Debug, Clone)]
struct WorkspaceDocument {
    path: String,
    language: Option<String>,
    base_text: Arc<str>,
    current_text: Arc<str>,
    state: CommittedDocumentState,
}

/// In-memory workspace: the central store for all document texts.
pub struct InMemoryWorkspace {
    documents: DashMap<DocumentId, WorkspaceDocument>,
    next_id: AtomicU32,
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self {
            documents: DashMap::new(),
            next_id: AtomicU32::new(0),
        }
    }
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document whose committed text matches the build output.
    pub fn add_document(
        &self,
        path: impl Into<String>,
        language: Option<&str>,
        text: impl Into<Arc<str>>,
    ) -> DocumentId {
        let id = DocumentId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let text = text.into();
        self.documents.insert(
            id,
            WorkspaceDocument {
                path: path.into(),
                language: language.map(String::from),
                base_text: Arc::clone(&text),
                current_text: text,
                state: CommittedDocumentState::MatchesBuildOutput,
            },
        );
        id
    }

    /// Add another document for the same file as `document` (a linked file).
    pub fn add_linked_document(&self, document: DocumentId) -> Option<DocumentId> {
        let existing = self.documents.get(&document)?.clone();
        let id = DocumentId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.documents.insert(id, existing);
        Some(id)
    }

    /// Replace the current text of a document, keeping its base text.
    ///
    /// Linked documents share the file, so they are edited together.
    pub fn edit_document(&self, document: DocumentId, text: impl Into<Arc<str>>) -> bool {
        let text = text.into();
        let Some(path) = self.document_path(document) else {
            return false;
        };
        for mut entry in self.documents.iter_mut() {
            if entry.path == path {
                entry.current_text = Arc::clone(&text);
            }
        }
        true
    }

    /// Make the current text the new base text.
    pub fn commit_document(&self, document: DocumentId) -> bool {
        match self.documents.get_mut(&document) {
            Some(mut doc) => {
                doc.base_text = Arc::clone(&doc.current_text);
                true
            }
            None => false,
        }
    }

    pub fn set_committed_state(&self, document: DocumentId, state: CommittedDocumentState) -> bool {
        match self.documents.get_mut(&document) {
            Some(mut doc) => {
                doc.state = state;
                true
            }
            None => false,
        }
    }

    pub fn document_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<_> = self.documents.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }
}

impl WorkspaceService for InMemoryWorkspace {
    fn document_ids_for_path(&self, path: &str) -> Vec<DocumentId> {
        let mut ids: Vec<_> = self
            .documents
            .iter()
            .filter(|entry| entry.path == path)
            .map(|entry| *entry.key())
            .collect();
        ids.sort();
        ids
    }

    fn document_path(&self, document: DocumentId) -> Option<String> {
        self.documents.get(&document).map(|doc| doc.path.clone())
    }

    fn language(&self, document: DocumentId) -> Option<String> {
        self.documents.get(&document)?.language.clone()
    }

    fn base_source_text(&self, document: DocumentId) -> Option<Arc<str>> {
        self.documents
            .get(&document)
            .map(|doc| Arc::clone(&doc.base_text))
    }

    fn current_source_text(&self, document: DocumentId) -> Option<Arc<str>> {
        self.documents
            .get(&document)
            .map(|doc| Arc::clone(&doc.current_text))
    }

    fn committed_document_state(&self, document: DocumentId) -> CommittedDocumentState {
        self.documents
            .get(&document)
            .map(|doc| doc.state)
            .unwrap_or_default()
    }

    fn commit_documents(&self, documents: &[DocumentId]) {
        for &document in documents {
            self.commit_document(document);
        }
    }
}
