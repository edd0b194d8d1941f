//! Baseline module reader handles.
//!
//! An update opens a reader on the baseline of the module it patches. Once
//! committed, the debuggee may run code of that baseline for the rest of
//! the debugging session, so the reader stays open until the session ends.
//!
//! This crate doesn't read PDBs or metadata itself. A [`ModuleReader`]
//! stands in for the baseline PDB reader that the emit layer owns, and only
//! tracks the lifetime of that handle.

use dashmap::DashMap;
use log::{debug, info};
use std::sync::Arc;
use ulid::Ulid;

use crate::debugger::ModuleId;

/// Placeholder for the baseline PDB reader of one module: a module id and
/// a unique handle id. It holds no metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct ModuleReader {
    module: ModuleId,
    handle: Ulid,
}

impl ModuleReader {
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Unique id of this open handle.
    pub fn handle(&self) -> Ulid {
        self.handle
    }
}

/// Readers retained by committed updates, one per module.
#[derive(Debug, Default)]
pub struct ModuleReaderRegistry {
    readers: DashMap<ModuleId, Arc<ModuleReader>>,
}

impl ModuleReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a reader for a pending update. It's released when dropped
    /// unless [`retain`](Self::retain) keeps it.
    pub fn open(&self, module: ModuleId) -> Arc<ModuleReader> {
        if let Some(existing) = self.readers.get(&module) {
            return Arc::clone(&existing);
        }
        let reader = Arc::new(ModuleReader {
            module,
            handle: Ulid::new(),
        });
        debug!(
            target: "enc_remap::module_readers",
            "Opened reader {} for module {}",
            reader.handle,
            module
        );
        reader
    }

    /// Keep readers of a committed update open. A module keeps its first
    /// retained reader.
    pub fn retain(&self, readers: impl IntoIterator<Item = Arc<ModuleReader>>) {
        for reader in readers {
            self.readers.entry(reader.module).or_insert(reader);
        }
    }

    pub fn get(&self, module: ModuleId) -> Option<Arc<ModuleReader>> {
        self.readers.get(&module).map(|reader| Arc::clone(&reader))
    }

    /// Modules with a retained reader, sorted.
    pub fn modules(&self) -> Vec<ModuleId> {
        let mut modules: Vec<_> = self.readers.iter().map(|entry| *entry.key()).collect();
        modules.sort();
        modules
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Release every retained reader. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let released = self.readers.len();
        self.readers.clear();
        info!(
            target: "enc_remap::module_readers",
            "Released {} module readers",
            released
        );
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opened_reader_is_not_retained_until_commit() {
        let registry = ModuleReaderRegistry::new();
        let reader = registry.open(ModuleId(1));

        assert!(registry.is_empty());
        registry.retain([reader]);
        assert_eq!(registry.modules(), vec![ModuleId(1)]);
    }

    #[test]
    fn test_reader_is_a_handle_for_its_module() {
        let registry = ModuleReaderRegistry::new();
        let a = registry.open(ModuleId(1));
        let b = registry.open(ModuleId(2));

        assert_eq!(a.module(), ModuleId(1));
        assert_eq!(b.module(), ModuleId(2));
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn test_retained_reader_is_reused() {
        let registry = ModuleReaderRegistry::new();
        let first = registry.open(ModuleId(1));
        registry.retain([Arc::clone(&first)]);

        let second = registry.open(ModuleId(1));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(Arc::strong_count(&first), 3);
    }

    #[test]
    fn test_release_all_clears_registry() {
        let registry = ModuleReaderRegistry::new();
        registry.retain([registry.open(ModuleId(1)), registry.open(ModuleId(2))]);

        assert_eq!(registry.release_all(), 2);
        assert!(registry.get(ModuleId(1)).is_none());
    }
}
