use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;

use super::statement::{ActiveStatement, ActiveStatementId};
use crate::debugger::{ActiveStatementDebugInfo, ManagedInstructionId};
use crate::workspace::DocumentId;

/// Snapshot of all active statements of one edit session.
///
/// Two views over the same statement objects: by instruction and by
/// document. Statements are also reachable by ordinal.
#[derive(Debug, Default)]
pub struct ActiveStatementsMap {
    statements: Vec<Arc<ActiveStatement>>,
    instruction_map: HashMap<ManagedInstructionId, Arc<ActiveStatement>>,
    document_map: HashMap<DocumentId, Vec<Arc<ActiveStatement>>>,
}

/// Statement being assembled while debug infos are merged.
struct PendingStatement {
    info: ActiveStatementDebugInfo,
    document_ids: Vec<DocumentId>,
}

impl ActiveStatementsMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the map from the debugger's active instructions.
    ///
    /// `resolve` maps a debugger document name to workspace documents. Debug
    /// infos without a source location, or whose document resolves to
    /// nothing, are dropped. Debug infos sharing an instruction (recursion,
    /// several threads in one method) merge into one statement whose flags
    /// are the union of all frames.
    pub fn build<F>(debug_infos: impl IntoIterator<Item = ActiveStatementDebugInfo>, mut resolve: F) -> Self
    where
        F: FnMut(&str) -> Vec<DocumentId>,
    {
        let mut pending: Vec<PendingStatement> = Vec::new();
        let mut by_instruction: HashMap<ManagedInstructionId, usize> = HashMap::new();
        let mut by_document: HashMap<DocumentId, Vec<usize>> = HashMap::new();
        let mut dropped = 0usize;

        for info in debug_infos {
            if !info.has_source_location() {
                trace!(
                    target: "enc_remap::active_statements",
                    "Dropping {} without source location",
                    info.instruction
                );
                dropped += 1;
                continue;
            }

            let document_ids = info
                .document_name
                .as_deref()
                .map(&mut resolve)
                .unwrap_or_default();
            if document_ids.is_empty() {
                trace!(
                    target: "enc_remap::active_statements",
                    "Dropping {}: document {:?} is not in the workspace",
                    info.instruction,
                    info.document_name
                );
                dropped += 1;
                continue;
            }

            match by_instruction.get(&info.instruction) {
                Some(&ordinal) => {
                    let statement = &mut pending[ordinal];
                    statement.info.flags |= info.flags;
                    for id in document_ids {
                        if !statement.document_ids.contains(&id) {
                            statement.document_ids.push(id);
                            by_document.entry(id).or_default().push(ordinal);
                        }
                    }
                }
                None => {
                    let ordinal = pending.len();
                    by_instruction.insert(info.instruction, ordinal);
                    for &id in &document_ids {
                        by_document.entry(id).or_default().push(ordinal);
                    }
                    pending.push(PendingStatement { info, document_ids });
                }
            }
        }

        let statements: Vec<Arc<ActiveStatement>> = pending
            .into_iter()
            .enumerate()
            .map(|(ordinal, statement)| {
                Arc::new(ActiveStatement {
                    id: ActiveStatementId(ordinal),
                    instruction: statement.info.instruction,
                    flags: statement.info.flags,
                    document_ids: statement.document_ids,
                    span: statement.info.span,
                })
            })
            .collect();

        let instruction_map = statements
            .iter()
            .map(|statement| (statement.instruction, Arc::clone(statement)))
            .collect();

        let document_map = by_document
            .into_iter()
            .map(|(document, ordinals)| {
                let list = ordinals
                    .into_iter()
                    .map(|ordinal| Arc::clone(&statements[ordinal]))
                    .collect();
                (document, list)
            })
            .collect::<HashMap<_, Vec<_>>>();

        debug!(
            target: "enc_remap::active_statements",
            "Built active statement map: {} statements in {} documents, {} debug infos dropped",
            statements.len(),
            document_map.len(),
            dropped
        );

        Self {
            statements,
            instruction_map,
            document_map,
        }
    }

    /// All statements, indexed by ordinal.
    pub fn statements(&self) -> &[Arc<ActiveStatement>] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn get(&self, instruction: &ManagedInstructionId) -> Option<&Arc<ActiveStatement>> {
        self.instruction_map.get(instruction)
    }

    pub fn get_by_id(&self, id: ActiveStatementId) -> Option<&Arc<ActiveStatement>> {
        self.statements.get(id.0)
    }

    pub fn instruction_map(&self) -> &HashMap<ManagedInstructionId, Arc<ActiveStatement>> {
        &self.instruction_map
    }

    pub fn document_map(&self) -> &HashMap<DocumentId, Vec<Arc<ActiveStatement>>> {
        &self.document_map
    }

    /// Statements of a document in the order they were reported.
    pub fn document_statements(&self, document: DocumentId) -> &[Arc<ActiveStatement>] {
        self.document_map
            .get(&document)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Documents with at least one active statement, sorted.
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut documents: Vec<_> = self.document_map.keys().copied().collect();
        documents.sort();
        documents
    }
}
