//! Error handling types for enc-remap
//!
//! This module provides the error type shared by the active statement
//! engine, the session layer and the fixture parser.

use std::sync::PoisonError;
use thiserror::Error;

use crate::debugger::ModuleId;
use crate::workspace::DocumentId;

/// Comprehensive error type for edit-and-continue operations
#[derive(Debug, Error)]
pub enum EncError {
    /// Lock acquisition failed or was poisoned
    #[error("Lock acquisition failed: {message}")]
    Lock { message: String },

    /// Document not known to the workspace
    #[error("Document not found: {document}")]
    DocumentNotFound { document: DocumentId },

    /// Configuration error
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Malformed tagged fixture source
    #[error("Invalid fixture markup at offset {offset}: {message}")]
    Fixture { offset: usize, message: String },

    /// The debugger failed to answer a request
    #[error("Debugger request failed: {message}")]
    Debugger { message: String },

    /// The module can't be updated in its current state
    #[error("Module {module} is not available for update: {status:?}")]
    ModuleUnavailable {
        module: ModuleId,
        status: crate::debugger::EncAvailabilityStatus,
    },

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// No edit session is in progress
    #[error("No edit session in progress")]
    NoEditSession,

    /// An edit session is already in progress
    #[error("An edit session is already in progress")]
    EditSessionInProgress,

    /// Commit or discard requested without a prepared update
    #[error("No pending update")]
    NoPendingUpdate,

    /// The ledger changed after the pending update was computed
    #[error("Pending update was computed against a stale ledger")]
    StaleUpdate,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for edit-and-continue operations
pub type EncResult<T> = Result<T, EncError>;

/// Helper trait to convert PoisonError to EncError
pub trait LockResultExt<T> {
    /// Recover the guard of a poisoned lock, logging which operation hit it.
    fn recover_poison(self, context: &str) -> Result<T, EncError>;
}

impl<T> LockResultExt<T> for Result<T, PoisonError<T>> {
    fn recover_poison(self, context: &str) -> Result<T, EncError> {
        match self {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                log::warn!(
                    target: "enc_remap::lock_recovery",
                    "Recovered from poisoned lock in {}",
                    context
                );
                Ok(poisoned.into_inner())
            }
        }
    }
}

/// Helper functions for common error patterns
impl EncError {
    /// Create a lock error
    pub fn lock(message: impl Into<String>) -> Self {
        EncError::Lock {
            message: message.into(),
        }
    }

    /// Create a document not found error
    pub fn document_not_found(document: DocumentId) -> Self {
        EncError::DocumentNotFound { document }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        EncError::Config {
            message: message.into(),
        }
    }

    /// Create a fixture markup error
    pub fn fixture(offset: usize, message: impl Into<String>) -> Self {
        EncError::Fixture {
            offset,
            message: message.into(),
        }
    }

    /// Create a debugger error
    pub fn debugger(message: impl Into<String>) -> Self {
        EncError::Debugger {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        EncError::Internal(message.into())
    }
}
