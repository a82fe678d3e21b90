use thiserror::Error;

use crate::domain::{Field, TagId, ValidationError};

/// Which collection an id was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Expense,
    Tag,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Expense => write!(f, "Expense"),
            EntityKind::Tag => write!(f, "Tag"),
        }
    }
}

/// Errors returned to the caller of a ledger operation. A failed operation
/// leaves the ledger exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Tag '{tag_name}' is used by {expense_count} expense(s) and cannot be deleted")]
    Conflict {
        tag_id: TagId,
        tag_name: String,
        expense_count: usize,
    },
}

impl LedgerError {
    pub(crate) fn expense_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: EntityKind::Expense,
            id: id.to_string(),
        }
    }

    pub(crate) fn tag_not_found(id: &str) -> Self {
        LedgerError::NotFound {
            kind: EntityKind::Tag,
            id: id.to_string(),
        }
    }

    /// The offending field, for validation failures.
    pub fn field(&self) -> Option<Field> {
        match self {
            LedgerError::Validation(e) => Some(e.field),
            _ => None,
        }
    }
}

/// A storage failure. Never aborts the operation that triggered it; the
/// in-memory ledger stays authoritative for the rest of the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceWarning {
    #[error("Failed to read '{key}' from storage: {message}")]
    Read { key: String, message: String },

    #[error("Failed to write '{key}' to storage: {message}")]
    Write { key: String, message: String },

    #[error("Stored data under '{key}' is unusable, starting from defaults: {message}")]
    Corrupt { key: String, message: String },
}

impl PersistenceWarning {
    pub fn key(&self) -> &str {
        match self {
            PersistenceWarning::Read { key, .. }
            | PersistenceWarning::Write { key, .. }
            | PersistenceWarning::Corrupt { key, .. } => key,
        }
    }
}
