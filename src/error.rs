use thiserror::Error;

use crate::store::NoteId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("note content cannot be blank")]
    BlankContent,
    #[error("folder name cannot be blank")]
    BlankFolderName,
    #[error("folder '{0}' already exists")]
    DuplicateFolder(String),
    #[error("folder '{0}' does not exist")]
    UnknownFolder(String),
}

/// Rejection of a single Note Store operation. The store is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("note #{index} does not exist ({len} notes)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("note {0} does not exist")]
    UnknownNote(NoteId),
    #[error("unknown theme '{0}'")]
    UnknownTheme(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistError {
    #[error("stored value for '{key}' is unreadable ({reason}); using defaults")]
    CorruptPersistedState { key: &'static str, reason: String },
}
