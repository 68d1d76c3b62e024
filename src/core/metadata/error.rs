//! core::metadata::error
//!
//! Errors raised by the metadata engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::TypeError;
use crate::git::{GitError, RefUpdateResult};

/// Errors from loading, writing and publishing metadata.
#[derive(Debug, Error)]
pub enum MetaDataError {
    /// A stored config file could not be parsed.
    #[error("Invalid config file {file} in commit {revision}: {message}")]
    ConfigInvalid {
        file: String,
        /// Commit the file was read from
        revision: String,
        message: String,
    },

    /// Stored content was read but could not be interpreted.
    #[error("invalid content in {file}: {message}")]
    InvalidContent { file: String, message: String },

    /// The object store could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] GitError),

    /// The ref moved while the update was being prepared.
    ///
    /// Reload and retry.
    #[error("Cannot update {ref_name} in {}: {result}", .repository.display())]
    LockFailure {
        ref_name: String,
        repository: PathBuf,
        result: RefUpdateResult,
    },

    /// The ref update ended in any other non-success outcome.
    #[error("Cannot update {ref_name} in {}: {result} ({reflog_message})", .repository.display())]
    UpdateFailed {
        ref_name: String,
        repository: PathBuf,
        result: RefUpdateResult,
        reflog_message: String,
    },

    /// A view of one ref was written into a session for another ref.
    #[error("cannot write {actual} within an update of {expected}")]
    RefMismatch { expected: String, actual: String },

    /// No author or committer could be determined for a commit.
    #[error("no {role} identity for commit on {ref_name}")]
    MissingIdentity {
        role: &'static str,
        ref_name: String,
    },

    #[error(transparent)]
    InvalidType(#[from] TypeError),
}

impl MetaDataError {
    /// Whether retrying after a fresh load may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockFailure { .. })
    }
}
