//! core::metadata
//!
//! Versioned metadata stored as commits under git refs.
//!
//! # Modules
//!
//! - [`versioned`] - The [`VersionedMetaData`] trait and its revision owner
//! - [`access`] - Reading and writing files of a stored tree
//! - [`session`] - Update sessions and ref publication
//! - [`update`] - The per-update transaction context
//! - [`factory`] - User and server update factories
//! - [`config_file`] - A TOML config file kept under a ref
//! - [`change_id`] - Change-Id footers for commit messages
//! - [`rewriter`] - History rewrites
//! - [`error`] - Error type shared by all of the above
//!
//! # Architecture
//!
//! Every piece of metadata lives under its own ref (`refs/meta/config` for
//! project configuration). The ref points at a commit whose tree holds the
//! files making up the state; the commit chain is the audit log. Loading
//! reads the tree at the ref's tip. Saving stages files into an in-memory
//! tree, drafts commits on top of the loaded revision, and finally moves the
//! ref with compare-and-swap semantics.
//!
//! A concurrent writer that moved the ref in between is reported as
//! [`MetaDataError::LockFailure`]; callers reload and retry.
//!
//! # Example
//!
//! ```ignore
//! use metaref::core::metadata::{Versioned, VersionedConfigFile};
//!
//! let mut file = Versioned::new(VersionedConfigFile::new("project.config"));
//! file.load_from(&update)?;
//! file.config_mut().insert("description".into(), "Build tools".into());
//! file.commit(&update)?;
//! ```

pub mod access;
pub mod change_id;
pub mod config_file;
pub mod error;
pub mod factory;
pub mod rewriter;
pub mod session;
pub mod update;
pub mod versioned;

// Re-export commonly used types
pub use access::{MetaDataReader, MetaDataWriter};
pub use change_id::{insert_change_id, ChangeIdGenerator, ChangeIdInput, HashChangeId};
pub use config_file::VersionedConfigFile;
pub use error::MetaDataError;
pub use factory::{ServerFactory, UserFactory};
pub use rewriter::VersionedMetaDataRewriter;
pub use session::BatchMetaDataUpdate;
pub use update::{
    CommitBuilder, IdentifiedUser, MetaDataUpdate, RefUpdatedEvent, RefUpdatedListener,
    RepoHandle,
};
pub use versioned::{PathInfo, Revision, Versioned, VersionedMetaData};
