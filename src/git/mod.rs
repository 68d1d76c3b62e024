//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. Object reads and writes,
//! tree staging, and ref updates flow through it. No other module should
//! import `git2`.
//!
//! # Responsibilities
//!
//! - Repository opening and creation
//! - Ref operations (read, CAS update, atomic batches, reflog)
//! - Object operations (blobs, trees, commits)
//! - In-memory tree staging
//! - Project name to repository mapping
//!
//! # Invariants
//!
//! - All ref updates use CAS (compare-and-swap) semantics
//! - A ref batch moves all of its refs or none of them
//! - All operations return strong types (Oid, RefName, PersonIdent)
//!
//! # Example
//!
//! ```ignore
//! use metaref::git::{Git, RefUpdate};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/git/project.git"))?;
//! let result = git.update_ref(&RefUpdate {
//!     ref_name: RefName::meta_config(),
//!     expected_old: old_oid,
//!     new_id: new_oid,
//!     reflog_message: "commit: update".into(),
//!     reflog_ident: None,
//!     force: false,
//! })?;
//! assert!(result.is_success());
//! ```

mod batch;
mod interface;
mod manager;
mod stage;

pub use batch::{RefBatch, RefCommand};
pub use interface::{
    CommitInfo, FileMode, Git, GitError, NewCommit, RefUpdate, RefUpdateResult, TreeEntry,
};
pub use manager::{FsRepositoryManager, RepositoryManager};
pub use stage::TreeStage;
