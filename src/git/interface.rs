//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! metaref. All object and ref access made by the metadata engine flows
//! through [`Git`], which returns strong types and normalizes git2 errors
//! into typed failure categories.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: No repository at the given path
//! - [`GitError::RefNotFound`]: Requested ref does not exist
//! - [`GitError::ObjectNotFound`]: Object missing from the object store
//! - [`GitError::CasFailed`]: Compare-and-swap precondition failed in a batch
//!
//! Ref updates do not fail with an error when the ref moved or the update
//! is not allowed. They report a [`RefUpdateResult`] instead, so callers can
//! tell a retryable lock failure from any other outcome.
//!
//! # Example
//!
//! ```ignore
//! use metaref::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("/srv/git/project.git"))?;
//! if let Some(tip) = git.try_resolve_ref("refs/meta/config")? {
//!     println!("config is at {}", tip.short(7));
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Offset, Utc};
use thiserror::Error;

use crate::core::types::{Oid, PersonIdent, RefName, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// No repository at the given path.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Compare-and-swap precondition failed.
    ///
    /// Raised by batch execution when a ref no longer holds the value a
    /// queued command expects.
    #[error("CAS failed for {refname}: expected {expected}, found {actual}")]
    CasFailed {
        /// The ref being updated
        refname: String,
        /// The expected old value
        expected: String,
        /// The actual current value
        actual: String,
    },

    /// A queued ref transition was refused for a reason other than CAS.
    #[error("cannot update {refname}: {result}")]
    UpdateRejected {
        /// The ref being updated
        refname: String,
        /// Outcome that refused the update
        result: RefUpdateResult,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Object exists but has a different type than required.
    #[error("object {oid} is not a {expected}")]
    WrongObjectType {
        /// The OID that was read
        oid: String,
        /// The type the caller asked for
        expected: &'static str,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// Invalid ref name format.
    #[error("invalid ref name: {message}")]
    InvalidRefName {
        /// Description of the problem
        message: String,
    },

    /// Path cannot be stored in a tree.
    #[error("invalid tree path '{path}': {message}")]
    InvalidPath {
        /// The rejected path
        path: String,
        /// Description of the problem
        message: String,
    },

    /// Permission or filesystem error.
    #[error("repository access error: {message}")]
    AccessError {
        /// Description of the error
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    pub(super) fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context.contains("ref") {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            git2::ErrorCode::Locked => GitError::AccessError {
                message: format!("{} is locked: {}", context, err.message()),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidOid(msg) => GitError::InvalidOid { oid: msg },
            TypeError::InvalidRefName(msg) => GitError::InvalidRefName { message: msg },
            TypeError::InvalidProjectName(msg) => GitError::AccessError { message: msg },
        }
    }
}

/// Outcome of a single ref transition.
///
/// Only [`New`](Self::New), [`FastForward`](Self::FastForward) and, when
/// explicitly allowed, [`Forced`](Self::Forced) mean the ref now points at
/// the requested commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdateResult {
    /// The ref did not exist and was created.
    New,
    /// The new value descends from the old one.
    FastForward,
    /// The ref was moved to a commit that does not descend from the old one.
    Forced,
    /// The ref already pointed at the requested commit.
    NoChange,
    /// The ref did not hold the expected old value, or its lock was taken.
    LockFailure,
    /// The update would discard history and forcing was not allowed.
    Rejected,
    /// The requested new value is not in the object store.
    RejectedMissingObject,
    /// Writing the ref failed.
    IoFailure,
    /// The update was never attempted.
    NotAttempted,
}

impl RefUpdateResult {
    /// Whether the ref was moved to the requested value.
    pub fn is_success(self) -> bool {
        matches!(self, Self::New | Self::FastForward | Self::Forced)
    }
}

impl fmt::Display for RefUpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::FastForward => "FAST_FORWARD",
            Self::Forced => "FORCED",
            Self::NoChange => "NO_CHANGE",
            Self::LockFailure => "LOCK_FAILURE",
            Self::Rejected => "REJECTED",
            Self::RejectedMissingObject => "REJECTED_MISSING_OBJECT",
            Self::IoFailure => "IO_FAILURE",
            Self::NotAttempted => "NOT_ATTEMPTED",
        };
        f.write_str(name)
    }
}

/// A requested compare-and-swap ref transition.
#[derive(Debug, Clone)]
pub struct RefUpdate {
    /// The ref to move.
    pub ref_name: RefName,
    /// Value the ref must hold; the zero id means "must not exist".
    pub expected_old: Oid,
    /// Value to store.
    pub new_id: Oid,
    /// Reflog message for the transition.
    pub reflog_message: String,
    /// Identity recorded in the reflog. Falls back to the repository default.
    pub reflog_ident: Option<PersonIdent>,
    /// Allow a transition that does not fast-forward.
    pub force: bool,
}

/// Mode of an entry in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    Regular,
    Executable,
    Symlink,
    Tree,
    Gitlink,
}

impl FileMode {
    pub(super) fn from_raw(mode: u32) -> Self {
        match mode {
            0o100755 => Self::Executable,
            0o120000 => Self::Symlink,
            0o040000 => Self::Tree,
            0o160000 => Self::Gitlink,
            _ => Self::Regular,
        }
    }

    pub(super) fn raw(self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Tree => 0o040000,
            Self::Gitlink => 0o160000,
        }
    }
}

/// A path within a tree together with its mode and object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Slash separated path relative to the tree root.
    pub path: String,
    pub mode: FileMode,
    pub id: Oid,
}

/// Information about a commit.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    /// The commit OID
    pub oid: Oid,
    /// The tree the commit records
    pub tree: Oid,
    /// Parent commits, first parent first
    pub parents: Vec<Oid>,
    /// First line of the commit message
    pub summary: String,
    /// Full commit message
    pub message: String,
    pub author: PersonIdent,
    pub committer: PersonIdent,
}

/// Everything needed to write a commit object.
#[derive(Debug, Clone)]
pub struct NewCommit<'a> {
    pub tree: &'a Oid,
    pub parents: &'a [Oid],
    pub author: &'a PersonIdent,
    pub committer: &'a PersonIdent,
    pub message: &'a str,
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. All repository
/// reads and writes flow through this interface. No other module imports
/// `git2` directly.
pub struct Git {
    /// The underlying git2 repository
    pub(super) repo: git2::Repository,
}

impl fmt::Debug for Git {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

pub(super) fn raw_oid(oid: &Oid) -> Result<git2::Oid, GitError> {
    git2::Oid::from_str(oid.as_str()).map_err(|e| GitError::from_git2(e, oid.as_str()))
}

pub(super) fn typed_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Oid::new(oid.to_string()).map_err(|e| e.into())
}

pub(super) fn signature(ident: &PersonIdent) -> Result<git2::Signature<'static>, GitError> {
    let time = git2::Time::new(ident.when.timestamp(), ident.offset_minutes());
    git2::Signature::new(&ident.name, &ident.email, &time).map_err(|e| GitError::Internal {
        message: format!("invalid identity {}: {}", ident, e.message()),
    })
}

fn person(sig: &git2::Signature<'_>) -> PersonIdent {
    let when = sig.when();
    let offset = chrono::FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or(Utc.fix());
    let at = DateTime::from_timestamp(when.seconds(), 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&offset);
    PersonIdent::new(
        String::from_utf8_lossy(sig.name_bytes()),
        String::from_utf8_lossy(sig.email_bytes()),
        at,
    )
}

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open the repository at exactly `path` (bare or not).
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;
        Ok(Self { repo })
    }

    /// Create a bare repository at `path`.
    pub fn init_bare(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::init_bare(path).map_err(|e| GitError::AccessError {
            message: format!("cannot create repository {}: {}", path.display(), e.message()),
        })?;
        Ok(Self { repo })
    }

    /// Get direct access to the .git directory path.
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    // =========================================================================
    // Ref Resolution
    // =========================================================================

    /// Resolve a ref to the object it points at, without peeling.
    ///
    /// Returns `Ok(None)` if the ref doesn't exist.
    pub fn try_resolve_ref(&self, refname: &str) -> Result<Option<Oid>, GitError> {
        match self.repo.find_reference(refname) {
            Ok(reference) => {
                let resolved = reference.resolve().map_err(|e| GitError::from_git2(e, refname))?;
                let oid = resolved.target().ok_or_else(|| GitError::Internal {
                    message: format!("ref {} has no target", refname),
                })?;
                Ok(Some(typed_oid(oid)?))
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, refname)),
        }
    }

    /// Resolve a ref that must exist.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if the ref doesn't exist
    pub fn resolve_ref(&self, refname: &str) -> Result<Oid, GitError> {
        self.try_resolve_ref(refname)?
            .ok_or_else(|| GitError::RefNotFound {
                refname: refname.to_string(),
            })
    }

    /// Check if a ref exists.
    pub fn ref_exists(&self, refname: &str) -> bool {
        self.repo.find_reference(refname).is_ok()
    }

    // =========================================================================
    // Ref Updates
    // =========================================================================

    /// Move a ref with compare-and-swap semantics.
    ///
    /// The ref is locked, its current value compared against
    /// `update.expected_old`, and only then moved. Every refusal is reported
    /// as a [`RefUpdateResult`]; `Err` is reserved for failures to read the
    /// repository at all.
    pub fn update_ref(&self, update: &RefUpdate) -> Result<RefUpdateResult, GitError> {
        let refname = update.ref_name.as_str();
        let mut tx = self
            .repo
            .transaction()
            .map_err(|e| GitError::from_git2(e, refname))?;

        if let Err(e) = tx.lock_ref(refname) {
            log::warn!("cannot lock {} in {}: {}", refname, self.git_dir().display(), e);
            return Ok(match e.code() {
                git2::ErrorCode::Locked | git2::ErrorCode::Exists | git2::ErrorCode::Modified => {
                    RefUpdateResult::LockFailure
                }
                _ => RefUpdateResult::IoFailure,
            });
        }

        let current = self.try_resolve_ref(refname)?;
        let result = self.classify_update(
            current.as_ref(),
            &update.expected_old,
            &update.new_id,
            update.force,
        )?;
        if !result.is_success() {
            return Ok(result);
        }

        let sig = update.reflog_ident.as_ref().map(signature).transpose()?;
        let applied = tx
            .set_target(
                refname,
                raw_oid(&update.new_id)?,
                sig.as_ref(),
                &update.reflog_message,
            )
            .and_then(|()| tx.commit());
        match applied {
            Ok(()) => {
                self.append_reflog(
                    refname,
                    &update.new_id,
                    update.reflog_ident.as_ref(),
                    &update.reflog_message,
                )?;
                Ok(result)
            }
            Err(e) => {
                log::warn!("writing {} in {} failed: {}", refname, self.git_dir().display(), e);
                Ok(RefUpdateResult::IoFailure)
            }
        }
    }

    /// Decide the outcome of moving a ref from `current` to `new_id`.
    ///
    /// The caller must hold the ref lock for the answer to stay valid.
    pub(super) fn classify_update(
        &self,
        current: Option<&Oid>,
        expected_old: &Oid,
        new_id: &Oid,
        force: bool,
    ) -> Result<RefUpdateResult, GitError> {
        let expected = (!expected_old.is_zero()).then_some(expected_old);
        if current != expected {
            return Ok(RefUpdateResult::LockFailure);
        }
        if current == Some(new_id) {
            return Ok(RefUpdateResult::NoChange);
        }

        let new_raw = raw_oid(new_id)?;
        if self.repo.find_commit(new_raw).is_err() {
            return Ok(RefUpdateResult::RejectedMissingObject);
        }

        match current {
            None => Ok(RefUpdateResult::New),
            Some(old) => {
                let old_raw = raw_oid(old)?;
                let fast_forward = self
                    .repo
                    .graph_descendant_of(new_raw, old_raw)
                    .map_err(|e| GitError::from_git2(e, new_id.as_str()))?;
                Ok(if fast_forward {
                    RefUpdateResult::FastForward
                } else if force {
                    RefUpdateResult::Forced
                } else {
                    RefUpdateResult::Rejected
                })
            }
        }
    }

    /// Record a ref transition in the ref's reflog.
    ///
    /// Bare repositories only log ref updates when `core.logAllRefUpdates`
    /// is set, so the entry is appended here. An entry already written by
    /// the ref update itself is not repeated. Without `ident` the
    /// repository's configured identity is used, or `unknown`.
    pub(super) fn append_reflog(
        &self,
        refname: &str,
        new_id: &Oid,
        ident: Option<&PersonIdent>,
        message: &str,
    ) -> Result<(), GitError> {
        let new_raw = raw_oid(new_id)?;
        let mut reflog = self
            .repo
            .reflog(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;
        let already_logged = reflog
            .get(0)
            .is_some_and(|entry| entry.id_new() == new_raw && entry.message() == Some(message));
        if already_logged {
            return Ok(());
        }

        let sig = match ident {
            Some(ident) => signature(ident)?,
            None => self
                .repo
                .signature()
                .or_else(|_| git2::Signature::now("unknown", "unknown"))
                .map_err(|e| GitError::Internal {
                    message: e.message().to_string(),
                })?,
        };
        reflog
            .append(new_raw, &sig, Some(message))
            .and_then(|()| reflog.write())
            .map_err(|e| GitError::AccessError {
                message: format!("cannot write reflog of {}: {}", refname, e.message()),
            })
    }

    /// Reflog messages for a ref, most recent first.
    ///
    /// Returns an empty list if the ref has no reflog.
    pub fn reflog_messages(&self, refname: &str) -> Result<Vec<String>, GitError> {
        let reflog = self
            .repo
            .reflog(refname)
            .map_err(|e| GitError::from_git2(e, refname))?;
        Ok(reflog
            .iter()
            .map(|entry| entry.message().unwrap_or("").to_string())
            .collect())
    }

    // =========================================================================
    // Blob Operations
    // =========================================================================

    /// Write content as a blob and return its OID.
    pub fn write_blob(&self, content: &[u8]) -> Result<Oid, GitError> {
        let oid = self.repo.blob(content).map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        typed_oid(oid)
    }

    /// Read a blob by OID.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the blob doesn't exist
    pub fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>, GitError> {
        let blob = self
            .repo
            .find_blob(raw_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        Ok(blob.content().to_vec())
    }

    // =========================================================================
    // Tree Operations
    // =========================================================================

    fn find_tree(&self, tree: &Oid) -> Result<git2::Tree<'_>, GitError> {
        self.repo
            .find_tree(raw_oid(tree)?)
            .map_err(|e| GitError::from_git2(e, tree.as_str()))
    }

    /// Look up a single path in a tree.
    ///
    /// Returns `Ok(None)` if the path does not exist.
    pub fn find_path(&self, tree: &Oid, path: &str) -> Result<Option<TreeEntry>, GitError> {
        let tree = self.find_tree(tree)?;
        match tree.get_path(Path::new(path)) {
            Ok(entry) => Ok(Some(TreeEntry {
                path: path.to_string(),
                mode: FileMode::from_raw(entry.filemode() as u32),
                id: typed_oid(entry.id())?,
            })),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, path)),
        }
    }

    /// Read the blob stored at `path`, if any.
    ///
    /// # Errors
    ///
    /// - [`GitError::WrongObjectType`] if the path names a tree or submodule
    pub fn read_path(&self, tree: &Oid, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        match self.find_path(tree, path)? {
            None => Ok(None),
            Some(entry) if matches!(entry.mode, FileMode::Tree | FileMode::Gitlink) => {
                Err(GitError::WrongObjectType {
                    oid: entry.id.to_string(),
                    expected: "blob",
                })
            }
            Some(entry) => self.read_blob(&entry.id).map(Some),
        }
    }

    /// List the entries of a tree.
    ///
    /// With `recursive`, subtrees are descended into and only their leaf
    /// entries are reported; otherwise the top-level entries (including
    /// subtrees) are listed.
    pub fn tree_entries(&self, tree: &Oid, recursive: bool) -> Result<Vec<TreeEntry>, GitError> {
        let tree = self.find_tree(tree)?;
        let mut entries = Vec::new();

        if !recursive {
            for entry in tree.iter() {
                let Some(name) = entry.name() else { continue };
                entries.push(TreeEntry {
                    path: name.to_string(),
                    mode: FileMode::from_raw(entry.filemode() as u32),
                    id: typed_oid(entry.id())?,
                });
            }
            return Ok(entries);
        }

        let mut failure = None;
        let walked = tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Tree) {
                return git2::TreeWalkResult::Ok;
            }
            let Some(name) = entry.name() else {
                return git2::TreeWalkResult::Skip;
            };
            match typed_oid(entry.id()) {
                Ok(id) => entries.push(TreeEntry {
                    path: format!("{}{}", root, name),
                    mode: FileMode::from_raw(entry.filemode() as u32),
                    id,
                }),
                Err(e) => {
                    failure = Some(e);
                    return git2::TreeWalkResult::Abort;
                }
            }
            git2::TreeWalkResult::Ok
        });
        if let Some(e) = failure {
            return Err(e);
        }
        walked.map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        Ok(entries)
    }

    // =========================================================================
    // Commit Operations
    // =========================================================================

    /// Write a commit object without moving any ref.
    pub fn create_commit(&self, commit: &NewCommit<'_>) -> Result<Oid, GitError> {
        let tree = self.find_tree(commit.tree)?;
        let parents = commit
            .parents
            .iter()
            .map(|p| {
                self.repo
                    .find_commit(raw_oid(p)?)
                    .map_err(|e| GitError::from_git2(e, p.as_str()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        let author = signature(commit.author)?;
        let committer = signature(commit.committer)?;
        let oid = self
            .repo
            .commit(None, &author, &committer, commit.message, &tree, &parent_refs)
            .map_err(|e| GitError::Internal {
                message: format!("cannot write commit: {}", e.message()),
            })?;
        typed_oid(oid)
    }

    /// Get information about a commit.
    ///
    /// # Errors
    ///
    /// - [`GitError::ObjectNotFound`] if the commit doesn't exist
    pub fn commit_info(&self, oid: &Oid) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .find_commit(raw_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;

        let parents = commit
            .parent_ids()
            .map(typed_oid)
            .collect::<Result<Vec<_>, _>>()?;
        let message = String::from_utf8_lossy(commit.message_bytes()).into_owned();

        let info = CommitInfo {
            oid: oid.clone(),
            tree: typed_oid(commit.tree_id())?,
            parents,
            summary: message.lines().next().unwrap_or("").to_string(),
            message,
            author: person(&commit.author()),
            committer: person(&commit.committer()),
        };
        Ok(info)
    }

    /// Tree recorded by a commit.
    pub fn commit_tree(&self, oid: &Oid) -> Result<Oid, GitError> {
        let commit = self
            .repo
            .find_commit(raw_oid(oid)?)
            .map_err(|e| GitError::from_git2(e, oid.as_str()))?;
        typed_oid(commit.tree_id())
    }

    /// Commits reachable from `tip`, oldest first.
    pub fn history(&self, tip: &Oid) -> Result<Vec<Oid>, GitError> {
        let mut revwalk = self.repo.revwalk().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        revwalk
            .set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::REVERSE)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })?;
        revwalk
            .push(raw_oid(tip)?)
            .map_err(|e| GitError::from_git2(e, tip.as_str()))?;

        revwalk
            .map(|oid| {
                oid.map_err(|e| GitError::Internal {
                    message: e.message().to_string(),
                })
                .and_then(typed_oid)
            })
            .collect()
    }

    /// Check if `ancestor` is an ancestor of `descendant`.
    ///
    /// Returns true if ancestor == descendant (a commit is its own ancestor).
    pub fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        self.repo
            .graph_descendant_of(raw_oid(descendant)?, raw_oid(ancestor)?)
            .map_err(|e| GitError::Internal {
                message: e.message().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ident() -> PersonIdent {
        PersonIdent::now("Test User", "test@example.com")
    }

    fn repo() -> (TempDir, Git) {
        let dir = TempDir::new().expect("create temp dir");
        let git = Git::init_bare(dir.path()).expect("init");
        (dir, git)
    }

    fn commit_with(git: &Git, path: &str, content: &[u8], parents: &[Oid]) -> Oid {
        let mut stage = git.stage(None).unwrap();
        let blob = git.write_blob(content).unwrap();
        stage.upsert(path, &blob, FileMode::Regular).unwrap();
        let tree = git.write_stage(&mut stage).unwrap();
        let who = ident();
        git.create_commit(&NewCommit {
            tree: &tree,
            parents,
            author: &who,
            committer: &who,
            message: "test commit\n",
        })
        .unwrap()
    }

    fn update(name: &str, old: Oid, new: &Oid) -> RefUpdate {
        RefUpdate {
            ref_name: RefName::new(name).unwrap(),
            expected_old: old,
            new_id: new.clone(),
            reflog_message: "commit: test".into(),
            reflog_ident: Some(ident()),
            force: false,
        }
    }

    mod git_error {
        use super::*;

        #[test]
        fn error_display_formatting() {
            let err = GitError::CasFailed {
                refname: "refs/meta/config".to_string(),
                expected: "abc".to_string(),
                actual: "def".to_string(),
            };
            assert!(err.to_string().contains("CAS failed"));
            assert!(err.to_string().contains("refs/meta/config"));

            let err = GitError::UpdateRejected {
                refname: "refs/meta/config".to_string(),
                result: RefUpdateResult::Rejected,
            };
            assert!(err.to_string().contains("REJECTED"));
        }

        #[test]
        fn open_missing_repo() {
            let dir = TempDir::new().unwrap();
            let err = Git::open(&dir.path().join("nope")).unwrap_err();
            assert!(matches!(err, GitError::NotARepo { .. }));
        }
    }

    mod ref_update {
        use super::*;

        #[test]
        fn create_then_fast_forward() {
            let (_dir, git) = repo();
            let c1 = commit_with(&git, "a", b"1", &[]);
            let c2 = commit_with(&git, "a", b"2", &[c1.clone()]);

            let result = git.update_ref(&update("refs/meta/x", Oid::zero(), &c1)).unwrap();
            assert_eq!(result, RefUpdateResult::New);

            let result = git.update_ref(&update("refs/meta/x", c1.clone(), &c2)).unwrap();
            assert_eq!(result, RefUpdateResult::FastForward);
            assert_eq!(git.resolve_ref("refs/meta/x").unwrap(), c2);
        }

        #[test]
        fn stale_expectation_is_lock_failure() {
            let (_dir, git) = repo();
            let c1 = commit_with(&git, "a", b"1", &[]);
            let c2 = commit_with(&git, "a", b"2", &[c1.clone()]);
            git.update_ref(&update("refs/meta/x", Oid::zero(), &c1)).unwrap();

            let result = git.update_ref(&update("refs/meta/x", Oid::zero(), &c2)).unwrap();
            assert_eq!(result, RefUpdateResult::LockFailure);
            assert_eq!(git.resolve_ref("refs/meta/x").unwrap(), c1);
        }

        #[test]
        fn non_fast_forward_needs_force() {
            let (_dir, git) = repo();
            let c1 = commit_with(&git, "a", b"1", &[]);
            let other = commit_with(&git, "b", b"2", &[]);
            git.update_ref(&update("refs/meta/x", Oid::zero(), &c1)).unwrap();

            let rejected = git.update_ref(&update("refs/meta/x", c1.clone(), &other)).unwrap();
            assert_eq!(rejected, RefUpdateResult::Rejected);

            let mut forced = update("refs/meta/x", c1, &other);
            forced.force = true;
            assert_eq!(git.update_ref(&forced).unwrap(), RefUpdateResult::Forced);
        }

        #[test]
        fn updates_are_logged_once() {
            let (_dir, git) = repo();
            let c1 = commit_with(&git, "a", b"1", &[]);
            let c2 = commit_with(&git, "a", b"2", &[c1.clone()]);
            git.update_ref(&update("refs/meta/x", Oid::zero(), &c1)).unwrap();
            let mut second = update("refs/meta/x", c1, &c2);
            second.reflog_message = "commit: second".into();
            second.reflog_ident = None;
            git.update_ref(&second).unwrap();

            assert_eq!(
                git.reflog_messages("refs/meta/x").unwrap(),
                vec!["commit: second".to_string(), "commit: test".to_string()]
            );
        }

        #[test]
        fn same_value_is_no_change() {
            let (_dir, git) = repo();
            let c1 = commit_with(&git, "a", b"1", &[]);
            git.update_ref(&update("refs/meta/x", Oid::zero(), &c1)).unwrap();
            let result = git.update_ref(&update("refs/meta/x", c1.clone(), &c1)).unwrap();
            assert_eq!(result, RefUpdateResult::NoChange);
        }
    }

    mod trees {
        use super::*;

        #[test]
        fn recursive_listing_reports_leaves() {
            let (_dir, git) = repo();
            let mut stage = git.stage(None).unwrap();
            let blob = git.write_blob(b"x").unwrap();
            stage.upsert("top", &blob, FileMode::Regular).unwrap();
            stage.upsert("dir/nested", &blob, FileMode::Regular).unwrap();
            let tree = git.write_stage(&mut stage).unwrap();

            let flat: Vec<_> = git
                .tree_entries(&tree, false)
                .unwrap()
                .into_iter()
                .map(|e| (e.path, e.mode))
                .collect();
            assert_eq!(
                flat,
                vec![("dir".to_string(), FileMode::Tree), ("top".to_string(), FileMode::Regular)]
            );

            let deep: Vec<_> = git
                .tree_entries(&tree, true)
                .unwrap()
                .into_iter()
                .map(|e| e.path)
                .collect();
            assert_eq!(deep, vec!["dir/nested".to_string(), "top".to_string()]);
        }

        #[test]
        fn read_path_of_directory_fails() {
            let (_dir, git) = repo();
            let mut stage = git.stage(None).unwrap();
            let blob = git.write_blob(b"x").unwrap();
            stage.upsert("dir/nested", &blob, FileMode::Regular).unwrap();
            let tree = git.write_stage(&mut stage).unwrap();

            assert!(matches!(
                git.read_path(&tree, "dir"),
                Err(GitError::WrongObjectType { .. })
            ));
            assert_eq!(git.read_path(&tree, "dir/nested").unwrap(), Some(b"x".to_vec()));
            assert_eq!(git.read_path(&tree, "missing").unwrap(), None);
        }
    }

    #[test]
    fn commit_info_roundtrip() {
        let (_dir, git) = repo();
        let c1 = commit_with(&git, "a", b"1", &[]);
        let c2 = commit_with(&git, "a", b"2", &[c1.clone()]);

        let info = git.commit_info(&c2).unwrap();
        assert_eq!(info.parents, vec![c1.clone()]);
        assert_eq!(info.summary, "test commit");
        assert_eq!(info.author.email, "test@example.com");
        assert_eq!(git.history(&c2).unwrap(), vec![c1, c2]);
    }
}
