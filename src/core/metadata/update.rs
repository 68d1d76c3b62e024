//! core::metadata::update
//!
//! The transaction context of a metadata update.
//!
//! A [`MetaDataUpdate`] names the project, carries the repository handle,
//! the identities and message for the commits about to be written, and
//! optionally a caller-owned [`RefBatch`]. When a batch is present, sessions
//! queue their ref transitions into it instead of moving refs themselves;
//! executing the batch (and announcing the result) is left to its owner.

use std::ops::Deref;

use super::change_id::{ChangeIdGenerator, HashChangeId};
use crate::core::types::{AccountId, Oid, PersonIdent, ProjectName, RefName};
use crate::git::{Git, RefBatch};

/// Author, committer, message, and tree override for the next commit.
///
/// Unset identities fall back to the ones configured on the update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitBuilder {
    pub author: Option<PersonIdent>,
    pub committer: Option<PersonIdent>,
    pub message: Option<String>,
    /// Commit this tree instead of the staged one.
    pub tree: Option<Oid>,
}

impl CommitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_tree(mut self, tree: Oid) -> Self {
        self.tree = Some(tree);
        self
    }
}

/// An end user on whose behalf an update is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifiedUser {
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
}

impl IdentifiedUser {
    pub fn new(account_id: AccountId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            account_id,
            name: name.into(),
            email: email.into(),
        }
    }

    /// The user's identity stamped with the time of `when`.
    pub fn ident_at(&self, when: &PersonIdent) -> PersonIdent {
        PersonIdent::new(self.name.clone(), self.email.clone(), when.when)
    }
}

/// Published after a ref was moved by a direct (non-batched) update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdatedEvent {
    pub project: ProjectName,
    pub ref_name: RefName,
    /// Previous value; `None` when the ref was created.
    pub old_id: Option<Oid>,
    pub new_id: Oid,
    /// Account the update was attributed to, if any.
    pub updater: Option<AccountId>,
}

/// Receiver of ref update notifications.
pub trait RefUpdatedListener {
    fn on_ref_updated(&self, event: &RefUpdatedEvent);
}

impl<F: Fn(&RefUpdatedEvent)> RefUpdatedListener for F {
    fn on_ref_updated(&self, event: &RefUpdatedEvent) {
        self(event)
    }
}

/// A repository either opened for this update or lent by the caller.
#[derive(Debug)]
pub enum RepoHandle<'a> {
    /// Opened for the update and closed with it.
    Owned(Git),
    /// Lent by the caller, who keeps it open.
    Borrowed(&'a Git),
}

impl Deref for RepoHandle<'_> {
    type Target = Git;

    fn deref(&self) -> &Git {
        match self {
            Self::Owned(git) => git,
            Self::Borrowed(git) => git,
        }
    }
}

/// Context for writing metadata commits to one project.
pub struct MetaDataUpdate<'a> {
    project: ProjectName,
    repo: RepoHandle<'a>,
    batch: Option<&'a RefBatch>,
    listener: Option<&'a dyn RefUpdatedListener>,
    commit: CommitBuilder,
    allow_empty: bool,
    insert_change_id: bool,
    change_ids: Box<dyn ChangeIdGenerator>,
    author_account: Option<AccountId>,
}

impl std::fmt::Debug for MetaDataUpdate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaDataUpdate")
            .field("project", &self.project)
            .field("repo", &self.repo)
            .field("batched", &self.batch.is_some())
            .field("commit", &self.commit)
            .field("allow_empty", &self.allow_empty)
            .field("insert_change_id", &self.insert_change_id)
            .finish()
    }
}

impl<'a> MetaDataUpdate<'a> {
    pub fn new(project: ProjectName, repo: RepoHandle<'a>) -> Self {
        Self {
            project,
            repo,
            batch: None,
            listener: None,
            commit: CommitBuilder::default(),
            allow_empty: false,
            insert_change_id: false,
            change_ids: Box::new(HashChangeId),
            author_account: None,
        }
    }

    /// Queue ref transitions into `batch` instead of applying them.
    pub fn with_batch(mut self, batch: &'a RefBatch) -> Self {
        self.batch = Some(batch);
        self
    }

    /// Notify `listener` after each successful direct ref update.
    pub fn with_listener(mut self, listener: &'a dyn RefUpdatedListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Replace the default Change-Id scheme.
    pub fn with_change_id_generator(mut self, generator: Box<dyn ChangeIdGenerator>) -> Self {
        self.change_ids = generator;
        self
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn git(&self) -> &Git {
        &self.repo
    }

    pub fn batch(&self) -> Option<&'a RefBatch> {
        self.batch
    }

    /// Template for the commits written by this update.
    pub fn commit_builder(&self) -> &CommitBuilder {
        &self.commit
    }

    pub fn commit_builder_mut(&mut self) -> &mut CommitBuilder {
        &mut self.commit
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.commit.message = Some(message.into());
    }

    pub fn message(&self) -> Option<&str> {
        self.commit.message.as_deref()
    }

    /// Commit even when the written tree equals the previous one.
    pub fn set_allow_empty(&mut self, allow: bool) {
        self.allow_empty = allow;
    }

    pub fn allow_empty(&self) -> bool {
        self.allow_empty
    }

    pub fn set_insert_change_id(&mut self, insert: bool) {
        self.insert_change_id = insert;
    }

    pub fn insert_change_id(&self) -> bool {
        self.insert_change_id
    }

    pub(crate) fn change_id_generator(&self) -> &dyn ChangeIdGenerator {
        self.change_ids.as_ref()
    }

    /// Attribute the commits to `user`, keeping the committer's timestamp.
    pub fn set_author(&mut self, user: &IdentifiedUser) {
        let when = self
            .commit
            .committer
            .clone()
            .unwrap_or_else(|| PersonIdent::now(&user.name, &user.email));
        self.commit.author = Some(user.ident_at(&when));
        self.author_account = Some(user.account_id);
    }

    pub fn author_account(&self) -> Option<AccountId> {
        self.author_account
    }

    /// Announce a ref transition to the listener, if one is registered.
    pub fn fire_ref_updated(&self, ref_name: &RefName, old_id: Option<&Oid>, new_id: &Oid) {
        let Some(listener) = self.listener else {
            return;
        };
        listener.on_ref_updated(&RefUpdatedEvent {
            project: self.project.clone(),
            ref_name: ref_name.clone(),
            old_id: old_id.cloned(),
            new_id: new_id.clone(),
            updater: self.author_account,
        });
    }

    /// Release the update. An owned repository is closed; a lent one is not.
    pub fn close(self) {
        if let RepoHandle::Owned(git) = self.repo {
            log::debug!("closing {}", git.git_dir().display());
            drop(git);
        }
    }
}
