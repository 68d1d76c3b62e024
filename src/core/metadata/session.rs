//! core::metadata::session
//!
//! Update sessions.
//!
//! # Architecture
//!
//! A [`BatchMetaDataUpdate`] owns the tree being staged for one ref and the
//! chain of commits drafted on top of the loaded revision. Each
//! [`write`](BatchMetaDataUpdate::write) asks a [`VersionedMetaData`] to
//! save into the staged tree and, if the tree changed, records a commit
//! whose parent is the previous head. Nothing is visible to other readers
//! until the session is finalized:
//!
//! - [`commit`](BatchMetaDataUpdate::commit) /
//!   [`commit_at`](BatchMetaDataUpdate::commit_at) move the existing ref
//!   with compare-and-swap semantics
//! - [`create_ref`](BatchMetaDataUpdate::create_ref) creates a new ref
//!
//! When the update carries a shared [`RefBatch`](crate::git::RefBatch), the
//! transition is queued instead and no event fires.
//!
//! # Invariants
//!
//! - A write whose tree equals the current head's tree records no commit,
//!   unless empty commits are allowed or the caller chose the tree
//! - Dropping a session without finalizing leaves the ref untouched
//!
//! # Example
//!
//! ```ignore
//! let mut session = counter.open_update(&update)?;
//! session.meta_mut().value += 1;
//! session.write(update.commit_builder().clone())?;
//! session.meta_mut().value += 1;
//! session.write(update.commit_builder().clone())?;
//! let revision = session.commit()?;
//! session.close();
//! ```

use super::access::{MetaDataReader, MetaDataWriter};
use super::change_id::{insert_change_id, ChangeIdInput};
use super::error::MetaDataError;
use super::rewriter::VersionedMetaDataRewriter;
use super::update::{CommitBuilder, MetaDataUpdate};
use super::versioned::{Revision, Versioned, VersionedMetaData};
use crate::core::types::{Oid, RefName};
use crate::git::{NewCommit, RefCommand, RefUpdate, RefUpdateResult, TreeStage};

/// Reflog message used when no commit message is known.
pub const DEFAULT_REFLOG_MESSAGE: &str = "meta data update";

struct SessionState {
    stage: TreeStage,
    /// Head of the drafted chain; starts at the loaded revision.
    src: Option<Revision>,
    last_message: Option<String>,
    /// Commits drafted since the last finalization.
    drafted: usize,
    rewritten: bool,
}

/// An open update of one metadata ref.
pub struct BatchMetaDataUpdate<'s, 'u, M: VersionedMetaData> {
    owner: &'s mut Versioned<M>,
    update: &'s MetaDataUpdate<'u>,
    state: SessionState,
}

impl<'s, 'u, M: VersionedMetaData> BatchMetaDataUpdate<'s, 'u, M> {
    pub(super) fn open(
        owner: &'s mut Versioned<M>,
        update: &'s MetaDataUpdate<'u>,
    ) -> Result<Self, MetaDataError> {
        let src = owner.revision.clone();
        let stage = update.git().stage(src.as_ref().map(|r| &r.tree))?;
        log::debug!(
            "open update of {} in {} at {}",
            owner.meta.ref_name(),
            update.project(),
            src.as_ref().map(|r| r.commit.short(7)).unwrap_or("(new)")
        );
        Ok(Self {
            owner,
            update,
            state: SessionState {
                stage,
                src,
                last_message: None,
                drafted: 0,
                rewritten: false,
            },
        })
    }

    pub fn meta(&self) -> &M {
        &self.owner.meta
    }

    pub fn meta_mut(&mut self) -> &mut M {
        &mut self.owner.meta
    }

    /// Head of the session: the last drafted commit, or the loaded revision.
    pub fn head(&self) -> Option<&Revision> {
        self.state.src.as_ref()
    }

    /// Save the owner's state and draft a commit.
    ///
    /// Returns the new commit, or `None` when the save hook declined or the
    /// tree did not change.
    pub fn write(&mut self, commit: CommitBuilder) -> Result<Option<Oid>, MetaDataError> {
        write_view(&mut self.state, self.update, &mut self.owner.meta, commit)
    }

    /// Save another view of the same ref into this session.
    ///
    /// `other` saves against this session's staged tree and head, so several
    /// values sharing one ref can be combined into one ref update.
    ///
    /// # Errors
    ///
    /// - [`MetaDataError::RefMismatch`] if `other` is stored under a
    ///   different ref
    pub fn write_with(
        &mut self,
        other: &mut dyn VersionedMetaData,
        commit: CommitBuilder,
    ) -> Result<Option<Oid>, MetaDataError> {
        let expected = self.owner.meta.ref_name();
        if other.ref_name() != expected {
            return Err(MetaDataError::RefMismatch {
                expected: expected.to_string(),
                actual: other.ref_name().to_string(),
            });
        }
        write_view(&mut self.state, self.update, other, commit)
    }

    /// Replace the session's history with the rewriter's output.
    ///
    /// The owner re-reads its state from the new head through
    /// [`VersionedMetaData::on_rewrite`]. The final ref update is allowed to
    /// discard history; for batched updates this flags the shared batch.
    ///
    /// Returns the new head, or `None` if there was nothing to rewrite.
    pub fn rewrite(
        &mut self,
        rewriter: &mut dyn VersionedMetaDataRewriter,
    ) -> Result<Option<Oid>, MetaDataError> {
        let Some(current) = self.state.src.as_ref() else {
            return Ok(None);
        };
        let git = self.update.git();
        let new_tip = rewriter.rewrite_commit_history(git, &current.commit)?;
        if new_tip == current.commit {
            return Ok(None);
        }

        let head = Revision::of_commit(git, new_tip.clone())?;
        log::debug!(
            "rewrote {} history: {} -> {}",
            self.owner.meta.ref_name(),
            current.commit.short(7),
            new_tip.short(7)
        );
        self.state.stage = git.stage(Some(&head.tree))?;
        self.state.src = Some(head.clone());
        self.state.drafted += 1;
        self.state.rewritten = true;
        if let Some(batch) = self.update.batch() {
            batch.set_allow_non_fast_forwards(true);
        }

        let reader = MetaDataReader::new(
            git,
            self.update.project(),
            self.owner.meta.ref_name().clone(),
            Some(head),
        );
        self.owner.meta.on_rewrite(&reader)?;
        Ok(Some(new_tip))
    }

    /// Publish the head as a new ref `name`.
    ///
    /// Returns the owner's revision unchanged if nothing was drafted.
    pub fn create_ref(&mut self, name: &RefName) -> Result<Option<Revision>, MetaDataError> {
        if self.state.src == self.owner.revision {
            return Ok(self.owner.revision.clone());
        }
        self.update_ref(None, name.clone())
    }

    /// Publish the head to the owner's ref, expecting the loaded revision.
    pub fn commit(&mut self) -> Result<Option<Revision>, MetaDataError> {
        let expected = self.owner.revision.as_ref().map(|r| r.commit.clone());
        self.commit_at(expected.as_ref())
    }

    /// Publish the head to the owner's ref, expecting it to be at `expected`.
    ///
    /// `None` expects the ref not to exist.
    ///
    /// # Errors
    ///
    /// - [`MetaDataError::LockFailure`] if the ref is not at `expected`
    /// - [`MetaDataError::UpdateFailed`] for any other refused update
    pub fn commit_at(&mut self, expected: Option<&Oid>) -> Result<Option<Revision>, MetaDataError> {
        let head = self.state.src.as_ref().map(|r| &r.commit);
        if head == expected || head.is_none() {
            return Ok(self.owner.revision.clone());
        }
        let ref_name = self.owner.meta.ref_name().clone();
        self.update_ref(expected.cloned(), ref_name)
    }

    fn update_ref(
        &mut self,
        expected: Option<Oid>,
        ref_name: RefName,
    ) -> Result<Option<Revision>, MetaDataError> {
        let Some(head) = self.state.src.clone() else {
            return Ok(self.owner.revision.clone());
        };
        let old_id = expected.clone().unwrap_or_else(Oid::zero);

        if let Some(batch) = self.update.batch() {
            batch.add_command(RefCommand::new(ref_name, old_id, head.commit.clone()));
            self.state.drafted = 0;
            self.owner.revision = Some(head);
            return Ok(self.owner.revision.clone());
        }

        let git = self.update.git();
        let reflog_message = format!("commit: {}", self.reflog_subject());
        let request = RefUpdate {
            ref_name: ref_name.clone(),
            expected_old: old_id,
            new_id: head.commit.clone(),
            reflog_message: reflog_message.clone(),
            reflog_ident: self.update.commit_builder().author.clone(),
            force: self.state.rewritten,
        };
        let result = git.update_ref(&request)?;
        match result {
            RefUpdateResult::New | RefUpdateResult::FastForward => {}
            RefUpdateResult::Forced if self.state.rewritten => {}
            RefUpdateResult::LockFailure => {
                log::warn!("{} moved underneath update: {}", ref_name, result);
                return Err(MetaDataError::LockFailure {
                    ref_name: ref_name.to_string(),
                    repository: git.git_dir().to_path_buf(),
                    result,
                });
            }
            _ => {
                log::warn!("update of {} refused: {}", ref_name, result);
                return Err(MetaDataError::UpdateFailed {
                    ref_name: ref_name.to_string(),
                    repository: git.git_dir().to_path_buf(),
                    result,
                    reflog_message,
                });
            }
        }

        log::debug!(
            "{} {} -> {} ({})",
            ref_name,
            expected.as_ref().map(|o| o.short(7)).unwrap_or("(none)"),
            head.commit.short(7),
            result
        );
        self.update
            .fire_ref_updated(&ref_name, expected.as_ref(), &head.commit);
        self.state.drafted = 0;
        self.owner.revision = Some(head);
        Ok(self.owner.revision.clone())
    }

    fn reflog_subject(&self) -> String {
        let message = self
            .update
            .message()
            .filter(|m| !m.trim().is_empty())
            .or(self.state.last_message.as_deref())
            .unwrap_or(DEFAULT_REFLOG_MESSAGE);
        message.lines().next().unwrap_or(DEFAULT_REFLOG_MESSAGE).to_string()
    }

    /// End the session. Unpublished commits are discarded.
    pub fn close(self) {}
}

impl<M: VersionedMetaData> Drop for BatchMetaDataUpdate<'_, '_, M> {
    fn drop(&mut self) {
        if self.state.drafted > 0 {
            log::debug!(
                "discarding {} unpublished commit(s) on {}",
                self.state.drafted,
                self.owner.meta.ref_name()
            );
        }
    }
}

fn write_view(
    state: &mut SessionState,
    update: &MetaDataUpdate<'_>,
    meta: &mut dyn VersionedMetaData,
    mut commit: CommitBuilder,
) -> Result<Option<Oid>, MetaDataError> {
    let git = update.git();
    let ref_name = meta.ref_name().clone();

    let reader = MetaDataReader::new(git, update.project(), ref_name.clone(), state.src.clone());
    let mut writer = MetaDataWriter::new(reader, &mut state.stage);
    if !meta.on_save(&mut writer, &mut commit)? {
        return Ok(None);
    }
    drop(writer);

    let staged = git.write_stage(&mut state.stage)?;
    let src_tree = state.src.as_ref().map(|r| &r.tree);
    if src_tree == Some(&staged) && !update.allow_empty() && commit.tree.is_none() {
        log::debug!("no changes to {}, skipping commit", ref_name);
        return Ok(None);
    }
    let tree = commit.tree.take().unwrap_or(staged);

    let defaults = update.commit_builder();
    let author = commit
        .author
        .or_else(|| defaults.author.clone())
        .ok_or_else(|| MetaDataError::MissingIdentity {
            role: "author",
            ref_name: ref_name.to_string(),
        })?;
    let committer = commit
        .committer
        .or_else(|| defaults.committer.clone())
        .ok_or_else(|| MetaDataError::MissingIdentity {
            role: "committer",
            ref_name: ref_name.to_string(),
        })?;

    let parent = state.src.as_ref().map(|r| r.commit.clone());
    let mut message = commit.message.unwrap_or_default();
    if update.insert_change_id() {
        let change_id = update.change_id_generator().generate(&ChangeIdInput {
            tree: &tree,
            parent: parent.as_ref(),
            author: &author,
            committer: &committer,
            message: &message,
        });
        message = insert_change_id(&message, &change_id);
    }

    let parents: Vec<Oid> = parent.into_iter().collect();
    let id = git.create_commit(&NewCommit {
        tree: &tree,
        parents: &parents,
        author: &author,
        committer: &committer,
        message: &message,
    })?;
    log::debug!("drafted {} on {} (tree {})", id.short(7), ref_name, tree.short(7));

    state.src = Some(Revision {
        commit: id.clone(),
        tree,
    });
    state.last_message = Some(message);
    state.drafted += 1;
    Ok(Some(id))
}
