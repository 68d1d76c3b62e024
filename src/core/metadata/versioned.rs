//! core::metadata::versioned
//!
//! The metadata capability trait and the owner that tracks its revision.
//!
//! # Architecture
//!
//! A type that wants its state stored under a ref implements
//! [`VersionedMetaData`]: it names the ref, parses state out of a
//! [`MetaDataReader`], and serializes state into a [`MetaDataWriter`]. The
//! engine never inspects the content itself.
//!
//! [`Versioned`] wraps such a value together with the revision it was
//! loaded from. That revision is the expected old value for the next
//! compare-and-swap ref update, so a concurrent writer that moved the ref
//! in between is detected rather than overwritten.
//!
//! # Example
//!
//! ```ignore
//! let mut config = Versioned::new(VersionedConfigFile::new("project.config"));
//! config.load(&project, &git)?;
//! config.config_mut().insert("description".into(), "Build tools".into());
//!
//! let mut update = factory.create(&project)?;
//! update.set_message("Set description\n");
//! config.commit(&update)?;
//! ```

use std::ops::{Deref, DerefMut};

use super::access::{MetaDataReader, MetaDataWriter};
use super::error::MetaDataError;
use super::session::BatchMetaDataUpdate;
use super::update::{CommitBuilder, MetaDataUpdate};
use crate::core::types::{Oid, ProjectName, RefName};
use crate::git::{FileMode, Git, TreeEntry};

/// State that persists itself as files under a ref.
pub trait VersionedMetaData {
    /// The ref holding this state.
    fn ref_name(&self) -> &RefName;

    /// Replace in-memory state with the content visible through `reader`.
    ///
    /// Called with a reader that has no revision when the ref does not
    /// exist.
    fn on_load(&mut self, reader: &MetaDataReader<'_>) -> Result<(), MetaDataError>;

    /// Write in-memory state into the session's staged tree.
    ///
    /// Returning `false` skips the commit.
    fn on_save(
        &mut self,
        writer: &mut MetaDataWriter<'_>,
        commit: &mut CommitBuilder,
    ) -> Result<bool, MetaDataError>;

    /// Re-read state after the session's history was rewritten.
    fn on_rewrite(&mut self, reader: &MetaDataReader<'_>) -> Result<(), MetaDataError> {
        self.on_load(reader)
    }
}

/// A commit and the tree it records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub commit: Oid,
    pub tree: Oid,
}

impl Revision {
    /// Look up the tree of `commit`.
    pub fn of_commit(git: &Git, commit: Oid) -> Result<Self, MetaDataError> {
        let tree = git.commit_tree(&commit)?;
        Ok(Self { commit, tree })
    }
}

/// An entry of a stored tree, detached from the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub mode: FileMode,
    pub path: String,
    pub id: Oid,
}

impl From<TreeEntry> for PathInfo {
    fn from(entry: TreeEntry) -> Self {
        Self {
            mode: entry.mode,
            path: entry.path,
            id: entry.id,
        }
    }
}

/// A [`VersionedMetaData`] value plus the revision it was loaded from.
#[derive(Debug, Clone)]
pub struct Versioned<M> {
    pub(super) meta: M,
    pub(super) revision: Option<Revision>,
}

impl<M: VersionedMetaData> Versioned<M> {
    /// Wrap `meta` without loading anything.
    pub fn new(meta: M) -> Self {
        Self {
            meta,
            revision: None,
        }
    }

    pub fn meta(&self) -> &M {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut M {
        &mut self.meta
    }

    pub fn into_inner(self) -> M {
        self.meta
    }

    /// Revision last loaded or published; `None` if the ref does not exist.
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    /// Load the current tip of the ref.
    pub fn load(&mut self, project: &ProjectName, git: &Git) -> Result<(), MetaDataError> {
        let tip = git.try_resolve_ref(self.meta.ref_name().as_str())?;
        self.load_at(project, git, tip.as_ref())
    }

    /// Load an explicit commit, or nothing when `id` is `None`.
    pub fn load_at(
        &mut self,
        project: &ProjectName,
        git: &Git,
        id: Option<&Oid>,
    ) -> Result<(), MetaDataError> {
        self.revision = id
            .map(|commit| Revision::of_commit(git, commit.clone()))
            .transpose()?;

        let reader = MetaDataReader::new(
            git,
            project,
            self.meta.ref_name().clone(),
            self.revision.clone(),
        );
        self.meta.on_load(&reader)
    }

    /// Load the current tip using the project and repository of `update`.
    pub fn load_from(&mut self, update: &MetaDataUpdate<'_>) -> Result<(), MetaDataError> {
        self.load(update.project(), update.git())
    }

    pub fn load_from_at(
        &mut self,
        update: &MetaDataUpdate<'_>,
        id: Option<&Oid>,
    ) -> Result<(), MetaDataError> {
        self.load_at(update.project(), update.git(), id)
    }

    /// Start an update session seeded with the loaded tree.
    pub fn open_update<'s, 'u>(
        &'s mut self,
        update: &'s MetaDataUpdate<'u>,
    ) -> Result<BatchMetaDataUpdate<'s, 'u, M>, MetaDataError> {
        BatchMetaDataUpdate::open(self, update)
    }

    /// Write once and publish to the existing ref.
    ///
    /// Returns the revision now stored, which is unchanged when the write
    /// produced no new commit.
    pub fn commit(&mut self, update: &MetaDataUpdate<'_>) -> Result<Option<Revision>, MetaDataError> {
        let mut session = self.open_update(update)?;
        session.write(update.commit_builder().clone())?;
        let result = session.commit();
        session.close();
        result
    }

    /// Write once and publish as a new ref `name`.
    pub fn commit_to_new_ref(
        &mut self,
        update: &MetaDataUpdate<'_>,
        name: &RefName,
    ) -> Result<Option<Revision>, MetaDataError> {
        let mut session = self.open_update(update)?;
        session.write(update.commit_builder().clone())?;
        let result = session.create_ref(name);
        session.close();
        result
    }
}

impl<M> Deref for Versioned<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.meta
    }
}

impl<M> DerefMut for Versioned<M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.meta
    }
}
