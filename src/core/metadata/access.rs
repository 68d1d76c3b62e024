//! core::metadata::access
//!
//! Read and write views handed to [`VersionedMetaData`] hooks.
//!
//! A [`MetaDataReader`] reads files from one revision of a metadata ref.
//! A [`MetaDataWriter`] adds mutations against the tree staged by an open
//! update session; its reads still see the session's last commit, not the
//! staged edits.
//!
//! Both views are created by the engine for the duration of a single hook
//! call and hold no state of their own afterwards.
//!
//! [`VersionedMetaData`]: super::VersionedMetaData

use std::ops::Deref;

use super::error::MetaDataError;
use super::versioned::{PathInfo, Revision};
use crate::core::types::{Oid, ProjectName, RefName};
use crate::git::{FileMode, Git, TreeStage};

/// Read access to one revision of a metadata ref.
#[derive(Debug)]
pub struct MetaDataReader<'a> {
    git: &'a Git,
    project: &'a ProjectName,
    ref_name: RefName,
    revision: Option<Revision>,
}

impl<'a> MetaDataReader<'a> {
    pub(crate) fn new(
        git: &'a Git,
        project: &'a ProjectName,
        ref_name: RefName,
        revision: Option<Revision>,
    ) -> Self {
        Self {
            git,
            project,
            ref_name,
            revision,
        }
    }

    pub fn git(&self) -> &'a Git {
        self.git
    }

    pub fn project(&self) -> &ProjectName {
        self.project
    }

    pub fn ref_name(&self) -> &RefName {
        &self.ref_name
    }

    /// The revision being read; `None` when the ref does not exist yet.
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    fn revision_label(&self) -> String {
        self.revision
            .as_ref()
            .map(|r| r.commit.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    }

    /// Raw bytes of `path`.
    ///
    /// Returns empty content when no revision is loaded or the path is
    /// absent.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, MetaDataError> {
        let Some(revision) = &self.revision else {
            return Ok(Vec::new());
        };
        log::debug!(
            "read {} from {} of {} at {}",
            path,
            self.ref_name,
            self.project,
            revision.commit.short(7)
        );
        Ok(self.git.read_path(&revision.tree, path)?.unwrap_or_default())
    }

    /// Contents of `path` as UTF-8 text.
    pub fn read_utf8(&self, path: &str) -> Result<String, MetaDataError> {
        let bytes = self.read_file(path)?;
        String::from_utf8(bytes).map_err(|_| MetaDataError::InvalidContent {
            file: path.to_string(),
            message: "not valid UTF-8".to_string(),
        })
    }

    /// Object id stored at `path`, if any.
    pub fn object_id(&self, path: &str) -> Result<Option<Oid>, MetaDataError> {
        let Some(revision) = &self.revision else {
            return Ok(None);
        };
        Ok(self.git.find_path(&revision.tree, path)?.map(|e| e.id))
    }

    /// Parse `file` as a TOML config table.
    ///
    /// A missing or empty file yields an empty table.
    ///
    /// # Errors
    ///
    /// - [`MetaDataError::ConfigInvalid`] naming the file and commit if the
    ///   content does not parse
    pub fn read_config(&self, file: &str) -> Result<toml::Table, MetaDataError> {
        let text = self.read_utf8(file)?;
        if text.trim().is_empty() {
            return Ok(toml::Table::new());
        }
        text.parse::<toml::Table>()
            .map_err(|e| MetaDataError::ConfigInvalid {
                file: file.to_string(),
                revision: self.revision_label(),
                message: e.message().to_string(),
            })
    }

    /// Parse `file` layered over `base`; values in the file win.
    pub fn read_config_with_base(
        &self,
        file: &str,
        base: &toml::Table,
    ) -> Result<toml::Table, MetaDataError> {
        let mut merged = base.clone();
        merge_into(&mut merged, self.read_config(file)?);
        Ok(merged)
    }

    /// Entries of the revision's tree.
    ///
    /// Empty when no revision is loaded.
    pub fn path_infos(&self, recursive: bool) -> Result<Vec<PathInfo>, MetaDataError> {
        let Some(revision) = &self.revision else {
            return Ok(Vec::new());
        };
        Ok(self
            .git
            .tree_entries(&revision.tree, recursive)?
            .into_iter()
            .map(PathInfo::from)
            .collect())
    }
}

fn merge_into(target: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match target.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_into(existing, incoming),
                _ => {
                    target.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}

/// Read and write access used while saving into an update session.
pub struct MetaDataWriter<'a> {
    reader: MetaDataReader<'a>,
    stage: &'a mut TreeStage,
}

impl<'a> MetaDataWriter<'a> {
    pub(crate) fn new(reader: MetaDataReader<'a>, stage: &'a mut TreeStage) -> Self {
        Self { reader, stage }
    }

    /// Store `content` at `path`.
    ///
    /// `None` or empty content removes the path instead of storing an empty
    /// blob.
    pub fn save_file(&mut self, path: &str, content: Option<&[u8]>) -> Result<(), MetaDataError> {
        let git = self.reader.git;
        match content {
            Some(bytes) if !bytes.is_empty() => {
                let blob = git.write_blob(bytes)?;
                log::debug!(
                    "save {} ({} bytes) to {} of {}",
                    path,
                    bytes.len(),
                    self.reader.ref_name,
                    self.reader.project
                );
                self.stage.upsert(path, &blob, FileMode::Regular)?;
            }
            _ => {
                log::debug!("delete {} from {}", path, self.reader.ref_name);
                self.stage.remove(path)?;
            }
        }
        Ok(())
    }

    pub fn save_utf8(&mut self, path: &str, text: &str) -> Result<(), MetaDataError> {
        self.save_file(path, Some(text.as_bytes()))
    }

    pub fn delete_file(&mut self, path: &str) -> Result<(), MetaDataError> {
        self.save_file(path, None)
    }

    /// Serialize `config` into `file`. An empty table removes the file.
    pub fn save_config(&mut self, file: &str, config: &toml::Table) -> Result<(), MetaDataError> {
        if config.is_empty() {
            return self.delete_file(file);
        }
        let text = toml::to_string(config).map_err(|e| MetaDataError::InvalidContent {
            file: file.to_string(),
            message: e.to_string(),
        })?;
        self.save_utf8(file, &text)
    }

    /// Staged entry at `path`, reflecting edits made in this session.
    pub fn staged(&self, path: &str) -> Option<PathInfo> {
        self.stage.get(path).map(PathInfo::from)
    }
}

impl<'a> Deref for MetaDataWriter<'a> {
    type Target = MetaDataReader<'a>;

    fn deref(&self) -> &MetaDataReader<'a> {
        &self.reader
    }
}
