//! git::stage
//!
//! In-memory tree staging.
//!
//! A [`TreeStage`] holds the path to blob mapping of the tree being built by
//! a metadata update. It is seeded from an existing tree, edited by path,
//! and written back to the object store as a new tree. Nothing touches the
//! working directory or the repository index file.

use std::path::Path;

use super::interface::{raw_oid, typed_oid, FileMode, Git, GitError, TreeEntry};
use crate::core::types::Oid;

/// Mutable tree under construction.
pub struct TreeStage {
    index: git2::Index,
}

impl std::fmt::Debug for TreeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeStage").field("entries", &self.len()).finish()
    }
}

fn validate_path(path: &str) -> Result<(), GitError> {
    let fail = |message: &str| {
        Err(GitError::InvalidPath {
            path: path.to_string(),
            message: message.to_string(),
        })
    };

    if path.is_empty() {
        return fail("path cannot be empty");
    }
    if path.contains('\0') {
        return fail("path cannot contain NUL");
    }
    for component in path.split('/') {
        match component {
            "" => return fail("path cannot have empty components"),
            "." | ".." => return fail("path cannot have relative components"),
            c if c.eq_ignore_ascii_case(".git") => return fail("path cannot contain .git"),
            _ => {}
        }
    }
    Ok(())
}

impl TreeStage {
    /// Insert or replace the entry at `path`.
    ///
    /// Leading directories are created implicitly when the tree is written.
    pub fn upsert(&mut self, path: &str, id: &Oid, mode: FileMode) -> Result<(), GitError> {
        validate_path(path)?;
        let entry = git2::IndexEntry {
            ctime: git2::IndexTime::new(0, 0),
            mtime: git2::IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: mode.raw(),
            uid: 0,
            gid: 0,
            file_size: 0,
            id: raw_oid(id)?,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        };
        self.index.add(&entry).map_err(|e| GitError::Internal {
            message: format!("cannot stage {}: {}", path, e.message()),
        })
    }

    /// Remove `path`, or every entry below it if it names a directory.
    ///
    /// Removing a path that is not staged is not an error.
    pub fn remove(&mut self, path: &str) -> Result<(), GitError> {
        validate_path(path)?;
        let p = Path::new(path);
        if self.index.get_path(p, 0).is_some() {
            self.index.remove(p, 0)
        } else {
            self.index.remove_dir(p, 0)
        }
        .map_err(|e| GitError::Internal {
            message: format!("cannot unstage {}: {}", path, e.message()),
        })
    }

    /// Look up a staged path.
    pub fn get(&self, path: &str) -> Option<TreeEntry> {
        let entry = self.index.get_path(Path::new(path), 0)?;
        Some(TreeEntry {
            path: path.to_string(),
            mode: FileMode::from_raw(entry.mode),
            id: typed_oid(entry.id).ok()?,
        })
    }

    /// All staged entries in path order.
    pub fn entries(&self) -> Vec<TreeEntry> {
        self.index
            .iter()
            .filter_map(|entry| {
                Some(TreeEntry {
                    path: String::from_utf8(entry.path).ok()?,
                    mode: FileMode::from_raw(entry.mode),
                    id: typed_oid(entry.id).ok()?,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl Git {
    /// Start staging a tree, seeded with the contents of `base` if given.
    pub fn stage(&self, base: Option<&Oid>) -> Result<TreeStage, GitError> {
        let mut index = git2::Index::new().map_err(|e| GitError::Internal {
            message: e.message().to_string(),
        })?;
        if let Some(base) = base {
            let tree = self
                .repo
                .find_tree(raw_oid(base)?)
                .map_err(|e| GitError::from_git2(e, base.as_str()))?;
            index.read_tree(&tree).map_err(|e| GitError::Internal {
                message: format!("cannot read tree {}: {}", base, e.message()),
            })?;
        }
        Ok(TreeStage { index })
    }

    /// Write the staged tree into the object store and return its id.
    pub fn write_stage(&self, stage: &mut TreeStage) -> Result<Oid, GitError> {
        let oid = stage
            .index
            .write_tree_to(&self.repo)
            .map_err(|e| GitError::Internal {
                message: format!("cannot write tree: {}", e.message()),
            })?;
        typed_oid(oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, Git) {
        let dir = TempDir::new().unwrap();
        let git = Git::init_bare(dir.path()).unwrap();
        (dir, git)
    }

    #[test]
    fn empty_stage_writes_empty_tree() {
        let (_dir, git) = repo();
        let mut stage = git.stage(None).unwrap();
        assert!(stage.is_empty());
        let tree = git.write_stage(&mut stage).unwrap();
        assert_eq!(tree.as_str(), "4b825dc642cb6eb9a060e54bf8d69288fbee4904");
    }

    #[test]
    fn seeded_stage_keeps_existing_paths() {
        let (_dir, git) = repo();
        let blob = git.write_blob(b"hello").unwrap();
        let mut stage = git.stage(None).unwrap();
        stage.upsert("a.txt", &blob, FileMode::Regular).unwrap();
        stage.upsert("sub/b.txt", &blob, FileMode::Regular).unwrap();
        let tree = git.write_stage(&mut stage).unwrap();

        let mut reseeded = git.stage(Some(&tree)).unwrap();
        assert_eq!(reseeded.len(), 2);
        assert_eq!(reseeded.get("sub/b.txt").map(|e| e.id), Some(blob));
        assert_eq!(git.write_stage(&mut reseeded).unwrap(), tree);
    }

    #[test]
    fn remove_file_and_directory() {
        let (_dir, git) = repo();
        let blob = git.write_blob(b"x").unwrap();
        let mut stage = git.stage(None).unwrap();
        stage.upsert("keep", &blob, FileMode::Regular).unwrap();
        stage.upsert("dir/one", &blob, FileMode::Regular).unwrap();
        stage.upsert("dir/two", &blob, FileMode::Regular).unwrap();

        stage.remove("dir").unwrap();
        stage.remove("not-there").unwrap();
        let paths: Vec<_> = stage.entries().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["keep".to_string()]);

        stage.remove("keep").unwrap();
        assert!(stage.is_empty());
    }

    #[test]
    fn rejects_bad_paths() {
        let (_dir, git) = repo();
        let blob = git.write_blob(b"x").unwrap();
        let mut stage = git.stage(None).unwrap();
        for bad in ["", "/abs", "a//b", "a/../b", "trailing/", ".git/config"] {
            assert!(
                matches!(
                    stage.upsert(bad, &blob, FileMode::Regular),
                    Err(GitError::InvalidPath { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
