//! git::manager
//!
//! Mapping from project names to repositories.

use std::path::{Path, PathBuf};

use super::interface::{Git, GitError};
use crate::core::config::Config;
use crate::core::types::ProjectName;

/// Source of repositories by project name.
///
/// Metadata updates open their repository through this trait so hosts can
/// decide where repositories live.
pub trait RepositoryManager {
    /// Open the repository of an existing project.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if the project has no repository
    fn open_repository(&self, project: &ProjectName) -> Result<Git, GitError>;

    /// Create an empty bare repository for a new project.
    fn create_repository(&self, project: &ProjectName) -> Result<Git, GitError>;
}

/// Bare repositories stored as `<base>/<project>.git`.
#[derive(Debug, Clone)]
pub struct FsRepositoryManager {
    base_path: PathBuf,
}

impl FsRepositoryManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Manager rooted at the configured `repositories.base_path`, if any.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.base_path().map(Self::new)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Location of a project's repository.
    pub fn path_for(&self, project: &ProjectName) -> PathBuf {
        self.base_path.join(format!("{}.git", project.as_str()))
    }
}

impl RepositoryManager for FsRepositoryManager {
    fn open_repository(&self, project: &ProjectName) -> Result<Git, GitError> {
        Git::open(&self.path_for(project))
    }

    fn create_repository(&self, project: &ProjectName) -> Result<Git, GitError> {
        let path = self.path_for(project);
        if path.exists() {
            return Err(GitError::AccessError {
                message: format!("repository for {} already exists", project),
            });
        }
        log::debug!("creating repository {}", path.display());
        Git::init_bare(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn nested_project_path() {
        let manager = FsRepositoryManager::new("/srv/git");
        let project = ProjectName::new("platform/build").unwrap();
        assert_eq!(
            manager.path_for(&project),
            PathBuf::from("/srv/git/platform/build.git")
        );
    }

    #[test]
    fn base_path_from_config() {
        assert!(FsRepositoryManager::from_config(&Config::default()).is_none());

        let config = Config::from_file(crate::core::config::FileConfig {
            repositories: Some(crate::core::config::RepositoriesConfig {
                base_path: Some(PathBuf::from("/srv/git")),
            }),
            ..Default::default()
        });
        let manager = FsRepositoryManager::from_config(&config).unwrap();
        assert_eq!(manager.base_path(), Path::new("/srv/git"));
    }

    #[test]
    fn create_then_open() {
        let dir = TempDir::new().unwrap();
        let manager = FsRepositoryManager::new(dir.path());
        let project = ProjectName::new("team/tools").unwrap();

        assert!(matches!(
            manager.open_repository(&project),
            Err(GitError::NotARepo { .. })
        ));
        manager.create_repository(&project).unwrap();
        let git = manager.open_repository(&project).unwrap();
        assert!(git.git_dir().ends_with("team/tools.git"));
        assert!(manager.create_repository(&project).is_err());
    }
}
