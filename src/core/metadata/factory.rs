//! core::metadata::factory
//!
//! Factories for [`MetaDataUpdate`]s.
//!
//! Two flavours differ only in whose name goes on the commits:
//!
//! - [`UserFactory`]: the server commits on behalf of an end user, who is
//!   recorded as author
//! - [`ServerFactory`]: the server is both author and committer
//!
//! Both apply the update defaults from [`Config`] and open repositories
//! through a [`RepositoryManager`]. The `*_with_repo` variants borrow a
//! repository the caller already holds, which is then left open when the
//! update is closed.

use super::error::MetaDataError;
use super::update::{IdentifiedUser, MetaDataUpdate, RepoHandle};
use crate::core::config::Config;
use crate::core::types::{PersonIdent, ProjectName};
use crate::git::{Git, RefBatch, RepositoryManager};

#[derive(Debug, Clone)]
struct UpdateDefaults {
    server_name: String,
    server_email: String,
    insert_change_id: bool,
    message: Option<String>,
}

impl UpdateDefaults {
    fn from_config(config: &Config) -> Self {
        Self {
            server_name: config.server_name().to_string(),
            server_email: config.server_email().to_string(),
            insert_change_id: config.insert_change_id(),
            message: config.default_message().map(str::to_string),
        }
    }

    fn server_ident(&self) -> PersonIdent {
        PersonIdent::now(&self.server_name, &self.server_email)
    }

    fn apply(&self, update: &mut MetaDataUpdate<'_>, committer: PersonIdent) {
        update.commit_builder_mut().committer = Some(committer);
        update.set_insert_change_id(self.insert_change_id);
        if let Some(message) = &self.message {
            update.set_message(message.clone());
        }
    }
}

/// Creates updates attributed to an end user.
pub struct UserFactory<'m> {
    manager: &'m dyn RepositoryManager,
    defaults: UpdateDefaults,
}

impl<'m> UserFactory<'m> {
    pub fn new(manager: &'m dyn RepositoryManager, config: &Config) -> Self {
        Self {
            manager,
            defaults: UpdateDefaults::from_config(config),
        }
    }

    /// Open the project's repository and prepare an update by `user`.
    pub fn create<'a>(
        &self,
        project: &ProjectName,
        user: &IdentifiedUser,
    ) -> Result<MetaDataUpdate<'a>, MetaDataError> {
        let git = self.manager.open_repository(project)?;
        Ok(self.build(project, RepoHandle::Owned(git), None, user))
    }

    /// Like [`create`](Self::create), queuing into `batch`.
    pub fn create_with_batch<'a>(
        &self,
        project: &ProjectName,
        user: &IdentifiedUser,
        batch: &'a RefBatch,
    ) -> Result<MetaDataUpdate<'a>, MetaDataError> {
        let git = self.manager.open_repository(project)?;
        Ok(self.build(project, RepoHandle::Owned(git), Some(batch), user))
    }

    /// Prepare an update against a repository the caller keeps open.
    pub fn create_with_repo<'a>(
        &self,
        project: &ProjectName,
        git: &'a Git,
        user: &IdentifiedUser,
        batch: Option<&'a RefBatch>,
    ) -> MetaDataUpdate<'a> {
        self.build(project, RepoHandle::Borrowed(git), batch, user)
    }

    fn build<'a>(
        &self,
        project: &ProjectName,
        repo: RepoHandle<'a>,
        batch: Option<&'a RefBatch>,
        user: &IdentifiedUser,
    ) -> MetaDataUpdate<'a> {
        let mut update = MetaDataUpdate::new(project.clone(), repo);
        if let Some(batch) = batch {
            update = update.with_batch(batch);
        }
        self.defaults.apply(&mut update, self.defaults.server_ident());
        update.set_author(user);
        update
    }
}

/// Creates updates made by the server itself.
pub struct ServerFactory<'m> {
    manager: &'m dyn RepositoryManager,
    defaults: UpdateDefaults,
}

impl<'m> ServerFactory<'m> {
    pub fn new(manager: &'m dyn RepositoryManager, config: &Config) -> Self {
        Self {
            manager,
            defaults: UpdateDefaults::from_config(config),
        }
    }

    pub fn create<'a>(&self, project: &ProjectName) -> Result<MetaDataUpdate<'a>, MetaDataError> {
        let git = self.manager.open_repository(project)?;
        Ok(self.build(project, RepoHandle::Owned(git), None))
    }

    pub fn create_with_batch<'a>(
        &self,
        project: &ProjectName,
        batch: &'a RefBatch,
    ) -> Result<MetaDataUpdate<'a>, MetaDataError> {
        let git = self.manager.open_repository(project)?;
        Ok(self.build(project, RepoHandle::Owned(git), Some(batch)))
    }

    pub fn create_with_repo<'a>(
        &self,
        project: &ProjectName,
        git: &'a Git,
        batch: Option<&'a RefBatch>,
    ) -> MetaDataUpdate<'a> {
        self.build(project, RepoHandle::Borrowed(git), batch)
    }

    fn build<'a>(
        &self,
        project: &ProjectName,
        repo: RepoHandle<'a>,
        batch: Option<&'a RefBatch>,
    ) -> MetaDataUpdate<'a> {
        let mut update = MetaDataUpdate::new(project.clone(), repo);
        if let Some(batch) = batch {
            update = update.with_batch(batch);
        }
        let server = self.defaults.server_ident();
        update.commit_builder_mut().author = Some(server.clone());
        self.defaults.apply(&mut update, server);
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{FileConfig, UpdateDefaults as UpdateSection};
    use crate::core::types::AccountId;
    use crate::git::FsRepositoryManager;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FsRepositoryManager, ProjectName) {
        let dir = TempDir::new().unwrap();
        let manager = FsRepositoryManager::new(dir.path());
        let project = ProjectName::new("plugins/replication").unwrap();
        manager.create_repository(&project).unwrap();
        (dir, manager, project)
    }

    #[test]
    fn user_update_is_server_committed() {
        let (_dir, manager, project) = setup();
        let config = Config::default();
        let factory = UserFactory::new(&manager, &config);
        let user = IdentifiedUser::new(AccountId(1000096), "Jane Roe", "jane@example.com");

        let update = factory.create(&project, &user).unwrap();
        let builder = update.commit_builder();
        let author = builder.author.as_ref().unwrap();
        let committer = builder.committer.as_ref().unwrap();
        assert_eq!(author.email, "jane@example.com");
        assert_eq!(committer.name, config.server_name());
        assert_eq!(author.when, committer.when);
        assert_eq!(update.author_account(), Some(AccountId(1000096)));
        update.close();
    }

    #[test]
    fn server_update_uses_server_for_both() {
        let (_dir, manager, project) = setup();
        let config = Config::default();
        let factory = ServerFactory::new(&manager, &config);

        let update = factory.create(&project).unwrap();
        let builder = update.commit_builder();
        assert_eq!(builder.author, builder.committer);
        assert!(update.author_account().is_none());
    }

    #[test]
    fn config_defaults_applied() {
        let (_dir, manager, project) = setup();
        let config = Config::from_file(FileConfig {
            update: Some(UpdateSection {
                insert_change_id: Some(true),
                default_message: Some("Automated update\n".into()),
            }),
            ..Default::default()
        });
        let factory = ServerFactory::new(&manager, &config);
        let update = factory.create(&project).unwrap();
        assert!(update.insert_change_id());
        assert_eq!(update.message(), Some("Automated update\n"));
    }

    #[test]
    fn missing_project_is_storage_error() {
        let (_dir, manager, _) = setup();
        let factory = ServerFactory::new(&manager, &Config::default());
        let missing = ProjectName::new("does/not/exist").unwrap();
        assert!(matches!(
            factory.create(&missing),
            Err(MetaDataError::Storage(_))
        ));
    }
}
