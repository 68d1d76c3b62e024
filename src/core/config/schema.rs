//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing: identities must have a
//! non-empty name and a plausible email, and the default commit message
//! cannot be blank.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Engine configuration file.
///
/// # Example
///
/// ```toml
/// [server]
/// name = "Code Review"
/// email = "review@example.com"
///
/// [repositories]
/// base_path = "/srv/git"
///
/// [update]
/// insert_change_id = false
/// default_message = "Update metadata"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Identity the server commits as
    pub server: Option<ServerIdentityConfig>,

    /// Where project repositories live
    pub repositories: Option<RepositoriesConfig>,

    /// Defaults for new metadata updates
    pub update: Option<UpdateDefaults>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            server.validate()?;
        }
        if let Some(update) = &self.update {
            update.validate()?;
        }
        Ok(())
    }
}

/// Server identity used as committer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerIdentityConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl ServerIdentityConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() || name.contains(['<', '>', '\n']) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid server name '{}'",
                    name
                )));
            }
        }
        if let Some(email) = &self.email {
            if !email.contains('@') || email.contains(['<', '>', ' ', '\n']) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid server email '{}'",
                    email
                )));
            }
        }
        Ok(())
    }
}

/// Repository storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoriesConfig {
    /// Directory holding `<project>.git` repositories
    pub base_path: Option<PathBuf>,
}

/// Defaults applied to every new metadata update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateDefaults {
    /// Append a Change-Id footer to every commit
    pub insert_change_id: Option<bool>,

    /// Message used when a caller leaves the message unset
    pub default_message: Option<String>,
}

impl UpdateDefaults {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(msg) = &self.default_message {
            if msg.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "default_message cannot be blank".into(),
                ));
            }
        }
        Ok(())
    }
}
