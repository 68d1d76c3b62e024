//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The engine reads a single configuration file describing the server
//! identity, where repositories live, and the defaults applied to new
//! metadata updates. Every setting is optional.
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$METAREF_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/metaref/config.toml`
//! 3. `~/.metaref/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use metaref::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! let server = config.server_ident();
//! println!("committing as {}", server);
//! if let Some(base) = config.base_path() {
//!     println!("repositories under {}", base.display());
//! }
//! ```

pub mod schema;

pub use schema::{FileConfig, RepositoriesConfig, ServerIdentityConfig, UpdateDefaults};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::PersonIdent;

/// Name used for the server identity when none is configured.
pub const DEFAULT_SERVER_NAME: &str = "Metaref Server";

/// Email used for the server identity when none is configured.
pub const DEFAULT_SERVER_EMAIL: &str = "metaref@localhost";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: FileConfig,
    /// Path the file was loaded from, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    /// A missing config file is not an error (defaults are used).
    pub fn load() -> Result<Self, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Configuration from already parsed values, not backed by a file.
    pub fn from_file(file: FileConfig) -> Self {
        Self { file, path: None }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        log::debug!("loaded config from {}", path.display());
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    fn locate() -> Option<PathBuf> {
        // 1. Check $METAREF_CONFIG
        if let Ok(path) = std::env::var("METAREF_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/metaref/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("metaref/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.metaref/config.toml
        let path = dirs::home_dir()?.join(".metaref/config.toml");
        path.exists().then_some(path)
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed, writes a temp file next to the
    /// target, then renames it into place.
    pub fn write_to(path: &Path, config: &FileConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Name of the server identity.
    pub fn server_name(&self) -> &str {
        self.file
            .server
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or(DEFAULT_SERVER_NAME)
    }

    /// Email of the server identity.
    pub fn server_email(&self) -> &str {
        self.file
            .server
            .as_ref()
            .and_then(|s| s.email.as_deref())
            .unwrap_or(DEFAULT_SERVER_EMAIL)
    }

    /// The server identity, stamped with the current time.
    pub fn server_ident(&self) -> PersonIdent {
        PersonIdent::now(self.server_name(), self.server_email())
    }

    /// Directory holding project repositories, if configured.
    pub fn base_path(&self) -> Option<&Path> {
        self.file
            .repositories
            .as_ref()
            .and_then(|r| r.base_path.as_deref())
    }

    /// Whether new updates insert a Change-Id footer.
    ///
    /// Defaults to `false` if not configured.
    pub fn insert_change_id(&self) -> bool {
        self.file
            .update
            .as_ref()
            .and_then(|u| u.insert_change_id)
            .unwrap_or(false)
    }

    /// Message given to new updates, if configured.
    pub fn default_message(&self) -> Option<&str> {
        self.file
            .update
            .as_ref()
            .and_then(|u| u.default_message.as_deref())
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
