//! core::metadata::config_file
//!
//! A single TOML config file stored under a ref, plus helpers for editing
//! config tables.
//!
//! # Example
//!
//! ```ignore
//! let mut file = Versioned::new(VersionedConfigFile::new("project.config"));
//! file.load(&project, &git)?;
//! set_string(file.config_mut(), "project", None, "description", Some("Tools"));
//! file.commit(&update)?;
//! ```

use super::access::{MetaDataReader, MetaDataWriter};
use super::error::MetaDataError;
use super::update::CommitBuilder;
use super::versioned::VersionedMetaData;
use crate::core::types::RefName;

/// Message used when the caller leaves the commit message unset.
pub const DEFAULT_CONFIG_MESSAGE: &str = "Updated configuration\n";

/// One config file at a fixed path under a ref.
#[derive(Debug, Clone)]
pub struct VersionedConfigFile {
    ref_name: RefName,
    file_name: String,
    default_message: String,
    config: toml::Table,
}

impl VersionedConfigFile {
    /// `file_name` under `refs/meta/config`.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self::with_ref(RefName::meta_config(), file_name)
    }

    pub fn with_ref(ref_name: RefName, file_name: impl Into<String>) -> Self {
        Self {
            ref_name,
            file_name: file_name.into(),
            default_message: DEFAULT_CONFIG_MESSAGE.to_string(),
            config: toml::Table::new(),
        }
    }

    pub fn with_default_message(mut self, message: impl Into<String>) -> Self {
        self.default_message = message.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn config(&self) -> &toml::Table {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut toml::Table {
        &mut self.config
    }
}

impl VersionedMetaData for VersionedConfigFile {
    fn ref_name(&self) -> &RefName {
        &self.ref_name
    }

    fn on_load(&mut self, reader: &MetaDataReader<'_>) -> Result<(), MetaDataError> {
        self.config = reader.read_config(&self.file_name)?;
        Ok(())
    }

    fn on_save(
        &mut self,
        writer: &mut MetaDataWriter<'_>,
        commit: &mut CommitBuilder,
    ) -> Result<bool, MetaDataError> {
        if commit.message.as_deref().map_or(true, str::is_empty) {
            commit.message = Some(self.default_message.clone());
        }
        writer.save_config(&self.file_name, &self.config)?;
        Ok(true)
    }
}

fn section_mut<'t>(
    config: &'t mut toml::Table,
    section: &str,
    subsection: Option<&str>,
) -> Option<&'t mut toml::Table> {
    let mut table = config
        .entry(section.to_string())
        .or_insert(toml::Value::Table(toml::Table::new()))
        .as_table_mut()?;
    if let Some(sub) = subsection {
        table = table
            .entry(sub.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()))
            .as_table_mut()?;
    }
    Some(table)
}

fn unset(config: &mut toml::Table, section: &str, subsection: Option<&str>, name: &str) {
    let Some(toml::Value::Table(top)) = config.get_mut(section) else {
        return;
    };
    match subsection {
        Some(sub) => {
            if let Some(toml::Value::Table(inner)) = top.get_mut(sub) {
                inner.remove(name);
                if inner.is_empty() {
                    top.remove(sub);
                }
            }
        }
        None => {
            top.remove(name);
        }
    }
    if top.is_empty() {
        config.remove(section);
    }
}

/// Read a string value.
pub fn get_string<'t>(
    config: &'t toml::Table,
    section: &str,
    subsection: Option<&str>,
    name: &str,
) -> Option<&'t str> {
    let mut table = config.get(section)?.as_table()?;
    if let Some(sub) = subsection {
        table = table.get(sub)?.as_table()?;
    }
    table.get(name)?.as_str()
}

/// Set a string value; `None` or an empty string removes the key.
pub fn set_string(
    config: &mut toml::Table,
    section: &str,
    subsection: Option<&str>,
    name: &str,
    value: Option<&str>,
) {
    match value {
        Some(v) if !v.is_empty() => {
            if let Some(table) = section_mut(config, section, subsection) {
                table.insert(name.to_string(), toml::Value::String(v.to_string()));
            }
        }
        _ => unset(config, section, subsection, name),
    }
}

/// Set a flag; `false` removes the key.
pub fn set_bool(
    config: &mut toml::Table,
    section: &str,
    subsection: Option<&str>,
    name: &str,
    value: bool,
) {
    if value {
        if let Some(table) = section_mut(config, section, subsection) {
            table.insert(name.to_string(), toml::Value::Boolean(true));
        }
    } else {
        unset(config, section, subsection, name);
    }
}

/// Set an enumerated value by name; the default value removes the key.
pub fn set_enum<E: PartialEq + AsRef<str>>(
    config: &mut toml::Table,
    section: &str,
    subsection: Option<&str>,
    name: &str,
    value: E,
    default: E,
) {
    if value == default {
        unset(config, section, subsection, name);
    } else {
        set_string(config, section, subsection, name, Some(value.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum SubmitType {
        MergeIfNecessary,
        RebaseAlways,
    }

    impl AsRef<str> for SubmitType {
        fn as_ref(&self) -> &str {
            match self {
                Self::MergeIfNecessary => "MERGE_IF_NECESSARY",
                Self::RebaseAlways => "REBASE_ALWAYS",
            }
        }
    }

    #[test]
    fn set_and_get_string() {
        let mut config = toml::Table::new();
        set_string(&mut config, "project", None, "description", Some("Tools"));
        set_string(&mut config, "branch", Some("main"), "owner", Some("admins"));
        assert_eq!(get_string(&config, "project", None, "description"), Some("Tools"));
        assert_eq!(get_string(&config, "branch", Some("main"), "owner"), Some("admins"));
    }

    #[test]
    fn empty_string_unsets_and_prunes_sections() {
        let mut config = toml::Table::new();
        set_string(&mut config, "branch", Some("main"), "owner", Some("admins"));
        set_string(&mut config, "branch", Some("main"), "owner", Some(""));
        assert!(config.is_empty());
    }

    #[test]
    fn false_flag_unsets() {
        let mut config = toml::Table::new();
        set_bool(&mut config, "receive", None, "requireChangeId", true);
        assert_eq!(
            config["receive"]["requireChangeId"].as_bool(),
            Some(true)
        );
        set_bool(&mut config, "receive", None, "requireChangeId", false);
        assert!(config.get("receive").is_none());
    }

    #[test]
    fn default_enum_unsets() {
        let mut config = toml::Table::new();
        set_enum(
            &mut config,
            "submit",
            None,
            "action",
            SubmitType::RebaseAlways,
            SubmitType::MergeIfNecessary,
        );
        assert_eq!(
            get_string(&config, "submit", None, "action"),
            Some("REBASE_ALWAYS")
        );
        set_enum(
            &mut config,
            "submit",
            None,
            "action",
            SubmitType::MergeIfNecessary,
            SubmitType::MergeIfNecessary,
        );
        assert!(config.is_empty());
    }

    #[test]
    fn defaults_to_meta_config() {
        let file = VersionedConfigFile::new("project.config");
        assert_eq!(file.ref_name(), &RefName::meta_config());
        assert_eq!(file.default_message, DEFAULT_CONFIG_MESSAGE);
    }
}
