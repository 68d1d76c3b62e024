//! core
//!
//! Domain types, configuration, and the metadata engine.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, RefName, ProjectName, PersonIdent
//! - [`config`] - Configuration schema and loading
//! - [`metadata`] - Versioned metadata under git refs
//! - [`tab_file`] - Tab-separated two-column files
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid names and ids from reaching git
//! - Stored content is opaque to the engine; metadata types own their format

pub mod config;
pub mod metadata;
pub mod tab_file;
pub mod types;
