//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RefName`] - Validated Git reference name
//! - [`ProjectName`] - Name of the project a repository belongs to
//! - [`AccountId`] - Numeric identity of an end user
//! - [`PersonIdent`] - Author/committer identity with a timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use metaref::core::types::{Oid, ProjectName, RefName};
//!
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::new("refs/meta/config").unwrap();
//! let project = ProjectName::new("platform/build").unwrap();
//!
//! assert!(Oid::new("not-a-sha").is_err());
//! assert!(RefName::new("refs/meta/bad..name").is_err());
//! assert!(ProjectName::new("").is_err());
//! ```

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name: {0}")]
    InvalidRefName(String),

    #[error("invalid project name: {0}")]
    InvalidProjectName(String),
}

/// Ref holding project level configuration.
pub const REFS_META_CONFIG: &str = "refs/meta/config";

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use metaref::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
///
/// let zero = Oid::zero();
/// assert!(zero.is_zero());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    const ZERO_SHA1: &'static str = "0000000000000000000000000000000000000000";

    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// The zero OID, used as the expected old value when creating a ref.
    pub fn zero() -> Self {
        Self(Self::ZERO_SHA1.to_string())
    }

    /// Check if this is the zero/null OID.
    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    /// Get an abbreviated form of the OID.
    ///
    /// Returns the first `len` characters, or the full OID if `len` is larger.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated Git reference name.
///
/// Reference names must conform to Git's refname rules (see `git check-ref-format`).
///
/// # Example
///
/// ```
/// use metaref::core::types::RefName;
///
/// let refname = RefName::meta_config();
/// assert_eq!(refname.as_str(), "refs/meta/config");
/// assert_eq!(refname.strip_prefix("refs/meta/"), Some("config"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRefName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The project configuration ref (`refs/meta/config`).
    pub fn meta_config() -> Self {
        Self(REFS_META_CONFIG.to_string())
    }

    /// Strip a prefix from the ref name and return the remainder.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.0.strip_prefix(prefix)
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let fail = |msg: &str| Err(TypeError::InvalidRefName(format!("{name:?}: {msg}")));

        if name.is_empty() {
            return fail("ref name cannot be empty");
        }
        if name.starts_with('/') || name.ends_with('/') {
            return fail("ref name cannot start or end with '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return fail(&format!("ref name cannot contain '{bad}'"));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name
            .chars()
            .find(|c| INVALID_CHARS.contains(c) || c.is_ascii_control())
        {
            return fail(&format!("ref name cannot contain {c:?}"));
        }

        // Component rules also cover a trailing ".lock" on the whole name.
        for component in name.split('/') {
            if component.starts_with('.') {
                return fail("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return fail("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a project hosted by the server.
///
/// Project names map onto repository paths, so they may contain `/` but
/// never empty, `.` or `..` components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    /// Create a new validated project name.
    ///
    /// A trailing `.git` suffix is stripped.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let mut name = name.into();
        if let Some(stripped) = name.strip_suffix(".git") {
            name = stripped.to_string();
        }
        if name.is_empty() {
            return Err(TypeError::InvalidProjectName(
                "project name cannot be empty".into(),
            ));
        }
        if name.chars().any(|c| c.is_control() || c == '\\') {
            return Err(TypeError::InvalidProjectName(format!(
                "{name:?} contains forbidden characters"
            )));
        }
        if name
            .split('/')
            .any(|c| c.is_empty() || c == "." || c == "..")
        {
            return Err(TypeError::InvalidProjectName(format!(
                "{name:?} has an empty or relative path component"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ProjectName> for String {
    fn from(name: ProjectName) -> Self {
        name.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric identity of an end user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl AccountId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity recorded as author or committer of a commit.
///
/// The timestamp keeps its UTC offset so the commit header reproduces the
/// timezone the identity was created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonIdent {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl PersonIdent {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            when,
        }
    }

    /// Identity stamped with the current time in UTC.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::new(name, email, Utc::now().fixed_offset())
    }

    /// Offset from UTC in minutes, as git records it.
    pub fn offset_minutes(&self) -> i32 {
        self.when.offset().local_minus_utc() / 60
    }
}

impl fmt::Display for PersonIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper<T> {
        value: T,
    }

    mod oid {
        use super::*;

        #[test]
        fn valid_sha1_and_sha256() {
            assert!(Oid::new("abc123def4567890abc123def4567890abc12345").is_ok());
            let sha256 = "abc123def4567890abc123def4567890abc123def4567890abc123def456789a";
            assert!(Oid::new(sha256).is_ok());
        }

        #[test]
        fn normalizes_to_lowercase() {
            let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
            assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
        }

        #[test]
        fn zero_oid() {
            let zero = Oid::zero();
            assert!(zero.is_zero());
            assert_eq!(zero.as_str().len(), 40);
        }

        #[test]
        fn short_form() {
            let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
            assert_eq!(oid.short(7), "abc123d");
            assert_eq!(oid.short(100), oid.as_str());
        }

        #[test]
        fn invalid_rejected() {
            assert!(Oid::new("").is_err());
            assert!(Oid::new("abc123").is_err());
            assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let w = Wrapper {
                value: Oid::new("abc123def4567890abc123def4567890abc12345").unwrap(),
            };
            let text = toml::to_string(&w).unwrap();
            let parsed: Wrapper<Oid> = toml::from_str(&text).unwrap();
            assert_eq!(w, parsed);
        }
    }

    mod ref_name {
        use super::*;

        #[test]
        fn valid_refs() {
            assert!(RefName::new("refs/meta/config").is_ok());
            assert!(RefName::new("refs/users/01/1000001").is_ok());
            assert!(RefName::new("refs/groups/ab/abcdef").is_ok());
        }

        #[test]
        fn meta_config_constant() {
            assert_eq!(RefName::meta_config().as_str(), REFS_META_CONFIG);
        }

        #[test]
        fn invalid_refs_rejected() {
            for bad in [
                "",
                "/refs/meta/config",
                "refs/meta/",
                "refs/meta/config.lock",
                "refs/meta/bad..name",
                "refs//meta",
                "refs/meta/has space",
                "refs/meta/.hidden",
                "refs/meta/x@{1}",
            ] {
                assert!(RefName::new(bad).is_err(), "{bad:?} should be rejected");
            }
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<Wrapper<RefName>, _> = toml::from_str("value = \"refs//x\"");
            assert!(parsed.is_err());
        }
    }

    mod project_name {
        use super::*;

        #[test]
        fn strips_git_suffix() {
            let name = ProjectName::new("platform/build.git").unwrap();
            assert_eq!(name.as_str(), "platform/build");
        }

        #[test]
        fn rejects_relative_components() {
            assert!(ProjectName::new("../escape").is_err());
            assert!(ProjectName::new("a//b").is_err());
            assert!(ProjectName::new("/abs").is_err());
            assert!(ProjectName::new(".git").is_err());
        }
    }

    mod person_ident {
        use super::*;
        use chrono::TimeZone;

        #[test]
        fn offset_in_minutes() {
            let tz = FixedOffset::west_opt(8 * 3600).unwrap();
            let when = tz.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
            let ident = PersonIdent::new("J. Author", "author@example.com", when);
            assert_eq!(ident.offset_minutes(), -480);
            assert_eq!(ident.to_string(), "J. Author <author@example.com>");
        }
    }
}
