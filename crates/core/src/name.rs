//! Validated identifiers
//!
//! - [`ProfileName`]: `[A-Za-z0-9_-]+`, used for profile directories and markers
//! - environment variable names: `[A-Za-z_][A-Za-z0-9_]*`

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static PROFILE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("profile name pattern is valid"));

static VARIABLE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// A profile name that is safe to use as a directory name and marker content
///
/// # Examples
///
/// ```
/// use kontext_core::name::ProfileName;
///
/// assert!(ProfileName::new("work-2024").is_ok());
/// assert!(ProfileName::new("../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileName(String);

impl ProfileName {
    /// Validate and wrap a profile name
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is empty or contains
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if PROFILE_NAME_RE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(Error::InvalidName { name })
        }
    }

    /// Borrow the name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProfileName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ProfileName> for String {
    fn from(value: ProfileName) -> Self {
        value.0
    }
}

impl AsRef<str> for ProfileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProfileName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProfileName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ProfileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check a shell variable name
pub fn is_valid_variable_name(name: &str) -> bool {
    VARIABLE_NAME_RE.is_match(name)
}

/// Validate a shell variable name
///
/// # Errors
///
/// Returns [`Error::InvalidVariableName`] when the name would not be a
/// legal POSIX shell identifier.
pub fn validate_variable_name(name: &str) -> Result<()> {
    if is_valid_variable_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidVariableName {
            name: name.to_string(),
        })
    }
}
