//! Validated folder and file names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Maximum length of an entry name, in characters.
pub const MAX_NAME_CHARS: usize = 100;

/// A folder name or file display name.
///
/// Names become path segments on disk and in virtual paths, so they must be
/// 1–100 characters, must not contain `/`, `\` or NUL, and must not be `.`
/// or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryName(String);

impl EntryName {
    /// Validates and wraps a name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidName`] describing the first rule the
    /// name breaks.
    pub fn parse(raw: impl Into<String>) -> Result<Self, StorageError> {
        let raw = raw.into();
        let chars = raw.chars().count();
        if chars == 0 {
            return Err(StorageError::InvalidName("name must not be empty".into()));
        }
        if chars > MAX_NAME_CHARS {
            return Err(StorageError::InvalidName(format!(
                "name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        if raw.contains(['/', '\\', '\0']) {
            return Err(StorageError::InvalidName(format!(
                "name cannot contain '/', '\\' or NUL: {raw:?}"
            )));
        }
        if raw == "." || raw == ".." {
            return Err(StorageError::InvalidName(format!("reserved name: {raw}")));
        }
        Ok(Self(raw))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the extension including its leading dot (`".png"`), or an
    /// empty string when the name has none. A leading dot alone
    /// (`".bashrc"`) or a trailing dot (`"report."`) is not an extension.
    #[must_use]
    pub fn extension(&self) -> &str {
        match self.0.rfind('.') {
            Some(0) | None => "",
            Some(idx) if idx + 1 == self.0.len() => "",
            Some(idx) => self.0.get(idx..).unwrap_or(""),
        }
    }
}

impl TryFrom<String> for EntryName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntryName> for String {
    fn from(name: EntryName) -> Self {
        name.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
