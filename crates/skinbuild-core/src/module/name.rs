//! Dotted module names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A dotted module identifier such as `os`, `os.path` or `mymod`.
///
/// Names compare on their literal dotted form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Parse and validate a module name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidModuleName`] if the name is empty or any
    /// dot-separated segment is not an identifier.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || !name.split('.').all(is_identifier) {
            return Err(Error::InvalidModuleName(name));
        }
        Ok(Self(name))
    }

    /// Wrap a name known to be valid at compile time.
    pub(crate) fn from_static(name: &'static str) -> Self {
        debug_assert!(name.split('.').all(is_identifier));
        Self(name.to_string())
    }

    /// The literal dotted form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split off the first segment: `os.path` becomes `("os", Some("path"))`.
    pub fn split_head(&self) -> (&str, Option<&str>) {
        match self.0.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (&self.0, None),
        }
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModuleName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
