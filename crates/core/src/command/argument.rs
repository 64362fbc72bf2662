//! Command-line arguments as structured data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an argument within a command: a name and the prefix it is written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgumentKey {
    pub name: String,
    pub prefix: String,
}

impl ArgumentKey {
    /// Single dash prefix (`-vf`).
    pub const PREFIX: &'static str = "-";
    /// Double dash prefix (`--help`).
    pub const PREFIX_DOUBLE: &'static str = "--";

    /// Creates a key with an explicit prefix.
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
        }
    }

    /// Creates a key written with a single dash.
    pub fn short(name: impl Into<String>) -> Self {
        Self::new(name, Self::PREFIX)
    }

    /// Creates a key written with a double dash.
    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, Self::PREFIX_DOUBLE)
    }
}

impl From<&str> for ArgumentKey {
    fn from(name: &str) -> Self {
        Self::long(name)
    }
}

impl fmt::Display for ArgumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix.trim(), self.name.trim())
    }
}

/// A key with zero or more values.
///
/// Renders as the key token followed by each value, space separated. An argument
/// without values is a boolean flag and renders as the bare key token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub key: ArgumentKey,
    pub values: Vec<String>,
}

impl Argument {
    pub fn new<I, S>(key: impl Into<ArgumentKey>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// An argument without values.
    pub fn flag(key: impl Into<ArgumentKey>) -> Self {
        Self {
            key: key.into(),
            values: Vec::new(),
        }
    }

    /// The tokens of this argument, as handed to a process.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(self.values.len() + 1);
        tokens.push(self.key.to_string());
        tokens.extend(self.values.iter().map(|v| v.trim().to_string()));
        tokens
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        for value in &self.values {
            write!(f, " {}", value.trim())?;
        }
        Ok(())
    }
}
