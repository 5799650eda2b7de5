use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NameError {
    #[error("{kind} name cannot be empty")]
    Empty { kind: &'static str },
}

/// Display name. Names built by `new` are trimmed and non-empty; names read
/// back from storage are kept exactly as they were written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    /// Create a validated name for an entity of the given kind.
    ///
    /// # Errors
    ///
    /// Returns `NameError::Empty` if the name is empty after trimming.
    pub fn new(kind: &'static str, value: impl Into<String>) -> Result<Self, NameError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty { kind });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Accept a stored name verbatim, even one that is blank.
    ///
    /// Older documents may carry whitespace-only names.
    #[must_use]
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
