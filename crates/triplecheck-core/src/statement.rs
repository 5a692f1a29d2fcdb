//! Statements under test and the passages they are checked against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatementError {
    #[error("Malformed statement '{input}': expected 'subject,predicate,object'")]
    Malformed { input: String },

    #[error("Statement '{input}' has an empty {field}")]
    EmptyField { input: String, field: &'static str },
}

/// A knowledge-graph triple whose support is being checked.
///
/// Created once from user input and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl Statement {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Parse a comma separated `subject,predicate,object` triple.
    ///
    /// Only the first two commas split, so the object may contain commas
    /// (`"Nico Ditch,locatedIn,Greater Manchester, England"`).
    pub fn parse(input: &str) -> Result<Self, StatementError> {
        let mut parts = input.splitn(3, ',');
        let (Some(subject), Some(predicate), Some(object)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(StatementError::Malformed {
                input: input.to_string(),
            });
        };

        let (subject, predicate, object) = (subject.trim(), predicate.trim(), object.trim());
        for (field, value) in [("subject", subject), ("predicate", predicate), ("object", object)] {
            if value.is_empty() {
                return Err(StatementError::EmptyField {
                    input: input.to_string(),
                    field,
                });
            }
        }

        Ok(Self::new(subject, predicate, object))
    }

    /// The triple as it is embedded in prompts: `RDF: ["s" - "p" - "o"]`.
    pub fn rdf_line(&self) -> String {
        format!(
            r#"RDF: ["{}" - "{}" - "{}"]"#,
            self.subject, self.predicate, self.object
        )
    }
}

impl FromStr for Statement {
    type Err = StatementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rdf_line())
    }
}

/// One unit of body text considered as evidence.
///
/// Passages are produced by a document source and consumed read-only by the
/// judgment protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Passage(String);

impl Passage {
    /// Minimum length, in characters, for text to count as a passage.
    /// Shorter fragments are navigation or boilerplate.
    pub const MIN_CHARS: usize = 100;

    /// Wrap text without checking the length threshold.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Wrap text only if it meets [`Passage::MIN_CHARS`].
    pub fn checked(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::qualifies(&text).then_some(Self(text))
    }

    /// Whether `text` is long enough to be a passage.
    pub fn qualifies(text: &str) -> bool {
        text.chars().count() >= Self::MIN_CHARS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Passage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
