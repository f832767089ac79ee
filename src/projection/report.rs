//! Per-definition failures collected during a projection.

use serde::Serialize;

use crate::article::Article;
use crate::extract::ExtractError;
use crate::placeholder::PatternError;

/// Failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// A stored regex step no longer compiles.
    InvalidPattern,
    /// A stored CSS selector no longer parses.
    InvalidSelector,
    /// The linked page could not be fetched.
    Fetch,
    /// The linked page did not arrive in time.
    Timeout,
    /// The selector matched nothing.
    SelectorNoMatch,
}

/// A definition that produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionFailure {
    /// Id of the custom placeholder or external property.
    pub definition_id: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl DefinitionFailure {
    pub(crate) fn pattern(definition_id: &str, error: &PatternError) -> Self {
        Self {
            definition_id: definition_id.to_string(),
            kind: FailureKind::InvalidPattern,
            message: error.to_string(),
        }
    }

    pub(crate) fn extraction(definition_id: &str, error: &ExtractError) -> Self {
        let kind = match error {
            ExtractError::Fetch(_) => FailureKind::Fetch,
            ExtractError::Timeout => FailureKind::Timeout,
            ExtractError::NoMatch => FailureKind::SelectorNoMatch,
            ExtractError::InvalidSelector(_) => FailureKind::InvalidSelector,
        };
        Self {
            definition_id: definition_id.to_string(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of projecting one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Projection {
    /// Original fields plus derived `custom::` and `external::` fields.
    pub article: Article,
    /// Definitions that were skipped because they failed.
    pub failures: Vec<DefinitionFailure>,
}

impl Projection {
    /// Whether every definition produced its value.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
