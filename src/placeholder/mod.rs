//! Custom placeholder and external property definitions.
//!
//! Field names serialize in camelCase so definitions round-trip with the
//! client unchanged.

mod regex_step;

use serde::{Deserialize, Serialize};

pub use regex_step::{normalize_newlines, CompiledStep, PatternError, RegexFlags};

/// Flags applied to a new regex step when none are given.
pub const DEFAULT_REGEX_FLAGS: &str = "gi";

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_regex_flags() -> String {
    DEFAULT_REGEX_FLAGS.to_string()
}

/// A named value derived from an article field by a chain of steps.
///
/// Referenced in message templates as `{{custom::<referenceName>}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomPlaceholder {
    /// Stable identifier.
    #[serde(default = "new_id")]
    pub id: String,
    /// Name used in templates.
    #[serde(default)]
    pub reference_name: String,
    /// Article field the steps operate on.
    #[serde(default)]
    pub source_placeholder: String,
    /// Steps, applied in order.
    #[serde(default)]
    pub steps: Vec<PlaceholderStep>,
}

impl CustomPlaceholder {
    /// Create a placeholder with no steps.
    pub fn new(reference_name: impl Into<String>, source_placeholder: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            reference_name: reference_name.into(),
            source_placeholder: source_placeholder.into(),
            steps: vec![],
        }
    }

    /// Builder-style step append.
    pub fn with_step(mut self, step: PlaceholderStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Whether the placeholder can take part in a projection.
    pub fn is_usable(&self) -> bool {
        !self.reference_name.trim().is_empty()
            && !self.source_placeholder.trim().is_empty()
            && !self.steps.is_empty()
    }
}

/// Kind of transformation a step performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Regex search and replace.
    #[default]
    #[serde(rename = "REGEX", alias = "Regex")]
    Regex,
}

/// One transformation step of a custom placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderStep {
    /// Stable identifier.
    #[serde(default = "new_id")]
    pub id: String,
    /// Step discriminator; `REGEX` when absent.
    #[serde(rename = "type", default)]
    pub kind: StepKind,
    /// Search pattern.
    #[serde(default)]
    pub regex_search: String,
    /// Pattern flags.
    #[serde(default = "default_regex_flags")]
    pub regex_search_flags: String,
    /// Replacement template; may reference capture groups.
    #[serde(default)]
    pub replacement_string: String,
}

impl PlaceholderStep {
    /// Create a regex step with the default flags.
    pub fn regex(search: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind: StepKind::Regex,
            regex_search: search.into(),
            regex_search_flags: default_regex_flags(),
            replacement_string: replacement.into(),
        }
    }

    /// Builder-style flag override.
    pub fn with_flags(mut self, flags: impl Into<String>) -> Self {
        self.regex_search_flags = flags.into();
        self
    }
}

/// A value extracted from the page an article field links to.
///
/// Stored on the article as `external::<label>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalProperty {
    /// Stable identifier.
    #[serde(default = "new_id")]
    pub id: String,
    /// Article field holding the page URL.
    #[serde(default)]
    pub source_field: String,
    /// CSS selector applied to the fetched page. A trailing `@attr`
    /// extracts that attribute instead of the element text.
    #[serde(default)]
    pub css_selector: String,
    /// Output key suffix.
    #[serde(default)]
    pub label: String,
}

impl ExternalProperty {
    /// Create an external property.
    pub fn new(
        source_field: impl Into<String>,
        css_selector: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            source_field: source_field.into(),
            css_selector: css_selector.into(),
            label: label.into(),
        }
    }

    /// Incomplete properties are left out of projections.
    pub fn is_complete(&self) -> bool {
        !self.source_field.trim().is_empty()
            && !self.css_selector.trim().is_empty()
            && !self.label.trim().is_empty()
    }
}

/// The definitions in effect for one projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Definitions {
    /// Custom placeholders.
    #[serde(default)]
    pub custom_placeholders: Vec<CustomPlaceholder>,
    /// External properties.
    #[serde(default)]
    pub external_properties: Vec<ExternalProperty>,
}

impl Definitions {
    /// Whether there is nothing to project.
    pub fn is_empty(&self) -> bool {
        self.custom_placeholders.is_empty() && self.external_properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_defaults_when_fields_absent() {
        let step: PlaceholderStep =
            serde_json::from_str(r#"{"regexSearch":"a","replacementString":"b"}"#).unwrap();
        assert_eq!(step.kind, StepKind::Regex);
        assert_eq!(step.regex_search_flags, "gi");
        assert!(!step.id.is_empty());
    }

    #[test]
    fn test_step_type_accepts_both_spellings() {
        let upper: PlaceholderStep = serde_json::from_str(r#"{"type":"REGEX"}"#).unwrap();
        let title: PlaceholderStep = serde_json::from_str(r#"{"type":"Regex"}"#).unwrap();
        assert_eq!(upper.kind, StepKind::Regex);
        assert_eq!(title.kind, StepKind::Regex);
    }

    #[test]
    fn test_placeholder_round_trips_field_names() {
        let json = serde_json::json!({
            "id": "p1",
            "referenceName": "short",
            "sourcePlaceholder": "title",
            "steps": [{
                "id": "s1",
                "type": "REGEX",
                "regexSearch": "a",
                "regexSearchFlags": "g",
                "replacementString": "b"
            }]
        });
        let placeholder: CustomPlaceholder = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(placeholder.reference_name, "short");
        assert_eq!(serde_json::to_value(&placeholder).unwrap(), json);
    }

    #[test]
    fn test_external_property_completeness() {
        assert!(ExternalProperty::new("link", "h1", "heading").is_complete());
        assert!(!ExternalProperty::new("", "h1", "heading").is_complete());
        assert!(!ExternalProperty::new("link", " ", "heading").is_complete());
        assert!(!ExternalProperty::new("link", "h1", "").is_complete());
    }

    #[test]
    fn test_placeholder_usability() {
        let base = CustomPlaceholder::new("short", "title");
        assert!(!base.is_usable());
        let with_step = base.with_step(PlaceholderStep::regex("a", "b"));
        assert!(with_step.is_usable());
        assert!(!CustomPlaceholder::new("", "title")
            .with_step(PlaceholderStep::regex("a", "b"))
            .is_usable());
    }
}
