//! Save-time validation and normalization of definitions.
//!
//! A save is all-or-nothing: every problem is collected with the path of
//! the offending field and the whole batch is rejected if any exist.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::extract::PageSelector;
use crate::placeholder::{
    normalize_newlines, CompiledStep, CustomPlaceholder, ExternalProperty, RegexFlags,
};
use crate::{FeedhookError, Result};

/// Characters that would break `{{name}}` template references.
const RESERVED_NAME_CHARS: &[char] = &['{', '}', '|'];

/// One field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the field, e.g. `customPlaceholders[1].referenceName`.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

/// Collected field-level validation errors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionErrors {
    errors: Vec<FieldError>,
}

impl DefinitionErrors {
    /// Record an error for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Whether any error was recorded for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Group messages by field path.
    pub fn to_details(&self) -> BTreeMap<String, Vec<String>> {
        let mut details: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            details
                .entry(error.field.clone())
                .or_default()
                .push(error.message.clone());
        }
        details
    }

    /// `Ok(())` when empty, otherwise [`FeedhookError::Definitions`].
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(FeedhookError::Definitions(self))
        }
    }
}

impl fmt::Display for DefinitionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

fn check_name(errors: &mut DefinitionErrors, field: String, name: &str) {
    if name.trim().is_empty() {
        errors.push(field, "Must not be empty");
    } else if name.chars().any(|c| c.is_whitespace() || RESERVED_NAME_CHARS.contains(&c)) {
        errors.push(field, "Must not contain whitespace, '{', '}' or '|'");
    }
}

/// Validate a batch of custom placeholders.
pub fn validate_custom_placeholders(placeholders: &[CustomPlaceholder]) -> DefinitionErrors {
    let mut errors = DefinitionErrors::default();
    let mut first_use: HashMap<&str, usize> = HashMap::new();

    for (i, placeholder) in placeholders.iter().enumerate() {
        let path = format!("customPlaceholders[{i}]");

        check_name(
            &mut errors,
            format!("{path}.referenceName"),
            &placeholder.reference_name,
        );
        if !placeholder.reference_name.trim().is_empty() {
            if let Some(previous) = first_use.get(placeholder.reference_name.as_str()) {
                errors.push(
                    format!("{path}.referenceName"),
                    format!(
                        "Duplicate reference name '{}' (already used by customPlaceholders[{}])",
                        placeholder.reference_name, previous
                    ),
                );
            } else {
                first_use.insert(placeholder.reference_name.as_str(), i);
            }
        }

        if placeholder.source_placeholder.trim().is_empty() {
            errors.push(format!("{path}.sourcePlaceholder"), "Must not be empty");
        }

        if placeholder.steps.is_empty() {
            errors.push(format!("{path}.steps"), "At least one step is required");
        }

        for (j, step) in placeholder.steps.iter().enumerate() {
            let step_path = format!("{path}.steps[{j}]");
            if step.regex_search.is_empty() {
                errors.push(format!("{step_path}.regexSearch"), "Must not be empty");
                continue;
            }
            if let Err(e) = RegexFlags::parse(&step.regex_search_flags) {
                errors.push(format!("{step_path}.regexSearchFlags"), e.to_string());
                continue;
            }
            if let Err(e) = CompiledStep::compile(step) {
                errors.push(format!("{step_path}.regexSearch"), e.to_string());
            }
        }
    }

    errors
}

/// Validate a batch of external properties.
pub fn validate_external_properties(properties: &[ExternalProperty]) -> DefinitionErrors {
    let mut errors = DefinitionErrors::default();
    let mut first_use: HashMap<&str, usize> = HashMap::new();

    for (i, property) in properties.iter().enumerate() {
        let path = format!("externalProperties[{i}]");

        check_name(&mut errors, format!("{path}.label"), &property.label);
        if !property.label.trim().is_empty() {
            if let Some(previous) = first_use.get(property.label.as_str()) {
                errors.push(
                    format!("{path}.label"),
                    format!(
                        "Duplicate label '{}' (already used by externalProperties[{}])",
                        property.label, previous
                    ),
                );
            } else {
                first_use.insert(property.label.as_str(), i);
            }
        }

        if property.source_field.trim().is_empty() {
            errors.push(format!("{path}.sourceField"), "Must not be empty");
        }

        if property.css_selector.trim().is_empty() {
            errors.push(format!("{path}.cssSelector"), "Must not be empty");
        } else if let Err(e) = PageSelector::parse(&property.css_selector) {
            errors.push(format!("{path}.cssSelector"), e.to_string());
        }
    }

    errors
}

/// Normalize `\n` escapes in new or edited step patterns.
///
/// Steps whose id and pattern equal a stored step were normalized when
/// they were first saved and are left untouched.
pub fn normalize_placeholders(
    incoming: Vec<CustomPlaceholder>,
    stored: &[CustomPlaceholder],
) -> Vec<CustomPlaceholder> {
    let stored_patterns: HashMap<&str, &str> = stored
        .iter()
        .flat_map(|p| p.steps.iter())
        .map(|s| (s.id.as_str(), s.regex_search.as_str()))
        .collect();

    incoming
        .into_iter()
        .map(|mut placeholder| {
            for step in &mut placeholder.steps {
                let unchanged = stored_patterns
                    .get(step.id.as_str())
                    .is_some_and(|stored| *stored == step.regex_search);
                if !unchanged {
                    step.regex_search = normalize_newlines(&step.regex_search);
                }
            }
            placeholder
        })
        .collect()
}
