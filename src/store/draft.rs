//! Pending edits to a connection's definitions.
//!
//! Edits accumulate in a [`ConnectionDraft`] and only reach the store on an
//! explicit save. Dirty state is a plain snapshot compare against the
//! persisted baseline.

use crate::placeholder::{CustomPlaceholder, Definitions, ExternalProperty, PlaceholderStep};
use crate::{FeedhookError, Result};

/// A value under edit, paired with the last persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft<T> {
    baseline: T,
    current: T,
}

impl<T: Clone + PartialEq> Draft<T> {
    /// Start editing from a persisted value.
    pub fn new(baseline: T) -> Self {
        Self {
            current: baseline.clone(),
            baseline,
        }
    }

    pub fn baseline(&self) -> &T {
        &self.baseline
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    /// Whether the edits differ from the baseline.
    pub fn is_dirty(&self) -> bool {
        self.current != self.baseline
    }

    /// Discard edits.
    pub fn reset(&mut self) {
        self.current = self.baseline.clone();
    }

    /// Replace both snapshots with a freshly persisted value.
    pub fn mark_saved(&mut self, persisted: T) {
        self.current = persisted.clone();
        self.baseline = persisted;
    }
}

fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    let to = to.min(items.len().saturating_sub(1));
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
}

/// Draft state of one connection's definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDraft {
    pub custom_placeholders: Draft<Vec<CustomPlaceholder>>,
    pub external_properties: Draft<Vec<ExternalProperty>>,
}

impl ConnectionDraft {
    /// Start a draft from persisted definitions.
    pub fn new(persisted: Definitions) -> Self {
        Self {
            custom_placeholders: Draft::new(persisted.custom_placeholders),
            external_properties: Draft::new(persisted.external_properties),
        }
    }

    /// Whether anything differs from the persisted definitions.
    pub fn is_dirty(&self) -> bool {
        self.custom_placeholders.is_dirty() || self.external_properties.is_dirty()
    }

    /// The pending definitions, as a preview would use them.
    pub fn pending(&self) -> Definitions {
        Definitions {
            custom_placeholders: self.custom_placeholders.current().clone(),
            external_properties: self.external_properties.current().clone(),
        }
    }

    /// Discard every pending edit.
    pub fn reset(&mut self) {
        self.custom_placeholders.reset();
        self.external_properties.reset();
    }

    /// Adopt freshly persisted definitions as the new baseline.
    pub fn mark_saved(&mut self, persisted: Definitions) {
        self.custom_placeholders
            .mark_saved(persisted.custom_placeholders);
        self.external_properties
            .mark_saved(persisted.external_properties);
    }

    fn placeholder_index(&self, placeholder_id: &str) -> Result<usize> {
        self.custom_placeholders
            .current()
            .iter()
            .position(|p| p.id == placeholder_id)
            .ok_or_else(|| FeedhookError::NotFound(format!("custom placeholder {placeholder_id}")))
    }

    fn placeholder_mut(&mut self, placeholder_id: &str) -> Result<&mut CustomPlaceholder> {
        let index = self.placeholder_index(placeholder_id)?;
        Ok(&mut self.custom_placeholders.current_mut()[index])
    }

    /// Append a placeholder and return its id.
    pub fn add_placeholder(&mut self, placeholder: CustomPlaceholder) -> String {
        let id = placeholder.id.clone();
        self.custom_placeholders.current_mut().push(placeholder);
        id
    }

    pub fn remove_placeholder(&mut self, placeholder_id: &str) -> Result<CustomPlaceholder> {
        let index = self.placeholder_index(placeholder_id)?;
        Ok(self.custom_placeholders.current_mut().remove(index))
    }

    /// Move a placeholder to `to` (clamped to the list bounds).
    pub fn move_placeholder(&mut self, placeholder_id: &str, to: usize) -> Result<()> {
        let from = self.placeholder_index(placeholder_id)?;
        move_item(self.custom_placeholders.current_mut(), from, to);
        Ok(())
    }

    /// Append a step to a placeholder and return the step id.
    pub fn add_step(&mut self, placeholder_id: &str, step: PlaceholderStep) -> Result<String> {
        let id = step.id.clone();
        self.placeholder_mut(placeholder_id)?.steps.push(step);
        Ok(id)
    }

    pub fn remove_step(&mut self, placeholder_id: &str, step_id: &str) -> Result<PlaceholderStep> {
        let placeholder = self.placeholder_mut(placeholder_id)?;
        let index = placeholder
            .steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| FeedhookError::NotFound(format!("step {step_id}")))?;
        Ok(placeholder.steps.remove(index))
    }

    /// Move a step within its placeholder. Step order changes the output.
    pub fn move_step(&mut self, placeholder_id: &str, step_id: &str, to: usize) -> Result<()> {
        let placeholder = self.placeholder_mut(placeholder_id)?;
        let from = placeholder
            .steps
            .iter()
            .position(|s| s.id == step_id)
            .ok_or_else(|| FeedhookError::NotFound(format!("step {step_id}")))?;
        move_item(&mut placeholder.steps, from, to);
        Ok(())
    }

    /// Append an external property and return its id.
    pub fn add_external_property(&mut self, property: ExternalProperty) -> String {
        let id = property.id.clone();
        self.external_properties.current_mut().push(property);
        id
    }

    pub fn remove_external_property(&mut self, property_id: &str) -> Result<ExternalProperty> {
        let index = self
            .external_properties
            .current()
            .iter()
            .position(|p| p.id == property_id)
            .ok_or_else(|| FeedhookError::NotFound(format!("external property {property_id}")))?;
        Ok(self.external_properties.current_mut().remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted() -> Definitions {
        Definitions {
            custom_placeholders: vec![CustomPlaceholder::new("short", "title")
                .with_step(PlaceholderStep::regex("a", "b"))
                .with_step(PlaceholderStep::regex("b", "c"))],
            external_properties: vec![ExternalProperty::new("link", "h1", "heading")],
        }
    }

    #[test]
    fn test_draft_dirty_tracking() {
        let mut draft = Draft::new(vec![1, 2]);
        assert!(!draft.is_dirty());

        draft.current_mut().push(3);
        assert!(draft.is_dirty());

        draft.current_mut().pop();
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_draft_empty_array_transition() {
        let mut draft = Draft::new(vec!["x".to_string()]);
        draft.current_mut().clear();
        assert!(draft.is_dirty());

        draft.mark_saved(vec![]);
        assert!(!draft.is_dirty());

        draft.current_mut().push("y".to_string());
        assert!(draft.is_dirty());
        draft.reset();
        assert!(draft.current().is_empty());
    }

    #[test]
    fn test_add_and_remove_placeholder() {
        let mut draft = ConnectionDraft::new(persisted());
        let id = draft.add_placeholder(CustomPlaceholder::new("long", "description"));
        assert!(draft.is_dirty());
        assert_eq!(draft.pending().custom_placeholders.len(), 2);

        draft.remove_placeholder(&id).unwrap();
        assert!(!draft.is_dirty());
        assert!(matches!(
            draft.remove_placeholder("missing"),
            Err(FeedhookError::NotFound(_))
        ));
    }

    #[test]
    fn test_move_step_changes_order() {
        let mut draft = ConnectionDraft::new(persisted());
        let placeholder = draft.pending().custom_placeholders[0].clone();
        let second = placeholder.steps[1].id.clone();

        draft.move_step(&placeholder.id, &second, 0).unwrap();
        let steps = &draft.pending().custom_placeholders[0].steps;
        assert_eq!(steps[0].regex_search, "b");
        assert_eq!(steps[1].regex_search, "a");
        assert!(draft.is_dirty());

        // Out-of-range target clamps to the end
        draft.move_step(&placeholder.id, &second, 99).unwrap();
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_add_and_remove_step() {
        let mut draft = ConnectionDraft::new(persisted());
        let placeholder_id = draft.pending().custom_placeholders[0].id.clone();

        let step_id = draft
            .add_step(&placeholder_id, PlaceholderStep::regex("x", "y"))
            .unwrap();
        assert_eq!(draft.pending().custom_placeholders[0].steps.len(), 3);

        let removed = draft.remove_step(&placeholder_id, &step_id).unwrap();
        assert_eq!(removed.regex_search, "x");
        assert!(draft.remove_step(&placeholder_id, "nope").is_err());
        assert!(draft.add_step("nope", PlaceholderStep::regex("x", "y")).is_err());
    }

    #[test]
    fn test_move_placeholder() {
        let mut draft = ConnectionDraft::new(persisted());
        let id = draft.add_placeholder(CustomPlaceholder::new("long", "description"));
        draft.move_placeholder(&id, 0).unwrap();
        assert_eq!(draft.pending().custom_placeholders[0].reference_name, "long");
    }

    #[test]
    fn test_external_property_edits() {
        let mut draft = ConnectionDraft::new(persisted());
        let existing = draft.pending().external_properties[0].id.clone();

        draft.remove_external_property(&existing).unwrap();
        assert!(draft.is_dirty());
        assert!(draft.pending().external_properties.is_empty());

        draft.add_external_property(ExternalProperty::new("link", "img@src", "image"));
        assert_eq!(draft.pending().external_properties.len(), 1);

        draft.reset();
        assert!(!draft.is_dirty());
        assert_eq!(draft.pending(), persisted_like(&draft));
    }

    fn persisted_like(draft: &ConnectionDraft) -> Definitions {
        Definitions {
            custom_placeholders: draft.custom_placeholders.baseline().clone(),
            external_properties: draft.external_properties.baseline().clone(),
        }
    }

    #[test]
    fn test_mark_saved_clears_dirty() {
        let mut draft = ConnectionDraft::new(Definitions::default());
        draft.add_external_property(ExternalProperty::new("link", "h1", "heading"));
        assert!(draft.is_dirty());

        let saved = draft.pending();
        draft.mark_saved(saved);
        assert!(!draft.is_dirty());
    }
}
