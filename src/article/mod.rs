//! Articles and the sources that provide them.
//!
//! An [`Article`] is a flat mapping from field name to string value plus a
//! stable id. Derived values live in reserved namespaces so they never
//! collide with native fields:
//!
//! - `custom::<referenceName>` for custom placeholders
//! - `external::<label>` for external properties

mod source;

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

pub use source::{flatten_entry, ArticleSource, FeedArticleSource, StaticArticleSource};

/// Namespace prefix for custom placeholder values.
pub const CUSTOM_PREFIX: &str = "custom::";

/// Namespace prefix for external property values.
pub const EXTERNAL_PREFIX: &str = "external::";

/// Key under which a custom placeholder's value is stored.
pub fn custom_key(reference_name: &str) -> String {
    format!("{CUSTOM_PREFIX}{reference_name}")
}

/// Key under which an external property's value is stored.
pub fn external_key(label: &str) -> String {
    format!("{EXTERNAL_PREFIX}{label}")
}

/// A feed article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// Stable article id.
    pub id: String,
    /// Field values, keyed by field name.
    pub fields: BTreeMap<String, String>,
}

impl Article {
    /// Create an article with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a field. `id` resolves to the article id.
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == "id" {
            return Some(self.id.as_str());
        }
        self.fields.get(name).map(String::as_str)
    }

    /// Set a field value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Keep only the named fields (`*` keeps everything). The id is always kept.
    pub fn select(&self, properties: &[String]) -> Article {
        if properties.is_empty() || properties.iter().any(|p| p == "*") {
            return self.clone();
        }
        let fields = self
            .fields
            .iter()
            .filter(|(key, _)| properties.iter().any(|p| p == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Article {
            id: self.id.clone(),
            fields,
        }
    }
}

impl Serialize for Article {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.fields {
            if key != "id" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Article {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut raw = BTreeMap::<String, Option<String>>::deserialize(deserializer)?;
        let id = raw
            .remove("id")
            .flatten()
            .ok_or_else(|| serde::de::Error::missing_field("id"))?;
        // Null values are treated as absent.
        let fields = raw
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .collect();
        Ok(Article { id, fields })
    }
}
