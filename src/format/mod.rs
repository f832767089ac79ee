//! Delivery message formatting.
//!
//! Fills a message template with the values of a projected article.
//! References may name native fields, `custom::<referenceName>` values or
//! `external::<label>` values:
//!
//! ```
//! use feedhook::article::Article;
//! use feedhook::format::render;
//!
//! let article = Article::new("1").with_field("custom::short", "Breaking");
//! assert_eq!(render("**{{custom::short||title}}**", &article), "**Breaking**");
//! ```

mod parser;

use serde::{Deserialize, Serialize};

use crate::article::Article;

pub use parser::{Node, Parser};

/// Render a template string against an article.
///
/// Each reference takes the first non-empty value among its fallbacks;
/// references with no value render as an empty string.
pub fn render(template: &str, article: &Article) -> String {
    let mut output = String::with_capacity(template.len());
    for node in Parser::new(template).parse() {
        match node {
            Node::Text(text) => output.push_str(&text),
            Node::Reference(keys) => {
                if let Some(value) = keys
                    .iter()
                    .filter_map(|key| article.get(key))
                    .find(|value| !value.is_empty())
                {
                    output.push_str(value);
                }
            }
        }
    }
    output
}

fn render_optional(template: &Option<String>, article: &Article) -> Option<String> {
    template
        .as_deref()
        .map(|t| render(t, article))
        .filter(|s| !s.trim().is_empty())
}

/// Template of one embed field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedFieldTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Template of one embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedTemplate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<EmbedFieldTemplate>,
}

/// Template of a delivered message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub embeds: Vec<EmbedTemplate>,
}

/// A rendered embed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rendered embed. Parts that render empty are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

impl Embed {
    fn is_empty(&self) -> bool {
        self == &Embed::default()
    }
}

/// A rendered message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
}

impl MessageTemplate {
    /// Render the template against a projected article.
    ///
    /// Fields whose name or value renders empty and embeds with nothing
    /// left in them are dropped.
    pub fn render(&self, article: &Article) -> DeliveryMessage {
        let embeds = self
            .embeds
            .iter()
            .map(|embed| Embed {
                title: render_optional(&embed.title, article),
                description: render_optional(&embed.description, article),
                url: render_optional(&embed.url, article).map(|url| url.trim().to_string()),
                footer_text: render_optional(&embed.footer_text, article),
                author_name: render_optional(&embed.author_name, article),
                fields: embed
                    .fields
                    .iter()
                    .filter_map(|field| {
                        let name = render(&field.name, article);
                        let value = render(&field.value, article);
                        (!name.trim().is_empty() && !value.trim().is_empty()).then_some(
                            EmbedField {
                                name,
                                value,
                                inline: field.inline,
                            },
                        )
                    })
                    .collect(),
            })
            .filter(|embed| !embed.is_empty())
            .collect();

        DeliveryMessage {
            content: render_optional(&self.content, article),
            embeds,
        }
    }
}
