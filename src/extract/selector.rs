//! CSS selection against fetched pages.

use scraper::{Html, Selector};

use super::ExtractError;

/// A parsed CSS selector with an optional attribute designator.
///
/// `img.hero@src` selects the `src` attribute of the first `img.hero`;
/// without a designator the element's text is used.
#[derive(Debug, Clone)]
pub struct PageSelector {
    selector: Selector,
    attribute: Option<String>,
}

impl PageSelector {
    /// Parse a selector string.
    pub fn parse(raw: &str) -> Result<Self, ExtractError> {
        let raw = raw.trim();
        let (css, attribute) = split_attribute(raw);
        if css.is_empty() {
            return Err(ExtractError::InvalidSelector(
                "selector must not be empty".to_string(),
            ));
        }

        let selector = Selector::parse(css)
            .map_err(|e| ExtractError::InvalidSelector(format!("{css}: {e:?}")))?;

        Ok(Self {
            selector,
            attribute: attribute.map(ToString::to_string),
        })
    }

    /// Extract the value from an HTML document.
    ///
    /// The first matching element in document order wins. Returns `None`
    /// when nothing matches or the matched value is blank.
    pub fn extract(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let element = document.select(&self.selector).next()?;

        let value = match &self.attribute {
            Some(name) => element.value().attr(name)?.trim().to_string(),
            None => {
                let text: String = element.text().collect();
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            }
        };

        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Split a trailing `@attribute` designator off a selector.
fn split_attribute(raw: &str) -> (&str, Option<&str>) {
    match raw.rsplit_once('@') {
        Some((css, attr)) if is_attribute_name(attr) => (css.trim_end(), Some(attr)),
        _ => (raw, None),
    }
}

fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
}
