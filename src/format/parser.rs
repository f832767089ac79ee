//! Delivery template parser.
//!
//! Templates are plain text with `{{key}}` references. A reference may list
//! fallbacks as `{{a||b||c}}`. `\{{` produces a literal `{{`, and an
//! unterminated `{{` is kept as text.

/// A node in a parsed delivery template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Raw text content.
    Text(String),
    /// Reference with its fallbacks, in order.
    Reference(Vec<String>),
}

/// Delivery template parser.
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Parse the template into nodes. Never fails.
    pub fn parse(mut self) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while self.pos < self.input.len() {
            if self.peek_str("\\{{") {
                self.pos += 3;
                text.push_str("{{");
            } else if self.peek_str("{{") {
                match self.parse_reference() {
                    Some(keys) => {
                        if !text.is_empty() {
                            nodes.push(Node::Text(std::mem::take(&mut text)));
                        }
                        nodes.push(Node::Reference(keys));
                    }
                    None => {
                        self.pos += 2;
                        text.push_str("{{");
                    }
                }
            } else {
                let c = self.current_char();
                text.push(c);
                self.pos += c.len_utf8();
            }
        }

        if !text.is_empty() {
            nodes.push(Node::Text(text));
        }
        nodes
    }

    /// Parse `{{...}}` at the current position, consuming it on success.
    fn parse_reference(&mut self) -> Option<Vec<String>> {
        let body_start = self.pos + 2;
        let body_len = self.input[body_start..].find("}}")?;
        let body = &self.input[body_start..body_start + body_len];
        if body.contains("{{") {
            return None;
        }

        let keys: Vec<String> = body
            .split("||")
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(ToString::to_string)
            .collect();
        if keys.is_empty() {
            return None;
        }

        self.pos = body_start + body_len + 2;
        Some(keys)
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }
}
