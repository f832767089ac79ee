//! Regex steps: flag parsing, compilation and replacement.
//!
//! Flags and replacement templates follow the JavaScript conventions the
//! client uses when a user writes a step:
//!
//! | Flag | Meaning |
//! |------|---------|
//! | `g` | replace every match (otherwise only the first) |
//! | `i` | case-insensitive |
//! | `m` | `^`/`$` match at line boundaries |
//! | `s` | `.` matches newline |
//! | `u` | accepted; patterns are always Unicode-aware |
//! | `x` | ignore whitespace in the pattern |
//!
//! Replacement templates understand `$$`, `$&`, `` $` ``, `$'`, `$1`..`$99`
//! and `$<name>`.

use regex::{Captures, Regex, RegexBuilder};
use thiserror::Error;

use super::PlaceholderStep;

/// Upper bound on the compiled program size of a user pattern.
const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// A regex step that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The search pattern is empty.
    #[error("search pattern must not be empty")]
    Empty,
    /// Unknown flag character.
    #[error("unsupported regex flag '{0}'")]
    InvalidFlag(char),
    /// Flag given more than once.
    #[error("duplicate regex flag '{0}'")]
    DuplicateFlag(char),
    /// Pattern syntax error.
    #[error("invalid regex: {0}")]
    Syntax(String),
}

/// Parsed regex flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub global: bool,
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    pub ignore_whitespace: bool,
}

impl RegexFlags {
    /// Parse a flag string such as `"gi"`.
    pub fn parse(flags: &str) -> Result<Self, PatternError> {
        let mut parsed = RegexFlags::default();
        let mut seen = Vec::with_capacity(flags.len());

        for flag in flags.trim().chars() {
            if seen.contains(&flag) {
                return Err(PatternError::DuplicateFlag(flag));
            }
            seen.push(flag);

            match flag {
                'g' => parsed.global = true,
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                'x' => parsed.ignore_whitespace = true,
                'u' => {}
                other => return Err(PatternError::InvalidFlag(other)),
            }
        }

        Ok(parsed)
    }
}

/// Convert literal two-character `\n` sequences into newline characters.
///
/// Applied once, when a freshly typed pattern is saved.
pub fn normalize_newlines(pattern: &str) -> String {
    pattern.replace("\\n", "\n")
}

/// A regex step ready to apply.
#[derive(Debug, Clone)]
pub struct CompiledStep {
    regex: Regex,
    global: bool,
    replacement: String,
    has_named_groups: bool,
}

impl CompiledStep {
    /// Compile a step's pattern with its flags.
    pub fn compile(step: &PlaceholderStep) -> Result<Self, PatternError> {
        if step.regex_search.is_empty() {
            return Err(PatternError::Empty);
        }
        let flags = RegexFlags::parse(&step.regex_search_flags)?;

        let regex = RegexBuilder::new(&step.regex_search)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .ignore_whitespace(flags.ignore_whitespace)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| PatternError::Syntax(e.to_string()))?;

        let has_named_groups = regex.capture_names().flatten().next().is_some();

        Ok(Self {
            regex,
            global: flags.global,
            replacement: step.replacement_string.clone(),
            has_named_groups,
        })
    }

    /// Apply the step to `input`.
    pub fn apply(&self, input: &str) -> String {
        let limit = if self.global { 0 } else { 1 };
        self.regex
            .replacen(input, limit, |caps: &Captures| {
                let mut out = String::new();
                self.expand(caps, input, &mut out);
                out
            })
            .into_owned()
    }

    /// Expand the replacement template for one match.
    fn expand(&self, caps: &Captures, haystack: &str, out: &mut String) {
        let template = self.replacement.as_str();
        let bytes = template.as_bytes();
        let group_count = self.regex.captures_len() - 1;
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));

        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'$' || i + 1 >= bytes.len() {
                let ch_len = utf8_len(bytes[i]);
                out.push_str(&template[i..i + ch_len]);
                i += ch_len;
                continue;
            }

            match bytes[i + 1] {
                b'$' => {
                    out.push('$');
                    i += 2;
                }
                b'&' => {
                    out.push_str(&haystack[whole.0..whole.1]);
                    i += 2;
                }
                b'`' => {
                    out.push_str(&haystack[..whole.0]);
                    i += 2;
                }
                b'\'' => {
                    out.push_str(&haystack[whole.1..]);
                    i += 2;
                }
                b'0'..=b'9' => {
                    let first = (bytes[i + 1] - b'0') as usize;
                    let second = bytes
                        .get(i + 2)
                        .filter(|b| b.is_ascii_digit())
                        .map(|b| (b - b'0') as usize);

                    if let Some(second) = second {
                        let two_digit = first * 10 + second;
                        if two_digit >= 1 && two_digit <= group_count {
                            push_group(caps, two_digit, out);
                            i += 3;
                            continue;
                        }
                    }
                    if first >= 1 && first <= group_count {
                        push_group(caps, first, out);
                    } else {
                        out.push_str(&template[i..i + 2]);
                    }
                    i += 2;
                }
                b'<' if self.has_named_groups => match template[i + 2..].find('>') {
                    Some(end) => {
                        let name = &template[i + 2..i + 2 + end];
                        if let Some(m) = caps.name(name) {
                            out.push_str(m.as_str());
                        }
                        i += 2 + end + 1;
                    }
                    None => {
                        out.push_str("$<");
                        i += 2;
                    }
                },
                _ => {
                    out.push('$');
                    i += 1;
                }
            }
        }
    }
}

fn push_group(caps: &Captures, index: usize, out: &mut String) {
    if let Some(m) = caps.get(index) {
        out.push_str(m.as_str());
    }
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        _ => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(search: &str, flags: &str, replacement: &str, input: &str) -> String {
        let step = PlaceholderStep::regex(search, replacement).with_flags(flags);
        CompiledStep::compile(&step).unwrap().apply(input)
    }

    #[test]
    fn test_global_replace() {
        assert_eq!(apply("a", "g", "b", "banana"), "bbnbnb");
    }

    #[test]
    fn test_non_global_replaces_first_only() {
        assert_eq!(apply("a", "", "b", "banana"), "bbnana");
    }

    #[test]
    fn test_case_insensitive_flag() {
        assert_eq!(apply("A", "gi", "o", "Banana"), "Bonono");
        assert_eq!(apply("A", "g", "o", "Banana"), "Banana");
    }

    #[test]
    fn test_multi_line_and_dot_all() {
        assert_eq!(apply("^x", "gm", "y", "x\nx"), "y\ny");
        assert_eq!(apply("a.b", "g", "-", "a\nb"), "a\nb");
        assert_eq!(apply("a.b", "gs", "-", "a\nb"), "-");
    }

    #[test]
    fn test_numbered_backreferences() {
        assert_eq!(apply(r"(\w+) (\w+)", "", "$2 $1", "hello world"), "world hello");
        // $1 followed by a literal digit when group 10 does not exist
        assert_eq!(apply(r"(a)", "g", "$10", "a"), "a0");
        // Missing group stays literal
        assert_eq!(apply(r"(a)", "g", "$2", "a"), "$2");
    }

    #[test]
    fn test_special_replacement_patterns() {
        assert_eq!(apply("b", "", "[$&]", "abc"), "a[b]c");
        assert_eq!(apply("b", "", "$`", "abc"), "aac");
        assert_eq!(apply("b", "", "$'", "abc"), "acc");
        assert_eq!(apply("b", "", "$$", "abc"), "a$c");
        assert_eq!(apply("b", "", "cost: $", "abc"), "acost: $c");
    }

    #[test]
    fn test_named_groups() {
        assert_eq!(
            apply(r"(?P<year>\d{4})-(?P<month>\d{2})", "", "$<month>/$<year>", "2024-05"),
            "05/2024"
        );
        // Without named groups `$<` is literal
        assert_eq!(apply("x", "", "$<name>", "x"), "$<name>");
    }

    #[test]
    fn test_unicode_replacement_text() {
        assert_eq!(apply("o", "g", "ö", "foo"), "föö");
        assert_eq!(apply("x", "g", "→$&←", "x"), "→x←");
    }

    #[test]
    fn test_flag_errors() {
        assert_eq!(RegexFlags::parse("gq"), Err(PatternError::InvalidFlag('q')));
        assert_eq!(RegexFlags::parse("gg"), Err(PatternError::DuplicateFlag('g')));
        assert!(RegexFlags::parse("").is_ok());
        assert!(RegexFlags::parse("gimsux").is_ok());
    }

    #[test]
    fn test_compile_errors() {
        let empty = PlaceholderStep::regex("", "x");
        assert_eq!(CompiledStep::compile(&empty).unwrap_err(), PatternError::Empty);

        let bad = PlaceholderStep::regex("(unclosed", "x");
        assert!(matches!(
            CompiledStep::compile(&bad),
            Err(PatternError::Syntax(_))
        ));

        let bad_flags = PlaceholderStep::regex("a", "x").with_flags("y");
        assert_eq!(
            CompiledStep::compile(&bad_flags).unwrap_err(),
            PatternError::InvalidFlag('y')
        );
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines(r"a\nb"), "a\nb");
        assert_eq!(normalize_newlines("a\nb"), "a\nb");
        assert_eq!(normalize_newlines("plain"), "plain");
    }

    #[test]
    fn test_normalized_pattern_matches_newline() {
        let step = PlaceholderStep::regex(normalize_newlines(r"\n.*"), "").with_flags("g");
        let compiled = CompiledStep::compile(&step).unwrap();
        assert_eq!(compiled.apply("first line\nsecond line"), "first line");
    }
}
