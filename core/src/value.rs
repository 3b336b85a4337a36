//! `Value` definitions: named capture fields declared at the top of a template.

use std::fmt;

use regex::Regex;

use crate::error::TemplateError;
use crate::options::ValueOption;

/// A named capture field.
///
/// Built from a template line of the form `Value [Option,...] Name (regex)`.
/// The regex must be a single parenthesised group; rules refer to the Value
/// as `${Name}`, which expands to [`Value::template`].
#[derive(Debug, Clone)]
pub struct Value {
    name: String,
    regex: String,
    template: String,
    options: Vec<ValueOption>,
    compiled: Regex,
    subgroups: Vec<String>,
}

impl Value {
    /// Parses one trimmed `Value` line.
    pub(crate) fn parse(line: &str, line_num: usize, max_name_len: usize) -> Result<Self, TemplateError> {
        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        if tokens.len() < 3 {
            return Err(TemplateError::MalformedValue {
                line: line_num,
                reason: "expect at least 3 tokens on line".to_string(),
            });
        }

        let mut options = Vec::new();
        let (name, regex) = if tokens[2].starts_with('(') {
            (tokens[1], tokens[2..].join(" "))
        } else {
            for option in tokens[1].split(',') {
                let parsed: ValueOption =
                    option.parse().map_err(|_| TemplateError::UnknownOption {
                        line: line_num,
                        option: option.to_string(),
                    })?;
                if options.contains(&parsed) {
                    return Err(TemplateError::DuplicateOption {
                        line: line_num,
                        option: option.to_string(),
                    });
                }
                options.push(parsed);
            }
            (tokens[2], tokens[3..].join(" "))
        };

        if name.is_empty() || name.chars().count() > max_name_len {
            return Err(TemplateError::InvalidValueName {
                line: line_num,
                name: name.to_string(),
            });
        }

        if !is_single_group(&regex) {
            return Err(TemplateError::UnparenthesizedRegex {
                line: line_num,
                regex,
            });
        }

        let compiled = Regex::new(&regex).map_err(|err| TemplateError::InvalidRegex {
            line: line_num,
            pattern: regex.clone(),
            message: err.to_string(),
        })?;
        let subgroups = compiled
            .capture_names()
            .flatten()
            .filter(|group| *group != name)
            .map(str::to_string)
            .collect();
        let template = format!("(?<{name}>{}", &regex[1..]);

        Ok(Self {
            name: name.to_string(),
            regex,
            template,
            options,
            compiled,
            subgroups,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The regex as written in the template.
    pub fn regex(&self) -> &str {
        &self.regex
    }

    /// The named-capture fragment substituted for `${Name}` in rules.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn options(&self) -> &[ValueOption] {
        &self.options
    }

    pub fn has_option(&self, option: ValueOption) -> bool {
        self.options.contains(&option)
    }

    /// Named groups nested inside the Value's own regex.
    pub(crate) fn subgroups(&self) -> &[String] {
        &self.subgroups
    }

    pub(crate) fn matcher(&self) -> &Regex {
        &self.compiled
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.regex == other.regex && self.options == other.options
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.is_empty() {
            write!(f, "Value {} {}", self.name, self.regex)
        } else {
            let options: Vec<&str> = self.options.iter().map(|o| o.as_str()).collect();
            write!(f, "Value {} {} {}", options.join(","), self.name, self.regex)
        }
    }
}

/// Returns `true` when `regex` is one group opened by its first character and
/// closed by its last, with escapes and character classes skipped.
fn is_single_group(regex: &str) -> bool {
    if !regex.starts_with('(') || !regex.ends_with(')') {
        return false;
    }

    let last = regex.len() - 1;
    let mut depth = 0usize;
    let mut in_class = false;
    let mut chars = regex.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '[' if !in_class => {
                in_class = true;
                // A leading `]` (after an optional `^`) is a literal.
                if chars.peek().is_some_and(|&(_, c)| c == '^') {
                    chars.next();
                }
                if chars.peek().is_some_and(|&(_, c)| c == ']') {
                    chars.next();
                }
            }
            ']' if in_class => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
                if depth == 0 && index != last {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth == 0 && !in_class
}
