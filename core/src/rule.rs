//! Rules: pattern/action lines inside a state.
//!
//! A rule line has the shape
//!
//! ```text
//!   ^pattern -> LineOp.RecordOp NewState
//! ```
//!
//! where every part of the action is optional.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

// SAFETY: These regexes are compile-time constants and are validated by tests.
static MATCH_ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<match>.*?)\s->(?<action>.*)$").expect("static regex must compile")
});
static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s+(?<ln_op>Continue|Next|Error)(?:\.(?<rec_op>Clearall|Clear|Record|NoRecord))?(?:\s+(?<new_state>\w+|".*"))?$"#,
    )
    .expect("static regex must compile")
});
static RECORD_ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s+(?<rec_op>Clearall|Clear|Record|NoRecord)(?:\s+(?<new_state>\w+|".*"))?$"#)
        .expect("static regex must compile")
});
static STATE_ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:\s+(?<new_state>\w+|".*"))?\s*$"#).expect("static regex must compile")
});
static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("static regex must compile"));

/// What to do with the input line after a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LineOp {
    /// Keep testing the remaining rules of the state against the same line.
    Continue,
    /// Move on to the next input line.
    #[default]
    Next,
    /// Abort the parse.
    Error,
}

impl LineOp {
    pub const ALL: [LineOp; 3] = [LineOp::Continue, LineOp::Next, LineOp::Error];

    pub fn as_str(self) -> &'static str {
        match self {
            LineOp::Continue => "Continue",
            LineOp::Next => "Next",
            LineOp::Error => "Error",
        }
    }
}

impl FromStr for LineOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LineOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown line operator '{s}'"))
    }
}

/// What to do with the in-progress record after a rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordOp {
    /// Clear non-sticky content.
    Clear,
    /// Clear all content, including `Filldown` values.
    Clearall,
    /// Append the record to the result, then clear it.
    Record,
    /// Leave the record untouched.
    #[default]
    NoRecord,
}

impl RecordOp {
    pub const ALL: [RecordOp; 4] = [
        RecordOp::Clear,
        RecordOp::Clearall,
        RecordOp::Record,
        RecordOp::NoRecord,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordOp::Clear => "Clear",
            RecordOp::Clearall => "Clearall",
            RecordOp::Record => "Record",
            RecordOp::NoRecord => "NoRecord",
        }
    }
}

impl FromStr for RecordOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown record operator '{s}'"))
    }
}

/// Returns `true` for words that cannot be used as state names.
pub(crate) fn is_reserved_word(word: &str) -> bool {
    word.parse::<LineOp>().is_ok() || word.parse::<RecordOp>().is_ok()
}

/// Returns `true` for non-empty strings of alphanumerics and underscores.
pub(crate) fn is_identifier(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Names referenced as `${name}` in `text`, in order of appearance.
pub(crate) fn variable_references(text: &str) -> impl Iterator<Item = &str> {
    VARIABLE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

/// One compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    match_text: String,
    regex_source: String,
    regex: Regex,
    line_op: LineOp,
    record_op: RecordOp,
    new_state: Option<String>,
    line_num: usize,
}

impl Rule {
    /// Parses a rule line (prefix already checked) belonging to `state`.
    pub(crate) fn parse(
        line: &str,
        line_num: usize,
        state: &str,
        value_templates: &HashMap<String, String>,
    ) -> Result<Self, TemplateError> {
        let trimmed = line.trim();
        let (match_text, action) = match MATCH_ACTION_RE.captures(trimmed) {
            Some(caps) => (
                caps["match"].trim_end().to_string(),
                Some(caps["action"].to_string()),
            ),
            None => (trimmed.to_string(), None),
        };

        let regex_source = substitute(&match_text, line_num, state, value_templates)?;
        let multiline = regex_source.contains("\\n");
        let regex = RegexBuilder::new(&format!("^(?:{regex_source})$"))
            .dot_matches_new_line(multiline)
            .build()
            .map_err(|err| TemplateError::InvalidRegex {
                line: line_num,
                pattern: regex_source.clone(),
                message: err.to_string(),
            })?;

        let mut rule = Self {
            match_text,
            regex_source,
            regex,
            line_op: LineOp::default(),
            record_op: RecordOp::default(),
            new_state: None,
            line_num,
        };

        let Some(action) = action else {
            return Ok(rule);
        };

        let caps = ACTION_RE
            .captures(&action)
            .or_else(|| RECORD_ACTION_RE.captures(&action))
            .or_else(|| STATE_ACTION_RE.captures(&action))
            .ok_or_else(|| TemplateError::MalformedRule {
                line: line_num,
                rule: trimmed.to_string(),
            })?;

        if let Some(op) = caps.name("ln_op") {
            rule.line_op = op.as_str().parse().map_err(|_| TemplateError::MalformedRule {
                line: line_num,
                rule: trimmed.to_string(),
            })?;
        }
        if let Some(op) = caps.name("rec_op") {
            rule.record_op = op.as_str().parse().map_err(|_| TemplateError::MalformedRule {
                line: line_num,
                rule: trimmed.to_string(),
            })?;
        }
        rule.new_state = caps.name("new_state").map(|m| m.as_str().to_string());

        if let Some(new_state) = &rule.new_state {
            if rule.line_op == LineOp::Continue {
                return Err(TemplateError::ContinueWithState {
                    line: line_num,
                    state: new_state.clone(),
                });
            }
            if rule.line_op != LineOp::Error && !is_identifier(new_state) {
                return Err(TemplateError::InvalidTargetState {
                    line: line_num,
                    state: new_state.clone(),
                });
            }
        }

        Ok(rule)
    }

    /// The pattern as written, before `${name}` substitution.
    pub fn match_text(&self) -> &str {
        &self.match_text
    }

    /// The pattern after `${name}` substitution.
    pub fn regex_source(&self) -> &str {
        &self.regex_source
    }

    /// The compiled whole-line matcher.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn line_op(&self) -> LineOp {
        self.line_op
    }

    pub fn record_op(&self) -> RecordOp {
        self.record_op
    }

    /// Target state token; for `Error` rules this is the error message.
    pub fn new_state(&self) -> Option<&str> {
        self.new_state.as_deref()
    }

    /// Template line the rule was declared on.
    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// Returns `true` when the pattern spans lines (`\n`), in which case `.`
    /// also matches newlines.
    pub fn is_multiline(&self) -> bool {
        self.regex_source.contains("\\n")
    }

    /// Message carried by an `Error` rule, without surrounding quotes.
    pub(crate) fn error_message(&self) -> Option<String> {
        self.new_state.as_deref().map(|token| {
            token
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(token)
                .to_string()
        })
    }
}

/// Replaces every `${name}` in `text` with the Value's named-capture fragment.
fn substitute(
    text: &str,
    line_num: usize,
    state: &str,
    value_templates: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in VARIABLE_RE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let fragment = value_templates.get(name.as_str()).ok_or_else(|| {
            TemplateError::UndefinedVariable {
                line: line_num,
                state: state.to_string(),
                name: name.as_str().to_string(),
            }
        })?;
        out.push_str(&text[last..whole.start()]);
        out.push_str(fragment);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Line numbers are diagnostic only and do not take part in equality.
impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.match_text == other.match_text
            && self.regex_source == other.regex_source
            && self.line_op == other.line_op
            && self.record_op == other.record_op
            && self.new_state == other.new_state
    }
}

impl Eq for Rule {}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operation = match (self.line_op, self.record_op) {
            (LineOp::Next, RecordOp::NoRecord) => String::new(),
            (LineOp::Next, record_op) => record_op.as_str().to_string(),
            (line_op, RecordOp::NoRecord) => line_op.as_str().to_string(),
            (line_op, record_op) => format!("{}.{}", line_op.as_str(), record_op.as_str()),
        };

        match (&self.new_state, operation.is_empty()) {
            (None, true) => write!(f, "  {}", self.match_text),
            (None, false) => write!(f, "  {} -> {operation}", self.match_text),
            (Some(state), true) => write!(f, "  {} -> {state}", self.match_text),
            (Some(state), false) => write!(f, "  {} -> {operation} {state}", self.match_text),
        }
    }
}
