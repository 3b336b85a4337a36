//! Error types for template compilation, parsing, and configuration.
//!
//! Compilation failures are reported as [`TemplateError`], runtime aborts
//! raised by `Error` rules as [`ParseError`]. [`Error`] unifies both with the
//! I/O and YAML failures that can occur while loading configuration.

use thiserror::Error;

/// Errors raised while compiling or validating a template.
///
/// Line numbers are 1-based positions in the template text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template text was empty.
    #[error("empty template")]
    EmptyTemplate,

    /// A `Value` line did not have the expected shape.
    #[error("malformed Value definition: {reason}. Line: {line}")]
    MalformedValue { line: usize, reason: String },

    /// The same option appears twice on one Value.
    #[error("duplicate option \"{option}\". Line: {line}")]
    DuplicateOption { line: usize, option: String },

    /// An option name that is not one of the supported options.
    #[error("unknown option \"{option}\". Line: {line}")]
    UnknownOption { line: usize, option: String },

    /// Two mutually exclusive options were declared on one Value.
    #[error("value '{value}' cannot have both '{first}' and '{second}' options")]
    ConflictingOptions {
        value: String,
        first: String,
        second: String,
    },

    /// A Value name that is empty or longer than the configured maximum.
    #[error("invalid Value name '{name}' or name too long. Line: {line}")]
    InvalidValueName { line: usize, name: String },

    /// Two Values share a name.
    #[error("duplicate declarations for Value '{name}'. Line: {line}")]
    DuplicateValue { line: usize, name: String },

    /// A Value regex that is not one top-level parenthesised group.
    #[error("value regex '{regex}' must be contained within a '()' pair. Line: {line}")]
    UnparenthesizedRegex { line: usize, regex: String },

    /// A Value or rule pattern that the regex engine rejected.
    #[error("invalid regular expression '{pattern}': {message}. Line: {line}")]
    InvalidRegex {
        line: usize,
        pattern: String,
        message: String,
    },

    /// The Value section contained no definitions.
    #[error("no Value definitions found")]
    NoValues,

    /// A non-`Value` line appeared inside the Value section.
    #[error("expected blank line after last Value entry. Line: {line}")]
    ExpectedBlankLine { line: usize },

    /// A state name that is not an identifier, too long, or a reserved word.
    #[error("invalid state name: '{name}'. Line: {line}")]
    InvalidStateName { line: usize, name: String },

    /// Two states share a name.
    #[error("duplicate state name: '{name}'. Line: {line}")]
    DuplicateState { line: usize, name: String },

    /// A rule line without the leading whitespace and caret.
    #[error("missing white space or carat ('^') before rule. Line: {line}. Content: \"{content}\"")]
    MissingRulePrefix { line: usize, content: String },

    /// A rule whose action part could not be parsed.
    #[error("badly formatted rule '{rule}'. Line: {line}")]
    MalformedRule { line: usize, rule: String },

    /// A `Continue` action that also names a target state.
    #[error("action 'Continue' with new state {state} specified. Line: {line}")]
    ContinueWithState { line: usize, state: String },

    /// A target state name with characters other than alphanumerics and `_`.
    #[error("alphanumeric characters only in state names: '{state}'. Line: {line}")]
    InvalidTargetState { line: usize, state: String },

    /// A `${name}` reference to an undeclared Value.
    #[error("invalid variable substitution: '{name}' in state '{state}'. Line: {line}")]
    UndefinedVariable {
        line: usize,
        state: String,
        name: String,
    },

    /// The template declares no `Start` state.
    #[error("missing state 'Start'")]
    MissingStartState,

    /// The `End` state declares rules.
    #[error("non-empty 'End' state")]
    NonEmptyEndState,

    /// A rule transitions to a state that was never declared.
    #[error("state '{target}' not found, referenced in state '{state}'. Line: {line}")]
    UnknownTargetState {
        line: usize,
        state: String,
        target: String,
    },

    /// States that cannot be reached from `Start`.
    #[error("unreachable states found: {}", .0.join(", "))]
    UnreachableStates(Vec<String>),
}

/// Errors raised while running a compiled template over input text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// An `Error` rule matched.
    #[error("{}Rule Line: {rule_line}. Input Line: {input}.", error_prefix(.message))]
    RuleError {
        rule_line: usize,
        input: String,
        message: Option<String>,
    },
}

fn error_prefix(message: &Option<String>) -> String {
    match message {
        Some(message) => format!("Error: {message}. "),
        None => "State Error raised. ".to_string(),
    }
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Template compilation failure.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Runtime parse failure.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
