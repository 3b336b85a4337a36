//! Template-driven state machine for turning semi-structured text into
//! tables.
//!
//! A template declares the columns to extract and a set of named states,
//! each holding an ordered list of regex rules:
//!
//! - [`Value`] — a named column with a capture regex and
//!   [`ValueOption`]s (`Required`, `Filldown`, `Fillup`, `Key`, `List`).
//! - [`Rule`] — a line pattern with `${Value}` substitutions and an action
//!   ([`LineOp`], [`RecordOp`], optional next state).
//! - [`Template`] — the validated, immutable compiled form.
//!
//! Parsing runs input line by line through a [`ParseContext`], producing a
//! [`ParseResult`] of [`Row`]s. A compiled template never changes while
//! parsing, so it can be shared across threads with one context per run.
//!
//! # Example
//!
//! ```
//! use textfsm_core::{Field, compile};
//!
//! let template = compile(
//!     "Value Interface (\\S+)\nValue IP (\\S+)\n\nStart\n  ^${Interface}\\s+${IP} -> Record\n",
//! )
//! .unwrap();
//!
//! let result = template.parse("eth0 10.0.0.1\neth1 10.0.0.2\n", true).unwrap();
//! assert_eq!(result.header, vec!["Interface", "IP"]);
//! assert_eq!(result.rows[1], vec![Field::from("eth1"), Field::from("10.0.0.2")]);
//! ```

mod config;
mod context;
mod engine;
mod error;
mod options;
mod output;
mod record;
mod rule;
mod template;
mod validate;
mod value;

pub use config::{DEFAULT_MAX_NAME_LEN, FsmConfig};
pub use context::ParseContext;
pub use error::{Error, ParseError, Result, TemplateError};
pub use options::{UnknownOption, ValueOption};
pub use output::{OutputFormat, format_records, format_result};
pub use record::{Field, ListItem, ParseResult, Row};
pub use rule::{LineOp, RecordOp, Rule};
pub use template::{END, EOF, START, State, Template, compile, compile_with};
pub use value::Value;

/// Compiles `template` and parses `input` in one step.
///
/// Compile and parse failures both surface through [`Error`].
///
/// ```
/// let result = textfsm_core::parse("Value A (\\d+)\n\nStart\n  ^${A} -> Record\n", "1\n2\n", true)
///     .unwrap();
/// assert_eq!(result.len(), 2);
/// ```
pub fn parse(template: &str, input: &str, eof: bool) -> Result<ParseResult> {
    let template = compile(template)?;
    Ok(template.parse(input, eof)?)
}
