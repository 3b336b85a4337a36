//! Template compiler and the compiled state machine definition.
//!
//! A template has a Value section followed by one or more state sections,
//! separated by blank lines:
//!
//! ```text
//! Value Interface (\S+)
//! Value IP (\S+)
//!
//! Start
//!   ^${Interface}\s+${IP}\s*$ -> Record
//! ```
//!
//! [`compile`] parses the text, validates it and returns an immutable
//! [`Template`]. `Display` renders a template back into this grammar.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::config::FsmConfig;
use crate::context::ParseContext;
use crate::engine;
use crate::error::{ParseError, TemplateError};
use crate::options::{EXCLUSIVE_OPTIONS, ValueOption};
use crate::record::ParseResult;
use crate::rule::{Rule, is_identifier, is_reserved_word};
use crate::validate::validate;
use crate::value::Value;

/// Name of the initial state.
pub const START: &str = "Start";
/// Sentinel state that halts processing.
pub const END: &str = "End";
/// State run once against an empty line at end of input.
pub const EOF: &str = "EOF";

/// Rule prefixes accepted at the start of a rule line.
const RULE_PREFIXES: [&str; 3] = [" ^", "  ^", "\t^"];

/// A named list of rules, tested in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
    rules: Vec<Rule>,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// A compiled and validated template.
///
/// Immutable once built; share it freely and give every run its own
/// [`ParseContext`].
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) values: Vec<Value>,
    pub(crate) value_templates: HashMap<String, String>,
    pub(crate) states: Vec<State>,
    pub(crate) state_index: HashMap<String, usize>,
    pub(crate) start: usize,
}

/// Compiles template text with the default configuration.
///
/// # Examples
///
/// ```
/// use textfsm_core::compile;
///
/// let template = compile("Value Name (\\S+)\n\nStart\n  ^${Name} -> Record\n").unwrap();
/// assert_eq!(template.header(), vec!["Name"]);
///
/// assert!(compile("Value Name (\\S+)\n\nBegin\n  ^${Name}\n").is_err());
/// ```
pub fn compile(text: &str) -> Result<Template, TemplateError> {
    compile_with(text, &FsmConfig::default())
}

/// Compiles template text, honouring `config.max_name_len`.
pub fn compile_with(text: &str, config: &FsmConfig) -> Result<Template, TemplateError> {
    if text.is_empty() {
        return Err(TemplateError::EmptyTemplate);
    }

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let mut compiler = Compiler {
        lines: &lines,
        pos: 0,
        max_name_len: config.max_name_len,
        values: Vec::new(),
        value_templates: HashMap::new(),
        states: Vec::new(),
    };

    compiler.parse_values()?;
    while compiler.pos < lines.len() {
        compiler.parse_state()?;
    }

    let state_index = compiler
        .states
        .iter()
        .enumerate()
        .map(|(i, state)| (state.name.clone(), i))
        .collect();
    let template = validate(Template {
        values: compiler.values,
        value_templates: compiler.value_templates,
        states: compiler.states,
        state_index,
        start: 0,
    })?;

    debug!(
        values = template.values.len(),
        states = template.states.len(),
        "Compiled template"
    );
    Ok(template)
}

struct Compiler<'a> {
    lines: &'a [&'a str],
    pos: usize,
    max_name_len: usize,
    values: Vec<Value>,
    value_templates: HashMap<String, String>,
    states: Vec<State>,
}

impl Compiler<'_> {
    /// Parses `Value` lines up to the first blank line.
    fn parse_values(&mut self) -> Result<(), TemplateError> {
        while self.pos < self.lines.len() {
            let line_num = self.pos + 1;
            let line = self.lines[self.pos].trim();
            self.pos += 1;

            if line.is_empty() {
                break;
            }
            if line.starts_with('#') {
                continue;
            }

            if line.starts_with("Value ") {
                let value = Value::parse(line, line_num, self.max_name_len)?;
                if self.value_templates.contains_key(value.name()) {
                    return Err(TemplateError::DuplicateValue {
                        line: line_num,
                        name: value.name().to_string(),
                    });
                }
                check_exclusive_options(&value)?;
                self.value_templates
                    .insert(value.name().to_string(), value.template().to_string());
                self.values.push(value);
            } else if self.values.is_empty() {
                return Err(TemplateError::NoValues);
            } else {
                return Err(TemplateError::ExpectedBlankLine { line: line_num });
            }
        }

        if self.values.is_empty() {
            return Err(TemplateError::NoValues);
        }
        Ok(())
    }

    /// Parses one state: its name line followed by rules up to a blank line.
    fn parse_state(&mut self) -> Result<(), TemplateError> {
        let mut state = None;
        while self.pos < self.lines.len() {
            let line_num = self.pos + 1;
            let line = self.lines[self.pos].trim();
            self.pos += 1;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if !is_identifier(line)
                || line.chars().count() > self.max_name_len
                || is_reserved_word(line)
            {
                return Err(TemplateError::InvalidStateName {
                    line: line_num,
                    name: line.to_string(),
                });
            }
            if self.states.iter().any(|s| s.name == line) {
                return Err(TemplateError::DuplicateState {
                    line: line_num,
                    name: line.to_string(),
                });
            }
            state = Some(State {
                name: line.to_string(),
                rules: Vec::new(),
            });
            break;
        }

        let Some(mut state) = state else {
            return Ok(());
        };

        while self.pos < self.lines.len() {
            let line_num = self.pos + 1;
            let raw = self.lines[self.pos];
            let trimmed = raw.trim();
            self.pos += 1;

            if trimmed.is_empty() {
                break;
            }
            if trimmed.starts_with('#') {
                continue;
            }
            if !RULE_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
                return Err(TemplateError::MissingRulePrefix {
                    line: line_num,
                    content: raw.to_string(),
                });
            }

            let rule = Rule::parse(raw, line_num, &state.name, &self.value_templates)?;
            state.rules.push(rule);
        }

        self.states.push(state);
        Ok(())
    }
}

/// Rejects Values carrying two mutually exclusive options.
pub(crate) fn check_exclusive_options(value: &Value) -> Result<(), TemplateError> {
    for (first, second) in EXCLUSIVE_OPTIONS {
        if value.has_option(first) && value.has_option(second) {
            return Err(TemplateError::ConflictingOptions {
                value: value.name().to_string(),
                first: first.to_string(),
                second: second.to_string(),
            });
        }
    }
    Ok(())
}

impl Template {
    /// Values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|value| value.name() == name)
    }

    pub(crate) fn value_index(&self, name: &str) -> Option<usize> {
        self.values.iter().position(|value| value.name() == name)
    }

    /// Named-capture fragment substituted for `${name}`.
    pub fn value_template(&self, name: &str) -> Option<&str> {
        self.value_templates.get(name).map(String::as_str)
    }

    /// Column names of the result table: every Value name, in order.
    pub fn header(&self) -> Vec<String> {
        self.values.iter().map(|value| value.name().to_string()).collect()
    }

    /// Names of the Values that carry `option`.
    ///
    /// # Examples
    ///
    /// ```
    /// use textfsm_core::{ValueOption, compile};
    ///
    /// let template = compile(
    ///     "Value Key Id (\\d+)\nValue Name (\\S+)\n\nStart\n  ^${Id} ${Name} -> Record\n",
    /// )
    /// .unwrap();
    /// assert_eq!(template.values_with_option(ValueOption::Key), vec!["Id"]);
    /// ```
    pub fn values_with_option(&self, option: ValueOption) -> Vec<&str> {
        self.values
            .iter()
            .filter(|value| value.has_option(option))
            .map(Value::name)
            .collect()
    }

    /// States in declaration order (`End` excluded).
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.state_index.get(name).map(|&i| &self.states[i])
    }

    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(State::name).collect()
    }

    pub(crate) fn state_index(&self, name: &str) -> Option<usize> {
        self.state_index.get(name).copied()
    }

    pub(crate) fn start_index(&self) -> usize {
        self.start
    }

    /// Creates a fresh execution context for this template.
    pub fn new_context(&self) -> ParseContext {
        ParseContext::new(self)
    }

    /// Parses `input` with a fresh context.
    ///
    /// `eof` controls end-of-input processing: the `EOF` state if declared,
    /// otherwise appending the record still in progress.
    pub fn parse(&self, input: &str, eof: bool) -> Result<ParseResult, ParseError> {
        let mut ctx = self.new_context();
        self.parse_into(&mut ctx, input, eof)?;
        Ok(ParseResult {
            header: self.header(),
            rows: ctx.into_rows(),
        })
    }

    /// Feeds `input` into an existing context, continuing from its current
    /// state. Rows accumulate in the context across calls.
    pub fn parse_into(
        &self,
        ctx: &mut ParseContext,
        input: &str,
        eof: bool,
    ) -> Result<(), ParseError> {
        engine::run(self, ctx, input, eof)
    }
}

/// Structural equality: Values and states, ignoring rule line numbers.
impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.states == other.states
    }
}

impl Eq for Template {}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in &self.values {
            writeln!(f, "{value}")?;
        }
        for state in &self.states {
            write!(f, "\n{}\n", state.name)?;
            for rule in &state.rules {
                writeln!(f, "{rule}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{LineOp, RecordOp};

    const INTERFACES: &str = "\
Value Interface (\\S+)
Value IP (\\S+)

Start
  ^${Interface}\\s+${IP}\\s*$ -> Record
";

    #[test]
    fn test_compile_basic_template() {
        let template = compile(INTERFACES).unwrap();
        assert_eq!(template.header(), vec!["Interface", "IP"]);
        assert_eq!(template.state_names(), vec!["Start"]);

        let rule = &template.state("Start").unwrap().rules()[0];
        assert_eq!(rule.record_op(), RecordOp::Record);
        assert_eq!(rule.line_op(), LineOp::Next);
        assert_eq!(rule.line_num(), 5);
        assert_eq!(template.value_template("IP"), Some("(?<IP>\\S+)"));
    }

    #[test]
    fn test_comments_and_crlf() {
        let text = "# header comment\r\nValue A (\\S+)\r\n# another\r\n\r\nStart\r\n  # rule comment\r\n  ^${A} -> Record\r\n";
        let template = compile(text).unwrap();
        assert_eq!(template.states()[0].rules().len(), 1);
    }

    #[test]
    fn test_empty_template() {
        assert_eq!(compile(""), Err(TemplateError::EmptyTemplate));
    }

    #[test]
    fn test_missing_value_section() {
        assert_eq!(
            compile("\nStart\n  ^foo\n"),
            Err(TemplateError::NoValues)
        );
        assert_eq!(compile("Start\n  ^foo\n"), Err(TemplateError::NoValues));
    }

    #[test]
    fn test_expected_blank_line_after_values() {
        assert_eq!(
            compile("Value A (\\S+)\nStart\n  ^${A}\n"),
            Err(TemplateError::ExpectedBlankLine { line: 2 })
        );
    }

    #[test]
    fn test_duplicate_value() {
        assert!(matches!(
            compile("Value A (\\S+)\nValue A (\\d+)\n\nStart\n  ^${A}\n"),
            Err(TemplateError::DuplicateValue { line: 2, .. })
        ));
    }

    #[test]
    fn test_conflicting_options() {
        assert!(matches!(
            compile("Value Key,List A (\\S+)\n\nStart\n  ^${A}\n"),
            Err(TemplateError::ConflictingOptions { .. })
        ));
        assert!(matches!(
            compile("Value Fillup,Filldown A (\\S+)\n\nStart\n  ^${A}\n"),
            Err(TemplateError::ConflictingOptions { .. })
        ));
    }

    #[test]
    fn test_invalid_state_names() {
        for name in ["Record", "Bad-Name", "Next"] {
            let text = format!("Value A (\\S+)\n\n{name}\n  ^${{A}}\n");
            assert!(
                matches!(compile(&text), Err(TemplateError::InvalidStateName { .. })),
                "{name} should be rejected"
            );
        }
        let long = "S".repeat(49);
        let text = format!("Value A (\\S+)\n\nStart\n  ^${{A}} -> {long}\n\n{long}\n  ^x\n");
        assert!(matches!(
            compile(&text),
            Err(TemplateError::InvalidStateName { .. })
        ));
    }

    #[test]
    fn test_duplicate_state() {
        assert!(matches!(
            compile("Value A (\\S+)\n\nStart\n  ^${A}\n\nStart\n  ^x\n"),
            Err(TemplateError::DuplicateState { line: 6, .. })
        ));
    }

    #[test]
    fn test_rule_prefix_required() {
        for rule in ["^${A}", "   ^${A}", " ${A}"] {
            let text = format!("Value A (\\S+)\n\nStart\n{rule}\n");
            assert!(
                matches!(compile(&text), Err(TemplateError::MissingRulePrefix { .. })),
                "{rule:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_custom_max_name_len() {
        let config = FsmConfig {
            max_name_len: 3,
            ..FsmConfig::default()
        };
        assert!(matches!(
            compile_with("Value Long (\\S+)\n\nStart\n  ^${Long}\n", &config),
            Err(TemplateError::InvalidValueName { .. })
        ));
    }

    #[test]
    fn test_values_with_option() {
        let template = compile(
            "Value Filldown A (\\S+)\nValue Required B (\\S+)\nValue Filldown,Required C (\\S+)\n\nStart\n  ^${A} ${B} ${C}\n",
        )
        .unwrap();
        assert_eq!(template.values_with_option(ValueOption::Filldown), vec!["A", "C"]);
        assert_eq!(template.values_with_option(ValueOption::Required), vec!["B", "C"]);
        assert!(template.values_with_option(ValueOption::List).is_empty());
    }

    #[test]
    fn test_compile_is_deterministic() {
        let first = compile(INTERFACES).unwrap();
        let second = compile(INTERFACES).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pretty_print() {
        let text = "\
Value Filldown,Required Chassis (\\S+)
Value Slot (\\d+)

Start
  ^Chassis ${Chassis} -> Next
  ^Slot ${Slot} -> Next.Record
  ^bogus -> Error \"unexpected\"
  ^Done -> End
";
        let template = compile(text).unwrap();
        assert_eq!(
            template.to_string(),
            "\
Value Filldown,Required Chassis (\\S+)
Value Slot (\\d+)

Start
  ^Chassis ${Chassis}
  ^Slot ${Slot} -> Record
  ^bogus -> Error \"unexpected\"
  ^Done -> End
"
        );
    }

    #[test]
    fn test_pretty_print_round_trips() {
        let text = "\
Value Key Name (\\S+)
Value List Items (\\w+)

Start
  ^Name: ${Name} -> Continue
  ^.*items ${Items} -> Continue.Record
  ^Section -> Section

Section
  ^${Items}
  ^End -> Clearall Start

EOF
  ^.* -> Record

End
";
        let template = compile(text).unwrap();
        let reparsed = compile(&template.to_string()).unwrap();
        assert_eq!(template, reparsed);
        assert_eq!(template.to_string(), reparsed.to_string());
    }
}
