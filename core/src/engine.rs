//! Line-by-line execution of a compiled template.

use tracing::{debug, warn};

use crate::context::ParseContext;
use crate::error::ParseError;
use crate::rule::{LineOp, RecordOp};
use crate::template::{END, EOF, Template};

/// Runs every line of `input` through the state machine, then performs
/// end-of-input processing when `eof` is set.
pub(crate) fn run(
    template: &Template,
    ctx: &mut ParseContext,
    input: &str,
    eof: bool,
) -> Result<(), ParseError> {
    if ctx.is_finished() {
        return Ok(());
    }

    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    for line in normalized.lines() {
        check_line(template, ctx, line)?;
        if ctx.is_finished() {
            debug!("Reached End state, ignoring remaining input");
            return Ok(());
        }
    }

    if eof {
        match template.state_index(EOF) {
            Some(index) => {
                debug!("Running EOF state");
                ctx.state = index;
                ctx.state_name = EOF.to_string();
                check_line(template, ctx, "")?;
            }
            None => ctx.append_record(template),
        }
    }
    Ok(())
}

/// Tests the current state's rules against one line.
fn check_line(template: &Template, ctx: &mut ParseContext, line: &str) -> Result<(), ParseError> {
    let line = line.trim_end();
    let state = &template.states()[ctx.state];

    for rule in state.rules() {
        let Some(caps) = rule.regex().captures(line) else {
            continue;
        };

        for name in rule.regex().capture_names().flatten() {
            if let (Some(m), Some(index)) = (caps.name(name), template.value_index(name)) {
                ctx.assign(template, index, m.as_str());
            }
        }

        match rule.record_op() {
            RecordOp::Record => ctx.append_record(template),
            RecordOp::Clear => ctx.clear_record(template),
            RecordOp::Clearall => ctx.clear_all(template),
            RecordOp::NoRecord => {}
        }

        match rule.line_op() {
            LineOp::Error => {
                let message = rule.error_message();
                warn!(rule_line = rule.line_num(), input = line, "Error rule matched");
                return Err(ParseError::RuleError {
                    rule_line: rule.line_num(),
                    input: line.to_string(),
                    message,
                });
            }
            LineOp::Continue => continue,
            LineOp::Next => {}
        }

        if let Some(target) = rule.new_state() {
            debug!(from = %ctx.state_name, to = target, "State transition");
            if target != END && target != EOF {
                if let Some(index) = template.state_index(target) {
                    ctx.state = index;
                }
            }
            ctx.state_name = target.to_string();
        }
        break;
    }

    Ok(())
}
