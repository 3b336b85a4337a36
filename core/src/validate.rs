//! Static checks run once on a freshly compiled template.
//!
//! Verifies the `Start`/`End` invariants, that every transition names a
//! declared state, that every `${name}` reference resolves, that every state
//! is reachable from `Start`, and that no Value carries conflicting options.

use std::collections::HashSet;

use crate::error::TemplateError;
use crate::rule::{LineOp, variable_references};
use crate::template::{END, EOF, START, Template, check_exclusive_options};

/// Validates `template`, dropping the empty `End` state and resolving the
/// `Start` index.
pub(crate) fn validate(mut template: Template) -> Result<Template, TemplateError> {
    check_start_and_end(&mut template)?;
    check_targets(&template)?;
    check_variables(&template)?;
    check_reachability(&template)?;
    for value in &template.values {
        check_exclusive_options(value)?;
    }
    Ok(template)
}

fn check_start_and_end(template: &mut Template) -> Result<(), TemplateError> {
    if !template.state_index.contains_key(START) {
        return Err(TemplateError::MissingStartState);
    }

    if let Some(end) = template.state_index.get(END).copied() {
        if !template.states[end].rules().is_empty() {
            return Err(TemplateError::NonEmptyEndState);
        }
        template.states.remove(end);
        template.state_index = template
            .states
            .iter()
            .enumerate()
            .map(|(i, state)| (state.name().to_string(), i))
            .collect();
    }

    template.start = template
        .state_index
        .get(START)
        .copied()
        .ok_or(TemplateError::MissingStartState)?;
    Ok(())
}

fn is_sentinel(name: &str) -> bool {
    name == END || name == EOF
}

fn check_targets(template: &Template) -> Result<(), TemplateError> {
    for state in &template.states {
        for rule in state.rules() {
            if rule.line_op() == LineOp::Error {
                continue;
            }
            let Some(target) = rule.new_state() else {
                continue;
            };
            if !is_sentinel(target) && !template.state_index.contains_key(target) {
                return Err(TemplateError::UnknownTargetState {
                    line: rule.line_num(),
                    state: state.name().to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_variables(template: &Template) -> Result<(), TemplateError> {
    for state in &template.states {
        for rule in state.rules() {
            for name in variable_references(rule.match_text()) {
                if !template.value_templates.contains_key(name) {
                    return Err(TemplateError::UndefinedVariable {
                        line: rule.line_num(),
                        state: state.name().to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_reachability(template: &Template) -> Result<(), TemplateError> {
    let mut reached: HashSet<&str> = HashSet::from([START]);
    let mut pending = vec![START];
    while let Some(name) = pending.pop() {
        let Some(state) = template.state(name) else {
            continue;
        };
        for rule in state.rules() {
            if rule.line_op() == LineOp::Error {
                continue;
            }
            if let Some(target) = rule.new_state() {
                if !is_sentinel(target) && reached.insert(target) {
                    pending.push(target);
                }
            }
        }
    }

    let unreachable: Vec<String> = template
        .states
        .iter()
        .map(|state| state.name())
        .filter(|name| *name != EOF && !reached.contains(name))
        .map(str::to_string)
        .collect();
    if unreachable.is_empty() {
        Ok(())
    } else {
        Err(TemplateError::UnreachableStates(unreachable))
    }
}

#[cfg(test)]
mod tests {
    use crate::compile;
    use crate::error::TemplateError;

    #[test]
    fn test_missing_start_state() {
        assert_eq!(
            compile("Value A (\\S+)\n\nBegin\n  ^${A}\n"),
            Err(TemplateError::MissingStartState)
        );
    }

    #[test]
    fn test_non_empty_end_state() {
        assert_eq!(
            compile("Value A (\\S+)\n\nStart\n  ^${A}\n\nEnd\n  ^x\n"),
            Err(TemplateError::NonEmptyEndState)
        );
    }

    #[test]
    fn test_empty_end_state_is_dropped() {
        let template = compile("Value A (\\S+)\n\nStart\n  ^${A} -> End\n\nEnd\n").unwrap();
        assert_eq!(template.state_names(), vec!["Start"]);
        assert!(template.state("End").is_none());
    }

    #[test]
    fn test_unknown_target_state() {
        assert!(matches!(
            compile("Value A (\\S+)\n\nStart\n  ^${A} -> Nowhere\n"),
            Err(TemplateError::UnknownTargetState { target, .. }) if target == "Nowhere"
        ));
    }

    #[test]
    fn test_error_target_is_not_a_state() {
        let template = compile("Value A (\\S+)\n\nStart\n  ^${A}\n  ^.* -> Error Unexpected\n");
        assert!(template.is_ok());
    }

    #[test]
    fn test_unreachable_states() {
        let text = "\
Value A (\\S+)

Start
  ^${A} -> Middle

Middle
  ^x -> Start

Orphan
  ^y

Island
  ^z -> Orphan
";
        assert_eq!(
            compile(text),
            Err(TemplateError::UnreachableStates(vec![
                "Orphan".to_string(),
                "Island".to_string()
            ]))
        );
    }

    #[test]
    fn test_state_reached_only_through_error_rule_is_unreachable() {
        let text = "Value A (\\S+)\n\nStart\n  ^${A} -> Error Other\n\nOther\n  ^x\n";
        assert_eq!(
            compile(text),
            Err(TemplateError::UnreachableStates(vec!["Other".to_string()]))
        );
    }

    #[test]
    fn test_eof_state_needs_no_transition() {
        let text = "Value A (\\S+)\n\nStart\n  ^${A}\n\nEOF\n  ^.* -> Record\n";
        let template = compile(text).unwrap();
        assert_eq!(template.state_names(), vec!["Start", "EOF"]);
    }

    #[test]
    fn test_start_index_after_end_removal() {
        let text = "Value A (\\S+)\n\nEnd\n\nStart\n  ^${A} -> End\n";
        let template = compile(text).unwrap();
        assert_eq!(template.states()[template.start_index()].name(), "Start");
    }
}
