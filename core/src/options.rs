//! Value options and their lifecycle hooks.
//!
//! Each option reacts to five events raised by the executor:
//!
//! | hook              | raised when                                      |
//! |-------------------|--------------------------------------------------|
//! | `on_create`       | a parse context allocates the Value's slot       |
//! | `on_assign`       | a rule capture is bound to the Value             |
//! | `on_clear_record` | the in-progress record is cleared (`Clear`)      |
//! | `on_clear_all`    | everything is cleared (`Clearall`, reset)        |
//! | `on_save_record`  | a record is about to be appended (`Record`, EOF) |
//!
//! Hooks receive the compiled [`Template`], the Value's index and the mutable
//! [`ParseContext`]; the Value itself never holds run state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ParseContext;
use crate::record::{Field, ListItem};
use crate::template::Template;
use crate::value::Value;

/// Options that may be attached to a Value.
///
/// # Examples
///
/// ```
/// use textfsm_core::ValueOption;
///
/// let option: ValueOption = "Filldown".parse().unwrap();
/// assert_eq!(option, ValueOption::Filldown);
/// assert!("Sticky".parse::<ValueOption>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueOption {
    /// The record is only saved if this Value has content.
    Required,
    /// Content is kept across records until reassigned or `Clearall`.
    Filldown,
    /// Content is copied into earlier rows whose column is empty.
    Fillup,
    /// Part of the composite key used to drop duplicate records.
    Key,
    /// Every capture is accumulated into a list.
    List,
}

/// Option pairs that cannot be declared on the same Value.
pub(crate) const EXCLUSIVE_OPTIONS: [(ValueOption, ValueOption); 2] = [
    (ValueOption::Key, ValueOption::List),
    (ValueOption::Filldown, ValueOption::Fillup),
];

/// Signal raised by `on_save_record` to discard the in-progress record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SkipRecord(pub(crate) String);

impl fmt::Display for SkipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when parsing an unknown option name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOption(pub String);

impl fmt::Display for UnknownOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': not a valid option", self.0)
    }
}

impl std::error::Error for UnknownOption {}

impl ValueOption {
    /// Every option, in canonical order.
    pub const ALL: [ValueOption; 5] = [
        ValueOption::Required,
        ValueOption::Filldown,
        ValueOption::Fillup,
        ValueOption::Key,
        ValueOption::List,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueOption::Required => "Required",
            ValueOption::Filldown => "Filldown",
            ValueOption::Fillup => "Fillup",
            ValueOption::Key => "Key",
            ValueOption::List => "List",
        }
    }

    pub(crate) fn on_create(self, _template: &Template, index: usize, ctx: &mut ParseContext) {
        if self == ValueOption::List {
            ctx.slots[index].items = Vec::new();
        }
    }

    pub(crate) fn on_assign(
        self,
        template: &Template,
        index: usize,
        ctx: &mut ParseContext,
        captured: &str,
    ) {
        let slot = &mut ctx.slots[index];
        match self {
            ValueOption::Filldown => slot.stash = slot.content.clone(),
            ValueOption::List => {
                let value = &template.values()[index];
                slot.items.push(list_item(value, captured));
            }
            ValueOption::Required | ValueOption::Fillup | ValueOption::Key => {}
        }
    }

    pub(crate) fn on_clear_record(self, template: &Template, index: usize, ctx: &mut ParseContext) {
        let slot = &mut ctx.slots[index];
        match self {
            ValueOption::Filldown => slot.content = slot.stash.clone(),
            ValueOption::List => {
                if !template.values()[index].has_option(ValueOption::Filldown) {
                    slot.items.clear();
                }
            }
            ValueOption::Required | ValueOption::Fillup | ValueOption::Key => {}
        }
    }

    pub(crate) fn on_clear_all(self, _template: &Template, index: usize, ctx: &mut ParseContext) {
        let slot = &mut ctx.slots[index];
        match self {
            ValueOption::Filldown => slot.stash = None,
            ValueOption::List => slot.items.clear(),
            ValueOption::Required | ValueOption::Fillup | ValueOption::Key => {}
        }
    }

    pub(crate) fn on_save_record(
        self,
        template: &Template,
        index: usize,
        ctx: &mut ParseContext,
    ) -> Result<(), SkipRecord> {
        match self {
            ValueOption::Required => {
                let value = &template.values()[index];
                let slot = &ctx.slots[index];
                let blank = if value.has_option(ValueOption::List) {
                    slot.items.is_empty()
                } else {
                    slot.content.as_ref().is_none_or(Field::is_empty)
                };
                if blank {
                    return Err(SkipRecord(format!(
                        "required value '{}' is empty",
                        value.name()
                    )));
                }
            }
            ValueOption::Key => return check_composite_key(template, index, ctx),
            ValueOption::Fillup => {
                let Some(content) = ctx.slots[index].content.clone() else {
                    return Ok(());
                };
                if content.is_empty() {
                    return Ok(());
                }
                for row in ctx.rows.iter_mut().rev() {
                    if !row[index].is_empty() {
                        break;
                    }
                    row[index] = content.clone();
                }
            }
            ValueOption::List => {
                let slot = &mut ctx.slots[index];
                slot.content = Some(Field::List(slot.items.clone()));
            }
            ValueOption::Filldown => {}
        }
        Ok(())
    }
}

impl FromStr for ValueOption {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueOption::ALL
            .into_iter()
            .find(|option| option.as_str() == s)
            .ok_or_else(|| UnknownOption(s.to_string()))
    }
}

impl fmt::Display for ValueOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a list entry, splitting the capture into named sub-groups when the
/// Value's regex declares any.
fn list_item(value: &Value, captured: &str) -> ListItem {
    if value.subgroups().is_empty() {
        return ListItem::Text(captured.to_string());
    }
    match value.matcher().captures(captured) {
        Some(caps) => ListItem::Groups(
            value
                .subgroups()
                .iter()
                .map(|group| {
                    let text = caps.name(group).map_or("", |m| m.as_str());
                    (group.clone(), text.to_string())
                })
                .collect(),
        ),
        None => ListItem::Text(captured.to_string()),
    }
}

/// Drops records whose composite key was already saved in this run.
///
/// The composite covers every Key Value, so only the first Key Value in
/// declaration order performs the check.
fn check_composite_key(
    template: &Template,
    index: usize,
    ctx: &mut ParseContext,
) -> Result<(), SkipRecord> {
    let keys: Vec<usize> = template
        .values()
        .iter()
        .enumerate()
        .filter(|(_, value)| value.has_option(ValueOption::Key))
        .map(|(i, _)| i)
        .collect();
    if keys.first() != Some(&index) {
        return Ok(());
    }

    let parts: Vec<String> = keys
        .iter()
        .map(|&i| {
            ctx.slots[i]
                .content
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .collect();
    if parts.iter().all(String::is_empty) {
        return Ok(());
    }

    let composite = parts.join("|");
    if ctx.seen_keys.contains(&composite) {
        debug!(key = %composite, "Duplicate key");
        return Err(SkipRecord(format!("duplicate key: {composite}")));
    }
    ctx.seen_keys.insert(composite);
    Ok(())
}
