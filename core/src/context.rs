//! Mutable state of one parse run.

use std::collections::HashSet;

use tracing::debug;

use crate::record::{Field, ListItem, Row};
use crate::template::{START, Template};

/// Run state of one Value: its current content plus the private state kept
/// by its options.
#[derive(Debug, Clone, Default)]
pub(crate) struct Slot {
    pub(crate) content: Option<Field>,
    /// Last assigned content, restored by `Filldown` on record clear.
    pub(crate) stash: Option<Field>,
    /// Captures accumulated by `List`.
    pub(crate) items: Vec<ListItem>,
}

/// Execution context for a [`Template`].
///
/// Holds the current state, the in-progress record, the completed rows and
/// the keys seen so far. One context serves one run at a time; call
/// [`ParseContext::reset`] (or build a new context) before reusing it for
/// unrelated input. The template itself is never mutated, so any number of
/// contexts may run against it concurrently.
///
/// # Examples
///
/// ```
/// use textfsm_core::{ParseContext, compile};
///
/// let template = compile("Value Word (\\S+)\n\nStart\n  ^${Word} -> Record\n").unwrap();
/// let mut ctx = ParseContext::new(&template);
/// template.parse_into(&mut ctx, "alpha\n", false).unwrap();
/// template.parse_into(&mut ctx, "beta\n", true).unwrap();
/// assert_eq!(ctx.rows().len(), 2);
///
/// ctx.reset(&template);
/// assert!(ctx.rows().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub(crate) state_name: String,
    /// Index of the state whose rules are active.
    pub(crate) state: usize,
    pub(crate) slots: Vec<Slot>,
    pub(crate) rows: Vec<Row>,
    pub(crate) seen_keys: HashSet<String>,
}

impl ParseContext {
    /// Creates a context positioned at the `Start` state.
    pub fn new(template: &Template) -> Self {
        let mut ctx = Self {
            state_name: START.to_string(),
            state: template.start_index(),
            slots: vec![Slot::default(); template.values().len()],
            rows: Vec::new(),
            seen_keys: HashSet::new(),
        };
        for (index, value) in template.values().iter().enumerate() {
            for option in value.options() {
                option.on_create(template, index, &mut ctx);
            }
        }
        ctx
    }

    /// Returns to `Start`, drops all rows and seen keys, and fully clears
    /// every Value.
    pub fn reset(&mut self, template: &Template) {
        self.state_name = START.to_string();
        self.state = template.start_index();
        self.rows.clear();
        self.seen_keys.clear();
        self.slots.resize_with(template.values().len(), Slot::default);
        self.clear_all(template);
    }

    /// Name of the current state, including the `End`/`EOF` sentinels.
    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    /// Returns `true` once an `End` transition has halted processing.
    pub fn is_finished(&self) -> bool {
        self.state_name == crate::template::END
    }

    /// Rows appended so far.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Binds a capture to the Value at `index`.
    pub(crate) fn assign(&mut self, template: &Template, index: usize, captured: &str) {
        self.slots[index].content = Some(Field::Text(captured.to_string()));
        for option in template.values()[index].options() {
            option.on_assign(template, index, self, captured);
        }
    }

    /// Clears the in-progress record, keeping sticky content.
    pub(crate) fn clear_record(&mut self, template: &Template) {
        for (index, value) in template.values().iter().enumerate() {
            self.slots[index].content = None;
            for option in value.options() {
                option.on_clear_record(template, index, self);
            }
        }
    }

    /// Clears the in-progress record and all option state.
    pub(crate) fn clear_all(&mut self, template: &Template) {
        for (index, value) in template.values().iter().enumerate() {
            self.slots[index].content = None;
            for option in value.options() {
                option.on_clear_all(template, index, self);
            }
        }
    }

    /// Finalises the in-progress record and appends it to the result.
    ///
    /// A record vetoed by an option is cleared and dropped. A record whose
    /// fields are all empty is dropped without clearing.
    pub(crate) fn append_record(&mut self, template: &Template) {
        if template.values().is_empty() {
            return;
        }

        for (index, value) in template.values().iter().enumerate() {
            for option in value.options() {
                if let Err(skip) = option.on_save_record(template, index, self) {
                    debug!(reason = %skip, "Skipping record");
                    self.clear_record(template);
                    return;
                }
            }
        }

        let record: Row = self
            .slots
            .iter()
            .map(|slot| slot.content.clone().unwrap_or_default())
            .collect();
        if record.iter().all(Field::is_empty) {
            return;
        }

        self.rows.push(record);
        self.clear_record(template);
    }
}
