//! Undoable edits of the rule table
//!
//! Every change to a [`RuleSet`] is recorded as a [`RuleEdit`] that carries
//! enough of the previous state to be reverted. [`CommandHistory`] keeps the
//! most recent edits on a bounded undo stack and the reverted ones on a redo
//! stack. Most callers go through [`crate::core::rules::RuleStore`].

use crate::core::rules::{Rule, RuleSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Default number of undoable operations kept
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// A reversible change to a [`RuleSet`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleEdit {
    Add { rule: Rule },
    /// `index` is where the rule sat, so undo puts it back in place
    Delete { rule: Rule, index: usize },
    Update { before: Rule, after: Rule },
    Toggle { id: Uuid, was_enabled: bool },
}

impl RuleEdit {
    pub fn apply(&self, ruleset: &mut RuleSet) {
        match self {
            RuleEdit::Add { rule } => ruleset.rules.push(rule.clone()),
            RuleEdit::Delete { rule, .. } => remove(ruleset, rule.id),
            RuleEdit::Update { after, .. } => replace(ruleset, after),
            RuleEdit::Toggle { id, was_enabled } => set_enabled(ruleset, *id, !was_enabled),
        }
    }

    pub fn revert(&self, ruleset: &mut RuleSet) {
        match self {
            RuleEdit::Add { rule } => remove(ruleset, rule.id),
            RuleEdit::Delete { rule, index } => {
                let index = (*index).min(ruleset.rules.len());
                ruleset.rules.insert(index, rule.clone());
            }
            RuleEdit::Update { before, .. } => replace(ruleset, before),
            RuleEdit::Toggle { id, was_enabled } => set_enabled(ruleset, *id, *was_enabled),
        }
    }

    /// Short label for status messages ("Undo: Delete rule Block FTP")
    pub fn description(&self) -> String {
        match self {
            RuleEdit::Add { rule } => format!("Add rule {}", rule.name),
            RuleEdit::Delete { rule, .. } => format!("Delete rule {}", rule.name),
            RuleEdit::Update { after, .. } => format!("Edit rule {}", after.name),
            RuleEdit::Toggle { was_enabled: true, .. } => "Disable rule".to_string(),
            RuleEdit::Toggle { was_enabled: false, .. } => "Enable rule".to_string(),
        }
    }
}

fn remove(ruleset: &mut RuleSet, id: Uuid) {
    ruleset.rules.retain(|r| r.id != id);
}

fn replace(ruleset: &mut RuleSet, rule: &Rule) {
    if let Some(slot) = ruleset.rules.iter_mut().find(|r| r.id == rule.id) {
        *slot = rule.clone();
    }
}

fn set_enabled(ruleset: &mut RuleSet, id: Uuid, enabled: bool) {
    if let Some(rule) = ruleset.rules.iter_mut().find(|r| r.id == id) {
        rule.enabled = enabled;
    }
}

/// Bounded undo/redo stacks
#[derive(Debug, Clone)]
pub struct CommandHistory {
    done: VecDeque<RuleEdit>,
    undone: Vec<RuleEdit>,
    depth: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl CommandHistory {
    pub fn new(depth: usize) -> Self {
        Self {
            done: VecDeque::with_capacity(depth),
            undone: Vec::new(),
            depth,
        }
    }

    /// Applies `edit` and records it. Anything previously undone is dropped.
    pub fn execute(&mut self, edit: RuleEdit, ruleset: &mut RuleSet) {
        edit.apply(ruleset);
        self.undone.clear();
        self.done.push_back(edit);
        while self.done.len() > self.depth {
            self.done.pop_front();
        }
    }

    pub fn undo(&mut self, ruleset: &mut RuleSet) -> Option<String> {
        let edit = self.done.pop_back()?;
        edit.revert(ruleset);
        let description = edit.description();
        self.undone.push(edit);
        Some(description)
    }

    pub fn redo(&mut self, ruleset: &mut RuleSet) -> Option<String> {
        let edit = self.undone.pop()?;
        edit.apply(ruleset);
        let description = edit.description();
        self.done.push_back(edit);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.done.len()
    }
}
