//! Demonstration firewall rule table
//!
//! Rules are plain in-memory records; nothing here filters packets. The table
//! is edited through [`RuleStore`], which routes every change through the
//! command history so it can be undone.
//!
//! # Limits
//!
//! A rule set holds at most [`MAX_RULES`] rules.
//!
//! # Example
//!
//! ```
//! use fireguard::core::rules::{RuleAction, RuleDraft, RuleProtocol, RuleStore};
//!
//! let mut store = RuleStore::with_defaults();
//! let draft = RuleDraft {
//!     name: "Block SMB".to_string(),
//!     source: "Any".to_string(),
//!     destination: "Any".to_string(),
//!     port: "445".to_string(),
//!     protocol: RuleProtocol::Tcp,
//!     action: RuleAction::Deny,
//! };
//! let id = store.add(draft).unwrap();
//! assert!(store.rules().get(id).unwrap().enabled);
//!
//! store.undo();
//! assert!(store.rules().get(id).is_none());
//! ```

use crate::command::{CommandHistory, RuleEdit};
use crate::core::error::{Error, Result};
use crate::validators;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of rules in a single rule set
pub const MAX_RULES: usize = 1000;

/// Wildcard used for unrestricted address or port fields
pub const ANY: &str = "Any";

/// Transport protocol a rule matches
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RuleProtocol {
    #[default]
    Tcp,
    Udp,
    Icmp,
}

/// What happens to matching traffic
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RuleAction {
    #[default]
    Allow,
    Deny,
}

impl RuleAction {
    /// Returns display name for UI rendering
    pub const fn display_name(self) -> &'static str {
        match self {
            RuleAction::Allow => "Allow",
            RuleAction::Deny => "Deny",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub id: Uuid,
    pub name: String,
    pub source: String,
    pub destination: String,
    /// Free text: a number, a range, or `Any`
    pub port: String,
    pub protocol: RuleProtocol,
    pub action: RuleAction,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

fn default_true() -> bool {
    true
}

impl Rule {
    /// Builds an enabled rule from an already validated draft
    pub fn from_draft(draft: RuleDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name,
            source: draft.source,
            destination: draft.destination,
            port: draft.port,
            protocol: draft.protocol,
            action: draft.action,
            enabled: true,
            created_at: chrono::Utc::now(),
        }
    }

    fn seed(
        name: &str,
        source: &str,
        destination: &str,
        port: &str,
        action: RuleAction,
        enabled: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            port: port.to_string(),
            protocol: RuleProtocol::Tcp,
            action,
            enabled,
            created_at: chrono::Utc::now(),
        }
    }
}

/// User-entered rule fields, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDraft {
    pub name: String,
    pub source: String,
    pub destination: String,
    pub port: String,
    pub protocol: RuleProtocol,
    pub action: RuleAction,
}

impl RuleDraft {
    /// Pre-fills a draft from an existing rule, for editing
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            name: rule.name.clone(),
            source: rule.source.clone(),
            destination: rule.destination.clone(),
            port: rule.port.clone(),
            protocol: rule.protocol,
            action: rule.action,
        }
    }

    /// Parses the one-line form typed at the monitor prompt:
    /// `name, port[, protocol[, action[, source[, destination]]]]`.
    ///
    /// Omitted or empty trailing fields default to TCP, allow and [`ANY`].
    /// The result still needs [`RuleDraft::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown protocol or action, or
    /// more than six fields.
    pub fn parse_line(line: &str) -> Result<Self> {
        let mut fields = line.split(',').map(str::trim);
        let name = fields.next().unwrap_or_default().to_string();
        let port = fields.next().unwrap_or_default().to_string();
        let protocol = match fields.next() {
            Some(value) if !value.is_empty() => value.parse::<RuleProtocol>().map_err(|_| {
                Error::validation("protocol", format!("unknown protocol '{value}'"))
            })?,
            _ => RuleProtocol::default(),
        };
        let action = match fields.next() {
            Some(value) if !value.is_empty() => value.parse::<RuleAction>().map_err(|_| {
                Error::validation("action", format!("unknown action '{value}'"))
            })?,
            _ => RuleAction::default(),
        };
        let mut address = || fields.next().filter(|v| !v.is_empty()).unwrap_or(ANY).to_string();
        let source = address();
        let destination = address();
        if fields.next().is_some() {
            return Err(Error::validation("rule", "too many fields"));
        }

        Ok(Self {
            name,
            source,
            destination,
            port,
            protocol,
            action,
        })
    }

    /// Formats the draft in the form read by [`RuleDraft::parse_line`]
    pub fn to_line(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}, {}",
            self.name, self.port, self.protocol, self.action, self.source, self.destination
        )
    }

    /// Validates every required field and returns the cleaned draft.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(self) -> Result<Self> {
        let name = validators::validate_label(&self.name)
            .map_err(|message| Error::validation("name", message))?;
        let source = required("source", &self.source)?;
        let destination = required("destination", &self.destination)?;
        let port = required("port", &self.port)?;

        Ok(Self {
            name,
            source,
            destination,
            port,
            ..self
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    validators::require(value)
        .map(str::to_string)
        .map_err(|message| Error::validation(field, message))
}

/// Ordered rule table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The four demonstration rules shown on first launch
    pub fn with_defaults() -> Self {
        Self {
            rules: vec![
                Rule::seed("Allow HTTP", ANY, "192.168.1.10", "80", RuleAction::Allow, true),
                Rule::seed("Block Telnet", ANY, ANY, "23", RuleAction::Deny, true),
                Rule::seed(
                    "Allow SSH",
                    "192.168.1.0/24",
                    "192.168.1.5",
                    "22",
                    RuleAction::Allow,
                    true,
                ),
                Rule::seed("Block FTP", ANY, ANY, "21", RuleAction::Deny, false),
            ],
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.rules.iter().position(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.rules.iter().filter(|r| r.enabled).count()
    }
}

/// Rule table plus undo/redo history
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    ruleset: RuleSet,
    history: CommandHistory,
}

impl RuleStore {
    pub fn new(ruleset: RuleSet) -> Self {
        Self {
            ruleset,
            history: CommandHistory::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RuleSet::with_defaults())
    }

    pub fn rules(&self) -> &RuleSet {
        &self.ruleset
    }

    /// Validates `draft` and appends it as a new enabled rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid draft or a full table.
    pub fn add(&mut self, draft: RuleDraft) -> Result<Uuid> {
        if self.ruleset.len() >= MAX_RULES {
            return Err(Error::validation(
                "rules",
                format!("rule limit of {MAX_RULES} reached"),
            ));
        }
        let rule = Rule::from_draft(draft.validate()?);
        let id = rule.id;
        tracing::info!(rule = %rule.name, "Adding rule");
        self.history.execute(RuleEdit::Add { rule }, &mut self.ruleset);
        Ok(id)
    }

    /// Replaces the editable fields of rule `id`, keeping its id, enabled
    /// flag and creation time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid draft or unknown id.
    pub fn update(&mut self, id: Uuid, draft: RuleDraft) -> Result<()> {
        let draft = draft.validate()?;
        let old_rule = self.ruleset.get(id).cloned().ok_or_else(|| unknown(id))?;
        let after = Rule {
            name: draft.name,
            source: draft.source,
            destination: draft.destination,
            port: draft.port,
            protocol: draft.protocol,
            action: draft.action,
            ..old_rule.clone()
        };
        tracing::info!(rule = %after.name, "Updating rule");
        self.history.execute(
            RuleEdit::Update {
                before: old_rule,
                after,
            },
            &mut self.ruleset,
        );
        Ok(())
    }

    /// Removes rule `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown id.
    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let index = self.ruleset.position(id).ok_or_else(|| unknown(id))?;
        let rule = self.ruleset.rules[index].clone();
        tracing::info!(rule = %rule.name, "Deleting rule");
        self.history
            .execute(RuleEdit::Delete { rule, index }, &mut self.ruleset);
        Ok(())
    }

    /// Flips the enabled flag of rule `id` and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown id.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool> {
        let was_enabled = self.ruleset.get(id).ok_or_else(|| unknown(id))?.enabled;
        self.history.execute(
            RuleEdit::Toggle { id, was_enabled },
            &mut self.ruleset,
        );
        Ok(!was_enabled)
    }

    /// Reverts the last change; returns its description
    pub fn undo(&mut self) -> Option<String> {
        self.history.undo(&mut self.ruleset)
    }

    /// Re-applies the last undone change; returns its description
    pub fn redo(&mut self) -> Option<String> {
        self.history.redo(&mut self.ruleset)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }
}

fn unknown(id: Uuid) -> Error {
    Error::validation("id", format!("no rule with id {id}"))
}
