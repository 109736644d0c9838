use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ModelError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPreset {
    #[default]
    Plain,
    Shopping,
    /// Entries can be claimed by a participant (who brings what)
    Potluck,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// Participants pick among fixed-duration slots
    #[default]
    Fixed,
    /// Participants paint a free-form availability grid
    Flexible,
}

/// What an object is. Determines which items it may hold and who may write them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Note {
        #[serde(default)]
        burn_after_reading: bool,
    },
    List {
        #[serde(default)]
        preset: ListPreset,
    },
    Poll {
        #[serde(default)]
        mode: PollMode,
    },
    Quiz,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    Entry,
    Vote,
    Question,
    Answer,
    Expense,
}

impl ItemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemRole::Entry => "entry",
            ItemRole::Vote => "vote",
            ItemRole::Question => "question",
            ItemRole::Answer => "answer",
            ItemRole::Expense => "expense",
        }
    }
}

impl FromStr for ItemRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(ItemRole::Entry),
            "vote" => Ok(ItemRole::Vote),
            "question" => Ok(ItemRole::Question),
            "answer" => Ok(ItemRole::Answer),
            "expense" => Ok(ItemRole::Expense),
            other => Err(ModelError::UnknownRole(other.to_string())),
        }
    }
}

impl Display for ItemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cleartext coordination fields the server may see and act on.
///
/// On append, `None` means "not set". On update, `None` means "leave unchanged".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Forbidden,
    Optional,
    /// Must be present when the item is created
    Required,
}

/// Write rules for one item role within one object kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRules {
    pub admin_only: bool,
    pub completed: FieldRule,
    pub claimed: FieldRule,
    pub position: FieldRule,
}

impl RoleRules {
    const fn participant(completed: FieldRule, claimed: FieldRule, position: FieldRule) -> Self {
        Self {
            admin_only: false,
            completed,
            claimed,
            position,
        }
    }

    const fn opaque() -> Self {
        Self::participant(FieldRule::Forbidden, FieldRule::Forbidden, FieldRule::Forbidden)
    }
}

fn check_field<T>(
    name: &'static str,
    rule: FieldRule,
    value: Option<T>,
    creating: bool,
) -> Result<(), ModelError> {
    match (rule, value.is_some()) {
        (FieldRule::Forbidden, true) => Err(ModelError::FieldNotAllowed(name)),
        (FieldRule::Required, false) if creating => Err(ModelError::FieldRequired(name)),
        _ => Ok(()),
    }
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Note { .. } => "note",
            ObjectKind::List { .. } => "list",
            ObjectKind::Poll { .. } => "poll",
            ObjectKind::Quiz => "quiz",
            ObjectKind::Group => "group",
        }
    }

    pub fn burn_after_reading(&self) -> bool {
        matches!(
            self,
            ObjectKind::Note {
                burn_after_reading: true
            }
        )
    }

    /// Rules for `role` under this kind, or `None` if the kind never holds that role
    pub fn rules_for(&self, role: ItemRole) -> Option<RoleRules> {
        use FieldRule::*;

        match (self, role) {
            (ObjectKind::Note { .. }, _) => None,
            (ObjectKind::List { preset }, ItemRole::Entry) => {
                let claimed = match preset {
                    ListPreset::Potluck => Optional,
                    ListPreset::Plain | ListPreset::Shopping => Forbidden,
                };
                Some(RoleRules::participant(Optional, claimed, Optional))
            }
            (ObjectKind::List { .. }, _) => None,
            (ObjectKind::Poll { .. }, ItemRole::Vote) => Some(RoleRules::opaque()),
            (ObjectKind::Poll { .. }, _) => None,
            (ObjectKind::Quiz, ItemRole::Question) => Some(RoleRules {
                admin_only: true,
                completed: Forbidden,
                claimed: Forbidden,
                position: Required,
            }),
            (ObjectKind::Quiz, ItemRole::Answer) => Some(RoleRules::opaque()),
            (ObjectKind::Quiz, _) => None,
            (ObjectKind::Group, ItemRole::Expense) => Some(RoleRules::opaque()),
            (ObjectKind::Group, _) => None,
        }
    }

    /// Validate cleartext fields for an item write and return the rules that applied
    pub fn validate_item(
        &self,
        role: ItemRole,
        fields: &ItemFields,
        creating: bool,
    ) -> Result<RoleRules, ModelError> {
        let rules = self
            .rules_for(role)
            .ok_or(ModelError::RoleNotAllowed(self.name(), role))?;

        check_field("completed", rules.completed, fields.completed, creating)?;
        check_field("claimed", rules.claimed, fields.claimed, creating)?;
        check_field("position", rules.position, fields.position, creating)?;

        Ok(rules)
    }
}
