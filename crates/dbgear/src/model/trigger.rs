//! Trigger definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::notes::Note;

/// When the trigger fires relative to the triggering statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    #[serde(rename = "BEFORE")]
    Before,
    #[serde(rename = "AFTER")]
    After,
    #[serde(rename = "INSTEAD OF")]
    InsteadOf,
}

impl fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
            TriggerTiming::InsteadOf => "INSTEAD OF",
        };
        f.write_str(s)
    }
}

/// The statement kind the trigger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A database trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(skip)]
    pub trigger_name: String,

    pub display_name: String,

    /// The table the trigger is attached to.
    pub table_name: String,

    pub timing: TriggerTiming,
    pub event: TriggerEvent,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    pub body: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_and_event_yaml_forms() {
        let trigger: Trigger = serde_yaml::from_str(
            "display_name: Audit\ntable_name: users\ntiming: BEFORE\nevent: UPDATE\nbody: SET NEW.updated_at = NOW()\n",
        )
        .unwrap();
        assert_eq!(trigger.timing, TriggerTiming::Before);
        assert_eq!(trigger.event, TriggerEvent::Update);
        assert_eq!(trigger.timing.to_string(), "BEFORE");
        assert_eq!(trigger.event.to_string(), "UPDATE");
    }

    #[test]
    fn test_instead_of_round_trip() {
        let yaml = "display_name: T\ntable_name: v\ntiming: INSTEAD OF\nevent: DELETE\nbody: BEGIN END\n";
        let trigger: Trigger = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(trigger.timing, TriggerTiming::InsteadOf);
        let out = serde_yaml::to_string(&trigger).unwrap();
        assert!(out.contains("INSTEAD OF"));
    }
}
