//! Free-form review notes attached to schema entities.

use serde::{Deserialize, Serialize};

/// A note attached to a schema, table, column, or other entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub checked: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_defaults_false_and_is_omitted() {
        let note: Note = serde_yaml::from_str("title: review\ncontent: check charset\n").unwrap();
        assert!(!note.checked);

        let yaml = serde_yaml::to_string(&note).unwrap();
        assert!(!yaml.contains("checked"));
    }
}
