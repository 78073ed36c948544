//! View definitions.

use serde::{Deserialize, Serialize};

use super::notes::Note;

/// A database view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    #[serde(skip)]
    pub view_name: String,

    pub display_name: String,

    pub select_statement: String,

    /// Tables or views this view reads from, declared explicitly so the
    /// engine can check they exist before creation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}
