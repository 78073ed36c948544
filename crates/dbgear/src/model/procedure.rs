//! Stored procedure and function definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::notes::Note;

/// Parameter passing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamDirection {
    In,
    Out,
    Inout,
}

impl fmt::Display for ParamDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamDirection::In => "IN",
            ParamDirection::Out => "OUT",
            ParamDirection::Inout => "INOUT",
        };
        f.write_str(s)
    }
}

impl Default for ParamDirection {
    fn default() -> Self {
        ParamDirection::In
    }
}

/// Routine security context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SecurityType {
    Definer,
    Invoker,
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecurityType::Definer => "DEFINER",
            SecurityType::Invoker => "INVOKER",
        };
        f.write_str(s)
    }
}

impl Default for SecurityType {
    fn default() -> Self {
        SecurityType::Definer
    }
}

/// One routine parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_in")]
    pub direction: ParamDirection,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

fn is_in(v: &ParamDirection) -> bool {
    *v == ParamDirection::In
}

/// A stored procedure or function; a present `return_type` makes it a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    #[serde(skip)]
    pub procedure_name: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ProcedureParameter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,

    pub body: String,

    #[serde(default = "default_language", skip_serializing_if = "is_sql")]
    pub language: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deterministic: bool,

    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub reads_sql_data: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub modifies_sql_data: bool,

    #[serde(default, skip_serializing_if = "is_definer")]
    pub security_type: SecurityType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

fn default_language() -> String {
    "SQL".to_string()
}

fn is_sql(v: &str) -> bool {
    v == "SQL"
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_definer(v: &SecurityType) -> bool {
    *v == SecurityType::Definer
}

impl Procedure {
    /// True when this routine is a function (has a return type).
    pub fn is_function(&self) -> bool {
        self.return_type.is_some()
    }
}
