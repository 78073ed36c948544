//! SQL template layer: a named-template registry producing dialect SQL
//! strings from model objects. Pure function of its inputs; no I/O.
//!
//! The registry is an explicit value owned by the apply engine rather than
//! a process-wide singleton, which keeps tests and future dialects
//! tractable. Bind variables (`:env`, `:table_name`, ...) are rendered as
//! placeholders and supplied separately by the executor.

pub mod mysql;

use std::collections::HashMap;

use crate::error::{DbGearError, Result};
use crate::model::index::Index;
use crate::model::procedure::Procedure;
use crate::model::relation::Relation;
use crate::model::table::Table;
use crate::model::trigger::Trigger;
use crate::model::view::View;

/// A template render function.
pub type TemplateFn = fn(&RenderContext) -> Result<String>;

/// Typed inputs for a render call. Templates pull the fields they need;
/// a missing required field is a programmer error and halts the run.
#[derive(Default)]
pub struct RenderContext<'a> {
    pub env: Option<&'a str>,
    pub database_name: Option<&'a str>,
    pub charset: Option<&'a str>,
    pub collation: Option<&'a str>,
    pub ymd: Option<&'a str>,

    pub table: Option<&'a Table>,
    pub index: Option<&'a Index>,
    pub index_pos: Option<usize>,
    pub relation: Option<&'a Relation>,
    pub view: Option<&'a View>,
    pub trigger: Option<&'a Trigger>,
    pub procedure: Option<&'a Procedure>,

    pub table_name: Option<&'a str>,
    pub view_name: Option<&'a str>,
    pub select_statement: Option<&'a str>,
    pub trigger_name: Option<&'a str>,
    pub procedure_name: Option<&'a str>,
    pub constraint_name: Option<&'a str>,
    pub index_name: Option<&'a str>,

    pub column_names: Option<&'a [String]>,
    pub value_placeholders: Option<&'a [String]>,
}

macro_rules! accessor {
    ($name:ident, $ty:ty) => {
        pub fn $name(&self) -> Result<$ty> {
            self.$name
                .ok_or_else(|| missing_field(stringify!($name)))
        }
    };
}

impl<'a> RenderContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    accessor!(env, &'a str);
    accessor!(database_name, &'a str);
    accessor!(ymd, &'a str);
    accessor!(table, &'a Table);
    accessor!(index, &'a Index);
    accessor!(index_pos, usize);
    accessor!(relation, &'a Relation);
    accessor!(view, &'a View);
    accessor!(trigger, &'a Trigger);
    accessor!(procedure, &'a Procedure);
    accessor!(table_name, &'a str);
    accessor!(view_name, &'a str);
    accessor!(select_statement, &'a str);
    accessor!(trigger_name, &'a str);
    accessor!(procedure_name, &'a str);
    accessor!(constraint_name, &'a str);
    accessor!(column_names, &'a [String]);
    accessor!(value_placeholders, &'a [String]);
}

fn missing_field(name: &str) -> DbGearError {
    DbGearError::Template(format!("missing context field '{}'", name))
}

/// Named-template registry for one SQL dialect.
pub struct TemplateRegistry {
    templates: HashMap<&'static str, TemplateFn>,
}

impl TemplateRegistry {
    pub(crate) fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// The MySQL dialect template set.
    pub fn mysql() -> Self {
        let mut registry = Self::empty();
        mysql::register(&mut registry);
        registry
    }

    pub(crate) fn add(&mut self, name: &'static str, template: TemplateFn) {
        self.templates.insert(name, template);
    }

    /// Render a named template against the context.
    pub fn render(&self, name: &str, ctx: &RenderContext) -> Result<String> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| DbGearError::Template(format!("unknown template '{}'", name)))?;
        template(ctx)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Join column names as quoted identifiers.
pub fn join_columns<I, S>(columns: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    columns
        .into_iter()
        .map(|c| quote_ident(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape a string literal by doubling single quotes.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
