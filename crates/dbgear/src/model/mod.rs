//! In-memory model of projects, schemas, environments, and fixtures.
//!
//! All entities are created by loading their YAML artifact and validated on
//! construction; mutations go through each entity's save path. The apply
//! engine treats loaded entities as read-only snapshots for a run.
//!
//! YAML files key child entities by name; loaders copy the mapping key back
//! into each entity's identifying field so the value never duplicates it.

pub mod column;
pub mod column_type;
pub mod datamodel;
pub mod environ;
pub mod index;
pub mod mapping;
pub mod notes;
pub mod procedure;
pub mod project;
pub mod relation;
pub mod schema;
pub mod table;
pub mod tenant;
pub mod trigger;
pub mod view;

pub use column::Column;
pub use column_type::{parse_column_type, ColumnType, ColumnTypeItem, ColumnTypeRegistry};
pub use datamodel::{DataModel, DataType, SyncMode};
pub use environ::{Environ, EnvironManager};
pub use index::Index;
pub use mapping::{Mapping, MappingManager};
pub use notes::Note;
pub use procedure::{ParamDirection, Procedure, ProcedureParameter, SecurityType};
pub use project::Project;
pub use relation::{BindColumn, EntityRef, Relation};
pub use schema::{Schema, SchemaManager};
pub use table::{DialectOptions, Table};
pub use tenant::{DatabaseInfo, TenantConfig, TenantRegistry};
pub use trigger::{Trigger, TriggerEvent, TriggerTiming};
pub use view::View;
