//! # dbgear
//!
//! Declarative MySQL database lifecycle management from YAML artifacts.
//!
//! A project folder describes schemas (tables, views, triggers, procedures,
//! indexes, relations) and per-environment data fixtures; the apply engine
//! brings a target database to the described state:
//!
//! - **Schema composition** of project- and environment-level schemas per mapping
//! - **Deterministic DDL reconciliation** (create, or backup + drop + create)
//! - **Fixture loading** ordered by explicit + foreign-key dependencies
//! - **Backup/restore policy** preserving live rows across destructive DDL
//!
//! ## Example
//!
//! ```rust,no_run
//! use dbgear::{apply, ApplyMode, ApplyOptions, Project};
//!
//! #[tokio::main]
//! async fn main() -> dbgear::Result<()> {
//!     let project = Project::load("database")?;
//!     let options = ApplyOptions {
//!         mode: Some(ApplyMode::Drop),
//!         ..Default::default()
//!     };
//!     apply(&project, "dev", None, "local", &options).await?;
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod datasource;
pub mod dbio;
pub mod error;
pub mod importer;
pub mod model;
pub mod resolver;
pub mod template;

// Re-exports for convenient access
pub use apply::patch::Patch;
pub use apply::{apply, ApplyMode, ApplyOptions, Operation};
pub use datasource::{DataSource, Row, RowValue, SourceRegistry};
pub use error::{DbGearError, Result};
pub use model::environ::{Environ, EnvironManager};
pub use model::mapping::{Mapping, MappingManager};
pub use model::project::Project;
pub use model::schema::{Schema, SchemaManager};
pub use resolver::DependencyResolver;
pub use template::TemplateRegistry;
