//! Error types for the schema-apply library.

use thiserror::Error;

/// Main error type for schema-apply operations.
#[derive(Error, Debug)]
pub enum DbGearError {
    /// Configuration error (invalid YAML, missing fields, absent files, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An entity with the same key already exists.
    #[error("Entity already exists: {0}")]
    EntityExists(String),

    /// The requested entity does not exist.
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// An entity cannot be removed because dependent artifacts remain.
    #[error("Entity removal failed: {0}")]
    EntityRemoval(String),

    /// Model invariant violations, aggregated across the offending entity.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Cycle detected in explicit data-model dependencies.
    #[error("Circular dependency detected: {0}")]
    Cycle(String),

    /// Any failure surfaced by the database driver.
    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    /// Patch file invalid, denylisted token, or target mismatch.
    #[error("Patch error: {0}")]
    Patch(String),

    /// Unknown template or missing context field (programmer error).
    #[error("Template error: {0}")]
    Template(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbGearError {
    /// Create a Validation error from a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        DbGearError::Validation(vec![message.into()])
    }

    /// Process exit code for this error. Everything maps to a generic
    /// failure; success is reported by the absence of an error.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for schema-apply operations.
pub type Result<T> = std::result::Result<T, DbGearError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_aggregates_messages() {
        let err = DbGearError::Validation(vec![
            "column a: gap in primary key positions".to_string(),
            "column b: auto_increment requires primary key".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.contains("gap in primary key"));
        assert!(text.contains("auto_increment requires"));
    }

    #[test]
    fn test_exit_code_is_generic_failure() {
        assert_eq!(DbGearError::Config("x".into()).exit_code(), 1);
        assert_eq!(DbGearError::Cycle("a -> b -> a".into()).exit_code(), 1);
    }

    #[test]
    fn test_format_detailed_includes_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = DbGearError::from(io);
        let text = err.format_detailed();
        assert!(text.starts_with("Error: IO error"));
    }
}
