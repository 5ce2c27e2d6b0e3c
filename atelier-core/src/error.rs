//! Error types for the Atelier core library.
//!
//! Every fallible operation in the crate returns [`AtelierResult`]. Variants
//! carry a stable code so the dashboard and the CLI can report failures
//! consistently.
//!
//! # Error Codes Reference
//!
//! | Code Range | Category | Description |
//! |------------|----------|-------------|
//! | E1001-E1099 | Database | Connection, query, migration and transaction errors |
//! | E2001-E2099 | Config | Environment, config file, and validation errors |
//! | E3001-E3099 | Access | Missing caller identity, forbidden actions |
//! | E4001-E4099 | Thread | Unknown threads, workflow and constraint violations |
//! | E5001-E5099 | Message | Message validation errors |
//! | E6001-E6099 | Booking | Service catalog lookups |
//! | E9001-E9099 | General | IO, serialization and lookup errors |
//! | E11001-E11099 | Hook | Hook registration, execution, and timeout errors |

use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::models::ThreadStatus;

/// The main error type for the Atelier core library.
#[derive(Debug, Error)]
pub enum AtelierError {
    // ========================================================================
    // Database Errors (E1001-E1099)
    // ========================================================================
    #[error("[E1001] Database connection failed: {message}")]
    DatabaseConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E1002] Database query failed: {0}")]
    DatabaseQueryFailed(String),

    #[error("[E1003] Database migration failed: {0}")]
    DatabaseMigrationFailed(String),

    #[error("[E1004] Database pool unavailable: {0}")]
    DatabasePoolUnavailable(String),

    #[error("[E1005] Database transaction failed: {0}")]
    DatabaseTransactionFailed(String),

    // ========================================================================
    // Configuration Errors (E2001-E2099)
    // ========================================================================
    #[error("[E2001] Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("[E2004] Failed to parse configuration: {0}")]
    ConfigParseError(String),

    #[error("[E2005] Invalid configuration value for '{key}': {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("[E2006] Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Access Errors (E3001-E3099)
    // ========================================================================
    /// No caller identity was resolved for the request.
    #[error("[E3001] Not authenticated")]
    NotAuthenticated,

    /// The caller is known but may not perform this action.
    #[error("[E3002] Forbidden: {0}")]
    Forbidden(String),

    // ========================================================================
    // Thread Errors (E4001-E4099)
    // ========================================================================
    #[error("[E4001] Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("[E4002] Invalid thread status transition from '{from}' to '{to}'")]
    InvalidStatusTransition { from: ThreadStatus, to: ThreadStatus },

    /// A structural rule of the thread model would be broken.
    #[error("[E4003] Constraint violation: {0}")]
    ConstraintViolation(String),

    // ========================================================================
    // Message Errors (E5001-E5099)
    // ========================================================================
    #[error("[E5001] Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // Booking Errors (E6001-E6099)
    // ========================================================================
    #[error("[E6001] Service not found: {0}")]
    ServiceNotFound(Uuid),

    // ========================================================================
    // General Errors (E9001-E9099)
    // ========================================================================
    #[error("[E9002] IO error: {0}")]
    IoError(String),

    #[error("[E9003] Serialization error: {0}")]
    SerializationError(String),

    #[error("[E9004] Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // Hook Errors (E11001-E11099)
    // ========================================================================
    #[error("[E11001] Hook error: {0}")]
    HookError(String),

    #[error("[E11002] Hook handler not found: {0}")]
    HookHandlerNotFound(String),

    #[error("[E11003] Hook execution failed for '{hook}': {message}")]
    HookExecutionFailed { hook: String, message: String },

    #[error("[E11004] Hook '{0}' timed out after {1} ms")]
    HookTimeout(String, u64),

    #[error("[E11005] Hook '{0}' was aborted: {1}")]
    HookAborted(String, String),
}

impl AtelierError {
    pub fn database_connection_failed(message: impl Into<String>) -> Self {
        AtelierError::DatabaseConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AtelierError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AtelierError::Forbidden(message.into())
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        AtelierError::ConstraintViolation(message.into())
    }
}

/// Result type alias for Atelier operations.
pub type AtelierResult<T> = Result<T, AtelierError>;

// ============================================================================
// From trait implementations for seamless error propagation
// ============================================================================

impl From<sqlx::Error> for AtelierError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => AtelierError::DatabasePoolUnavailable(err.to_string()),
            sqlx::Error::PoolClosed => {
                AtelierError::DatabasePoolUnavailable("Connection pool is closed".to_string())
            }
            sqlx::Error::RowNotFound => AtelierError::NotFound("Row not found".to_string()),
            sqlx::Error::Configuration(_) => {
                AtelierError::database_connection_failed(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                if db_err.is_check_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_unique_violation()
                {
                    AtelierError::ConstraintViolation(db_err.to_string())
                } else {
                    AtelierError::DatabaseQueryFailed(db_err.to_string())
                }
            }
            _ => AtelierError::DatabaseQueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AtelierError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AtelierError::DatabaseMigrationFailed(err.to_string())
    }
}

impl From<reqwest::Error> for AtelierError {
    fn from(err: reqwest::Error) -> Self {
        AtelierError::HookExecutionFailed {
            hook: "webhook".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AtelierError {
    fn from(err: serde_json::Error) -> Self {
        AtelierError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for AtelierError {
    fn from(err: std::io::Error) -> Self {
        AtelierError::IoError(err.to_string())
    }
}

impl From<config::ConfigError> for AtelierError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => AtelierError::InvalidConfigValue {
                key,
                message: "Key not found".to_string(),
            },
            config::ConfigError::FileParse { uri, cause } => AtelierError::ConfigParseError(
                format!("Failed to parse {}: {}", uri.unwrap_or_default(), cause),
            ),
            _ => AtelierError::ConfigParseError(err.to_string()),
        }
    }
}

impl From<crate::config::ConfigLoadError> for AtelierError {
    fn from(err: crate::config::ConfigLoadError) -> Self {
        match err {
            crate::config::ConfigLoadError::Config(e) => e.into(),
            crate::config::ConfigLoadError::MissingRequired(key) => {
                AtelierError::Config(format!("Missing required configuration: {}", key))
            }
            crate::config::ConfigLoadError::InvalidValue { key, message } => {
                AtelierError::InvalidConfigValue { key, message }
            }
            crate::config::ConfigLoadError::Io(e) => e.into(),
        }
    }
}

impl From<crate::db::DatabaseError> for AtelierError {
    fn from(err: crate::db::DatabaseError) -> Self {
        match err {
            crate::db::DatabaseError::MissingEnvVar(name) => AtelierError::MissingEnvVar(name),
            crate::db::DatabaseError::ConnectionFailed(e) => {
                AtelierError::database_connection_failed(e.to_string())
            }
            crate::db::DatabaseError::MigrationFailed(e) => {
                AtelierError::DatabaseMigrationFailed(e.to_string())
            }
            crate::db::DatabaseError::InvalidConfig(msg) => AtelierError::InvalidConfigValue {
                key: "database".to_string(),
                message: msg,
            },
        }
    }
}

// ============================================================================
// Error categorization helpers
// ============================================================================

impl AtelierError {
    /// Errors the caller caused and can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AtelierError::NotAuthenticated
                | AtelierError::Forbidden(_)
                | AtelierError::ThreadNotFound(_)
                | AtelierError::InvalidStatusTransition { .. }
                | AtelierError::ConstraintViolation(_)
                | AtelierError::Validation(_)
                | AtelierError::ServiceNotFound(_)
                | AtelierError::NotFound(_)
        )
    }

    /// The store may succeed if the caller resubmits. Nothing here retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AtelierError::DatabasePoolUnavailable(_)
                | AtelierError::DatabaseConnectionFailed { .. }
                | AtelierError::HookTimeout(_, _)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AtelierError::DatabaseConnectionFailed { .. } => "E1001",
            AtelierError::DatabaseQueryFailed(_) => "E1002",
            AtelierError::DatabaseMigrationFailed(_) => "E1003",
            AtelierError::DatabasePoolUnavailable(_) => "E1004",
            AtelierError::DatabaseTransactionFailed(_) => "E1005",
            AtelierError::MissingEnvVar(_) => "E2001",
            AtelierError::ConfigParseError(_) => "E2004",
            AtelierError::InvalidConfigValue { .. } => "E2005",
            AtelierError::Config(_) => "E2006",
            AtelierError::NotAuthenticated => "E3001",
            AtelierError::Forbidden(_) => "E3002",
            AtelierError::ThreadNotFound(_) => "E4001",
            AtelierError::InvalidStatusTransition { .. } => "E4002",
            AtelierError::ConstraintViolation(_) => "E4003",
            AtelierError::Validation(_) => "E5001",
            AtelierError::ServiceNotFound(_) => "E6001",
            AtelierError::IoError(_) => "E9002",
            AtelierError::SerializationError(_) => "E9003",
            AtelierError::NotFound(_) => "E9004",
            AtelierError::HookError(_) => "E11001",
            AtelierError::HookHandlerNotFound(_) => "E11002",
            AtelierError::HookExecutionFailed { .. } => "E11003",
            AtelierError::HookTimeout(_, _) => "E11004",
            AtelierError::HookAborted(_, _) => "E11005",
        }
    }

    pub fn user_suggestion(&self) -> Option<&'static str> {
        match self {
            AtelierError::DatabaseConnectionFailed { .. } => {
                Some("Check that PostgreSQL is running and DATABASE_URL is correct")
            }
            AtelierError::DatabasePoolUnavailable(_) => {
                Some("The database is busy. Try again in a few seconds")
            }
            AtelierError::MissingEnvVar(_) => {
                Some("Create a .env file or set the environment variable")
            }
            AtelierError::NotAuthenticated => Some("Sign in again and retry the action"),
            AtelierError::ThreadNotFound(_) => {
                Some("Run 'atelier inbox --archived all' to list every thread")
            }
            AtelierError::InvalidStatusTransition { .. } => {
                Some("Statuses only move forward; resolved threads cannot be reopened")
            }
            AtelierError::ServiceNotFound(_) => {
                Some("Pick a service that is still offered in the catalog")
            }
            _ => None,
        }
    }
}

// ============================================================================
// User-friendly error formatting for CLI
// ============================================================================

pub struct CliErrorDisplay<'a> {
    error: &'a AtelierError,
}

impl<'a> CliErrorDisplay<'a> {
    pub fn new(error: &'a AtelierError) -> Self {
        Self { error }
    }
}

impl<'a> fmt::Display for CliErrorDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.error)?;

        if let Some(suggestion) = self.error.user_suggestion() {
            writeln!(f)?;
            writeln!(f, "  Suggestion: {}", suggestion)?;
        }

        if self.error.is_transient() {
            writeln!(f)?;
            writeln!(f, "  This error may be temporary. Resubmit the request.")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_code() {
        let err = AtelierError::NotAuthenticated;
        assert!(err.to_string().contains("E3001"));

        let id = Uuid::new_v4();
        let err = AtelierError::ThreadNotFound(id);
        assert!(err.to_string().contains("E4001"));
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_transition_error_names_both_states() {
        let err = AtelierError::InvalidStatusTransition {
            from: ThreadStatus::Resolved,
            to: ThreadStatus::Approved,
        };
        let text = err.to_string();
        assert!(text.contains("'resolved'"));
        assert!(text.contains("'approved'"));
        assert_eq!(err.error_code(), "E4002");
    }

    #[test]
    fn test_error_categorization() {
        assert!(AtelierError::validation("empty").is_client_error());
        assert!(AtelierError::NotAuthenticated.is_client_error());
        assert!(!AtelierError::DatabaseQueryFailed("x".into()).is_client_error());
        assert!(!AtelierError::validation("empty").is_transient());
        assert!(AtelierError::DatabasePoolUnavailable("busy".into()).is_transient());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AtelierError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AtelierError::NotFound(_)));
    }

    #[test]
    fn test_cli_error_display() {
        let err = AtelierError::NotAuthenticated;
        let shown = CliErrorDisplay::new(&err).to_string();
        assert!(shown.contains("E3001"));
        assert!(shown.contains("Suggestion"));

        let busy = AtelierError::DatabasePoolUnavailable("busy".into());
        assert!(CliErrorDisplay::new(&busy).to_string().contains("temporary"));

        let plain = AtelierError::Validation("empty".into());
        assert!(!CliErrorDisplay::new(&plain).to_string().contains("Suggestion"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AtelierError = io.into();
        assert!(matches!(err, AtelierError::IoError(_)));
    }
}
