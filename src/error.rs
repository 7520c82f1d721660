//! Structured Error Handling for entail
//!
//! Provides a unified error type hierarchy with:
//! - Error codes for programmatic handling
//! - Structured error responses (JSON-friendly)
//! - Context preservation through error chains
//! - HTTP status code mapping
//!
//! # Error Categories
//!
//! - `ParseError` - Syntax errors in statement texts
//! - `DeclarationConflict` - A name demanded as two incompatible kinds
//! - `EvaluationError` - A statement cannot be evaluated against the symbol table
//! - `SolverError` - Decision engine failures and timeouts
//! - `CacheError` - Verdict cache I/O (always degraded to a miss, never fatal)
//! - `ValidationError` - Input validation failures
//! - `ConfigError` - Configuration issues
//!
//! # Example
//!
//! ```rust,ignore
//! use entail::error::{EntailError, ErrorCode};
//!
//! fn check_premises(premises: &[String]) -> Result<(), EntailError> {
//!     if premises.is_empty() {
//!         return Err(EntailError::empty_input("premises"));
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Parse errors (1xxx)
    /// Generic parse error
    ParseError = 1000,
    /// Unexpected token in a statement
    UnexpectedToken = 1001,
    /// Unexpected end of input
    UnexpectedEof = 1002,
    /// Malformed numeric literal
    InvalidNumber = 1003,
    /// Malformed quantifier binding list
    InvalidBinding = 1004,

    // Declaration errors (2xxx)
    /// Generic declaration error
    DeclarationError = 2000,
    /// A name demanded as both Individual and Relation
    DeclarationConflict = 2001,
    /// Relation used with varying argument counts (non-fatal warning)
    ArityAmbiguity = 2002,
    /// Unparseable type hint
    InvalidHint = 2003,

    // Evaluation errors (3xxx)
    /// Generic evaluation error
    EvaluationError = 3000,
    /// Name not present in the symbol table
    UnboundName = 3001,
    /// Relation applied with the wrong number of arguments
    ArityMismatch = 3002,
    /// Operator not part of the formula language
    UnknownOperator = 3003,
    /// Operand sort does not match the operator
    SortMismatch = 3004,

    // Solver errors (4xxx)
    /// Generic solver error
    SolverError = 4000,
    /// Decision engine cannot be reached
    SolverUnavailable = 4001,
    /// Decision procedure exceeded its resource bounds
    SolverTimeout = 4002,
    /// Formula outside the engine's supported fragment
    UnsupportedFormula = 4003,

    // Cache errors (5xxx)
    /// Generic cache error
    CacheError = 5000,
    /// Cache storage cannot be opened or written
    CacheUnavailable = 5001,
    /// Cached verdict failed to deserialize
    CacheCorrupt = 5002,

    // Validation errors (6xxx)
    /// Generic validation error
    ValidationError = 6000,
    /// Empty input
    EmptyInput = 6001,
    /// Input too large
    InputTooLarge = 6002,
    /// Missing required field
    MissingRequired = 6003,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,
    /// Config file not found
    ConfigNotFound = 7001,
    /// Invalid config syntax
    InvalidConfigSyntax = 7002,
    /// Invalid config value
    InvalidConfigValue = 7003,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
    /// Unexpected state
    UnexpectedState = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::UnexpectedToken => "Unexpected token",
            ErrorCode::UnexpectedEof => "Unexpected end of input",
            ErrorCode::InvalidNumber => "Malformed numeric literal",
            ErrorCode::InvalidBinding => "Malformed quantifier binding list",

            ErrorCode::DeclarationError => "Declaration error",
            ErrorCode::DeclarationConflict => "Conflicting declaration",
            ErrorCode::ArityAmbiguity => "Ambiguous relation arity",
            ErrorCode::InvalidHint => "Invalid type hint",

            ErrorCode::EvaluationError => "Evaluation error",
            ErrorCode::UnboundName => "Unbound name",
            ErrorCode::ArityMismatch => "Arity mismatch",
            ErrorCode::UnknownOperator => "Unknown operator",
            ErrorCode::SortMismatch => "Sort mismatch",

            ErrorCode::SolverError => "Solver error",
            ErrorCode::SolverUnavailable => "Solver unavailable",
            ErrorCode::SolverTimeout => "Solver timeout",
            ErrorCode::UnsupportedFormula => "Unsupported formula",

            ErrorCode::CacheError => "Cache error",
            ErrorCode::CacheUnavailable => "Cache unavailable",
            ErrorCode::CacheCorrupt => "Corrupt cache entry",

            ErrorCode::ValidationError => "Validation error",
            ErrorCode::EmptyInput => "Empty input",
            ErrorCode::InputTooLarge => "Input too large",
            ErrorCode::MissingRequired => "Missing required field",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            ErrorCode::InternalError => "Internal error",
            ErrorCode::UnexpectedState => "Unexpected state",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            // Parse/declaration/validation errors -> 400 Bad Request
            ErrorCode::ParseError
            | ErrorCode::UnexpectedToken
            | ErrorCode::UnexpectedEof
            | ErrorCode::InvalidNumber
            | ErrorCode::InvalidBinding
            | ErrorCode::DeclarationError
            | ErrorCode::DeclarationConflict
            | ErrorCode::ArityAmbiguity
            | ErrorCode::InvalidHint
            | ErrorCode::ValidationError
            | ErrorCode::EmptyInput
            | ErrorCode::MissingRequired => 400,

            // Payload too large
            ErrorCode::InputTooLarge => 413,

            // Unprocessable entity (statement rejected during evaluation)
            ErrorCode::EvaluationError
            | ErrorCode::UnboundName
            | ErrorCode::ArityMismatch
            | ErrorCode::UnknownOperator
            | ErrorCode::SortMismatch
            | ErrorCode::UnsupportedFormula => 422,

            // Timeout
            ErrorCode::SolverTimeout => 408,

            // Not found
            ErrorCode::ConfigNotFound => 404,

            // Internal server errors
            ErrorCode::SolverError
            | ErrorCode::SolverUnavailable
            | ErrorCode::CacheError
            | ErrorCode::CacheUnavailable
            | ErrorCode::CacheCorrupt
            | ErrorCode::ConfigError
            | ErrorCode::InvalidConfigSyntax
            | ErrorCode::InvalidConfigValue
            | ErrorCode::InternalError
            | ErrorCode::UnexpectedState => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Offending statement, when the error is statement-scoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    /// Stack of error causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for entail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntailError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl EntailError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
        }
    }

    // ========================================================================
    // Factory methods for common error types
    // ========================================================================

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Create a declaration conflict error
    pub fn conflict(name: &str, wanted: &str, existing: &str) -> Self {
        Self::new(
            ErrorCode::DeclarationConflict,
            format!("'{}' declared as {} but already registered as {}", name, wanted, existing),
        )
    }

    /// Create an evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EvaluationError, message)
    }

    /// Create an unbound-name error
    pub fn unbound(name: &str) -> Self {
        Self::new(ErrorCode::UnboundName, format!("'{}' is not declared", name))
    }

    /// Create an arity mismatch error
    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorCode::ArityMismatch,
            format!("'{}' expects {} argument(s), got {}", name, expected, got),
        )
    }

    /// Create a solver error
    pub fn solver(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SolverError, message)
    }

    /// Create a solver timeout error
    pub fn solver_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SolverTimeout, message)
    }

    /// Create a cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheUnavailable, message)
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Create an empty input error
    pub fn empty_input(field: &str) -> Self {
        Self::new(ErrorCode::EmptyInput, format!("{} cannot be empty", field))
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Attach the offending statement
    pub fn in_statement(mut self, statement: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.statement = Some(statement.into());
        self
    }

    /// Add a cause to the error chain
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.causes.push(cause.into());
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        let status = self.http_status();
        (400..500).contains(&status)
    }

    /// The statement this error is scoped to, if any
    pub fn statement(&self) -> Option<&str> {
        self.context.as_ref().and_then(|c| c.statement.as_deref())
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }
}

impl fmt::Display for EntailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(ref ctx) = self.context {
            if let Some(ref stmt) = ctx.statement {
                write!(f, " in statement `{}`", stmt)?;
            }
            if !ctx.causes.is_empty() {
                write!(f, "\nCaused by:")?;
                for cause in &ctx.causes {
                    write!(f, "\n  - {}", cause)?;
                }
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for EntailError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for EntailError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let code = match err.kind() {
            ErrorKind::NotFound => ErrorCode::ConfigNotFound,
            ErrorKind::TimedOut => ErrorCode::SolverTimeout,
            _ => ErrorCode::InternalError,
        };
        EntailError::new(code, err.to_string())
    }
}

impl From<rusqlite::Error> for EntailError {
    fn from(err: rusqlite::Error) -> Self {
        EntailError::cache(err.to_string())
    }
}

impl From<serde_json::Error> for EntailError {
    fn from(err: serde_json::Error) -> Self {
        EntailError::parse(err.to_string()).with_context("format", "JSON")
    }
}

impl From<toml::de::Error> for EntailError {
    fn from(err: toml::de::Error) -> Self {
        EntailError::config(err.to_string()).with_code(ErrorCode::InvalidConfigSyntax)
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using EntailError
pub type EntailResult<T> = Result<T, EntailError>;

// ============================================================================
// Error response for HTTP APIs
// ============================================================================

/// Structured error response for HTTP APIs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error indicator
    pub error: bool,
    /// Error code (string form)
    pub code: String,
    /// Numeric error code
    pub code_num: u32,
    /// HTTP status code
    pub status: u16,
    /// Error message
    pub message: String,
    /// Additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    /// Hint for resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl From<&EntailError> for ErrorResponse {
    fn from(err: &EntailError) -> Self {
        Self {
            error: true,
            code: format!("{:?}", err.code),
            code_num: err.code.code(),
            status: err.http_status(),
            message: err.message.clone(),
            details: err.context.as_ref().map(|c| c.fields.clone()),
            hint: err.hint.clone(),
        }
    }
}

impl From<EntailError> for ErrorResponse {
    fn from(err: EntailError) -> Self {
        Self::from(&err)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EntailError::validation("test error");
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.message, "test error");
    }

    #[test]
    fn test_conflict_factory() {
        let err = EntailError::conflict("s", "Relation", "Individual");
        assert_eq!(err.code, ErrorCode::DeclarationConflict);
        assert!(err.message.contains("'s'"));
        assert!(err.message.contains("Individual"));
    }

    #[test]
    fn test_error_in_statement() {
        let err = EntailError::evaluation("unknown operator")
            .in_statement("Frobnicate(x)");
        assert_eq!(err.statement(), Some("Frobnicate(x)"));
        assert!(err.to_string().contains("Frobnicate(x)"));
    }

    #[test]
    fn test_error_with_context() {
        let err = EntailError::parse("unexpected token")
            .with_context("position", "7")
            .with_context("token", ")");

        let ctx = err.context.as_ref().unwrap();
        assert_eq!(ctx.fields.get("position"), Some(&"7".to_string()));
        assert_eq!(ctx.fields.get("token"), Some(&")".to_string()));
    }

    #[test]
    fn test_error_http_status() {
        assert_eq!(EntailError::validation("x").http_status(), 400);
        assert_eq!(EntailError::conflict("a", "b", "c").http_status(), 400);
        assert_eq!(EntailError::evaluation("x").http_status(), 422);
        assert_eq!(EntailError::solver_timeout("x").http_status(), 408);
        assert_eq!(EntailError::cache("x").http_status(), 500);
    }

    #[test]
    fn test_error_is_client_error() {
        assert!(EntailError::validation("x").is_client_error());
        assert!(!EntailError::internal("x").is_client_error());
    }

    #[test]
    fn test_arity_mismatch_message() {
        let err = EntailError::arity_mismatch("Parent", 2, 3);
        assert_eq!(err.code, ErrorCode::ArityMismatch);
        assert!(err.message.contains("2 argument(s)"));
        assert!(err.message.contains("got 3"));
    }

    #[test]
    fn test_error_to_json() {
        let err = EntailError::validation("test error");
        let json = err.to_json();
        assert!(json.contains("VALIDATION_ERROR") || json.contains("ValidationError"));
        assert!(json.contains("test error"));
    }

    #[test]
    fn test_error_response_from_error() {
        let err = EntailError::evaluation("bad statement")
            .with_context("statement_index", "1");

        let resp = ErrorResponse::from(&err);
        assert!(resp.error);
        assert_eq!(resp.status, 422);
        assert_eq!(resp.message, "bad statement");
        assert!(resp.details.is_some());
    }

    #[test]
    fn test_error_display_with_hint() {
        let err = EntailError::empty_input("premises")
            .with_hint("Supply at least one premise");

        let display = err.to_string();
        assert!(display.contains("[6001]"));
        assert!(display.contains("premises"));
        assert!(display.contains("Supply at least one premise"));
    }
}
