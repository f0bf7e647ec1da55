// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy with stable error codes for the OCAN actor runtime.
//!
//! Every OCAN error carries an [`ErrorCode`] (a machine-readable, stable
//! string tag), a human-readable message, an optional cause chain, and
//! arbitrary key-value context. Use the builder returned by
//! [`OcanError::new`] to construct errors fluently. [`ErrorCode::category`]
//! tells callers at the JSON-RPC or HTTP boundary how to surface the error,
//! per the propagation policy in the design: domain errors are never
//! rewritten, only translated to a transport-appropriate shape.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCategory
// ---------------------------------------------------------------------------

/// Boundary behavior family an [`ErrorCode`] maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Inputs failed schema/constraint checks. JSON-RPC `InvalidParams`, HTTP 400.
    InvalidParams,
    /// Referenced entity, entity type, snapshot, or tool does not exist (or is
    /// tombstoned). JSON-RPC `InvalidParams`, HTTP 404.
    NotFound,
    /// `tools/call` named an unregistered tool. JSON-RPC `MethodNotFound`.
    MethodNotFound,
    /// Unknown throw from a handler, or a re-registration conflict.
    /// JSON-RPC `InternalError`, HTTP 500.
    InternalError,
    /// Write-once identity or protocol-version violation. Never retried.
    Permanent,
    /// `patch` upsert raced a concurrent writer; caller must re-read and retry.
    RetryRequired,
    /// A JSON-RPC call arrived before the MCP handshake completed.
    InvalidRequest,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidParams => "invalid_params",
            Self::NotFound => "not_found",
            Self::MethodNotFound => "method_not_found",
            Self::InternalError => "internal_error",
            Self::Permanent => "permanent",
            Self::RetryRequired => "retry_required",
            Self::InvalidRequest => "invalid_request",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Inputs failed schema/constraint checks.
    ParameterValidation,
    /// No entity type registered under the given name.
    EntityTypeNotFound,
    /// No entity exists under the given id.
    EntityNotFound,
    /// No snapshot matches the requested valid-time or baseline.
    SnapshotNotFound,
    /// Read targeted a tombstoned entity.
    EntityDeleted,
    /// `(name, version)` already registered.
    EntityTypeAlreadyExists,
    /// A tool name was already registered.
    ToolAlreadyExists,
    /// `tools/call` named an unregistered tool.
    ToolNotFound,
    /// Catch-all wrapper for an unknown throw inside a tool handler.
    ToolExecution,
    /// A resource URI failed parsing or charset validation.
    InvalidUri,
    /// A stub/binding path failed validation.
    InvalidStubPath,
    /// A binding path segment was present without an instance segment.
    MissingInstanceName,
    /// Binding resolution matched more than one candidate.
    MultipleBindingsFound,
    /// A write-once identity field was assigned a conflicting value.
    IdentityConflict,
    /// The callee does not support the envelope's `version`.
    EnvelopeVersionMismatch,
    /// A `patch` upsert's `baseline` no longer matches the current snapshot.
    BaselineStale,
    /// A JSON-RPC method other than `initialize` arrived before the MCP
    /// handshake completed.
    InitializationRequired,
}

impl ErrorCode {
    /// Returns the boundary behavior family this code belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ParameterValidation => ErrorCategory::InvalidParams,

            Self::EntityTypeNotFound
            | Self::EntityNotFound
            | Self::SnapshotNotFound
            | Self::EntityDeleted => ErrorCategory::NotFound,

            Self::EntityTypeAlreadyExists | Self::ToolAlreadyExists | Self::ToolExecution => {
                ErrorCategory::InternalError
            }

            Self::ToolNotFound => ErrorCategory::MethodNotFound,

            Self::InvalidUri
            | Self::InvalidStubPath
            | Self::MissingInstanceName
            | Self::MultipleBindingsFound => ErrorCategory::InvalidParams,

            Self::IdentityConflict | Self::EnvelopeVersionMismatch => ErrorCategory::Permanent,

            Self::BaselineStale => ErrorCategory::RetryRequired,

            Self::InitializationRequired => ErrorCategory::InvalidRequest,
        }
    }

    /// Stable `&'static str` representation of the code (e.g.
    /// `"ENTITY_NOT_FOUND"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParameterValidation => "PARAMETER_VALIDATION",
            Self::EntityTypeNotFound => "ENTITY_TYPE_NOT_FOUND",
            Self::EntityNotFound => "ENTITY_NOT_FOUND",
            Self::SnapshotNotFound => "SNAPSHOT_NOT_FOUND",
            Self::EntityDeleted => "ENTITY_DELETED",
            Self::EntityTypeAlreadyExists => "ENTITY_TYPE_ALREADY_EXISTS",
            Self::ToolAlreadyExists => "TOOL_ALREADY_EXISTS",
            Self::ToolNotFound => "TOOL_NOT_FOUND",
            Self::ToolExecution => "TOOL_EXECUTION",
            Self::InvalidUri => "INVALID_URI",
            Self::InvalidStubPath => "INVALID_STUB_PATH",
            Self::MissingInstanceName => "MISSING_INSTANCE_NAME",
            Self::MultipleBindingsFound => "MULTIPLE_BINDINGS_FOUND",
            Self::IdentityConflict => "IDENTITY_CONFLICT",
            Self::EnvelopeVersionMismatch => "ENVELOPE_VERSION_MISMATCH",
            Self::BaselineStale => "BASELINE_STALE",
            Self::InitializationRequired => "INITIALIZATION_REQUIRED",
        }
    }

    /// JSON-RPC 2.0 error code this maps to at the `ocan-rpc` boundary.
    #[must_use]
    pub fn json_rpc_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::InvalidParams | ErrorCategory::NotFound | ErrorCategory::RetryRequired => {
                -32602
            }
            ErrorCategory::MethodNotFound => -32601,
            ErrorCategory::InvalidRequest => -32600,
            ErrorCategory::InternalError | ErrorCategory::Permanent => -32603,
        }
    }

    /// HTTP status code this maps to at an HTTP boundary (e.g. direct
    /// resource fetches); not-found categories map to 404 there even
    /// though the JSON-RPC boundary reports them as an in-band error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::EntityTypeNotFound
            | Self::EntityNotFound
            | Self::SnapshotNotFound
            | Self::EntityDeleted => 404,

            Self::ParameterValidation
            | Self::InvalidUri
            | Self::InvalidStubPath
            | Self::MissingInstanceName
            | Self::MultipleBindingsFound => 400,

            Self::BaselineStale => 409,

            Self::ToolNotFound => 404,

            Self::IdentityConflict | Self::EnvelopeVersionMismatch => 409,

            Self::EntityTypeAlreadyExists | Self::ToolAlreadyExists | Self::ToolExecution => 500,

            Self::InitializationRequired => 400,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OcanError
// ---------------------------------------------------------------------------

/// Unified OCAN error.
///
/// Carries a stable [`ErrorCode`], a human-readable message, an optional
/// source error for cause-chaining, and arbitrary structured context.
///
/// # Examples
///
/// ```
/// use ocan_error::{OcanError, ErrorCode};
///
/// let err = OcanError::new(ErrorCode::BaselineStale, "baseline no longer current")
///     .with_context("entity_id", "u1")
///     .with_context("baseline", "1970-01-01T00:00:00.000Z");
/// assert_eq!(err.code, ErrorCode::BaselineStale);
/// ```
pub struct OcanError {
    /// Machine-readable error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional underlying cause.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    /// Arbitrary structured context for diagnostics.
    pub context: BTreeMap<String, serde_json::Value>,
}

impl OcanError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    /// Attach a key-value pair to the diagnostic context.
    ///
    /// The value is converted via [`serde_json::to_value`]; if serialisation
    /// fails, the entry is silently skipped.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Shorthand for `self.code.category()`.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }
}

impl fmt::Debug for OcanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("OcanError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if let Some(ref src) = self.source {
            d.field("source", &src.to_string());
        }
        if !self.context.is_empty() {
            d.field("context", &self.context);
        }
        d.finish()
    }
}

impl fmt::Display for OcanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)?;
        if !self.context.is_empty() {
            // Deterministic output thanks to BTreeMap.
            if let Ok(ctx) = serde_json::to_string(&self.context) {
                write!(f, " {ctx}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for OcanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Convenience `Result` alias used throughout the OCAN crates.
pub type OcanResult<T> = Result<T, OcanError>;

// ---------------------------------------------------------------------------
// Serialization support
// ---------------------------------------------------------------------------

/// Serialisable snapshot of an [`OcanError`] (without the opaque source),
/// suitable for embedding in a JSON-RPC `error.data` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcanErrorDto {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Structured context.
    pub context: BTreeMap<String, serde_json::Value>,
    /// String representation of the source error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_message: Option<String>,
}

impl From<&OcanError> for OcanErrorDto {
    fn from(err: &OcanError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
            context: err.context.clone(),
            source_message: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

impl From<OcanErrorDto> for OcanError {
    fn from(dto: OcanErrorDto) -> Self {
        Self {
            code: dto.code,
            message: dto.message,
            source: None,
            context: dto.context,
        }
    }
}
