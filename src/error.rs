//! Error types for Vitrine.
//!
//! All errors in Vitrine are strongly typed using thiserror.
//! This enables pattern matching on specific error conditions
//! and provides clear error messages for the preview host UI.

use thiserror::Error;

use crate::codec::SourceFormat;
use crate::path::NodePath;
use crate::types::TypeDescriptor;

/// Decode errors that occur while turning an artifact into a node tree.
///
/// Binary failures carry the byte offset into the artifact; JSON failures
/// carry the field path from the root (rendered like `value.inputs[2].type`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of input at byte {offset}")]
    UnexpectedEof {
        offset: usize,
    },

    #[error("Unknown value tag 0x{tag:02x} at byte {offset}")]
    UnknownTag {
        offset: usize,
        tag: u8,
    },

    #[error("Unknown type tag 0x{tag:02x} at byte {offset}")]
    UnknownTypeTag {
        offset: usize,
        tag: u8,
    },

    #[error("Declared length {declared} at byte {offset} exceeds the {remaining} bytes remaining")]
    LengthOverrun {
        offset: usize,
        declared: u64,
        remaining: usize,
    },

    #[error("Payload of {declared} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge {
        declared: u64,
        limit: usize,
    },

    #[error("Invalid UTF-8 in string at byte {offset}")]
    InvalidUtf8 {
        offset: usize,
    },

    #[error("Non-canonical integer encoding (width {width}) at byte {offset}")]
    NonCanonicalInt {
        offset: usize,
        width: u8,
    },

    #[error("Non-finite float is not representable in an artifact")]
    NonFiniteFloat,

    #[error("Timestamp at byte {offset} is not representable at millisecond precision ({millis}ms)")]
    InvalidTimestamp {
        offset: usize,
        millis: i64,
    },

    #[error("Function signature at byte {offset} is not function-kind")]
    NotAFunctionSignature {
        offset: usize,
    },

    #[error("Duplicate name '{name}' at byte {offset}")]
    DuplicateName {
        offset: usize,
        name: String,
    },

    #[error("Bad magic bytes {found:?}, expected {expected:?}")]
    BadMagic {
        found: [u8; 4],
        expected: [u8; 4],
    },

    #[error("Unsupported artifact version {found}, this build reads version {expected}")]
    UnsupportedVersion {
        found: u8,
        expected: u8,
    },

    #[error("Checksum mismatch: artifact claims {stored:#010x}, payload hashes to {computed:#010x}")]
    ChecksumMismatch {
        stored: u32,
        computed: u32,
    },

    #[error("{remaining} trailing bytes after the value ending at byte {offset}")]
    TrailingBytes {
        offset: usize,
        remaining: usize,
    },

    #[error("Nesting depth exceeds the limit of {limit}")]
    DepthExceeded {
        limit: usize,
    },

    #[error("JSON parse error: {reason}")]
    Syntax {
        reason: String,
    },

    #[error("Invalid JSON value at {path}: {reason}")]
    Json {
        path: NodePath,
        reason: String,
    },
}

impl DecodeError {
    /// Creates a JSON shape error at the given path.
    #[must_use]
    pub fn json(path: &NodePath, reason: impl Into<String>) -> Self {
        Self::Json {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

/// Validation errors raised by the function-contract check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Expected Function, got {actual}")]
    NotAFunction {
        actual: String,
    },

    #[error("Function node carries a non-function signature: {actual}")]
    MalformedSignature {
        actual: TypeDescriptor,
    },

    #[error("Output type does not satisfy contract '{contract}': {detail}")]
    OutputMismatch {
        contract: String,
        expected: TypeDescriptor,
        actual: TypeDescriptor,
        detail: String,
    },
}

/// Request errors raised while assembling a preview request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Required field '{field}' is missing")]
    MissingField {
        field: &'static str,
    },

    #[error("Source label cannot be empty")]
    EmptySource,

    #[error("Format {format} requires {expected} input")]
    InputMismatch {
        format: SourceFormat,
        expected: &'static str,
    },
}

/// Top-level error type for preview loads.
///
/// This enum encompasses everything that can go wrong between receiving an
/// artifact and handing a serialized payload to the preview host.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("Unsupported artifact format: {extension:?} (expected .vit, .vib, or .json)")]
    UnsupportedFormat {
        extension: String,
    },

    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl PreviewError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is an unsupported-format error.
    #[must_use]
    pub const fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }

    /// Returns true if this is a request error.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns true if this is a decode error.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if retrying the same load could succeed.
    ///
    /// Always false: a load is a deterministic one-shot transform of its
    /// input, so retrying without changing the artifact or the contract
    /// cannot change the outcome.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type alias for preview operations.
pub type PreviewResult<T> = Result<T, PreviewError>;
