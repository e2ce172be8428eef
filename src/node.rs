//! Decoded artifact values.
//!
//! Both codecs produce the same in-memory tree, so everything downstream of
//! decoding (contract validation, serialization) is format-agnostic.

use chrono::{DateTime, TimeZone, Utc};

use crate::types::TypeDescriptor;

/// A function value: its full signature plus an opaque compiled body.
///
/// The body is never interpreted here. It is carried through to the preview
/// host, which knows how to execute it.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    /// The function's type. Always function-kind when produced by a codec.
    pub signature: TypeDescriptor,
    /// Opaque compiled body bytes.
    pub body: Vec<u8>,
}

impl FunctionNode {
    /// Creates a function node.
    #[must_use]
    pub fn new(signature: TypeDescriptor, body: Vec<u8>) -> Self {
        Self { signature, body }
    }

    /// Returns the declared output type, if the signature is function-kind.
    #[must_use]
    pub fn output(&self) -> Option<&TypeDescriptor> {
        self.signature.as_function().map(|(_, output)| output)
    }
}

/// One node of a decoded artifact.
///
/// Absent optional values decode to [`IrNode::Null`]; present ones are
/// wrapped in [`IrNode::Some`]. The value space is narrower than the types
/// admit: floats are finite and timestamps sit on the millisecond grid.
/// Decoders only produce such trees, `From` conversions canonicalize, and
/// both encoders reject anything outside it, so a tree that encodes always
/// decodes back equal.
///
/// # Examples
///
/// ```
/// use vitrine::IrNode;
///
/// let node = IrNode::struct_of([
///     ("title", IrNode::from("hello")),
///     ("count", IrNode::from(3)),
/// ]);
///
/// assert!(node.is_struct());
/// assert_eq!(node.kind_name(), "struct");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum IrNode {
    /// The null value, also standing in for an absent option.
    Null,
    Bool(bool),
    /// Arbitrary-precision integer, up to 128 bits.
    Integer(i128),
    /// Finite 64-bit float.
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// An instant with millisecond precision.
    Timestamp(DateTime<Utc>),
    /// A present optional value.
    Some(Box<IrNode>),
    Array(Vec<IrNode>),
    /// Named fields in declaration order. Field names are unique.
    Struct(Vec<(String, IrNode)>),
    /// One case of a variant, with its payload.
    Variant {
        case: String,
        payload: Box<IrNode>,
    },
    Function(FunctionNode),
}

impl IrNode {
    /// Builds a struct node from `(name, value)` pairs, keeping their order.
    pub fn struct_of<N, I>(fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, IrNode)>,
    {
        Self::Struct(fields.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }

    /// Builds a variant node.
    #[must_use]
    pub fn variant(case: impl Into<String>, payload: IrNode) -> Self {
        Self::Variant {
            case: case.into(),
            payload: Box::new(payload),
        }
    }

    /// Wraps a value as a present option.
    #[must_use]
    pub fn some(value: IrNode) -> Self {
        Self::Some(Box::new(value))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&[(String, IrNode)]> {
        match self {
            Self::Struct(fields) => Some(fields),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_function(&self) -> Option<&FunctionNode> {
        match self {
            Self::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Looks up a struct field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&IrNode> {
        self.as_struct()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns a human-readable kind name.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Some(_) => "some",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
            Self::Variant { .. } => "variant",
            Self::Function(_) => "function",
        }
    }
}

impl Default for IrNode {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for IrNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "bytes[{}]", v.len()),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Some(v) => write!(f, "some({v})"),
            Self::Array(items) => write!(f, "array[{}]", items.len()),
            Self::Struct(fields) => write!(f, "struct[{}]", fields.len()),
            Self::Variant { case, .. } => write!(f, "variant({case})"),
            Self::Function(func) => write!(f, "{}", func.signature),
        }
    }
}

/// Snaps an instant onto the millisecond grid the artifact formats carry.
///
/// Reconstruction from epoch milliseconds also folds chrono's leap-second
/// representation, so `canonical_instant(t) == t` exactly when `t` can be
/// carried as-is.
pub(crate) fn canonical_instant(instant: DateTime<Utc>) -> DateTime<Utc> {
    // Reconstruction only fails outside chrono's range, which a valid
    // input cannot reach.
    Utc.timestamp_millis_opt(instant.timestamp_millis())
        .single()
        .unwrap_or(instant)
}

// Convenient From implementations
impl From<bool> for IrNode {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for IrNode {
    fn from(v: i32) -> Self {
        Self::Integer(i128::from(v))
    }
}

impl From<i64> for IrNode {
    fn from(v: i64) -> Self {
        Self::Integer(i128::from(v))
    }
}

impl From<i128> for IrNode {
    fn from(v: i128) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for IrNode {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for IrNode {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for IrNode {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<u8>> for IrNode {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<DateTime<Utc>> for IrNode {
    /// Truncates to millisecond precision, the finest either artifact
    /// format carries.
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(canonical_instant(v))
    }
}

impl From<Vec<IrNode>> for IrNode {
    fn from(v: Vec<IrNode>) -> Self {
        Self::Array(v)
    }
}

impl From<FunctionNode> for IrNode {
    fn from(v: FunctionNode) -> Self {
        Self::Function(v)
    }
}
