//! Structural type descriptors for artifact values.
//!
//! Every component artifact carries a description of its shape. Descriptors
//! are compared structurally (see [`crate::compare`]): two types match when
//! their shapes match, regardless of where they were declared.

/// Scalar type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Integer,
    Float,
    String,
    Boolean,
    Bytes,
    Timestamp,
    Null,
}

impl PrimitiveKind {
    /// Returns the lowercase name used in JSON artifacts and diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Bytes => "bytes",
            Self::Timestamp => "timestamp",
            Self::Null => "null",
        }
    }

    /// Parses a lowercase primitive name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "string" => Some(Self::String),
            "boolean" => Some(Self::Boolean),
            "bytes" => Some(Self::Bytes),
            "timestamp" => Some(Self::Timestamp),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A structural description of a value's shape.
///
/// Struct fields and variant cases keep their declaration order for display
/// purposes, but comparison treats them as name-keyed sets. Array elements,
/// option payloads, and function inputs are positional.
///
/// # Examples
///
/// ```
/// use vitrine::TypeDescriptor;
///
/// let card = TypeDescriptor::struct_of([
///     ("title", TypeDescriptor::string()),
///     ("count", TypeDescriptor::integer()),
/// ]);
///
/// let render = TypeDescriptor::function_of(
///     vec![TypeDescriptor::string()],
///     card.clone(),
/// );
///
/// assert!(render.is_function());
/// assert_eq!(card.to_string(), "{title: string, count: integer}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    /// A scalar type.
    Primitive(PrimitiveKind),
    /// Named fields, each with its own type. Field names are unique.
    Struct(Vec<(String, TypeDescriptor)>),
    /// Named alternatives, each with a payload type. Case names are unique.
    Variant(Vec<(String, TypeDescriptor)>),
    /// A homogeneous sequence.
    Array(Box<TypeDescriptor>),
    /// A value that may be absent.
    Option(Box<TypeDescriptor>),
    /// A callable with positional input types and one output type.
    Function {
        inputs: Vec<TypeDescriptor>,
        output: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    #[must_use]
    pub const fn integer() -> Self {
        Self::Primitive(PrimitiveKind::Integer)
    }

    #[must_use]
    pub const fn float() -> Self {
        Self::Primitive(PrimitiveKind::Float)
    }

    #[must_use]
    pub const fn string() -> Self {
        Self::Primitive(PrimitiveKind::String)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::Primitive(PrimitiveKind::Boolean)
    }

    #[must_use]
    pub const fn bytes() -> Self {
        Self::Primitive(PrimitiveKind::Bytes)
    }

    #[must_use]
    pub const fn timestamp() -> Self {
        Self::Primitive(PrimitiveKind::Timestamp)
    }

    #[must_use]
    pub const fn null() -> Self {
        Self::Primitive(PrimitiveKind::Null)
    }

    /// Builds a struct type from `(name, type)` pairs, keeping their order.
    pub fn struct_of<N, I>(fields: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, TypeDescriptor)>,
    {
        Self::Struct(fields.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }

    /// Builds a variant type from `(case, payload type)` pairs.
    pub fn variant_of<N, I>(cases: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, TypeDescriptor)>,
    {
        Self::Variant(cases.into_iter().map(|(n, t)| (n.into(), t)).collect())
    }

    /// Builds an array type.
    #[must_use]
    pub fn array_of(element: TypeDescriptor) -> Self {
        Self::Array(Box::new(element))
    }

    /// Builds an option type.
    #[must_use]
    pub fn option_of(inner: TypeDescriptor) -> Self {
        Self::Option(Box::new(inner))
    }

    /// Builds a function type.
    #[must_use]
    pub fn function_of(inputs: Vec<TypeDescriptor>, output: TypeDescriptor) -> Self {
        Self::Function {
            inputs,
            output: Box::new(output),
        }
    }

    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    #[must_use]
    pub const fn is_function(&self) -> bool {
        matches!(self, Self::Function { .. })
    }

    /// Returns the inputs and output if this is a function type.
    #[must_use]
    pub fn as_function(&self) -> Option<(&[TypeDescriptor], &TypeDescriptor)> {
        match self {
            Self::Function { inputs, output } => Some((inputs, output)),
            _ => None,
        }
    }

    /// Returns the named members if this is a struct or variant type.
    #[must_use]
    pub fn named_members(&self) -> Option<&[(String, TypeDescriptor)]> {
        match self {
            Self::Struct(members) | Self::Variant(members) => Some(members),
            _ => None,
        }
    }

    /// Returns a human-readable kind name.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(kind) => kind.name(),
            Self::Struct(_) => "struct",
            Self::Variant(_) => "variant",
            Self::Array(_) => "array",
            Self::Option(_) => "option",
            Self::Function { .. } => "function",
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
            Self::Variant(cases) => {
                write!(f, "variant{{")?;
                for (i, (name, ty)) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, "}}")
            }
            Self::Array(element) => write!(f, "[{element}]"),
            Self::Option(inner) => write!(f, "{inner}?"),
            Self::Function { inputs, output } => {
                write!(f, "fn(")?;
                for (i, input) in inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{input}")?;
                }
                write!(f, ") -> {output}")
            }
        }
    }
}

impl From<PrimitiveKind> for TypeDescriptor {
    fn from(kind: PrimitiveKind) -> Self {
        Self::Primitive(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_names_round_trip() {
        for kind in [
            PrimitiveKind::Integer,
            PrimitiveKind::Float,
            PrimitiveKind::String,
            PrimitiveKind::Boolean,
            PrimitiveKind::Bytes,
            PrimitiveKind::Timestamp,
            PrimitiveKind::Null,
        ] {
            assert_eq!(PrimitiveKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(PrimitiveKind::from_name("widget"), None);
    }

    #[test]
    fn test_builders() {
        let ty = TypeDescriptor::struct_of([
            ("id", TypeDescriptor::integer()),
            ("tags", TypeDescriptor::array_of(TypeDescriptor::string())),
        ]);
        assert_eq!(ty.kind_name(), "struct");
        assert_eq!(ty.named_members().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_as_function() {
        let render = TypeDescriptor::function_of(
            vec![TypeDescriptor::string(), TypeDescriptor::boolean()],
            TypeDescriptor::null(),
        );
        assert!(render.is_function());
        let (inputs, output) = render.as_function().unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(*output, TypeDescriptor::null());
        assert!(TypeDescriptor::string().as_function().is_none());
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(TypeDescriptor::integer().to_string(), "integer");
        assert_eq!(
            TypeDescriptor::array_of(TypeDescriptor::float()).to_string(),
            "[float]"
        );
        assert_eq!(
            TypeDescriptor::option_of(TypeDescriptor::string()).to_string(),
            "string?"
        );
        assert_eq!(
            TypeDescriptor::variant_of([
                ("Text", TypeDescriptor::string()),
                ("Count", TypeDescriptor::integer()),
            ])
            .to_string(),
            "variant{Text: string | Count: integer}"
        );
        assert_eq!(
            TypeDescriptor::function_of(
                vec![TypeDescriptor::integer()],
                TypeDescriptor::struct_of([("ok", TypeDescriptor::boolean())]),
            )
            .to_string(),
            "fn(integer) -> {ok: boolean}"
        );
    }

    #[test]
    fn test_derived_equality_is_order_sensitive() {
        // Derived PartialEq keeps declaration order; the structural
        // comparator in `compare` is the one that ignores it.
        let a = TypeDescriptor::struct_of([
            ("x", TypeDescriptor::integer()),
            ("y", TypeDescriptor::integer()),
        ]);
        let b = TypeDescriptor::struct_of([
            ("y", TypeDescriptor::integer()),
            ("x", TypeDescriptor::integer()),
        ]);
        assert_ne!(a, b);
    }
}
