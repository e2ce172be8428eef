//! Field paths into decoded artifacts.
//!
//! Decode and validation diagnostics locate a failure by the path from the
//! artifact root to the offending node, rendered in the familiar
//! `value.inputs[2].type` form. Both codecs and the contract validator thread
//! a [`NodePath`] while walking a tree so every error names where it happened.

use std::fmt;

/// One step from a node to one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A struct field or wrapper key, by name.
    Field(String),
    /// An array element or function input, by position.
    Index(usize),
    /// A variant payload, by case name.
    Case(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) | Self::Case(name) => write!(f, ".{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// A path from the artifact root down to a nested node.
///
/// The root alone renders as `value`; segments append in order, so a path
/// built with `field("inputs")`, `index(2)`, `field("type")` renders as
/// `value.inputs[2].type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The artifact root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns true if no segments have been pushed.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Push a segment in place (used while descending).
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Pop the most recent segment (used while ascending).
    pub fn pop(&mut self) {
        self.0.pop();
    }

    /// Extend with a struct-field step.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.0.push(PathSegment::Field(name.into()));
        self
    }

    /// Extend with a positional step.
    #[must_use]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(PathSegment::Index(i));
        self
    }

    /// Extend with a variant-case step.
    #[must_use]
    pub fn case(mut self, name: impl Into<String>) -> Self {
        self.0.push(PathSegment::Case(name.into()));
        self
    }

    /// The segments below the root, in order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value")?;
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
