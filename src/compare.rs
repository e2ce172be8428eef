//! Structural comparison of type descriptors.
//!
//! Two descriptors match when their shapes match. Struct fields and variant
//! cases are compared as name-keyed sets, so declaration order never affects
//! the outcome. Array elements, option payloads, and function inputs are
//! positional, so order matters there. Declared type names play no part:
//! separately compiled artifacts must interoperate on shape alone.

use crate::path::{NodePath, PathSegment};
use crate::types::TypeDescriptor;

/// A located difference between an expected and an actual type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Where in the expected type the difference was found.
    pub path: NodePath,
    /// What differs, phrased as expected-versus-found.
    pub explanation: String,
}

impl std::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.explanation)
    }
}

/// Returns true if the two descriptors are structurally equal.
#[must_use]
pub fn equal(a: &TypeDescriptor, b: &TypeDescriptor) -> bool {
    match (a, b) {
        (TypeDescriptor::Primitive(x), TypeDescriptor::Primitive(y)) => x == y,
        (TypeDescriptor::Struct(x), TypeDescriptor::Struct(y))
        | (TypeDescriptor::Variant(x), TypeDescriptor::Variant(y)) => members_equal(x, y),
        (TypeDescriptor::Array(x), TypeDescriptor::Array(y))
        | (TypeDescriptor::Option(x), TypeDescriptor::Option(y)) => equal(x, y),
        (
            TypeDescriptor::Function {
                inputs: ai,
                output: ao,
            },
            TypeDescriptor::Function {
                inputs: bi,
                output: bo,
            },
        ) => {
            ai.len() == bi.len()
                && ai.iter().zip(bi).all(|(x, y)| equal(x, y))
                && equal(ao, bo)
        }
        _ => false,
    }
}

/// Name-keyed member comparison.
///
/// Names are unique within a member list (the codecs enforce this), so equal
/// lengths plus every left member matching a right member by name implies the
/// name sets coincide.
fn members_equal(a: &[(String, TypeDescriptor)], b: &[(String, TypeDescriptor)]) -> bool {
    a.len() == b.len()
        && a.iter().all(|(name, ty)| {
            b.iter()
                .any(|(other, other_ty)| other == name && equal(ty, other_ty))
        })
}

/// Finds the first structural difference between `expected` and `actual`.
///
/// Returns `None` when the types are structurally equal. The walk is
/// deterministic: members are visited in the expected type's declaration
/// order, so the same pair of types always reports the same mismatch.
#[must_use]
pub fn first_mismatch(expected: &TypeDescriptor, actual: &TypeDescriptor) -> Option<Mismatch> {
    let mut path = NodePath::root();
    walk(expected, actual, &mut path)
}

fn walk(
    expected: &TypeDescriptor,
    actual: &TypeDescriptor,
    path: &mut NodePath,
) -> Option<Mismatch> {
    match (expected, actual) {
        (TypeDescriptor::Primitive(e), TypeDescriptor::Primitive(a)) => {
            (e != a).then(|| here(path, format!("expected {e}, found {a}")))
        }
        (TypeDescriptor::Struct(e), TypeDescriptor::Struct(a)) => {
            walk_members(e, a, "field", PathSegment::Field, path)
        }
        (TypeDescriptor::Variant(e), TypeDescriptor::Variant(a)) => {
            walk_members(e, a, "case", PathSegment::Case, path)
        }
        (TypeDescriptor::Array(e), TypeDescriptor::Array(a)) => {
            descend(path, PathSegment::Field("element".into()), |path| {
                walk(e, a, path)
            })
        }
        (TypeDescriptor::Option(e), TypeDescriptor::Option(a)) => {
            descend(path, PathSegment::Field("inner".into()), |path| {
                walk(e, a, path)
            })
        }
        (
            TypeDescriptor::Function {
                inputs: ei,
                output: eo,
            },
            TypeDescriptor::Function {
                inputs: ai,
                output: ao,
            },
        ) => {
            if ei.len() != ai.len() {
                return Some(here(
                    path,
                    format!("expected {} inputs, found {}", ei.len(), ai.len()),
                ));
            }
            for (i, (e, a)) in ei.iter().zip(ai).enumerate() {
                path.push(PathSegment::Field("inputs".into()));
                path.push(PathSegment::Index(i));
                let found = walk(e, a, path);
                path.pop();
                path.pop();
                if found.is_some() {
                    return found;
                }
            }
            descend(path, PathSegment::Field("output".into()), |path| {
                walk(eo, ao, path)
            })
        }
        (e, a) => Some(here(
            path,
            format!("expected {}, found {}", e.kind_name(), a.kind_name()),
        )),
    }
}

fn walk_members(
    expected: &[(String, TypeDescriptor)],
    actual: &[(String, TypeDescriptor)],
    noun: &str,
    segment: fn(String) -> PathSegment,
    path: &mut NodePath,
) -> Option<Mismatch> {
    for (name, _) in expected {
        if !actual.iter().any(|(n, _)| n == name) {
            return Some(here(path, format!("missing {noun} '{name}'")));
        }
    }
    for (name, _) in actual {
        if !expected.iter().any(|(n, _)| n == name) {
            return Some(here(path, format!("unexpected {noun} '{name}'")));
        }
    }
    for (name, expected_ty) in expected {
        // Name sets match at this point, so the lookup always succeeds.
        let Some(actual_ty) = actual.iter().find(|(n, _)| n == name).map(|(_, t)| t) else {
            continue;
        };
        let found = descend(path, segment(name.clone()), |path| {
            walk(expected_ty, actual_ty, path)
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

fn descend<F>(path: &mut NodePath, segment: PathSegment, f: F) -> Option<Mismatch>
where
    F: FnOnce(&mut NodePath) -> Option<Mismatch>,
{
    path.push(segment);
    let found = f(path);
    path.pop();
    found
}

fn here(path: &NodePath, explanation: String) -> Mismatch {
    Mismatch {
        path: path.clone(),
        explanation,
    }
}
