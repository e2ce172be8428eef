//! Function-contract validation.
//!
//! A decoded artifact is only previewable if its root is a function whose
//! declared output structurally satisfies the host's contract type. The
//! check sequence is fixed: first the root must be a function, then its
//! signature must be well-formed, then the output type is compared. The
//! first failure wins and nothing after it runs.
//!
//! Validation is pure and runs on every load and every reload. Verdicts are
//! never cached, so editing an artifact between reloads cannot leak a stale
//! acceptance.

use crate::compare;
use crate::error::ValidationError;
use crate::node::IrNode;
use crate::types::TypeDescriptor;

/// A named output contract the preview host expects components to satisfy.
///
/// The name only appears in diagnostics; matching is purely structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractType {
    pub name: String,
    /// The output type a component function must declare.
    pub descriptor: TypeDescriptor,
}

impl ContractType {
    /// Creates a contract.
    #[must_use]
    pub fn new(name: impl Into<String>, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// A component that passed contract validation.
///
/// Borrows from the validated node, so it cannot outlive the tree it vouches
/// for.
#[derive(Debug, Clone, Copy)]
pub struct AcceptedComponent<'a> {
    /// The accepted root node.
    pub node: &'a IrNode,
    /// The component function's full signature.
    pub signature: &'a TypeDescriptor,
    /// The declared output type, structurally equal to the contract's.
    pub output: &'a TypeDescriptor,
}

/// Checks a decoded artifact against a contract.
///
/// Only the output type is constrained. Input types are the component's own
/// business: the host supplies whatever the signature asks for at render
/// time.
///
/// # Errors
///
/// [`ValidationError::NotAFunction`] when the root is anything but a
/// function node, [`ValidationError::MalformedSignature`] when a function
/// node carries a non-function type, and
/// [`ValidationError::OutputMismatch`] with the first structural difference
/// when the output does not satisfy the contract.
pub fn validate_component<'a>(
    node: &'a IrNode,
    contract: &ContractType,
) -> Result<AcceptedComponent<'a>, ValidationError> {
    let Some(func) = node.as_function() else {
        return Err(ValidationError::NotAFunction {
            actual: node.kind_name().to_string(),
        });
    };
    let Some((_, output)) = func.signature.as_function() else {
        return Err(ValidationError::MalformedSignature {
            actual: func.signature.clone(),
        });
    };
    if let Some(mismatch) = compare::first_mismatch(&contract.descriptor, output) {
        return Err(ValidationError::OutputMismatch {
            contract: contract.name.clone(),
            expected: contract.descriptor.clone(),
            actual: output.clone(),
            detail: mismatch.to_string(),
        });
    }
    Ok(AcceptedComponent {
        node,
        signature: &func.signature,
        output,
    })
}
