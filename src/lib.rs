//! # Vitrine - Component Preview for Typed Artifacts
//!
//! Vitrine turns a compiled UI-component artifact into a preview the host
//! can render: it decodes the artifact into a typed node tree, checks that
//! the component's output satisfies the host's contract, and serializes an
//! envelope safe to hand to the preview surface.
//!
//! ## Core Concepts
//!
//! - **IrNode**: The in-memory value tree both artifact formats decode to
//! - **TypeDescriptor**: A structural description of a value's shape
//! - **ContractType**: The output shape the preview host expects
//! - **PreviewRequest**: One load's source, format, input, and contract
//! - **PreviewPayload**: The JSON envelope handed to the preview host
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//! use vitrine::{preview, ContractType, PreviewRequest, TypeDescriptor};
//!
//! let contract = ContractType::new(
//!     "Card",
//!     TypeDescriptor::struct_of([
//!         ("title", TypeDescriptor::string()),
//!         ("count", TypeDescriptor::integer()),
//!     ]),
//! );
//!
//! let path = Path::new("cards/badge.vib");
//! let bytes = std::fs::read(path)?;
//! let request = PreviewRequest::from_path(path, bytes, contract)?;
//!
//! let bundle = preview(request)?;
//! let script = bundle.script_json()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod compare;
pub mod error;
pub mod node;
pub mod path;
pub mod types;

// Codecs, validation, and the pipeline
pub mod codec;
pub mod contract;
pub mod payload;
pub mod pipeline;

// Re-export primary types at crate root for convenience
pub use codec::{SourceFormat, MAX_NESTING_DEPTH, MAX_PAYLOAD_BYTES};
pub use compare::{equal, first_mismatch, Mismatch};
pub use contract::{validate_component, AcceptedComponent, ContractType};
pub use error::{
    DecodeError, PreviewError, PreviewResult, RequestError, ValidationError,
};
pub use node::{FunctionNode, IrNode};
pub use path::{NodePath, PathSegment};
pub use payload::{PreviewPayload, PAYLOAD_VERSION};
pub use pipeline::{
    preview, ArtifactInput, PreviewBundle, PreviewRequest, PreviewRequestBuilder,
};
pub use types::{PrimitiveKind, TypeDescriptor};
