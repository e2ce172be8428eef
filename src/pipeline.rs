//! The preview pipeline.
//!
//! One load is one pure pass over four stages: resolve the format, decode
//! the artifact, validate it against the contract, and serialize the
//! envelope. The first failing stage aborts the load and nothing downstream
//! of it runs. There is no cache and no shared state between loads; a
//! reload re-runs everything from the bytes it is given, so two loads of
//! the same input always produce the same component.

use std::path::Path;

use crate::codec::{self, SourceFormat};
use crate::contract::{self, ContractType};
use crate::error::{PreviewResult, RequestError};
use crate::node::IrNode;
use crate::payload::PreviewPayload;

/// The artifact data a request carries.
///
/// Reading files is the caller's business; the pipeline only ever sees
/// bytes or an already-loaded module.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactInput {
    /// Raw artifact bytes for the binary and JSON formats.
    Bytes(Vec<u8>),
    /// An already-loaded module for the compiled format.
    Module(IrNode),
}

impl ArtifactInput {
    const fn expected_for(format: SourceFormat) -> &'static str {
        match format {
            SourceFormat::Compiled => "module",
            SourceFormat::Binary | SourceFormat::Json => "bytes",
        }
    }

    const fn matches(&self, format: SourceFormat) -> bool {
        match format {
            SourceFormat::Compiled => matches!(self, Self::Module(_)),
            SourceFormat::Binary | SourceFormat::Json => matches!(self, Self::Bytes(_)),
        }
    }
}

/// Everything one preview load needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewRequest {
    /// Where the artifact came from; carried into the payload verbatim.
    pub source: String,
    pub format: SourceFormat,
    pub input: ArtifactInput,
    pub contract: ContractType,
    pub live_reload: bool,
}

impl PreviewRequest {
    /// Starts building a request.
    #[must_use]
    pub fn builder() -> PreviewRequestBuilder {
        PreviewRequestBuilder::new()
    }

    /// Builds a request for an artifact read from `path`, resolving the
    /// format from the file extension.
    ///
    /// # Errors
    ///
    /// Fails for unsupported extensions, and for `.vit` paths: compiled
    /// artifacts arrive as modules, not bytes.
    pub fn from_path(path: &Path, bytes: Vec<u8>, contract: ContractType) -> PreviewResult<Self> {
        let format = SourceFormat::from_path(path)?;
        Self::builder()
            .source(path.display().to_string())
            .format(format)
            .bytes(bytes)
            .contract(contract)
            .build()
    }

    /// Builds a request for an already-loaded compiled module.
    ///
    /// # Errors
    ///
    /// Fails when `source` is empty.
    pub fn from_module(
        source: impl Into<String>,
        module: IrNode,
        contract: ContractType,
    ) -> PreviewResult<Self> {
        Self::builder()
            .source(source)
            .format(SourceFormat::Compiled)
            .module(module)
            .contract(contract)
            .build()
    }
}

/// Fluent builder for [`PreviewRequest`].
#[derive(Debug, Default)]
pub struct PreviewRequestBuilder {
    source: Option<String>,
    format: Option<SourceFormat>,
    input: Option<ArtifactInput>,
    contract: Option<ContractType>,
    live_reload: bool,
}

impl PreviewRequestBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source label carried into the payload.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Supplies raw artifact bytes.
    #[must_use]
    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.input = Some(ArtifactInput::Bytes(bytes));
        self
    }

    /// Supplies an already-loaded module.
    #[must_use]
    pub fn module(mut self, module: IrNode) -> Self {
        self.input = Some(ArtifactInput::Module(module));
        self
    }

    #[must_use]
    pub fn contract(mut self, contract: ContractType) -> Self {
        self.contract = Some(contract);
        self
    }

    #[must_use]
    pub const fn live_reload(mut self, live_reload: bool) -> Self {
        self.live_reload = live_reload;
        self
    }

    /// Validates and assembles the request.
    ///
    /// # Errors
    ///
    /// [`RequestError::MissingField`] for unset required fields,
    /// [`RequestError::EmptySource`] for a blank source label, and
    /// [`RequestError::InputMismatch`] when the input kind does not fit the
    /// format.
    pub fn build(self) -> PreviewResult<PreviewRequest> {
        let source = self
            .source
            .ok_or(RequestError::MissingField { field: "source" })?;
        if source.trim().is_empty() {
            return Err(RequestError::EmptySource.into());
        }
        let format = self
            .format
            .ok_or(RequestError::MissingField { field: "format" })?;
        let input = self
            .input
            .ok_or(RequestError::MissingField { field: "input" })?;
        let contract = self
            .contract
            .ok_or(RequestError::MissingField { field: "contract" })?;
        if !input.matches(format) {
            return Err(RequestError::InputMismatch {
                format,
                expected: ArtifactInput::expected_for(format),
            }
            .into());
        }
        Ok(PreviewRequest {
            source,
            format,
            input,
            contract,
            live_reload: self.live_reload,
        })
    }
}

/// A successful load: the decoded tree plus the envelope for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewBundle {
    /// The accepted component tree.
    pub node: IrNode,
    /// The envelope carrying its JSON form.
    pub payload: PreviewPayload,
}

impl PreviewBundle {
    /// The envelope as script-safe JSON text.
    ///
    /// # Errors
    ///
    /// See [`PreviewPayload::to_script_json`].
    pub fn script_json(&self) -> PreviewResult<String> {
        self.payload.to_script_json()
    }
}

/// Runs one preview load end to end.
///
/// # Errors
///
/// Whatever the failing stage reports: a [`RequestError`] for an input that
/// does not fit the format, a [`crate::error::DecodeError`] from the codec,
/// or a [`crate::error::ValidationError`] from the contract check.
pub fn preview(request: PreviewRequest) -> PreviewResult<PreviewBundle> {
    let PreviewRequest {
        source,
        format,
        input,
        contract,
        live_reload,
    } = request;

    let node = match (format, input) {
        (SourceFormat::Compiled, ArtifactInput::Module(node)) => node,
        (SourceFormat::Binary, ArtifactInput::Bytes(bytes)) => codec::binary::decode(&bytes)?,
        (SourceFormat::Json, ArtifactInput::Bytes(bytes)) => codec::json::decode(&bytes)?,
        (format, _) => {
            return Err(RequestError::InputMismatch {
                format,
                expected: ArtifactInput::expected_for(format),
            }
            .into())
        }
    };

    let component = {
        let accepted = contract::validate_component(&node, &contract)?;
        codec::json::to_value(accepted.node)?
    };
    let payload = PreviewPayload::new(source, live_reload, component);
    Ok(PreviewBundle { node, payload })
}
