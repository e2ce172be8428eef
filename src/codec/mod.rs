//! Artifact codecs and format dispatch.
//!
//! Two interchangeable codecs produce the same [`crate::node::IrNode`] tree:
//! a self-describing binary format ([`binary`]) and a JSON text format
//! ([`json`]). Which one runs is decided purely by the artifact's file
//! extension; nothing ever sniffs content.

pub mod binary;
pub mod json;

use std::path::Path;

use crate::error::PreviewError;

/// Largest artifact payload either codec will decode, in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Deepest nesting either codec will follow before giving up.
///
/// Keeps recursion bounded on adversarial inputs; well-formed component
/// trees sit far below this.
pub const MAX_NESTING_DEPTH: usize = 256;

/// How an artifact reached the previewer, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// `.vit`: an already-loaded module, no decoding needed.
    Compiled,
    /// `.vib`: the binary artifact format.
    Binary,
    /// `.json`: the JSON artifact format.
    Json,
}

impl SourceFormat {
    /// Resolves the format from a path's extension, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::UnsupportedFormat`] for unknown or missing
    /// extensions. No decoding is attempted for those.
    pub fn from_path(path: &Path) -> Result<Self, PreviewError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "vit" => Ok(Self::Compiled),
            "vib" => Ok(Self::Binary),
            "json" => Ok(Self::Json),
            _ => Err(PreviewError::UnsupportedFormat { extension }),
        }
    }

    /// The canonical (lowercase) extension for this format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Compiled => "vit",
            Self::Binary => "vib",
            Self::Json => "json",
        }
    }

    #[must_use]
    pub const fn is_compiled(self) -> bool {
        matches!(self, Self::Compiled)
    }

    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Binary)
    }

    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Compiled => "compiled",
            Self::Binary => "binary",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}
