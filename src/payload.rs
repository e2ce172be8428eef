//! The outbound preview payload.
//!
//! After a component is accepted, its tree is serialized into a JSON
//! envelope the preview host reads. The envelope text may be inlined into a
//! `<script>` block, so [`PreviewPayload::to_script_json`] escapes the
//! characters that can break out of one (`<`, `>`) or break a JS parser
//! (U+2028, U+2029). Those characters only ever occur inside JSON string
//! literals, where a `\uXXXX` escape denotes the same character, so the
//! hardened text is still valid JSON for the same document.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{PreviewError, PreviewResult};

/// Envelope version understood by current preview hosts.
pub const PAYLOAD_VERSION: &str = "1.0";

/// The JSON envelope handed to the preview host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    /// Envelope format version, currently [`PAYLOAD_VERSION`].
    pub version: String,
    /// Correlates this payload with host-side logs.
    pub request_id: Uuid,
    /// When the payload was produced, millisecond precision.
    #[serde(serialize_with = "serialize_millis")]
    pub generated_at: DateTime<Utc>,
    /// Where the artifact came from, as given in the request.
    pub source: String,
    /// Whether the host should keep watching the source for changes.
    pub live_reload: bool,
    /// The accepted component tree in its JSON artifact form.
    pub component: serde_json::Value,
}

impl PreviewPayload {
    /// Creates an envelope with a fresh request id stamped now.
    #[must_use]
    pub fn new(source: impl Into<String>, live_reload: bool, component: serde_json::Value) -> Self {
        Self {
            version: PAYLOAD_VERSION.to_string(),
            request_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source: source.into(),
            live_reload,
            component,
        }
    }

    /// Replaces the request id (hosts that correlate across reloads set
    /// their own).
    #[must_use]
    pub const fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Replaces the generation timestamp.
    #[must_use]
    pub const fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    /// Serializes the envelope as compact JSON safe to inline in a
    /// `<script>` block.
    ///
    /// # Errors
    ///
    /// Returns [`PreviewError::Internal`] if serialization fails, which
    /// would mean the envelope itself is malformed.
    pub fn to_script_json(&self) -> PreviewResult<String> {
        let json = serde_json::to_string(self)
            .map_err(|e| PreviewError::internal(format!("payload serialization failed: {e}")))?;
        Ok(escape_for_script(&json))
    }
}

fn serialize_millis<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Escapes the characters that can terminate a surrounding `<script>` block
/// or trip a JS string parser.
fn escape_for_script(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 8);
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    out
}
