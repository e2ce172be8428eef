//! End-to-end preview tests over real files.
//!
//! These tests verify that the pipeline:
//! - Accepts matching artifacts from disk in both physical formats
//! - Rejects contract mismatches with a precise field path
//! - Rejects unsupported, corrupted, and truncated artifacts
//! - Picks up file edits on reload (no caching between loads)
//! - Emits script-safe envelope JSON

use std::fs;
use std::path::Path;

use tempfile::tempdir;
use vitrine::codec::{binary, json};
use vitrine::{
    preview, ContractType, FunctionNode, IrNode, PreviewBundle, PreviewError, PreviewRequest,
    TypeDescriptor, ValidationError, PAYLOAD_VERSION,
};

fn card_output() -> TypeDescriptor {
    TypeDescriptor::struct_of([
        ("title", TypeDescriptor::string()),
        ("count", TypeDescriptor::integer()),
    ])
}

fn card_contract() -> ContractType {
    ContractType::new("Card", card_output())
}

fn card_component() -> IrNode {
    IrNode::Function(FunctionNode::new(
        TypeDescriptor::function_of(vec![], card_output()),
        vec![0xca, 0xfe, 0xba, 0xbe],
    ))
}

/// A component whose output declares `count` as a float instead of an
/// integer.
fn miscounted_component() -> IrNode {
    IrNode::Function(FunctionNode::new(
        TypeDescriptor::function_of(
            vec![],
            TypeDescriptor::struct_of([
                ("title", TypeDescriptor::string()),
                ("count", TypeDescriptor::float()),
            ]),
        ),
        vec![0xca, 0xfe],
    ))
}

/// A component whose output omits the contract's `title` field entirely.
fn titleless_component() -> IrNode {
    IrNode::Function(FunctionNode::new(
        TypeDescriptor::function_of(
            vec![],
            TypeDescriptor::struct_of([("count", TypeDescriptor::integer())]),
        ),
        vec![0xca, 0xfe],
    ))
}

fn preview_file(path: &Path) -> Result<PreviewBundle, PreviewError> {
    let bytes = fs::read(path).unwrap();
    let request = PreviewRequest::from_path(path, bytes, card_contract())?;
    preview(request)
}

#[test]
fn test_binary_artifact_from_disk_is_accepted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.vib");
    fs::write(&path, binary::encode(&card_component()).unwrap()).unwrap();

    let bundle = preview_file(&path).unwrap();
    assert_eq!(bundle.node, card_component());
    assert_eq!(bundle.payload.version, PAYLOAD_VERSION);
    assert_eq!(bundle.payload.source, path.display().to_string());
    assert!(!bundle.payload.live_reload);

    // The envelope carries the function in its JSON form: signature plus
    // base64 body.
    let function = bundle.payload.component.get("$fn").unwrap();
    assert_eq!(
        function.get("body").unwrap().as_str().unwrap(),
        "yv66vg==" // base64 of [0xca, 0xfe, 0xba, 0xbe]
    );

    // The script text is plain JSON and reparses to the same envelope.
    let script = bundle.script_json().unwrap();
    let envelope: serde_json::Value = serde_json::from_str(&script).unwrap();
    assert_eq!(envelope.get("version").unwrap(), PAYLOAD_VERSION);
    assert_eq!(
        envelope.get("source").unwrap().as_str().unwrap(),
        path.display().to_string()
    );
    assert!(envelope.get("requestId").is_some());
    assert!(envelope.get("generatedAt").is_some());
    assert_eq!(envelope.get("component").unwrap(), &bundle.payload.component);
}

#[test]
fn test_json_artifact_matches_binary_artifact() {
    let dir = tempdir().unwrap();
    let binary_path = dir.path().join("badge.vib");
    let json_path = dir.path().join("badge.json");
    fs::write(&binary_path, binary::encode(&card_component()).unwrap()).unwrap();
    fs::write(&json_path, json::encode(&card_component()).unwrap()).unwrap();

    let from_binary = preview_file(&binary_path).unwrap();
    let from_json = preview_file(&json_path).unwrap();
    assert_eq!(from_binary.node, from_json.node);
    assert_eq!(from_binary.payload.component, from_json.payload.component);
}

#[test]
fn test_output_type_mismatch_names_the_field() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.vib");
    fs::write(&path, binary::encode(&miscounted_component()).unwrap()).unwrap();

    let err = preview_file(&path).unwrap_err();
    let PreviewError::Validation(ValidationError::OutputMismatch {
        contract,
        expected,
        actual,
        detail,
    }) = err
    else {
        panic!("expected an output mismatch, got {err}");
    };
    assert_eq!(contract, "Card");
    assert_eq!(expected, card_output());
    assert_eq!(
        actual,
        TypeDescriptor::struct_of([
            ("title", TypeDescriptor::string()),
            ("count", TypeDescriptor::float()),
        ])
    );
    assert_eq!(detail, "value.count: expected integer, found float");
}

#[test]
fn test_json_artifact_missing_a_contract_field_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.json");
    fs::write(&path, json::encode(&titleless_component()).unwrap()).unwrap();

    let err = preview_file(&path).unwrap_err();
    let PreviewError::Validation(ValidationError::OutputMismatch {
        contract,
        expected,
        actual,
        detail,
    }) = err
    else {
        panic!("expected an output mismatch, got {err}");
    };
    assert_eq!(contract, "Card");
    assert_eq!(expected, card_output());
    assert_eq!(
        actual,
        TypeDescriptor::struct_of([("count", TypeDescriptor::integer())])
    );
    assert_eq!(detail, "value: missing field 'title'");
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.wasm");
    fs::write(&path, [0u8; 8]).unwrap();

    let err = preview_file(&path).unwrap_err();
    assert!(err.is_unsupported_format());
    assert!(format!("{err}").contains("wasm"));
}

#[test]
fn test_corrupted_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.vib");
    let mut artifact = binary::encode(&card_component()).unwrap();
    // Flip one payload byte; the checksum catches it.
    let mid = artifact.len() / 2;
    artifact[mid] ^= 0x01;
    fs::write(&path, artifact).unwrap();

    let err = preview_file(&path).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn test_truncated_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.vib");
    let artifact = binary::encode(&card_component()).unwrap();
    fs::write(&path, &artifact[..artifact.len() / 2]).unwrap();

    let err = preview_file(&path).unwrap_err();
    assert!(err.is_decode());
}

#[test]
fn test_reload_sees_the_edited_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.vib");

    // 1. First load succeeds.
    fs::write(&path, binary::encode(&card_component()).unwrap()).unwrap();
    let first = preview_file(&path).unwrap();

    // 2. A bad edit lands; the reload fails instead of serving stale state.
    fs::write(&path, b"not an artifact").unwrap();
    assert!(preview_file(&path).unwrap_err().is_decode());

    // 3. The edit is fixed with a different body; the reload reflects it.
    let edited = IrNode::Function(FunctionNode::new(
        TypeDescriptor::function_of(vec![], card_output()),
        vec![0xde, 0xad],
    ));
    fs::write(&path, binary::encode(&edited).unwrap()).unwrap();
    let third = preview_file(&path).unwrap();
    assert_eq!(third.node, edited);
    assert_ne!(third.payload.component, first.payload.component);
}

#[test]
fn test_each_load_gets_a_fresh_request_id() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("badge.vib");
    fs::write(&path, binary::encode(&card_component()).unwrap()).unwrap();

    let a = preview_file(&path).unwrap();
    let b = preview_file(&path).unwrap();
    assert_ne!(a.payload.request_id, b.payload.request_id);
    assert_eq!(a.payload.component, b.payload.component);
}

#[test]
fn test_script_json_never_closes_its_own_tag() {
    let request = PreviewRequest::from_module(
        "inline:</script><script>alert(1)</script>",
        card_component(),
        card_contract(),
    )
    .unwrap();
    let bundle = preview(request).unwrap();

    let script = bundle.script_json().unwrap();
    assert!(!script.contains('<'));
    assert!(!script.contains('>'));
    assert!(script.contains("\\u003c/script\\u003e"));

    // Escaping stays within JSON string syntax, so the text still parses
    // back to the original source label.
    let envelope: serde_json::Value = serde_json::from_str(&script).unwrap();
    assert_eq!(
        envelope.get("source").unwrap().as_str().unwrap(),
        "inline:</script><script>alert(1)</script>"
    );
}

#[test]
fn test_script_json_escapes_line_separators() {
    let request = PreviewRequest::from_module(
        "inline:a\u{2028}b\u{2029}c",
        card_component(),
        card_contract(),
    )
    .unwrap();
    let bundle = preview(request).unwrap();

    let script = bundle.script_json().unwrap();
    assert!(!script.contains('\u{2028}'));
    assert!(!script.contains('\u{2029}'));
    assert!(script.contains("\\u2028"));
    assert!(script.contains("\\u2029"));

    let envelope: serde_json::Value = serde_json::from_str(&script).unwrap();
    assert_eq!(
        envelope.get("source").unwrap().as_str().unwrap(),
        "inline:a\u{2028}b\u{2029}c"
    );
}
