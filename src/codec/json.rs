//! The JSON artifact format.
//!
//! JSON cannot natively distinguish several things the node tree can, so a
//! handful of single-purpose wrapper objects close the gap. Their keys start
//! with `$`, and that prefix is reserved: plain struct fields may not use it.
//!
//! | node        | JSON form                                      |
//! |-------------|------------------------------------------------|
//! | null        | `null`                                         |
//! | boolean     | `true` / `false`                               |
//! | float       | JSON number                                    |
//! | integer     | `{"$int": "decimal string"}`                   |
//! | string      | JSON string                                    |
//! | bytes       | `{"$bytes": "base64"}`                         |
//! | timestamp   | `{"$time": "RFC 3339, millisecond precision"}` |
//! | some        | `{"$some": value}`                             |
//! | array       | JSON array                                     |
//! | struct      | plain JSON object                              |
//! | variant     | `{"$case": "Name", "$payload": value}`         |
//! | function    | `{"$fn": {"type": type, "body": "base64"}}`    |
//!
//! Types are bare strings for primitives (`"integer"`, `"float"`, ...) and
//! single-key objects otherwise: `{"struct": {...}}`, `{"variant": {...}}`,
//! `{"array": type}`, `{"option": type}`,
//! `{"fn": {"inputs": [...], "output": type}}`.
//!
//! Integers ride as decimal strings because JSON numbers are doubles and lose
//! precision past 2^53. A bare JSON number always decodes as a float.
//! Object key order is preserved end to end, so a struct keeps its field
//! order across a decode/encode trip.
//!
//! Text input is additionally subject to `serde_json`'s own recursion limit,
//! which is stricter than [`MAX_NESTING_DEPTH`]; trees near the cap are only
//! reachable through [`from_value`] or the binary format.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

use crate::codec::{MAX_NESTING_DEPTH, MAX_PAYLOAD_BYTES};
use crate::error::DecodeError;
use crate::node::{canonical_instant, FunctionNode, IrNode};
use crate::path::{NodePath, PathSegment};
use crate::types::{PrimitiveKind, TypeDescriptor};

/// Decodes a JSON artifact document into a node tree.
///
/// # Errors
///
/// Returns [`DecodeError::Syntax`] when the text is not valid JSON, and
/// [`DecodeError::Json`] with the offending field path when the JSON does
/// not describe a value.
pub fn decode(text: &[u8]) -> Result<IrNode, DecodeError> {
    if text.len() > MAX_PAYLOAD_BYTES {
        return Err(DecodeError::PayloadTooLarge {
            declared: text.len() as u64,
            limit: MAX_PAYLOAD_BYTES,
        });
    }
    let value: Value = serde_json::from_slice(text).map_err(|e| DecodeError::Syntax {
        reason: e.to_string(),
    })?;
    from_value(&value)
}

/// Decodes an already-parsed JSON value into a node tree.
pub fn from_value(value: &Value) -> Result<IrNode, DecodeError> {
    let mut path = NodePath::root();
    read_node(value, &mut path, 0)
}

/// Encodes a node tree as a compact JSON document.
pub fn encode(node: &IrNode) -> Result<String, DecodeError> {
    Ok(to_value(node)?.to_string())
}

/// Encodes a node tree as a JSON value.
///
/// # Errors
///
/// Rejects trees the JSON form cannot carry faithfully: non-finite floats,
/// timestamps finer than the millisecond grid, duplicate or `$`-prefixed
/// struct field names, and function nodes with non-function signatures.
pub fn to_value(node: &IrNode) -> Result<Value, DecodeError> {
    let mut path = NodePath::root();
    write_node(node, &mut path, 0)
}

/// Decodes a JSON type form into a descriptor.
pub fn type_from_value(value: &Value) -> Result<TypeDescriptor, DecodeError> {
    let mut path = NodePath::root();
    read_type(value, &mut path, 0)
}

/// Encodes a descriptor as its JSON type form.
pub fn type_to_value(ty: &TypeDescriptor) -> Result<Value, DecodeError> {
    let mut path = NodePath::root();
    write_type(ty, &mut path, 0)
}

fn read_node(value: &Value, path: &mut NodePath, depth: usize) -> Result<IrNode, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match value {
        Value::Null => Ok(IrNode::Null),
        Value::Bool(b) => Ok(IrNode::Bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(IrNode::Float)
            .ok_or_else(|| DecodeError::json(path, "number is not representable as a double")),
        Value::String(s) => Ok(IrNode::Str(s.clone())),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let node = descend(path, PathSegment::Index(i), |path| {
                    read_node(item, path, depth + 1)
                })?;
                out.push(node);
            }
            Ok(IrNode::Array(out))
        }
        Value::Object(map) => {
            if map.keys().any(|k| k.starts_with('$')) {
                read_wrapper(map, path, depth)
            } else {
                let mut fields = Vec::with_capacity(map.len());
                for (name, field_value) in map {
                    let node = descend(path, PathSegment::Field(name.clone()), |path| {
                        read_node(field_value, path, depth + 1)
                    })?;
                    fields.push((name.clone(), node));
                }
                Ok(IrNode::Struct(fields))
            }
        }
    }
}

/// Decodes an object containing `$`-prefixed keys. Such an object must be
/// exactly one of the wrapper shapes; anything else is malformed.
fn read_wrapper(
    map: &Map<String, Value>,
    path: &mut NodePath,
    depth: usize,
) -> Result<IrNode, DecodeError> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    match keys.as_slice() {
        ["$int"] => descend(path, PathSegment::Field("$int".into()), |path| {
            match map.get("$int") {
                Some(Value::String(s)) => s.parse::<i128>().map(IrNode::Integer).map_err(|_| {
                    DecodeError::json(path, format!("invalid 128-bit integer literal {s:?}"))
                }),
                _ => Err(DecodeError::json(path, "expected a decimal string")),
            }
        }),
        ["$bytes"] => descend(path, PathSegment::Field("$bytes".into()), |path| {
            match map.get("$bytes") {
                Some(Value::String(s)) => BASE64
                    .decode(s)
                    .map(IrNode::Bytes)
                    .map_err(|e| DecodeError::json(path, format!("invalid base64: {e}"))),
                _ => Err(DecodeError::json(path, "expected a base64 string")),
            }
        }),
        ["$time"] => descend(path, PathSegment::Field("$time".into()), |path| {
            match map.get("$time") {
                Some(Value::String(s)) => read_timestamp(s, path),
                _ => Err(DecodeError::json(path, "expected an RFC 3339 string")),
            }
        }),
        ["$some"] => descend(path, PathSegment::Field("$some".into()), |path| {
            match map.get("$some") {
                Some(inner) => Ok(IrNode::some(read_node(inner, path, depth + 1)?)),
                None => Err(DecodeError::json(path, "expected a value")),
            }
        }),
        ["$case", "$payload"] => {
            let case = match map.get("$case") {
                Some(Value::String(s)) => s.clone(),
                _ => {
                    return descend(path, PathSegment::Field("$case".into()), |path| {
                        Err(DecodeError::json(path, "expected a case name string"))
                    })
                }
            };
            let payload = descend(path, PathSegment::Case(case.clone()), |path| {
                match map.get("$payload") {
                    Some(inner) => read_node(inner, path, depth + 1),
                    None => Err(DecodeError::json(path, "expected a payload value")),
                }
            })?;
            Ok(IrNode::Variant {
                case,
                payload: Box::new(payload),
            })
        }
        ["$fn"] => descend(path, PathSegment::Field("$fn".into()), |path| {
            match map.get("$fn") {
                Some(Value::Object(inner)) => read_function(inner, path, depth),
                _ => Err(DecodeError::json(
                    path,
                    "expected an object with 'type' and 'body'",
                )),
            }
        }),
        _ => Err(DecodeError::json(
            path,
            format!(
                "unrecognized '$' wrapper shape (keys: {})",
                keys.join(", ")
            ),
        )),
    }
}

fn read_timestamp(s: &str, path: &mut NodePath) -> Result<IrNode, DecodeError> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .map_err(|e| DecodeError::json(path, format!("invalid RFC 3339 timestamp: {e}")))?;
    // Canonical precision is milliseconds; finer digits are truncated.
    let millis = parsed.with_timezone(&Utc).timestamp_millis();
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(IrNode::Timestamp)
        .ok_or_else(|| DecodeError::json(path, "timestamp is outside the representable range"))
}

fn read_function(
    map: &Map<String, Value>,
    path: &mut NodePath,
    depth: usize,
) -> Result<IrNode, DecodeError> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    if keys != ["body", "type"] {
        return Err(DecodeError::json(
            path,
            format!(
                "function object must have exactly 'type' and 'body' (keys: {})",
                keys.join(", ")
            ),
        ));
    }
    let signature = descend(path, PathSegment::Field("type".into()), |path| {
        let ty = match map.get("type") {
            Some(value) => read_type(value, path, depth + 1)?,
            None => return Err(DecodeError::json(path, "expected a type")),
        };
        if ty.is_function() {
            Ok(ty)
        } else {
            Err(DecodeError::json(
                path,
                format!("function signature must be function-kind, got {}", ty.kind_name()),
            ))
        }
    })?;
    let body = descend(path, PathSegment::Field("body".into()), |path| {
        match map.get("body") {
            Some(Value::String(s)) => BASE64
                .decode(s)
                .map_err(|e| DecodeError::json(path, format!("invalid base64: {e}"))),
            _ => Err(DecodeError::json(path, "expected a base64 string")),
        }
    })?;
    Ok(IrNode::Function(FunctionNode { signature, body }))
}

fn read_type(
    value: &Value,
    path: &mut NodePath,
    depth: usize,
) -> Result<TypeDescriptor, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match value {
        Value::String(name) => PrimitiveKind::from_name(name)
            .map(TypeDescriptor::Primitive)
            .ok_or_else(|| {
                DecodeError::json(path, format!("unknown primitive type {name:?}"))
            }),
        Value::Object(map) if map.len() == 1 => {
            // Sole entry; the iterator yields exactly one pair.
            let Some((kind, inner)) = map.iter().next() else {
                return Err(DecodeError::json(path, "expected a type"));
            };
            match kind.as_str() {
                "struct" => descend(path, PathSegment::Field("struct".into()), |path| {
                    Ok(TypeDescriptor::Struct(read_type_members(
                        inner,
                        path,
                        depth + 1,
                    )?))
                }),
                "variant" => descend(path, PathSegment::Field("variant".into()), |path| {
                    Ok(TypeDescriptor::Variant(read_type_members(
                        inner,
                        path,
                        depth + 1,
                    )?))
                }),
                "array" => descend(path, PathSegment::Field("array".into()), |path| {
                    Ok(TypeDescriptor::array_of(read_type(inner, path, depth + 1)?))
                }),
                "option" => descend(path, PathSegment::Field("option".into()), |path| {
                    Ok(TypeDescriptor::option_of(read_type(inner, path, depth + 1)?))
                }),
                "fn" => descend(path, PathSegment::Field("fn".into()), |path| {
                    read_function_type(inner, path, depth)
                }),
                other => Err(DecodeError::json(
                    path,
                    format!("unknown type kind {other:?}"),
                )),
            }
        }
        _ => Err(DecodeError::json(
            path,
            "expected a type (a primitive name or a single-key object)",
        )),
    }
}

fn read_type_members(
    value: &Value,
    path: &mut NodePath,
    depth: usize,
) -> Result<Vec<(String, TypeDescriptor)>, DecodeError> {
    let Value::Object(map) = value else {
        return Err(DecodeError::json(path, "expected an object of member types"));
    };
    let mut members = Vec::with_capacity(map.len());
    for (name, member) in map {
        if name.starts_with('$') {
            return Err(DecodeError::json(
                path,
                format!("member name {name:?} collides with the reserved '$' prefix"),
            ));
        }
        let ty = descend(path, PathSegment::Field(name.clone()), |path| {
            read_type(member, path, depth + 1)
        })?;
        members.push((name.clone(), ty));
    }
    Ok(members)
}

fn read_function_type(
    value: &Value,
    path: &mut NodePath,
    depth: usize,
) -> Result<TypeDescriptor, DecodeError> {
    let Value::Object(map) = value else {
        return Err(DecodeError::json(
            path,
            "expected an object with 'inputs' and 'output'",
        ));
    };
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    if keys != ["inputs", "output"] {
        return Err(DecodeError::json(
            path,
            format!(
                "function type must have exactly 'inputs' and 'output' (keys: {})",
                keys.join(", ")
            ),
        ));
    }
    let inputs = descend(path, PathSegment::Field("inputs".into()), |path| {
        let Some(Value::Array(items)) = map.get("inputs") else {
            return Err(DecodeError::json(path, "expected an array of types"));
        };
        let mut inputs = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let ty = descend(path, PathSegment::Index(i), |path| {
                read_type(item, path, depth + 1)
            })?;
            inputs.push(ty);
        }
        Ok(inputs)
    })?;
    let output = descend(path, PathSegment::Field("output".into()), |path| {
        match map.get("output") {
            Some(value) => read_type(value, path, depth + 1),
            None => Err(DecodeError::json(path, "expected a type")),
        }
    })?;
    Ok(TypeDescriptor::Function {
        inputs,
        output: Box::new(output),
    })
}

fn write_node(node: &IrNode, path: &mut NodePath, depth: usize) -> Result<Value, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match node {
        IrNode::Null => Ok(Value::Null),
        IrNode::Bool(b) => Ok(Value::Bool(*b)),
        IrNode::Integer(v) => Ok(wrap("$int", Value::String(v.to_string()))),
        IrNode::Float(v) => serde_json::Number::from_f64(*v)
            .map(Value::Number)
            .ok_or(DecodeError::NonFiniteFloat),
        IrNode::Str(s) => Ok(Value::String(s.clone())),
        IrNode::Bytes(b) => Ok(wrap("$bytes", Value::String(BASE64.encode(b)))),
        IrNode::Timestamp(ts) => {
            if canonical_instant(*ts) != *ts {
                return Err(DecodeError::json(
                    path,
                    "timestamp has sub-millisecond precision",
                ));
            }
            Ok(wrap(
                "$time",
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ))
        }
        IrNode::Some(inner) => {
            let value = descend(path, PathSegment::Field("$some".into()), |path| {
                write_node(inner, path, depth + 1)
            })?;
            Ok(wrap("$some", value))
        }
        IrNode::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let value = descend(path, PathSegment::Index(i), |path| {
                    write_node(item, path, depth + 1)
                })?;
                out.push(value);
            }
            Ok(Value::Array(out))
        }
        IrNode::Struct(fields) => {
            let mut map = Map::new();
            for (name, field) in fields {
                if name.starts_with('$') {
                    return Err(DecodeError::json(
                        path,
                        format!("field name {name:?} collides with the reserved '$' prefix"),
                    ));
                }
                let value = descend(path, PathSegment::Field(name.clone()), |path| {
                    write_node(field, path, depth + 1)
                })?;
                if map.insert(name.clone(), value).is_some() {
                    return Err(DecodeError::json(
                        path,
                        format!("duplicate field name {name:?}"),
                    ));
                }
            }
            Ok(Value::Object(map))
        }
        IrNode::Variant { case, payload } => {
            let value = descend(path, PathSegment::Case(case.clone()), |path| {
                write_node(payload, path, depth + 1)
            })?;
            let mut map = Map::new();
            map.insert("$case".to_string(), Value::String(case.clone()));
            map.insert("$payload".to_string(), value);
            Ok(Value::Object(map))
        }
        IrNode::Function(func) => {
            descend(path, PathSegment::Field("$fn".into()), |path| {
                if !func.signature.is_function() {
                    return Err(DecodeError::json(
                        path,
                        format!(
                            "function signature must be function-kind, got {}",
                            func.signature.kind_name()
                        ),
                    ));
                }
                let ty = descend(path, PathSegment::Field("type".into()), |path| {
                    write_type(&func.signature, path, depth + 1)
                })?;
                let mut inner = Map::new();
                inner.insert("type".to_string(), ty);
                inner.insert("body".to_string(), Value::String(BASE64.encode(&func.body)));
                Ok(wrap("$fn", Value::Object(inner)))
            })
        }
    }
}

fn write_type(
    ty: &TypeDescriptor,
    path: &mut NodePath,
    depth: usize,
) -> Result<Value, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match ty {
        TypeDescriptor::Primitive(kind) => Ok(Value::String(kind.name().to_string())),
        TypeDescriptor::Struct(members) => Ok(wrap(
            "struct",
            write_type_members(members, path, depth)?,
        )),
        TypeDescriptor::Variant(members) => Ok(wrap(
            "variant",
            write_type_members(members, path, depth)?,
        )),
        TypeDescriptor::Array(element) => {
            let inner = descend(path, PathSegment::Field("array".into()), |path| {
                write_type(element, path, depth + 1)
            })?;
            Ok(wrap("array", inner))
        }
        TypeDescriptor::Option(element) => {
            let inner = descend(path, PathSegment::Field("option".into()), |path| {
                write_type(element, path, depth + 1)
            })?;
            Ok(wrap("option", inner))
        }
        TypeDescriptor::Function { inputs, output } => {
            descend(path, PathSegment::Field("fn".into()), |path| {
                let mut input_values = Vec::with_capacity(inputs.len());
                for (i, input) in inputs.iter().enumerate() {
                    let value = descend(path, PathSegment::Index(i), |path| {
                        write_type(input, path, depth + 1)
                    })?;
                    input_values.push(value);
                }
                let output_value = descend(path, PathSegment::Field("output".into()), |path| {
                    write_type(output, path, depth + 1)
                })?;
                let mut map = Map::new();
                map.insert("inputs".to_string(), Value::Array(input_values));
                map.insert("output".to_string(), output_value);
                Ok(wrap("fn", Value::Object(map)))
            })
        }
    }
}

fn write_type_members(
    members: &[(String, TypeDescriptor)],
    path: &mut NodePath,
    depth: usize,
) -> Result<Value, DecodeError> {
    let mut map = Map::new();
    for (name, member) in members {
        if name.starts_with('$') {
            return Err(DecodeError::json(
                path,
                format!("member name {name:?} collides with the reserved '$' prefix"),
            ));
        }
        let value = descend(path, PathSegment::Field(name.clone()), |path| {
            write_type(member, path, depth + 1)
        })?;
        if map.insert(name.clone(), value).is_some() {
            return Err(DecodeError::json(
                path,
                format!("duplicate member name {name:?}"),
            ));
        }
    }
    Ok(Value::Object(map))
}

fn wrap(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn descend<T>(
    path: &mut NodePath,
    segment: PathSegment,
    f: impl FnOnce(&mut NodePath) -> Result<T, DecodeError>,
) -> Result<T, DecodeError> {
    path.push(segment);
    let result = f(path);
    path.pop();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_str(text: &str) -> Result<IrNode, DecodeError> {
        decode(text.as_bytes())
    }

    #[test]
    fn test_scalars() {
        assert_eq!(decode_str("null").unwrap(), IrNode::Null);
        assert_eq!(decode_str("true").unwrap(), IrNode::Bool(true));
        assert_eq!(decode_str("\"hi\"").unwrap(), IrNode::Str("hi".into()));
        assert_eq!(decode_str("2.5").unwrap(), IrNode::Float(2.5));
        // A bare number is always a float, even when it looks integral.
        assert_eq!(decode_str("3").unwrap(), IrNode::Float(3.0));
    }

    #[test]
    fn test_int_wrapper() {
        let node = decode_str(r#"{"$int": "170141183460469231731687303715884105727"}"#).unwrap();
        assert_eq!(node, IrNode::Integer(i128::MAX));

        let err = decode_str(r#"{"$int": "12abc"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref path, .. } if path.to_string() == "value.$int"));

        let err = decode_str(r#"{"$int": 12}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("decimal string")));
    }

    #[test]
    fn test_bytes_wrapper() {
        let node = decode_str(r#"{"$bytes": "3q2+7w=="}"#).unwrap();
        assert_eq!(node, IrNode::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));

        let err = decode_str(r#"{"$bytes": "not-base64!"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("base64")));
    }

    #[test]
    fn test_time_wrapper_truncates_to_millis() {
        let node = decode_str(r#"{"$time": "2026-08-23T10:15:30.123456Z"}"#).unwrap();
        let IrNode::Timestamp(ts) = node else {
            panic!("expected timestamp")
        };
        assert_eq!(
            ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            "2026-08-23T10:15:30.123Z"
        );
        assert_eq!(ts.timestamp_subsec_micros() % 1000, 0);

        // Offsets normalize to UTC.
        let node = decode_str(r#"{"$time": "2026-08-23T12:15:30.123+02:00"}"#).unwrap();
        let IrNode::Timestamp(offset_ts) = node else {
            panic!("expected timestamp")
        };
        assert_eq!(offset_ts, ts);

        let err = decode_str(r#"{"$time": "yesterday"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("RFC 3339")));
    }

    #[test]
    fn test_some_wrapper_is_distinct_from_null() {
        assert_eq!(decode_str("null").unwrap(), IrNode::Null);
        assert_eq!(
            decode_str(r#"{"$some": null}"#).unwrap(),
            IrNode::some(IrNode::Null)
        );
        assert_eq!(
            decode_str(r#"{"$some": {"$some": 1.0}}"#).unwrap(),
            IrNode::some(IrNode::some(IrNode::Float(1.0)))
        );
    }

    #[test]
    fn test_variant_wrapper() {
        let node = decode_str(r#"{"$case": "Text", "$payload": "hello"}"#).unwrap();
        assert_eq!(node, IrNode::variant("Text", IrNode::from("hello")));

        let err = decode_str(r#"{"$case": "Text"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("$case")));

        let err = decode_str(r#"{"$case": 7, "$payload": null}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref path, .. } if path.to_string() == "value.$case"));
    }

    #[test]
    fn test_fn_wrapper() {
        let text = r#"{"$fn": {"type": {"fn": {"inputs": ["string"], "output": "boolean"}}, "body": "AAEC"}}"#;
        let node = decode_str(text).unwrap();
        let expected = IrNode::Function(FunctionNode::new(
            TypeDescriptor::function_of(
                vec![TypeDescriptor::string()],
                TypeDescriptor::boolean(),
            ),
            vec![0, 1, 2],
        ));
        assert_eq!(node, expected);
    }

    #[test]
    fn test_fn_wrapper_requires_function_type() {
        let err = decode_str(r#"{"$fn": {"type": "integer", "body": ""}}"#).unwrap_err();
        let DecodeError::Json { path, reason } = err else {
            panic!("expected a json error")
        };
        assert_eq!(path.to_string(), "value.$fn.type");
        assert!(reason.contains("function-kind"));
    }

    #[test]
    fn test_unknown_wrapper_is_rejected() {
        let err = decode_str(r#"{"$widget": 1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("$widget")));
    }

    #[test]
    fn test_mixed_wrapper_and_plain_keys_rejected() {
        let err = decode_str(r#"{"a": 1, "$int": "2"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Json { .. }));
    }

    #[test]
    fn test_struct_keeps_field_order() {
        let node = decode_str(r#"{"zeta": 1.0, "alpha": 2.0}"#).unwrap();
        let IrNode::Struct(fields) = &node else {
            panic!("expected struct")
        };
        assert_eq!(fields[0].0, "zeta");
        assert_eq!(fields[1].0, "alpha");
        assert_eq!(encode(&node).unwrap(), r#"{"zeta":1.0,"alpha":2.0}"#);
    }

    #[test]
    fn test_nested_error_path() {
        let err = decode_str(r#"{"items": [{"x": {"$int": "zz"}}]}"#).unwrap_err();
        let DecodeError::Json { path, .. } = err else {
            panic!("expected a json error")
        };
        assert_eq!(path.to_string(), "value.items[0].x.$int");
    }

    #[test]
    fn test_encode_rejects_reserved_field_names() {
        let node = IrNode::struct_of([("$int", IrNode::Null)]);
        let err = to_value(&node).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("reserved")));
    }

    #[test]
    fn test_encode_rejects_duplicate_field_names() {
        let node = IrNode::Struct(vec![
            ("a".to_string(), IrNode::Null),
            ("a".to_string(), IrNode::Bool(true)),
        ]);
        let err = to_value(&node).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("duplicate")));
    }

    #[test]
    fn test_encode_rejects_non_finite_floats() {
        let node = IrNode::Array(vec![IrNode::Float(f64::NEG_INFINITY)]);
        assert_eq!(to_value(&node).unwrap_err(), DecodeError::NonFiniteFloat);
    }

    #[test]
    fn test_encode_rejects_sub_millisecond_timestamps() {
        let fine = Utc.timestamp_opt(1_700_000_000, 123_456_789).single().unwrap();
        let err = to_value(&IrNode::Timestamp(fine)).unwrap_err();
        assert!(
            matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("millisecond"))
        );

        // The From conversion truncates, so trees built through it encode
        // and round-trip exactly.
        let node = IrNode::from(fine);
        assert_eq!(from_value(&to_value(&node).unwrap()).unwrap(), node);
    }

    #[test]
    fn test_value_roundtrip() {
        let tree = IrNode::struct_of([
            ("title", IrNode::from("preview")),
            ("count", IrNode::from(1_i128 << 90)),
            ("ratio", IrNode::from(0.25)),
            ("raw", IrNode::Bytes(vec![1, 2, 3])),
            ("maybe", IrNode::some(IrNode::Null)),
            (
                "content",
                IrNode::variant("Image", IrNode::Bytes(vec![9, 9])),
            ),
            (
                "when",
                IrNode::Timestamp(Utc.timestamp_millis_opt(1_700_000_000_555).single().unwrap()),
            ),
            (
                "render",
                IrNode::Function(FunctionNode::new(
                    TypeDescriptor::function_of(
                        vec![TypeDescriptor::option_of(TypeDescriptor::integer())],
                        TypeDescriptor::variant_of([
                            ("Ok", TypeDescriptor::null()),
                            ("Err", TypeDescriptor::string()),
                        ]),
                    ),
                    b"compiled".to_vec(),
                )),
            ),
        ]);
        let value = to_value(&tree).unwrap();
        assert_eq!(from_value(&value).unwrap(), tree);

        let text = encode(&tree).unwrap();
        assert_eq!(decode(text.as_bytes()).unwrap(), tree);
    }

    #[test]
    fn test_type_forms_roundtrip() {
        let types = [
            TypeDescriptor::integer(),
            TypeDescriptor::null(),
            TypeDescriptor::struct_of([
                ("a", TypeDescriptor::float()),
                ("b", TypeDescriptor::array_of(TypeDescriptor::bytes())),
            ]),
            TypeDescriptor::variant_of([
                ("Left", TypeDescriptor::timestamp()),
                ("Right", TypeDescriptor::option_of(TypeDescriptor::boolean())),
            ]),
            TypeDescriptor::function_of(
                vec![TypeDescriptor::string(), TypeDescriptor::string()],
                TypeDescriptor::struct_of([("done", TypeDescriptor::boolean())]),
            ),
        ];
        for ty in types {
            let value = type_to_value(&ty).unwrap();
            assert_eq!(type_from_value(&value).unwrap(), ty, "{ty}");
        }
    }

    #[test]
    fn test_unknown_primitive_type() {
        let err = type_from_value(&Value::String("widget".into())).unwrap_err();
        assert!(matches!(err, DecodeError::Json { ref reason, .. } if reason.contains("widget")));
    }

    #[test]
    fn test_syntax_error() {
        let err = decode_str("{not json").unwrap_err();
        assert!(matches!(err, DecodeError::Syntax { .. }));
    }

    #[test]
    fn test_trailing_text_is_a_syntax_error() {
        let err = decode_str("null null").unwrap_err();
        assert!(matches!(err, DecodeError::Syntax { .. }));
    }

    #[test]
    fn test_depth_bomb_via_value() {
        let mut value = Value::Null;
        for _ in 0..MAX_NESTING_DEPTH + 10 {
            value = Value::Array(vec![value]);
        }
        let err = from_value(&value).unwrap_err();
        assert_eq!(
            err,
            DecodeError::DepthExceeded {
                limit: MAX_NESTING_DEPTH
            }
        );
    }
}
