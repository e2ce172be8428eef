//! The self-describing binary artifact format.
//!
//! Artifacts are framed the same way on disk and on the wire:
//!
//! ```text
//! artifact := magic(4 = "VITR") version(u8) payload_len(u32 LE) payload crc32(u32 LE)
//! ```
//!
//! The payload holds exactly one node. Every node starts with a tag byte, so
//! the stream is self-describing and decoding never needs a schema:
//!
//! ```text
//! node := 0x01                                    null
//!       | 0x02 | 0x03                             false / true
//!       | 0x04 width(u8) bytes[width]             integer, two's-complement LE, minimal width
//!       | 0x05 f64(LE)                            float, finite only
//!       | 0x06 len(u32 LE) utf8[len]              string
//!       | 0x07 len(u32 LE) raw[len]               bytes
//!       | 0x08 i64(LE)                            timestamp, millis since epoch
//!       | 0x09 node                               present option
//!       | 0x0a count(u32 LE) node*                array
//!       | 0x0b count(u32 LE) (name node)*         struct, unique names
//!       | 0x0c name node                          variant case + payload
//!       | 0x0d type len(u32 LE) raw[len]          function signature + body
//!
//! type := 0x20..=0x26                             integer float string boolean bytes timestamp null
//!       | 0x30 count(u32 LE) (name type)*         struct
//!       | 0x31 count(u32 LE) (name type)*         variant
//!       | 0x32 type                               array
//!       | 0x33 type                               option
//!       | 0x34 count(u32 LE) type* type           function inputs + output
//! ```
//!
//! Every length is validated against the bytes actually remaining before
//! anything is read or allocated, so truncated and hostile inputs fail with
//! a typed error instead of reading out of bounds.

use chrono::{TimeZone, Utc};
use crc32fast::Hasher;

use crate::codec::{MAX_NESTING_DEPTH, MAX_PAYLOAD_BYTES};
use crate::error::DecodeError;
use crate::node::{canonical_instant, FunctionNode, IrNode};
use crate::types::{PrimitiveKind, TypeDescriptor};

/// Magic bytes identifying a binary artifact.
pub const MAGIC: [u8; 4] = *b"VITR";

/// Artifact format version this build reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// magic + version + payload length.
const HEADER_LEN: usize = 9;
/// Trailing crc32.
const FOOTER_LEN: usize = 4;

// Value tags.
const TAG_NULL: u8 = 0x01;
const TAG_FALSE: u8 = 0x02;
const TAG_TRUE: u8 = 0x03;
const TAG_INT: u8 = 0x04;
const TAG_FLOAT: u8 = 0x05;
const TAG_STR: u8 = 0x06;
const TAG_BYTES: u8 = 0x07;
const TAG_TIMESTAMP: u8 = 0x08;
const TAG_SOME: u8 = 0x09;
const TAG_ARRAY: u8 = 0x0a;
const TAG_STRUCT: u8 = 0x0b;
const TAG_VARIANT: u8 = 0x0c;
const TAG_FUNCTION: u8 = 0x0d;

// Type tags.
const TY_INTEGER: u8 = 0x20;
const TY_FLOAT: u8 = 0x21;
const TY_STRING: u8 = 0x22;
const TY_BOOLEAN: u8 = 0x23;
const TY_BYTES: u8 = 0x24;
const TY_TIMESTAMP: u8 = 0x25;
const TY_NULL: u8 = 0x26;
const TY_STRUCT: u8 = 0x30;
const TY_VARIANT: u8 = 0x31;
const TY_ARRAY: u8 = 0x32;
const TY_OPTION: u8 = 0x33;
const TY_FUNCTION: u8 = 0x34;

/// Decodes one framed artifact into a node tree.
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the byte offset of the failure for a
/// bad header, a checksum mismatch, any malformed node, or bytes left over
/// after the single top-level node.
pub fn decode(input: &[u8]) -> Result<IrNode, DecodeError> {
    if input.len() < HEADER_LEN + FOOTER_LEN {
        return Err(DecodeError::UnexpectedEof {
            offset: input.len(),
        });
    }

    let mut found = [0u8; 4];
    found.copy_from_slice(&input[..4]);
    if found != MAGIC {
        return Err(DecodeError::BadMagic {
            found,
            expected: MAGIC,
        });
    }

    let version = input[4];
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&input[5..9]);
    let declared = u32::from_le_bytes(len_bytes) as usize;
    if declared > MAX_PAYLOAD_BYTES {
        return Err(DecodeError::PayloadTooLarge {
            declared: declared as u64,
            limit: MAX_PAYLOAD_BYTES,
        });
    }

    let available = input.len() - HEADER_LEN - FOOTER_LEN;
    if declared > available {
        return Err(DecodeError::LengthOverrun {
            offset: 5,
            declared: declared as u64,
            remaining: available,
        });
    }

    let payload = &input[HEADER_LEN..HEADER_LEN + declared];
    let footer_at = HEADER_LEN + declared;

    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&input[footer_at..footer_at + FOOTER_LEN]);
    let stored = u32::from_le_bytes(crc_bytes);
    let mut hasher = Hasher::new();
    hasher.update(payload);
    let computed = hasher.finalize();
    if stored != computed {
        return Err(DecodeError::ChecksumMismatch { stored, computed });
    }

    if input.len() > footer_at + FOOTER_LEN {
        return Err(DecodeError::TrailingBytes {
            offset: footer_at + FOOTER_LEN,
            remaining: input.len() - footer_at - FOOTER_LEN,
        });
    }

    let mut reader = Reader::new(payload, HEADER_LEN);
    let node = read_node(&mut reader, 0)?;
    if reader.remaining() > 0 {
        return Err(DecodeError::TrailingBytes {
            offset: reader.offset(),
            remaining: reader.remaining(),
        });
    }
    Ok(node)
}

/// Encodes a node tree into one framed artifact.
///
/// # Errors
///
/// Rejects trees the format cannot carry: non-finite floats, timestamps
/// finer than the millisecond grid, duplicate struct field names, function
/// nodes with non-function signatures, nesting past [`MAX_NESTING_DEPTH`],
/// and payloads past [`MAX_PAYLOAD_BYTES`]. Every artifact this returns
/// decodes back to an equal tree.
pub fn encode(node: &IrNode) -> Result<Vec<u8>, DecodeError> {
    let mut payload = Vec::new();
    write_node(&mut payload, node, 0)?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(DecodeError::PayloadTooLarge {
            declared: payload.len() as u64,
            limit: MAX_PAYLOAD_BYTES,
        });
    }

    let mut hasher = Hasher::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&crc.to_le_bytes());
    Ok(out)
}

/// Cursor over the payload region.
///
/// `base` is the payload's offset within the whole artifact, so reported
/// offsets always index the input the caller handed in.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    const fn new(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    const fn offset(&self) -> usize {
        self.base + self.pos
    }

    const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                offset: self.base + self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn i64(&mut self) -> Result<i64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    fn f64(&mut self) -> Result<f64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(buf))
    }

    /// Reads a u32 length or element count and validates it against the
    /// remaining payload before anything is allocated. Elements occupy at
    /// least one byte each, so the same bound works for counts.
    fn len_prefix(&mut self) -> Result<usize, DecodeError> {
        let at = self.offset();
        let declared = self.u32()? as usize;
        if declared > self.remaining() {
            return Err(DecodeError::LengthOverrun {
                offset: at,
                declared: declared as u64,
                remaining: self.remaining(),
            });
        }
        Ok(declared)
    }

    fn blob(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.len_prefix()?;
        self.take(len)
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let at = self.offset();
        let bytes = self.blob()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { offset: at })
    }
}

fn read_node(r: &mut Reader<'_>, depth: usize) -> Result<IrNode, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    let at = r.offset();
    let tag = r.u8()?;
    match tag {
        TAG_NULL => Ok(IrNode::Null),
        TAG_FALSE => Ok(IrNode::Bool(false)),
        TAG_TRUE => Ok(IrNode::Bool(true)),
        TAG_INT => read_int(r),
        TAG_FLOAT => {
            let v = r.f64()?;
            if v.is_finite() {
                Ok(IrNode::Float(v))
            } else {
                Err(DecodeError::NonFiniteFloat)
            }
        }
        TAG_STR => Ok(IrNode::Str(r.string()?)),
        TAG_BYTES => Ok(IrNode::Bytes(r.blob()?.to_vec())),
        TAG_TIMESTAMP => {
            let ts_at = r.offset();
            let millis = r.i64()?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(IrNode::Timestamp)
                .ok_or(DecodeError::InvalidTimestamp {
                    offset: ts_at,
                    millis,
                })
        }
        TAG_SOME => Ok(IrNode::some(read_node(r, depth + 1)?)),
        TAG_ARRAY => {
            let count = r.len_prefix()?;
            let mut items = Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                items.push(read_node(r, depth + 1)?);
            }
            Ok(IrNode::Array(items))
        }
        TAG_STRUCT => {
            let count = r.len_prefix()?;
            let mut fields: Vec<(String, IrNode)> =
                Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                let name_at = r.offset();
                let name = r.string()?;
                if fields.iter().any(|(n, _)| *n == name) {
                    return Err(DecodeError::DuplicateName {
                        offset: name_at,
                        name,
                    });
                }
                let value = read_node(r, depth + 1)?;
                fields.push((name, value));
            }
            Ok(IrNode::Struct(fields))
        }
        TAG_VARIANT => {
            let case = r.string()?;
            let payload = read_node(r, depth + 1)?;
            Ok(IrNode::variant(case, payload))
        }
        TAG_FUNCTION => {
            let sig_at = r.offset();
            let signature = read_type(r, depth + 1)?;
            if !signature.is_function() {
                return Err(DecodeError::NotAFunctionSignature { offset: sig_at });
            }
            let body = r.blob()?.to_vec();
            Ok(IrNode::Function(FunctionNode { signature, body }))
        }
        _ => Err(DecodeError::UnknownTag { offset: at, tag }),
    }
}

fn read_int(r: &mut Reader<'_>) -> Result<IrNode, DecodeError> {
    let at = r.offset();
    let width = r.u8()?;
    let w = width as usize;
    if w == 0 || w > 16 {
        return Err(DecodeError::NonCanonicalInt { offset: at, width });
    }
    let bytes = r.take(w)?;
    if w > 1 {
        let hi = bytes[w - 1];
        let next = bytes[w - 2];
        let redundant = (hi == 0x00 && next & 0x80 == 0) || (hi == 0xff && next & 0x80 != 0);
        if redundant {
            return Err(DecodeError::NonCanonicalInt { offset: at, width });
        }
    }
    let mut buf = if bytes[w - 1] & 0x80 == 0 {
        [0u8; 16]
    } else {
        [0xff; 16]
    };
    buf[..w].copy_from_slice(bytes);
    Ok(IrNode::Integer(i128::from_le_bytes(buf)))
}

fn read_type(r: &mut Reader<'_>, depth: usize) -> Result<TypeDescriptor, DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    let at = r.offset();
    let tag = r.u8()?;
    match tag {
        TY_INTEGER => Ok(TypeDescriptor::integer()),
        TY_FLOAT => Ok(TypeDescriptor::float()),
        TY_STRING => Ok(TypeDescriptor::string()),
        TY_BOOLEAN => Ok(TypeDescriptor::boolean()),
        TY_BYTES => Ok(TypeDescriptor::bytes()),
        TY_TIMESTAMP => Ok(TypeDescriptor::timestamp()),
        TY_NULL => Ok(TypeDescriptor::null()),
        TY_STRUCT => Ok(TypeDescriptor::Struct(read_members(r, depth)?)),
        TY_VARIANT => Ok(TypeDescriptor::Variant(read_members(r, depth)?)),
        TY_ARRAY => Ok(TypeDescriptor::array_of(read_type(r, depth + 1)?)),
        TY_OPTION => Ok(TypeDescriptor::option_of(read_type(r, depth + 1)?)),
        TY_FUNCTION => {
            let count = r.len_prefix()?;
            let mut inputs = Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                inputs.push(read_type(r, depth + 1)?);
            }
            let output = read_type(r, depth + 1)?;
            Ok(TypeDescriptor::Function {
                inputs,
                output: Box::new(output),
            })
        }
        _ => Err(DecodeError::UnknownTypeTag { offset: at, tag }),
    }
}

fn read_members(
    r: &mut Reader<'_>,
    depth: usize,
) -> Result<Vec<(String, TypeDescriptor)>, DecodeError> {
    let count = r.len_prefix()?;
    let mut members: Vec<(String, TypeDescriptor)> =
        Vec::with_capacity(count.min(r.remaining()));
    for _ in 0..count {
        let name_at = r.offset();
        let name = r.string()?;
        if members.iter().any(|(n, _)| *n == name) {
            return Err(DecodeError::DuplicateName {
                offset: name_at,
                name,
            });
        }
        let ty = read_type(r, depth + 1)?;
        members.push((name, ty));
    }
    Ok(members)
}

fn write_node(out: &mut Vec<u8>, node: &IrNode, depth: usize) -> Result<(), DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match node {
        IrNode::Null => out.push(TAG_NULL),
        IrNode::Bool(false) => out.push(TAG_FALSE),
        IrNode::Bool(true) => out.push(TAG_TRUE),
        IrNode::Integer(v) => {
            out.push(TAG_INT);
            write_int(out, *v);
        }
        IrNode::Float(v) => {
            if !v.is_finite() {
                return Err(DecodeError::NonFiniteFloat);
            }
            out.push(TAG_FLOAT);
            out.extend_from_slice(&v.to_le_bytes());
        }
        IrNode::Str(s) => {
            out.push(TAG_STR);
            write_blob(out, s.as_bytes())?;
        }
        IrNode::Bytes(b) => {
            out.push(TAG_BYTES);
            write_blob(out, b)?;
        }
        IrNode::Timestamp(ts) => {
            if canonical_instant(*ts) != *ts {
                return Err(DecodeError::InvalidTimestamp {
                    offset: HEADER_LEN + out.len(),
                    millis: ts.timestamp_millis(),
                });
            }
            out.push(TAG_TIMESTAMP);
            out.extend_from_slice(&ts.timestamp_millis().to_le_bytes());
        }
        IrNode::Some(inner) => {
            out.push(TAG_SOME);
            write_node(out, inner, depth + 1)?;
        }
        IrNode::Array(items) => {
            out.push(TAG_ARRAY);
            write_count(out, items.len())?;
            for item in items {
                write_node(out, item, depth + 1)?;
            }
        }
        IrNode::Struct(fields) => {
            out.push(TAG_STRUCT);
            write_count(out, fields.len())?;
            for (i, (name, value)) in fields.iter().enumerate() {
                if fields[..i].iter().any(|(n, _)| n == name) {
                    return Err(DecodeError::DuplicateName {
                        offset: HEADER_LEN + out.len(),
                        name: name.clone(),
                    });
                }
                write_blob(out, name.as_bytes())?;
                write_node(out, value, depth + 1)?;
            }
        }
        IrNode::Variant { case, payload } => {
            out.push(TAG_VARIANT);
            write_blob(out, case.as_bytes())?;
            write_node(out, payload, depth + 1)?;
        }
        IrNode::Function(func) => {
            if !func.signature.is_function() {
                return Err(DecodeError::NotAFunctionSignature {
                    offset: HEADER_LEN + out.len(),
                });
            }
            out.push(TAG_FUNCTION);
            write_type(out, &func.signature, depth + 1)?;
            write_blob(out, &func.body)?;
        }
    }
    Ok(())
}

/// Writes an integer at its minimal two's-complement width.
fn write_int(out: &mut Vec<u8>, v: i128) {
    let bytes = v.to_le_bytes();
    let mut width = 16;
    while width > 1 {
        let hi = bytes[width - 1];
        let next = bytes[width - 2];
        let redundant = (hi == 0x00 && next & 0x80 == 0) || (hi == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        width -= 1;
    }
    out.push(width as u8);
    out.extend_from_slice(&bytes[..width]);
}

fn write_type(out: &mut Vec<u8>, ty: &TypeDescriptor, depth: usize) -> Result<(), DecodeError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::DepthExceeded {
            limit: MAX_NESTING_DEPTH,
        });
    }
    match ty {
        TypeDescriptor::Primitive(kind) => out.push(match kind {
            PrimitiveKind::Integer => TY_INTEGER,
            PrimitiveKind::Float => TY_FLOAT,
            PrimitiveKind::String => TY_STRING,
            PrimitiveKind::Boolean => TY_BOOLEAN,
            PrimitiveKind::Bytes => TY_BYTES,
            PrimitiveKind::Timestamp => TY_TIMESTAMP,
            PrimitiveKind::Null => TY_NULL,
        }),
        TypeDescriptor::Struct(members) => {
            out.push(TY_STRUCT);
            write_members(out, members, depth)?;
        }
        TypeDescriptor::Variant(members) => {
            out.push(TY_VARIANT);
            write_members(out, members, depth)?;
        }
        TypeDescriptor::Array(element) => {
            out.push(TY_ARRAY);
            write_type(out, element, depth + 1)?;
        }
        TypeDescriptor::Option(inner) => {
            out.push(TY_OPTION);
            write_type(out, inner, depth + 1)?;
        }
        TypeDescriptor::Function { inputs, output } => {
            out.push(TY_FUNCTION);
            write_count(out, inputs.len())?;
            for input in inputs {
                write_type(out, input, depth + 1)?;
            }
            write_type(out, output, depth + 1)?;
        }
    }
    Ok(())
}

fn write_members(
    out: &mut Vec<u8>,
    members: &[(String, TypeDescriptor)],
    depth: usize,
) -> Result<(), DecodeError> {
    write_count(out, members.len())?;
    for (i, (name, ty)) in members.iter().enumerate() {
        if members[..i].iter().any(|(n, _)| n == name) {
            return Err(DecodeError::DuplicateName {
                offset: HEADER_LEN + out.len(),
                name: name.clone(),
            });
        }
        write_blob(out, name.as_bytes())?;
        write_type(out, ty, depth + 1)?;
    }
    Ok(())
}

fn write_count(out: &mut Vec<u8>, n: usize) -> Result<(), DecodeError> {
    let n32 = u32::try_from(n).map_err(|_| DecodeError::PayloadTooLarge {
        declared: n as u64,
        limit: MAX_PAYLOAD_BYTES,
    })?;
    out.extend_from_slice(&n32.to_le_bytes());
    Ok(())
}

fn write_blob(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), DecodeError> {
    write_count(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}
