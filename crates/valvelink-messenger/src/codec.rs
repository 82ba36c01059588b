//! Field codec.
//!
//! Converts single typed values to and from their textual wire tokens:
//!
//! - Integers and floats use their plain decimal form.
//! - Booleans use the [`BOOL_FALSE`]/[`BOOL_TRUE`] sentinels.
//! - Strings escape every reserved character with [`ESCAPE_CHAR`].
//! - Bounded arrays always occupy `capacity * shape.len()` tokens, however
//!   many of the elements are meaningful.

use crate::constants::*;
use crate::error::FormatError;

/// The wire type of one signature slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Signed 32-bit integer (`int` on the firmware).
    Int32,
    /// Unsigned 32-bit integer (`unsigned long` on the firmware).
    UInt32,
    /// 32-bit float.
    Float32,
    /// Boolean sentinel.
    Bool,
    /// Escaped string.
    String,
    /// Fixed-capacity array of element tuples. The shape must only contain
    /// scalar types.
    BoundedArray(&'static [FieldType], usize),
}

impl FieldType {
    /// Number of wire tokens this type occupies.
    pub fn token_count(&self) -> usize {
        match self {
            FieldType::BoundedArray(shape, capacity) => {
                shape.iter().map(FieldType::token_count).sum::<usize>() * capacity
            }
            _ => 1,
        }
    }

    /// Short name used in diagnostics and the schema fingerprint.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::UInt32 => "uint32",
            FieldType::Float32 => "float32",
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::BoundedArray(..) => "array",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::BoundedArray(shape, capacity) => {
                write!(f, "array<(")?;
                for (i, ty) in shape.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", ty)?;
                }
                write!(f, "); {}>", capacity)
            }
            other => f.write_str(other.name()),
        }
    }
}

/// A decoded (or to-be-encoded) field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Bool(bool),
    String(String),
    /// Array elements, each holding one value per shape slot.
    Array(Vec<Vec<Value>>),
}

impl Value {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Vec<Value>]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Name of the runtime type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Float32(_) => "float32",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

/// A value whose runtime type does not match the requested field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Declared field type.
    pub expected: String,
    /// Runtime type of the supplied value.
    pub found: &'static str,
}

impl std::fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.found)
    }
}

/// Escape every reserved character in `text`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() && is_reserved(c as u8) {
            out.push(ESCAPE_CHAR as char);
        }
        out.push(c);
    }
    out
}

/// Strip one escape character before each escaped character.
pub fn unescape(token: &str) -> Result<String, FormatError> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR as char {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err(FormatError::DanglingEscape),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// Encode `value` as the text of one field of type `field_type`.
///
/// Bounded arrays produce `field_type.token_count()` tokens joined by the
/// field separator; elements missing from `value` are padded with zero
/// values. Supplying more elements than the capacity is a mismatch.
pub fn encode_field(value: &Value, field_type: FieldType) -> Result<String, TypeMismatch> {
    let mismatch = || TypeMismatch {
        expected: field_type.to_string(),
        found: value.type_name(),
    };

    match (field_type, value) {
        (FieldType::Int32, Value::Int32(v)) => Ok(v.to_string()),
        (FieldType::UInt32, Value::UInt32(v)) => Ok(v.to_string()),
        (FieldType::Float32, Value::Float32(v)) => Ok(v.to_string()),
        (FieldType::Bool, Value::Bool(v)) => Ok(encode_bool(*v).to_string()),
        (FieldType::String, Value::String(v)) => Ok(escape(v)),
        (FieldType::BoundedArray(shape, capacity), Value::Array(elements)) => {
            if elements.len() > capacity {
                return Err(mismatch());
            }
            let mut tokens = Vec::with_capacity(field_type.token_count());
            for element in elements {
                if element.len() != shape.len() {
                    return Err(mismatch());
                }
                for (slot, ty) in element.iter().zip(shape.iter()) {
                    tokens.push(encode_field(slot, *ty)?);
                }
            }
            for _ in elements.len()..capacity {
                for ty in shape.iter() {
                    tokens.push(encode_field(&zero_value(*ty), *ty)?);
                }
            }
            let separator = (FIELD_SEPARATOR as char).to_string();
            Ok(tokens.join(separator.as_str()))
        }
        _ => Err(mismatch()),
    }
}

fn encode_bool(value: bool) -> &'static str {
    if value {
        BOOL_TRUE
    } else {
        BOOL_FALSE
    }
}

fn zero_value(field_type: FieldType) -> Value {
    match field_type {
        FieldType::Int32 => Value::Int32(0),
        FieldType::UInt32 => Value::UInt32(0),
        FieldType::Float32 => Value::Float32(0.0),
        FieldType::Bool => Value::Bool(false),
        FieldType::String => Value::String(String::new()),
        FieldType::BoundedArray(..) => Value::Array(Vec::new()),
    }
}

/// Sequential reader over the raw tokens of one frame.
#[derive(Debug)]
pub struct TokenCursor<'a> {
    tokens: &'a [String],
    position: usize,
}

impl<'a> TokenCursor<'a> {
    /// Create a cursor at the first token.
    pub fn new(tokens: &'a [String]) -> Self {
        TokenCursor {
            tokens,
            position: 0,
        }
    }

    /// Index of the next token to be read.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of tokens not yet read.
    pub fn remaining(&self) -> usize {
        self.tokens.len().saturating_sub(self.position)
    }

    fn next_token(&mut self) -> &'a str {
        let token = self.tokens.get(self.position).map(String::as_str).unwrap_or("");
        self.position += 1;
        token
    }
}

/// Decode one field of type `field_type`, consuming its tokens from `cursor`.
///
/// A bounded array always yields exactly `capacity` elements. Reading past
/// the last token behaves like reading an empty token.
pub fn decode_field(cursor: &mut TokenCursor<'_>, field_type: FieldType) -> Result<Value, FormatError> {
    match field_type {
        FieldType::BoundedArray(shape, capacity) => {
            let mut elements = Vec::with_capacity(capacity);
            for _ in 0..capacity {
                let mut element = Vec::with_capacity(shape.len());
                for ty in shape.iter() {
                    element.push(decode_field(cursor, *ty)?);
                }
                elements.push(element);
            }
            Ok(Value::Array(elements))
        }
        scalar => decode_token(cursor.next_token(), scalar),
    }
}

/// Split `text` on field separators that are not escaped.
///
/// Escape sequences are kept verbatim in the returned tokens.
pub fn split_fields(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE_CHAR as char {
            current.push(c);
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
        } else if c == FIELD_SEPARATOR as char {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    tokens.push(current);
    tokens
}

/// Decode the text produced by [`encode_field`].
///
/// For scalar types `token` is one wire token; for bounded arrays it is the
/// separator-joined run of all the array's tokens.
pub fn decode_token(token: &str, field_type: FieldType) -> Result<Value, FormatError> {
    let not_numeric = || FormatError::NotNumeric(token.to_string());
    match field_type {
        FieldType::Int32 => token.parse().map(Value::Int32).map_err(|_| not_numeric()),
        FieldType::UInt32 => token.parse().map(Value::UInt32).map_err(|_| not_numeric()),
        FieldType::Float32 => token.parse().map(Value::Float32).map_err(|_| not_numeric()),
        FieldType::Bool => match token {
            BOOL_TRUE => Ok(Value::Bool(true)),
            BOOL_FALSE => Ok(Value::Bool(false)),
            _ => Err(FormatError::NotBoolean(token.to_string())),
        },
        FieldType::String => unescape(token).map(Value::String),
        FieldType::BoundedArray(..) => {
            let tokens = split_fields(token);
            let mut cursor = TokenCursor::new(&tokens);
            let value = decode_field(&mut cursor, field_type)?;
            match cursor.remaining() {
                0 => Ok(value),
                extra => Err(FormatError::TrailingTokens(extra)),
            }
        }
    }
}
