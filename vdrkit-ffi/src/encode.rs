//! Conversion of caller values into the representations expected by native calls.
use crate::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::ffi::CString;
use std::marker::PhantomData;

/// Sentinel passed for an absent 32-bit numeric argument.
pub const ABSENT_I32: i32 = -1;
/// Sentinel passed for an absent 64-bit numeric argument.
pub const ABSENT_I64: i64 = -1;

pub fn encode_i32(value: Option<i32>) -> i32 {
    value.unwrap_or(ABSENT_I32)
}

pub fn encode_i64(value: Option<i64>) -> i64 {
    value.unwrap_or(ABSENT_I64)
}

/// Encodes an optional string. `None` becomes a null pointer at the call site.
pub fn encode_str(value: Option<&str>) -> Result<Option<CString>> {
    value.map(CString::new).transpose().map_err(Into::into)
}

/// Serializes a structured value into a JSON C string.
pub fn encode_json<T>(value: &T) -> Result<CString>
where
    T: Serialize + ?Sized,
{
    Ok(CString::new(serde_json::to_vec(value)?)?)
}

/// A JSON payload supplied by the caller.
///
/// Strings and bytes are passed through verbatim; structured values are serialized.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonInput {
    Str(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl JsonInput {
    pub fn to_cstring(&self) -> Result<CString> {
        match self {
            Self::Str(s) => Ok(CString::new(s.as_bytes())?),
            Self::Bytes(b) => Ok(CString::new(b.as_slice())?),
            Self::Json(v) => encode_json(v),
        }
    }
}

impl From<String> for JsonInput {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for JsonInput {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<Vec<u8>> for JsonInput {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for JsonInput {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Value> for JsonInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// A borrowed byte array in the layout the native engine expects.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ByteBuffer<'a> {
    len: i64,
    data: *const u8,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> ByteBuffer<'a> {
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self { len: bytes.len() as i64, data: bytes.as_ptr(), _marker: PhantomData }
    }
    pub fn as_slice(&self) -> &'a [u8] {
        // SAFETY: only constructed from a live slice of this lifetime.
        unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
    }
}
