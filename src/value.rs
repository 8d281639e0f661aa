//! Native-side values exchanged with foreign functions

use crate::array::{ArrayBuffer, Element};
use ndarray::ArrayD;
use std::fmt;

/// A parameter value on the Rust side of a call
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    UInt(u32),
    Long(i64),
    Float(f32),
    /// Text buffer contents, without the NUL terminator
    Text(Vec<u8>),
    Array(ArrayBuffer),
}

impl Value {
    /// Descriptor type tag this value belongs to
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::Array(_) => "array",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Self::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Text contents up to the first NUL, lossily decoded
    pub fn as_text(&self) -> Option<String> {
        self.as_bytes().map(|bytes| {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        })
    }

    pub fn as_array(&self) -> Option<&ArrayBuffer> {
        match self {
            Self::Array(buf) => Some(buf),
            _ => None,
        }
    }

    /// Typed view of an array value
    pub fn array_view<T: Element>(&self) -> Option<&ArrayD<T>> {
        self.as_array().and_then(|buf| buf.view::<T>())
    }

    pub fn into_array(self) -> Option<ArrayBuffer> {
        match self {
            Self::Array(buf) => Some(buf),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(n) => serde_json::Value::from(*n),
            Self::UInt(n) => serde_json::Value::from(*n),
            Self::Long(n) => serde_json::Value::from(*n),
            Self::Float(f) => Element::to_json(*f),
            Self::Text(_) => serde_json::Value::from(self.as_text().unwrap_or_default()),
            Self::Array(buf) => buf.to_json(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::UInt(n) => write!(f, "{}", n),
            Self::Long(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(_) => write!(f, "{:?}", self.as_text().unwrap_or_default()),
            Self::Array(buf) => write!(f, "{}", buf.to_json()),
        }
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::UInt(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Long(n)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.as_bytes().to_vec())
    }
}

impl From<ArrayBuffer> for Value {
    fn from(buf: ArrayBuffer) -> Self {
        Self::Array(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(-3).as_int(), Some(-3));
        assert_eq!(Value::Int(-3).as_long(), None);
        assert_eq!(Value::UInt(7).as_uint(), Some(7));
        assert_eq!(Value::Long(1 << 40).as_long(), Some(1 << 40));
        assert_eq!(Value::Float(0.5).as_float(), Some(0.5));
        assert_eq!(Value::from("abc").type_tag(), "string");
    }

    #[test]
    fn test_text_stops_at_nul() {
        let v = Value::Text(b"ok\0junk".to_vec());
        assert_eq!(v.as_text().unwrap(), "ok");
        assert_eq!(v.as_bytes().unwrap().len(), 7);
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Int(10).to_json(), json!(10));
        assert_eq!(Value::Float(1.5).to_json(), json!(1.5));
        assert_eq!(Value::from("hi").to_json(), json!("hi"));
        let arr = Value::Array(ArrayBuffer::from(vec![1i32, 2, 3, 4]));
        assert_eq!(arr.to_json(), json!([1, 2, 3, 4]));
    }
}
