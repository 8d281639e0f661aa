//! Foreign-side argument representations
//!
//! Every argument crosses the boundary as a pointer: scalars are boxed so the
//! callee can write back through them, text goes as a `char*` into a
//! NUL-terminated buffer, and arrays pass the address of their first element.

use crate::array::ArrayBuffer;
use crate::descriptor::{ArrayInit, TextInit};
use crate::value::Value;
use core::ffi::c_void;
use libffi::middle::Type;
use std::fmt;

/// C-level type of one argument slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ArgType {
    /// `int32_t*`
    Int32Ref,
    /// `uint32_t*`
    UInt32Ref,
    /// `int64_t*`
    Int64Ref,
    /// `float*`
    Float32Ref,
    /// `char*`
    Text,
    /// `void*`
    RawBuffer,
}

impl ArgType {
    /// libffi type for the slot; always a pointer
    #[inline]
    pub fn to_libffi(self) -> Type {
        Type::pointer()
    }

    /// Size of the pointee in bytes, `None` for buffers
    #[inline]
    pub const fn pointee_size(self) -> Option<usize> {
        match self {
            Self::Int32Ref | Self::UInt32Ref | Self::Float32Ref => Some(4),
            Self::Int64Ref => Some(8),
            Self::Text | Self::RawBuffer => None,
        }
    }

    #[inline]
    pub const fn is_scalar(self) -> bool {
        self.pointee_size().is_some()
    }

    pub const fn c_name(self) -> &'static str {
        match self {
            Self::Int32Ref => "int32_t*",
            Self::UInt32Ref => "uint32_t*",
            Self::Int64Ref => "int64_t*",
            Self::Float32Ref => "float*",
            Self::Text => "char*",
            Self::RawBuffer => "void*",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}

/// Argument signature of a call; the return type is always `int32_t`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub args: Vec<ArgType>,
}

impl Signature {
    pub fn new(args: Vec<ArgType>) -> Self {
        Self { args }
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "int32_t(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Marshalled argument owned by the call for its duration
#[derive(Debug)]
pub enum ForeignArg {
    Int32(Box<i32>),
    UInt32(Box<u32>),
    Int64(Box<i64>),
    Float32(Box<f32>),
    /// NUL-terminated text buffer
    Bytes(Vec<u8>),
    RawBuffer(ArrayBuffer),
}

impl ForeignArg {
    #[inline]
    pub fn int32(value: Option<i32>) -> Self {
        Self::Int32(Box::new(value.unwrap_or(0)))
    }

    #[inline]
    pub fn uint32(value: Option<u32>) -> Self {
        Self::UInt32(Box::new(value.unwrap_or(0)))
    }

    #[inline]
    pub fn int64(value: Option<i64>) -> Self {
        Self::Int64(Box::new(value.unwrap_or(0)))
    }

    #[inline]
    pub fn float32(value: Option<f32>) -> Self {
        Self::Float32(Box::new(value.unwrap_or(0.0)))
    }

    /// Text buffer, space-filled when no initial contents are given
    pub fn text(init: TextInit) -> Self {
        let mut bytes = match init {
            TextInit::Value(bytes) => bytes,
            TextInit::Blank(len) => vec![b' '; len],
        };
        bytes.push(0);
        Self::Bytes(bytes)
    }

    /// Array buffer, zero-filled when no caller storage is given
    pub fn raw_buffer(init: ArrayInit) -> Self {
        let mut buffer = match init {
            ArrayInit::Value(buffer) => buffer,
            ArrayInit::Zeros { shape, dtype } => ArrayBuffer::zeros(&shape, dtype),
        };
        if buffer.make_contiguous() {
            tracing::debug!(shape = ?buffer.shape(), "copied strided array into standard layout");
        }
        Self::RawBuffer(buffer)
    }

    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::Int32(_) => ArgType::Int32Ref,
            Self::UInt32(_) => ArgType::UInt32Ref,
            Self::Int64(_) => ArgType::Int64Ref,
            Self::Float32(_) => ArgType::Float32Ref,
            Self::Bytes(_) => ArgType::Text,
            Self::RawBuffer(_) => ArgType::RawBuffer,
        }
    }

    /// Pointer handed to the foreign function.
    ///
    /// Stays valid until `self` is dropped or extracted; the pointee lives on
    /// the heap, so moving the `ForeignArg` itself does not invalidate it.
    pub fn address(&mut self) -> *mut c_void {
        match self {
            Self::Int32(slot) => &mut **slot as *mut i32 as *mut c_void,
            Self::UInt32(slot) => &mut **slot as *mut u32 as *mut c_void,
            Self::Int64(slot) => &mut **slot as *mut i64 as *mut c_void,
            Self::Float32(slot) => &mut **slot as *mut f32 as *mut c_void,
            Self::Bytes(bytes) => bytes.as_mut_ptr() as *mut c_void,
            Self::RawBuffer(buffer) => buffer.as_mut_ptr(),
        }
    }

    /// Convert back to a native value, dereferencing boxed scalars
    pub fn extract(self) -> Value {
        match self {
            Self::Int32(slot) => Value::Int(*slot),
            Self::UInt32(slot) => Value::UInt(*slot),
            Self::Int64(slot) => Value::Long(*slot),
            Self::Float32(slot) => Value::Float(*slot),
            Self::Bytes(mut bytes) => {
                bytes.pop();
                Value::Text(bytes)
            }
            Self::RawBuffer(buffer) => Value::Array(buffer),
        }
    }
}
