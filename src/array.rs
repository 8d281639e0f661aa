//! Dtype-tagged n-dimensional buffers backing `array` parameters
//!
//! Buffers are row-major `ndarray` arrays. The foreign side only ever sees the
//! address of the first element, so everything handed across must be in
//! standard layout.

use crate::errors::{DescriptorError, Error, Result};
use ndarray::{ArrayD, IxDyn};
use num_traits::Zero;
use std::ffi::c_void;
use std::fmt;
use std::str::FromStr;

/// Element type of an array buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl FromStr for DType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "int8" | "i8" => Ok(Self::Int8),
            "uint8" | "u8" => Ok(Self::UInt8),
            "int16" | "i16" => Ok(Self::Int16),
            "uint16" | "u16" => Ok(Self::UInt16),
            "int32" | "i32" => Ok(Self::Int32),
            "uint32" | "u32" => Ok(Self::UInt32),
            "int64" | "i64" | "int" => Ok(Self::Int64),
            "uint64" | "u64" => Ok(Self::UInt64),
            "float32" | "f32" | "single" => Ok(Self::Float32),
            "float64" | "f64" | "float" | "double" => Ok(Self::Float64),
            _ => Err(Error::UnknownDType(s.to_string())),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar types that can live in an [`ArrayBuffer`]
pub trait Element: Copy + Zero + 'static {
    const DTYPE: DType;

    fn wrap(array: ArrayD<Self>) -> ArrayBuffer;
    fn peek(buffer: &ArrayBuffer) -> Option<&ArrayD<Self>>;
    fn from_json(value: &serde_json::Value) -> Option<Self>;
    fn to_json(self) -> serde_json::Value;
}

macro_rules! int_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn wrap(array: ArrayD<Self>) -> ArrayBuffer {
                ArrayBuffer::$variant(array)
            }

            fn peek(buffer: &ArrayBuffer) -> Option<&ArrayD<Self>> {
                match buffer {
                    ArrayBuffer::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn from_json(value: &serde_json::Value) -> Option<Self> {
                if let Some(n) = value.as_i64() {
                    <$ty>::try_from(n).ok()
                } else {
                    value.as_u64().and_then(|n| <$ty>::try_from(n).ok())
                }
            }

            fn to_json(self) -> serde_json::Value {
                serde_json::Value::from(self)
            }
        }
    };
}

int_element!(i8, Int8);
int_element!(u8, UInt8);
int_element!(i16, Int16);
int_element!(u16, UInt16);
int_element!(i32, Int32);
int_element!(u32, UInt32);
int_element!(i64, Int64);
int_element!(u64, UInt64);

macro_rules! float_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn wrap(array: ArrayD<Self>) -> ArrayBuffer {
                ArrayBuffer::$variant(array)
            }

            fn peek(buffer: &ArrayBuffer) -> Option<&ArrayD<Self>> {
                match buffer {
                    ArrayBuffer::$variant(a) => Some(a),
                    _ => None,
                }
            }

            fn from_json(value: &serde_json::Value) -> Option<Self> {
                value.as_f64().map(|f| f as $ty)
            }

            fn to_json(self) -> serde_json::Value {
                // NaN and infinities have no JSON spelling and come out as null
                serde_json::Number::from_f64(self as f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
    };
}

float_element!(f32, Float32);
float_element!(f64, Float64);

/// Owned n-dimensional buffer tagged with its element type
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayBuffer {
    Int8(ArrayD<i8>),
    UInt8(ArrayD<u8>),
    Int16(ArrayD<i16>),
    UInt16(ArrayD<u16>),
    Int32(ArrayD<i32>),
    UInt32(ArrayD<u32>),
    Int64(ArrayD<i64>),
    UInt64(ArrayD<u64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
}

macro_rules! each_dtype {
    ($buffer:expr, $arr:ident => $body:expr) => {
        match $buffer {
            ArrayBuffer::Int8($arr) => $body,
            ArrayBuffer::UInt8($arr) => $body,
            ArrayBuffer::Int16($arr) => $body,
            ArrayBuffer::UInt16($arr) => $body,
            ArrayBuffer::Int32($arr) => $body,
            ArrayBuffer::UInt32($arr) => $body,
            ArrayBuffer::Int64($arr) => $body,
            ArrayBuffer::UInt64($arr) => $body,
            ArrayBuffer::Float32($arr) => $body,
            ArrayBuffer::Float64($arr) => $body,
        }
    };
}

macro_rules! map_dtype {
    ($buffer:expr, $arr:ident => $body:expr) => {
        match $buffer {
            ArrayBuffer::Int8($arr) => ArrayBuffer::Int8($body),
            ArrayBuffer::UInt8($arr) => ArrayBuffer::UInt8($body),
            ArrayBuffer::Int16($arr) => ArrayBuffer::Int16($body),
            ArrayBuffer::UInt16($arr) => ArrayBuffer::UInt16($body),
            ArrayBuffer::Int32($arr) => ArrayBuffer::Int32($body),
            ArrayBuffer::UInt32($arr) => ArrayBuffer::UInt32($body),
            ArrayBuffer::Int64($arr) => ArrayBuffer::Int64($body),
            ArrayBuffer::UInt64($arr) => ArrayBuffer::UInt64($body),
            ArrayBuffer::Float32($arr) => ArrayBuffer::Float32($body),
            ArrayBuffer::Float64($arr) => ArrayBuffer::Float64($body),
        }
    };
}

impl ArrayBuffer {
    /// Zero-filled buffer of the given shape and dtype
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let dim = IxDyn(shape);
        match dtype {
            DType::Int8 => Self::Int8(ArrayD::zeros(dim)),
            DType::UInt8 => Self::UInt8(ArrayD::zeros(dim)),
            DType::Int16 => Self::Int16(ArrayD::zeros(dim)),
            DType::UInt16 => Self::UInt16(ArrayD::zeros(dim)),
            DType::Int32 => Self::Int32(ArrayD::zeros(dim)),
            DType::UInt32 => Self::UInt32(ArrayD::zeros(dim)),
            DType::Int64 => Self::Int64(ArrayD::zeros(dim)),
            DType::UInt64 => Self::UInt64(ArrayD::zeros(dim)),
            DType::Float32 => Self::Float32(ArrayD::zeros(dim)),
            DType::Float64 => Self::Float64(ArrayD::zeros(dim)),
        }
    }

    /// Build a buffer from flat row-major data
    pub fn from_shape_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self> {
        ArrayD::from_shape_vec(IxDyn(shape), data)
            .map(T::wrap)
            .map_err(|e| Error::Shape(e.to_string()))
    }

    pub fn dtype(&self) -> DType {
        match self {
            Self::Int8(_) => DType::Int8,
            Self::UInt8(_) => DType::UInt8,
            Self::Int16(_) => DType::Int16,
            Self::UInt16(_) => DType::UInt16,
            Self::Int32(_) => DType::Int32,
            Self::UInt32(_) => DType::UInt32,
            Self::Int64(_) => DType::Int64,
            Self::UInt64(_) => DType::UInt64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_dtype!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        each_dtype!(self, a => a.ndim())
    }

    pub fn len(&self) -> usize {
        each_dtype!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the elements sit in memory in row-major order with no gaps
    pub fn is_contiguous(&self) -> bool {
        each_dtype!(self, a => a.is_standard_layout())
    }

    /// Copy into standard layout if the buffer is a strided view.
    ///
    /// Returns true when a copy was made.
    pub fn make_contiguous(&mut self) -> bool {
        if self.is_contiguous() {
            return false;
        }
        let owned = map_dtype!(&*self, a => a.as_standard_layout().into_owned());
        *self = owned;
        true
    }

    /// Address of the first element, for passing to foreign code
    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        each_dtype!(self, a => a.as_mut_ptr() as *mut c_void)
    }

    /// Typed view of the buffer
    pub fn view<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::peek(self)
    }

    /// Elements in logical (row-major) order
    pub fn to_vec<T: Element>(&self) -> Option<Vec<T>> {
        T::peek(self).map(|a| a.iter().copied().collect())
    }

    /// Undo a foreign axis order.
    ///
    /// Reshapes to the current shape with the extents of `axis_a` and `axis_b`
    /// exchanged, then swaps those two axes. The resulting shape equals the
    /// starting shape, with element `[.., j, .., i, ..]` taken from position
    /// `[.., i, .., j, ..]` of the reshaped buffer.
    pub fn swap_foreign_axes(self, axis_a: usize, axis_b: usize) -> Result<Self> {
        let ndim = self.ndim();
        if axis_a >= ndim || axis_b >= ndim {
            return Err(Error::Shape(format!(
                "axes ({}, {}) out of range for {} dimensions",
                axis_a, axis_b, ndim
            )));
        }

        let mut shape = self.shape().to_vec();
        shape.swap(axis_a, axis_b);

        Ok(map_dtype!(self, a => {
            let mut reshaped = a
                .into_shape(IxDyn(&shape))
                .map_err(|e| Error::Shape(e.to_string()))?;
            reshaped.swap_axes(axis_a, axis_b);
            reshaped
        }))
    }

    /// Build a buffer from (nested) JSON lists.
    ///
    /// Shape follows the nesting; dtype is `dtype` when given, otherwise
    /// `int64` for all-integer data, `uint64` when some integer only fits
    /// unsigned, and `float64` for anything else.
    pub fn from_json(
        name: &str,
        value: &serde_json::Value,
        dtype: Option<DType>,
    ) -> std::result::Result<Self, DescriptorError> {
        if !value.is_array() {
            return Err(DescriptorError::InvalidValue {
                name: name.to_string(),
                type_tag: "array",
                reason: format!("expected a list, found {}", value),
            });
        }

        let mut shape = Vec::new();
        let mut leaves = Vec::new();
        flatten_json(name, value, 0, &mut shape, &mut leaves)?;

        let dtype = dtype.unwrap_or_else(|| {
            if leaves.iter().all(|v| v.is_i64()) {
                DType::Int64
            } else if leaves.iter().all(|v| v.is_u64()) {
                DType::UInt64
            } else {
                DType::Float64
            }
        });

        match dtype {
            DType::Int8 => collect_json::<i8>(name, &shape, &leaves),
            DType::UInt8 => collect_json::<u8>(name, &shape, &leaves),
            DType::Int16 => collect_json::<i16>(name, &shape, &leaves),
            DType::UInt16 => collect_json::<u16>(name, &shape, &leaves),
            DType::Int32 => collect_json::<i32>(name, &shape, &leaves),
            DType::UInt32 => collect_json::<u32>(name, &shape, &leaves),
            DType::Int64 => collect_json::<i64>(name, &shape, &leaves),
            DType::UInt64 => collect_json::<u64>(name, &shape, &leaves),
            DType::Float32 => collect_json::<f32>(name, &shape, &leaves),
            DType::Float64 => collect_json::<f64>(name, &shape, &leaves),
        }
    }

    /// Nested JSON lists mirroring the logical shape
    pub fn to_json(&self) -> serde_json::Value {
        each_dtype!(self, a => {
            let flat: Vec<serde_json::Value> = a.iter().map(|&x| x.to_json()).collect();
            nest_json(a.shape(), &flat)
        })
    }
}

impl<T: Element> From<ArrayD<T>> for ArrayBuffer {
    fn from(array: ArrayD<T>) -> Self {
        T::wrap(array)
    }
}

impl<T: Element> From<Vec<T>> for ArrayBuffer {
    fn from(data: Vec<T>) -> Self {
        T::wrap(ndarray::Array1::from(data).into_dyn())
    }
}

fn flatten_json<'v>(
    name: &str,
    value: &'v serde_json::Value,
    depth: usize,
    shape: &mut Vec<usize>,
    leaves: &mut Vec<&'v serde_json::Value>,
) -> std::result::Result<(), DescriptorError> {
    match value {
        serde_json::Value::Array(items) => {
            if depth == shape.len() {
                // First list seen at this depth fixes the extent
                if leaves.is_empty() || depth == 0 {
                    shape.push(items.len());
                } else {
                    return Err(DescriptorError::RaggedArray { name: name.to_string() });
                }
            } else if shape[depth] != items.len() {
                return Err(DescriptorError::RaggedArray { name: name.to_string() });
            }
            for item in items {
                flatten_json(name, item, depth + 1, shape, leaves)?;
            }
            Ok(())
        }
        leaf => {
            if depth != shape.len() {
                return Err(DescriptorError::RaggedArray { name: name.to_string() });
            }
            leaves.push(leaf);
            Ok(())
        }
    }
}

fn collect_json<T: Element>(
    name: &str,
    shape: &[usize],
    leaves: &[&serde_json::Value],
) -> std::result::Result<ArrayBuffer, DescriptorError> {
    let data = leaves
        .iter()
        .map(|v| {
            T::from_json(v).ok_or_else(|| DescriptorError::InvalidValue {
                name: name.to_string(),
                type_tag: "array",
                reason: format!("{} does not fit dtype {}", v, T::DTYPE),
            })
        })
        .collect::<std::result::Result<Vec<T>, _>>()?;

    ArrayD::from_shape_vec(IxDyn(shape), data)
        .map(T::wrap)
        .map_err(|_| DescriptorError::RaggedArray { name: name.to_string() })
}

fn nest_json(shape: &[usize], flat: &[serde_json::Value]) -> serde_json::Value {
    match shape.split_first() {
        None => flat.first().cloned().unwrap_or(serde_json::Value::Null),
        Some((&extent, rest)) => {
            let stride: usize = rest.iter().product();
            let rows = (0..extent)
                .map(|i| nest_json(rest, &flat[i * stride..(i + 1) * stride]))
                .collect();
            serde_json::Value::Array(rows)
        }
    }
}
