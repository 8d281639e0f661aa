//! Parameter descriptors
//!
//! A descriptor is the ordered list of parameters a foreign function takes.
//! Each [`Param`] carries a name plus a [`ParamKind`] that holds only what its
//! type tag needs, so a `Param` that exists is already known to be marshallable.
//!
//! The loose form ([`RawParam`]) mirrors the plain-mapping layout used in JSON
//! and TOML call files (`name`, `type`, `value`, `size`, `dtype`, `swapaxes`)
//! and is validated into the typed form with `TryFrom`.

use crate::array::{ArrayBuffer, DType};
use crate::errors::{DescriptorError, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Name the call result uses for the status code
pub const RESERVED_NAME: &str = "status";

/// Initial contents of a `string` parameter
#[derive(Debug, Clone, PartialEq)]
pub enum TextInit {
    Value(Vec<u8>),
    /// Space-filled buffer of this many bytes
    Blank(usize),
}

/// Initial contents of an `array` parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayInit {
    /// Caller storage, moved into the call and handed back in the result
    Value(ArrayBuffer),
    Zeros { shape: Vec<usize>, dtype: DType },
}

impl ArrayInit {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Value(buf) => buf.shape(),
            Self::Zeros { shape, .. } => shape,
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            Self::Value(buf) => buf.dtype(),
            Self::Zeros { dtype, .. } => *dtype,
        }
    }
}

/// Type tag plus the fields that tag uses
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String(TextInit),
    Int(Option<i32>),
    UInt(Option<u32>),
    Long(Option<i64>),
    Float(Option<f32>),
    Array {
        init: ArrayInit,
        swapaxes: Option<(usize, usize)>,
    },
}

impl ParamKind {
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Array { .. } => "array",
        }
    }
}

/// One validated parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    kind: ParamKind,
}

impl Param {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Result<Self> {
        let name = name.into();
        if name == RESERVED_NAME {
            return Err(DescriptorError::ReservedName.into());
        }

        if let ParamKind::Array { init, swapaxes: Some(axes) } = &kind {
            let ndim = init.shape().len();
            if axes.0 >= ndim || axes.1 >= ndim {
                return Err(DescriptorError::InvalidSwapAxes {
                    name,
                    axes: *axes,
                    ndim,
                }
                .into());
            }
        }

        check_allocation(&name, &kind)?;

        Ok(Self { name, kind })
    }

    /// `string` parameter; `size` is required when `value` is absent
    pub fn string(name: impl Into<String>, value: Option<&str>, size: Option<usize>) -> Result<Self> {
        let name = name.into();
        let init = match (value, size) {
            (Some(text), _) => TextInit::Value(text.as_bytes().to_vec()),
            (None, Some(size)) => TextInit::Blank(size),
            (None, None) => {
                return Err(DescriptorError::MissingSize { name, type_tag: "string" }.into())
            }
        };
        Self::new(name, ParamKind::String(init))
    }

    pub fn int(name: impl Into<String>, value: Option<i32>) -> Result<Self> {
        Self::new(name, ParamKind::Int(value))
    }

    pub fn uint(name: impl Into<String>, value: Option<u32>) -> Result<Self> {
        Self::new(name, ParamKind::UInt(value))
    }

    pub fn long(name: impl Into<String>, value: Option<i64>) -> Result<Self> {
        Self::new(name, ParamKind::Long(value))
    }

    pub fn float(name: impl Into<String>, value: Option<f32>) -> Result<Self> {
        Self::new(name, ParamKind::Float(value))
    }

    /// `array` parameter; `size` and `dtype` are both required when `value` is absent
    pub fn array(
        name: impl Into<String>,
        value: Option<ArrayBuffer>,
        size: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Self> {
        let name = name.into();
        let init = match value {
            Some(buf) => ArrayInit::Value(buf),
            None => {
                let shape = size.ok_or_else(|| DescriptorError::MissingSize {
                    name: name.clone(),
                    type_tag: "array",
                })?;
                let dtype =
                    dtype.ok_or_else(|| DescriptorError::MissingDType { name: name.clone() })?;
                ArrayInit::Zeros { shape: shape.to_vec(), dtype }
            }
        };
        Self::new(name, ParamKind::Array { init, swapaxes: None })
    }

    /// Request the post-call axis swap on an `array` parameter
    pub fn with_swapaxes(self, axis_a: usize, axis_b: usize) -> Result<Self> {
        match self.kind {
            ParamKind::Array { init, .. } => Self::new(
                self.name,
                ParamKind::Array { init, swapaxes: Some((axis_a, axis_b)) },
            ),
            _ => Err(DescriptorError::Malformed {
                reason: format!(
                    "swapaxes only applies to 'array' parameters, '{}' is '{}'",
                    self.name,
                    self.kind.type_tag()
                ),
            }
            .into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn type_tag(&self) -> &'static str {
        self.kind.type_tag()
    }

    pub fn into_parts(self) -> (String, ParamKind) {
        (self.name, self.kind)
    }
}

/// Reject synthesized buffers too large to allocate.
///
/// Caller-supplied buffers already exist and are not checked.
fn check_allocation(name: &str, kind: &ParamKind) -> Result<()> {
    let (type_tag, fits) = match kind {
        // One extra byte for the NUL terminator
        ParamKind::String(TextInit::Blank(len)) => ("string", *len < isize::MAX as usize),
        ParamKind::Array { init: ArrayInit::Zeros { shape, dtype }, .. } => (
            "array",
            element_count(shape).map_or(false, |n| n <= isize::MAX as usize / dtype.size()),
        ),
        _ => return Ok(()),
    };

    if fits {
        Ok(())
    } else {
        Err(DescriptorError::InvalidValue {
            name: name.to_string(),
            type_tag,
            reason: "requested size is too large to allocate".to_string(),
        }
        .into())
    }
}

/// Product of the extents, `None` on overflow
fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Ordered parameter list with unique names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    params: Vec<Param>,
}

impl Descriptor {
    pub fn new(params: Vec<Param>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(params.len());
        for param in &params {
            if !seen.insert(param.name()) {
                return Err(DescriptorError::DuplicateName {
                    name: param.name().to_string(),
                }
                .into());
            }
        }
        Ok(Self { params })
    }

    pub fn push(&mut self, param: Param) -> Result<()> {
        if self.params.iter().any(|p| p.name() == param.name()) {
            return Err(DescriptorError::DuplicateName {
                name: param.name().to_string(),
            }
            .into());
        }
        self.params.push(param);
        Ok(())
    }

    /// Builder form of [`push`](Self::push)
    pub fn with(mut self, param: Param) -> Result<Self> {
        self.push(param)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(Param::name)
    }

    pub fn into_params(self) -> Vec<Param> {
        self.params
    }
}

impl TryFrom<Vec<Param>> for Descriptor {
    type Error = Error;

    fn try_from(params: Vec<Param>) -> Result<Self> {
        Self::new(params)
    }
}

/// `size` as written in a call file: a length or a full shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Size {
    Len(usize),
    Shape(Vec<usize>),
}

impl Size {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Len(n) => vec![*n],
            Self::Shape(shape) => shape.clone(),
        }
    }

    /// Total element count, `None` if it overflows `usize`
    pub fn total(&self) -> Option<usize> {
        match self {
            Self::Len(n) => Some(*n),
            Self::Shape(shape) => element_count(shape),
        }
    }
}

/// Parameter as written in a JSON or TOML call file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParam {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swapaxes: Option<(usize, usize)>,
}

impl TryFrom<RawParam> for Param {
    type Error = Error;

    fn try_from(raw: RawParam) -> Result<Self> {
        if raw.name == RESERVED_NAME {
            return Err(DescriptorError::ReservedName.into());
        }

        let name = raw.name;
        let value = raw.value.filter(|v| !v.is_null());

        let kind = match raw.type_tag.as_str() {
            "string" => match value {
                Some(serde_json::Value::String(text)) => {
                    ParamKind::String(TextInit::Value(text.into_bytes()))
                }
                Some(other) => return Err(invalid(&name, "string", &other, "expected a string")),
                None => match raw.size {
                    Some(size) => match size.total() {
                        Some(len) => ParamKind::String(TextInit::Blank(len)),
                        None => {
                            return Err(DescriptorError::InvalidValue {
                                name,
                                type_tag: "string",
                                reason: "requested size is too large to allocate".to_string(),
                            }
                            .into())
                        }
                    },
                    None => {
                        return Err(DescriptorError::MissingSize { name, type_tag: "string" }.into())
                    }
                },
            },
            "int" => ParamKind::Int(scalar(&name, "int", value, |v| {
                v.as_i64().and_then(|n| i32::try_from(n).ok())
            })?),
            "uint" => ParamKind::UInt(scalar(&name, "uint", value, |v| {
                v.as_u64().and_then(|n| u32::try_from(n).ok())
            })?),
            "long" => ParamKind::Long(scalar(&name, "long", value, |v| v.as_i64())?),
            "float" => ParamKind::Float(scalar(&name, "float", value, |v| {
                v.as_f64().map(|f| f as f32).filter(|f| f.is_finite())
            })?),
            "array" => {
                let dtype = raw.dtype.as_deref().map(str::parse::<DType>).transpose()?;
                let init = match value {
                    Some(v) => ArrayInit::Value(ArrayBuffer::from_json(&name, &v, dtype)?),
                    None => {
                        let size = raw.size.ok_or_else(|| DescriptorError::MissingSize {
                            name: name.clone(),
                            type_tag: "array",
                        })?;
                        let dtype = dtype
                            .ok_or_else(|| DescriptorError::MissingDType { name: name.clone() })?;
                        ArrayInit::Zeros { shape: size.shape(), dtype }
                    }
                };
                return Param::new(name, ParamKind::Array { init, swapaxes: raw.swapaxes });
            }
            other => return Err(Error::UnknownType(other.to_string())),
        };

        if raw.swapaxes.is_some() {
            warn!(param = %name, type_tag = kind.type_tag(), "swapaxes ignored on non-array parameter");
        }

        Param::new(name, kind)
    }
}

fn invalid(name: &str, type_tag: &'static str, value: &serde_json::Value, reason: &str) -> Error {
    DescriptorError::InvalidValue {
        name: name.to_string(),
        type_tag,
        reason: format!("{}, found {}", reason, value),
    }
    .into()
}

fn scalar<T>(
    name: &str,
    type_tag: &'static str,
    value: Option<serde_json::Value>,
    convert: impl Fn(&serde_json::Value) -> Option<T>,
) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(v) => convert(&v)
            .map(Some)
            .ok_or_else(|| invalid(name, type_tag, &v, "value out of range or of the wrong kind")),
    }
}

/// Validate a list of loose parameters into a descriptor
pub fn from_raw(raw: Vec<RawParam>) -> Result<Descriptor> {
    let params = raw
        .into_iter()
        .map(Param::try_from)
        .collect::<Result<Vec<_>>>()?;
    Descriptor::new(params)
}

/// Parse a JSON list of parameters
pub fn parse_json(content: &str) -> Result<Descriptor> {
    let raw: Vec<RawParam> = serde_json::from_str(content).map_err(|e| DescriptorError::Malformed {
        reason: format!("Failed to parse descriptor JSON: {}", e),
    })?;
    from_raw(raw)
}

#[derive(Deserialize)]
struct TomlDescriptor {
    #[serde(default, rename = "param")]
    params: Vec<RawParam>,
}

/// Parse a TOML document made of `[[param]]` tables
pub fn parse_toml(content: &str) -> Result<Descriptor> {
    let doc: TomlDescriptor = toml::from_str(content).map_err(|e| DescriptorError::Malformed {
        reason: format!("Failed to parse descriptor TOML: {}", e),
    })?;
    from_raw(doc.params)
}
