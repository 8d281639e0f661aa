//! Type marshaling - descriptor entries to foreign arguments and back

use super::types::ForeignArg;
use crate::descriptor::ParamKind;
use crate::errors::Result;
use crate::value::Value;

/// Post-call work recorded for one argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Unwrap {
    pub swapaxes: Option<(usize, usize)>,
}

/// Build the foreign representation of one parameter, synthesizing defaults
pub fn to_foreign(kind: ParamKind) -> (ForeignArg, Unwrap) {
    match kind {
        ParamKind::String(init) => (ForeignArg::text(init), Unwrap::default()),
        ParamKind::Int(value) => (ForeignArg::int32(value), Unwrap::default()),
        ParamKind::UInt(value) => (ForeignArg::uint32(value), Unwrap::default()),
        ParamKind::Long(value) => (ForeignArg::int64(value), Unwrap::default()),
        ParamKind::Float(value) => (ForeignArg::float32(value), Unwrap::default()),
        ParamKind::Array { init, swapaxes } => (ForeignArg::raw_buffer(init), Unwrap { swapaxes }),
    }
}

/// Convert a foreign argument back after the call
pub fn from_foreign(arg: ForeignArg, unwrap: Unwrap) -> Result<Value> {
    match (arg.extract(), unwrap.swapaxes) {
        (Value::Array(buffer), Some((a, b))) => Ok(Value::Array(buffer.swap_foreign_axes(a, b)?)),
        (value, _) => Ok(value),
    }
}

/// Marshal parameters in order
pub fn marshal_args<I>(kinds: I) -> (Vec<ForeignArg>, Vec<Unwrap>)
where
    I: IntoIterator<Item = ParamKind>,
{
    kinds.into_iter().map(to_foreign).unzip()
}
