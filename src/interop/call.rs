//! Descriptor-driven foreign calls
//!
//! The return type is fixed to an `int32_t` status code and every argument is
//! passed by pointer, so all real results flow back through the arguments.

use super::marshal::{from_foreign, marshal_args};
use super::types::{ArgType, ForeignArg, Signature};
use super::STATS;
use crate::descriptor::Descriptor;
use crate::errors::Result;
use crate::result::CallResult;
use crate::value::Value;
use core::ffi::{c_int, c_void};
use libffi::middle::{Arg, Cif, CodePtr};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Callable entry point in a loaded library
pub struct ForeignFunction {
    name: String,
    ptr: *const c_void,
    /// Keeps the owning library mapped while the function is reachable
    _library: Option<Arc<libloading::Library>>,
    signature: RefCell<Option<Signature>>,
}

impl ForeignFunction {
    pub(crate) fn from_library(name: &str, ptr: *const c_void, library: Arc<libloading::Library>) -> Self {
        Self {
            name: name.to_string(),
            ptr,
            _library: Some(library),
            signature: RefCell::new(None),
        }
    }

    /// Wrap a bare function pointer.
    ///
    /// # Safety
    /// `ptr` must point to a C-ABI function returning `int32_t` whose
    /// parameters are all pointers, and must stay valid for the lifetime of
    /// the returned handle.
    pub unsafe fn from_raw(name: impl Into<String>, ptr: *const c_void) -> Self {
        Self {
            name: name.into(),
            ptr,
            _library: None,
            signature: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_ptr(&self) -> *const c_void {
        self.ptr
    }

    /// Signature used by the most recent call
    pub fn signature(&self) -> Option<Signature> {
        self.signature.borrow().clone()
    }

    /// Call with the given descriptor.
    ///
    /// # Safety
    /// See [`invoke`].
    pub unsafe fn invoke(&self, descriptor: Descriptor) -> Result<CallResult> {
        invoke(self, descriptor)
    }
}

impl std::fmt::Debug for ForeignFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignFunction")
            .field("name", &self.name)
            .field("ptr", &self.ptr)
            .finish()
    }
}

// The raw pointer is code, not data; moving the handle between threads is fine
unsafe impl Send for ForeignFunction {}

/// Build the libffi call interface for a signature
pub fn prepare_cif(signature: &Signature) -> Cif {
    Cif::new(
        signature.args.iter().map(|a| a.to_libffi()),
        libffi::middle::Type::i32(),
    )
}

/// Marshal `descriptor`, call `function`, and unmarshal every argument.
///
/// Validation all happens while the descriptor is built, so once this runs
/// the call always proceeds.
///
/// # Safety
/// - `function` must be a C-ABI function returning `int32_t` whose parameters
///   match the descriptor's pointer types in order and count
/// - the callee must not write past the end of any buffer it is given
/// - the callee must not retain any argument pointer after returning
pub unsafe fn invoke(function: &ForeignFunction, descriptor: Descriptor) -> Result<CallResult> {
    let span = debug_span!("invoke", function = %function.name(), params = descriptor.len());
    let _enter = span.enter();

    let (names, kinds): (Vec<String>, Vec<_>) = descriptor
        .into_params()
        .into_iter()
        .map(|p| p.into_parts())
        .unzip();
    let (mut args, unwraps) = marshal_args(kinds);

    let signature = Signature::new(args.iter().map(ForeignArg::arg_type).collect());
    for (name, ty) in names.iter().zip(&signature.args) {
        debug!(param = %name, ty = %ty, "marshalled argument");
    }

    let cif = prepare_cif(&signature);
    debug!(signature = %signature, "calling foreign function");
    *function.signature.borrow_mut() = Some(signature);

    let status = {
        // Each Arg points at a slot in `addrs`, which must outlive the call
        let addrs: Vec<*mut c_void> = args.iter_mut().map(ForeignArg::address).collect();
        let ffi_args: Vec<Arg> = addrs.iter().map(Arg::new).collect();
        let code = CodePtr(function.ptr as *mut c_void);
        cif.call::<c_int>(code, &ffi_args)
    };

    STATS.calls_made.fetch_add(1, Ordering::Relaxed);
    debug!(status, "foreign function returned");

    let values = args
        .into_iter()
        .zip(unwraps)
        .map(|(arg, unwrap)| from_foreign(arg, unwrap))
        .collect::<Result<Vec<Value>>>()?;

    Ok(CallResult::new(status, names, values))
}

/// Argument types a descriptor would produce, without marshalling values
pub fn signature_of(descriptor: &Descriptor) -> Signature {
    use crate::descriptor::ParamKind;

    Signature::new(
        descriptor
            .iter()
            .map(|p| match p.kind() {
                ParamKind::String(_) => ArgType::Text,
                ParamKind::Int(_) => ArgType::Int32Ref,
                ParamKind::UInt(_) => ArgType::UInt32Ref,
                ParamKind::Long(_) => ArgType::Int64Ref,
                ParamKind::Float(_) => ArgType::Float32Ref,
                ParamKind::Array { .. } => ArgType::RawBuffer,
            })
            .collect(),
    )
}

/// Foreign function whose calls are serialized behind a lock.
///
/// For libraries that are not reentrant; nothing else in the crate locks.
#[derive(Debug)]
pub struct SharedFunction {
    inner: Mutex<ForeignFunction>,
}

impl SharedFunction {
    pub fn new(function: ForeignFunction) -> Self {
        Self {
            inner: Mutex::new(function),
        }
    }

    /// # Safety
    /// See [`invoke`].
    pub unsafe fn invoke(&self, descriptor: Descriptor) -> Result<CallResult> {
        let function = self.inner.lock();
        invoke(&function, descriptor)
    }

    pub fn into_inner(self) -> ForeignFunction {
        self.inner.into_inner()
    }
}
