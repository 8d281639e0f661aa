//! Interoperability - call C functions in dynamic libraries
//!
//! Design: every argument passed by pointer, `int32_t` status return.
//!
//! Architecture:
//! - `types.rs` - foreign argument representations (ForeignArg, ArgType, Signature)
//! - `marshal.rs` - descriptor entries ↔ foreign arguments
//! - `call.rs` - libffi dispatch and result assembly
//! - `library.rs` - library resolution (search path, prefixes, extensions) and symbols

mod call;
mod library;
mod marshal;
mod types;

pub use call::{invoke, prepare_cif, signature_of, ForeignFunction, SharedFunction};
pub use library::{platform_extensions, Library, Resolver, DEFAULT_PREFIXES};
pub use marshal::{from_foreign, marshal_args, to_foreign, Unwrap};
pub use types::{ArgType, ForeignArg, Signature};

use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct Counters {
    pub(crate) calls_made: AtomicUsize,
    pub(crate) libraries_loaded: AtomicUsize,
}

pub(crate) static STATS: Counters = Counters {
    calls_made: AtomicUsize::new(0),
    libraries_loaded: AtomicUsize::new(0),
};

/// Get interop statistics
pub fn stats() -> InteropStats {
    InteropStats {
        calls_made: STATS.calls_made.load(Ordering::Relaxed),
        libraries_loaded: STATS.libraries_loaded.load(Ordering::Relaxed),
    }
}

/// Process-wide interop counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteropStats {
    pub calls_made: usize,
    pub libraries_loaded: usize,
}
