//! dynwrap - call C functions in dynamic libraries from a parameter descriptor
//!
//! A descriptor lists every parameter of the foreign function by name, type
//! tag and optional initial value. Each parameter is passed by pointer, the
//! function returns an `int32_t` status, and every parameter's final value
//! comes back in a [`CallResult`].
//!
//! ```no_run
//! use dynwrap::{invoke, DType, Descriptor, Library, Param};
//!
//! let lib = Library::resolve("simple", dynwrap::localpath!())?;
//! let f = lib.function("fill")?;
//! let d = Descriptor::new(vec![
//!     Param::int("n", Some(5))?,
//!     Param::array("out", None, Some(&[4]), Some(DType::Int32))?,
//! ])?;
//! let result = unsafe { invoke(&f, d)? };
//! println!("{} {}", result.status(), result["out"]);
//! # Ok::<(), dynwrap::Error>(())
//! ```

pub mod array;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod interop;
pub mod logging;
pub mod paths;
pub mod result;
pub mod value;

// Re-export commonly used items
pub use array::{ArrayBuffer, DType, Element};
pub use config::{Config, LibraryConfig, LoggingConfig};
pub use descriptor::{parse_json, parse_toml, Descriptor, Param, ParamKind, RawParam, Size};
pub use errors::{DescriptorError, Error, InstallationError, Result};
pub use interop::{invoke, ForeignFunction, Library, Resolver, SharedFunction, Signature};
pub use logging::{init_dev_logging, init_logging, init_prod_logging, LogConfig, LogFormat, LogOutput};
pub use paths::filepath;
pub use result::CallResult;
pub use value::Value;
