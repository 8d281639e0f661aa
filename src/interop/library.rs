//! Dynamic library resolution and symbol lookup
//!
//! A library is found by trying, in order, every platform extension and for
//! each one every filename prefix: `<dir>/<prefix><name>.<ext>`. The first
//! file that exists is loaded; a failed load is not retried with later
//! candidates.

use super::call::ForeignFunction;
use super::STATS;
use crate::errors::{Error, InstallationError, Result};
use core::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

/// Prefixes tried in front of the library name
pub const DEFAULT_PREFIXES: &[&str] = &["", "lib", "lib_"];

/// Shared-library extensions for the current platform
pub const fn platform_extensions() -> &'static [&'static str] {
    #[cfg(target_os = "linux")]
    return &["so", "SO"];

    #[cfg(target_os = "macos")]
    return &["dylib", "DYLIB"];

    #[cfg(target_os = "windows")]
    return &["dll", "DLL"];

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return &["so", "SO", "dylib", "DYLIB", "dll", "DLL"];
}

/// Search rules for turning a library name into a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    extensions: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            extensions: platform_extensions().iter().map(|s| s.to_string()).collect(),
            prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prefixes<S: Into<String>>(mut self, prefixes: impl IntoIterator<Item = S>) -> Self {
        self.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Candidate paths in search order
    pub fn candidates<'a>(&'a self, name: &'a str, dir: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        self.extensions.iter().flat_map(move |ext| {
            self.prefixes
                .iter()
                .map(move |prefix| dir.join(format!("{}{}.{}", prefix, name, ext)))
        })
    }

    /// First candidate that exists on disk
    pub fn locate(&self, name: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        self.candidates(name, dir)
            .find(|path| {
                debug!(candidate = %path.display(), "probing");
                path.is_file()
            })
            .ok_or_else(|| {
                InstallationError::NotFound {
                    name: name.to_string(),
                    search_path: dir.to_path_buf(),
                }
                .into()
            })
    }

    /// Locate and load `name` from `dir`
    pub fn resolve(&self, name: &str, dir: impl AsRef<Path>) -> Result<Library> {
        let path = self.locate(name, dir)?;
        Library::load_path(name, path)
    }

    /// Try each directory in turn; the first one holding a candidate wins
    pub fn resolve_any<P: AsRef<Path>>(&self, name: &str, dirs: &[P]) -> Result<Library> {
        for dir in dirs {
            if let Ok(path) = self.locate(name, dir) {
                return Library::load_path(name, path);
            }
        }
        let searched = dirs
            .iter()
            .map(|d| d.as_ref().display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(InstallationError::NotFound {
            name: name.to_string(),
            search_path: PathBuf::from(searched),
        }
        .into())
    }
}

/// Handle to a loaded dynamic library
pub struct Library {
    name: String,
    path: PathBuf,
    native: Arc<libloading::Library>,
}

impl Library {
    /// Resolve `name` in `search_path` with the platform defaults
    pub fn resolve(name: &str, search_path: impl AsRef<Path>) -> Result<Self> {
        Resolver::new().resolve(name, search_path)
    }

    /// Load the library file at `path`
    pub fn load_path(name: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Loading runs the library's initializers
        let native = unsafe { libloading::Library::new(path) }.map_err(|e| {
            InstallationError::LoadFailed {
                name: name.to_string(),
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        STATS.libraries_loaded.fetch_add(1, Ordering::Relaxed);
        info!(library = name, path = %path.display(), "loaded library");

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            native: Arc::new(native),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an exported function.
    ///
    /// The handle keeps the library loaded for as long as it lives.
    pub fn function(&self, symbol: &str) -> Result<ForeignFunction> {
        let ptr = unsafe {
            self.native
                .get::<*const c_void>(symbol.as_bytes())
                .map(|sym| *sym)
        }
        .map_err(|e| Error::Symbol {
            name: symbol.to_string(),
            library: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        if ptr.is_null() {
            return Err(Error::Symbol {
                name: symbol.to_string(),
                library: self.path.display().to_string(),
                reason: "symbol resolved to a null address".to_string(),
            });
        }

        debug!(symbol, library = %self.name, "resolved symbol");
        Ok(ForeignFunction::from_library(symbol, ptr, Arc::clone(&self.native)))
    }
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}
