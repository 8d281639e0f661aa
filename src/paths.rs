//! Locating libraries that ship next to the code that calls them

use std::io;
use std::path::{Path, PathBuf};

/// Directory holding `file`, after resolving symlinks and relative segments
pub fn filepath(file: impl AsRef<Path>) -> io::Result<PathBuf> {
    let full = file.as_ref().canonicalize()?;
    match full.parent() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(full),
    }
}

/// Directory of a source file given as `file!()` relative to its manifest.
///
/// Falls back to the unresolved join when the source tree is not on disk
/// (e.g. a relocated binary).
pub fn source_dir(manifest_dir: &str, file: &str) -> PathBuf {
    let manifest = Path::new(manifest_dir);
    let joined = if Path::new(file).is_absolute() {
        PathBuf::from(file)
    } else {
        manifest.join(file)
    };
    filepath(&joined).unwrap_or_else(|_| {
        joined
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| manifest.to_path_buf())
    })
}

/// Directory of the source file this macro is expanded in.
///
/// ```no_run
/// let lib = dynwrap::Library::resolve("mylib", dynwrap::localpath!())?;
/// # Ok::<(), dynwrap::Error>(())
/// ```
#[macro_export]
macro_rules! localpath {
    () => {
        $crate::paths::source_dir(env!("CARGO_MANIFEST_DIR"), file!())
    };
}
