use std::fmt;
use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Library could not be located or loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationError {
    /// No file matched any prefix/extension combination in the search path.
    NotFound {
        name: String,
        search_path: PathBuf,
    },
    /// A file was found but the dynamic loader rejected it.
    LoadFailed {
        name: String,
        path: PathBuf,
        reason: String,
    },
}

impl fmt::Display for InstallationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name, search_path } => write!(
                f,
                "The library {} could not be found in {}. Specify the correct location or add it to the search path",
                name,
                search_path.display()
            ),
            Self::LoadFailed { name, path, reason } => write!(
                f,
                "The library {} was found at {} but could not be loaded, likely a linking error or missing dependency: {}",
                name,
                path.display(),
                reason
            ),
        }
    }
}

/// Malformed parameter descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    ReservedName,
    DuplicateName { name: String },
    MissingSize { name: String, type_tag: &'static str },
    MissingDType { name: String },
    InvalidValue { name: String, type_tag: &'static str, reason: String },
    RaggedArray { name: String },
    InvalidSwapAxes { name: String, axes: (usize, usize), ndim: usize },
    Malformed { reason: String },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedName => write!(f, "variable name 'status' is reserved"),
            Self::DuplicateName { name } => {
                write!(f, "variable name '{}' appears more than once", name)
            }
            Self::MissingSize { name, type_tag } => write!(
                f,
                "'{}' parameter '{}' with no value must have a 'size' property",
                type_tag, name
            ),
            Self::MissingDType { name } => write!(
                f,
                "'array' parameter '{}' with no value must have a 'dtype' property",
                name
            ),
            Self::InvalidValue { name, type_tag, reason } => write!(
                f,
                "invalid value for '{}' parameter '{}': {}",
                type_tag, name, reason
            ),
            Self::RaggedArray { name } => {
                write!(f, "array value for '{}' has rows of unequal length", name)
            }
            Self::InvalidSwapAxes { name, axes, ndim } => write!(
                f,
                "swapaxes ({}, {}) out of range for {}-dimensional array '{}'",
                axes.0, axes.1, ndim, name
            ),
            Self::Malformed { reason } => write!(f, "malformed descriptor: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Installation(InstallationError),
    Descriptor(DescriptorError),
    UnknownType(String),
    UnknownDType(String),
    Symbol {
        name: String,
        library: String,
        reason: String,
    },
    Shape(String),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installation(e) => write!(f, "{}", e),
            Self::Descriptor(e) => write!(f, "{}", e),
            Self::UnknownType(tag) => write!(f, "Type {} is not supported", tag),
            Self::UnknownDType(name) => write!(f, "dtype {} is not supported", name),
            Self::Symbol { name, library, reason } => {
                write!(f, "Function '{}' not found in '{}': {}", name, library, reason)
            }
            Self::Shape(reason) => write!(f, "cannot reshape array: {}", reason),
            Self::Config(reason) => write!(f, "configuration error: {}", reason),
        }
    }
}

impl std::error::Error for InstallationError {}
impl std::error::Error for DescriptorError {}
impl std::error::Error for Error {}

impl From<InstallationError> for Error {
    fn from(e: InstallationError) -> Self {
        Self::Installation(e)
    }
}

impl From<DescriptorError> for Error {
    fn from(e: DescriptorError) -> Self {
        Self::Descriptor(e)
    }
}

impl Error {
    /// True for any descriptor validation failure.
    pub fn is_descriptor(&self) -> bool {
        matches!(self, Self::Descriptor(_))
    }

    pub fn is_installation(&self) -> bool {
        matches!(self, Self::Installation(_))
    }
}
