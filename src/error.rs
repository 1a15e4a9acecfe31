
//! Error type definitions.

use std::borrow::Cow;
use std::fmt;
use std::convert::TryFrom;

pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;

/// A result that may contain an error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains an error.
pub type UnitResult = Result<()>;


/// An error that may happen while writing an xcf file.
/// Distinguishes between invalid requests, unsupported features, and io errors.
#[derive(Debug)]
pub enum Error {

    /// The contents of the file or a request to the writer are not supported by
    /// this version of the library, or by the declared version of the file format.
    NotSupported(Cow<'static, str>),

    /// The requested operation is not valid, for example because it is
    /// performed in the wrong state or with out-of-range arguments.
    /// The message names the offending field, property, or state.
    Invalid(Cow<'static, str>),

    /// The underlying byte stream could not be written or repositioned.
    /// A partial write is always an error.
    Io(IoError),
}


impl Error {

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Create an error of the variant `NotSupported`.
    pub(crate) fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Error::NotSupported(message.into())
    }
}


/// Enable using the `?` operator on `io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        Error::Io(error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(error) => write!(formatter, "io error: {}", error),
            Error::NotSupported(message) => write!(formatter, "unsupported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
        }
    }
}


/// Convert a `usize` to `u32`, returning an error on overflow.
pub(crate) fn usize_to_u32(value: usize, name: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::invalid(name))
}
