
//! Error type definitions.

use std::borrow::Cow;
use std::io::ErrorKind;
pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;
use std::error;
use std::fmt;

/// A result that may contain an error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains an error.
pub type UnitResult = Result<()>;


/// An error that may happen while transcoding or compressing pixels.
/// Distinguishes between the failure kinds a format coder reports to its caller.
#[derive(Debug)]
pub enum Error {

    /// Transcoding was cancelled by the progress callback.
    /// Output produced so far ends at a whole row.
    Aborted,

    /// The requested sample layout or codec feature is not supported.
    NotSupported(Cow<'static, str>),

    /// The arguments do not fit together, for example
    /// a byte buffer that is shorter than the packed row.
    Invalid(Cow<'static, str>),

    /// A scratch buffer, table or dictionary could not be allocated
    /// within the configured resource limits.
    ResourceLimit(Cow<'static, str>),

    /// The compressed stream is malformed and could not be resynchronized.
    CorruptImage(Cow<'static, str>),

    /// An external codec delegate reported a failure.
    Coder(Cow<'static, str>),

    /// An optional codec delegate was not compiled into this build.
    MissingDelegate(Cow<'static, str>),

    /// A configuration value could not be parsed or is out of range.
    Option(Cow<'static, str>),

    /// The underlying byte stream could not be read or written.
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

    /// Create an error of the variant `ResourceLimit`.
    pub(crate) fn resource_limit(message: impl Into<Cow<'static, str>>) -> Self {
        Error::ResourceLimit(message.into())
    }

    /// Create an error of the variant `CorruptImage`.
    pub(crate) fn corrupt(message: impl Into<Cow<'static, str>>) -> Self {
        Error::CorruptImage(message.into())
    }

    /// Create an error of the variant `Coder`.
    pub(crate) fn coder(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Coder(message.into())
    }

    /// Create an error of the variant `MissingDelegate`.
    pub(crate) fn missing_delegate(message: impl Into<Cow<'static, str>>) -> Self {
        Error::MissingDelegate(message.into())
    }

    /// Create an error of the variant `Option`.
    pub(crate) fn option(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Option(message.into())
    }

    /// Whether this error leaves the output truncated at a row boundary
    /// rather than invalid.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

/// Enable using the `?` operator on `std::io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::invalid("reference to missing bytes")
        }
        else {
            Error::Io(error)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(formatter),
            Error::NotSupported(message) => write!(formatter, "not supported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
            Error::ResourceLimit(message) => write!(formatter, "resource limit exceeded: {}", message),
            Error::CorruptImage(message) => write!(formatter, "corrupt image: {}", message),
            Error::Coder(message) => write!(formatter, "coder error: {}", message),
            Error::MissingDelegate(message) => write!(formatter, "delegate library support not built in: {}", message),
            Error::Option(message) => write!(formatter, "invalid option: {}", message),
            Error::Aborted => write!(formatter, "cancelled"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}


/// Multiply two sizes, returning a resource limit error on overflow.
#[inline]
pub(crate) fn checked_mul(a: usize, b: usize, error_message: &'static str) -> Result<usize> {
    a.checked_mul(b).ok_or_else(|| Error::resource_limit(error_message))
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unexpected_eof_is_invalid(){
        let error = Error::from(IoError::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(error, Error::Invalid(_)));

        let error = Error::from(IoError::new(ErrorKind::WriteZero, "full"));
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn display_names_the_kind(){
        assert_eq!(Error::coder("UnableToZipCompressImage `a.ps`").to_string(), "coder error: UnableToZipCompressImage `a.ps`");
        assert_eq!(Error::Aborted.to_string(), "cancelled");
        assert!(Error::Aborted.is_aborted());
        assert!(!Error::option("x").is_aborted());
    }

    #[test]
    fn overflow_is_a_resource_limit(){
        assert!(matches!(checked_mul(usize::MAX, 2, "extent"), Err(Error::ResourceLimit(_))));
        assert_eq!(checked_mul(3, 4, "extent").unwrap(), 12);
    }
}
