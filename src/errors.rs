//! Error handling for the FastCGI client

use std::error;
use std::fmt;
use std::io;

/// A Result for client operations.
pub type Result<T> = ::std::result::Result<T, Error>;

/// All errors which might end a call to the responder
///
/// A non-success protocol status is not in here; see `fastcgi::Outcome`.
#[derive(Debug)]
pub enum Error {
    /// The transport could not be established. Nothing was sent.
    Connection(io::Error),
    /// Reading from or writing to an established transport failed
    Io(io::Error),
    /// `decode_header` was handed fewer than eight bytes
    MalformedHeader,
    TruncatedHeader,
    TruncatedContent,
    TruncatedPadding,
    ProtocolViolation(Violation)
}

/// Ways the bytes on either side of the connection can break the protocol
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Violation {
    /// Record content above 65535 bytes
    ContentTooLong(usize),
    /// A name or value too long for a 31-bit length prefix
    NameValueTooLong(usize),
    MalformedBeginRequest,
    MalformedEndRequest,
    MalformedNameValue,
    UnexpectedRecord(u8)
}

impl Error {
    /// True for the three "peer hung up early" variants
    pub fn is_truncation(&self) -> bool {
        match *self {
            Error::TruncatedHeader |
            Error::TruncatedContent |
            Error::TruncatedPadding => true,
            _ => false
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<Violation> for Error {
    fn from(v: Violation) -> Error {
        Error::ProtocolViolation(v)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Connection(ref e) =>
                write!(f, "unable to connect to FastCGI application: {}", e),
            Error::Io(ref e) => write!(f, "FastCGI transport error: {}", e),
            Error::MalformedHeader =>
                f.write_str("record header shorter than eight bytes"),
            Error::TruncatedHeader =>
                f.write_str("connection closed inside a record header"),
            Error::TruncatedContent =>
                f.write_str("connection closed inside record content"),
            Error::TruncatedPadding =>
                f.write_str("connection closed inside record padding"),
            Error::ProtocolViolation(ref v) => write!(f, "{}", v)
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Violation::ContentTooLong(len) =>
                write!(f, "record content of {} bytes exceeds 65535", len),
            Violation::NameValueTooLong(len) =>
                write!(f, "name or value of {} bytes is too long to encode",
                       len),
            Violation::MalformedBeginRequest =>
                f.write_str("begin-request body too short"),
            Violation::MalformedEndRequest =>
                f.write_str("end-request body too short"),
            Violation::MalformedNameValue =>
                f.write_str("undecodable name-value pair stream"),
            Violation::UnexpectedRecord(kind) =>
                write!(f, "unexpected record type {}", kind)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Connection(ref e) | Error::Io(ref e) => Some(e),
            _ => None
        }
    }
}
