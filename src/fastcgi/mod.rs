//! The FastCGI protocol, client side
//!
//! A call frames one request as a begin-request record followed by the
//! params and stdin streams, writes it in one go, then reads records back
//! until the end-request record turns up.

pub mod driver;
pub mod params;
pub mod parser;
pub mod reader;
pub mod serializer;

pub use self::driver::{Client, Outcome};
pub use self::params::Params;
pub use self::reader::Response;

/// Protocol version this client speaks and expects
pub const VERSION: u8 = 1;

/// Size of every record header on the wire
pub const HEADER_LEN: usize = 8;

/// Largest record content the 16-bit length field can describe
pub const MAX_CONTENT_LENGTH: usize = 0xFFFF;

/// The only request id used for application records; no multiplexing
pub const REQUEST_ID: u16 = 1;

/// Request id reserved for management records
pub const MANAGEMENT_ID: u16 = 0;

/// A decoded record header
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Header {
    pub version: u8,
    pub kind: u8,
    pub id: u16,
    pub content_length: u16,
    pub padding_length: u8,
    pub reserved: u8
}

/// A whole record, content decoded by kind
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Record {
    pub id: u16,
    pub content: Content
}

impl Record {
    #[inline]
    pub fn kind(&self) -> u8 {
        self.content.kind()
    }
}

/// Record content
///
/// Params are left as raw bytes because a name-value pair may straddle two
/// records of the same stream. Management records are self-contained, so
/// their pairs get decoded.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Content {
    BeginRequest(BeginRequest),
    AbortRequest,
    EndRequest(EndRequest),
    Params(Vec<u8>),
    Stdin(Vec<u8>),
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Data(Vec<u8>),
    GetValues(Vec<NameValuePair>),
    GetValuesResult(Vec<NameValuePair>),
    UnknownType(u8),
    /// A type code outside the protocol's table
    Unrecognized(u8, Vec<u8>)
}

impl Content {
    pub fn kind(&self) -> u8 {
        match *self {
            Content::BeginRequest(_) => record_kind::BEGIN_REQUEST,
            Content::AbortRequest => record_kind::ABORT_REQUEST,
            Content::EndRequest(_) => record_kind::END_REQUEST,
            Content::Params(_) => record_kind::PARAMS,
            Content::Stdin(_) => record_kind::STDIN,
            Content::Stdout(_) => record_kind::STDOUT,
            Content::Stderr(_) => record_kind::STDERR,
            Content::Data(_) => record_kind::DATA,
            Content::GetValues(_) => record_kind::GET_VALUES,
            Content::GetValuesResult(_) => record_kind::GET_VALUES_RESULT,
            Content::UnknownType(_) => record_kind::UNKNOWN_TYPE,
            Content::Unrecognized(kind, _) => kind
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameValuePair {
    pub name: Vec<u8>,
    pub value: Vec<u8>
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct BeginRequest {
    pub role: Role,
    pub flags: u8
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct EndRequest {
    pub app_status: u32,
    pub protocol_status: ProtocolStatus
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Role {
    Responder,
    Authorizer,
    Filter,
    Other(u16)
}

impl Role {
    /// Returns the protocol's number for this role
    pub fn to_protocol_number(self) -> u16 {
        match self {
            Role::Responder => 1,
            Role::Authorizer => 2,
            Role::Filter => 3,
            Role::Other(n) => n
        }
    }

    pub fn from_protocol_number(n: u16) -> Role {
        match n {
            1 => Role::Responder,
            2 => Role::Authorizer,
            3 => Role::Filter,
            n => Role::Other(n)
        }
    }
}

/// How the application says it finished a request
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolStatus {
    RequestComplete,
    CantMultiplexConnection,
    Overloaded,
    UnknownRole,
    Other(u8)
}

impl ProtocolStatus {
    pub fn from_protocol_number(n: u8) -> ProtocolStatus {
        match n {
            protocol_status::REQUEST_COMPLETE => ProtocolStatus::RequestComplete,
            protocol_status::CANT_MPX_CONN =>
                ProtocolStatus::CantMultiplexConnection,
            protocol_status::OVERLOADED => ProtocolStatus::Overloaded,
            protocol_status::UNKNOWN_ROLE => ProtocolStatus::UnknownRole,
            n => ProtocolStatus::Other(n)
        }
    }

    pub fn to_protocol_number(self) -> u8 {
        match self {
            ProtocolStatus::RequestComplete => protocol_status::REQUEST_COMPLETE,
            ProtocolStatus::CantMultiplexConnection =>
                protocol_status::CANT_MPX_CONN,
            ProtocolStatus::Overloaded => protocol_status::OVERLOADED,
            ProtocolStatus::UnknownRole => protocol_status::UNKNOWN_ROLE,
            ProtocolStatus::Other(n) => n
        }
    }

    #[inline]
    pub fn is_complete(self) -> bool {
        self == ProtocolStatus::RequestComplete
    }

    /// Human-readable explanation, suitable for a CLI
    pub fn description(self) -> &'static str {
        match self {
            ProtocolStatus::RequestComplete => "request complete",
            ProtocolStatus::CantMultiplexConnection =>
                "this app can't multiplex [CANT_MPX_CONN]",
            ProtocolStatus::Overloaded =>
                "new request rejected; too busy [OVERLOADED]",
            ProtocolStatus::UnknownRole => "role value not known [UNKNOWN_ROLE]",
            ProtocolStatus::Other(_) => "unrecognized protocol status"
        }
    }
}

pub mod flags {
    pub const KEEP_CONN: u8 = 1;
}

pub mod record_kind {
    pub const BEGIN_REQUEST: u8 = 1;
    pub const ABORT_REQUEST: u8 = 2;
    pub const END_REQUEST: u8 = 3;
    pub const PARAMS: u8 = 4;
    pub const STDIN: u8 = 5;
    pub const STDOUT: u8 = 6;
    pub const STDERR: u8 = 7;
    pub const DATA: u8 = 8;
    pub const GET_VALUES: u8 = 9;
    pub const GET_VALUES_RESULT: u8 = 10;
    pub const UNKNOWN_TYPE: u8 = 11;
}

pub mod protocol_status {
    pub const REQUEST_COMPLETE: u8 = 0;
    pub const CANT_MPX_CONN: u8 = 1;
    pub const OVERLOADED: u8 = 2;
    pub const UNKNOWN_ROLE: u8 = 3;
}

pub mod management_records {
    pub const MAX_CONNS: &[u8] = b"FCGI_MAX_CONNS";
    pub const MAX_REQS: &[u8] = b"FCGI_MAX_REQS";
    pub const MPXS_CONNS: &[u8] = b"FCGI_MPXS_CONNS";
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn protocol_status_numbers() {
        for n in 0 .. 6u8 {
            assert_eq!(ProtocolStatus::from_protocol_number(n)
                       .to_protocol_number(), n);
        }
        assert_eq!(ProtocolStatus::from_protocol_number(2),
                   ProtocolStatus::Overloaded);
        assert_eq!(ProtocolStatus::from_protocol_number(9),
                   ProtocolStatus::Other(9));
    }

    #[test]
    fn only_request_complete_is_complete() {
        assert!(ProtocolStatus::RequestComplete.is_complete());
        assert!(!ProtocolStatus::Overloaded.is_complete());
        assert!(!ProtocolStatus::Other(0x7F).is_complete());
    }

    #[test]
    fn content_kinds() {
        assert_eq!(Content::Stdout(vec![]).kind(), record_kind::STDOUT);
        assert_eq!(Content::AbortRequest.kind(), record_kind::ABORT_REQUEST);
        assert_eq!(Content::Unrecognized(42, vec![]).kind(), 42);
    }
}
