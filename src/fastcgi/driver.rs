//! A driver for FastCGI requests
//!
//! Each call opens its own connection, writes the whole request, reads the
//! response up to the end-request record and hangs up. Nothing is kept
//! between calls, so a `Client` can be shared freely as long as its
//! connector can.

use crate::errors::{Error, Result, Violation};
use crate::fastcgi::{Content, ProtocolStatus, Params, Role, Response,
                     REQUEST_ID, MANAGEMENT_ID};
use crate::fastcgi::parser::content;
use crate::fastcgi::reader::{ResponseReader, read_header, read_content,
                             skip_padding};
use crate::fastcgi::serializer::{begin_request, params, stdin, get_values};
use crate::transport::{Connect, Endpoint, Session, Socket};

use std::io::Write;
use std::time::Duration;

/// The parameter the client fills in from the stdin payload
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";

/// How a request ended, when the transport and framing held up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `FCGI_REQUEST_COMPLETE`
    Complete(Response),
    /// Any other protocol status. Whatever output arrived before the
    /// end-request record is kept.
    Rejected(ProtocolStatus, Response)
}

impl Outcome {
    fn from_response(response: Response) -> Outcome {
        if response.protocol_status.is_complete() {
            Outcome::Complete(response)
        }
        else {
            Outcome::Rejected(response.protocol_status, response)
        }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        match *self {
            Outcome::Complete(_) => true,
            Outcome::Rejected(..) => false
        }
    }

    pub fn status(&self) -> ProtocolStatus {
        match *self {
            Outcome::Complete(_) => ProtocolStatus::RequestComplete,
            Outcome::Rejected(status, _) => status
        }
    }

    pub fn response(&self) -> &Response {
        match *self {
            Outcome::Complete(ref r) | Outcome::Rejected(_, ref r) => r
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            Outcome::Complete(r) | Outcome::Rejected(_, r) => r
        }
    }
}

/// Frames a whole responder request, ready for a single write
///
/// `CONTENT_LENGTH` is set to the length of `body`, overriding any value in
/// `params`. The keep-alive flag is left clear: the application closes the
/// connection once it's answered.
pub fn build_request(params_in: &Params, body: &[u8]) -> Result<Vec<u8>> {
    let mut params_out = params_in.clone();
    params_out.insert(CONTENT_LENGTH, body.len().to_string());

    let mut request = Vec::with_capacity(body.len() + 256);
    begin_request(&mut request, REQUEST_ID, Role::Responder, 0)?;
    params(&mut request, REQUEST_ID, &params_out)?;
    stdin(&mut request, REQUEST_ID, body)?;

    Ok(request)
}

/// A FastCGI client for one application
#[derive(Debug, Clone)]
pub struct Client<C = Socket> {
    connector: C
}

impl Client<Socket> {
    pub fn new(endpoint: Endpoint) -> Client<Socket> {
        Client::with_connector(Socket::new(endpoint))
    }

    /// Like `new`, but every read and write gives up after `timeout`
    pub fn with_timeout(endpoint: Endpoint, timeout: Duration)
                        -> Client<Socket>
    {
        Client::with_connector(Socket {
            endpoint: endpoint,
            timeout: Some(timeout)
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.connector.endpoint
    }
}

impl<C: Connect> Client<C> {
    pub fn with_connector(connector: C) -> Client<C> {
        Client {
            connector: connector
        }
    }

    /// Runs one responder request
    ///
    /// Nothing is sent if the request can't be framed. The connection is
    /// closed before this returns, however it returns.
    ///
    /// Params and stdin longer than one record are split across as many
    /// records as they need, so this never fails with `ContentTooLong`.
    pub fn request(&self, params: &Params, body: &[u8]) -> Result<Outcome> {
        let request = build_request(params, body)?;

        let mut session = Session::open(&self.connector)
            .map_err(Error::Connection)?;
        debug!("Sending {} bytes of request ({} bytes of stdin)",
               request.len(), body.len());
        session.write_all(&request)?;
        session.flush()?;

        let response = ResponseReader::new(REQUEST_ID)
            .read_from(&mut *session)?;
        debug!("Request finished with status {:?}, {} bytes of output",
               response.protocol_status, response.output.len());

        Ok(Outcome::from_response(response))
    }

    /// Asks the application for management variables
    ///
    /// Sends one `FCGI_GET_VALUES` record and decodes the single
    /// `FCGI_GET_VALUES_RESULT` reply. Applications leave out variables they
    /// don't know.
    pub fn get_values(&self, names: &[&[u8]]) -> Result<Params> {
        let mut query = Vec::new();
        get_values(&mut query, names)?;

        let mut session = Session::open(&self.connector)
            .map_err(Error::Connection)?;
        session.write_all(&query)?;
        session.flush()?;

        let hdr = read_header(&mut *session)?;
        let body = read_content(&mut *session, &hdr)?;
        skip_padding(&mut *session, &hdr)?;

        if hdr.id != MANAGEMENT_ID {
            warn!("Management reply carried request id {}", hdr.id);
        }

        match content(hdr.kind, &body)? {
            Content::GetValuesResult(pairs) => Ok(pairs.into_iter()
                .map(|pair| (pair.name, pair.value))
                .collect()),
            Content::UnknownType(kind) => {
                warn!("Application doesn't understand record type {}", kind);
                Err(Violation::UnexpectedRecord(hdr.kind).into())
            },
            other => Err(Violation::UnexpectedRecord(other.kind()).into())
        }
    }
}
