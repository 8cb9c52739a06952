//! Reading a responder's records back
//!
//! `ResponseReader` walks a small state machine, one record per lap:
//!
//! ```text
//! AwaitHeader -> AwaitContent -> AwaitPadding -> AwaitHeader ...
//!                                            \-> Done (after end-request)
//! ```
//!
//! Each state does exactly one blocking `read_exact` (or none, for empty
//! content or padding), so a short read is blamed on the right part of the
//! record.

use crate::errors::{Error, Result};
use crate::fastcgi::{Header, ProtocolStatus, HEADER_LEN, record_kind};
use crate::fastcgi::parser::{decode_header, end_request};
use crate::log_util::ascii_escape;

use std::io::{self, Read};

/// Everything the application sent back for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Stdout and stderr content, in arrival order, byte for byte
    pub output: Vec<u8>,
    /// Just the stderr content
    pub stderr: Vec<u8>,
    pub app_status: u32,
    pub protocol_status: ProtocolStatus
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    AwaitHeader,
    AwaitContent(Header),
    /// Padding to skip, and whether the record was the end-request
    AwaitPadding(Header, bool),
    Done
}

/// Accumulates one request's worth of response records
pub struct ResponseReader {
    request_id: u16,
    state: State,
    output: Vec<u8>,
    stderr: Vec<u8>,
    app_status: u32,
    protocol_status: ProtocolStatus
}

impl ResponseReader {
    pub fn new(request_id: u16) -> ResponseReader {
        ResponseReader {
            request_id: request_id,
            state: State::AwaitHeader,
            output: Vec::with_capacity(4096),
            stderr: Vec::new(),
            app_status: 0,
            protocol_status: ProtocolStatus::RequestComplete
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Drives the machine until the end-request record has been consumed
    pub fn read_from<R: Read>(mut self, mut source: R) -> Result<Response> {
        while !self.is_done() {
            self.step(&mut source)?;
        }

        Ok(Response {
            output: self.output,
            stderr: self.stderr,
            app_status: self.app_status,
            protocol_status: self.protocol_status
        })
    }

    /// Performs one transition
    pub fn step<R: Read>(&mut self, source: &mut R) -> Result<()> {
        self.state = match self.state {
            State::AwaitHeader => {
                let hdr = read_header(source)?;
                trace!("Record type {} for request {}, {} + {} bytes",
                       hdr.kind, hdr.id, hdr.content_length,
                       hdr.padding_length);
                State::AwaitContent(hdr)
            },
            State::AwaitContent(hdr) => {
                let content = read_content(source, &hdr)?;
                let finished = self.dispatch(&hdr, &content)?;
                State::AwaitPadding(hdr, finished)
            },
            State::AwaitPadding(hdr, finished) => {
                skip_padding(source, &hdr)?;
                if finished { State::Done } else { State::AwaitHeader }
            },
            State::Done => State::Done
        };

        Ok(())
    }

    /// Files record content away. Returns true for the end-request record.
    fn dispatch(&mut self, hdr: &Header, content: &[u8]) -> Result<bool> {
        if hdr.id != self.request_id {
            warn!("Found a record for request {}; this is request {}",
                  hdr.id, self.request_id);
            return Ok(false);
        }

        match hdr.kind {
            record_kind::STDOUT => self.output.extend_from_slice(content),
            record_kind::STDERR => {
                if !content.is_empty() {
                    warn!("Error message from responder: \"{}\"",
                          ascii_escape(content));
                }
                self.output.extend_from_slice(content);
                self.stderr.extend_from_slice(content);
            },
            record_kind::END_REQUEST => {
                let end = end_request(content)?;
                if end.app_status != 0 {
                    info!("Responder closed with application status {}",
                          end.app_status);
                }
                if !end.protocol_status.is_complete() {
                    warn!("Got protocol status {}, expected 0",
                          end.protocol_status.to_protocol_number());
                }
                self.app_status = end.app_status;
                self.protocol_status = end.protocol_status;
                return Ok(true);
            },
            other => warn!("Saw unexpected record kind {}", other)
        }

        Ok(false)
    }
}

fn truncated(e: io::Error, short: Error) -> Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        short
    }
    else {
        Error::Io(e)
    }
}

/// Reads and decodes the next record header
pub fn read_header<R: Read>(source: &mut R) -> Result<Header> {
    let mut raw = [0u8; HEADER_LEN];
    source.read_exact(&mut raw)
        .map_err(|e| truncated(e, Error::TruncatedHeader))?;

    if raw[0] != super::VERSION {
        warn!("Responder speaks FastCGI version {}", raw[0]);
    }

    decode_header(&raw)
}

/// Reads the content a header promised
pub fn read_content<R: Read>(source: &mut R, hdr: &Header) -> Result<Vec<u8>> {
    let mut content = vec![0u8; hdr.content_length as usize];
    if !content.is_empty() {
        source.read_exact(&mut content)
            .map_err(|e| truncated(e, Error::TruncatedContent))?;
    }

    Ok(content)
}

/// Reads and drops the padding a header promised
pub fn skip_padding<R: Read>(source: &mut R, hdr: &Header) -> Result<()> {
    let mut padding = [0u8; 255];
    let padding = &mut padding[.. hdr.padding_length as usize];
    if !padding.is_empty() {
        source.read_exact(padding)
            .map_err(|e| truncated(e, Error::TruncatedPadding))?;
    }

    Ok(())
}
