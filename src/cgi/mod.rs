//! Process CGI/1.1 response documents
//!
//! A FastCGI responder answers the way a CGI script would: a block of
//! header lines, a blank line, then the body. `parser::document` splits the
//! accumulated output along those lines.

pub mod parser;

/// A status line
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Status {
    pub code: u16,
    pub reason_phrase: Vec<u8>
}

/// A header line
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    pub name: Vec<u8>,
    pub content: Vec<u8>
}

/// The header portion of a document
///
/// `Status`, `Content-Type` and `Location` are pulled out of `headers`.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct DocumentHeaders {
    pub status: Option<Status>,
    pub content_type: Option<Vec<u8>>,
    pub location: Option<Vec<u8>>,
    pub headers: Vec<Header>
}

impl DocumentHeaders {
    /// The status a gateway would send, defaulting like CGI does: 302 for a
    /// bare redirect, 200 otherwise
    pub fn effective_status(&self) -> u16 {
        match (&self.status, &self.location) {
            (&Some(ref s), _) => s.code,
            (&None, &Some(_)) => 302,
            (&None, &None) => 200
        }
    }
}
