//! A client for the FastCGI protocol.
//!
//! Frames one responder request (parameters plus a stdin body), sends it to a
//! FastCGI application over TCP or a Unix domain socket, and collects what
//! comes back until the application ends the request:
//!
//! ```no_run
//! use fcgi_client::{Client, Endpoint, Outcome, Params};
//!
//! let client = Client::new("127.0.0.1:9000".parse::<Endpoint>().unwrap());
//! let mut params = Params::new();
//! params.insert("SCRIPT_FILENAME", "/srv/www/index.php");
//! params.insert("REQUEST_METHOD", "POST");
//!
//! match client.request(&params, b"name=value") {
//!     Ok(Outcome::Complete(response)) => println!("{} bytes", response.output.len()),
//!     Ok(Outcome::Rejected(status, _)) => println!("{}", status.description()),
//!     Err(e) => println!("{}", e)
//! }
//! ```
//!
//! Every call uses a fresh connection and request id 1. There is no
//! multiplexing, no connection reuse and only the responder role.

#[macro_use] extern crate log;

pub mod cgi;
pub mod config;
pub mod errors;
pub mod fastcgi;
pub mod log_util;
pub mod transport;

pub use crate::errors::{Error, Result, Violation};
pub use crate::fastcgi::{Client, Outcome, Params, Response};
pub use crate::transport::Endpoint;
