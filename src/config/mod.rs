pub mod parser;

use crate::fastcgi::Params;
use crate::transport::Endpoint;

use std::time::Duration;

/// A holder for client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Where the FastCGI application listens
    pub endpoint: Endpoint,
    /// Read/write deadline per socket operation; `None` blocks forever
    pub timeout: Option<Duration>,
    /// Parameters sent with every request
    pub params: Params
}

impl Default for Config {
    fn default() -> Config {
        Config {
            endpoint: Endpoint::default(),
            timeout: None,
            params: default_params()
        }
    }
}

/// The CGI variables a request carries unless configured otherwise
pub fn default_params() -> Params {
    let mut params = Params::new();
    params.insert("GATEWAY_INTERFACE", "FastCGI/1.0");
    params.insert("REQUEST_METHOD", "GET");
    params.insert("SERVER_SOFTWARE",
                  concat!("fcgi-client/", env!("CARGO_PKG_VERSION")));
    params.insert("SERVER_PROTOCOL", "HTTP/1.1");
    params.insert("CONTENT_TYPE", "application/x-www-form-urlencoded");
    params
}
