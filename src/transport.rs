//! Byte-stream transports to a FastCGI application
//!
//! The protocol core only needs `write_all`, `read_exact` and a way to close
//! the connection. Everything here is about getting one of those.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::PathBuf;

/// Where the application listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp {
        host: String,
        port: u16
    },
    #[cfg(unix)]
    Unix(PathBuf)
}

impl Default for Endpoint {
    fn default() -> Endpoint {
        Endpoint::Tcp {
            host: String::from("127.0.0.1"),
            port: 9000
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Endpoint::Tcp { ref host, port } if host.contains(':') =>
                write!(f, "[{}]:{}", host, port),
            Endpoint::Tcp { ref host, port } => write!(f, "{}:{}", host, port),
            #[cfg(unix)]
            Endpoint::Unix(ref path) => write!(f, "unix:{}", path.display())
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct EndpointParseError(String);

impl fmt::Display for EndpointParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid FastCGI address (expected host:port or unix:path): {}",
               self.0)
    }
}

impl ::std::error::Error for EndpointParseError {}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    /// Accepts `host:port`, `[v6addr]:port`, `unix:/path` and
    /// `unix:///path`
    fn from_str(raw: &str) -> Result<Endpoint, EndpointParseError> {
        let bad = || EndpointParseError(String::from(raw));

        if let Some(path) = raw.strip_prefix("unix:") {
            let path = path.strip_prefix("//").unwrap_or(path);
            if path.is_empty() {
                return Err(bad());
            }
            return unix_endpoint(path).ok_or_else(bad);
        }

        let colon = raw.rfind(':').ok_or_else(bad)?;
        let (host, port) = (&raw[.. colon], &raw[colon + 1 ..]);
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = port.parse::<u16>().map_err(|_| bad())?;
        if host.is_empty() || port == 0 {
            return Err(bad());
        }

        Ok(Endpoint::Tcp {
            host: String::from(host),
            port: port
        })
    }
}

#[cfg(unix)]
fn unix_endpoint(path: &str) -> Option<Endpoint> {
    Some(Endpoint::Unix(PathBuf::from(path)))
}

#[cfg(not(unix))]
fn unix_endpoint(_path: &str) -> Option<Endpoint> {
    None
}

/// A connected byte stream the client can speak FastCGI over
pub trait Transport: Read + Write {
    /// Tears the connection down. Called once, when the session ends.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Something that can open a fresh transport for each request
pub trait Connect {
    type Stream: Transport;

    fn connect(&self) -> io::Result<Self::Stream>;
}

/// A connected socket of either family
#[derive(Debug)]
pub enum Stream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream)
}

impl Stream {
    fn set_timeouts(&self, timeout: Option<Duration>) -> io::Result<()> {
        match *self {
            Stream::Tcp(ref s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            },
            #[cfg(unix)]
            Stream::Unix(ref s) => {
                s.set_read_timeout(timeout)?;
                s.set_write_timeout(timeout)
            }
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            Stream::Tcp(ref mut s) => s.read(buf),
            #[cfg(unix)]
            Stream::Unix(ref mut s) => s.read(buf)
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            Stream::Tcp(ref mut s) => s.write(buf),
            #[cfg(unix)]
            Stream::Unix(ref mut s) => s.write(buf)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Stream::Tcp(ref mut s) => s.flush(),
            #[cfg(unix)]
            Stream::Unix(ref mut s) => s.flush()
        }
    }
}

impl Transport for Stream {
    fn close(&mut self) -> io::Result<()> {
        let result = match *self {
            Stream::Tcp(ref s) => s.shutdown(Shutdown::Both),
            #[cfg(unix)]
            Stream::Unix(ref s) => s.shutdown(Shutdown::Both)
        };

        // The peer may well have hung up first
        match result {
            Err(ref e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other
        }
    }
}

/// Connects sockets to an `Endpoint`, with an optional I/O deadline
#[derive(Debug, Clone, Default)]
pub struct Socket {
    pub endpoint: Endpoint,
    /// Applied to every read and write on the connected stream
    pub timeout: Option<Duration>
}

impl Socket {
    pub fn new(endpoint: Endpoint) -> Socket {
        Socket {
            endpoint: endpoint,
            timeout: None
        }
    }
}

impl Connect for Socket {
    type Stream = Stream;

    fn connect(&self) -> io::Result<Stream> {
        let stream = match self.endpoint {
            Endpoint::Tcp { ref host, port } => {
                let stream = TcpStream::connect((&host[..], port))?;
                stream.set_nodelay(true)?;
                Stream::Tcp(stream)
            },
            #[cfg(unix)]
            Endpoint::Unix(ref path) => Stream::Unix(UnixStream::connect(path)?)
        };

        if self.timeout.is_some() {
            stream.set_timeouts(self.timeout)?;
        }

        Ok(stream)
    }
}

/// Owns a connected transport for the length of one request
///
/// Dropping the session closes the transport, whichever way the request
/// ended.
pub struct Session<T: Transport> {
    transport: T
}

impl<T: Transport> Session<T> {
    pub fn open<C>(connector: &C) -> io::Result<Session<T>>
        where C: Connect<Stream = T>
    {
        Ok(Session {
            transport: connector.connect()?
        })
    }
}

impl<T: Transport> Deref for Session<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> DerefMut for Session<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.close() {
            debug!("Error closing FastCGI transport: {}", e);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn parse_host_port() {
        assert_eq!("127.0.0.1:9000".parse::<Endpoint>().unwrap(),
                   Endpoint::Tcp { host: String::from("127.0.0.1"), port: 9000 });
        assert_eq!("localhost:9001".parse::<Endpoint>().unwrap(),
                   Endpoint::Tcp { host: String::from("localhost"), port: 9001 });
    }

    #[test]
    fn parse_bracketed_v6() {
        let endpoint = "[::1]:9000".parse::<Endpoint>().unwrap();
        assert_eq!(endpoint,
                   Endpoint::Tcp { host: String::from("::1"), port: 9000 });
        assert_eq!(endpoint.to_string(), "[::1]:9000");
    }

    #[test]
    #[cfg(unix)]
    fn parse_unix_forms() {
        let expected = Endpoint::Unix(PathBuf::from("/var/run/php-fpm.sock"));
        assert_eq!("unix:/var/run/php-fpm.sock".parse::<Endpoint>().unwrap(),
                   expected);
        assert_eq!("unix:///var/run/php-fpm.sock".parse::<Endpoint>().unwrap(),
                   expected);
        assert_eq!(expected.to_string(), "unix:/var/run/php-fpm.sock");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("localhost".parse::<Endpoint>().is_err());
        assert!("localhost:http".parse::<Endpoint>().is_err());
        assert!(":9000".parse::<Endpoint>().is_err());
        assert!("host:0".parse::<Endpoint>().is_err());
        assert!("unix:".parse::<Endpoint>().is_err());
    }

    struct Tracked {
        closed: Rc<Cell<usize>>
    }

    impl Read for Tracked {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
    }

    impl Write for Tracked {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for Tracked {
        fn close(&mut self) -> io::Result<()> {
            self.closed.set(self.closed.get() + 1);
            Ok(())
        }
    }

    struct TrackedConnector {
        closed: Rc<Cell<usize>>
    }

    impl Connect for TrackedConnector {
        type Stream = Tracked;

        fn connect(&self) -> io::Result<Tracked> {
            Ok(Tracked { closed: self.closed.clone() })
        }
    }

    #[test]
    fn session_closes_once_on_drop() {
        let closed = Rc::new(Cell::new(0));
        let connector = TrackedConnector { closed: closed.clone() };

        {
            let mut session = Session::open(&connector).unwrap();
            session.write_all(b"bytes").unwrap();
            assert_eq!(closed.get(), 0);
        }

        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn refused_connection_is_an_error() {
        // Bind then drop to find a port nobody listens on
        let port = {
            let listener = ::std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let socket = Socket::new(Endpoint::Tcp {
            host: String::from("127.0.0.1"),
            port: port
        });

        assert!(socket.connect().is_err());
    }
}
