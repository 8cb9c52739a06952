use super::*;
use toml::Value;

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

pub fn parse_file<P: AsRef<Path>>(conf: P) -> Result<Config, Error> {
    let mut toml = String::new();
    {
        let mut f = File::open(conf)?;
        f.read_to_string(&mut toml)?;
    }

    parse_str(&toml)
}

pub fn parse_str(toml: &str) -> Result<Config, Error> {
    match toml.parse::<Value>() {
        Ok(table) => config_from_table(&table),
        Err(e) => Err(Error::Parse(message_from_error(&e)))
    }
}

/// Looks up a dotted path like `fastcgi.port`
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').fold(Some(value), |v, key| v.and_then(|v| v.get(key)))
}

fn port(table: &Value, path: &str) -> Result<Option<u16>, Error> {
    match lookup(table, path) {
        Some(&Value::Integer(p))
            if p <= u16::MAX as i64 &&
            p > 0 => Ok(Some(p as u16)),
        Some(&Value::Integer(p)) => Err(Error::Validation(
            format!("The FastCGI port {} is out of range", p)
        )),
        Some(val) => Err(Error::Validation(
            format!("Expected the FastCGI port to be an integer, got a {}",
                    val.type_str())
        )),
        None => Ok(None)
    }
}

fn string<'a>(table: &'a Value, path: &str, what: &str)
              -> Result<Option<&'a str>, Error>
{
    match lookup(table, path) {
        Some(&Value::String(ref s)) => Ok(Some(&s[..])),
        Some(val) => Err(Error::Validation(
            format!("Expected the {} to be a string, got a {}",
                    what, val.type_str())
        )),
        None => Ok(None)
    }
}

fn config_from_table(table: &Value) -> Result<Config, Error> {
    let mut config: Config = Default::default();

    let host = string(table, "fastcgi.host", "FastCGI host")?;
    let port = port(table, "fastcgi.port")?;
    let socket = string(table, "fastcgi.socket", "FastCGI socket path")?;

    config.endpoint = match (socket, host, port) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) =>
            return Err(Error::Validation(String::from(
                "Give either fastcgi.socket or fastcgi.host/port, not both"))),
        (Some(path), None, None) => unix_endpoint(path)?,
        (None, host, port) => Endpoint::Tcp {
            host: String::from(host.unwrap_or("127.0.0.1")),
            port: port.unwrap_or(9000)
        }
    };

    match lookup(table, "fastcgi.timeout_secs") {
        Some(&Value::Integer(t)) if t > 0 =>
            config.timeout = Some(Duration::from_secs(t as u64)),
        Some(&Value::Float(t)) if t > 0.0 => {
            match Duration::try_from_secs_f64(t) {
                Ok(timeout) if !timeout.is_zero() =>
                    config.timeout = Some(timeout),
                _ => return Err(Error::Validation(format!(
                    "The FastCGI timeout of {} seconds is out of range", t)))
            }
        },
        Some(&Value::Integer(_)) | Some(&Value::Float(_)) =>
            return Err(Error::Validation(String::from(
                "The FastCGI timeout must be positive"))),
        Some(val) => return Err(Error::Validation(
            format!("Expected the FastCGI timeout to be a number, got a {}",
                    val.type_str())
        )),
        None => ()
    }

    match lookup(table, "params") {
        Some(&Value::Table(ref params)) => {
            for (name, value) in params {
                match *value {
                    Value::String(ref v) => {
                        config.params.insert(&name[..], &v[..]);
                    },
                    ref other => return Err(Error::Validation(
                        format!("Expected parameter {} to be a string, got a {}",
                                name, other.type_str())
                    ))
                }
            }
        },
        Some(val) => return Err(Error::Validation(
            format!("Expected [params] to be a table, got a {}",
                    val.type_str())
        )),
        None => ()
    }

    Ok(config)
}

#[cfg(unix)]
fn unix_endpoint(path: &str) -> Result<Endpoint, Error> {
    Ok(Endpoint::Unix(PathBuf::from(path)))
}

#[cfg(not(unix))]
fn unix_endpoint(_path: &str) -> Result<Endpoint, Error> {
    Err(Error::Validation(String::from(
        "Unix domain sockets aren't supported on this platform")))
}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(ErrorMessage),
    Validation(String)
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Parse(ref m) =>
                write!(f, "line {} column {}: {}", m.line, m.column, m.desc),
            Error::Validation(ref m) => f.write_str(m)
        }
    }
}

/// An owned, rendered version of a TOML parse error
#[derive(Debug, Clone)]
pub struct ErrorMessage {
    pub desc: String,
    /// One-based; zero when the parser couldn't say
    pub line: usize,
    pub column: usize
}

fn message_from_error(error: &toml::de::Error) -> ErrorMessage {
    let (line, column) = error.line_col()
        .map_or((0, 0), |(l, c)| (l + 1, c + 1));

    ErrorMessage {
        desc: error.to_string(),
        line: line,
        column: column
    }
}
