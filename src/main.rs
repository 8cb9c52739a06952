//! Send a single request to a FastCGI application.
//!
//! Call it like this:
//!
//!     fcgi-client -c unix:/var/run/php5-fpm.sock -m PUT -d values sample.php
//!
//! Settings may also come from a [TOML][toml] file given with `-f`:
//!
//! ```toml
//! [fastcgi]
//! host = "127.0.0.1"
//! port = 9000
//! timeout_secs = 30
//!
//! [params]
//! SERVER_NAME = "localhost"
//! ```
//!
//! Without a config file the client talks to 127.0.0.1:9000 and sends a
//! handful of stock CGI variables. Command-line options win over the file.
//! The application's output goes to stdout as-is; `--body-only` strips the
//! CGI header block first.
//!
//! Exits 0 when the application completes the request, 2 when it refuses it
//! (overloaded, unknown role, can't multiplex) and 1 on any other error.
//!
//! [toml]: https://github.com/toml-lang/toml

#[macro_use] extern crate log;

use fcgi_client::cgi::parser::document;
use fcgi_client::config::Config;
use fcgi_client::config::parser::{self, parse_file};
use fcgi_client::fastcgi::{Client, Outcome, Params, management_records};
use fcgi_client::log_util::ascii_escape;
use fcgi_client::transport::{Endpoint, Socket};

use clap::{App, Arg, ArgMatches};

use std::env;
use std::fs::File;
use std::io::{self, stderr, stdout, Read, Write};
use std::process::exit;
use std::time::Duration;

const EXIT_ERROR: i32 = 1;
const EXIT_REJECTED: i32 = 2;

fn main() {
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter(None, log::LevelFilter::Info);

    if let Ok(var) = env::var("FCGI_CLIENT_LOG") {
        log_builder.parse_filters(&var);
    }

    if let Err(e) = log_builder.try_init() {
        let _ = writeln!(stderr(),
                         "fcgi-client: Error when initializing logging: {}", e);
        exit(EXIT_ERROR);
    }

    let matches = App::new("fcgi-client")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sends one request to a FastCGI application")
        .arg(Arg::with_name("config_file")
             .short("f")
             .long("config")
             .value_name("FILE")
             .help("The TOML file with client configuration")
             .takes_value(true))
        .arg(Arg::with_name("connect")
             .short("c")
             .long("connect")
             .value_name("ENDPOINT")
             .help("host:port or unix:/path of the application")
             .takes_value(true))
        .arg(Arg::with_name("timeout")
             .short("t")
             .long("timeout")
             .value_name("SECS")
             .help("Give up on a read or write after this many seconds")
             .takes_value(true))
        .arg(Arg::with_name("method")
             .short("m")
             .long("method")
             .value_name("METHOD")
             .help("Sets REQUEST_METHOD")
             .takes_value(true))
        .arg(Arg::with_name("param")
             .short("p")
             .long("param")
             .value_name("NAME=VALUE")
             .help("Adds or replaces a request parameter")
             .takes_value(true)
             .multiple(true)
             .number_of_values(1))
        .arg(Arg::with_name("data")
             .short("d")
             .long("data")
             .value_name("DATA")
             .help("Request body sent as stdin")
             .takes_value(true)
             .conflicts_with("data_file"))
        .arg(Arg::with_name("data_file")
             .long("data-file")
             .value_name("FILE")
             .help("Read the request body from FILE, or - for stdin")
             .takes_value(true))
        .arg(Arg::with_name("body_only")
             .long("body-only")
             .help("Strip the CGI headers from the output"))
        .arg(Arg::with_name("get_values")
             .long("get-values")
             .help("Query FCGI_MAX_CONNS, FCGI_MAX_REQS and FCGI_MPXS_CONNS \
                    instead of sending a request")
             .conflicts_with_all(&["data", "data_file", "script"]))
        .arg(Arg::with_name("script")
             .value_name("SCRIPT")
             .help("Script to run; sets SCRIPT_FILENAME")
             .index(1))
        .get_matches();

    exit(run(&matches));
}

fn run(matches: &ArgMatches) -> i32 {
    let mut config = match load_config(matches) {
        Some(c) => c,
        None => return EXIT_ERROR
    };

    if let Err(message) = apply_overrides(matches, &mut config) {
        error!("{}", message);
        return EXIT_ERROR;
    }

    let client = Client::with_connector(Socket {
        endpoint: config.endpoint.clone(),
        timeout: config.timeout
    });

    if matches.is_present("get_values") {
        return get_values(&client);
    }

    let body = match read_body(matches) {
        Ok(b) => b,
        Err(e) => {
            error!("Error reading the request body: {}", e);
            return EXIT_ERROR;
        }
    };

    debug!("Requesting from {} with {} parameters", config.endpoint,
           config.params.len());

    let (code, response) = match client.request(&config.params, &body) {
        Ok(Outcome::Complete(response)) => (0, response),
        Ok(Outcome::Rejected(status, response)) => {
            error!("Request refused: {}", status.description());
            (EXIT_REJECTED, response)
        },
        Err(e) => {
            error!("Request to {} failed: {}", config.endpoint, e);
            if e.is_truncation() {
                info!("The application hung up before ending the request");
            }
            return EXIT_ERROR;
        }
    };

    let output = if matches.is_present("body_only") {
        match document(&response.output) {
            Ok((body, _)) => body,
            Err(_) => {
                warn!("No CGI header block in the output; printing all of it");
                &response.output[..]
            }
        }
    }
    else {
        &response.output[..]
    };

    let out = stdout();
    let mut out = out.lock();
    if let Err(e) = out.write_all(output).and_then(|_| out.flush()) {
        error!("Error writing output: {}", e);
        return EXIT_ERROR;
    }

    code
}

fn load_config(matches: &ArgMatches) -> Option<Config> {
    let config_file = match matches.value_of_os("config_file") {
        Some(f) => f,
        None => return Some(Config::default())
    };

    match parse_file(config_file) {
        Ok(c) => Some(c),
        Err(parser::Error::Io(e)) => {
            error!("Error opening config file {:?}: {}", config_file, e);
            None
        },
        Err(parser::Error::Parse(e)) => {
            error!("Config file error in {:?} at line {} column {}: {}",
                   config_file, e.line, e.column, e.desc);
            None
        },
        Err(parser::Error::Validation(message)) => {
            error!("Error in config file: {}", message);
            None
        }
    }
}

fn apply_overrides(matches: &ArgMatches, config: &mut Config)
                   -> Result<(), String>
{
    if let Some(raw) = matches.value_of("connect") {
        config.endpoint = raw.parse::<Endpoint>().map_err(|e| e.to_string())?;
    }

    if let Some(raw) = matches.value_of("timeout") {
        let secs = raw.parse::<u64>()
            .ok()
            .filter(|&s| s > 0)
            .ok_or_else(|| format!("Invalid timeout {:?}", raw))?;
        config.timeout = Some(Duration::from_secs(secs));
    }

    if let Some(method) = matches.value_of("method") {
        config.params.insert("REQUEST_METHOD", method);
    }

    if let Some(script) = matches.value_of_os("script") {
        let cwd = env::current_dir().map_err(|e| e.to_string())?;
        let path = cwd.join(script);
        config.params.insert("SCRIPT_FILENAME",
                             path.to_string_lossy().into_owned());
    }

    let mut extra = Params::new();
    for pair in matches.values_of("param").into_iter().flatten() {
        let (name, value) = split_param(pair)?;
        extra.insert(name, value);
    }
    config.params.extend_from(&extra);

    Ok(())
}

/// Splits `NAME=VALUE` at the first `=`
fn split_param(pair: &str) -> Result<(&str, &str), String> {
    match pair.find('=') {
        Some(0) | None =>
            Err(format!("Expected a parameter as NAME=VALUE, got {:?}", pair)),
        Some(i) => Ok((&pair[.. i], &pair[i + 1 ..]))
    }
}

fn read_body(matches: &ArgMatches) -> io::Result<Vec<u8>> {
    if let Some(data) = matches.value_of("data") {
        return Ok(Vec::from(data.as_bytes()));
    }

    let mut body = Vec::new();
    match matches.value_of_os("data_file") {
        Some(f) if f == "-" => { io::stdin().read_to_end(&mut body)?; },
        Some(f) => { File::open(f)?.read_to_end(&mut body)?; },
        None => ()
    }

    Ok(body)
}

fn get_values(client: &Client) -> i32 {
    let names = [management_records::MAX_CONNS,
                 management_records::MAX_REQS,
                 management_records::MPXS_CONNS];

    match client.get_values(&names) {
        Ok(values) => {
            for (name, value) in &values {
                println!("{}={}", ascii_escape(name), ascii_escape(value));
            }
            0
        },
        Err(e) => {
            error!("Management query to {} failed: {}", client.endpoint(), e);
            EXIT_ERROR
        }
    }
}

#[test]
fn split_param_works() {
    assert_eq!(split_param("A=1"), Ok(("A", "1")));
    assert_eq!(split_param("QUERY_STRING=a=b"), Ok(("QUERY_STRING", "a=b")));
    assert_eq!(split_param("EMPTY="), Ok(("EMPTY", "")));
    assert!(split_param("=x").is_err());
    assert!(split_param("novalue").is_err());
}
