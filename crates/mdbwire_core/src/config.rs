use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Upper bound on name resolution plus TCP establishment.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

const ALLOWED_SCHEMES: &str = "tcp, ssl, tls";

/// URL scheme of a server address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Scheme {
    #[default]
    Tcp,
    /// Accepted, but currently downgraded to plaintext TCP.
    Ssl,
    /// Accepted, but currently downgraded to plaintext TCP.
    Tls,
}

impl Scheme {
    pub fn is_secure(self) -> bool {
        matches!(self, Scheme::Ssl | Scheme::Tls)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Ssl => "ssl",
            Scheme::Tls => "tls",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Scheme::Tcp),
            "ssl" => Ok(Scheme::Ssl),
            "tls" => Ok(Scheme::Tls),
            other => Err(DriverError::Configuration(format!(
                "Invalid URL scheme: {other}. \
                 Scheme must be one of the following: {ALLOWED_SCHEMES}"
            ))),
        }
    }
}

/// Where and how to open a server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    /// Applies to establishment only; steady-state reads and writes never time out.
    pub connection_timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16, scheme: Scheme) -> Self {
        Self {
            host: host.into(),
            port,
            scheme,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Parses `scheme://host:port`, with an optional trailing path that is ignored.
    /// IPv6 hosts must be bracketed (`tcp://[::1]:1234`).
    pub fn from_url(url: &str) -> Result<Self, DriverError> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            DriverError::Configuration(format!(
                "URL {url:?} must have the form scheme://host:port"
            ))
        })?;

        let scheme: Scheme = scheme.to_ascii_lowercase().parse()?;
        let authority = rest.split('/').next().unwrap_or_default();

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed.split_once(']').ok_or_else(|| {
                DriverError::Configuration(format!("Unterminated IPv6 host in URL {url:?}"))
            })?;
            (host, after.strip_prefix(':'))
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(DriverError::Configuration(format!(
                "URL {url:?} does not provide a host"
            )));
        }

        let port = match port {
            Some(port) if !port.is_empty() => port.parse::<u16>().map_err(|_| {
                DriverError::Configuration(format!("Invalid port {port:?} in URL {url:?}"))
            })?,
            _ => {
                return Err(DriverError::Configuration(
                    "URL does not provide a port".to_string(),
                ));
            }
        };

        Ok(Self::new(host, port, scheme))
    }

    /// `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
