use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, TransportError};

/// Socket path used when an `ipc://` address names no path.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/dime.sock";

/// Address used when the caller does not provide one.
pub const DEFAULT_ADDRESS: &str = "ipc:///tmp/dime.sock";

/// Where a DiME broker is listening.
///
/// Addresses are written `<proto>://<host>[:<port>]`. `ipc` and `unix` name a
/// Unix domain socket path, `tcp` names a host and a mandatory port. A string
/// without a scheme is treated as a Unix socket path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Unix domain socket at a filesystem path.
    Unix(PathBuf),
    /// TCP endpoint.
    Tcp { host: String, port: u16 },
}

impl Address {
    /// Parse an address string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid(input, "address must not be empty"));
        }

        let Some((proto, rest)) = input.split_once("://") else {
            return Ok(Self::Unix(PathBuf::from(input)));
        };

        match proto {
            "ipc" | "unix" => {
                if rest.is_empty() {
                    Ok(Self::Unix(PathBuf::from(DEFAULT_SOCKET_PATH)))
                } else {
                    Ok(Self::Unix(PathBuf::from(rest)))
                }
            }
            "tcp" => {
                let (host, port) = split_host_port(rest)
                    .ok_or_else(|| invalid(input, "tcp address requires <host>:<port>"))?;
                if host.is_empty() {
                    return Err(invalid(input, "tcp address has an empty host"));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid(input, "tcp port must be a number in 0..=65535"))?;
                Ok(Self::Tcp {
                    host: host.to_string(),
                    port,
                })
            }
            other => Err(invalid(input, &format!("unsupported protocol '{other}'"))),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Unix(_) => "unix-domain-socket",
            Self::Tcp { .. } => "tcp",
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Self::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

impl FromStr for Address {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "ipc://{}", path.display()),
            Self::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{host}]:{port}"),
            Self::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
        }
    }
}

// Bracketed IPv6 literals keep their inner colons.
fn split_host_port(rest: &str) -> Option<(&str, &str)> {
    if let Some(stripped) = rest.strip_prefix('[') {
        let (host, tail) = stripped.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        return Some((host, port));
    }
    rest.rsplit_once(':')
}

fn invalid(address: &str, reason: &str) -> TransportError {
    TransportError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ipc_and_unix_schemes() {
        assert_eq!(
            Address::parse("ipc:///tmp/a.sock").unwrap(),
            Address::Unix(PathBuf::from("/tmp/a.sock"))
        );
        assert_eq!(
            Address::parse("unix:///run/dime.sock").unwrap(),
            Address::Unix(PathBuf::from("/run/dime.sock"))
        );
    }

    #[test]
    fn bare_path_is_unix_socket() {
        assert_eq!(
            Address::parse("/var/run/dime.sock").unwrap(),
            Address::Unix(PathBuf::from("/var/run/dime.sock"))
        );
    }

    #[test]
    fn empty_ipc_path_uses_default_socket() {
        assert_eq!(Address::parse("ipc://").unwrap(), Address::default());
        assert_eq!(Address::parse(DEFAULT_ADDRESS).unwrap(), Address::default());
    }

    #[test]
    fn parses_tcp_host_and_port() {
        assert_eq!(
            Address::parse("tcp://localhost:5000").unwrap(),
            Address::Tcp {
                host: "localhost".to_string(),
                port: 5000
            }
        );
        assert_eq!(
            Address::parse("tcp://[::1]:8818").unwrap(),
            Address::Tcp {
                host: "::1".to_string(),
                port: 8818
            }
        );
    }

    #[test]
    fn tcp_requires_port() {
        let err = Address::parse("tcp://localhost").unwrap_err();
        assert!(matches!(err, TransportError::InvalidAddress { .. }));
        assert!(Address::parse("tcp://localhost:http").is_err());
        assert!(Address::parse("tcp://:5000").is_err());
    }

    #[test]
    fn rejects_unknown_protocol_and_empty_input() {
        assert!(Address::parse("ws://localhost:8080").is_err());
        assert!(Address::parse("   ").is_err());
    }

    #[test]
    fn display_roundtrips() {
        for text in ["ipc:///tmp/x.sock", "tcp://127.0.0.1:5000", "tcp://[::1]:5000"] {
            let addr: Address = text.parse().unwrap();
            assert_eq!(addr.to_string(), text);
            assert_eq!(Address::parse(&addr.to_string()).unwrap(), addr);
        }
    }
}
