//! Control endpoint addressing.
//!
//! An endpoint is either a local domain socket path or a network host/port.
//! Callers should build one explicitly; [`Endpoint::from_address`] keeps the
//! old "looks like an IPv4 literal" dispatch for call sites that only have a
//! bare address string.

use crate::error::ClientError;
use crate::protocol::Command;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

/// Longest local socket path accepted, matching `sun_path` minus the NUL.
pub const MAX_SOCKET_PATH_LEN: usize = 107;

/// Where the control socket lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Local domain socket identified by a filesystem path.
    Local { path: PathBuf },
    /// TCP endpoint. `host` is an IP literal or a resolvable hostname.
    Network { host: String, port: u16 },
}

impl Endpoint {
    /// Build a local socket endpoint, rejecting paths that cannot fit in a socket address.
    pub fn local(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        check_path_len(&path)?;
        Ok(Endpoint::Local { path })
    }

    /// Build a network endpoint.
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Network {
            host: host.into(),
            port,
        }
    }

    /// Classify a bare address string.
    ///
    /// An IPv4 literal selects TCP and requires `port`; anything else is a
    /// socket path and must not come with a port. A path that happens to
    /// parse as an IPv4 address cannot be reached this way; use
    /// [`Endpoint::local`] instead.
    pub fn from_address(address: &str, port: Option<&str>) -> Result<Self, ClientError> {
        match (is_ipv4_literal(address), port) {
            (true, Some(port)) => Ok(Endpoint::network(address, parse_port(port)?)),
            (true, None) => Err(ClientError::InvalidParameterCount {
                got: 1,
                expected: "host and port",
            }),
            (false, None) => Endpoint::local(address),
            (false, Some(_)) => Err(ClientError::InvalidParameterCount {
                got: 2,
                expected: "a socket path only",
            }),
        }
    }

    /// Parse a `host:port` pair. IPv6 hosts must be bracketed, as in `[::1]:9999`.
    pub fn parse_host_port(value: &str) -> Result<Self, ClientError> {
        let (host, port) = value
            .rsplit_once(':')
            .ok_or_else(|| ClientError::InvalidPort(value.to_string()))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() || (host.contains(':') && !value.starts_with('[')) {
            return Err(ClientError::InvalidPort(value.to_string()));
        }
        Ok(Endpoint::network(host, parse_port(port)?))
    }

    /// Returns `true` for the TCP variant.
    pub fn is_network(&self) -> bool {
        matches!(self, Endpoint::Network { .. })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local { path } => write!(f, "unix:{}", path.display()),
            Endpoint::Network { host, port } if host.contains(':') => {
                write!(f, "[{}]:{}", host, port)
            }
            Endpoint::Network { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// A fully validated call: where to connect and what to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub endpoint: Endpoint,
    pub command: Command,
}

/// Validate positional arguments of the standalone tool.
///
/// Accepted shapes are `[path, command]` and `[ipv4, port, command]`.
/// Anything else fails before a socket is created.
pub fn parse_invocation<S: AsRef<str>>(args: &[S]) -> Result<Invocation, ClientError> {
    let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
    match args.as_slice() {
        [address, command] => {
            if is_ipv4_literal(address) {
                return Err(ClientError::InvalidParameterCount {
                    got: 2,
                    expected: "3 (host, port, command) for an IPv4 address",
                });
            }
            Ok(Invocation {
                endpoint: Endpoint::local(*address)?,
                command: Command::new(*command),
            })
        }
        [address, port, command] => {
            if !is_ipv4_literal(address) {
                return Err(ClientError::InvalidParameterCount {
                    got: 3,
                    expected: "2 (path, command) for a socket path",
                });
            }
            Ok(Invocation {
                endpoint: Endpoint::network(*address, parse_port(port)?),
                command: Command::new(*command),
            })
        }
        _ => Err(ClientError::InvalidParameterCount {
            got: args.len(),
            expected: "2 or 3",
        }),
    }
}

/// Returns `true` if `address` is a dotted-decimal IPv4 literal.
pub fn is_ipv4_literal(address: &str) -> bool {
    address.parse::<Ipv4Addr>().is_ok()
}

/// Parse a TCP port argument. Zero is not connectable and is rejected.
pub fn parse_port(value: &str) -> Result<u16, ClientError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ClientError::InvalidPort(value.to_string())),
    }
}

pub(crate) fn check_path_len(path: &Path) -> Result<(), ClientError> {
    let len = path.as_os_str().len();
    if len > MAX_SOCKET_PATH_LEN {
        return Err(ClientError::AddressTooLong {
            len,
            max: MAX_SOCKET_PATH_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_selects_network() {
        for addr in ["127.0.0.1", "192.168.1.100", "0.0.0.0", "255.255.255.255"] {
            let endpoint = Endpoint::from_address(addr, Some("9999")).unwrap();
            assert!(endpoint.is_network(), "{} should be network", addr);
        }
    }

    #[test]
    fn test_everything_else_selects_local() {
        for addr in [
            "/run/haproxy/admin.sock",
            "admin.sock",
            "localhost",
            "::1",
            "256.1.1.1",
            "1.2.3",
            "1.2.3.4.5",
            "",
        ] {
            let endpoint = Endpoint::from_address(addr, None).unwrap();
            assert!(!endpoint.is_network(), "{:?} should be local", addr);
        }
    }

    #[test]
    fn test_ipv4_without_port() {
        let err = Endpoint::from_address("10.0.0.1", None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameterCount { .. }));
    }

    #[test]
    fn test_path_with_port() {
        let err = Endpoint::from_address("/run/haproxy/admin.sock", Some("1")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameterCount { .. }));
    }

    #[test]
    fn test_path_length_limit() {
        let ok = "/".repeat(MAX_SOCKET_PATH_LEN);
        assert!(Endpoint::local(ok).is_ok());

        let too_long = "/".repeat(MAX_SOCKET_PATH_LEN + 1);
        let err = Endpoint::local(too_long).unwrap_err();
        assert!(matches!(
            err,
            ClientError::AddressTooLong { len: 108, max: 107 }
        ));
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port("9999").unwrap(), 9999);
        assert_eq!(parse_port(" 80 ").unwrap(), 80);
        for bad in ["", "0", "abc", "65536", "-1"] {
            assert!(
                matches!(parse_port(bad), Err(ClientError::InvalidPort(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_invocation_local() {
        let inv = parse_invocation(&["/run/haproxy/admin.sock", "show stat"]).unwrap();
        assert_eq!(
            inv.endpoint,
            Endpoint::Local {
                path: "/run/haproxy/admin.sock".into()
            }
        );
        assert_eq!(inv.command.as_bytes(), b"show stat\n");
    }

    #[test]
    fn test_invocation_network() {
        let inv = parse_invocation(&["127.0.0.1", "9999", "show info"]).unwrap();
        assert_eq!(inv.endpoint, Endpoint::network("127.0.0.1", 9999));
        assert_eq!(inv.command.as_bytes(), b"show info\n");
    }

    #[test]
    fn test_invocation_bad_counts() {
        let cases: Vec<Vec<&str>> = vec![
            vec![],
            vec!["/run/haproxy/admin.sock"],
            vec!["127.0.0.1", "9999", "show info", "extra"],
            vec!["a", "b", "c", "d", "e"],
        ];
        for args in cases {
            let err = parse_invocation(&args).unwrap_err();
            assert!(
                matches!(err, ClientError::InvalidParameterCount { got, .. } if got == args.len()),
                "{:?}",
                args
            );
        }
    }

    #[test]
    fn test_invocation_shape_mismatch() {
        let err = parse_invocation(&["127.0.0.1", "show info"]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameterCount { got: 2, .. }));

        let err = parse_invocation(&["/run/haproxy/admin.sock", "9999", "show info"]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameterCount { got: 3, .. }));
    }

    #[test]
    fn test_parse_host_port() {
        assert_eq!(
            Endpoint::parse_host_port("10.0.0.1:9999").unwrap(),
            Endpoint::network("10.0.0.1", 9999)
        );
        assert_eq!(
            Endpoint::parse_host_port("lb.internal:9999").unwrap(),
            Endpoint::network("lb.internal", 9999)
        );
        assert_eq!(
            Endpoint::parse_host_port("[::1]:9999").unwrap(),
            Endpoint::network("::1", 9999)
        );
        for bad in ["10.0.0.1", ":9999", "::1:9999", "10.0.0.1:http"] {
            assert!(
                matches!(Endpoint::parse_host_port(bad), Err(ClientError::InvalidPort(_))),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Endpoint::local("/run/haproxy/admin.sock").unwrap().to_string(),
            "unix:/run/haproxy/admin.sock"
        );
        assert_eq!(Endpoint::network("10.0.0.1", 9999).to_string(), "10.0.0.1:9999");
        assert_eq!(Endpoint::network("::1", 9999).to_string(), "[::1]:9999");
    }
}
