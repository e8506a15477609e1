use std::fmt;

use crate::utils::error::AddressError;

/// Which side of the broker an endpoint serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Publishers connect here and send messages in.
    Intake,
    /// Subscribers connect here and receive relayed messages.
    Distribution,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Intake => f.write_str("intake"),
            Role::Distribution => f.write_str("distribution"),
        }
    }
}

/// A bind address paired with the role it plays.
///
/// The address is kept verbatim until bind time; `Endpoint::parse_address`
/// turns it into something `TcpListener::bind` accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub role: Role,
    pub address: String,
}

impl Endpoint {
    pub fn new(role: Role, address: impl Into<String>) -> Self {
        Self {
            role,
            address: address.into(),
        }
    }

    /// Resolves the configured address into a `host:port` bind target.
    pub fn bind_target(&self) -> Result<String, AddressError> {
        let (host, port) = parse_address(&self.address)?;
        Ok(format_host_port(&host, port))
    }
}

/// Splits `[scheme://]host:port` into host and port.
///
/// `*` as host stands for every interface and becomes `0.0.0.0`. IPv6 hosts
/// are written in brackets (`tcp://[::1]:5555`) and returned without them.
pub fn parse_address(address: &str) -> Result<(String, u16), AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::Empty);
    }

    let rest = match address.split_once("://") {
        Some((scheme, rest)) => {
            let scheme = scheme.to_ascii_lowercase();
            if scheme != "tcp" && scheme != "ws" {
                return Err(AddressError::UnsupportedScheme(scheme));
            }
            rest
        }
        None => address,
    };
    let rest = rest.trim_end_matches('/');

    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| AddressError::MissingPort(address.to_string()))?;

    if port.is_empty() {
        return Err(AddressError::MissingPort(address.to_string()));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| AddressError::InvalidPort(port.to_string()))?;

    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = match host {
        "" => return Err(AddressError::MissingHost(address.to_string())),
        "*" => "0.0.0.0",
        h => h,
    };

    Ok((host.to_string(), port))
}

/// Turns a broker address into a `ws://` URL a client can connect to.
///
/// The wildcard host is not connectable, so it maps to the loopback address.
pub fn connect_url(address: &str) -> Result<String, AddressError> {
    let (host, port) = parse_address(address)?;
    let host = if host == "0.0.0.0" { "127.0.0.1" } else { &host };
    Ok(format!("ws://{}", format_host_port(host, port)))
}

fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}
