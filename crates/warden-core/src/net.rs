//! Upstream host classification for the domain lock.
//!
//! Only literal IP addresses are classified. Hostnames are never resolved
//! here; DNS-level protection belongs to whatever client performs the
//! upstream call.

use std::net::IpAddr;

use url::{Host, Url};

/// Why an upstream base URL was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRejection {
    /// The URL does not parse.
    Unparsable(String),
    /// The URL has no host component.
    MissingHost,
    /// The host is `localhost` or a `*.localhost` name.
    Localhost(String),
    /// The host is a literal IP in a private, loopback, or otherwise internal range.
    InternalAddress(IpAddr),
}

impl std::fmt::Display for HostRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparsable(e) => write!(f, "base_url does not parse: {e}"),
            Self::MissingHost => write!(f, "base_url has no host"),
            Self::Localhost(host) => write!(f, "host '{host}' is a localhost name"),
            Self::InternalAddress(ip) => write!(f, "host {ip} is an internal address"),
        }
    }
}

/// Whether an IP address is publicly routable.
///
/// Returns `false` for loopback, unspecified, multicast, broadcast, RFC 1918,
/// `0.0.0.0/8`, link-local (`169.254.0.0/16`, `fe80::/10`), CGNAT
/// (`100.64.0.0/10`), unique-local (`fc00::/7`), and IPv4-mapped or
/// IPv4-compatible IPv6 forms of any of these.
#[must_use]
pub fn is_public_ip(ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .or_else(|| v6.to_ipv4())
            .map_or(IpAddr::V6(v6), IpAddr::V4),
        v4 @ IpAddr::V4(_) => v4,
    };

    if ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() {
        return false;
    }

    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            let internal = a == 10
                || a == 0
                || a == 127
                || a == 255
                || (a == 172 && (16..=31).contains(&b))
                || (a == 192 && b == 168)
                || (a == 169 && b == 254)
                || (a == 100 && (64..=127).contains(&b));
            !internal
        },
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            let internal = (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80;
            !internal
        },
    }
}

/// Check that a base URL points at a public host.
///
/// Returns the host as written on success.
///
/// # Errors
///
/// Returns a [`HostRejection`] describing the first problem found.
pub fn check_upstream_host(base_url: &str) -> Result<String, HostRejection> {
    let url = Url::parse(base_url).map_err(|e| HostRejection::Unparsable(e.to_string()))?;

    match url.host() {
        None => Err(HostRejection::MissingHost),
        Some(Host::Domain(domain)) => {
            let lower = domain.trim_end_matches('.').to_ascii_lowercase();
            if lower == "localhost" || lower.ends_with(".localhost") {
                Err(HostRejection::Localhost(domain.to_string()))
            } else {
                Ok(domain.to_string())
            }
        },
        Some(Host::Ipv4(v4)) => {
            let ip = IpAddr::V4(v4);
            if is_public_ip(ip) {
                Ok(v4.to_string())
            } else {
                Err(HostRejection::InternalAddress(ip))
            }
        },
        Some(Host::Ipv6(v6)) => {
            let ip = IpAddr::V6(v6);
            if is_public_ip(ip) {
                Ok(v6.to_string())
            } else {
                Err(HostRejection::InternalAddress(ip))
            }
        },
    }
}
