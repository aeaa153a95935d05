//! Best-effort host introspection.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// Discover a routable local IPv4 address, falling back to loopback.
///
/// Connecting a UDP socket performs no I/O; it only asks the OS which
/// interface would route toward the target, so this works without any
/// traffic actually leaving the host.
#[must_use]
pub fn local_ip4() -> IpAddr {
    let fallback = IpAddr::V4(Ipv4Addr::LOCALHOST);
    let Ok(socket) = UdpSocket::bind(("0.0.0.0", 0)) else {
        return fallback;
    };
    if socket.connect(("8.8.8.8", 53)).is_err() {
        return fallback;
    }
    socket.local_addr().map_or(fallback, |addr| addr.ip())
}

/// The current OS user, if the `USER` environment variable is set.
#[must_use]
pub fn current_user() -> Option<String> {
    non_empty_env("USER")
}

/// The local hostname, if the `HOSTNAME` environment variable is set.
#[must_use]
pub fn local_hostname() -> Option<String> {
    non_empty_env("HOSTNAME")
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_ip4_is_ipv4() {
        assert!(matches!(local_ip4(), IpAddr::V4(_)));
    }

    #[test]
    fn absent_env_is_none() {
        assert_eq!(non_empty_env("FLOTILLA_TEST_UNSET_VARIABLE"), None);
    }
}
