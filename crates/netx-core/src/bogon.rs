//! Bogon address detection.
//!
//! A bogon is an address from a private, reserved or otherwise
//! non-globally-routable range. A public name resolving to one is a strong
//! signal that the answer was tampered with.

use ipnetwork::IpNetwork;
use std::net::IpAddr;
use std::sync::LazyLock;

const BOGON_RANGES: [&str; 24] = [
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.0.0.0/24",
    "192.0.2.0/24",
    "192.168.0.0/16",
    "198.18.0.0/15",
    "198.51.100.0/24",
    "203.0.113.0/24",
    "224.0.0.0/4",
    "240.0.0.0/4",
    "255.255.255.255/32",
    "::/128",
    "::1/128",
    "100::/64",
    "2001:2::/48",
    "2001:10::/28",
    "2001:db8::/32",
    "fc00::/7",
    "fe80::/10",
    "ff00::/8",
];

static BOGONS: LazyLock<Vec<IpNetwork>> = LazyLock::new(|| {
    BOGON_RANGES
        .iter()
        .filter_map(|range| range.parse().ok())
        .collect()
});

/// Returns true if the address belongs to a bogon range
#[must_use]
pub fn is_bogon(ip: IpAddr) -> bool {
    let ip = match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        IpAddr::V4(_) => ip,
    };
    BOGONS.iter().any(|net| net.contains(ip))
}

/// Returns true if the string is an IP literal in a bogon range
#[must_use]
pub fn is_bogon_str(address: &str) -> bool {
    address.parse().is_ok_and(is_bogon)
}
