//! # Network interface address lookup.
//!
//! Throughput workers bind to the address of a named interface. The lookup goes
//! through [`if_addrs`]; an interface without an address of the requested family
//! is a construction-time [`WorkerError::AddressNotFound`].

use std::{fmt, net::IpAddr};

use crate::error::WorkerError;

/// IP address family filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
    /// Either family; IPv6 addresses are listed first.
    Any,
}

impl AddressFamily {
    fn matches(self, ip: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => ip.is_ipv4(),
            AddressFamily::V6 => ip.is_ipv6(),
            AddressFamily::Any => true,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
            AddressFamily::Any => "IP",
        })
    }
}

/// Returns the addresses bound to `interface` that belong to `family`.
///
/// Fails with [`WorkerError::AddressNotFound`] if there are none (including when
/// the interface does not exist).
pub fn ip_addresses(interface: &str, family: AddressFamily) -> Result<Vec<IpAddr>, WorkerError> {
    let ifaces = if_addrs::get_if_addrs().map_err(WorkerError::Interfaces)?;
    select_addresses(
        ifaces.iter().map(|i| (i.name.as_str(), i.ip())),
        interface,
        family,
    )
}

/// Returns the first IPv4 address of `interface`.
pub fn ipv4_address(interface: &str) -> Result<IpAddr, WorkerError> {
    ip_addresses(interface, AddressFamily::V4).map(|mut v| v.remove(0))
}

fn select_addresses<'a>(
    ifaces: impl IntoIterator<Item = (&'a str, IpAddr)>,
    interface: &str,
    family: AddressFamily,
) -> Result<Vec<IpAddr>, WorkerError> {
    let mut found: Vec<IpAddr> = ifaces
        .into_iter()
        .filter(|(name, ip)| *name == interface && family.matches(ip))
        .map(|(_, ip)| ip)
        .collect();

    if found.is_empty() {
        return Err(WorkerError::AddressNotFound {
            interface: interface.to_string(),
            family,
        });
    }
    // v6 before v4, stable within a family
    found.sort_by_key(|ip| ip.is_ipv4());
    Ok(found)
}
