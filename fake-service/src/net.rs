//! Host network addresses.

use std::net::IpAddr;
use sysinfo::Networks;

/// Addresses of every network interface on this host, loopback excluded.
///
/// Sorted and deduplicated so responses are stable between requests.
pub fn local_ip_addresses() -> Vec<String> {
    let networks = Networks::new_with_refreshed_list();
    let mut addresses: Vec<IpAddr> = networks
        .list()
        .values()
        .flat_map(|data| data.ip_networks())
        .map(|network| network.addr)
        .filter(|addr| !addr.is_loopback())
        .collect();
    addresses.sort();
    addresses.dedup();

    tracing::debug!(count = addresses.len(), "Collected interface addresses");
    addresses.iter().map(IpAddr::to_string).collect()
}
