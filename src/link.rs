// Network link collaborator boundary
//
// Bringing the link up (access point, address assignment) happens outside
// this crate; the runtime only ever asks whether the link is connected and
// what address it holds.

use std::net::IpAddr;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

pub trait NetworkLink: Send {
    fn is_connected(&self) -> bool;
    fn address(&self) -> Option<IpAddr>;
}

/// Link on a host whose interface is already up: connected from
/// construction, reporting the configured bind address.
pub struct HostLink {
    address: IpAddr,
}

impl HostLink {
    pub fn new(address: IpAddr) -> Self {
        Self { address }
    }
}

impl NetworkLink for HostLink {
    fn is_connected(&self) -> bool {
        true
    }

    fn address(&self) -> Option<IpAddr> {
        Some(self.address)
    }
}

/// Block until the link reports connected, polling once per interval.
/// An absent link is a wait, not an error; startup cannot proceed without it.
pub async fn wait_for_link(link: &dyn NetworkLink, interval: Duration) {
    while !link.is_connected() {
        info!("Waiting for network link...");
        sleep(interval).await;
    }
    match link.address() {
        Some(address) => info!("Network link up, address {}", address),
        None => info!("Network link up, no address reported"),
    }
}
