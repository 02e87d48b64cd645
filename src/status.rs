// Status snapshot assembly

use std::time::Instant;

use crate::link::NetworkLink;
use crate::messages::StatusSnapshot;
use crate::motor::ActuatorState;

pub struct StatusReporter {
    started_at: Instant,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    pub fn snapshot(&self, link: &dyn NetworkLink, actuator: ActuatorState) -> StatusSnapshot {
        StatusSnapshot {
            status: "ok",
            link_connected: link.is_connected(),
            ip_address: link.address().map(|a| a.to_string()),
            motors_enabled: actuator.motors_enabled,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            free_memory_bytes: free_memory_estimate(),
        }
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// `MemAvailable` from /proc/meminfo, in bytes. Zero when unreadable.
fn free_memory_estimate() -> u64 {
    let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
        return 0;
    };
    for line in meminfo.lines() {
        if let Some(rest) = line.strip_prefix("MemAvailable:") {
            if let Some(kib) = rest
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<u64>().ok())
            {
                return kib * 1024;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::HostLink;

    #[test]
    fn snapshot_reflects_link_and_actuator() {
        let link = HostLink::new("10.0.0.7".parse().unwrap());
        let reporter = StatusReporter::new();
        let snapshot = reporter.snapshot(
            &link,
            ActuatorState {
                left_speed: 0,
                right_speed: 0,
                motors_enabled: true,
            },
        );

        assert_eq!(snapshot.status, "ok");
        assert!(snapshot.link_connected);
        assert_eq!(snapshot.ip_address.as_deref(), Some("10.0.0.7"));
        assert!(snapshot.motors_enabled);
    }

    #[test]
    fn free_memory_estimate_does_not_panic() {
        // Value depends on the host; only the shape is checked.
        let _ = free_memory_estimate();
    }
}
