// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Network Path Value Object
//!
//! One (local, remote) address/port tuple a QUIC connection may run over
//! (§3, §4.J "path migration").

use std::net::IpAddr;
use std::time::{Duration, Instant};

/// A candidate or active network path for a QUIC connection.
#[derive(Debug, Clone)]
pub struct NetworkPath {
    pub local_address: IpAddr,
    pub local_port: u16,
    pub remote_address: IpAddr,
    pub remote_port: u16,
    pub interface_name: Option<String>,
    pub validated: bool,
    pub rtt: Option<Duration>,
    pub created_at: Instant,
}

impl NetworkPath {
    pub fn new(local_address: IpAddr, local_port: u16, remote_address: IpAddr, remote_port: u16) -> Self {
        Self {
            local_address,
            local_port,
            remote_address,
            remote_port,
            interface_name: None,
            validated: false,
            rtt: None,
            created_at: Instant::now(),
        }
    }

    /// Equality is defined by the 4-tuple alone (§3), ignoring validation
    /// state, RTT, or interface name.
    pub fn same_tuple(&self, other: &NetworkPath) -> bool {
        self.local_address == other.local_address
            && self.local_port == other.local_port
            && self.remote_address == other.remote_address
            && self.remote_port == other.remote_port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_validation_and_rtt() {
        let a = NetworkPath::new("10.0.0.1".parse().unwrap(), 1234, "10.0.0.2".parse().unwrap(), 443);
        let mut b = a.clone();
        b.validated = true;
        b.rtt = Some(Duration::from_millis(5));
        assert!(a.same_tuple(&b));
    }

    #[test]
    fn different_local_port_is_a_different_path() {
        let a = NetworkPath::new("10.0.0.1".parse().unwrap(), 1234, "10.0.0.2".parse().unwrap(), 443);
        let b = NetworkPath::new("10.0.0.1".parse().unwrap(), 5678, "10.0.0.2".parse().unwrap(), 443);
        assert!(!a.same_tuple(&b));
    }
}
