// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Session Ticket Value Object
//!
//! An opaque TLS-layer credential enabling QUIC 0-RTT resumption (§3, §4.J).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted 0-RTT session ticket, keyed externally by `server_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTicket {
    /// `"host:port"` of the server this ticket was issued by.
    pub server_id: String,
    /// Opaque bytes produced by the TLS library.
    pub ticket_data: Vec<u8>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub max_early_data_size: u32,
    pub alpn_protocol: String,
    pub server_name: String,
}

impl SessionTicket {
    /// A ticket is valid iff it has not yet expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// 0-RTT is usable iff the ticket is valid and the server granted a
    /// non-zero early-data budget.
    pub fn is_zero_rtt_capable(&self, now: DateTime<Utc>) -> bool {
        self.is_valid(now) && self.max_early_data_size > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(expires_in: Duration, max_early_data: u32) -> SessionTicket {
        let now = Utc::now();
        SessionTicket {
            server_id: "example.com:443".into(),
            ticket_data: vec![1, 2, 3],
            issued_at: now,
            expires_at: now + expires_in,
            max_early_data_size: max_early_data,
            alpn_protocol: "ft/1".into(),
            server_name: "example.com".into(),
        }
    }

    #[test]
    fn expired_ticket_is_invalid() {
        let ticket = sample(Duration::seconds(-1), 16384);
        assert!(!ticket.is_valid(Utc::now()));
    }

    #[test]
    fn zero_rtt_requires_early_data_budget() {
        let ticket = sample(Duration::hours(1), 0);
        assert!(ticket.is_valid(Utc::now()));
        assert!(!ticket.is_zero_rtt_capable(Utc::now()));

        let ticket = sample(Duration::hours(1), 16384);
        assert!(ticket.is_zero_rtt_capable(Utc::now()));
    }
}
