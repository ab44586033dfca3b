// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Session Ticket Stores (§4.J)
//!
//! Two implementations of [`SessionTicketStore`], ported from
//! `original_source/include/.../transport/session_resumption.h`'s
//! `memory_session_store` and `file_session_store`: an in-memory store
//! good for a single process lifetime, and a file-backed store that
//! persists tickets to disk as JSON so 0-RTT resumption survives a
//! client restart.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Utc};

use filetransfer_domain::errors::TransferError;
use filetransfer_domain::repositories::SessionTicketStore;
use filetransfer_domain::value_objects::SessionTicket;

struct Store {
    tickets: HashMap<String, SessionTicket>,
    /// Insertion order, for FIFO eviction once `max_tickets` is reached —
    /// mirrors `memory_session_store`'s simplest-possible eviction policy.
    order: Vec<String>,
}

/// An in-process, non-persistent session ticket store.
pub struct InMemorySessionTicketStore {
    max_tickets: usize,
    inner: Mutex<Store>,
}

impl InMemorySessionTicketStore {
    pub fn new(max_tickets: usize) -> Self {
        Self {
            max_tickets,
            inner: Mutex::new(Store { tickets: HashMap::new(), order: Vec::new() }),
        }
    }
}

impl Default for InMemorySessionTicketStore {
    fn default() -> Self {
        Self::new(filetransfer_domain::repositories::DEFAULT_MAX_TICKETS)
    }
}

impl SessionTicketStore for InMemorySessionTicketStore {
    fn store(&self, ticket: SessionTicket) -> Result<(), TransferError> {
        let mut store = self.inner.lock().unwrap();
        if !store.tickets.contains_key(&ticket.server_id) {
            if store.order.len() >= self.max_tickets {
                if let Some(oldest) = store.order.first().cloned() {
                    store.order.remove(0);
                    store.tickets.remove(&oldest);
                }
            }
            store.order.push(ticket.server_id.clone());
        }
        store.tickets.insert(ticket.server_id.clone(), ticket);
        Ok(())
    }

    fn retrieve(&self, server_id: &str, min_remaining_lifetime: Duration) -> Option<SessionTicket> {
        let store = self.inner.lock().unwrap();
        let ticket = store.tickets.get(server_id)?;
        let cutoff = Utc::now() + min_remaining_lifetime;
        if ticket.is_valid(cutoff) {
            Some(ticket.clone())
        } else {
            None
        }
    }

    fn evict(&self, server_id: &str) {
        let mut store = self.inner.lock().unwrap();
        store.tickets.remove(server_id);
        store.order.retain(|id| id != server_id);
    }

    fn max_tickets(&self) -> usize {
        self.max_tickets
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap().tickets.len()
    }
}

/// A session ticket store that persists its contents to a JSON file,
/// wrapping an [`InMemorySessionTicketStore`] as its in-process cache and
/// flushing to disk on every mutation via write-temp-then-rename (§6).
pub struct FileSessionTicketStore {
    memory: InMemorySessionTicketStore,
    path: PathBuf,
}

impl FileSessionTicketStore {
    /// Loads any tickets already persisted at `path`, or starts empty if
    /// the file does not exist or fails to parse.
    pub fn open(path: impl Into<PathBuf>, max_tickets: usize) -> Self {
        let path = path.into();
        let memory = InMemorySessionTicketStore::new(max_tickets);
        if let Ok(contents) = fs::read_to_string(&path) {
            if let Ok(tickets) = serde_json::from_str::<Vec<SessionTicket>>(&contents) {
                for ticket in tickets {
                    let _ = memory.store(ticket);
                }
            }
        }
        Self { memory, path }
    }

    fn persist(&self) -> Result<(), TransferError> {
        let tickets: Vec<SessionTicket> = {
            let store = self.memory.inner.lock().unwrap();
            store.order.iter().filter_map(|id| store.tickets.get(id).cloned()).collect()
        };
        let json = serde_json::to_vec_pretty(&tickets).map_err(|e| TransferError::ConfigInvalid(e.to_string()))?;
        write_atomic(&self.path, &json)
    }
}

impl SessionTicketStore for FileSessionTicketStore {
    fn store(&self, ticket: SessionTicket) -> Result<(), TransferError> {
        self.memory.store(ticket)?;
        self.persist()
    }

    fn retrieve(&self, server_id: &str, min_remaining_lifetime: Duration) -> Option<SessionTicket> {
        self.memory.retrieve(server_id, min_remaining_lifetime)
    }

    fn evict(&self, server_id: &str) {
        self.memory.evict(server_id);
        let _ = self.persist();
    }

    fn max_tickets(&self) -> usize {
        self.memory.max_tickets()
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}

/// Writes `bytes` to `path` via a sibling temp file plus rename, so a
/// crash mid-write never leaves a truncated ticket file behind.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), TransferError> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = fs::File::create(&tmp_path)?;
        tmp.write_all(bytes)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(server_id: &str, expires_in: Duration) -> SessionTicket {
        let now = Utc::now();
        SessionTicket {
            server_id: server_id.to_string(),
            ticket_data: vec![1, 2, 3, 4],
            issued_at: now,
            expires_at: now + expires_in,
            max_early_data_size: 16384,
            alpn_protocol: "ft/1".to_string(),
            server_name: server_id.to_string(),
        }
    }

    #[test]
    fn stores_and_retrieves_a_valid_ticket() {
        let store = InMemorySessionTicketStore::new(10);
        store.store(sample("a.example.com:443", Duration::hours(1))).unwrap();
        assert!(store.retrieve("a.example.com:443", Duration::seconds(0)).is_some());
    }

    #[test]
    fn retrieve_respects_minimum_remaining_lifetime() {
        let store = InMemorySessionTicketStore::new(10);
        store.store(sample("a.example.com:443", Duration::seconds(30))).unwrap();
        assert!(store.retrieve("a.example.com:443", Duration::minutes(5)).is_none());
        assert!(store.retrieve("a.example.com:443", Duration::seconds(10)).is_some());
    }

    #[test]
    fn evicts_oldest_ticket_once_at_capacity() {
        let store = InMemorySessionTicketStore::new(2);
        store.store(sample("a:443", Duration::hours(1))).unwrap();
        store.store(sample("b:443", Duration::hours(1))).unwrap();
        store.store(sample("c:443", Duration::hours(1))).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.retrieve("a:443", Duration::seconds(0)).is_none());
        assert!(store.retrieve("c:443", Duration::seconds(0)).is_some());
    }

    #[test]
    fn evict_removes_a_specific_server() {
        let store = InMemorySessionTicketStore::new(10);
        store.store(sample("a:443", Duration::hours(1))).unwrap();
        store.evict("a:443");
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.json");

        {
            let store = FileSessionTicketStore::open(&path, 10);
            store.store(sample("a.example.com:443", Duration::hours(1))).unwrap();
        }

        let reopened = FileSessionTicketStore::open(&path, 10);
        assert!(reopened.retrieve("a.example.com:443", Duration::seconds(0)).is_some());
    }
}
