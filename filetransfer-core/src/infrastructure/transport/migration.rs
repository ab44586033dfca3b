// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Connection Migration (§4.J)
//!
//! Tracks a QUIC connection's active and previously-validated network
//! paths, deciding when a detected path change warrants migrating. Ported
//! from `original_source/include/.../transport/connection_migration.h`'s
//! `migration_state`/`migration_config`/`network_path` trio; kept
//! independent of a live socket so it is unit-testable, matching that
//! header's own separation between migration bookkeeping and the QUIC
//! transport that drives it.

use filetransfer_domain::value_objects::NetworkPath;

/// Lifecycle of one migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    Idle,
    Detecting,
    Probing,
    Validating,
    Migrating,
    Completed,
    Failed,
}

impl MigrationState {
    fn allowed(self, to: Self) -> bool {
        use MigrationState::*;
        matches!(
            (self, to),
            (Idle, Detecting)
                | (Detecting, Probing)
                | (Detecting, Failed)
                | (Probing, Validating)
                | (Probing, Failed)
                | (Validating, Migrating)
                | (Validating, Failed)
                | (Migrating, Completed)
                | (Migrating, Failed)
                | (Completed, Idle)
                | (Failed, Idle)
        )
    }
}

/// Tunables for path probing and migration, defaulting to the values in
/// `connection_migration.h`'s `migration_config`.
#[derive(Debug, Clone, Copy)]
pub struct MigrationConfig {
    pub auto_migrate: bool,
    pub enable_path_probing: bool,
    pub probe_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub max_probe_retries: u32,
    pub validation_timeout_ms: u64,
    pub enable_fallback: bool,
    pub min_rtt_improvement_percent: f64,
    pub detection_interval_ms: u64,
    pub keep_previous_paths: bool,
    pub max_previous_paths: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            auto_migrate: true,
            enable_path_probing: true,
            probe_interval_ms: 1000,
            probe_timeout_ms: 5000,
            max_probe_retries: 3,
            validation_timeout_ms: 10_000,
            enable_fallback: true,
            min_rtt_improvement_percent: 20.0,
            detection_interval_ms: 500,
            keep_previous_paths: true,
            max_previous_paths: 3,
        }
    }
}

/// Tracks the active path and an MRU-bounded history of previous ones,
/// deciding whether a newly probed path is worth migrating to.
pub struct MigrationManager {
    config: MigrationConfig,
    state: MigrationState,
    active_path: Option<NetworkPath>,
    previous_paths: Vec<NetworkPath>,
}

impl MigrationManager {
    pub fn new(config: MigrationConfig) -> Self {
        Self { config, state: MigrationState::Idle, active_path: None, previous_paths: Vec::new() }
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    pub fn active_path(&self) -> Option<&NetworkPath> {
        self.active_path.as_ref()
    }

    fn transition(&mut self, to: MigrationState) -> Result<(), String> {
        if !self.state.allowed(to) {
            return Err(format!("illegal migration transition {:?} -> {:?}", self.state, to));
        }
        self.state = to;
        Ok(())
    }

    /// Sets the initial path for a fresh connection. Only valid from
    /// `Idle`/`Completed`/`Failed`, since an active migration owns the
    /// path until it resolves.
    pub fn set_active_path(&mut self, path: NetworkPath) {
        self.active_path = Some(path);
    }

    /// A network change was observed (e.g. a NAT rebind or interface
    /// switch); begins the detect -> probe -> validate -> migrate pipeline.
    pub fn on_network_change_detected(&mut self) -> Result<(), String> {
        self.transition(MigrationState::Detecting)
    }

    pub fn on_probe_started(&mut self) -> Result<(), String> {
        self.transition(MigrationState::Probing)
    }

    /// A probe of `candidate` succeeded with round-trip time `rtt_ms`.
    /// Migration proceeds only if `min_rtt_improvement_percent` is met
    /// against the current active path's RTT (when known), per
    /// `connection_migration.h`'s fallback-avoidance rule.
    pub fn on_probe_succeeded(&mut self, candidate: NetworkPath, rtt_ms: f64) -> Result<bool, String> {
        self.transition(MigrationState::Validating)?;

        let worth_migrating = match self.active_path.as_ref().and_then(|p| p.rtt) {
            Some(current_rtt) if current_rtt.as_secs_f64() > 0.0 => {
                let current_ms = current_rtt.as_secs_f64() * 1000.0;
                let improvement = (current_ms - rtt_ms) / current_ms * 100.0;
                improvement >= self.config.min_rtt_improvement_percent
            }
            _ => true,
        };

        if !worth_migrating {
            self.transition(MigrationState::Failed)?;
            self.transition(MigrationState::Idle)?;
            return Ok(false);
        }

        self.transition(MigrationState::Migrating)?;
        self.commit_migration(candidate);
        self.transition(MigrationState::Completed)?;
        self.transition(MigrationState::Idle)?;
        Ok(true)
    }

    pub fn on_probe_failed(&mut self) -> Result<(), String> {
        self.transition(MigrationState::Failed)?;
        self.transition(MigrationState::Idle)
    }

    fn commit_migration(&mut self, new_path: NetworkPath) {
        if let Some(old_path) = self.active_path.take() {
            if self.config.keep_previous_paths {
                self.previous_paths.insert(0, old_path);
                self.previous_paths.truncate(self.config.max_previous_paths);
            }
        }
        self.active_path = Some(new_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::time::Duration;

    fn path(port: u16) -> NetworkPath {
        NetworkPath::new("10.0.0.1".parse::<IpAddr>().unwrap(), port, "10.0.0.9".parse::<IpAddr>().unwrap(), 443)
    }

    #[test]
    fn default_matches_original_migration_config() {
        let config = MigrationConfig::default();
        assert_eq!(config.probe_interval_ms, 1000);
        assert_eq!(config.probe_timeout_ms, 5000);
        assert_eq!(config.max_probe_retries, 3);
        assert_eq!(config.validation_timeout_ms, 10_000);
        assert_eq!(config.detection_interval_ms, 500);
        assert_eq!(config.max_previous_paths, 3);
        assert!((config.min_rtt_improvement_percent - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn migrates_when_no_active_rtt_is_known() {
        let mut manager = MigrationManager::new(MigrationConfig::default());
        manager.set_active_path(path(1000));

        manager.on_network_change_detected().unwrap();
        manager.on_probe_started().unwrap();
        let migrated = manager.on_probe_succeeded(path(2000), 15.0).unwrap();

        assert!(migrated);
        assert_eq!(manager.state(), MigrationState::Idle);
        assert_eq!(manager.active_path().unwrap().local_port, 2000);
    }

    #[test]
    fn rejects_migration_below_rtt_improvement_threshold() {
        let mut manager = MigrationManager::new(MigrationConfig::default());
        let mut current = path(1000);
        current.rtt = Some(Duration::from_millis(100));
        manager.set_active_path(current);

        manager.on_network_change_detected().unwrap();
        manager.on_probe_started().unwrap();
        // Only a 10% improvement, below the 20% floor.
        let migrated = manager.on_probe_succeeded(path(2000), 90.0).unwrap();

        assert!(!migrated);
        assert_eq!(manager.active_path().unwrap().local_port, 1000);
    }

    #[test]
    fn accepts_migration_meeting_rtt_improvement_threshold() {
        let mut manager = MigrationManager::new(MigrationConfig::default());
        let mut current = path(1000);
        current.rtt = Some(Duration::from_millis(100));
        manager.set_active_path(current);

        manager.on_network_change_detected().unwrap();
        manager.on_probe_started().unwrap();
        // A 50% improvement, comfortably above the 20% floor.
        let migrated = manager.on_probe_succeeded(path(2000), 50.0).unwrap();

        assert!(migrated);
        assert_eq!(manager.active_path().unwrap().local_port, 2000);
    }

    #[test]
    fn keeps_bounded_previous_path_history() {
        let mut manager = MigrationManager::new(MigrationConfig::default());
        manager.set_active_path(path(0));

        for port in 1..=5 {
            manager.on_network_change_detected().unwrap();
            manager.on_probe_started().unwrap();
            manager.on_probe_succeeded(path(port), 1.0).unwrap();
        }

        assert!(manager.previous_paths.len() <= manager.config.max_previous_paths);
    }

    #[test]
    fn failed_probe_returns_to_idle() {
        let mut manager = MigrationManager::new(MigrationConfig::default());
        manager.set_active_path(path(0));

        manager.on_network_change_detected().unwrap();
        manager.on_probe_started().unwrap();
        manager.on_probe_failed().unwrap();

        assert_eq!(manager.state(), MigrationState::Idle);
        assert_eq!(manager.active_path().unwrap().local_port, 0);
    }
}
