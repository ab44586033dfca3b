// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transfer Session Entity
//!
//! The state machine governing one client-initiated upload or download
//! (§3). Unlike the value objects it owns, a `TransferSession` has identity
//! (its [`TransferId`]) and a well-defined lifecycle.
//!
//! ```text
//! idle -> initializing -> transferring <-> paused
//!                              |
//!                              v
//!                          verifying -> completing -> completed
//!                              \            \
//!                               \            -> failed
//!                                -> failed
//! (any non-terminal state) -> cancelled
//! ```

use crate::errors::TransferError;
use crate::value_objects::transfer_id::TransferId;

/// Lifecycle states of a transfer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Initializing,
    Transferring,
    Paused,
    Verifying,
    Completing,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Terminal states never transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One upload or download transfer and its lifecycle state.
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub id: TransferId,
    state: SessionState,
}

impl TransferSession {
    /// Creates a new session in the `idle` state.
    pub fn new(id: TransferId) -> Self {
        Self {
            id,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Attempts the transition to `to`, enforcing the state diagram above.
    /// A session may move to `Cancelled` from any non-terminal state; every
    /// other transition must follow an explicit edge.
    pub fn transition(&mut self, to: SessionState) -> Result<(), TransferError> {
        use SessionState::*;

        if self.state.is_terminal() {
            return Err(TransferError::TransferInProgress);
        }

        let allowed = match (self.state, to) {
            (_, Cancelled) => true,
            (Idle, Initializing) => true,
            (Initializing, Transferring) => true,
            (Initializing, Failed) => true,
            (Transferring, Paused) => true,
            (Paused, Transferring) => true,
            (Transferring, Verifying) => true,
            (Transferring, Failed) => true,
            (Verifying, Completing) => true,
            (Verifying, Failed) => true,
            (Completing, Completed) => true,
            (Completing, Failed) => true,
            _ => false,
        };

        if !allowed {
            return Err(TransferError::TransferInitFailed(format!(
                "illegal transition {:?} -> {:?}",
                self.state, to
            )));
        }

        self.state = to;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn happy_path_upload() {
        let mut session = TransferSession::new(TransferId::generate());
        session.transition(Initializing).unwrap();
        session.transition(Transferring).unwrap();
        session.transition(Verifying).unwrap();
        session.transition(Completing).unwrap();
        session.transition(Completed).unwrap();
        assert!(session.is_terminal());
    }

    #[test]
    fn pause_and_resume() {
        let mut session = TransferSession::new(TransferId::generate());
        session.transition(Initializing).unwrap();
        session.transition(Transferring).unwrap();
        session.transition(Paused).unwrap();
        session.transition(Transferring).unwrap();
        assert_eq!(session.state(), Transferring);
    }

    #[test]
    fn cancel_from_any_non_terminal_state() {
        let mut session = TransferSession::new(TransferId::generate());
        session.transition(Cancelled).unwrap();
        assert!(session.is_terminal());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut session = TransferSession::new(TransferId::generate());
        session.transition(Cancelled).unwrap();
        assert!(session.transition(Transferring).is_err());
    }

    #[test]
    fn rejects_illegal_jump() {
        let mut session = TransferSession::new(TransferId::generate());
        assert!(session.transition(Verifying).is_err());
    }
}
