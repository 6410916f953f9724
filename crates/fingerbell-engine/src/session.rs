//! Controller session tracking.
//!
//! Wraps [`SessionState`] with transition validation and a bounded history
//! of recent transitions.
//!
//! # Valid Transitions
//!
//! - Disconnected → Idle (link established)
//! - Idle ↔ Scanning (presentation latched / released)
//! - Idle | Scanning → Enrolling → Idle
//! - any connected state → Disconnected
//!
//! # Examples
//!
//! ```
//! use fingerbell_core::SessionState;
//! use fingerbell_engine::Session;
//!
//! let mut session = Session::new();
//! assert_eq!(session.state(), SessionState::Disconnected);
//!
//! session.transition_to(SessionState::Idle).unwrap();
//! assert!(session.transition_to(SessionState::Idle).is_err());
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use fingerbell_core::{Error, Result, SessionState};
use tokio::time::Instant;

/// Number of transitions kept for diagnostics.
const MAX_HISTORY_SIZE: usize = 32;

/// A single state transition with timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub timestamp: Instant,
}

impl SessionTransition {
    pub fn new(from: SessionState, to: SessionState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }
}

/// Current session state plus recent history.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    entered_at: Instant,
    history: VecDeque<SessionTransition>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session that has not reached the sensor yet.
    pub fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            entered_at: Instant::now(),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn time_in_state(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<SessionTransition> {
        &self.history
    }

    /// Transition to `next`, rejecting moves the state graph does not allow.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] and leaves the state
    /// unchanged if the move is not allowed.
    pub fn transition_to(&mut self, next: SessionState) -> Result<SessionTransition> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }

        let transition = SessionTransition::new(self.state, next);
        self.apply(transition);
        Ok(transition)
    }

    /// Move to `next` only if the current state differs; a same-state
    /// request is a no-op.
    pub fn ensure(&mut self, next: SessionState) -> Result<Option<SessionTransition>> {
        if self.state == next {
            return Ok(None);
        }
        self.transition_to(next).map(Some)
    }

    /// Force the session back to `Idle` regardless of the current state.
    ///
    /// Used for unconditional cleanup after enrollment.
    pub fn reset(&mut self) -> SessionTransition {
        let transition = SessionTransition::new(self.state, SessionState::Idle);
        self.apply(transition);
        transition
    }

    fn apply(&mut self, transition: SessionTransition) {
        self.state = transition.to;
        self.entered_at = transition.timestamp;

        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }
}
