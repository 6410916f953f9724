//! Host-facing observations.
//!
//! The controller reports everything the host needs through a small set of
//! observations (matched id/name/confidence, enrolled count, status text,
//! doorbell flag, pairing flag and warning). Each one is published only when
//! its value changes; [`Observations`] holds the last published values.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fingerbell_core::MatchResult;
use fingerbell_core::constants::NO_MATCH_ID;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Severity attached to a pairing warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    /// Possible sensor substitution; never cleared except by re-pairing.
    Critical,
}

/// One published value change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Observation {
    /// Matched slot, `-1` when none.
    MatchedId(i32),
    /// Matched name, empty when none.
    MatchedName(String),
    /// Match confidence, 0 when none.
    Confidence(u16),
    EnrolledCount(u16),
    Status(String),
    /// Doorbell flag.
    Ring(bool),
    PairingValid(bool),
    /// Pairing warning text, empty when healthy.
    PairingWarning { text: String, severity: Severity },
}

/// Receiver of published observations.
pub trait ObservationSink {
    fn publish(&mut self, observation: &Observation);
}

/// Last published value of every observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observations {
    pub matched_id: i32,
    pub matched_name: String,
    pub confidence: u16,
    pub enrolled_count: u16,
    pub status: String,
    pub ring: bool,
    pub pairing_valid: bool,
    pub pairing_warning: String,
    pub warning_severity: Severity,
}

impl Default for Observations {
    fn default() -> Self {
        Self {
            matched_id: NO_MATCH_ID,
            matched_name: String::new(),
            confidence: 0,
            enrolled_count: 0,
            status: String::new(),
            ring: false,
            pairing_valid: false,
            pairing_warning: String::new(),
            warning_severity: Severity::Info,
        }
    }
}

impl Observations {
    /// Apply an observation. Returns `false` if it changes nothing.
    fn apply(&mut self, observation: &Observation) -> bool {
        fn set<T: PartialEq + Clone>(slot: &mut T, value: &T) -> bool {
            if slot == value {
                return false;
            }
            *slot = value.clone();
            true
        }

        match observation {
            Observation::MatchedId(id) => set(&mut self.matched_id, id),
            Observation::MatchedName(name) => set(&mut self.matched_name, name),
            Observation::Confidence(confidence) => set(&mut self.confidence, confidence),
            Observation::EnrolledCount(count) => set(&mut self.enrolled_count, count),
            Observation::Status(status) => set(&mut self.status, status),
            Observation::Ring(ring) => set(&mut self.ring, ring),
            Observation::PairingValid(valid) => set(&mut self.pairing_valid, valid),
            Observation::PairingWarning { text, severity } => {
                let text_changed = set(&mut self.pairing_warning, text);
                let severity_changed = set(&mut self.warning_severity, severity);
                text_changed || severity_changed
            }
        }
    }
}

/// Change-filtering front end to an [`ObservationSink`].
#[derive(Debug)]
pub struct Publisher<S> {
    sink: S,
    snapshot: Observations,
}

impl<S: ObservationSink> Publisher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            snapshot: Observations::default(),
        }
    }

    pub fn snapshot(&self) -> &Observations {
        &self.snapshot
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Forward `observation` if it changes the snapshot.
    pub fn publish(&mut self, observation: Observation) {
        if self.snapshot.apply(&observation) {
            self.sink.publish(&observation);
        }
    }

    pub fn status(&mut self, text: impl Into<String>) {
        self.publish(Observation::Status(text.into()));
    }

    pub fn enrolled_count(&mut self, count: u16) {
        self.publish(Observation::EnrolledCount(count));
    }

    /// Publish the id, name, confidence and ring fields of a scan outcome.
    pub fn match_result(&mut self, result: &MatchResult) {
        self.publish(Observation::MatchedId(result.id()));
        self.publish(Observation::MatchedName(result.name.clone()));
        self.publish(Observation::Confidence(result.confidence));
        self.publish(Observation::Ring(result.ring));
    }

    pub fn pairing_valid(&mut self, valid: bool) {
        self.publish(Observation::PairingValid(valid));
    }

    pub fn pairing_warning(&mut self, text: impl Into<String>, severity: Severity) {
        self.publish(Observation::PairingWarning {
            text: text.into(),
            severity,
        });
    }

    pub fn clear_pairing_warning(&mut self) {
        self.pairing_warning(String::new(), Severity::Info);
    }
}

/// Sink that keeps every observation; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&self) -> MutexGuard<'_, Vec<Observation>> {
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.buffer().clone()
    }

    /// Status texts in publication order.
    pub fn statuses(&self) -> Vec<String> {
        self.buffer()
            .iter()
            .filter_map(|observation| match observation {
                Observation::Status(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Observation) -> bool) -> usize {
        self.buffer().iter().filter(|o| predicate(o)).count()
    }

    pub fn clear(&self) {
        self.buffer().clear();
    }
}

impl ObservationSink for RecordingSink {
    fn publish(&mut self, observation: &Observation) {
        self.buffer().push(observation.clone());
    }
}

/// Sink that writes observations to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ObservationSink for TracingSink {
    fn publish(&mut self, observation: &Observation) {
        match observation {
            Observation::PairingWarning {
                text,
                severity: Severity::Critical,
            } => error!(warning = %text, "Pairing alert"),
            Observation::PairingWarning {
                text,
                severity: Severity::Warning,
            } => warn!(warning = %text, "Pairing warning"),
            Observation::Status(text) => info!(status = %text, "Status"),
            other => info!(?other, "Observation"),
        }
    }
}

impl<A: ObservationSink, B: ObservationSink> ObservationSink for (A, B) {
    fn publish(&mut self, observation: &Observation) {
        self.0.publish(observation);
        self.1.publish(observation);
    }
}
