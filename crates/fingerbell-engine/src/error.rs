use std::fmt;

use fingerbell_core::SlotId;
use fingerbell_hardware::SensorError;
use fingerbell_storage::StorageError;
use thiserror::Error;

/// Controller errors for setup and the delete/clear commands.
#[derive(Debug, Error)]
pub enum Error {
    /// The sensor link was not established at setup.
    #[error("Sensor not connected")]
    NotConnected,

    #[error("Invalid template id: {id}")]
    InvalidId { id: i64 },

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] fingerbell_core::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Enroll(#[from] EnrollError),

    #[error(transparent)]
    Pairing(#[from] PairingError),
}

/// Condition an enrollment wait was blocked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    FingerPresent,
    FingerLifted,
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitTarget::FingerPresent => write!(f, "finger placement"),
            WaitTarget::FingerLifted => write!(f, "finger lift"),
        }
    }
}

/// Why an enrollment did not produce a stored template.
#[derive(Debug, Error)]
pub enum EnrollError {
    #[error("Invalid template id: {id}")]
    InvalidId { id: i64 },

    #[error("Sensor not connected")]
    NotConnected,

    #[error("Enrollment already in progress")]
    Busy,

    #[error("Timed out after {after_ms}ms waiting for {waiting_for} on pass {pass}")]
    Timeout {
        waiting_for: WaitTarget,
        pass: u8,
        after_ms: u64,
    },

    #[error("Capture failed on pass {pass}: {source}")]
    Capture {
        pass: u8,
        #[source]
        source: SensorError,
    },

    #[error("Feature extraction failed on pass {pass}: {source}")]
    Convert {
        pass: u8,
        #[source]
        source: SensorError,
    },

    /// The samples did not agree well enough to merge.
    #[error("Enrollment samples did not match")]
    Mismatch,

    #[error("Model creation failed: {source}")]
    Model {
        #[source]
        source: SensorError,
    },

    #[error("Storing template at slot {slot} failed: {source}")]
    Store {
        slot: SlotId,
        #[source]
        source: SensorError,
    },

    /// The template was stored on the sensor but its name was not persisted.
    #[error("Persisting template name failed: {0}")]
    Storage(#[from] StorageError),
}

/// Pairing failures. A detected mismatch is not an error; see
/// [`PairingStatus`](crate::PairingStatus).
#[derive(Debug, Error)]
pub enum PairingError {
    #[error("Sensor not connected")]
    NotConnected,

    /// The secret could not be written to the sensor; prior pairing state is
    /// unchanged.
    #[error("Writing pairing secret to notepad page {page} failed: {source}")]
    WriteFailed {
        page: u8,
        #[source]
        source: SensorError,
    },

    #[error("Pairing secret rejected: {0}")]
    InvalidSecret(#[from] fingerbell_core::Error),

    #[error("Persisting pairing state failed: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_condition() {
        let err = EnrollError::Timeout {
            waiting_for: WaitTarget::FingerLifted,
            pass: 3,
            after_ms: 30_000,
        };
        assert_eq!(
            err.to_string(),
            "Timed out after 30000ms waiting for finger lift on pass 3"
        );
    }

    #[test]
    fn test_enroll_error_converts_into_controller_error() {
        let err: Error = EnrollError::Mismatch.into();
        assert!(matches!(err, Error::Enroll(EnrollError::Mismatch)));
    }
}
