//! Fingerprint doorbell controller.
//!
//! This crate drives an optical fingerprint sensor through the
//! [`SensorLink`](fingerbell_hardware::SensorLink) contract:
//!
//! - [`TemplateRegistry`] - persistent slot id → name map
//! - [`Scanner`] - rate-limited capture → convert → search loop with
//!   edge-triggered identification and doorbell events
//! - [`enrollment`] - five-pass template enrollment with bounded waits
//! - [`PairingProtocol`] - detects sensor replacement through a secret kept
//!   both on the sensor and locally
//! - [`FingerprintController`] - the surface the host drives
//!
//! Results reach the host as [`Observation`]s published to an
//! [`ObservationSink`] whenever a value changes.

pub mod config;
pub mod controller;
pub mod enrollment;
pub mod error;
mod indicator;
pub mod observation;
pub mod pairing;
pub mod registry;
pub mod scanner;
pub mod session;

pub use config::{CooldownMode, EngineConfig};
pub use controller::FingerprintController;
pub use error::{EnrollError, Error, PairingError, Result, WaitTarget};
pub use observation::{
    Observation, ObservationSink, Observations, Publisher, RecordingSink, Severity, TracingSink,
};
pub use pairing::{
    DeviceIdentity, EntropySource, PairingProtocol, PairingStatus, SystemEntropy, generate_secret,
};
pub use registry::TemplateRegistry;
pub use scanner::Scanner;
pub use session::{Session, SessionTransition};
