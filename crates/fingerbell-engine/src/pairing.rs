//! Sensor pairing integrity.
//!
//! A random secret is written to a notepad page on the sensor and kept in
//! local storage. Reading it back and comparing proves the attached sensor
//! is the one that was paired; a different or blank page means the sensor
//! was replaced or tampered with.
//!
//! A detected mismatch is persisted immediately and is never cleared by a
//! later matching read. Only [`PairingProtocol::pair`] restores trust.

use std::fmt;
use std::time::Instant;

use fingerbell_core::constants::{
    NOTEPAD_PAGE_SIZE, PAIRING_CODE_KEY, PAIRING_NAMESPACE, PAIRING_SECRET_BYTES,
    PAIRING_VALID_KEY,
};
use fingerbell_core::{PairingRecord, PairingSecret};
use fingerbell_hardware::SensorLink;
use fingerbell_storage::{PreferenceStore, StorageError};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::error::PairingError;
use crate::observation::{ObservationSink, Publisher, Severity};

pub const PAIRING_SUCCESS_TEXT: &str = "Pairing successful";
pub const PAIRING_FAILED_TEXT: &str = "Pairing failed - check sensor connection";
pub const PAIRING_INVALID_TEXT: &str =
    "SECURITY: Pairing invalid! Sensor may have been replaced. Do re-pairing.";
pub const PAIRING_UNREADABLE_TEXT: &str = "Could not read pairing code from sensor";
pub const PAIRING_MISMATCH_TEXT: &str = "SECURITY ALERT: Sensor pairing mismatch! \
    Possible attack or sensor replacement detected. Fingerprint matches will be blocked. \
    If you replaced the sensor, do re-pairing.";

/// Inputs that vary between secret generations.
pub trait EntropySource {
    /// Hardware random value.
    fn random_u32(&mut self) -> u32;

    /// Monotonic timer reading.
    fn uptime_nanos(&self) -> u64;
}

/// OS random number generator plus a process-local monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemEntropy {
    started: Instant,
}

impl Default for SystemEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemEntropy {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl EntropySource for SystemEntropy {
    fn random_u32(&mut self) -> u32 {
        OsRng.next_u32()
    }

    fn uptime_nanos(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Device identity mixed into every secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub network_identity: String,
    pub hardware_address: [u8; 6],
}

/// Derive a fresh pairing secret.
///
/// SHA-256 over a random value, a timer reading, the network identity and
/// the hardware address; the first 16 digest bytes rendered as 32 lowercase
/// hex characters.
pub fn generate_secret<E: EntropySource>(
    entropy: &mut E,
    identity: &DeviceIdentity,
) -> Result<PairingSecret, PairingError> {
    let mut hasher = Sha256::new();
    hasher.update(entropy.random_u32().to_le_bytes());
    hasher.update(entropy.uptime_nanos().to_le_bytes());
    hasher.update(identity.network_identity.as_bytes());
    hasher.update(identity.hardware_address);
    let digest = hasher.finalize();

    let secret = PairingSecret::new(&hex::encode(&digest[..PAIRING_SECRET_BYTES]))?;
    Ok(secret)
}

/// Outcome of [`PairingProtocol::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStatus {
    /// No secret was stored; a first pairing was performed.
    Paired,
    /// The sensor holds the stored secret.
    Valid,
    /// Trust was revoked earlier and has not been re-established.
    PreviouslyInvalidated,
    /// The sensor holds a different secret; trust is now revoked.
    Mismatch,
    /// The sensor could not be read; nothing changed.
    Unreadable,
}

impl PairingStatus {
    /// True if identification results can be trusted.
    pub fn is_trusted(&self) -> bool {
        matches!(self, PairingStatus::Paired | PairingStatus::Valid)
    }
}

impl fmt::Display for PairingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PairingStatus::Paired => "paired",
            PairingStatus::Valid => "valid",
            PairingStatus::PreviouslyInvalidated => "previously invalidated",
            PairingStatus::Mismatch => "mismatch",
            PairingStatus::Unreadable => "unreadable",
        };
        write!(f, "{}", text)
    }
}

/// Pairing state machine over a sensor link and a preference store.
#[derive(Debug, Clone)]
pub struct PairingProtocol {
    record: PairingRecord,
    /// A stored secret exists but could not be parsed.
    corrupt: bool,
    page: u8,
    identity: DeviceIdentity,
}

impl PairingProtocol {
    pub fn new(page: u8, identity: DeviceIdentity) -> Self {
        Self {
            record: PairingRecord::default(),
            corrupt: false,
            page,
            identity,
        }
    }

    pub fn record(&self) -> &PairingRecord {
        &self.record
    }

    /// True while the stored secret is trusted.
    pub fn is_valid(&self) -> bool {
        self.record.valid && !self.corrupt
    }

    /// Load the pairing record from the store.
    ///
    /// A stored secret that is not well formed is treated like an
    /// invalidated pairing rather than as a first boot.
    pub async fn load<P: PreferenceStore>(&mut self, store: &P) -> Result<(), PairingError> {
        let code = store.get(PAIRING_NAMESPACE, PAIRING_CODE_KEY).await?;
        let valid = match store.get_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY).await {
            Ok(valid) => valid.unwrap_or(false),
            Err(StorageError::CorruptValue { value, .. }) => {
                warn!(%value, "Unreadable pairing flag, treating pairing as invalid");
                false
            }
            Err(e) => return Err(e.into()),
        };

        self.corrupt = false;
        self.record = match code.filter(|code| !code.is_empty()) {
            None => PairingRecord::default(),
            Some(code) => match PairingSecret::new(&code) {
                Ok(secret) => PairingRecord {
                    local_secret: Some(secret),
                    valid,
                },
                Err(e) => {
                    error!(error = %e, "Stored pairing code is corrupt");
                    self.corrupt = true;
                    PairingRecord::default()
                }
            },
        };

        debug!(
            paired = !self.record.is_first_boot(),
            valid = self.record.valid,
            "Pairing record loaded"
        );
        Ok(())
    }

    /// Write a new secret to the sensor and adopt it.
    ///
    /// Nothing changes locally unless the sensor acknowledged the write.
    pub async fn pair<L, P, S, E>(
        &mut self,
        link: &mut L,
        store: &P,
        publisher: &mut Publisher<S>,
        entropy: &mut E,
    ) -> Result<(), PairingError>
    where
        L: SensorLink,
        P: PreferenceStore,
        S: ObservationSink,
        E: EntropySource,
    {
        info!("Starting pairing process");

        let secret = generate_secret(entropy, &self.identity)?;
        debug!(secret = %secret.as_str(), "Generated pairing code");

        if let Err(source) = link.write_notepad(self.page, &secret.to_page()).await {
            error!(error = %source, "Pairing failed, could not write to sensor");
            publisher.pairing_warning(PAIRING_FAILED_TEXT, Severity::Warning);
            return Err(PairingError::WriteFailed {
                page: self.page,
                source,
            });
        }

        // The sensor now holds the secret, so it is adopted even if
        // persisting it fails below.
        self.record = PairingRecord::paired(secret.clone());
        self.corrupt = false;
        publisher.pairing_valid(true);
        publisher.pairing_warning(PAIRING_SUCCESS_TEXT, Severity::Info);

        store
            .put(PAIRING_NAMESPACE, PAIRING_CODE_KEY, secret.as_str())
            .await?;
        store
            .put_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY, true)
            .await?;

        info!("Pairing successful");
        Ok(())
    }

    /// Compare the sensor's secret with the stored one.
    pub async fn check<L, P, S, E>(
        &mut self,
        link: &mut L,
        store: &P,
        publisher: &mut Publisher<S>,
        entropy: &mut E,
    ) -> Result<PairingStatus, PairingError>
    where
        L: SensorLink,
        P: PreferenceStore,
        S: ObservationSink,
        E: EntropySource,
    {
        info!("Checking pairing status");

        if self.corrupt || (!self.record.is_first_boot() && !self.record.valid) {
            warn!("Pairing was invalidated previously");
            publisher.pairing_valid(false);
            publisher.pairing_warning(PAIRING_INVALID_TEXT, Severity::Critical);
            return Ok(PairingStatus::PreviouslyInvalidated);
        }

        let Some(local) = self.record.local_secret.clone() else {
            warn!("No stored pairing code, performing initial pairing");
            self.pair(link, store, publisher, entropy).await?;
            return Ok(PairingStatus::Paired);
        };

        let page = match link.read_notepad(self.page).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Could not read pairing code from sensor");
                publisher.pairing_valid(self.is_valid());
                publisher.pairing_warning(PAIRING_UNREADABLE_TEXT, Severity::Warning);
                return Ok(PairingStatus::Unreadable);
            }
        };
        let sensor_code = trim_page(&page);

        if local.matches(sensor_code) {
            info!("Pairing valid, codes match");
            publisher.pairing_valid(true);
            publisher.clear_pairing_warning();
            return Ok(PairingStatus::Valid);
        }

        error!("SECURITY WARNING: Pairing codes don't match");
        debug!(
            expected = %local.as_str(),
            got = %String::from_utf8_lossy(sensor_code),
            "Pairing codes"
        );

        self.record.valid = false;
        let persisted = store
            .put_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY, false)
            .await;
        publisher.pairing_valid(false);
        publisher.pairing_warning(PAIRING_MISMATCH_TEXT, Severity::Critical);

        if let Err(e) = persisted {
            error!(error = %e, "Failed to persist invalidated pairing");
            return Err(e.into());
        }
        Ok(PairingStatus::Mismatch)
    }
}

/// Notepad contents with trailing NUL padding removed.
fn trim_page(page: &[u8; NOTEPAD_PAGE_SIZE]) -> &[u8] {
    let len = page.iter().rposition(|&b| b != 0).map_or(0, |last| last + 1);
    &page[..len]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Observation, RecordingSink};
    use fingerbell_hardware::SensorError;
    use fingerbell_hardware::mock::{MockSensor, Operation};
    use fingerbell_storage::MemoryPreferenceStore;

    /// Entropy with a fixed clock and a counting random source.
    struct CountingEntropy(u32);

    impl EntropySource for CountingEntropy {
        fn random_u32(&mut self) -> u32 {
            self.0 += 1;
            self.0
        }

        fn uptime_nanos(&self) -> u64 {
            0
        }
    }

    fn identity() -> DeviceIdentity {
        DeviceIdentity {
            network_identity: "front-door".to_string(),
            hardware_address: [0x24, 0x6f, 0x28, 0x01, 0x02, 0x03],
        }
    }

    fn protocol() -> PairingProtocol {
        PairingProtocol::new(0, identity())
    }

    #[test]
    fn test_secret_format() {
        let secret = generate_secret(&mut SystemEntropy::new(), &identity()).unwrap();
        assert_eq!(secret.as_str().len(), 32);
        assert!(
            secret
                .as_str()
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_secrets_differ_between_calls() {
        let mut entropy = SystemEntropy::new();
        let first = generate_secret(&mut entropy, &identity()).unwrap();
        let second = generate_secret(&mut entropy, &identity()).unwrap();
        assert_ne!(first, second);

        let mut fixed_clock = CountingEntropy(0);
        let first = generate_secret(&mut fixed_clock, &identity()).unwrap();
        let second = generate_secret(&mut fixed_clock, &identity()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_secret_depends_on_identity() {
        let other = DeviceIdentity {
            network_identity: "back-door".to_string(),
            ..identity()
        };
        let a = generate_secret(&mut CountingEntropy(0), &identity()).unwrap();
        let b = generate_secret(&mut CountingEntropy(0), &other).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_trim_page() {
        let mut page = [0u8; NOTEPAD_PAGE_SIZE];
        assert!(trim_page(&page).is_empty());

        page[..3].copy_from_slice(b"abc");
        assert_eq!(trim_page(&page), b"abc");
    }

    #[tokio::test]
    async fn test_first_check_pairs() {
        let (mut sensor, handle) = MockSensor::new();
        let store = MemoryPreferenceStore::new();
        let sink = RecordingSink::new();
        let mut publisher = Publisher::new(sink.clone());
        let mut pairing = protocol();

        pairing.load(&store).await.unwrap();
        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut SystemEntropy::new())
            .await
            .unwrap();

        assert_eq!(status, PairingStatus::Paired);
        assert!(pairing.is_valid());

        let stored = store
            .get(PAIRING_NAMESPACE, PAIRING_CODE_KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&handle.notepad(0).unwrap()[..], stored.as_bytes());
        assert_eq!(
            store.get_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY).await.unwrap(),
            Some(true)
        );
        assert_eq!(publisher.snapshot().pairing_warning, PAIRING_SUCCESS_TEXT);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_prior_state() {
        let (mut sensor, handle) = MockSensor::new();
        handle.fail_next(Operation::WriteNotepad, SensorError::communication("no ack"));

        let store = MemoryPreferenceStore::new();
        let mut publisher = Publisher::new(RecordingSink::new());
        let mut pairing = protocol();

        let err = pairing
            .pair(&mut sensor, &store, &mut publisher, &mut SystemEntropy::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PairingError::WriteFailed { page: 0, .. }));
        assert!(pairing.record().is_first_boot());
        assert!(store.is_empty());
        assert_eq!(publisher.snapshot().pairing_warning, PAIRING_FAILED_TEXT);
    }

    #[tokio::test]
    async fn test_mismatch_is_sticky() {
        let (mut sensor, handle) = MockSensor::new();
        let store = MemoryPreferenceStore::new();
        let sink = RecordingSink::new();
        let mut publisher = Publisher::new(sink.clone());
        let mut entropy = SystemEntropy::new();
        let mut pairing = protocol();

        pairing
            .pair(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        let original = handle.notepad(0).unwrap();

        handle.write_notepad_raw(0, b"ffffffffffffffffffffffffffffffff");
        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        assert_eq!(status, PairingStatus::Mismatch);
        assert_eq!(
            store.get_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY).await.unwrap(),
            Some(false)
        );
        assert_eq!(publisher.snapshot().warning_severity, Severity::Critical);

        // The genuine secret reappearing does not restore trust.
        handle.write_notepad_raw(0, &original);
        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        assert_eq!(status, PairingStatus::PreviouslyInvalidated);
        assert!(!pairing.is_valid());
        assert_eq!(publisher.snapshot().pairing_warning, PAIRING_INVALID_TEXT);

        // Neither does a reload from storage.
        let mut reloaded = protocol();
        reloaded.load(&store).await.unwrap();
        assert!(!reloaded.is_valid());
        assert!(!reloaded.record().is_first_boot());
    }

    #[tokio::test]
    async fn test_read_failure_is_neutral() {
        let (mut sensor, handle) = MockSensor::new();
        let store = MemoryPreferenceStore::new();
        let mut publisher = Publisher::new(RecordingSink::new());
        let mut entropy = SystemEntropy::new();
        let mut pairing = protocol();

        pairing
            .pair(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();

        handle.fail_next(Operation::ReadNotepad, SensorError::communication("timeout"));
        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();

        assert_eq!(status, PairingStatus::Unreadable);
        assert!(pairing.is_valid());
        assert!(publisher.snapshot().pairing_valid);
        assert_eq!(publisher.snapshot().pairing_warning, PAIRING_UNREADABLE_TEXT);
        assert_eq!(publisher.snapshot().warning_severity, Severity::Warning);
        assert_eq!(
            store.get_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY).await.unwrap(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_blank_page_is_a_mismatch() {
        let (mut sensor, handle) = MockSensor::new();
        let store = MemoryPreferenceStore::new();
        let mut publisher = Publisher::new(RecordingSink::new());
        let mut entropy = SystemEntropy::new();
        let mut pairing = protocol();

        pairing
            .pair(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        handle.swap_sensor([]);

        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        assert_eq!(status, PairingStatus::Mismatch);
    }

    #[tokio::test]
    async fn test_prefix_does_not_match() {
        let (mut sensor, handle) = MockSensor::new();
        let store = MemoryPreferenceStore::new();
        let sink = RecordingSink::new();
        let mut publisher = Publisher::new(sink.clone());
        let mut entropy = SystemEntropy::new();
        let mut pairing = protocol();

        pairing
            .pair(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        let original = handle.notepad(0).unwrap();
        handle.write_notepad_raw(0, &original[..16]);

        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut entropy)
            .await
            .unwrap();
        assert_eq!(status, PairingStatus::Mismatch);
        assert_eq!(sink.count(|o| *o == Observation::PairingValid(false)), 1);
    }

    #[tokio::test]
    async fn test_corrupt_stored_code_is_not_first_boot() {
        let (mut sensor, handle) = MockSensor::new();
        let store = MemoryPreferenceStore::new();
        store
            .put(PAIRING_NAMESPACE, PAIRING_CODE_KEY, "not-a-secret")
            .await
            .unwrap();
        store
            .put_bool(PAIRING_NAMESPACE, PAIRING_VALID_KEY, true)
            .await
            .unwrap();

        let mut publisher = Publisher::new(RecordingSink::new());
        let mut pairing = protocol();
        pairing.load(&store).await.unwrap();

        let status = pairing
            .check(&mut sensor, &store, &mut publisher, &mut SystemEntropy::new())
            .await
            .unwrap();
        assert_eq!(status, PairingStatus::PreviouslyInvalidated);
        assert_eq!(handle.calls(Operation::WriteNotepad), 0);
    }
}
