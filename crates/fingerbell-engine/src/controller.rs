//! The host-facing fingerprint controller.
//!
//! [`FingerprintController`] owns the sensor link, the preference store and
//! the observation sink, and hands them to the registry, scanner,
//! enrollment and pairing components on each call. The host calls
//! [`setup`](FingerprintController::setup) once, then
//! [`tick`](FingerprintController::tick) from its control loop, and the
//! command methods on demand. Every method takes `&mut self`, so commands
//! and polling never overlap.
//!
//! # Example
//!
//! ```
//! use fingerbell_engine::{EngineConfig, FingerprintController, RecordingSink};
//! use fingerbell_hardware::mock::MockSensor;
//! use fingerbell_storage::MemoryPreferenceStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (sensor, handle) = MockSensor::new();
//! let mut controller = FingerprintController::new(
//!     EngineConfig::default(),
//!     sensor,
//!     MemoryPreferenceStore::new(),
//!     RecordingSink::new(),
//! )?;
//!
//! controller.setup().await?;
//! assert_eq!(controller.observations().status, "Ready");
//!
//! handle.lift_finger();
//! assert!(controller.tick().await.is_none());
//! # Ok(())
//! # }
//! ```

use fingerbell_core::{MatchResult, PairingRecord, SessionState, SlotId};
use fingerbell_hardware::{DeviceInfo, IndicatorPattern, SensorLink, SensorParameters};
use fingerbell_storage::PreferenceStore;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::enrollment::{self, EnrollTiming};
use crate::error::{EnrollError, Error, PairingError, Result};
use crate::indicator::indicate;
use crate::observation::{ObservationSink, Observations, Publisher};
use crate::pairing::{DeviceIdentity, EntropySource, PairingProtocol, PairingStatus, SystemEntropy};
use crate::registry::TemplateRegistry;
use crate::scanner::Scanner;
use crate::session::Session;

pub struct FingerprintController<L, P, S, E = SystemEntropy> {
    config: EngineConfig,
    link: L,
    store: P,
    publisher: Publisher<S>,
    entropy: E,
    session: Session,
    registry: TemplateRegistry,
    scanner: Scanner,
    pairing: PairingProtocol,
    parameters: Option<SensorParameters>,
    device_info: Option<DeviceInfo>,
    /// Link establishment failed this boot.
    link_failed: bool,
}

impl<L, P, S> FingerprintController<L, P, S, SystemEntropy>
where
    L: SensorLink,
    P: PreferenceStore,
    S: ObservationSink,
{
    /// Create a controller using the system entropy source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn new(config: EngineConfig, link: L, store: P, sink: S) -> Result<Self> {
        Self::with_entropy(config, link, store, sink, SystemEntropy::new())
    }
}

impl<L, P, S, E> FingerprintController<L, P, S, E>
where
    L: SensorLink,
    P: PreferenceStore,
    S: ObservationSink,
    E: EntropySource,
{
    pub fn with_entropy(config: EngineConfig, link: L, store: P, sink: S, entropy: E) -> Result<Self> {
        config.validate()?;

        let identity = DeviceIdentity {
            network_identity: config.network_identity.clone(),
            hardware_address: config.hardware_address,
        };

        Ok(Self {
            scanner: Scanner::new(&config),
            pairing: PairingProtocol::new(config.pairing_page, identity),
            config,
            link,
            store,
            publisher: Publisher::new(sink),
            entropy,
            session: Session::new(),
            registry: TemplateRegistry::new(),
            parameters: None,
            device_info: None,
            link_failed: false,
        })
    }

    /// Load persisted state, establish the sensor link and check pairing.
    ///
    /// The registry and pairing record are loaded before the sensor is
    /// contacted. A pairing problem found here is published but does not
    /// fail setup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the sensor did not answer after
    /// all attempts; the controller then stays disconnected for this boot,
    /// and every later command, including another `setup`, fails without
    /// touching the link. Storage errors while loading are returned as is.
    pub async fn setup(&mut self) -> Result<()> {
        if self.link_failed {
            warn!("Sensor link failed earlier this boot, staying disconnected");
            return Err(Error::NotConnected);
        }

        info!("Setting up fingerprint controller");

        self.registry.load(&self.store).await?;
        self.pairing.load(&self.store).await?;

        if self.session.is_connected() {
            warn!("Setup called on a connected controller");
            return Ok(());
        }

        indicate(&mut self.link, IndicatorPattern::Connecting).await;

        if !self.connect().await {
            self.link_failed = true;
            error!("Fingerprint sensor not found");
            self.publisher.status("Sensor not found!");
            return Err(Error::NotConnected);
        }

        self.session.transition_to(SessionState::Idle)?;

        match self.link.get_device_info().await {
            Ok(info) => {
                info!(
                    name = %info.name,
                    model = %info.model,
                    firmware = info.firmware_version.as_deref().unwrap_or("unknown"),
                    "Found fingerprint sensor"
                );
                self.device_info = Some(info);
            }
            Err(e) => warn!(error = %e, "Failed to read device info"),
        }

        match self.link.read_parameters().await {
            Ok(parameters) => {
                info!(
                    capacity = parameters.capacity,
                    security_level = parameters.security_level,
                    "Sensor parameters"
                );
                self.parameters = Some(parameters);
            }
            Err(e) => warn!(error = %e, "Failed to read sensor parameters"),
        }

        self.refresh_count().await;
        self.publisher.status("Ready");
        indicate(&mut self.link, IndicatorPattern::Idle).await;

        match self.check_pairing().await {
            Ok(status) => info!(%status, "Pairing checked"),
            Err(e) => warn!(error = %e, "Pairing check failed"),
        }

        Ok(())
    }

    async fn connect(&mut self) -> bool {
        let attempts = self.config.connect_attempts;
        for attempt in 1..=attempts {
            match self.link.verify_link().await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Sensor verification failed");
                    if attempt < attempts {
                        sleep(self.config.connect_retry_delay()).await;
                    }
                }
            }
        }
        false
    }

    /// Run one scan cycle if the session allows it and one is due.
    ///
    /// Returns the identification, doorbell or cleared event produced.
    pub async fn tick(&mut self) -> Option<MatchResult> {
        if !self.session.state().can_scan() {
            return None;
        }

        let result = self
            .scanner
            .poll(&mut self.link, &self.registry, &mut self.publisher)
            .await?;

        let next = if result.is_cleared() {
            SessionState::Idle
        } else {
            SessionState::Scanning
        };
        if let Err(e) = self.session.ensure(next) {
            warn!(error = %e, "Unexpected session transition");
        }

        if result.is_identified() && !self.pairing.is_valid() {
            warn!(id = result.id(), "Match reported while sensor pairing is not trusted");
        }

        Some(result)
    }

    /// Enroll a finger at slot `id` under `name`.
    ///
    /// Blocks for the whole five-pass sequence. The session returns to
    /// `Idle` and the indicator to its idle pattern whatever the outcome.
    pub async fn enroll(&mut self, id: i64, name: &str) -> std::result::Result<(), EnrollError> {
        if !self.session.is_connected() {
            error!("Sensor not connected");
            self.publisher.status("Error: Sensor not connected");
            return Err(EnrollError::NotConnected);
        }

        let Ok(slot) = SlotId::new(id) else {
            error!(id, "Invalid ID");
            self.publisher.status("Error: Invalid ID");
            return Err(EnrollError::InvalidId { id });
        };

        if self.session.state() == SessionState::Enrolling {
            return Err(EnrollError::Busy);
        }

        self.scanner
            .release(&mut self.link, &mut self.publisher)
            .await;
        if let Err(e) = self.session.transition_to(SessionState::Enrolling) {
            warn!(error = %e, "Cannot start enrollment");
            return Err(EnrollError::Busy);
        }

        info!(%slot, name, "Starting enrollment");
        self.publisher
            .status("Enrollment started. Place finger on sensor 5 times...");

        let outcome = self.run_enrollment(slot, name).await;

        match &outcome {
            Ok(()) => {
                info!(%slot, name, "Enrollment successful");
                self.publisher.status("Enrollment successful!");
            }
            Err(EnrollError::Storage(e)) => {
                error!(%slot, error = %e, "Template stored but name not persisted");
                self.publisher.status("Enrollment stored, name not saved");
            }
            Err(e) => {
                error!(%slot, error = %e, "Enrollment failed");
                self.publisher.status("Enrollment failed!");
            }
        }

        indicate(&mut self.link, IndicatorPattern::Idle).await;
        self.session.reset();

        outcome
    }

    async fn run_enrollment(&mut self, slot: SlotId, name: &str) -> std::result::Result<(), EnrollError> {
        let timing = EnrollTiming::from(&self.config);
        enrollment::run(&mut self.link, &mut self.publisher, timing, slot).await?;

        self.refresh_count().await;
        self.registry.upsert(&self.store, slot, name).await?;
        Ok(())
    }

    /// Delete the template at slot `id`.
    pub async fn delete(&mut self, id: i64) -> Result<()> {
        self.ensure_connected()?;
        let slot = SlotId::new(id).map_err(|_| {
            error!(id, "Invalid ID");
            Error::InvalidId { id }
        })?;

        info!(%slot, "Deleting fingerprint");

        if let Err(e) = self.link.delete_model(slot).await {
            error!(%slot, error = %e, "Delete failed");
            self.publisher.status("Delete failed!");
            return Err(e.into());
        }

        let persisted = self.registry.remove(&self.store, slot).await;
        info!(%slot, "Fingerprint deleted");
        self.publisher.status("Fingerprint deleted");
        self.refresh_count().await;

        persisted?;
        Ok(())
    }

    /// Delete every template.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.ensure_connected()?;

        info!("Clearing all fingerprints");

        if let Err(e) = self.link.clear_database().await {
            error!(error = %e, "Clear database failed");
            self.publisher.status("Clear failed!");
            return Err(e.into());
        }

        let persisted = self.registry.clear(&self.store).await;
        info!("Database cleared");
        self.publisher.status("All fingerprints cleared");
        self.publisher.enrolled_count(0);

        persisted?;
        Ok(())
    }

    /// Verify that the attached sensor is the paired one.
    pub async fn check_pairing(&mut self) -> std::result::Result<PairingStatus, PairingError> {
        if !self.session.is_connected() {
            return Err(PairingError::NotConnected);
        }
        self.pairing
            .check(
                &mut self.link,
                &self.store,
                &mut self.publisher,
                &mut self.entropy,
            )
            .await
    }

    /// Pair with the attached sensor, replacing any previous pairing.
    pub async fn pair(&mut self) -> std::result::Result<(), PairingError> {
        if !self.session.is_connected() {
            return Err(PairingError::NotConnected);
        }
        self.pairing
            .pair(
                &mut self.link,
                &self.store,
                &mut self.publisher,
                &mut self.entropy,
            )
            .await
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.session.is_connected() {
            Ok(())
        } else {
            error!("Sensor not connected");
            Err(Error::NotConnected)
        }
    }

    async fn refresh_count(&mut self) {
        match self.link.template_count().await {
            Ok(count) => self.publisher.enrolled_count(count),
            Err(e) => warn!(error = %e, "Failed to read template count"),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Last published value of every observation.
    pub fn observations(&self) -> &Observations {
        self.publisher.snapshot()
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn pairing_record(&self) -> &PairingRecord {
        self.pairing.record()
    }

    /// True while identification results can be trusted.
    pub fn is_paired(&self) -> bool {
        self.pairing.is_valid()
    }

    /// Identification reported by the sensor at setup.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    /// Parameters read from the sensor at setup.
    pub fn parameters(&self) -> Option<&SensorParameters> {
        self.parameters.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn sink(&self) -> &S {
        self.publisher.sink()
    }
}
