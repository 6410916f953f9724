//! Controller timing and identity configuration.

use std::time::Duration;

use fingerbell_core::constants::{
    DEFAULT_CONNECT_ATTEMPTS, DEFAULT_CONNECT_RETRY_DELAY_MS, DEFAULT_FINGER_POLL_INTERVAL_MS,
    DEFAULT_FINGER_WAIT_TIMEOUT_MS, DEFAULT_MATCH_COOLDOWN_MS, DEFAULT_PAIRING_PAGE,
    DEFAULT_PASS_CONFIRM_DELAY_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RING_COOLDOWN_MS,
    DEFAULT_SETTLE_DELAY_MS, NOTEPAD_PAGE_COUNT,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the scan loop holds off after an identification or doorbell event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownMode {
    /// `tick` sleeps for the cooldown before returning.
    #[default]
    Blocking,

    /// `tick` returns immediately; polls are skipped until the cooldown ends.
    Deferred,
}

/// Configuration for [`FingerprintController`](crate::FingerprintController).
///
/// All durations are stored in milliseconds so the struct maps directly onto
/// a JSON config file; accessor methods return [`Duration`].
///
/// # Example
///
/// ```
/// use fingerbell_engine::{CooldownMode, EngineConfig};
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_match_cooldown(Duration::from_secs(2))
///     .with_cooldown_mode(CooldownMode::Deferred)
///     .with_network_identity("front-door");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.match_cooldown(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum time between two scan polls.
    pub poll_interval_ms: u64,

    /// Hold-off after an identified finger.
    pub match_cooldown_ms: u64,

    /// Hold-off after a doorbell ring.
    pub ring_cooldown_ms: u64,

    pub cooldown_mode: CooldownMode,

    /// Poll period while enrollment waits for a finger or a lift.
    pub finger_poll_interval_ms: u64,

    /// Pause after a lift before prompting for the next placement.
    pub settle_delay_ms: u64,

    /// Pause after each accepted enrollment pass.
    pub pass_confirm_delay_ms: u64,

    /// Upper bound on each enrollment wait.
    pub finger_wait_timeout_ms: u64,

    /// Link verification attempts during setup.
    pub connect_attempts: u32,

    pub connect_retry_delay_ms: u64,

    /// Sensor notepad page holding the pairing secret.
    pub pairing_page: u8,

    /// Network identity mixed into pairing secrets.
    pub network_identity: String,

    /// Hardware address mixed into pairing secrets.
    pub hardware_address: [u8; 6],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            match_cooldown_ms: DEFAULT_MATCH_COOLDOWN_MS,
            ring_cooldown_ms: DEFAULT_RING_COOLDOWN_MS,
            cooldown_mode: CooldownMode::Blocking,
            finger_poll_interval_ms: DEFAULT_FINGER_POLL_INTERVAL_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            pass_confirm_delay_ms: DEFAULT_PASS_CONFIRM_DELAY_MS,
            finger_wait_timeout_ms: DEFAULT_FINGER_WAIT_TIMEOUT_MS,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_retry_delay_ms: DEFAULT_CONNECT_RETRY_DELAY_MS,
            pairing_page: DEFAULT_PAIRING_PAGE,
            network_identity: "fingerbell".to_string(),
            hardware_address: [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
        }
    }
}

impl EngineConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = millis(interval);
        self
    }

    pub fn with_match_cooldown(mut self, cooldown: Duration) -> Self {
        self.match_cooldown_ms = millis(cooldown);
        self
    }

    pub fn with_ring_cooldown(mut self, cooldown: Duration) -> Self {
        self.ring_cooldown_ms = millis(cooldown);
        self
    }

    pub fn with_cooldown_mode(mut self, mode: CooldownMode) -> Self {
        self.cooldown_mode = mode;
        self
    }

    pub fn with_finger_poll_interval(mut self, interval: Duration) -> Self {
        self.finger_poll_interval_ms = millis(interval);
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = millis(delay);
        self
    }

    pub fn with_pass_confirm_delay(mut self, delay: Duration) -> Self {
        self.pass_confirm_delay_ms = millis(delay);
        self
    }

    pub fn with_finger_wait_timeout(mut self, timeout: Duration) -> Self {
        self.finger_wait_timeout_ms = millis(timeout);
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    pub fn with_connect_retry_delay(mut self, delay: Duration) -> Self {
        self.connect_retry_delay_ms = millis(delay);
        self
    }

    pub fn with_pairing_page(mut self, page: u8) -> Self {
        self.pairing_page = page;
        self
    }

    pub fn with_network_identity(mut self, identity: impl Into<String>) -> Self {
        self.network_identity = identity.into();
        self
    }

    pub fn with_hardware_address(mut self, address: [u8; 6]) -> Self {
        self.hardware_address = address;
        self
    }

    /// Check the configuration for values the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero poll interval, zero connection
    /// attempts, a zero enrollment wait, or a notepad page the sensor does
    /// not have.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }
        if self.finger_poll_interval_ms == 0 {
            return Err(Error::Config(
                "finger_poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.finger_wait_timeout_ms == 0 {
            return Err(Error::Config(
                "finger_wait_timeout_ms must be positive".to_string(),
            ));
        }
        if self.connect_attempts == 0 {
            return Err(Error::Config("connect_attempts must be at least 1".to_string()));
        }
        if self.pairing_page >= NOTEPAD_PAGE_COUNT {
            return Err(Error::Config(format!(
                "pairing_page {} out of range (sensor has {} pages)",
                self.pairing_page, NOTEPAD_PAGE_COUNT
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn match_cooldown(&self) -> Duration {
        Duration::from_millis(self.match_cooldown_ms)
    }

    pub fn ring_cooldown(&self) -> Duration {
        Duration::from_millis(self.ring_cooldown_ms)
    }

    pub fn finger_poll_interval(&self) -> Duration {
        Duration::from_millis(self.finger_poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn pass_confirm_delay(&self) -> Duration {
        Duration::from_millis(self.pass_confirm_delay_ms)
    }

    pub fn finger_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.finger_wait_timeout_ms)
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_firmware_timing() {
        let config = EngineConfig::default();

        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.match_cooldown(), Duration::from_secs(3));
        assert_eq!(config.ring_cooldown(), Duration::from_secs(1));
        assert_eq!(config.finger_poll_interval(), Duration::from_millis(50));
        assert_eq!(config.settle_delay(), Duration::from_millis(500));
        assert_eq!(config.pass_confirm_delay(), Duration::from_secs(1));
        assert_eq!(config.finger_wait_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_attempts, 2);
        assert_eq!(config.connect_retry_delay(), Duration::from_secs(5));
        assert_eq!(config.pairing_page, 0);
        assert_eq!(config.cooldown_mode, CooldownMode::Blocking);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case(EngineConfig::default().with_poll_interval(Duration::ZERO))]
    #[case(EngineConfig::default().with_finger_poll_interval(Duration::ZERO))]
    #[case(EngineConfig::default().with_finger_wait_timeout(Duration::ZERO))]
    #[case(EngineConfig::default().with_connect_attempts(0))]
    #[case(EngineConfig::default().with_pairing_page(16))]
    fn test_invalid_configs_rejected(#[case] config: EngineConfig) {
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "match_cooldown_ms": 1500, "cooldown_mode": "deferred" }"#,
        )
        .unwrap();

        assert_eq!(config.match_cooldown_ms, 1500);
        assert_eq!(config.cooldown_mode, CooldownMode::Deferred);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.network_identity, "fingerbell");
    }
}
