//! Common types shared across sensor link implementations.
//!
//! This module defines device metadata, the sensor's LED vocabulary, and the
//! values returned by search and parameter queries.

use fingerbell_core::SlotId;
use serde::{Deserialize, Serialize};

/// Generic device information.
///
/// Contains metadata about the sensor such as name, model, and firmware
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "R503", "Mock Fingerprint Sensor").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            firmware_version: None,
        }
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}

/// System parameters reported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorParameters {
    /// Raw status register.
    pub status_register: u16,

    /// Sensor system identifier.
    pub system_id: u16,

    /// Template library capacity.
    pub capacity: u16,

    /// Matching security level (1-5, higher is stricter).
    pub security_level: u8,

    /// 32-bit device address.
    pub device_address: u32,

    /// Maximum data packet length in bytes.
    pub packet_length: u16,

    /// Link baud rate.
    pub baud_rate: u32,
}

impl Default for SensorParameters {
    fn default() -> Self {
        Self {
            status_register: 0,
            system_id: 0,
            capacity: 200,
            security_level: 3,
            device_address: 0xFFFF_FFFF,
            packet_length: 128,
            baud_rate: 57_600,
        }
    }
}

/// A successful database search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Slot of the best-scoring template.
    pub slot: SlotId,

    /// Match score reported by the sensor.
    pub confidence: u16,
}

/// LED colors supported by the sensor's ring light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LedColor {
    Red = 1,
    Blue = 2,
    Purple = 3,
    Green = 4,
    Yellow = 5,
    Cyan = 6,
    White = 7,
}

/// LED animation modes supported by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LedMode {
    Breathing = 1,
    Flashing = 2,
    On = 3,
    Off = 4,
    GradualOn = 5,
    GradualOff = 6,
}

/// One LED control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedControl {
    pub mode: LedMode,

    /// Animation speed (0-255, lower is faster).
    pub speed: u8,

    pub color: LedColor,

    /// Number of animation cycles, 0 for infinite.
    pub cycles: u8,
}

impl LedControl {
    pub fn new(mode: LedMode, speed: u8, color: LedColor, cycles: u8) -> Self {
        Self {
            mode,
            speed,
            color,
            cycles,
        }
    }
}

/// Named indicator patterns used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorPattern {
    /// Searching for the sensor.
    Connecting,

    /// Ready, waiting for a finger.
    Idle,

    /// Image captured, processing.
    Capturing,

    /// Finger recognised.
    Identified,

    /// Enrollment waiting for the finger to be lifted.
    EnrollAwaitLift,

    /// Enrollment ready for the next placement.
    EnrollReady,

    /// Enrollment pass captured.
    EnrollCaptured,

    /// LED off.
    Off,
}

impl IndicatorPattern {
    /// The LED command that renders this pattern.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerbell_hardware::types::{IndicatorPattern, LedColor, LedMode};
    ///
    /// let control = IndicatorPattern::Idle.control();
    /// assert_eq!(control.mode, LedMode::Breathing);
    /// assert_eq!(control.color, LedColor::Blue);
    /// ```
    pub fn control(&self) -> LedControl {
        match self {
            Self::Connecting => LedControl::new(LedMode::Flashing, 25, LedColor::Blue, 0),
            Self::Idle => LedControl::new(LedMode::Breathing, 250, LedColor::Blue, 0),
            Self::Capturing => LedControl::new(LedMode::Flashing, 25, LedColor::Red, 0),
            Self::Identified => LedControl::new(LedMode::On, 0, LedColor::Purple, 0),
            Self::EnrollAwaitLift => LedControl::new(LedMode::Breathing, 100, LedColor::Purple, 0),
            Self::EnrollReady => LedControl::new(LedMode::Flashing, 25, LedColor::Purple, 0),
            Self::EnrollCaptured => LedControl::new(LedMode::On, 0, LedColor::Purple, 0),
            Self::Off => LedControl::new(LedMode::Off, 0, LedColor::Blue, 0),
        }
    }
}
