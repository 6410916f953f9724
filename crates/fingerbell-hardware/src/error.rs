//! Error types for sensor link operations.
//!
//! Each variant corresponds to a confirmation code the optical sensor can
//! return, plus link-level conditions (disconnection, timeouts, malformed
//! responses). Callers classify outcomes through [`SensorError::is_transient`]
//! and [`SensorError::is_unusable_image`] instead of matching raw codes.

/// Result type alias for sensor operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// Errors that can occur during sensor link operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    /// Packet receive error or malformed acknowledgement.
    #[error("Communication error: {message}")]
    Communication { message: String },

    /// No finger on the sensor window.
    #[error("No finger detected")]
    NoFinger,

    /// The sensor failed to capture an image.
    #[error("Image capture failed")]
    ImageFail,

    /// Image too disordered to extract features.
    #[error("Image too messy")]
    ImageMessy,

    /// Too few feature points in the image.
    #[error("Could not find fingerprint features")]
    FeatureFail,

    /// No valid primary image in the image buffer.
    #[error("Invalid image")]
    InvalidImage,

    /// Search found no template above the acceptance threshold.
    #[error("No matching template found")]
    NotFound,

    /// The character buffers could not be merged into one model.
    #[error("Fingerprint samples did not match")]
    EnrollMismatch,

    /// Slot is outside the sensor's template library.
    #[error("Bad template location: {slot}")]
    BadLocation { slot: u16 },

    /// Writing to flash failed while storing a model.
    #[error("Flash write error")]
    FlashError,

    /// Template deletion failed.
    #[error("Failed to delete template")]
    DeleteFailed,

    /// Template library clear failed.
    #[error("Failed to clear template library")]
    ClearFailed,

    /// Handshake password rejected.
    #[error("Sensor password verification failed")]
    PasswordFailed,

    /// The sensor did not answer in time.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Sensor is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Invalid data passed to or received from the sensor.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Confirmation code with no dedicated variant.
    #[error("Sensor returned code 0x{code:02X}")]
    Unknown { code: u8 },
}

impl SensorError {
    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Map a sensor confirmation code to an error.
    ///
    /// Returns `None` for `0x00` (OK).
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerbell_hardware::SensorError;
    ///
    /// assert_eq!(SensorError::from_code(0x00), None);
    /// assert_eq!(SensorError::from_code(0x02), Some(SensorError::NoFinger));
    /// assert_eq!(SensorError::from_code(0x0A), Some(SensorError::EnrollMismatch));
    /// ```
    pub fn from_code(code: u8) -> Option<Self> {
        let error = match code {
            0x00 => return None,
            0x01 => Self::communication("packet receive error"),
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMessy,
            0x07 => Self::FeatureFail,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation { slot: 0 },
            0x10 => Self::DeleteFailed,
            0x11 => Self::ClearFailed,
            0x13 => Self::PasswordFailed,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            0xFF => Self::timeout(0),
            other => Self::Unknown { code: other },
        };
        Some(error)
    }

    /// The sensor confirmation code for this error, when one exists.
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Communication { .. } => Some(0x01),
            Self::NoFinger => Some(0x02),
            Self::ImageFail => Some(0x03),
            Self::ImageMessy => Some(0x06),
            Self::FeatureFail => Some(0x07),
            Self::NotFound => Some(0x09),
            Self::EnrollMismatch => Some(0x0A),
            Self::BadLocation { .. } => Some(0x0B),
            Self::DeleteFailed => Some(0x10),
            Self::ClearFailed => Some(0x11),
            Self::PasswordFailed => Some(0x13),
            Self::InvalidImage => Some(0x15),
            Self::FlashError => Some(0x18),
            Self::Timeout { .. } => Some(0xFF),
            Self::Unknown { code } => Some(*code),
            Self::Disconnected { .. } | Self::InvalidData { .. } => None,
        }
    }

    /// True for outcomes the scan loop simply retries on the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoFinger | Self::Communication { .. } | Self::Timeout { .. }
        )
    }

    /// True when a captured image could not be turned into a template.
    ///
    /// Expected and frequent during normal scanning; never a fault.
    pub fn is_unusable_image(&self) -> bool {
        matches!(self, Self::ImageMessy | Self::FeatureFail | Self::InvalidImage)
    }
}
