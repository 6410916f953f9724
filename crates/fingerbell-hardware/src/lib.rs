//! Sensor link abstraction for the fingerprint doorbell controller.
//!
//! This crate defines the contract between the controller and an optical
//! fingerprint sensor (R503/AS608 family) attached over a serial link. The
//! controller never frames packets itself; it calls the primitive
//! instructions of [`SensorLink`] and interprets their confirmation codes.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnySensorLink`](devices::AnySensorLink) selects a link
//!   implementation at runtime without trait objects.
//! - **Thread-safe**: Links require `Send + Sync` for use with Tokio.
//! - **Error-aware**: Every sensor confirmation code maps to a [`SensorError`]
//!   variant.
//!
//! # Example
//!
//! ```no_run
//! use fingerbell_hardware::traits::SensorLink;
//! use fingerbell_hardware::types::IndicatorPattern;
//! use fingerbell_hardware::{Result, SensorError};
//!
//! async fn identify<S: SensorLink>(link: &mut S) -> Result<Option<u16>> {
//!     link.capture_image().await?;
//!     link.image_to_template(1).await?;
//!
//!     match link.search().await {
//!         Ok(hit) => {
//!             link.set_led(IndicatorPattern::Identified.control()).await.ok();
//!             Ok(Some(hit.slot.as_u16()))
//!         }
//!         Err(SensorError::NotFound) => Ok(None),
//!         Err(e) => Err(e),
//!     }
//! }
//! ```
//!
//! # Mock Implementation
//!
//! [`MockSensor`](mock::MockSensor) simulates the sensor window, character
//! buffers, template library, and notepad so the controller can be exercised
//! without hardware.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Result, SensorError};
pub use traits::{NotepadPage, SensorLink};
pub use types::{
    DeviceInfo, IndicatorPattern, LedColor, LedControl, LedMode, SearchMatch, SensorParameters,
};
