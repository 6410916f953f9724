#![allow(async_fn_in_trait)]

//! Sensor link trait.
//!
//! The [`SensorLink`] trait is the contract between the controller and the
//! driver that frames commands over the sensor's UART. Each method maps to
//! one sensor instruction and returns the sensor's confirmation code as a
//! [`SensorError`](crate::SensorError) on anything other than OK.

use crate::Result;
use crate::types::{DeviceInfo, LedControl, SearchMatch, SensorParameters};
use fingerbell_core::SlotId;
use fingerbell_core::constants::NOTEPAD_PAGE_SIZE;

/// One notepad page as stored on the sensor.
pub type NotepadPage = [u8; NOTEPAD_PAGE_SIZE];

/// Primitive operations of an optical fingerprint sensor.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`, which is an opaque type that cannot be used in trait objects
/// (Edition 2024 RPITIT). Use generic type parameters, or
/// [`AnySensorLink`](crate::devices::AnySensorLink) for runtime selection.
///
/// # Examples
///
/// ```no_run
/// use fingerbell_hardware::traits::SensorLink;
/// use fingerbell_hardware::{Result, SensorError};
///
/// async fn finger_present<S: SensorLink>(link: &mut S) -> Result<bool> {
///     match link.capture_image().await {
///         Ok(()) => Ok(true),
///         Err(SensorError::NoFinger) => Ok(false),
///         Err(e) => Err(e),
///     }
/// }
/// ```
pub trait SensorLink: Send + Sync {
    /// Handshake with the sensor (password verification).
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor does not answer or rejects the password.
    async fn verify_link(&mut self) -> Result<()>;

    /// Read the sensor's system parameters.
    async fn read_parameters(&mut self) -> Result<SensorParameters>;

    /// Number of templates currently stored.
    async fn template_count(&mut self) -> Result<u16>;

    /// Capture a fingerprint image into the image buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::NoFinger`](crate::SensorError::NoFinger) when the
    /// window is empty; this is the normal idle answer.
    async fn capture_image(&mut self) -> Result<()>;

    /// Extract features from the image buffer into character buffer `buffer`
    /// (1-5).
    async fn image_to_template(&mut self, buffer: u8) -> Result<()>;

    /// Search the template library with character buffer 1.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::NotFound`](crate::SensorError::NotFound) when no
    /// template scores above the sensor's acceptance threshold.
    async fn search(&mut self) -> Result<SearchMatch>;

    /// Merge the character buffers into one model.
    async fn create_model(&mut self) -> Result<()>;

    /// Store the merged model at `slot`.
    async fn store_model(&mut self, slot: SlotId) -> Result<()>;

    /// Delete the template at `slot`.
    async fn delete_model(&mut self, slot: SlotId) -> Result<()>;

    /// Delete every template.
    async fn clear_database(&mut self) -> Result<()>;

    /// Read one notepad page.
    async fn read_notepad(&mut self, page: u8) -> Result<NotepadPage>;

    /// Write up to one page of data to a notepad page.
    ///
    /// # Errors
    ///
    /// Returns an invalid data error if `data` exceeds the page size.
    async fn write_notepad(&mut self, page: u8, data: &[u8]) -> Result<()>;

    /// Drive the ring LED.
    async fn set_led(&mut self, control: LedControl) -> Result<()>;

    /// Get device information.
    async fn get_device_info(&self) -> Result<DeviceInfo>;
}
