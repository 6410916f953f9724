//! Enum wrapper for sensor link dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) are not
//! object-safe, so `Box<dyn SensorLink>` is unavailable. [`AnySensorLink`]
//! provides concrete dispatch over the supported link implementations so an
//! application can choose one at runtime.
//!
//! # Examples
//!
//! ```
//! use fingerbell_hardware::devices::AnySensorLink;
//! use fingerbell_hardware::mock::MockSensor;
//!
//! let (sensor, _handle) = MockSensor::new();
//! let link = AnySensorLink::Mock(sensor);
//! ```

use crate::Result;
use crate::mock::MockSensor;
use crate::traits::{NotepadPage, SensorLink};
use crate::types::{DeviceInfo, LedControl, SearchMatch, SensorParameters};
use fingerbell_core::SlotId;

/// Enum wrapper for sensor link dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnySensorLink {
    /// Mock sensor for development and testing.
    Mock(MockSensor),
    // TODO: add a `Serial` variant behind the `hardware-serial` feature once
    // the UART packet driver exists.
}

impl SensorLink for AnySensorLink {
    async fn verify_link(&mut self) -> Result<()> {
        match self {
            Self::Mock(link) => link.verify_link().await,
        }
    }

    async fn read_parameters(&mut self) -> Result<SensorParameters> {
        match self {
            Self::Mock(link) => link.read_parameters().await,
        }
    }

    async fn template_count(&mut self) -> Result<u16> {
        match self {
            Self::Mock(link) => link.template_count().await,
        }
    }

    async fn capture_image(&mut self) -> Result<()> {
        match self {
            Self::Mock(link) => link.capture_image().await,
        }
    }

    async fn image_to_template(&mut self, buffer: u8) -> Result<()> {
        match self {
            Self::Mock(link) => link.image_to_template(buffer).await,
        }
    }

    async fn search(&mut self) -> Result<SearchMatch> {
        match self {
            Self::Mock(link) => link.search().await,
        }
    }

    async fn create_model(&mut self) -> Result<()> {
        match self {
            Self::Mock(link) => link.create_model().await,
        }
    }

    async fn store_model(&mut self, slot: SlotId) -> Result<()> {
        match self {
            Self::Mock(link) => link.store_model(slot).await,
        }
    }

    async fn delete_model(&mut self, slot: SlotId) -> Result<()> {
        match self {
            Self::Mock(link) => link.delete_model(slot).await,
        }
    }

    async fn clear_database(&mut self) -> Result<()> {
        match self {
            Self::Mock(link) => link.clear_database().await,
        }
    }

    async fn read_notepad(&mut self, page: u8) -> Result<NotepadPage> {
        match self {
            Self::Mock(link) => link.read_notepad(page).await,
        }
    }

    async fn write_notepad(&mut self, page: u8, data: &[u8]) -> Result<()> {
        match self {
            Self::Mock(link) => link.write_notepad(page, data).await,
        }
    }

    async fn set_led(&mut self, control: LedControl) -> Result<()> {
        match self {
            Self::Mock(link) => link.set_led(control).await,
        }
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        match self {
            Self::Mock(link) => link.get_device_info().await,
        }
    }
}
