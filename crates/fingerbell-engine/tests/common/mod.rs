//! Shared fixtures for controller integration tests.
//!
//! A [`Rig`] bundles a controller wired to a [`MockSensor`], an in-memory
//! preference store and a [`RecordingSink`], plus the handles tests use to
//! drive the sensor and inspect what was persisted and published.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fingerbell_core::{MatchResult, SlotId};
use fingerbell_engine::{EngineConfig, FingerprintController, RecordingSink};
use fingerbell_hardware::mock::{MockSensor, MockSensorHandle};
use fingerbell_storage::MemoryPreferenceStore;

pub type TestController =
    FingerprintController<MockSensor, Arc<MemoryPreferenceStore>, RecordingSink>;

pub struct Rig {
    pub controller: TestController,
    pub handle: MockSensorHandle,
    pub store: Arc<MemoryPreferenceStore>,
    pub sink: RecordingSink,
}

impl Rig {
    /// A controller that has not run setup yet.
    pub fn new() -> Self {
        let (sensor, handle) = MockSensor::new();
        Self::assemble(sensor, handle, Arc::new(MemoryPreferenceStore::new()))
    }

    /// A controller that completed setup against a healthy sensor.
    pub async fn ready() -> Self {
        let mut rig = Self::new();
        rig.controller.setup().await.unwrap();
        rig
    }

    /// Restart the controller against the same sensor and store.
    pub fn reboot(self) -> Self {
        let sensor = self.handle.open_link();
        Self::assemble(sensor, self.handle, self.store)
    }

    /// Sleep past the poll interval, then tick.
    pub async fn next_tick(&mut self) -> Option<MatchResult> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.controller.tick().await
    }

    fn assemble(sensor: MockSensor, handle: MockSensorHandle, store: Arc<MemoryPreferenceStore>) -> Self {
        let sink = RecordingSink::new();
        let controller = FingerprintController::new(
            EngineConfig::default().with_network_identity("test-door"),
            sensor,
            Arc::clone(&store),
            sink.clone(),
        )
        .unwrap();

        Self {
            controller,
            handle,
            store,
            sink,
        }
    }
}

pub fn slot(id: i64) -> SlotId {
    SlotId::new(id).unwrap()
}
