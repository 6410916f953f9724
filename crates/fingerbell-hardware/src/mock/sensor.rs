//! Mock fingerprint sensor implementation for testing and development.
//!
//! This module provides a simulated optical sensor that models the parts of
//! the real device the controller depends on: an image buffer, five character
//! buffers, a template library, notepad pages, and the ring LED. A physical
//! finger is modelled as a [`PrintId`]; two captures of the same print always
//! merge and match.

use crate::{
    Result, SensorError,
    traits::{NotepadPage, SensorLink},
    types::{DeviceInfo, LedControl, SearchMatch, SensorParameters},
};
use fingerbell_core::SlotId;
use fingerbell_core::constants::{ENROLL_PASSES, NOTEPAD_PAGE_COUNT, NOTEPAD_PAGE_SIZE};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity of a simulated physical finger.
pub type PrintId = u32;

/// Confidence reported for a match unless overridden.
pub const DEFAULT_MOCK_CONFIDENCE: u16 = 120;

/// What the sensor window shows on one `capture_image` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    /// Window empty.
    NoFinger,

    /// A clean image of the given print.
    Finger(PrintId),

    /// An image is captured but features cannot be extracted.
    Smudged,

    /// Capture itself fails with this error.
    Fail(SensorError),
}

/// Sensor instruction, used for call accounting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    VerifyLink,
    ReadParameters,
    TemplateCount,
    CaptureImage,
    ImageToTemplate,
    Search,
    CreateModel,
    StoreModel,
    DeleteModel,
    ClearDatabase,
    ReadNotepad,
    WriteNotepad,
    SetLed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Image {
    Print(PrintId),
    Smudged,
}

#[derive(Debug)]
struct SensorState {
    connected: bool,
    script: VecDeque<CaptureStep>,
    resting: CaptureStep,
    image: Option<Image>,
    buffers: [Option<PrintId>; ENROLL_PASSES as usize],
    model: Option<PrintId>,
    library: BTreeMap<u16, PrintId>,
    notepad: [NotepadPage; NOTEPAD_PAGE_COUNT as usize],
    parameters: SensorParameters,
    confidence: u16,
    led: Option<LedControl>,
    faults: HashMap<Operation, VecDeque<SensorError>>,
    calls: HashMap<Operation, usize>,
}

impl SensorState {
    fn new() -> Self {
        Self {
            connected: true,
            script: VecDeque::new(),
            resting: CaptureStep::NoFinger,
            image: None,
            buffers: [None; ENROLL_PASSES as usize],
            model: None,
            library: BTreeMap::new(),
            notepad: [[0u8; NOTEPAD_PAGE_SIZE]; NOTEPAD_PAGE_COUNT as usize],
            parameters: SensorParameters::default(),
            confidence: DEFAULT_MOCK_CONFIDENCE,
            led: None,
            faults: HashMap::new(),
            calls: HashMap::new(),
        }
    }

    /// Account for one instruction and apply any injected fault.
    fn begin(&mut self, op: Operation) -> Result<()> {
        *self.calls.entry(op).or_insert(0) += 1;

        if !self.connected {
            return Err(SensorError::disconnected("mock sensor"));
        }

        if let Some(error) = self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(error);
        }

        Ok(())
    }

    fn page(&mut self, page: u8) -> Result<&mut NotepadPage> {
        self.notepad
            .get_mut(usize::from(page))
            .ok_or_else(|| SensorError::invalid_data(format!("Notepad page {} out of range", page)))
    }
}

/// Mock fingerprint sensor for testing and development.
///
/// # Examples
///
/// ```
/// use fingerbell_hardware::mock::MockSensor;
/// use fingerbell_hardware::traits::SensorLink;
/// use fingerbell_hardware::SensorError;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut sensor, handle) = MockSensor::new();
///
///     assert_eq!(sensor.capture_image().await, Err(SensorError::NoFinger));
///
///     handle.place_finger(7);
///     assert!(sensor.capture_image().await.is_ok());
/// }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    state: Arc<Mutex<SensorState>>,
    name: String,
}

impl MockSensor {
    /// Create a new mock sensor with the default name.
    ///
    /// Returns a tuple of (MockSensor, MockSensorHandle) where the handle
    /// drives the simulated window, library, and faults.
    pub fn new() -> (Self, MockSensorHandle) {
        Self::with_name("Mock Fingerprint Sensor".to_string())
    }

    /// Create a new mock sensor with a custom name.
    pub fn with_name(name: String) -> (Self, MockSensorHandle) {
        let state = Arc::new(Mutex::new(SensorState::new()));

        let sensor = Self {
            state: Arc::clone(&state),
            name,
        };

        (sensor, MockSensorHandle { state })
    }

    fn state(&self) -> MutexGuard<'_, SensorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new().0
    }
}

impl SensorLink for MockSensor {
    async fn verify_link(&mut self) -> Result<()> {
        self.state().begin(Operation::VerifyLink)
    }

    async fn read_parameters(&mut self) -> Result<SensorParameters> {
        let mut state = self.state();
        state.begin(Operation::ReadParameters)?;
        Ok(state.parameters)
    }

    async fn template_count(&mut self) -> Result<u16> {
        let mut state = self.state();
        state.begin(Operation::TemplateCount)?;
        Ok(state.library.len() as u16)
    }

    async fn capture_image(&mut self) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::CaptureImage)?;

        let step = match state.script.pop_front() {
            Some(step) => step,
            None => state.resting.clone(),
        };

        match step {
            CaptureStep::NoFinger => Err(SensorError::NoFinger),
            CaptureStep::Finger(print) => {
                state.image = Some(Image::Print(print));
                Ok(())
            }
            CaptureStep::Smudged => {
                state.image = Some(Image::Smudged);
                Ok(())
            }
            CaptureStep::Fail(error) => Err(error),
        }
    }

    async fn image_to_template(&mut self, buffer: u8) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::ImageToTemplate)?;

        if !(1..=ENROLL_PASSES).contains(&buffer) {
            return Err(SensorError::invalid_data(format!(
                "Character buffer {} out of range",
                buffer
            )));
        }

        match state.image {
            None => Err(SensorError::InvalidImage),
            Some(Image::Smudged) => Err(SensorError::ImageMessy),
            Some(Image::Print(print)) => {
                state.buffers[usize::from(buffer - 1)] = Some(print);
                Ok(())
            }
        }
    }

    async fn search(&mut self) -> Result<SearchMatch> {
        let mut state = self.state();
        state.begin(Operation::Search)?;

        let print = state.buffers[0].ok_or(SensorError::InvalidImage)?;
        let hit = state
            .library
            .iter()
            .find(|(_, stored)| **stored == print)
            .map(|(slot, _)| *slot);

        match hit {
            Some(slot) => Ok(SearchMatch {
                slot: SlotId::new(i64::from(slot))
                    .map_err(|e| SensorError::invalid_data(e.to_string()))?,
                confidence: state.confidence,
            }),
            None => Err(SensorError::NotFound),
        }
    }

    async fn create_model(&mut self) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::CreateModel)?;

        let first = state.buffers[0];
        let merged = match first {
            Some(print) if state.buffers.iter().all(|b| *b == Some(print)) => print,
            _ => return Err(SensorError::EnrollMismatch),
        };

        state.model = Some(merged);
        Ok(())
    }

    async fn store_model(&mut self, slot: SlotId) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::StoreModel)?;

        if slot.as_u16() > state.parameters.capacity {
            return Err(SensorError::BadLocation {
                slot: slot.as_u16(),
            });
        }

        let model = state.model.ok_or(SensorError::FlashError)?;
        state.library.insert(slot.as_u16(), model);
        Ok(())
    }

    async fn delete_model(&mut self, slot: SlotId) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::DeleteModel)?;

        state.library.remove(&slot.as_u16());
        Ok(())
    }

    async fn clear_database(&mut self) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::ClearDatabase)?;

        state.library.clear();
        Ok(())
    }

    async fn read_notepad(&mut self, page: u8) -> Result<NotepadPage> {
        let mut state = self.state();
        state.begin(Operation::ReadNotepad)?;

        Ok(*state.page(page)?)
    }

    async fn write_notepad(&mut self, page: u8, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::WriteNotepad)?;

        if data.len() > NOTEPAD_PAGE_SIZE {
            return Err(SensorError::invalid_data(format!(
                "Notepad data is {} bytes, page holds {}",
                data.len(),
                NOTEPAD_PAGE_SIZE
            )));
        }

        let target = state.page(page)?;
        *target = [0u8; NOTEPAD_PAGE_SIZE];
        target[..data.len()].copy_from_slice(data);
        Ok(())
    }

    async fn set_led(&mut self, control: LedControl) -> Result<()> {
        let mut state = self.state();
        state.begin(Operation::SetLed)?;

        state.led = Some(control);
        Ok(())
    }

    async fn get_device_info(&self) -> Result<DeviceInfo> {
        Ok(
            DeviceInfo::new(self.name.clone(), "Mock Optical Sensor v1.0")
                .with_firmware_version("1.0.0"),
        )
    }
}

/// Handle for controlling a mock sensor.
///
/// Cloning the handle shares the same simulated device.
///
/// # Examples
///
/// ```
/// use fingerbell_hardware::mock::{CaptureStep, MockSensor};
///
/// let (_sensor, handle) = MockSensor::new();
///
/// // Finger resting on the window until lifted
/// handle.place_finger(1);
/// handle.lift_finger();
///
/// // Exact sequence of window states for the next polls
/// handle.script([CaptureStep::Finger(1), CaptureStep::NoFinger]);
/// ```
#[derive(Debug, Clone)]
pub struct MockSensorHandle {
    state: Arc<Mutex<SensorState>>,
}

impl MockSensorHandle {
    fn state(&self) -> MutexGuard<'_, SensorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open another link to the same simulated sensor, as a rebooted
    /// controller would.
    pub fn open_link(&self) -> MockSensor {
        MockSensor {
            state: Arc::clone(&self.state),
            name: "Mock Fingerprint Sensor".to_string(),
        }
    }

    /// Rest a clean print on the window until [`lift_finger`](Self::lift_finger).
    pub fn place_finger(&self, print: PrintId) {
        self.state().resting = CaptureStep::Finger(print);
    }

    /// Rest an unreadable finger on the window.
    pub fn place_smudged(&self) {
        self.state().resting = CaptureStep::Smudged;
    }

    /// Clear the window.
    pub fn lift_finger(&self) {
        self.state().resting = CaptureStep::NoFinger;
    }

    /// Queue window states consumed one per `capture_image` call, ahead of
    /// the resting state.
    pub fn script(&self, steps: impl IntoIterator<Item = CaptureStep>) {
        self.state().script.extend(steps);
    }

    /// Queue the window states of a well-behaved multi-pass enrollment:
    /// the finger is presented, then lifted and presented again for each
    /// further pass.
    pub fn script_enrollment(&self, print: PrintId) {
        let mut steps = vec![CaptureStep::Finger(print)];
        for _ in 1..ENROLL_PASSES {
            steps.push(CaptureStep::NoFinger);
            steps.push(CaptureStep::Finger(print));
        }
        self.script(steps);
    }

    /// Number of unconsumed scripted window states.
    pub fn pending_steps(&self) -> usize {
        self.state().script.len()
    }

    /// Make the next call of `op` fail with `error`.
    ///
    /// Multiple faults for the same operation are consumed in order.
    pub fn fail_next(&self, op: Operation, error: SensorError) {
        self.state().faults.entry(op).or_default().push_back(error);
    }

    /// Simulate unplugging (`false`) or reconnecting (`true`) the sensor.
    pub fn set_connected(&self, connected: bool) {
        self.state().connected = connected;
    }

    /// Put a template for `print` directly into the library.
    pub fn enroll_directly(&self, slot: SlotId, print: PrintId) {
        self.state().library.insert(slot.as_u16(), print);
    }

    /// Print stored at `slot`, if any.
    pub fn template_at(&self, slot: SlotId) -> Option<PrintId> {
        self.state().library.get(&slot.as_u16()).copied()
    }

    /// Number of templates in the library.
    pub fn template_count(&self) -> usize {
        self.state().library.len()
    }

    /// Raw contents of a notepad page.
    pub fn notepad(&self, page: u8) -> Option<NotepadPage> {
        self.state().notepad.get(usize::from(page)).copied()
    }

    /// Overwrite a notepad page, bypassing the link.
    pub fn write_notepad_raw(&self, page: u8, data: &[u8]) {
        let mut state = self.state();
        if let Some(target) = state.notepad.get_mut(usize::from(page)) {
            let len = data.len().min(NOTEPAD_PAGE_SIZE);
            *target = [0u8; NOTEPAD_PAGE_SIZE];
            target[..len].copy_from_slice(&data[..len]);
        }
    }

    /// Simulate physically replacing the sensor: the new unit has a blank
    /// notepad and its own template library.
    pub fn swap_sensor(&self, library: impl IntoIterator<Item = (SlotId, PrintId)>) {
        let mut state = self.state();
        state.notepad = [[0u8; NOTEPAD_PAGE_SIZE]; NOTEPAD_PAGE_COUNT as usize];
        state.library = library
            .into_iter()
            .map(|(slot, print)| (slot.as_u16(), print))
            .collect();
        state.buffers = [None; ENROLL_PASSES as usize];
        state.model = None;
        state.image = None;
    }

    /// Set the confidence reported on a match.
    pub fn set_confidence(&self, confidence: u16) {
        self.state().confidence = confidence;
    }

    /// Set the reported template capacity.
    pub fn set_capacity(&self, capacity: u16) {
        self.state().parameters.capacity = capacity;
    }

    /// Last LED command received.
    pub fn led(&self) -> Option<LedControl> {
        self.state().led
    }

    /// Number of calls made for `op`.
    pub fn calls(&self, op: Operation) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of calls made across all operations.
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }
}
