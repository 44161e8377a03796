//! In-process camera hardware for tests and the driver binary.
//!
//! [`MockBackend`] and [`StaticDiscovery`] are cheap to clone; clones share
//! state, so a test keeps one clone as a probe while the worker owns the
//! other.

use super::{
    CaptureSettings, DeviceDiscovery, DeviceId, DeviceInput, Frame, HardwareError, PhotoOutput,
    PhotoReply, PixelFormat, Position, RawPhoto, SessionBackend,
};
use crate::orientation::{reorient, ConnectionKind, ConnectionSettings, Orientation};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Call counters recorded by [`MockBackend`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockStats {
    /// Configuration blocks opened.
    pub begin_calls: u64,
    /// Configuration blocks committed.
    pub commit_calls: u64,
    /// Inputs successfully attached.
    pub inputs_attached: u64,
    /// Inputs detached.
    pub inputs_removed: u64,
    /// Photo outputs attached.
    pub outputs_attached: u64,
    /// Calls to start the hardware.
    pub start_calls: u64,
    /// Calls to stop the hardware.
    pub stop_calls: u64,
    /// Capture requests received, including failed and dropped ones.
    pub captures: u64,
}

#[derive(Debug)]
struct MockState {
    inputs: Vec<DeviceInput>,
    outputs: Vec<PhotoOutput>,
    running: bool,
    preview: Option<ConnectionSettings>,
    capture: Option<ConnectionSettings>,
    stats: MockStats,
    capture_log: Vec<Position>,

    single_input_only: bool,
    failing_inputs: HashSet<DeviceId>,
    fail_next_commit: Option<String>,
    fail_next_start: Option<String>,
    fail_next_capture: Option<String>,
    drop_next_capture: bool,
    ignore_capture_mirroring: bool,
    sensor_orientation: Orientation,
    completion_delay: Option<Duration>,
    scene_width: u32,
    scene_height: u32,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            running: false,
            preview: None,
            capture: None,
            stats: MockStats::default(),
            capture_log: Vec::new(),
            single_input_only: false,
            failing_inputs: HashSet::new(),
            fail_next_commit: None,
            fail_next_start: None,
            fail_next_capture: None,
            drop_next_capture: false,
            ignore_capture_mirroring: false,
            sensor_orientation: Orientation::Right,
            completion_delay: None,
            scene_width: 8,
            scene_height: 6,
        }
    }
}

/// Scriptable camera session hardware.
///
/// Photos show a synthetic scene whose pixel at upright `(x, y)` is
/// `[x, y, 0xAB]`. The stored buffer is rotated by the sensor orientation
/// (and mirrored, when configured to ignore the mirroring hint) so callers
/// can verify normalization pixel by pixel.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Creates a mock with an 8x6 scene and a sensor mounted `Right`.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Refuse a second input while one is attached.
    pub fn set_single_input_only(&self, enabled: bool) {
        self.lock().single_input_only = enabled;
    }

    /// Make `add_input` fail for the given device.
    pub fn fail_input(&self, device_id: &DeviceId) {
        self.lock().failing_inputs.insert(device_id.clone());
    }

    /// Let `add_input` succeed again for the given device.
    pub fn heal_input(&self, device_id: &DeviceId) {
        self.lock().failing_inputs.remove(device_id);
    }

    /// Fail the next configuration commit.
    pub fn fail_next_commit(&self, reason: &str) {
        self.lock().fail_next_commit = Some(reason.to_string());
    }

    /// Fail the next start.
    pub fn fail_next_start(&self, reason: &str) {
        self.lock().fail_next_start = Some(reason.to_string());
    }

    /// Fail the next capture after accepting it.
    pub fn fail_next_capture(&self, reason: &str) {
        self.lock().fail_next_capture = Some(reason.to_string());
    }

    /// Drop the next capture reply without completing it.
    pub fn drop_next_capture(&self) {
        self.lock().drop_next_capture = true;
    }

    /// Mirror front-camera photos regardless of the capture connection.
    pub fn set_ignore_capture_mirroring(&self, enabled: bool) {
        self.lock().ignore_capture_mirroring = enabled;
    }

    /// Orientation tag of photos as stored by the sensor.
    pub fn set_sensor_orientation(&self, orientation: Orientation) {
        self.lock().sensor_orientation = orientation;
    }

    /// Deliver capture results from a separate thread after `delay`.
    pub fn set_completion_delay(&self, delay: Option<Duration>) {
        self.lock().completion_delay = delay;
    }

    /// Size of the upright synthetic scene.
    pub fn set_scene_size(&self, width: u32, height: u32) {
        let mut state = self.lock();
        state.scene_width = width;
        state.scene_height = height;
    }

    /// Call counters so far.
    pub fn stats(&self) -> MockStats {
        self.lock().stats.clone()
    }

    /// Inputs currently attached to the hardware.
    pub fn attached_inputs(&self) -> Vec<DeviceInput> {
        self.lock().inputs.clone()
    }

    /// Number of attached photo outputs.
    pub fn output_count(&self) -> usize {
        self.lock().outputs.len()
    }

    /// Whether the hardware is running.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Settings last applied to the preview connection.
    pub fn preview_connection(&self) -> Option<ConnectionSettings> {
        self.lock().preview
    }

    /// Settings last applied to the capture connection.
    pub fn capture_connection(&self) -> Option<ConnectionSettings> {
        self.lock().capture
    }

    /// Position of the attached camera at each capture, in order.
    pub fn capture_log(&self) -> Vec<Position> {
        self.lock().capture_log.clone()
    }

    /// Upright scene the mock photographs.
    pub fn scene(width: u32, height: u32) -> Frame {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 0xAB]);
            }
        }
        Frame::new(pixels, width, height, PixelFormat::Rgb8)
    }
}

impl SessionBackend for MockBackend {
    fn begin_configuration(&mut self) {
        self.lock().stats.begin_calls += 1;
    }

    fn commit_configuration(&mut self) -> Result<(), HardwareError> {
        let mut state = self.lock();
        state.stats.commit_calls += 1;
        match state.fail_next_commit.take() {
            Some(reason) => Err(HardwareError::CommitFailed(reason)),
            None => Ok(()),
        }
    }

    fn can_add_input(&self, input: &DeviceInput) -> bool {
        let state = self.lock();
        if state.inputs.iter().any(|i| i.same_device(input)) {
            return false;
        }
        !(state.single_input_only && !state.inputs.is_empty())
    }

    fn add_input(&mut self, input: &DeviceInput) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if state.failing_inputs.contains(&input.device_id) {
            return Err(HardwareError::InputRejected(format!(
                "{} refused to bind",
                input.device_id
            )));
        }
        state.inputs.push(input.clone());
        state.stats.inputs_attached += 1;
        Ok(())
    }

    fn remove_input(&mut self, input: &DeviceInput) {
        let mut state = self.lock();
        let before = state.inputs.len();
        state.inputs.retain(|i| !i.same_device(input));
        if state.inputs.len() != before {
            state.stats.inputs_removed += 1;
        }
    }

    fn add_output(&mut self, output: &PhotoOutput) -> Result<(), HardwareError> {
        let mut state = self.lock();
        if !state.outputs.is_empty() {
            return Err(HardwareError::OutputRejected(
                "photo output already attached".into(),
            ));
        }
        state.outputs.push(output.clone());
        state.stats.outputs_attached += 1;
        Ok(())
    }

    fn remove_output(&mut self, output: &PhotoOutput) {
        self.lock().outputs.retain(|o| o != output);
    }

    fn configure_connection(&mut self, kind: ConnectionKind, settings: ConnectionSettings) {
        let mut state = self.lock();
        match kind {
            ConnectionKind::Preview => state.preview = Some(settings),
            ConnectionKind::Capture => state.capture = Some(settings),
        }
    }

    fn start_running(&mut self) -> Result<(), HardwareError> {
        let mut state = self.lock();
        state.stats.start_calls += 1;
        if let Some(reason) = state.fail_next_start.take() {
            return Err(HardwareError::StartFailed(reason));
        }
        state.running = true;
        Ok(())
    }

    fn stop_running(&mut self) {
        let mut state = self.lock();
        state.stats.stop_calls += 1;
        state.running = false;
    }

    fn capture_photo(&mut self, _settings: &CaptureSettings, reply: PhotoReply) {
        let (result, delay) = {
            let mut state = self.lock();
            state.stats.captures += 1;

            if state.drop_next_capture {
                state.drop_next_capture = false;
                return;
            }

            let result = if let Some(reason) = state.fail_next_capture.take() {
                Err(HardwareError::CaptureFailed(reason))
            } else if let Some(input) = state.inputs.last().cloned() {
                state.capture_log.push(input.position);
                let mirrored_by_hardware = input.position == Position::Front
                    && (state.ignore_capture_mirroring
                        || state.capture.map(|c| c.mirrored).unwrap_or(false));
                let tag = if mirrored_by_hardware {
                    state.sensor_orientation.mirrored()
                } else {
                    state.sensor_orientation
                };
                let scene = Self::scene(state.scene_width, state.scene_height);
                Ok(RawPhoto::new(reorient(&scene, tag), tag))
            } else {
                Err(HardwareError::CaptureFailed("no input attached".into()))
            };
            (result, state.completion_delay)
        };

        match delay {
            Some(delay) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    reply.complete(result);
                });
            }
            None => reply.complete(result),
        }
    }
}

#[derive(Debug, Default)]
struct DiscoveryState {
    devices: Vec<DeviceInput>,
    broken: HashSet<DeviceId>,
    resolve_calls: u64,
}

/// Device discovery over a fixed, editable list of cameras.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    inner: Arc<Mutex<DiscoveryState>>,
}

impl StaticDiscovery {
    /// Discovery over the given devices.
    pub fn new(devices: Vec<DeviceInput>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DiscoveryState {
                devices,
                ..Default::default()
            })),
        }
    }

    /// A back camera `back-0` and a front camera `front-0`.
    pub fn front_and_back() -> Self {
        Self::new(vec![
            DeviceInput::new("back-0", Position::Back, "Back Camera"),
            DeviceInput::new("front-0", Position::Front, "Front Camera"),
        ])
    }

    fn lock(&self) -> MutexGuard<'_, DiscoveryState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Forget every device at `position`.
    pub fn remove_position(&self, position: Position) {
        self.lock().devices.retain(|d| d.position != position);
    }

    /// Adds a device.
    pub fn insert(&self, device: DeviceInput) {
        self.lock().devices.push(device);
    }

    /// Report a fault when resolving the given device.
    pub fn mark_broken(&self, device_id: &DeviceId) {
        self.lock().broken.insert(device_id.clone());
    }

    /// Number of times discovery was consulted.
    pub fn resolve_calls(&self) -> u64 {
        self.lock().resolve_calls
    }
}

impl DeviceDiscovery for StaticDiscovery {
    fn resolve(&mut self, position: Position) -> Result<Option<DeviceInput>, HardwareError> {
        let mut state = self.lock();
        state.resolve_calls += 1;

        let Some(device) = state.devices.iter().find(|d| d.position == position).cloned() else {
            return Ok(None);
        };
        if state.broken.contains(&device.device_id) {
            return Err(HardwareError::DeviceFault(format!(
                "{} could not be opened",
                device.device_id
            )));
        }
        Ok(Some(device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::normalize;

    #[test]
    fn test_mock_lifecycle() {
        let mut backend = MockBackend::new();
        let input = DeviceInput::new("back-0", Position::Back, "Back");

        backend.begin_configuration();
        backend.add_input(&input).unwrap();
        backend.commit_configuration().unwrap();
        backend.start_running().unwrap();
        assert!(backend.is_running());
        assert_eq!(backend.attached_inputs(), vec![input.clone()]);

        backend.stop_running();
        assert!(!backend.is_running());
        backend.remove_input(&input);
        assert!(backend.attached_inputs().is_empty());
        assert_eq!(backend.stats().inputs_removed, 1);
    }

    #[test]
    fn test_capture_without_input() {
        let mut backend = MockBackend::new();
        let (reply, mut rx) = PhotoReply::channel(1);
        backend.capture_photo(&CaptureSettings::default(), reply);

        assert!(matches!(
            rx.try_recv().unwrap(),
            Err(HardwareError::CaptureFailed(_))
        ));
    }

    #[test]
    fn test_photo_is_stored_in_sensor_orientation() {
        let mut backend = MockBackend::new();
        backend.set_scene_size(4, 2);
        backend
            .add_input(&DeviceInput::new("back-0", Position::Back, "Back"))
            .unwrap();

        let (reply, mut rx) = PhotoReply::channel(1);
        backend.capture_photo(&CaptureSettings::default(), reply);
        let raw = rx.try_recv().unwrap().unwrap();

        assert_eq!(raw.orientation, Orientation::Right);
        assert_eq!((raw.frame.width(), raw.frame.height()), (2, 4));
        assert_eq!(normalize(&raw.frame, raw.orientation), MockBackend::scene(4, 2));
    }

    #[test]
    fn test_discovery_outcomes() {
        let mut discovery = StaticDiscovery::front_and_back();
        assert_eq!(
            discovery.resolve(Position::Front).unwrap().unwrap().device_id,
            DeviceId::new("front-0")
        );

        discovery.mark_broken(&DeviceId::new("front-0"));
        assert!(discovery.resolve(Position::Front).is_err());

        discovery.remove_position(Position::Front);
        assert!(discovery.resolve(Position::Front).unwrap().is_none());
        assert_eq!(discovery.resolve_calls(), 3);
    }
}
