//! Test doubles for the controller's seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::audio::{CaptureStream, Microphone};
use super::decode::{AudioDecoder, WAV_MIME_TYPE};
use super::error::RecorderError;
use super::playback::PlaybackOutput;
use super::scheduler::{Clock, FrameHandle, FrameLoop, FrameScheduler, FrameTask};
use super::session::{DecodedAudio, RecordedAudio};

/// What the fake capture was asked to do.
#[derive(Debug, Clone, Default)]
pub struct CaptureLog {
    pub paused: bool,
    pub released: bool,
    pub finished: bool,
}

pub struct FakeMicrophone {
    rejecting: AtomicBool,
    amplitude: Vec<u8>,
    acquisitions: AtomicUsize,
    log: Arc<Mutex<CaptureLog>>,
}

impl FakeMicrophone {
    pub fn accepting(amplitude: Vec<u8>) -> Self {
        Self {
            rejecting: AtomicBool::new(false),
            amplitude,
            acquisitions: AtomicUsize::new(0),
            log: Arc::default(),
        }
    }

    pub fn rejecting() -> Self {
        let microphone = Self::accepting(vec![128; 4]);
        microphone.set_rejecting(true);
        microphone
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> CaptureLog {
        self.log.lock().unwrap().clone()
    }

    /// Bytes every fake capture flushes.
    pub fn recorded_bytes(&self) -> Vec<u8> {
        b"RIFF fake wav".to_vec()
    }
}

impl Microphone for FakeMicrophone {
    fn acquire(&self) -> Result<Box<dyn CaptureStream>, RecorderError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(RecorderError::Acquisition("permission denied".to_string()));
        }

        *self.log.lock().unwrap() = CaptureLog::default();
        Ok(Box::new(FakeCapture {
            amplitude: self.amplitude.clone(),
            bytes: self.recorded_bytes(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeCapture {
    amplitude: Vec<u8>,
    bytes: Vec<u8>,
    log: Arc<Mutex<CaptureLog>>,
}

impl CaptureStream for FakeCapture {
    fn read_time_domain(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend_from_slice(&self.amplitude);
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().paused = true;
    }

    fn resume(&mut self) {
        self.log.lock().unwrap().paused = false;
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released = true;
    }

    fn finish(mut self: Box<Self>) -> Result<RecordedAudio, RecorderError> {
        self.release();
        self.log.lock().unwrap().finished = true;
        Ok(RecordedAudio::new(std::mem::take(&mut self.bytes), WAV_MIME_TYPE))
    }

    fn mime_type(&self) -> &str {
        WAV_MIME_TYPE
    }
}

pub struct FakeDecoder {
    decoded: DecodedAudio,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FakeDecoder {
    pub fn ok(decoded: DecodedAudio) -> Self {
        Self {
            decoded,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl AudioDecoder for FakeDecoder {
    fn decode(&self, _audio: &RecordedAudio) -> Result<DecodedAudio, RecorderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RecorderError::Decode("unsupported container".to_string()));
        }
        Ok(self.decoded.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackLog {
    pub loaded_duration: Option<f64>,
    pub playing: bool,
    pub stopped: bool,
    pub position: f64,
    pub ended: bool,
}

/// Playback output whose position the test moves by hand.
#[derive(Clone, Default)]
pub struct FakePlayback {
    log: Arc<Mutex<PlaybackLog>>,
}

impl FakePlayback {
    pub fn log(&self) -> PlaybackLog {
        self.log.lock().unwrap().clone()
    }

    pub fn set_position(&self, seconds: f64) {
        self.log.lock().unwrap().position = seconds;
    }

    /// Simulates the play head reaching the end.
    pub fn finish(&self) {
        let mut log = self.log.lock().unwrap();
        log.position = log.loaded_duration.unwrap_or_default();
        log.playing = false;
        log.ended = true;
    }
}

impl PlaybackOutput for FakePlayback {
    fn load(&mut self, audio: &DecodedAudio) -> Result<(), RecorderError> {
        let mut log = self.log.lock().unwrap();
        log.loaded_duration = Some(audio.duration());
        log.position = 0.0;
        log.stopped = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), RecorderError> {
        let mut log = self.log.lock().unwrap();
        log.playing = true;
        log.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().playing = false;
    }

    fn stop(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.playing = false;
        log.stopped = true;
        log.loaded_duration = None;
    }

    fn seek(&mut self, seconds: f64) {
        let mut log = self.log.lock().unwrap();
        log.position = seconds;
        log.ended = false;
    }

    fn position(&self) -> f64 {
        self.log.lock().unwrap().position
    }

    fn is_ended(&self) -> bool {
        self.log.lock().unwrap().ended
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Frame loop the test can inspect while the controller owns it.
#[derive(Clone, Default)]
pub struct SharedFrames {
    inner: Arc<Mutex<FrameLoop>>,
}

impl SharedFrames {
    pub fn pending(&self) -> usize {
        self.inner.lock().unwrap().pending()
    }
}

impl FrameScheduler for SharedFrames {
    fn schedule(&mut self, task: FrameTask) -> FrameHandle {
        self.inner.lock().unwrap().schedule(task)
    }

    fn cancel(&mut self, handle: FrameHandle) {
        self.inner.lock().unwrap().cancel(handle);
    }

    fn take_due(&mut self) -> Vec<(FrameHandle, FrameTask)> {
        self.inner.lock().unwrap().take_due()
    }
}
