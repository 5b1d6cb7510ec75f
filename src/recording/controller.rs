//! Recording/playback state machine.
//!
//! The controller owns the session and coordinates the microphone, the
//! decoder and the playback output. Everything runs on the control thread
//! except device acquisition, flushing and decoding, which run on blocking
//! workers and report back through the pipeline channel. Each event carries
//! the generation of the cycle that spawned it; a newer `start_recording`,
//! `set_recorded_audio` or `clear_canvas` makes older events stale.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::audio::{CaptureStream, Microphone};
use super::decode::AudioDecoder;
use super::error::RecorderError;
use super::export::save_recording;
use super::playback::PlaybackOutput;
use super::scheduler::{Clock, FrameHandle, FrameScheduler, FrameTask};
use super::session::{DecodedAudio, Phase, RecordedAudio, RecordingSession, SessionSnapshot};
use crate::waveform::downsample::{bars_from_samples, BarData};

/// Interval at which the running segment is folded into the accumulator.
const ELAPSED_FOLD_INTERVAL: Duration = Duration::from_secs(1);

/// Completion of a blocking pipeline stage.
enum PipelineEvent {
    Acquired {
        generation: u64,
        result: Result<Box<dyn CaptureStream>, RecorderError>,
    },
    Flushed {
        generation: u64,
        result: Result<RecordedAudio, RecorderError>,
    },
    Decoded {
        generation: u64,
        result: Result<DecodedAudio, RecorderError>,
    },
}

/// Cache key of the last computed bar sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BarsKey {
    decode_generation: u64,
    width: u64,
    height: u64,
    bar_width: u16,
    gap: u16,
}

/// Drives one recording session at a time.
pub struct Controller {
    session: RecordingSession,
    microphone: Arc<dyn Microphone>,
    decoder: Arc<dyn AudioDecoder>,
    output: Box<dyn PlaybackOutput>,
    frames: Box<dyn FrameScheduler>,
    clock: Arc<dyn Clock>,
    capture: Option<Box<dyn CaptureStream>>,
    sample_task: Option<FrameHandle>,
    playback_task: Option<FrameHandle>,
    generation: u64,
    decode_generation: u64,
    events_tx: mpsc::UnboundedSender<PipelineEvent>,
    events_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    amplitude_buf: Vec<u8>,
    bars_cache: Option<(BarsKey, Arc<[BarData]>)>,
}

impl Controller {
    /// Creates an idle controller. Must be called inside a tokio runtime
    /// before any operation that spawns pipeline work.
    pub fn new(
        microphone: Arc<dyn Microphone>,
        decoder: Arc<dyn AudioDecoder>,
        output: Box<dyn PlaybackOutput>,
        frames: Box<dyn FrameScheduler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: RecordingSession::default(),
            microphone,
            decoder,
            output,
            frames,
            clock,
            capture: None,
            sample_task: None,
            playback_task: None,
            generation: 0,
            decode_generation: 0,
            events_tx,
            events_rx,
            amplitude_buf: Vec::new(),
            bars_cache: None,
        }
    }

    /// Current state for the UI.
    pub fn snapshot(&self) -> SessionSnapshot {
        let elapsed = self.session.elapsed_at(self.clock.now());
        SessionSnapshot {
            phase: self.session.phase,
            elapsed_recording_time: Duration::from_millis(elapsed.as_millis() as u64),
            current_playback_time: self.session.current_playback_time,
            total_duration: self.session.total_duration,
            last_error: self.session.last_error.clone(),
            is_cleared: self.session.is_cleared,
            live_amplitude: Arc::clone(&self.session.live_amplitude),
            has_recorded_data: self.session.recorded_data.is_some(),
            mime_type: self
                .session
                .recorded_data
                .as_ref()
                .map(|audio| audio.mime_type.clone()),
        }
    }

    /// Whether decoded audio is available for the blob waveform.
    pub fn has_decoded(&self) -> bool {
        self.session.decoded.is_some()
    }

    /// Requests microphone access and starts a fresh recording cycle.
    pub fn start_recording(&mut self) {
        if !self.session.phase.can_start() {
            tracing::debug!("Start ignored while {}", self.session.phase);
            return;
        }

        self.cancel_sampling();
        self.cancel_playback_loop();
        self.output.pause();
        self.release_capture();

        self.generation += 1;
        self.session.reset_transient();
        self.session.phase = Phase::Acquiring;
        self.session.last_error = None;
        self.session.is_cleared = false;
        self.bars_cache = None;

        let generation = self.generation;
        let microphone = Arc::clone(&self.microphone);
        let events = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = microphone.acquire();
            let _ = events.send(PipelineEvent::Acquired { generation, result });
        });
        tracing::info!("Requesting microphone");
    }

    /// Pauses or resumes the recording, or toggles playback when no
    /// recording is in progress.
    pub fn toggle_pause_resume(&mut self) {
        match self.session.phase {
            Phase::Recording => self.pause_recording(),
            Phase::Paused => self.resume_recording(),
            Phase::Ready | Phase::PlaybackPaused => self.play(),
            Phase::Playing => self.pause_playback(),
            phase => tracing::debug!("Pause/resume ignored while {}", phase),
        }
    }

    /// Stops the recording, releases the microphone and starts flushing.
    pub fn stop_recording(&mut self) {
        if !matches!(self.session.phase, Phase::Recording | Phase::Paused) {
            tracing::debug!("Stop ignored while {}", self.session.phase);
            return;
        }

        self.cancel_sampling();
        self.fold_segment();

        let Some(mut capture) = self.capture.take() else {
            self.session.phase = Phase::Idle;
            return;
        };
        capture.release();
        self.session.phase = Phase::Stopping;

        let generation = self.generation;
        let events = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = capture.finish();
            let _ = events.send(PipelineEvent::Flushed { generation, result });
        });
        tracing::info!(
            "Recording stopped after {} ms",
            self.session.elapsed_recording_time.as_millis()
        );
    }

    /// Binds externally supplied recorded data, superseding any cycle.
    pub fn set_recorded_audio(&mut self, audio: RecordedAudio) {
        self.cancel_sampling();
        self.cancel_playback_loop();
        self.output.pause();
        self.release_capture();

        self.generation += 1;
        self.session.reset_transient();
        self.session.last_error = None;
        self.session.is_cleared = false;
        self.bars_cache = None;

        tracing::info!(
            "Loading {} bytes of {}",
            audio.bytes.len(),
            audio.mime_type
        );
        self.begin_decode(audio);
    }

    /// Writes the recorded data into `directory`. `Ok(None)` when there is
    /// nothing to save.
    pub fn save_audio_file(&mut self, directory: &Path) -> Result<Option<PathBuf>, RecorderError> {
        let Some(audio) = self.session.recorded_data.as_ref() else {
            tracing::debug!("Save ignored: no recorded data");
            return Ok(None);
        };

        match save_recording(audio, directory) {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                let error = RecorderError::from(e);
                tracing::error!("{}", error);
                self.session.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Resets everything to idle and marks the output cleared.
    pub fn clear_canvas(&mut self) {
        self.release_all();
        self.session.reset_transient();
        self.session.phase = Phase::Idle;
        self.session.last_error = None;
        self.session.is_cleared = true;
        tracing::debug!("Canvas cleared");
    }

    /// Moves the playback position, clamped to the recording.
    pub fn seek(&mut self, seconds: f64) {
        if !self.session.phase.has_playback() {
            return;
        }
        let target = seconds.clamp(0.0, self.session.total_duration.max(0.0));
        self.output.seek(target);
        self.session.current_playback_time = target;
    }

    /// Releases loops, capture and playback unconditionally.
    pub fn dispose(&mut self) {
        self.release_all();
        let phase = self.session.phase;
        if phase.is_capturing()
            || matches!(phase, Phase::Stopping | Phase::Processing | Phase::Playing)
        {
            self.session.phase = Phase::Idle;
        }
    }

    /// Bars of the decoded recording for a surface of the given size.
    /// Recomputed only when the recording or the geometry changes.
    pub fn bars(&mut self, width: f64, height: f64, bar_width: u16, gap: u16) -> Arc<[BarData]> {
        let Some(decoded) = self.session.decoded.as_ref() else {
            return Arc::from(Vec::new());
        };

        let key = BarsKey {
            decode_generation: self.decode_generation,
            width: width.to_bits(),
            height: height.to_bits(),
            bar_width,
            gap,
        };
        if let Some((cached, bars)) = &self.bars_cache {
            if *cached == key {
                return Arc::clone(bars);
            }
        }

        let bars: Arc<[BarData]> = bars_from_samples(
            &decoded.samples,
            height,
            width,
            f64::from(bar_width),
            f64::from(gap),
        )
        .into();
        tracing::trace!("Computed {} bars for {}x{}", bars.len(), width, height);
        self.bars_cache = Some((key, Arc::clone(&bars)));
        bars
    }

    /// Runs one refresh: pipeline completions, the elapsed timer, then due
    /// frame tasks.
    pub fn tick(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }

        self.fold_elapsed_timer();

        for (handle, task) in self.frames.take_due() {
            self.run_frame_task(handle, task);
        }
    }

    /// Waits for the next pipeline completion and applies it.
    #[cfg(test)]
    pub(crate) async fn process_next_event(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::Acquired { generation, result } => {
                self.on_acquired(generation, result)
            }
            PipelineEvent::Flushed { generation, result } => self.on_flushed(generation, result),
            PipelineEvent::Decoded { generation, result } => self.on_decoded(generation, result),
        }
    }

    fn on_acquired(
        &mut self,
        generation: u64,
        result: Result<Box<dyn CaptureStream>, RecorderError>,
    ) {
        if generation != self.generation || self.session.phase != Phase::Acquiring {
            if let Ok(mut capture) = result {
                tracing::debug!("Releasing microphone acquired for a superseded recording");
                capture.release();
            }
            return;
        }

        match result {
            Ok(capture) => {
                tracing::info!("Recording started ({})", capture.mime_type());
                self.capture = Some(capture);
                self.session.phase = Phase::Recording;
                self.session.segment_started_at = Some(self.clock.now());
                self.schedule_sampling();
            }
            Err(error) => {
                tracing::error!("{}", error);
                self.session.phase = Phase::Errored;
                self.session.last_error = Some(error);
            }
        }
    }

    fn on_flushed(&mut self, generation: u64, result: Result<RecordedAudio, RecorderError>) {
        if generation != self.generation || self.session.phase != Phase::Stopping {
            tracing::debug!("Dropping flushed data of a superseded recording");
            return;
        }

        match result {
            Ok(audio) => self.begin_decode(audio),
            Err(error) => {
                tracing::error!("{}", error);
                self.session.reset_transient();
                self.session.phase = Phase::Errored;
                self.session.last_error = Some(error);
            }
        }
    }

    fn on_decoded(&mut self, generation: u64, result: Result<DecodedAudio, RecorderError>) {
        if generation != self.generation || self.session.phase != Phase::Processing {
            tracing::debug!("Dropping stale decode result");
            return;
        }

        match result {
            Ok(decoded) => {
                self.decode_generation += 1;
                self.bars_cache = None;
                self.session.total_duration = decoded.duration();
                self.session.current_playback_time = 0.0;
                if let Err(error) = self.output.load(&decoded) {
                    tracing::error!("{}", error);
                    self.session.last_error = Some(error);
                }
                tracing::info!("Recording ready: {:.2}s", self.session.total_duration);
                self.session.decoded = Some(decoded);
                self.session.phase = Phase::Ready;
            }
            Err(error) => {
                tracing::error!("{}", error);
                self.session.recorded_data = None;
                self.session.decoded = None;
                self.session.total_duration = 0.0;
                self.session.phase = Phase::Errored;
                self.session.last_error = Some(error);
            }
        }
    }

    fn begin_decode(&mut self, audio: RecordedAudio) {
        self.session.recorded_data = Some(audio.clone());
        self.session.phase = Phase::Processing;

        let generation = self.generation;
        let decoder = Arc::clone(&self.decoder);
        let events = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = decoder.decode(&audio);
            let _ = events.send(PipelineEvent::Decoded { generation, result });
        });
    }

    fn pause_recording(&mut self) {
        self.fold_segment();
        self.cancel_sampling();
        if let Some(capture) = self.capture.as_mut() {
            capture.pause();
        }
        self.session.phase = Phase::Paused;
    }

    fn resume_recording(&mut self) {
        self.session.segment_started_at = Some(self.clock.now());
        if let Some(capture) = self.capture.as_mut() {
            capture.resume();
        }
        self.session.phase = Phase::Recording;
        self.schedule_sampling();
    }

    fn play(&mut self) {
        if let Err(error) = self.output.play() {
            tracing::error!("{}", error);
            self.session.last_error = Some(error);
            return;
        }
        self.session.phase = Phase::Playing;
        self.cancel_playback_loop();
        self.playback_task = Some(self.frames.schedule(FrameTask::PlaybackPosition));
    }

    fn pause_playback(&mut self) {
        self.output.pause();
        self.cancel_playback_loop();
        self.session.current_playback_time = self.output.position();
        self.session.phase = Phase::PlaybackPaused;
    }

    fn run_frame_task(&mut self, handle: FrameHandle, task: FrameTask) {
        match task {
            FrameTask::Sample if self.sample_task == Some(handle) => {
                self.sample_task = None;
                self.sample();
            }
            FrameTask::PlaybackPosition if self.playback_task == Some(handle) => {
                self.playback_task = None;
                self.poll_playback();
            }
            _ => tracing::trace!("Skipping cancelled frame task {:?}", task),
        }
    }

    fn sample(&mut self) {
        if self.session.phase != Phase::Recording {
            return;
        }
        let Some(capture) = self.capture.as_ref() else {
            return;
        };

        capture.read_time_domain(&mut self.amplitude_buf);
        self.session.live_amplitude = Arc::from(self.amplitude_buf.as_slice());
        self.schedule_sampling();
    }

    fn poll_playback(&mut self) {
        if self.session.phase != Phase::Playing {
            return;
        }

        if self.output.is_ended() {
            self.output.seek(0.0);
            self.output.pause();
            self.session.current_playback_time = 0.0;
            self.session.phase = Phase::PlaybackPaused;
            tracing::debug!("Playback ended");
            return;
        }

        self.session.current_playback_time = self.output.position();
        self.playback_task = Some(self.frames.schedule(FrameTask::PlaybackPosition));
    }

    fn schedule_sampling(&mut self) {
        self.cancel_sampling();
        self.sample_task = Some(self.frames.schedule(FrameTask::Sample));
    }

    fn cancel_sampling(&mut self) {
        if let Some(handle) = self.sample_task.take() {
            self.frames.cancel(handle);
        }
    }

    fn cancel_playback_loop(&mut self) {
        if let Some(handle) = self.playback_task.take() {
            self.frames.cancel(handle);
        }
    }

    /// Adds the running segment to the accumulator and closes it.
    fn fold_segment(&mut self) {
        let now = self.clock.now();
        self.session.elapsed_recording_time = self.session.elapsed_at(now);
        self.session.segment_started_at = None;
    }

    fn fold_elapsed_timer(&mut self) {
        if self.session.phase != Phase::Recording {
            return;
        }
        let Some(started) = self.session.segment_started_at else {
            return;
        };

        let now = self.clock.now();
        if now.saturating_duration_since(started) >= ELAPSED_FOLD_INTERVAL {
            self.session.elapsed_recording_time = self.session.elapsed_at(now);
            self.session.segment_started_at = Some(now);
        }
    }

    fn release_capture(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.release();
        }
    }

    fn release_all(&mut self) {
        self.cancel_sampling();
        self.cancel_playback_loop();
        self.release_capture();
        self.output.stop();
        self.generation += 1;
        self.bars_cache = None;
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.dispose();
    }
}
