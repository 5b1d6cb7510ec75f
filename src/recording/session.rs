//! Session data owned by the controller and the snapshot it publishes.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::RecorderError;

/// Discrete state of the recording/playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Paused,
    Stopping,
    Processing,
    Ready,
    Playing,
    PlaybackPaused,
    Errored,
}

impl Phase {
    /// A recording cycle owns the microphone (or is about to).
    pub fn is_capturing(self) -> bool {
        matches!(self, Phase::Acquiring | Phase::Recording | Phase::Paused)
    }

    /// A new recording may be started from this phase. Starting while the
    /// previous recording is still flushing or decoding supersedes it.
    pub fn can_start(self) -> bool {
        !self.is_capturing()
    }

    /// The finished recording is decoded and can be played.
    pub fn has_playback(self) -> bool {
        matches!(self, Phase::Ready | Phase::Playing | Phase::PlaybackPaused)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Idle => "idle",
            Phase::Acquiring => "acquiring",
            Phase::Recording => "recording",
            Phase::Paused => "paused",
            Phase::Stopping => "stopping",
            Phase::Processing => "processing",
            Phase::Ready => "ready",
            Phase::Playing => "playing",
            Phase::PlaybackPaused => "playback paused",
            Phase::Errored => "error",
        };
        f.write_str(label)
    }
}

/// Encoded audio produced when a recording stops, or supplied from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    pub bytes: Arc<[u8]>,
    pub mime_type: String,
}

impl RecordedAudio {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Mono PCM decoded from [`RecordedAudio`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Samples of the first channel in `[-1.0, 1.0]`.
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Length of the audio in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Mutable session state. Only the controller touches it.
#[derive(Debug)]
pub(crate) struct RecordingSession {
    pub phase: Phase,
    pub elapsed_recording_time: Duration,
    pub segment_started_at: Option<Instant>,
    pub live_amplitude: Arc<[u8]>,
    pub recorded_data: Option<RecordedAudio>,
    pub decoded: Option<DecodedAudio>,
    pub current_playback_time: f64,
    pub total_duration: f64,
    pub last_error: Option<RecorderError>,
    pub is_cleared: bool,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            elapsed_recording_time: Duration::ZERO,
            segment_started_at: None,
            live_amplitude: Arc::from(Vec::new()),
            recorded_data: None,
            decoded: None,
            current_playback_time: 0.0,
            total_duration: 0.0,
            last_error: None,
            is_cleared: false,
        }
    }
}

impl RecordingSession {
    /// Drops everything derived from a previous cycle.
    pub fn reset_transient(&mut self) {
        self.elapsed_recording_time = Duration::ZERO;
        self.segment_started_at = None;
        self.live_amplitude = Arc::from(Vec::new());
        self.recorded_data = None;
        self.decoded = None;
        self.current_playback_time = 0.0;
        self.total_duration = 0.0;
    }

    /// Recording time including the running segment.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let running = self
            .segment_started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        self.elapsed_recording_time + running
    }
}

/// Immutable view of the session handed to the UI each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: Phase,
    /// Recording time excluding pauses, truncated to milliseconds.
    pub elapsed_recording_time: Duration,
    pub current_playback_time: f64,
    pub total_duration: f64,
    pub last_error: Option<RecorderError>,
    pub is_cleared: bool,
    pub live_amplitude: Arc<[u8]>,
    pub has_recorded_data: bool,
    pub mime_type: Option<String>,
}

impl SessionSnapshot {
    /// Recording is in progress, paused or not.
    pub fn is_recording_in_progress(&self) -> bool {
        matches!(self.phase, Phase::Recording | Phase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, Phase::Paused | Phase::PlaybackPaused)
    }

    /// The recorded data is being flushed or decoded.
    pub fn is_processing(&self) -> bool {
        matches!(self.phase, Phase::Stopping | Phase::Processing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_includes_running_segment() {
        let start = Instant::now();
        let session = RecordingSession {
            elapsed_recording_time: Duration::from_millis(700),
            segment_started_at: Some(start),
            ..RecordingSession::default()
        };

        assert_eq!(
            session.elapsed_at(start + Duration::from_millis(300)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_decoded_duration() {
        let audio = DecodedAudio::new(vec![0.0; 16_000], 8_000);
        assert!((audio.duration() - 2.0).abs() < f64::EPSILON);
        assert_eq!(DecodedAudio::new(vec![0.0; 10], 0).duration(), 0.0);
    }

    #[test]
    fn test_start_allowed_only_without_microphone() {
        assert!(Phase::Idle.can_start());
        assert!(Phase::Errored.can_start());
        assert!(Phase::Playing.can_start());
        assert!(Phase::Processing.can_start());
        assert!(!Phase::Acquiring.can_start());
        assert!(!Phase::Recording.can_start());
        assert!(!Phase::Paused.can_start());
    }
}
