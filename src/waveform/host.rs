//! Binds the waveform surface to the controller.
//!
//! The host decides each frame whether the live or the recorded waveform is
//! shown, keeps the live compositor's state across frames, and turns pointer
//! input into hover markers and seeks.

use super::blob::{draw_blob, BlobFrame};
use super::live::{draw_live_stream, LiveFrame, LiveStreamRenderState};
use super::surface::{paint_bar, reset_surface, Bar, CommandSurface, Surface};
use crate::config::VisualizerConfig;
use crate::recording::Controller;

/// Width of the progress and hover markers, in pixels.
const MARKER_WIDTH: f64 = 1.0;

/// Which compositor drew the last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Live,
    Processing,
    Blob,
}

pub struct WaveformHost {
    config: VisualizerConfig,
    surface: CommandSurface,
    live: LiveStreamRenderState,
    mode: Mode,
    hover_x: Option<f64>,
    duration: f64,
}

impl WaveformHost {
    pub fn new(config: VisualizerConfig, width: f64, height: f64) -> Self {
        Self {
            live: LiveStreamRenderState::new(&config),
            config,
            surface: CommandSurface::new(width, height),
            mode: Mode::Live,
            hover_x: None,
            duration: 0.0,
        }
    }

    pub fn surface(&self) -> &CommandSurface {
        &self.surface
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    /// Changes the surface size in pixels. The next frame redraws from scratch.
    pub fn resize(&mut self, width: f64, height: f64) {
        if width == self.surface.width() && height == self.surface.height() {
            return;
        }
        tracing::debug!("Waveform surface resized to {}x{}", width, height);
        self.surface.resize(width, height);
        self.hover_x = None;
    }

    /// Draws one frame for the controller's current state.
    pub fn render(&mut self, controller: &mut Controller) {
        let snapshot = controller.snapshot();
        self.duration = snapshot.total_duration;

        if snapshot.is_processing() {
            self.mode = Mode::Processing;
            reset_surface(&mut self.surface, self.config.background_color);
            return;
        }

        if snapshot.is_cleared && !snapshot.phase.is_capturing() {
            self.enter_blob_mode();
            draw_blob(
                &mut self.surface,
                &[],
                BlobFrame {
                    is_cleared: true,
                    ..BlobFrame::default()
                },
                &self.config,
            );
            return;
        }

        if snapshot.phase.is_capturing() || !controller.has_decoded() {
            if self.mode != Mode::Live {
                self.live.reset();
                self.mode = Mode::Live;
            }

            let has_data = !snapshot.live_amplitude.is_empty();
            if self.live.gate(self.config.speed, has_data) {
                draw_live_stream(
                    &mut self.surface,
                    &mut self.live,
                    LiveFrame {
                        amplitude: &snapshot.live_amplitude,
                        is_recording: snapshot.is_recording_in_progress(),
                        is_paused: snapshot.is_paused(),
                    },
                    &self.config,
                );
            }
            return;
        }

        self.enter_blob_mode();
        let bars = controller.bars(
            self.surface.width(),
            self.surface.height(),
            self.config.bar_width,
            self.config.gap,
        );
        draw_blob(
            &mut self.surface,
            &bars,
            BlobFrame {
                current_time: snapshot.current_playback_time,
                duration: snapshot.total_duration,
                is_cleared: false,
            },
            &self.config,
        );

        if self.config.progress_indicator {
            if let Some(x) = self.progress_x(snapshot.current_playback_time) {
                self.paint_marker(x);
            }
        }
        if self.config.hover_indicator {
            if let Some(x) = self.hover_x {
                self.paint_marker(x);
            }
        }
    }

    /// The recorded waveform is on screen.
    pub fn shows_recording(&self) -> bool {
        self.mode == Mode::Blob && self.duration > 0.0
    }

    pub fn pointer_moved(&mut self, x: f64) {
        self.hover_x = Some(x.clamp(0.0, self.surface.width()));
    }

    pub fn pointer_left(&mut self) {
        self.hover_x = None;
    }

    /// Seeks playback to the time under the pointer.
    pub fn pointer_clicked(&mut self, x: f64, controller: &mut Controller) {
        if let Some(time) = self.time_at(x) {
            tracing::debug!("Seeking to {:.2}s", time);
            controller.seek(time);
        }
    }

    /// Recording time under the pointer, when hovering a recorded waveform.
    pub fn hover_time(&self) -> Option<f64> {
        if !self.config.hover_time {
            return None;
        }
        self.hover_x.and_then(|x| self.time_at(x))
    }

    fn time_at(&self, x: f64) -> Option<f64> {
        let width = self.surface.width();
        if !self.shows_recording() || width <= 0.0 {
            return None;
        }
        Some((self.duration / width * x).clamp(0.0, self.duration))
    }

    fn progress_x(&self, current_time: f64) -> Option<f64> {
        if self.duration <= 0.0 {
            return None;
        }
        Some(current_time / self.duration * self.surface.width())
    }

    fn paint_marker(&mut self, x: f64) {
        let height = self.surface.height();
        paint_bar(
            &mut self.surface,
            Bar {
                x,
                y: 0.0,
                w: MARKER_WIDTH,
                h: height,
                color: self.config.main_color,
                rounded: 0.0,
            },
        );
    }

    fn enter_blob_mode(&mut self) {
        if self.mode != Mode::Blob {
            self.live.reset();
            self.mode = Mode::Blob;
        }
    }
}
