//! Scrolling waveform drawn while the microphone is live.
//!
//! Every drawn frame advances a sub-frame cursor by one pixel of scroll. Once
//! per `bar_width` sub-frames a new slot enters the pick queue at the anchor:
//! a committed bar on the first slot of each bar pitch, an empty gap on the
//! others. This keeps the visual pitch (`bar_width + gap * bar_width`)
//! independent of how often amplitude snapshots arrive.

use std::collections::VecDeque;

use super::surface::{paint_bar, reset_surface, Bar, Surface};
use crate::config::VisualizerConfig;

/// Mid value of an unsigned time-domain amplitude byte (silence).
const AMPLITUDE_CENTER: f64 = 128.0;
/// Full range of an amplitude byte.
const AMPLITUDE_RANGE: f64 = 255.0;

/// Geometry of one committed live bar, as fractions of the surface height so
/// a resize rescales bars already on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickItem {
    pub start_y: f64,
    pub height: f64,
}

impl PickItem {
    /// Builds the bar for a time-domain snapshot whose loudest byte is `peak`.
    pub fn from_peak(peak: u8) -> Self {
        let half = ((peak as f64 - AMPLITUDE_CENTER).abs() / AMPLITUDE_RANGE).min(0.5);
        Self {
            start_y: 0.5 - half,
            height: half * 2.0,
        }
    }
}

/// Cursor and queue state carried from one live frame to the next.
#[derive(Debug, Clone)]
pub struct LiveStreamRenderState {
    speed_cursor: u32,
    sub_frame: u32,
    slot: u32,
    picks: VecDeque<Option<PickItem>>,
    bar_width: u32,
}

impl LiveStreamRenderState {
    pub fn new(config: &VisualizerConfig) -> Self {
        let bar_width = u32::from(config.bar_width.max(1));
        Self {
            speed_cursor: u32::from(config.speed),
            sub_frame: 0,
            slot: bar_width,
            picks: VecDeque::new(),
            bar_width,
        }
    }

    /// Decides whether this frame should be drawn, dividing the refresh rate
    /// by `speed`. Frames without amplitude data are always drawn.
    pub fn gate(&mut self, speed: u16, has_data: bool) -> bool {
        let draw = self.speed_cursor >= u32::from(speed) || !has_data;
        if draw {
            self.speed_cursor = 0;
        }
        self.speed_cursor += 1;
        draw
    }

    /// Slots currently queued, newest first. `None` entries are gaps.
    #[cfg(test)]
    pub fn picks(&self) -> &VecDeque<Option<PickItem>> {
        &self.picks
    }

    /// Drops every queued bar and rewinds the cursors.
    pub fn reset(&mut self) {
        self.picks.clear();
        self.sub_frame = 0;
        self.slot = self.bar_width;
    }
}

/// Inputs of one live frame.
#[derive(Debug, Clone, Copy)]
pub struct LiveFrame<'a> {
    /// Latest time-domain snapshot.
    pub amplitude: &'a [u8],
    /// A recording cycle is in progress (including paused).
    pub is_recording: bool,
    /// Capture is paused: the frame is redrawn but nothing scrolls.
    pub is_paused: bool,
}

/// Maximum number of queued slots for a surface of `width` pixels.
pub fn pick_capacity(width: f64, config: &VisualizerConfig) -> usize {
    let visible = if config.fullscreen { width } else { width / 2.0 };
    let bar_width = f64::from(config.bar_width.max(1));
    ((visible / bar_width).floor() as usize).max(1)
}

/// Draws one frame of the live waveform.
pub fn draw_live_stream(
    surface: &mut dyn Surface,
    state: &mut LiveStreamRenderState,
    frame: LiveFrame<'_>,
    config: &VisualizerConfig,
) {
    if !frame.is_recording && !config.idle_baseline {
        surface.clear();
        return;
    }

    if !reset_surface(surface, config.background_color) {
        return;
    }

    let (width, height) = (surface.width(), surface.height());
    let bar_width = f64::from(config.bar_width.max(1));
    let anchor = if config.fullscreen {
        width - bar_width
    } else {
        width / 2.0
    };

    paint_baseline(surface, config, anchor, width, height);

    if !frame.is_recording || frame.amplitude.is_empty() {
        return;
    }

    let peak = frame.amplitude.iter().copied().max().unwrap_or(128);

    if !frame.is_paused {
        advance(state, peak, pick_capacity(width, config), config);
    }

    if config.animate_current_pick {
        let current = PickItem::from_peak(peak);
        paint_bar(
            surface,
            Bar {
                x: anchor,
                y: current.start_y * height,
                w: bar_width,
                h: visible_height(current.height * height),
                color: config.main_color,
                rounded: f64::from(config.rounded),
            },
        );
    }

    let mut x = anchor - f64::from(state.sub_frame);
    for pick in state.picks.iter() {
        if let Some(pick) = pick {
            paint_bar(
                surface,
                Bar {
                    x,
                    y: pick.start_y * height,
                    w: bar_width,
                    h: visible_height(pick.height * height),
                    color: config.main_color,
                    rounded: f64::from(config.rounded),
                },
            );
        }
        x -= bar_width;
    }
}

fn advance(state: &mut LiveStreamRenderState, peak: u8, capacity: usize, config: &VisualizerConfig) {
    let bar_width = u32::from(config.bar_width.max(1));
    let unit = bar_width + u32::from(config.gap) * bar_width;

    if state.bar_width != bar_width {
        state.bar_width = bar_width;
        state.reset();
    }

    if state.sub_frame >= bar_width {
        state.sub_frame = 0;

        let slot = if state.slot == bar_width {
            Some(PickItem::from_peak(peak))
        } else {
            None
        };

        if state.slot >= unit {
            state.slot = bar_width;
        } else {
            state.slot += bar_width;
        }

        state.picks.push_front(slot);
        while state.picks.len() > capacity {
            state.picks.pop_back();
        }
    }

    state.sub_frame += 1;
}

/// Keeps silent bars one pixel tall so the waveform never disappears.
fn visible_height(height: f64) -> f64 {
    height.max(1.0)
}

fn paint_baseline(
    surface: &mut dyn Surface,
    config: &VisualizerConfig,
    anchor: f64,
    width: f64,
    height: f64,
) {
    let start = if config.fullscreen {
        0.0
    } else {
        anchor + f64::from(config.bar_width) / 2.0
    };

    paint_bar(
        surface,
        Bar {
            x: start,
            y: height / 2.0 - 1.0,
            w: width - start,
            h: 2.0,
            color: config.secondary_color,
            rounded: f64::from(config.rounded),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::color::Color;
    use crate::waveform::surface::{CommandSurface, DrawOp};

    fn config() -> VisualizerConfig {
        VisualizerConfig {
            bar_width: 2,
            gap: 1,
            animate_current_pick: false,
            ..VisualizerConfig::default()
        }
    }

    fn recording(amplitude: &[u8]) -> LiveFrame<'_> {
        LiveFrame {
            amplitude,
            is_recording: true,
            is_paused: false,
        }
    }

    #[test]
    fn test_first_pick_after_bar_width_frames() {
        let config = config();
        let mut surface = CommandSurface::new(40.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);
        let loud = [128u8, 200, 60];

        draw_live_stream(&mut surface, &mut state, recording(&loud), &config);
        draw_live_stream(&mut surface, &mut state, recording(&loud), &config);
        assert!(state.picks().is_empty());

        draw_live_stream(&mut surface, &mut state, recording(&loud), &config);
        assert_eq!(state.picks().len(), 1);
        assert!(state.picks()[0].is_some());
    }

    #[test]
    fn test_gap_slots_alternate_with_bars() {
        let config = config();
        let mut surface = CommandSurface::new(400.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);

        for _ in 0..(2 * 8 + 1) {
            draw_live_stream(&mut surface, &mut state, recording(&[220]), &config);
        }

        let pattern: Vec<bool> = state.picks().iter().map(Option::is_some).collect();
        // newest first: pick, gap, pick, gap...
        assert_eq!(pattern.len(), 8);
        for (i, is_pick) in pattern.iter().rev().enumerate() {
            assert_eq!(*is_pick, i % 2 == 0, "slot {i}");
        }
    }

    #[test]
    fn test_queue_never_exceeds_capacity() {
        let config = config();
        let mut surface = CommandSurface::new(20.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);
        let capacity = pick_capacity(20.0, &config);
        assert_eq!(capacity, 5);

        let mut previous = 0;
        for _ in 0..200 {
            draw_live_stream(&mut surface, &mut state, recording(&[180]), &config);
            let len = state.picks().len();
            assert!(len <= capacity);
            assert!(len == previous || len == previous + 1 || (len == capacity && previous == capacity));
            previous = len;
        }
        assert_eq!(previous, capacity);
    }

    #[test]
    fn test_fullscreen_doubles_capacity() {
        let config = VisualizerConfig {
            fullscreen: true,
            ..config()
        };
        assert_eq!(pick_capacity(20.0, &config), 10);
    }

    #[test]
    fn test_pause_freezes_scroll() {
        let config = config();
        let mut surface = CommandSurface::new(40.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);
        for _ in 0..5 {
            draw_live_stream(&mut surface, &mut state, recording(&[200]), &config);
        }
        let before = state.picks().clone();

        for _ in 0..10 {
            let frame = LiveFrame {
                is_paused: true,
                ..recording(&[250])
            };
            draw_live_stream(&mut surface, &mut state, frame, &config);
        }
        assert_eq!(state.picks(), &before);
    }

    #[test]
    fn test_pick_geometry_is_centered() {
        let loud = PickItem::from_peak(255);
        assert!((loud.start_y + loud.height / 2.0 - 0.5).abs() < 1e-9);
        assert!((loud.height - 254.0 / 255.0).abs() < 1e-9);

        let silent = PickItem::from_peak(128);
        assert_eq!(silent.height, 0.0);
        assert_eq!(silent.start_y, 0.5);
    }

    #[test]
    fn test_idle_without_baseline_only_clears() {
        let config = VisualizerConfig {
            idle_baseline: false,
            background_color: Color::Rgb(0, 0, 0),
            ..config()
        };
        let mut surface = CommandSurface::new(40.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);
        let frame = LiveFrame {
            amplitude: &[],
            is_recording: false,
            is_paused: false,
        };
        draw_live_stream(&mut surface, &mut state, frame, &config);
        assert_eq!(surface.ops(), &[DrawOp::Clear]);
    }

    #[test]
    fn test_idle_with_baseline_draws_center_line() {
        let config = config();
        let mut surface = CommandSurface::new(40.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);
        let frame = LiveFrame {
            amplitude: &[],
            is_recording: false,
            is_paused: false,
        };
        draw_live_stream(&mut surface, &mut state, frame, &config);

        let rects: Vec<_> = surface.rects().collect();
        assert_eq!(rects.len(), 1);
        match rects[0] {
            DrawOp::Rect { x, y, w, h, color, .. } => {
                assert_eq!(*x, 21.0);
                assert_eq!(*y, 9.0);
                assert_eq!(*w, 19.0);
                assert_eq!(*h, 2.0);
                assert_eq!(*color, config.secondary_color);
            }
            DrawOp::Clear => unreachable!(),
        }
    }

    #[test]
    fn test_current_pick_drawn_at_anchor() {
        let config = VisualizerConfig {
            animate_current_pick: true,
            ..config()
        };
        let mut surface = CommandSurface::new(40.0, 20.0);
        let mut state = LiveStreamRenderState::new(&config);
        draw_live_stream(&mut surface, &mut state, recording(&[255]), &config);

        let at_anchor = surface.rects().any(|op| {
            matches!(op, DrawOp::Rect { x, color, .. } if *x == 20.0 && *color == config.main_color)
        });
        assert!(at_anchor);
    }

    #[test]
    fn test_speed_gate_divides_frames() {
        let config = config();
        let mut state = LiveStreamRenderState::new(&config);
        let drawn: Vec<bool> = (0..7).map(|_| state.gate(3, true)).collect();
        assert_eq!(drawn, vec![true, false, false, true, false, false, true]);
        assert!(state.gate(3, false));
    }
}
