//! Static waveform of a finished recording with a played/unplayed split.

use super::downsample::BarData;
use super::surface::{paint_bar, reset_surface, Bar, Surface};
use crate::config::VisualizerConfig;

/// Playback position used to color the bars.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobFrame {
    pub current_time: f64,
    pub duration: f64,
    /// Draw a flat baseline instead of the bars.
    pub is_cleared: bool,
}

impl BlobFrame {
    /// Proportion of the recording already played, `0.0` for empty recordings.
    pub fn played_fraction(&self) -> f64 {
        if self.duration > 0.0 && self.current_time.is_finite() {
            self.current_time / self.duration
        } else {
            0.0
        }
    }
}

/// Whether bar `index` of `count` falls in the played region.
pub fn is_played(index: usize, count: usize, played_fraction: f64) -> bool {
    count > 0 && played_fraction > index as f64 / count as f64
}

/// Draws the recorded waveform. Bars are only read, never modified.
pub fn draw_blob(
    surface: &mut dyn Surface,
    bars: &[BarData],
    frame: BlobFrame,
    config: &VisualizerConfig,
) {
    if !reset_surface(surface, config.background_color) {
        return;
    }

    let (width, height) = (surface.width(), surface.height());
    let rounded = f64::from(config.rounded);

    if frame.is_cleared {
        paint_bar(
            surface,
            Bar {
                x: 0.0,
                y: height / 2.0 - 1.0,
                w: width,
                h: 2.0,
                color: config.secondary_color,
                rounded,
            },
        );
        return;
    }

    let bar_width = f64::from(config.bar_width);
    let pitch = bar_width + f64::from(config.gap) * bar_width;
    let played_fraction = frame.played_fraction();

    for (i, bar) in bars.iter().enumerate() {
        let color = if is_played(i, bars.len(), played_fraction) {
            config.secondary_color
        } else {
            config.main_color
        };

        paint_bar(
            surface,
            Bar {
                x: i as f64 * pitch,
                y: height / 2.0 + f64::from(bar.min),
                w: bar_width,
                h: f64::from(bar.max - bar.min),
                color,
                rounded,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::downsample::bars_from_samples;
    use crate::waveform::surface::{CommandSurface, DrawOp};

    fn bars(count: usize) -> Vec<BarData> {
        (0..count)
            .map(|i| BarData {
                max: 2.0 + i as f32,
                min: -(1.0 + i as f32),
            })
            .collect()
    }

    fn colors(surface: &CommandSurface) -> Vec<crate::waveform::color::Color> {
        surface
            .rects()
            .map(|op| match op {
                DrawOp::Rect { color, .. } => *color,
                DrawOp::Clear => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_played_bars_are_a_contiguous_prefix() {
        for fraction in [0.0, 0.13, 0.5, 0.77, 1.0, 1.4] {
            let played: Vec<bool> = (0..25).map(|i| is_played(i, 25, fraction)).collect();
            let first_unplayed = played.iter().position(|p| !p).unwrap_or(played.len());
            assert!(played[first_unplayed..].iter().all(|p| !p), "fraction {fraction}");
        }
    }

    #[test]
    fn test_split_colors_follow_playback_time() {
        let config = VisualizerConfig::default();
        let mut surface = CommandSurface::new(100.0, 40.0);
        let frame = BlobFrame {
            current_time: 1.0,
            duration: 4.0,
            is_cleared: false,
        };
        draw_blob(&mut surface, &bars(8), frame, &config);

        let colors = colors(&surface);
        assert_eq!(colors.len(), 8);
        // 1/4 played: bars 0 and 1 (0/8 and 1/8 < 0.25)
        assert!(colors[..2].iter().all(|c| *c == config.secondary_color));
        assert!(colors[2..].iter().all(|c| *c == config.main_color));
    }

    #[test]
    fn test_bar_geometry() {
        let config = VisualizerConfig {
            bar_width: 2,
            gap: 1,
            rounded: 0,
            ..VisualizerConfig::default()
        };
        let mut surface = CommandSurface::new(100.0, 40.0);
        draw_blob(&mut surface, &bars(3), BlobFrame::default(), &config);

        let rect = surface.rects().nth(2).copied();
        assert_eq!(
            rect,
            Some(DrawOp::Rect {
                x: 8.0,
                y: 17.0,
                w: 2.0,
                h: 7.0,
                radius: 0.0,
                color: config.main_color,
            })
        );
    }

    #[test]
    fn test_default_pitch_runs_past_surface_edge() {
        let config = VisualizerConfig {
            rounded: 0,
            ..VisualizerConfig::default()
        };
        let data = bars_from_samples(&vec![0.25; 16_000], 40.0, 100.0, 2.0, 1.0);
        assert_eq!(data.len(), 33);

        let mut surface = CommandSurface::new(100.0, 40.0);
        draw_blob(&mut surface, &data, BlobFrame::default(), &config);

        let xs: Vec<f64> = surface
            .rects()
            .map(|op| match op {
                DrawOp::Rect { x, .. } => *x,
                DrawOp::Clear => unreachable!(),
            })
            .collect();
        assert_eq!(xs.len(), 33);
        assert_eq!(xs[1], 4.0);
        assert_eq!(xs[25], 100.0);
        assert_eq!(xs[32], 128.0);
    }

    #[test]
    fn test_cleared_draws_single_baseline() {
        let config = VisualizerConfig::default();
        let mut surface = CommandSurface::new(60.0, 20.0);
        let frame = BlobFrame {
            is_cleared: true,
            ..BlobFrame::default()
        };
        let data = bars(10);
        draw_blob(&mut surface, &data, frame, &config);

        assert_eq!(surface.rects().count(), 1);
        assert_eq!(data, bars(10));
    }

    #[test]
    fn test_zero_duration_plays_nothing() {
        let frame = BlobFrame {
            current_time: 3.0,
            duration: 0.0,
            is_cleared: false,
        };
        assert_eq!(frame.played_fraction(), 0.0);
    }
}
