//! Reduces a decoded recording to a fixed number of min/max bars.

/// Amplitude envelope of one downsampling bucket, in surface pixels once
/// normalized (raw sample units otherwise).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BarData {
    pub max: f32,
    pub min: f32,
}

/// Fraction of the half height the loudest bar is boosted to.
const TARGET_PEAK_RATIO: f32 = 0.8;

/// Computes the bar envelope of `samples` for a surface of the given size.
///
/// Produces `floor(width / (bar_width + gap))` bars. Each bucket's `max` is the
/// mean of its positive samples and `min` the mean of the rest; an empty side
/// counts as silence. When the loudest bucket would render below 80% of the
/// half height, every bar is scaled by the same factor so quiet recordings
/// stay visible. Loud recordings are never compressed.
pub fn bars_from_samples(
    samples: &[f32],
    height: f64,
    width: f64,
    bar_width: f64,
    gap: f64,
) -> Vec<BarData> {
    let pitch = bar_width + gap;
    if samples.is_empty() || pitch <= 0.0 || width <= 0.0 {
        return Vec::new();
    }

    let units = (width / pitch).floor() as usize;
    if units == 0 {
        return Vec::new();
    }

    let step = (samples.len() / units).max(1);
    let amp = (height / 2.0) as f32;

    let mut peak = 0.0f32;
    let mut bars: Vec<BarData> = (0..units)
        .map(|i| {
            let start = (i * step).min(samples.len());
            let end = (start + step).min(samples.len());
            let bar = bucket_envelope(&samples[start..end]);

            peak = peak.max(bar.max).max(bar.min.abs());
            bar
        })
        .collect();

    if peak > 0.0 && amp * TARGET_PEAK_RATIO > peak * amp {
        let factor = (amp * TARGET_PEAK_RATIO) / peak;
        tracing::trace!("Boosting quiet waveform by {:.2}", factor);
        for bar in &mut bars {
            bar.max *= factor;
            bar.min *= factor;
        }
    }

    bars
}

fn bucket_envelope(bucket: &[f32]) -> BarData {
    let (mut pos_sum, mut pos_count) = (0.0f32, 0usize);
    let (mut neg_sum, mut neg_count) = (0.0f32, 0usize);

    for &sample in bucket {
        if sample > 0.0 {
            pos_sum += sample;
            pos_count += 1;
        } else {
            neg_sum += sample;
            neg_count += 1;
        }
    }

    let mean = |sum: f32, count: usize| if count == 0 { 0.0 } else { sum / count as f32 };

    BarData {
        max: mean(pos_sum, pos_count),
        min: mean(neg_sum, neg_count),
    }
}
