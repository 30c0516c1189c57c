// Waveform envelope: one mean-absolute amplitude per block, normalized to 0..=1
use std::sync::Arc;

use rayon::prelude::*;

use crate::audio::asset::AudioAsset;

/// Fixed-length normalized amplitude summary of an asset
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformEnvelope {
    values: Arc<[f32]>,
    duration: f64,
}

impl WaveformEnvelope {
    pub fn new(values: Vec<f32>, duration: f64) -> Self {
        Self {
            values: values.into(),
            duration,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    /// Duration of the source asset in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Smallest and largest values, `None` when empty
    pub fn extent(&self) -> Option<(f32, f32)> {
        let first = *self.values.first()?;
        Some(
            self.values
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }
}

/// Envelope with one block per sample-rate unit (`sample_rate` blocks in total)
pub fn analyze(asset: &AudioAsset) -> WaveformEnvelope {
    analyze_with_bins(asset, asset.sample_rate() as usize)
}

/// Envelope with `bins` blocks.
///
/// Block size is `floor(samples / bins)`. Trailing samples that do not fill a
/// block are ignored. If there are fewer samples than bins, each sample is its
/// own block and the remaining blocks are zero.
pub fn analyze_with_bins(asset: &AudioAsset, bins: usize) -> WaveformEnvelope {
    let samples = asset.channel_samples();
    let duration = asset.duration();
    if bins == 0 {
        return WaveformEnvelope::new(Vec::new(), duration);
    }

    let block_size = (samples.len() / bins).max(1);

    let mut means: Vec<f32> = (0..bins)
        .into_par_iter()
        .map(|i| {
            let start = i * block_size;
            if start >= samples.len() {
                return 0.0;
            }
            let end = (start + block_size).min(samples.len());
            let sum: f64 = samples[start..end].iter().map(|s| s.abs() as f64).sum();
            (sum / block_size as f64) as f32
        })
        .collect();

    let max = means.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 && max.is_finite() {
        let multiplier = max.recip();
        means.par_iter_mut().for_each(|v| *v = (*v * multiplier).min(1.0));
    } else {
        // Silent asset: stay at zero instead of dividing by zero
        means.iter_mut().for_each(|v| *v = 0.0);
    }

    WaveformEnvelope::new(means, duration)
}
