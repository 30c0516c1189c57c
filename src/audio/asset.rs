// Decoded audio held fully in memory
use std::sync::Arc;

/// Immutable decoded audio buffer.
///
/// Samples are stored planar (one `Vec` per channel). Channel 0 is the
/// representative channel used for waveform analysis; playback uses all of them.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    channels: Arc<[Vec<f32>]>,
    sample_rate: u32,
}

impl AudioAsset {
    /// Build an asset from planar channel data.
    ///
    /// Returns `None` if there are no channels, the channels differ in length,
    /// or the sample rate is zero.
    pub fn from_planar(channels: Vec<Vec<f32>>, sample_rate: u32) -> Option<Self> {
        if channels.is_empty() || sample_rate == 0 {
            return None;
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return None;
        }
        Some(Self {
            channels: channels.into(),
            sample_rate,
        })
    }

    /// Single-channel asset
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Option<Self> {
        Self::from_planar(vec![samples], sample_rate)
    }

    /// Representative channel used for visualization
    pub fn channel_samples(&self) -> &[f32] {
        &self.channels[0]
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame index for a time offset, clamped to the end of the asset
    pub fn frame_at(&self, seconds: f64) -> usize {
        let frame = (seconds.max(0.0) * self.sample_rate as f64).round() as usize;
        frame.min(self.frames())
    }

    /// Interleave frames `start..end` into `out`, upmixing or downmixing to
    /// `out_channels`.
    pub fn interleave_into(
        &self,
        start: usize,
        end: usize,
        out_channels: usize,
        out: &mut Vec<f32>,
    ) {
        let end = end.min(self.frames());
        if start >= end || out_channels == 0 {
            return;
        }
        out.reserve((end - start) * out_channels);
        for frame in start..end {
            mix_frame(|ch| self.channels[ch][frame], self.channels.len(), out_channels, out);
        }
    }
}

/// Push one frame of `src_channels` samples as `out_channels` samples.
///
/// Missing output channels repeat the last source channel. Surplus source
/// channels are averaged into the last output channel.
pub(crate) fn mix_frame(
    sample: impl Fn(usize) -> f32,
    src_channels: usize,
    out_channels: usize,
    out: &mut Vec<f32>,
) {
    if src_channels == 0 {
        return;
    }
    let last = out_channels.saturating_sub(1);
    for ch in 0..out_channels {
        if ch == last && src_channels > out_channels {
            let sum: f32 = (ch..src_channels).map(&sample).sum();
            out.push(sum / (src_channels - ch) as f32);
        } else {
            out.push(sample(ch.min(src_channels - 1)));
        }
    }
}
