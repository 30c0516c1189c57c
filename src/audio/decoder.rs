// Audio decoder using Symphonia
// Decodes an in-memory payload to planar f32 samples

use std::io::Cursor;

use symphonia::core::audio::{AudioBufferRef, AudioPlanes, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::audio::asset::AudioAsset;
use crate::error::DecodeError;

/// Turns raw bytes into a decoded `AudioAsset`.
///
/// Implementations run synchronously; the controller moves them onto a
/// blocking worker.
pub trait AssetDecoder: Send + Sync {
    fn decode(&self, bytes: Vec<u8>) -> Result<AudioAsset, DecodeError>;
}

/// Default decoder backed by Symphonia's probe and codec registry
#[derive(Debug, Default, Clone)]
pub struct SymphoniaDecoder {
    extension_hint: Option<String>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hint the container format by file extension (e.g. "mp3")
    pub fn with_extension_hint(mut self, ext: impl Into<String>) -> Self {
        self.extension_hint = Some(ext.into());
        self
    }
}

impl AssetDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>) -> Result<AudioAsset, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = self.extension_hint.as_deref() {
            hint.with_extension(ext);
        }

        // Probe the media source
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut format = probed.format;

        // Find the first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channel_count = track.codec_params.channels.map(|c| c.count());

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let mut planes: Vec<Vec<f32>> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break; // End of stream
                }
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                Err(e) => return Err(DecodeError::Failed(e.to_string())),
            };

            // Skip packets from other tracks
            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    let channels = *channel_count.get_or_insert(spec.channels.count());
                    if planes.is_empty() {
                        planes = vec![Vec::new(); channels];
                    }
                    append_planar(&decoded, &mut planes);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packets are recoverable, keep going
                    log::warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(DecodeError::Failed(e.to_string())),
            }
        }

        let sample_rate = sample_rate.ok_or(DecodeError::NoSamples)?;
        if planes.first().map_or(true, Vec::is_empty) {
            return Err(DecodeError::NoSamples);
        }

        let asset = AudioAsset::from_planar(planes, sample_rate).ok_or(DecodeError::NoSamples)?;
        log::info!(
            "Decoded {} channel(s) at {} Hz, {:.2}s",
            asset.channel_count(),
            asset.sample_rate(),
            asset.duration()
        );
        Ok(asset)
    }
}

/// Append any `AudioBufferRef` to per-channel f32 vectors
fn append_planar(buf: &AudioBufferRef, out: &mut [Vec<f32>]) {
    match buf {
        AudioBufferRef::F32(b) => append_convert(b.planes(), b.frames(), out, |s: f32| s),
        AudioBufferRef::F64(b) => append_convert(b.planes(), b.frames(), out, |s: f64| s as f32),
        AudioBufferRef::S8(b) => {
            let scale = 1.0 / 128.0;
            append_convert(b.planes(), b.frames(), out, |s: i8| s as f32 * scale)
        }
        AudioBufferRef::S16(b) => {
            let scale = 1.0 / 32768.0;
            append_convert(b.planes(), b.frames(), out, |s: i16| s as f32 * scale)
        }
        AudioBufferRef::S24(b) => {
            let scale = 1.0 / 8388608.0;
            append_convert(b.planes(), b.frames(), out, |s| s.inner() as f32 * scale)
        }
        AudioBufferRef::S32(b) => {
            let scale = 1.0 / 2147483648.0;
            append_convert(b.planes(), b.frames(), out, |s: i32| s as f32 * scale)
        }
        AudioBufferRef::U8(b) => {
            append_convert(b.planes(), b.frames(), out, |s: u8| (s as f32 - 128.0) / 128.0)
        }
        AudioBufferRef::U16(b) => {
            append_convert(b.planes(), b.frames(), out, |s: u16| (s as f32 - 32768.0) / 32768.0)
        }
        AudioBufferRef::U24(b) => append_convert(b.planes(), b.frames(), out, |s| {
            (s.inner() as f32 - 8388608.0) / 8388608.0
        }),
        AudioBufferRef::U32(b) => append_convert(b.planes(), b.frames(), out, |s: u32| {
            (s as f64 - 2147483648.0) as f32 / 2147483648.0
        }),
    }
}

fn append_convert<T: Sample + Copy, F: Fn(T) -> f32>(
    planes: AudioPlanes<T>,
    frames: usize,
    out: &mut [Vec<f32>],
    convert: F,
) {
    // Channel layout changes mid-stream are ignored beyond the first layout
    for (plane, dest) in planes.planes().iter().zip(out.iter_mut()) {
        dest.extend(plane[..frames].iter().map(|&s| convert(s)));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let err = SymphoniaDecoder::new().decode(Vec::new()).unwrap_err();
        assert!(matches!(err, DecodeError::Empty));
    }

    #[test]
    fn test_garbage_payload_is_unsupported() {
        let err = SymphoniaDecoder::new().decode(vec![0x42; 512]).unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[test]
    fn test_decodes_mono_wav() {
        let samples: Vec<f32> = (0..8000).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let bytes = wav_bytes(&samples, 8000, 1);

        let asset = SymphoniaDecoder::new().with_extension_hint("wav").decode(bytes).unwrap();

        assert_eq!(asset.sample_rate(), 8000);
        assert_eq!(asset.channel_count(), 1);
        assert_eq!(asset.frames(), 8000);
        assert!((asset.duration() - 1.0).abs() < 1e-9);
        assert!((asset.channel_samples()[0] - 0.5).abs() < 1e-3);
        assert!((asset.channel_samples()[1] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decodes_stereo_wav_planar() {
        // Interleaved L/R: left constant 0.25, right constant -0.25
        let samples: Vec<f32> = (0..2000).flat_map(|_| [0.25, -0.25]).collect();
        let bytes = wav_bytes(&samples, 4000, 2);

        let asset = SymphoniaDecoder::new().decode(bytes).unwrap();

        assert_eq!(asset.channel_count(), 2);
        assert_eq!(asset.frames(), 2000);
        assert!(asset.channel(0).unwrap().iter().all(|s| (s - 0.25).abs() < 1e-3));
        assert!(asset.channel(1).unwrap().iter().all(|s| (s + 0.25).abs() < 1e-3));
    }
}
