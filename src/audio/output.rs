// Audio output using cpal
// Each output path owns one cpal stream fed from a ring buffer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapRb,
};
use rubato::{FftFixedIn, Resampler};

use crate::audio::asset::{mix_frame, AudioAsset};
use crate::error::PlaybackError;

const RING_BUFFER_SIZE: usize = 48000 * 2 / 4; // ~250ms of stereo audio at 48kHz

/// Frames handed to the ring buffer (and resampler) per feed step
const FEED_CHUNK_FRAMES: usize = 1024;

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Stands up output paths bound to an asset
pub trait OutputBackend: Send + Sync {
    /// Start playing `asset` from `offset` seconds with the given gain
    fn open(
        &self,
        asset: Arc<AudioAsset>,
        offset: f64,
        gain: f32,
    ) -> Result<Box<dyn OutputPath>, PlaybackError>;
}

/// A live connection from a decoded buffer to the device.
///
/// Dropping a path tears it down.
pub trait OutputPath: Send {
    fn set_gain(&self, gain: f32);

    /// Whether the path has played out the rest of its asset
    fn is_finished(&self) -> bool {
        false
    }

    /// Disconnect from the device. Calling this more than once is a no-op.
    fn stop(&mut self);
}

/// Backend for the default cpal output device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OutputBackend for CpalBackend {
    fn open(
        &self,
        asset: Arc<AudioAsset>,
        offset: f64,
        gain: f32,
    ) -> Result<Box<dyn OutputPath>, PlaybackError> {
        Ok(Box::new(CpalPath::start(asset, offset, gain)?))
    }
}

/// One cpal stream plus the thread that feeds it.
///
/// cpal streams are not `Send`, so the stream is built and dropped on the
/// feeder thread; this handle only carries the shared controls.
pub struct CpalPath {
    volume: Arc<Mutex<f32>>,
    stop_flag: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CpalPath {
    fn start(asset: Arc<AudioAsset>, offset: f64, gain: f32) -> Result<Self, PlaybackError> {
        let volume = Arc::new(Mutex::new(gain));
        let stop_flag = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let worker = {
            let controls = FeedControls {
                volume: volume.clone(),
                stop_flag: stop_flag.clone(),
                finished: finished.clone(),
            };
            std::thread::Builder::new()
                .name("waveplay-output".into())
                .spawn(move || run_output(asset, offset, controls, ready_tx))
                .map_err(|e| {
                    PlaybackError::Output(format!("Failed to spawn output thread: {}", e))
                })?
        };

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                volume,
                stop_flag,
                finished,
                worker: Some(worker),
            }),
            Ok(Err(msg)) => {
                let _ = worker.join();
                Err(PlaybackError::Output(msg))
            }
            Err(_) => {
                let _ = worker.join();
                Err(PlaybackError::Output("Output thread exited during setup".into()))
            }
        }
    }
}

impl OutputPath for CpalPath {
    fn set_gain(&self, gain: f32) {
        *self.volume.lock() = gain;
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Output thread panicked");
            }
        }
    }
}

impl Drop for CpalPath {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handles shared between a `CpalPath` and its feeder thread
struct FeedControls {
    volume: Arc<Mutex<f32>>,
    stop_flag: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

/// Body of the feeder thread: open the device, then push the asset into the
/// ring buffer until it runs out or the path is stopped.
fn run_output(
    asset: Arc<AudioAsset>,
    offset: f64,
    controls: FeedControls,
    ready: mpsc::Sender<Result<(), String>>,
) {
    let (stream, mut producer, out_rate, out_channels) = match open_stream(controls.volume) {
        Ok(parts) => parts,
        Err(msg) => {
            let _ = ready.send(Err(msg));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    log::debug!(
        "Output path open: {} Hz, {} ch, offset {:.3}s",
        out_rate,
        out_channels,
        offset
    );

    let mut feeder = Feeder::new(&asset, offset, out_rate, out_channels);
    let mut pending: Vec<f32> = Vec::new();
    let mut cursor = 0;
    let mut exhausted = false;

    while !controls.stop_flag.load(Ordering::SeqCst) {
        if cursor >= pending.len() && !exhausted {
            pending.clear();
            cursor = 0;
            exhausted = !feeder.next_chunk(&asset, &mut pending);
        }

        if exhausted {
            // Let the callback drain what is queued, then release the device
            if producer.is_empty() {
                controls.finished.store(true, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }

        let written = producer.push_slice(&pending[cursor..]);
        cursor += written;
        if written == 0 {
            // Buffer full, wait a bit
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    drop(stream);
    log::debug!("Output path closed");
}

fn open_stream(volume: Arc<Mutex<f32>>) -> Result<(Stream, RingProducer, u32, usize), String> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or("No output device available")?;

    let config = device
        .default_output_config()
        .map_err(|e| format!("Failed to get default output config: {}", e))?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;

    // Create ring buffer for passing samples to audio thread
    let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
    let (producer, consumer) = rb.split();

    // Build the output stream based on sample format
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), consumer, volume)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), consumer, volume)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), consumer, volume)?,
        format => return Err(format!("Unsupported sample format: {:?}", format)),
    };

    stream
        .play()
        .map_err(|e| format!("Failed to start stream: {}", e))?;

    Ok((stream, producer, sample_rate, channels))
}

fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: RingConsumer,
    volume: Arc<Mutex<f32>>,
) -> Result<Stream, String> {
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let vol = *volume.lock();
                for sample in data.iter_mut() {
                    let value = consumer.try_pop().unwrap_or(0.0) * vol;
                    *sample = T::from_sample(value);
                }
            },
            move |err| {
                log::error!("Audio output error: {}", err);
            },
            None,
        )
        .map_err(|e| format!("Failed to build output stream: {}", e))
}

/// Walks the asset from a start frame and produces interleaved device-rate chunks
struct Feeder {
    position: usize,
    out_channels: usize,
    resampler: Option<FftFixedIn<f32>>,
    /// Set once the resampler's delay line has been emptied
    flushed: bool,
}

impl Feeder {
    fn new(asset: &AudioAsset, offset: f64, out_rate: u32, out_channels: usize) -> Self {
        let resampler = if out_rate != asset.sample_rate() {
            match FftFixedIn::<f32>::new(
                asset.sample_rate() as usize,
                out_rate as usize,
                FEED_CHUNK_FRAMES,
                2,
                asset.channel_count(),
            ) {
                Ok(r) => Some(r),
                Err(e) => {
                    log::warn!("Resampler unavailable, playing at source rate: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            position: asset.frame_at(offset),
            out_channels,
            resampler,
            flushed: false,
        }
    }

    /// Append the next chunk to `out`. Returns false once the asset is exhausted.
    fn next_chunk(&mut self, asset: &AudioAsset, out: &mut Vec<f32>) -> bool {
        let frames = asset.frames();
        if self.position >= frames {
            return self.flush(out);
        }

        match self.resampler.as_mut() {
            None => {
                let end = (self.position + FEED_CHUNK_FRAMES).min(frames);
                asset.interleave_into(self.position, end, self.out_channels, out);
                self.position = end;
            }
            Some(resampler) => {
                let needed = resampler.input_frames_next();
                let end = (self.position + needed).min(frames);
                let input: Vec<Vec<f32>> = (0..asset.channel_count())
                    .map(|ch| {
                        let samples = asset.channel(ch).unwrap_or_default();
                        let mut block = samples[self.position..end].to_vec();
                        block.resize(needed, 0.0);
                        block
                    })
                    .collect();
                self.position = end;

                match resampler.process(&input, None) {
                    Ok(planes) => interleave_planes(&planes, self.out_channels, out),
                    Err(e) => {
                        log::error!("Resampling failed, stopping feed: {}", e);
                        self.position = frames;
                        self.flushed = true;
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Push the samples still held in the resampler's delay line, once
    fn flush(&mut self, out: &mut Vec<f32>) -> bool {
        let Some(resampler) = self.resampler.as_mut() else {
            return false;
        };
        if self.flushed {
            return false;
        }
        self.flushed = true;

        match resampler.process_partial(None::<&[Vec<f32>]>, None) {
            Ok(planes) => {
                interleave_planes(&planes, self.out_channels, out);
                true
            }
            Err(e) => {
                log::warn!("Failed to flush resampler: {}", e);
                false
            }
        }
    }
}

fn interleave_planes(planes: &[Vec<f32>], out_channels: usize, out: &mut Vec<f32>) {
    let Some(first) = planes.first() else {
        return;
    };
    out.reserve(first.len() * out_channels);
    for frame in 0..first.len() {
        mix_frame(|ch| planes[ch][frame], planes.len(), out_channels, out);
    }
}

/// Backend that accepts playback without touching any device
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

struct NullPath;

impl OutputPath for NullPath {
    fn set_gain(&self, _gain: f32) {}

    fn stop(&mut self) {}
}

impl OutputBackend for NullBackend {
    fn open(
        &self,
        _asset: Arc<AudioAsset>,
        _offset: f64,
        _gain: f32,
    ) -> Result<Box<dyn OutputPath>, PlaybackError> {
        Ok(Box::new(NullPath))
    }
}
