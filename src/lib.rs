// Waveplay - audio playback with a seekable waveform view
// Module declarations
pub mod audio;
pub mod error;
pub mod settings;
pub mod waveform;

pub use audio::{AudioAsset, PlaybackController, PlayerState};
pub use error::{DecodeError, Error, MissingTargetError, PlaybackError, SeekError, SettingsError};
pub use settings::Settings;
pub use waveform::{
    PointerEvent, RenderConfig, RenderTarget, RendererHandle, Surface, WaveformEnvelope,
    WaveformRenderer,
};
