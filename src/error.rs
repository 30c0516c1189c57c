// Error types surfaced by the player core
use thiserror::Error;

/// Failure turning raw bytes into an `AudioAsset`
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("audio payload is empty")]
    Empty,

    #[error("unsupported or unrecognized audio format: {0}")]
    Unsupported(String),

    #[error("no audio track found")]
    NoAudioTrack,

    #[error("decoded audio contains no samples")]
    NoSamples,

    #[error("decode failed: {0}")]
    Failed(String),

    #[error("decode worker failed: {0}")]
    Worker(String),

    /// A newer load (or an unload) started while this one was decoding
    #[error("load was superseded by a newer request")]
    Superseded,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no asset loaded")]
    NoAsset,

    #[error("audio output error: {0}")]
    Output(String),
}

#[derive(Debug, Error)]
pub enum SeekError {
    #[error("no asset loaded")]
    NoAsset,

    #[error("seek position {time}s is outside 0..={duration}s")]
    OutOfRange { time: f64, duration: f64 },

    #[error("audio output error during seek: {0}")]
    Output(String),
}

#[derive(Debug, Error)]
#[error("rendering target not found")]
pub struct MissingTargetError;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Umbrella error for callers that want a single type
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Seek(#[from] SeekError),

    #[error(transparent)]
    MissingTarget(#[from] MissingTargetError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl From<PlaybackError> for SeekError {
    fn from(err: PlaybackError) -> Self {
        match err {
            PlaybackError::NoAsset => SeekError::NoAsset,
            PlaybackError::Output(msg) => SeekError::Output(msg),
        }
    }
}
