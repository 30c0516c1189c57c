// Audio playback module
// Uses Symphonia for decoding and cpal for output

pub mod asset;
pub mod clock;
pub mod decoder;
pub mod output;
pub mod player;

pub use asset::AudioAsset;
pub use clock::{Clock, ManualClock, SystemClock};
pub use decoder::{AssetDecoder, SymphoniaDecoder};
pub use output::{CpalBackend, NullBackend, OutputBackend, OutputPath};
pub use player::{LoadTicket, PlaybackController, PlaybackSession, PlayerState};
