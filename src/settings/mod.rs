// Settings management and persistence
mod settings;

pub use settings::{PlaybackSettings, Settings, SETTINGS_FILE};
