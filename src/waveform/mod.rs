// Waveform module
// Envelope analysis, layout and the interactive cursor

pub mod analyzer;
pub mod renderer;
pub mod scale;
pub mod surface;

pub use analyzer::{analyze, analyze_with_bins, WaveformEnvelope};
pub use renderer::{
    CursorState, Margin, PointerEvent, RenderConfig, RenderTarget, RendererHandle, Transport,
    WaveformRenderer,
};
pub use surface::{Primitive, Surface};
