// Waveform renderer
// Bars, grid and time axis for an envelope, plus a cursor kept in step with playback

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::analyzer::{self, WaveformEnvelope};
use super::scale::{BandScale, LinearScale};
use super::surface::{
    Primitive, Surface, ViewBox, AXIS_COLOR, BAR_COLOR, CURSOR_COLOR, GRID_COLOR,
};
use crate::audio::player::PlaybackController;
use crate::error::{MissingTargetError, SeekError};

/// Seconds between time-axis labels
pub const LABEL_STEP_SECS: f64 = 30.0;

/// Default cursor refresh period; also the upper bound on cursor staleness
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 1000;

const CURSOR_HANDLE_SIZE: f64 = 10.0;
const CURSOR_STROKE_WIDTH: f64 = 2.0;
const GRID_STROKE_WIDTH: f64 = 0.5;
/// Headroom above the chart for the cursor handle
const HANDLE_HEADROOM: f64 = 20.0;
const AXIS_LABEL_Y: f64 = 17.0;
const AXIS_FONT_SIZE: f64 = 11.0;

/// What the renderer needs from playback: a time query and a seek
pub trait Transport: Send + Sync {
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn seek_to(&self, time: f64) -> Result<(), SeekError>;
}

impl Transport for PlaybackController {
    fn current_time(&self) -> f64 {
        PlaybackController::current_time(self)
    }

    fn duration(&self) -> f64 {
        PlaybackController::duration(self)
    }

    fn seek_to(&self, time: f64) -> Result<(), SeekError> {
        PlaybackController::seek_to(self, time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

/// Rendering options. Unset width/height fall back to the target's size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub margin: Margin,
    pub width: Option<f64>,
    pub height: Option<f64>,
    /// Fraction of each band covered by its bar
    pub padding: f64,
    /// Cursor polling period while attached
    pub refresh_interval_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            width: None,
            height: None,
            padding: 1.0,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl RenderConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

/// Size of the container the waveform is drawn into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub width: f64,
    pub height: f64,
}

impl RenderTarget {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pointer input in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64 },
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CursorState {
    /// Horizontal pixel position; derived from transport time
    pub x: f64,
    pub is_dragging: bool,
}

/// Geometry fixed at render time
#[derive(Debug, Clone, Copy)]
struct Layout {
    width: f64,
    height: f64,
    top: f64,
    x_scale: LinearScale,
}

pub struct WaveformRenderer {
    envelope: WaveformEnvelope,
    transport: Arc<dyn Transport>,
    layout: Mutex<Option<Layout>>,
    surface: Mutex<Surface>,
    cursor: Mutex<CursorState>,
    cursor_tx: watch::Sender<CursorState>,
}

impl WaveformRenderer {
    pub fn new(envelope: WaveformEnvelope, transport: Arc<dyn Transport>) -> Self {
        let (cursor_tx, _) = watch::channel(CursorState::default());
        Self {
            envelope,
            transport,
            layout: Mutex::new(None),
            surface: Mutex::new(Surface::default()),
            cursor: Mutex::new(CursorState::default()),
            cursor_tx,
        }
    }

    /// Analyze the controller's current asset and wire the renderer to it.
    /// Returns `None` when nothing is loaded.
    pub fn for_controller(controller: Arc<PlaybackController>) -> Option<Self> {
        let asset = controller.asset()?;
        let envelope = analyzer::analyze(&asset);
        Some(Self::new(envelope, controller))
    }

    pub fn envelope(&self) -> &WaveformEnvelope {
        &self.envelope
    }

    /// Lay out grid, bars, time axis and cursor for `target`.
    ///
    /// An empty envelope or a zero-sized area yields an empty surface.
    pub fn render(
        &self,
        target: Option<RenderTarget>,
        config: &RenderConfig,
    ) -> Result<Surface, MissingTargetError> {
        let target = target.ok_or(MissingTargetError)?;

        let width = config.width.unwrap_or(target.width);
        let height = config.height.unwrap_or(target.height);
        let len = self.envelope.len();

        if len == 0 || !(width > 0.0) || !(height > 0.0) {
            log::debug!("Nothing to render ({} bars, {}x{})", len, width, height);
            *self.layout.lock() = None;
            let surface = Surface::empty(width.max(0.0), height.max(0.0));
            *self.surface.lock() = surface.clone();
            return Ok(surface);
        }

        let m = config.margin;
        let x_scale = LinearScale::new((0.0, (len - 1) as f64), (m.left, width - m.right));
        let value_scale = LinearScale::new((0.0, 1.0), (m.top, height - m.bottom));
        let layout = Layout {
            width,
            height,
            top: m.top,
            x_scale,
        };

        let mut surface = Surface::empty(width, height);
        surface.view_box = Some(ViewBox {
            x: 0.0,
            y: -(m.top + HANDLE_HEADROOM),
            width,
            height: height + m.top + HANDLE_HEADROOM,
        });

        // Grid
        for tick in x_scale.ticks() {
            let x = 0.5 + x_scale.map(tick);
            surface.grid.push(Primitive::Line {
                x1: x,
                y1: 0.0,
                x2: x,
                y2: height,
                stroke: GRID_COLOR,
                width: GRID_STROKE_WIDTH,
            });
        }
        for tick in value_scale.ticks() {
            let y = value_scale.map(tick);
            surface.grid.push(Primitive::Line {
                x1: 0.0,
                y1: y,
                x2: width,
                y2: y,
                stroke: GRID_COLOR,
                width: GRID_STROKE_WIDTH,
            });
        }

        // Bars, centred on the middle of the drawable area
        let draw_width = width - m.left - m.right;
        let draw_height = (height - m.top - m.bottom).max(0.0);
        let mid_y = m.top + draw_height / 2.0;
        let band = draw_width / len as f64;
        for (i, &value) in self.envelope.values().iter().enumerate() {
            let bar_height = value as f64 * draw_height;
            surface.bars.push(Primitive::Rect {
                x: x_scale.map(i as f64),
                y: mid_y - bar_height / 2.0,
                width: band * config.padding,
                height: bar_height,
                radius: band / 2.0,
                fill: BAR_COLOR,
            });
        }

        // Time axis
        let labels = time_labels(self.envelope.duration());
        let bands = BandScale::new(labels.len(), (m.left, width - m.right));
        for (i, text) in labels.into_iter().enumerate() {
            surface.axis.push(Primitive::Text {
                x: bands.center(i),
                y: AXIS_LABEL_Y,
                text,
                color: AXIS_COLOR,
                size: AXIS_FONT_SIZE,
            });
        }

        *self.layout.lock() = Some(layout);
        *self.surface.lock() = surface;
        self.refresh_cursor();

        log::debug!("Rendered {} bars at {}x{}", len, width, height);
        Ok(self.surface())
    }

    /// Latest surface, including the most recent cursor position
    pub fn surface(&self) -> Surface {
        self.surface.lock().clone()
    }

    pub fn cursor(&self) -> CursorState {
        *self.cursor.lock()
    }

    /// Receive cursor state after every refresh
    pub fn subscribe_cursor(&self) -> watch::Receiver<CursorState> {
        self.cursor_tx.subscribe()
    }

    /// Horizontal position for a playback time
    pub fn time_to_x(&self, time: f64) -> Option<f64> {
        let layout = (*self.layout.lock())?;
        let duration = self.envelope.duration();
        let fraction = if duration > 0.0 { time / duration } else { 0.0 };
        Some(layout.x_scale.map(fraction * self.envelope.len() as f64))
    }

    /// Playback time for a pointer offset, clamped to the transport's asset
    pub fn x_to_time(&self, x: f64) -> Option<f64> {
        let layout = (*self.layout.lock())?;
        let duration = self.transport.duration().max(0.0);
        Some((x / layout.width * duration).clamp(0.0, duration))
    }

    /// Re-read transport time and move the cursor. Returns the new x, or
    /// `None` before a non-empty render.
    pub fn refresh_cursor(&self) -> Option<f64> {
        let layout = (*self.layout.lock())?;
        let x = self.time_to_x(self.transport.current_time())?;

        self.surface.lock().cursor = cursor_primitives(x, layout);
        let state = {
            let mut cursor = self.cursor.lock();
            cursor.x = x;
            *cursor
        };
        self.cursor_tx.send_replace(state);
        Some(x)
    }

    /// Apply one pointer event. Returns the time sought to, if any.
    pub fn handle_pointer(&self, event: PointerEvent) -> Result<Option<f64>, SeekError> {
        let Some(layout) = *self.layout.lock() else {
            return Ok(None);
        };

        match event {
            PointerEvent::Down { x, y } => {
                let inside = (0.0..=layout.width).contains(&x)
                    && (-(layout.top + HANDLE_HEADROOM)..=layout.height).contains(&y);
                if inside {
                    self.cursor.lock().is_dragging = true;
                }
                Ok(None)
            }
            PointerEvent::Move { x } => {
                if !self.cursor.lock().is_dragging {
                    return Ok(None);
                }
                let Some(time) = self.x_to_time(x) else {
                    return Ok(None);
                };
                self.transport.seek_to(time)?;
                self.refresh_cursor();
                Ok(Some(time))
            }
            PointerEvent::Up => {
                let state = {
                    let mut cursor = self.cursor.lock();
                    cursor.is_dragging = false;
                    *cursor
                };
                self.cursor_tx.send_replace(state);
                Ok(None)
            }
        }
    }

    /// Start cursor polling every `period` and pointer handling on the current
    /// tokio runtime. Usually `period` is `RenderConfig::refresh_interval()`.
    ///
    /// Both stop when the returned handle is dropped. Polling does nothing
    /// until the first non-empty `render`.
    pub fn attach(
        self: &Arc<Self>,
        period: Duration,
        events: mpsc::Receiver<PointerEvent>,
    ) -> RendererHandle {
        let interval = period.max(Duration::from_millis(1));
        let renderer = Arc::clone(self);
        let task = tokio::spawn(async move {
            renderer.run(interval, events).await;
        });
        RendererHandle { task: Some(task) }
    }

    async fn run(&self, period: Duration, mut events: mpsc::Receiver<PointerEvent>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_cursor();
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        if let Err(e) = self.handle_pointer(event) {
                            log::warn!("Seek from pointer failed: {}", e);
                        }
                    }
                    None => events_open = false,
                },
            }
        }
    }
}

/// Owns the renderer's background task; dropping it stops polling and
/// pointer handling.
#[derive(Debug)]
pub struct RendererHandle {
    task: Option<JoinHandle<()>>,
}

impl RendererHandle {
    pub fn detach(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for RendererHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn cursor_primitives(x: f64, layout: Layout) -> Vec<Primitive> {
    let s = CURSOR_HANDLE_SIZE;
    vec![
        Primitive::Line {
            x1: x,
            y1: 0.0,
            x2: x,
            y2: layout.height,
            stroke: CURSOR_COLOR,
            width: CURSOR_STROKE_WIDTH,
        },
        Primitive::Polygon {
            points: vec![(x - s, -s * 1.5), (x + s, -s * 1.5), (x, -s * 0.5)],
            fill: CURSOR_COLOR,
        },
    ]
}

/// One label per started 30 s step
pub fn time_labels(duration: f64) -> Vec<String> {
    if !(duration > 0.0) {
        return Vec::new();
    }
    let steps = (duration / LABEL_STEP_SECS).ceil() as usize;
    (0..steps)
        .map(|i| format_timestamp(i as f64 * LABEL_STEP_SECS))
        .collect()
}

/// `MM:SS`; minutes keep counting past 59
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
