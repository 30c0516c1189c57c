// Playback controller
// Owns the decoded asset, the playback session and the single live output path

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use parking_lot::{Mutex, MutexGuard};

use crate::audio::asset::AudioAsset;
use crate::audio::clock::{Clock, SystemClock};
use crate::audio::decoder::{AssetDecoder, SymphoniaDecoder};
use crate::audio::output::{CpalBackend, OutputBackend, OutputPath};
use crate::error::{DecodeError, PlaybackError, SeekError};
use crate::settings::PlaybackSettings;

/// Lowest accepted volume. Negative gain inverts polarity.
pub const MIN_VOLUME: f32 = -1.0;
/// Highest accepted volume
pub const MAX_VOLUME: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unloaded,
    /// Asset loaded, never started or rewound by `stop`
    Ready,
    Playing,
    Paused,
}

/// Snapshot of the mutable playback bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSession {
    pub is_running: bool,
    /// Position in seconds; meaningful only while not running
    pub paused_at: f64,
    /// Clock reading at which position 0 would have started; meaningful only while running
    pub started_at: f64,
    pub gain: f32,
    /// Whether playback has ever started since load or the last `stop`
    started_once: bool,
}

impl PlaybackSession {
    fn new(gain: f32) -> Self {
        Self {
            is_running: false,
            paused_at: 0.0,
            started_at: 0.0,
            gain,
            started_once: false,
        }
    }

    fn position(&self, now: f64, duration: f64) -> f64 {
        if self.is_running {
            (now - self.started_at).clamp(0.0, duration)
        } else {
            self.paused_at
        }
    }
}

/// Issued by `begin_load`; a load finishing with an outdated ticket is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

struct Inner {
    asset: Option<Arc<AudioAsset>>,
    session: Option<PlaybackSession>,
    output: Option<Box<dyn OutputPath>>,
    /// Gain handed to the next session
    volume: f32,
}

impl Inner {
    fn teardown(&mut self) {
        if let Some(mut path) = self.output.take() {
            path.stop();
        }
    }

    /// Replace any live path with a fresh one starting at `offset`.
    /// On failure the session is left paused at `offset`.
    fn start_at(
        &mut self,
        backend: &dyn OutputBackend,
        clock: &dyn Clock,
        offset: f64,
    ) -> Result<(), PlaybackError> {
        let asset = self.asset.clone().ok_or(PlaybackError::NoAsset)?;
        let session = self.session.as_mut().ok_or(PlaybackError::NoAsset)?;

        // Old path goes away before the new one exists
        if let Some(mut path) = self.output.take() {
            path.stop();
        }

        match backend.open(asset, offset, session.gain) {
            Ok(path) => {
                session.started_at = clock.now() - offset;
                session.is_running = true;
                session.started_once = true;
                self.output = Some(path);
                Ok(())
            }
            Err(e) => {
                session.is_running = false;
                session.paused_at = offset;
                Err(e)
            }
        }
    }

    /// Stop a running session, keeping its position or rewinding with `reset`.
    /// Returns the paused position, or `None` when nothing was running.
    fn halt(&mut self, now: f64, reset: bool) -> Option<f64> {
        let duration = self.duration();
        let session = self.session.as_mut().filter(|s| s.is_running)?;

        session.paused_at = if reset { 0.0 } else { session.position(now, duration) };
        session.is_running = false;
        if reset {
            session.started_once = false;
        }
        let paused_at = session.paused_at;
        self.teardown();
        Some(paused_at)
    }

    /// Park the session at the end once its output path has drained the asset
    fn reap_finished(&mut self) {
        if !self.output.as_ref().is_some_and(|path| path.is_finished()) {
            return;
        }
        let duration = self.duration();
        self.teardown();
        if let Some(session) = self.session.as_mut() {
            session.is_running = false;
            session.paused_at = duration;
        }
        log::debug!("Reached end of asset at {:.3}s", duration);
    }

    fn duration(&self) -> f64 {
        self.asset.as_ref().map_or(0.0, |a| a.duration())
    }
}

/// Single source of truth for playback position.
///
/// All state sits behind one lock so a seek-triggered restart cannot
/// interleave with a concurrent play or pause.
pub struct PlaybackController {
    decoder: Arc<dyn AssetDecoder>,
    backend: Box<dyn OutputBackend>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    generation: AtomicU64,
}

impl PlaybackController {
    /// Controller using Symphonia, the default cpal device and the wall clock
    pub fn new() -> Self {
        Self::with_components(
            Arc::new(SymphoniaDecoder::new()),
            Box::new(CpalBackend::new()),
            Arc::new(SystemClock::new()),
        )
    }

    pub fn with_components(
        decoder: Arc<dyn AssetDecoder>,
        backend: Box<dyn OutputBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            decoder,
            backend,
            clock,
            inner: Mutex::new(Inner {
                asset: None,
                session: None,
                output: None,
                volume: MAX_VOLUME,
            }),
            generation: AtomicU64::new(0),
        }
    }

    /// Lock the shared state, settling a path that has played to the end
    fn lock(&self) -> MutexGuard<'_, Inner> {
        let mut inner = self.inner.lock();
        inner.reap_finished();
        inner
    }

    /// Decode `bytes` and make the result the current asset
    pub async fn load(&self, bytes: Vec<u8>) -> Result<Arc<AudioAsset>, DecodeError> {
        let ticket = self.begin_load();
        self.load_with_ticket(ticket, bytes).await
    }

    /// Read a file and load it
    pub async fn load_file(&self, path: impl AsRef<Path>) -> anyhow::Result<Arc<AudioAsset>> {
        let path = path.as_ref();
        let ticket = self.begin_load();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read audio file: {:?}", path))?;
        let asset = self
            .load_with_ticket(ticket, bytes)
            .await
            .with_context(|| format!("Failed to decode audio file: {:?}", path))?;
        Ok(asset)
    }

    /// Reserve a load slot. Any load holding an older ticket becomes stale.
    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Decode on the blocking pool and apply the asset if `ticket` is still current
    pub async fn load_with_ticket(
        &self,
        ticket: LoadTicket,
        bytes: Vec<u8>,
    ) -> Result<Arc<AudioAsset>, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let decoder = self.decoder.clone();
        let asset = tokio::task::spawn_blocking(move || decoder.decode(bytes))
            .await
            .map_err(|e| DecodeError::Worker(e.to_string()))??;
        let asset = Arc::new(asset);

        let mut inner = self.lock();
        if self.generation.load(Ordering::SeqCst) != ticket.0 {
            log::debug!("Discarding stale decode (ticket {})", ticket.0);
            return Err(DecodeError::Superseded);
        }

        inner.teardown();
        inner.session = Some(PlaybackSession::new(inner.volume));
        inner.asset = Some(asset.clone());
        log::info!("Asset loaded: {:.2}s at {} Hz", asset.duration(), asset.sample_rate());
        Ok(asset)
    }

    /// Drop the asset and session, and invalidate in-flight loads
    pub fn unload(&self) {
        let mut inner = self.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        inner.teardown();
        inner.session = None;
        inner.asset = None;
        log::info!("Asset unloaded");
    }

    /// Start playback from the current position. No-op while already playing.
    pub fn play(&self) -> Result<(), PlaybackError> {
        let mut inner = self.lock();
        let session = inner.session.ok_or(PlaybackError::NoAsset)?;
        if session.is_running {
            return Ok(());
        }

        inner.start_at(self.backend.as_ref(), self.clock.as_ref(), session.paused_at)?;
        log::debug!("Play from {:.3}s", session.paused_at);
        Ok(())
    }

    /// Stop the output path and remember the position (or 0 with `reset`).
    /// No-op when nothing is playing.
    pub fn pause(&self, reset: bool) {
        let mut inner = self.lock();
        if let Some(paused_at) = inner.halt(self.clock.now(), reset) {
            log::debug!("Paused at {:.3}s", paused_at);
        }
    }

    /// Pause and rewind to the start. Rewinds a paused session too.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.halt(self.clock.now(), true);
        if let Some(session) = inner.session.as_mut() {
            session.paused_at = 0.0;
            session.started_once = false;
        }
        log::debug!("Stopped");
    }

    /// Move to `time` seconds. While playing this restarts the output path at
    /// the new offset in one step.
    pub fn seek_to(&self, time: f64) -> Result<(), SeekError> {
        let mut inner = self.lock();
        let duration = inner.asset.as_ref().ok_or(SeekError::NoAsset)?.duration();
        if !time.is_finite() || time < 0.0 || time > duration {
            return Err(SeekError::OutOfRange { time, duration });
        }

        let session = inner.session.as_mut().ok_or(SeekError::NoAsset)?;
        session.paused_at = time;
        if session.is_running {
            inner.start_at(self.backend.as_ref(), self.clock.as_ref(), time)?;
        }
        log::trace!("Seek to {:.3}s", time);
        Ok(())
    }

    /// Current position in seconds
    pub fn current_time(&self) -> f64 {
        let inner = self.lock();
        let duration = inner.duration();
        inner
            .session
            .map_or(0.0, |s| s.position(self.clock.now(), duration))
    }

    /// Set the gain multiplier, clamped to `MIN_VOLUME..=MAX_VOLUME`.
    ///
    /// Applies to the live path and to every path created afterwards.
    pub fn set_volume(&self, level: f32) {
        if !level.is_finite() {
            log::warn!("Ignoring non-finite volume {}", level);
            return;
        }
        let gain = level.clamp(MIN_VOLUME, MAX_VOLUME);

        let mut inner = self.lock();
        inner.volume = gain;
        if let Some(session) = inner.session.as_mut() {
            session.gain = gain;
        }
        if let Some(path) = inner.output.as_ref() {
            path.set_gain(gain);
        }
    }

    pub fn apply_settings(&self, settings: &PlaybackSettings) {
        self.set_volume(settings.clamped_volume());
    }

    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    pub fn state(&self) -> PlayerState {
        let inner = self.lock();
        match inner.session {
            None => PlayerState::Unloaded,
            Some(s) if s.is_running => PlayerState::Playing,
            Some(s) if s.started_once => PlayerState::Paused,
            Some(_) => PlayerState::Ready,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    pub fn asset(&self) -> Option<Arc<AudioAsset>> {
        self.lock().asset.clone()
    }

    /// Duration of the loaded asset, 0 when unloaded
    pub fn duration(&self) -> f64 {
        self.lock().duration()
    }

    pub fn session(&self) -> Option<PlaybackSession> {
        self.lock().session
    }

    /// Whether an output path is currently alive
    pub fn has_output(&self) -> bool {
        self.lock().output.is_some()
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.inner.get_mut().teardown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::clock::ManualClock;
    use crate::audio::decoder::tests::wav_bytes;
    use crate::audio::output::testing::RecordingBackend;
    use approx::assert_relative_eq;

    /// Decodes `[seconds, amplitude_percent]` into a constant mono asset
    pub(crate) struct FakeDecoder {
        pub sample_rate: u32,
    }

    impl AssetDecoder for FakeDecoder {
        fn decode(&self, bytes: Vec<u8>) -> Result<AudioAsset, DecodeError> {
            let seconds = *bytes.first().ok_or(DecodeError::Empty)? as usize;
            let amplitude = bytes.get(1).copied().unwrap_or(50) as f32 / 100.0;
            AudioAsset::mono(vec![amplitude; seconds * self.sample_rate as usize], self.sample_rate)
                .ok_or(DecodeError::NoSamples)
        }
    }

    pub(crate) fn controller() -> (PlaybackController, Arc<ManualClock>, RecordingBackend) {
        let clock = Arc::new(ManualClock::new());
        let backend = RecordingBackend::default();
        let controller = PlaybackController::with_components(
            Arc::new(FakeDecoder { sample_rate: 44100 }),
            Box::new(backend.clone()),
            clock.clone(),
        );
        (controller, clock, backend)
    }

    fn opened(backend: &RecordingBackend) -> usize {
        backend.log.opened.load(Ordering::SeqCst)
    }

    fn active(backend: &RecordingBackend) -> usize {
        backend.log.active.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_load_initializes_session_at_zero() {
        let (player, _, _) = controller();
        assert_eq!(player.state(), PlayerState::Unloaded);

        let asset = player.load(vec![10]).await.unwrap();

        assert_eq!(asset.duration(), 10.0);
        assert_eq!(player.state(), PlayerState::Ready);
        assert_eq!(player.current_time(), 0.0);
        let session = player.session().unwrap();
        assert!(!session.is_running);
        assert_eq!(session.paused_at, 0.0);
    }

    #[tokio::test]
    async fn test_load_empty_bytes_fails() {
        let (player, _, _) = controller();
        let err = player.load(Vec::new()).await.unwrap_err();
        assert!(matches!(err, DecodeError::Empty));
        assert_eq!(player.state(), PlayerState::Unloaded);
    }

    #[tokio::test]
    async fn test_load_with_real_decoder() {
        let player = PlaybackController::with_components(
            Arc::new(SymphoniaDecoder::new()),
            Box::new(RecordingBackend::default()),
            Arc::new(ManualClock::new()),
        );
        let bytes = wav_bytes(&vec![0.1; 16000], 8000, 1);
        let asset = player.load(bytes).await.unwrap();
        assert!((asset.duration() - 2.0).abs() < 1e-9);

        let err = player.load(b"definitely not audio".to_vec()).await.unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
        // Failed decode leaves the previous asset in place
        assert!((player.duration() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_load_file_reads_from_disk() {
        let (player, _, _) = controller();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, [4u8, 50]).unwrap();

        let asset = player.load_file(&path).await.unwrap();
        assert_eq!(asset.duration(), 4.0);

        let err = player.load_file(dir.path().join("missing.wav")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read audio file"));
    }

    #[test]
    fn test_apply_settings_sets_initial_volume() {
        let (player, _, _) = controller();
        player.apply_settings(&PlaybackSettings { initial_volume: 0.25 });
        assert_eq!(player.volume(), 0.25);
    }

    #[test]
    fn test_play_without_asset_fails() {
        let (player, _, backend) = controller();
        assert!(matches!(player.play(), Err(PlaybackError::NoAsset)));
        assert_eq!(opened(&backend), 0);
    }

    #[test]
    fn test_seek_without_asset_fails() {
        let (player, _, _) = controller();
        assert!(matches!(player.seek_to(1.0), Err(SeekError::NoAsset)));
    }

    #[tokio::test]
    async fn test_seek_while_paused_is_exact() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();

        for t in [0.0, 0.1, 3.3333, 5.0, 9.999, 10.0] {
            player.seek_to(t).unwrap();
            assert_eq!(player.current_time(), t);
        }
        assert_eq!(opened(&backend), 0);
    }

    #[tokio::test]
    async fn test_seek_out_of_range_fails() {
        let (player, _, _) = controller();
        player.load(vec![10]).await.unwrap();
        player.seek_to(2.0).unwrap();

        assert!(matches!(player.seek_to(-1.0), Err(SeekError::OutOfRange { .. })));
        assert!(matches!(player.seek_to(11.0), Err(SeekError::OutOfRange { .. })));
        assert!(matches!(player.seek_to(f64::NAN), Err(SeekError::OutOfRange { .. })));
        assert_eq!(player.current_time(), 2.0);
    }

    #[tokio::test]
    async fn test_play_then_pause_tracks_elapsed_time() {
        let (player, clock, backend) = controller();
        player.load(vec![10]).await.unwrap();
        clock.set(100.0);

        player.play().unwrap();
        assert_eq!(player.state(), PlayerState::Playing);
        clock.advance(3.25);
        player.pause(false);

        assert_relative_eq!(player.current_time(), 3.25, epsilon = 1e-9);
        assert_eq!(player.state(), PlayerState::Paused);
        assert_eq!(active(&backend), 0);
    }

    #[tokio::test]
    async fn test_seek_play_pause_scenario() {
        let (player, clock, _) = controller();
        player.load(vec![10]).await.unwrap();

        player.seek_to(5.0).unwrap();
        player.play().unwrap();
        clock.advance(2.0);
        player.pause(false);

        assert_relative_eq!(player.current_time(), 7.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_double_play_is_idempotent() {
        let (player, clock, backend) = controller();
        player.load(vec![10]).await.unwrap();

        player.play().unwrap();
        clock.advance(1.0);
        player.play().unwrap();
        clock.advance(1.0);

        assert_eq!(opened(&backend), 1);
        assert_eq!(active(&backend), 1);
        assert_relative_eq!(player.current_time(), 2.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_seek_while_playing_restarts_single_path() {
        let (player, clock, backend) = controller();
        player.load(vec![10]).await.unwrap();

        player.play().unwrap();
        clock.advance(1.0);
        player.seek_to(6.0).unwrap();

        assert_eq!(player.state(), PlayerState::Playing);
        assert_eq!(opened(&backend), 2);
        assert_eq!(active(&backend), 1);
        assert_eq!(backend.log.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(*backend.log.offsets.lock(), vec![0.0, 6.0]);

        clock.advance(0.5);
        assert_relative_eq!(player.current_time(), 6.5, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_pause_without_playback_is_noop() {
        let (player, _, _) = controller();
        player.pause(false);
        player.load(vec![10]).await.unwrap();
        player.seek_to(4.0).unwrap();
        player.pause(true);
        assert_eq!(player.current_time(), 4.0);
        assert_eq!(player.state(), PlayerState::Ready);
    }

    #[tokio::test]
    async fn test_pause_with_reset_rewinds() {
        let (player, clock, _) = controller();
        player.load(vec![10]).await.unwrap();
        player.play().unwrap();
        clock.advance(4.0);
        player.pause(true);
        assert_eq!(player.current_time(), 0.0);
    }

    #[tokio::test]
    async fn test_stop_rewinds_paused_session() {
        let (player, _, _) = controller();
        player.load(vec![10]).await.unwrap();
        player.seek_to(4.0).unwrap();
        player.stop();
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.state(), PlayerState::Ready);
    }

    #[tokio::test]
    async fn test_stop_is_a_single_step_against_play() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();
        player.seek_to(4.0).unwrap();

        std::thread::scope(|scope| {
            scope.spawn(|| player.stop());
            scope.spawn(|| player.play().unwrap());
        });

        // Either stop ran first (playing from 0) or play did (stopped at 0)
        let session = player.session().unwrap();
        if session.is_running {
            assert_eq!(*backend.log.offsets.lock(), vec![0.0]);
        } else {
            assert_eq!(session.paused_at, 0.0);
            assert_eq!(player.state(), PlayerState::Ready);
            assert_eq!(active(&backend), 0);
        }
    }

    #[tokio::test]
    async fn test_concurrent_transport_keeps_one_live_path() {
        let (player, clock, backend) = controller();
        player.load(vec![10]).await.unwrap();
        let player = &player;

        std::thread::scope(|scope| {
            for worker in 0..4u32 {
                let clock = clock.clone();
                scope.spawn(move || {
                    for i in 0..200u32 {
                        match (i + worker) % 5 {
                            0 => player.play().unwrap(),
                            1 => player.pause(false),
                            2 => player.seek_to(f64::from((i * 7 + worker) % 11)).unwrap(),
                            3 => player.stop(),
                            _ => clock.advance(0.25),
                        }
                        let session = player.session().unwrap();
                        assert!((0.0..=10.0).contains(&session.paused_at));
                        assert!((0.0..=10.0).contains(&player.current_time()));
                    }
                });
            }
        });

        assert_eq!(backend.log.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(player.is_playing(), player.has_output());
        assert_eq!(active(&backend), usize::from(player.has_output()));
    }

    #[tokio::test]
    async fn test_finished_path_parks_session_at_end() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();
        player.seek_to(8.0).unwrap();
        player.play().unwrap();

        backend.log.finished.store(true, Ordering::SeqCst);

        assert_eq!(player.state(), PlayerState::Paused);
        assert!(!player.has_output());
        assert_eq!(active(&backend), 0);
        assert_eq!(player.current_time(), 10.0);

        backend.log.finished.store(false, Ordering::SeqCst);
        player.seek_to(2.0).unwrap();
        player.play().unwrap();
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn test_current_time_clamps_at_end() {
        let (player, clock, _) = controller();
        player.load(vec![10]).await.unwrap();
        player.seek_to(9.0).unwrap();
        player.play().unwrap();
        clock.advance(5.0);
        assert_eq!(player.current_time(), 10.0);
        player.pause(false);
        assert_eq!(player.session().unwrap().paused_at, 10.0);
    }

    #[tokio::test]
    async fn test_volume_is_clamped_and_survives_restart() {
        let (player, _, backend) = controller();
        player.set_volume(0.4);
        player.load(vec![10]).await.unwrap();
        player.play().unwrap();
        player.set_volume(-3.0);
        assert_eq!(player.volume(), MIN_VOLUME);
        player.seek_to(2.0).unwrap();

        let gains = backend.log.gains.lock().clone();
        assert_eq!(gains, vec![0.4, -1.0, -1.0]);

        player.set_volume(f32::NAN);
        assert_eq!(player.volume(), MIN_VOLUME);
    }

    #[tokio::test]
    async fn test_output_failure_leaves_session_paused() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();
        backend.fail.store(true, Ordering::SeqCst);

        assert!(matches!(player.play(), Err(PlaybackError::Output(_))));
        assert!(!player.is_playing());

        backend.fail.store(false, Ordering::SeqCst);
        player.play().unwrap();
        backend.fail.store(true, Ordering::SeqCst);
        assert!(matches!(player.seek_to(3.0), Err(SeekError::Output(_))));
        assert!(!player.is_playing());
        assert_eq!(player.current_time(), 3.0);
        assert_eq!(active(&backend), 0);
    }

    #[tokio::test]
    async fn test_stale_load_is_discarded() {
        let (player, _, _) = controller();
        let stale = player.begin_load();
        player.load(vec![3]).await.unwrap();

        let err = player.load_with_ticket(stale, vec![10]).await.unwrap_err();

        assert!(matches!(err, DecodeError::Superseded));
        assert_eq!(player.duration(), 3.0);
    }

    #[tokio::test]
    async fn test_unload_tears_down_and_invalidates() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();
        player.play().unwrap();
        let pending = player.begin_load();

        player.unload();

        assert_eq!(active(&backend), 0);
        assert_eq!(player.state(), PlayerState::Unloaded);
        assert!(matches!(
            player.load_with_ticket(pending, vec![2]).await,
            Err(DecodeError::Superseded)
        ));
    }

    #[tokio::test]
    async fn test_loading_new_asset_tears_down_output() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();
        player.play().unwrap();
        player.load(vec![5]).await.unwrap();
        assert_eq!(active(&backend), 0);
        assert_eq!(player.state(), PlayerState::Ready);
    }

    #[tokio::test]
    async fn test_drop_releases_output() {
        let (player, _, backend) = controller();
        player.load(vec![10]).await.unwrap();
        player.play().unwrap();
        drop(player);
        assert_eq!(active(&backend), 0);
    }
}
