//! Software player driving render cycles on its current item.
//!
//! Cycles can be stepped by hand with [`SimulatedPlayer::render_cycle`] or run
//! in real time on a dedicated `playback-render` thread between `play()` and
//! `pause()`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use audio_tap_core::models::error::TapError;
use audio_tap_core::traits::tap_source::PulledAudio;

use crate::item::PlayerItem;

type CurrentItem = Arc<Mutex<Option<Arc<PlayerItem>>>>;

pub struct SimulatedPlayer {
    current: CurrentItem,
    frames_per_cycle: u32,
    cycles: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    render_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SimulatedPlayer {
    pub fn new(frames_per_cycle: u32) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            frames_per_cycle: frames_per_cycle.max(1),
            cycles: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            render_handle: Mutex::new(None),
        }
    }

    pub fn with_item(item: PlayerItem, frames_per_cycle: u32) -> Self {
        let player = Self::new(frames_per_cycle);
        player.replace_current_item(Some(Arc::new(item)));
        player
    }

    pub fn current_item(&self) -> Option<Arc<PlayerItem>> {
        self.current.lock().clone()
    }

    pub fn replace_current_item(&self, item: Option<Arc<PlayerItem>>) {
        *self.current.lock() = item;
    }

    pub fn frames_per_cycle(&self) -> u32 {
        self.frames_per_cycle
    }

    pub fn cycles_rendered(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Render one cycle of `frames` frames on the calling thread.
    ///
    /// Returns `None` when there is no current item.
    pub fn render_cycle(&self, frames: u32) -> Option<Result<PulledAudio, TapError>> {
        render_current(&self.current, &self.cycles, frames)
    }

    /// Start rendering in real time on the `playback-render` thread.
    pub fn play(&self) -> Result<(), TapError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let current = Arc::clone(&self.current);
        let cycles = Arc::clone(&self.cycles);
        let running = Arc::clone(&self.running);
        let frames = self.frames_per_cycle;

        let handle = thread::Builder::new()
            .name("playback-render".into())
            .spawn(move || render_loop(current, cycles, running, frames))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                TapError::ConfigurationFailed(format!("failed to spawn render thread: {}", e))
            })?;

        *self.render_handle.lock() = Some(handle);
        log::debug!("playback started, {} frames per cycle", frames);
        Ok(())
    }

    /// Stop the render thread and wait for its last cycle to finish.
    pub fn pause(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.render_handle.lock().take() {
            let _ = handle.join();
            log::debug!("playback paused after {} cycles", self.cycles_rendered());
        }
    }
}

impl Drop for SimulatedPlayer {
    fn drop(&mut self) {
        self.pause();
    }
}

fn render_current(
    current: &Mutex<Option<Arc<PlayerItem>>>,
    cycles: &AtomicU64,
    frames: u32,
) -> Option<Result<PulledAudio, TapError>> {
    // Clone out so swapping items never waits on a cycle.
    let item = current.lock().clone()?;
    let result = item.render(frames);
    cycles.fetch_add(1, Ordering::Relaxed);
    Some(result)
}

fn render_loop(current: CurrentItem, cycles: Arc<AtomicU64>, running: Arc<AtomicBool>, frames: u32) {
    while running.load(Ordering::SeqCst) {
        let period = current
            .lock()
            .as_ref()
            .map(|item| item.native_format().sample_rate)
            .filter(|rate| *rate > 0.0)
            .map(|rate| Duration::from_secs_f64(frames as f64 / rate))
            .unwrap_or(Duration::from_millis(10));

        if let Some(Err(e)) = render_current(&current, &cycles, frames) {
            log::debug!("render cycle failed: {}", e);
        }
        thread::sleep(period);
    }
}
