use std::sync::{Arc, Weak};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::models::audio_models::{AudioTrack, TapDiagnostics};
use crate::models::buffer::{MediaTime, TimedAudioBuffer};
use crate::models::config::TapConfiguration;
use crate::models::error::{TapError, TapErrorRecord};
use crate::models::format::AudioFormatDescriptor;
use crate::models::state::TapState;
use crate::tap::descriptor::TapDescriptor;
use crate::tap::mix::{AudioMix, MixInputParameters};
use crate::traits::recorder_sink::RecorderSink;
use crate::traits::tap_client::TapClient;
use crate::traits::tap_observer::TapObserver;
use crate::traits::tap_source::TapSource;

use super::shared::EngineShared;

/// Application-thread state, never touched by the render thread.
struct ControlState<T> {
    sink: Option<Arc<dyn RecorderSink>>,
    state: TapState,
    /// Item the installed mix was applied to; removal clears that same item.
    mix_target: Option<T>,
}

/// Taps the first audio track of a player and forwards converted, timestamped
/// buffers to a recorder sink.
///
/// Generic over how the player is reached via [`TapSource`]. Data flow:
/// ```text
/// [pipeline render thread] → ProcessingTap → pull → PcmConverter → HostClock
///                                                      ↓
///                                         TimedAudioBuffer → RecorderSink
/// ```
/// The tap is installed when a sink is attached to an engine that had none and
/// removed when the sink is cleared. Swapping one sink for another only
/// re-targets forwarding.
pub struct AudioTapEngine<S: TapSource> {
    source: S,
    config: TapConfiguration,
    shared: Arc<EngineShared>,
    control: Mutex<ControlState<S::MixTarget>>,
    observer: Mutex<Option<Arc<dyn TapObserver>>>,
}

impl<S: TapSource> AudioTapEngine<S> {
    pub fn new(source: S, config: TapConfiguration) -> Result<Self, TapError> {
        config.validate().map_err(TapError::ConfigurationFailed)?;
        Ok(Self::build(source, config))
    }

    /// Engine with the default 44.1 kHz stereo float target.
    pub fn with_defaults(source: S) -> Self {
        Self::build(source, TapConfiguration::default())
    }

    fn build(source: S, config: TapConfiguration) -> Self {
        Self {
            source,
            shared: Arc::new(EngineShared::new(&config)),
            config,
            control: Mutex::new(ControlState {
                sink: None,
                state: TapState::Idle,
                mix_target: None,
            }),
            observer: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &TapConfiguration {
        &self.config
    }

    pub fn target_format(&self) -> AudioFormatDescriptor {
        self.shared.target_format
    }

    pub fn state(&self) -> TapState {
        self.control.lock().state
    }

    pub fn set_observer(&self, observer: Arc<dyn TapObserver>) {
        *self.observer.lock() = Some(observer);
    }

    pub fn attached_sink(&self) -> Option<Arc<dyn RecorderSink>> {
        self.control.lock().sink.clone()
    }

    /// Attach `sink`, or detach the current one with `None`.
    ///
    /// Re-attaching the sink that is already attached does nothing. If the tap
    /// cannot be installed the attachment is rolled back and the error returned,
    /// leaving the engine idle so the caller can carry on without audio.
    pub fn attach_sink(&self, sink: Option<Arc<dyn RecorderSink>>) -> Result<(), TapError> {
        let (before, after, result) = {
            let mut control = self.control.lock();
            if same_sink(control.sink.as_ref(), sink.as_ref()) {
                return Ok(());
            }
            let before = control.state;

            // The render thread may still hold the previous sink until the new
            // one is published, so its format is only cleared afterwards.
            let previous = control.sink.take();
            let result = match sink {
                None => {
                    self.shared.publish_sink(None);
                    retire(previous.as_ref());
                    self.remove_locked(&mut control);
                    log::info!("recorder sink detached");
                    Ok(())
                }
                Some(sink) => {
                    sink.set_desired_format(Some(self.shared.target_format));
                    self.shared.publish_sink(Some(Arc::clone(&sink)));
                    retire(previous.as_ref());
                    control.sink = Some(Arc::clone(&sink));

                    if previous.is_some() {
                        log::info!("recorder sink replaced");
                        Ok(())
                    } else {
                        self.remove_locked(&mut control);
                        match self.install_locked(&mut control) {
                            Ok(()) => Ok(()),
                            Err(err) => {
                                self.shared.publish_sink(None);
                                retire(Some(&sink));
                                control.sink = None;
                                Err(err)
                            }
                        }
                    }
                }
            };

            (before, control.state, result)
        };

        self.notify(before, after, result.as_ref().err());
        result
    }

    /// Install a tap on the source's first audio track, replacing any applied mix.
    pub fn install_tap(&self) -> Result<(), TapError> {
        let (before, after, result) = {
            let mut control = self.control.lock();
            let before = control.state;
            let result = self.install_locked(&mut control);
            (before, control.state, result)
        };
        self.notify(before, after, result.as_ref().err());
        result
    }

    /// Clear the applied mix. Safe to call when nothing is installed.
    pub fn remove_tap(&self) {
        let (before, after) = {
            let mut control = self.control.lock();
            let before = control.state;
            self.remove_locked(&mut control);
            (before, control.state)
        };
        self.notify(before, after, None);
    }

    /// Forward a buffer to the attached sink; discarded when none is attached.
    pub fn on_sample_produced(&self, buffer: TimedAudioBuffer) {
        self.shared.on_sample_produced(buffer);
    }

    /// Most recent per-buffer or setup failure.
    pub fn last_error(&self) -> Option<TapErrorRecord> {
        self.shared.errors.last()
    }

    pub fn error_generation(&self) -> u64 {
        self.shared.errors.generation()
    }

    pub fn clear_error(&self) {
        self.shared.errors.clear();
    }

    /// Receive every failure published from now on.
    pub fn subscribe_errors(&self) -> Receiver<TapErrorRecord> {
        self.shared.errors.subscribe()
    }

    pub fn diagnostics(&self) -> TapDiagnostics {
        self.shared.diagnostics()
    }

    // --- Internal helpers ---

    fn install_locked(&self, control: &mut ControlState<S::MixTarget>) -> Result<(), TapError> {
        let track = match self.first_audio_track() {
            Ok(track) => track,
            Err(err) => {
                log::error!("cannot install audio tap: {}", err);
                self.shared.errors.publish(TapErrorRecord::new(err.clone(), None));
                return Err(err);
            }
        };

        let client: Weak<dyn TapClient> = Arc::downgrade(&self.shared) as Weak<dyn TapClient>;
        let descriptor = TapDescriptor::new(track.clone(), self.config.creation_flags, client);
        let tap = match self.source.create_tap(descriptor) {
            Ok(tap) => tap,
            Err(err) => {
                log::error!("creating processing tap failed: {}", err);
                self.shared.errors.publish(TapErrorRecord::new(err.clone(), None));
                return Err(err);
            }
        };
        let session_id = tap.session_id();

        let mut params = MixInputParameters::new(track.clone());
        params.set_volume(self.config.mix_volume, MediaTime::default());
        params.set_tap(tap);

        self.remove_locked(control);
        match self.source.apply_audio_mix(AudioMix::new(vec![params])) {
            Ok(target) => {
                control.mix_target = Some(target);
                control.state = TapState::TapInstalled { session_id };
                log::info!("audio tap installed on track {} ({}), session {}", track.id, track.label, session_id);
                Ok(())
            }
            Err(err) => {
                log::error!("applying audio mix failed: {}", err);
                self.shared.errors.publish(TapErrorRecord::new(err.clone(), Some(session_id)));
                Err(err)
            }
        }
    }

    fn remove_locked(&self, control: &mut ControlState<S::MixTarget>) {
        if let Some(target) = control.mix_target.take() {
            self.source.clear_audio_mix(&target);
        }
        if let Some(session_id) = control.state.session_id() {
            log::info!("audio tap removed, session {}", session_id);
        }
        control.state = TapState::Idle;
    }

    fn first_audio_track(&self) -> Result<AudioTrack, TapError> {
        self.source
            .audio_tracks()?
            .into_iter()
            .find(AudioTrack::is_audio)
            .ok_or(TapError::NoAudioTrack)
    }

    fn notify(&self, before: TapState, after: TapState, failure: Option<&TapError>) {
        let Some(observer) = self.observer.lock().clone() else {
            return;
        };
        if before != after {
            observer.on_state_changed(&after);
        }
        if let Some(err) = failure {
            observer.on_install_failed(err);
        }
    }
}

impl<S: TapSource> Drop for AudioTapEngine<S> {
    fn drop(&mut self) {
        self.shared.publish_sink(None);
        let control = self.control.get_mut();
        retire(control.sink.take().as_ref());
        if let Some(target) = control.mix_target.take() {
            self.source.clear_audio_mix(&target);
        }
        control.state = TapState::Idle;
    }
}

/// Tell a sink that is no longer published that nothing more will arrive.
fn retire(sink: Option<&Arc<dyn RecorderSink>>) {
    if let Some(sink) = sink {
        sink.set_desired_format(None);
    }
}

fn same_sink(a: Option<&Arc<dyn RecorderSink>>, b: Option<&Arc<dyn RecorderSink>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        _ => false,
    }
}
