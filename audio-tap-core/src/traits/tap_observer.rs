use crate::models::error::TapError;
use crate::models::state::TapState;

/// Event delegate for tap engine notifications.
///
/// Called on the thread that attached or detached the sink, never on the
/// render thread. Per-buffer failures go through the engine's error slot instead.
pub trait TapObserver: Send + Sync {
    /// Called when the engine enters a new state.
    fn on_state_changed(&self, state: &TapState);

    /// Called when installing the tap failed and audio capture is unavailable.
    fn on_install_failed(&self, error: &TapError);
}
