use std::sync::{Arc, Weak};

use audio_tap_core::models::audio_models::AudioTrack;
use audio_tap_core::models::error::TapError;
use audio_tap_core::tap::descriptor::TapDescriptor;
use audio_tap_core::tap::mix::AudioMix;
use audio_tap_core::tap::processing_tap::ProcessingTap;
use audio_tap_core::traits::tap_source::TapSource;

use crate::item::PlayerItem;
use crate::player::SimulatedPlayer;

/// Taps whatever item the player is showing at the moment of each call.
///
/// Holds the player weakly. Once the player is gone every call behaves as if
/// there were no current item.
pub struct PlayerTapSource {
    player: Weak<SimulatedPlayer>,
}

impl PlayerTapSource {
    pub fn new(player: &Arc<SimulatedPlayer>) -> Self {
        Self {
            player: Arc::downgrade(player),
        }
    }

    fn current_item(&self) -> Result<Arc<PlayerItem>, TapError> {
        self.player
            .upgrade()
            .and_then(|player| player.current_item())
            .ok_or(TapError::NoPlayerItem)
    }
}

impl TapSource for PlayerTapSource {
    type MixTarget = Arc<PlayerItem>;

    fn audio_tracks(&self) -> Result<Vec<AudioTrack>, TapError> {
        Ok(self.current_item()?.tracks().to_vec())
    }

    fn create_tap(&self, descriptor: TapDescriptor) -> Result<ProcessingTap, TapError> {
        self.current_item()?.create_tap(descriptor)
    }

    fn apply_audio_mix(&self, mix: AudioMix) -> Result<Arc<PlayerItem>, TapError> {
        let item = self.current_item()?;
        item.set_audio_mix(Some(mix));
        Ok(item)
    }

    fn clear_audio_mix(&self, target: &Arc<PlayerItem>) {
        target.set_audio_mix(None);
    }
}

/// Taps one item, fixed when the source is built.
///
/// Keeps tapping that item even after the player moves on to another one.
pub struct ItemTapSource {
    item: Arc<PlayerItem>,
}

impl ItemTapSource {
    /// Pin the player's current item.
    pub fn new(player: &SimulatedPlayer) -> Result<Self, TapError> {
        let item = player.current_item().ok_or(TapError::NoPlayerItem)?;
        Ok(Self { item })
    }

    pub fn from_item(item: Arc<PlayerItem>) -> Self {
        Self { item }
    }

    pub fn item(&self) -> &Arc<PlayerItem> {
        &self.item
    }
}

impl TapSource for ItemTapSource {
    type MixTarget = ();

    fn audio_tracks(&self) -> Result<Vec<AudioTrack>, TapError> {
        Ok(self.item.tracks().to_vec())
    }

    fn create_tap(&self, descriptor: TapDescriptor) -> Result<ProcessingTap, TapError> {
        self.item.create_tap(descriptor)
    }

    fn apply_audio_mix(&self, mix: AudioMix) -> Result<(), TapError> {
        self.item.set_audio_mix(Some(mix));
        Ok(())
    }

    fn clear_audio_mix(&self, _target: &()) {
        self.item.set_audio_mix(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_tap_core::models::format::AudioFormatDescriptor;

    use crate::generator::ToneGenerator;

    fn item() -> Arc<PlayerItem> {
        Arc::new(PlayerItem::with_audio(ToneGenerator::new(AudioFormatDescriptor::default(), 440.0)))
    }

    #[test]
    fn player_source_follows_current_item() {
        let player = Arc::new(SimulatedPlayer::new(512));
        let source = PlayerTapSource::new(&player);
        assert_eq!(source.audio_tracks(), Err(TapError::NoPlayerItem));

        player.replace_current_item(Some(item()));
        assert_eq!(source.audio_tracks().unwrap().len(), 1);
    }

    #[test]
    fn player_source_without_player_has_no_item() {
        let player = Arc::new(SimulatedPlayer::new(512));
        player.replace_current_item(Some(item()));
        let source = PlayerTapSource::new(&player);
        drop(player);

        assert_eq!(source.audio_tracks(), Err(TapError::NoPlayerItem));
        assert!(matches!(source.apply_audio_mix(AudioMix::default()), Err(TapError::NoPlayerItem)));
    }

    #[test]
    fn player_source_clears_the_item_it_applied_to() {
        let first = item();
        let player = Arc::new(SimulatedPlayer::new(512));
        player.replace_current_item(Some(Arc::clone(&first)));
        let source = PlayerTapSource::new(&player);

        let target = source.apply_audio_mix(AudioMix::default()).unwrap();
        player.replace_current_item(Some(item()));
        source.clear_audio_mix(&target);

        assert!(Arc::ptr_eq(&target, &first));
        assert_eq!(first.mix_changes(), 2);
        assert!(first.mix_volume().is_none());
    }

    #[test]
    fn item_source_requires_current_item() {
        let player = SimulatedPlayer::new(512);
        assert!(matches!(ItemTapSource::new(&player), Err(TapError::NoPlayerItem)));
    }

    #[test]
    fn item_source_stays_on_pinned_item() {
        let first = item();
        let player = SimulatedPlayer::new(512);
        player.replace_current_item(Some(Arc::clone(&first)));
        let source = ItemTapSource::new(&player).unwrap();

        player.replace_current_item(Some(item()));

        assert!(Arc::ptr_eq(source.item(), &first));
        source.apply_audio_mix(AudioMix::default()).unwrap();
        assert_eq!(first.mix_changes(), 1);
    }
}
