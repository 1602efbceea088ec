use uuid::Uuid;

use crate::models::buffer::AudioBufferList;
use crate::models::config::TapCreationFlags;
use crate::models::error::TapError;
use crate::models::format::StreamDescription;
use crate::traits::tap_client::BufferDelivery;
use crate::traits::tap_source::{PulledAudio, SourceAudio};

use super::descriptor::{TapDescriptor, TAP_CALLBACKS_VERSION};
use super::session::TapSession;

/// Status reported for a descriptor the tap cannot honour (parameter error).
pub const TAP_STATUS_PARAM_ERR: i32 = -50;

/// Owned processing-tap handle.
///
/// Lifecycle, driven by the hosting pipeline:
/// ```text
/// create (init) → prepare → process … → unprepare → drop (finalize)
/// ```
/// Creating the handle allocates its [`TapSession`]; dropping it unprepares if
/// needed and releases the session, so the two are always freed together.
pub struct ProcessingTap {
    session: TapSession,
    flags: TapCreationFlags,
    prepared: bool,
}

impl ProcessingTap {
    /// Create a tap from `descriptor` and run its init callback.
    pub fn create(descriptor: TapDescriptor) -> Result<Self, TapError> {
        if descriptor.version != TAP_CALLBACKS_VERSION {
            log::error!("unsupported tap callbacks version {}", descriptor.version);
            return Err(TapError::TapCreationFailed(TAP_STATUS_PARAM_ERR));
        }

        let session = TapSession::new(descriptor.track, descriptor.client);
        if let Some(client) = session.client() {
            client.session_created(session.id());
        }
        log::debug!("tap session {} initialized on track {}", session.id(), session.track().id);

        Ok(Self {
            session,
            flags: descriptor.flags,
            prepared: false,
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    pub fn session(&self) -> &TapSession {
        &self.session
    }

    pub fn flags(&self) -> TapCreationFlags {
        self.flags
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Record the processing format the pipeline negotiated.
    ///
    /// An unreadable description leaves the tap unprepared; process cycles then
    /// pass audio through without forwarding it.
    pub fn prepare(&mut self, max_frames: u32, format: &StreamDescription) -> Result<(), TapError> {
        match format.to_format() {
            Ok(processing_format) => {
                self.session.negotiate(processing_format, max_frames);
                self.prepared = true;
                Ok(())
            }
            Err(err) => {
                log::error!("tap session {}: cannot use processing format: {}", self.session.id(), err);
                self.session.reset_negotiation();
                self.prepared = false;
                if let Some(client) = self.session.client() {
                    client.session_prepare_failed(self.session.id(), &err);
                }
                Err(err)
            }
        }
    }

    pub fn unprepare(&mut self) {
        self.session.reset_negotiation();
        self.prepared = false;
    }

    /// Run one process cycle on the render thread.
    ///
    /// Source audio is always pulled so playback continues even when nothing is
    /// forwarded. The returned frame count and flags come straight from the pull.
    pub fn process(
        &mut self,
        requested_frames: u32,
        source: &mut dyn SourceAudio,
        io: &mut AudioBufferList,
    ) -> Result<PulledAudio, TapError> {
        let Some(processing_format) = self.session.processing_format().copied() else {
            log::error!("tap session {}: processing format is not available", self.session.id());
            return source.pull(requested_frames, io);
        };

        let Some(client) = self.session.client() else {
            if self.session.mark_orphaned() {
                log::warn!("tap session {}: engine is gone, passing audio through", self.session.id());
            }
            return source.pull(requested_frames, io);
        };

        let session_id = self.session.id();
        client.on_buffer_delivered(BufferDelivery {
            session_id,
            requested_frames,
            processing_format: &processing_format,
            source,
            io,
            resampler: self.session.resampler_mut(),
        })
    }
}

impl Drop for ProcessingTap {
    fn drop(&mut self) {
        if self.prepared {
            self.unprepare();
        }
        if let Some(client) = self.session.client() {
            client.session_finalized(self.session.id());
        }
        log::debug!("tap session {} finalized", self.session.id());
    }
}

impl std::fmt::Debug for ProcessingTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingTap")
            .field("session", &self.session)
            .field("flags", &self.flags)
            .field("prepared", &self.prepared)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Weak};

    use parking_lot::Mutex;

    use crate::models::audio_models::AudioTrack;
    use crate::models::buffer::TapFlags;
    use crate::models::format::AudioFormatDescriptor;
    use crate::traits::tap_client::TapClient;

    #[derive(Default)]
    struct RecordingClient {
        created: Mutex<Vec<Uuid>>,
        finalized: Mutex<Vec<Uuid>>,
        prepare_failures: Mutex<Vec<(Uuid, TapError)>>,
        deliveries: AtomicU64,
    }

    impl TapClient for RecordingClient {
        fn session_created(&self, session_id: Uuid) {
            self.created.lock().push(session_id);
        }

        fn session_finalized(&self, session_id: Uuid) {
            self.finalized.lock().push(session_id);
        }

        fn session_prepare_failed(&self, session_id: Uuid, error: &TapError) {
            self.prepare_failures.lock().push((session_id, error.clone()));
        }

        fn on_buffer_delivered(&self, delivery: BufferDelivery<'_>) -> Result<PulledAudio, TapError> {
            self.deliveries.fetch_add(1, Ordering::SeqCst);
            delivery.source.pull(delivery.requested_frames, delivery.io)
        }
    }

    struct CountingSource {
        pulls: u32,
        frames: u32,
    }

    impl SourceAudio for CountingSource {
        fn pull(&mut self, requested_frames: u32, _io: &mut AudioBufferList) -> Result<PulledAudio, TapError> {
            self.pulls += 1;
            Ok(PulledAudio {
                frames: requested_frames.min(self.frames),
                flags: TapFlags::END_OF_STREAM,
                ..Default::default()
            })
        }
    }

    fn descriptor_for(client: &Arc<RecordingClient>) -> TapDescriptor {
        let weak: Weak<dyn TapClient> = Arc::downgrade(client) as Weak<dyn TapClient>;
        TapDescriptor::new(AudioTrack::audio(1, "main"), TapCreationFlags::PostEffects, weak)
    }

    fn standard_description() -> StreamDescription {
        StreamDescription::from_format(&AudioFormatDescriptor::default())
    }

    #[test]
    fn create_and_drop_pair_init_with_finalize() {
        let client = Arc::new(RecordingClient::default());
        let tap = ProcessingTap::create(descriptor_for(&client)).unwrap();
        let id = tap.session_id();

        assert_eq!(*client.created.lock(), vec![id]);
        assert!(client.finalized.lock().is_empty());

        drop(tap);
        assert_eq!(*client.finalized.lock(), vec![id]);
    }

    #[test]
    fn unsupported_version_fails_without_session() {
        let client = Arc::new(RecordingClient::default());
        let mut descriptor = descriptor_for(&client);
        descriptor.version = 7;

        let err = ProcessingTap::create(descriptor).unwrap_err();
        assert_eq!(err, TapError::TapCreationFailed(TAP_STATUS_PARAM_ERR));
        assert!(client.created.lock().is_empty());
        assert!(client.finalized.lock().is_empty());
    }

    #[test]
    fn process_before_prepare_passes_through() {
        let client = Arc::new(RecordingClient::default());
        let mut tap = ProcessingTap::create(descriptor_for(&client)).unwrap();
        let mut source = CountingSource { pulls: 0, frames: 512 };
        let mut io = AudioBufferList::allocate(&AudioFormatDescriptor::default(), 1024);

        let pulled = tap.process(1024, &mut source, &mut io).unwrap();

        assert_eq!(pulled.frames, 512);
        assert_eq!(source.pulls, 1);
        assert_eq!(client.deliveries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prepared_tap_delivers_to_client_and_echoes_pull() {
        let client = Arc::new(RecordingClient::default());
        let mut tap = ProcessingTap::create(descriptor_for(&client)).unwrap();
        tap.prepare(4096, &standard_description()).unwrap();
        let mut source = CountingSource { pulls: 0, frames: 300 };
        let mut io = AudioBufferList::allocate(&AudioFormatDescriptor::default(), 1024);

        let pulled = tap.process(1024, &mut source, &mut io).unwrap();

        assert_eq!(pulled.frames, 300);
        assert_eq!(pulled.flags, TapFlags::END_OF_STREAM);
        assert_eq!(source.pulls, 1);
        assert_eq!(client.deliveries.load(Ordering::SeqCst), 1);
        assert_eq!(tap.session().max_frames(), 4096);
    }

    #[test]
    fn invalid_description_leaves_tap_unprepared() {
        let client = Arc::new(RecordingClient::default());
        let mut tap = ProcessingTap::create(descriptor_for(&client)).unwrap();
        let mut description = standard_description();
        description.bits_per_channel = 8;

        let err = tap.prepare(1024, &description).unwrap_err();
        assert!(!tap.is_prepared());
        assert!(tap.session().processing_format().is_none());
        assert_eq!(*client.prepare_failures.lock(), vec![(tap.session_id(), err)]);
    }

    #[test]
    fn unprepare_clears_negotiated_format() {
        let client = Arc::new(RecordingClient::default());
        let mut tap = ProcessingTap::create(descriptor_for(&client)).unwrap();
        tap.prepare(1024, &standard_description()).unwrap();
        tap.unprepare();

        assert!(!tap.is_prepared());
        assert!(tap.session().processing_format().is_none());
    }

    #[test]
    fn orphaned_tap_keeps_pulling() {
        let client = Arc::new(RecordingClient::default());
        let mut tap = ProcessingTap::create(descriptor_for(&client)).unwrap();
        tap.prepare(1024, &standard_description()).unwrap();
        drop(client);

        let mut source = CountingSource { pulls: 0, frames: 1024 };
        let mut io = AudioBufferList::allocate(&AudioFormatDescriptor::default(), 1024);
        for _ in 0..3 {
            assert_eq!(tap.process(1024, &mut source, &mut io).unwrap().frames, 1024);
        }
        assert_eq!(source.pulls, 3);
    }
}
