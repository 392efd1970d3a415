//! The now-playing coordinator
//!
//! One coordinator owns the single live playback handle for the whole
//! application. Components hold a clone of the coordinator, subscribe to its
//! events and ask it to play, pause or stop; they never touch a handle
//! directly. Every mutation stops the previous holder before starting a new
//! one, so at most one handle is playing at any time.
//!
//! Listeners are called synchronously after the state lock is released and
//! may call back into the coordinator. Media events that arrive while the
//! state is locked (including from inside a backend call on the same thread)
//! are queued and applied by the current lock holder before it lets go.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError, Weak};

use super::backend::{AudioBackend, BackendError, HandleId, MediaEvent};
use super::events::{
    AudioEndedEvent, AudioPausedEvent, NowPlayingEvent, PlaybackEvent, PlaybackFailedEvent,
};
use super::state::{HandleState, MinimalPlayerInfo, PlayRequest, PlaybackSnapshot};
use super::PlaybackError;

/// Callback registered with [`PlaybackCoordinator::subscribe`]
pub type Listener = Arc<dyn Fn(&PlaybackEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct ActiveHandle {
    id: HandleId,
    info: MinimalPlayerInfo,
    state: HandleState,
    /// Subscription of the component that started playback
    owner: Option<SubscriberId>,
    position_secs: f64,
    duration_secs: Option<f64>,
}

impl ActiveHandle {
    fn transition(&mut self, next: HandleState) -> bool {
        if self.state == next {
            return false;
        }
        if !self.state.can_transition_to(next) {
            log::warn!(
                "Ignoring playback transition {:?} -> {:?} for handle {}",
                self.state,
                next,
                self.id
            );
            return false;
        }
        self.state = next;
        true
    }

    fn now_playing(&self) -> PlaybackEvent {
        PlaybackEvent::NowPlaying(NowPlayingEvent {
            article_id: self.info.article_id.clone(),
            article_number: self.info.article_number.clone(),
            audio_url: self.info.audio_url.clone(),
        })
    }

    fn paused(&self) -> PlaybackEvent {
        PlaybackEvent::AudioPaused(AudioPausedEvent {
            article_id: self.info.article_id.clone(),
        })
    }
}

#[derive(Default)]
struct Inner {
    active: Option<ActiveHandle>,
    next_handle: u64,
    last_error: Option<String>,
}

struct Shared {
    backend: Arc<dyn AudioBackend>,
    inner: Mutex<Inner>,
    listeners: Mutex<Vec<(SubscriberId, Listener)>>,
    /// Media events waiting for the state lock
    pending: Mutex<Vec<(HandleId, MediaEvent)>>,
    next_subscriber: AtomicU64,
}

/// Cloneable handle to the shared now-playing slot
#[derive(Clone)]
pub struct PlaybackCoordinator {
    shared: Arc<Shared>,
}

/// Registration of a listener. Dropping it unregisters the listener and, if
/// its component started the current playback, stops that playback.
pub struct Subscription {
    id: SubscriberId,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            PlaybackCoordinator { shared }.detach(self.id);
        }
    }
}

impl PlaybackCoordinator {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                inner: Mutex::new(Inner::default()),
                listeners: Mutex::new(Vec::new()),
                pending: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.shared.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<(SubscriberId, Listener)>> {
        self.shared.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_pending(&self) -> MutexGuard<'_, Vec<(HandleId, MediaEvent)>> {
        self.shared.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `op` under the state lock, apply queued media events, then
    /// publish everything that happened once the lock is released.
    fn with_inner<R>(&self, op: impl FnOnce(&mut Inner, &mut Vec<PlaybackEvent>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut inner = self.lock_inner();
            let result = op(&mut *inner, &mut events);
            self.apply_pending(&mut *inner, &mut events);
            result
        };
        self.emit(events);
        self.drain_pending();
        result
    }

    fn apply_pending(&self, inner: &mut Inner, events: &mut Vec<PlaybackEvent>) {
        loop {
            let queued = std::mem::take(&mut *self.lock_pending());
            if queued.is_empty() {
                return;
            }
            for (handle, event) in queued {
                self.apply_media_event_locked(inner, handle, event, events);
            }
        }
    }

    /// Apply queued media events if nobody else holds the state lock. A
    /// holder applies them itself before releasing.
    fn drain_pending(&self) {
        while !self.lock_pending().is_empty() {
            let mut events = Vec::new();
            {
                let mut inner = match self.shared.inner.try_lock() {
                    Ok(guard) => guard,
                    Err(TryLockError::Poisoned(e)) => e.into_inner(),
                    Err(TryLockError::WouldBlock) => return,
                };
                self.apply_pending(&mut *inner, &mut events);
            }
            self.emit(events);
        }
    }

    // ==================== Subscriptions ====================

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlaybackEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.shared.next_subscriber.fetch_add(1, Ordering::Relaxed));
        self.lock_listeners().push((id, Arc::new(listener)));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn detach(&self, id: SubscriberId) {
        self.lock_listeners().retain(|(sid, _)| *sid != id);

        self.with_inner(|inner, events| {
            let owns_active = inner.active.as_ref().is_some_and(|a| a.owner == Some(id));
            if owns_active {
                log::debug!("Owner of the current audio went away, stopping playback");
                self.stop_locked(inner, events);
            }
        });
    }

    fn emit(&self, events: Vec<PlaybackEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self.lock_listeners().iter().map(|(_, l)| Arc::clone(l)).collect();
        for event in &events {
            for listener in &listeners {
                listener(event);
            }
        }
    }

    // ==================== Playback control ====================

    /// Stop whatever is playing and clear the now-playing slot. Calling it
    /// with nothing active is a no-op.
    pub fn stop_current_audio(&self) {
        self.with_inner(|inner, events| self.stop_locked(inner, events));
    }

    fn stop_locked(&self, inner: &mut Inner, events: &mut Vec<PlaybackEvent>) {
        let Some(mut active) = inner.active.take() else {
            return;
        };

        if active.state == HandleState::Playing {
            self.shared.backend.pause(active.id);
            events.push(active.paused());
        }
        active.transition(HandleState::Idle);
        self.shared.backend.release(active.id);
        log::debug!("Stopped audio for article {} ({})", active.info.article_id, active.id);
    }

    /// Drop the current handle after a failure and publish a notice
    fn fail_locked(&self, inner: &mut Inner, error: &BackendError, events: &mut Vec<PlaybackEvent>) {
        let Some(mut active) = inner.active.take() else {
            return;
        };

        active.transition(HandleState::Error);
        self.shared.backend.release(active.id);
        log::warn!("Playback failed for article {}: {}", active.info.article_id, error);

        inner.last_error = Some(error.to_string());
        events.push(PlaybackEvent::PlaybackFailed(PlaybackFailedEvent {
            article_id: active.info.article_id,
            message: error.to_string(),
        }));
    }

    /// Start the audio of an article, stopping anything else first.
    ///
    /// Requesting the article that is already loaded resumes the existing
    /// handle. `owner` ties the playback to a component: dropping that
    /// subscription stops playback.
    pub fn play(&self, request: PlayRequest, owner: Option<&Subscription>) -> Result<(), PlaybackError> {
        if let Err(e) = request.validate() {
            self.emit(vec![PlaybackEvent::PlaybackFailed(PlaybackFailedEvent {
                article_id: request.article_id.clone(),
                message: e.to_string(),
            })]);
            return Err(e);
        }

        let owner = owner.map(Subscription::id);
        self.with_inner(|inner, events| {
            let reusable = inner.active.as_ref().is_some_and(|a| {
                a.info.article_id == request.article_id
                    && a.info.audio_url == request.audio_url
                    && (a.state.is_resumable() || a.state == HandleState::Playing)
            });

            if reusable {
                if let (Some(active), Some(owner)) = (inner.active.as_mut(), owner) {
                    active.owner = Some(owner);
                }
                self.start_locked(inner, events)
            } else {
                self.stop_locked(inner, events);
                self.load_locked(inner, &request, owner, events)
            }
        })
    }

    fn load_locked(
        &self,
        inner: &mut Inner,
        request: &PlayRequest,
        owner: Option<SubscriberId>,
        events: &mut Vec<PlaybackEvent>,
    ) -> Result<(), PlaybackError> {
        inner.next_handle += 1;
        let mut active = ActiveHandle {
            id: HandleId(inner.next_handle),
            info: request.player_info(),
            state: HandleState::Idle,
            owner,
            position_secs: 0.0,
            duration_secs: None,
        };
        active.transition(HandleState::Loading);
        log::info!(
            "Loading audio for article {} ({}) from {}",
            request.article_id,
            active.id,
            request.audio_url
        );

        let loaded = self.shared.backend.load(active.id, &request.audio_url);
        inner.active = Some(active);
        if let Err(e) = loaded {
            self.fail_locked(inner, &e, events);
            return Err(e.into());
        }

        if let Some(active) = inner.active.as_mut() {
            active.transition(HandleState::Ready);
        }
        self.start_locked(inner, events)
    }

    /// Start the current handle if it is not already playing
    fn start_locked(&self, inner: &mut Inner, events: &mut Vec<PlaybackEvent>) -> Result<(), PlaybackError> {
        let Some(active) = inner.active.as_mut() else {
            return Err(PlaybackError::NoActiveAudio);
        };
        if active.state == HandleState::Playing {
            return Ok(());
        }

        match self.shared.backend.play(active.id) {
            Ok(()) => {
                if active.state == HandleState::Ended {
                    active.position_secs = 0.0;
                }
                active.transition(HandleState::Playing);
                events.push(active.now_playing());
                inner.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.fail_locked(inner, &e, events);
                Err(e.into())
            }
        }
    }

    fn pause_locked(&self, inner: &mut Inner, events: &mut Vec<PlaybackEvent>) {
        if let Some(active) = inner.active.as_mut() {
            if active.state == HandleState::Playing {
                self.shared.backend.pause(active.id);
                active.transition(HandleState::Paused);
                events.push(active.paused());
            }
        }
    }

    /// Pause the current handle. No-op unless something is playing.
    pub fn pause(&self) {
        self.with_inner(|inner, events| self.pause_locked(inner, events));
    }

    /// Resume the loaded handle and announce it again to every listener
    pub fn resume(&self) -> Result<(), PlaybackError> {
        self.with_inner(|inner, events| self.start_locked(inner, events))
    }

    /// Pause when playing, resume otherwise
    pub fn toggle(&self) -> Result<(), PlaybackError> {
        self.with_inner(|inner, events| self.toggle_locked(inner, events))
    }

    fn toggle_locked(&self, inner: &mut Inner, events: &mut Vec<PlaybackEvent>) -> Result<(), PlaybackError> {
        let playing = inner.active.as_ref().is_some_and(|a| a.state == HandleState::Playing);
        if playing {
            self.pause_locked(inner, events);
            Ok(())
        } else {
            self.start_locked(inner, events)
        }
    }

    /// Play/pause button of an article player: toggles when the article is
    /// the current one, otherwise takes over the now-playing slot.
    pub fn toggle_article(&self, request: PlayRequest, owner: Option<&Subscription>) -> Result<(), PlaybackError> {
        let toggled = self.with_inner(|inner, events| {
            let is_current = inner.active.as_ref().is_some_and(|a| {
                a.info.article_id == request.article_id && a.info.audio_url == request.audio_url
            });
            is_current.then(|| self.toggle_locked(inner, events))
        });
        match toggled {
            Some(result) => result,
            None => self.play(request, owner),
        }
    }

    // ==================== Backend callbacks ====================

    /// Apply a lifecycle callback from the backend. Callbacks for handles
    /// that are no longer current are ignored.
    ///
    /// Safe to call from inside an [`AudioBackend`] method: the event is then
    /// applied once the operation that made the call has finished.
    pub fn handle_media_event(&self, handle: HandleId, event: MediaEvent) {
        self.lock_pending().push((handle, event));
        self.drain_pending();
    }

    fn apply_media_event_locked(
        &self,
        inner: &mut Inner,
        handle: HandleId,
        event: MediaEvent,
        events: &mut Vec<PlaybackEvent>,
    ) {
        let is_current = inner.active.as_ref().is_some_and(|a| a.id == handle);
        if !is_current {
            log::debug!("Ignoring {:?} for stale handle {}", event, handle);
            return;
        }

        match event {
            MediaEvent::Error { message } => {
                self.fail_locked(inner, &BackendError::Decode(message), events);
            }
            other => {
                if let Some(active) = inner.active.as_mut() {
                    Self::apply_media_event(active, other, events);
                }
            }
        }
    }

    fn apply_media_event(active: &mut ActiveHandle, event: MediaEvent, events: &mut Vec<PlaybackEvent>) {
        match event {
            MediaEvent::LoadedMetadata { duration_secs } => {
                active.duration_secs = Some(duration_secs);
                // Metadata often arrives after playback already started
                if active.state == HandleState::Loading {
                    active.transition(HandleState::Ready);
                }
            }
            MediaEvent::Play => {
                if active.transition(HandleState::Playing) {
                    events.push(active.now_playing());
                }
            }
            MediaEvent::Pause => {
                if active.transition(HandleState::Paused) {
                    events.push(active.paused());
                }
            }
            MediaEvent::TimeUpdate { position_secs } => {
                active.position_secs = position_secs;
            }
            MediaEvent::Ended => {
                if active.transition(HandleState::Ended) {
                    if let Some(duration) = active.duration_secs {
                        active.position_secs = duration;
                    }
                    events.push(PlaybackEvent::AudioEnded(AudioEndedEvent {
                        article_id: active.info.article_id.clone(),
                    }));
                }
            }
            MediaEvent::Error { .. } => {}
        }
    }

    // ==================== Queries ====================

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let inner = self.lock_inner();
        match inner.active.as_ref() {
            Some(active) => PlaybackSnapshot {
                current_audio_id: Some(active.info.article_id.clone()),
                is_playing: active.state == HandleState::Playing,
                state: active.state,
                player_info: Some(active.info.clone()),
                position_secs: active.position_secs,
                duration_secs: active.duration_secs,
                last_error: inner.last_error.clone(),
            },
            None => PlaybackSnapshot {
                last_error: inner.last_error.clone(),
                ..PlaybackSnapshot::default()
            },
        }
    }

    /// Whether `article_id` owns the now-playing slot
    pub fn is_current(&self, article_id: &str) -> bool {
        self.lock_inner()
            .active
            .as_ref()
            .is_some_and(|a| a.info.article_id == article_id)
    }

    pub fn is_playing(&self) -> bool {
        self.lock_inner()
            .active
            .as_ref()
            .is_some_and(|a| a.state == HandleState::Playing)
    }

    pub fn current_handle(&self) -> Option<HandleId> {
        self.lock_inner().active.as_ref().map(|a| a.id)
    }

    pub fn minimal_player_info(&self) -> Option<MinimalPlayerInfo> {
        self.lock_inner().active.as_ref().map(|a| a.info.clone())
    }
}

impl PlaybackSnapshot {
    pub fn audio_url(&self) -> Option<&str> {
        self.player_info.as_ref().map(|i| i.audio_url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Load(HandleId, String),
        Play(HandleId),
        Pause(HandleId),
        Release(HandleId),
    }

    /// Backend that records calls and tracks which handles are audible
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<Call>>,
        playing: Mutex<HashMap<HandleId, bool>>,
        blocked_urls: Mutex<HashSet<String>>,
        urls: Mutex<HashMap<HandleId, String>>,
    }

    impl RecordingBackend {
        fn block(&self, url: &str) {
            self.blocked_urls.lock().unwrap().insert(url.to_string());
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn audible(&self) -> Vec<HandleId> {
            let mut ids: Vec<HandleId> = self
                .playing
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, playing)| **playing)
                .map(|(id, _)| *id)
                .collect();
            ids.sort();
            ids
        }
    }

    impl AudioBackend for RecordingBackend {
        fn load(&self, handle: HandleId, audio_url: &str) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::Load(handle, audio_url.to_string()));
            self.urls.lock().unwrap().insert(handle, audio_url.to_string());
            if audio_url.ends_with(".broken") {
                return Err(BackendError::Network("404".to_string()));
            }
            Ok(())
        }

        fn play(&self, handle: HandleId) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::Play(handle));
            let url = self.urls.lock().unwrap().get(&handle).cloned().unwrap_or_default();
            if self.blocked_urls.lock().unwrap().contains(&url) {
                return Err(BackendError::Blocked("autoplay".to_string()));
            }
            self.playing.lock().unwrap().insert(handle, true);
            Ok(())
        }

        fn pause(&self, handle: HandleId) {
            self.calls.lock().unwrap().push(Call::Pause(handle));
            self.playing.lock().unwrap().insert(handle, false);
        }

        fn release(&self, handle: HandleId) {
            self.calls.lock().unwrap().push(Call::Release(handle));
            self.playing.lock().unwrap().remove(&handle);
        }
    }

    fn setup() -> (PlaybackCoordinator, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let coordinator = PlaybackCoordinator::new(backend.clone());
        (coordinator, backend)
    }

    fn request(article: &str) -> PlayRequest {
        PlayRequest::new("cf88", article, article.trim_start_matches("art"), format!("https://cdn.example.com/{}.mp3", article))
    }

    fn collect_events(coordinator: &PlaybackCoordinator) -> (Subscription, Arc<Mutex<Vec<PlaybackEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = coordinator.subscribe(move |e| sink.lock().unwrap().push(e.clone()));
        (subscription, events)
    }

    #[test]
    fn test_play_publishes_now_playing() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);

        coordinator.play(request("art5"), None).unwrap();

        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.current_audio_id.as_deref(), Some("art5"));
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.state, HandleState::Playing);
        assert_eq!(backend.audible(), vec![HandleId(1)]);
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[PlaybackEvent::NowPlaying(NowPlayingEvent {
                article_id: "art5".to_string(),
                article_number: "5".to_string(),
                audio_url: "https://cdn.example.com/art5.mp3".to_string(),
            })]
        );
    }

    #[test]
    fn test_play_other_article_pauses_previous() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);

        coordinator.play(request("art1"), None).unwrap();
        coordinator.play(request("art2"), None).unwrap();

        assert_eq!(coordinator.snapshot().current_audio_id.as_deref(), Some("art2"));
        assert_eq!(backend.audible(), vec![HandleId(2)]);

        let calls = backend.calls();
        let pause_a = calls.iter().position(|c| *c == Call::Pause(HandleId(1))).unwrap();
        let play_b = calls.iter().position(|c| *c == Call::Play(HandleId(2))).unwrap();
        assert!(pause_a < play_b);
        assert!(calls.contains(&Call::Release(HandleId(1))));

        let events = events.lock().unwrap();
        let articles: Vec<&str> = events.iter().map(|e| e.article_id()).collect();
        assert_eq!(articles, vec!["art1", "art1", "art2"]);
        assert!(matches!(&events[1], PlaybackEvent::AudioPaused(e) if e.article_id == "art1"));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);

        coordinator.play(request("art1"), None).unwrap();
        coordinator.stop_current_audio();
        let calls_after_first = backend.calls().len();
        let events_after_first = events.lock().unwrap().len();

        coordinator.stop_current_audio();

        assert_eq!(backend.calls().len(), calls_after_first);
        assert_eq!(events.lock().unwrap().len(), events_after_first);
        let snapshot = coordinator.snapshot();
        assert!(snapshot.current_audio_id.is_none());
        assert!(!snapshot.is_playing);
    }

    #[test]
    fn test_pause_and_resume_republishes() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);

        coordinator.play(request("art1"), None).unwrap();
        coordinator.pause();
        assert!(!coordinator.is_playing());
        assert_eq!(coordinator.snapshot().state, HandleState::Paused);

        coordinator.resume().unwrap();
        assert!(coordinator.is_playing());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], PlaybackEvent::NowPlaying(_)));
        // Same handle, no reload
        assert_eq!(
            backend.calls().iter().filter(|c| matches!(c, Call::Load(..))).count(),
            1
        );
    }

    #[test]
    fn test_play_same_article_reuses_handle() {
        let (coordinator, backend) = setup();
        coordinator.play(request("art1"), None).unwrap();
        coordinator.pause();
        coordinator.play(request("art1"), None).unwrap();

        assert_eq!(coordinator.current_handle(), Some(HandleId(1)));
        assert!(coordinator.is_playing());
        assert!(!backend.calls().contains(&Call::Release(HandleId(1))));
    }

    #[test]
    fn test_toggle() {
        let (coordinator, _backend) = setup();
        assert!(matches!(coordinator.toggle(), Err(PlaybackError::NoActiveAudio)));

        coordinator.toggle_article(request("art1"), None).unwrap();
        assert!(coordinator.is_playing());
        coordinator.toggle_article(request("art1"), None).unwrap();
        assert!(!coordinator.is_playing());
        coordinator.toggle().unwrap();
        assert!(coordinator.is_playing());

        coordinator.toggle_article(request("art2"), None).unwrap();
        assert!(coordinator.is_current("art2"));
        assert!(coordinator.is_playing());
    }

    #[test]
    fn test_rejected_start_clears_state() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);
        backend.block("https://cdn.example.com/art9.mp3");

        let result = coordinator.play(request("art9"), None);
        assert!(matches!(result, Err(PlaybackError::Backend(BackendError::Blocked(_)))));

        let snapshot = coordinator.snapshot();
        assert!(!snapshot.is_playing);
        assert!(snapshot.current_audio_id.is_none());
        assert!(snapshot.last_error.is_some());
        assert!(backend.calls().contains(&Call::Release(HandleId(1))));
        assert!(matches!(events.lock().unwrap().last(), Some(PlaybackEvent::PlaybackFailed(e)) if e.article_id == "art9"));

        // Ready for the next request
        coordinator.play(request("art1"), None).unwrap();
        assert!(coordinator.is_playing());
        assert!(coordinator.snapshot().last_error.is_none());
    }

    #[test]
    fn test_load_failure() {
        let (coordinator, _backend) = setup();
        let mut broken = request("art3");
        broken.audio_url = "https://cdn.example.com/art3.broken".to_string();

        assert!(matches!(
            coordinator.play(broken, None),
            Err(PlaybackError::Backend(BackendError::Network(_)))
        ));
        assert!(!coordinator.is_playing());
        assert!(coordinator.minimal_player_info().is_none());
    }

    #[test]
    fn test_missing_audio_url_short_circuits() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);
        coordinator.play(request("art1"), None).unwrap();

        let mut no_audio = request("art2");
        no_audio.audio_url = String::new();
        assert!(matches!(
            coordinator.play(no_audio, None),
            Err(PlaybackError::MissingAudio(_))
        ));

        // The current playback is untouched
        assert!(coordinator.is_current("art1"));
        assert!(coordinator.is_playing());
        assert_eq!(backend.calls().len(), 2);
        assert!(matches!(events.lock().unwrap().last(), Some(PlaybackEvent::PlaybackFailed(_))));
    }

    #[test]
    fn test_dropping_owner_stops_playback() {
        let (coordinator, backend) = setup();
        let player = coordinator.subscribe(|_| {});
        let (_observer, events) = collect_events(&coordinator);

        coordinator.play(request("art1"), Some(&player)).unwrap();
        assert_eq!(coordinator.listener_count(), 2);

        drop(player);

        assert_eq!(coordinator.listener_count(), 1);
        assert!(!coordinator.is_playing());
        assert!(coordinator.snapshot().current_audio_id.is_none());
        assert!(backend.audible().is_empty());
        assert!(matches!(events.lock().unwrap().last(), Some(PlaybackEvent::AudioPaused(_))));
    }

    #[test]
    fn test_dropping_observer_keeps_playback() {
        let (coordinator, _backend) = setup();
        let observer = coordinator.subscribe(|_| {});

        coordinator.play(request("art1"), None).unwrap();
        drop(observer);

        assert_eq!(coordinator.listener_count(), 0);
        assert!(coordinator.is_playing());
    }

    #[test]
    fn test_media_events() {
        let (coordinator, _backend) = setup();
        let (_sub, events) = collect_events(&coordinator);
        coordinator.play(request("art1"), None).unwrap();
        let handle = coordinator.current_handle().unwrap();

        coordinator.handle_media_event(handle, MediaEvent::LoadedMetadata { duration_secs: 90.0 });
        coordinator.handle_media_event(handle, MediaEvent::TimeUpdate { position_secs: 12.5 });
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.duration_secs, Some(90.0));
        assert_eq!(snapshot.position_secs, 12.5);
        // Metadata after start does not move a playing handle back to ready
        assert_eq!(snapshot.state, HandleState::Playing);

        coordinator.handle_media_event(handle, MediaEvent::Ended);
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.state, HandleState::Ended);
        assert!(!snapshot.is_playing);
        assert_eq!(snapshot.position_secs, 90.0);
        assert!(matches!(events.lock().unwrap().last(), Some(PlaybackEvent::AudioEnded(e)) if e.article_id == "art1"));

        // Replay from the start
        coordinator.resume().unwrap();
        assert_eq!(coordinator.snapshot().position_secs, 0.0);
        assert!(coordinator.is_playing());
    }

    #[test]
    fn test_external_pause_and_error() {
        let (coordinator, backend) = setup();
        coordinator.play(request("art1"), None).unwrap();
        let handle = coordinator.current_handle().unwrap();

        coordinator.handle_media_event(handle, MediaEvent::Pause);
        assert_eq!(coordinator.snapshot().state, HandleState::Paused);
        coordinator.handle_media_event(handle, MediaEvent::Play);
        assert!(coordinator.is_playing());

        coordinator.handle_media_event(handle, MediaEvent::Error { message: "decode".to_string() });
        assert!(!coordinator.is_playing());
        assert!(coordinator.current_handle().is_none());
        assert!(backend.calls().contains(&Call::Release(handle)));
    }

    #[test]
    fn test_stale_handle_events_ignored() {
        let (coordinator, _backend) = setup();
        coordinator.play(request("art1"), None).unwrap();
        let old = coordinator.current_handle().unwrap();
        coordinator.play(request("art2"), None).unwrap();

        coordinator.handle_media_event(old, MediaEvent::Ended);
        coordinator.handle_media_event(old, MediaEvent::Error { message: "late".to_string() });

        assert!(coordinator.is_current("art2"));
        assert!(coordinator.is_playing());
    }

    #[test]
    fn test_listener_can_call_back_into_coordinator() {
        let (coordinator, _backend) = setup();
        let inner = coordinator.clone();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_listener = Arc::clone(&seen);
        let _sub = coordinator.subscribe(move |event| {
            if let PlaybackEvent::NowPlaying(_) = event {
                *seen_in_listener.lock().unwrap() = Some(inner.snapshot().is_playing);
            }
        });

        coordinator.play(request("art1"), None).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_at_most_one_audible_handle() {
        let (coordinator, backend) = setup();
        for article in ["art1", "art2", "art1", "art3", "art2"] {
            coordinator.play(request(article), None).unwrap();
            assert_eq!(backend.audible().len(), 1);
            assert!(coordinator.is_current(article));
        }
    }

    #[test]
    fn test_error_while_paused_reports_failure() {
        let (coordinator, backend) = setup();
        let (_sub, events) = collect_events(&coordinator);
        coordinator.play(request("art1"), None).unwrap();
        coordinator.pause();
        let handle = coordinator.current_handle().unwrap();

        coordinator.handle_media_event(handle, MediaEvent::Error { message: "stalled".to_string() });

        let snapshot = coordinator.snapshot();
        assert!(snapshot.current_audio_id.is_none());
        assert!(snapshot.last_error.as_deref().is_some_and(|e| e.contains("stalled")));
        assert!(backend.calls().contains(&Call::Release(handle)));
        assert!(matches!(events.lock().unwrap().last(), Some(PlaybackEvent::PlaybackFailed(e)) if e.article_id == "art1"));
    }

    /// Backend that reports media events synchronously from inside its calls
    #[derive(Default)]
    struct CallbackBackend {
        coordinator: Mutex<Option<PlaybackCoordinator>>,
    }

    impl CallbackBackend {
        fn report(&self, handle: HandleId, event: MediaEvent) {
            let coordinator = self.coordinator.lock().unwrap().clone();
            if let Some(coordinator) = coordinator {
                coordinator.handle_media_event(handle, event);
            }
        }
    }

    impl AudioBackend for CallbackBackend {
        fn load(&self, handle: HandleId, _audio_url: &str) -> Result<(), BackendError> {
            self.report(handle, MediaEvent::LoadedMetadata { duration_secs: 42.0 });
            Ok(())
        }

        fn play(&self, handle: HandleId) -> Result<(), BackendError> {
            self.report(handle, MediaEvent::Play);
            Ok(())
        }

        fn pause(&self, handle: HandleId) {
            self.report(handle, MediaEvent::Pause);
        }

        fn release(&self, handle: HandleId) {
            self.report(handle, MediaEvent::TimeUpdate { position_secs: 0.0 });
        }
    }

    #[test]
    fn test_backend_may_report_events_synchronously() {
        let backend = Arc::new(CallbackBackend::default());
        let coordinator = PlaybackCoordinator::new(backend.clone());
        *backend.coordinator.lock().unwrap() = Some(coordinator.clone());
        let (_sub, events) = collect_events(&coordinator);

        coordinator.play(request("art1"), None).unwrap();
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.state, HandleState::Playing);
        assert_eq!(snapshot.duration_secs, Some(42.0));

        coordinator.pause();
        assert_eq!(coordinator.snapshot().state, HandleState::Paused);

        coordinator.play(request("art2"), None).unwrap();
        assert!(coordinator.is_current("art2"));
        assert!(coordinator.is_playing());

        let kinds: Vec<&str> = events
            .lock()
            .unwrap()
            .iter()
            .map(|e| match e {
                PlaybackEvent::NowPlaying(_) => "nowPlaying",
                PlaybackEvent::AudioPaused(_) => "audioPaused",
                PlaybackEvent::AudioEnded(_) => "audioEnded",
                PlaybackEvent::PlaybackFailed(_) => "playbackFailed",
            })
            .collect();
        assert_eq!(kinds, vec!["nowPlaying", "audioPaused", "nowPlaying"]);

        *backend.coordinator.lock().unwrap() = None;
    }

    #[test]
    fn test_owner_drop_never_stops_newer_playback() {
        for _ in 0..200 {
            let (coordinator, backend) = setup();
            let player = coordinator.subscribe(|_| {});
            coordinator.play(request("art1"), Some(&player)).unwrap();

            let other = coordinator.clone();
            let unmount = std::thread::spawn(move || drop(player));
            let takeover = std::thread::spawn(move || other.play(request("art2"), None));
            unmount.join().unwrap();
            takeover.join().unwrap().unwrap();

            assert!(coordinator.is_current("art2"));
            assert!(coordinator.is_playing());
            assert_eq!(backend.audible().len(), 1);
        }
    }
}
