//! Single-stream playback lifecycle plus favorites and history bookkeeping.

use std::time::Duration;

use globe_proto::model::{PlaybackStatus, Station};
use globe_proto::state::{Favorites, History};
use globe_proto::storage::KeyValueStore;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::i18n::TextKey;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tags one `attach` call.  Events carrying an older id belong to a stream
/// that has since been replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AttemptId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Started(AttemptId),
    Failed(AttemptId, String),
}

impl StreamEvent {
    pub fn attempt(&self) -> AttemptId {
        match self {
            StreamEvent::Started(a) | StreamEvent::Failed(a, _) => *a,
        }
    }
}

/// Audio output.  Implementations report readiness or failure
/// asynchronously as [`StreamEvent`]s tagged with the attempt passed to
/// `attach`.
pub trait AudioBackend {
    /// Stops and releases the current source.
    fn detach(&mut self);
    fn attach(&mut self, url: &str, attempt: AttemptId);
    fn pause(&mut self);
    fn resume(&mut self);
    /// 0..=100
    fn set_volume(&mut self, volume: u8);
}

impl<A: AudioBackend + ?Sized> AudioBackend for Box<A> {
    fn detach(&mut self) {
        (**self).detach()
    }

    fn attach(&mut self, url: &str, attempt: AttemptId) {
        (**self).attach(url, attempt)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn set_volume(&mut self, volume: u8) {
        (**self).set_volume(volume)
    }
}

/// Follow-up work for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEffect {
    ArmTimeout { attempt: AttemptId, after: Duration },
    RefreshLocalTime(Station),
    RefreshFavoriteButton,
}

pub struct PlaybackController<A: AudioBackend> {
    audio: A,
    current: Option<Station>,
    status: PlaybackStatus,
    volume: u8,
    attempt: AttemptId,
    timeout: Duration,
    favorites: Favorites,
    history: History,
}

impl<A: AudioBackend> PlaybackController<A> {
    pub fn new(mut audio: A, favorites: Favorites, history: History, volume: u8, timeout: Duration) -> Self {
        let volume = volume.min(100);
        audio.set_volume(volume);
        Self {
            audio,
            current: None,
            status: PlaybackStatus::Idle,
            volume,
            attempt: AttemptId::default(),
            timeout,
            favorites,
            history,
        }
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn current(&self) -> Option<&Station> {
        self.current.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn current_attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_favorite(&self, url: &str) -> bool {
        self.favorites.contains(url)
    }

    /// Switches to `station`: the previous stream is detached before the new
    /// one is attached, so only one source is ever live.
    pub fn play(&mut self, station: &Station, store: &mut dyn KeyValueStore) -> Vec<PlaybackEffect> {
        self.attempt = AttemptId(self.attempt.0 + 1);
        info!("play {:?} ({}) attempt {}", station.name, station.stream_url, self.attempt.0);

        self.current = Some(station.clone());
        self.status = PlaybackStatus::Loading;
        self.audio.detach();
        self.audio.attach(&station.stream_url, self.attempt);
        self.history.push(station, store);

        vec![PlaybackEffect::ArmTimeout {
            attempt: self.attempt,
            after: self.timeout,
        }]
    }

    pub fn on_stream_event(&mut self, event: StreamEvent) -> Vec<PlaybackEffect> {
        if event.attempt() != self.attempt {
            debug!("ignoring {:?} from superseded attempt", event);
            return Vec::new();
        }
        match event {
            StreamEvent::Started(_) => {
                self.status = PlaybackStatus::Playing;
                let mut effects = vec![PlaybackEffect::RefreshFavoriteButton];
                if let Some(station) = &self.current {
                    info!("stream started: {:?}", station.name);
                    effects.insert(0, PlaybackEffect::RefreshLocalTime(station.clone()));
                }
                effects
            }
            StreamEvent::Failed(_, reason) => {
                warn!("stream failed: {}", reason);
                self.status = PlaybackStatus::Failed;
                Vec::new()
            }
        }
    }

    /// Returns whether the status changed.  A later `Started` or `Failed`
    /// for the same attempt is still applied; the stream is not cancelled.
    pub fn on_timeout(&mut self, attempt: AttemptId) -> bool {
        if attempt != self.attempt || self.status != PlaybackStatus::Loading {
            return false;
        }
        warn!("attempt {} timed out after {:?}", attempt.0, self.timeout);
        self.status = PlaybackStatus::TimedOut;
        true
    }

    /// Pauses a playing stream, otherwise resumes the current one.  The
    /// status flips optimistically; no-op without a current station.
    pub fn toggle_play_pause(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.status == PlaybackStatus::Playing {
            self.audio.pause();
            self.status = PlaybackStatus::Idle;
        } else {
            self.audio.resume();
            self.status = PlaybackStatus::Playing;
        }
    }

    /// Returns whether the station is a favorite afterwards.
    pub fn toggle_favorite(&mut self, station: &Station, store: &mut dyn KeyValueStore) -> bool {
        if station.stream_url.is_empty() {
            return false;
        }
        self.favorites.toggle(&station.stream_url, store)
    }

    /// Uniform pick among `candidates` other than the current station.
    pub fn play_random<R: Rng + ?Sized>(
        &mut self,
        candidates: &[Station],
        rng: &mut R,
        store: &mut dyn KeyValueStore,
    ) -> Vec<PlaybackEffect> {
        let current_url = self.current.as_ref().map(|s| s.stream_url.as_str());
        let pool: Vec<&Station> = candidates
            .iter()
            .filter(|s| Some(s.stream_url.as_str()) != current_url)
            .collect();
        match pool.choose(rng) {
            Some(&station) => {
                let station = station.clone();
                self.play(&station, store)
            }
            None => Vec::new(),
        }
    }

    /// Plays the entry before the newest one in history.
    pub fn play_previous(&mut self, store: &mut dyn KeyValueStore) -> Vec<PlaybackEffect> {
        match self.history.get(1).cloned() {
            Some(station) => self.play(&station, store),
            None => Vec::new(),
        }
    }

    pub fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.audio.set_volume(self.volume);
    }

    pub fn status_text_key(&self) -> Option<TextKey> {
        match self.status {
            PlaybackStatus::Loading => Some(TextKey::Loading),
            PlaybackStatus::TimedOut => Some(TextKey::Timeout),
            PlaybackStatus::Failed => Some(TextKey::Failed),
            PlaybackStatus::Idle | PlaybackStatus::Playing => None,
        }
    }
}
