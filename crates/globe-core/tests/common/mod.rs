#![allow(dead_code)]

use globe_core::playback::{AttemptId, AudioBackend};
use globe_core::scene::SceneGraph;
use globe_core::{AppSettings, GlobeApp};
use globe_proto::model::Station;
use globe_proto::storage::MemoryStore;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Detach,
    Attach(String, AttemptId),
    Pause,
    Resume,
    Volume(u8),
}

#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub calls: Vec<AudioCall>,
}

impl RecordingAudio {
    pub fn attached_urls(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                AudioCall::Attach(url, _) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl AudioBackend for RecordingAudio {
    fn detach(&mut self) {
        self.calls.push(AudioCall::Detach);
    }

    fn attach(&mut self, url: &str, attempt: AttemptId) {
        self.calls.push(AudioCall::Attach(url.to_string(), attempt));
    }

    fn pause(&mut self) {
        self.calls.push(AudioCall::Pause);
    }

    fn resume(&mut self) {
        self.calls.push(AudioCall::Resume);
    }

    fn set_volume(&mut self, volume: u8) {
        self.calls.push(AudioCall::Volume(volume));
    }
}

pub type TestApp = GlobeApp<SceneGraph, RecordingAudio, MemoryStore>;

pub fn station(url: &str, name: &str, country: &str, lat: f64, lon: f64) -> Station {
    Station {
        name: name.to_string(),
        country: country.to_string(),
        city: String::new(),
        latitude: Some(lat),
        longitude: Some(lon),
        stream_url: url.to_string(),
        ..Station::default()
    }
}

pub fn settings() -> AppSettings {
    AppSettings {
        timezone_enabled: false,
        ..AppSettings::default()
    }
}

pub fn new_app() -> TestApp {
    app_with(settings())
}

pub fn app_with(settings: AppSettings) -> TestApp {
    GlobeApp::new(
        settings,
        SceneGraph::new(),
        RecordingAudio::default(),
        MemoryStore::new(),
    )
    .with_rng_seed(42)
}
