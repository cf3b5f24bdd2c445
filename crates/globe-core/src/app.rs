//! Application context: owns every piece of state and turns events into
//! state transitions plus follow-up effects for the host.

use std::time::Duration;

use chrono::{DateTime, Utc};
use glam::DVec2;
use globe_proto::config::Config;
use globe_proto::model::{PlaybackStatus, Station};
use globe_proto::state::{Favorites, History};
use globe_proto::storage::KeyValueStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::camera::{self, OrbitCamera, Viewport};
use crate::hit_test::{self, HoverState};
use crate::i18n::{Localizer, TextKey};
use crate::markers::{MarkerId, MarkerRegistry};
use crate::playback::{AttemptId, AudioBackend, PlaybackController, PlaybackEffect, StreamEvent};
use crate::region::{self, RegionSelection};
use crate::scene::SceneBackend;
use crate::station_list::{StationListView, Tab};
use crate::timezone::{ResolveRequest, TimezoneResolver};
use crate::zoom::{ZoomAnimator, ZoomStep};

/// Tunables, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub base_radius: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub hover_threshold_px: f64,
    pub timeout: Duration,
    pub default_volume: u8,
    pub history_limit: usize,
    pub default_language: String,
    pub timezone_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        Self {
            base_radius: config.globe.base_radius,
            min_scale: config.globe.min_scale,
            max_scale: config.globe.max_scale,
            hover_threshold_px: config.globe.hover_threshold_px,
            timeout: Duration::from_secs(config.playback.timeout_secs),
            default_volume: config.playback.default_volume,
            history_limit: config.playback.history_limit,
            default_language: config.ui.default_language.clone(),
            timezone_enabled: config.timezone.enabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    Up(usize),
    Down(usize),
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobeEvent {
    CatalogLoaded(Vec<Station>),
    CatalogFailed(String),
    PointerMoved(DVec2),
    PointerClicked(DVec2),
    PointerLeft,
    /// Globe viewport in pixels and the number of list rows on screen.
    Resized { width: f64, height: f64, list_rows: usize },
    FrameTick,
    Zoom(f64),
    Orbit { yaw: f64, pitch: f64 },
    SetContinent(Option<String>),
    SetCountry(Option<String>),
    Back,
    SelectTab(Tab),
    Search(String),
    MoveCursor(CursorMove),
    SelectRow(usize),
    ToggleFavoriteCurrent,
    ToggleFavoriteRow(usize),
    TogglePlayPause,
    PlayRandom,
    PlayPrevious,
    SetVolume(u8),
    SetLanguage(String),
    Stream(StreamEvent),
    TimeoutFired(AttemptId),
    TimezoneResolved { key: String, zone: Option<String> },
}

/// Async work the host schedules; results come back as events.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send `TimeoutFired(attempt)` after `after`.
    ArmTimeout { attempt: AttemptId, after: Duration },
    /// Resolve a zone and send `TimezoneResolved`.
    ResolveLocalTime(ResolveRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogState {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

/// Hover popup content, anchored at the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverInfo {
    pub marker: MarkerId,
    pub name: String,
    pub location: String,
    pub pointer: DVec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub index: usize,
    pub marker: MarkerId,
    pub name: String,
    pub location: String,
    pub favorite: bool,
    pub homepage: Option<String>,
    pub local_time: Option<String>,
    pub selected: bool,
    pub playing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub title: String,
    pub location: String,
    pub status_text: Option<&'static str>,
    pub is_playing: bool,
    pub favorite: bool,
    pub volume: u8,
    pub local_time: String,
}

pub struct GlobeApp<S: SceneBackend, A: AudioBackend, K: KeyValueStore> {
    settings: AppSettings,
    scene: S,
    store: K,
    localizer: Localizer,
    playback: PlaybackController<A>,
    catalog: Vec<Station>,
    catalog_state: CatalogState,
    registry: MarkerRegistry,
    zoom: ZoomAnimator,
    camera: OrbitCamera,
    viewport: Viewport,
    region: RegionSelection,
    applied_region: RegionSelection,
    list: StationListView,
    list_rows: usize,
    timezones: TimezoneResolver,
    hover: HoverState,
    pointer: Option<DVec2>,
    rng: StdRng,
}

impl<S: SceneBackend, A: AudioBackend, K: KeyValueStore> GlobeApp<S, A, K> {
    pub fn new(settings: AppSettings, scene: S, audio: A, store: K) -> Self {
        let localizer = Localizer::load(&store, &settings.default_language);
        let favorites = Favorites::load(&store);
        let history = History::load(&store, settings.history_limit);
        info!(
            "starting with {} favorites, {} history entries, language {}",
            favorites.len(),
            history.len(),
            localizer.language().code()
        );
        let playback = PlaybackController::new(
            audio,
            favorites,
            history,
            settings.default_volume,
            settings.timeout,
        );
        let viewport = Viewport::new(800.0, 600.0);
        let max_scale = settings.max_scale.min(camera::max_scale_for(settings.base_radius));
        if max_scale < settings.max_scale {
            warn!(
                "max_scale {} would put the camera inside the globe, using {}",
                settings.max_scale, max_scale
            );
        }
        Self {
            zoom: ZoomAnimator::new(settings.min_scale, max_scale),
            camera: OrbitCamera::new(viewport.aspect()),
            timezones: TimezoneResolver::new(settings.timezone_enabled),
            settings,
            scene,
            store,
            localizer,
            playback,
            catalog: Vec::new(),
            catalog_state: CatalogState::Loading,
            registry: MarkerRegistry::default(),
            viewport,
            region: RegionSelection::all(),
            applied_region: RegionSelection::all(),
            list: StationListView::new(),
            list_rows: 20,
            hover: HoverState::default(),
            pointer: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic random picks.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn handle(&mut self, event: GlobeEvent) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            GlobeEvent::CatalogLoaded(stations) => {
                self.load_catalog(stations);
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::CatalogFailed(reason) => {
                warn!("catalog load failed: {}", reason);
                self.catalog_state = CatalogState::Failed(reason);
            }
            GlobeEvent::PointerMoved(pointer) => {
                self.pointer = Some(pointer);
                self.hover = hit_test::apply_hover(
                    pointer,
                    &self.camera,
                    self.viewport,
                    &mut self.registry,
                    &mut self.scene,
                    self.settings.hover_threshold_px,
                );
            }
            GlobeEvent::PointerClicked(pointer) => {
                let hit = hit_test::hit_test_ray(pointer, &self.camera, self.viewport, &self.registry);
                if let Some(station) = hit.and_then(|id| self.registry.get(id)).map(|m| m.station.clone()) {
                    self.play(&station, &mut effects);
                }
            }
            GlobeEvent::PointerLeft => {
                self.pointer = None;
                if self.hover.marker.is_some() {
                    self.registry.reset_highlights(&mut self.scene);
                }
                self.hover = HoverState::default();
            }
            GlobeEvent::Resized {
                width,
                height,
                list_rows,
            } => {
                self.viewport = Viewport::new(width.max(1.0), height.max(1.0));
                self.camera.set_aspect(self.viewport.aspect());
                self.list_rows = list_rows;
                self.list.ensure_visible(list_rows);
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::FrameTick => self.on_frame(),
            GlobeEvent::Zoom(step) => self.zoom.zoom_by(step),
            GlobeEvent::Orbit { yaw, pitch } => self.camera.rotate(yaw, pitch),
            GlobeEvent::SetContinent(continent) => {
                self.region = RegionSelection {
                    continent,
                    country: None,
                };
                self.apply_region(self.region.clone());
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::SetCountry(country) => {
                self.region.country = country;
                self.apply_region(self.region.clone());
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::Back => {
                self.region.country = None;
                self.list.reset();
                self.apply_region(RegionSelection::all());
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::SelectTab(tab) => {
                self.list.set_tab(tab);
                self.refresh_list();
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::Search(query) => {
                self.list.set_search(&query);
                self.refresh_list();
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::MoveCursor(movement) => {
                match movement {
                    CursorMove::Up(n) => self.list.select_up(n),
                    CursorMove::Down(n) => self.list.select_down(n),
                    CursorMove::First => self.list.select_first(),
                    CursorMove::Last => self.list.select_last(),
                }
                self.list.ensure_visible(self.list_rows);
                self.request_window_zones(&mut effects);
            }
            GlobeEvent::SelectRow(idx) => {
                if let Some(station) = self.list.select_row(idx, &mut self.registry, &mut self.scene) {
                    self.list.ensure_visible(self.list_rows);
                    self.play(&station, &mut effects);
                }
            }
            GlobeEvent::ToggleFavoriteCurrent => {
                if let Some(station) = self.playback.current().cloned() {
                    self.toggle_favorite(&station);
                }
            }
            GlobeEvent::ToggleFavoriteRow(idx) => {
                if let Some(row) = self.list.rows().get(idx) {
                    let station = row.station.clone();
                    self.toggle_favorite(&station);
                }
            }
            GlobeEvent::TogglePlayPause => self.playback.toggle_play_pause(),
            GlobeEvent::PlayRandom => {
                let candidates: Vec<Station> = self.registry.iter().map(|m| m.station.clone()).collect();
                let raw = self.playback.play_random(&candidates, &mut self.rng, &mut self.store);
                self.collect_playback(raw, &mut effects);
            }
            GlobeEvent::PlayPrevious => {
                let raw = self.playback.play_previous(&mut self.store);
                self.collect_playback(raw, &mut effects);
            }
            GlobeEvent::SetVolume(volume) => self.playback.set_volume(volume),
            GlobeEvent::SetLanguage(code) => {
                if let Err(e) = self.localizer.set_language(&code, &mut self.store) {
                    warn!("{}", e);
                }
            }
            GlobeEvent::Stream(event) => {
                let raw = self.playback.on_stream_event(event);
                self.collect_playback(raw, &mut effects);
            }
            GlobeEvent::TimeoutFired(attempt) => {
                self.playback.on_timeout(attempt);
            }
            GlobeEvent::TimezoneResolved { key, zone } => {
                debug!("zone for {}: {:?}", key, zone);
                self.timezones.complete(key, zone);
            }
        }
        effects
    }

    fn load_catalog(&mut self, stations: Vec<Station>) {
        self.scene.clear();
        self.hover = HoverState::default();
        let radius = self.settings.base_radius * self.zoom.scale();
        self.registry = MarkerRegistry::build(&stations, radius, &mut self.scene);
        info!(
            "catalog ready: {} stations, {} markers",
            stations.len(),
            self.registry.len()
        );
        self.catalog = stations;
        self.catalog_state = CatalogState::Ready;
        self.apply_region(self.applied_region.clone());
    }

    /// Advances the zoom transition and camera damping by one frame.  The
    /// settling frame rescales once more so the final radius is exact.
    fn on_frame(&mut self) {
        if let Some(step) = self.zoom.step() {
            let radius = self.settings.base_radius * step.scale();
            self.registry.rescale(radius, &mut self.scene);
            if let ZoomStep::Settled(scale) = step {
                debug!("zoom settled at {}", scale);
            }
        }
        self.camera.update();
    }

    fn apply_region(&mut self, selection: RegionSelection) {
        let shown = region::apply(&selection, &mut self.registry, &mut self.scene);
        debug!("region {:?}: {} markers visible", selection, shown.len());
        self.applied_region = selection;
        self.refresh_list();
    }

    fn refresh_list(&mut self) {
        self.list
            .refresh(&self.registry, self.playback.favorites(), self.playback.history());
        self.list.ensure_visible(self.list_rows);
    }

    fn refresh_history_tab(&mut self) {
        if self.list.tab() == Tab::History {
            self.refresh_list();
        }
    }

    fn play(&mut self, station: &Station, effects: &mut Vec<Effect>) {
        let raw = self.playback.play(station, &mut self.store);
        self.collect_playback(raw, effects);
    }

    fn toggle_favorite(&mut self, station: &Station) {
        let now = self.playback.toggle_favorite(station, &mut self.store);
        debug!("favorite {} -> {}", station.stream_url, now);
        if self.list.tab() == Tab::Favorites {
            self.refresh_list();
        }
    }

    fn collect_playback(&mut self, raw: Vec<PlaybackEffect>, effects: &mut Vec<Effect>) {
        for effect in raw {
            match effect {
                PlaybackEffect::ArmTimeout { attempt, after } => {
                    effects.push(Effect::ArmTimeout { attempt, after });
                }
                PlaybackEffect::RefreshLocalTime(station) => {
                    if let Some(req) = self.timezones.request(&station) {
                        effects.push(Effect::ResolveLocalTime(req));
                    }
                }
                // the player view reads favorite state on every draw
                PlaybackEffect::RefreshFavoriteButton => {}
            }
        }
        self.refresh_history_tab();
    }

    fn request_window_zones(&mut self, effects: &mut Vec<Effect>) {
        let window: Vec<Station> = self
            .list
            .visible_rows(self.list_rows)
            .map(|(_, row)| row.station.clone())
            .collect();
        for station in &window {
            if let Some(req) = self.timezones.request(station) {
                effects.push(Effect::ResolveLocalTime(req));
            }
        }
    }

    // ── read access for views ────────────────────────────────────────────

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn catalog(&self) -> &[Station] {
        &self.catalog
    }

    pub fn catalog_state(&self) -> &CatalogState {
        &self.catalog_state
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn globe_radius(&self) -> f64 {
        self.settings.base_radius * self.zoom.scale()
    }

    pub fn zoom(&self) -> &ZoomAnimator {
        &self.zoom
    }

    pub fn playback(&self) -> &PlaybackController<A> {
        &self.playback
    }

    pub fn list(&self) -> &StationListView {
        &self.list
    }

    pub fn list_rows(&self) -> usize {
        self.list_rows
    }

    pub fn region(&self) -> &RegionSelection {
        &self.region
    }

    pub fn applied_region(&self) -> &RegionSelection {
        &self.applied_region
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn text(&self, key: TextKey) -> &'static str {
        self.localizer.text(key)
    }

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn hover_info(&self) -> Option<HoverInfo> {
        let id = self.hover.marker?;
        let marker = self.registry.get(id)?;
        Some(HoverInfo {
            marker: id,
            name: marker.station.name.clone(),
            location: marker.station.location_label(),
            pointer: self.pointer?,
        })
    }

    /// Rows inside the list window, ready to draw.
    pub fn visible_row_views(&self, now: DateTime<Utc>) -> Vec<RowView> {
        let current = self.playback.current().map(|s| s.stream_url.as_str());
        self.list
            .visible_rows(self.list_rows)
            .map(|(index, row)| RowView {
                index,
                marker: row.marker,
                name: row.station.name.clone(),
                location: row.station.location_label(),
                favorite: self.playback.is_favorite(&row.station.stream_url),
                homepage: row.station.homepage().map(str::to_string),
                local_time: self.timezones.label(&row.station, now),
                selected: index == self.list.selected,
                playing: current == Some(row.station.stream_url.as_str()),
            })
            .collect()
    }

    pub fn player_view(&self, now: DateTime<Utc>) -> PlayerView {
        let unknown = self.text(TextKey::Unknown).to_string();
        match self.playback.current() {
            Some(station) => PlayerView {
                title: station.name.clone(),
                location: station.location_label(),
                status_text: self.playback.status_text_key().map(|k| self.text(k)),
                is_playing: self.playback.status() == PlaybackStatus::Playing,
                favorite: self.playback.is_favorite(&station.stream_url),
                volume: self.playback.volume(),
                local_time: self.timezones.label(station, now).unwrap_or(unknown),
            },
            None => PlayerView {
                title: self.text(TextKey::SelectStation).to_string(),
                location: String::new(),
                status_text: None,
                is_playing: false,
                favorite: false,
                volume: self.playback.volume(),
                local_time: unknown,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::tests::RecordingAudio;
    use crate::scene::SceneGraph;
    use globe_proto::storage::MemoryStore;

    type TestApp = GlobeApp<SceneGraph, RecordingAudio, MemoryStore>;

    fn station(url: &str, country: &str, lat: f64, lon: f64) -> Station {
        Station {
            name: url.to_uppercase(),
            country: country.to_string(),
            city: "Town".to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
            stream_url: url.to_string(),
            ..Station::default()
        }
    }

    fn app() -> TestApp {
        let settings = AppSettings {
            timezone_enabled: false,
            ..AppSettings::default()
        };
        let mut app = GlobeApp::new(settings, SceneGraph::new(), RecordingAudio::default(), MemoryStore::new())
            .with_rng_seed(3);
        app.handle(GlobeEvent::CatalogLoaded(vec![
            station("a", "France", 48.0, 2.0),
            station("b", "Japan", 35.0, 139.0),
            station("c", "Italy", 41.9, 12.5),
        ]));
        app
    }

    #[test]
    fn test_catalog_builds_markers_and_list() {
        let app = app();
        assert_eq!(app.catalog_state(), &CatalogState::Ready);
        assert_eq!(app.registry().len(), 3);
        assert_eq!(app.list().len(), 3);
    }

    #[test]
    fn test_failed_catalog_keeps_running() {
        let mut app = GlobeApp::new(
            AppSettings::default(),
            SceneGraph::new(),
            RecordingAudio::default(),
            MemoryStore::new(),
        );
        app.handle(GlobeEvent::CatalogFailed("boom".into()));
        assert_eq!(app.catalog_state(), &CatalogState::Failed("boom".into()));
        assert!(app.registry().is_empty());
    }

    #[test]
    fn test_select_row_plays_and_arms_timeout() {
        let mut app = app();
        let effects = app.handle(GlobeEvent::SelectRow(1));
        assert_eq!(
            effects,
            vec![Effect::ArmTimeout {
                attempt: AttemptId(1),
                after: Duration::from_secs(5)
            }]
        );
        assert_eq!(app.playback().current().map(|s| s.stream_url.as_str()), Some("b"));
        assert_eq!(app.player_view(Utc::now()).status_text, Some("加载中..."));
    }

    #[test]
    fn test_region_then_back() {
        let mut app = app();
        app.handle(GlobeEvent::SetContinent(Some("Europe".into())));
        assert_eq!(app.list().len(), 2);
        app.handle(GlobeEvent::SetCountry(Some("Italy".into())));
        assert_eq!(app.list().len(), 1);

        app.handle(GlobeEvent::SelectTab(Tab::History));
        app.handle(GlobeEvent::Back);
        assert_eq!(app.list().tab(), Tab::All);
        assert_eq!(app.list().len(), 3);
        assert_eq!(app.region().continent.as_deref(), Some("Europe"));
        assert_eq!(app.region().country, None);
    }

    #[test]
    fn test_favorites_tab_refreshes_on_toggle() {
        let mut app = app();
        app.handle(GlobeEvent::SelectTab(Tab::Favorites));
        assert!(app.list().is_empty());
        app.handle(GlobeEvent::SelectTab(Tab::All));
        app.handle(GlobeEvent::ToggleFavoriteRow(0));
        app.handle(GlobeEvent::SelectTab(Tab::Favorites));
        assert_eq!(app.list().len(), 1);
        app.handle(GlobeEvent::ToggleFavoriteRow(0));
        assert!(app.list().is_empty());
        assert_eq!(app.store().get("favorites").as_deref(), Some("[]"));
    }

    #[test]
    fn test_zoom_settles_on_exact_radius() {
        let mut app = app();
        app.handle(GlobeEvent::Zoom(0.5));
        for _ in 0..500 {
            app.handle(GlobeEvent::FrameTick);
        }
        assert!(!app.zoom().is_animating());
        assert_eq!(app.globe_radius(), 3.0);
        for marker in app.registry().iter() {
            assert!((marker.position.length() - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_language_is_ignored() {
        let mut app = app();
        app.handle(GlobeEvent::SetLanguage("en".into()));
        app.handle(GlobeEvent::SetLanguage("xx".into()));
        assert_eq!(app.text(TextKey::All), "All");
        assert_eq!(app.store().get("lang").as_deref(), Some("en"));
    }

    #[test]
    fn test_player_view_without_station() {
        let app = app();
        let view = app.player_view(Utc::now());
        assert_eq!(view.title, "选择电台");
        assert_eq!(view.local_time, "Unknown");
        assert!(!view.is_playing);
    }

    #[test]
    fn test_started_requests_local_time() {
        let settings = AppSettings {
            timezone_enabled: true,
            ..AppSettings::default()
        };
        let mut app = GlobeApp::new(settings, SceneGraph::new(), RecordingAudio::default(), MemoryStore::new());
        app.handle(GlobeEvent::Resized {
            width: 800.0,
            height: 600.0,
            list_rows: 0,
        });
        app.handle(GlobeEvent::CatalogLoaded(vec![station("a", "France", 48.0, 2.0)]));
        app.handle(GlobeEvent::SelectRow(0));
        let effects = app.handle(GlobeEvent::Stream(StreamEvent::Started(AttemptId(1))));
        assert_eq!(
            effects,
            vec![Effect::ResolveLocalTime(ResolveRequest {
                key: "town|france".into(),
                city: "Town".into(),
                country: "France".into(),
            })]
        );
        app.handle(GlobeEvent::TimezoneResolved {
            key: "town|france".into(),
            zone: Some("Europe/Paris".into()),
        });
        assert_ne!(app.player_view(Utc::now()).local_time, "Unknown");
    }
}
