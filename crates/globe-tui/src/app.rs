//! Terminal host: owns the [`GlobeApp`], turns terminal input into
//! [`GlobeEvent`]s and runs the [`Effect`]s it asks for.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use globe_core::app::CursorMove;
use globe_core::i18n::TextKey;
use globe_core::playback::{AudioBackend, StreamEvent};
use globe_core::scene::SceneGraph;
use globe_core::station_list::Tab;
use globe_core::timezone::{self, TimezoneError};
use globe_core::{AppSettings, Effect, GlobeApp, GlobeEvent};
use globe_proto::catalog;
use globe_proto::config::Config;
use globe_proto::storage::{JsonFileStore, KeyValueStore};
use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect, Size},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::{mpsc, OnceCell};
use tracing::{debug, info, warn};
use unicode_width::UnicodeWidthStr;

use crate::components::globe_view::{self, pointer_in, viewport_for};
use crate::components::player_bar;
use crate::components::region_picker::RegionPicker;
use crate::components::sidebar::{self, SidebarAreas, STAR_COL};
use crate::mpv::{self, MpvAudio};
use crate::theme::{self, C_ACCENT, C_BG};
use crate::widgets::filter_input::{FilterAction, FilterInput};

/// Radians of orbit per arrow key press.
const ORBIT_STEP: f64 = 0.3;
/// Radians of orbit per cell dragged.
const DRAG_YAW_PER_CELL: f64 = 0.06;
const DRAG_PITCH_PER_CELL: f64 = 0.12;
const VOLUME_STEP: u8 = 5;
const WHEEL_ROWS: usize = 3;

pub enum AppMessage {
    Event(Event),
    Globe(GlobeEvent),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Areas {
    pub header: Rect,
    pub globe: Rect,
    pub globe_inner: Rect,
    pub sidebar: SidebarAreas,
    pub player: Rect,
}

impl Areas {
    pub fn new(area: Rect) -> Self {
        let [header, main, player] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .areas(area);
        let [globe, side] =
            Layout::horizontal([Constraint::Percentage(58), Constraint::Percentage(42)])
                .areas(main);
        Self {
            header,
            globe,
            globe_inner: Block::default().borders(Borders::ALL).inner(globe),
            sidebar: SidebarAreas::new(side),
            player,
        }
    }
}

fn contains(r: Rect, col: u16, row: u16) -> bool {
    r.width > 0 && r.height > 0 && col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Globe,
    List,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    last: (u16, u16),
    moved: bool,
}

type ZoneCache = Arc<OnceCell<Result<Vec<String>, TimezoneError>>>;

pub struct TuiApp<A: AudioBackend = MpvAudio, K: KeyValueStore = JsonFileStore> {
    globe: GlobeApp<SceneGraph, A, K>,
    filter: FilterInput,
    picker: RegionPicker,
    areas: Areas,
    focus: Focus,
    drag: Option<Drag>,
    pointer_inside: bool,
    zoom_step: f64,
    frame_interval: Duration,
    zones_url: String,
    zones: ZoneCache,
    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,
    should_quit: bool,
}

impl TuiApp<MpvAudio, JsonFileStore> {
    /// Must be called inside the tokio runtime: starts the mpv driver.
    pub fn new(config: &Config, store: JsonFileStore) -> Self {
        let (tx, rx) = mpsc::channel::<AppMessage>(1024);

        let (stream_tx, mut stream_rx) = mpsc::channel::<StreamEvent>(64);
        let audio = mpv::spawn(config.playback.default_volume, stream_tx);
        let forward = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = stream_rx.recv().await {
                if forward
                    .send(AppMessage::Globe(GlobeEvent::Stream(event)))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        let globe = GlobeApp::new(AppSettings::from(config), SceneGraph::new(), audio, store);
        Self::from_parts(globe, config, tx, rx)
    }
}

/// Tick period for `frame_rate` frames per second, never below 1 ms.
fn frame_interval(frame_rate: u32) -> Duration {
    let millis = 1000 / u64::from(frame_rate.max(1));
    Duration::from_millis(millis.max(1))
}

impl<A: AudioBackend, K: KeyValueStore> TuiApp<A, K> {
    pub fn from_parts(
        globe: GlobeApp<SceneGraph, A, K>,
        config: &Config,
        tx: mpsc::Sender<AppMessage>,
        rx: mpsc::Receiver<AppMessage>,
    ) -> Self {
        Self {
            globe,
            filter: FilterInput::default(),
            picker: RegionPicker::default(),
            areas: Areas::default(),
            focus: Focus::Globe,
            drag: None,
            pointer_inside: false,
            zoom_step: config.globe.zoom_step,
            frame_interval: frame_interval(config.globe.frame_rate),
            zones_url: config.timezone.zones_url.clone(),
            zones: Arc::new(OnceCell::new()),
            tx,
            rx: Some(rx),
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, catalog_source: String) -> anyhow::Result<()> {
        let mut rx = self
            .rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("event loop already started"))?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // Input reader.  Polls so the thread notices when the loop has gone.
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            while !event_tx.is_closed() {
                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        });

        let catalog_tx = self.tx.clone();
        tokio::spawn(async move {
            let event = match catalog::load_catalog(&catalog_source).await {
                Ok(stations) => GlobeEvent::CatalogLoaded(stations),
                Err(e) => GlobeEvent::CatalogFailed(format!("{catalog_source}: {e}")),
            };
            let _ = catalog_tx.send(AppMessage::Globe(event)).await;
        });

        let mut frame_tick = tokio::time::interval(self.frame_interval);
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let result = async {
            loop {
                self.sync_layout(terminal.size()?);
                terminal.draw(|f| self.draw(f))?;
                if self.should_quit {
                    break;
                }

                tokio::select! {
                    Some(msg) = rx.recv() => {
                        const MAX_DRAIN: usize = 256;
                        self.handle_message(msg);
                        for _ in 0..MAX_DRAIN {
                            match rx.try_recv() {
                                Ok(next) => self.handle_message(next),
                                Err(_) => break,
                            }
                        }
                    }
                    _ = frame_tick.tick() => self.dispatch(GlobeEvent::FrameTick),
                }
            }
            anyhow::Ok(())
        }
        .await;

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
        terminal.show_cursor()?;
        result
    }

    fn handle_message(&mut self, msg: AppMessage) {
        let events = match msg {
            AppMessage::Event(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                self.handle_key(key)
            }
            AppMessage::Event(Event::Mouse(mouse)) => self.handle_mouse(mouse),
            // resizes are picked up by sync_layout before the next draw
            AppMessage::Event(_) => Vec::new(),
            AppMessage::Globe(event) => vec![event],
        };
        for event in events {
            self.dispatch(event);
        }
    }

    pub fn dispatch(&mut self, event: GlobeEvent) {
        let effects = self.globe.handle(event);
        self.schedule(effects);
    }

    fn schedule(&self, effects: Vec<Effect>) {
        for effect in effects {
            let tx = self.tx.clone();
            match effect {
                Effect::ArmTimeout { attempt, after } => {
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        let _ = tx
                            .send(AppMessage::Globe(GlobeEvent::TimeoutFired(attempt)))
                            .await;
                    });
                }
                Effect::ResolveLocalTime(req) => {
                    let zones = self.zones.clone();
                    let url = self.zones_url.clone();
                    tokio::spawn(async move {
                        let list = zones
                            .get_or_init(move || async move {
                                let fetched = timezone::fetch_zone_list(&url).await;
                                match &fetched {
                                    Ok(z) => info!("zone list: {} ids from {}", z.len(), url),
                                    Err(e) => warn!("zone list unavailable, using country table: {}", e),
                                }
                                fetched
                            })
                            .await;
                        let zone = timezone::resolve(&req.city, &req.country, list.as_ref().map(Vec::as_slice));
                        let _ = tx
                            .send(AppMessage::Globe(GlobeEvent::TimezoneResolved { key: req.key, zone }))
                            .await;
                    });
                }
            }
        }
    }

    /// Recomputes pane areas; tells the core when the globe viewport or the
    /// list height changed.
    pub fn sync_layout(&mut self, size: Size) {
        let areas = Areas::new(Rect::new(0, 0, size.width, size.height));
        if areas == self.areas {
            return;
        }
        self.areas = areas;
        let viewport = viewport_for(areas.globe_inner);
        self.dispatch(GlobeEvent::Resized {
            width: viewport.width,
            height: viewport.height,
            list_rows: areas.sidebar.rows.height as usize,
        });
    }

    // ── Keyboard ──────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<GlobeEvent> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        if self.picker.is_open() {
            return self.picker.handle_key(key);
        }
        if self.filter.is_active() {
            return match self.filter.handle_key(key) {
                FilterAction::Changed(query) => vec![GlobeEvent::Search(query)],
                FilterAction::Confirmed | FilterAction::Cancelled | FilterAction::None => Vec::new(),
            };
        }

        let tab = self.globe.list().tab();
        let selected = self.globe.list().selected;
        let page = self.globe.list_rows().max(1);
        let volume = self.globe.playback().volume();

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('/') => {
                self.filter.activate();
                Vec::new()
            }
            KeyCode::Esc if !self.filter.text().is_empty() => {
                self.filter.clear();
                vec![GlobeEvent::Search(String::new())]
            }
            KeyCode::Up | KeyCode::Char('k') => vec![GlobeEvent::MoveCursor(CursorMove::Up(1))],
            KeyCode::Down | KeyCode::Char('j') => vec![GlobeEvent::MoveCursor(CursorMove::Down(1))],
            KeyCode::PageUp => vec![GlobeEvent::MoveCursor(CursorMove::Up(page))],
            KeyCode::PageDown => vec![GlobeEvent::MoveCursor(CursorMove::Down(page))],
            KeyCode::Home | KeyCode::Char('g') => vec![GlobeEvent::MoveCursor(CursorMove::First)],
            KeyCode::End | KeyCode::Char('G') => vec![GlobeEvent::MoveCursor(CursorMove::Last)],
            KeyCode::Enter => vec![GlobeEvent::SelectRow(selected)],
            KeyCode::Tab => self.switch_tab(tab.next()),
            KeyCode::BackTab => self.switch_tab(tab.prev()),
            KeyCode::Char('1') => self.switch_tab(Tab::All),
            KeyCode::Char('2') => self.switch_tab(Tab::Favorites),
            KeyCode::Char('3') => self.switch_tab(Tab::History),
            KeyCode::Char('f') => vec![GlobeEvent::ToggleFavoriteRow(selected)],
            KeyCode::Char('F') => vec![GlobeEvent::ToggleFavoriteCurrent],
            KeyCode::Char(' ') => vec![GlobeEvent::TogglePlayPause],
            KeyCode::Char('r') => vec![GlobeEvent::PlayRandom],
            KeyCode::Char('p') => vec![GlobeEvent::PlayPrevious],
            KeyCode::Char('+') | KeyCode::Char('=') => {
                vec![GlobeEvent::SetVolume(volume.saturating_add(VOLUME_STEP).min(100))]
            }
            KeyCode::Char('-') => vec![GlobeEvent::SetVolume(volume.saturating_sub(VOLUME_STEP))],
            KeyCode::Char('i') => vec![GlobeEvent::Zoom(self.zoom_step)],
            KeyCode::Char('o') => vec![GlobeEvent::Zoom(-self.zoom_step)],
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('a') => vec![GlobeEvent::Orbit {
                yaw: -ORBIT_STEP,
                pitch: 0.0,
            }],
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('d') => vec![GlobeEvent::Orbit {
                yaw: ORBIT_STEP,
                pitch: 0.0,
            }],
            KeyCode::Char('w') => vec![GlobeEvent::Orbit {
                yaw: 0.0,
                pitch: ORBIT_STEP,
            }],
            KeyCode::Char('s') => vec![GlobeEvent::Orbit {
                yaw: 0.0,
                pitch: -ORBIT_STEP,
            }],
            KeyCode::Char('c') => {
                self.picker.open();
                Vec::new()
            }
            KeyCode::Char('b') => {
                self.filter.clear();
                vec![GlobeEvent::Back]
            }
            KeyCode::Char('L') => {
                let next = self.globe.localizer().language().next();
                vec![GlobeEvent::SetLanguage(next.code().to_string())]
            }
            _ => Vec::new(),
        }
    }

    /// The core clears the search on a tab switch; mirror that in the bar.
    fn switch_tab(&mut self, tab: Tab) -> Vec<GlobeEvent> {
        self.filter.clear();
        vec![GlobeEvent::SelectTab(tab)]
    }

    // ── Mouse ─────────────────────────────────────────────────────────────────

    pub fn handle_mouse(&mut self, event: MouseEvent) -> Vec<GlobeEvent> {
        if self.picker.is_open() {
            return Vec::new();
        }
        let (col, row) = (event.column, event.row);
        let on_globe = pointer_in(self.areas.globe_inner, col, row);

        match event.kind {
            MouseEventKind::Moved => match on_globe {
                Some(pointer) => {
                    self.pointer_inside = true;
                    vec![GlobeEvent::PointerMoved(pointer)]
                }
                None if self.pointer_inside => {
                    self.pointer_inside = false;
                    vec![GlobeEvent::PointerLeft]
                }
                None => Vec::new(),
            },
            MouseEventKind::Down(MouseButton::Left) => {
                if on_globe.is_some() {
                    self.focus = Focus::Globe;
                    self.drag = Some(Drag {
                        last: (col, row),
                        moved: false,
                    });
                    Vec::new()
                } else if contains(self.areas.sidebar.block, col, row) {
                    self.focus = Focus::List;
                    self.click_sidebar(col, row)
                } else {
                    Vec::new()
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(drag) = self.drag.as_mut() else {
                    return Vec::new();
                };
                let dx = f64::from(col) - f64::from(drag.last.0);
                let dy = f64::from(row) - f64::from(drag.last.1);
                drag.last = (col, row);
                if dx == 0.0 && dy == 0.0 {
                    return Vec::new();
                }
                drag.moved = true;
                vec![GlobeEvent::Orbit {
                    yaw: -dx * DRAG_YAW_PER_CELL,
                    pitch: dy * DRAG_PITCH_PER_CELL,
                }]
            }
            MouseEventKind::Up(MouseButton::Left) => match (self.drag.take(), on_globe) {
                (Some(drag), Some(pointer)) if !drag.moved => vec![GlobeEvent::PointerClicked(pointer)],
                _ => Vec::new(),
            },
            MouseEventKind::ScrollUp => self.wheel(col, row, on_globe.is_some(), true),
            MouseEventKind::ScrollDown => self.wheel(col, row, on_globe.is_some(), false),
            _ => Vec::new(),
        }
    }

    fn wheel(&self, col: u16, row: u16, on_globe: bool, up: bool) -> Vec<GlobeEvent> {
        if on_globe {
            let step = if up { self.zoom_step } else { -self.zoom_step };
            vec![GlobeEvent::Zoom(step)]
        } else if contains(self.areas.sidebar.rows, col, row) {
            let movement = if up {
                CursorMove::Up(WHEEL_ROWS)
            } else {
                CursorMove::Down(WHEEL_ROWS)
            };
            vec![GlobeEvent::MoveCursor(movement)]
        } else {
            Vec::new()
        }
    }

    fn click_sidebar(&mut self, col: u16, row: u16) -> Vec<GlobeEvent> {
        let areas = self.areas.sidebar;
        if contains(areas.tabs, col, row) {
            let globe = &self.globe;
            return match sidebar::tab_at(areas.tabs, col, |t| globe.text(t.text_key())) {
                Some(tab) => self.switch_tab(tab),
                None => Vec::new(),
            };
        }
        if contains(areas.search, col, row) {
            self.filter.activate();
            return Vec::new();
        }
        if contains(areas.region, col, row) {
            let back_width = sidebar::back_label(self.globe.text(TextKey::Back)).width() as u16;
            if col < areas.region.x + back_width {
                self.filter.clear();
                return vec![GlobeEvent::Back];
            }
            self.picker.open();
            return Vec::new();
        }
        if contains(areas.rows, col, row) {
            let Some(idx) = self.globe.list().row_at((row - areas.rows.y) as usize) else {
                return Vec::new();
            };
            let star = areas.rows.x + STAR_COL;
            if col >= star && col < star + 2 {
                return vec![GlobeEvent::ToggleFavoriteRow(idx)];
            }
            return vec![GlobeEvent::SelectRow(idx)];
        }
        Vec::new()
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    pub fn draw(&self, frame: &mut Frame) {
        let now = Utc::now();
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        self.draw_header(frame, self.areas.header);
        globe_view::draw(frame, self.areas.globe, &self.globe, self.focus == Focus::Globe);
        sidebar::draw(
            frame,
            &self.areas.sidebar,
            &self.globe,
            &self.filter,
            now,
            self.focus == Focus::List,
        );
        player_bar::draw(frame, self.areas.player, &self.globe, now);
        self.picker.draw(frame, area, self.globe.localizer());
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(
                " ◉ globe-radio ",
                Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} · {} ", self.globe.registry().len(), self.globe.localizer().language().code()),
                theme::style_secondary(),
            ),
            Span::styled(
                "  / search · c region · b back · i/o zoom · ←/→ w/s orbit · L language · q quit",
                theme::style_muted(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn globe(&self) -> &GlobeApp<SceneGraph, A, K> {
        &self.globe
    }
}
