//! Now-playing bar.

use chrono::{DateTime, Utc};
use globe_core::playback::AudioBackend;
use globe_core::scene::SceneGraph;
use globe_core::GlobeApp;
use globe_proto::model::PlaybackStatus;
use globe_proto::storage::KeyValueStore;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::theme::{
    self, C_CONNECTING, C_ERROR, C_LOCATION, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_STARS,
    C_TIME,
};

const VOLUME_CELLS: usize = 10;

pub fn status_color(status: PlaybackStatus) -> Color {
    match status {
        PlaybackStatus::Playing => C_PLAYING,
        PlaybackStatus::Loading => C_CONNECTING,
        PlaybackStatus::Failed | PlaybackStatus::TimedOut => C_ERROR,
        PlaybackStatus::Idle => C_SECONDARY,
    }
}

/// `▮▮▮▯▯` style gauge for 0..=100.
pub fn volume_gauge(volume: u8) -> String {
    let filled = (volume.min(100) as usize * VOLUME_CELLS + 50) / 100;
    format!("{}{}", "▮".repeat(filled), "▯".repeat(VOLUME_CELLS - filled))
}

pub fn draw<A: AudioBackend, K: KeyValueStore>(
    frame: &mut Frame,
    area: Rect,
    app: &GlobeApp<SceneGraph, A, K>,
    now: DateTime<Utc>,
) {
    let view = app.player_view(now);
    let status = app.playback().status();
    let icon = if view.is_playing { "▶" } else { "⏸" };

    let mut first = vec![
        Span::styled(format!(" {icon} "), Style::default().fg(status_color(status))),
        Span::styled(
            view.title,
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ),
    ];
    if !view.location.is_empty() {
        first.push(Span::styled(
            format!("  {}", view.location),
            Style::default().fg(C_LOCATION),
        ));
    }
    if let Some(text) = view.status_text {
        first.push(Span::styled(
            format!("  {text}"),
            Style::default().fg(status_color(status)),
        ));
    }

    let second = Line::from(vec![
        Span::styled(
            if view.favorite { " ★ " } else { " ☆ " },
            Style::default().fg(if view.favorite { C_STARS } else { C_MUTED }),
        ),
        Span::styled(format!(" 🕒 {} ", view.local_time), Style::default().fg(C_TIME)),
        Span::styled(format!(" vol {} {:>3}% ", volume_gauge(view.volume), view.volume), theme::style_secondary()),
        Span::styled(
            "  space play/pause · r random · p previous · F favorite · +/- volume",
            theme::style_muted(),
        ),
    ]);

    frame.render_widget(
        Paragraph::new(vec![Line::from(first), second]).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme::style_border(false)),
        ),
        area,
    );
}
