//! Station list pane: tabs, search bar, region line, rows, homepage footer.

use chrono::{DateTime, Utc};
use globe_core::i18n::TextKey;
use globe_core::playback::AudioBackend;
use globe_core::region::RegionSelection;
use globe_core::scene::SceneGraph;
use globe_core::station_list::Tab;
use globe_core::GlobeApp;
use globe_proto::storage::KeyValueStore;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::theme::{
    self, C_ACCENT, C_LOCATION, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_STARS, C_TIME,
};
use crate::widgets::filter_input::FilterInput;

/// Columns before the name: play marker then favorite star.
pub const STAR_COL: u16 = 2;
const NAME_COL: u16 = 4;
const TIME_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SidebarAreas {
    pub block: Rect,
    pub tabs: Rect,
    pub search: Rect,
    pub region: Rect,
    pub rows: Rect,
    pub footer: Rect,
}

impl SidebarAreas {
    pub fn new(block: Rect) -> Self {
        let inner = Block::default().borders(Borders::ALL).inner(block);
        let [tabs, search, region, rows, footer] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(inner);
        Self {
            block,
            tabs,
            search,
            region,
            rows,
            footer,
        }
    }
}

/// `(tab, first column, width)` for each tab label on the tab line.
pub fn tab_spans(area: Rect, label: impl Fn(Tab) -> &'static str) -> Vec<(Tab, u16, u16)> {
    let mut x = area.x;
    Tab::ALL
        .iter()
        .map(|&tab| {
            let width = label(tab).width() as u16 + 2;
            let span = (tab, x, width);
            x += width + 1;
            span
        })
        .collect()
}

pub fn tab_at(area: Rect, col: u16, label: impl Fn(Tab) -> &'static str) -> Option<Tab> {
    tab_spans(area, label)
        .into_iter()
        .find(|&(_, x, w)| col >= x && col < x + w)
        .map(|(tab, _, _)| tab)
}

/// Cuts `s` to at most `max` display columns, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    if max > 0 {
        out.push('…');
    }
    out
}

/// Clickable Back label at the start of the region line.
pub fn back_label(text: &str) -> String {
    format!("[b] {text}")
}

pub fn region_label(region: &RegionSelection, all: &str) -> String {
    match (&region.continent, &region.country) {
        (None, None) => all.to_string(),
        (None, Some(country)) => country.clone(),
        (Some(continent), None) => continent.clone(),
        (Some(continent), Some(country)) => format!("{continent} › {country}"),
    }
}

pub fn draw<A: AudioBackend, K: KeyValueStore>(
    frame: &mut Frame,
    areas: &SidebarAreas,
    app: &GlobeApp<SceneGraph, A, K>,
    filter: &FilterInput,
    now: DateTime<Utc>,
    focused: bool,
) {
    let list = app.list();
    let title = format!(" {} ({}) ", app.text(TextKey::StationList), list.len());
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::style_border(focused))
            .title(Span::styled(title, theme::style_accent())),
        areas.block,
    );

    let mut tabs: Vec<Span> = Vec::new();
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            tabs.push(Span::styled("│", theme::style_muted()));
        }
        let style = if *tab == list.tab() {
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            theme::style_secondary()
        };
        tabs.push(Span::styled(format!(" {} ", app.text(tab.text_key())), style));
    }
    frame.render_widget(Paragraph::new(Line::from(tabs)), areas.tabs);

    filter.draw(frame, areas.search, app.text(TextKey::Search));

    let region = region_label(app.applied_region(), app.text(TextKey::All));
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(back_label(app.text(TextKey::Back)), theme::style_secondary()),
            Span::styled(format!("  {}: ", app.text(TextKey::RegionFilter)), theme::style_muted()),
            Span::styled(region, Style::default().fg(C_LOCATION)),
        ])),
        areas.region,
    );

    let width = areas.rows.width as usize;
    let rows = app.visible_row_views(now);
    let mut lines: Vec<Line> = Vec::with_capacity(rows.len());
    for row in &rows {
        let time = row.local_time.clone().unwrap_or_default();
        let home = if row.homepage.is_some() { "⌂" } else { " " };
        let text_room = width.saturating_sub(NAME_COL as usize + TIME_WIDTH);
        let name_room = if row.location.is_empty() {
            text_room
        } else {
            (text_room * 3 / 5).max(text_room.saturating_sub(row.location.width() + 2))
        };
        let name = truncate(&row.name, name_room);
        let location = truncate(&row.location, text_room.saturating_sub(name.width() + 2));
        let used = NAME_COL as usize + name.width() + 2 + location.width();
        let pad = width.saturating_sub(used + TIME_WIDTH);

        let mut name_style = Style::default().fg(if row.playing { C_PLAYING } else { C_PRIMARY });
        if row.selected {
            name_style = name_style.add_modifier(Modifier::BOLD);
        }
        let line = Line::from(vec![
            Span::styled(
                if row.playing { "▶ " } else { "  " },
                Style::default().fg(C_PLAYING),
            ),
            Span::styled(
                if row.favorite { "★ " } else { "☆ " },
                Style::default().fg(if row.favorite { C_STARS } else { C_MUTED }),
            ),
            Span::styled(name, name_style),
            Span::raw("  "),
            Span::styled(location, Style::default().fg(C_LOCATION)),
            Span::raw(" ".repeat(pad)),
            Span::styled(format!("{time:>6} "), Style::default().fg(C_TIME)),
            Span::styled(home, Style::default().fg(C_SECONDARY)),
        ]);
        lines.push(if row.selected {
            line.style(theme::style_selected())
        } else {
            line
        });
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {}", app.text(TextKey::NoStation)),
            theme::style_muted(),
        )));
    }
    frame.render_widget(Paragraph::new(lines), areas.rows);

    let footer = rows
        .iter()
        .find(|r| r.selected)
        .and_then(|r| r.homepage.as_deref())
        .map(|url| {
            Line::from(vec![
                Span::styled(format!("⌂ {}: ", app.text(TextKey::Homepage)), theme::style_muted()),
                Span::styled(
                    truncate(url, width.saturating_sub(12)),
                    Style::default().fg(C_SECONDARY).add_modifier(Modifier::UNDERLINED),
                ),
            ])
        })
        .unwrap_or_default();
    frame.render_widget(Paragraph::new(footer), areas.footer);
}
