//! Color palette and styles for the globe terminal.

use globe_core::scene;
use ratatui::style::{Color, Modifier, Style};

pub const C_BG: Color = Color::Rgb(10, 12, 24);
pub const C_ACCENT: Color = Color::Rgb(102, 204, 255);
pub const C_PLAYING: Color = Color::Rgb(80, 200, 120);
pub const C_CONNECTING: Color = Color::Rgb(255, 184, 80);
pub const C_ERROR: Color = Color::Rgb(255, 80, 80);
pub const C_MUTED: Color = Color::Rgb(72, 72, 88);
pub const C_SECONDARY: Color = Color::Rgb(115, 115, 138);
pub const C_PRIMARY: Color = Color::Rgb(210, 210, 225);
pub const C_SELECTION_BG: Color = Color::Rgb(28, 28, 48);
pub const C_PANEL_BORDER: Color = Color::Rgb(40, 40, 60);
pub const C_PANEL_BORDER_FOCUSED: Color = Color::Rgb(120, 100, 200);
pub const C_FILTER_BG: Color = Color::Rgb(20, 20, 36);
pub const C_FILTER_FG: Color = Color::Rgb(255, 200, 80);
pub const C_LOCATION: Color = Color::Rgb(100, 160, 130);
pub const C_STARS: Color = Color::Rgb(255, 210, 50);
pub const C_GRATICULE: Color = Color::Rgb(36, 52, 96);
pub const C_TIME: Color = Color::Rgb(180, 120, 220);

/// Terminal color for a scene object color.
pub fn scene_color(color: scene::Color) -> Color {
    Color::Rgb(color.r(), color.g(), color.b())
}

pub fn style_default() -> Style {
    Style::default().fg(C_PRIMARY)
}

pub fn style_secondary() -> Style {
    Style::default().fg(C_SECONDARY)
}

pub fn style_accent() -> Style {
    Style::default().fg(C_ACCENT)
}

pub fn style_selected() -> Style {
    Style::default()
        .bg(C_SELECTION_BG)
        .fg(C_PRIMARY)
        .add_modifier(Modifier::BOLD)
}

pub fn style_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(C_PANEL_BORDER_FOCUSED)
    } else {
        Style::default().fg(C_PANEL_BORDER)
    }
}

pub fn style_muted() -> Style {
    Style::default().fg(C_MUTED)
}
