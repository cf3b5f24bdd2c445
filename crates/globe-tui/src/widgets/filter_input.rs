//! Search bar over tui-input.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};
use unicode_width::UnicodeWidthStr;

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, PartialEq, Eq)]
pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
    None,
}

#[derive(Default)]
pub struct FilterInput {
    input: Input,
    active: bool,
}

impl FilterInput {
    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc clears a non-empty query first; a second Esc closes the bar.
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    FilterAction::Changed(String::new())
                } else {
                    self.active = false;
                    FilterAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.active = false;
                FilterAction::Confirmed
            }
            _ => {
                let before = self.input.value().to_string();
                self.input.handle_event(&Event::Key(key));
                if self.input.value() == before {
                    FilterAction::None
                } else {
                    FilterAction::Changed(self.input.value().to_string())
                }
            }
        }
    }

    /// Draws the query, or `placeholder` when empty.
    pub fn draw(&self, frame: &mut Frame, area: Rect, placeholder: &str) {
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(format!("/ {placeholder}"), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {visible}"), Style::default().fg(C_FILTER_FG))
        };
        frame.render_widget(
            Paragraph::new(Line::from(display)).style(Style::default().bg(C_FILTER_BG)),
            area,
        );

        if self.active && area.width > 0 {
            let typed = self.input.visual_cursor().saturating_sub(scroll) as u16;
            let cursor_x = area.x + 2 + typed;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }

    /// Display width of the current query.
    pub fn width(&self) -> usize {
        self.input.value().width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_reports_changes() {
        let mut filter = FilterInput::default();
        filter.activate();
        assert_eq!(
            filter.handle_key(key(KeyCode::Char('j'))),
            FilterAction::Changed("j".into())
        );
        assert_eq!(
            filter.handle_key(key(KeyCode::Char('a'))),
            FilterAction::Changed("ja".into())
        );
        assert_eq!(filter.text(), "ja");
        assert_eq!(filter.width(), 2);
    }

    #[test]
    fn test_escape_clears_then_closes() {
        let mut filter = FilterInput::default();
        filter.activate();
        filter.handle_key(key(KeyCode::Char('x')));
        assert_eq!(
            filter.handle_key(key(KeyCode::Esc)),
            FilterAction::Changed(String::new())
        );
        assert!(filter.is_active());
        assert_eq!(filter.handle_key(key(KeyCode::Esc)), FilterAction::Cancelled);
        assert!(!filter.is_active());
    }

    #[test]
    fn test_enter_confirms_and_keeps_text() {
        let mut filter = FilterInput::default();
        filter.activate();
        filter.handle_key(key(KeyCode::Char('q')));
        assert_eq!(filter.handle_key(key(KeyCode::Enter)), FilterAction::Confirmed);
        assert_eq!(filter.text(), "q");
    }
}
