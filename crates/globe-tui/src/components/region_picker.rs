//! Continent / country picker overlay.

use globe_core::i18n::{Localizer, TextKey};
use globe_core::region;
use globe_core::GlobeEvent;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState},
    Frame,
};

use crate::theme::{self, C_ACCENT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Continent,
    Country(&'static str),
}

#[derive(Debug)]
pub struct RegionPicker {
    open: bool,
    stage: Stage,
    selected: usize,
}

impl Default for RegionPicker {
    fn default() -> Self {
        Self {
            open: false,
            stage: Stage::Continent,
            selected: 0,
        }
    }
}

impl RegionPicker {
    pub fn open(&mut self) {
        self.open = true;
        self.stage = Stage::Continent;
        self.selected = 0;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Entries of the current stage.  `None` is the leading "All" entry.
    pub fn entries(&self) -> Vec<Option<&'static str>> {
        let names: Vec<&'static str> = match self.stage {
            Stage::Continent => region::continents().collect(),
            Stage::Country(continent) => region::countries_of(continent)
                .map(<[&str]>::to_vec)
                .unwrap_or_default(),
        };
        std::iter::once(None).chain(names.into_iter().map(Some)).collect()
    }

    /// Returns the events to dispatch for this key.
    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<GlobeEvent> {
        let len = self.entries().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(len.saturating_sub(1));
            }
            KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
            KeyCode::End | KeyCode::Char('G') => self.selected = len.saturating_sub(1),
            KeyCode::Esc => match self.stage {
                Stage::Continent => self.open = false,
                Stage::Country(continent) => {
                    self.stage = Stage::Continent;
                    self.selected = region::continents()
                        .position(|c| c == continent)
                        .map_or(0, |i| i + 1);
                }
            },
            KeyCode::Enter => return self.confirm(),
            _ => {}
        }
        Vec::new()
    }

    fn confirm(&mut self) -> Vec<GlobeEvent> {
        let Some(entry) = self.entries().get(self.selected).copied() else {
            return Vec::new();
        };
        match (self.stage, entry) {
            (Stage::Continent, None) => {
                self.open = false;
                vec![GlobeEvent::SetContinent(None)]
            }
            (Stage::Continent, Some(continent)) => {
                self.stage = Stage::Country(continent);
                self.selected = 0;
                vec![GlobeEvent::SetContinent(Some(continent.to_string()))]
            }
            (Stage::Country(_), country) => {
                self.open = false;
                vec![GlobeEvent::SetCountry(country.map(str::to_string))]
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, localizer: &Localizer) {
        if !self.open {
            return;
        }
        let [popup] = Layout::horizontal([Constraint::Length(36)])
            .flex(Flex::Center)
            .areas(area);
        let [popup] = Layout::vertical([Constraint::Percentage(70)])
            .flex(Flex::Center)
            .areas(popup);

        let title = match self.stage {
            Stage::Continent => localizer.text(TextKey::SelectContinent).to_string(),
            Stage::Country(continent) => {
                format!("{} · {}", continent, localizer.text(TextKey::SelectCountry))
            }
        };
        let items: Vec<ListItem> = self
            .entries()
            .into_iter()
            .map(|entry| {
                let text = entry.unwrap_or_else(|| localizer.text(TextKey::All));
                ListItem::new(Line::from(Span::styled(format!(" {text}"), theme::style_default())))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme::style_border(true))
                    .title(Span::styled(format!(" {title} "), Style::default().fg(C_ACCENT))),
            )
            .highlight_style(theme::style_selected().add_modifier(Modifier::REVERSED));
        let mut state = ListState::default().with_selected(Some(self.selected));

        frame.render_widget(Clear, popup);
        frame.render_stateful_widget(list, popup, &mut state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn press(picker: &mut RegionPicker, code: KeyCode) -> Vec<GlobeEvent> {
        picker.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_all_entry_clears_filter_and_closes() {
        let mut picker = RegionPicker::default();
        picker.open();
        assert_eq!(press(&mut picker, KeyCode::Enter), vec![GlobeEvent::SetContinent(None)]);
        assert!(!picker.is_open());
    }

    #[test]
    fn test_continent_then_country() {
        let mut picker = RegionPicker::default();
        picker.open();
        let europe = region::continents().position(|c| c == "Europe").unwrap() + 1;
        for _ in 0..europe {
            press(&mut picker, KeyCode::Down);
        }
        assert_eq!(
            press(&mut picker, KeyCode::Enter),
            vec![GlobeEvent::SetContinent(Some("Europe".into()))]
        );
        assert_eq!(picker.stage(), Stage::Country("Europe"));
        assert!(picker.entries().contains(&Some("France")));

        let france = picker.entries().iter().position(|e| *e == Some("France")).unwrap();
        for _ in 0..france {
            press(&mut picker, KeyCode::Down);
        }
        assert_eq!(
            press(&mut picker, KeyCode::Enter),
            vec![GlobeEvent::SetCountry(Some("France".into()))]
        );
        assert!(!picker.is_open());
    }

    #[test]
    fn test_escape_steps_back_then_closes() {
        let mut picker = RegionPicker::default();
        picker.open();
        press(&mut picker, KeyCode::Down);
        press(&mut picker, KeyCode::Enter);
        assert!(matches!(picker.stage(), Stage::Country(_)));
        assert!(press(&mut picker, KeyCode::Esc).is_empty());
        assert_eq!(picker.stage(), Stage::Continent);
        assert_eq!(picker.selected, 1);
        press(&mut picker, KeyCode::Esc);
        assert!(!picker.is_open());
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut picker = RegionPicker::default();
        picker.open();
        press(&mut picker, KeyCode::Up);
        assert_eq!(picker.selected, 0);
        press(&mut picker, KeyCode::End);
        assert_eq!(picker.selected, picker.entries().len() - 1);
        press(&mut picker, KeyCode::Down);
        assert_eq!(picker.selected, picker.entries().len() - 1);
    }
}
