//! Sidebar list: tab base set, live search, cursor and scroll window.

use globe_proto::model::Station;
use globe_proto::state::{Favorites, History};

use crate::i18n::TextKey;
use crate::markers::{Highlight, MarkerId, MarkerRegistry};
use crate::scene::SceneBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    All,
    Favorites,
    History,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::All, Tab::Favorites, Tab::History];

    pub fn next(self) -> Self {
        match self {
            Tab::All => Tab::Favorites,
            Tab::Favorites => Tab::History,
            Tab::History => Tab::All,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Tab::All => Tab::History,
            Tab::Favorites => Tab::All,
            Tab::History => Tab::Favorites,
        }
    }

    pub fn text_key(self) -> TextKey {
        match self {
            Tab::All => TextKey::All,
            Tab::Favorites => TextKey::Favorites,
            Tab::History => TextKey::History,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub marker: MarkerId,
    pub station: Station,
}

#[derive(Debug, Default)]
pub struct StationListView {
    tab: Tab,
    search: String,
    rows: Vec<ListRow>,
    pub selected: usize,
    pub scroll_offset: usize,
}

impl StationListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn rows(&self) -> &[ListRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Switching tabs clears the search box.
    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.search.clear();
        self.select_first();
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
        self.select_first();
    }

    /// Rebuilds the rows from the tab's base set.  Hidden markers (region
    /// filter) are excluded on every tab.
    pub fn refresh(&mut self, registry: &MarkerRegistry, favorites: &Favorites, history: &History) {
        let query = self.search.trim().to_lowercase();
        let base: Vec<ListRow> = match self.tab {
            Tab::All => registry
                .visible()
                .map(|m| ListRow {
                    marker: m.id,
                    station: m.station.clone(),
                })
                .collect(),
            Tab::Favorites => registry
                .visible()
                .filter(|m| favorites.contains(m.url()))
                .map(|m| ListRow {
                    marker: m.id,
                    station: m.station.clone(),
                })
                .collect(),
            Tab::History => history
                .entries()
                .iter()
                .filter_map(|s| {
                    let marker = registry.by_url(&s.stream_url)?;
                    marker.visible.then(|| ListRow {
                        marker: marker.id,
                        station: s.clone(),
                    })
                })
                .collect(),
        };
        self.rows = base
            .into_iter()
            .filter(|row| row.station.matches_search(&query))
            .collect();
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
    }

    /// Marks the row's marker Selected, all others Normal, and returns the
    /// station to play.
    pub fn select_row(
        &mut self,
        idx: usize,
        registry: &mut MarkerRegistry,
        scene: &mut dyn SceneBackend,
    ) -> Option<Station> {
        let row = self.rows.get(idx)?.clone();
        self.selected = idx;
        registry.reset_highlights(scene);
        registry.set_highlight(row.marker, Highlight::Selected, scene);
        Some(row.station)
    }

    /// Back action: All tab, empty search, cursor at the top.
    pub fn reset(&mut self) {
        self.tab = Tab::All;
        self.search.clear();
        self.select_first();
    }

    pub fn selected_row(&self) -> Option<&ListRow> {
        self.rows.get(self.selected)
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.rows.is_empty() {
            return;
        }
        self.selected = (self.selected + n).min(self.rows.len() - 1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + height {
            self.scroll_offset = self.selected + 1 - height;
        }
    }

    /// `(row index, row)` pairs inside the `height`-row window.
    pub fn visible_rows(&self, height: usize) -> impl Iterator<Item = (usize, &ListRow)> {
        self.rows
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(height)
    }

    /// Row index under a click `row` lines below the top of the window.
    pub fn row_at(&self, row: usize) -> Option<usize> {
        let target = self.scroll_offset + row;
        (target < self.rows.len()).then_some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneGraph;
    use globe_proto::storage::MemoryStore;

    fn station(url: &str, name: &str, country: &str, lat: Option<f64>) -> Station {
        Station {
            name: name.to_string(),
            country: country.to_string(),
            city: format!("{name}ville"),
            latitude: lat,
            longitude: Some(10.0),
            stream_url: url.to_string(),
            ..Station::default()
        }
    }

    fn setup() -> (SceneGraph, MarkerRegistry) {
        let mut scene = SceneGraph::new();
        let stations = vec![
            station("a", "Alpha", "France", Some(10.0)),
            station("b", "Bravo", "Japan", Some(20.0)),
            station("c", "Charlie", "France", Some(30.0)),
        ];
        let registry = MarkerRegistry::build(&stations, 2.0, &mut scene);
        (scene, registry)
    }

    fn urls(view: &StationListView) -> Vec<&str> {
        view.rows().iter().map(|r| r.station.stream_url.as_str()).collect()
    }

    #[test]
    fn test_all_tab_follows_visibility_and_search() {
        let (mut scene, mut registry) = setup();
        let mut view = StationListView::new();
        view.refresh(&registry, &Favorites::default(), &History::default());
        assert_eq!(urls(&view), vec!["a", "b", "c"]);

        registry.set_visibility(|s| s.country == "France", &mut scene);
        view.set_search("  CHAR ");
        view.refresh(&registry, &Favorites::default(), &History::default());
        assert_eq!(urls(&view), vec!["c"]);
    }

    #[test]
    fn test_favorites_and_history_tabs() {
        let (mut scene, mut registry) = setup();
        let mut store = MemoryStore::new();
        let mut favorites = Favorites::default();
        favorites.toggle("b", &mut store);
        let mut history = History::default();
        history.push(&station("c", "Charlie", "France", Some(30.0)), &mut store);
        history.push(&station("zz", "Ghost", "France", None), &mut store);
        history.push(&station("a", "Alpha", "France", Some(10.0)), &mut store);

        let mut view = StationListView::new();
        view.set_tab(Tab::Favorites);
        view.refresh(&registry, &favorites, &history);
        assert_eq!(urls(&view), vec!["b"]);

        view.set_tab(Tab::History);
        view.refresh(&registry, &favorites, &history);
        assert_eq!(urls(&view), vec!["a", "c"]);

        registry.set_visibility(|s| s.stream_url != "a", &mut scene);
        view.refresh(&registry, &favorites, &history);
        assert_eq!(urls(&view), vec!["c"]);
    }

    #[test]
    fn test_select_row_highlights_only_that_marker() {
        let (mut scene, mut registry) = setup();
        let mut view = StationListView::new();
        view.refresh(&registry, &Favorites::default(), &History::default());
        registry.set_highlight(MarkerId(0), Highlight::Hovered, &mut scene);

        let picked = view.select_row(1, &mut registry, &mut scene).unwrap();
        assert_eq!(picked.stream_url, "b");
        assert_eq!(registry.highlighted(Highlight::Selected), Some(MarkerId(1)));
        assert_eq!(registry.highlighted(Highlight::Hovered), None);
        assert!(view.select_row(9, &mut registry, &mut scene).is_none());
    }

    #[test]
    fn test_cursor_and_scroll_window() {
        let (_scene, registry) = setup();
        let mut view = StationListView::new();
        view.refresh(&registry, &Favorites::default(), &History::default());
        view.select_down(5);
        assert_eq!(view.selected, 2);
        view.ensure_visible(2);
        assert_eq!(view.scroll_offset, 1);
        assert_eq!(view.visible_rows(2).map(|(i, _)| i).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(view.row_at(1), Some(2));
        assert_eq!(view.row_at(2), None);
        view.select_up(10);
        view.ensure_visible(2);
        assert_eq!((view.selected, view.scroll_offset), (0, 0));
    }

    #[test]
    fn test_tab_switch_clears_search() {
        let mut view = StationListView::new();
        view.set_search("x");
        view.set_tab(Tab::History);
        assert_eq!(view.search(), "");
        view.reset();
        assert_eq!(view.tab(), Tab::All);
    }
}
