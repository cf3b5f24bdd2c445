mod common;

use common::{new_app, station};
use glam::DVec2;
use globe_core::app::CursorMove;
use globe_core::geo::{self, BEAM_TIP_RATIO};
use globe_core::hit_test::{self, CursorStyle};
use globe_core::markers::{Highlight, MarkerId};
use globe_core::playback::{AttemptId, StreamEvent};
use globe_core::scene::{ObjectKind, HIGHLIGHT_COLOR};
use globe_core::station_list::Tab;
use globe_core::GlobeEvent;
use globe_proto::model::PlaybackStatus;
use globe_proto::storage::KeyValueStore;

#[test]
fn hover_finds_projected_station_and_ignores_far_pointer() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![
        station("one", "One", "Ghana", 0.0, 0.0),
        station("two", "Two", "China", 45.0, 90.0),
    ]));

    let on_screen = hit_test::marker_screen_position(
        app.registry(),
        MarkerId(0),
        app.camera(),
        app.viewport(),
    )
    .expect("marker in front of the camera");

    app.handle(GlobeEvent::PointerMoved(on_screen));
    assert_eq!(app.hover().marker, Some(MarkerId(0)));
    assert_eq!(app.hover().cursor, CursorStyle::Pointer);
    assert_eq!(app.registry().highlighted(Highlight::Hovered), Some(MarkerId(0)));
    let hovered: Vec<_> = app
        .scene()
        .visible(ObjectKind::Marker)
        .filter(|o| o.color == HIGHLIGHT_COLOR)
        .collect();
    assert_eq!(hovered.len(), 1);
    assert_eq!(app.hover_info().map(|h| h.name), Some("One".to_string()));

    let far = on_screen + DVec2::new(500.0, 500.0);
    app.handle(GlobeEvent::PointerMoved(far));
    assert_eq!(app.hover().marker, None);
    assert_eq!(app.hover().cursor, CursorStyle::Default);
    assert!(app.hover_info().is_none());
}

#[test]
fn click_on_front_marker_starts_playback() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![station("front", "Front", "Peru", 0.0, -90.0)]));
    let center = DVec2::new(app.viewport().width / 2.0, app.viewport().height / 2.0);
    app.handle(GlobeEvent::PointerClicked(center));
    assert_eq!(app.playback().status(), PlaybackStatus::Loading);
    assert_eq!(app.playback().audio().attached_urls(), vec!["front"]);
}

#[test]
fn superseded_stream_events_are_unobservable() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![
        station("a", "A", "France", 48.0, 2.0),
        station("b", "B", "Spain", 40.0, -3.7),
    ]));
    app.handle(GlobeEvent::SelectRow(0));
    app.handle(GlobeEvent::SelectRow(1));

    app.handle(GlobeEvent::Stream(StreamEvent::Failed(AttemptId(1), "404".into())));
    app.handle(GlobeEvent::Stream(StreamEvent::Started(AttemptId(1))));
    app.handle(GlobeEvent::TimeoutFired(AttemptId(1)));
    assert_eq!(app.playback().status(), PlaybackStatus::Loading);
    assert_eq!(app.playback().current().map(|s| s.name.as_str()), Some("B"));

    app.handle(GlobeEvent::Stream(StreamEvent::Started(AttemptId(2))));
    assert_eq!(app.playback().status(), PlaybackStatus::Playing);
}

#[test]
fn timeout_then_late_start_is_applied() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![station("a", "A", "France", 48.0, 2.0)]));
    app.handle(GlobeEvent::SelectRow(0));
    app.handle(GlobeEvent::TimeoutFired(AttemptId(1)));
    assert_eq!(app.playback().status(), PlaybackStatus::TimedOut);
    app.handle(GlobeEvent::Stream(StreamEvent::Started(AttemptId(1))));
    assert_eq!(app.playback().status(), PlaybackStatus::Playing);
}

#[test]
fn history_keeps_newest_fifty() {
    let mut app = new_app();
    let stations: Vec<_> = (0..51)
        .map(|i| station(&format!("s{i}"), &format!("S{i}"), "Chile", -33.0, -70.0 + i as f64 * 0.1))
        .collect();
    app.handle(GlobeEvent::CatalogLoaded(stations));
    for i in 0..51 {
        app.handle(GlobeEvent::SelectRow(i));
    }
    app.handle(GlobeEvent::SelectRow(10));

    let history = app.playback().history();
    assert_eq!(history.len(), 50);
    assert_eq!(history.get(0).map(|s| s.stream_url.as_str()), Some("s10"));
    assert!(history.entries().iter().all(|s| s.stream_url != "s0"));

    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&app.store().get("history").unwrap()).unwrap();
    assert_eq!(stored.len(), 50);
}

#[test]
fn favorite_double_toggle_persists_empty_array() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![station("x", "X", "Chad", 15.0, 19.0)]));
    app.handle(GlobeEvent::ToggleFavoriteRow(0));
    assert!(app.playback().is_favorite("x"));
    assert_eq!(app.store().get("favorites").as_deref(), Some("[\"x\"]"));
    app.handle(GlobeEvent::ToggleFavoriteRow(0));
    assert!(!app.playback().is_favorite("x"));
    assert_eq!(app.store().get("favorites").as_deref(), Some("[]"));
}

#[test]
fn europe_then_france_filter() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![
        station("fr", "Paris FM", "France", 48.8, 2.3),
        station("de", "Berlin FM", "Germany", 52.5, 13.4),
        station("jp", "Tokyo FM", "Japan", 35.7, 139.7),
        station("fr2", "Lyon FM", "france ", 45.7, 4.8),
    ]));

    app.handle(GlobeEvent::SetContinent(Some("Europe".into())));
    let visible: Vec<_> = app.registry().visible().map(|m| m.url().to_string()).collect();
    assert_eq!(visible, vec!["fr", "de", "fr2"]);
    assert_eq!(app.scene().visible(ObjectKind::Beam).count(), 3);

    app.handle(GlobeEvent::SetCountry(Some("France".into())));
    let visible: Vec<_> = app.registry().visible().map(|m| m.url().to_string()).collect();
    assert_eq!(visible, vec!["fr", "fr2"]);

    app.handle(GlobeEvent::Search("lyon".into()));
    assert_eq!(app.list().len(), 1);

    app.handle(GlobeEvent::SetContinent(None));
    assert_eq!(app.registry().visible().count(), 4);
}

#[test]
fn zoom_settles_with_exact_marker_radius() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![station("a", "A", "Kenya", -1.3, 36.8)]));
    app.handle(GlobeEvent::Zoom(-0.25));
    let mut frames = 0;
    while app.zoom().is_animating() {
        app.handle(GlobeEvent::FrameTick);
        frames += 1;
        assert!(frames < 1000);
    }
    let radius = app.globe_radius();
    assert_eq!(radius, 2.0 * 0.75);
    let marker = app.registry().get(MarkerId(0)).unwrap();
    let expected = geo::project(-1.3, 36.8, radius);
    assert!((marker.position - expected).length() < 1e-12);
    assert!((marker.beam.end.length() - radius * BEAM_TIP_RATIO).abs() < 1e-9);
}

#[test]
fn hover_and_click_work_at_full_zoom() {
    let mut settings = common::settings();
    settings.max_scale = 3.0;
    let mut app = common::app_with(settings);
    app.handle(GlobeEvent::CatalogLoaded(vec![
        station("front", "Front", "Peru", 0.0, -90.0),
        station("near", "Near", "Peru", 2.0, -88.0),
    ]));
    for _ in 0..40 {
        app.handle(GlobeEvent::Zoom(0.1));
    }
    let mut frames = 0;
    while app.zoom().is_animating() {
        app.handle(GlobeEvent::FrameTick);
        frames += 1;
        assert!(frames < 1000);
    }
    let radius = app.globe_radius();
    assert!((radius - 5.0).abs() < 1e-12);

    let viewport = app.viewport();
    for id in [MarkerId(0), MarkerId(1)] {
        let pos = hit_test::marker_screen_position(app.registry(), id, app.camera(), viewport)
            .expect("front marker projects");
        assert!(pos.x >= 0.0 && pos.x <= viewport.width);
        assert!(pos.y >= 0.0 && pos.y <= viewport.height);
    }

    let center = DVec2::new(viewport.width / 2.0, viewport.height / 2.0);
    app.handle(GlobeEvent::PointerMoved(center));
    assert_eq!(app.hover().marker, Some(MarkerId(0)));
    app.handle(GlobeEvent::PointerClicked(center));
    assert_eq!(app.playback().audio().attached_urls(), vec!["front"]);
}

#[test]
fn history_tab_and_previous() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![
        station("a", "A", "Peru", -12.0, -77.0),
        station("b", "B", "Peru", -13.5, -72.0),
    ]));
    app.handle(GlobeEvent::SelectRow(0));
    app.handle(GlobeEvent::SelectRow(1));
    app.handle(GlobeEvent::PlayPrevious);
    assert_eq!(app.playback().current().map(|s| s.stream_url.as_str()), Some("a"));

    app.handle(GlobeEvent::SelectTab(Tab::History));
    let urls: Vec<_> = app.list().rows().iter().map(|r| r.station.stream_url.as_str()).collect();
    assert_eq!(urls, vec!["a", "b"]);

    app.handle(GlobeEvent::MoveCursor(CursorMove::Last));
    assert_eq!(app.list().selected, 1);
}

#[test]
fn random_never_repeats_current() {
    let mut app = new_app();
    app.handle(GlobeEvent::CatalogLoaded(vec![
        station("a", "A", "Fiji", -18.0, 178.0),
        station("b", "B", "Fiji", -17.6, 177.4),
        station("c", "C", "Fiji", -16.5, 179.0),
    ]));
    for _ in 0..20 {
        let before = app.playback().current().map(|s| s.stream_url.clone());
        app.handle(GlobeEvent::PlayRandom);
        let after = app.playback().current().map(|s| s.stream_url.clone());
        assert!(after.is_some());
        assert_ne!(before, after);
    }
}
