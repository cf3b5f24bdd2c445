//! One marker + beam pair per station with usable coordinates.

use std::collections::HashMap;

use glam::DVec3;
use globe_proto::model::Station;
use tracing::debug;

use crate::geo::{self, BeamSegment, BEAM_THICKNESS, BEAM_TIP_RATIO, MARKER_HIT_RADIUS};
use crate::scene::{
    Color, ObjectHandle, ObjectKind, SceneBackend, Transform, BEAM_COLOR, HIGHLIGHT_COLOR,
    MARKER_COLOR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    Normal,
    Hovered,
    Selected,
}

impl Highlight {
    pub fn color(self) -> Color {
        match self {
            Highlight::Normal => MARKER_COLOR,
            Highlight::Hovered | Highlight::Selected => HIGHLIGHT_COLOR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Marker {
    pub id: MarkerId,
    pub station: Station,
    pub lat: f64,
    pub lon: f64,
    pub position: DVec3,
    pub beam: BeamSegment,
    pub highlight: Highlight,
    pub visible: bool,
    marker_object: ObjectHandle,
    beam_object: ObjectHandle,
}

impl Marker {
    pub fn url(&self) -> &str {
        &self.station.stream_url
    }
}

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: Vec<Marker>,
    by_url: HashMap<String, MarkerId>,
    radius: f64,
}

fn marker_transform(position: DVec3) -> Transform {
    Transform {
        scale: DVec3::splat(MARKER_HIT_RADIUS),
        ..Transform::at(position)
    }
}

fn beam_transform(beam: &BeamSegment) -> Transform {
    Transform {
        translation: beam.center,
        rotation: beam.orientation,
        scale: DVec3::new(BEAM_THICKNESS, beam.length, BEAM_THICKNESS),
    }
}

impl MarkerRegistry {
    /// Registers a marker and beam for every station with valid coordinates.
    /// Stations without coordinates are skipped.
    pub fn build(stations: &[Station], radius: f64, scene: &mut dyn SceneBackend) -> Self {
        let mut registry = Self {
            markers: Vec::with_capacity(stations.len()),
            by_url: HashMap::new(),
            radius,
        };
        for station in stations {
            let Some((lat, lon)) = station.coordinates() else {
                debug!("no coordinates for {:?}, skipping marker", station.name);
                continue;
            };
            let id = MarkerId(registry.markers.len());
            let position = geo::project(lat, lon, radius);
            let beam = geo::beam_segment(lat, lon, radius, radius * BEAM_TIP_RATIO);
            let marker_object = scene.add(ObjectKind::Marker, marker_transform(position), MARKER_COLOR);
            let beam_object = scene.add(ObjectKind::Beam, beam_transform(&beam), BEAM_COLOR);
            // first marker wins the url lookup when the catalog repeats a url
            registry
                .by_url
                .entry(station.stream_url.clone())
                .or_insert(id);
            registry.markers.push(Marker {
                id,
                station: station.clone(),
                lat,
                lon,
                position,
                beam,
                highlight: Highlight::Normal,
                visible: true,
                marker_object,
                beam_object,
            });
        }
        registry
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }

    pub fn by_url(&self, url: &str) -> Option<&Marker> {
        self.by_url.get(url).and_then(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(|m| m.visible)
    }

    pub fn visible_ids(&self) -> Vec<MarkerId> {
        self.visible().map(|m| m.id).collect()
    }

    /// Recomputes every marker and beam at `radius` and pushes the new
    /// transforms to the scene.
    pub fn rescale(&mut self, radius: f64, scene: &mut dyn SceneBackend) {
        self.radius = radius;
        for marker in &mut self.markers {
            marker.position = geo::project(marker.lat, marker.lon, radius);
            marker.beam = geo::beam_segment(marker.lat, marker.lon, radius, radius * BEAM_TIP_RATIO);
            scene.set_transform(marker.marker_object, marker_transform(marker.position));
            scene.set_transform(marker.beam_object, beam_transform(&marker.beam));
        }
    }

    /// Shows the pairs whose station satisfies `predicate` and hides the
    /// rest.  Returns the visible ids in registry order.
    pub fn set_visibility<F>(&mut self, predicate: F, scene: &mut dyn SceneBackend) -> Vec<MarkerId>
    where
        F: Fn(&Station) -> bool,
    {
        let mut shown = Vec::new();
        for marker in &mut self.markers {
            let visible = predicate(&marker.station);
            marker.visible = visible;
            scene.set_visible(marker.marker_object, visible);
            scene.set_visible(marker.beam_object, visible);
            if visible {
                shown.push(marker.id);
            }
        }
        shown
    }

    pub fn reset_highlights(&mut self, scene: &mut dyn SceneBackend) {
        for marker in &mut self.markers {
            if marker.highlight != Highlight::Normal {
                marker.highlight = Highlight::Normal;
                scene.set_color(marker.marker_object, MARKER_COLOR);
            }
        }
    }

    pub fn set_highlight(&mut self, id: MarkerId, highlight: Highlight, scene: &mut dyn SceneBackend) {
        if let Some(marker) = self.markers.get_mut(id.0) {
            marker.highlight = highlight;
            scene.set_color(marker.marker_object, highlight.color());
        }
    }

    /// Id of the marker currently carrying `highlight`, if any.
    pub fn highlighted(&self, highlight: Highlight) -> Option<MarkerId> {
        self.markers
            .iter()
            .find(|m| m.highlight == highlight)
            .map(|m| m.id)
    }
}
