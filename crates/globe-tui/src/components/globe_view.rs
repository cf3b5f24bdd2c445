//! Globe pane: braille canvas fed from the scene graph.

use glam::{DVec2, DVec3};
use globe_core::camera::{Camera, OrbitCamera, Viewport};
use globe_core::geo;
use globe_core::hit_test::CursorStyle;
use globe_core::i18n::TextKey;
use globe_core::playback::AudioBackend;
use globe_core::scene::{ObjectKind, SceneGraph, HIGHLIGHT_COLOR};
use globe_core::{app::CatalogState, GlobeApp};
use globe_proto::storage::KeyValueStore;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Points},
        Block, Borders, Clear, Paragraph,
    },
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::{self, C_ACCENT, C_ERROR, C_GRATICULE, C_MUTED, C_PRIMARY, C_SECONDARY};

/// Nominal pixel size of one terminal cell.  Pointer positions and the
/// camera viewport are both expressed in these pixels.
pub const CELL_W: f64 = 8.0;
pub const CELL_H: f64 = 16.0;

const GRATICULE_STEP_DEG: i32 = 30;
const SAMPLE_STEP_DEG: i32 = 3;
const SILHOUETTE_SAMPLES: usize = 180;

/// Viewport in pixels for the canvas area.
pub fn viewport_for(area: Rect) -> Viewport {
    Viewport::new(area.width as f64 * CELL_W, area.height as f64 * CELL_H)
}

/// Pixel position of the centre of cell `(col, row)`, or `None` outside `area`.
pub fn pointer_in(area: Rect, col: u16, row: u16) -> Option<DVec2> {
    if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
        return None;
    }
    Some(DVec2::new(
        (col - area.x) as f64 * CELL_W + CELL_W / 2.0,
        (row - area.y) as f64 * CELL_H + CELL_H / 2.0,
    ))
}

/// Cell containing a pixel position.
pub fn pointer_cell(area: Rect, pointer: DVec2) -> (u16, u16) {
    let col = (pointer.x / CELL_W).max(0.0) as u16;
    let row = (pointer.y / CELL_H).max(0.0) as u16;
    (
        area.x + col.min(area.width.saturating_sub(1)),
        area.y + row.min(area.height.saturating_sub(1)),
    )
}

/// A point on a sphere of radius `|p|` faces the eye when `p·eye > |p|²`.
fn faces_camera(camera: &OrbitCamera, p: DVec3) -> bool {
    p.dot(camera.eye()) > p.length_squared()
}

struct Projector<'a> {
    camera: &'a OrbitCamera,
    viewport: Viewport,
}

impl Projector<'_> {
    /// Canvas coordinates (y up) of a world point.
    fn canvas(&self, p: DVec3) -> Option<(f64, f64)> {
        let ndc = self.camera.project_to_ndc(p)?;
        let px = self.viewport.ndc_to_pointer(ndc);
        Some((px.x, self.viewport.height - px.y))
    }
}

fn graticule(proj: &Projector, radius: f64) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    let mut push = |lat: f64, lon: f64| {
        let p = geo::project(lat, lon, radius);
        if faces_camera(proj.camera, p) {
            if let Some(c) = proj.canvas(p) {
                points.push(c);
            }
        }
    };
    for lat in (-60..=60).step_by(GRATICULE_STEP_DEG as usize) {
        for lon in (-180..180).step_by(SAMPLE_STEP_DEG as usize) {
            push(lat as f64, lon as f64);
        }
    }
    for lon in (-180..180).step_by(GRATICULE_STEP_DEG as usize) {
        for lat in (-90..=90).step_by(SAMPLE_STEP_DEG as usize) {
            push(lat as f64, lon as f64);
        }
    }
    points
}

/// Outline of the sphere as seen from the eye: the circle where sight
/// lines graze the surface.
fn silhouette(proj: &Projector, radius: f64) -> Vec<(f64, f64)> {
    let eye = proj.camera.eye();
    let d = eye.length();
    if d <= radius {
        return Vec::new();
    }
    let n = eye / d;
    let center = n * (radius * radius / d);
    let rho = radius * (1.0 - (radius * radius) / (d * d)).sqrt();
    let u = n.any_orthonormal_vector();
    let v = n.cross(u);
    (0..SILHOUETTE_SAMPLES)
        .filter_map(|i| {
            let t = i as f64 / SILHOUETTE_SAMPLES as f64 * std::f64::consts::TAU;
            proj.canvas(center + rho * (t.cos() * u + t.sin() * v))
        })
        .collect()
}

pub fn draw<A: AudioBackend, K: KeyValueStore>(
    frame: &mut Frame,
    area: Rect,
    app: &GlobeApp<SceneGraph, A, K>,
    focused: bool,
) {
    let mut title = vec![Span::styled(" 🌐 globe ", Style::default().fg(C_ACCENT))];
    match app.catalog_state() {
        CatalogState::Loading => title.push(Span::styled(
            format!("{} ", app.text(TextKey::Loading)),
            Style::default().fg(C_SECONDARY),
        )),
        CatalogState::Failed(reason) => title.push(Span::styled(
            format!("{reason} "),
            Style::default().fg(C_ERROR),
        )),
        CatalogState::Ready => {}
    }
    if app.hover().cursor == CursorStyle::Pointer {
        title.push(Span::styled(
            format!("▶ {} ", app.text(TextKey::Play)),
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
        ));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::style_border(focused))
        .title(Line::from(title));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let viewport = app.viewport();
    let proj = Projector {
        camera: app.camera(),
        viewport,
    };
    let radius = app.globe_radius();
    let grid = graticule(&proj, radius);
    let outline = silhouette(&proj, radius);

    let scene = app.scene();
    let mut beams: Vec<CanvasLine> = Vec::new();
    for beam in scene.visible(ObjectKind::Beam) {
        let t = beam.transform;
        let half = t.rotation * DVec3::Y * (t.scale.y / 2.0);
        let base = t.translation - half;
        if !faces_camera(proj.camera, base) {
            continue;
        }
        if let (Some(a), Some(b)) = (proj.canvas(base), proj.canvas(t.translation + half)) {
            beams.push(CanvasLine::new(a.0, a.1, b.0, b.1, theme::scene_color(beam.color)));
        }
    }

    let mut front: Vec<(Color, Vec<(f64, f64)>)> = Vec::new();
    let mut back: Vec<(f64, f64)> = Vec::new();
    let mut highlighted: Vec<(f64, f64)> = Vec::new();
    for marker in scene.visible(ObjectKind::Marker) {
        let p = marker.transform.translation;
        let Some(c) = proj.canvas(p) else { continue };
        if marker.color == HIGHLIGHT_COLOR {
            highlighted.push(c);
        } else if faces_camera(proj.camera, p) {
            let color = theme::scene_color(marker.color);
            match front.iter_mut().find(|(col, _)| *col == color) {
                Some((_, pts)) => pts.push(c),
                None => front.push((color, vec![c])),
            }
        } else {
            back.push(c);
        }
    }

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, viewport.width])
        .y_bounds([0.0, viewport.height])
        .paint(|ctx| {
            ctx.draw(&Points {
                coords: &grid,
                color: C_GRATICULE,
            });
            ctx.draw(&Points {
                coords: &outline,
                color: C_SECONDARY,
            });
            ctx.draw(&Points {
                coords: &back,
                color: C_MUTED,
            });
            ctx.layer();
            for line in &beams {
                ctx.draw(line);
            }
            for (color, coords) in &front {
                ctx.draw(&Points { coords, color: *color });
            }
            ctx.layer();
            for &(x, y) in &highlighted {
                ctx.print(x, y, Span::styled("◉", Style::default().fg(theme::scene_color(HIGHLIGHT_COLOR))));
            }
        });
    frame.render_widget(canvas, inner);

    draw_hover_card(frame, inner, app);
}

fn draw_hover_card<A: AudioBackend, K: KeyValueStore>(
    frame: &mut Frame,
    area: Rect,
    app: &GlobeApp<SceneGraph, A, K>,
) {
    let Some(info) = app.hover_info() else {
        return;
    };
    let width = (info.name.width().max(info.location.width()) as u16 + 4).min(area.width);
    let height = 4u16.min(area.height);
    let (col, row) = pointer_cell(area, info.pointer);
    // right of and below the pointer, pulled back inside the pane
    let x = (col + 2).min(area.x + area.width.saturating_sub(width));
    let y = (row + 1).min(area.y + area.height.saturating_sub(height));
    let card = Rect::new(x, y, width, height);

    frame.render_widget(Clear, card);
    frame.render_widget(
        Paragraph::new(vec![
            Line::from(Span::styled(
                info.name,
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(info.location, theme::style_secondary())),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme::style_accent()),
        ),
        card,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_in_maps_cell_centres() {
        let area = Rect::new(2, 1, 10, 5);
        assert_eq!(pointer_in(area, 2, 1), Some(DVec2::new(4.0, 8.0)));
        assert_eq!(pointer_in(area, 11, 5), Some(DVec2::new(76.0, 72.0)));
        assert_eq!(pointer_in(area, 12, 1), None);
        assert_eq!(pointer_in(area, 1, 1), None);
    }

    #[test]
    fn test_pointer_cell_is_inverse_of_pointer_in() {
        let area = Rect::new(3, 2, 20, 10);
        let p = pointer_in(area, 9, 6).unwrap();
        assert_eq!(pointer_cell(area, p), (9, 6));
        assert_eq!(pointer_cell(area, DVec2::new(1e6, 1e6)), (22, 11));
    }

    #[test]
    fn test_viewport_matches_cell_grid() {
        let vp = viewport_for(Rect::new(0, 0, 80, 20));
        assert_eq!((vp.width, vp.height), (640.0, 320.0));
    }

    #[test]
    fn test_front_and_back_faces() {
        let camera = OrbitCamera::new(1.0);
        assert!(faces_camera(&camera, geo::project(0.0, -90.0, 2.0)));
        assert!(!faces_camera(&camera, geo::project(0.0, 90.0, 2.0)));
    }

    #[test]
    fn test_silhouette_surrounds_screen_centre() {
        let camera = OrbitCamera::new(1.0);
        let proj = Projector {
            camera: &camera,
            viewport: Viewport::new(400.0, 400.0),
        };
        let outline = silhouette(&proj, 2.0);
        assert_eq!(outline.len(), SILHOUETTE_SAMPLES);
        let r0 = DVec2::new(outline[0].0 - 200.0, outline[0].1 - 200.0).length();
        for &(x, y) in &outline {
            let r = DVec2::new(x - 200.0, y - 200.0).length();
            assert!((r - r0).abs() < 1e-6);
        }
    }
}
