//! Latitude/longitude to globe-space conversion.
//!
//! Globe space is right-handed with +Y through the north pole.  Longitude
//! -180 sits on +X and the prime meridian on -X, so a default camera on +Z
//! looks at longitude -90.

use glam::{DQuat, DVec3};

pub const BASE_RADIUS: f64 = 2.0;
/// Beam tip radius as a multiple of the marker radius.
pub const BEAM_TIP_RATIO: f64 = 1.025;
pub const MARKER_HIT_RADIUS: f64 = 0.008;
pub const BEAM_THICKNESS: f64 = 0.002;

pub fn project(lat: f64, lon: f64, radius: f64) -> DVec3 {
    let phi = (90.0 - lat).to_radians();
    let theta = (lon + 180.0).to_radians();
    DVec3::new(
        -radius * phi.sin() * theta.cos(),
        radius * phi.cos(),
        radius * phi.sin() * theta.sin(),
    )
}

/// Inverse of [`project`]: returns `(lat, lon, radius)`, lon in [-180, 180).
/// Longitude is meaningless at the poles and comes back as whatever atan2
/// yields there.
pub fn unproject(point: DVec3) -> (f64, f64, f64) {
    let radius = point.length();
    if radius == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let phi = (point.y / radius).clamp(-1.0, 1.0).acos();
    let lat = 90.0 - phi.to_degrees();
    let theta = point.z.atan2(-point.x);
    let mut lon = theta.to_degrees() - 180.0;
    if lon < -180.0 {
        lon += 360.0;
    }
    (lat, lon, radius)
}

/// Radial segment from the globe surface to the beam tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSegment {
    pub start: DVec3,
    pub end: DVec3,
    pub center: DVec3,
    pub length: f64,
    /// Rotates the +Y axis onto the start->end direction.
    pub orientation: DQuat,
}

pub fn beam_segment(lat: f64, lon: f64, base_radius: f64, tip_radius: f64) -> BeamSegment {
    let start = project(lat, lon, base_radius);
    let end = project(lat, lon, tip_radius);
    let direction = (end - start).try_normalize().unwrap_or_else(|| {
        // zero-length beam: fall back to the radial direction
        project(lat, lon, 1.0)
    });
    BeamSegment {
        start,
        end,
        center: (start + end) * 0.5,
        length: start.distance(end),
        orientation: DQuat::from_rotation_arc(DVec3::Y, direction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_project_reference_points() {
        let north = project(90.0, 0.0, 2.0);
        assert!((north - DVec3::new(0.0, 2.0, 0.0)).length() < EPS);

        // prime meridian on the equator faces -X
        let origin = project(0.0, 0.0, 2.0);
        assert!((origin - DVec3::new(-2.0, 0.0, 0.0)).length() < EPS);

        let east = project(0.0, 90.0, 1.0);
        assert!((east - DVec3::new(0.0, 0.0, -1.0)).length() < EPS);
    }

    #[test]
    fn test_projected_length_is_radius() {
        for &(lat, lon) in &[(12.5, -33.0), (-60.0, 170.0), (45.0, 90.0)] {
            assert!((project(lat, lon, 2.0).length() - 2.0).abs() < EPS);
        }
    }

    #[test]
    fn test_unproject_round_trip() {
        for &(lat, lon, r) in &[(48.85, 2.35, 2.0), (-33.9, 151.2, 3.5), (0.0, -179.5, 1.0)] {
            let (lat2, lon2, r2) = unproject(project(lat, lon, r));
            assert!((lat - lat2).abs() < EPS, "lat {lat} vs {lat2}");
            assert!((lon - lon2).abs() < EPS, "lon {lon} vs {lon2}");
            assert!((r - r2).abs() < EPS);
        }
    }

    #[test]
    fn test_beam_segment_geometry() {
        let beam = beam_segment(10.0, 20.0, 2.0, 2.0 * BEAM_TIP_RATIO);
        assert!((beam.length - 0.05).abs() < 1e-12);
        assert!((beam.center - (beam.start + beam.end) * 0.5).length() < EPS);

        let axis = beam.orientation * DVec3::Y;
        let radial = beam.start.normalize();
        assert!((axis - radial).length() < 1e-9);
    }
}
