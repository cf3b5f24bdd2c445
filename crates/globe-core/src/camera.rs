use glam::{DMat4, DVec2, DVec3, DVec4};

pub const FOV_DEGREES: f64 = 45.0;
pub const NEAR_CLIP: f64 = 0.1;
pub const FAR_CLIP: f64 = 1000.0;
pub const ORBIT_DISTANCE: f64 = 6.0;
pub const DAMPING: f64 = 0.05;
/// Gap kept between the camera and the globe surface at full zoom.
pub const SURFACE_CLEARANCE: f64 = 1.0;

/// Keeps the orbit off the exact poles where look_at degenerates.
const MAX_PITCH: f64 = 89.0 * std::f64::consts::PI / 180.0;
const SETTLE_EPSILON: f64 = 1e-6;

/// Drawable area in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f64 {
        if self.height <= 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }

    pub fn pointer_to_ndc(&self, pointer: DVec2) -> DVec2 {
        DVec2::new(
            pointer.x / self.width * 2.0 - 1.0,
            -(pointer.y / self.height * 2.0 - 1.0),
        )
    }

    pub fn ndc_to_pointer(&self, ndc: DVec2) -> DVec2 {
        DVec2::new(
            (ndc.x + 1.0) / 2.0 * self.width,
            (-ndc.y + 1.0) / 2.0 * self.height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit length.
    pub direction: DVec3,
}

impl Ray {
    /// Distance along the ray to the nearest intersection in front of the
    /// origin.
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt = disc.sqrt();
        let near = -b - sqrt;
        if near >= 0.0 {
            return Some(near);
        }
        let far = -b + sqrt;
        (far >= 0.0).then_some(far)
    }
}

/// Largest globe scale that keeps the surface `SURFACE_CLEARANCE` in front
/// of the orbiting camera.
pub fn max_scale_for(base_radius: f64) -> f64 {
    if base_radius > 0.0 {
        (ORBIT_DISTANCE - SURFACE_CLEARANCE) / base_radius
    } else {
        f64::INFINITY
    }
}

pub trait Camera {
    /// `None` when the point is behind the camera.
    fn project_to_ndc(&self, point: DVec3) -> Option<DVec2>;
    fn ray_from_ndc(&self, ndc: DVec2) -> Ray;
}

/// Perspective camera orbiting the origin with damped yaw/pitch input.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    yaw: f64,
    pitch: f64,
    distance: f64,
    aspect: f64,
    pending_yaw: f64,
    pending_pitch: f64,
    damping: f64,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl OrbitCamera {
    pub fn new(aspect: f64) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: ORBIT_DISTANCE,
            aspect,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            damping: DAMPING,
        }
    }

    pub fn set_aspect(&mut self, aspect: f64) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Queues an orbit in radians; applied gradually by [`Self::update`].
    pub fn rotate(&mut self, delta_yaw: f64, delta_pitch: f64) {
        self.pending_yaw += delta_yaw;
        self.pending_pitch += delta_pitch;
    }

    /// Applies one frame of damped motion.  Returns whether the camera moved.
    pub fn update(&mut self) -> bool {
        if self.pending_yaw.abs() < SETTLE_EPSILON && self.pending_pitch.abs() < SETTLE_EPSILON {
            self.pending_yaw = 0.0;
            self.pending_pitch = 0.0;
            return false;
        }
        self.yaw += self.pending_yaw * self.damping;
        self.pitch = (self.pitch + self.pending_pitch * self.damping).clamp(-MAX_PITCH, MAX_PITCH);
        self.pending_yaw *= 1.0 - self.damping;
        self.pending_pitch *= 1.0 - self.damping;
        true
    }

    pub fn eye(&self) -> DVec3 {
        DVec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        )
    }

    fn view_projection(&self) -> DMat4 {
        let view = DMat4::look_at_rh(self.eye(), DVec3::ZERO, DVec3::Y);
        let projection =
            DMat4::perspective_rh(FOV_DEGREES.to_radians(), self.aspect, NEAR_CLIP, FAR_CLIP);
        projection * view
    }
}

impl Camera for OrbitCamera {
    fn project_to_ndc(&self, point: DVec3) -> Option<DVec2> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        Some(DVec2::new(ndc.x, ndc.y))
    }

    fn ray_from_ndc(&self, ndc: DVec2) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse * DVec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inverse * DVec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        Ray {
            origin: near,
            direction: (far - near).normalize_or_zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_ndc_conversions() {
        let vp = Viewport::new(800.0, 600.0);
        assert_eq!(vp.pointer_to_ndc(DVec2::new(400.0, 300.0)), DVec2::ZERO);
        assert_eq!(vp.pointer_to_ndc(DVec2::new(0.0, 0.0)), DVec2::new(-1.0, 1.0));
        let back = vp.ndc_to_pointer(vp.pointer_to_ndc(DVec2::new(123.0, 456.0)));
        assert!((back - DVec2::new(123.0, 456.0)).length() < 1e-9);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = OrbitCamera::new(4.0 / 3.0);
        let ndc = camera.project_to_ndc(DVec3::ZERO).unwrap();
        assert!(ndc.length() < 1e-9);
    }

    #[test]
    fn test_point_behind_camera_is_none() {
        let camera = OrbitCamera::new(1.0);
        assert!(camera.project_to_ndc(DVec3::new(0.0, 0.0, 10.0)).is_none());
    }

    #[test]
    fn test_center_ray_hits_globe_front() {
        let camera = OrbitCamera::new(1.0);
        let ray = camera.ray_from_ndc(DVec2::ZERO);
        let t = ray.intersect_sphere(DVec3::ZERO, 2.0).unwrap();
        let hit = ray.origin + ray.direction * t;
        assert!((hit - DVec3::new(0.0, 0.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_ray_misses_off_axis_sphere() {
        let ray = Ray {
            origin: DVec3::new(0.0, 0.0, 6.0),
            direction: DVec3::new(0.0, 0.0, -1.0),
        };
        assert!(ray.intersect_sphere(DVec3::new(1.0, 0.0, 0.0), 0.5).is_none());
    }

    #[test]
    fn test_max_scale_keeps_surface_clearance() {
        assert_eq!(max_scale_for(2.0), 2.5);
        assert!(2.0 * max_scale_for(2.0) + SURFACE_CLEARANCE <= ORBIT_DISTANCE);
        assert_eq!(max_scale_for(0.0), f64::INFINITY);
    }

    #[test]
    fn test_damped_rotation_settles() {
        let mut camera = OrbitCamera::new(1.0);
        camera.rotate(1.0, 0.0);
        assert!(camera.update());
        assert!((camera.yaw() - 0.05).abs() < 1e-12);
        for _ in 0..2000 {
            camera.update();
        }
        assert!(!camera.update());
        assert!((camera.yaw() - 1.0).abs() < 1e-4);
    }
}
