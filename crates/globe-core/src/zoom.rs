/// Fraction of the remaining distance covered each frame.
const EASE: f64 = 0.1;
/// Below this remaining distance the scale snaps to the target.
const SNAP: f64 = 0.01;

/// Eased globe scale.  The renderer multiplies the base radius by
/// [`ZoomAnimator::scale`].
#[derive(Debug, Clone)]
pub struct ZoomAnimator {
    scale: f64,
    target: f64,
    min_scale: f64,
    max_scale: f64,
    animating: bool,
}

/// Result of one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomStep {
    /// Still easing; the scale moved to this value.
    Moving(f64),
    /// Snapped onto the target this frame; the transition is over.
    Settled(f64),
}

impl ZoomStep {
    pub fn scale(self) -> f64 {
        match self {
            ZoomStep::Moving(s) | ZoomStep::Settled(s) => s,
        }
    }
}

impl ZoomAnimator {
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        let (min_scale, max_scale) = if min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            (max_scale, min_scale)
        };
        let scale = 1.0_f64.clamp(min_scale, max_scale);
        Self {
            scale,
            target: scale,
            min_scale,
            max_scale,
            animating: false,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn set_target(&mut self, scale: f64) {
        self.target = scale.clamp(self.min_scale, self.max_scale);
        self.animating = self.target != self.scale;
    }

    pub fn zoom_by(&mut self, step: f64) {
        self.set_target(self.target + step);
    }

    /// Advances one frame.  `None` when idle.
    pub fn step(&mut self) -> Option<ZoomStep> {
        if !self.animating {
            return None;
        }
        let diff = self.target - self.scale;
        if diff.abs() > SNAP {
            self.scale += diff * EASE;
            Some(ZoomStep::Moving(self.scale))
        } else {
            self.scale = self.target;
            self.animating = false;
            Some(ZoomStep::Settled(self.scale))
        }
    }
}

impl Default for ZoomAnimator {
    fn default() -> Self {
        Self::new(0.5, 3.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_moves_ten_percent() {
        let mut zoom = ZoomAnimator::new(0.5, 3.0);
        zoom.set_target(2.0);
        assert_eq!(zoom.step(), Some(ZoomStep::Moving(1.1)));
    }

    #[test]
    fn test_settles_exactly_on_target() {
        let mut zoom = ZoomAnimator::new(0.5, 3.0);
        zoom.set_target(1.5);
        let mut frames = 0;
        let last = loop {
            let step = zoom.step().unwrap();
            frames += 1;
            if let ZoomStep::Settled(s) = step {
                break s;
            }
            assert!(frames < 1000);
        };
        assert_eq!(last, 1.5);
        assert!(!zoom.is_animating());
        assert_eq!(zoom.step(), None);
    }

    #[test]
    fn test_target_is_clamped() {
        let mut zoom = ZoomAnimator::new(0.5, 3.0);
        zoom.zoom_by(10.0);
        assert_eq!(zoom.target(), 3.0);
        zoom.set_target(-1.0);
        assert_eq!(zoom.target(), 0.5);
    }

    #[test]
    fn test_idle_without_target_change() {
        let mut zoom = ZoomAnimator::default();
        zoom.set_target(1.0);
        assert_eq!(zoom.step(), None);
    }
}
