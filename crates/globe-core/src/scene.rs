//! Scene capability and the in-memory scene graph the terminal draws from.

use glam::{DQuat, DVec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Marker,
    Beam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Transform {
    pub fn at(translation: DVec3) -> Self {
        Self {
            translation,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::at(DVec3::ZERO)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub rgb: u32,
    pub opacity: f32,
}

impl Color {
    pub const fn opaque(rgb: u32) -> Self {
        Self { rgb, opacity: 1.0 }
    }

    pub fn r(self) -> u8 {
        (self.rgb >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.rgb >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.rgb as u8
    }
}

pub const MARKER_COLOR: Color = Color::opaque(0xff0000);
pub const HIGHLIGHT_COLOR: Color = Color::opaque(0xffff00);
pub const BEAM_COLOR: Color = Color {
    rgb: 0x66ccff,
    opacity: 0.7,
};

/// What the core needs from a renderer.  Handles are only valid until the
/// next `clear`.
pub trait SceneBackend {
    fn add(&mut self, kind: ObjectKind, transform: Transform, color: Color) -> ObjectHandle;
    fn set_transform(&mut self, handle: ObjectHandle, transform: Transform);
    fn set_color(&mut self, handle: ObjectHandle, color: Color);
    fn set_visible(&mut self, handle: ObjectHandle, visible: bool);
    /// Drops every object; used on a full catalog reload.
    fn clear(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub kind: ObjectKind,
    pub transform: Transform,
    pub color: Color,
    pub visible: bool,
}

#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    objects: Vec<SceneObject>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects.get(handle.0)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn visible(&self, kind: ObjectKind) -> impl Iterator<Item = &SceneObject> {
        self.objects
            .iter()
            .filter(move |o| o.visible && o.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl SceneBackend for SceneGraph {
    fn add(&mut self, kind: ObjectKind, transform: Transform, color: Color) -> ObjectHandle {
        self.objects.push(SceneObject {
            kind,
            transform,
            color,
            visible: true,
        });
        ObjectHandle(self.objects.len() - 1)
    }

    fn set_transform(&mut self, handle: ObjectHandle, transform: Transform) {
        if let Some(obj) = self.objects.get_mut(handle.0) {
            obj.transform = transform;
        }
    }

    fn set_color(&mut self, handle: ObjectHandle, color: Color) {
        if let Some(obj) = self.objects.get_mut(handle.0) {
            obj.color = color;
        }
    }

    fn set_visible(&mut self, handle: ObjectHandle, visible: bool) {
        if let Some(obj) = self.objects.get_mut(handle.0) {
            obj.visible = visible;
        }
    }

    fn clear(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_graph_updates_by_handle() {
        let mut scene = SceneGraph::new();
        let a = scene.add(ObjectKind::Marker, Transform::default(), MARKER_COLOR);
        let b = scene.add(ObjectKind::Beam, Transform::default(), BEAM_COLOR);
        scene.set_visible(b, false);
        scene.set_color(a, HIGHLIGHT_COLOR);

        assert_eq!(scene.visible(ObjectKind::Beam).count(), 0);
        assert_eq!(scene.get(a).map(|o| o.color), Some(HIGHLIGHT_COLOR));
        scene.clear();
        assert!(scene.is_empty());
    }

    #[test]
    fn test_color_channels() {
        assert_eq!((BEAM_COLOR.r(), BEAM_COLOR.g(), BEAM_COLOR.b()), (0x66, 0xcc, 0xff));
    }
}
