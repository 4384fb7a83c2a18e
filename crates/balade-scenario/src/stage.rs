//! Scene abstraction the animation effects write through.
//!
//! The runner never talks to a renderer directly; it resolves targets and
//! mutates positions via [`Stage`]. [`WorldState`] is the concrete in-memory
//! implementation used by the player and by tests.

use glam::Vec3;

/// Opaque handle to a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle(pub(crate) usize);

/// Mutable view of the scene that animation effects drive
pub trait Stage {
    /// Resolve an object by name — exact match first, then first object
    /// whose name contains the key.
    fn find_object(&self, key: &str) -> Option<ObjectHandle>;
    fn object_name(&self, handle: ObjectHandle) -> &str;
    fn position(&self, handle: ObjectHandle) -> Vec3;
    fn set_position(&mut self, handle: ObjectHandle, position: Vec3);
    fn children(&self, handle: ObjectHandle) -> Vec<ObjectHandle>;

    fn camera_position(&self) -> Vec3;
    fn set_camera_position(&mut self, position: Vec3);

    /// Full-screen flash overlay intensity, 0.0 (off) to 1.0
    fn flash_intensity(&self) -> f32;
    fn set_flash_intensity(&mut self, value: f32);

    /// Position along the scroll timeline
    fn timeline_position(&self) -> f32;
    fn set_timeline_position(&mut self, value: f32);
}

struct SceneObject {
    name: String,
    position: Vec3,
    children: Vec<usize>,
}

/// In-memory scene state
pub struct WorldState {
    objects: Vec<SceneObject>,
    camera: Vec3,
    flash: f32,
    timeline: f32,
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            camera: Vec3::new(0.0, 1.6, 0.0),
            flash: 0.0,
            timeline: 0.0,
        }
    }

    pub fn add_object(&mut self, name: &str, position: Vec3) -> ObjectHandle {
        self.objects.push(SceneObject {
            name: name.to_string(),
            position,
            children: Vec::new(),
        });
        ObjectHandle(self.objects.len() - 1)
    }

    pub fn add_child(&mut self, parent: ObjectHandle, name: &str, position: Vec3) -> ObjectHandle {
        let handle = self.add_object(name, position);
        self.objects[parent.0].children.push(handle.0);
        handle
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for WorldState {
    fn find_object(&self, key: &str) -> Option<ObjectHandle> {
        if let Some(idx) = self.objects.iter().position(|o| o.name == key) {
            return Some(ObjectHandle(idx));
        }
        self.objects
            .iter()
            .position(|o| o.name.contains(key))
            .map(ObjectHandle)
    }

    fn object_name(&self, handle: ObjectHandle) -> &str {
        &self.objects[handle.0].name
    }

    fn position(&self, handle: ObjectHandle) -> Vec3 {
        self.objects[handle.0].position
    }

    fn set_position(&mut self, handle: ObjectHandle, position: Vec3) {
        self.objects[handle.0].position = position;
    }

    fn children(&self, handle: ObjectHandle) -> Vec<ObjectHandle> {
        self.objects[handle.0]
            .children
            .iter()
            .map(|&i| ObjectHandle(i))
            .collect()
    }

    fn camera_position(&self) -> Vec3 {
        self.camera
    }

    fn set_camera_position(&mut self, position: Vec3) {
        self.camera = position;
    }

    fn flash_intensity(&self) -> f32 {
        self.flash
    }

    fn set_flash_intensity(&mut self, value: f32) {
        self.flash = value;
    }

    fn timeline_position(&self) -> f32 {
        self.timeline
    }

    fn set_timeline_position(&mut self, value: f32) {
        self.timeline = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_prefers_exact_match() {
        let mut world = WorldState::new();
        world.add_object("TrunkLargeInteractive", Vec3::ZERO);
        let exact = world.add_object("TrunkLarge", Vec3::ONE);

        assert_eq!(world.find_object("TrunkLarge"), Some(exact));
    }

    #[test]
    fn find_falls_back_to_substring() {
        let mut world = WorldState::new();
        let h = world.add_object("JumpRock2_mesh", Vec3::ZERO);
        assert_eq!(world.find_object("JumpRock2"), Some(h));
        assert_eq!(world.find_object("Vison"), None);
    }

    #[test]
    fn children_tracked() {
        let mut world = WorldState::new();
        let pile = world.add_object("LeafErable", Vec3::ZERO);
        world.add_child(pile, "leaf_0", Vec3::ZERO);
        world.add_child(pile, "leaf_1", Vec3::ONE);
        assert_eq!(world.children(pile).len(), 2);
    }
}
