//! Scene graph root.
//!
//! The scene is flat: a node pairs one geometry with one material and a world
//! transform. Nodes and lights are addressed through generational handles so
//! a handle that outlives its node can never alias a newer one.

use slotmap::{SlotMap, new_key_type};

use crate::{
    data_structures::instance::Instance,
    render::{GeometryId, LightId, MaterialId},
};

new_key_type! {
    pub struct NodeId;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneNode {
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub transform: Instance,
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
    lights: Vec<LightId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        self.nodes.insert(node)
    }

    /// Detaches a node. Returns `None` when the node was already removed.
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Instance) {
        match self.nodes.get_mut(id) {
            Some(node) => node.transform = transform,
            None => log::warn!("attempted to move a node that is no longer in the scene"),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_light(&mut self, light: LightId) {
        self.lights.push(light);
    }

    pub fn remove_light(&mut self, light: LightId) -> bool {
        let before = self.lights.len();
        self.lights.retain(|l| *l != light);
        before != self.lights.len()
    }

    pub fn lights(&self) -> &[LightId] {
        &self.lights
    }

    /// Drops every node and light reference. Backend resources are untouched.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lights.clear();
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;
    use slotmap::KeyData;

    use super::*;

    fn node() -> SceneNode {
        SceneNode {
            geometry: GeometryId::from(KeyData::from_ffi(1)),
            material: MaterialId::from(KeyData::from_ffi(1)),
            transform: Instance::new(),
        }
    }

    #[test]
    fn should_not_resurrect_removed_handle() {
        let mut scene = Scene::new();
        let first = scene.add(node());
        assert!(scene.remove(first).is_some());
        let second = scene.add(node());
        assert_ne!(first, second);
        assert!(scene.get(first).is_none());
        assert!(scene.remove(first).is_none());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn should_move_node() {
        let mut scene = Scene::new();
        let id = scene.add(node());
        scene.set_transform(id, Vector3::new(0.0, 1.0, 2.0).into());
        assert_eq!(scene.get(id).map(|n| n.transform.position), Some(Vector3::new(0.0, 1.0, 2.0)));
    }

    #[test]
    fn should_clear_nodes_and_lights() {
        let mut scene = Scene::new();
        scene.add(node());
        scene.add_light(LightId::from(KeyData::from_ffi(1)));
        scene.clear();
        assert!(scene.is_empty());
        assert!(scene.lights().is_empty());
    }
}
