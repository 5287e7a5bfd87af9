//! The player token: a loaded model or the fallback cube.

use cgmath::Vector3;

use crate::{
    config::TokenStyle,
    data_structures::{
        geometry::MeshData,
        instance::Instance,
        scene_graph::{NodeId, Scene, SceneNode},
    },
    render::{GeometryId, Material, MaterialId, RenderBackend},
    resources::model::ModelMesh,
};

/// A drawable part of the token. `local` places the part relative to the token root.
#[derive(Clone, Copy, Debug)]
pub struct TokenMesh {
    pub node: NodeId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub local: Instance,
}

impl TokenMesh {
    fn attach(
        scene: &mut Scene,
        backend: &mut impl RenderBackend,
        label: &str,
        data: &MeshData,
        colour: [f32; 4],
        root: &Instance,
        local: Instance,
    ) -> Self {
        let geometry = backend.create_geometry(label, data);
        let material = backend.create_material(Material::opaque(colour));
        let node = scene.add(SceneNode {
            geometry,
            material,
            transform: root * &local,
        });
        Self {
            node,
            geometry,
            material,
            local,
        }
    }

    fn release(self, scene: &mut Scene, backend: &mut impl RenderBackend) {
        scene.remove(self.node);
        backend.dispose_geometry(self.geometry);
        backend.dispose_material(self.material);
    }
}

#[derive(Debug)]
pub enum PlayerToken {
    /// Every sub-mesh of the model gets its own geometry and a fresh material.
    Loaded { root: Instance, meshes: Vec<TokenMesh> },
    Fallback { root: Instance, mesh: TokenMesh },
}

impl PlayerToken {
    /// Attaches the decoded model scaled by `style.model_scale` at the token origin.
    pub fn loaded(
        scene: &mut Scene,
        backend: &mut impl RenderBackend,
        model: &[ModelMesh],
        style: &TokenStyle,
    ) -> Self {
        let root = Instance::from(style.origin).with_scale([style.model_scale; 3]);
        let meshes = model
            .iter()
            .map(|mesh| {
                TokenMesh::attach(
                    scene,
                    backend,
                    &mesh.name,
                    &mesh.data,
                    style.colour,
                    &root,
                    mesh.transform,
                )
            })
            .collect();
        PlayerToken::Loaded { root, meshes }
    }

    pub fn fallback(scene: &mut Scene, backend: &mut impl RenderBackend, style: &TokenStyle) -> Self {
        let size = style.fallback_size;
        let root = Instance::from(style.origin);
        let mesh = TokenMesh::attach(
            scene,
            backend,
            "fallback token",
            &MeshData::cuboid(size, size, size),
            style.colour,
            &root,
            Instance::new(),
        );
        PlayerToken::Fallback { root, mesh }
    }

    pub fn position(&self) -> Vector3<f32> {
        match self {
            PlayerToken::Loaded { root, .. } | PlayerToken::Fallback { root, .. } => root.position,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PlayerToken::Fallback { .. })
    }

    pub fn meshes(&self) -> &[TokenMesh] {
        match self {
            PlayerToken::Loaded { meshes, .. } => meshes,
            PlayerToken::Fallback { mesh, .. } => std::slice::from_ref(mesh),
        }
    }

    pub fn set_position(&mut self, scene: &mut Scene, position: Vector3<f32>) {
        let root = match self {
            PlayerToken::Loaded { root, .. } | PlayerToken::Fallback { root, .. } => root,
        };
        root.position = position;
        let root = *root;
        for mesh in self.meshes() {
            scene.set_transform(mesh.node, &root * &mesh.local);
        }
    }

    /// Detaches the token and releases every geometry and material it created.
    pub fn dispose(self, scene: &mut Scene, backend: &mut impl RenderBackend) {
        match self {
            PlayerToken::Loaded { meshes, .. } => {
                for mesh in meshes {
                    mesh.release(scene, backend);
                }
            }
            PlayerToken::Fallback { mesh, .. } => mesh.release(scene, backend),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{headless::HeadlessBackend, resources::model::decode_model};

    #[test]
    fn should_place_fallback_cube_at_token_origin() {
        let mut backend = HeadlessBackend::new(800, 600);
        let probe = backend.probe();
        let mut scene = Scene::new();
        let token = PlayerToken::fallback(&mut scene, &mut backend, &TokenStyle::default());

        assert!(token.is_fallback());
        assert_eq!(token.position(), TokenStyle::default().origin);
        let mesh = token.meshes()[0];
        assert_eq!(probe.geometry(mesh.geometry).map(|g| g.primitives), Some(12));
        assert_eq!(
            probe.material(mesh.material).map(|m| m.colour),
            Some(TokenStyle::default().colour)
        );
    }

    #[test]
    fn should_scale_loaded_model_and_keep_sub_mesh_offsets() {
        let style = TokenStyle::default();
        let mut backend = HeadlessBackend::new(800, 600);
        let mut scene = Scene::new();
        let model = decode_model(&crate::resources::model::tests::triangle_glb()).unwrap();
        let mut token = PlayerToken::loaded(&mut scene, &mut backend, &model, &style);

        assert_eq!(token.position(), style.origin);
        token.set_position(&mut scene, Vector3::new(0.0, 1.0, -2.0));
        let node = scene.get(token.meshes()[0].node).map(|n| n.transform);
        // the (1, 0, 0) node offset shrinks with the model scale
        assert_eq!(
            node.map(|t| t.position),
            Some(Vector3::new(style.model_scale, 1.0, -2.0))
        );
        assert_eq!(node.map(|t| t.scale), Some(Vector3::new(0.1, 0.1, 0.1)));
    }

    #[test]
    fn should_release_everything_on_dispose() {
        let mut backend = HeadlessBackend::new(800, 600);
        let probe = backend.probe();
        let mut scene = Scene::new();
        let model = decode_model(&crate::resources::model::tests::triangle_glb()).unwrap();
        let token = PlayerToken::loaded(&mut scene, &mut backend, &model, &TokenStyle::default());
        assert_eq!(probe.live_resources(), 2);

        token.dispose(&mut scene, &mut backend);
        assert!(scene.is_empty());
        assert_eq!(probe.live_resources(), 0);
        assert_eq!(probe.double_disposals(), 0);
    }
}
