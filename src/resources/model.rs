//! glTF/GLB decoding into plain mesh data.
//!
//! Only what the token needs survives: triangle positions, normals and the
//! node hierarchy flattened into one transform per mesh. Textures, materials and
//! animations in the file are ignored; the token is drawn in a single colour.

use cgmath::InnerSpace;

use crate::data_structures::{
    geometry::{MeshData, ModelVertex, Topology},
    instance::Instance,
};

/// One triangle primitive of the model, positioned relative to the model root.
#[derive(Clone, Debug)]
pub struct ModelMesh {
    pub name: String,
    pub data: MeshData,
    pub transform: Instance,
}

/// Decodes a self-contained GLB (or glTF JSON with embedded buffers). Buffers
/// referenced by external URI are not fetched and make the decode fail.
pub fn decode_model(bytes: &[u8]) -> anyhow::Result<Vec<ModelMesh>> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("model declares a binary chunk it does not contain"))?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                anyhow::bail!("external buffer {} is not supported", uri);
            }
        }
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow::anyhow!("model has no scene"))?;

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        collect_meshes(node, &Instance::new(), &buffer_data, &mut meshes);
    }
    if meshes.is_empty() {
        anyhow::bail!("model contains no triangle meshes");
    }
    Ok(meshes)
}

fn node_transform(node: &gltf::Node) -> Instance {
    let (translation, [x, y, z, w], scale) = node.transform().decomposed();
    Instance {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(w, x, y, z),
        scale: scale.into(),
    }
}

fn collect_meshes(
    node: gltf::Node,
    parent: &Instance,
    buf: &[Vec<u8>],
    out: &mut Vec<ModelMesh>,
) {
    let transform = parent * &node_transform(&node);
    if let Some(mesh) = node.mesh() {
        let name = mesh.name().or(node.name()).unwrap_or("mesh").to_string();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("skipping {:?} primitive in {}", primitive.mode(), name);
                continue;
            }
            let reader = primitive.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));

            let Some(positions) = reader.read_positions() else {
                log::warn!("skipping primitive without positions in {}", name);
                continue;
            };
            let mut vertices: Vec<ModelVertex> = positions
                .map(|position| ModelVertex {
                    position,
                    normal: [0.0; 3],
                })
                .collect();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(raw) => raw.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };
            if indices.iter().any(|&i| i as usize >= vertices.len()) {
                log::warn!("skipping primitive with out-of-range indices in {}", name);
                continue;
            }

            match reader.read_normals() {
                Some(normals) => {
                    for (vertex, normal) in vertices.iter_mut().zip(normals) {
                        vertex.normal = normal;
                    }
                }
                None => smooth_normals(&mut vertices, &indices),
            }

            out.push(ModelMesh {
                name: name.clone(),
                data: MeshData {
                    vertices,
                    indices,
                    topology: Topology::Triangles,
                },
                transform,
            });
        }
    }
    for child in node.children() {
        collect_meshes(child, &transform, buf, out);
    }
}

/// Averages face normals into each vertex for models exported without normals.
fn smooth_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut sums = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| cgmath::Vector3::from(vertices[i as usize].position));
        let face = (b - a).cross(c - a);
        for &i in tri {
            sums[i as usize] += face;
        }
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        if sum.magnitude2() > 0.0 {
            vertex.normal = sum.normalize().into();
        }
    }
}
