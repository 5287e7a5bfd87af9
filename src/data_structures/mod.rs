//! Engine data structures: meshes, transforms, the scene graph and textures.
//!
//! - `geometry` contains CPU mesh data, the box primitive and edge extraction
//! - `instance` holds per-node transformation data and its GPU layout
//! - `scene_graph` is the scene root the board and the token are attached to
//! - `texture` wraps the depth attachment

pub mod geometry;
pub mod instance;
pub mod scene_graph;
pub mod texture;
