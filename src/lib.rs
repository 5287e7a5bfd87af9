//! step-ngin
//!
//! A small wgpu engine that presents a 100-cell board-game path in 3D and
//! animates a player token along it. The crate turns two inputs, the current
//! step and the set of special cells, into an animated scene, and owns every
//! GPU resource it creates until teardown. Native and WASM builds share all code
//! except asset fetching and context acquisition.
//!
//! High-level modules
//! - `engine`: lifecycle state machine, per-frame work and ordered teardown
//! - `board`: shared cell resources and the board builder
//! - `token`: the player token (loaded model or fallback cube)
//! - `animation`: eased token and camera moves
//! - `render_loop`: 60 Hz draw pacing and the activity flag
//! - `resources`: model fetching, glTF decoding and the load/timeout race
//! - `render`: the rendering-context trait and draw batching
//! - `context`: the wgpu implementation of that trait
//! - `headless`: a GPU-less implementation that records what it was asked to do
//! - `camera`, `pipelines`, `data_structures`: camera, render pipelines, scene data
//! - `flow`: the winit host and the `run` entry point
//! - `config`, `error`: engine configuration and errors reported to the owner
//!

pub mod animation;
pub mod board;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod engine;
pub mod error;
pub mod flow;
pub mod headless;
pub mod pipelines;
pub mod render;
pub mod render_loop;
pub mod resources;
pub mod token;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::Vector3;
pub use config::{BOARD_CELLS, BoardSetup, EngineConfig};
pub use engine::{Engine, EngineListener, EngineState, LoopControl};
pub use error::EngineError;
pub use flow::{BoardHandle, run};
pub use headless::{HeadlessBackend, HeadlessProbe};
pub use render::RenderBackend;
pub use resources::loader::{FetchReceiver, ModelSource};
