//! Engine configuration.
//!
//! Every visual and timing constant the engine uses lives here so a host can
//! restyle the board without touching the lifecycle code. [`EngineConfig::default`]
//! reproduces the stock look: a green staircase of 100 slabs with red borders,
//! gold highlighted special cells and a green token.

use std::collections::HashSet;

use cgmath::Vector3;

/// Number of cells on the journey path. Fixed regardless of the special set.
pub const BOARD_CELLS: u32 = 100;

/// Per-mount inputs supplied by the turn-progression collaborator.
#[derive(Clone, Debug, Default)]
pub struct BoardSetup {
    /// Opaque locator for the token's glTF/GLB asset.
    pub model_reference: String,
    /// 1-based cell indices that get the highlighted treatment.
    pub special_positions: HashSet<u32>,
}

impl BoardSetup {
    pub fn new(model_reference: impl Into<String>, special_positions: HashSet<u32>) -> Self {
        Self {
            model_reference: model_reference.into(),
            special_positions,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub board: BoardStyle,
    pub token: TokenStyle,
    pub camera: CameraRig,
    pub lighting: Lighting,
    pub timing: Timing,
    /// Colour the surface is cleared to before every draw.
    pub clear_colour: [f64; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board: BoardStyle::default(),
            token: TokenStyle::default(),
            camera: CameraRig::default(),
            lighting: Lighting::default(),
            timing: Timing::default(),
            clear_colour: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[derive(Clone, Debug)]
pub struct BoardStyle {
    /// Vertical rise between two consecutive cells.
    pub step_rise: f32,
    /// Distance travelled into the screen (-z) between two consecutive cells.
    pub step_depth: f32,
    /// Width, height and depth of a cell body.
    pub cell_size: [f32; 3],
    /// Outline scale relative to the body so the border sits just outside it.
    pub outline_scale: [f32; 3],
    pub body_colour: [f32; 4],
    pub special_body_colour: [f32; 4],
    pub outline_colour: [f32; 4],
    pub special_outline_colour: [f32; 4],
    /// Constant depth offset pushed onto ordinary outlines.
    pub outline_depth_bias: f32,
}

impl Default for BoardStyle {
    fn default() -> Self {
        Self {
            step_rise: 0.2,
            step_depth: 0.5,
            cell_size: [2.0, 0.2, 2.0],
            outline_scale: [1.01, 1.01, 1.06],
            body_colour: hex_colour(0x215412, 1.0),
            special_body_colour: hex_colour(0xFFD700, 0.8),
            outline_colour: hex_colour(0xFF0000, 1.0),
            special_outline_colour: hex_colour(0xFFD700, 1.0),
            outline_depth_bias: 1.0e-4,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TokenStyle {
    /// Where the token waits before the first move: one step in front of cell 1.
    pub origin: Vector3<f32>,
    /// Offset from a cell centre to the token's resting point on top of it.
    pub offset: Vector3<f32>,
    /// Uniform scale applied to a loaded model.
    pub model_scale: f32,
    pub colour: [f32; 4],
    /// Edge length of the fallback cube.
    pub fallback_size: f32,
}

impl Default for TokenStyle {
    fn default() -> Self {
        Self {
            origin: Vector3::new(0.0, 0.1, 1.0),
            offset: Vector3::new(0.0, 0.1, 0.0),
            model_scale: 0.1,
            colour: hex_colour(0x00FF00, 1.0),
            fallback_size: 0.2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraRig {
    pub start: Vector3<f32>,
    /// Offset from a cell centre to the trailing camera; the camera looks back along it.
    pub offset: Vector3<f32>,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            start: Vector3::new(0.0, 0.5, 2.0),
            offset: Vector3::new(0.0, 0.5, 2.0),
            fovy: 75.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Lighting {
    pub ambient_colour: [f32; 3],
    pub ambient_intensity: f32,
    pub directional_colour: [f32; 3],
    pub directional_intensity: f32,
    pub directional_position: Vector3<f32>,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient_colour: [1.0, 1.0, 1.0],
            ambient_intensity: 0.5,
            directional_colour: [1.0, 1.0, 1.0],
            directional_intensity: 0.5,
            directional_position: Vector3::new(0.0, 1.0, 0.0),
        }
    }
}

/// All durations are milliseconds.
#[derive(Clone, Debug)]
pub struct Timing {
    pub animation_duration: f64,
    /// Minimum spacing between two draws; 60 draws per second by default.
    pub frame_interval: f64,
    pub load_timeout: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            animation_duration: 800.0,
            frame_interval: 1000.0 / 60.0,
            load_timeout: 10_000.0,
        }
    }
}

/// Converts a `0xRRGGBB` literal into RGBA floats.
pub fn hex_colour(rgb: u32, alpha: f32) -> [f32; 4] {
    let channel = |shift: u32| ((rgb >> shift) & 0xFF) as f32 / 255.0;
    [channel(16), channel(8), channel(0), alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_split_hex_colour_into_channels() {
        assert_eq!(hex_colour(0xFF0000, 1.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(hex_colour(0x00FF00, 0.5), [0.0, 1.0, 0.0, 0.5]);
        let gold = hex_colour(0xFFD700, 0.8);
        assert_eq!(gold[0], 1.0);
        assert!((gold[1] - 215.0 / 255.0).abs() < f32::EPSILON);
        assert_eq!(gold[2], 0.0);
    }

    #[test]
    fn should_default_to_sixty_draws_per_second() {
        let timing = Timing::default();
        assert!((timing.frame_interval * 60.0 - 1000.0).abs() < 1e-9);
        assert_eq!(timing.load_timeout, 10_000.0);
    }
}
