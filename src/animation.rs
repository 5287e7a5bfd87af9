//! Eased token and camera moves between cells.
//!
//! A move always starts from where the token and camera are drawn right now, so
//! a new step arriving mid-move blends smoothly from the intermediate position
//! instead of snapping back to the previous target.

use cgmath::{Vector3, VectorSpace};

use crate::{board::cell_position, config::EngineConfig};

/// Quadratic ease-in-out on `[0, 1]`.
pub fn ease(p: f32) -> f32 {
    if p < 0.5 {
        2.0 * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(2) / 2.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationState {
    pub start_time: f64,
    pub duration: f64,
    pub token_from: Vector3<f32>,
    pub token_to: Vector3<f32>,
    pub camera_from: Vector3<f32>,
    pub camera_to: Vector3<f32>,
}

impl AnimationState {
    /// Linear progress in `[0, 1]`.
    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start_time) / self.duration).clamp(0.0, 1.0) as f32
    }
}

/// Positions for one frame of a move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub token: Vector3<f32>,
    pub camera: Vector3<f32>,
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct AnimationScheduler {
    current: Option<AnimationState>,
}

impl AnimationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&AnimationState> {
        self.current.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.current.is_some()
    }

    /// Starts a move to `cell_position(step)`, replacing any move in flight.
    /// Cells are laid out from index 0, so step `n` lands one cell past the
    /// `n`th body and step 100 sits just beyond the last one. Step 0 means the
    /// player has not entered the board and is ignored.
    pub fn on_position_changed(
        &mut self,
        config: &EngineConfig,
        step: u32,
        now: f64,
        token_now: Vector3<f32>,
        camera_now: Vector3<f32>,
    ) {
        if step == 0 {
            return;
        }
        let cell = cell_position(&config.board, step);
        log::debug!("moving token to cell {}", step);
        self.current = Some(AnimationState {
            start_time: now,
            duration: config.timing.animation_duration,
            token_from: token_now,
            token_to: cell + config.token.offset,
            camera_from: camera_now,
            camera_to: cell + config.camera.offset,
        });
    }

    /// Interpolated positions at `now`, or `None` when nothing is moving. The
    /// move is dropped once it has reached its target.
    pub fn advance(&mut self, now: f64) -> Option<Frame> {
        let state = self.current.as_ref()?;
        let progress = state.progress(now);
        let frame = if progress >= 1.0 {
            Frame {
                token: state.token_to,
                camera: state.camera_to,
                finished: true,
            }
        } else {
            let eased = ease(progress);
            Frame {
                token: state.token_from.lerp(state.token_to, eased),
                camera: state.camera_from.lerp(state.camera_to, eased),
                finished: false,
            }
        };
        if frame.finished {
            self.current = None;
        }
        Some(frame)
    }

    pub fn cancel(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn should_ease_monotonically_between_fixed_points() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(0.5), 0.5);
        assert_eq!(ease(1.0), 1.0);
        let mut last = 0.0;
        for i in 1..=100 {
            let value = ease(i as f32 / 100.0);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn should_ignore_step_zero() {
        let mut scheduler = AnimationScheduler::new();
        let zero = Vector3::new(0.0, 0.0, 0.0);
        scheduler.on_position_changed(&EngineConfig::default(), 0, 0.0, zero, zero);
        assert!(!scheduler.is_animating());
        assert_eq!(scheduler.advance(100.0), None);
    }

    #[test]
    fn should_reach_halfway_at_half_duration() {
        let config = EngineConfig::default();
        let mut scheduler = AnimationScheduler::new();
        let token = config.token.origin;
        let camera = config.camera.start;
        scheduler.on_position_changed(&config, 3, 1_000.0, token, camera);

        let target = cell_position(&config.board, 3) + config.token.offset;
        let frame = scheduler.advance(1_400.0).unwrap();
        assert!(!frame.finished);
        let halfway = token.lerp(target, 0.5);
        assert_relative_eq!(frame.token.x, halfway.x);
        assert_relative_eq!(frame.token.y, halfway.y);
        assert_relative_eq!(frame.token.z, halfway.z);
    }

    #[test]
    fn should_land_exactly_on_target_and_stop() {
        let config = EngineConfig::default();
        let mut scheduler = AnimationScheduler::new();
        scheduler.on_position_changed(&config, 1, 0.0, config.token.origin, config.camera.start);
        let frame = scheduler.advance(5_000.0).unwrap();
        assert!(frame.finished);
        assert_eq!(frame.token, cell_position(&config.board, 1) + config.token.offset);
        assert_eq!(frame.camera, cell_position(&config.board, 1) + config.camera.offset);
        assert!(!scheduler.is_animating());
    }

    #[test]
    fn should_restart_from_live_position() {
        let config = EngineConfig::default();
        let mut scheduler = AnimationScheduler::new();
        scheduler.on_position_changed(&config, 5, 0.0, config.token.origin, config.camera.start);
        let mid = scheduler.advance(300.0).unwrap();

        scheduler.on_position_changed(&config, 9, 300.0, mid.token, mid.camera);
        let state = scheduler.current().unwrap();
        assert_eq!(state.token_from, mid.token);
        assert_eq!(state.camera_from, mid.camera);
        assert_eq!(state.start_time, 300.0);
        assert_eq!(state.token_to, cell_position(&config.board, 9) + config.token.offset);
        // the first frame of the new move is where the old one left off
        assert_eq!(scheduler.advance(300.0).map(|f| f.token), Some(mid.token));
    }

    #[test]
    fn should_target_first_step_one_rise_up_the_path() {
        let config = EngineConfig::default();
        let mut scheduler = AnimationScheduler::new();
        scheduler.on_position_changed(&config, 1, 0.0, config.token.origin, config.camera.start);
        let state = scheduler.current().unwrap();
        assert_relative_eq!(state.token_to.x, 0.0);
        assert_relative_eq!(state.token_to.y, 0.3);
        assert_relative_eq!(state.token_to.z, -0.5);
        assert_relative_eq!(state.camera_to.y, 0.7);
        assert_relative_eq!(state.camera_to.z, 1.5);
    }
}
