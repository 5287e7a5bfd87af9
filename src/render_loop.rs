//! Frame pacing.
//!
//! The host calls [`RenderLoop::tick`] whenever it could draw (every
//! `RedrawRequested`, every animation frame). The loop lets at most one draw
//! through per interval and carries the remainder over so the average rate
//! stays on target even when the host's callbacks jitter.

/// What the caller should do with this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// The loop was stopped; do nothing and do not schedule another tick.
    Exit,
    /// Too early for the next draw; schedule another tick.
    Skip,
    Draw,
}

#[derive(Debug)]
pub struct RenderLoop {
    interval: f64,
    active: bool,
    last_draw: f64,
}

impl RenderLoop {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            active: false,
            last_draw: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activates the loop. The first tick at or after `now + interval` draws.
    pub fn start(&mut self, now: f64) {
        self.active = true;
        self.last_draw = now;
    }

    /// Deactivates the loop. Ticks already scheduled by the host see `Exit`.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn tick(&mut self, now: f64) -> Tick {
        if !self.active {
            return Tick::Exit;
        }
        let delta = now - self.last_draw;
        if delta < self.interval {
            return Tick::Skip;
        }
        self.last_draw = if self.interval > 0.0 {
            now - delta % self.interval
        } else {
            now
        };
        Tick::Draw
    }
}
