//! Scene lifecycle: mounting, per-frame work and teardown.
//!
//! [`Engine`] owns everything that lives on the GPU and walks it through
//! `Uninitialized → Initializing → Ready → (Error | Unmounting) → Disposed`.
//! Mounting is split into the steps below so a host can acquire the rendering
//! context asynchronously and hand it over when it is ready:
//!
//! 1. [`Engine::attach_context`] takes the acquired context (or its failure)
//! 2. [`Engine::build_scene`] adds lights, the shared cell resources and the board
//! 3. [`Engine::start_loading`] kicks off the token model fetch
//! 4. [`Engine::start_loop`] activates frame pacing and enters `Ready`
//!
//! [`Engine::mount`] runs all four. After that the host calls [`Engine::frame`]
//! on every redraw opportunity until it returns [`LoopControl::Stop`].
//!
//! Teardown in [`Engine::unmount`] releases resources strictly in order: board
//! cells, shared cell resources, lights, the token, the context, the scene.
//! Each step checks that its target exists, so unmounting is safe from any
//! state, including a half-finished mount, and calling it twice is a no-op.

use crate::{
    animation::AnimationScheduler,
    board::{Board, SharedResources, build_board},
    camera::Camera,
    config::{BoardSetup, EngineConfig},
    data_structures::scene_graph::Scene,
    error::EngineError,
    render::{DrawError, Light, LightId, RenderBackend},
    render_loop::{RenderLoop, Tick},
    resources::{
        loader::{LoadAttempt, LoadOutcome, ModelSource},
        model::decode_model,
    },
    token::PlayerToken,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    /// Context acquisition failed or the context was lost. Only `unmount` is useful now.
    Error,
    Unmounting,
    Disposed,
}

/// Notifications for the collaborator that owns the engine.
pub trait EngineListener {
    /// The token is in the scene, either the loaded model or the fallback cube.
    /// Fires at most once per mount.
    fn on_load_complete(&mut self) {}

    fn on_error(&mut self, _error: &EngineError) {}

    /// The engine stopped for good; recreate it to continue.
    fn on_context_lost(&mut self) {}
}

/// Whether the host should keep scheduling frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Everything that only exists while a rendering context is attached.
pub struct SceneContext<B> {
    pub backend: B,
    pub scene: Scene,
    pub camera: Camera,
    pub render_loop: RenderLoop,
}

pub struct Engine<B: RenderBackend> {
    config: EngineConfig,
    setup: BoardSetup,
    state: EngineState,
    listener: Box<dyn EngineListener>,
    context: Option<SceneContext<B>>,
    shared: Option<SharedResources>,
    board: Option<Board>,
    lights: Vec<LightId>,
    token: Option<PlayerToken>,
    load: Option<LoadAttempt>,
    animation: AnimationScheduler,
}

impl<B: RenderBackend> Engine<B> {
    pub fn new(setup: BoardSetup, config: EngineConfig, listener: Box<dyn EngineListener>) -> Self {
        Self {
            config,
            setup,
            state: EngineState::Uninitialized,
            listener,
            context: None,
            shared: None,
            board: None,
            lights: Vec::new(),
            token: None,
            load: None,
            animation: AnimationScheduler::new(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> Option<&SceneContext<B>> {
        self.context.as_ref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn token(&self) -> Option<&PlayerToken> {
        self.token.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.load.as_ref().is_some_and(LoadAttempt::is_pending)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_animating()
    }

    /// Runs every mount step. On failure the engine is left in `Error` and the
    /// listener has been told.
    pub fn mount(
        &mut self,
        context: anyhow::Result<B>,
        size: (u32, u32),
        source: &dyn ModelSource,
        now: f64,
    ) -> Result<(), EngineError> {
        self.attach_context(context, size)?;
        self.build_scene();
        self.start_loading(source, now);
        self.start_loop(now);
        Ok(())
    }

    pub fn attach_context(
        &mut self,
        context: anyhow::Result<B>,
        (width, height): (u32, u32),
    ) -> Result<(), EngineError> {
        if self.state != EngineState::Uninitialized {
            log::warn!("ignoring context for an engine in state {:?}", self.state);
            return Ok(());
        }
        self.state = EngineState::Initializing;
        match context {
            Ok(mut backend) => {
                log::info!("rendering context acquired ({}x{})", width, height);
                // the surface may have been sized before the host settled its layout
                backend.resize(width, height);
                self.context = Some(SceneContext {
                    backend,
                    scene: Scene::new(),
                    camera: Camera::new(&self.config.camera, width, height),
                    render_loop: RenderLoop::new(self.config.timing.frame_interval),
                });
                Ok(())
            }
            Err(err) => {
                let error = EngineError::ContextUnavailable(format!("{:#}", err));
                log::error!("{}: {:#}", error, err);
                self.state = EngineState::Error;
                self.listener.on_error(&error);
                Err(error)
            }
        }
    }

    /// Adds the lights, allocates the shared cell resources and lays out the board.
    pub fn build_scene(&mut self) {
        if !self.is_initializing("build the scene") {
            return;
        }
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let lighting = &self.config.lighting;
        for light in [
            Light::Ambient {
                colour: lighting.ambient_colour,
                intensity: lighting.ambient_intensity,
            },
            Light::Directional {
                colour: lighting.directional_colour,
                intensity: lighting.directional_intensity,
                position: lighting.directional_position,
            },
        ] {
            let id = ctx.backend.create_light(light);
            ctx.scene.add_light(id);
            self.lights.push(id);
        }

        let shared = SharedResources::allocate(&mut ctx.backend, &self.config.board);
        let board = build_board(
            &mut ctx.scene,
            &shared,
            &self.config.board,
            &self.setup.special_positions,
        );
        log::info!(
            "board built: {} cells, {} special",
            board.len(),
            board.cells().iter().filter(|cell| cell.special).count()
        );
        self.shared = Some(shared);
        self.board = Some(board);
    }

    pub fn start_loading(&mut self, source: &dyn ModelSource, now: f64) {
        if !self.is_initializing("load the token") {
            return;
        }
        self.load = Some(LoadAttempt::start(
            source,
            &self.setup.model_reference,
            now,
            self.config.timing.load_timeout,
        ));
    }

    /// Activates the loop. The board is drawn from the first frame on, while the
    /// token may still be loading.
    pub fn start_loop(&mut self, now: f64) {
        if !self.is_initializing("start the render loop") {
            return;
        }
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        ctx.render_loop.start(now);
        self.state = EngineState::Ready;
        log::info!("engine ready");
    }

    fn is_initializing(&self, action: &str) -> bool {
        let initializing = self.state == EngineState::Initializing && self.context.is_some();
        if !initializing {
            log::warn!("cannot {} in state {:?}", action, self.state);
        }
        initializing
    }

    /// One host frame: resolve the model load, advance the animation and draw
    /// if the pacing allows. Interpolation runs on every call; drawing at most
    /// once per frame interval.
    pub fn frame(&mut self, now: f64) -> LoopControl {
        let Some(ctx) = self.context.as_mut() else {
            return LoopControl::Stop;
        };
        let tick = ctx.render_loop.tick(now);
        if tick == Tick::Exit {
            return LoopControl::Stop;
        }
        self.poll_load(now);
        self.advance_animation(now);
        match tick {
            Tick::Draw => self.draw(),
            _ => LoopControl::Continue,
        }
    }

    fn poll_load(&mut self, now: f64) {
        let Some(outcome) = self.load.as_mut().and_then(|attempt| attempt.poll(now)) else {
            return;
        };
        self.load = None;
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let token = match outcome {
            LoadOutcome::Fetched(bytes) => match decode_model(&bytes) {
                Ok(model) => {
                    log::info!("token model loaded ({} meshes)", model.len());
                    PlayerToken::loaded(&mut ctx.scene, &mut ctx.backend, &model, &self.config.token)
                }
                Err(err) => {
                    log::warn!("token model could not be decoded, using fallback cube: {:#}", err);
                    PlayerToken::fallback(&mut ctx.scene, &mut ctx.backend, &self.config.token)
                }
            },
            LoadOutcome::Failed(err) => {
                log::warn!("token model failed to load, using fallback cube: {:#}", err);
                PlayerToken::fallback(&mut ctx.scene, &mut ctx.backend, &self.config.token)
            }
            LoadOutcome::TimedOut => {
                let error = EngineError::ModelLoadTimedOut;
                log::error!("{} after {} ms", error, self.config.timing.load_timeout);
                self.listener.on_error(&error);
                return;
            }
        };
        if let Some(previous) = self.token.replace(token) {
            previous.dispose(&mut ctx.scene, &mut ctx.backend);
        }
        self.listener.on_load_complete();
    }

    fn advance_animation(&mut self, now: f64) {
        let Some(frame) = self.animation.advance(now) else {
            return;
        };
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if let Some(token) = self.token.as_mut() {
            token.set_position(&mut ctx.scene, frame.token);
        }
        ctx.camera.position = frame.camera;
    }

    fn draw(&mut self) -> LoopControl {
        let Some(ctx) = self.context.as_mut() else {
            return LoopControl::Stop;
        };
        match ctx.backend.draw(&ctx.scene, &ctx.camera) {
            Ok(()) => LoopControl::Continue,
            Err(DrawError::ContextLost) => {
                self.context_lost();
                LoopControl::Stop
            }
            Err(DrawError::Other(reason)) => {
                log::warn!("frame dropped: {}", reason);
                LoopControl::Continue
            }
        }
    }

    /// Moves the token to cell `step` (1-based). Ignored until the engine is
    /// ready and the token is in the scene, and for step 0.
    pub fn set_step(&mut self, step: u32, now: f64) {
        if self.state != EngineState::Ready {
            log::debug!("ignoring step {} in state {:?}", step, self.state);
            return;
        }
        let (Some(ctx), Some(token)) = (self.context.as_ref(), self.token.as_ref()) else {
            log::debug!("ignoring step {} before the token is placed", step);
            return;
        };
        self.animation.on_position_changed(
            &self.config,
            step,
            now,
            token.position(),
            ctx.camera.position,
        );
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.state != EngineState::Ready || width == 0 || height == 0 {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.camera.resize(width, height);
            ctx.backend.resize(width, height);
        }
    }

    /// The host surface became invalid. Stops the loop and reports upward;
    /// there is no recovery.
    pub fn context_lost(&mut self) {
        if self.state != EngineState::Ready {
            return;
        }
        log::error!("rendering context lost");
        if let Some(ctx) = self.context.as_mut() {
            ctx.render_loop.stop();
        }
        self.animation.cancel();
        self.state = EngineState::Error;
        self.listener.on_context_lost();
    }

    pub fn unmount(&mut self) {
        if matches!(self.state, EngineState::Unmounting | EngineState::Disposed) {
            return;
        }
        log::info!("unmounting from state {:?}", self.state);
        self.state = EngineState::Unmounting;
        if let Some(ctx) = self.context.as_mut() {
            ctx.render_loop.stop();
        }
        // an in-flight fetch may still complete; its result goes nowhere
        if let Some(mut attempt) = self.load.take() {
            attempt.cancel();
        }
        self.animation.cancel();

        if let Some(mut ctx) = self.context.take() {
            if let Some(board) = self.board.take() {
                board.remove_from(&mut ctx.scene);
            }
            if let Some(shared) = self.shared.take() {
                shared.dispose(&mut ctx.backend);
            }
            for light in self.lights.drain(..) {
                ctx.scene.remove_light(light);
                ctx.backend.dispose_light(light);
            }
            if let Some(token) = self.token.take() {
                token.dispose(&mut ctx.scene, &mut ctx.backend);
            }
            ctx.backend.dispose();
            ctx.scene.clear();
        }
        self.board = None;
        self.shared = None;
        self.lights.clear();
        self.token = None;
        self.state = EngineState::Disposed;
        log::info!("engine disposed");
    }
}

impl<B: RenderBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.unmount();
    }
}
