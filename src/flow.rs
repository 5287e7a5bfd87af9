//! The winit host.
//!
//! [`run`] opens a window, acquires the wgpu [`Context`] for it, mounts an
//! [`Engine`] and drives it from the window's redraw cycle until the window
//! closes or the engine is unmounted.
//!
//! # Event routing
//!
//! - `RedrawRequested` runs one [`Engine::frame`]; another redraw is requested
//!   only while the engine wants more frames
//! - `Resized` resizes the camera and the surface
//! - `CloseRequested` and [`BoardHandle::unmount`] tear the engine down and exit
//! - [`BoardHandle::set_step`] moves the token
//!
//! The board handle is handed out once the engine is mounted. It talks to the
//! event loop through a proxy, so the turn logic may live on any thread.

use std::{fmt::Debug, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    config::{BoardSetup, EngineConfig},
    context::Context,
    engine::{Engine, EngineListener, EngineState, LoopControl},
    resources::AssetSource,
};

pub enum HostEvent {
    Step(u32),
    Unmount,
    /// Result of the asynchronous context acquisition on the web.
    #[cfg(target_arch = "wasm32")]
    ContextReady(anyhow::Result<Context>),
}

impl Debug for HostEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Step(step) => f.debug_tuple("Step").field(step).finish(),
            Self::Unmount => f.write_str("Unmount"),
            #[cfg(target_arch = "wasm32")]
            Self::ContextReady(result) => f
                .debug_tuple("ContextReady")
                .field(&result.as_ref().map(|_| "Context"))
                .finish(),
        }
    }
}

/// Lets the turn-progression logic drive a running board.
#[derive(Clone, Debug)]
pub struct BoardHandle {
    proxy: EventLoopProxy<HostEvent>,
}

impl BoardHandle {
    /// Moves the token to cell `step`. Returns `false` once the board is gone.
    pub fn set_step(&self, step: u32) -> bool {
        self.proxy.send_event(HostEvent::Step(step)).is_ok()
    }

    pub fn unmount(&self) -> bool {
        self.proxy.send_event(HostEvent::Unmount).is_ok()
    }
}

type ReadyCallback = Box<dyn FnOnce(BoardHandle)>;

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<HostEvent>,
    engine: Engine<Context>,
    source: AssetSource,
    window: Option<Arc<Window>>,
    on_ready: Option<ReadyCallback>,
    clock: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<HostEvent>,
        setup: BoardSetup,
        config: EngineConfig,
        listener: Box<dyn EngineListener>,
        on_ready: ReadyCallback,
    ) -> anyhow::Result<Self> {
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        #[cfg(not(target_arch = "wasm32"))]
        let source = AssetSource::new(async_runtime.handle().clone());
        #[cfg(target_arch = "wasm32")]
        let source = AssetSource::new();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy: event_loop.create_proxy(),
            engine: Engine::new(setup, config, listener),
            source,
            window: None,
            on_ready: Some(on_ready),
            clock: Instant::now(),
        })
    }

    /// Milliseconds since the host started.
    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    fn mount(&mut self, event_loop: &ActiveEventLoop, context: anyhow::Result<Context>) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let size = window.inner_size();
        let now = self.now();
        if let Err(e) = self
            .engine
            .mount(context, (size.width, size.height), &self.source, now)
        {
            log::error!("could not mount the board: {}", e);
            event_loop.exit();
            return;
        }
        if let Some(on_ready) = self.on_ready.take() {
            on_ready(BoardHandle {
                proxy: self.proxy.clone(),
            });
        }
        window.request_redraw();
    }

    fn unmount(&mut self, event_loop: &ActiveEventLoop) {
        self.engine.unmount();
        event_loop.exit();
    }
}

impl ApplicationHandler<HostEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.engine.state() != EngineState::Uninitialized {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("step-ngin");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("no #{} element, winit creates its own canvas", CANVAS_ID),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                let context = Err(anyhow::Error::new(err).context("creating the window"));
                if let Err(e) = self.engine.attach_context(context, (0, 0)) {
                    log::error!("exiting without a window: {}", e);
                }
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());
        let clear_colour = self.engine.config().clear_colour;

        #[cfg(not(target_arch = "wasm32"))]
        {
            let context = self.async_runtime.block_on(Context::new(window, clear_colour));
            self.mount(event_loop, context);
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let context = Context::new(window, clear_colour).await;
                if proxy.send_event(HostEvent::ContextReady(context)).is_err() {
                    log::warn!("event loop closed before the rendering context was ready");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::Step(step) => {
                let now = self.now();
                self.engine.set_step(step, now);
            }
            HostEvent::Unmount => self.unmount(event_loop),
            #[cfg(target_arch = "wasm32")]
            HostEvent::ContextReady(context) => self.mount(event_loop, context),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.unmount(event_loop),
            WindowEvent::Resized(size) => self.engine.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let now = self.now();
                if self.engine.frame(now) == LoopControl::Continue {
                    if let Some(window) = &self.window {
                        window.request_redraw();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Opens a window and runs the board until it is closed or unmounted.
/// `on_ready` receives the handle for pushing steps once the engine is mounted.
pub fn run(
    setup: BoardSetup,
    config: EngineConfig,
    listener: Box<dyn EngineListener>,
    on_ready: impl FnOnce(BoardHandle) + 'static,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::debug!("logger already initialised");
        }
    }

    let event_loop: EventLoop<HostEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, setup, config, listener, Box::new(on_ready))?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
