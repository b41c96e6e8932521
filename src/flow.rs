//! Application event loop.
//!
//! A [`TunnelFlow`] is the controller of the visualization: it reacts to
//! input, mutates the [`Settings`] the scene reads every frame and asks for
//! surfaces to be loaded or snapshots to be taken by returning [`Out`]
//! commands. The loop owns the GPU context and the scene and never blocks on
//! mesh parsing; loads and snapshots come back as user events.
//!
//! # Lifecycle
//!
//! Each redraw:
//! 1. `on_update` runs with the time since the last frame
//! 2. the camera uniform is refreshed
//! 3. the scene derives this frame's wind inputs and uploads them
//! 4. the frame is encoded and presented

use std::{fmt::Debug, sync::Arc};

use image::RgbaImage;
use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::{SceneConfig, Settings},
    context::Context,
    loader::{Accepted, LoadCompletion, LoadTicket, SurfaceLoader},
    render,
    resources::{LoadError, mesh::SurfaceData},
    scene::TunnelScene,
    snapshot::{Readback, SnapshotError},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Commands a [`TunnelFlow`] hook hands back to the loop.
///
/// `Out::LoadFile` reads and parses a mesh in the background, from the file
/// system natively or relative to the page on the web. `Out::LoadBytes` does
/// the same for bytes the caller already has, for example from a file picker.
/// Whatever was requested last wins: older loads still in flight are dropped
/// when they finish.
///
/// `Out::Snapshot` captures the current view; the result arrives in
/// [`TunnelFlow::on_snapshot`].
///
/// `Out::Configure` can be used to modify the Context during runtime, for
/// instance to move the camera or change the clear colour.
pub enum Out {
    LoadFile(String),
    LoadBytes { name: String, bytes: Vec<u8> },
    Snapshot,
    Configure(Box<dyn FnOnce(&mut Context)>),
    Batch(Vec<Out>),
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

impl Debug for Out {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadFile(path) => f.debug_tuple("LoadFile").field(path).finish(),
            Self::LoadBytes { name, bytes } => f
                .debug_struct("LoadBytes")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
            Self::Snapshot => f.write_str("Snapshot"),
            Self::Configure(_) => f.write_str("Configure(|&mut Context| -> {...})"),
            Self::Batch(outs) => f.debug_list().entries(outs).finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Controller of the wind tunnel.
///
/// Only `on_init` is mandatory; every other hook defaults to doing nothing.
pub trait TunnelFlow {
    /// Called once the GPU context exists, before the first frame.
    ///
    /// This is the place to set the starting wind, queue the first surface
    /// and tweak the camera.
    fn on_init(&mut self, ctx: &mut Context, settings: &mut Settings) -> Out;

    /// Called every frame before the scene is updated.
    fn on_update(&mut self, _ctx: &Context, _settings: &mut Settings, _dt: Duration) -> Out {
        Out::Empty
    }

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(
        &mut self,
        _ctx: &Context,
        _settings: &mut Settings,
        _event: &WindowEvent,
    ) -> Out {
        Out::Empty
    }

    /// The most recent load finished. Stale loads are never reported.
    ///
    /// On failure the previously shown surface stays in place.
    fn on_surface_loaded(
        &mut self,
        _ctx: &Context,
        _settings: &mut Settings,
        _result: Result<&SurfaceData, &LoadError>,
    ) -> Out {
        Out::Empty
    }

    /// A requested snapshot is ready.
    fn on_snapshot(
        &mut self,
        _ctx: &Context,
        _settings: &mut Settings,
        _result: Result<RgbaImage, SnapshotError>,
    ) -> Out {
        Out::Empty
    }
}

// Dummy impl to make wasm work
impl Debug for dyn TunnelFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TunnelFlow")
    }
}

/// Application state bundle: GPU context, scene, settings and surface status.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    scene: TunnelScene,
    settings: Settings,
    loader: SurfaceLoader,
    is_surface_configured: bool,
    frames_presented: u64,
}

impl AppState {
    async fn new(window: Arc<Window>, scene_config: SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, &scene_config).await?;
        let settings = Settings::default();
        let scene = TunnelScene::new(&ctx, &settings, &scene_config);
        Ok(Self {
            ctx,
            scene,
            settings,
            loader: SurfaceLoader::new(),
            is_surface_configured: false,
            frames_presented: 0,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = self.ctx.window() {
            window.request_redraw();
        }
    }

    /// Advance and present one frame.
    fn render(&mut self, dt: Duration) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let ctx = &mut self.ctx;
        ctx.camera.controller.update(&mut ctx.camera.camera, dt);
        ctx.camera.write_to_buffer(&ctx.queue, &ctx.projection);

        self.scene.update(&self.ctx, &self.settings, dt);
        render::present(&self.ctx, &self.scene)?;
        self.frames_presented += 1;
        Ok(())
    }

    /// Whether a snapshot would show anything yet.
    pub fn can_snapshot(&self) -> bool {
        self.is_surface_configured && self.frames_presented > 0
    }

    /// Render the current view offscreen and queue the readback.
    pub fn capture_snapshot(&self) -> Result<Readback, SnapshotError> {
        if !self.can_snapshot() {
            return Err(SnapshotError::NotReady);
        }
        Ok(Readback::submit(&self.ctx, &self.scene))
    }

    /// Hand a finished load to the scene if it is still the latest one.
    ///
    /// Returns `None` for stale completions.
    fn apply_load(&mut self, completion: LoadCompletion) -> Option<Result<SurfaceData, LoadError>> {
        match self.loader.accept(completion) {
            Accepted::Surface(surface) => {
                self.scene.set_surface(&self.ctx, &surface);
                Some(Ok(surface))
            }
            Accepted::Failed(e) => Some(Err(e)),
            Accepted::Stale => None,
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    flow: Box<dyn TunnelFlow>,
    scene_config: SceneConfig,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        flow: Box<dyn TunnelFlow>,
        scene_config: SceneConfig,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            flow,
            scene_config,
            last_time: Instant::now(),
        })
    }

    fn init(&mut self) {
        let Some(state) = &mut self.state else {
            return;
        };
        let out = self.flow.on_init(&mut state.ctx, &mut state.settings);
        handle_flow_output(
            #[cfg(not(target_arch = "wasm32"))]
            &self.async_runtime,
            state,
            self.proxy.clone(),
            out,
        );
        state.request_redraw();
    }
}

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Initialized(Box<AppState>),
    SurfaceLoaded(LoadCompletion),
    Snapshot(Result<RgbaImage, SnapshotError>),
    #[allow(dead_code)]
    Exit,
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::SurfaceLoaded(completion) => f
                .debug_struct("SurfaceLoaded")
                .field("ticket", &completion.ticket)
                .field("name", &completion.name)
                .finish(),
            Self::Snapshot(result) => f
                .debug_tuple("Snapshot")
                .field(&result.as_ref().map(|img| img.dimensions()))
                .finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("flow-tunnel");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let init_future = AppState::new(window, self.scene_config);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => {
                    self.state = Some(state);
                    self.init();
                }
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy
                            .send_event(FlowEvent::Initialized(Box::new(state)))
                            .is_err()
                        {
                            log::error!("event loop closed before initialization finished");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(state) => {
                // This is the message from our wasm `spawn_local`
                let mut state = *state;
                // Important: Trigger a resize and redraw now that we are initialized
                if let Some(size) = state.ctx.window().map(|w| w.inner_size()) {
                    state.resize(size.width, size.height);
                }
                self.state = Some(state);
                self.init();
            }
            FlowEvent::SurfaceLoaded(completion) => {
                let Some(state) = &mut self.state else {
                    return;
                };
                let Some(result) = state.apply_load(completion) else {
                    return;
                };
                let out = self.flow.on_surface_loaded(
                    &state.ctx,
                    &mut state.settings,
                    result.as_ref(),
                );
                handle_flow_output(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    state,
                    self.proxy.clone(),
                    out,
                );
            }
            FlowEvent::Snapshot(result) => {
                let Some(state) = &mut self.state else {
                    return;
                };
                if let Err(e) = &result {
                    log::error!("snapshot failed: {}", e);
                }
                let out = self
                    .flow
                    .on_snapshot(&state.ctx, &mut state.settings, result);
                handle_flow_output(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    state,
                    self.proxy.clone(),
                    out,
                );
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if state.ctx.mouse_pressed {
                state.ctx.camera.controller.handle_mouse(dx, dy);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        // general stuff
        state.ctx.camera.controller.handle_window_events(&event);

        let out = self
            .flow
            .on_window_events(&state.ctx, &mut state.settings, &event);
        handle_flow_output(
            #[cfg(not(target_arch = "wasm32"))]
            &self.async_runtime,
            state,
            self.proxy.clone(),
            out,
        );

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => state.ctx.mouse_pressed = true,
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => state.ctx.mouse_pressed = false,
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                let out = self.flow.on_update(&state.ctx, &mut state.settings, dt);
                handle_flow_output(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    state,
                    self.proxy.clone(),
                    out,
                );

                match state.render(dt) {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let [width, height] = state.ctx.size();
                        state.resize(width, height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn send(proxy: &EventLoopProxy<FlowEvent>, event: FlowEvent) {
    if let Err(err) = proxy.send_event(event) {
        log::error!("event loop closed before a result could be delivered: {}", err);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(
    async_runtime: &tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    ticket: LoadTicket,
    name: String,
    bytes: Option<Vec<u8>>,
) {
    async_runtime.spawn(async move {
        let bytes = match bytes {
            Some(bytes) => Ok(bytes),
            None => crate::resources::load_binary(&name).await,
        };
        let completion = match bytes {
            Ok(bytes) => {
                let parse_name = name.clone();
                let parsed = tokio::task::spawn_blocking(move || {
                    LoadCompletion::parse(ticket, parse_name, &bytes)
                })
                .await;
                match parsed {
                    Ok(completion) => completion,
                    Err(e) => LoadCompletion {
                        ticket,
                        name,
                        result: Err(LoadError::Malformed(format!("parser panicked: {}", e))),
                    },
                }
            }
            Err(e) => LoadCompletion {
                ticket,
                name,
                result: Err(e),
            },
        };
        send(&proxy, FlowEvent::SurfaceLoaded(completion));
    });
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(
    proxy: EventLoopProxy<FlowEvent>,
    ticket: LoadTicket,
    name: String,
    bytes: Option<Vec<u8>>,
) {
    wasm_bindgen_futures::spawn_local(async move {
        let bytes = match bytes {
            Some(bytes) => Ok(bytes),
            None => crate::resources::load_binary(&name).await,
        };
        let completion = match bytes {
            Ok(bytes) => LoadCompletion::parse(ticket, name, &bytes),
            Err(e) => LoadCompletion {
                ticket,
                name,
                result: Err(e),
            },
        };
        send(&proxy, FlowEvent::SurfaceLoaded(completion));
    });
}

fn handle_flow_output(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    state: &mut AppState,
    proxy: EventLoopProxy<FlowEvent>,
    out: Out,
) {
    match out {
        Out::LoadFile(path) => {
            let ticket = state.loader.issue();
            log::info!("loading {} (ticket {})", path, ticket.id());
            spawn_load(
                #[cfg(not(target_arch = "wasm32"))]
                async_runtime,
                proxy,
                ticket,
                path,
                None,
            );
        }
        Out::LoadBytes { name, bytes } => {
            let ticket = state.loader.issue();
            log::info!("loading {} bytes as {} (ticket {})", bytes.len(), name, ticket.id());
            spawn_load(
                #[cfg(not(target_arch = "wasm32"))]
                async_runtime,
                proxy,
                ticket,
                name,
                Some(bytes),
            );
        }
        Out::Snapshot => {
            let readback = match state.capture_snapshot() {
                Ok(readback) => readback,
                Err(e) => {
                    send(&proxy, FlowEvent::Snapshot(Err(e)));
                    return;
                }
            };
            let device = state.ctx.device.clone();
            #[cfg(not(target_arch = "wasm32"))]
            {
                let result = async_runtime.block_on(readback.read(&device));
                send(&proxy, FlowEvent::Snapshot(result));
            }
            #[cfg(target_arch = "wasm32")]
            {
                wasm_bindgen_futures::spawn_local(async move {
                    let result = readback.read(&device).await;
                    send(&proxy, FlowEvent::Snapshot(result));
                });
            }
        }
        Out::Configure(f) => f(&mut state.ctx),
        Out::Batch(outs) => {
            for out in outs {
                handle_flow_output(
                    #[cfg(not(target_arch = "wasm32"))]
                    async_runtime,
                    state,
                    proxy.clone(),
                    out,
                );
            }
        }
        Out::Empty => (),
    }
}

/// Open a window and run the tunnel with the default environment.
pub fn run(flow: impl TunnelFlow + 'static) -> anyhow::Result<()> {
    run_with(flow, SceneConfig::default())
}

pub fn run_with(flow: impl TunnelFlow + 'static, scene_config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, Box::new(flow), scene_config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
