//! Stonebridge - a procedural stone-bridge river diorama
//!
//! A many-arched bridge over a river whose surface is animated every frame by
//! a Gerstner wave field with pier turbulence, flanked by a city square and an
//! old bazaar quarter.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use stonebridge::camera::CameraSystem;
use stonebridge::cli::Args;
use stonebridge::interaction::{Action, MouseOrbit, SceneState};
use stonebridge::objects::{build_diorama, sway_trees, Diorama};
use stonebridge::params::*;
use stonebridge::rendering::{FrameParams, RenderSystem};
use stonebridge::textures::TextureSet;
use stonebridge::water::{SurfaceUpdater, WaveField};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Scene and simulation
    diorama: Diorama,
    textures: TextureSet,
    water: SurfaceUpdater,
    camera: CameraSystem,
    mouse: MouseOrbit,
    state: SceneState,
    fog: FogParams,

    // Configuration
    render_config: RenderConfig,
    recording_config: Option<RecordingConfig>,

    // Time tracking
    start_time: Instant,
    last_frame_s: f32,
    frame_count: usize,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let recording_config = args.create_recording_config()?;
        let water_params = args.water_params();

        let diorama = build_diorama(&water_params, args.seed);
        let textures = TextureSet::generate(args.seed);
        let water = SurfaceUpdater::new(WaveField::river(), water_params);

        let mut camera = CameraSystem::new(&CameraTransition::default());
        camera.jump_to(args.view_index());

        let state = args.scene_state();
        let fog = FogParams {
            enabled: state.fog_enabled,
            ..FogParams::default()
        };

        Ok(Self {
            window: None,
            render_system: None,
            diorama,
            textures,
            water,
            camera,
            mouse: MouseOrbit::default(),
            state,
            fog,
            render_config: RenderConfig::default(),
            recording_config,
            start_time: Instant::now(),
            last_frame_s: 0.0,
            frame_count: 0,
        })
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Stonebridge")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.diorama.scene,
            &self.textures,
            self.recording_config.clone(),
        ))?;

        let (width, height) = render_system.size();
        self.render_config.window_width = width;
        self.render_config.window_height = height;

        match &self.recording_config {
            Some(config) => log::info!(
                "Recording {} frames to {}",
                config.total_frames(),
                config.frames_dir()
            ),
            None => log::info!(
                "Keys: 1-6 views, T time of day, W water, F fog, Esc quit; drag to orbit, wheel to zoom"
            ),
        }

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.start_time = Instant::now();
        Ok(())
    }

    /// Scene time for this frame and the step since the previous one
    fn advance_clock(&mut self) -> (f32, f32) {
        let now_s = match &self.recording_config {
            Some(config) => config.frame_time(self.frame_count),
            None => self.start_time.elapsed().as_secs_f32(),
        };
        let dt_s = (now_s - self.last_frame_s).max(0.0);
        self.last_frame_s = now_s;
        (now_s, dt_s)
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        if self.render_system.is_none() {
            return;
        }

        let (elapsed_s, dt_s) = self.advance_clock();

        if self.state.water_flowing {
            self.water.update(&mut self.diorama.scene, elapsed_s);
        }
        sway_trees(&mut self.diorama.scene, self.diorama.trees, elapsed_s);
        self.camera.update(dt_s);

        let (view_proj, camera_pos) = self.camera.view_proj(&self.render_config);
        let lighting = self.state.time_of_day.preset();
        self.fog.enabled = self.state.fog_enabled;
        let frame = FrameParams {
            view_proj,
            camera_pos,
            lighting: &lighting,
            fog: &self.fog,
            exposure: self.render_config.exposure,
        };

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        match render_system.render(&mut self.diorama.scene, &frame, self.frame_count) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                render_system.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
                return;
            }
            Err(e) => log::warn!("Render error: {e:?}"),
        }

        self.frame_count += 1;

        if let Some(config) = &self.recording_config {
            if self.frame_count >= config.total_frames() {
                log::info!(
                    "Recording complete: {} frames in {}",
                    self.frame_count,
                    config.frames_dir()
                );
                event_loop.exit();
            }
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init_graphics(event_loop) {
            log::error!("Failed to initialize graphics: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(action) = Action::from_key(key) {
                    if !self.state.apply(action, &mut self.camera) {
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse.button(button, state),
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((dx, dy)) = self.mouse.moved(position) {
                    let height = self.render_config.window_height as f32;
                    self.camera.orbit(dx, dy, height);
                }
            }
            WindowEvent::CursorLeft { .. } => self.mouse.left(),
            WindowEvent::MouseWheel { delta, .. } => {
                self.camera.zoom(MouseOrbit::wheel_steps(delta));
            }
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                    let (width, height) = render_system.size();
                    self.render_config.window_width = width;
                    self.render_config.window_height = height;
                }
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    log::info!("Stonebridge - procedural river diorama (seed {})", args.seed);

    let mut app = App::new(&args)?;
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
