//! Interactive window around a [`Scene`].
//!
//! Creates the window and [`Renderer`] on resume, builds the scene against
//! the renderer and advances it once per redraw.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use glam::Vec3;

use crate::config::{SceneParams, PARTICLE_COUNT_RANGE};
use crate::emblem::{EmblemLoader, DEFAULT_EMBLEM_PATH};
use crate::error::ViewerError;
use crate::gpu::Renderer;
use crate::random::{RandomSource, SeededRandom};
use crate::scene::Scene;

const ORBIT_SENSITIVITY: f32 = 0.005;
const ZOOM_SENSITIVITY: f32 = 0.3;

const KEY_HELP: &str = "keys: space pause, R regenerate, C emblem color, arrows count/rotation, \
Q/A size, W/S opacity, E/D glow, T/G height, Y/H width, U/J emblem scale, B/V bloom, X/Z exposure";

/// Emblem colors cycled through by [`Control::CycleEmblemColor`], linear RGB.
pub const EMBLEM_PALETTE: [Vec3; 4] = [
    Vec3::new(1.0, 0.843, 0.0),
    Vec3::new(0.75, 0.75, 0.75),
    Vec3::new(0.9, 0.05, 0.05),
    Vec3::new(0.4, 0.8, 1.0),
];

/// How to start the viewer.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub params: SceneParams,
    pub emblem_path: PathBuf,
    /// Fixed seed for repeatable trees; `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            params: SceneParams::default(),
            emblem_path: PathBuf::from(DEFAULT_EMBLEM_PATH),
            seed: None,
        }
    }
}

/// A numeric parameter the keyboard can step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tunable {
    ParticleCount,
    RotationSpeed,
    ParticleSize,
    Opacity,
    GlowSize,
    TreeHeight,
    TreeWidth,
    EmblemScale,
    BloomStrength,
    Exposure,
}

impl Tunable {
    /// Change per key press.
    pub fn step(self) -> f32 {
        match self {
            Tunable::ParticleCount => 100.0,
            Tunable::RotationSpeed => 0.001,
            Tunable::ParticleSize => 0.01,
            Tunable::Opacity | Tunable::GlowSize | Tunable::EmblemScale | Tunable::BloomStrength => 0.1,
            Tunable::TreeHeight | Tunable::TreeWidth => 0.5,
            Tunable::Exposure => 0.1,
        }
    }

    /// Accepted range, matching [`SceneParams::validate`].
    pub fn range(self) -> (f32, f32) {
        match self {
            Tunable::ParticleCount => {
                let (min, max) = PARTICLE_COUNT_RANGE;
                (min as f32, max as f32)
            }
            Tunable::RotationSpeed => (0.0, 0.01),
            Tunable::ParticleSize => (0.01, 0.2),
            Tunable::Opacity => (0.0, 1.0),
            Tunable::GlowSize => (0.1, 1.0),
            Tunable::TreeHeight => (2.0, 10.0),
            Tunable::TreeWidth => (1.0, 5.0),
            Tunable::EmblemScale => (0.1, 1.0),
            Tunable::BloomStrength => (0.0, 3.0),
            Tunable::Exposure => (0.0, 2.0),
        }
    }

    pub fn get(self, params: &SceneParams) -> f32 {
        match self {
            Tunable::ParticleCount => params.particle_count as f32,
            Tunable::RotationSpeed => params.rotation_speed,
            Tunable::ParticleSize => params.particle_size,
            Tunable::Opacity => params.opacity,
            Tunable::GlowSize => params.glow_size,
            Tunable::TreeHeight => params.tree_height,
            Tunable::TreeWidth => params.tree_width,
            Tunable::EmblemScale => params.emblem_scale,
            Tunable::BloomStrength => params.post_processing.bloom_strength,
            Tunable::Exposure => params.post_processing.exposure,
        }
    }

    fn set(self, params: &mut SceneParams, value: f32) {
        match self {
            Tunable::ParticleCount => params.particle_count = value.round() as u32,
            Tunable::RotationSpeed => params.rotation_speed = value,
            Tunable::ParticleSize => params.particle_size = value,
            Tunable::Opacity => params.opacity = value,
            Tunable::GlowSize => params.glow_size = value,
            Tunable::TreeHeight => params.tree_height = value,
            Tunable::TreeWidth => params.tree_width = value,
            Tunable::EmblemScale => params.emblem_scale = value,
            Tunable::BloomStrength => params.post_processing.bloom_strength = value,
            Tunable::Exposure => params.post_processing.exposure = value,
        }
    }
}

/// Keyboard actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    TogglePause,
    Regenerate,
    /// Step a parameter up (`true`) or down (`false`).
    Adjust(Tunable, bool),
    CycleEmblemColor,
    Quit,
}

impl Control {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        use Tunable::*;
        let control = match key {
            KeyCode::Space => Control::TogglePause,
            KeyCode::KeyR => Control::Regenerate,
            KeyCode::KeyC => Control::CycleEmblemColor,
            KeyCode::Escape => Control::Quit,
            KeyCode::ArrowUp => Control::Adjust(ParticleCount, true),
            KeyCode::ArrowDown => Control::Adjust(ParticleCount, false),
            KeyCode::ArrowRight => Control::Adjust(RotationSpeed, true),
            KeyCode::ArrowLeft => Control::Adjust(RotationSpeed, false),
            KeyCode::KeyQ => Control::Adjust(ParticleSize, true),
            KeyCode::KeyA => Control::Adjust(ParticleSize, false),
            KeyCode::KeyW => Control::Adjust(Opacity, true),
            KeyCode::KeyS => Control::Adjust(Opacity, false),
            KeyCode::KeyE => Control::Adjust(GlowSize, true),
            KeyCode::KeyD => Control::Adjust(GlowSize, false),
            KeyCode::KeyT => Control::Adjust(TreeHeight, true),
            KeyCode::KeyG => Control::Adjust(TreeHeight, false),
            KeyCode::KeyY => Control::Adjust(TreeWidth, true),
            KeyCode::KeyH => Control::Adjust(TreeWidth, false),
            KeyCode::KeyU => Control::Adjust(EmblemScale, true),
            KeyCode::KeyJ => Control::Adjust(EmblemScale, false),
            KeyCode::KeyB => Control::Adjust(BloomStrength, true),
            KeyCode::KeyV => Control::Adjust(BloomStrength, false),
            KeyCode::KeyX => Control::Adjust(Exposure, true),
            KeyCode::KeyZ => Control::Adjust(Exposure, false),
            _ => return None,
        };
        Some(control)
    }

    /// Parameters after this control, clamped to the accepted ranges.
    ///
    /// Returns `None` for controls that do not touch parameters or when the
    /// value is already at its limit.
    pub fn adjust(self, params: &SceneParams) -> Option<SceneParams> {
        let mut next = *params;
        match self {
            Control::Adjust(tunable, up) => {
                let (min, max) = tunable.range();
                let step = if up { tunable.step() } else { -tunable.step() };
                tunable.set(&mut next, (tunable.get(params) + step).clamp(min, max));
            }
            Control::CycleEmblemColor => {
                let index = EMBLEM_PALETTE
                    .iter()
                    .position(|&c| c.abs_diff_eq(params.emblem_color, 1e-3))
                    .map_or(0, |i| (i + 1) % EMBLEM_PALETTE.len());
                next.emblem_color = EMBLEM_PALETTE[index];
            }
            _ => return None,
        }
        (next != *params).then_some(next)
    }
}

/// Startup warning when no model exists at `path`.
fn missing_emblem_warning(path: &Path) -> Option<String> {
    (!path.exists()).then(|| {
        format!(
            "emblem model not found at {}; the scene runs without the emblem and its sparks",
            path.display()
        )
    })
}

struct App {
    options: ViewerOptions,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    scene: Option<Scene>,
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
    error: Option<ViewerError>,
}

impl App {
    fn new(options: ViewerOptions) -> Self {
        Self {
            options,
            window: None,
            renderer: None,
            scene: None,
            mouse_pressed: false,
            last_mouse_pos: None,
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ViewerError> {
        let window_attrs = Window::default_attributes()
            .with_title("glowtree")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let mut renderer = pollster::block_on(Renderer::new(window.clone()))?;
        let rng: Box<dyn RandomSource> = match self.options.seed {
            Some(seed) => Box::new(SeededRandom::new(seed)),
            None => Box::new(SeededRandom::from_time()),
        };
        if let Some(warning) = missing_emblem_warning(&self.options.emblem_path) {
            log::warn!("{warning}");
        }
        let loader = EmblemLoader::spawn(self.options.emblem_path.clone());
        log::info!("{KEY_HELP}");
        let scene = Scene::new(self.options.params, rng, loader, &mut renderer)?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.scene = Some(scene);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        log::error!("{err}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_control(&mut self, event_loop: &ActiveEventLoop, control: Control) {
        let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) else {
            return;
        };
        match control {
            Control::Quit => event_loop.exit(),
            Control::TogglePause => {
                scene.toggle_pause();
                log::info!("{}", if scene.is_paused() { "paused" } else { "resumed" });
            }
            Control::Regenerate => scene.regenerate_tree(renderer),
            Control::Adjust(..) | Control::CycleEmblemColor => {
                let Some(params) = control.adjust(scene.params()) else {
                    return;
                };
                match scene.update_params(params, renderer) {
                    Ok(_) => match control {
                        Control::Adjust(tunable, _) => {
                            log::info!("{tunable:?} -> {:.3}", tunable.get(&params))
                        }
                        _ => log::info!("emblem color {:?}", params.emblem_color),
                    },
                    Err(err) => log::warn!("rejected parameter change: {err}"),
                }
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) else {
            return;
        };
        let report = scene.advance(renderer);
        log::trace!("{report:?}");

        match renderer.render(scene) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => renderer.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("render error: {e:?}"),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if let Some(control) = Control::from_key(key) {
                    self.handle_control(event_loop, control);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    self.mouse_pressed = state == ElementState::Pressed;
                    if !self.mouse_pressed {
                        self.last_mouse_pos = None;
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_mouse_pos {
                        let dx = (position.x - last_x) as f32;
                        let dy = (position.y - last_y) as f32;
                        if let Some(renderer) = &mut self.renderer {
                            renderer
                                .camera
                                .orbit(-dx * ORBIT_SENSITIVITY, dy * ORBIT_SENSITIVITY);
                        }
                    }
                    self.last_mouse_pos = Some((position.x, position.y));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
                };
                if let Some(renderer) = &mut self.renderer {
                    renderer.camera.zoom(scroll * ZOOM_SENSITIVITY);
                }
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(scene), Some(renderer)) = (self.scene.take(), self.renderer.as_mut()) {
            scene.teardown(renderer);
        }
    }
}

/// Open the window and run until it is closed.
pub fn run(options: ViewerOptions) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(options);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TUNABLES: [Tunable; 10] = [
        Tunable::ParticleCount,
        Tunable::RotationSpeed,
        Tunable::ParticleSize,
        Tunable::Opacity,
        Tunable::GlowSize,
        Tunable::TreeHeight,
        Tunable::TreeWidth,
        Tunable::EmblemScale,
        Tunable::BloomStrength,
        Tunable::Exposure,
    ];

    #[test]
    fn test_key_mapping() {
        assert_eq!(Control::from_key(KeyCode::Space), Some(Control::TogglePause));
        assert_eq!(Control::from_key(KeyCode::KeyR), Some(Control::Regenerate));
        assert_eq!(
            Control::from_key(KeyCode::ArrowUp),
            Some(Control::Adjust(Tunable::ParticleCount, true))
        );
        assert_eq!(
            Control::from_key(KeyCode::ArrowLeft),
            Some(Control::Adjust(Tunable::RotationSpeed, false))
        );
        assert_eq!(
            Control::from_key(KeyCode::KeyX),
            Some(Control::Adjust(Tunable::Exposure, true))
        );
        assert_eq!(Control::from_key(KeyCode::KeyC), Some(Control::CycleEmblemColor));
        assert_eq!(Control::from_key(KeyCode::Escape), Some(Control::Quit));
        assert_eq!(Control::from_key(KeyCode::KeyP), None);
    }

    #[test]
    fn test_count_adjustment_is_clamped() {
        let params = SceneParams {
            particle_count: 9950,
            ..SceneParams::default()
        };
        let up = Control::Adjust(Tunable::ParticleCount, true).adjust(&params).unwrap();
        assert_eq!(up.particle_count, 10_000);
        assert!(Control::Adjust(Tunable::ParticleCount, true).adjust(&up).is_none());

        let down = Control::Adjust(Tunable::ParticleCount, false).adjust(&params).unwrap();
        assert_eq!(down.particle_count, 9850);
        assert!(down.validate().is_ok());
    }

    #[test]
    fn test_rotation_adjustment_stays_valid() {
        let mut params = SceneParams::default();
        for _ in 0..20 {
            if let Some(next) = Control::Adjust(Tunable::RotationSpeed, false).adjust(&params) {
                params = next;
            }
        }
        assert_eq!(params.rotation_speed, 0.0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_every_tunable_stays_in_range() {
        for tunable in ALL_TUNABLES {
            for up in [true, false] {
                let mut params = SceneParams::default();
                for _ in 0..200 {
                    if let Some(next) = Control::Adjust(tunable, up).adjust(&params) {
                        params = next;
                    }
                }
                let (min, max) = tunable.range();
                assert_eq!(tunable.get(&params), if up { max } else { min }, "{tunable:?}");
                assert!(params.validate().is_ok(), "{tunable:?}");
            }
        }
    }

    #[test]
    fn test_adjust_touches_only_its_field() {
        let params = SceneParams::default();
        let next = Control::Adjust(Tunable::Exposure, false).adjust(&params).unwrap();
        assert!((next.post_processing.exposure - 0.9).abs() < 1e-6);
        assert_eq!(next.post_processing.bloom_strength, params.post_processing.bloom_strength);
        assert_eq!(params.diff(&next), Default::default());

        let taller = Control::Adjust(Tunable::TreeHeight, true).adjust(&params).unwrap();
        let diff = params.diff(&taller);
        assert!(diff.rebuild_tree && diff.reanchor_emblem && !diff.material_changed);
    }

    #[test]
    fn test_emblem_color_cycles_through_palette() {
        let mut params = SceneParams::default();
        assert_eq!(params.emblem_color, EMBLEM_PALETTE[0]);
        for expected in EMBLEM_PALETTE.iter().cycle().skip(1).take(EMBLEM_PALETTE.len()) {
            params = Control::CycleEmblemColor.adjust(&params).unwrap();
            assert_eq!(params.emblem_color, *expected);
            assert!(params.validate().is_ok());
        }

        params.emblem_color = Vec3::new(0.2, 0.3, 0.4);
        let reset = Control::CycleEmblemColor.adjust(&params).unwrap();
        assert_eq!(reset.emblem_color, EMBLEM_PALETTE[0]);
    }

    #[test]
    fn test_missing_emblem_is_reported() {
        let missing = std::env::temp_dir().join("glowtree-no-such-emblem.glb");
        let warning = missing_emblem_warning(&missing).unwrap();
        assert!(warning.contains("glowtree-no-such-emblem.glb"));

        let present = std::env::temp_dir().join(format!("glowtree-emblem-{}.glb", std::process::id()));
        std::fs::write(&present, b"glTF").unwrap();
        assert!(missing_emblem_warning(&present).is_none());
        std::fs::remove_file(&present).unwrap();
    }

    #[test]
    fn test_non_parameter_controls_do_not_adjust() {
        let params = SceneParams::default();
        assert!(Control::TogglePause.adjust(&params).is_none());
        assert!(Control::Quit.adjust(&params).is_none());
    }
}
