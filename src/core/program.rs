//! The render loop
//!
//! [`Program`] owns the backend, the two resident objects, the camera and
//! all per-frame state. It is driven one frame at a time by the window
//! layer, which keeps it independent of winit and testable headless.
//!
//! Each `Running` frame, in order:
//! 1. drain queued input through the [`InputController`]
//! 2. read the framebuffer size; skip the frame if it has no area
//! 3. apply the active-object selection
//! 4. reload the active object's shaders if their sources changed
//! 5. begin the frame (viewport, colour and depth clear)
//! 6. render the active object
//! 7. end the frame (submit and present)

use std::time::Instant;

use super::config::RendererConfig;
use super::stage::Stage;
use super::stats::FrameStats;
use crate::core::Result;
use crate::gpu::GpuBackend;
use crate::input::{ControlRequest, InputController, InputEvent, InputMapper, InputQueue};
use crate::renderer::camera::Camera;
use crate::renderer::flags::{ActiveObject, FeatureFlags};
use crate::renderer::lights::LightingEnvironment;
use crate::renderer::object::FrameContext;

/// Render loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Running,
    /// A close was requested; no further frames are drawn.
    Closing,
}

/// What one call to [`Program::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    Rendered,
    /// The framebuffer had no area (minimised window).
    Skipped,
    Closing,
}

/// Render loop over any [`GpuBackend`].
pub struct Program<B: GpuBackend> {
    backend: B,
    stage: Option<Stage>,
    camera: Camera,
    lighting: LightingEnvironment,
    flags: FeatureFlags,
    controller: InputController,
    queue: InputQueue,
    state: RunState,
    clear_colour: [f32; 4],
    stats: FrameStats,
}

impl<B: GpuBackend> Program<B> {
    /// Load both scene objects, build their shaders and upload their geometry.
    pub fn new(mut backend: B, config: &RendererConfig) -> Result<Self> {
        let stage = Stage::from_config(&mut backend, config)?;

        log::info!(
            "Scene ready: {} (primary), {} (secondary)",
            stage.get(ActiveObject::Primary).name(),
            stage.get(ActiveObject::Secondary).name()
        );

        Ok(Self {
            backend,
            stage: Some(stage),
            camera: Camera::from_config(&config.camera),
            lighting: config.lighting.clone(),
            flags: FeatureFlags::default(),
            controller: InputController::new(
                InputMapper::with_defaults(),
                config.camera.movement_speed,
            ),
            queue: InputQueue::new(),
            state: RunState::Running,
            clear_colour: config.clear_colour,
            stats: FrameStats::new(),
        })
    }

    /// Queue an input event for the next frame.
    pub fn push_input(&mut self, event: InputEvent) {
        if self.state == RunState::Running {
            self.queue.push(event);
        }
    }

    /// Run one iteration of the loop.
    pub fn frame(&mut self) -> FrameOutcome {
        if self.state == RunState::Closing {
            return FrameOutcome::Closing;
        }

        for event in self.queue.drain() {
            let request = self
                .controller
                .apply(event, &mut self.camera, &mut self.flags);
            if request == ControlRequest::Close {
                self.state = RunState::Closing;
                break;
            }
        }
        if self.state == RunState::Closing {
            self.shutdown();
            return FrameOutcome::Closing;
        }

        let viewport = self.backend.framebuffer_size();
        if viewport.is_empty() {
            self.stats.record(FrameOutcome::Skipped, Instant::now());
            return FrameOutcome::Skipped;
        }

        let Some(stage) = self.stage.as_mut() else {
            return FrameOutcome::Closing;
        };
        stage.select(self.flags.active);
        stage.reload_active(&mut self.backend);

        if !self.backend.begin_frame(viewport, self.clear_colour) {
            self.stats.record(FrameOutcome::Skipped, Instant::now());
            return FrameOutcome::Skipped;
        }

        let context = FrameContext {
            camera: &self.camera,
            lighting: &self.lighting,
            flags: self.flags,
            viewport,
        };
        stage.active().render(&mut self.backend, &context);
        self.backend.end_frame();

        self.stats.record(FrameOutcome::Rendered, Instant::now());
        FrameOutcome::Rendered
    }

    /// Move to `Closing` and release every GPU resource.
    pub fn request_close(&mut self) {
        self.state = RunState::Closing;
        self.shutdown();
    }

    /// Release the objects. Later calls do nothing.
    fn shutdown(&mut self) {
        if let Some(stage) = self.stage.take() {
            stage.release(&mut self.backend);
            log::info!(
                "Shut down after {} frames ({} skipped)",
                self.stats.rendered_frames(),
                self.stats.skipped_frames()
            );
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[must_use]
    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    /// `None` once shut down.
    #[must_use]
    pub fn stage(&self) -> Option<&Stage> {
        self.stage.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: GpuBackend> Drop for Program<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use winit::keyboard::KeyCode;

    use super::*;
    use crate::core::config::ObjectSpec;
    use crate::gpu::recording::RecordingBackend;
    use crate::gpu::{DrawCall, UniformValue};

    fn config() -> RendererConfig {
        RendererConfig::default()
            .with_base_directory(env!("CARGO_MANIFEST_DIR"))
            .with_scene(
                ObjectSpec::Cube {
                    half_extent: 1.0,
                    colour: Vec3::new(1.0, 0.647, 0.0),
                },
                ObjectSpec::Triangle {
                    colour: Vec3::new(0.2, 0.8, 0.0),
                },
            )
    }

    fn program() -> Program<RecordingBackend> {
        Program::new(RecordingBackend::new(), &config()).unwrap()
    }

    #[test]
    fn test_one_draw_per_frame() {
        let mut program = program();

        for _ in 0..3 {
            assert_eq!(program.frame(), FrameOutcome::Rendered);
        }

        let frames = program.backend().frames();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f.draws.len() == 1));
        assert_eq!(frames[0].clear_colour, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(program.stats().rendered_frames(), 3);
    }

    #[test]
    fn test_toggle_switches_object_next_frame() {
        let mut program = program();
        program.frame();

        program.push_input(InputEvent::press(KeyCode::KeyM));
        program.push_input(InputEvent::release(KeyCode::KeyM));
        program.frame();

        let frames = program.backend().frames();
        assert_eq!(frames[0].draws[0].call, DrawCall::Arrays { vertex_count: 36 });
        assert_eq!(frames[1].draws[0].call, DrawCall::Arrays { vertex_count: 3 });
        assert_ne!(frames[0].draws[0].program, frames[1].draws[0].program);
        assert_eq!(program.flags().active, ActiveObject::Secondary);

        // The cube stays resident while the triangle is drawn
        let stage = program.stage().unwrap();
        assert_eq!(stage.selection(), ActiveObject::Secondary);
        let cube = stage.get(ActiveObject::Primary);
        assert!(cube.resources().iter().all(|id| program.backend().is_live(*id)));
    }

    #[test]
    fn test_flags_reach_uniforms() {
        let mut program = program();
        program.push_input(InputEvent::release(KeyCode::Space));
        program.push_input(InputEvent::release(KeyCode::KeyL));
        program.frame();

        let draw = &program.backend().last_frame().unwrap().draws[0];
        assert_eq!(draw.read("specular_flag"), Some(UniformValue::U32(1)));
        assert_eq!(draw.read("directional_flag"), Some(UniformValue::U32(1)));
    }

    #[test]
    fn test_camera_moves_before_render() {
        let mut program = program();
        program.push_input(InputEvent::press(KeyCode::KeyW));
        program.frame();

        let eye = program.camera().eye;
        let draw = &program.backend().last_frame().unwrap().draws[0];
        assert_eq!(draw.read("camera_pos"), Some(UniformValue::Vec3(eye)));
        assert!(eye.z < 3.0);
    }

    #[test]
    fn test_zero_size_framebuffer_skips_frame() {
        let mut program = program();
        program.backend_mut().set_framebuffer_size(0, 600);

        assert_eq!(program.frame(), FrameOutcome::Skipped);
        assert!(program.backend().frames().is_empty());
        assert_eq!(program.stats().skipped_frames(), 1);

        program.backend_mut().set_framebuffer_size(640, 480);
        assert_eq!(program.frame(), FrameOutcome::Rendered);
        assert_eq!(program.backend().last_frame().unwrap().viewport.width, 640);
    }

    #[test]
    fn test_escape_closes_and_releases_everything() {
        let mut program = program();
        program.frame();

        program.push_input(InputEvent::press(KeyCode::Escape));
        program.push_input(InputEvent::press(KeyCode::KeyW));

        assert_eq!(program.frame(), FrameOutcome::Closing);
        assert_eq!(program.state(), RunState::Closing);
        assert!(program.stage().is_none());
        assert_eq!(program.backend().live_count(), 0);

        // Further frames draw nothing
        assert_eq!(program.frame(), FrameOutcome::Closing);
        assert_eq!(program.backend().frames().len(), 1);
    }

    #[test]
    fn test_request_close_is_idempotent() {
        let mut program = program();
        program.request_close();
        program.request_close();

        assert_eq!(program.backend().live_count(), 0);
        assert_eq!(program.frame(), FrameOutcome::Closing);
    }

    #[test]
    fn test_bad_shader_directory_is_compile_error() {
        let config = config().with_shader_directory("/no/such/shaders");
        assert!(matches!(
            Program::new(RecordingBackend::new(), &config),
            Err(crate::core::Error::ShaderCompile { .. })
        ));
    }

    #[test]
    fn test_failed_start_releases_partial_resources() {
        // The primary object links and uploads, the secondary fails to link
        let mut gpu = RecordingBackend::new();
        gpu.fail_links_after(1);

        let err = Stage::from_config(&mut gpu, &config()).unwrap_err();
        assert!(matches!(err, crate::core::Error::ShaderLink { .. }));
        assert_eq!(gpu.compile_calls(), 4);
        assert_eq!(gpu.live_count(), 0);
    }
}
