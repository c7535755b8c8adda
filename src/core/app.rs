//! winit application driving the render loop

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window, WindowId},
};

use super::config::RendererConfig;
use super::program::{FrameOutcome, Program};
use crate::core::{Error, Result};
use crate::gpu::WgpuBackend;
use crate::input::{InputEvent, KeyAction};

/// Open the window and run until it is closed.
pub fn run(config: RendererConfig) -> Result<()> {
    log::info!("Starting {}", config.window.title);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    config: RendererConfig,
    window: Option<Arc<Window>>,
    program: Option<Program<WgpuBackend>>,
    /// First fatal error; stops the event loop.
    error: Option<Error>,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            window: None,
            program: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.window.title)
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| Error::ResourceInit(format!("failed to create window: {err}")))?,
        );
        capture_cursor(&window);

        let backend = WgpuBackend::create(Arc::clone(&window), self.config.window.vsync)?;
        self.program = Some(Program::new(backend, &self.config)?);
        self.window = Some(window);

        log::info!("Renderer initialised");
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        log::error!("{err}");
        self.shutdown();
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn shutdown(&mut self) {
        if let Some(program) = &mut self.program {
            program.request_close();
        }
        self.program = None;
    }
}

/// Lock the cursor to the window for mouse look, falling back to confining it.
fn capture_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(err) = grabbed {
        log::warn!("Could not capture the cursor: {err}");
    }
    window.set_cursor_visible(false);
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.error.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down");
                self.shutdown();
                event_loop.exit();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if let Some(program) = &mut self.program {
                        program.push_input(InputEvent::Key {
                            key,
                            action: KeyAction::from_winit(event.state, event.repeat),
                        });
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                let Some(program) = &mut self.program else {
                    return;
                };
                if program.frame() == FrameOutcome::Closing {
                    self.shutdown();
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let Some(program) = &mut self.program {
                // Screen y grows downwards; pitch grows upwards.
                program.push_input(InputEvent::MouseDelta {
                    dx: dx as f32,
                    dy: -dy as f32,
                });
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
