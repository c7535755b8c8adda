//! wgpu implementation of the GPU backend
//!
//! A "vertex array" is a record of which vertex and index buffers belong
//! together, a "shader" is a validated shader module plus its reflected
//! uniform block, and a "program" is a render pipeline with one uniform
//! buffer bound at group 0. Draws are queued during the frame and replayed
//! into a single render pass when the frame ends.

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use super::pool::Pool;
use super::reflect::{self, UniformBlock, UniformLocation, UniformValue};
use super::{
    BufferHandle, BufferUsage, DrawCall, GpuBackend, Handle, ProgramHandle, ResourceId,
    ShaderHandle, ShaderStage, VertexArrayHandle, Viewport,
};
use crate::core::{Error, Result};
use crate::renderer::vertex::Vertex;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ============================================================================
// Resource Records
// ============================================================================

#[derive(Debug, Default)]
struct VertexArrayRecord {
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

#[derive(Debug)]
struct BufferRecord {
    buffer: wgpu::Buffer,
    usage: BufferUsage,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    entry_point: String,
    uniforms: Option<UniformBlock>,
}

#[derive(Debug)]
struct UniformResources {
    block: UniformBlock,
    staging: Vec<u8>,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
struct ProgramRecord {
    pipeline: wgpu::RenderPipeline,
    uniforms: Option<UniformResources>,
}

#[derive(Debug, Clone, Copy)]
struct QueuedDraw {
    program: ProgramHandle,
    vertex_array: VertexArrayHandle,
    call: DrawCall,
}

struct FrameTarget {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    viewport: Viewport,
    clear: wgpu::Color,
}

// ============================================================================
// Backend
// ============================================================================

/// GPU backend rendering into a winit window through wgpu.
pub struct WgpuBackend {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    vertex_arrays: Pool<VertexArrayRecord>,
    buffers: Pool<BufferRecord>,
    shaders: Pool<ShaderRecord>,
    programs: Pool<ProgramRecord>,
    frame: Option<FrameTarget>,
    draws: Vec<QueuedDraw>,
}

impl WgpuBackend {
    /// Create a surface, device and queue for `window`.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();
        let size = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|err| Error::ResourceInit(format!("failed to create surface: {err}")))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::ResourceInit("no compatible GPU adapter found".to_string()))?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Lumen Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|err| Error::ResourceInit(format!("failed to create device: {err}")))?;

        device.on_uncaptured_error(Box::new(|err| {
            log::error!("Uncaptured GPU error: {err}");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&fallback_format) = surface_caps.formats.first() else {
            return Err(Error::ResourceInit(
                "surface reports no supported formats".to_string(),
            ));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(fallback_format);

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.0,
            height: size.1,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_view = Self::create_depth_view(&device, size.0, size.1);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            depth_view,
            vertex_arrays: Pool::new(),
            buffers: Pool::new(),
            shaders: Pool::new(),
            programs: Pool::new(),
            frame: None,
            draws: Vec::new(),
        })
    }

    /// Blocking wrapper around [`WgpuBackend::new`].
    pub fn create(window: Arc<Window>, vsync: bool) -> Result<Self> {
        pollster::block_on(Self::new(window, vsync))
    }

    /// The window this backend presents to.
    #[must_use]
    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn reconfigure(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_view(&self.device, width, height);

        log::debug!("Resized surface to {}x{}", width, height);
    }

    /// Run `f` inside a validation error scope, turning a captured error into its message.
    fn scoped<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> std::result::Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err.to_string()),
            None => Ok(value),
        }
    }

    fn create_uniforms(
        device: &wgpu::Device,
        block: UniformBlock,
        label: &str,
    ) -> (wgpu::BindGroupLayout, UniformResources) {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: reflect::UNIFORM_BINDING,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let staging = block.staging();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &staging,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: reflect::UNIFORM_BINDING,
                resource: buffer.as_entire_binding(),
            }],
        });

        (
            layout,
            UniformResources {
                block,
                staging,
                buffer,
                bind_group,
            },
        )
    }
}

impl GpuBackend for WgpuBackend {
    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        Handle::new(self.vertex_arrays.insert(VertexArrayRecord::default()))
    }

    fn create_buffer(&mut self, usage: BufferUsage, contents: &[u8]) -> BufferHandle {
        let wgpu_usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match usage {
                    BufferUsage::Vertex => "Vertex Buffer",
                    BufferUsage::Index => "Index Buffer",
                }),
                contents,
                usage: wgpu_usage,
            });

        Handle::new(self.buffers.insert(BufferRecord { buffer, usage }))
    }

    fn attach_vertex_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle) {
        match self.vertex_arrays.get_mut(vertex_array.index()) {
            Some(record) => record.vertex_buffer = Some(buffer),
            None => log::warn!("Attaching vertex buffer to dead vertex array {vertex_array:?}"),
        }
    }

    fn attach_index_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle) {
        match self.vertex_arrays.get_mut(vertex_array.index()) {
            Some(record) => record.index_buffer = Some(buffer),
            None => log::warn!("Attaching index buffer to dead vertex array {vertex_array:?}"),
        }
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
        label: &str,
    ) -> std::result::Result<ShaderHandle, String> {
        let reflected = reflect::parse_stage(stage, source)?;

        let module = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        Ok(Handle::new(self.shaders.insert(ShaderRecord {
            stage,
            module,
            entry_point: reflected.entry_point,
            uniforms: reflected.uniforms,
        })))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        label: &str,
    ) -> std::result::Result<ProgramHandle, String> {
        let vs = self
            .shaders
            .get(vertex.index())
            .ok_or_else(|| format!("vertex shader {vertex:?} is not live"))?;
        let fs = self
            .shaders
            .get(fragment.index())
            .ok_or_else(|| format!("fragment shader {fragment:?} is not live"))?;
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("program needs one vertex and one fragment stage".to_string());
        }

        let block = UniformBlock::merge(vs.uniforms.clone(), fs.uniforms.clone())?;
        let format = self.config.format;

        let (pipeline, uniforms) = self.scoped(|device| {
            let (bind_group_layout, uniforms) = match block {
                Some(block) => {
                    let (layout, resources) = Self::create_uniforms(device, block, label);
                    (Some(layout), Some(resources))
                }
                None => (None, None),
            };
            let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
                bind_group_layout.iter().collect();

            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &bind_group_layouts,
                push_constant_ranges: &[],
            });

            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: Some(&vs.entry_point),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs.module,
                    entry_point: Some(&fs.entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                // Procedural geometry does not have consistent winding.
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            (pipeline, uniforms)
        })?;

        Ok(Handle::new(
            self.programs.insert(ProgramRecord { pipeline, uniforms }),
        ))
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(program.index())?
            .uniforms
            .as_ref()?
            .block
            .location(name)
    }

    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: UniformValue) {
        let Some(uniforms) = self
            .programs
            .get_mut(program.index())
            .and_then(|record| record.uniforms.as_mut())
        else {
            log::warn!("Setting uniform on program {program:?} without a uniform block");
            return;
        };

        if !value.write_to(location, &mut uniforms.staging) {
            log::warn!(
                "Uniform write of {:?} does not fit location {:?}",
                value.ty(),
                location
            );
        }
    }

    fn draw(&mut self, program: ProgramHandle, vertex_array: VertexArrayHandle, call: DrawCall) {
        if self.frame.is_none() {
            log::warn!("Draw issued outside of a frame, ignoring");
            return;
        }
        let Some(record) = self.programs.get(program.index()) else {
            log::warn!("Draw with dead program {program:?}, ignoring");
            return;
        };
        if !self.vertex_arrays.is_live(vertex_array.index()) {
            log::warn!("Draw with dead vertex array {vertex_array:?}, ignoring");
            return;
        }

        // Uniforms are captured at draw time.
        if let Some(uniforms) = &record.uniforms {
            self.queue
                .write_buffer(&uniforms.buffer, 0, &uniforms.staging);
        }

        self.draws.push(QueuedDraw {
            program,
            vertex_array,
            call,
        });
    }

    fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> bool {
        self.vertex_arrays.remove(handle.index()).is_some()
    }

    fn delete_buffer(&mut self, handle: BufferHandle) -> bool {
        match self.buffers.remove(handle.index()) {
            Some(record) => {
                record.buffer.destroy();
                true
            }
            None => false,
        }
    }

    fn delete_shader(&mut self, handle: ShaderHandle) -> bool {
        self.shaders.remove(handle.index()).is_some()
    }

    fn delete_program(&mut self, handle: ProgramHandle) -> bool {
        match self.programs.remove(handle.index()) {
            Some(record) => {
                if let Some(uniforms) = record.uniforms {
                    uniforms.buffer.destroy();
                }
                true
            }
            None => false,
        }
    }

    fn is_live(&self, resource: ResourceId) -> bool {
        match resource {
            ResourceId::VertexArray(h) => self.vertex_arrays.is_live(h.index()),
            ResourceId::Buffer(h) => self.buffers.is_live(h.index()),
            ResourceId::Shader(h) => self.shaders.is_live(h.index()),
            ResourceId::Program(h) => self.programs.is_live(h.index()),
        }
    }

    fn framebuffer_size(&self) -> Viewport {
        let size = self.window.inner_size();
        Viewport::new(size.width, size.height)
    }

    fn begin_frame(&mut self, viewport: Viewport, clear_colour: [f32; 4]) -> bool {
        if viewport.is_empty() {
            return false;
        }
        if self.frame.is_some() {
            log::warn!("Frame begun twice without end_frame, dropping the previous one");
            self.frame = None;
            self.draws.clear();
        }
        if (self.config.width, self.config.height) != (viewport.width, viewport.height) {
            self.reconfigure(viewport.width, viewport.height);
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return false;
            }
            Err(err) => {
                log::error!("Surface error: {err:?}");
                return false;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let [r, g, b, a] = clear_colour.map(f64::from);

        self.frame = Some(FrameTarget {
            output,
            view,
            viewport,
            clear: wgpu::Color { r, g, b, a },
        });
        true
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::warn!("end_frame called without a frame in progress");
            return;
        };
        let mut draws = std::mem::take(&mut self.draws);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_viewport(
                0.0,
                0.0,
                frame.viewport.width as f32,
                frame.viewport.height as f32,
                0.0,
                1.0,
            );

            for draw in &draws {
                let (Some(program), Some(vertex_array)) = (
                    self.programs.get(draw.program.index()),
                    self.vertex_arrays.get(draw.vertex_array.index()),
                ) else {
                    continue;
                };
                let Some(vertex_buffer) = vertex_array
                    .vertex_buffer
                    .and_then(|h| self.buffers.get(h.index()))
                else {
                    log::warn!("Vertex array {:?} has no vertex buffer", draw.vertex_array);
                    continue;
                };

                pass.set_pipeline(&program.pipeline);
                if let Some(uniforms) = &program.uniforms {
                    pass.set_bind_group(reflect::UNIFORM_GROUP, &uniforms.bind_group, &[]);
                }
                pass.set_vertex_buffer(0, vertex_buffer.buffer.slice(..));

                match draw.call {
                    DrawCall::Arrays { vertex_count } => pass.draw(0..vertex_count, 0..1),
                    DrawCall::Indexed { index_count } => {
                        let index_buffer = vertex_array
                            .index_buffer
                            .and_then(|h| self.buffers.get(h.index()))
                            .filter(|record| record.usage == BufferUsage::Index);
                        let Some(index_buffer) = index_buffer else {
                            log::warn!("Indexed draw without an index buffer, skipping");
                            continue;
                        };
                        pass.set_index_buffer(index_buffer.buffer.slice(..), wgpu::IndexFormat::Uint32);
                        pass.draw_indexed(0..index_count, 0, 0..1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.output.present();

        draws.clear();
        self.draws = draws;
    }
}

impl Drop for WgpuBackend {
    fn drop(&mut self) {
        let live = self.vertex_arrays.len()
            + self.buffers.len()
            + self.shaders.len()
            + self.programs.len();
        if live > 0 {
            log::warn!("GPU backend dropped with {live} live resources");
        }
    }
}
