//! Headless backend for tests
//!
//! Runs the same WGSL parsing, validation and uniform reflection as the wgpu
//! backend, but instead of touching a device it records every frame and
//! every draw along with a snapshot of the uniform block.

use glam::{Mat4, Vec3, Vec4};

use super::pool::Pool;
use super::reflect::{self, UniformBlock, UniformLocation, UniformType, UniformValue};
use super::{
    BufferHandle, BufferUsage, DrawCall, GpuBackend, Handle, ProgramHandle, ResourceId,
    ShaderHandle, ShaderStage, VertexArrayHandle, Viewport,
};

#[derive(Debug, Default)]
struct VertexArrayRecord {
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

#[derive(Debug)]
struct BufferRecord {
    usage: BufferUsage,
}

#[derive(Debug)]
struct ShaderRecord {
    stage: ShaderStage,
    uniforms: Option<UniformBlock>,
}

#[derive(Debug)]
struct ProgramRecord {
    block: Option<UniformBlock>,
    staging: Vec<u8>,
}

/// One recorded draw.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub program: ProgramHandle,
    pub vertex_array: VertexArrayHandle,
    pub call: DrawCall,
    block: Option<UniformBlock>,
    uniforms: Vec<u8>,
}

impl DrawRecord {
    /// Value a uniform had when the draw was issued.
    #[must_use]
    pub fn read(&self, name: &str) -> Option<UniformValue> {
        let UniformLocation { offset, ty } = self.block.as_ref()?.location(name)?;
        let bytes = self.uniforms.get(offset as usize..offset as usize + ty.size())?;

        Some(match ty {
            UniformType::F32 => UniformValue::F32(bytemuck::pod_read_unaligned(bytes)),
            UniformType::I32 => UniformValue::I32(bytemuck::pod_read_unaligned(bytes)),
            UniformType::U32 => UniformValue::U32(bytemuck::pod_read_unaligned(bytes)),
            UniformType::Vec3 => {
                UniformValue::Vec3(Vec3::from_array(bytemuck::pod_read_unaligned(bytes)))
            }
            UniformType::Vec4 => {
                UniformValue::Vec4(Vec4::from_array(bytemuck::pod_read_unaligned(bytes)))
            }
            UniformType::Mat4 => {
                UniformValue::Mat4(Mat4::from_cols_array(&bytemuck::pod_read_unaligned(bytes)))
            }
        })
    }
}

/// One recorded frame.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub viewport: Viewport,
    pub clear_colour: [f32; 4],
    pub draws: Vec<DrawRecord>,
}

/// Backend that records instead of rendering.
#[derive(Debug)]
pub struct RecordingBackend {
    framebuffer: Viewport,
    vertex_arrays: Pool<VertexArrayRecord>,
    buffers: Pool<BufferRecord>,
    shaders: Pool<ShaderRecord>,
    programs: Pool<ProgramRecord>,
    current: Option<FrameRecord>,
    frames: Vec<FrameRecord>,
    compile_calls: usize,
    /// Successful links left before `link_program` starts failing.
    links_until_failure: Option<usize>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            framebuffer: Viewport::new(1280, 720),
            vertex_arrays: Pool::new(),
            buffers: Pool::new(),
            shaders: Pool::new(),
            programs: Pool::new(),
            current: None,
            frames: Vec::new(),
            compile_calls: 0,
            links_until_failure: None,
        }
    }

    /// Let `successful` more links through, then reject every later one.
    pub fn fail_links_after(&mut self, successful: usize) {
        self.links_until_failure = Some(successful);
    }

    /// Pretend the window was resized.
    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.framebuffer = Viewport::new(width, height);
    }

    /// Completed frames, oldest first.
    #[must_use]
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    /// Number of live resources of every kind.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.vertex_arrays.len() + self.buffers.len() + self.shaders.len() + self.programs.len()
    }

    /// How many times `compile_shader` was called.
    #[must_use]
    pub fn compile_calls(&self) -> usize {
        self.compile_calls
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for RecordingBackend {
    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        Handle::new(self.vertex_arrays.insert(VertexArrayRecord::default()))
    }

    fn create_buffer(&mut self, usage: BufferUsage, _contents: &[u8]) -> BufferHandle {
        Handle::new(self.buffers.insert(BufferRecord { usage }))
    }

    fn attach_vertex_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle) {
        let record = self
            .vertex_arrays
            .get_mut(vertex_array.index())
            .expect("attach to dead vertex array");
        record.vertex_buffer = Some(buffer);
    }

    fn attach_index_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle) {
        let record = self
            .vertex_arrays
            .get_mut(vertex_array.index())
            .expect("attach to dead vertex array");
        record.index_buffer = Some(buffer);
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
        _label: &str,
    ) -> Result<ShaderHandle, String> {
        self.compile_calls += 1;
        let reflected = reflect::parse_stage(stage, source)?;
        Ok(Handle::new(self.shaders.insert(ShaderRecord {
            stage,
            uniforms: reflected.uniforms,
        })))
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        _label: &str,
    ) -> Result<ProgramHandle, String> {
        match &mut self.links_until_failure {
            Some(0) => return Err("link rejected".to_string()),
            Some(remaining) => *remaining -= 1,
            None => {}
        }

        let vs = self
            .shaders
            .get(vertex.index())
            .ok_or("vertex shader is not live")?;
        let fs = self
            .shaders
            .get(fragment.index())
            .ok_or("fragment shader is not live")?;
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("program needs one vertex and one fragment stage".to_string());
        }

        let block = UniformBlock::merge(vs.uniforms.clone(), fs.uniforms.clone())?;
        let staging = block.as_ref().map(UniformBlock::staging).unwrap_or_default();
        Ok(Handle::new(
            self.programs.insert(ProgramRecord { block, staging }),
        ))
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs
            .get(program.index())?
            .block
            .as_ref()?
            .location(name)
    }

    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: UniformValue) {
        let record = self
            .programs
            .get_mut(program.index())
            .expect("set_uniform on dead program");
        assert!(
            value.write_to(location, &mut record.staging),
            "uniform write {value:?} does not fit {location:?}"
        );
    }

    fn draw(&mut self, program: ProgramHandle, vertex_array: VertexArrayHandle, call: DrawCall) {
        let record = self
            .programs
            .get(program.index())
            .expect("draw with dead program");
        let arrays = self
            .vertex_arrays
            .get(vertex_array.index())
            .expect("draw with dead vertex array");
        assert!(
            arrays
                .vertex_buffer
                .is_some_and(|h| self.buffers.get(h.index()).is_some_and(|b| b.usage == BufferUsage::Vertex)),
            "draw without a live vertex buffer"
        );
        if let DrawCall::Indexed { .. } = call {
            assert!(
                arrays
                    .index_buffer
                    .is_some_and(|h| self.buffers.get(h.index()).is_some_and(|b| b.usage == BufferUsage::Index)),
                "indexed draw without a live index buffer"
            );
        }

        let draw = DrawRecord {
            program,
            vertex_array,
            call,
            block: record.block.clone(),
            uniforms: record.staging.clone(),
        };
        self.current
            .as_mut()
            .expect("draw outside of a frame")
            .draws
            .push(draw);
    }

    fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> bool {
        self.vertex_arrays.remove(handle.index()).is_some()
    }

    fn delete_buffer(&mut self, handle: BufferHandle) -> bool {
        self.buffers.remove(handle.index()).is_some()
    }

    fn delete_shader(&mut self, handle: ShaderHandle) -> bool {
        self.shaders.remove(handle.index()).is_some()
    }

    fn delete_program(&mut self, handle: ProgramHandle) -> bool {
        self.programs.remove(handle.index()).is_some()
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
        self.framebuffer
    }

    fn begin_frame(&mut self, viewport: Viewport, clear_colour: [f32; 4]) -> bool {
        assert!(self.current.is_none(), "frame begun twice");
        if viewport.is_empty() {
            return false;
        }
        self.current = Some(FrameRecord {
            viewport,
            clear_colour,
            draws: Vec::new(),
        });
        true
    }

    fn end_frame(&mut self) {
        let frame = self.current.take().expect("end_frame without begin_frame");
        self.frames.push(frame);
    }
}
