//! GPU backend seam
//!
//! Everything that touches a device goes through [`GpuBackend`]. Resources
//! are identified by typed, generation-checked [`Handle`]s that are owned by
//! exactly one renderer object and deleted exactly once.

pub mod pool;
pub mod reflect;
pub mod wgpu_backend;

#[cfg(test)]
pub mod recording;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

pub use pool::{Pool, PoolIndex};
pub use reflect::{UniformBlock, UniformLocation, UniformType, UniformValue};
pub use wgpu_backend::WgpuBackend;

// ============================================================================
// Handles
// ============================================================================

/// Marker for vertex-array handles.
#[derive(Debug)]
pub enum VertexArrayTag {}
/// Marker for buffer handles.
#[derive(Debug)]
pub enum BufferTag {}
/// Marker for compiled shader stage handles.
#[derive(Debug)]
pub enum ShaderTag {}
/// Marker for linked program handles.
#[derive(Debug)]
pub enum ProgramTag {}

/// Opaque identifier of one GPU resource of kind `K`.
pub struct Handle<K> {
    index: PoolIndex,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    pub(crate) const fn new(index: PoolIndex) -> Self {
        Self {
            index,
            _kind: PhantomData,
        }
    }

    pub(crate) const fn index(self) -> PoolIndex {
        self.index
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index.slot(), self.index.generation())
    }
}

pub type VertexArrayHandle = Handle<VertexArrayTag>;
pub type BufferHandle = Handle<BufferTag>;
pub type ShaderHandle = Handle<ShaderTag>;
pub type ProgramHandle = Handle<ProgramTag>;

/// Any handle, for liveness queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    VertexArray(VertexArrayHandle),
    Buffer(BufferHandle),
    Shader(ShaderHandle),
    Program(ProgramHandle),
}

// ============================================================================
// Descriptors
// ============================================================================

/// Pipeline stage a shader source is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// What a buffer will be bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// A single draw submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCall {
    /// Non-indexed triangles straight from the vertex buffer.
    Arrays { vertex_count: u32 },
    /// Indexed triangles using the attached `u32` index buffer.
    Indexed { index_count: u32 },
}

/// Framebuffer region a frame renders into, in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A zero-area viewport (minimised window) cannot be drawn into.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

// ============================================================================
// Backend Trait
// ============================================================================

/// Operations the renderer needs from a graphics device.
///
/// Compile and link report failures as the driver's message string; the
/// caller decides whether that is fatal. Deleting a handle that is no longer
/// live is a no-op returning `false`.
pub trait GpuBackend {
    fn create_vertex_array(&mut self) -> VertexArrayHandle;
    fn create_buffer(&mut self, usage: BufferUsage, contents: &[u8]) -> BufferHandle;
    fn attach_vertex_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle);
    fn attach_index_buffer(&mut self, vertex_array: VertexArrayHandle, buffer: BufferHandle);

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
        label: &str,
    ) -> Result<ShaderHandle, String>;
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
        label: &str,
    ) -> Result<ProgramHandle, String>;

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;
    fn set_uniform(&mut self, program: ProgramHandle, location: UniformLocation, value: UniformValue);

    /// Queue a draw into the frame opened by [`GpuBackend::begin_frame`].
    fn draw(&mut self, program: ProgramHandle, vertex_array: VertexArrayHandle, call: DrawCall);

    fn delete_vertex_array(&mut self, handle: VertexArrayHandle) -> bool;
    fn delete_buffer(&mut self, handle: BufferHandle) -> bool;
    fn delete_shader(&mut self, handle: ShaderHandle) -> bool;
    fn delete_program(&mut self, handle: ProgramHandle) -> bool;

    fn is_live(&self, resource: ResourceId) -> bool;

    /// Current drawable size in physical pixels.
    fn framebuffer_size(&self) -> Viewport;

    /// Start a frame that clears colour and depth. Returns `false` when no
    /// frame could be started; the caller must then skip drawing and must
    /// not call [`GpuBackend::end_frame`].
    fn begin_frame(&mut self, viewport: Viewport, clear_colour: [f32; 4]) -> bool;

    /// Submit queued draws and present.
    fn end_frame(&mut self);
}
