//! Renderable objects and their GPU resource lifecycle
//!
//! An object moves through `initialize_shaders` → `upload_geometry` →
//! `render`* → `release`. The three kinds differ only in their CPU-side
//! geometry; the GPU bookkeeping is shared.

use glam::{Mat4, Vec3};

use super::camera::Camera;
use super::flags::FeatureFlags;
use super::lights::LightingEnvironment;
use super::shader::{ReloadOutcome, ShaderPaths, ShaderProgram};
use super::vertex::{self, Vertex};
use crate::assets::{self, MeshData};
use crate::core::Result;
use crate::core::config::ObjectSpec;
use crate::gpu::{
    BufferHandle, BufferUsage, DrawCall, GpuBackend, ResourceId, UniformValue, VertexArrayHandle,
    Viewport,
};

/// Uniforms every object writes each frame.
pub const OBJECT_UNIFORMS: &[&str] = &[
    "model",
    "view",
    "proj",
    "colour",
    "ambient",
    "point_light_pos",
    "point_light_col",
    "directional_dir",
    "directional_col",
    "camera_pos",
    "specular_flag",
    "directional_flag",
];

/// The closed set of object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    ProceduralCube,
    ImportedMesh,
    BasicTriangle,
}

/// CPU-side geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Drawn straight from the vertex list.
    Arrays(Vec<Vertex>),
    /// Drawn through a `u32` index list.
    Indexed {
        vertices: Vec<Vertex>,
        indices: Vec<u32>,
    },
}

impl Geometry {
    fn draw_call(&self) -> DrawCall {
        match self {
            Geometry::Arrays(vertices) => DrawCall::Arrays {
                vertex_count: vertices.len() as u32,
            },
            Geometry::Indexed { indices, .. } => DrawCall::Indexed {
                index_count: indices.len() as u32,
            },
        }
    }

    fn vertices(&self) -> &[Vertex] {
        match self {
            Geometry::Arrays(vertices) | Geometry::Indexed { vertices, .. } => vertices,
        }
    }
}

/// Where an object's GPU data stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Residency {
    /// Geometry has not been uploaded.
    NotUploaded,
    /// Uploaded and drawn each frame.
    Active,
    /// Uploaded and kept on the GPU, but not drawn.
    InactiveResident,
}

#[derive(Debug, Clone, Copy)]
struct GeometryBuffers {
    vertex_array: VertexArrayHandle,
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    draw: DrawCall,
}

/// Per-frame inputs to [`RenderableObject::render`].
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub camera: &'a Camera,
    pub lighting: &'a LightingEnvironment,
    pub flags: FeatureFlags,
    pub viewport: Viewport,
}

/// A drawable object that owns its program and geometry buffers.
#[derive(Debug)]
pub struct RenderableObject {
    name: String,
    kind: ObjectKind,
    geometry: Geometry,
    colour: Vec3,
    transform: Mat4,
    program: Option<ShaderProgram>,
    buffers: Option<GeometryBuffers>,
    active: bool,
}

impl RenderableObject {
    fn with_geometry(name: impl Into<String>, kind: ObjectKind, geometry: Geometry, colour: Vec3) -> Self {
        Self {
            name: name.into(),
            kind,
            geometry,
            colour,
            transform: Mat4::IDENTITY,
            program: None,
            buffers: None,
            active: false,
        }
    }

    /// Cube spanning `-half_extent..=half_extent` on every axis.
    #[must_use]
    pub fn cube(half_extent: f32, colour: Vec3) -> Self {
        Self::with_geometry(
            "cube",
            ObjectKind::ProceduralCube,
            Geometry::Arrays(vertex::cube_vertices(half_extent)),
            colour,
        )
    }

    /// Indexed mesh from loaded data.
    #[must_use]
    pub fn mesh(name: impl Into<String>, data: MeshData, colour: Vec3) -> Self {
        Self::with_geometry(
            name,
            ObjectKind::ImportedMesh,
            Geometry::Indexed {
                vertices: data.vertices,
                indices: data.indices,
            },
            colour,
        )
    }

    /// Single flat triangle.
    #[must_use]
    pub fn triangle(colour: Vec3) -> Self {
        Self::with_geometry(
            "triangle",
            ObjectKind::BasicTriangle,
            Geometry::Arrays(vertex::triangle_vertices()),
            colour,
        )
    }

    /// Build an object from its configuration, loading mesh files from disk.
    pub fn from_spec(spec: &ObjectSpec) -> Result<Self> {
        Ok(match spec {
            ObjectSpec::Cube {
                half_extent,
                colour,
            } => Self::cube(*half_extent, *colour),
            ObjectSpec::Mesh { path, colour } => {
                let data = assets::load_mesh(path)?;
                let name = path
                    .file_stem()
                    .map_or_else(|| "mesh".to_string(), |s| s.to_string_lossy().into_owned());
                Self::mesh(name, data, *colour)
            }
            ObjectSpec::Triangle { colour } => Self::triangle(*colour),
        })
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Compile and link this object's program.
    ///
    /// # Panics
    ///
    /// If the object already has a program.
    pub fn initialize_shaders(&mut self, gpu: &mut dyn GpuBackend, paths: &ShaderPaths) -> Result<()> {
        assert!(
            self.program.is_none(),
            "initialize_shaders called twice on `{}`",
            self.name
        );
        self.program = Some(ShaderProgram::build(gpu, paths, OBJECT_UNIFORMS)?);
        Ok(())
    }

    /// Create the vertex array and buffers and copy the geometry into them.
    ///
    /// # Panics
    ///
    /// If the geometry is already uploaded.
    pub fn upload_geometry(&mut self, gpu: &mut dyn GpuBackend) {
        assert!(
            self.buffers.is_none(),
            "upload_geometry called twice on `{}`",
            self.name
        );

        let vertex_array = gpu.create_vertex_array();
        let vertex_buffer = gpu.create_buffer(
            BufferUsage::Vertex,
            bytemuck::cast_slice(self.geometry.vertices()),
        );
        gpu.attach_vertex_buffer(vertex_array, vertex_buffer);

        let index_buffer = match &self.geometry {
            Geometry::Indexed { indices, .. } => {
                let buffer = gpu.create_buffer(BufferUsage::Index, bytemuck::cast_slice(indices));
                gpu.attach_index_buffer(vertex_array, buffer);
                Some(buffer)
            }
            Geometry::Arrays(_) => None,
        };

        self.buffers = Some(GeometryBuffers {
            vertex_array,
            vertex_buffer,
            index_buffer,
            draw: self.geometry.draw_call(),
        });
        self.active = true;

        log::info!(
            "Uploaded {} ({} vertices)",
            self.name,
            self.geometry.vertices().len()
        );
    }

    /// Relink the program if its sources changed. Geometry is untouched.
    pub fn check_and_reload_shaders(&mut self, gpu: &mut dyn GpuBackend) -> ReloadOutcome {
        match &mut self.program {
            Some(program) => program.reload_if_changed(gpu),
            None => ReloadOutcome::Unchanged,
        }
    }

    /// Write every uniform and queue one draw.
    ///
    /// # Panics
    ///
    /// If called before `upload_geometry` or `initialize_shaders`.
    pub fn render(&self, gpu: &mut dyn GpuBackend, frame: &FrameContext<'_>) {
        let Some(buffers) = &self.buffers else {
            panic!("render called on `{}` before upload_geometry", self.name);
        };
        let Some(program) = &self.program else {
            panic!("render called on `{}` before initialize_shaders", self.name);
        };

        let lighting = frame.lighting;
        let uniforms = [
            ("model", UniformValue::Mat4(self.transform)),
            ("view", UniformValue::Mat4(frame.camera.view_matrix())),
            (
                "proj",
                UniformValue::Mat4(frame.camera.projection_matrix(frame.viewport)),
            ),
            ("colour", UniformValue::Vec3(self.colour)),
            ("ambient", UniformValue::Vec3(lighting.ambient_colour())),
            ("point_light_pos", UniformValue::Vec3(lighting.point_position())),
            ("point_light_col", UniformValue::Vec3(lighting.point_colour())),
            (
                "directional_dir",
                UniformValue::Vec3(lighting.directional_direction()),
            ),
            (
                "directional_col",
                UniformValue::Vec3(lighting.directional_colour()),
            ),
            ("camera_pos", UniformValue::Vec3(frame.camera.eye)),
            ("specular_flag", UniformValue::flag(frame.flags.specular)),
            ("directional_flag", UniformValue::flag(frame.flags.directional)),
        ];
        for (name, value) in uniforms {
            program.set(gpu, name, value);
        }

        gpu.draw(program.handle(), buffers.vertex_array, buffers.draw);
    }

    /// Delete every GPU resource this object owns.
    pub fn release(mut self, gpu: &mut dyn GpuBackend) {
        if let Some(program) = self.program.take() {
            program.release(gpu);
        }
        if let Some(buffers) = self.buffers.take() {
            gpu.delete_vertex_array(buffers.vertex_array);
            gpu.delete_buffer(buffers.vertex_buffer);
            if let Some(index_buffer) = buffers.index_buffer {
                gpu.delete_buffer(index_buffer);
            }
        }
        log::debug!("Released {}", self.name);
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Mark an uploaded object as drawn or merely resident.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[must_use]
    pub fn residency(&self) -> Residency {
        match (self.buffers.is_some(), self.active) {
            (false, _) => Residency::NotUploaded,
            (true, true) => Residency::Active,
            (true, false) => Residency::InactiveResident,
        }
    }

    #[must_use]
    pub fn is_uploaded(&self) -> bool {
        self.buffers.is_some()
    }

    #[must_use]
    pub fn has_program(&self) -> bool {
        self.program.is_some()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn colour(&self) -> Vec3 {
        self.colour
    }

    /// Handles this object currently owns.
    #[must_use]
    pub fn resources(&self) -> Vec<ResourceId> {
        let mut ids = Vec::new();
        if let Some(program) = &self.program {
            let (vs, fs) = program.stage_handles();
            ids.extend([
                ResourceId::Program(program.handle()),
                ResourceId::Shader(vs),
                ResourceId::Shader(fs),
            ]);
        }
        if let Some(buffers) = &self.buffers {
            ids.push(ResourceId::VertexArray(buffers.vertex_array));
            ids.push(ResourceId::Buffer(buffers.vertex_buffer));
            ids.extend(buffers.index_buffer.map(ResourceId::Buffer));
        }
        ids
    }
}

impl Drop for RenderableObject {
    fn drop(&mut self) {
        if self.program.is_some() || self.buffers.is_some() {
            log::warn!("`{}` dropped without release, GPU resources leaked", self.name);
        }
    }
}
