//! WGSL front-end and uniform-block reflection
//!
//! Shader stages are parsed and validated with naga. The single uniform
//! block at `@group(0) @binding(0)` is reflected into a name → location
//! table, which is what "resolving uniform locations" means for this
//! renderer. A location is a byte offset plus the member's type.

use glam::{Mat4, Vec3, Vec4};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use rustc_hash::FxHashMap;

use super::ShaderStage;

/// Bind group slot of the uniform block.
pub const UNIFORM_GROUP: u32 = 0;
/// Binding slot of the uniform block.
pub const UNIFORM_BINDING: u32 = 0;

// ============================================================================
// Uniform Types
// ============================================================================

/// Host-shareable member types a uniform block may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    F32,
    I32,
    U32,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    /// Number of bytes written for a value of this type.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            UniformType::F32 | UniformType::I32 | UniformType::U32 => 4,
            UniformType::Vec3 => 12,
            UniformType::Vec4 => 16,
            UniformType::Mat4 => 64,
        }
    }
}

/// A resolved uniform: where it lives in the block and what it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub offset: u32,
    pub ty: UniformType,
}

/// A value to be written to a uniform location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    U32(u32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

impl UniformValue {
    /// Type tag of this value.
    #[must_use]
    pub const fn ty(&self) -> UniformType {
        match self {
            UniformValue::F32(_) => UniformType::F32,
            UniformValue::I32(_) => UniformType::I32,
            UniformValue::U32(_) => UniformType::U32,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Booleans are stored as `u32` because WGSL uniform blocks cannot hold `bool`.
    #[must_use]
    pub const fn flag(enabled: bool) -> Self {
        UniformValue::U32(enabled as u32)
    }

    /// Write the value into `staging` at `location`.
    ///
    /// Returns `false` without writing when the type does not match the
    /// location or the write would overrun the block.
    pub fn write_to(&self, location: UniformLocation, staging: &mut [u8]) -> bool {
        if self.ty() != location.ty {
            return false;
        }

        let start = location.offset as usize;
        let end = start + location.ty.size();
        let Some(dst) = staging.get_mut(start..end) else {
            return false;
        };

        match self {
            UniformValue::F32(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::I32(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::U32(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat4(v) => dst.copy_from_slice(bytemuck::cast_slice(&v.to_cols_array())),
        }
        true
    }
}

// ============================================================================
// Uniform Block
// ============================================================================

/// Reflected layout of a program's uniform block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformBlock {
    /// Size in bytes, rounded up to a multiple of 16.
    pub size: u32,
    pub members: FxHashMap<String, UniformLocation>,
}

impl UniformBlock {
    /// Look up a member by name.
    #[must_use]
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.members.get(name).copied()
    }

    /// Zero-filled staging storage for this block.
    #[must_use]
    pub fn staging(&self) -> Vec<u8> {
        vec![0; self.size as usize]
    }

    /// Combine the blocks two stages declare.
    ///
    /// Both stages bind the same buffer, so a member present in both must
    /// agree on offset and type.
    pub fn merge(
        vertex: Option<UniformBlock>,
        fragment: Option<UniformBlock>,
    ) -> Result<Option<UniformBlock>, String> {
        match (vertex, fragment) {
            (None, None) => Ok(None),
            (Some(block), None) | (None, Some(block)) => Ok(Some(block)),
            (Some(mut merged), Some(other)) => {
                for (name, location) in other.members {
                    match merged.members.get(&name) {
                        Some(existing) if *existing != location => {
                            return Err(format!(
                                "uniform `{name}` has different layouts in the vertex and fragment stages"
                            ));
                        }
                        Some(_) => {}
                        None => {
                            merged.members.insert(name, location);
                        }
                    }
                }
                merged.size = merged.size.max(other.size);
                Ok(Some(merged))
            }
        }
    }
}

// ============================================================================
// Stage Reflection
// ============================================================================

/// A parsed and validated shader stage.
#[derive(Debug)]
pub struct StageModule {
    pub stage: ShaderStage,
    pub module: naga::Module,
    pub entry_point: String,
    pub uniforms: Option<UniformBlock>,
}

/// Parse, validate and reflect one WGSL stage.
pub fn parse_stage(stage: ShaderStage, source: &str) -> Result<StageModule, String> {
    let module =
        naga::front::wgsl::parse_str(source).map_err(|err| err.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| format!("validation failed: {err}"))?;

    let wanted = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| format!("no @{stage} entry point"))?;

    let uniforms = reflect_uniform_block(&module)?;

    Ok(StageModule {
        stage,
        module,
        entry_point,
        uniforms,
    })
}

fn reflect_uniform_block(module: &naga::Module) -> Result<Option<UniformBlock>, String> {
    let Some((_, global)) = module.global_variables.iter().find(|(_, var)| {
        var.space == naga::AddressSpace::Uniform
            && var.binding
                == Some(naga::ResourceBinding {
                    group: UNIFORM_GROUP,
                    binding: UNIFORM_BINDING,
                })
    }) else {
        return Ok(None);
    };

    let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner else {
        return Err("uniform block must be a struct".to_string());
    };

    let mut block = UniformBlock {
        size: span.next_multiple_of(16),
        members: FxHashMap::default(),
    };

    for member in members {
        let Some(name) = &member.name else {
            continue;
        };
        let ty = member_type(&module.types[member.ty].inner)
            .ok_or_else(|| format!("uniform `{name}` has an unsupported type"))?;
        block.members.insert(
            name.clone(),
            UniformLocation {
                offset: member.offset,
                ty,
            },
        );
    }

    Ok(Some(block))
}

fn member_type(inner: &naga::TypeInner) -> Option<UniformType> {
    use naga::{ScalarKind, TypeInner, VectorSize};

    match *inner {
        TypeInner::Scalar(scalar) if scalar.width == 4 => match scalar.kind {
            ScalarKind::Float => Some(UniformType::F32),
            ScalarKind::Sint => Some(UniformType::I32),
            ScalarKind::Uint => Some(UniformType::U32),
            _ => None,
        },
        TypeInner::Vector { size, scalar }
            if scalar.kind == ScalarKind::Float && scalar.width == 4 =>
        {
            match size {
                VectorSize::Tri => Some(UniformType::Vec3),
                VectorSize::Quad => Some(UniformType::Vec4),
                VectorSize::Bi => None,
            }
        }
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.kind == ScalarKind::Float && scalar.width == 4 => Some(UniformType::Mat4),
        _ => None,
    }
}
