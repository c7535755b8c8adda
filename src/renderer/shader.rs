//! Shader sources, program linking and hot reload
//!
//! A [`ShaderSource`] is one stage's text after `#include` expansion, plus
//! the modification time of every file that went into it. A
//! [`ShaderProgram`] owns the compiled stages and the linked program and can
//! relink itself in place when any of those files change on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::core::config::ShaderConfig;
use crate::core::{Error, Result};
use crate::gpu::{
    GpuBackend, ProgramHandle, ShaderHandle, ShaderStage, UniformLocation, UniformValue,
};

const INCLUDE_DIRECTIVE: &str = "#include";

// ============================================================================
// Paths
// ============================================================================

/// Files a program is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    /// Searched after the including file's own directory
    pub include_dirs: Vec<PathBuf>,
}

impl ShaderPaths {
    #[must_use]
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            include_dirs: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_config(config: &ShaderConfig) -> Self {
        Self {
            vertex: config.vertex_path(),
            fragment: config.fragment_path(),
            include_dirs: config.include_dirs.clone(),
        }
    }
}

// ============================================================================
// Shader Source
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct FileStamp {
    path: PathBuf,
    canonical: PathBuf,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn read(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            canonical: fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()),
            modified: modified_time(path),
        }
    }

    fn is_stale(&self) -> bool {
        modified_time(&self.path) != self.modified
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// One stage's preprocessed source text.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    stage: ShaderStage,
    path: PathBuf,
    text: String,
    stamps: Vec<FileStamp>,
}

impl ShaderSource {
    /// Read `path` and expand its `#include "file"` lines.
    ///
    /// Includes are looked up next to the including file first, then in
    /// `include_dirs`. Each file is expanded at most once, so shared headers
    /// and include cycles are harmless.
    pub fn load(stage: ShaderStage, path: &Path, include_dirs: &[PathBuf]) -> Result<Self> {
        let mut source = Self {
            stage,
            path: path.to_path_buf(),
            text: String::new(),
            stamps: Vec::new(),
        };
        source.expand(path, include_dirs)?;
        Ok(source)
    }

    fn expand(&mut self, path: &Path, include_dirs: &[PathBuf]) -> Result<()> {
        let stamp = FileStamp::read(path);
        if self.stamps.iter().any(|s| s.canonical == stamp.canonical) {
            return Ok(());
        }
        self.stamps.push(stamp);

        let text = fs::read_to_string(path)
            .map_err(|err| self.error(format!("cannot read {}: {err}", path.display())))?;

        for line in text.lines() {
            match include_target(line) {
                None => {
                    self.text.push_str(line);
                    self.text.push('\n');
                }
                Some(Err(message)) => return Err(self.error(message)),
                Some(Ok(name)) => {
                    let resolved = resolve_include(name, path.parent(), include_dirs)
                        .ok_or_else(|| self.error(format!("cannot resolve include \"{name}\"")))?;
                    self.expand(&resolved, include_dirs)?;
                }
            }
        }
        Ok(())
    }

    fn error(&self, message: String) -> Error {
        Error::ShaderCompile {
            stage: self.stage,
            path: self.path.clone(),
            message,
        }
    }

    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Source text with includes expanded.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Every file read to produce this source, the stage file first.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.stamps.iter().map(|s| s.path.as_path())
    }

    /// True when any contributing file changed, vanished or reappeared.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.stamps.iter().any(FileStamp::is_stale)
    }

    /// Record the current modification times without reloading.
    pub fn refresh_stamps(&mut self) {
        for stamp in &mut self.stamps {
            stamp.modified = modified_time(&stamp.path);
        }
    }
}

fn include_target(line: &str) -> Option<std::result::Result<&str, String>> {
    let rest = line.trim().strip_prefix(INCLUDE_DIRECTIVE)?;
    let name = rest
        .trim()
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .filter(|name| !name.is_empty());
    Some(name.ok_or_else(|| format!("malformed include directive: {}", line.trim())))
}

fn resolve_include(name: &str, parent: Option<&Path>, include_dirs: &[PathBuf]) -> Option<PathBuf> {
    parent
        .into_iter()
        .chain(include_dirs.iter().map(PathBuf::as_path))
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// Shader Program
// ============================================================================

/// Result of a reload check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// No source file changed.
    Unchanged,
    /// Changed stages were recompiled and the program relinked.
    Reloaded,
    /// The new sources did not build; the previous program stays in use.
    Failed(String),
}

/// A linked vertex + fragment program with resolved uniform locations.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    vertex: ShaderSource,
    fragment: ShaderSource,
    include_dirs: Vec<PathBuf>,
    vertex_shader: ShaderHandle,
    fragment_shader: ShaderHandle,
    program: ProgramHandle,
    uniform_names: &'static [&'static str],
    uniforms: FxHashMap<&'static str, UniformLocation>,
}

impl ShaderProgram {
    /// Read, compile and link both stages, then resolve `uniform_names`.
    ///
    /// Nothing stays allocated on the backend when this fails.
    pub fn build(
        gpu: &mut dyn GpuBackend,
        paths: &ShaderPaths,
        uniform_names: &'static [&'static str],
    ) -> Result<Self> {
        let vertex = ShaderSource::load(ShaderStage::Vertex, &paths.vertex, &paths.include_dirs)?;
        let fragment =
            ShaderSource::load(ShaderStage::Fragment, &paths.fragment, &paths.include_dirs)?;
        let label = program_label(&paths.vertex);

        let vertex_shader = compile_stage(gpu, &vertex)?;
        let fragment_shader = match compile_stage(gpu, &fragment) {
            Ok(handle) => handle,
            Err(err) => {
                gpu.delete_shader(vertex_shader);
                return Err(err);
            }
        };
        let program = match link(gpu, vertex_shader, fragment_shader, &label) {
            Ok(handle) => handle,
            Err(err) => {
                gpu.delete_shader(vertex_shader);
                gpu.delete_shader(fragment_shader);
                return Err(err);
            }
        };

        let mut shader_program = Self {
            label,
            vertex,
            fragment,
            include_dirs: paths.include_dirs.clone(),
            vertex_shader,
            fragment_shader,
            program,
            uniform_names,
            uniforms: FxHashMap::default(),
        };
        shader_program.resolve_uniforms(gpu);

        log::info!("Built shader program {}", shader_program.label);
        Ok(shader_program)
    }

    fn resolve_uniforms(&mut self, gpu: &dyn GpuBackend) {
        self.uniforms.clear();
        for &name in self.uniform_names {
            match gpu.uniform_location(self.program, name) {
                Some(location) => {
                    self.uniforms.insert(name, location);
                }
                None => log::debug!("Program {} does not declare `{name}`", self.label),
            }
        }
    }

    /// Recompile and relink if any source file changed since the last load.
    ///
    /// On failure the previous program stays bound and the error is logged.
    /// The failing files' timestamps are still recorded, so the next attempt
    /// happens after the next edit rather than every frame.
    pub fn reload_if_changed(&mut self, gpu: &mut dyn GpuBackend) -> ReloadOutcome {
        let vertex_stale = self.vertex.is_stale();
        let fragment_stale = self.fragment.is_stale();
        if !vertex_stale && !fragment_stale {
            return ReloadOutcome::Unchanged;
        }

        match self.rebuild(gpu, vertex_stale, fragment_stale) {
            Ok(()) => {
                log::info!("Reloaded shader program {}", self.label);
                ReloadOutcome::Reloaded
            }
            Err(err) => {
                if vertex_stale {
                    self.vertex.refresh_stamps();
                }
                if fragment_stale {
                    self.fragment.refresh_stamps();
                }
                log::error!("Shader reload failed, keeping previous program: {err}");
                ReloadOutcome::Failed(err.to_string())
            }
        }
    }

    fn rebuild(
        &mut self,
        gpu: &mut dyn GpuBackend,
        vertex_stale: bool,
        fragment_stale: bool,
    ) -> Result<()> {
        let new_vertex = if vertex_stale {
            Some(ShaderSource::load(
                ShaderStage::Vertex,
                self.vertex.path(),
                &self.include_dirs,
            )?)
        } else {
            None
        };
        let new_fragment = if fragment_stale {
            Some(ShaderSource::load(
                ShaderStage::Fragment,
                self.fragment.path(),
                &self.include_dirs,
            )?)
        } else {
            None
        };

        let vertex_shader = match &new_vertex {
            Some(source) => Some(compile_stage(gpu, source)?),
            None => None,
        };
        let fragment_shader = match &new_fragment {
            Some(source) => match compile_stage(gpu, source) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    if let Some(handle) = vertex_shader {
                        gpu.delete_shader(handle);
                    }
                    return Err(err);
                }
            },
            None => None,
        };

        let program = link(
            gpu,
            vertex_shader.unwrap_or(self.vertex_shader),
            fragment_shader.unwrap_or(self.fragment_shader),
            &self.label,
        );
        let program = match program {
            Ok(handle) => handle,
            Err(err) => {
                for handle in vertex_shader.into_iter().chain(fragment_shader) {
                    gpu.delete_shader(handle);
                }
                return Err(err);
            }
        };

        gpu.delete_program(self.program);
        self.program = program;
        if let Some(handle) = vertex_shader {
            gpu.delete_shader(self.vertex_shader);
            self.vertex_shader = handle;
        }
        if let Some(handle) = fragment_shader {
            gpu.delete_shader(self.fragment_shader);
            self.fragment_shader = handle;
        }
        if let Some(source) = new_vertex {
            self.vertex = source;
        }
        if let Some(source) = new_fragment {
            self.fragment = source;
        }

        self.resolve_uniforms(gpu);
        Ok(())
    }

    /// Write a uniform if this program declares it.
    pub fn set(&self, gpu: &mut dyn GpuBackend, name: &str, value: UniformValue) {
        if let Some(location) = self.uniforms.get(name) {
            gpu.set_uniform(self.program, *location, value);
        }
    }

    /// Resolved location of a uniform.
    #[must_use]
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    #[must_use]
    pub fn handle(&self) -> ProgramHandle {
        self.program
    }

    #[must_use]
    pub fn stage_handles(&self) -> (ShaderHandle, ShaderHandle) {
        (self.vertex_shader, self.fragment_shader)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Delete the program and both stages.
    pub fn release(self, gpu: &mut dyn GpuBackend) {
        gpu.delete_program(self.program);
        gpu.delete_shader(self.vertex_shader);
        gpu.delete_shader(self.fragment_shader);
    }
}

fn program_label(vertex: &Path) -> String {
    vertex
        .file_name()
        .map_or_else(|| "shader".to_string(), |name| name.to_string_lossy().into_owned())
}

fn compile_stage(gpu: &mut dyn GpuBackend, source: &ShaderSource) -> Result<ShaderHandle> {
    let label = source.path().display().to_string();
    gpu.compile_shader(source.stage(), source.text(), &label)
        .map_err(|message| source.error(message))
}

fn link(
    gpu: &mut dyn GpuBackend,
    vertex: ShaderHandle,
    fragment: ShaderHandle,
    label: &str,
) -> Result<ProgramHandle> {
    gpu.link_program(vertex, fragment, label)
        .map_err(|message| Error::ShaderLink { message })
}
