//! The two resident objects and which one is drawn

use super::config::RendererConfig;
use crate::core::Result;
use crate::gpu::GpuBackend;
use crate::renderer::flags::ActiveObject;
use crate::renderer::object::RenderableObject;
use crate::renderer::shader::{ReloadOutcome, ShaderPaths};

/// Two objects that both stay uploaded while only one is drawn per frame.
#[derive(Debug)]
pub struct Stage {
    primary: RenderableObject,
    secondary: RenderableObject,
    active: ActiveObject,
}

impl Stage {
    #[must_use]
    pub fn new(primary: RenderableObject, secondary: RenderableObject) -> Self {
        Self {
            primary,
            secondary,
            active: ActiveObject::Primary,
        }
    }

    /// Create both configured objects and make them resident.
    ///
    /// Anything allocated before a failure is released again.
    pub fn from_config(gpu: &mut dyn GpuBackend, config: &RendererConfig) -> Result<Self> {
        let primary = RenderableObject::from_spec(&config.scene.primary)?;
        let secondary = RenderableObject::from_spec(&config.scene.secondary)?;
        let mut stage = Self::new(primary, secondary);

        let paths = ShaderPaths::from_config(&config.shaders);
        if let Err(err) = stage.initialize(gpu, &paths) {
            stage.release(gpu);
            return Err(err);
        }
        Ok(stage)
    }

    /// Build shaders and upload geometry for both objects.
    ///
    /// On failure the objects may hold partial resources; the caller is
    /// expected to `release` the stage.
    pub fn initialize(&mut self, gpu: &mut dyn GpuBackend, paths: &ShaderPaths) -> Result<()> {
        for object in [&mut self.primary, &mut self.secondary] {
            object.initialize_shaders(gpu, paths)?;
            object.upload_geometry(gpu);
        }
        self.apply_selection();
        Ok(())
    }

    /// Switch the drawn object. The other one stays resident.
    pub fn select(&mut self, active: ActiveObject) {
        if self.active != active {
            log::info!(
                "Switching to {} ({active:?})",
                self.get(active).name()
            );
        }
        self.active = active;
        self.apply_selection();
    }

    fn apply_selection(&mut self) {
        if self.primary.is_uploaded() {
            self.primary.set_active(self.active == ActiveObject::Primary);
        }
        if self.secondary.is_uploaded() {
            self.secondary.set_active(self.active == ActiveObject::Secondary);
        }
    }

    #[must_use]
    pub fn selection(&self) -> ActiveObject {
        self.active
    }

    #[must_use]
    pub fn get(&self, which: ActiveObject) -> &RenderableObject {
        match which {
            ActiveObject::Primary => &self.primary,
            ActiveObject::Secondary => &self.secondary,
        }
    }

    #[must_use]
    pub fn active(&self) -> &RenderableObject {
        self.get(self.active)
    }

    pub fn active_mut(&mut self) -> &mut RenderableObject {
        match self.active {
            ActiveObject::Primary => &mut self.primary,
            ActiveObject::Secondary => &mut self.secondary,
        }
    }

    /// Reload the drawn object's shaders if their sources changed.
    pub fn reload_active(&mut self, gpu: &mut dyn GpuBackend) -> ReloadOutcome {
        self.active_mut().check_and_reload_shaders(gpu)
    }

    /// Release both objects.
    pub fn release(self, gpu: &mut dyn GpuBackend) {
        self.primary.release(gpu);
        self.secondary.release(gpu);
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use glam::Vec3;

    use super::*;
    use crate::gpu::recording::RecordingBackend;
    use crate::renderer::object::Residency;

    fn paths() -> ShaderPaths {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        ShaderPaths::new(dir.join("object.vert.wgsl"), dir.join("object.frag.wgsl"))
    }

    fn stage() -> Stage {
        Stage::new(
            RenderableObject::cube(1.0, Vec3::X),
            RenderableObject::triangle(Vec3::Y),
        )
    }

    #[test]
    fn test_both_resident_one_active() {
        let mut gpu = RecordingBackend::new();
        let mut stage = stage();
        stage.initialize(&mut gpu, &paths()).unwrap();

        assert_eq!(stage.get(ActiveObject::Primary).residency(), Residency::Active);
        assert_eq!(
            stage.get(ActiveObject::Secondary).residency(),
            Residency::InactiveResident
        );

        stage.select(ActiveObject::Secondary);
        assert_eq!(stage.active().name(), "triangle");
        assert_eq!(
            stage.get(ActiveObject::Primary).residency(),
            Residency::InactiveResident
        );

        stage.release(&mut gpu);
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn test_failed_initialize_releases_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let vert = dir.path().join("bad.vert.wgsl");
        std::fs::write(&vert, "this is not wgsl").unwrap();
        let bad = ShaderPaths::new(vert, paths().fragment);

        let mut gpu = RecordingBackend::new();
        let mut stage = stage();
        assert!(stage.initialize(&mut gpu, &bad).is_err());

        stage.release(&mut gpu);
        assert_eq!(gpu.live_count(), 0);
    }
}
