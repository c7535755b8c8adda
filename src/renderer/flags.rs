//! Boolean feature toggles and the active-object selection

/// Which of the two resident objects is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActiveObject {
    #[default]
    Primary,
    Secondary,
}

impl ActiveObject {
    /// The other object.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            ActiveObject::Primary => ActiveObject::Secondary,
            ActiveObject::Secondary => ActiveObject::Primary,
        }
    }
}

/// Per-frame shading switches plus the object selection. All start off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Add the specular term of the point light
    pub specular: bool,
    /// Add the directional light's diffuse term
    pub directional: bool,
    pub active: ActiveObject,
}

impl FeatureFlags {
    pub fn toggle_specular(&mut self) {
        self.specular = !self.specular;
    }

    pub fn toggle_directional(&mut self) {
        self.directional = !self.directional;
    }

    pub fn toggle_active_object(&mut self) {
        self.active = self.active.toggled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_start_off() {
        let flags = FeatureFlags::default();
        assert!(!flags.specular);
        assert!(!flags.directional);
        assert_eq!(flags.active, ActiveObject::Primary);
    }

    #[test]
    fn test_toggles_flip_back_and_forth() {
        let mut flags = FeatureFlags::default();

        flags.toggle_specular();
        flags.toggle_active_object();
        assert!(flags.specular);
        assert_eq!(flags.active, ActiveObject::Secondary);

        flags.toggle_specular();
        flags.toggle_active_object();
        assert!(!flags.specular);
        assert_eq!(flags.active, ActiveObject::Primary);
        assert!(!flags.directional);
    }
}
