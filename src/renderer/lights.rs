//! Light types and the scene's lighting environment
//!
//! Every light has a colour and a scalar radiance. The shaded contribution
//! of a light is `colour * radiance`, queried through [`Light::radiance_colour`]
//! and recomputed on every call.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Common query shared by all light types.
pub trait Light {
    /// Base colour of the light.
    fn colour(&self) -> Vec3;

    /// Scalar intensity applied to the colour.
    fn radiance(&self) -> f32;

    /// Radiance-weighted colour, `colour * radiance`.
    fn radiance_colour(&self) -> Vec3 {
        self.colour() * self.radiance()
    }
}

/// Uniform light applied to every surface regardless of orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub colour: Vec3,
    pub radiance: f32,
}

impl AmbientLight {
    #[must_use]
    pub fn new(colour: Vec3, radiance: f32) -> Self {
        Self { colour, radiance }
    }
}

impl Light for AmbientLight {
    fn colour(&self) -> Vec3 {
        self.colour
    }

    fn radiance(&self) -> f32 {
        self.radiance
    }
}

/// Light emitted from a point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    /// World position
    pub position: Vec3,
    pub colour: Vec3,
    pub radiance: f32,
}

impl PointLight {
    /// Create a new point light
    #[must_use]
    pub fn new(position: Vec3, colour: Vec3, radiance: f32) -> Self {
        Self {
            position,
            colour,
            radiance,
        }
    }
}

impl Light for PointLight {
    fn colour(&self) -> Vec3 {
        self.colour
    }

    fn radiance(&self) -> f32 {
        self.radiance
    }
}

/// Parallel light travelling along `direction` (like the sun).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Direction the light travels in. Normalised by the shader.
    pub direction: Vec3,
    pub colour: Vec3,
    pub radiance: f32,
}

impl DirectionalLight {
    #[must_use]
    pub fn new(direction: Vec3, colour: Vec3, radiance: f32) -> Self {
        Self {
            direction,
            colour,
            radiance,
        }
    }
}

impl Light for DirectionalLight {
    fn colour(&self) -> Vec3 {
        self.colour
    }

    fn radiance(&self) -> f32 {
        self.radiance
    }
}

/// The lights a frame is shaded with.
///
/// Ambient light is always present; the point and directional lights are
/// optional and contribute nothing when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingEnvironment {
    pub ambient: AmbientLight,
    pub point: Option<PointLight>,
    pub directional: Option<DirectionalLight>,
}

impl LightingEnvironment {
    /// Radiance-weighted ambient colour.
    #[must_use]
    pub fn ambient_colour(&self) -> Vec3 {
        self.ambient.radiance_colour()
    }

    /// Radiance-weighted point light colour, zero when there is no point light.
    #[must_use]
    pub fn point_colour(&self) -> Vec3 {
        self.point.as_ref().map_or(Vec3::ZERO, Light::radiance_colour)
    }

    /// Point light position, origin when there is no point light.
    #[must_use]
    pub fn point_position(&self) -> Vec3 {
        self.point.map_or(Vec3::ZERO, |light| light.position)
    }

    /// Radiance-weighted directional colour, zero when there is no directional light.
    #[must_use]
    pub fn directional_colour(&self) -> Vec3 {
        self.directional
            .as_ref()
            .map_or(Vec3::ZERO, Light::radiance_colour)
    }

    /// Unit direction of the directional light.
    ///
    /// Straight down when there is no directional light or its direction has
    /// no length, so shaders never normalise a zero vector.
    #[must_use]
    pub fn directional_direction(&self) -> Vec3 {
        self.directional
            .and_then(|light| light.direction.try_normalize())
            .unwrap_or(Vec3::NEG_Y)
    }
}

impl Default for LightingEnvironment {
    fn default() -> Self {
        Self {
            ambient: AmbientLight::new(Vec3::ONE, 0.1),
            point: Some(PointLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ONE, 0.9)),
            directional: Some(DirectionalLight::new(Vec3::X, Vec3::ONE, 0.9)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_radiance_colour() {
        let ambient = AmbientLight::new(Vec3::ONE, 0.1);
        assert!(ambient.radiance_colour().abs_diff_eq(Vec3::splat(0.1), 1e-6));
    }

    #[test]
    fn test_point_radiance_colour() {
        let point = PointLight::new(Vec3::new(0.0, 0.0, 2.0), Vec3::ONE, 0.9);
        assert!(point.radiance_colour().abs_diff_eq(Vec3::splat(0.9), 1e-6));
    }

    #[test]
    fn test_radiance_colour_is_componentwise_product() {
        let cases = [
            (Vec3::new(1.0, 0.5, 0.25), 2.0),
            (Vec3::new(0.2, 0.8, 0.0), 0.5),
            (Vec3::new(3.0, -1.0, 0.5), 1.5),
        ];
        for (colour, radiance) in cases {
            let light = DirectionalLight::new(Vec3::X, colour, radiance);
            assert_eq!(light.radiance_colour(), colour * radiance);
        }
    }

    #[test]
    fn test_zero_radiance_gives_black() {
        let light = PointLight::new(Vec3::ZERO, Vec3::new(1.0, 0.3, 0.7), 0.0);
        assert_eq!(light.radiance_colour(), Vec3::ZERO);
    }

    #[test]
    fn test_radiance_colour_tracks_mutation() {
        let mut light = AmbientLight::new(Vec3::ONE, 0.1);
        light.radiance = 0.5;
        assert_eq!(light.radiance_colour(), Vec3::splat(0.5));
    }

    #[test]
    fn test_missing_lights_contribute_nothing() {
        let env = LightingEnvironment {
            ambient: AmbientLight::new(Vec3::ONE, 0.2),
            point: None,
            directional: None,
        };
        assert_eq!(env.point_colour(), Vec3::ZERO);
        assert_eq!(env.directional_colour(), Vec3::ZERO);
        assert!(env.ambient_colour().abs_diff_eq(Vec3::splat(0.2), 1e-6));
        assert_eq!(env.directional_direction(), Vec3::NEG_Y);
    }

    #[test]
    fn test_directional_direction_is_unit_length() {
        let mut env = LightingEnvironment::default();
        env.directional = Some(DirectionalLight::new(Vec3::new(0.0, -4.0, 0.0), Vec3::ONE, 1.0));
        assert_eq!(env.directional_direction(), Vec3::NEG_Y);

        env.directional = Some(DirectionalLight::new(Vec3::ZERO, Vec3::ONE, 1.0));
        assert_eq!(env.directional_direction(), Vec3::NEG_Y);
    }
}
