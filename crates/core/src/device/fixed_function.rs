//! Fixed-function pipeline settings: texture combiners, coordinate
//! generation, lights and transform matrices.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    Replace,
    Modulate,
    Add,
    AddSigned,
    Subtract,
    Interpolate,
    /// Per-pixel dot product, needs `Capabilities::dot3_combiner`.
    Dot3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineSource {
    Texture,
    Previous,
    Primary,
    Constant,
}

/// One half (color or alpha) of a texture-stage combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombineFunc {
    pub op: CombineOp,
    pub arg0: CombineSource,
    pub arg1: CombineSource,
}

impl CombineFunc {
    pub const MODULATE: CombineFunc = CombineFunc {
        op: CombineOp::Modulate,
        arg0: CombineSource::Texture,
        arg1: CombineSource::Previous,
    };
}

/// How a texture stage combines its sample with the incoming color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureCombiner {
    pub color: CombineFunc,
    pub alpha: CombineFunc,
}

impl TextureCombiner {
    pub const MODULATE: TextureCombiner = TextureCombiner {
        color: CombineFunc::MODULATE,
        alpha: CombineFunc::MODULATE,
    };

    pub fn requires_dot3(&self) -> bool {
        self.color.op == CombineOp::Dot3 || self.alpha.op == CombineOp::Dot3
    }
}

impl Default for TextureCombiner {
    fn default() -> Self {
        Self::MODULATE
    }
}

/// Texture coordinate generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexGenMode {
    #[default]
    Off,
    ObjectLinear,
    EyeLinear,
    SphereMap,
    ReflectionMap,
    NormalMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: Vec3,
    /// Cone half-angle in degrees; spot lights only.
    pub spot_cutoff: f32,
    pub spot_exponent: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Directional,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            ambient: Vec4::new(0.0, 0.0, 0.0, 1.0),
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            attenuation: Vec3::X,
            spot_cutoff: 180.0,
            spot_exponent: 0.0,
        }
    }
}

/// Fixed-function transform slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixMode {
    World,
    View,
    Projection,
}

impl MatrixMode {
    pub const ALL: [MatrixMode; 3] = [MatrixMode::World, MatrixMode::View, MatrixMode::Projection];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_combiner_modulates() {
        let c = TextureCombiner::default();
        assert_eq!(c.color.op, CombineOp::Modulate);
        assert!(!c.requires_dot3());
    }

    #[test]
    fn dot3_in_either_half_is_detected() {
        let mut c = TextureCombiner::MODULATE;
        c.alpha.op = CombineOp::Dot3;
        assert!(c.requires_dot3());
    }

    #[test]
    fn light_deserializes_with_defaults() {
        let light: Light = serde_json::from_str(r#"{"kind":"point"}"#).unwrap();
        assert_eq!(light.kind, LightKind::Point);
        assert_eq!(light.diffuse, Vec4::ONE);
    }
}
