//! Blend state: blending, alpha test and color write mask.

use super::types::{BlendFactor, BlendFactors, BlendOp, ColorMask, CompareFunc};
use super::StateDescriptor;
use crate::backend::Capabilities;
use serde::{Deserialize, Serialize};

/// Declarative blend state as the material system describes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendDesc {
    pub enabled: bool,
    pub factors: BlendFactors,
    pub op_rgb: BlendOp,
    pub op_alpha: BlendOp,
    /// `Always` disables the alpha test.
    pub alpha_test: CompareFunc,
    pub color_mask: ColorMask,
    pub alpha_to_mask: bool,
}

impl BlendDesc {
    pub fn opaque() -> Self {
        Self {
            enabled: false,
            factors: BlendFactors::OPAQUE,
            op_rgb: BlendOp::Add,
            op_alpha: BlendOp::Add,
            alpha_test: CompareFunc::Always,
            color_mask: ColorMask::ALL,
            alpha_to_mask: false,
        }
    }

    /// Classic `src_alpha, 1 - src_alpha` transparency.
    pub fn alpha_blended() -> Self {
        Self {
            enabled: true,
            factors: BlendFactors::uniform(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
            ..Self::opaque()
        }
    }
}

impl Default for BlendDesc {
    fn default() -> Self {
        Self::opaque()
    }
}

/// Blend state resolved against device capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendState {
    pub enabled: bool,
    pub factors: BlendFactors,
    pub op_rgb: BlendOp,
    pub op_alpha: BlendOp,
    pub alpha_test: Option<CompareFunc>,
    pub color_mask: ColorMask,
    pub alpha_to_mask: bool,
}

impl StateDescriptor for BlendDesc {
    type Key = BlendDesc;
    type Compiled = BlendState;
    const NAME: &'static str = "blend state";

    fn key(&self) -> BlendDesc {
        self.clone()
    }

    fn compile(&self, caps: &Capabilities) -> BlendState {
        let mut factors = self.factors;
        let mut op_rgb = self.op_rgb;
        let mut op_alpha = self.op_alpha;

        if !caps.blend_ops && (op_rgb != BlendOp::Add || op_alpha != BlendOp::Add) {
            log::debug!("blend ops unsupported; {op_rgb:?}/{op_alpha:?} degraded to Add");
            op_rgb = BlendOp::Add;
            op_alpha = BlendOp::Add;
        }

        if !caps.separate_alpha_blend {
            if factors.src_alpha != factors.src_rgb || factors.dst_alpha != factors.dst_rgb {
                log::debug!("separate alpha blend unsupported; alpha factors follow color");
            }
            factors.src_alpha = factors.src_rgb;
            factors.dst_alpha = factors.dst_rgb;
            op_alpha = op_rgb;
        }

        let passthrough = factors == BlendFactors::OPAQUE
            && op_rgb == BlendOp::Add
            && op_alpha == BlendOp::Add;

        let alpha_test = match self.alpha_test {
            CompareFunc::Always => None,
            func if caps.alpha_test => Some(func),
            func => {
                log::debug!("alpha test {func:?} unsupported; ignored");
                None
            }
        };

        BlendState {
            enabled: self.enabled && !passthrough,
            factors,
            op_rgb,
            op_alpha,
            alpha_test,
            color_mask: self.color_mask,
            alpha_to_mask: self.alpha_to_mask,
        }
    }
}
