//! Rasterizer state: fill mode, culling, depth bias.

use super::types::{CullMode, FillMode};
use super::StateDescriptor;
use crate::backend::Capabilities;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterDesc {
    pub cull: CullMode,
    pub fill: FillMode,
    pub depth_bias: f32,
    pub slope_scaled_depth_bias: f32,
}

impl Default for RasterDesc {
    fn default() -> Self {
        Self {
            cull: CullMode::Back,
            fill: FillMode::Solid,
            depth_bias: 0.0,
            slope_scaled_depth_bias: 0.0,
        }
    }
}

/// Bias values keyed by bit pattern so that lookups are exact.
pub type RasterKey = (CullMode, FillMode, u32, u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterState {
    pub cull: CullMode,
    pub fill: FillMode,
    /// `(slope factor, constant units)`; `None` disables polygon offset.
    pub offset: Option<(f32, f32)>,
}

impl StateDescriptor for RasterDesc {
    type Key = RasterKey;
    type Compiled = RasterState;
    const NAME: &'static str = "raster state";

    fn key(&self) -> RasterKey {
        (
            self.cull,
            self.fill,
            self.depth_bias.to_bits(),
            self.slope_scaled_depth_bias.to_bits(),
        )
    }

    fn compile(&self, caps: &Capabilities) -> RasterState {
        let fill = if self.fill != FillMode::Solid && !caps.wireframe {
            log::debug!("{:?} fill unsupported; using solid", self.fill);
            FillMode::Solid
        } else {
            self.fill
        };

        let offset = if self.depth_bias == 0.0 && self.slope_scaled_depth_bias == 0.0 {
            None
        } else {
            Some((self.slope_scaled_depth_bias, self.depth_bias))
        };

        RasterState {
            cull: self.cull,
            fill,
            offset,
        }
    }
}
