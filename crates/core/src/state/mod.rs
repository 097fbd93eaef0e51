//! State object pools.
//!
//! Blend, depth, stencil and raster descriptors are interned into immutable
//! compiled objects. A [`StateId`] is the only thing the device snapshot
//! stores, so id equality is the proof that two states are identical.

pub mod blend;
pub mod depth;
pub mod pool;
pub mod raster;
pub mod stencil;
pub mod types;

pub use blend::{BlendDesc, BlendState};
pub use depth::{DepthDesc, DepthState};
pub use pool::{StateId, StatePool};
pub use raster::{RasterDesc, RasterState};
pub use stencil::{StencilDesc, StencilFaceDesc, StencilState};
pub use types::{
    BlendFactor, BlendFactors, BlendOp, ColorMask, CompareFunc, CullMode, Face, FillMode, Rect,
    StencilOp, Toggle,
};

use crate::backend::Capabilities;

/// A declarative state description that can be interned.
pub trait StateDescriptor {
    /// Exact-match lookup key.
    type Key: Ord;
    /// Capability-resolved form consumed by the device.
    type Compiled;
    /// Human-readable name used in logs and panics.
    const NAME: &'static str;

    fn key(&self) -> Self::Key;

    /// Translates the declarative fields once. Unsupported combinations
    /// degrade here so the device never sees them.
    fn compile(&self, caps: &Capabilities) -> Self::Compiled;
}

pub type BlendStateId = StateId<BlendState>;
pub type DepthStateId = StateId<DepthState>;
pub type StencilStateId = StateId<StencilState>;
pub type RasterStateId = StateId<RasterState>;

/// The four pools a device owns.
#[derive(Default)]
pub struct StateObjects {
    pub blend: StatePool<BlendDesc>,
    pub depth: StatePool<DepthDesc>,
    pub stencil: StatePool<StencilDesc>,
    pub raster: StatePool<RasterDesc>,
}

impl StateObjects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of interned objects across all pools.
    pub fn len(&self) -> usize {
        self.blend.len() + self.depth.len() + self.stencil.len() + self.raster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bulk-clears every pool.
    pub fn clear(&mut self) {
        self.blend.clear();
        self.depth.clear();
        self.stencil.clear();
        self.raster.clear();
    }
}
