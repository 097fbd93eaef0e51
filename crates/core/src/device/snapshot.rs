//! Everything the device assumes the backend currently holds.

use super::fixed_function::{Light, TexGenMode, TextureCombiner};
use super::tracked::Tracked;
use crate::backend::NativeTexture;
use crate::channels::ChannelAssigns;
use crate::program::{FogParams, ProgramBinding, ShaderStage};
use crate::state::{
    BlendFactors, BlendOp, BlendStateId, ColorMask, CompareFunc, DepthStateId, Face, FillMode,
    RasterStateId, Rect, StencilOp, StencilStateId, Toggle,
};
use crate::texture_map::TextureDimension;
use glam::{Mat4, Vec4};

const TOGGLE_COUNT: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct TextureUnitState {
    pub binding: Tracked<(TextureDimension, Option<NativeTexture>)>,
    pub lod_bias: Tracked<f32>,
    pub combiner: Tracked<TextureCombiner>,
    pub constant_color: Tracked<Vec4>,
    pub tex_gen: Tracked<TexGenMode>,
}

impl TextureUnitState {
    pub fn holds(&self, texture: NativeTexture) -> bool {
        matches!(self.binding, Tracked::Known((_, Some(t))) if t == texture)
    }
}

/// Snapshot of backend state, one [`Tracked`] per independently settable
/// aspect.
///
/// The interned-id fields record the last object applied as a whole; the
/// aspect fields below them are what the ids expanded to. A request whose
/// id matches skips the aspect diff entirely.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub blend_id: Tracked<(BlendStateId, f32)>,
    pub depth_id: Tracked<DepthStateId>,
    pub stencil_id: Tracked<(StencilStateId, u8)>,
    pub raster_id: Tracked<RasterStateId>,

    pub toggles: [Tracked<bool>; TOGGLE_COUNT],
    pub blend_factors: Tracked<BlendFactors>,
    pub blend_equation: Tracked<(BlendOp, BlendOp)>,
    pub alpha_func: Tracked<(CompareFunc, f32)>,
    pub color_mask: Tracked<ColorMask>,
    pub depth_func: Tracked<CompareFunc>,
    pub depth_write: Tracked<bool>,
    pub stencil_func: [Tracked<(CompareFunc, u8, u8)>; 2],
    pub stencil_op: [Tracked<(StencilOp, StencilOp, StencilOp)>; 2],
    pub stencil_write_mask: Tracked<u8>,
    pub fill: Tracked<FillMode>,
    pub polygon_offset: Tracked<(f32, f32)>,
    pub cull_face: Tracked<Face>,
    pub viewport: Tracked<Rect>,
    pub scissor: Tracked<Rect>,

    pub units: Vec<TextureUnitState>,
    pub lights: Vec<Tracked<Option<Light>>>,
    pub fog: Tracked<FogParams>,
    pub matrices: [Tracked<Mat4>; 3],
    pub programs: [Tracked<ProgramBinding>; 2],
    pub vertex_inputs: Tracked<ChannelAssigns>,
}

impl Snapshot {
    pub fn new(texture_units: usize, lights: usize) -> Self {
        Self {
            blend_id: Tracked::Unknown,
            depth_id: Tracked::Unknown,
            stencil_id: Tracked::Unknown,
            raster_id: Tracked::Unknown,
            toggles: [Tracked::Unknown; TOGGLE_COUNT],
            blend_factors: Tracked::Unknown,
            blend_equation: Tracked::Unknown,
            alpha_func: Tracked::Unknown,
            color_mask: Tracked::Unknown,
            depth_func: Tracked::Unknown,
            depth_write: Tracked::Unknown,
            stencil_func: [Tracked::Unknown; 2],
            stencil_op: [Tracked::Unknown; 2],
            stencil_write_mask: Tracked::Unknown,
            fill: Tracked::Unknown,
            polygon_offset: Tracked::Unknown,
            cull_face: Tracked::Unknown,
            viewport: Tracked::Unknown,
            scissor: Tracked::Unknown,
            units: vec![TextureUnitState::default(); texture_units],
            lights: vec![Tracked::Unknown; lights],
            fog: Tracked::Unknown,
            matrices: [Tracked::Unknown; 3],
            programs: [Tracked::Unknown; 2],
            vertex_inputs: Tracked::Unknown,
        }
    }

    /// Resets every field to `Unknown`.
    pub fn invalidate(&mut self) {
        *self = Self::new(self.units.len(), self.lights.len());
    }

    pub fn toggle(&mut self, toggle: Toggle) -> &mut Tracked<bool> {
        &mut self.toggles[toggle as usize]
    }

    pub fn program(&self, stage: ShaderStage) -> Tracked<ProgramBinding> {
        self.programs[stage.index()]
    }

    pub fn face_index(face: Face) -> usize {
        match face {
            Face::Front => 0,
            Face::Back => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_snapshot_knows_nothing() {
        let snap = Snapshot::new(4, 2);
        assert!(!snap.viewport.is_known());
        assert!(snap.units.iter().all(|u| !u.binding.is_known()));
        assert!(snap.lights.iter().all(|l| !l.is_known()));
    }

    #[test]
    fn invalidate_keeps_sizes_and_forgets_values() {
        let mut snap = Snapshot::new(3, 5);
        snap.depth_write.update(true);
        snap.units[1].lod_bias.update(0.5);
        snap.invalidate();
        assert_eq!(snap.units.len(), 3);
        assert_eq!(snap.lights.len(), 5);
        assert!(!snap.depth_write.is_known());
        assert!(!snap.units[1].lod_bias.is_known());
    }

    #[test]
    fn unit_reports_held_texture() {
        let mut unit = TextureUnitState::default();
        unit.binding.update((TextureDimension::Tex2D, Some(NativeTexture(4))));
        assert!(unit.holds(NativeTexture(4)));
        assert!(!unit.holds(NativeTexture(5)));
    }

    #[test]
    fn every_toggle_has_a_slot() {
        let mut snap = Snapshot::new(0, 0);
        for toggle in [
            Toggle::Blend,
            Toggle::AlphaTest,
            Toggle::AlphaToCoverage,
            Toggle::DepthTest,
            Toggle::StencilTest,
            Toggle::CullFace,
            Toggle::PolygonOffsetFill,
            Toggle::ScissorTest,
        ] {
            assert!(snap.toggle(toggle).update(true));
        }
    }
}
