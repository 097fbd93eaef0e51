//! Interned pipeline state, viewport and scissor.

use super::snapshot::Snapshot;
use super::DeviceStateCache;
use crate::backend::Backend;
use crate::state::{
    BlendDesc, BlendStateId, ColorMask, CullMode, DepthDesc, DepthStateId, Face, RasterDesc,
    RasterStateId, Rect, StencilDesc, StencilStateId, Toggle,
};

impl<B: Backend> DeviceStateCache<B> {
    pub fn create_blend_state(&mut self, desc: &BlendDesc) -> BlendStateId {
        self.owned();
        self.states.blend.create_or_get(desc, &self.caps)
    }

    pub fn create_depth_state(&mut self, desc: &DepthDesc) -> DepthStateId {
        self.owned();
        self.states.depth.create_or_get(desc, &self.caps)
    }

    pub fn create_stencil_state(&mut self, desc: &StencilDesc) -> StencilStateId {
        self.owned();
        self.states.stencil.create_or_get(desc, &self.caps)
    }

    pub fn create_raster_state(&mut self, desc: &RasterDesc) -> RasterStateId {
        self.owned();
        self.states.raster.create_or_get(desc, &self.caps)
    }

    /// Applies blend state with `alpha_ref` as the alpha-test reference.
    pub fn set_blend_state(&mut self, id: BlendStateId, alpha_ref: f32) {
        self.owned();
        if !self.snapshot.blend_id.update((id, alpha_ref)) {
            self.stats.redundant_requests += 1;
            return;
        }
        let state = *self.states.blend.get(id);

        self.apply_toggle(Toggle::Blend, state.enabled);
        if state.enabled {
            if self.snapshot.blend_factors.update(state.factors) {
                self.backend.blend_func(state.factors);
                self.stats.state_changes += 1;
            }
            if self.caps.blend_ops
                && self
                    .snapshot
                    .blend_equation
                    .update((state.op_rgb, state.op_alpha))
            {
                self.backend.blend_equation(state.op_rgb, state.op_alpha);
                self.stats.state_changes += 1;
            }
        }

        if self.caps.alpha_test {
            self.apply_toggle(Toggle::AlphaTest, state.alpha_test.is_some());
            if let Some(func) = state.alpha_test {
                if self.snapshot.alpha_func.update((func, alpha_ref)) {
                    self.backend.alpha_func(func, alpha_ref);
                    self.stats.state_changes += 1;
                }
            }
        }

        self.apply_color_mask(state.color_mask);
        self.apply_toggle(Toggle::AlphaToCoverage, state.alpha_to_mask);
    }

    pub fn set_depth_state(&mut self, id: DepthStateId) {
        self.owned();
        if !self.snapshot.depth_id.update(id) {
            self.stats.redundant_requests += 1;
            return;
        }
        let state = *self.states.depth.get(id);

        self.apply_toggle(Toggle::DepthTest, state.test_enabled);
        if state.test_enabled && self.snapshot.depth_func.update(state.func) {
            self.backend.depth_func(state.func);
            self.stats.state_changes += 1;
        }
        self.apply_depth_write(state.write);
    }

    /// Applies stencil state with `reference` as the stencil reference value.
    pub fn set_stencil_state(&mut self, id: StencilStateId, reference: u8) {
        self.owned();
        if !self.snapshot.stencil_id.update((id, reference)) {
            self.stats.redundant_requests += 1;
            return;
        }
        let state = *self.states.stencil.get(id);

        self.apply_toggle(Toggle::StencilTest, state.enabled);
        if !state.enabled {
            return;
        }
        for (face, desc) in [(Face::Front, state.front), (Face::Back, state.back)] {
            let i = Snapshot::face_index(face);
            if self.snapshot.stencil_func[i].update((desc.func, reference, state.read_mask)) {
                self.backend
                    .stencil_func(face, desc.func, reference, state.read_mask);
                self.stats.state_changes += 1;
            }
            if self.snapshot.stencil_op[i].update((desc.fail, desc.depth_fail, desc.pass)) {
                self.backend
                    .stencil_op(face, desc.fail, desc.depth_fail, desc.pass);
                self.stats.state_changes += 1;
            }
        }
        self.apply_stencil_write_mask(state.write_mask);
    }

    pub fn set_raster_state(&mut self, id: RasterStateId) {
        self.owned();
        if !self.snapshot.raster_id.update(id) {
            self.stats.redundant_requests += 1;
            return;
        }
        let state = *self.states.raster.get(id);

        if self.snapshot.fill.update(state.fill) {
            self.backend.polygon_mode(state.fill);
            self.stats.state_changes += 1;
        }

        self.apply_toggle(Toggle::PolygonOffsetFill, state.offset.is_some());
        if let Some((factor, units)) = state.offset {
            if self.snapshot.polygon_offset.update((factor, units)) {
                self.backend.polygon_offset(factor, units);
                self.stats.state_changes += 1;
            }
        }

        let face = match state.cull {
            CullMode::Off => None,
            CullMode::Front => Some(Face::Front),
            CullMode::Back => Some(Face::Back),
        };
        self.apply_toggle(Toggle::CullFace, face.is_some());
        if let Some(face) = face {
            if self.snapshot.cull_face.update(face) {
                self.backend.cull_face(face);
                self.stats.state_changes += 1;
            }
        }
    }

    pub fn set_viewport(&mut self, rect: Rect) {
        self.owned();
        if self.snapshot.viewport.update(rect) {
            self.backend.viewport(rect);
            self.stats.state_changes += 1;
        } else {
            self.stats.redundant_requests += 1;
        }
    }

    /// `None` disables the scissor test.
    pub fn set_scissor(&mut self, rect: Option<Rect>) {
        self.owned();
        self.apply_toggle(Toggle::ScissorTest, rect.is_some());
        if let Some(rect) = rect {
            if self.snapshot.scissor.update(rect) {
                self.backend.scissor(rect);
                self.stats.state_changes += 1;
            }
        }
    }

    pub(super) fn apply_toggle(&mut self, toggle: Toggle, enabled: bool) {
        if self.snapshot.toggle(toggle).update(enabled) {
            self.backend.set_enabled(toggle, enabled);
            self.stats.state_changes += 1;
        }
    }

    pub(super) fn apply_color_mask(&mut self, mask: ColorMask) {
        if self.snapshot.color_mask.update(mask) {
            self.backend.color_mask(mask);
            self.stats.state_changes += 1;
        }
    }

    pub(super) fn apply_depth_write(&mut self, write: bool) {
        if self.snapshot.depth_write.update(write) {
            self.backend.depth_mask(write);
            self.stats.state_changes += 1;
        }
    }

    pub(super) fn apply_stencil_write_mask(&mut self, mask: u8) {
        if self.snapshot.stencil_write_mask.update(mask) {
            self.backend.stencil_write_mask(mask);
            self.stats.state_changes += 1;
        }
    }
}
