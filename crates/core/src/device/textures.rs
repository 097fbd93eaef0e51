//! Texture units, fixed-function combiners, lights and fog.

use super::fixed_function::{Light, TexGenMode, TextureCombiner};
use super::tracked::Tracked;
use super::DeviceStateCache;
use crate::backend::{Backend, NativeTexture};
use crate::program::{FogParams, ShaderStage};
use crate::texture_map::{TextureDimension, TextureId};
use glam::Vec4;

impl<B: Backend> DeviceStateCache<B> {
    /// Hardware unit backing `unit` of `stage`. Vertex-stage units are taken
    /// from the top of the unit range.
    pub fn texture_unit(&self, stage: ShaderStage, unit: usize) -> Option<usize> {
        let total = self.caps.max_texture_units;
        let vertex = self.caps.max_vertex_texture_units.min(total);
        match stage {
            ShaderStage::Fragment => (unit < total - vertex).then_some(unit),
            ShaderStage::Vertex => (unit < vertex).then_some(total - vertex + unit),
        }
    }

    /// Binds `texture` (or nothing) to `unit` of `stage`, creating the native
    /// texture on first use. Returns `false` if the unit does not exist.
    pub fn set_texture(
        &mut self,
        stage: ShaderStage,
        unit: usize,
        texture: Option<TextureId>,
        dim: TextureDimension,
        lod_bias: f32,
    ) -> bool {
        self.owned();
        self.assert_no_immediate();
        let Some(index) = self.texture_unit(stage, unit) else {
            log::debug!("{} texture unit {unit} unavailable", stage.name());
            return false;
        };

        let native = texture.and_then(|id| self.textures.get_or_create(&mut self.backend, id, dim));
        if self.snapshot.units[index].binding.update((dim, native)) {
            self.backend.bind_texture(index, dim, native);
            self.stats.texture_binds += 1;
        } else {
            self.stats.redundant_requests += 1;
        }
        if native.is_some() && self.snapshot.units[index].lod_bias.update(lod_bias) {
            self.backend.texture_lod_bias(index, dim, lod_bias);
            self.stats.state_changes += 1;
        }
        true
    }

    /// Associates an externally created native texture with `id`.
    pub fn register_texture(&mut self, id: TextureId, dim: TextureDimension, texture: NativeTexture) {
        self.owned();
        self.textures.register(id, dim, texture);
    }

    /// Releases `id`. Units that held it become unknown.
    pub fn delete_texture(&mut self, id: TextureId) -> bool {
        self.owned();
        let Some(native) = self.textures.remove(id) else {
            return false;
        };
        for unit in self.snapshot.units.iter_mut().filter(|u| u.holds(native)) {
            unit.binding = Tracked::Unknown;
        }
        self.backend.delete_texture(native);
        true
    }

    /// Returns `false` if the unit, fixed-function combining, or the
    /// requested operation is unsupported.
    pub fn set_texture_combiner(&mut self, unit: usize, combiner: TextureCombiner) -> bool {
        self.owned();
        if !self.fixed_function_unit(unit) {
            return false;
        }
        if combiner.requires_dot3() && !self.caps.dot3_combiner {
            log::debug!("dot3 combiner unsupported on unit {unit}");
            return false;
        }
        if self.snapshot.units[unit].combiner.update(combiner) {
            self.backend.texture_combiner(unit, &combiner);
            self.stats.state_changes += 1;
        }
        true
    }

    pub fn set_texture_constant_color(&mut self, unit: usize, color: Vec4) -> bool {
        self.owned();
        if !self.fixed_function_unit(unit) {
            return false;
        }
        if self.snapshot.units[unit].constant_color.update(color) {
            self.backend.texture_constant_color(unit, color);
            self.stats.state_changes += 1;
        }
        true
    }

    pub fn set_tex_gen(&mut self, unit: usize, mode: TexGenMode) -> bool {
        self.owned();
        if !self.fixed_function_unit(unit) {
            return false;
        }
        if self.snapshot.units[unit].tex_gen.update(mode) {
            self.backend.tex_gen(unit, mode);
            self.stats.state_changes += 1;
        }
        true
    }

    fn fixed_function_unit(&self, unit: usize) -> bool {
        self.caps.fixed_function && self.texture_unit(ShaderStage::Fragment, unit).is_some()
    }

    /// Sets or disables (`None`) light `index`. Returns `false` past the
    /// light limit.
    pub fn set_light(&mut self, index: usize, light: Option<Light>) -> bool {
        self.owned();
        let Some(slot) = self.snapshot.lights.get_mut(index) else {
            log::debug!("light {index} exceeds the {} supported", self.caps.max_lights);
            return false;
        };
        if slot.update(light) {
            self.backend.set_light(index, light.as_ref());
            self.stats.state_changes += 1;
        }
        true
    }

    /// Disables every light from `from` upward.
    pub fn disable_lights(&mut self, from: usize) {
        for index in from..self.snapshot.lights.len() {
            self.set_light(index, None);
        }
    }

    /// Sets fog parameters. The mode also selects which program variant
    /// subsequent shader binds resolve to.
    pub fn set_fog(&mut self, fog: FogParams) {
        self.owned();
        self.fog_mode = fog.mode;
        if self.caps.fixed_function && self.snapshot.fog.update(fog) {
            self.backend.set_fog(&fog);
            self.stats.state_changes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, Capabilities, RecordingBackend};
    use crate::config::DeviceConfig;
    use crate::device::fixed_function::{CombineOp, LightKind};
    use crate::device::tests::device;
    use crate::program::FogMode;

    #[test]
    fn texture_is_created_and_bound_once() {
        let mut dev = device();
        for _ in 0..3 {
            assert!(dev.set_texture(
                ShaderStage::Fragment,
                0,
                Some(TextureId(1)),
                TextureDimension::Tex2D,
                0.0
            ));
        }
        assert_eq!(dev.backend().count(|c| matches!(c, Call::CreateTexture(_))), 1);
        assert_eq!(dev.backend().count(|c| matches!(c, Call::BindTexture { .. })), 1);
        assert_eq!(dev.stats().texture_binds, 1);
    }

    #[test]
    fn vertex_units_come_from_the_top() {
        let dev = device();
        let caps = Capabilities::full();
        assert_eq!(
            dev.texture_unit(ShaderStage::Vertex, 0),
            Some(caps.max_texture_units - caps.max_vertex_texture_units)
        );
        assert_eq!(dev.texture_unit(ShaderStage::Vertex, caps.max_vertex_texture_units), None);
        assert_eq!(
            dev.texture_unit(
                ShaderStage::Fragment,
                caps.max_texture_units - caps.max_vertex_texture_units
            ),
            None
        );
    }

    #[test]
    fn missing_vertex_units_reject_binding() {
        let mut dev = DeviceStateCache::new(
            RecordingBackend::new(Capabilities::fixed_function_only()),
            DeviceConfig::default(),
        );
        assert!(!dev.set_texture(ShaderStage::Vertex, 0, None, TextureDimension::Tex2D, 0.0));
        assert!(dev.backend().calls().is_empty());
    }

    #[test]
    fn deleting_a_bound_texture_forgets_its_unit() {
        let mut dev = device();
        let id = TextureId(4);
        dev.set_texture(ShaderStage::Fragment, 2, Some(id), TextureDimension::Tex2D, 0.0);
        assert!(dev.delete_texture(id));
        assert!(!dev.snapshot().units[2].binding.is_known());
        assert!(!dev.delete_texture(id), "second delete finds nothing");

        dev.set_texture(ShaderStage::Fragment, 2, Some(id), TextureDimension::Tex2D, 0.0);
        assert_eq!(dev.backend().count(|c| matches!(c, Call::CreateTexture(_))), 2);
        assert_eq!(dev.backend().count(|c| matches!(c, Call::BindTexture { .. })), 2);
    }

    #[test]
    fn unbinding_reaches_the_backend() {
        let mut dev = device();
        dev.set_texture(ShaderStage::Fragment, 0, Some(TextureId(1)), TextureDimension::Tex2D, 0.0);
        dev.set_texture(ShaderStage::Fragment, 0, None, TextureDimension::Tex2D, 0.0);
        assert!(dev.backend().calls().contains(&Call::BindTexture {
            unit: 0,
            dim: TextureDimension::Tex2D,
            texture: None
        }));
    }

    #[test]
    fn dot3_combiner_fails_without_capability() {
        let caps = Capabilities {
            dot3_combiner: false,
            ..Capabilities::full()
        };
        let mut dev = DeviceStateCache::new(RecordingBackend::new(caps), DeviceConfig::default());
        let mut combiner = TextureCombiner::MODULATE;
        combiner.color.op = CombineOp::Dot3;
        assert!(!dev.set_texture_combiner(0, combiner));
        assert!(dev.set_texture_combiner(0, TextureCombiner::MODULATE));
        assert!(dev.set_texture_combiner(0, TextureCombiner::MODULATE));
        assert_eq!(dev.backend().calls().len(), 1);
    }

    #[test]
    fn tex_gen_and_constant_color_are_deduplicated() {
        let mut dev = device();
        dev.set_tex_gen(1, TexGenMode::SphereMap);
        dev.set_tex_gen(1, TexGenMode::SphereMap);
        dev.set_texture_constant_color(1, Vec4::ONE);
        dev.set_texture_constant_color(1, Vec4::ONE);
        assert_eq!(dev.backend().calls().len(), 2);
    }

    #[test]
    fn lights_beyond_limit_are_rejected() {
        let mut dev = device();
        let max = dev.capabilities().max_lights;
        assert!(!dev.set_light(max, Some(Light::default())));
        assert!(dev.set_light(0, Some(Light::default())));
    }

    #[test]
    fn disable_lights_turns_off_each_remaining_light_once() {
        let mut dev = device();
        let spot = Light {
            kind: LightKind::Spot,
            ..Light::default()
        };
        dev.set_light(0, Some(spot));
        dev.disable_lights(1);
        let max = dev.capabilities().max_lights;
        assert_eq!(
            dev.backend().count(|c| matches!(c, Call::SetLight { light: None, .. })),
            max - 1
        );
        dev.disable_lights(1);
        assert_eq!(dev.backend().calls().len(), max, "second pass is free");
    }

    #[test]
    fn fog_is_sent_once_and_selects_mode() {
        let mut dev = device();
        let fog = FogParams {
            mode: FogMode::Exp,
            ..FogParams::default()
        };
        dev.set_fog(fog);
        dev.set_fog(fog);
        assert_eq!(dev.backend().count(|c| matches!(c, Call::SetFog(_))), 1);
    }
}
