//! Registry of logical shaders.

use super::binding::ProgramBinding;
use super::family::ProgramFamily;
use super::fog::FogMode;
use super::source::{ProgramSource, ShaderStage};
use crate::backend::Backend;
use crate::channels::{ChannelAssigns, VertexSlot};
use crate::error::DeviceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical shader identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShaderId(pub u32);

/// Owns every [`ProgramFamily`] by [`ShaderId`].
#[derive(Debug, Default)]
pub struct ProgramRegistry {
    families: BTreeMap<ShaderId, ProgramFamily>,
    next_id: u32,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shader. Nothing is compiled until it is first bound.
    pub fn register(&mut self, source: ProgramSource, inputs: Vec<VertexSlot>) -> ShaderId {
        let id = ShaderId(self.next_id);
        self.next_id += 1;
        self.families.insert(id, ProgramFamily::new(source, inputs));
        id
    }

    pub fn family(&self, id: ShaderId) -> Option<&ProgramFamily> {
        self.families.get(&id)
    }

    /// The binding `id` produces on `stage` under `fog`.
    ///
    /// # Errors
    ///
    /// - `UnknownShader` if `id` is not registered.
    /// - `StageMismatch` if a single-stage shader is bound to the other stage.
    /// - `ProgramUnavailable` if the base program failed to compile.
    pub fn resolve<B: Backend>(
        &mut self,
        backend: &mut B,
        id: ShaderId,
        stage: ShaderStage,
        fog: FogMode,
    ) -> Result<ProgramBinding, DeviceError> {
        let family = self
            .families
            .get_mut(&id)
            .ok_or(DeviceError::UnknownShader(id.0))?;

        let linked = match family.source() {
            ProgramSource::Linked { .. } => true,
            ProgramSource::Stage { stage: s, .. } if *s == stage => false,
            ProgramSource::Stage { stage: s, .. } => {
                return Err(DeviceError::StageMismatch {
                    shader: id.0,
                    expected: s.name(),
                })
            }
        };

        let program = family
            .resolve(backend, fog)
            .ok_or(DeviceError::ProgramUnavailable(id.0))?;
        Ok(if linked {
            ProgramBinding::Linked(program)
        } else {
            ProgramBinding::PerStage(program)
        })
    }

    /// Vertex channels the shader needs, from the inputs it was registered with.
    pub fn channel_requirements(&self, id: ShaderId) -> Option<ChannelAssigns> {
        self.families
            .get(&id)
            .map(|family| ChannelAssigns::from_program_inputs(family.inputs()))
    }

    /// Releases every compiled variant of `id` and forgets it.
    pub fn delete_family<B: Backend>(&mut self, backend: &mut B, id: ShaderId) -> bool {
        match self.families.remove(&id) {
            Some(mut family) => {
                family.release(backend);
                true
            }
            None => false,
        }
    }

    /// Releases every compiled program but keeps the registrations.
    pub fn release_all<B: Backend>(&mut self, backend: &mut B) {
        for family in self.families.values_mut() {
            family.release(backend);
        }
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, RecordingBackend};
    use crate::channels::ShaderChannel;

    #[test]
    fn linked_source_resolves_to_linked_binding() {
        let mut backend = RecordingBackend::default();
        let mut reg = ProgramRegistry::new();
        let id = reg.register(ProgramSource::linked("v", "f"), Vec::new());
        let binding = reg
            .resolve(&mut backend, id, ShaderStage::Vertex, FogMode::Disabled)
            .unwrap();
        assert!(matches!(binding, ProgramBinding::Linked(_)));
    }

    #[test]
    fn stage_source_on_wrong_stage_is_rejected() {
        let mut backend = RecordingBackend::default();
        let mut reg = ProgramRegistry::new();
        let id = reg.register(ProgramSource::stage(ShaderStage::Vertex, "v"), Vec::new());
        let err = reg
            .resolve(&mut backend, id, ShaderStage::Fragment, FogMode::Disabled)
            .unwrap_err();
        assert!(matches!(err, DeviceError::StageMismatch { .. }), "got {err:?}");
        assert!(backend.calls().is_empty(), "nothing may compile on mismatch");
    }

    #[test]
    fn unknown_shader_is_an_error() {
        let mut backend = RecordingBackend::default();
        let mut reg = ProgramRegistry::new();
        let err = reg
            .resolve(&mut backend, ShaderId(99), ShaderStage::Vertex, FogMode::Disabled)
            .unwrap_err();
        assert!(matches!(err, DeviceError::UnknownShader(99)));
    }

    #[test]
    fn failed_base_is_program_unavailable() {
        let mut backend = RecordingBackend::default();
        backend.fail_compiles_when(|_| true);
        let mut reg = ProgramRegistry::new();
        let id = reg.register(ProgramSource::linked("v", "f"), Vec::new());
        let err = reg
            .resolve(&mut backend, id, ShaderStage::Vertex, FogMode::Disabled)
            .unwrap_err();
        assert!(matches!(err, DeviceError::ProgramUnavailable(_)));
    }

    #[test]
    fn channel_requirements_follow_inputs() {
        let mut reg = ProgramRegistry::new();
        let id = reg.register(
            ProgramSource::linked("v", "f"),
            vec![VertexSlot::Vertex, VertexSlot::TexCoord0],
        );
        let assigns = reg.channel_requirements(id).unwrap();
        assert_eq!(assigns.source_for(VertexSlot::TexCoord0), ShaderChannel::TexCoord0);
        assert!(assigns.is_directly_wired());
    }

    #[test]
    fn delete_family_releases_programs() {
        let mut backend = RecordingBackend::default();
        let mut reg = ProgramRegistry::new();
        let id = reg.register(ProgramSource::linked("v", "f"), Vec::new());
        reg.resolve(&mut backend, id, ShaderStage::Vertex, FogMode::Disabled)
            .unwrap();
        assert!(reg.delete_family(&mut backend, id));
        assert!(!reg.delete_family(&mut backend, id));
        assert_eq!(backend.count(|c| matches!(c, Call::DeleteProgram(_))), 1);
        assert!(reg.is_empty());
    }
}
