//! Shader binding, parameter blocks and fixed-function transforms.

use super::fixed_function::MatrixMode;
use super::tracked::Tracked;
use super::DeviceStateCache;
use crate::backend::Backend;
use crate::channels::{ChannelAssigns, VertexSlot};
use crate::error::DeviceError;
use crate::program::{
    ParamBlock, ParamValue, ProgramBinding, ProgramSource, ShaderId, ShaderStage, Strategy,
};
use glam::Mat4;

impl<B: Backend> DeviceStateCache<B> {
    /// Registers a logical shader. Nothing compiles until it is first bound.
    pub fn register_shader(&mut self, source: ProgramSource, inputs: Vec<VertexSlot>) -> ShaderId {
        self.owned();
        self.programs.register(source, inputs)
    }

    /// Releases every compiled variant of `id`. A stage still driven by it
    /// reverts to fixed function first.
    pub fn delete_shader(&mut self, id: ShaderId) -> bool {
        self.owned();
        if self.bound_shaders.contains(&Some(id)) {
            log::warn!("shader {} deleted while bound", id.0);
            self.bind_fixed_function();
        }
        self.programs.delete_family(&mut self.backend, id)
    }

    pub fn channel_requirements(&self, id: ShaderId) -> Option<ChannelAssigns> {
        self.programs.channel_requirements(id)
    }

    /// Shader currently driving `stage`, if any.
    pub fn bound_shader(&self, stage: ShaderStage) -> Option<ShaderId> {
        self.bound_shaders[stage.index()]
    }

    /// Binds the variant of `id` matching the current fog mode.
    ///
    /// A linked shader takes over both stages whichever `stage` is given.
    ///
    /// # Errors
    ///
    /// Propagates `UnknownShader`, `StageMismatch` and `ProgramUnavailable`
    /// from the registry; the snapshot is untouched on error.
    pub fn bind_shader(&mut self, stage: ShaderStage, id: ShaderId) -> Result<(), DeviceError> {
        self.owned();
        self.assert_no_immediate();
        let binding = self
            .programs
            .resolve(&mut self.backend, id, stage, self.fog_mode)?;
        self.bind_program(stage, binding);

        for s in ShaderStage::ALL {
            if self.snapshot.program(s).is(&ProgramBinding::FixedFunction) {
                self.bound_shaders[s.index()] = None;
            }
        }
        match binding {
            ProgramBinding::Linked(_) => self.bound_shaders = [Some(id); 2],
            _ => self.bound_shaders[stage.index()] = Some(id),
        }
        Ok(())
    }

    /// Drives both stages with the fixed-function pipeline.
    pub fn bind_fixed_function(&mut self) {
        self.owned();
        self.assert_no_immediate();
        for stage in ShaderStage::ALL {
            self.bind_program(stage, ProgramBinding::FixedFunction);
        }
        self.bound_shaders = [None; 2];
    }

    /// Deletes every compiled program and returns to fixed function.
    /// Registrations survive; the next bind compiles again.
    pub fn release_programs(&mut self) {
        self.owned();
        self.assert_no_immediate();
        self.bind_fixed_function();
        self.programs.release_all(&mut self.backend);
        log::debug!("released compiled programs of {} shaders", self.programs.len());
    }

    fn bind_program(&mut self, stage: ShaderStage, binding: ProgramBinding) {
        let stage = match binding {
            ProgramBinding::Linked(_) => ShaderStage::Vertex,
            _ => stage,
        };
        if self.snapshot.program(stage).is(&binding) {
            self.stats.redundant_requests += 1;
            return;
        }
        if ShaderStage::ALL
            .iter()
            .any(|&s| !self.snapshot.program(s).is_known())
        {
            self.disable_all_programs();
        }

        match binding {
            ProgramBinding::FixedFunction => self.release_stage(stage),
            ProgramBinding::PerStage(program) => {
                if !self.stage_uses(stage, Strategy::PerStage) {
                    self.release_stage(stage);
                    self.backend.enable_stage(stage, true);
                }
                self.backend.bind_stage_program(stage, program);
                self.snapshot.programs[stage.index()] = Tracked::Known(binding);
            }
            ProgramBinding::Linked(program) => {
                for s in ShaderStage::ALL {
                    if self.stage_uses(s, Strategy::PerStage) {
                        self.backend.enable_stage(s, false);
                    }
                }
                self.backend.use_linked_program(Some(program));
                self.snapshot.programs = [Tracked::Known(binding); 2];
            }
        }
        log::trace!("{} stage bound to {binding:?}", stage.name());
        self.stats.program_binds += 1;
    }

    fn stage_uses(&self, stage: ShaderStage, strategy: Strategy) -> bool {
        self.snapshot
            .program(stage)
            .known()
            .is_some_and(|b| b.strategy() == strategy)
    }

    /// Returns `stage` to fixed function. Leaving a linked unit frees both.
    fn release_stage(&mut self, stage: ShaderStage) {
        match self.snapshot.program(stage) {
            Tracked::Known(ProgramBinding::PerStage(_)) => {
                self.backend.enable_stage(stage, false);
                self.snapshot.programs[stage.index()] = Tracked::Known(ProgramBinding::FixedFunction);
            }
            Tracked::Known(ProgramBinding::Linked(_)) => {
                self.backend.use_linked_program(None);
                self.snapshot.programs = [Tracked::Known(ProgramBinding::FixedFunction); 2];
            }
            Tracked::Known(ProgramBinding::FixedFunction) | Tracked::Unknown => {}
        }
    }

    /// Nothing is known about either stage: turn every strategy off.
    fn disable_all_programs(&mut self) {
        if self.caps.per_stage_programs {
            for stage in ShaderStage::ALL {
                self.backend.enable_stage(stage, false);
            }
        }
        if self.caps.linked_programs {
            self.backend.use_linked_program(None);
        }
        self.snapshot.programs = [Tracked::Known(ProgramBinding::FixedFunction); 2];
    }

    /// Queues `params` over `buffer` for `stage`. Applied by the next
    /// [`DeviceStateCache::before_draw_call`]; a later block for the same
    /// stage replaces an unflushed one.
    pub fn set_program_params(&mut self, stage: ShaderStage, params: &ParamBlock, buffer: &[u8]) {
        self.owned();
        if buffer.len() < params.required_len() {
            log::warn!(
                "{} parameter buffer holds {} bytes, block needs {}",
                stage.name(),
                buffer.len(),
                params.required_len()
            );
        }
        self.pending_params[stage.index()] = Some((params.clone(), buffer.to_vec()));
    }

    pub(super) fn flush_params(&mut self) {
        for stage in ShaderStage::ALL {
            let Some((params, buffer)) = self.pending_params[stage.index()].take() else {
                continue;
            };
            let cached = self.config.workarounds.cache_stage_constants
                && self.stage_uses(stage, Strategy::PerStage);

            for param in &params {
                let Some(value) = param.read(&buffer) else {
                    log::warn!("parameter '{}' lies outside its buffer", param.name);
                    continue;
                };
                if let ParamValue::Texture { id, dim } = value {
                    self.set_texture(stage, param.index as usize, Some(id), dim, 0.0);
                    continue;
                }
                if cached && param.kind.is_constant() {
                    let register = value.as_vector().unwrap_or_default();
                    if !self.value_caches[stage.index()].needs_upload(param.index, register) {
                        self.stats.cached_params += 1;
                        continue;
                    }
                }
                self.backend.upload_param(stage, param, &value);
                self.stats.param_uploads += 1;
            }
        }
    }

    /// Sets a fixed-function transform. Loaded at the next draw while the
    /// vertex stage runs fixed function.
    pub fn set_transform(&mut self, mode: MatrixMode, matrix: Mat4) {
        self.owned();
        self.matrices[mode.index()] = Some(matrix);
    }

    pub(super) fn flush_transforms(&mut self) {
        if !self.caps.fixed_function
            || !self
                .snapshot
                .program(ShaderStage::Vertex)
                .is(&ProgramBinding::FixedFunction)
        {
            return;
        }
        for mode in MatrixMode::ALL {
            let Some(matrix) = self.matrices[mode.index()] else {
                continue;
            };
            if self.snapshot.matrices[mode.index()].update(matrix) {
                self.backend.load_matrix(mode, &matrix);
                self.stats.state_changes += 1;
            }
        }
    }
}
