//! One logical shader and its fog variants.

use super::fog::{patch_fog, FogMode};
use super::source::ProgramSource;
use crate::backend::{Backend, NativeProgram};
use crate::channels::VertexSlot;
use crate::error::ShaderError;
use crate::lazy::LazySlot;

/// Up to four compiled variants of one base program, keyed by fog mode.
///
/// Variants compile on first request. A variant that fails to compile is
/// marked failed for good and resolves to the fog-disabled base program
/// from then on.
#[derive(Debug)]
pub struct ProgramFamily {
    base: ProgramSource,
    inputs: Vec<VertexSlot>,
    slots: [LazySlot<NativeProgram>; FogMode::COUNT],
}

impl ProgramFamily {
    pub fn new(base: ProgramSource, inputs: Vec<VertexSlot>) -> Self {
        Self {
            base,
            inputs,
            slots: [LazySlot::NotRequested; FogMode::COUNT],
        }
    }

    pub fn source(&self) -> &ProgramSource {
        &self.base
    }

    /// Vertex input slots the program reads.
    pub fn inputs(&self) -> &[VertexSlot] {
        &self.inputs
    }

    pub fn slot(&self, fog: FogMode) -> LazySlot<NativeProgram> {
        self.slots[fog.index()]
    }

    /// The program to bind for `fog`, compiling it if needed.
    ///
    /// Returns `None` only when the base program itself cannot be built.
    pub fn resolve<B: Backend>(&mut self, backend: &mut B, fog: FogMode) -> Option<NativeProgram> {
        if fog != FogMode::Disabled {
            if let Some(program) = self.compile_slot(backend, fog) {
                return Some(program);
            }
        }
        self.compile_slot(backend, FogMode::Disabled)
    }

    fn compile_slot<B: Backend>(&mut self, backend: &mut B, fog: FogMode) -> Option<NativeProgram> {
        let base = &self.base;
        let result = self.slots[fog.index()].get_or_try_init(|| {
            let source = patch_fog(base, fog)?;
            backend.compile_program(&source)
        });
        match result {
            Ok(program) => program,
            Err(err) => {
                log_failure(fog, &err);
                None
            }
        }
    }

    /// Deletes every compiled variant. The family can compile again afterwards.
    pub fn release<B: Backend>(&mut self, backend: &mut B) {
        for slot in &mut self.slots {
            if let Some(program) = slot.take() {
                backend.delete_program(program);
            }
        }
    }
}

fn log_failure(fog: FogMode, err: &ShaderError) {
    if fog == FogMode::Disabled {
        log::warn!("base program failed to compile: {err}");
    } else {
        log::warn!("{fog:?} fog variant failed, falling back to base program: {err}");
    }
}
