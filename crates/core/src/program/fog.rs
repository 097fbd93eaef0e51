//! Fog treatments and the program-variant patcher.
//!
//! Every logical shader can exist in one variant per [`FogMode`]. The
//! fog-disabled variant is the base source itself; the others are produced
//! by [`patch_fog`], which prepends a `FOG_MODE` define and requires the
//! fragment code to carry a `#pragma fog` hook where the fade is applied.

use super::source::{ProgramSource, ShaderStage};
use crate::error::ShaderError;
use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Marker the fragment code must contain for a fog variant to be derived.
pub const FOG_HOOK: &str = "#pragma fog";

/// Distance-fade function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FogMode {
    #[default]
    Disabled,
    Linear,
    Exp,
    Exp2,
}

impl FogMode {
    pub const COUNT: usize = 4;
    pub const ALL: [FogMode; 4] = [FogMode::Disabled, FogMode::Linear, FogMode::Exp, FogMode::Exp2];

    /// Program-family slot for this treatment. Slot 0 is the base program.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Fixed-function fog parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogParams {
    pub mode: FogMode,
    pub color: Vec4,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogParams {
    fn default() -> Self {
        Self {
            mode: FogMode::Disabled,
            color: Vec4::ZERO,
            start: 0.0,
            end: 1.0,
            density: 1.0,
        }
    }
}

/// Derives the `mode` variant of `base`.
///
/// # Errors
///
/// Returns `ShaderError::FogPatch` if the source has no fragment stage with
/// a [`FOG_HOOK`] to patch.
pub fn patch_fog(base: &ProgramSource, mode: FogMode) -> Result<ProgramSource, ShaderError> {
    if mode == FogMode::Disabled {
        return Ok(base.clone());
    }
    let define = format!("#define FOG_MODE {}\n", mode.index());

    match base {
        ProgramSource::Stage {
            stage: ShaderStage::Vertex,
            code,
        } => Ok(ProgramSource::stage(ShaderStage::Vertex, format!("{define}{code}"))),
        ProgramSource::Stage {
            stage: ShaderStage::Fragment,
            code,
        } => Ok(ProgramSource::stage(
            ShaderStage::Fragment,
            patch_fragment(&define, code)?,
        )),
        ProgramSource::Linked { vertex, fragment } => Ok(ProgramSource::linked(
            format!("{define}{vertex}"),
            patch_fragment(&define, fragment)?,
        )),
    }
}

fn patch_fragment(define: &str, code: &str) -> Result<String, ShaderError> {
    if !code.contains(FOG_HOOK) {
        return Err(ShaderError::FogPatch(format!(
            "fragment code has no '{FOG_HOOK}' hook"
        )));
    }
    Ok(format!("{define}{code}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_returns_base_unchanged() {
        let base = ProgramSource::linked("v", "f");
        assert_eq!(patch_fog(&base, FogMode::Disabled).unwrap(), base);
    }

    #[test]
    fn vertex_stage_gets_define_only() {
        let base = ProgramSource::stage(ShaderStage::Vertex, "void main() {}");
        let patched = patch_fog(&base, FogMode::Exp).unwrap();
        assert!(patched.contains("#define FOG_MODE 2"));
    }

    #[test]
    fn fragment_without_hook_fails() {
        let base = ProgramSource::linked("void main() {}", "void main() {}");
        let err = patch_fog(&base, FogMode::Linear).unwrap_err();
        assert!(matches!(err, ShaderError::FogPatch(_)), "got {err:?}");
    }

    #[test]
    fn fragment_with_hook_is_patched() {
        let base = ProgramSource::linked("void main() {}", "void main() {\n#pragma fog\n}");
        let patched = patch_fog(&base, FogMode::Exp2).unwrap();
        match patched {
            ProgramSource::Linked { vertex, fragment } => {
                assert!(vertex.starts_with("#define FOG_MODE 3"));
                assert!(fragment.starts_with("#define FOG_MODE 3"));
            }
            other => panic!("expected linked source, got {other:?}"),
        }
    }

    #[test]
    fn slot_indices_are_dense() {
        for (i, mode) in FogMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }
}
