//! What is bound to a pipeline stage.

use crate::backend::NativeProgram;
use serde::Serialize;

/// How a stage is currently driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramBinding {
    FixedFunction,
    /// An independently bindable single-stage program.
    PerStage(NativeProgram),
    /// A linked unit. Both stages report the same binding while it is active.
    Linked(NativeProgram),
}

/// Binding strategy, ignoring which program is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FixedFunction,
    PerStage,
    Linked,
}

impl ProgramBinding {
    pub fn strategy(self) -> Strategy {
        match self {
            ProgramBinding::FixedFunction => Strategy::FixedFunction,
            ProgramBinding::PerStage(_) => Strategy::PerStage,
            ProgramBinding::Linked(_) => Strategy::Linked,
        }
    }

    pub fn program(self) -> Option<NativeProgram> {
        match self {
            ProgramBinding::FixedFunction => None,
            ProgramBinding::PerStage(p) | ProgramBinding::Linked(p) => Some(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_ignores_program() {
        assert_eq!(
            ProgramBinding::Linked(NativeProgram(1)).strategy(),
            ProgramBinding::Linked(NativeProgram(2)).strategy()
        );
        assert_ne!(
            ProgramBinding::Linked(NativeProgram(1)).strategy(),
            ProgramBinding::PerStage(NativeProgram(1)).strategy()
        );
    }

    #[test]
    fn fixed_function_has_no_program() {
        assert_eq!(ProgramBinding::FixedFunction.program(), None);
        assert_eq!(
            ProgramBinding::PerStage(NativeProgram(4)).program(),
            Some(NativeProgram(4))
        );
    }
}
