//! Depth test and depth write.

use super::types::CompareFunc;
use super::StateDescriptor;
use crate::backend::Capabilities;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthDesc {
    pub func: CompareFunc,
    pub write: bool,
}

impl Default for DepthDesc {
    fn default() -> Self {
        Self {
            func: CompareFunc::LessEqual,
            write: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// The test must stay enabled whenever depth is written.
    pub test_enabled: bool,
    pub func: CompareFunc,
    pub write: bool,
}

impl StateDescriptor for DepthDesc {
    type Key = DepthDesc;
    type Compiled = DepthState;
    const NAME: &'static str = "depth state";

    fn key(&self) -> DepthDesc {
        self.clone()
    }

    fn compile(&self, _caps: &Capabilities) -> DepthState {
        DepthState {
            test_enabled: self.func != CompareFunc::Always || self.write,
            func: self.func,
            write: self.write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_without_write_disables_test() {
        let state = DepthDesc {
            func: CompareFunc::Always,
            write: false,
        }
        .compile(&Capabilities::full());
        assert!(!state.test_enabled);
    }

    #[test]
    fn always_with_write_keeps_test_enabled() {
        let state = DepthDesc {
            func: CompareFunc::Always,
            write: true,
        }
        .compile(&Capabilities::full());
        assert!(state.test_enabled, "writes are dropped while the test is disabled");
    }

    #[test]
    fn default_is_less_equal_with_write() {
        let desc = DepthDesc::default();
        assert_eq!(desc.func, CompareFunc::LessEqual);
        assert!(desc.write);
    }
}
