//! Stencil test, per-face functions and operations.

use super::types::{CompareFunc, StencilOp};
use super::StateDescriptor;
use crate::backend::Capabilities;
use serde::{Deserialize, Serialize};

/// Function and operations for one polygon face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilFaceDesc {
    pub func: CompareFunc,
    pub fail: StencilOp,
    pub depth_fail: StencilOp,
    pub pass: StencilOp,
}

impl Default for StencilFaceDesc {
    fn default() -> Self {
        Self {
            func: CompareFunc::Always,
            fail: StencilOp::Keep,
            depth_fail: StencilOp::Keep,
            pass: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct StencilDesc {
    pub enabled: bool,
    pub read_mask: u8,
    pub write_mask: u8,
    pub front: StencilFaceDesc,
    pub back: StencilFaceDesc,
}

impl Default for StencilDesc {
    fn default() -> Self {
        Self {
            enabled: false,
            read_mask: 0xFF,
            write_mask: 0xFF,
            front: StencilFaceDesc::default(),
            back: StencilFaceDesc::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    pub enabled: bool,
    pub read_mask: u8,
    pub write_mask: u8,
    pub front: StencilFaceDesc,
    pub back: StencilFaceDesc,
}

impl StateDescriptor for StencilDesc {
    type Key = StencilDesc;
    type Compiled = StencilState;
    const NAME: &'static str = "stencil state";

    fn key(&self) -> StencilDesc {
        self.clone()
    }

    fn compile(&self, caps: &Capabilities) -> StencilState {
        let back = if caps.two_sided_stencil {
            self.back
        } else {
            if self.enabled && self.back != self.front {
                log::debug!("two-sided stencil unsupported; back face follows front");
            }
            self.front
        };

        StencilState {
            enabled: self.enabled,
            read_mask: self.read_mask,
            write_mask: self.write_mask,
            front: self.front,
            back,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_sided_hardware_copies_front_to_back() {
        let mut caps = Capabilities::full();
        caps.two_sided_stencil = false;
        let desc = StencilDesc {
            enabled: true,
            back: StencilFaceDesc {
                pass: StencilOp::DecrementWrap,
                ..StencilFaceDesc::default()
            },
            front: StencilFaceDesc {
                pass: StencilOp::IncrementWrap,
                ..StencilFaceDesc::default()
            },
            ..StencilDesc::default()
        };
        let state = desc.compile(&caps);
        assert_eq!(state.back.pass, StencilOp::IncrementWrap);
    }

    #[test]
    fn two_sided_hardware_keeps_back_face() {
        let desc = StencilDesc {
            enabled: true,
            back: StencilFaceDesc {
                pass: StencilOp::DecrementWrap,
                ..StencilFaceDesc::default()
            },
            ..StencilDesc::default()
        };
        let state = desc.compile(&Capabilities::full());
        assert_eq!(state.back.pass, StencilOp::DecrementWrap);
    }

    #[test]
    fn default_masks_are_full() {
        let desc = StencilDesc::default();
        assert_eq!(desc.read_mask, 0xFF);
        assert_eq!(desc.write_mask, 0xFF);
        assert!(!desc.enabled);
    }
}
