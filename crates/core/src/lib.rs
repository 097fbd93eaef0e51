#![deny(unsafe_code)]
//! Render-state cache for a shader-based graphics device.
//!
//! Provides [`DeviceStateCache`], which sits in front of a [`Backend`] and
//! issues only the state changes that differ from what the backend already
//! holds: interned blend/depth/stencil/raster state objects, texture units,
//! shader programs with fog variants and parameter blocks, render surfaces
//! with multisample resolve, and fixed-function lighting and transforms.
//!
//! [`RecordingBackend`] records every call as a value and is what tests and
//! the CLI replay against. The `render` feature adds an OpenGL backend.

pub mod backend;
pub mod channels;
pub mod config;
pub mod device;
pub mod error;
pub mod lazy;
pub mod program;
pub mod state;
pub mod target;
pub mod texture_map;

#[cfg(feature = "render")]
pub mod render;

pub use backend::{Backend, Call, Capabilities, ClearFlags, RecordingBackend, Topology};
pub use channels::{ChannelAssigns, ShaderChannel, VertexSlot};
pub use config::{DeviceConfig, Workarounds};
pub use device::{DeviceStateCache, FrameStats, Snapshot, Tracked};
pub use error::{DeviceError, ShaderError};
pub use program::{
    FogMode, FogParams, ParamBlock, ParamDesc, ParamKind, ProgramSource, ShaderId, ShaderStage,
};
pub use state::{BlendDesc, DepthDesc, RasterDesc, StencilDesc};
pub use target::{SurfaceDesc, SurfaceFormat, SurfaceId};
pub use texture_map::{TextureDimension, TextureId};
