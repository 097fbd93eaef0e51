//! Shader programs: sources, fog variants, parameter blocks and the
//! registry of logical shaders.
//!
//! A logical shader ([`ShaderId`]) owns a [`ProgramFamily`] of up to four
//! compiled variants, one per [`FogMode`]. Binding resolves the variant for
//! the current fog mode into a [`ProgramBinding`], which the device diffs
//! against its per-stage snapshot.

pub mod binding;
pub mod family;
pub mod fog;
pub mod params;
pub mod registry;
pub mod source;
pub mod value_cache;

pub use binding::{ProgramBinding, Strategy};
pub use family::ProgramFamily;
pub use fog::{patch_fog, FogMode, FogParams, FOG_HOOK};
pub use params::{ParamBlock, ParamDesc, ParamKind, ParamValue};
pub use registry::{ProgramRegistry, ShaderId};
pub use source::{ProgramSource, ShaderStage};
pub use value_cache::{StageValueCache, ValueCache};
