//! Render targets: color and depth surfaces and their attachment lifecycle.

pub mod manager;
pub mod surface;

pub use manager::{ActiveTargets, RenderTargetManager};
pub use surface::{
    CubeFace, RenderSurface, SurfaceBacking, SurfaceDesc, SurfaceFormat, SurfaceId, SurfaceKind,
};
