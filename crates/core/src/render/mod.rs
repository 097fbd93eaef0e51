//! OpenGL backend.
//!
//! This module is only available when the `render` feature is enabled.
//! It turns the device's backend calls into `glow` calls on a GL 3 / ES 3
//! context.
//!
//! # Module overview
//!
//! - [`context`] -- GPU context wrapper with capability detection.
//! - [`convert`] -- Mappings from cache enums to GL enums.
//! - [`gl`] -- The [`GlBackend`] itself.
//! - [`shader`] -- Shader compilation, linking, and error formatting.
//! - [`texture`] -- Surface texture and render-buffer allocation.

pub mod context;
pub mod convert;
pub mod gl;
pub mod shader;
pub mod texture;

pub use context::GpuContext;
pub use gl::GlBackend;
pub use shader::{compile_source, format_shader_error};
