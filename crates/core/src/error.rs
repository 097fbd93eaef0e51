//! Error types for the state cache.

use thiserror::Error;

/// Recoverable errors produced by device operations and configuration.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A shader id was never registered, or its family was deleted.
    #[error("unknown shader id: {0}")]
    UnknownShader(u32),

    /// The mandatory fog-disabled variant of a shader failed to compile.
    #[error("shader {0} has no usable program")]
    ProgramUnavailable(u32),

    /// A single-stage shader was bound to the other pipeline stage.
    #[error("shader {shader} is a {expected} program")]
    StageMismatch { shader: u32, expected: &'static str },

    /// A render-surface id does not name a live surface.
    #[error("unknown render surface: {0}")]
    UnknownSurface(u32),

    /// A surface was used where a different kind of surface is required.
    #[error("surface {id} is not usable as {expected}")]
    SurfaceMismatch { id: u32, expected: &'static str },

    /// Width or height was zero when creating a surface.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// The backend refused to create a resource.
    #[error("backend error: {0}")]
    Backend(String),

    /// A configuration value had the wrong type or range.
    #[error("invalid config value for '{name}': {reason}")]
    InvalidConfig { name: String, reason: String },

    /// A scene script could not be parsed or referenced an undefined name.
    #[error("invalid scene script: {0}")]
    InvalidScript(String),
}

/// Errors that can occur during shader compilation or program linking.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The shader stage that failed (e.g. "vertex", "fragment").
        stage: String,
        /// The driver's info log describing the error.
        log: String,
    },
    /// A program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
    /// The backend cannot compile this kind of program at all.
    #[error("unsupported program kind: {0}")]
    Unsupported(&'static str),
    /// The fog variant could not be derived from the base source.
    #[error("fog patch failed: {0}")]
    FogPatch(String),
}
