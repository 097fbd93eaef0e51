//! GL context wrapper with capability detection.
//!
//! `GpuContext` wraps a `glow::Context` and translates the driver's limits
//! into [`Capabilities`] once at initialization. Core and ES profiles have
//! no fixed-function pipeline and no separable stage programs, so those
//! paths are reported unsupported and the device never takes them.

use crate::backend::Capabilities;

/// Requires GL 3.3 / ES 3.0 for framebuffer blits, multisample render
/// buffers and multiple draw buffers.
const MIN_VERSION: (u32, u32) = (3, 0);

pub struct GpuContext {
    gl: glow::Context,
    capabilities: Capabilities,
    supports_color_buffer_float: bool,
}

impl GpuContext {
    /// Wraps `gl` and queries its limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the context is older than GL 3 / ES 3.
    #[allow(unsafe_code)]
    pub fn new(gl: glow::Context) -> Result<Self, String> {
        use glow::HasContext;

        let version = gl.version();
        if (version.major, version.minor) < MIN_VERSION {
            return Err(format!(
                "GL {}.{} is too old, need at least {}.{}",
                version.major, version.minor, MIN_VERSION.0, MIN_VERSION.1
            ));
        }
        let embedded = version.is_embedded;
        let extensions = gl.supported_extensions();
        let supports_color_buffer_float = !embedded
            || extensions.contains("EXT_color_buffer_float")
            || extensions.contains("GL_EXT_color_buffer_float");

        // SAFETY: integer queries on a live context with valid enums.
        let (units, vertex_units, attachments, draw_buffers, samples) = unsafe {
            (
                gl.get_parameter_i32(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
                gl.get_parameter_i32(glow::MAX_VERTEX_TEXTURE_IMAGE_UNITS),
                gl.get_parameter_i32(glow::MAX_COLOR_ATTACHMENTS),
                gl.get_parameter_i32(glow::MAX_DRAW_BUFFERS),
                gl.get_parameter_i32(glow::MAX_SAMPLES),
            )
        };

        let capabilities = capabilities_from_limits(
            GlLimits {
                texture_units: units,
                vertex_texture_units: vertex_units,
                color_attachments: attachments.min(draw_buffers),
                samples,
            },
            embedded,
        );
        log::debug!(
            "GL {}.{}{}: {} texture units ({} vertex), {} color attachments, {}x MSAA",
            version.major,
            version.minor,
            if embedded { " ES" } else { "" },
            capabilities.max_texture_units,
            capabilities.max_vertex_texture_units,
            capabilities.max_color_attachments,
            capabilities.max_samples
        );

        Ok(Self {
            gl,
            capabilities,
            supports_color_buffer_float,
        })
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Whether half-float color surfaces can be rendered to.
    pub fn supports_color_buffer_float(&self) -> bool {
        self.supports_color_buffer_float
    }

    pub(crate) fn into_parts(self) -> (glow::Context, Capabilities, bool) {
        (self.gl, self.capabilities, self.supports_color_buffer_float)
    }
}

/// Raw driver limits, as queried.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GlLimits {
    pub texture_units: i32,
    pub vertex_texture_units: i32,
    pub color_attachments: i32,
    pub samples: i32,
}

/// Fixed units at most; the snapshot allocates one entry per unit.
const MAX_TRACKED_UNITS: usize = 32;

pub(crate) fn capabilities_from_limits(limits: GlLimits, embedded: bool) -> Capabilities {
    let units = usize::try_from(limits.texture_units)
        .unwrap_or(0)
        .clamp(1, MAX_TRACKED_UNITS);
    let vertex_units = usize::try_from(limits.vertex_texture_units)
        .unwrap_or(0)
        .min(units / 2);
    Capabilities {
        max_texture_units: units,
        max_vertex_texture_units: vertex_units,
        max_lights: 0,
        max_color_attachments: usize::try_from(limits.color_attachments)
            .unwrap_or(1)
            .max(1),
        max_samples: u8::try_from(limits.samples.max(1)).unwrap_or(u8::MAX),
        fixed_function: false,
        alpha_test: false,
        per_stage_programs: false,
        linked_programs: true,
        separate_alpha_blend: true,
        blend_ops: true,
        two_sided_stencil: true,
        wireframe: !embedded,
        dot3_combiner: false,
        multisample_resolve: true,
        mip_generation: true,
    }
}
