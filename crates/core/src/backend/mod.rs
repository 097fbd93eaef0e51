//! The graphics-API seam.
//!
//! [`Backend`] is the stateful, side-effecting API the cache sits in front
//! of. Every method is a single state transition or resource operation; the
//! device decides *whether* to call it, the backend only *does* it.
//!
//! - [`recording`] -- records calls as values; used by tests and the CLI.
//! - `crate::render::GlBackend` (feature `render`) -- OpenGL via `glow`.

pub mod recording;

use crate::channels::ChannelAssigns;
use crate::device::fixed_function::{Light, MatrixMode, TexGenMode, TextureCombiner};
use crate::device::immediate::ImmediateVertex;
use crate::error::ShaderError;
use crate::program::fog::FogParams;
use crate::program::params::{ParamDesc, ParamValue};
use crate::program::source::{ProgramSource, ShaderStage};
use crate::state::{
    BlendFactors, BlendOp, ColorMask, CompareFunc, Face, FillMode, Rect, StencilOp, Toggle,
};
use crate::target::surface::{CubeFace, SurfaceDesc};
use crate::texture_map::TextureDimension;
use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub use recording::{Call, RecordingBackend};

/// Native texture object owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NativeTexture(pub u32);

/// Native compiled program (a single stage or a linked unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NativeProgram(pub u32);

/// Native texture-free render buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NativeRenderBuffer(pub u32);

/// What a render-target slot is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attachment {
    Texture {
        texture: NativeTexture,
        dim: TextureDimension,
        mip: u32,
        face: CubeFace,
    },
    Buffer(NativeRenderBuffer),
}

/// Which framebuffer subsequent attachments go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FramebufferTarget {
    BackBuffer,
    Offscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlitMask {
    Color,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    Triangles,
    TriangleStrip,
    Quads,
    Lines,
    LineStrip,
    Points,
}

impl Topology {
    /// Vertices per primitive for list topologies, `None` for strips.
    pub fn vertices_per_primitive(self) -> Option<usize> {
        match self {
            Topology::Triangles => Some(3),
            Topology::Quads => Some(4),
            Topology::Lines => Some(2),
            Topology::Points => Some(1),
            Topology::TriangleStrip | Topology::LineStrip => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearFlags {
    pub const ALL: ClearFlags = ClearFlags {
        color: true,
        depth: true,
        stencil: true,
    };
}

/// What the backend can do. The device filters every request against this
/// before any call is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub max_texture_units: usize,
    /// Units reserved for vertex-stage sampling, taken from the top of the
    /// unit range.
    pub max_vertex_texture_units: usize,
    pub max_lights: usize,
    pub max_color_attachments: usize,
    pub max_samples: u8,
    pub fixed_function: bool,
    pub alpha_test: bool,
    pub per_stage_programs: bool,
    pub linked_programs: bool,
    pub separate_alpha_blend: bool,
    pub blend_ops: bool,
    pub two_sided_stencil: bool,
    pub wireframe: bool,
    pub dot3_combiner: bool,
    pub multisample_resolve: bool,
    pub mip_generation: bool,
}

impl Capabilities {
    /// Everything supported; the shape tests and the CLI replay against.
    pub fn full() -> Self {
        Self {
            max_texture_units: 16,
            max_vertex_texture_units: 4,
            max_lights: 8,
            max_color_attachments: 4,
            max_samples: 8,
            fixed_function: true,
            alpha_test: true,
            per_stage_programs: true,
            linked_programs: true,
            separate_alpha_blend: true,
            blend_ops: true,
            two_sided_stencil: true,
            wireframe: true,
            dot3_combiner: true,
            multisample_resolve: true,
            mip_generation: true,
        }
    }

    /// A bare fixed-function device with a single color attachment.
    pub fn fixed_function_only() -> Self {
        Self {
            max_texture_units: 4,
            max_vertex_texture_units: 0,
            max_lights: 8,
            max_color_attachments: 1,
            max_samples: 1,
            fixed_function: true,
            alpha_test: true,
            per_stage_programs: false,
            linked_programs: false,
            separate_alpha_blend: false,
            blend_ops: false,
            two_sided_stencil: false,
            wireframe: true,
            dot3_combiner: false,
            multisample_resolve: false,
            mip_generation: false,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// The side-effecting graphics API.
///
/// Implementations must not cache anything themselves; redundancy
/// elimination is the device's job and tests count the calls made here.
pub trait Backend {
    fn capabilities(&self) -> &Capabilities;

    // -- Fixed pipeline state --

    fn set_enabled(&mut self, toggle: Toggle, enabled: bool);
    fn blend_func(&mut self, factors: BlendFactors);
    fn blend_equation(&mut self, rgb: BlendOp, alpha: BlendOp);
    fn alpha_func(&mut self, func: CompareFunc, reference: f32);
    fn color_mask(&mut self, mask: ColorMask);
    fn depth_func(&mut self, func: CompareFunc);
    fn depth_mask(&mut self, write: bool);
    fn stencil_func(&mut self, face: Face, func: CompareFunc, reference: u8, read_mask: u8);
    fn stencil_op(&mut self, face: Face, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);
    fn stencil_write_mask(&mut self, mask: u8);
    fn polygon_mode(&mut self, mode: FillMode);
    fn polygon_offset(&mut self, factor: f32, units: f32);
    fn cull_face(&mut self, face: Face);
    fn viewport(&mut self, rect: Rect);
    fn scissor(&mut self, rect: Rect);

    // -- Textures --

    fn create_texture(&mut self, dim: TextureDimension) -> Result<NativeTexture, String>;
    fn delete_texture(&mut self, texture: NativeTexture);
    fn bind_texture(&mut self, unit: usize, dim: TextureDimension, texture: Option<NativeTexture>);
    fn texture_lod_bias(&mut self, unit: usize, dim: TextureDimension, bias: f32);
    fn texture_combiner(&mut self, unit: usize, combiner: &TextureCombiner);
    fn texture_constant_color(&mut self, unit: usize, color: Vec4);
    fn tex_gen(&mut self, unit: usize, mode: TexGenMode);

    // -- Fixed-function lighting, fog and transforms --

    fn set_light(&mut self, index: usize, light: Option<&Light>);
    fn set_fog(&mut self, fog: &FogParams);
    fn load_matrix(&mut self, mode: MatrixMode, matrix: &Mat4);

    // -- Programs --

    fn compile_program(&mut self, source: &ProgramSource) -> Result<NativeProgram, ShaderError>;
    fn delete_program(&mut self, program: NativeProgram);
    fn enable_stage(&mut self, stage: ShaderStage, enabled: bool);
    fn bind_stage_program(&mut self, stage: ShaderStage, program: NativeProgram);
    fn use_linked_program(&mut self, program: Option<NativeProgram>);
    fn upload_param(&mut self, stage: ShaderStage, param: &ParamDesc, value: &ParamValue);

    // -- Render targets --

    fn create_surface_texture(&mut self, desc: &SurfaceDesc) -> Result<NativeTexture, String>;
    fn create_render_buffer(&mut self, desc: &SurfaceDesc) -> Result<NativeRenderBuffer, String>;
    fn delete_render_buffer(&mut self, buffer: NativeRenderBuffer);
    fn bind_framebuffer(&mut self, target: FramebufferTarget);
    fn attach_color(&mut self, slot: usize, attachment: Option<Attachment>);
    fn attach_depth(&mut self, attachment: Option<Attachment>);
    fn set_draw_buffer_count(&mut self, count: usize);
    fn generate_mips(&mut self, texture: NativeTexture, dim: TextureDimension);
    /// Binds a throwaway helper pair reading `src` and drawing into `dst`.
    fn begin_resolve(&mut self, src: Attachment, dst: Attachment);
    fn blit(&mut self, mask: BlitMask, width: u32, height: u32);
    /// Restores whatever framebuffer was bound before [`Backend::begin_resolve`].
    fn end_resolve(&mut self);

    // -- Drawing --

    fn set_vertex_inputs(&mut self, channels: &ChannelAssigns);
    fn draw_indexed(&mut self, topology: Topology, indices: &[u16], vertices: Range<u32>);
    fn draw_immediate(&mut self, topology: Topology, vertices: &[ImmediateVertex]);
    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32, stencil: u8);

    /// Pops every error the API queued since the last drain.
    fn drain_errors(&mut self) -> Vec<String>;
}
