//! A backend that records every call as a value.
//!
//! Nothing is rendered. Handles are allocated from a counter, compiles
//! succeed unless a failure filter says otherwise, and queued errors can be
//! injected to exercise the debug error drain. Tests assert on
//! [`RecordingBackend::calls`]; the CLI summarizes them.

use super::{
    Attachment, Backend, BlitMask, Capabilities, ClearFlags, FramebufferTarget, NativeProgram,
    NativeRenderBuffer, NativeTexture, Topology,
};
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
use crate::target::surface::SurfaceDesc;
use crate::texture_map::TextureDimension;
use glam::{Mat4, Vec4};
use std::ops::Range;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetEnabled(Toggle, bool),
    BlendFunc(BlendFactors),
    BlendEquation(BlendOp, BlendOp),
    AlphaFunc(CompareFunc, f32),
    ColorMask(ColorMask),
    DepthFunc(CompareFunc),
    DepthMask(bool),
    StencilFunc {
        face: Face,
        func: CompareFunc,
        reference: u8,
        read_mask: u8,
    },
    StencilOp {
        face: Face,
        fail: StencilOp,
        depth_fail: StencilOp,
        pass: StencilOp,
    },
    StencilWriteMask(u8),
    PolygonMode(FillMode),
    PolygonOffset { factor: f32, units: f32 },
    CullFace(Face),
    Viewport(Rect),
    Scissor(Rect),
    CreateTexture(NativeTexture),
    DeleteTexture(NativeTexture),
    BindTexture {
        unit: usize,
        dim: TextureDimension,
        texture: Option<NativeTexture>,
    },
    TextureLodBias { unit: usize, bias: f32 },
    TextureCombiner { unit: usize, combiner: TextureCombiner },
    TextureConstantColor { unit: usize, color: Vec4 },
    TexGen { unit: usize, mode: TexGenMode },
    SetLight { index: usize, light: Option<Light> },
    SetFog(FogParams),
    LoadMatrix(MatrixMode, Mat4),
    CompileProgram(NativeProgram),
    CompileFailed,
    DeleteProgram(NativeProgram),
    EnableStage(ShaderStage, bool),
    BindStageProgram(ShaderStage, NativeProgram),
    UseLinkedProgram(Option<NativeProgram>),
    UploadParam {
        stage: ShaderStage,
        index: u32,
        value: ParamValue,
    },
    CreateSurfaceTexture(NativeTexture),
    CreateRenderBuffer(NativeRenderBuffer),
    DeleteRenderBuffer(NativeRenderBuffer),
    BindFramebuffer(FramebufferTarget),
    AttachColor {
        slot: usize,
        attachment: Option<Attachment>,
    },
    AttachDepth(Option<Attachment>),
    DrawBufferCount(usize),
    GenerateMips(NativeTexture),
    BeginResolve { src: Attachment, dst: Attachment },
    Blit {
        mask: BlitMask,
        width: u32,
        height: u32,
    },
    EndResolve,
    SetVertexInputs(ChannelAssigns),
    DrawIndexed {
        topology: Topology,
        index_count: usize,
        vertices: Range<u32>,
    },
    DrawImmediate {
        topology: Topology,
        vertex_count: usize,
    },
    Clear {
        flags: ClearFlags,
        color: Vec4,
        depth: f32,
        stencil: u8,
    },
}

impl Call {
    /// Short stable name of the call kind, used for summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Call::SetEnabled(..) => "set_enabled",
            Call::BlendFunc(_) => "blend_func",
            Call::BlendEquation(..) => "blend_equation",
            Call::AlphaFunc(..) => "alpha_func",
            Call::ColorMask(_) => "color_mask",
            Call::DepthFunc(_) => "depth_func",
            Call::DepthMask(_) => "depth_mask",
            Call::StencilFunc { .. } => "stencil_func",
            Call::StencilOp { .. } => "stencil_op",
            Call::StencilWriteMask(_) => "stencil_write_mask",
            Call::PolygonMode(_) => "polygon_mode",
            Call::PolygonOffset { .. } => "polygon_offset",
            Call::CullFace(_) => "cull_face",
            Call::Viewport(_) => "viewport",
            Call::Scissor(_) => "scissor",
            Call::CreateTexture(_) => "create_texture",
            Call::DeleteTexture(_) => "delete_texture",
            Call::BindTexture { .. } => "bind_texture",
            Call::TextureLodBias { .. } => "texture_lod_bias",
            Call::TextureCombiner { .. } => "texture_combiner",
            Call::TextureConstantColor { .. } => "texture_constant_color",
            Call::TexGen { .. } => "tex_gen",
            Call::SetLight { .. } => "set_light",
            Call::SetFog(_) => "set_fog",
            Call::LoadMatrix(..) => "load_matrix",
            Call::CompileProgram(_) => "compile_program",
            Call::CompileFailed => "compile_failed",
            Call::DeleteProgram(_) => "delete_program",
            Call::EnableStage(..) => "enable_stage",
            Call::BindStageProgram(..) => "bind_stage_program",
            Call::UseLinkedProgram(_) => "use_linked_program",
            Call::UploadParam { .. } => "upload_param",
            Call::CreateSurfaceTexture(_) => "create_surface_texture",
            Call::CreateRenderBuffer(_) => "create_render_buffer",
            Call::DeleteRenderBuffer(_) => "delete_render_buffer",
            Call::BindFramebuffer(_) => "bind_framebuffer",
            Call::AttachColor { .. } => "attach_color",
            Call::AttachDepth(_) => "attach_depth",
            Call::DrawBufferCount(_) => "draw_buffer_count",
            Call::GenerateMips(_) => "generate_mips",
            Call::BeginResolve { .. } => "begin_resolve",
            Call::Blit { .. } => "blit",
            Call::EndResolve => "end_resolve",
            Call::SetVertexInputs(_) => "set_vertex_inputs",
            Call::DrawIndexed { .. } => "draw_indexed",
            Call::DrawImmediate { .. } => "draw_immediate",
            Call::Clear { .. } => "clear",
        }
    }

    /// True for calls that attach or detach render-target surfaces.
    pub fn is_attachment(&self) -> bool {
        matches!(
            self,
            Call::BindFramebuffer(_)
                | Call::AttachColor { .. }
                | Call::AttachDepth(_)
                | Call::DrawBufferCount(_)
        )
    }
}

type CompileFilter = Box<dyn Fn(&ProgramSource) -> bool + Send>;

/// Backend that records calls instead of issuing them.
pub struct RecordingBackend {
    caps: Capabilities,
    calls: Vec<Call>,
    next_handle: u32,
    fail_compile: Option<CompileFilter>,
    fail_texture_creation: bool,
    queued_errors: Vec<String>,
}

impl RecordingBackend {
    pub fn new(caps: Capabilities) -> Self {
        Self {
            caps,
            calls: Vec::new(),
            next_handle: 1,
            fail_compile: None,
            fail_texture_creation: false,
            queued_errors: Vec::new(),
        }
    }

    /// Every call recorded since creation or the last [`RecordingBackend::take_calls`].
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Returns and forgets the recorded calls.
    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Makes every compile whose source satisfies `filter` fail.
    pub fn fail_compiles_when(&mut self, filter: impl Fn(&ProgramSource) -> bool + Send + 'static) {
        self.fail_compile = Some(Box::new(filter));
    }

    /// Makes texture creation fail from now on.
    pub fn fail_texture_creation(&mut self, fail: bool) {
        self.fail_texture_creation = fail;
    }

    /// Queues an error to be returned by the next drain.
    pub fn queue_error(&mut self, message: impl Into<String>) {
        self.queued_errors.push(message.into());
    }

    fn next(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(Capabilities::full())
    }
}

impl Backend for RecordingBackend {
    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn set_enabled(&mut self, toggle: Toggle, enabled: bool) {
        self.calls.push(Call::SetEnabled(toggle, enabled));
    }

    fn blend_func(&mut self, factors: BlendFactors) {
        self.calls.push(Call::BlendFunc(factors));
    }

    fn blend_equation(&mut self, rgb: BlendOp, alpha: BlendOp) {
        self.calls.push(Call::BlendEquation(rgb, alpha));
    }

    fn alpha_func(&mut self, func: CompareFunc, reference: f32) {
        self.calls.push(Call::AlphaFunc(func, reference));
    }

    fn color_mask(&mut self, mask: ColorMask) {
        self.calls.push(Call::ColorMask(mask));
    }

    fn depth_func(&mut self, func: CompareFunc) {
        self.calls.push(Call::DepthFunc(func));
    }

    fn depth_mask(&mut self, write: bool) {
        self.calls.push(Call::DepthMask(write));
    }

    fn stencil_func(&mut self, face: Face, func: CompareFunc, reference: u8, read_mask: u8) {
        self.calls.push(Call::StencilFunc {
            face,
            func,
            reference,
            read_mask,
        });
    }

    fn stencil_op(&mut self, face: Face, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.calls.push(Call::StencilOp {
            face,
            fail,
            depth_fail,
            pass,
        });
    }

    fn stencil_write_mask(&mut self, mask: u8) {
        self.calls.push(Call::StencilWriteMask(mask));
    }

    fn polygon_mode(&mut self, mode: FillMode) {
        self.calls.push(Call::PolygonMode(mode));
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        self.calls.push(Call::PolygonOffset { factor, units });
    }

    fn cull_face(&mut self, face: Face) {
        self.calls.push(Call::CullFace(face));
    }

    fn viewport(&mut self, rect: Rect) {
        self.calls.push(Call::Viewport(rect));
    }

    fn scissor(&mut self, rect: Rect) {
        self.calls.push(Call::Scissor(rect));
    }

    fn create_texture(&mut self, _dim: TextureDimension) -> Result<NativeTexture, String> {
        if self.fail_texture_creation {
            return Err("texture creation disabled".to_string());
        }
        let texture = NativeTexture(self.next());
        self.calls.push(Call::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: NativeTexture) {
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: usize, dim: TextureDimension, texture: Option<NativeTexture>) {
        self.calls.push(Call::BindTexture { unit, dim, texture });
    }

    fn texture_lod_bias(&mut self, unit: usize, _dim: TextureDimension, bias: f32) {
        self.calls.push(Call::TextureLodBias { unit, bias });
    }

    fn texture_combiner(&mut self, unit: usize, combiner: &TextureCombiner) {
        self.calls.push(Call::TextureCombiner {
            unit,
            combiner: *combiner,
        });
    }

    fn texture_constant_color(&mut self, unit: usize, color: Vec4) {
        self.calls.push(Call::TextureConstantColor { unit, color });
    }

    fn tex_gen(&mut self, unit: usize, mode: TexGenMode) {
        self.calls.push(Call::TexGen { unit, mode });
    }

    fn set_light(&mut self, index: usize, light: Option<&Light>) {
        self.calls.push(Call::SetLight {
            index,
            light: light.copied(),
        });
    }

    fn set_fog(&mut self, fog: &FogParams) {
        self.calls.push(Call::SetFog(*fog));
    }

    fn load_matrix(&mut self, mode: MatrixMode, matrix: &Mat4) {
        self.calls.push(Call::LoadMatrix(mode, *matrix));
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<NativeProgram, ShaderError> {
        if self.fail_compile.as_ref().is_some_and(|f| f(source)) {
            self.calls.push(Call::CompileFailed);
            return Err(ShaderError::CompileError {
                stage: source.stage_name().to_string(),
                log: "rejected by recording backend".to_string(),
            });
        }
        let program = NativeProgram(self.next());
        self.calls.push(Call::CompileProgram(program));
        Ok(program)
    }

    fn delete_program(&mut self, program: NativeProgram) {
        self.calls.push(Call::DeleteProgram(program));
    }

    fn enable_stage(&mut self, stage: ShaderStage, enabled: bool) {
        self.calls.push(Call::EnableStage(stage, enabled));
    }

    fn bind_stage_program(&mut self, stage: ShaderStage, program: NativeProgram) {
        self.calls.push(Call::BindStageProgram(stage, program));
    }

    fn use_linked_program(&mut self, program: Option<NativeProgram>) {
        self.calls.push(Call::UseLinkedProgram(program));
    }

    fn upload_param(&mut self, stage: ShaderStage, param: &ParamDesc, value: &ParamValue) {
        self.calls.push(Call::UploadParam {
            stage,
            index: param.index,
            value: *value,
        });
    }

    fn create_surface_texture(&mut self, _desc: &SurfaceDesc) -> Result<NativeTexture, String> {
        if self.fail_texture_creation {
            return Err("texture creation disabled".to_string());
        }
        let texture = NativeTexture(self.next());
        self.calls.push(Call::CreateSurfaceTexture(texture));
        Ok(texture)
    }

    fn create_render_buffer(&mut self, _desc: &SurfaceDesc) -> Result<NativeRenderBuffer, String> {
        let buffer = NativeRenderBuffer(self.next());
        self.calls.push(Call::CreateRenderBuffer(buffer));
        Ok(buffer)
    }

    fn delete_render_buffer(&mut self, buffer: NativeRenderBuffer) {
        self.calls.push(Call::DeleteRenderBuffer(buffer));
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        self.calls.push(Call::BindFramebuffer(target));
    }

    fn attach_color(&mut self, slot: usize, attachment: Option<Attachment>) {
        self.calls.push(Call::AttachColor { slot, attachment });
    }

    fn attach_depth(&mut self, attachment: Option<Attachment>) {
        self.calls.push(Call::AttachDepth(attachment));
    }

    fn set_draw_buffer_count(&mut self, count: usize) {
        self.calls.push(Call::DrawBufferCount(count));
    }

    fn generate_mips(&mut self, texture: NativeTexture, _dim: TextureDimension) {
        self.calls.push(Call::GenerateMips(texture));
    }

    fn begin_resolve(&mut self, src: Attachment, dst: Attachment) {
        self.calls.push(Call::BeginResolve { src, dst });
    }

    fn blit(&mut self, mask: BlitMask, width: u32, height: u32) {
        self.calls.push(Call::Blit {
            mask,
            width,
            height,
        });
    }

    fn end_resolve(&mut self) {
        self.calls.push(Call::EndResolve);
    }

    fn set_vertex_inputs(&mut self, channels: &ChannelAssigns) {
        self.calls.push(Call::SetVertexInputs(channels.clone()));
    }

    fn draw_indexed(&mut self, topology: Topology, indices: &[u16], vertices: Range<u32>) {
        self.calls.push(Call::DrawIndexed {
            topology,
            index_count: indices.len(),
            vertices,
        });
    }

    fn draw_immediate(&mut self, topology: Topology, vertices: &[ImmediateVertex]) {
        self.calls.push(Call::DrawImmediate {
            topology,
            vertex_count: vertices.len(),
        });
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32, stencil: u8) {
        self.calls.push(Call::Clear {
            flags,
            color,
            depth,
            stencil,
        });
    }

    fn drain_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.queued_errors)
    }
}
