//! OpenGL implementation of [`Backend`] over `glow`.
//!
//! Native handles handed to the device are small integers mapped onto
//! `glow` objects here, so the rest of the crate never sees a GL type.
//! The backend keeps no redundancy cache of its own. What it does track
//! (the linked program in use, uniform locations, scratch framebuffers) is
//! what GL needs to carry out a single call.

use super::context::GpuContext;
use super::convert;
use super::shader::compile_source;
use super::texture::{create_render_buffer, create_surface_texture};
use crate::backend::{
    Attachment, Backend, BlitMask, Capabilities, ClearFlags, FramebufferTarget, NativeProgram,
    NativeRenderBuffer, NativeTexture, Topology,
};
use crate::channels::{ChannelAssigns, VertexSlot};
use crate::device::{ImmediateVertex, Light, MatrixMode, TexGenMode, TextureCombiner};
use crate::error::ShaderError;
use crate::program::{FogParams, ParamDesc, ParamValue, ProgramSource, ShaderStage};
use crate::state::{
    BlendFactors, BlendOp, ColorMask, CompareFunc, Face, FillMode, Rect, StencilOp, Toggle,
};
use crate::target::{SurfaceDesc, SurfaceFormat, SurfaceKind};
use crate::texture_map::TextureDimension;
use glam::{Mat4, Vec4};
use glow::HasContext;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

const MAX_ATTRIBUTES: u32 = 16;
/// Floats per immediate vertex: position, normal, color, texture coordinate.
const IMMEDIATE_STRIDE: usize = 12;

/// Integer handles over `glow` objects.
#[derive(Debug)]
struct HandleTable<T> {
    entries: BTreeMap<u32, T>,
    next: u32,
}

impl<T> HandleTable<T> {
    fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next: 1,
        }
    }

    fn insert(&mut self, value: T) -> u32 {
        let handle = self.next;
        self.next += 1;
        self.entries.insert(handle, value);
        handle
    }

    fn get(&self, handle: u32) -> Option<&T> {
        self.entries.get(&handle)
    }

    fn get_mut(&mut self, handle: u32) -> Option<&mut T> {
        self.entries.get_mut(&handle)
    }

    fn remove(&mut self, handle: u32) -> Option<T> {
        self.entries.remove(&handle)
    }

    fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        std::mem::take(&mut self.entries).into_values()
    }
}

struct GlTexture {
    raw: glow::Texture,
    /// Bind target; surface textures may be multisampled.
    target: u32,
    /// Set for render-surface textures.
    format: Option<SurfaceFormat>,
}

struct GlProgram {
    raw: glow::Program,
    uniforms: HashMap<String, Option<glow::UniformLocation>>,
}

struct GlRenderBuffer {
    raw: glow::Renderbuffer,
    format: SurfaceFormat,
}

/// Where a resolve stands. `F` is the framebuffer handle type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResolveState<F> {
    Idle,
    /// Helper framebuffers bound; `read`/`draw` are restored when it ends.
    Active { read: Option<F>, draw: Option<F> },
    /// Helper framebuffers are unavailable; the blit is skipped.
    Failed,
}

impl<F> ResolveState<F> {
    fn can_blit(&self) -> bool {
        matches!(self, ResolveState::Active { .. })
    }
}

/// A [`Backend`] issuing real GL calls.
pub struct GlBackend {
    gl: glow::Context,
    caps: Capabilities,
    color_buffer_float: bool,
    textures: HandleTable<GlTexture>,
    programs: HandleTable<GlProgram>,
    render_buffers: HandleTable<GlRenderBuffer>,
    vertex_array: glow::VertexArray,
    index_buffer: Option<glow::Buffer>,
    immediate_buffer: Option<glow::Buffer>,
    offscreen: Option<glow::Framebuffer>,
    resolve_pair: Option<(glow::Framebuffer, glow::Framebuffer)>,
    resolve: ResolveState<glow::Framebuffer>,
    current_program: Option<u32>,
}

impl GlBackend {
    /// Takes over `context`. A vertex array object is created and left
    /// bound for the backend's lifetime, as core profiles require one.
    ///
    /// # Errors
    ///
    /// Returns the driver's message if the vertex array cannot be created.
    #[allow(unsafe_code)]
    pub fn new(context: GpuContext) -> Result<Self, String> {
        let (gl, caps, color_buffer_float) = context.into_parts();
        // SAFETY: a fresh vertex array on a live context.
        let vertex_array = unsafe {
            let vao = gl.create_vertex_array()?;
            gl.bind_vertex_array(Some(vao));
            vao
        };
        Ok(Self {
            gl,
            caps,
            color_buffer_float,
            textures: HandleTable::new(),
            programs: HandleTable::new(),
            render_buffers: HandleTable::new(),
            vertex_array,
            index_buffer: None,
            immediate_buffer: None,
            offscreen: None,
            resolve_pair: None,
            resolve: ResolveState::Idle,
            current_program: None,
        })
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Deletes every object the backend created and hands the context back.
    #[allow(unsafe_code)]
    pub fn destroy(mut self) -> glow::Context {
        // SAFETY: every handle below was created by this backend on this
        // context and is deleted exactly once.
        unsafe {
            for texture in self.textures.drain() {
                self.gl.delete_texture(texture.raw);
            }
            for program in self.programs.drain() {
                self.gl.delete_program(program.raw);
            }
            for buffer in self.render_buffers.drain() {
                self.gl.delete_renderbuffer(buffer.raw);
            }
            for buffer in [self.index_buffer.take(), self.immediate_buffer.take()]
                .into_iter()
                .flatten()
            {
                self.gl.delete_buffer(buffer);
            }
            if let Some(fbo) = self.offscreen.take() {
                self.gl.delete_framebuffer(fbo);
            }
            if let Some((read, draw)) = self.resolve_pair.take() {
                self.gl.delete_framebuffer(read);
                self.gl.delete_framebuffer(draw);
            }
            self.gl.delete_vertex_array(self.vertex_array);
        }
        self.gl
    }

    fn raw_texture(&self, texture: NativeTexture) -> Option<&GlTexture> {
        let found = self.textures.get(texture.0);
        if found.is_none() {
            log::warn!("unknown texture handle {}", texture.0);
        }
        found
    }

    fn attachment_format(&self, attachment: Attachment) -> Option<SurfaceFormat> {
        match attachment {
            Attachment::Texture { texture, .. } => self.textures.get(texture.0)?.format,
            Attachment::Buffer(buffer) => Some(self.render_buffers.get(buffer.0)?.format),
        }
    }

    /// Attachment point `attachment` occupies when it is the slot-0 target.
    fn attachment_point(&self, attachment: Attachment) -> u32 {
        match self.attachment_format(attachment) {
            Some(format) if format.kind() == SurfaceKind::Depth => {
                convert::depth_attachment_point(format)
            }
            _ => glow::COLOR_ATTACHMENT0,
        }
    }

    #[allow(unsafe_code)]
    fn attach(&self, framebuffer: u32, point: u32, attachment: Option<Attachment>) {
        // SAFETY: handles come from this backend's tables; a missing handle
        // detaches instead.
        unsafe {
            match attachment {
                Some(Attachment::Texture {
                    texture,
                    dim,
                    mip,
                    face,
                }) => {
                    let Some(tex) = self.raw_texture(texture) else {
                        return;
                    };
                    let level = mip as i32;
                    match dim {
                        TextureDimension::Cube => self.gl.framebuffer_texture_2d(
                            framebuffer,
                            point,
                            convert::cube_face(face),
                            Some(tex.raw),
                            level,
                        ),
                        TextureDimension::Tex3D => {
                            self.gl
                                .framebuffer_texture_layer(framebuffer, point, Some(tex.raw), level, 0)
                        }
                        TextureDimension::Tex2D => self.gl.framebuffer_texture_2d(
                            framebuffer,
                            point,
                            tex.target,
                            Some(tex.raw),
                            level,
                        ),
                    }
                }
                Some(Attachment::Buffer(buffer)) => {
                    let raw = self.render_buffers.get(buffer.0).map(|b| b.raw);
                    if raw.is_none() {
                        log::warn!("unknown render buffer handle {}", buffer.0);
                    }
                    self.gl
                        .framebuffer_renderbuffer(framebuffer, point, glow::RENDERBUFFER, raw);
                }
                None => {
                    self.gl
                        .framebuffer_renderbuffer(framebuffer, point, glow::RENDERBUFFER, None);
                }
            }
        }
    }

    /// Uploads `bytes` into the lazily created buffer in `slot`.
    #[allow(unsafe_code)]
    fn stream(gl: &glow::Context, slot: &mut Option<glow::Buffer>, target: u32, bytes: &[u8]) -> bool {
        // SAFETY: the buffer is created once on this context and re-filled
        // on every call.
        unsafe {
            let buffer = match *slot {
                Some(buffer) => buffer,
                None => match gl.create_buffer() {
                    Ok(buffer) => *slot.insert(buffer),
                    Err(reason) => {
                        log::error!("stream buffer creation failed: {reason}");
                        return false;
                    }
                },
            };
            gl.bind_buffer(target, Some(buffer));
            gl.buffer_data_u8_slice(target, bytes, glow::STREAM_DRAW);
        }
        true
    }
}

/// Interleaves immediate vertices as position, normal, color, texture
/// coordinate. Quads are expanded into triangle pairs.
pub fn immediate_floats(topology: Topology, vertices: &[ImmediateVertex]) -> Vec<f32> {
    let expanded: Vec<&ImmediateVertex> = if topology == Topology::Quads {
        vertices
            .chunks_exact(4)
            .flat_map(|q| [&q[0], &q[1], &q[2], &q[0], &q[2], &q[3]])
            .collect()
    } else {
        vertices.iter().collect()
    };
    let mut floats = Vec::with_capacity(expanded.len() * IMMEDIATE_STRIDE);
    for v in expanded {
        floats.extend_from_slice(&v.position.to_array());
        floats.extend_from_slice(&v.normal.to_array());
        floats.extend_from_slice(&v.color.to_array());
        floats.extend_from_slice(&v.tex_coord.to_array());
    }
    floats
}

fn as_bytes_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn as_bytes_u16(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

#[allow(unsafe_code)]
impl Backend for GlBackend {
    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn set_enabled(&mut self, toggle: Toggle, enabled: bool) {
        let Some(cap) = convert::toggle(toggle) else {
            log::debug!("{toggle:?} has no GL capability");
            return;
        };
        // SAFETY: valid capability enum on a live context.
        unsafe {
            if enabled {
                self.gl.enable(cap);
            } else {
                self.gl.disable(cap);
            }
        }
    }

    fn blend_func(&mut self, factors: BlendFactors) {
        // SAFETY: enums come from the exhaustive conversion table.
        unsafe {
            self.gl.blend_func_separate(
                convert::blend_factor(factors.src_rgb),
                convert::blend_factor(factors.dst_rgb),
                convert::blend_factor(factors.src_alpha),
                convert::blend_factor(factors.dst_alpha),
            );
        }
    }

    fn blend_equation(&mut self, rgb: BlendOp, alpha: BlendOp) {
        // SAFETY: enums come from the exhaustive conversion table.
        unsafe {
            self.gl
                .blend_equation_separate(convert::blend_op(rgb), convert::blend_op(alpha));
        }
    }

    fn alpha_func(&mut self, func: CompareFunc, _reference: f32) {
        log::debug!("alpha test {func:?} ignored: not available in core profiles");
    }

    fn color_mask(&mut self, mask: ColorMask) {
        // SAFETY: plain state call.
        unsafe {
            self.gl
                .color_mask(mask.red(), mask.green(), mask.blue(), mask.alpha());
        }
    }

    fn depth_func(&mut self, func: CompareFunc) {
        // SAFETY: enum from the conversion table.
        unsafe { self.gl.depth_func(convert::compare_func(func)) }
    }

    fn depth_mask(&mut self, write: bool) {
        // SAFETY: plain state call.
        unsafe { self.gl.depth_mask(write) }
    }

    fn stencil_func(&mut self, face: Face, func: CompareFunc, reference: u8, read_mask: u8) {
        // SAFETY: enums from the conversion table.
        unsafe {
            self.gl.stencil_func_separate(
                convert::face(face),
                convert::compare_func(func),
                i32::from(reference),
                u32::from(read_mask),
            );
        }
    }

    fn stencil_op(&mut self, face: Face, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        // SAFETY: enums from the conversion table.
        unsafe {
            self.gl.stencil_op_separate(
                convert::face(face),
                convert::stencil_op(fail),
                convert::stencil_op(depth_fail),
                convert::stencil_op(pass),
            );
        }
    }

    fn stencil_write_mask(&mut self, mask: u8) {
        // SAFETY: plain state call.
        unsafe { self.gl.stencil_mask(u32::from(mask)) }
    }

    fn polygon_mode(&mut self, mode: FillMode) {
        if !self.caps.wireframe {
            return;
        }
        // SAFETY: desktop contexts only, checked above.
        unsafe {
            self.gl
                .polygon_mode(glow::FRONT_AND_BACK, convert::fill_mode(mode));
        }
    }

    fn polygon_offset(&mut self, factor: f32, units: f32) {
        // SAFETY: plain state call.
        unsafe { self.gl.polygon_offset(factor, units) }
    }

    fn cull_face(&mut self, face: Face) {
        // SAFETY: enum from the conversion table.
        unsafe { self.gl.cull_face(convert::face(face)) }
    }

    fn viewport(&mut self, rect: Rect) {
        // SAFETY: plain state call.
        unsafe { self.gl.viewport(rect.x, rect.y, rect.width, rect.height) }
    }

    fn scissor(&mut self, rect: Rect) {
        // SAFETY: plain state call.
        unsafe { self.gl.scissor(rect.x, rect.y, rect.width, rect.height) }
    }

    fn create_texture(&mut self, dim: TextureDimension) -> Result<NativeTexture, String> {
        // SAFETY: a fresh texture name; storage is the asset system's job.
        let raw = unsafe { self.gl.create_texture()? };
        let handle = self.textures.insert(GlTexture {
            raw,
            target: convert::texture_target(dim),
            format: None,
        });
        Ok(NativeTexture(handle))
    }

    fn delete_texture(&mut self, texture: NativeTexture) {
        if let Some(tex) = self.textures.remove(texture.0) {
            // SAFETY: the handle was created by this backend and is now forgotten.
            unsafe { self.gl.delete_texture(tex.raw) }
        }
    }

    fn bind_texture(&mut self, unit: usize, dim: TextureDimension, texture: Option<NativeTexture>) {
        let (target, raw) = match texture.and_then(|t| self.raw_texture(t)) {
            Some(tex) => (tex.target, Some(tex.raw)),
            None => (convert::texture_target(dim), None),
        };
        // SAFETY: unit is below the detected unit count; raw is live or None.
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit as u32);
            self.gl.bind_texture(target, raw);
        }
    }

    fn texture_lod_bias(&mut self, unit: usize, dim: TextureDimension, bias: f32) {
        if self.gl.version().is_embedded {
            log::debug!("texture LOD bias unavailable on ES");
            return;
        }
        // SAFETY: sets a parameter on whatever is bound to `unit`.
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit as u32);
            self.gl
                .tex_parameter_f32(convert::texture_target(dim), glow::TEXTURE_LOD_BIAS, bias);
        }
    }

    fn texture_combiner(&mut self, unit: usize, _combiner: &TextureCombiner) {
        log::debug!("texture combiner on unit {unit} ignored: no fixed-function pipeline");
    }

    fn texture_constant_color(&mut self, unit: usize, _color: Vec4) {
        log::debug!("constant color on unit {unit} ignored: no fixed-function pipeline");
    }

    fn tex_gen(&mut self, unit: usize, _mode: TexGenMode) {
        log::debug!("texgen on unit {unit} ignored: no fixed-function pipeline");
    }

    fn set_light(&mut self, index: usize, _light: Option<&Light>) {
        log::debug!("light {index} ignored: no fixed-function pipeline");
    }

    fn set_fog(&mut self, _fog: &FogParams) {
        log::debug!("fixed-function fog ignored; fog comes from program variants");
    }

    fn load_matrix(&mut self, mode: MatrixMode, _matrix: &Mat4) {
        log::debug!("{mode:?} matrix ignored: no fixed-function pipeline");
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<NativeProgram, ShaderError> {
        let raw = compile_source(&self.gl, source)?;
        let handle = self.programs.insert(GlProgram {
            raw,
            uniforms: HashMap::new(),
        });
        Ok(NativeProgram(handle))
    }

    fn delete_program(&mut self, program: NativeProgram) {
        if let Some(prog) = self.programs.remove(program.0) {
            if self.current_program == Some(program.0) {
                self.current_program = None;
            }
            // SAFETY: the handle was created by this backend and is now forgotten.
            unsafe { self.gl.delete_program(prog.raw) }
        }
    }

    fn enable_stage(&mut self, stage: ShaderStage, enabled: bool) {
        if enabled {
            log::warn!("{} stage programs are unsupported", stage.name());
        }
    }

    fn bind_stage_program(&mut self, stage: ShaderStage, _program: NativeProgram) {
        log::warn!("{} stage programs are unsupported", stage.name());
    }

    fn use_linked_program(&mut self, program: Option<NativeProgram>) {
        let raw = program.and_then(|p| self.programs.get(p.0)).map(|p| p.raw);
        self.current_program = program.map(|p| p.0).filter(|_| raw.is_some());
        // SAFETY: raw is a live program or None.
        unsafe { self.gl.use_program(raw) }
    }

    fn upload_param(&mut self, stage: ShaderStage, param: &ParamDesc, value: &ParamValue) {
        let Some(program) = self.current_program.and_then(|p| self.programs.get_mut(p)) else {
            log::debug!("{} parameter '{}' with no program in use", stage.name(), param.name);
            return;
        };
        let gl = &self.gl;
        let raw = program.raw;
        let location = program
            .uniforms
            .entry(param.name.clone())
            // SAFETY: location query on a live, linked program.
            .or_insert_with(|| unsafe { gl.get_uniform_location(raw, &param.name) })
            .clone();
        let Some(location) = location else {
            return;
        };
        // SAFETY: the location belongs to the program in use.
        unsafe {
            match *value {
                ParamValue::Float(x) => gl.uniform_1_f32(Some(&location), x),
                ParamValue::Vector(v) => gl.uniform_4_f32(Some(&location), v.x, v.y, v.z, v.w),
                ParamValue::Matrix(m) => {
                    gl.uniform_matrix_4_f32_slice(Some(&location), false, &m.to_cols_array())
                }
                ParamValue::Texture { .. } => gl.uniform_1_i32(Some(&location), param.index as i32),
            }
        }
    }

    fn create_surface_texture(&mut self, desc: &SurfaceDesc) -> Result<NativeTexture, String> {
        if desc.format == SurfaceFormat::Rgba16F && !self.color_buffer_float {
            return Err("half-float color surfaces are not renderable here".to_string());
        }
        let raw = create_surface_texture(&self.gl, desc)?;
        let target = if desc.is_multisampled() {
            glow::TEXTURE_2D_MULTISAMPLE
        } else {
            convert::texture_target(desc.dim)
        };
        let handle = self.textures.insert(GlTexture {
            raw,
            target,
            format: Some(desc.format),
        });
        Ok(NativeTexture(handle))
    }

    fn create_render_buffer(&mut self, desc: &SurfaceDesc) -> Result<NativeRenderBuffer, String> {
        let raw = create_render_buffer(&self.gl, desc)?;
        let handle = self.render_buffers.insert(GlRenderBuffer {
            raw,
            format: desc.format,
        });
        Ok(NativeRenderBuffer(handle))
    }

    fn delete_render_buffer(&mut self, buffer: NativeRenderBuffer) {
        if let Some(buf) = self.render_buffers.remove(buffer.0) {
            // SAFETY: the handle was created by this backend and is now forgotten.
            unsafe { self.gl.delete_renderbuffer(buf.raw) }
        }
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget) {
        let fbo = match target {
            FramebufferTarget::BackBuffer => None,
            FramebufferTarget::Offscreen => match self.offscreen {
                Some(fbo) => Some(fbo),
                // SAFETY: a fresh framebuffer on a live context.
                None => match unsafe { self.gl.create_framebuffer() } {
                    Ok(fbo) => Some(*self.offscreen.insert(fbo)),
                    Err(reason) => {
                        log::error!("offscreen framebuffer creation failed: {reason}");
                        return;
                    }
                },
            },
        };
        // SAFETY: fbo is live or None for the default framebuffer.
        unsafe { self.gl.bind_framebuffer(glow::FRAMEBUFFER, fbo) }
    }

    fn attach_color(&mut self, slot: usize, attachment: Option<Attachment>) {
        self.attach(glow::FRAMEBUFFER, glow::COLOR_ATTACHMENT0 + slot as u32, attachment);
    }

    fn attach_depth(&mut self, attachment: Option<Attachment>) {
        let point = match attachment.and_then(|a| self.attachment_format(a)) {
            Some(format) => convert::depth_attachment_point(format),
            None => glow::DEPTH_STENCIL_ATTACHMENT,
        };
        self.attach(glow::FRAMEBUFFER, point, attachment);
    }

    fn set_draw_buffer_count(&mut self, count: usize) {
        let buffers: Vec<u32> = (0..count as u32).map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
        // SAFETY: count is below the detected attachment limit.
        unsafe { self.gl.draw_buffers(&buffers) }
    }

    fn generate_mips(&mut self, texture: NativeTexture, dim: TextureDimension) {
        let Some(tex) = self.raw_texture(texture) else {
            return;
        };
        let (raw, target) = (tex.raw, tex.target);
        // SAFETY: the previous binding of `target` is restored afterwards.
        unsafe {
            let previous = self.gl.get_parameter_texture(convert::texture_binding(dim));
            self.gl.bind_texture(target, Some(raw));
            self.gl.generate_mipmap(target);
            self.gl.bind_texture(target, previous);
        }
    }

    fn begin_resolve(&mut self, src: Attachment, dst: Attachment) {
        let (read, draw) = match self.resolve_pair {
            Some(pair) => pair,
            // SAFETY: two fresh framebuffers on a live context.
            None => match unsafe { (self.gl.create_framebuffer(), self.gl.create_framebuffer()) } {
                (Ok(read), Ok(draw)) => *self.resolve_pair.insert((read, draw)),
                (read, draw) => {
                    for framebuffer in [&read, &draw].into_iter().filter_map(|r| r.as_ref().ok()) {
                        // SAFETY: created above and never bound.
                        unsafe { self.gl.delete_framebuffer(*framebuffer) }
                    }
                    let reason = read.err().or(draw.err()).unwrap_or_default();
                    log::error!("resolve framebuffers could not be created: {reason}");
                    self.resolve = ResolveState::Failed;
                    return;
                }
            },
        };
        // SAFETY: the current bindings are saved and restored by end_resolve.
        unsafe {
            self.resolve = ResolveState::Active {
                read: self.gl.get_parameter_framebuffer(glow::READ_FRAMEBUFFER_BINDING),
                draw: self.gl.get_parameter_framebuffer(glow::DRAW_FRAMEBUFFER_BINDING),
            };
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(read));
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(draw));
        }
        self.attach(glow::READ_FRAMEBUFFER, self.attachment_point(src), Some(src));
        self.attach(glow::DRAW_FRAMEBUFFER, self.attachment_point(dst), Some(dst));
    }

    fn blit(&mut self, mask: BlitMask, width: u32, height: u32) {
        if !self.resolve.can_blit() {
            log::debug!("blit skipped: no resolve framebuffers bound");
            return;
        }
        let (w, h) = (width as i32, height as i32);
        // SAFETY: both resolve framebuffers are bound by begin_resolve.
        unsafe {
            self.gl.blit_framebuffer(
                0,
                0,
                w,
                h,
                0,
                0,
                w,
                h,
                convert::blit_bits(mask),
                glow::NEAREST,
            );
        }
    }

    fn end_resolve(&mut self) {
        let (read, draw) = match std::mem::replace(&mut self.resolve, ResolveState::Idle) {
            ResolveState::Active { read, draw } => (read, draw),
            ResolveState::Failed => return,
            ResolveState::Idle => {
                log::warn!("end_resolve without begin_resolve");
                return;
            }
        };
        // SAFETY: restores the bindings saved by begin_resolve.
        unsafe {
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, read);
            self.gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, draw);
        }
    }

    fn set_vertex_inputs(&mut self, channels: &ChannelAssigns) {
        let enabled = channels
            .iter()
            .filter_map(|(slot, _)| convert::attribute_location(slot))
            .fold(0u32, |mask, location| mask | 1 << location);
        // SAFETY: locations are below MAX_ATTRIBUTES.
        unsafe {
            for location in 0..MAX_ATTRIBUTES {
                if enabled & (1 << location) != 0 {
                    self.gl.enable_vertex_attrib_array(location);
                } else {
                    self.gl.disable_vertex_attrib_array(location);
                }
            }
        }
    }

    fn draw_indexed(&mut self, topology: Topology, indices: &[u16], _vertices: Range<u32>) {
        let indices = if topology == Topology::Quads {
            convert::quad_indices(indices)
        } else {
            indices.to_vec()
        };
        if !Self::stream(
            &self.gl,
            &mut self.index_buffer,
            glow::ELEMENT_ARRAY_BUFFER,
            &as_bytes_u16(&indices),
        ) {
            return;
        }
        // SAFETY: the element buffer bound above holds `indices`.
        unsafe {
            self.gl.draw_elements(
                convert::topology(topology),
                indices.len() as i32,
                glow::UNSIGNED_SHORT,
                0,
            );
        }
    }

    fn draw_immediate(&mut self, topology: Topology, vertices: &[ImmediateVertex]) {
        let floats = immediate_floats(topology, vertices);
        if !Self::stream(
            &self.gl,
            &mut self.immediate_buffer,
            glow::ARRAY_BUFFER,
            &as_bytes_f32(&floats),
        ) {
            return;
        }
        let stride = (IMMEDIATE_STRIDE * 4) as i32;
        let layout = [
            (VertexSlot::Vertex, 3, 0),
            (VertexSlot::Normal, 3, 3),
            (VertexSlot::Color, 4, 6),
            (VertexSlot::TexCoord0, 2, 10),
        ];
        // SAFETY: the array buffer bound above holds `floats` in this layout.
        unsafe {
            for (slot, size, offset) in layout {
                let Some(location) = convert::attribute_location(slot) else {
                    continue;
                };
                self.gl.enable_vertex_attrib_array(location);
                self.gl
                    .vertex_attrib_pointer_f32(location, size, glow::FLOAT, false, stride, offset * 4);
            }
            self.gl.draw_arrays(
                convert::topology(topology),
                0,
                (floats.len() / IMMEDIATE_STRIDE) as i32,
            );
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
    }

    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32, stencil: u8) {
        let mut bits = 0;
        // SAFETY: plain state calls.
        unsafe {
            if flags.color {
                self.gl.clear_color(color.x, color.y, color.z, color.w);
                bits |= glow::COLOR_BUFFER_BIT;
            }
            if flags.depth {
                self.gl.clear_depth_f32(depth);
                bits |= glow::DEPTH_BUFFER_BIT;
            }
            if flags.stencil {
                self.gl.clear_stencil(i32::from(stencil));
                bits |= glow::STENCIL_BUFFER_BIT;
            }
            if bits != 0 {
                self.gl.clear(bits);
            }
        }
    }

    fn drain_errors(&mut self) -> Vec<String> {
        let mut errors = Vec::new();
        // Bounded: a lost context can report errors forever.
        for _ in 0..32 {
            // SAFETY: error query on a live context.
            let code = unsafe { self.gl.get_error() };
            if code == glow::NO_ERROR {
                break;
            }
            errors.push(convert::error_name(code));
        }
        errors
    }
}
