//! JSON scene scripts replayed against the recording backend.
//!
//! A script is an optional device config and capability override plus an
//! ordered list of commands. State objects, shaders and surfaces are created
//! under a name and referred to by that name afterwards.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use statecache_core::device::{Light, MatrixMode};
use statecache_core::program::params::encode_f32s;
use statecache_core::state::{BlendStateId, DepthStateId, RasterStateId, Rect, StencilStateId};
use statecache_core::target::CubeFace;
use statecache_core::{
    BlendDesc, Capabilities, ChannelAssigns, ClearFlags, DepthDesc, DeviceConfig, DeviceError,
    DeviceStateCache, FogParams, FrameStats, ParamBlock, ProgramSource, RasterDesc,
    RecordingBackend, ShaderId, ShaderStage, StencilDesc, SurfaceDesc, SurfaceId, TextureDimension,
    TextureId, Topology, VertexSlot,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Script {
    pub config: DeviceConfig,
    pub capabilities: Option<Capabilities>,
    pub commands: Vec<Command>,
}

/// A parameter buffer entry: a float, or a texture id for texture params.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum ParamInput {
    Number(f32),
    Texture { texture: u32 },
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScriptVertex {
    pub position: Vec3,
    pub normal: Option<Vec3>,
    pub color: Option<Vec4>,
    pub tex_coord: Option<Vec2>,
}

fn default_depth() -> f32 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateBlend {
        name: String,
        #[serde(default)]
        desc: BlendDesc,
    },
    SetBlend {
        name: String,
        #[serde(default)]
        alpha_ref: f32,
    },
    CreateDepth {
        name: String,
        #[serde(default)]
        desc: DepthDesc,
    },
    SetDepth {
        name: String,
    },
    CreateStencil {
        name: String,
        #[serde(default)]
        desc: StencilDesc,
    },
    SetStencil {
        name: String,
        #[serde(default)]
        reference: u8,
    },
    CreateRaster {
        name: String,
        #[serde(default)]
        desc: RasterDesc,
    },
    SetRaster {
        name: String,
    },
    Viewport {
        rect: Rect,
    },
    Scissor {
        rect: Option<Rect>,
    },
    RegisterShader {
        name: String,
        source: ProgramSource,
        #[serde(default)]
        inputs: Vec<VertexSlot>,
    },
    BindShader {
        stage: ShaderStage,
        name: String,
    },
    BindFixedFunction,
    DeleteShader {
        name: String,
    },
    SetParams {
        stage: ShaderStage,
        params: ParamBlock,
        values: Vec<ParamInput>,
    },
    SetTexture {
        stage: ShaderStage,
        unit: usize,
        texture: Option<u32>,
        #[serde(default = "default_dim")]
        dim: TextureDimension,
        #[serde(default)]
        lod_bias: f32,
    },
    DeleteTexture {
        texture: u32,
    },
    SetFog {
        fog: FogParams,
    },
    SetLight {
        index: usize,
        light: Option<Light>,
    },
    SetTransform {
        mode: MatrixMode,
        matrix: Mat4,
    },
    CreateColorSurface {
        name: String,
        desc: SurfaceDesc,
    },
    CreateDepthSurface {
        name: String,
        desc: SurfaceDesc,
    },
    SetRenderTargets {
        colors: Vec<String>,
        depth: String,
        #[serde(default)]
        mip: u32,
        #[serde(default)]
        face: CubeFace,
    },
    SetBackBufferTargets,
    BackBufferSize {
        width: u32,
        height: u32,
    },
    ResolveColor {
        src: String,
        dst: String,
    },
    ResolveDepth {
        src: String,
        dst: String,
    },
    DestroySurface {
        name: String,
    },
    /// Draws with the channels `shader` requires, or with `inputs` wired
    /// canonically when no shader is named.
    Draw {
        shader: Option<String>,
        #[serde(default)]
        inputs: Vec<VertexSlot>,
        indices: Vec<u16>,
        #[serde(default = "default_topology")]
        topology: Topology,
    },
    Immediate {
        #[serde(default = "default_topology")]
        topology: Topology,
        vertices: Vec<ScriptVertex>,
    },
    Clear {
        #[serde(default = "all_flags")]
        flags: ClearFlags,
        #[serde(default)]
        color: Vec4,
        #[serde(default = "default_depth")]
        depth: f32,
        #[serde(default)]
        stencil: u8,
    },
    Invalidate,
    /// Closes the current frame's counters.
    EndFrame,
}

fn default_dim() -> TextureDimension {
    TextureDimension::Tex2D
}

fn default_topology() -> Topology {
    Topology::Triangles
}

fn all_flags() -> ClearFlags {
    ClearFlags::ALL
}

/// What a replay did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub commands: usize,
    /// Counters per frame. A trailing partial frame is included.
    pub frames: Vec<FrameStats>,
    /// Backend calls issued, by kind.
    pub calls: BTreeMap<&'static str, usize>,
    pub total_calls: usize,
}

/// Named objects created by the script so far.
#[derive(Default)]
struct Names {
    blend: HashMap<String, BlendStateId>,
    depth: HashMap<String, DepthStateId>,
    stencil: HashMap<String, StencilStateId>,
    raster: HashMap<String, RasterStateId>,
    shaders: HashMap<String, ShaderId>,
    surfaces: HashMap<String, SurfaceId>,
}

fn lookup<T: Copy>(map: &HashMap<String, T>, what: &str, name: &str) -> Result<T, DeviceError> {
    map.get(name)
        .copied()
        .ok_or_else(|| DeviceError::InvalidScript(format!("undefined {what} '{name}'")))
}

/// Parses a script from JSON text.
///
/// # Errors
///
/// Returns `DeviceError::InvalidScript` with the parser's message.
pub fn parse(text: &str) -> Result<Script, DeviceError> {
    serde_json::from_str(text).map_err(|e| DeviceError::InvalidScript(e.to_string()))
}

/// Runs every command of `script` through a fresh device.
///
/// # Errors
///
/// Fails on the first command that names an undefined object or that the
/// device rejects. Commands before it have already been issued.
pub fn replay(script: &Script) -> Result<Report, DeviceError> {
    script.config.validate()?;
    let backend = RecordingBackend::new(script.capabilities.clone().unwrap_or_default());
    let mut device = DeviceStateCache::new(backend, script.config.clone());
    let mut names = Names::default();
    let mut report = Report::default();

    for (index, command) in script.commands.iter().enumerate() {
        log::trace!("command {index}: {command:?}");
        run_command(&mut device, &mut names, command, &mut report).map_err(|e| match e {
            DeviceError::InvalidScript(msg) => {
                DeviceError::InvalidScript(format!("command {index}: {msg}"))
            }
            other => other,
        })?;
        report.commands += 1;
    }

    let last = device.reset_stats();
    if last != FrameStats::default() || report.frames.is_empty() {
        report.frames.push(last);
    }
    for call in device.backend().calls() {
        *report.calls.entry(call.kind()).or_default() += 1;
    }
    report.total_calls = device.backend().calls().len();
    Ok(report)
}

fn run_command(
    device: &mut DeviceStateCache<RecordingBackend>,
    names: &mut Names,
    command: &Command,
    report: &mut Report,
) -> Result<(), DeviceError> {
    match command {
        Command::CreateBlend { name, desc } => {
            let id = device.create_blend_state(desc);
            names.blend.insert(name.clone(), id);
        }
        Command::SetBlend { name, alpha_ref } => {
            device.set_blend_state(lookup(&names.blend, "blend state", name)?, *alpha_ref);
        }
        Command::CreateDepth { name, desc } => {
            let id = device.create_depth_state(desc);
            names.depth.insert(name.clone(), id);
        }
        Command::SetDepth { name } => {
            device.set_depth_state(lookup(&names.depth, "depth state", name)?);
        }
        Command::CreateStencil { name, desc } => {
            let id = device.create_stencil_state(desc);
            names.stencil.insert(name.clone(), id);
        }
        Command::SetStencil { name, reference } => {
            device.set_stencil_state(lookup(&names.stencil, "stencil state", name)?, *reference);
        }
        Command::CreateRaster { name, desc } => {
            let id = device.create_raster_state(desc);
            names.raster.insert(name.clone(), id);
        }
        Command::SetRaster { name } => {
            device.set_raster_state(lookup(&names.raster, "raster state", name)?);
        }
        Command::Viewport { rect } => device.set_viewport(*rect),
        Command::Scissor { rect } => device.set_scissor(*rect),
        Command::RegisterShader {
            name,
            source,
            inputs,
        } => {
            let id = device.register_shader(source.clone(), inputs.clone());
            names.shaders.insert(name.clone(), id);
        }
        Command::BindShader { stage, name } => {
            device.bind_shader(*stage, lookup(&names.shaders, "shader", name)?)?;
        }
        Command::BindFixedFunction => device.bind_fixed_function(),
        Command::DeleteShader { name } => {
            let id = lookup(&names.shaders, "shader", name)?;
            device.delete_shader(id);
            names.shaders.remove(name);
        }
        Command::SetParams {
            stage,
            params,
            values,
        } => {
            let buffer = encode_params(values);
            device.set_program_params(*stage, params, &buffer);
        }
        Command::SetTexture {
            stage,
            unit,
            texture,
            dim,
            lod_bias,
        } => {
            device.set_texture(*stage, *unit, texture.map(TextureId), *dim, *lod_bias);
        }
        Command::DeleteTexture { texture } => {
            device.delete_texture(TextureId(*texture));
        }
        Command::SetFog { fog } => device.set_fog(*fog),
        Command::SetLight { index, light } => {
            device.set_light(*index, *light);
        }
        Command::SetTransform { mode, matrix } => device.set_transform(*mode, *matrix),
        Command::CreateColorSurface { name, desc } => {
            let id = device.create_color_surface(desc.clone())?;
            names.surfaces.insert(name.clone(), id);
        }
        Command::CreateDepthSurface { name, desc } => {
            let id = device.create_depth_surface(desc.clone())?;
            names.surfaces.insert(name.clone(), id);
        }
        Command::SetRenderTargets {
            colors,
            depth,
            mip,
            face,
        } => {
            let colors = colors
                .iter()
                .map(|c| lookup(&names.surfaces, "surface", c))
                .collect::<Result<Vec<_>, _>>()?;
            let depth = lookup(&names.surfaces, "surface", depth)?;
            device.set_render_targets(&colors, depth, *mip, *face)?;
        }
        Command::SetBackBufferTargets => {
            device.set_back_buffer_targets()?;
        }
        Command::BackBufferSize { width, height } => device.set_back_buffer_size(*width, *height),
        Command::ResolveColor { src, dst } => {
            device.resolve_color_surface(
                lookup(&names.surfaces, "surface", src)?,
                lookup(&names.surfaces, "surface", dst)?,
            )?;
        }
        Command::ResolveDepth { src, dst } => {
            device.resolve_depth_surface(
                lookup(&names.surfaces, "surface", src)?,
                lookup(&names.surfaces, "surface", dst)?,
            )?;
        }
        Command::DestroySurface { name } => {
            device.destroy_surface(lookup(&names.surfaces, "surface", name)?)?;
            names.surfaces.remove(name);
        }
        Command::Draw {
            shader,
            inputs,
            indices,
            topology,
        } => {
            let channels = match shader {
                Some(name) => {
                    let id = lookup(&names.shaders, "shader", name)?;
                    device
                        .channel_requirements(id)
                        .ok_or(DeviceError::UnknownShader(id.0))?
                }
                None => ChannelAssigns::from_program_inputs(inputs),
            };
            let vertex_count = indices.iter().max().map_or(0, |&i| u32::from(i) + 1);
            device.draw(&channels, indices, *topology, 0..vertex_count);
        }
        Command::Immediate { topology, vertices } => {
            device.immediate_begin(*topology);
            for v in vertices {
                if let Some(normal) = v.normal {
                    device.immediate_normal(normal);
                }
                if let Some(color) = v.color {
                    device.immediate_color(color);
                }
                if let Some(tex_coord) = v.tex_coord {
                    device.immediate_tex_coord(tex_coord);
                }
                device.immediate_vertex(v.position);
            }
            device.immediate_end();
        }
        Command::Clear {
            flags,
            color,
            depth,
            stencil,
        } => device.clear(*flags, *color, *depth, *stencil),
        Command::Invalidate => device.invalidate(),
        Command::EndFrame => report.frames.push(device.reset_stats()),
    }
    Ok(())
}

fn encode_params(values: &[ParamInput]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| match *v {
            ParamInput::Number(x) => encode_f32s(&[x]),
            ParamInput::Texture { texture } => texture.to_le_bytes().to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(json: &str) -> Report {
        replay(&parse(json).unwrap()).unwrap()
    }

    #[test]
    fn empty_script_reports_one_empty_frame() {
        let report = run("{}");
        assert_eq!(report.commands, 0);
        assert_eq!(report.frames, vec![FrameStats::default()]);
        assert_eq!(report.total_calls, 0);
    }

    #[test]
    fn repeated_blend_state_is_issued_once() {
        let report = run(
            r#"{"commands": [
                {"op": "create_blend", "name": "alpha", "desc": {"enabled": true}},
                {"op": "set_blend", "name": "alpha", "alpha_ref": 0.5},
                {"op": "set_blend", "name": "alpha", "alpha_ref": 0.5}
            ]}"#,
        );
        let first_frame = report.frames[0];
        assert!(first_frame.state_changes > 0);
        assert!(
            first_frame.redundant_requests > 0,
            "second set_blend should be redundant: {first_frame:?}"
        );
    }

    #[test]
    fn end_frame_splits_counters() {
        let report = run(
            r#"{"commands": [
                {"op": "draw", "inputs": ["vertex"], "indices": [0, 1, 2]},
                {"op": "end_frame"},
                {"op": "draw", "inputs": ["vertex"], "indices": [0, 1, 2]},
                {"op": "draw", "inputs": ["vertex"], "indices": [0, 1, 2]}
            ]}"#,
        );
        assert_eq!(report.frames.len(), 2);
        assert_eq!(report.frames[0].draw_calls, 1);
        assert_eq!(report.frames[1].draw_calls, 2);
        assert_eq!(report.calls.get("set_vertex_inputs"), Some(&1));
    }

    #[test]
    fn undefined_names_are_reported_with_command_index() {
        let script = parse(r#"{"commands": [{"op": "set_depth", "name": "missing"}]}"#).unwrap();
        let err = replay(&script).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("command 0"), "got: {msg}");
        assert!(msg.contains("missing"), "got: {msg}");
    }

    #[test]
    fn unknown_ops_fail_to_parse() {
        assert!(matches!(
            parse(r#"{"commands": [{"op": "explode"}]}"#),
            Err(DeviceError::InvalidScript(_))
        ));
    }

    #[test]
    fn shader_draw_uses_its_channel_requirements() {
        let report = run(
            r#"{"commands": [
                {"op": "register_shader", "name": "lit",
                 "source": {"kind": "linked", "vertex": "v", "fragment": "f"},
                 "inputs": ["vertex", "normal"]},
                {"op": "bind_shader", "stage": "vertex", "name": "lit"},
                {"op": "draw", "shader": "lit", "indices": [0, 1, 2]}
            ]}"#,
        );
        assert_eq!(report.frames[0].draw_calls, 1);
        assert_eq!(report.frames[0].program_binds, 1);
        assert_eq!(report.calls.get("compile_program"), Some(&1));
    }

    #[test]
    fn texture_params_encode_ids_as_integers() {
        let bytes = encode_params(&[ParamInput::Number(1.0), ParamInput::Texture { texture: 7 }]);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7u32.to_le_bytes());
    }

    #[test]
    fn render_targets_round_trip_to_back_buffer() {
        let report = run(
            r#"{"commands": [
                {"op": "back_buffer_size", "width": 64, "height": 64},
                {"op": "create_color_surface", "name": "hdr",
                 "desc": {"format": "rgba16f", "width": 64, "height": 64}},
                {"op": "create_depth_surface", "name": "z",
                 "desc": {"format": "depth24_stencil8", "width": 64, "height": 64}},
                {"op": "set_render_targets", "colors": ["hdr"], "depth": "z"},
                {"op": "set_render_targets", "colors": ["hdr"], "depth": "z"},
                {"op": "set_back_buffer_targets"}
            ]}"#,
        );
        assert_eq!(report.frames[0].target_switches, 2);
    }
}
