//! GLSL compilation and linking.
//!
//! Only linked vertex+fragment programs can be built on core and ES
//! profiles; single-stage sources are rejected as unsupported, which the
//! program family records as a permanent failure. The formatting helper is
//! pure string processing and is tested without a context.

use crate::error::ShaderError;
use crate::program::{ProgramSource, ShaderStage};

/// Prepends right-aligned line numbers to `source` and appends the driver
/// `log`, so log line references can be read against the GLSL.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();

    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

fn shader_type(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

/// Compiles one stage.
///
/// # Errors
///
/// `ShaderError::CompileError` with the numbered source and driver log.
#[allow(unsafe_code)]
pub fn compile_shader(
    gl: &glow::Context,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    use glow::HasContext;

    let compile_error = |log: String| ShaderError::CompileError {
        stage: stage.name().to_string(),
        log,
    };

    // SAFETY: glow wraps raw GL calls as unsafe. The shader handle is
    // created here and deleted on the failure path.
    unsafe {
        let shader = gl.create_shader(shader_type(stage)).map_err(compile_error)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            return Ok(shader);
        }
        let info_log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        Err(compile_error(format_shader_error(source, &info_log)))
    }
}

/// Links two compiled stages. The shaders are detached afterwards either way.
///
/// # Errors
///
/// `ShaderError::LinkError` with the driver log.
#[allow(unsafe_code)]
pub fn link_program(
    gl: &glow::Context,
    vertex: glow::Shader,
    fragment: glow::Shader,
) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    // SAFETY: both shaders are live handles from compile_shader; the program
    // is deleted on the failure path.
    unsafe {
        let program = gl.create_program().map_err(ShaderError::LinkError)?;
        gl.attach_shader(program, vertex);
        gl.attach_shader(program, fragment);
        gl.link_program(program);
        gl.detach_shader(program, vertex);
        gl.detach_shader(program, fragment);

        if gl.get_program_link_status(program) {
            return Ok(program);
        }
        let info_log = gl.get_program_info_log(program);
        gl.delete_program(program);
        Err(ShaderError::LinkError(info_log))
    }
}

/// Builds a program from `source`.
///
/// # Errors
///
/// `Unsupported` for single-stage sources, otherwise any compile or link
/// failure.
#[allow(unsafe_code)]
pub fn compile_source(gl: &glow::Context, source: &ProgramSource) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    let ProgramSource::Linked { vertex, fragment } = source else {
        return Err(ShaderError::Unsupported("separable stage programs"));
    };

    let vert = compile_shader(gl, ShaderStage::Vertex, vertex)?;
    let frag = match compile_shader(gl, ShaderStage::Fragment, fragment) {
        Ok(frag) => frag,
        Err(err) => {
            // SAFETY: vert is a live handle from compile_shader.
            unsafe { gl.delete_shader(vert) };
            return Err(err);
        }
    };
    let result = link_program(gl, vert, frag);

    // SAFETY: the linked program keeps its own copies of the stages.
    unsafe {
        gl.delete_shader(vert);
        gl.delete_shader(frag);
    }
    result
}
