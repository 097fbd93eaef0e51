//! Texture and render-buffer allocation for render surfaces.
//!
//! Allocation binds the new object to the active unit, so the previous
//! binding is read back and restored; the device's snapshot of texture
//! units stays true.

use super::convert::{surface_format, texture_binding, texture_target};
use crate::target::SurfaceDesc;
use crate::texture_map::TextureDimension;

/// Filter used for surface sampling. Mipmapped surfaces filter across levels.
pub fn min_filter(desc: &SurfaceDesc) -> u32 {
    if desc.auto_mips {
        glow::LINEAR_MIPMAP_LINEAR
    } else {
        glow::LINEAR
    }
}

/// Creates a texture holding `desc`'s storage.
///
/// # Errors
///
/// Returns the driver's message if the texture cannot be created.
#[allow(unsafe_code)]
pub fn create_surface_texture(gl: &glow::Context, desc: &SurfaceDesc) -> Result<glow::Texture, String> {
    use glow::HasContext;

    let (internal, format, ty) = surface_format(desc.format);
    let (width, height) = (desc.width as i32, desc.height as i32);

    if desc.is_multisampled() {
        // SAFETY: allocation on a fresh texture; the previous 2D-multisample
        // binding is restored.
        return unsafe {
            let texture = gl.create_texture()?;
            let previous = gl.get_parameter_texture(glow::TEXTURE_BINDING_2D_MULTISAMPLE);
            gl.bind_texture(glow::TEXTURE_2D_MULTISAMPLE, Some(texture));
            gl.tex_storage_2d_multisample(
                glow::TEXTURE_2D_MULTISAMPLE,
                i32::from(desc.samples),
                internal,
                width,
                height,
                true,
            );
            gl.bind_texture(glow::TEXTURE_2D_MULTISAMPLE, previous);
            Ok(texture)
        };
    }

    let target = texture_target(desc.dim);
    // SAFETY: the texture is created here and bound only while its storage
    // is allocated; the previous binding of the same target is restored.
    unsafe {
        let texture = gl.create_texture()?;
        let previous = gl.get_parameter_texture(texture_binding(desc.dim));
        gl.bind_texture(target, Some(texture));
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, min_filter(desc) as i32);
        gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);

        match desc.dim {
            TextureDimension::Tex2D => gl.tex_image_2d(
                target,
                0,
                internal as i32,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            ),
            TextureDimension::Cube => {
                for face in 0..6 {
                    gl.tex_image_2d(
                        glow::TEXTURE_CUBE_MAP_POSITIVE_X + face,
                        0,
                        internal as i32,
                        width,
                        height,
                        0,
                        format,
                        ty,
                        glow::PixelUnpackData::Slice(None),
                    );
                }
            }
            TextureDimension::Tex3D => gl.tex_image_3d(
                target,
                0,
                internal as i32,
                width,
                height,
                1,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(None),
            ),
        }
        gl.bind_texture(target, previous);
        Ok(texture)
    }
}

/// Creates a texture-free buffer holding `desc`'s storage.
///
/// # Errors
///
/// Returns the driver's message if the buffer cannot be created.
#[allow(unsafe_code)]
pub fn create_render_buffer(gl: &glow::Context, desc: &SurfaceDesc) -> Result<glow::Renderbuffer, String> {
    use glow::HasContext;

    let (internal, _, _) = surface_format(desc.format);
    // SAFETY: the render buffer is created and bound here only while its
    // storage is allocated.
    unsafe {
        let buffer = gl.create_renderbuffer()?;
        gl.bind_renderbuffer(glow::RENDERBUFFER, Some(buffer));
        gl.renderbuffer_storage_multisample(
            glow::RENDERBUFFER,
            if desc.is_multisampled() { i32::from(desc.samples) } else { 0 },
            internal,
            desc.width as i32,
            desc.height as i32,
        );
        gl.bind_renderbuffer(glow::RENDERBUFFER, None);
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::SurfaceFormat;

    #[test]
    fn auto_mip_surfaces_filter_across_levels() {
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64);
        assert_eq!(min_filter(&desc), glow::LINEAR);
        desc.auto_mips = true;
        assert_eq!(min_filter(&desc), glow::LINEAR_MIPMAP_LINEAR);
    }

    #[test]
    #[ignore = "requires GL context"]
    fn surface_texture_restores_previous_binding() {
        // Would test: after create_surface_texture, TEXTURE_BINDING_2D is
        // whatever was bound before the call.
    }
}
