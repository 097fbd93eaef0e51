//! Pure mappings from cache-level enums onto OpenGL enums.
//!
//! Nothing here touches a context, so everything is unit-tested without GL.

use crate::backend::{BlitMask, Topology};
use crate::channels::VertexSlot;
use crate::state::{BlendFactor, BlendOp, CompareFunc, Face, FillMode, StencilOp, Toggle};
use crate::target::{CubeFace, SurfaceFormat};
use crate::texture_map::TextureDimension;

pub fn compare_func(func: CompareFunc) -> u32 {
    match func {
        CompareFunc::Never => glow::NEVER,
        CompareFunc::Less => glow::LESS,
        CompareFunc::Equal => glow::EQUAL,
        CompareFunc::LessEqual => glow::LEQUAL,
        CompareFunc::Greater => glow::GREATER,
        CompareFunc::NotEqual => glow::NOTEQUAL,
        CompareFunc::GreaterEqual => glow::GEQUAL,
        CompareFunc::Always => glow::ALWAYS,
    }
}

pub fn blend_factor(factor: BlendFactor) -> u32 {
    match factor {
        BlendFactor::Zero => glow::ZERO,
        BlendFactor::One => glow::ONE,
        BlendFactor::SrcColor => glow::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => glow::DST_COLOR,
        BlendFactor::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => glow::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => glow::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
        BlendFactor::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
    }
}

pub fn blend_op(op: BlendOp) -> u32 {
    match op {
        BlendOp::Add => glow::FUNC_ADD,
        BlendOp::Subtract => glow::FUNC_SUBTRACT,
        BlendOp::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
        BlendOp::Min => glow::MIN,
        BlendOp::Max => glow::MAX,
    }
}

pub fn stencil_op(op: StencilOp) -> u32 {
    match op {
        StencilOp::Keep => glow::KEEP,
        StencilOp::Zero => glow::ZERO,
        StencilOp::Replace => glow::REPLACE,
        StencilOp::IncrementSaturate => glow::INCR,
        StencilOp::DecrementSaturate => glow::DECR,
        StencilOp::Invert => glow::INVERT,
        StencilOp::IncrementWrap => glow::INCR_WRAP,
        StencilOp::DecrementWrap => glow::DECR_WRAP,
    }
}

pub fn face(face: Face) -> u32 {
    match face {
        Face::Front => glow::FRONT,
        Face::Back => glow::BACK,
    }
}

pub fn fill_mode(mode: FillMode) -> u32 {
    match mode {
        FillMode::Solid => glow::FILL,
        FillMode::Wireframe => glow::LINE,
        FillMode::Point => glow::POINT,
    }
}

/// Capability enum for a toggle. Alpha test has none in core profiles.
pub fn toggle(toggle: Toggle) -> Option<u32> {
    match toggle {
        Toggle::Blend => Some(glow::BLEND),
        Toggle::AlphaTest => None,
        Toggle::AlphaToCoverage => Some(glow::SAMPLE_ALPHA_TO_COVERAGE),
        Toggle::DepthTest => Some(glow::DEPTH_TEST),
        Toggle::StencilTest => Some(glow::STENCIL_TEST),
        Toggle::CullFace => Some(glow::CULL_FACE),
        Toggle::PolygonOffsetFill => Some(glow::POLYGON_OFFSET_FILL),
        Toggle::ScissorTest => Some(glow::SCISSOR_TEST),
    }
}

/// Draw mode. Quads are drawn as triangles after [`quad_indices`].
pub fn topology(topology: Topology) -> u32 {
    match topology {
        Topology::Triangles | Topology::Quads => glow::TRIANGLES,
        Topology::TriangleStrip => glow::TRIANGLE_STRIP,
        Topology::Lines => glow::LINES,
        Topology::LineStrip => glow::LINE_STRIP,
        Topology::Points => glow::POINTS,
    }
}

pub fn texture_target(dim: TextureDimension) -> u32 {
    match dim {
        TextureDimension::Tex2D => glow::TEXTURE_2D,
        TextureDimension::Tex3D => glow::TEXTURE_3D,
        TextureDimension::Cube => glow::TEXTURE_CUBE_MAP,
    }
}

/// Query enum for the texture bound to `dim` on the active unit.
pub fn texture_binding(dim: TextureDimension) -> u32 {
    match dim {
        TextureDimension::Tex2D => glow::TEXTURE_BINDING_2D,
        TextureDimension::Tex3D => glow::TEXTURE_BINDING_3D,
        TextureDimension::Cube => glow::TEXTURE_BINDING_CUBE_MAP,
    }
}

/// Target passed to `framebuffer_texture_2d` for a cube face.
pub fn cube_face(face: CubeFace) -> u32 {
    glow::TEXTURE_CUBE_MAP_POSITIVE_X + face as u32
}

/// `(internal format, pixel format, pixel type)` for surface storage.
pub fn surface_format(format: SurfaceFormat) -> (u32, u32, u32) {
    match format {
        SurfaceFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        SurfaceFormat::Rgba16F => (glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
        SurfaceFormat::Depth24Stencil8 => (
            glow::DEPTH24_STENCIL8,
            glow::DEPTH_STENCIL,
            glow::UNSIGNED_INT_24_8,
        ),
        SurfaceFormat::Depth32F => (glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
    }
}

/// Framebuffer attachment point for a depth format.
pub fn depth_attachment_point(format: SurfaceFormat) -> u32 {
    match format {
        SurfaceFormat::Depth24Stencil8 => glow::DEPTH_STENCIL_ATTACHMENT,
        _ => glow::DEPTH_ATTACHMENT,
    }
}

pub fn blit_bits(mask: BlitMask) -> u32 {
    match mask {
        BlitMask::Color => glow::COLOR_BUFFER_BIT,
        BlitMask::Depth => glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT,
    }
}

/// Attribute location for a vertex slot, following the conventional
/// aliasing of named slots onto generic ones (position 0, normal 2,
/// color 3, texture coordinates 8 to 15).
pub fn attribute_location(slot: VertexSlot) -> Option<u32> {
    let location = match slot {
        VertexSlot::Vertex => 0,
        VertexSlot::Normal => 2,
        VertexSlot::Color => 3,
        VertexSlot::None => return None,
        other => {
            let index = other.index();
            if index >= VertexSlot::GenericAttrib0.index() {
                index - VertexSlot::GenericAttrib0.index()
            } else {
                8 + index - VertexSlot::TexCoord0.index()
            }
        }
    };
    Some(location as u32)
}

/// Triangle-list indices for a quad list. Trailing partial quads are dropped.
pub fn quad_indices(indices: &[u16]) -> Vec<u16> {
    indices
        .chunks_exact(4)
        .flat_map(|q| [q[0], q[1], q[2], q[0], q[2], q[3]])
        .collect()
}

/// Readable name for a `glGetError` code.
pub fn error_name(code: u32) -> String {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM".to_string(),
        glow::INVALID_VALUE => "GL_INVALID_VALUE".to_string(),
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION".to_string(),
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION".to_string(),
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY".to_string(),
        other => format!("GL error 0x{other:04X}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_slots_alias_generic_locations() {
        assert_eq!(attribute_location(VertexSlot::Vertex), Some(0));
        assert_eq!(attribute_location(VertexSlot::GenericAttrib0), Some(0));
        assert_eq!(attribute_location(VertexSlot::Normal), Some(2));
        assert_eq!(attribute_location(VertexSlot::TexCoord0), Some(8));
        assert_eq!(attribute_location(VertexSlot::TexCoord7), Some(15));
        assert_eq!(attribute_location(VertexSlot::GenericAttrib15), Some(15));
        assert_eq!(attribute_location(VertexSlot::None), None);
    }

    #[test]
    fn every_location_fits_sixteen_attributes() {
        for slot in VertexSlot::ALL {
            let location = attribute_location(slot).unwrap();
            assert!(location < 16, "{slot:?} mapped to {location}");
        }
    }

    #[test]
    fn quads_split_into_two_triangles() {
        assert_eq!(quad_indices(&[0, 1, 2, 3]), vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn partial_quad_is_dropped() {
        assert_eq!(quad_indices(&[0, 1, 2, 3, 4, 5]).len(), 6);
    }

    #[test]
    fn cube_faces_follow_gl_order() {
        assert_eq!(cube_face(CubeFace::PositiveX), glow::TEXTURE_CUBE_MAP_POSITIVE_X);
        assert_eq!(cube_face(CubeFace::NegativeZ), glow::TEXTURE_CUBE_MAP_NEGATIVE_Z);
    }

    #[test]
    fn packed_depth_uses_combined_attachment() {
        assert_eq!(
            depth_attachment_point(SurfaceFormat::Depth24Stencil8),
            glow::DEPTH_STENCIL_ATTACHMENT
        );
        assert_eq!(depth_attachment_point(SurfaceFormat::Depth32F), glow::DEPTH_ATTACHMENT);
    }

    #[test]
    fn half_float_surfaces_use_half_float_pixels() {
        assert_eq!(surface_format(SurfaceFormat::Rgba16F).2, glow::HALF_FLOAT);
        assert_eq!(surface_format(SurfaceFormat::Rgba8).2, glow::UNSIGNED_BYTE);
    }

    #[test]
    fn alpha_test_has_no_core_capability() {
        assert_eq!(toggle(Toggle::AlphaTest), None);
        assert_eq!(toggle(Toggle::DepthTest), Some(glow::DEPTH_TEST));
    }

    #[test]
    fn unknown_error_codes_are_hex_formatted() {
        assert_eq!(error_name(glow::INVALID_ENUM), "GL_INVALID_ENUM");
        assert_eq!(error_name(0x1234), "GL error 0x1234");
    }
}
