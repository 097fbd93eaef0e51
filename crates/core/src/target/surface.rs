//! Render surfaces: color and depth targets.

use crate::backend::{Attachment, NativeRenderBuffer, NativeTexture};
use crate::lazy::LazySlot;
use crate::texture_map::TextureDimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Render-surface identifier. Two ids are reserved for the back buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    pub const BACK_COLOR: SurfaceId = SurfaceId(0);
    pub const BACK_DEPTH: SurfaceId = SurfaceId(1);

    pub fn is_back_buffer(self) -> bool {
        self == Self::BACK_COLOR || self == Self::BACK_DEPTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Color,
    Depth,
}

impl SurfaceKind {
    pub fn name(self) -> &'static str {
        match self {
            SurfaceKind::Color => "color",
            SurfaceKind::Depth => "depth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFormat {
    Rgba8,
    #[serde(rename = "rgba16f")]
    Rgba16F,
    #[serde(rename = "depth24_stencil8")]
    Depth24Stencil8,
    #[serde(rename = "depth32f")]
    Depth32F,
}

impl SurfaceFormat {
    pub fn kind(self) -> SurfaceKind {
        match self {
            SurfaceFormat::Rgba8 | SurfaceFormat::Rgba16F => SurfaceKind::Color,
            SurfaceFormat::Depth24Stencil8 | SurfaceFormat::Depth32F => SurfaceKind::Depth,
        }
    }
}

/// Cube-map face an attachment renders into. 2D surfaces use `PositiveX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeFace {
    #[default]
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

/// Whether a surface can be sampled as a texture afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceBacking {
    #[default]
    Texture,
    /// Texture-free render buffer.
    Buffer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceDesc {
    pub format: SurfaceFormat,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_samples")]
    pub samples: u8,
    #[serde(default = "default_dim")]
    pub dim: TextureDimension,
    #[serde(default)]
    pub backing: SurfaceBacking,
    /// Regenerate mips when rendering into this surface ends.
    #[serde(default)]
    pub auto_mips: bool,
}

fn default_samples() -> u8 {
    1
}

fn default_dim() -> TextureDimension {
    TextureDimension::Tex2D
}

impl SurfaceDesc {
    pub fn new(format: SurfaceFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            samples: 1,
            dim: TextureDimension::Tex2D,
            backing: SurfaceBacking::Texture,
            auto_mips: false,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.format.kind()
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }
}

/// A live surface and the native resources behind it.
#[derive(Debug)]
pub struct RenderSurface {
    pub desc: SurfaceDesc,
    pub(crate) texture: Option<NativeTexture>,
    pub(crate) buffer: Option<NativeRenderBuffer>,
    /// Buffer stand-ins for a texture-backed depth surface, one per color
    /// sample count it has been paired with.
    pub(crate) buffer_fallbacks: BTreeMap<u8, LazySlot<NativeRenderBuffer>>,
}

impl RenderSurface {
    pub(crate) fn new(
        desc: SurfaceDesc,
        texture: Option<NativeTexture>,
        buffer: Option<NativeRenderBuffer>,
    ) -> Self {
        Self {
            desc,
            texture,
            buffer,
            buffer_fallbacks: BTreeMap::new(),
        }
    }

    pub fn texture(&self) -> Option<NativeTexture> {
        self.texture
    }

    pub fn is_texture_backed(&self) -> bool {
        self.texture.is_some()
    }

    /// How the surface attaches at `mip` and `face`.
    pub fn attachment(&self, mip: u32, face: CubeFace) -> Option<Attachment> {
        if let Some(texture) = self.texture {
            return Some(Attachment::Texture {
                texture,
                dim: self.desc.dim,
                mip,
                face,
            });
        }
        self.buffer.map(Attachment::Buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_determines_kind() {
        assert_eq!(SurfaceFormat::Rgba16F.kind(), SurfaceKind::Color);
        assert_eq!(SurfaceFormat::Depth32F.kind(), SurfaceKind::Depth);
    }

    #[test]
    fn back_buffer_ids_are_sentinels() {
        assert!(SurfaceId::BACK_COLOR.is_back_buffer());
        assert!(SurfaceId::BACK_DEPTH.is_back_buffer());
        assert!(!SurfaceId(2).is_back_buffer());
    }

    #[test]
    fn desc_defaults_fill_in_from_json() {
        let desc: SurfaceDesc =
            serde_json::from_str(r#"{"format":"rgba8","width":64,"height":32}"#).unwrap();
        assert_eq!(desc, SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 32));
        assert!(!desc.is_multisampled());
    }

    #[test]
    fn texture_backed_surface_attaches_its_texture() {
        let surface = RenderSurface::new(
            SurfaceDesc::new(SurfaceFormat::Rgba8, 4, 4),
            Some(NativeTexture(3)),
            None,
        );
        assert_eq!(
            surface.attachment(1, CubeFace::PositiveX),
            Some(Attachment::Texture {
                texture: NativeTexture(3),
                dim: TextureDimension::Tex2D,
                mip: 1,
                face: CubeFace::PositiveX
            })
        );
    }

    #[test]
    fn buffer_backed_surface_attaches_its_buffer() {
        let surface = RenderSurface::new(
            SurfaceDesc::new(SurfaceFormat::Depth24Stencil8, 4, 4),
            None,
            Some(NativeRenderBuffer(8)),
        );
        assert_eq!(
            surface.attachment(0, CubeFace::default()),
            Some(Attachment::Buffer(NativeRenderBuffer(8)))
        );
    }
}
