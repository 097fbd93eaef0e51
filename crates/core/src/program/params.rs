//! Program parameter blocks.
//!
//! The material system describes a program's parameters as an ordered list
//! of [`ParamDesc`] over one flat byte buffer. Values are little-endian
//! `f32`s; texture parameters hold a `u32` [`TextureId`].

use crate::texture_map::{TextureDimension, TextureId};
use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Float,
    Vector,
    Matrix,
    Texture(TextureDimension),
}

impl ParamKind {
    /// Bytes the value occupies in the buffer.
    pub fn size(self) -> usize {
        match self {
            ParamKind::Float | ParamKind::Texture(_) => 4,
            ParamKind::Vector => 16,
            ParamKind::Matrix => 64,
        }
    }

    /// Scalars and vectors are the kinds eligible for the value cache.
    pub fn is_constant(self) -> bool {
        matches!(self, ParamKind::Float | ParamKind::Vector)
    }
}

/// One parameter: where it lives in the buffer and which register it feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamDesc {
    pub name: String,
    pub kind: ParamKind,
    pub offset: usize,
    /// Constant register (or sampler unit for textures).
    pub index: u32,
}

/// A decoded parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f32),
    Vector(Vec4),
    Matrix(Mat4),
    Texture { id: TextureId, dim: TextureDimension },
}

impl ParamValue {
    /// The value widened to a vector, as a constant register holds it.
    pub fn as_vector(&self) -> Option<Vec4> {
        match *self {
            ParamValue::Float(x) => Some(Vec4::new(x, 0.0, 0.0, 0.0)),
            ParamValue::Vector(v) => Some(v),
            ParamValue::Matrix(_) | ParamValue::Texture { .. } => None,
        }
    }
}

impl ParamDesc {
    pub fn new(name: impl Into<String>, kind: ParamKind, offset: usize, index: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            offset,
            index,
        }
    }

    /// Decodes this parameter from `buffer`. `None` if the buffer is too short.
    pub fn read(&self, buffer: &[u8]) -> Option<ParamValue> {
        let bytes = buffer.get(self.offset..self.offset.checked_add(self.kind.size())?)?;
        let value = match self.kind {
            ParamKind::Float => ParamValue::Float(read_f32(bytes, 0)),
            ParamKind::Vector => ParamValue::Vector(Vec4::from_array(read_f32s::<4>(bytes))),
            ParamKind::Matrix => ParamValue::Matrix(Mat4::from_cols_array(&read_f32s::<16>(bytes))),
            ParamKind::Texture(dim) => ParamValue::Texture {
                id: TextureId(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
                dim,
            },
        };
        Some(value)
    }
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn read_f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    std::array::from_fn(|i| read_f32(bytes, i * 4))
}

/// Ordered parameter list. Application order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBlock {
    params: Vec<ParamDesc>,
}

impl ParamBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: ParamDesc) -> &mut Self {
        self.params.push(param);
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParamDesc> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Smallest buffer length that holds every parameter.
    pub fn required_len(&self) -> usize {
        self.params
            .iter()
            .map(|p| p.offset + p.kind.size())
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<ParamDesc> for ParamBlock {
    fn from_iter<I: IntoIterator<Item = ParamDesc>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ParamBlock {
    type Item = &'a ParamDesc;
    type IntoIter = std::slice::Iter<'a, ParamDesc>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

/// Encodes `values` as a little-endian `f32` buffer.
pub fn encode_f32s(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_float_and_vector() {
        let buffer = encode_f32s(&[0.5, 1.0, 2.0, 3.0, 4.0]);
        let f = ParamDesc::new("alpha", ParamKind::Float, 0, 0);
        let v = ParamDesc::new("tint", ParamKind::Vector, 4, 1);
        assert_eq!(f.read(&buffer), Some(ParamValue::Float(0.5)));
        assert_eq!(
            v.read(&buffer),
            Some(ParamValue::Vector(Vec4::new(1.0, 2.0, 3.0, 4.0)))
        );
    }

    #[test]
    fn reads_column_major_matrix() {
        let cols = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0)).to_cols_array();
        let buffer = encode_f32s(&cols);
        let m = ParamDesc::new("world", ParamKind::Matrix, 0, 4);
        assert_eq!(m.read(&buffer), Some(ParamValue::Matrix(Mat4::from_cols_array(&cols))));
    }

    #[test]
    fn reads_texture_id() {
        let buffer = 9_u32.to_le_bytes();
        let t = ParamDesc::new("albedo", ParamKind::Texture(TextureDimension::Tex2D), 0, 0);
        assert_eq!(
            t.read(&buffer),
            Some(ParamValue::Texture {
                id: TextureId(9),
                dim: TextureDimension::Tex2D
            })
        );
    }

    #[test]
    fn short_buffer_reads_none() {
        let v = ParamDesc::new("tint", ParamKind::Vector, 8, 0);
        assert_eq!(v.read(&[0; 16]), None);
    }

    #[test]
    fn block_preserves_insertion_order() {
        let block: ParamBlock = ["c", "a", "b"]
            .iter()
            .enumerate()
            .map(|(i, n)| ParamDesc::new(*n, ParamKind::Float, i * 4, i as u32))
            .collect();
        let names: Vec<&str> = block.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
        assert_eq!(block.required_len(), 12);
    }

    #[test]
    fn float_widens_to_vector() {
        assert_eq!(ParamValue::Float(2.0).as_vector(), Some(Vec4::new(2.0, 0.0, 0.0, 0.0)));
        assert_eq!(ParamValue::Matrix(Mat4::IDENTITY).as_vector(), None);
    }
}
