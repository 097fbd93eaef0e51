//! Immediate-mode vertex batches.

use crate::backend::Topology;
use glam::{Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImmediateVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub color: Vec4,
    pub tex_coord: Vec2,
}

/// Vertices collected between `immediate_begin` and `immediate_end`.
///
/// Normal, color and texture coordinate latch: each vertex takes the most
/// recently set values.
#[derive(Debug, Clone)]
pub struct ImmediateBatch {
    topology: Topology,
    vertices: Vec<ImmediateVertex>,
    current: ImmediateVertex,
}

impl ImmediateBatch {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            vertices: Vec::new(),
            current: ImmediateVertex {
                position: Vec3::ZERO,
                normal: Vec3::Z,
                color: Vec4::ONE,
                tex_coord: Vec2::ZERO,
            },
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn vertex(&mut self, position: Vec3) {
        self.current.position = position;
        self.vertices.push(self.current);
    }

    pub fn normal(&mut self, normal: Vec3) {
        self.current.normal = normal;
    }

    pub fn color(&mut self, color: Vec4) {
        self.current.color = color;
    }

    pub fn tex_coord(&mut self, tex_coord: Vec2) {
        self.current.tex_coord = tex_coord;
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Closes the batch, dropping a trailing incomplete primitive.
    pub fn finish(mut self) -> Vec<ImmediateVertex> {
        let usable = match self.topology.vertices_per_primitive() {
            Some(n) => self.vertices.len() - self.vertices.len() % n,
            None if self.vertices.len() < self.min_strip_len() => 0,
            None => self.vertices.len(),
        };
        if usable != self.vertices.len() {
            log::debug!(
                "dropping {} trailing immediate vertices for {:?}",
                self.vertices.len() - usable,
                self.topology
            );
            self.vertices.truncate(usable);
        }
        self.vertices
    }

    fn min_strip_len(&self) -> usize {
        match self.topology {
            Topology::LineStrip => 2,
            _ => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_latch_onto_following_vertices() {
        let mut batch = ImmediateBatch::new(Topology::Points);
        batch.color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        batch.vertex(Vec3::X);
        batch.vertex(Vec3::Y);
        let verts = batch.finish();
        assert!(verts.iter().all(|v| v.color == Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(verts[1].position, Vec3::Y);
    }

    #[test]
    fn incomplete_triangle_is_dropped() {
        let mut batch = ImmediateBatch::new(Topology::Triangles);
        for _ in 0..5 {
            batch.vertex(Vec3::ZERO);
        }
        assert_eq!(batch.finish().len(), 3);
    }

    #[test]
    fn short_strip_draws_nothing() {
        let mut batch = ImmediateBatch::new(Topology::TriangleStrip);
        batch.vertex(Vec3::ZERO);
        batch.vertex(Vec3::ONE);
        assert!(batch.finish().is_empty());
    }
}
