//! Stable logical texture ids mapped to lazily created native textures.

use crate::backend::{Backend, NativeTexture};
use crate::lazy::LazySlot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical texture identifier handed out by the asset system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureDimension {
    #[serde(rename = "2d")]
    Tex2D,
    #[serde(rename = "3d")]
    Tex3D,
    Cube,
}

/// Insert-if-absent map from [`TextureId`] to native handle.
///
/// A failed creation is remembered and never retried until the id is
/// removed.
#[derive(Debug, Default)]
pub struct TextureHandleMap {
    slots: BTreeMap<TextureId, (TextureDimension, LazySlot<NativeTexture>)>,
}

impl TextureHandleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Native handle for `id`, created on first request.
    pub fn get_or_create<B: Backend>(
        &mut self,
        backend: &mut B,
        id: TextureId,
        dim: TextureDimension,
    ) -> Option<NativeTexture> {
        let (slot_dim, slot) = self
            .slots
            .entry(id)
            .or_insert((dim, LazySlot::NotRequested));
        if *slot_dim != dim {
            log::warn!("texture {id:?} requested as {dim:?} but was created as {slot_dim:?}");
        }
        match slot.get_or_try_init(|| backend.create_texture(dim)) {
            Ok(handle) => handle,
            Err(reason) => {
                log::warn!("failed to create texture {id:?}: {reason}");
                None
            }
        }
    }

    /// Associates an already created native texture with `id`.
    pub fn register(&mut self, id: TextureId, dim: TextureDimension, texture: NativeTexture) {
        self.slots.insert(id, (dim, LazySlot::Ready(texture)));
    }

    /// Native handle for `id` if it has been created.
    pub fn lookup(&self, id: TextureId) -> Option<NativeTexture> {
        self.slots.get(&id).and_then(|(_, slot)| slot.ready())
    }

    /// Forgets `id` and returns its native handle for release.
    pub fn remove(&mut self, id: TextureId) -> Option<NativeTexture> {
        self.slots.remove(&id).and_then(|(_, mut slot)| slot.take())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
