//! Interning pool for immutable state objects.
//!
//! Descriptors are looked up by exact key in an ordered map. A miss compiles
//! the descriptor once and stores the result; a hit returns the id handed
//! out the first time. Ids stay valid until the pool is bulk-cleared.

use super::StateDescriptor;
use crate::backend::Capabilities;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Stable handle to an interned state object.
///
/// Two ids compare equal iff they were produced by the same pool entry,
/// which by the pool's dedup invariant means the descriptors were identical.
pub struct StateId<S> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> S>,
}

impl<S> StateId<S> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Position of the object in its pool.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl<S> Clone for StateId<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for StateId<S> {}

impl<S> PartialEq for StateId<S> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<S> Eq for StateId<S> {}

impl<S> Hash for StateId<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<S> fmt::Debug for StateId<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateId({}@{})", self.index, self.generation)
    }
}

/// Deduplicating store of compiled state objects for one descriptor type.
pub struct StatePool<D: StateDescriptor> {
    lookup: BTreeMap<D::Key, u32>,
    objects: Vec<D::Compiled>,
    generation: u32,
}

impl<D: StateDescriptor> StatePool<D> {
    pub fn new() -> Self {
        Self {
            lookup: BTreeMap::new(),
            objects: Vec::new(),
            generation: 0,
        }
    }

    /// Returns the id for `desc`, compiling it on first sight.
    pub fn create_or_get(&mut self, desc: &D, caps: &Capabilities) -> StateId<D::Compiled> {
        let key = desc.key();
        if let Some(&index) = self.lookup.get(&key) {
            return StateId::new(index, self.generation);
        }

        let index = self.objects.len() as u32;
        self.objects.push(desc.compile(caps));
        self.lookup.insert(key, index);
        log::trace!("interned {} #{index}", D::NAME);
        StateId::new(index, self.generation)
    }

    /// The compiled object behind `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued before the last [`StatePool::clear`].
    pub fn get(&self, id: StateId<D::Compiled>) -> &D::Compiled {
        assert_eq!(
            id.generation, self.generation,
            "stale {} id used after the pool was cleared",
            D::NAME
        );
        &self.objects[id.index as usize]
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drops every object. Outstanding ids become stale.
    pub fn clear(&mut self) {
        self.lookup.clear();
        self.objects.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

impl<D: StateDescriptor> Default for StatePool<D> {
    fn default() -> Self {
        Self::new()
    }
}
