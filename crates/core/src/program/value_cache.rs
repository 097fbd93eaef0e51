//! Direct-mapped cache of uploaded constant register values.

use glam::Vec4;

/// Remembers the last vector uploaded to each of the first `N` constant
/// registers. Registers at or beyond `N` are never cached.
#[derive(Debug, Clone)]
pub struct ValueCache<const N: usize> {
    entries: [Option<Vec4>; N],
}

impl<const N: usize> ValueCache<N> {
    pub fn new() -> Self {
        Self { entries: [None; N] }
    }

    /// Records `value` for `index` and reports whether an upload is needed.
    pub fn needs_upload(&mut self, index: u32, value: Vec4) -> bool {
        let Some(entry) = self.entries.get_mut(index as usize) else {
            return true;
        };
        if *entry == Some(value) {
            return false;
        }
        *entry = Some(value);
        true
    }

    pub fn clear(&mut self) {
        self.entries = [None; N];
    }
}

impl<const N: usize> Default for ValueCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// The register cache used for per-stage constant uploads.
pub type StageValueCache = ValueCache<32>;
