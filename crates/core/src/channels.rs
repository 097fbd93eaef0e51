//! Semantic vertex channels and their mapping onto pipeline input slots.
//!
//! A mesh exposes data by *channel* (position, normal, color, ...). A program
//! or the fixed-function stage reads data from *slots*. [`ChannelAssigns`]
//! records which channel feeds each slot, plus two derived bitmasks and a
//! "directly wired" flag that lets the mesh layer skip remapping when every
//! slot is fed by its canonical channel.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Semantic origin of a per-vertex data stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderChannel {
    Vertex,
    Normal,
    Color,
    TexCoord0,
    TexCoord1,
    Tangent,
    None,
}

impl ShaderChannel {
    /// Number of real channels (excluding `None`).
    pub const COUNT: usize = 6;

    /// All real channels in declaration order.
    pub const ALL: [ShaderChannel; Self::COUNT] = [
        ShaderChannel::Vertex,
        ShaderChannel::Normal,
        ShaderChannel::Color,
        ShaderChannel::TexCoord0,
        ShaderChannel::TexCoord1,
        ShaderChannel::Tangent,
    ];

    /// Bit for this channel in a used-channels mask. `None` has no bit.
    pub fn bit(self) -> u32 {
        match self {
            ShaderChannel::None => 0,
            other => 1 << (other as u32),
        }
    }
}

/// A concrete binding point a program or the fixed-function stage reads
/// vertex data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum VertexSlot {
    Vertex,
    Normal,
    Color,
    TexCoord0,
    TexCoord1,
    TexCoord2,
    TexCoord3,
    TexCoord4,
    TexCoord5,
    TexCoord6,
    TexCoord7,
    GenericAttrib0,
    GenericAttrib1,
    GenericAttrib2,
    GenericAttrib3,
    GenericAttrib4,
    GenericAttrib5,
    GenericAttrib6,
    GenericAttrib7,
    GenericAttrib8,
    GenericAttrib9,
    GenericAttrib10,
    GenericAttrib11,
    GenericAttrib12,
    GenericAttrib13,
    GenericAttrib14,
    GenericAttrib15,
    None,
}

impl VertexSlot {
    /// Number of real slots (excluding `None`).
    pub const COUNT: usize = 27;

    /// All real slots in index order.
    pub const ALL: [VertexSlot; Self::COUNT] = [
        VertexSlot::Vertex,
        VertexSlot::Normal,
        VertexSlot::Color,
        VertexSlot::TexCoord0,
        VertexSlot::TexCoord1,
        VertexSlot::TexCoord2,
        VertexSlot::TexCoord3,
        VertexSlot::TexCoord4,
        VertexSlot::TexCoord5,
        VertexSlot::TexCoord6,
        VertexSlot::TexCoord7,
        VertexSlot::GenericAttrib0,
        VertexSlot::GenericAttrib1,
        VertexSlot::GenericAttrib2,
        VertexSlot::GenericAttrib3,
        VertexSlot::GenericAttrib4,
        VertexSlot::GenericAttrib5,
        VertexSlot::GenericAttrib6,
        VertexSlot::GenericAttrib7,
        VertexSlot::GenericAttrib8,
        VertexSlot::GenericAttrib9,
        VertexSlot::GenericAttrib10,
        VertexSlot::GenericAttrib11,
        VertexSlot::GenericAttrib12,
        VertexSlot::GenericAttrib13,
        VertexSlot::GenericAttrib14,
        VertexSlot::GenericAttrib15,
    ];

    /// Index of this slot in [`VertexSlot::ALL`].
    ///
    /// # Panics
    ///
    /// Panics for `VertexSlot::None`, which has no index.
    pub fn index(self) -> usize {
        assert!(self != VertexSlot::None, "VertexSlot::None has no index");
        self as usize
    }

    /// Generic attribute slot `n`, if `n < 16`.
    pub fn generic(n: usize) -> Option<VertexSlot> {
        Self::ALL.get(VertexSlot::GenericAttrib0 as usize + n).copied()
            .filter(|_| n < 16)
    }

    /// Texture coordinate slot `n`, if `n < 8`.
    pub fn tex_coord(n: usize) -> Option<VertexSlot> {
        Self::ALL.get(VertexSlot::TexCoord0 as usize + n).copied()
            .filter(|_| n < 8)
    }

    /// The channel that feeds this slot when nothing is remapped.
    pub fn canonical_channel(self) -> Option<ShaderChannel> {
        match self {
            VertexSlot::Vertex | VertexSlot::GenericAttrib0 => Some(ShaderChannel::Vertex),
            VertexSlot::Normal | VertexSlot::GenericAttrib1 => Some(ShaderChannel::Normal),
            VertexSlot::Color | VertexSlot::GenericAttrib2 => Some(ShaderChannel::Color),
            VertexSlot::TexCoord0 | VertexSlot::GenericAttrib3 => Some(ShaderChannel::TexCoord0),
            VertexSlot::TexCoord1 | VertexSlot::GenericAttrib4 => Some(ShaderChannel::TexCoord1),
            VertexSlot::GenericAttrib5 => Some(ShaderChannel::Tangent),
            _ => None,
        }
    }
}

/// Maps semantic channels onto pipeline input slots.
///
/// The source array, the two bitmasks and the directly-wired flag always
/// agree. Binding a fresh slot can only clear the flag; unbinding (and
/// overwriting a cross-wired slot) re-scans every bound slot.
#[derive(Debug, Clone)]
pub struct ChannelAssigns {
    sources: [ShaderChannel; VertexSlot::COUNT],
    bound_slots: u32,
    used_channels: u32,
    directly_wired: bool,
}

impl ChannelAssigns {
    /// Creates an empty mapping. An empty mapping is directly wired.
    pub fn new() -> Self {
        Self {
            sources: [ShaderChannel::None; VertexSlot::COUNT],
            bound_slots: 0,
            used_channels: 0,
            directly_wired: true,
        }
    }

    /// Builds the mapping a mesh must honor for a program reading `inputs`.
    ///
    /// Each slot is fed by its canonical channel. Slots without one are
    /// skipped, since no mesh channel can satisfy them.
    pub fn from_program_inputs(inputs: &[VertexSlot]) -> Self {
        let mut assigns = Self::new();
        for &slot in inputs {
            match slot.canonical_channel() {
                Some(channel) => assigns.bind(channel, slot),
                None => log::debug!("program input {slot:?} has no canonical channel; left unbound"),
            }
        }
        assigns
    }

    /// Feeds `slot` from `channel`.
    ///
    /// # Panics
    ///
    /// Panics if `channel` or `slot` is `None`.
    pub fn bind(&mut self, channel: ShaderChannel, slot: VertexSlot) {
        assert!(channel != ShaderChannel::None, "cannot bind ShaderChannel::None");
        let index = slot.index();
        let previous = self.sources[index];

        self.sources[index] = channel;
        self.bound_slots |= 1 << index;
        self.used_channels |= channel.bit();

        if previous != ShaderChannel::None && previous != channel {
            // Overwriting may un-cross a slot or orphan a channel.
            self.rescan();
            return;
        }

        self.directly_wired &= slot.canonical_channel() == Some(channel);
    }

    /// Stops feeding `slot`. Re-scans to recompute the derived state.
    pub fn unbind(&mut self, slot: VertexSlot) {
        let index = slot.index();
        if self.sources[index] == ShaderChannel::None {
            return;
        }
        self.sources[index] = ShaderChannel::None;
        self.rescan();
    }

    /// Re-binds every bound slot of `other` into `self`; `other` wins conflicts.
    pub fn merge_with(&mut self, other: &ChannelAssigns) {
        for (slot, channel) in other.iter() {
            self.bind(channel, slot);
        }
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Channel feeding `slot`, or `ShaderChannel::None`.
    pub fn source_for(&self, slot: VertexSlot) -> ShaderChannel {
        if slot == VertexSlot::None {
            return ShaderChannel::None;
        }
        self.sources[slot.index()]
    }

    /// Bitmask of bound slots, indexed by [`VertexSlot::index`].
    pub fn bound_slots(&self) -> u32 {
        self.bound_slots
    }

    /// Bitmask of channels read by at least one slot.
    pub fn used_channels(&self) -> u32 {
        self.used_channels
    }

    pub fn uses_channel(&self, channel: ShaderChannel) -> bool {
        self.used_channels & channel.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bound_slots == 0
    }

    /// True when every bound slot is fed by its canonical channel.
    pub fn is_directly_wired(&self) -> bool {
        self.directly_wired
    }

    /// Iterates bound `(slot, channel)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (VertexSlot, ShaderChannel)> + '_ {
        VertexSlot::ALL
            .iter()
            .zip(self.sources.iter())
            .filter(|(_, channel)| **channel != ShaderChannel::None)
            .map(|(slot, channel)| (*slot, *channel))
    }

    fn rescan(&mut self) {
        let mut bound_slots = 0;
        let mut used_channels = 0;
        let mut directly_wired = true;
        for (index, (&slot, &channel)) in VertexSlot::ALL.iter().zip(self.sources.iter()).enumerate() {
            if channel == ShaderChannel::None {
                continue;
            }
            bound_slots |= 1 << index;
            used_channels |= channel.bit();
            directly_wired &= slot.canonical_channel() == Some(channel);
        }
        self.bound_slots = bound_slots;
        self.used_channels = used_channels;
        self.directly_wired = directly_wired;
    }
}

impl Default for ChannelAssigns {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ChannelAssigns {
    fn eq(&self, other: &Self) -> bool {
        self.bound_slots == other.bound_slots
            && self.used_channels == other.used_channels
            && self.sources == other.sources
    }
}

impl Eq for ChannelAssigns {}

impl Hash for ChannelAssigns {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bound_slots.hash(state);
        self.used_channels.hash(state);
        self.sources.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wired_by_table(assigns: &ChannelAssigns) -> bool {
        assigns
            .iter()
            .all(|(slot, channel)| slot.canonical_channel() == Some(channel))
    }

    #[test]
    fn empty_assigns_are_directly_wired() {
        let assigns = ChannelAssigns::new();
        assert!(assigns.is_empty());
        assert!(assigns.is_directly_wired());
        assert_eq!(assigns.bound_slots(), 0);
        assert_eq!(assigns.used_channels(), 0);
    }

    #[test]
    fn cross_then_uncross_restores_direct_wiring() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::Vertex, VertexSlot::Vertex);
        assigns.bind(ShaderChannel::Normal, VertexSlot::Normal);
        assigns.bind(ShaderChannel::TexCoord0, VertexSlot::TexCoord0);
        assert!(assigns.is_directly_wired());

        assigns.bind(ShaderChannel::TexCoord0, VertexSlot::TexCoord2);
        assert!(!assigns.is_directly_wired(), "TexCoord0 into TexCoord2 is cross-wired");

        assigns.unbind(VertexSlot::TexCoord2);
        assert!(assigns.is_directly_wired(), "unbinding the crossed slot restores wiring");
    }

    #[test]
    fn bind_updates_both_masks() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::Color, VertexSlot::Color);
        assert_eq!(assigns.bound_slots(), 1 << VertexSlot::Color.index());
        assert_eq!(assigns.used_channels(), ShaderChannel::Color.bit());
        assert!(assigns.uses_channel(ShaderChannel::Color));
        assert!(!assigns.uses_channel(ShaderChannel::Normal));
    }

    #[test]
    fn overwriting_slot_drops_orphaned_channel_bit() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::TexCoord1, VertexSlot::TexCoord0);
        assigns.bind(ShaderChannel::TexCoord0, VertexSlot::TexCoord0);
        assert!(!assigns.uses_channel(ShaderChannel::TexCoord1));
        assert!(assigns.is_directly_wired(), "slot is now fed canonically");
    }

    #[test]
    fn channel_shared_by_two_slots_survives_single_unbind() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::TexCoord0, VertexSlot::TexCoord0);
        assigns.bind(ShaderChannel::TexCoord0, VertexSlot::TexCoord1);
        assigns.unbind(VertexSlot::TexCoord1);
        assert!(assigns.uses_channel(ShaderChannel::TexCoord0));
        assert!(assigns.is_directly_wired());
    }

    #[test]
    fn unbind_of_unbound_slot_is_noop() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::Vertex, VertexSlot::Vertex);
        let before = assigns.clone();
        assigns.unbind(VertexSlot::Normal);
        assert_eq!(assigns, before);
    }

    #[test]
    #[should_panic(expected = "ShaderChannel::None")]
    fn binding_none_channel_panics() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::None, VertexSlot::Vertex);
    }

    #[test]
    fn merge_is_idempotent_union_with_other_winning() {
        let mut a = ChannelAssigns::new();
        a.bind(ShaderChannel::Vertex, VertexSlot::Vertex);
        a.bind(ShaderChannel::TexCoord1, VertexSlot::TexCoord0);

        let mut b = ChannelAssigns::new();
        b.bind(ShaderChannel::TexCoord0, VertexSlot::TexCoord0);
        b.bind(ShaderChannel::Normal, VertexSlot::Normal);

        a.merge_with(&b);
        assert_eq!(a.source_for(VertexSlot::TexCoord0), ShaderChannel::TexCoord0);
        assert_eq!(a.source_for(VertexSlot::Vertex), ShaderChannel::Vertex);
        assert_eq!(a.source_for(VertexSlot::Normal), ShaderChannel::Normal);

        let once = a.clone();
        a.merge_with(&b);
        assert_eq!(a, once, "merging the same mapping twice changes nothing");
    }

    #[test]
    fn program_inputs_produce_canonical_mapping() {
        let assigns = ChannelAssigns::from_program_inputs(&[
            VertexSlot::GenericAttrib0,
            VertexSlot::GenericAttrib1,
            VertexSlot::GenericAttrib5,
            VertexSlot::TexCoord6,
        ]);
        assert_eq!(assigns.source_for(VertexSlot::GenericAttrib0), ShaderChannel::Vertex);
        assert_eq!(assigns.source_for(VertexSlot::GenericAttrib5), ShaderChannel::Tangent);
        assert_eq!(assigns.source_for(VertexSlot::TexCoord6), ShaderChannel::None);
        assert!(assigns.is_directly_wired());
    }

    #[test]
    fn slot_helpers_respect_bounds() {
        assert_eq!(VertexSlot::generic(0), Some(VertexSlot::GenericAttrib0));
        assert_eq!(VertexSlot::generic(15), Some(VertexSlot::GenericAttrib15));
        assert_eq!(VertexSlot::generic(16), None);
        assert_eq!(VertexSlot::tex_coord(7), Some(VertexSlot::TexCoord7));
        assert_eq!(VertexSlot::tex_coord(8), None);
    }

    #[test]
    fn slot_index_matches_all_table() {
        for (i, slot) in VertexSlot::ALL.iter().enumerate() {
            assert_eq!(slot.index(), i, "index mismatch for {slot:?}");
        }
    }

    #[test]
    fn iter_yields_bound_pairs_in_slot_order() {
        let mut assigns = ChannelAssigns::new();
        assigns.bind(ShaderChannel::Normal, VertexSlot::Normal);
        assigns.bind(ShaderChannel::Vertex, VertexSlot::Vertex);
        let pairs: Vec<_> = assigns.iter().collect();
        assert_eq!(
            pairs,
            vec![
                (VertexSlot::Vertex, ShaderChannel::Vertex),
                (VertexSlot::Normal, ShaderChannel::Normal),
            ]
        );
        assert!(wired_by_table(&assigns));
    }

    // -- Property-based tests --

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Bind(ShaderChannel, VertexSlot),
            Unbind(VertexSlot),
        }

        fn any_channel() -> impl Strategy<Value = ShaderChannel> {
            (0..ShaderChannel::COUNT).prop_map(|i| ShaderChannel::ALL[i])
        }

        /// Strategy over a small slot subset so collisions are common.
        fn any_slot() -> impl Strategy<Value = VertexSlot> {
            (0..8_usize).prop_map(|i| VertexSlot::ALL[i])
        }

        fn any_op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => (any_channel(), any_slot()).prop_map(|(c, s)| Op::Bind(c, s)),
                1 => any_slot().prop_map(Op::Unbind),
            ]
        }

        proptest! {
            #[test]
            fn directly_wired_matches_table_after_any_sequence(
                ops in prop::collection::vec(any_op(), 0..40),
            ) {
                let mut assigns = ChannelAssigns::new();
                for op in ops {
                    match op {
                        Op::Bind(c, s) => assigns.bind(c, s),
                        Op::Unbind(s) => assigns.unbind(s),
                    }
                    prop_assert_eq!(assigns.is_directly_wired(), wired_by_table(&assigns));
                }
            }

            #[test]
            fn masks_agree_with_source_array(
                ops in prop::collection::vec(any_op(), 0..40),
            ) {
                let mut assigns = ChannelAssigns::new();
                for op in ops {
                    match op {
                        Op::Bind(c, s) => assigns.bind(c, s),
                        Op::Unbind(s) => assigns.unbind(s),
                    }
                }
                let mut slots = 0u32;
                let mut channels = 0u32;
                for (slot, channel) in assigns.iter() {
                    slots |= 1 << slot.index();
                    channels |= channel.bit();
                }
                prop_assert_eq!(assigns.bound_slots(), slots);
                prop_assert_eq!(assigns.used_channels(), channels);
            }

            #[test]
            fn equality_is_insensitive_to_bind_order(
                pairs in prop::collection::btree_map(any_slot(), any_channel(), 0..8),
            ) {
                let mut forward = ChannelAssigns::new();
                for (&slot, &channel) in pairs.iter() {
                    forward.bind(channel, slot);
                }
                let mut backward = ChannelAssigns::new();
                for (&slot, &channel) in pairs.iter().rev() {
                    backward.bind(channel, slot);
                }
                prop_assert_eq!(&forward, &backward);
                prop_assert_eq!(&backward, &forward);
                prop_assert_eq!(&forward, &forward.clone());
            }
        }
    }
}
