//! The device state cache.
//!
//! [`DeviceStateCache`] sits between the scene renderer and a [`Backend`].
//! Every request is diffed against a [`Snapshot`] of what the backend is
//! believed to hold; only the difference is issued, and the snapshot is
//! updated as calls go out. Fields start `Unknown` and return to `Unknown`
//! on [`DeviceStateCache::invalidate`], so the first request after a context
//! switch always reaches the backend.
//!
//! The operations are split by concern:
//!
//! - [`pipeline`] -- interned blend/depth/stencil/raster state, viewport, scissor.
//! - [`textures`] -- texture units, combiners, lights and fog.
//! - [`programs`] -- shader binding, parameter blocks and transforms.
//! - [`targets`] -- render surfaces.

pub mod fixed_function;
pub mod immediate;
pub mod ownership;
pub mod pipeline;
pub mod programs;
pub mod snapshot;
pub mod stats;
pub mod targets;
pub mod textures;
pub mod tracked;

pub use fixed_function::{
    CombineFunc, CombineOp, CombineSource, Light, LightKind, MatrixMode, TexGenMode,
    TextureCombiner,
};
pub use immediate::{ImmediateBatch, ImmediateVertex};
pub use ownership::DeviceOwnership;
pub use snapshot::Snapshot;
pub use stats::FrameStats;
pub use tracked::Tracked;

use crate::backend::{Backend, Capabilities, ClearFlags, Topology};
use crate::channels::ChannelAssigns;
use crate::config::DeviceConfig;
use crate::program::{FogMode, ParamBlock, ProgramRegistry, ShaderId, StageValueCache};
use crate::state::{ColorMask, StateObjects};
use crate::target::RenderTargetManager;
use crate::texture_map::TextureHandleMap;
use glam::{Mat4, Vec2, Vec3, Vec4};
use std::ops::Range;

/// Render-state cache in front of one backend.
pub struct DeviceStateCache<B: Backend> {
    backend: B,
    caps: Capabilities,
    config: DeviceConfig,
    ownership: DeviceOwnership,
    states: StateObjects,
    textures: TextureHandleMap,
    programs: ProgramRegistry,
    targets: RenderTargetManager,
    snapshot: Snapshot,
    value_caches: [StageValueCache; 2],
    pending_params: [Option<(ParamBlock, Vec<u8>)>; 2],
    matrices: [Option<Mat4>; 3],
    bound_shaders: [Option<ShaderId>; 2],
    fog_mode: FogMode,
    immediate: Option<ImmediateBatch>,
    stats: FrameStats,
}

impl<B: Backend> DeviceStateCache<B> {
    /// Wraps `backend`. The calling thread owns the new device.
    pub fn new(backend: B, config: DeviceConfig) -> Self {
        let caps = config.apply(backend.capabilities());
        log::debug!(
            "device created: {} texture units, {} lights, {} color attachments",
            caps.max_texture_units,
            caps.max_lights,
            caps.max_color_attachments
        );
        Self {
            snapshot: Snapshot::new(caps.max_texture_units, caps.max_lights),
            targets: RenderTargetManager::new(config.workarounds.msaa_depth_texture_fallback),
            backend,
            caps,
            config,
            ownership: DeviceOwnership::owned_by_current(),
            states: StateObjects::new(),
            textures: TextureHandleMap::new(),
            programs: ProgramRegistry::new(),
            value_caches: [StageValueCache::new(), StageValueCache::new()],
            pending_params: [None, None],
            matrices: [None; 3],
            bound_shaders: [None, None],
            fog_mode: FogMode::Disabled,
            immediate: None,
            stats: FrameStats::default(),
        }
    }

    /// Capabilities after configured limits.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Direct backend access. Calls made through it bypass the snapshot;
    /// follow them with [`DeviceStateCache::invalidate`].
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn state_objects(&self) -> &StateObjects {
        &self.states
    }

    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    pub fn render_targets(&self) -> &RenderTargetManager {
        &self.targets
    }

    pub fn texture_map(&self) -> &TextureHandleMap {
        &self.textures
    }

    // -- Ownership --

    /// Gives up ownership so another thread can [`DeviceStateCache::acquire`].
    pub fn release(&mut self) {
        self.ownership.release();
    }

    /// Takes ownership for the calling thread.
    ///
    /// Whatever the previous owner left bound is kept in the snapshot;
    /// invalidate if the context itself changed.
    pub fn acquire(&mut self) {
        self.ownership.acquire();
    }

    #[track_caller]
    fn owned(&self) {
        self.ownership.assert_owned();
    }

    #[track_caller]
    fn assert_no_immediate(&self) {
        assert!(
            self.immediate.is_none(),
            "binding change while an immediate batch is open"
        );
    }

    // -- Frame --

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Returns the counters so far and starts a new frame.
    pub fn reset_stats(&mut self) -> FrameStats {
        std::mem::take(&mut self.stats)
    }

    /// Forgets everything the snapshot knows. Pools, programs, textures and
    /// surfaces survive; only the belief about bound state is dropped.
    pub fn invalidate(&mut self) {
        self.owned();
        self.snapshot.invalidate();
        self.targets.invalidate();
        for cache in &mut self.value_caches {
            cache.clear();
        }
        log::debug!("device state invalidated");
    }

    /// Bulk-clears the state-object pools. Ids created before are stale.
    pub fn clear_state_objects(&mut self) {
        self.owned();
        self.states.clear();
        self.snapshot.blend_id.invalidate();
        self.snapshot.depth_id.invalidate();
        self.snapshot.stencil_id.invalidate();
        self.snapshot.raster_id.invalidate();
    }

    /// Clears the active targets. Write masks are forced open for the
    /// cleared buffers and the snapshot follows.
    pub fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32, stencil: u8) {
        self.owned();
        if flags.color && !self.snapshot.color_mask.is(&ColorMask::ALL) {
            self.apply_color_mask(ColorMask::ALL);
            self.snapshot.blend_id.invalidate();
        }
        if flags.depth && !self.snapshot.depth_write.is(&true) {
            self.apply_depth_write(true);
            self.snapshot.depth_id.invalidate();
        }
        if flags.stencil && !self.snapshot.stencil_write_mask.is(&0xFF) {
            self.apply_stencil_write_mask(0xFF);
            self.snapshot.stencil_id.invalidate();
        }
        self.backend.clear(flags, color, depth, stencil);
    }

    // -- Drawing --

    /// Flushes queued parameter blocks and dirty fixed-function transforms.
    /// Idempotent: a second call with nothing queued issues nothing.
    pub fn before_draw_call(&mut self) {
        self.owned();
        self.flush_params();
        self.flush_transforms();
        self.check_backend_errors();
    }

    /// Draws indexed geometry with `channels` wired to the vertex inputs.
    pub fn draw(
        &mut self,
        channels: &ChannelAssigns,
        indices: &[u16],
        topology: Topology,
        vertices: Range<u32>,
    ) {
        self.owned();
        self.assert_no_immediate();
        if indices.is_empty() {
            log::debug!("skipping draw with no indices");
            return;
        }
        self.before_draw_call();
        if !self.snapshot.vertex_inputs.is(channels) {
            self.backend.set_vertex_inputs(channels);
            self.snapshot.vertex_inputs = Tracked::Known(channels.clone());
        }
        self.backend.draw_indexed(topology, indices, vertices);
        self.stats.draw_calls += 1;
    }

    /// # Panics
    ///
    /// Panics if a batch is already open.
    pub fn immediate_begin(&mut self, topology: Topology) {
        self.owned();
        assert!(
            self.immediate.is_none(),
            "immediate_begin while a batch is already open"
        );
        self.immediate = Some(ImmediateBatch::new(topology));
    }

    pub fn immediate_vertex(&mut self, position: Vec3) {
        self.batch().vertex(position);
    }

    pub fn immediate_normal(&mut self, normal: Vec3) {
        self.batch().normal(normal);
    }

    pub fn immediate_color(&mut self, color: Vec4) {
        self.batch().color(color);
    }

    pub fn immediate_tex_coord(&mut self, tex_coord: Vec2) {
        self.batch().tex_coord(tex_coord);
    }

    /// Closes the batch and draws it.
    ///
    /// # Panics
    ///
    /// Panics if no batch is open.
    pub fn immediate_end(&mut self) {
        self.owned();
        let Some(batch) = self.immediate.take() else {
            panic!("immediate_end without immediate_begin");
        };
        let topology = batch.topology();
        let vertices = batch.finish();
        if vertices.is_empty() {
            return;
        }
        self.before_draw_call();
        self.backend.draw_immediate(topology, &vertices);
        // Immediate drawing rewires attribute arrays behind the snapshot.
        self.snapshot.vertex_inputs = Tracked::Unknown;
        self.stats.draw_calls += 1;
    }

    #[track_caller]
    fn batch(&mut self) -> &mut ImmediateBatch {
        self.owned();
        match self.immediate.as_mut() {
            Some(batch) => batch,
            None => panic!("immediate vertex data outside immediate_begin/immediate_end"),
        }
    }

    fn check_backend_errors(&mut self) {
        if !cfg!(debug_assertions) {
            return;
        }
        for error in self.backend.drain_errors() {
            log::error!("backend error: {error}");
            debug_assert!(
                !self.config.assert_on_backend_error,
                "backend error: {error}"
            );
        }
    }
}
