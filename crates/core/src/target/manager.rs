//! Render-target attachment lifecycle.

use super::surface::{CubeFace, RenderSurface, SurfaceBacking, SurfaceDesc, SurfaceId, SurfaceKind};
use crate::backend::{Attachment, Backend, BlitMask, Capabilities, FramebufferTarget};
use crate::device::tracked::Tracked;
use crate::error::DeviceError;
use crate::lazy::LazySlot;
use crate::texture_map::TextureDimension;
use std::collections::BTreeMap;

/// The color/depth set currently attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTargets {
    pub colors: Vec<SurfaceId>,
    pub depth: SurfaceId,
    pub mip: u32,
    pub face: CubeFace,
}

impl ActiveTargets {
    pub fn back_buffer() -> Self {
        Self {
            colors: vec![SurfaceId::BACK_COLOR],
            depth: SurfaceId::BACK_DEPTH,
            mip: 0,
            face: CubeFace::default(),
        }
    }

    pub fn is_back_buffer(&self) -> bool {
        self.colors == [SurfaceId::BACK_COLOR]
    }

    pub fn uses(&self, id: SurfaceId) -> bool {
        self.depth == id || self.colors.contains(&id)
    }
}

/// Owns render surfaces and attaches them to the offscreen framebuffer.
///
/// Offscreen color lists may pair with `BACK_DEPTH`, which means "no depth
/// attachment". `BACK_COLOR` is only valid alone with `BACK_DEPTH`.
#[derive(Debug)]
pub struct RenderTargetManager {
    surfaces: BTreeMap<SurfaceId, RenderSurface>,
    next_id: u32,
    active: Tracked<ActiveTargets>,
    /// Color slots attached on the offscreen framebuffer, `None` when unknown.
    offscreen_colors: Option<usize>,
    back_buffer_size: (u32, u32),
    msaa_depth_fallback: bool,
}

impl RenderTargetManager {
    /// `msaa_depth_fallback` attaches a texture-free stand-in for
    /// texture-backed depth surfaces paired with multisampled color.
    pub fn new(msaa_depth_fallback: bool) -> Self {
        Self {
            surfaces: BTreeMap::new(),
            next_id: 2,
            active: Tracked::Unknown,
            offscreen_colors: None,
            back_buffer_size: (0, 0),
            msaa_depth_fallback,
        }
    }

    pub fn back_buffer_color(&self) -> SurfaceId {
        SurfaceId::BACK_COLOR
    }

    pub fn back_buffer_depth(&self) -> SurfaceId {
        SurfaceId::BACK_DEPTH
    }

    pub fn set_back_buffer_size(&mut self, width: u32, height: u32) {
        self.back_buffer_size = (width, height);
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&RenderSurface> {
        self.surfaces.get(&id)
    }

    pub fn active(&self) -> Option<&ActiveTargets> {
        self.active.known()
    }

    /// # Errors
    ///
    /// `InvalidDimensions` for a zero-sized surface, `InvalidConfig` for a
    /// depth format, `Backend` if the backend refuses the resource.
    pub fn create_color_surface<B: Backend>(
        &mut self,
        backend: &mut B,
        desc: SurfaceDesc,
    ) -> Result<SurfaceId, DeviceError> {
        self.create_surface(backend, desc, SurfaceKind::Color)
    }

    /// # Errors
    ///
    /// As [`RenderTargetManager::create_color_surface`], with the kinds swapped.
    pub fn create_depth_surface<B: Backend>(
        &mut self,
        backend: &mut B,
        desc: SurfaceDesc,
    ) -> Result<SurfaceId, DeviceError> {
        self.create_surface(backend, desc, SurfaceKind::Depth)
    }

    fn create_surface<B: Backend>(
        &mut self,
        backend: &mut B,
        mut desc: SurfaceDesc,
        kind: SurfaceKind,
    ) -> Result<SurfaceId, DeviceError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::InvalidDimensions);
        }
        if desc.kind() != kind {
            return Err(DeviceError::InvalidConfig {
                name: "format".to_string(),
                reason: format!("{:?} is not a {} format", desc.format, kind.name()),
            });
        }

        let caps = backend.capabilities();
        let max_samples = caps.max_samples.max(1);
        if desc.samples > max_samples {
            log::debug!("{} samples requested, clamping to {max_samples}", desc.samples);
            desc.samples = max_samples;
        }
        desc.samples = desc.samples.max(1);
        if desc.auto_mips && !caps.mip_generation {
            log::debug!("mip generation unsupported; auto mips disabled");
            desc.auto_mips = false;
        }

        let (texture, buffer) = match desc.backing {
            SurfaceBacking::Texture => (
                Some(backend.create_surface_texture(&desc).map_err(DeviceError::Backend)?),
                None,
            ),
            SurfaceBacking::Buffer => (
                None,
                Some(backend.create_render_buffer(&desc).map_err(DeviceError::Backend)?),
            ),
        };

        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        log::debug!(
            "created {} surface {id:?} ({}x{}, {} samples)",
            kind.name(),
            desc.width,
            desc.height,
            desc.samples
        );
        self.surfaces.insert(id, RenderSurface::new(desc, texture, buffer));
        Ok(id)
    }

    /// Makes `colors`/`depth` the active targets. Returns `true` if anything
    /// was attached, `false` if the request matched the active set.
    ///
    /// # Errors
    ///
    /// `UnknownSurface` or `SurfaceMismatch` for ids that do not name
    /// surfaces of the right kind. Nothing is issued on error.
    pub fn set_render_targets<B: Backend>(
        &mut self,
        backend: &mut B,
        colors: &[SurfaceId],
        depth: SurfaceId,
        mip: u32,
        face: CubeFace,
    ) -> Result<bool, DeviceError> {
        let request = self.validate(backend.capabilities(), colors, depth, mip, face)?;
        if self.active.is(&request) {
            return Ok(false);
        }

        self.regenerate_outgoing_mips(backend, &request);

        if request.is_back_buffer() {
            backend.bind_framebuffer(FramebufferTarget::BackBuffer);
        } else {
            backend.bind_framebuffer(FramebufferTarget::Offscreen);
            for (slot, id) in request.colors.iter().enumerate() {
                let attachment = self.surfaces.get(id).and_then(|s| s.attachment(mip, face));
                backend.attach_color(slot, attachment);
            }
            let attached = self
                .offscreen_colors
                .unwrap_or(backend.capabilities().max_color_attachments);
            for slot in request.colors.len()..attached {
                backend.attach_color(slot, None);
            }
            self.offscreen_colors = Some(request.colors.len());

            let depth_attachment = self.depth_attachment(backend, &request);
            backend.attach_depth(depth_attachment);
            backend.set_draw_buffer_count(request.colors.len());
        }

        log::trace!("render targets now {request:?}");
        self.active = Tracked::Known(request);
        Ok(true)
    }

    fn validate(
        &self,
        caps: &Capabilities,
        colors: &[SurfaceId],
        depth: SurfaceId,
        mip: u32,
        face: CubeFace,
    ) -> Result<ActiveTargets, DeviceError> {
        if colors == [SurfaceId::BACK_COLOR] {
            if depth != SurfaceId::BACK_DEPTH {
                return Err(DeviceError::SurfaceMismatch {
                    id: depth.0,
                    expected: "back-buffer depth",
                });
            }
            return Ok(ActiveTargets::back_buffer());
        }

        let max = caps.max_color_attachments;
        let colors = if colors.len() > max {
            log::warn!("{} color targets requested, {max} supported", colors.len());
            &colors[..max]
        } else {
            colors
        };
        for &id in colors {
            self.expect_kind(id, SurfaceKind::Color)?;
        }
        if depth != SurfaceId::BACK_DEPTH {
            self.expect_kind(depth, SurfaceKind::Depth)?;
        }

        Ok(ActiveTargets {
            colors: colors.to_vec(),
            depth,
            mip,
            face,
        })
    }

    fn expect_kind(&self, id: SurfaceId, kind: SurfaceKind) -> Result<&RenderSurface, DeviceError> {
        if id.is_back_buffer() {
            return Err(DeviceError::SurfaceMismatch {
                id: id.0,
                expected: "offscreen target",
            });
        }
        let surface = self
            .surfaces
            .get(&id)
            .ok_or(DeviceError::UnknownSurface(id.0))?;
        if surface.desc.kind() != kind {
            return Err(DeviceError::SurfaceMismatch {
                id: id.0,
                expected: kind.name(),
            });
        }
        Ok(surface)
    }

    /// Regenerates mips of the previous color 0 unless `request` keeps
    /// rendering into the same level of it.
    fn regenerate_outgoing_mips<B: Backend>(&self, backend: &mut B, request: &ActiveTargets) {
        let Some(previous) = self.active.known() else {
            return;
        };
        if previous.mip != 0 {
            return;
        }
        let same_color = previous.colors.first() == request.colors.first()
            && request.mip == previous.mip
            && request.face == previous.face;
        if same_color {
            return;
        }
        let Some(surface) = previous.colors.first().and_then(|id| self.surfaces.get(id)) else {
            return;
        };
        if let (true, Some(texture)) = (surface.desc.auto_mips, surface.texture) {
            backend.generate_mips(texture, surface.desc.dim);
        }
    }

    fn depth_attachment<B: Backend>(
        &mut self,
        backend: &mut B,
        request: &ActiveTargets,
    ) -> Option<Attachment> {
        if request.depth == SurfaceId::BACK_DEPTH {
            return None;
        }
        let color_samples = request
            .colors
            .first()
            .and_then(|id| self.surfaces.get(id))
            .map(|s| s.desc.samples)
            .filter(|&samples| samples > 1);

        let surface = self.surfaces.get_mut(&request.depth)?;
        if let (true, Some(samples), true) = (
            self.msaa_depth_fallback,
            color_samples,
            surface.is_texture_backed(),
        ) {
            let desc = SurfaceDesc {
                samples,
                backing: SurfaceBacking::Buffer,
                auto_mips: false,
                ..surface.desc.clone()
            };
            match surface
                .buffer_fallbacks
                .entry(samples)
                .or_default()
                .get_or_try_init(|| backend.create_render_buffer(&desc))
            {
                Ok(Some(buffer)) => return Some(Attachment::Buffer(buffer)),
                Ok(None) => {}
                Err(reason) => log::warn!("depth buffer stand-in failed: {reason}"),
            }
        }

        let face = if surface.desc.dim == TextureDimension::Cube {
            request.face
        } else {
            CubeFace::default()
        };
        surface.attachment(0, face)
    }

    /// Copies (and resolves, if multisampled) `src` into `dst`.
    ///
    /// Returns `false` if the backend cannot resolve.
    ///
    /// # Errors
    ///
    /// `UnknownSurface` or `SurfaceMismatch` unless both are color surfaces.
    pub fn resolve_color_surface<B: Backend>(
        &mut self,
        backend: &mut B,
        src: SurfaceId,
        dst: SurfaceId,
    ) -> Result<bool, DeviceError> {
        self.resolve(backend, src, dst, SurfaceKind::Color)
    }

    /// # Errors
    ///
    /// `UnknownSurface` or `SurfaceMismatch` unless both are depth surfaces.
    pub fn resolve_depth_surface<B: Backend>(
        &mut self,
        backend: &mut B,
        src: SurfaceId,
        dst: SurfaceId,
    ) -> Result<bool, DeviceError> {
        self.resolve(backend, src, dst, SurfaceKind::Depth)
    }

    fn resolve<B: Backend>(
        &mut self,
        backend: &mut B,
        src: SurfaceId,
        dst: SurfaceId,
        kind: SurfaceKind,
    ) -> Result<bool, DeviceError> {
        let from = self.expect_kind(src, kind)?;
        let to = self.expect_kind(dst, kind)?;
        if !backend.capabilities().multisample_resolve {
            log::debug!("multisample resolve unsupported");
            return Ok(false);
        }
        let (Some(src_attachment), Some(dst_attachment)) = (
            from.attachment(0, CubeFace::default()),
            to.attachment(0, CubeFace::default()),
        ) else {
            return Err(DeviceError::Backend("surface has no native resource".to_string()));
        };

        let width = from.desc.width.min(to.desc.width);
        let height = from.desc.height.min(to.desc.height);
        let mask = match kind {
            SurfaceKind::Color => BlitMask::Color,
            SurfaceKind::Depth => BlitMask::Depth,
        };
        let regenerate = to
            .texture
            .filter(|_| to.desc.auto_mips)
            .map(|texture| (texture, to.desc.dim));

        backend.begin_resolve(src_attachment, dst_attachment);
        backend.blit(mask, width, height);
        backend.end_resolve();
        if let Some((texture, dim)) = regenerate {
            backend.generate_mips(texture, dim);
        }
        Ok(true)
    }

    /// Releases a surface. An active surface is switched away from first.
    ///
    /// Returns `false` for the back-buffer sentinels, which are never destroyed.
    ///
    /// # Errors
    ///
    /// `UnknownSurface` if `id` does not name a live surface.
    pub fn destroy_surface<B: Backend>(
        &mut self,
        backend: &mut B,
        id: SurfaceId,
    ) -> Result<bool, DeviceError> {
        if id.is_back_buffer() {
            log::debug!("back-buffer surface {id:?} cannot be destroyed");
            return Ok(false);
        }
        if !self.surfaces.contains_key(&id) {
            return Err(DeviceError::UnknownSurface(id.0));
        }
        if self.active.known().is_some_and(|active| active.uses(id)) {
            log::warn!("render surface destroyed while active");
            self.set_render_targets(
                backend,
                &[SurfaceId::BACK_COLOR],
                SurfaceId::BACK_DEPTH,
                0,
                CubeFace::default(),
            )?;
        }

        if let Some(mut surface) = self.surfaces.remove(&id) {
            if let Some(texture) = surface.texture.take() {
                backend.delete_texture(texture);
            }
            if let Some(buffer) = surface.buffer.take() {
                backend.delete_render_buffer(buffer);
            }
            for buffer in surface.buffer_fallbacks.values_mut().filter_map(LazySlot::take) {
                backend.delete_render_buffer(buffer);
            }
        }
        Ok(true)
    }

    /// Number of color targets currently attached, 0 when unknown.
    pub fn active_color_count(&self) -> usize {
        self.active.known().map_or(0, |active| active.colors.len())
    }

    /// Pixel size of the active targets, for viewport setup.
    pub fn active_size(&self) -> Option<(u32, u32)> {
        let active = self.active.known()?;
        if active.is_back_buffer() {
            return Some(self.back_buffer_size);
        }
        let first = active.colors.first().copied().unwrap_or(active.depth);
        let surface = self.surfaces.get(&first)?;
        let shift = if first == active.depth { 0 } else { active.mip };
        Some((
            (surface.desc.width >> shift).max(1),
            (surface.desc.height >> shift).max(1),
        ))
    }

    /// Forgets what is attached. The next request re-attaches everything.
    pub fn invalidate(&mut self) {
        self.active.invalidate();
        self.offscreen_colors = None;
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, RecordingBackend};
    use crate::target::surface::SurfaceFormat;

    fn color(backend: &mut RecordingBackend, mgr: &mut RenderTargetManager) -> SurfaceId {
        mgr.create_color_surface(backend, SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64))
            .unwrap()
    }

    fn depth(backend: &mut RecordingBackend, mgr: &mut RenderTargetManager) -> SurfaceId {
        mgr.create_depth_surface(backend, SurfaceDesc::new(SurfaceFormat::Depth24Stencil8, 64, 64))
            .unwrap()
    }

    fn attachment_calls(backend: &RecordingBackend) -> usize {
        backend.count(Call::is_attachment)
    }

    #[test]
    fn identical_request_issues_nothing() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let c = color(&mut backend, &mut mgr);
        let d = depth(&mut backend, &mut mgr);

        assert!(mgr
            .set_render_targets(&mut backend, &[c], d, 0, CubeFace::default())
            .unwrap());
        backend.take_calls();
        assert!(!mgr
            .set_render_targets(&mut backend, &[c], d, 0, CubeFace::default())
            .unwrap());
        assert_eq!(attachment_calls(&backend), 0);
    }

    #[test]
    fn first_switch_detaches_every_extra_slot() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let c = color(&mut backend, &mut mgr);
        backend.take_calls();
        mgr.set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        let detaches = backend.count(|call| {
            matches!(
                call,
                Call::AttachColor {
                    attachment: None,
                    ..
                }
            )
        });
        assert_eq!(detaches, Capabilities::full().max_color_attachments - 1);
        assert!(backend.calls().contains(&Call::AttachDepth(None)));
        assert!(backend.calls().contains(&Call::DrawBufferCount(1)));
    }

    #[test]
    fn shrinking_color_set_detaches_only_dropped_slots() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let a = color(&mut backend, &mut mgr);
        let b = color(&mut backend, &mut mgr);
        let d = depth(&mut backend, &mut mgr);
        mgr.set_render_targets(&mut backend, &[a, b], d, 0, CubeFace::default())
            .unwrap();
        backend.take_calls();
        mgr.set_render_targets(&mut backend, &[a], d, 0, CubeFace::default())
            .unwrap();
        assert!(backend.calls().contains(&Call::AttachColor {
            slot: 1,
            attachment: None
        }));
        assert_eq!(
            backend.count(|call| matches!(call, Call::AttachColor { attachment: None, .. })),
            1
        );
    }

    #[test]
    fn mips_regenerate_when_switching_away() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64);
        desc.auto_mips = true;
        let c = mgr.create_color_surface(&mut backend, desc).unwrap();
        mgr.set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        backend.take_calls();
        mgr.set_render_targets(
            &mut backend,
            &[SurfaceId::BACK_COLOR],
            SurfaceId::BACK_DEPTH,
            0,
            CubeFace::default(),
        )
        .unwrap();
        assert_eq!(backend.count(|call| matches!(call, Call::GenerateMips(_))), 1);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::BindFramebuffer(FramebufferTarget::BackBuffer))
        );
    }

    #[test]
    fn msaa_depth_workaround_attaches_buffer_stand_in() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(true);
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64);
        desc.samples = 4;
        let c = mgr.create_color_surface(&mut backend, desc).unwrap();
        let d = depth(&mut backend, &mut mgr);
        backend.take_calls();

        mgr.set_render_targets(&mut backend, &[c], d, 0, CubeFace::default())
            .unwrap();
        let depth_call = backend
            .calls()
            .iter()
            .find(|call| matches!(call, Call::AttachDepth(_)))
            .cloned();
        assert!(
            matches!(depth_call, Some(Call::AttachDepth(Some(Attachment::Buffer(_))))),
            "expected buffer stand-in, got {depth_call:?}"
        );
    }

    #[test]
    fn msaa_depth_stand_in_follows_color_sample_count() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(true);
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64);
        desc.samples = 4;
        let c4 = mgr.create_color_surface(&mut backend, desc.clone()).unwrap();
        desc.samples = 8;
        let c8 = mgr.create_color_surface(&mut backend, desc).unwrap();
        let d = depth(&mut backend, &mut mgr);

        let attached_depth = |backend: &RecordingBackend| {
            backend.calls().iter().find_map(|call| match call {
                Call::AttachDepth(Some(Attachment::Buffer(buffer))) => Some(*buffer),
                _ => None,
            })
        };

        backend.take_calls();
        mgr.set_render_targets(&mut backend, &[c4], d, 0, CubeFace::default())
            .unwrap();
        let four = attached_depth(&backend).expect("4x stand-in attached");

        backend.take_calls();
        mgr.set_render_targets(&mut backend, &[c8], d, 0, CubeFace::default())
            .unwrap();
        let eight = attached_depth(&backend).expect("8x stand-in attached");
        assert_ne!(four, eight, "8x color needs its own depth buffer");
        assert_eq!(backend.count(|call| matches!(call, Call::CreateRenderBuffer(_))), 1);

        backend.take_calls();
        mgr.set_render_targets(&mut backend, &[c4], d, 0, CubeFace::default())
            .unwrap();
        assert_eq!(attached_depth(&backend), Some(four));
        assert_eq!(backend.count(|call| matches!(call, Call::CreateRenderBuffer(_))), 0);

        mgr.set_render_targets(
            &mut backend,
            &[SurfaceId::BACK_COLOR],
            SurfaceId::BACK_DEPTH,
            0,
            CubeFace::default(),
        )
        .unwrap();
        backend.take_calls();
        mgr.destroy_surface(&mut backend, d).unwrap();
        assert_eq!(
            backend.count(|call| matches!(call, Call::DeleteRenderBuffer(_))),
            2,
            "both stand-ins are released with the surface"
        );
    }

    #[test]
    fn keeping_color_zero_does_not_regenerate_mips() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64);
        desc.auto_mips = true;
        let c = mgr.create_color_surface(&mut backend, desc).unwrap();
        let d = depth(&mut backend, &mut mgr);
        mgr.set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        backend.take_calls();

        assert!(mgr
            .set_render_targets(&mut backend, &[c], d, 0, CubeFace::default())
            .unwrap());
        assert_eq!(backend.count(|call| matches!(call, Call::GenerateMips(_))), 0);
    }

    #[test]
    fn without_workaround_depth_texture_is_attached() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64);
        desc.samples = 4;
        let c = mgr.create_color_surface(&mut backend, desc).unwrap();
        let d = depth(&mut backend, &mut mgr);
        mgr.set_render_targets(&mut backend, &[c], d, 0, CubeFace::default())
            .unwrap();
        assert!(backend
            .calls()
            .iter()
            .any(|call| matches!(call, Call::AttachDepth(Some(Attachment::Texture { .. })))));
    }

    #[test]
    fn resolve_blits_between_helper_bindings() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let mut desc = SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 32);
        desc.samples = 4;
        let src = mgr.create_color_surface(&mut backend, desc).unwrap();
        let dst = color(&mut backend, &mut mgr);
        backend.take_calls();

        assert!(mgr.resolve_color_surface(&mut backend, src, dst).unwrap());
        let kinds: Vec<&str> = backend.calls().iter().map(Call::kind).collect();
        assert_eq!(kinds, ["begin_resolve", "blit", "end_resolve"]);
        assert!(backend.calls().contains(&Call::Blit {
            mask: BlitMask::Color,
            width: 64,
            height: 32
        }));
    }

    #[test]
    fn resolve_rejects_mismatched_kinds() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let c = color(&mut backend, &mut mgr);
        let d = depth(&mut backend, &mut mgr);
        let err = mgr.resolve_depth_surface(&mut backend, c, d).unwrap_err();
        assert!(matches!(err, DeviceError::SurfaceMismatch { .. }), "got {err:?}");
    }

    #[test]
    fn destroying_active_surface_switches_to_back_buffer() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let c = color(&mut backend, &mut mgr);
        mgr.set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        backend.take_calls();

        assert!(mgr.destroy_surface(&mut backend, c).unwrap());
        assert_eq!(
            backend.calls().first(),
            Some(&Call::BindFramebuffer(FramebufferTarget::BackBuffer))
        );
        assert!(mgr.active().is_some_and(ActiveTargets::is_back_buffer));
        assert!(mgr.surface(c).is_none());
    }

    #[test]
    fn back_buffer_sentinels_are_not_destroyed() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        assert!(!mgr.destroy_surface(&mut backend, SurfaceId::BACK_COLOR).unwrap());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let err = mgr
            .create_color_surface(&mut backend, SurfaceDesc::new(SurfaceFormat::Rgba8, 0, 8))
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidDimensions));
    }

    #[test]
    fn invalidate_forces_reattach() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let c = color(&mut backend, &mut mgr);
        mgr.set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        mgr.invalidate();
        assert_eq!(mgr.active_color_count(), 0);
        assert!(mgr
            .set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap());
    }

    #[test]
    fn active_size_follows_mip_level() {
        let mut backend = RecordingBackend::default();
        let mut mgr = RenderTargetManager::new(false);
        let c = color(&mut backend, &mut mgr);
        mgr.set_render_targets(&mut backend, &[c], SurfaceId::BACK_DEPTH, 2, CubeFace::default())
            .unwrap();
        assert_eq!(mgr.active_size(), Some((16, 16)));
    }
}
