//! Render-surface operations, routed through the device so ownership,
//! statistics and the error drain apply to them.

use super::tracked::Tracked;
use super::DeviceStateCache;
use crate::backend::Backend;
use crate::error::DeviceError;
use crate::target::{CubeFace, SurfaceDesc, SurfaceId};

impl<B: Backend> DeviceStateCache<B> {
    /// # Errors
    ///
    /// See [`crate::target::RenderTargetManager::create_color_surface`].
    pub fn create_color_surface(&mut self, desc: SurfaceDesc) -> Result<SurfaceId, DeviceError> {
        self.owned();
        self.targets.create_color_surface(&mut self.backend, desc)
    }

    /// # Errors
    ///
    /// See [`crate::target::RenderTargetManager::create_depth_surface`].
    pub fn create_depth_surface(&mut self, desc: SurfaceDesc) -> Result<SurfaceId, DeviceError> {
        self.owned();
        self.targets.create_depth_surface(&mut self.backend, desc)
    }

    pub fn set_back_buffer_size(&mut self, width: u32, height: u32) {
        self.owned();
        self.targets.set_back_buffer_size(width, height);
    }

    /// Makes `colors`/`depth` the active targets. Returns `false` if they
    /// already were.
    ///
    /// # Errors
    ///
    /// `UnknownSurface` or `SurfaceMismatch`; nothing is issued on error.
    pub fn set_render_targets(
        &mut self,
        colors: &[SurfaceId],
        depth: SurfaceId,
        mip: u32,
        face: CubeFace,
    ) -> Result<bool, DeviceError> {
        self.owned();
        self.assert_no_immediate();
        let switched = self
            .targets
            .set_render_targets(&mut self.backend, colors, depth, mip, face)?;
        if switched {
            self.stats.target_switches += 1;
            self.check_backend_errors();
        } else {
            self.stats.redundant_requests += 1;
        }
        Ok(switched)
    }

    /// Returns to the back-buffer pair.
    ///
    /// # Errors
    ///
    /// Never fails for the sentinels; the `Result` mirrors
    /// [`DeviceStateCache::set_render_targets`].
    pub fn set_back_buffer_targets(&mut self) -> Result<bool, DeviceError> {
        self.set_render_targets(&[SurfaceId::BACK_COLOR], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
    }

    /// # Errors
    ///
    /// `UnknownSurface` or `SurfaceMismatch` unless both are color surfaces.
    pub fn resolve_color_surface(&mut self, src: SurfaceId, dst: SurfaceId) -> Result<bool, DeviceError> {
        self.owned();
        self.assert_no_immediate();
        let resolved = self.targets.resolve_color_surface(&mut self.backend, src, dst)?;
        self.check_backend_errors();
        Ok(resolved)
    }

    /// # Errors
    ///
    /// `UnknownSurface` or `SurfaceMismatch` unless both are depth surfaces.
    pub fn resolve_depth_surface(&mut self, src: SurfaceId, dst: SurfaceId) -> Result<bool, DeviceError> {
        self.owned();
        self.assert_no_immediate();
        let resolved = self.targets.resolve_depth_surface(&mut self.backend, src, dst)?;
        self.check_backend_errors();
        Ok(resolved)
    }

    /// Releases a surface, switching to the back buffer first if it is
    /// active. Texture units sampling it become unknown.
    ///
    /// # Errors
    ///
    /// `UnknownSurface` if `id` does not name a live surface.
    pub fn destroy_surface(&mut self, id: SurfaceId) -> Result<bool, DeviceError> {
        self.owned();
        self.assert_no_immediate();
        let texture = self.targets.surface(id).and_then(|s| s.texture());
        let was_active = self.targets.active().is_some_and(|a| a.uses(id));
        let destroyed = self.targets.destroy_surface(&mut self.backend, id)?;
        if was_active {
            self.stats.target_switches += 1;
        }
        if let Some(texture) = texture {
            for unit in self.snapshot.units.iter_mut().filter(|u| u.holds(texture)) {
                unit.binding = Tracked::Unknown;
            }
        }
        Ok(destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Attachment, Call, Capabilities, RecordingBackend};
    use crate::config::{DeviceConfig, Workarounds};
    use crate::device::tests::device;
    use crate::target::{SurfaceBacking, SurfaceFormat};
    use crate::texture_map::TextureDimension;

    fn color(dev: &mut DeviceStateCache<RecordingBackend>) -> SurfaceId {
        dev.create_color_surface(SurfaceDesc::new(SurfaceFormat::Rgba8, 64, 64))
            .unwrap()
    }

    fn depth(dev: &mut DeviceStateCache<RecordingBackend>) -> SurfaceId {
        dev.create_depth_surface(SurfaceDesc::new(SurfaceFormat::Depth24Stencil8, 64, 64))
            .unwrap()
    }

    #[test]
    fn identical_targets_issue_no_attachments() {
        let mut dev = device();
        let c = color(&mut dev);
        let d = depth(&mut dev);
        assert!(dev.set_render_targets(&[c], d, 0, CubeFace::default()).unwrap());
        dev.backend_mut().take_calls();
        assert!(!dev.set_render_targets(&[c], d, 0, CubeFace::default()).unwrap());
        assert_eq!(dev.backend().count(Call::is_attachment), 0);
        assert_eq!(dev.stats().target_switches, 1);
    }

    #[test]
    fn invalidate_reattaches_once() {
        let mut dev = device();
        let c = color(&mut dev);
        dev.set_render_targets(&[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        dev.invalidate();
        dev.backend_mut().take_calls();
        dev.set_render_targets(&[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        dev.set_render_targets(&[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        assert_eq!(
            dev.backend()
                .count(|call| matches!(call, Call::BindFramebuffer(_))),
            1
        );
    }

    #[test]
    fn unknown_surface_issues_nothing() {
        let mut dev = device();
        let err = dev
            .set_render_targets(&[SurfaceId(99)], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap_err();
        assert!(matches!(err, DeviceError::UnknownSurface(99)));
        assert!(dev.backend().calls().is_empty());
    }

    #[test]
    fn destroying_active_surface_returns_to_back_buffer() {
        let mut dev = device();
        let c = color(&mut dev);
        dev.set_render_targets(&[c], SurfaceId::BACK_DEPTH, 0, CubeFace::default())
            .unwrap();
        assert!(dev.destroy_surface(c).unwrap());
        assert!(dev
            .render_targets()
            .active()
            .is_some_and(|a| a.is_back_buffer()));
        assert_eq!(dev.stats().target_switches, 2);
    }

    #[test]
    fn destroying_sampled_surface_forgets_its_unit() {
        let mut dev = device();
        let c = color(&mut dev);
        let texture = dev.render_targets().surface(c).and_then(|s| s.texture()).unwrap();
        dev.snapshot.units[0]
            .binding
            .update((TextureDimension::Tex2D, Some(texture)));
        dev.destroy_surface(c).unwrap();
        assert!(!dev.snapshot().units[0].binding.is_known());
    }

    #[test]
    fn back_buffer_cannot_be_destroyed() {
        let mut dev = device();
        assert!(!dev.destroy_surface(SurfaceId::BACK_COLOR).unwrap());
    }

    #[test]
    fn msaa_depth_fallback_comes_from_config() {
        let config = DeviceConfig {
            workarounds: Workarounds {
                msaa_depth_texture_fallback: true,
                ..Workarounds::default()
            },
            ..DeviceConfig::default()
        };
        let mut dev = DeviceStateCache::new(RecordingBackend::default(), config);
        let c = dev
            .create_color_surface(SurfaceDesc {
                samples: 4,
                ..SurfaceDesc::new(SurfaceFormat::Rgba8, 32, 32)
            })
            .unwrap();
        let d = dev
            .create_depth_surface(SurfaceDesc {
                backing: SurfaceBacking::Texture,
                ..SurfaceDesc::new(SurfaceFormat::Depth24Stencil8, 32, 32)
            })
            .unwrap();
        dev.set_render_targets(&[c], d, 0, CubeFace::default()).unwrap();
        assert!(dev
            .backend()
            .calls()
            .iter()
            .any(|call| matches!(call, Call::AttachDepth(Some(Attachment::Buffer(_))))));
    }

    #[test]
    fn resolve_reports_missing_capability() {
        let caps = Capabilities {
            multisample_resolve: false,
            ..Capabilities::full()
        };
        let mut dev = DeviceStateCache::new(RecordingBackend::new(caps), DeviceConfig::default());
        let a = color(&mut dev);
        let b = color(&mut dev);
        assert!(!dev.resolve_color_surface(a, b).unwrap());
        assert!(dev.resolve_depth_surface(a, b).is_err());
    }
}
