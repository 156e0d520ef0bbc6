use std::cell::{Cell, Ref, RefCell};

use crate::core::{Handle, Managed, Object};
use crate::device::{
    Attachment, Context, FramebufferId, FramebufferStatus, PixelFormat, PixelType, TextureId,
};

use super::{FilteringMode, Texture2D, TextureDepth, WrappingMode};

/// Off-screen framebuffer with a color texture and an optional depth texture.
///
/// The color texture is linear-filtered and clamped so it can be sampled by a
/// later pass. The depth texture may be replaced with one owned by another
/// target through [`RenderTarget::share_depth_buffer`]; it takes effect on the
/// next [`RenderTarget::bind`].
pub struct RenderTarget {
    object: Object,
    ctx: Context,
    /// Framebuffer name, deleted on drop.
    fbo: FramebufferId,
    width: u32,
    height: u32,
    /// Always present; shared with whoever samples the result.
    color: Handle<Texture2D>,
    /// Null for color-only targets, or after sharing a null handle.
    depth: RefCell<Handle<TextureDepth>>,
    /// Whether the framebuffer's depth attachment point currently holds a
    /// texture, so a later null depth handle can still be detached.
    depth_attached: Cell<bool>,
}

impl RenderTarget {
    /// RGBA8 color target, with a 16-bit depth texture when `with_depth` is set.
    pub fn new(ctx: &Context, width: u32, height: u32, with_depth: bool) -> Self {
        Self::with_format(
            ctx,
            width,
            height,
            with_depth,
            PixelFormat::Rgba,
            PixelType::UnsignedByte,
        )
    }

    /// Builds the framebuffer and checks it is complete.
    ///
    /// Leaves the previously bound framebuffer bound. Panics if the driver
    /// rejects the attachment combination.
    pub fn with_format(
        ctx: &Context,
        width: u32,
        height: u32,
        with_depth: bool,
        format: PixelFormat,
        ty: PixelType,
    ) -> Self {
        let color = Handle::new(Texture2D::new(
            ctx,
            width,
            height,
            format,
            ty,
            FilteringMode::Linear,
            WrappingMode::Clamp,
        ));
        let depth = if with_depth {
            Handle::new(TextureDepth::new(ctx, width, height, PixelType::UnsignedShort))
        } else {
            Handle::null()
        };

        let gl = ctx.gl();
        let previous = gl.bound_framebuffer();
        let fbo = gl.create_framebuffer();
        gl.bind_framebuffer(fbo);
        gl.framebuffer_texture_2d(Attachment::Color0, color.id());
        if let Some(depth) = depth.get() {
            gl.framebuffer_texture_2d(Attachment::Depth, depth.id());
        }
        let status = gl.check_framebuffer_status();
        gl.bind_framebuffer(previous);
        ctx.check_errors("RenderTarget::new");

        if status != FramebufferStatus::Complete {
            gl.delete_framebuffer(fbo);
            log::error!("render target {width}x{height} ({format:?}/{ty:?}) is incomplete: {status:?}");
            panic!("framebuffer incomplete: {status:?}");
        }
        log::debug!("render target {width}x{height} created (fbo {}, depth: {with_depth})", fbo.0);

        Self {
            object: Object::new("RenderTarget"),
            ctx: ctx.clone(),
            fbo,
            width,
            height,
            color,
            depth_attached: Cell::new(!depth.is_null()),
            depth: RefCell::new(depth),
        }
    }

    /// Redirects rendering into this target and sets the viewport to its size.
    ///
    /// Attachments are re-applied on every bind, which picks up a depth texture
    /// installed with [`RenderTarget::share_depth_buffer`].
    pub fn bind(&self, ctx: &Context) {
        debug_assert!(ctx.same(&self.ctx), "RenderTarget bound on a foreign context");
        let gl = ctx.gl();
        gl.bind_framebuffer(self.fbo);
        gl.framebuffer_texture_2d(Attachment::Color0, self.color.id());
        if let Some(depth) = self.depth.borrow().get() {
            gl.framebuffer_texture_2d(Attachment::Depth, depth.id());
            self.depth_attached.set(true);
        } else if self.depth_attached.replace(false) {
            gl.framebuffer_texture_2d(Attachment::Depth, TextureId::NONE);
        }

        let status = gl.check_framebuffer_status();
        assert!(
            status == FramebufferStatus::Complete,
            "render target bound while incomplete: {status:?}"
        );
        gl.viewport(0, 0, self.width as i32, self.height as i32);
        ctx.check_errors("RenderTarget::bind");
    }

    /// Detaches this target's textures and returns to the default framebuffer.
    pub fn unbind(&self, ctx: &Context) {
        debug_assert!(ctx.same(&self.ctx), "RenderTarget unbound on a foreign context");
        let gl = ctx.gl();
        if gl.bound_framebuffer() != self.fbo {
            gl.bind_framebuffer(self.fbo);
        }
        gl.framebuffer_texture_2d(Attachment::Color0, TextureId::NONE);
        if self.depth_attached.replace(false) {
            gl.framebuffer_texture_2d(Attachment::Depth, TextureId::NONE);
        }
        gl.bind_framebuffer(FramebufferId::NONE);
        ctx.check_errors("RenderTarget::unbind");
    }

    /// Replaces the depth texture with a shared one. Attached on the next bind.
    pub fn share_depth_buffer(&self, depth: &Handle<TextureDepth>) {
        if let Some(d) = depth.get() {
            debug_assert_eq!(
                d.size(),
                (self.width, self.height),
                "shared depth buffer does not match the render target size"
            );
        }
        self.depth.borrow_mut().assign(depth);
    }

    pub fn color_buffer(&self) -> &Handle<Texture2D> {
        &self.color
    }

    /// Current depth texture; null for a color-only target.
    pub fn depth_buffer(&self) -> Ref<'_, Handle<TextureDepth>> {
        self.depth.borrow()
    }

    pub fn framebuffer(&self) -> FramebufferId {
        self.fbo
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Managed for RenderTarget {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        let gl = self.ctx.gl();
        if gl.bound_framebuffer() == self.fbo {
            gl.bind_framebuffer(FramebufferId::NONE);
        }
        gl.delete_framebuffer(self.fbo);
        self.ctx.check_errors("RenderTarget::drop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TexImageTarget;
    use crate::render::test_context as context;

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn new_attaches_color_and_depth() {
        let (gl, ctx) = context();
        let target = RenderTarget::new(&ctx, 256, 128, true);
        let color = target.color_buffer().id();
        let depth = target.depth_buffer().id();

        let s = gl.state();
        let fbo = &s.framebuffers[&target.framebuffer()];
        assert_eq!((fbo.color, fbo.depth), (color, depth));

        let image = s.texture(color).unwrap().images[&TexImageTarget::Texture2D];
        assert_eq!((image.width, image.height), (256, 128));
        assert_eq!(image.format, PixelFormat::Rgba);
        let depth_image = s.texture(depth).unwrap().images[&TexImageTarget::Texture2D];
        assert_eq!(depth_image.ty, PixelType::UnsignedShort);
        assert_eq!(target.size(), (256, 128));
    }

    #[test]
    fn construction_restores_the_previous_framebuffer() {
        let (gl, ctx) = context();
        let outer = RenderTarget::new(&ctx, 64, 64, true);
        outer.bind(&ctx);

        let inner = RenderTarget::new(&ctx, 32, 32, false);
        assert_eq!(gl.state().framebuffer, outer.framebuffer());
        assert_ne!(inner.framebuffer(), outer.framebuffer());
        outer.unbind(&ctx);
    }

    #[test]
    fn color_texture_is_linear_and_clamped() {
        let (gl, ctx) = context();
        let target = RenderTarget::new(&ctx, 16, 16, false);
        let color = target.color_buffer().id();
        let s = gl.state();
        let obj = s.texture(color).unwrap();
        assert_eq!(obj.min_filter, crate::device::MinFilter::Linear);
        assert_eq!(obj.wrap_s, crate::device::Wrap::ClampToEdge);
        assert!(!obj.mipmapped);
    }

    #[test]
    #[should_panic(expected = "framebuffer incomplete")]
    fn depth_format_as_color_is_fatal() {
        let (_, ctx) = context();
        RenderTarget::with_format(
            &ctx,
            16,
            16,
            false,
            PixelFormat::DepthComponent,
            PixelType::UnsignedShort,
        );
    }

    // ── bind / unbind ─────────────────────────────────────────────────────

    #[test]
    fn bind_sets_the_viewport() {
        let (gl, ctx) = context();
        let target = RenderTarget::new(&ctx, 320, 200, true);
        target.bind(&ctx);
        {
            let s = gl.state();
            assert_eq!(s.framebuffer, target.framebuffer());
            assert_eq!(s.viewport, Some([0, 0, 320, 200]));
        }
        target.unbind(&ctx);
    }

    #[test]
    fn two_bind_cycles_end_on_the_default_framebuffer() {
        let (gl, ctx) = context();
        let target = RenderTarget::new(&ctx, 64, 64, true);
        for _ in 0..2 {
            target.bind(&ctx);
            target.unbind(&ctx);
        }

        let s = gl.state();
        assert_eq!(s.framebuffer, FramebufferId::NONE);
        assert!(s.errors.is_empty());
        let fbo = &s.framebuffers[&target.framebuffer()];
        assert_eq!((fbo.color, fbo.depth), (TextureId::NONE, TextureId::NONE));
    }

    #[test]
    fn color_only_target_never_touches_depth() {
        let (gl, ctx) = context();
        let target = RenderTarget::new(&ctx, 64, 64, false);
        assert!(target.depth_buffer().is_null());
        target.bind(&ctx);
        target.unbind(&ctx);
        target.bind(&ctx);
        target.unbind(&ctx);

        let s = gl.state();
        assert!(s.calls("framebuffer_texture_2d(Depth").is_empty());
        assert_eq!(s.calls("framebuffer_texture_2d(Color0").len(), 5);
    }

    // ── depth sharing ─────────────────────────────────────────────────────

    #[test]
    fn shared_depth_is_attached_on_next_bind() {
        let (gl, ctx) = context();
        let main = RenderTarget::new(&ctx, 64, 64, true);
        let post = RenderTarget::new(&ctx, 64, 64, true);
        let shared = main.depth_buffer().clone();
        let old = post.depth_buffer().id();

        post.share_depth_buffer(&shared);
        assert_eq!(shared.ref_count(), 3);
        // Nothing is reattached yet.
        assert_eq!(gl.state().framebuffers[&post.framebuffer()].depth, old);

        post.bind(&ctx);
        assert_eq!(gl.state().framebuffers[&post.framebuffer()].depth, shared.id());
        post.unbind(&ctx);
    }

    #[test]
    fn sharing_a_null_depth_detaches_the_old_one() {
        let (gl, ctx) = context();
        let target = RenderTarget::new(&ctx, 64, 64, true);
        let old = target.depth_buffer().id();

        target.share_depth_buffer(&Handle::null());
        assert!(target.depth_buffer().is_null());
        // The old texture is deleted but still attached until the next bind.
        assert_eq!(gl.state().framebuffers[&target.framebuffer()].depth, old);

        target.bind(&ctx);
        {
            let s = gl.state();
            assert_eq!(s.framebuffers[&target.framebuffer()].depth, TextureId::NONE);
            assert!(s.orphaned_textures.is_empty());
            assert!(s.errors.is_empty());
        }
        target.unbind(&ctx);
        target.bind(&ctx);
        target.unbind(&ctx);
        assert_eq!(gl.state().calls("framebuffer_texture_2d(Depth").len(), 2);
    }

    #[test]
    fn dropping_a_target_keeps_a_shared_depth_alive() {
        let (gl, ctx) = context();
        let main = RenderTarget::new(&ctx, 64, 64, true);
        let shared = main.depth_buffer().clone();
        {
            let post = RenderTarget::new(&ctx, 64, 64, false);
            post.share_depth_buffer(&shared);
        }
        assert_eq!(shared.ref_count(), 2);
        assert!(gl.state().texture(shared.id()).is_some());
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn drop_releases_every_name() {
        let (gl, ctx) = context();
        let before = gl.state().live_names();
        let target = RenderTarget::new(&ctx, 64, 64, true);
        target.bind(&ctx);
        drop(target);

        let s = gl.state();
        assert_eq!(s.live_names(), before);
        assert_eq!(s.framebuffer, FramebufferId::NONE);
    }
}
