use std::cell::Cell;

use crate::core::{Managed, Object};
use crate::device::{
    Context, CubeFace, GlApi, MagFilter, MinFilter, PixelFormat, PixelType, TexImageTarget,
    TexParameter, TextureId, TextureTarget, Wrap,
};

use super::Image;

/// Sampling policy applied when a texture's contents are specified.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FilteringMode {
    /// Nearest texel, no mipmaps.
    Nearest,
    /// Linear in both directions, no mipmaps.
    Linear,
    /// Linear magnification, nearest texel of the nearest mip level.
    Bilinear,
    /// Linear magnification, nearest texel blended across mip levels.
    #[default]
    Trilinear,
}

impl FilteringMode {
    fn filters(self) -> (MinFilter, MagFilter) {
        match self {
            FilteringMode::Nearest => (MinFilter::Nearest, MagFilter::Nearest),
            FilteringMode::Linear => (MinFilter::Linear, MagFilter::Linear),
            FilteringMode::Bilinear => (MinFilter::NearestMipmapNearest, MagFilter::Linear),
            FilteringMode::Trilinear => (MinFilter::NearestMipmapLinear, MagFilter::Linear),
        }
    }

    pub fn uses_mipmaps(self) -> bool {
        matches!(self, FilteringMode::Bilinear | FilteringMode::Trilinear)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum WrappingMode {
    Clamp,
    #[default]
    Repeat,
}

impl WrappingMode {
    fn wrap(self) -> Wrap {
        match self {
            WrappingMode::Clamp => Wrap::ClampToEdge,
            WrappingMode::Repeat => Wrap::Repeat,
        }
    }
}

fn apply_filtering(gl: &dyn GlApi, target: TextureTarget, filtering: FilteringMode) {
    let (min, mag) = filtering.filters();
    gl.tex_parameter(target, TexParameter::MinFilter(min));
    gl.tex_parameter(target, TexParameter::MagFilter(mag));
    if filtering.uses_mipmaps() {
        gl.generate_mipmap(target);
    }
}

fn apply_wrapping(gl: &dyn GlApi, target: TextureTarget, wrapping: WrappingMode) {
    gl.tex_parameter(target, TexParameter::WrapS(wrapping.wrap()));
    gl.tex_parameter(target, TexParameter::WrapT(wrapping.wrap()));
}

fn warn_if_not_pot_square(image: &Image) {
    if !image.is_pot_square() {
        log::warn!(
            "image is not a power-of-two square texture (w:{}, h:{})",
            image.width(),
            image.height()
        );
    }
}

/// Owner of one GPU texture name.
///
/// The name is deleted on drop, including names adopted with
/// [`Texture::from_raw`].
pub struct Texture {
    object: Object,
    ctx: Context,
    id: TextureId,
}

impl Texture {
    /// Allocates a fresh texture name.
    pub fn new(ctx: &Context) -> Self {
        Self::create(ctx, "Texture")
    }

    /// Takes ownership of a name created elsewhere.
    pub fn from_raw(ctx: &Context, id: TextureId) -> Self {
        Self {
            object: Object::new("Texture"),
            ctx: ctx.clone(),
            id,
        }
    }

    fn create(ctx: &Context, name: &'static str) -> Self {
        let id = ctx.gl().create_texture();
        ctx.check_errors("Texture::new");
        Self {
            object: Object::new(name),
            ctx: ctx.clone(),
            id,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Managed for Texture {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.ctx.gl().delete_texture(self.id);
        self.ctx.check_errors("Texture::drop");
    }
}

/// Runs `f` with `texture` bound at `target` on the active unit, then restores
/// whatever was bound before.
fn with_bound(ctx: &Context, target: TextureTarget, texture: TextureId, f: impl FnOnce(&dyn GlApi)) {
    let gl = ctx.gl();
    let previous = gl.bound_texture(target);
    gl.bind_texture(target, texture);
    f(gl);
    gl.bind_texture(target, previous);
}

/// 2D color texture.
pub struct Texture2D {
    texture: Texture,
    /// Level-0 size, updated by every upload.
    size: Cell<(u32, u32)>,
    /// Sampling state last applied; mipmaps exist iff it uses them.
    filtering: Cell<FilteringMode>,
    wrapping: Cell<WrappingMode>,
}

impl Texture2D {
    /// Allocates `width` x `height` storage without contents and applies the
    /// sampling policy.
    pub fn new(
        ctx: &Context,
        width: u32,
        height: u32,
        format: PixelFormat,
        ty: PixelType,
        filtering: FilteringMode,
        wrapping: WrappingMode,
    ) -> Self {
        let texture = Texture::create(ctx, "Texture2D");
        with_bound(ctx, TextureTarget::Texture2D, texture.id(), |gl| {
            gl.tex_image_2d(TexImageTarget::Texture2D, format, width, height, ty, None);
            apply_filtering(gl, TextureTarget::Texture2D, filtering);
            apply_wrapping(gl, TextureTarget::Texture2D, wrapping);
        });
        ctx.check_errors("Texture2D::new");

        Self {
            texture,
            size: Cell::new((width, height)),
            filtering: Cell::new(filtering),
            wrapping: Cell::new(wrapping),
        }
    }

    /// A texture name without storage, to be filled by [`Texture2D::set_data`].
    pub fn empty(ctx: &Context) -> Self {
        Self {
            texture: Texture::create(ctx, "Texture2D"),
            size: Cell::new((0, 0)),
            filtering: Cell::new(FilteringMode::default()),
            wrapping: Cell::new(WrappingMode::default()),
        }
    }

    /// Replaces the contents with `image` and reapplies the sampling policy.
    ///
    /// Images that are not power-of-two squares are uploaded anyway, with a warning.
    pub fn set_data(
        &self,
        ctx: &Context,
        image: &Image,
        filtering: FilteringMode,
        wrapping: WrappingMode,
    ) {
        debug_assert!(ctx.same(self.texture.context()), "Texture2D updated on a foreign context");
        warn_if_not_pot_square(image);

        with_bound(ctx, TextureTarget::Texture2D, self.id(), |gl| {
            gl.tex_image_2d(
                TexImageTarget::Texture2D,
                image.pixel_format(),
                image.width(),
                image.height(),
                PixelType::UnsignedByte,
                Some(image.data()),
            );
            apply_filtering(gl, TextureTarget::Texture2D, filtering);
            apply_wrapping(gl, TextureTarget::Texture2D, wrapping);
        });
        ctx.check_errors("Texture2D::set_data");

        self.size.set((image.width(), image.height()));
        self.filtering.set(filtering);
        self.wrapping.set(wrapping);
    }

    pub fn id(&self) -> TextureId {
        self.texture.id()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        self.size.get()
    }

    pub fn filtering(&self) -> FilteringMode {
        self.filtering.get()
    }

    pub fn wrapping(&self) -> WrappingMode {
        self.wrapping.get()
    }
}

impl Managed for Texture2D {
    fn object(&self) -> &Object {
        self.texture.object()
    }
}

/// Six-face cube map. Always clamps; only [`FilteringMode::Nearest`] and
/// [`FilteringMode::Linear`] are supported.
pub struct TextureCube {
    texture: Texture,
    filtering: Cell<Option<FilteringMode>>,
}

impl TextureCube {
    pub fn new(ctx: &Context) -> Self {
        Self {
            texture: Texture::create(ctx, "TextureCube"),
            filtering: Cell::new(None),
        }
    }

    /// Uploads one image per face in [`CubeFace::ALL`] order (+X, -X, +Y, -Y, +Z, -Z).
    ///
    /// Panics on a mipmapped filtering mode, before anything is uploaded.
    pub fn set_data(&self, ctx: &Context, faces: [&Image; 6], filtering: FilteringMode) {
        assert!(
            matches!(filtering, FilteringMode::Nearest | FilteringMode::Linear),
            "cube maps support only nearest or linear filtering, got {filtering:?}"
        );
        debug_assert!(ctx.same(self.texture.context()), "TextureCube updated on a foreign context");

        with_bound(ctx, TextureTarget::CubeMap, self.id(), |gl| {
            for (face, image) in CubeFace::ALL.into_iter().zip(faces) {
                warn_if_not_pot_square(image);
                gl.tex_image_2d(
                    TexImageTarget::CubeFace(face),
                    image.pixel_format(),
                    image.width(),
                    image.height(),
                    PixelType::UnsignedByte,
                    Some(image.data()),
                );
            }
            apply_filtering(gl, TextureTarget::CubeMap, filtering);
            apply_wrapping(gl, TextureTarget::CubeMap, WrappingMode::Clamp);
        });
        ctx.check_errors("TextureCube::set_data");
        self.filtering.set(Some(filtering));
    }

    pub fn id(&self) -> TextureId {
        self.texture.id()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    /// Filtering of the last upload, `None` before any.
    pub fn filtering(&self) -> Option<FilteringMode> {
        self.filtering.get()
    }
}

impl Managed for TextureCube {
    fn object(&self) -> &Object {
        self.texture.object()
    }
}

/// Depth-only 2D texture, nearest-filtered and clamped; used as a render
/// target depth attachment.
pub struct TextureDepth {
    texture: Texture,
    width: u32,
    height: u32,
}

impl TextureDepth {
    /// `ty` is the depth precision, e.g. [`PixelType::UnsignedShort`].
    pub fn new(ctx: &Context, width: u32, height: u32, ty: PixelType) -> Self {
        let texture = Texture::create(ctx, "TextureDepth");
        with_bound(ctx, TextureTarget::Texture2D, texture.id(), |gl| {
            apply_filtering(gl, TextureTarget::Texture2D, FilteringMode::Nearest);
            apply_wrapping(gl, TextureTarget::Texture2D, WrappingMode::Clamp);
            gl.tex_image_2d(
                TexImageTarget::Texture2D,
                PixelFormat::DepthComponent,
                width,
                height,
                ty,
                None,
            );
        });
        ctx.check_errors("TextureDepth::new");

        Self {
            texture,
            width,
            height,
        }
    }

    pub fn id(&self) -> TextureId {
        self.texture.id()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Managed for TextureDepth {
    fn object(&self) -> &Object {
        self.texture.object()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::core::Handle;
    use crate::render::test_context as context;

    fn rgba(size: u32) -> Image {
        Image::new(size, size, 4)
    }

    // ── Texture ───────────────────────────────────────────────────────────

    #[test]
    fn adopted_names_are_deleted_on_drop() {
        let (gl, ctx) = context();
        let id = ctx.gl().create_texture();
        drop(Texture::from_raw(&ctx, id));
        assert!(gl.state().texture(id).is_none());
    }

    // ── Texture2D ─────────────────────────────────────────────────────────

    #[test]
    fn new_allocates_storage_and_restores_binding() {
        let (gl, ctx) = context();
        let other = Texture2D::empty(&ctx);
        ctx.gl().bind_texture(TextureTarget::Texture2D, other.id());

        let tex = Texture2D::new(
            &ctx,
            64,
            64,
            PixelFormat::Rgba,
            PixelType::UnsignedByte,
            FilteringMode::Trilinear,
            WrappingMode::Repeat,
        );

        let s = gl.state();
        let obj = s.texture(tex.id()).unwrap();
        let image = obj.images[&TexImageTarget::Texture2D];
        assert_eq!((image.width, image.height), (64, 64));
        assert!(!image.has_pixels);
        assert_eq!(obj.min_filter, MinFilter::NearestMipmapLinear);
        assert!(obj.mipmapped);
        assert_eq!(s.bound_texture(TextureTarget::Texture2D), other.id());
    }

    #[test]
    fn set_data_applies_the_requested_sampling() {
        let (gl, ctx) = context();
        let tex = Texture2D::new(
            &ctx,
            8,
            8,
            PixelFormat::Rgba,
            PixelType::UnsignedByte,
            FilteringMode::Linear,
            WrappingMode::Clamp,
        );
        tex.set_data(&ctx, &rgba(8), FilteringMode::Linear, WrappingMode::Clamp);

        let s = gl.state();
        let obj = s.texture(tex.id()).unwrap();
        assert_eq!(obj.min_filter, MinFilter::Linear);
        assert_eq!(obj.mag_filter, MagFilter::Linear);
        assert_eq!((obj.wrap_s, obj.wrap_t), (Wrap::ClampToEdge, Wrap::ClampToEdge));
        assert!(!obj.mipmapped);
        assert!(obj.images[&TexImageTarget::Texture2D].has_pixels);
        assert_eq!(tex.filtering(), FilteringMode::Linear);
        assert_eq!(tex.wrapping(), WrappingMode::Clamp);
    }

    #[test]
    fn set_data_overrides_constructor_sampling() {
        let (gl, ctx) = context();
        let tex = Texture2D::empty(&ctx);
        tex.set_data(&ctx, &rgba(8), FilteringMode::Bilinear, WrappingMode::Repeat);
        {
            let s = gl.state();
            let obj = s.texture(tex.id()).unwrap();
            assert_eq!(obj.min_filter, MinFilter::NearestMipmapNearest);
            assert!(obj.mipmapped);
        }

        tex.set_data(&ctx, &rgba(8), FilteringMode::Nearest, WrappingMode::Clamp);
        let s = gl.state();
        let obj = s.texture(tex.id()).unwrap();
        assert_eq!(obj.min_filter, MinFilter::Nearest);
        assert_eq!(obj.wrap_s, Wrap::ClampToEdge);
    }

    #[test]
    fn rgb_images_upload_as_rgb() {
        let (gl, ctx) = context();
        let tex = Texture2D::empty(&ctx);
        tex.set_data(&ctx, &Image::new(4, 4, 3), FilteringMode::Linear, WrappingMode::Repeat);
        let s = gl.state();
        let image = s.texture(tex.id()).unwrap().images[&TexImageTarget::Texture2D];
        assert_eq!(image.format, PixelFormat::Rgb);
    }

    #[test]
    fn npot_images_still_upload() {
        let (gl, ctx) = context();
        let tex = Texture2D::empty(&ctx);
        tex.set_data(&ctx, &Image::new(6, 3, 4), FilteringMode::Linear, WrappingMode::Clamp);
        assert_eq!(tex.size(), (6, 3));
        let s = gl.state();
        let image = s.texture(tex.id()).unwrap().images[&TexImageTarget::Texture2D];
        assert_eq!((image.width, image.height), (6, 3));
    }

    // ── TextureCube ───────────────────────────────────────────────────────

    #[test]
    fn cube_uploads_all_faces_clamped() {
        let (gl, ctx) = context();
        let cube = TextureCube::new(&ctx);
        let faces: Vec<Image> = (0..6).map(|_| rgba(16)).collect();
        let refs = [&faces[0], &faces[1], &faces[2], &faces[3], &faces[4], &faces[5]];
        cube.set_data(&ctx, refs, FilteringMode::Linear);

        let s = gl.state();
        let obj = s.texture(cube.id()).unwrap();
        assert_eq!(obj.images.len(), 6);
        assert!(CubeFace::ALL
            .iter()
            .all(|f| obj.images.contains_key(&TexImageTarget::CubeFace(*f))));
        assert_eq!((obj.wrap_s, obj.wrap_t), (Wrap::ClampToEdge, Wrap::ClampToEdge));
        assert_eq!(obj.min_filter, MinFilter::Linear);
        assert_eq!(s.bound_texture(TextureTarget::CubeMap), TextureId::NONE);
        assert_eq!(cube.filtering(), Some(FilteringMode::Linear));
    }

    #[test]
    #[should_panic(expected = "cube maps support only nearest or linear filtering")]
    fn cube_rejects_bilinear() {
        let (_, ctx) = context();
        let cube = TextureCube::new(&ctx);
        let face = rgba(4);
        cube.set_data(&ctx, [&face; 6], FilteringMode::Bilinear);
    }

    #[test]
    fn cube_rejection_happens_before_upload() {
        let (gl, ctx) = context();
        let cube = TextureCube::new(&ctx);
        let face = rgba(4);

        let result = catch_unwind(AssertUnwindSafe(|| {
            cube.set_data(&ctx, [&face; 6], FilteringMode::Trilinear);
        }));
        assert!(result.is_err());

        let s = gl.state();
        assert!(s.calls("tex_image_2d").is_empty());
        assert!(s.texture(cube.id()).unwrap().images.is_empty());
        assert_eq!(cube.filtering(), None);
    }

    // ── TextureDepth ──────────────────────────────────────────────────────

    #[test]
    fn depth_texture_is_nearest_and_clamped() {
        let (gl, ctx) = context();
        let depth = Handle::new(TextureDepth::new(&ctx, 32, 16, PixelType::UnsignedShort));

        let s = gl.state();
        let obj = s.texture(depth.id()).unwrap();
        let image = obj.images[&TexImageTarget::Texture2D];
        assert_eq!(image.format, PixelFormat::DepthComponent);
        assert_eq!((image.width, image.height), (32, 16));
        assert_eq!((obj.min_filter, obj.mag_filter), (MinFilter::Nearest, MagFilter::Nearest));
        assert_eq!(obj.wrap_s, Wrap::ClampToEdge);
        assert_eq!(s.bound_texture(TextureTarget::Texture2D), TextureId::NONE);
    }
}
