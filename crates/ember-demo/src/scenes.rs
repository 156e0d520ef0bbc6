use ember_engine::core::Handle;
use ember_engine::device::Context;
use ember_engine::render::{
    FilteringMode, Image, Mesh, RenderTarget, Semantic, Shader, ShaderAttribute, ShaderError,
    ShaderUniforms, SharedShaderValues, SimpleMaterialUniforms,
    SimpleMaterialWithTextureUniforms, Texture2D, WrappingMode,
};
use glam::{Mat4, Vec3, Vec4};

use crate::geometry;

const LIT_VS: &str = include_str!("../shaders/lit.vs");
const LIT_FS: &str = include_str!("../shaders/lit.fs");
const TEXTURED_VS: &str = include_str!("../shaders/textured.vs");
const TEXTURED_FS: &str = include_str!("../shaders/textured.fs");

const LIT_ATTRIBUTES: [ShaderAttribute; 2] = [
    ShaderAttribute::new("g_vPositionOS", Semantic::Position),
    ShaderAttribute::new("g_vNormalOS", Semantic::Normal),
];
const TEXTURED_ATTRIBUTES: [ShaderAttribute; 2] = [
    ShaderAttribute::new("g_vPositionOS", Semantic::Position),
    ShaderAttribute::new("g_vTexCoord", Semantic::Uv),
];

/// Per-frame input handed to every scene.
#[derive(Debug, Copy, Clone)]
pub struct Frame {
    /// Seconds since the first frame.
    pub time: f32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

pub trait Scene {
    fn name(&self) -> &'static str;

    fn render(&mut self, ctx: &Context, frame: &Frame);
}

/// Camera and light shared by both scenes.
fn camera(shared: &SharedShaderValues, model: Mat4, aspect: f32) {
    let cam_pos = Vec3::new(0.0, 1.5, 3.0);
    shared.update(|v| {
        v.model = model;
        v.view = Mat4::look_at_rh(cam_pos, Vec3::ZERO, Vec3::Y);
        v.projection = Mat4::perspective_rh_gl(45f32.to_radians(), aspect, 0.1, 100.0);
        v.light_pos = Vec3::new(0.0, 70.0, 70.0);
        v.cam_pos = cam_pos;
        v.derive_matrices();
    });
}

/// A Blinn-Phong lit cube spinning about the Y axis.
pub struct LitScene {
    shared: Handle<SharedShaderValues>,
    material: ShaderUniforms<SimpleMaterialUniforms>,
    cube: Handle<Mesh>,
}

impl LitScene {
    pub fn new(ctx: &Context) -> Result<Self, ShaderError> {
        let shader = Shader::from_source(ctx, LIT_VS, LIT_FS, &LIT_ATTRIBUTES)?;
        let shared = Handle::new(SharedShaderValues::default());

        let mut binder = SimpleMaterialUniforms::new(shared.clone());
        binder.ambient = Vec4::new(0.1, 0.05, 0.05, 1.0);
        binder.diffuse = Vec4::new(0.9, 0.35, 0.1, 1.0);
        binder.specular = Vec4::new(1.0, 1.0, 1.0, 32.0);

        Ok(Self {
            shared,
            material: ShaderUniforms::new(Handle::new(shader), binder),
            cube: geometry::cube(ctx),
        })
    }
}

impl Scene for LitScene {
    fn name(&self) -> &'static str {
        "lit"
    }

    fn render(&mut self, ctx: &Context, frame: &Frame) {
        camera(&self.shared, Mat4::from_rotation_y(frame.time), frame.aspect());
        self.material.bind(ctx);
        self.cube.render(ctx);
    }
}

/// A checker-textured cube drawn off screen, then shown on a full-screen quad
/// that samples the render target's color buffer.
pub struct TexturedScene {
    target: RenderTarget,
    cube_shared: Handle<SharedShaderValues>,
    cube_material: ShaderUniforms<SimpleMaterialWithTextureUniforms>,
    quad_material: ShaderUniforms<SimpleMaterialWithTextureUniforms>,
    cube: Handle<Mesh>,
    quad: Handle<Mesh>,
}

impl TexturedScene {
    pub fn new(ctx: &Context, width: u32, height: u32) -> Result<Self, ShaderError> {
        let checker = Handle::new(Texture2D::empty(ctx));
        checker.set_data(
            ctx,
            &checker_image(64, 8),
            FilteringMode::Trilinear,
            WrappingMode::Repeat,
        );

        let target = RenderTarget::new(ctx, width, height, true);

        let shader = Shader::from_source(ctx, TEXTURED_VS, TEXTURED_FS, &TEXTURED_ATTRIBUTES)?;
        let shader = Handle::new(shader);
        let cube_shared = Handle::new(SharedShaderValues::default());
        let cube_material = ShaderUniforms::new(
            shader.clone(),
            SimpleMaterialWithTextureUniforms::new(cube_shared.clone(), checker),
        );

        // The quad is already in clip space: identity transforms.
        let quad_shared = Handle::new(SharedShaderValues::default());
        let quad_material = ShaderUniforms::new(
            shader,
            SimpleMaterialWithTextureUniforms::new(quad_shared, target.color_buffer().clone()),
        );

        Ok(Self {
            target,
            cube_shared,
            cube_material,
            quad_material,
            cube: geometry::cube(ctx),
            quad: geometry::quad(ctx),
        })
    }
}

impl Scene for TexturedScene {
    fn name(&self) -> &'static str {
        "textured"
    }

    fn render(&mut self, ctx: &Context, frame: &Frame) {
        let (w, h) = self.target.size();
        let model = Mat4::from_rotation_y(frame.time) * Mat4::from_rotation_x(frame.time * 0.5);
        camera(&self.cube_shared, model, w as f32 / h.max(1) as f32);

        self.target.bind(ctx);
        self.cube_material.bind(ctx);
        self.cube.render(ctx);
        self.target.unbind(ctx);

        ctx.gl().viewport(0, 0, frame.width as i32, frame.height as i32);
        self.quad_material.bind(ctx);
        self.quad.render(ctx);
    }
}

/// RGBA checkerboard of `size` x `size` pixels with `cells` squares per side.
pub fn checker_image(size: u32, cells: u32) -> Image {
    let mut image = Image::new(size, size, 4);
    let cell = (size / cells.max(1)).max(1);
    for (i, px) in image.data_mut().chunks_exact_mut(4).enumerate() {
        let (x, y) = (i as u32 % size, i as u32 / size);
        let lum = if (x / cell + y / cell) % 2 == 0 { 230 } else { 40 };
        px.copy_from_slice(&[lum, lum, lum, 255]);
    }
    image
}
