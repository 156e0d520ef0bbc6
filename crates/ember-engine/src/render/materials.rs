//! Stock uniform binders for the lit-mesh shaders.
//!
//! - [`GlobalShaderUniforms`]: transforms, light and camera from a shared
//!   [`SharedShaderValues`] block (`g_mat*`, `g_lightPos`, `g_camPos`)
//! - [`SimpleMaterialUniforms`]: global uniforms plus `g_Material` colors
//! - [`SimpleMaterialWithTextureUniforms`]: the above plus a diffuse map on unit 0

use std::cell::Cell;

use glam::{Mat4, Vec3, Vec4};

use crate::core::{Handle, Managed, Object};
use crate::device::{Context, TextureId, TextureTarget, UniformLocation, UniformValue};

use super::{Shader, Texture2D, UniformBinder};

/// Per-draw values shared by every material of a scene.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SharedValues {
    /// Object to world.
    pub model: Mat4,
    /// World to camera.
    pub view: Mat4,
    pub projection: Mat4,
    pub model_view: Mat4,
    /// Inverse-transpose of `model_view`, for normals.
    pub normal: Mat4,
    pub model_view_projection: Mat4,
    pub light_pos: Vec3,
    pub cam_pos: Vec3,
}

impl Default for SharedValues {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            model_view: Mat4::IDENTITY,
            normal: Mat4::IDENTITY,
            model_view_projection: Mat4::IDENTITY,
            light_pos: Vec3::ZERO,
            cam_pos: Vec3::ZERO,
        }
    }
}

impl SharedValues {
    /// Recomputes the combined matrices from `model`, `view` and `projection`.
    pub fn derive_matrices(&mut self) {
        self.model_view = self.view * self.model;
        self.normal = self.model_view.inverse().transpose();
        self.model_view_projection = self.projection * self.model_view;
    }
}

/// Shared, mutable [`SharedValues`] block. Scenes update it between draws;
/// every [`GlobalShaderUniforms`] holding a handle sees the change.
pub struct SharedShaderValues {
    object: Object,
    values: Cell<SharedValues>,
}

impl SharedShaderValues {
    pub fn new(values: SharedValues) -> Self {
        Self {
            object: Object::new("SharedShaderValues"),
            values: Cell::new(values),
        }
    }

    pub fn get(&self) -> SharedValues {
        self.values.get()
    }

    pub fn set(&self, values: SharedValues) {
        self.values.set(values);
    }

    pub fn update(&self, f: impl FnOnce(&mut SharedValues)) {
        let mut values = self.values.get();
        f(&mut values);
        self.values.set(values);
    }
}

impl Default for SharedShaderValues {
    fn default() -> Self {
        Self::new(SharedValues::default())
    }
}

impl Managed for SharedShaderValues {
    fn object(&self) -> &Object {
        &self.object
    }
}

pub const GLOBAL_UNIFORM_NAMES: [&str; 8] = [
    "g_matModel",
    "g_matView",
    "g_matProj",
    "g_matModelView",
    "g_matNormal",
    "g_matModelViewProj",
    "g_lightPos",
    "g_camPos",
];

/// Uploads the scene-wide transforms and light/camera positions.
///
/// A null `shared` handle uploads nothing.
pub struct GlobalShaderUniforms {
    pub shared: Handle<SharedShaderValues>,
    locations: [UniformLocation; 8],
}

impl GlobalShaderUniforms {
    pub fn new(shared: Handle<SharedShaderValues>) -> Self {
        Self {
            shared,
            locations: [UniformLocation::UNKNOWN; 8],
        }
    }
}

impl UniformBinder for GlobalShaderUniforms {
    fn resolve_locations(&mut self, ctx: &Context, shader: &Shader) {
        for (loc, name) in self.locations.iter_mut().zip(GLOBAL_UNIFORM_NAMES) {
            *loc = shader.uniform_location(ctx, name);
        }
    }

    fn bind_values(&self, ctx: &Context, _shader: &Shader) {
        let Some(shared) = self.shared.get() else { return };
        let v = shared.get();
        let gl = ctx.gl();

        let matrices = [
            v.model,
            v.view,
            v.projection,
            v.model_view,
            v.normal,
            v.model_view_projection,
        ];
        for (loc, m) in self.locations.iter().zip(matrices) {
            gl.set_uniform(*loc, UniformValue::Mat4(m.to_cols_array()));
        }
        gl.set_uniform(self.locations[6], UniformValue::Vec3(v.light_pos.to_array()));
        gl.set_uniform(self.locations[7], UniformValue::Vec3(v.cam_pos.to_array()));
    }
}

/// Blinn-Phong material colors on top of the global uniforms.
pub struct SimpleMaterialUniforms {
    pub global: GlobalShaderUniforms,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    /// RGB specular color, exponent in `w`.
    pub specular: Vec4,
    locations: [UniformLocation; 3],
}

impl SimpleMaterialUniforms {
    pub fn new(shared: Handle<SharedShaderValues>) -> Self {
        Self {
            global: GlobalShaderUniforms::new(shared),
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::new(1.0, 1.0, 1.0, 16.0),
            locations: [UniformLocation::UNKNOWN; 3],
        }
    }
}

impl UniformBinder for SimpleMaterialUniforms {
    fn resolve_locations(&mut self, ctx: &Context, shader: &Shader) {
        self.global.resolve_locations(ctx, shader);
        self.locations = [
            shader.uniform_location(ctx, "g_Material.vAmbient"),
            shader.uniform_location(ctx, "g_Material.vDiffuse"),
            shader.uniform_location(ctx, "g_Material.vSpecular"),
        ];
    }

    fn bind_values(&self, ctx: &Context, shader: &Shader) {
        self.global.bind_values(ctx, shader);
        let gl = ctx.gl();
        let [ambient, diffuse, specular] = self.locations;
        gl.set_uniform(ambient, UniformValue::Vec4(self.ambient.to_array()));
        gl.set_uniform(diffuse, UniformValue::Vec4(self.diffuse.to_array()));
        gl.set_uniform(specular, UniformValue::Vec4(self.specular.to_array()));
    }
}

/// [`SimpleMaterialUniforms`] plus a diffuse texture sampled from unit 0.
pub struct SimpleMaterialWithTextureUniforms {
    pub material: SimpleMaterialUniforms,
    pub diffuse_map: Handle<Texture2D>,
    location: UniformLocation,
}

impl SimpleMaterialWithTextureUniforms {
    pub fn new(shared: Handle<SharedShaderValues>, diffuse_map: Handle<Texture2D>) -> Self {
        Self {
            material: SimpleMaterialUniforms::new(shared),
            diffuse_map,
            location: UniformLocation::UNKNOWN,
        }
    }
}

impl UniformBinder for SimpleMaterialWithTextureUniforms {
    fn resolve_locations(&mut self, ctx: &Context, shader: &Shader) {
        self.material.resolve_locations(ctx, shader);
        self.location = shader.uniform_location(ctx, "s_diffuseMap");
    }

    fn bind_values(&self, ctx: &Context, shader: &Shader) {
        self.material.bind_values(ctx, shader);

        let texture = self.diffuse_map.get().map_or(TextureId::NONE, |t| t.id());
        let gl = ctx.gl();
        gl.active_texture(0);
        gl.bind_texture(TextureTarget::Texture2D, texture);
        gl.set_uniform(self.location, UniformValue::Int(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_context as context;
    use crate::render::ShaderUniforms;

    const VS: &str = "uniform mat4 g_matModel;\nuniform mat4 g_matView;\nuniform mat4 g_matProj;\n\
                      uniform mat4 g_matModelView;\nuniform mat4 g_matNormal;\n\
                      uniform mat4 g_matModelViewProj;\nuniform vec3 g_lightPos;\nuniform vec3 g_camPos;\n\
                      attribute vec4 g_vPositionOS;\n\
                      void main() { gl_Position = g_matModelViewProj * g_vPositionOS; }\n";
    const FS: &str = "precision mediump float;\n\
                      struct MATERIAL { vec4 vAmbient; vec4 vDiffuse; vec4 vSpecular; };\n\
                      uniform MATERIAL g_Material;\nuniform sampler2D s_diffuseMap;\n\
                      void main() { gl_FragColor = g_Material.vDiffuse; }\n";

    #[test]
    fn derive_matrices_combines_transforms() {
        let mut v = SharedValues {
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            view: Mat4::from_rotation_y(0.5),
            projection: Mat4::perspective_rh_gl(1.0, 1.5, 0.1, 100.0),
            ..SharedValues::default()
        };
        v.derive_matrices();
        assert_eq!(v.model_view, v.view * v.model);
        assert!(v
            .model_view_projection
            .abs_diff_eq(v.projection * v.view * v.model, 1e-5));
        assert!((v.normal.transpose() * v.model_view).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn shared_values_are_seen_by_every_holder() {
        let shared = Handle::new(SharedShaderValues::default());
        let a = GlobalShaderUniforms::new(shared.clone());
        shared.update(|v| v.light_pos = Vec3::new(0.0, 70.0, 70.0));
        assert_eq!(a.shared.get().map(|s| s.get().light_pos), Some(Vec3::new(0.0, 70.0, 70.0)));
    }

    #[test]
    fn simple_material_uploads_globals_and_colors() {
        let (gl, ctx) = context();
        let shader = Handle::new(Shader::from_source(&ctx, VS, FS, &[]).unwrap());
        let program = shader.program();
        let shared = Handle::new(SharedShaderValues::default());
        shared.update(|v| {
            v.cam_pos = Vec3::new(0.0, 70.0, 70.0);
            v.model = Mat4::from_scale(Vec3::splat(2.0));
            v.derive_matrices();
        });

        let mut binder = SimpleMaterialUniforms::new(shared.clone());
        binder.diffuse = Vec4::new(1.0, 0.2, 0.5, 1.0);
        let material = ShaderUniforms::new(shader, binder);
        material.bind(&ctx);

        let s = gl.state();
        assert_eq!(
            s.uniform_value(program, "g_Material.vDiffuse"),
            Some(UniformValue::Vec4([1.0, 0.2, 0.5, 1.0]))
        );
        assert_eq!(
            s.uniform_value(program, "g_camPos"),
            Some(UniformValue::Vec3([0.0, 70.0, 70.0]))
        );
        assert_eq!(
            s.uniform_value(program, "g_matModel"),
            Some(UniformValue::Mat4(Mat4::from_scale(Vec3::splat(2.0)).to_cols_array()))
        );
    }

    #[test]
    fn textured_material_binds_unit_zero() {
        let (gl, ctx) = context();
        let shader = Handle::new(Shader::from_source(&ctx, VS, FS, &[]).unwrap());
        let program = shader.program();
        let texture = Handle::new(Texture2D::empty(&ctx));
        let tex_id = texture.id();

        let binder = SimpleMaterialWithTextureUniforms::new(Handle::null(), texture);
        let material = ShaderUniforms::new(shader, binder);
        material.bind(&ctx);

        let s = gl.state();
        assert_eq!(s.active_unit, 0);
        assert_eq!(s.bound_texture(TextureTarget::Texture2D), tex_id);
        assert_eq!(s.uniform_value(program, "s_diffuseMap"), Some(UniformValue::Int(0)));
        // No shared block: globals stay unset.
        assert_eq!(s.uniform_value(program, "g_matModel"), None);
    }
}
