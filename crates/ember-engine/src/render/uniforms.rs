use std::cell::{Cell, Ref, RefCell, RefMut};

use crate::core::{Handle, Managed, Object};
use crate::device::Context;

use super::Shader;

/// A set of uniform values that knows how to push itself into a shader.
///
/// Binders compose: a material binder holds the more general binders it builds
/// on and forwards both calls to them before handling its own uniforms.
pub trait UniformBinder {
    /// Looks up the locations this binder writes. Runs once per [`ShaderUniforms`].
    fn resolve_locations(&mut self, ctx: &Context, shader: &Shader);

    /// Uploads current values. The shader is already in use.
    fn bind_values(&self, ctx: &Context, shader: &Shader);
}

/// A shader paired with the binder that feeds it; what a draw call binds as
/// its "material".
pub struct ShaderUniforms<B: UniformBinder> {
    object: Object,
    shader: Handle<Shader>,
    binder: RefCell<B>,
    initialized: Cell<bool>,
}

impl<B: UniformBinder> ShaderUniforms<B> {
    pub fn new(shader: Handle<Shader>, binder: B) -> Self {
        assert!(!shader.is_null(), "ShaderUniforms needs a shader");
        Self {
            object: Object::new("ShaderUniforms"),
            shader,
            binder: RefCell::new(binder),
            initialized: Cell::new(false),
        }
    }

    /// Activates the shader and uploads the binder's values.
    ///
    /// Uniform locations are resolved on the first call only.
    pub fn bind(&self, ctx: &Context) {
        self.shader.bind(ctx);
        if !self.initialized.get() {
            self.binder.borrow_mut().resolve_locations(ctx, &self.shader);
            self.initialized.set(true);
        }
        self.binder.borrow().bind_values(ctx, &self.shader);
        ctx.check_errors("ShaderUniforms::bind");
    }

    pub fn shader(&self) -> &Handle<Shader> {
        &self.shader
    }

    pub fn binder(&self) -> Ref<'_, B> {
        self.binder.borrow()
    }

    /// Mutable access for updating values between binds.
    pub fn binder_mut(&self) -> RefMut<'_, B> {
        self.binder.borrow_mut()
    }
}

impl<B: UniformBinder> Managed for ShaderUniforms<B> {
    fn object(&self) -> &Object {
        &self.object
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::device::{UniformLocation, UniformValue};
    use crate::render::test_context as context;

    const VS: &str = "uniform vec4 u_tint;\nvoid main() { gl_Position = u_tint; }\n";
    const FS: &str = "void main() { gl_FragColor = vec4(1.0); }\n";

    #[derive(Default)]
    struct Counting {
        resolves: Rc<Cell<u32>>,
        binds: Rc<Cell<u32>>,
        tint: [f32; 4],
        loc: UniformLocation,
    }

    impl UniformBinder for Counting {
        fn resolve_locations(&mut self, ctx: &Context, shader: &Shader) {
            self.resolves.set(self.resolves.get() + 1);
            self.loc = shader.uniform_location(ctx, "u_tint");
        }

        fn bind_values(&self, ctx: &Context, _shader: &Shader) {
            self.binds.set(self.binds.get() + 1);
            ctx.gl().set_uniform(self.loc, UniformValue::Vec4(self.tint));
        }
    }

    #[test]
    fn locations_resolve_exactly_once() {
        let (_, ctx) = context();
        let shader = Handle::new(Shader::from_source(&ctx, VS, FS, &[]).unwrap());
        let binder = Counting::default();
        let resolves = binder.resolves.clone();
        let binds = binder.binds.clone();
        let material = ShaderUniforms::new(shader, binder);

        for _ in 0..3 {
            material.bind(&ctx);
        }
        assert_eq!(resolves.get(), 1);
        assert_eq!(binds.get(), 3);
    }

    #[test]
    fn bind_uploads_current_values() {
        let (gl, ctx) = context();
        let shader = Handle::new(Shader::from_source(&ctx, VS, FS, &[]).unwrap());
        let program = shader.program();
        let material = ShaderUniforms::new(shader, Counting::default());

        material.binder_mut().tint = [0.25, 0.5, 0.75, 1.0];
        material.bind(&ctx);

        let s = gl.state();
        assert_eq!(s.current_program, program);
        assert_eq!(
            s.uniform_value(program, "u_tint"),
            Some(UniformValue::Vec4([0.25, 0.5, 0.75, 1.0]))
        );
    }

    #[test]
    #[should_panic(expected = "ShaderUniforms needs a shader")]
    fn requires_a_shader() {
        ShaderUniforms::new(Handle::null(), Counting::default());
    }
}
