//! GPU resource wrappers.
//!
//! Every resource owns its GPU names and releases them on drop, so lifetime
//! follows the [`Handle`](crate::core::Handle)s that share it. Operations that
//! touch global binding state (bind, draw, upload) take the
//! [`Context`](crate::device::Context) explicitly and restore or clear the
//! bindings they change.

mod buffer;
mod image;
mod materials;
mod mesh;
mod shader;
mod target;
mod texture;
mod uniforms;
mod vertex;

pub use buffer::IndexBuffer;
pub use image::Image;
pub use materials::{
    GlobalShaderUniforms, SharedShaderValues, SharedValues, SimpleMaterialUniforms,
    SimpleMaterialWithTextureUniforms, GLOBAL_UNIFORM_NAMES,
};
pub use mesh::Mesh;
pub use shader::{Shader, ShaderAttribute, ShaderError};
pub use target::RenderTarget;
pub use texture::{FilteringMode, Texture, Texture2D, TextureCube, TextureDepth, WrappingMode};
pub use uniforms::{ShaderUniforms, UniformBinder};
pub use vertex::{interleave, Semantic, VertexArray, VertexBuffer};

#[cfg(test)]
use crate::device::{headless::HeadlessGl, Context, ContextConfig};

/// Headless context that panics on the first GL error.
#[cfg(test)]
pub(crate) fn test_context() -> (HeadlessGl, Context) {
    let gl = HeadlessGl::new();
    let ctx = Context::new(
        gl.clone(),
        ContextConfig {
            check_errors: true,
            assert_on_error: true,
        },
    );
    (gl, ctx)
}
