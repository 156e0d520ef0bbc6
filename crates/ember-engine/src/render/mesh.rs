use crate::core::{Handle, Managed, Object};
use crate::device::Context;

use super::{IndexBuffer, VertexBuffer};

/// Indexed triangle mesh: one vertex buffer plus the indices into it.
pub struct Mesh {
    object: Object,
    index_buffer: Handle<IndexBuffer>,
    vertex_buffer: Handle<VertexBuffer>,
}

impl Mesh {
    pub fn new(index_buffer: Handle<IndexBuffer>, vertex_buffer: Handle<VertexBuffer>) -> Self {
        assert!(
            !index_buffer.is_null() && !vertex_buffer.is_null(),
            "mesh needs both an index and a vertex buffer"
        );
        Self {
            object: Object::new("Mesh"),
            index_buffer,
            vertex_buffer,
        }
    }

    pub fn index_buffer(&self) -> &Handle<IndexBuffer> {
        &self.index_buffer
    }

    pub fn vertex_buffer(&self) -> &Handle<VertexBuffer> {
        &self.vertex_buffer
    }

    /// Binds the vertex streams, draws all indices, unbinds the streams.
    pub fn render(&self, ctx: &Context) {
        self.vertex_buffer.bind(ctx);
        self.index_buffer.draw_elements(ctx);
        self.vertex_buffer.unbind(ctx);
    }
}

impl Managed for Mesh {
    fn object(&self) -> &Object {
        &self.object
    }
}
