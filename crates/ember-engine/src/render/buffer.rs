use crate::core::{Managed, Object};
use crate::device::{BufferId, BufferTarget, Context, PrimitiveMode};

/// Immutable GPU storage for 16-bit triangle-list indices.
pub struct IndexBuffer {
    object: Object,
    ctx: Context,
    ibo: BufferId,
    count: usize,
}

impl IndexBuffer {
    /// Uploads `indices` once. The element buffer slot is left unbound.
    pub fn new(ctx: &Context, indices: &[u16]) -> Self {
        let gl = ctx.gl();
        let ibo = gl.create_buffer();
        gl.bind_buffer(BufferTarget::ElementArray, ibo);
        gl.buffer_data(BufferTarget::ElementArray, bytemuck::cast_slice(indices));
        gl.bind_buffer(BufferTarget::ElementArray, BufferId::NONE);
        ctx.check_errors("IndexBuffer::new");

        Self {
            object: Object::new("IndexBuffer"),
            ctx: ctx.clone(),
            ibo,
            count: indices.len(),
        }
    }

    /// Number of indices, i.e. the element count of every draw.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn id(&self) -> BufferId {
        self.ibo
    }

    /// Issues one indexed triangle-list draw over all indices.
    ///
    /// Attribute state must already be set up (see [`VertexBuffer::bind`](super::VertexBuffer::bind)).
    pub fn draw_elements(&self, ctx: &Context) {
        debug_assert!(ctx.same(&self.ctx), "IndexBuffer drawn on a foreign context");
        let gl = ctx.gl();
        gl.bind_buffer(BufferTarget::ElementArray, self.ibo);
        gl.draw_elements(PrimitiveMode::Triangles, self.count as i32, 0);
        gl.bind_buffer(BufferTarget::ElementArray, BufferId::NONE);
        ctx.check_errors("IndexBuffer::draw_elements");
    }
}

impl Managed for IndexBuffer {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        self.ctx.gl().delete_buffer(self.ibo);
        self.ctx.check_errors("IndexBuffer::drop");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_context as context;

    #[test]
    fn uploads_indices_and_unbinds() {
        let (gl, ctx) = context();
        let ib = IndexBuffer::new(&ctx, &[0, 1, 2, 2, 1, 3]);
        let s = gl.state();
        assert_eq!(s.buffers[&ib.id()].len(), 12);
        assert_eq!(s.element_buffer, BufferId::NONE);
        assert_eq!(ib.len(), 6);
    }

    #[test]
    fn draws_its_element_count() {
        let (gl, ctx) = context();
        let ib = IndexBuffer::new(&ctx, &[0, 1, 2, 2, 1, 3]);
        ib.draw_elements(&ctx);

        let s = gl.state();
        assert_eq!(s.draw_calls.len(), 1);
        assert_eq!(s.draw_calls[0].mode, PrimitiveMode::Triangles);
        assert_eq!(s.draw_calls[0].count, 6);
        assert_eq!(s.element_buffer, BufferId::NONE);
    }

    #[test]
    fn drop_releases_the_gpu_name() {
        let (gl, ctx) = context();
        let ib = IndexBuffer::new(&ctx, &[0, 1, 2]);
        let id = ib.id();
        drop(ib);
        assert!(!gl.state().buffers.contains_key(&id));
    }
}
