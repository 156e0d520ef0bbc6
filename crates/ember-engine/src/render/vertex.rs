use std::mem::size_of;

use crate::core::{Handle, Managed, Object};
use crate::device::{BufferId, BufferTarget, Context};

/// Fixed attribute slot of a vertex stream. Shaders bind their inputs to these
/// locations before linking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Semantic {
    Position = 0,
    Normal = 1,
    Uv = 2,
    Tangent = 3,
    Binormal = 4,
}

impl Semantic {
    #[inline]
    pub fn location(self) -> u32 {
        self as u32
    }
}

/// One CPU-side stream of per-vertex data (positions, normals, UVs...).
///
/// Elements are plain-old-data made of 4-byte float components, e.g. `[f32; 3]`
/// or `glam::Vec2`. The component count is `size_of::<T>() / 4`.
pub struct VertexArray {
    object: Object,
    semantic: Semantic,
    components: usize,
    data: Vec<f32>,
}

impl VertexArray {
    /// Copies `vertices` into a new stream.
    ///
    /// Panics if `T` is not a whole number of 4-byte components.
    pub fn new<T: bytemuck::Pod>(semantic: Semantic, vertices: &[T]) -> Self {
        let size = size_of::<T>();
        assert!(
            size > 0 && size % 4 == 0,
            "vertex element type {} is {size} bytes, not a multiple of 4-byte floats",
            std::any::type_name::<T>()
        );

        let data = bytemuck::cast_slice::<T, u8>(vertices)
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Self {
            object: Object::new("VertexArray"),
            semantic,
            components: size / 4,
            data,
        }
    }

    pub fn semantic(&self) -> Semantic {
        self.semantic
    }

    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.components
    }

    /// Bytes per element.
    pub fn stride(&self) -> usize {
        self.components * 4
    }

    pub fn component_count(&self) -> usize {
        self.components
    }

    /// Components of vertex `index`.
    pub fn vertex(&self, index: usize) -> &[f32] {
        let start = index * self.components;
        &self.data[start..start + self.components]
    }
}

impl Managed for VertexArray {
    fn object(&self) -> &Object {
        &self.object
    }
}

/// Concatenates element `i` of every array, in order, for each vertex `i`.
///
/// Panics when `arrays` is empty or the arrays disagree on vertex count.
pub fn interleave(arrays: &[Handle<VertexArray>]) -> Vec<f32> {
    assert!(!arrays.is_empty(), "vertex buffer needs at least one vertex array");
    let vertex_count = arrays[0].vertex_count();
    for (i, va) in arrays.iter().enumerate() {
        assert_eq!(
            va.vertex_count(),
            vertex_count,
            "vertex array {i} ({:?}) has {} vertices, expected {vertex_count}",
            va.semantic(),
            va.vertex_count()
        );
    }

    let per_vertex: usize = arrays.iter().map(|va| va.component_count()).sum();
    let mut data = Vec::with_capacity(per_vertex * vertex_count);
    for v in 0..vertex_count {
        for va in arrays {
            data.extend_from_slice(va.vertex(v));
        }
    }
    data
}

/// Interleaved GPU copy of several vertex arrays of equal length.
///
/// `bind` points one attribute slot per array (its [`Semantic`]) into the shared
/// buffer; `unbind` disables them again. Binds must be paired with unbinds;
/// two buffers bound at once would fight over the same slots.
pub struct VertexBuffer {
    object: Object,
    ctx: Context,
    vbo: BufferId,
    /// Source arrays in attribute order, kept for CPU-side reads.
    arrays: Vec<Handle<VertexArray>>,
    /// Interleaved copy of `arrays`, as uploaded.
    data: Vec<f32>,
    /// Floats per interleaved vertex; the stride is this times four bytes.
    components_per_vertex: usize,
}

impl VertexBuffer {
    /// Interleaves `arrays` and uploads the result once.
    ///
    /// Panics before touching the GPU if `arrays` is empty or the vertex counts differ.
    pub fn new(ctx: &Context, arrays: &[Handle<VertexArray>]) -> Self {
        let data = interleave(arrays);
        let components_per_vertex = arrays.iter().map(|va| va.component_count()).sum();

        let gl = ctx.gl();
        let vbo = gl.create_buffer();
        gl.bind_buffer(BufferTarget::Array, vbo);
        gl.buffer_data(BufferTarget::Array, bytemuck::cast_slice(&data));
        gl.bind_buffer(BufferTarget::Array, BufferId::NONE);
        ctx.check_errors("VertexBuffer::new");

        Self {
            object: Object::new("VertexBuffer"),
            ctx: ctx.clone(),
            vbo,
            arrays: arrays.to_vec(),
            data,
            components_per_vertex,
        }
    }

    pub fn id(&self) -> BufferId {
        self.vbo
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn components_per_vertex(&self) -> usize {
        self.components_per_vertex
    }

    pub fn vertex_count(&self) -> usize {
        self.arrays[0].vertex_count()
    }

    pub fn arrays(&self) -> &[Handle<VertexArray>] {
        &self.arrays
    }

    pub fn bind(&self, ctx: &Context) {
        debug_assert!(ctx.same(&self.ctx), "VertexBuffer bound on a foreign context");
        let gl = ctx.gl();
        gl.bind_buffer(BufferTarget::Array, self.vbo);

        let stride = (self.components_per_vertex * 4) as i32;
        let mut offset = 0;
        for va in &self.arrays {
            let slot = va.semantic().location();
            gl.enable_vertex_attrib_array(slot);
            debug_assert!(gl.is_vertex_attrib_enabled(slot));
            gl.vertex_attrib_pointer(slot, va.component_count() as i32, stride, offset * 4);
            offset += va.component_count() as i32;
        }
        ctx.check_errors("VertexBuffer::bind");
    }

    pub fn unbind(&self, ctx: &Context) {
        let gl = ctx.gl();
        for va in &self.arrays {
            let slot = va.semantic().location();
            gl.disable_vertex_attrib_array(slot);
            debug_assert!(!gl.is_vertex_attrib_enabled(slot));
        }
        gl.bind_buffer(BufferTarget::Array, BufferId::NONE);
        ctx.check_errors("VertexBuffer::unbind");
    }
}

impl Managed for VertexBuffer {
    fn object(&self) -> &Object {
        &self.object
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.ctx.gl().delete_buffer(self.vbo);
        self.ctx.check_errors("VertexBuffer::drop");
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::render::test_context as context;

    fn positions() -> Handle<VertexArray> {
        Handle::new(VertexArray::new(
            Semantic::Position,
            &[[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        ))
    }

    // ── vertex arrays ─────────────────────────────────────────────────────

    #[test]
    fn component_count_follows_element_size() {
        let uv = VertexArray::new(Semantic::Uv, &[Vec2::new(0.5, 1.0), Vec2::ZERO]);
        assert_eq!(uv.component_count(), 2);
        assert_eq!(uv.stride(), 8);
        assert_eq!(uv.vertex_count(), 2);
        assert_eq!(uv.vertex(0), &[0.5f32, 1.0]);
    }

    #[test]
    #[should_panic(expected = "not a multiple of 4-byte floats")]
    fn rejects_non_float_elements() {
        VertexArray::new(Semantic::Position, &[[0u16; 3]]);
    }

    // ── interleaving ──────────────────────────────────────────────────────

    #[test]
    fn interleave_law() {
        let normals = Handle::new(VertexArray::new(
            Semantic::Normal,
            &[Vec3::Z, Vec3::Y, Vec3::X],
        ));
        let uvs = Handle::new(VertexArray::new(
            Semantic::Uv,
            &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
        ));
        let arrays = [positions(), normals, uvs];
        let data = interleave(&arrays);

        let per_vertex: usize = arrays.iter().map(|a| a.component_count()).sum();
        assert_eq!(per_vertex, 8);
        assert_eq!(data.len(), 3 * per_vertex);

        for v in 0..3 {
            let vertex = &data[v * per_vertex..(v + 1) * per_vertex];
            let mut offset = 0;
            for array in &arrays {
                let n = array.component_count();
                assert_eq!(&vertex[offset..offset + n], array.vertex(v));
                offset += n;
            }
        }
    }

    #[test]
    #[should_panic(expected = "has 2 vertices, expected 3")]
    fn unequal_vertex_counts_are_fatal() {
        let short = Handle::new(VertexArray::new(Semantic::Normal, &[Vec3::Z, Vec3::Z]));
        interleave(&[positions(), short]);
    }

    #[test]
    fn unequal_vertex_counts_reject_before_upload() {
        let (gl, ctx) = context();
        let short = Handle::new(VertexArray::new(Semantic::Normal, &[Vec3::Z, Vec3::Z]));
        let arrays = [positions(), short];

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            VertexBuffer::new(&ctx, &arrays)
        }));
        assert!(result.is_err());
        assert!(gl.state().buffers.is_empty());
        assert!(gl.state().calls("buffer_data").is_empty());
    }

    // ── vertex buffers ────────────────────────────────────────────────────

    #[test]
    fn bind_enables_one_slot_per_array() {
        let (gl, ctx) = context();
        let normals = Handle::new(VertexArray::new(Semantic::Normal, &[Vec3::Z; 3]));
        let vb = VertexBuffer::new(&ctx, &[positions(), normals]);
        assert_eq!(gl.state().buffers[&vb.id()].len(), 3 * 6 * 4);

        vb.bind(&ctx);
        {
            let s = gl.state();
            assert_eq!(s.enabled_attribs.iter().copied().collect::<Vec<_>>(), [0u32, 1]);
            assert_eq!(s.attribs[&0].stride, 24);
            assert_eq!(s.attribs[&0].offset, 0);
            assert_eq!(s.attribs[&1].offset, 12);
            assert_eq!(s.attribs[&1].components, 3);
        }

        vb.unbind(&ctx);
        let s = gl.state();
        assert!(s.enabled_attribs.is_empty());
        assert_eq!(s.array_buffer, BufferId::NONE);
    }

    #[test]
    fn vertex_buffer_keeps_its_arrays_alive() {
        let (gl, ctx) = context();
        let array = positions();
        let vb = VertexBuffer::new(&ctx, std::slice::from_ref(&array));
        assert_eq!(array.ref_count(), 2);

        let id = vb.id();
        drop(vb);
        assert_eq!(array.ref_count(), 1);
        assert!(!gl.state().buffers.contains_key(&id));
    }
}
