//! Procedural meshes used by the demo scenes.

use ember_engine::core::Handle;
use ember_engine::device::Context;
use ember_engine::render::{IndexBuffer, Mesh, Semantic, VertexArray, VertexBuffer};
use glam::{Vec2, Vec3};

/// Unit cube centred on the origin: 24 vertices (4 per face, so normals and
/// UVs stay flat), 36 indices.
pub fn cube(ctx: &Context) -> Handle<Mesh> {
    // (normal, u axis, v axis) per face.
    let faces = [
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u, v) in faces {
        let base = positions.len() as u16;
        for (su, sv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            positions.push((normal + u * su + v * sv) * 0.5);
            normals.push(normal);
            uvs.push(Vec2::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5));
        }
        indices.extend([base, base + 1, base + 2, base + 2, base + 1, base + 3]);
    }

    mesh(
        ctx,
        &indices,
        &[
            Handle::new(VertexArray::new(Semantic::Position, &positions)),
            Handle::new(VertexArray::new(Semantic::Normal, &normals)),
            Handle::new(VertexArray::new(Semantic::Uv, &uvs)),
        ],
    )
}

/// Screen-filling quad in clip space with UVs.
pub fn quad(ctx: &Context) -> Handle<Mesh> {
    let positions = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
    ];
    let uvs = [Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::ONE];

    mesh(
        ctx,
        &[0, 1, 2, 2, 1, 3],
        &[
            Handle::new(VertexArray::new(Semantic::Position, &positions)),
            Handle::new(VertexArray::new(Semantic::Uv, &uvs)),
        ],
    )
}

fn mesh(ctx: &Context, indices: &[u16], arrays: &[Handle<VertexArray>]) -> Handle<Mesh> {
    let ib = Handle::new(IndexBuffer::new(ctx, indices));
    let vb = Handle::new(VertexBuffer::new(ctx, arrays));
    Handle::new(Mesh::new(ib, vb))
}
