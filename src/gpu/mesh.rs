use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Number of segments used for dots.
pub const CIRCLE_SEGMENTS: usize = 20;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Logical pixel position, origin top-left.
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(position: [f32; 2], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    fn at(p: Vec2, color: [f32; 4]) -> Self {
        Self::new(p.to_array(), color)
    }

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: 8, // [f32; 2] is 8 bytes
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Append a straight line of `width` as two triangles, blending colour from
/// `from` to `to`.
pub fn push_line(out: &mut Vec<Vertex>, from: Vec2, to: Vec2, width: f32, from_color: [f32; 4], to_color: [f32; 4]) {
    let dir = to - from;
    let len = dir.length();
    if len <= f32::EPSILON {
        return;
    }
    let offset = Vec2::new(-dir.y, dir.x) / len * (width * 0.5);

    let a = Vertex::at(from + offset, from_color);
    let b = Vertex::at(from - offset, from_color);
    let c = Vertex::at(to - offset, to_color);
    let d = Vertex::at(to + offset, to_color);
    out.extend_from_slice(&[a, b, c, c, d, a]);
}

/// Append a filled circle as a triangle fan.
pub fn push_disc(out: &mut Vec<Vertex>, center: Vec2, radius: f32, color: [f32; 4]) {
    if radius <= 0.0 {
        return;
    }
    let point = |i: usize| {
        let angle = std::f32::consts::TAU * i as f32 / CIRCLE_SEGMENTS as f32;
        center + Vec2::new(angle.cos(), angle.sin()) * radius
    };
    for i in 0..CIRCLE_SEGMENTS {
        out.push(Vertex::at(center, color));
        out.push(Vertex::at(point(i), color));
        out.push(Vertex::at(point(i + 1), color));
    }
}

/// Append a circular outline.
pub fn push_ring(out: &mut Vec<Vertex>, center: Vec2, radius: f32, width: f32, color: [f32; 4]) {
    let point = |i: usize| {
        let angle = std::f32::consts::TAU * i as f32 / CIRCLE_SEGMENTS as f32;
        center + Vec2::new(angle.cos(), angle.sin()) * radius
    };
    for i in 0..CIRCLE_SEGMENTS {
        push_line(out, point(i), point(i + 1), width, color, color);
    }
}

/// Append an axis-aligned filled rectangle.
pub fn push_rect(out: &mut Vec<Vertex>, center: Vec2, size: Vec2, color: [f32; 4]) {
    let half = size * 0.5;
    let tl = Vertex::at(center - half, color);
    let br = Vertex::at(center + half, color);
    let tr = Vertex::at(Vec2::new(center.x + half.x, center.y - half.y), color);
    let bl = Vertex::at(Vec2::new(center.x - half.x, center.y + half.y), color);
    out.extend_from_slice(&[tl, bl, br, br, tr, tl]);
}
