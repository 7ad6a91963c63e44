//! GPU renderer for the logic circuit.
//!
//! Implements [`DisplaySurface`] by accumulating triangles for the frame on
//! the CPU and submitting them in a single draw call from [`Renderer::render`].

use std::collections::HashSet;
use std::iter;

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::arithmetic::Calculation;
use crate::flow::{self, FlowOptions, FlowStyle, GRADIENT_STOPS, RIPPLE_ALPHA};
use crate::gpu::mesh::{self, Vertex};
use crate::gpu::pipeline;
use crate::layout::{CircuitLayout, ElementId, GateKind, INPUT_RADIUS, OUTPUT_RADIUS};
use crate::palette::{Color, Palette};
use crate::scheduler::SignalLevel;
use crate::simulator::SimulatorConfig;
use crate::surface::DisplaySurface;

/// Maximum vertices submitted per frame.
const MAX_VERTICES: usize = 131_072;

/// Brightening applied to lit gates.
const GATE_HIGHLIGHT_SHADE: i32 = 40;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniforms {
    size: [f32; 4],
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    viewport_buffer: wgpu::Buffer,
    viewport_bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    /// Logical size in pixels; the physical target may be larger.
    size: Vec2,
    /// Target stores linear values and encodes to sRGB on write.
    linear_output: bool,
    palette: Palette,
    flow: FlowOptions,
    vertices: Vec<Vertex>,
    highlighted: HashSet<ElementId>,
}

impl Renderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        width: f32,
        height: f32,
        config: &SimulatorConfig,
    ) -> Self {
        let viewport_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Viewport Uniform Buffer"),
            size: std::mem::size_of::<ViewportUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let viewport_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ViewportUniforms>() as u64),
                },
                count: None,
            }],
            label: Some("viewport_bind_group_layout"),
        });

        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &viewport_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
            label: Some("viewport_bind_group"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Circuit Pipeline Layout"),
            bind_group_layouts: &[&viewport_bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = pipeline::create_circuit_pipeline(&device, &pipeline_layout, format);

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Circuit Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            device,
            queue,
            pipeline,
            viewport_buffer,
            viewport_bind_group,
            vertex_buffer,
            size: Vec2::new(width.max(1.0), height.max(1.0)),
            linear_output: format.is_srgb(),
            palette: config.palette.clone(),
            flow: config.flow.clone(),
            vertices: Vec::with_capacity(MAX_VERTICES),
            highlighted: HashSet::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn set_style(&mut self, palette: Palette, flow: FlowOptions) {
        self.palette = palette;
        self.flow = flow;
    }

    fn rgba(&self, color: Color) -> [f32; 4] {
        if self.linear_output {
            color.to_linear()
        } else {
            color.to_array()
        }
    }

    fn is_lit(&self, id: &ElementId) -> bool {
        self.highlighted.contains(id)
    }

    fn push_stream(&mut self, from: Vec2, to: Vec2, progress: f32, color: Color) {
        let Some(stroke) = flow::stream_stroke(from, to, progress, &self.flow) else { return };
        let width = self.flow.stroke_width;

        // Piecewise-linear alpha ramp between the gradient stops.
        for pair in GRADIENT_STOPS.windows(2) {
            let (t0, a0) = pair[0];
            let (t1, a1) = pair[1];
            let p0 = stroke.tail + (stroke.head - stroke.tail) * t0;
            let p1 = stroke.tail + (stroke.head - stroke.tail) * t1;
            let c0 = self.rgba(color.with_alpha(a0));
            let c1 = self.rgba(color.with_alpha(a1));
            mesh::push_line(&mut self.vertices, p0, p1, width, c0, c1);
        }
        let cap = self.rgba(color.with_alpha(flow::gradient_alpha(1.0)));
        mesh::push_disc(&mut self.vertices, stroke.head, width * 0.5, cap);

        let ripple = self.rgba(color.with_alpha(RIPPLE_ALPHA));
        for point in stroke.ripples {
            mesh::push_disc(&mut self.vertices, point, self.flow.ripple_radius, ripple);
        }
    }

    fn push_marker(&mut self, from: Vec2, to: Vec2, progress: f32, color: Color) {
        let Some(position) = flow::marker_position(from, to, progress) else { return };
        let radius = self.flow.marker_radius;
        let halo = self.rgba(color.with_alpha(0.25));
        let core = self.rgba(color);
        mesh::push_disc(&mut self.vertices, position, radius * 2.0, halo);
        mesh::push_disc(&mut self.vertices, position, radius, core);
    }

    fn push_dot(&mut self, center: Vec2, radius: f32, bit: u8, on_color: Color, lit: bool) {
        let fill = if bit != 0 { on_color } else { self.palette.bit_off };
        let fill = self.rgba(fill);
        let ring = self.rgba(if lit { self.palette.wire_active } else { on_color });
        mesh::push_disc(&mut self.vertices, center, radius, fill);
        mesh::push_ring(&mut self.vertices, center, radius, if lit { 2.5 } else { 1.5 }, ring);
    }

    /// Submit the accumulated frame to `view`.
    pub fn render(&mut self, view: &wgpu::TextureView) {
        if self.vertices.len() > MAX_VERTICES {
            log::warn!(
                "Too many vertices ({} > {}), frame truncated",
                self.vertices.len(),
                MAX_VERTICES
            );
            self.vertices.truncate(MAX_VERTICES);
        }

        let uniforms = ViewportUniforms {
            size: [self.size.x, self.size.y, 0.0, 0.0],
        };
        self.queue.write_buffer(&self.viewport_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        if !self.vertices.is_empty() {
            self.queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));
        }

        let [r, g, b, a] = self.rgba(self.palette.background);
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Circuit Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Circuit Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !self.vertices.is_empty() {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.viewport_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                render_pass.draw(0..self.vertices.len() as u32, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
    }
}

impl DisplaySurface for Renderer {
    fn draw_progress_segment(&mut self, from: Vec2, to: Vec2, progress: f32, level: SignalLevel) {
        let color = self.palette.level_color(level);
        match self.flow.style {
            FlowStyle::Stream => self.push_stream(from, to, progress, color),
            FlowStyle::Marker => self.push_marker(from, to, progress, color),
        }
    }

    fn set_element_highlight(&mut self, element: ElementId, on: bool) {
        if on {
            self.highlighted.insert(element);
        } else {
            self.highlighted.remove(&element);
        }
    }

    fn clear(&mut self) {
        self.vertices.clear();
    }

    fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.size = Vec2::new(width, height);
        }
    }

    fn draw_circuit(&mut self, layout: &CircuitLayout, calculation: &Calculation) {
        let bits_a = calculation.bits_a();
        let bits_b = calculation.bits_b();
        let bits_r = calculation.bits_result();

        for slice in &layout.slices {
            for wire in &slice.wires {
                let idle = match wire.id {
                    ElementId::Wire { wire: kind, .. } => self.palette.wire_color(kind),
                    _ => self.palette.wire,
                };
                let (color, width) = if self.is_lit(&wire.id) {
                    (self.palette.wire_active, 2.0)
                } else {
                    (idle.with_alpha(0.5), 1.0)
                };
                let color = self.rgba(color);
                mesh::push_line(&mut self.vertices, wire.from, wire.to, width, color, color);
            }

            for gate in &slice.gates {
                let base = match gate.kind {
                    GateKind::SumXor | GateKind::CarryXor => self.palette.gate_xor,
                    GateKind::CarryAnd => self.palette.gate_and,
                    GateKind::CarryOr => self.palette.gate_or,
                };
                let fill = if self.is_lit(&gate.id) {
                    base.shade(GATE_HIGHLIGHT_SHADE)
                } else {
                    base
                };
                let fill = self.rgba(fill);
                mesh::push_rect(&mut self.vertices, gate.center, gate.size, fill);
            }

            let i = slice.slice;
            let lit_a = self.is_lit(&ElementId::InputA { slice: i });
            let lit_b = self.is_lit(&ElementId::InputB { slice: i });
            let lit_out = self.is_lit(&ElementId::Output { slice: i });
            self.push_dot(slice.input_a, INPUT_RADIUS, bits_a[i], self.palette.input_a, lit_a);
            self.push_dot(slice.input_b, INPUT_RADIUS, bits_b[i], self.palette.input_b, lit_b);
            self.push_dot(slice.output, OUTPUT_RADIUS, bits_r[i], self.palette.output, lit_out);
        }
    }
}
