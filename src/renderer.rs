//! The wgpu implementation of the graphics resource layer.
//!
//! Scenes record raster-state changes, clears, and draws through the
//! [`GraphicsLayer`] trait during `draw`; [`WgpuGfx::present`] then replays
//! the recorded commands inside a single render pass. Per-draw {MVP, tint}
//! uniforms live in a dynamic-offset arena that grows to the frame's draw
//! count, and pipelines are created lazily per (program, raster caps)
//! combination.
//!
//! wgpu has no scissored clear operation, so mid-frame clears are drawn as
//! full-viewport triangles pinned to the far plane: the active scissor
//! rectangle then clips them exactly like a GL `clear` under `SCISSOR_TEST`.

use std::collections::HashMap;

use anyhow::Context as _;
use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::common::{Rect, RgbaColor};
use crate::graphics::{GraphicsError, GraphicsLayer, MeshId, ProgramId};
use crate::mesh::MeshData;

/// Shader used to emulate scissored clears; sees the same `Locals` uniform
/// as the scene shaders, with the clear color in `tint`.
const CLEAR_SHADER: &str = r#"
struct Locals {
    mvp: mat4x4<f32>,
    tint: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> locals: Locals;

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    // One triangle covering the whole viewport, pinned to the far plane.
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    return vec4<f32>(positions[index], 1.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return locals.tint;
}
"#;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Uniform slot stride; matches the default dynamic-offset alignment.
const UNIFORM_SLOT_SIZE: u64 = 256;

/// Initial uniform arena capacity in slots; grows by doubling.
const INITIAL_UNIFORM_SLOTS: usize = 256;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Unorm8x4];

/// Per-draw uniform data, padded to the dynamic-offset stride.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniform {
    mvp: [[f32; 4]; 4],
    tint: [f32; 4],
    _pad: [f32; 44],
}

impl DrawUniform {
    fn new(mvp: Matrix4<f32>, tint: RgbaColor) -> Self {
        Self {
            mvp: mvp.into(),
            tint: tint.into(),
            _pad: [0.0; 44],
        }
    }
}

/// GPU-side mesh buffers.
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// What a pipeline is for, and the raster caps baked into it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum PipelineKey {
    Mesh {
        program: ProgramId,
        depth_test: bool,
        cull: bool,
    },
    Clear {
        color: bool,
        depth: bool,
    },
}

/// One recorded frame command.
enum FrameOp {
    Viewport(Rect),
    Scissor(Rect),
    ScissorEnabled(bool),
    Clear {
        slot: u32,
        color: bool,
        depth: bool,
    },
    Draw {
        pipeline: PipelineKey,
        mesh: MeshId,
        slot: u32,
    },
}

/// wgpu-backed [`GraphicsLayer`] rendering into a window surface.
pub struct WgpuGfx<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uniform_capacity: usize,

    clear_module: wgpu::ShaderModule,
    programs: HashMap<ProgramId, wgpu::ShaderModule>,
    meshes: HashMap<MeshId, GpuMesh>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    next_id: u32,

    // Frame recording state.
    ops: Vec<FrameOp>,
    uniforms: Vec<DrawUniform>,
    depth_test: bool,
    cull: bool,
}

impl<'a> WgpuGfx<'a> {
    /// Creates the device, surface configuration and shared resources for
    /// the given surface target.
    pub async fn new<T>(target: T, width: u32, height: u32) -> anyhow::Result<WgpuGfx<'a>>
    where
        T: Into<wgpu::SurfaceTarget<'a>>,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("device request failed")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_view = create_depth_view(&device, config.width, config.height);

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Locals Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(UNIFORM_SLOT_SIZE),
                    },
                    count: None,
                }],
            });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sandbox Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let (uniform_buffer, bind_group) =
            create_uniform_arena(&device, &bind_group_layout, INITIAL_UNIFORM_SLOTS);

        let clear_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Clear Shader"),
            source: wgpu::ShaderSource::Wgsl(CLEAR_SHADER.into()),
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            bind_group_layout,
            pipeline_layout,
            uniform_buffer,
            bind_group,
            uniform_capacity: INITIAL_UNIFORM_SLOTS,
            clear_module,
            programs: HashMap::new(),
            meshes: HashMap::new(),
            pipelines: HashMap::new(),
            next_id: 0,
            ops: Vec::new(),
            uniforms: Vec::new(),
            depth_test: false,
            cull: false,
        })
    }

    /// Current surface size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigures the surface and depth buffer for a new window size.
    pub fn resize(&mut self, (width, height): (u32, u32)) {
        if width == 0 || height == 0 {
            return; // minimized; keep the old configuration
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Pushes a uniform slot and returns its index.
    fn push_uniform(&mut self, mvp: Matrix4<f32>, tint: RgbaColor) -> u32 {
        self.uniforms.push(DrawUniform::new(mvp, tint));
        (self.uniforms.len() - 1) as u32
    }

    fn ensure_uniform_capacity(&mut self, slots: usize) {
        if slots <= self.uniform_capacity {
            return;
        }
        let mut capacity = self.uniform_capacity;
        while capacity < slots {
            capacity *= 2;
        }
        let (buffer, bind_group) =
            create_uniform_arena(&self.device, &self.bind_group_layout, capacity);
        self.uniform_buffer = buffer;
        self.bind_group = bind_group;
        self.uniform_capacity = capacity;
        log::debug!("uniform arena grown to {capacity} slots");
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let pipeline = match key {
            PipelineKey::Mesh {
                program,
                depth_test,
                cull,
            } => {
                let Some(module) = self.programs.get(&program) else {
                    return; // draw against a disposed program is dropped later
                };
                self.device
                    .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Mesh Pipeline"),
                        layout: Some(&self.pipeline_layout),
                        vertex: wgpu::VertexState {
                            module,
                            entry_point: Some("vs_main"),
                            compilation_options: Default::default(),
                            buffers: &[wgpu::VertexBufferLayout {
                                array_stride: std::mem::size_of::<crate::mesh::Vertex>()
                                    as wgpu::BufferAddress,
                                step_mode: wgpu::VertexStepMode::Vertex,
                                attributes: &VERTEX_ATTRIBUTES,
                            }],
                        },
                        fragment: Some(wgpu::FragmentState {
                            module,
                            entry_point: Some("fs_main"),
                            compilation_options: Default::default(),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: self.config.format,
                                blend: None,
                                write_mask: wgpu::ColorWrites::ALL,
                            })],
                        }),
                        primitive: wgpu::PrimitiveState {
                            topology: wgpu::PrimitiveTopology::TriangleList,
                            strip_index_format: None,
                            front_face: wgpu::FrontFace::Ccw,
                            cull_mode: cull.then_some(wgpu::Face::Back),
                            polygon_mode: wgpu::PolygonMode::Fill,
                            unclipped_depth: false,
                            conservative: false,
                        },
                        depth_stencil: Some(wgpu::DepthStencilState {
                            format: DEPTH_FORMAT,
                            depth_write_enabled: depth_test,
                            depth_compare: if depth_test {
                                wgpu::CompareFunction::Less
                            } else {
                                wgpu::CompareFunction::Always
                            },
                            stencil: wgpu::StencilState::default(),
                            bias: wgpu::DepthBiasState::default(),
                        }),
                        multisample: wgpu::MultisampleState::default(),
                        multiview_mask: None,
                        cache: None,
                    })
            }
            PipelineKey::Clear { color, depth } => {
                self.device
                    .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                        label: Some("Clear Pipeline"),
                        layout: Some(&self.pipeline_layout),
                        vertex: wgpu::VertexState {
                            module: &self.clear_module,
                            entry_point: Some("vs_main"),
                            compilation_options: Default::default(),
                            buffers: &[],
                        },
                        fragment: Some(wgpu::FragmentState {
                            module: &self.clear_module,
                            entry_point: Some("fs_main"),
                            compilation_options: Default::default(),
                            targets: &[Some(wgpu::ColorTargetState {
                                format: self.config.format,
                                blend: None,
                                write_mask: if color {
                                    wgpu::ColorWrites::ALL
                                } else {
                                    wgpu::ColorWrites::empty()
                                },
                            })],
                        }),
                        primitive: wgpu::PrimitiveState {
                            topology: wgpu::PrimitiveTopology::TriangleList,
                            strip_index_format: None,
                            front_face: wgpu::FrontFace::Ccw,
                            cull_mode: None,
                            polygon_mode: wgpu::PolygonMode::Fill,
                            unclipped_depth: false,
                            conservative: false,
                        },
                        // The clear triangle always passes and (optionally)
                        // writes the far-plane depth it was pinned to.
                        depth_stencil: Some(wgpu::DepthStencilState {
                            format: DEPTH_FORMAT,
                            depth_write_enabled: depth,
                            depth_compare: wgpu::CompareFunction::Always,
                            stencil: wgpu::StencilState::default(),
                            bias: wgpu::DepthBiasState::default(),
                        }),
                        multisample: wgpu::MultisampleState::default(),
                        multiview_mask: None,
                        cache: None,
                    })
            }
        };
        self.pipelines.insert(key, pipeline);
    }

    /// Replays the frame recorded since the last present into one render
    /// pass and presents the surface.
    ///
    /// A lost or outdated surface reconfigures and skips the frame instead
    /// of failing it.
    pub fn present(&mut self) -> anyhow::Result<()> {
        let ops = std::mem::take(&mut self.ops);
        let uniforms = std::mem::take(&mut self.uniforms);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.ensure_uniform_capacity(uniforms.len());
        if !uniforms.is_empty() {
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&uniforms));
        }

        // Pipelines must exist before the pass starts borrowing them.
        for op in &ops {
            match op {
                FrameOp::Draw { pipeline, .. } => self.ensure_pipeline(*pipeline),
                FrameOp::Clear { color, depth, .. } => self.ensure_pipeline(PipelineKey::Clear {
                    color: *color,
                    depth: *depth,
                }),
                _ => {}
            }
        }

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            let full = Rect::full_surface(self.config.width, self.config.height);
            let mut scissor = full;
            let mut scissor_enabled = false;

            for op in &ops {
                match op {
                    FrameOp::Viewport(rect) => {
                        let rect = rect.intersection(&full);
                        pass.set_viewport(
                            rect.x as f32,
                            rect.y as f32,
                            rect.width.max(1) as f32,
                            rect.height.max(1) as f32,
                            0.0,
                            1.0,
                        );
                    }
                    FrameOp::Scissor(rect) => {
                        scissor = *rect;
                        if scissor_enabled {
                            apply_scissor(&mut pass, scissor, full);
                        }
                    }
                    FrameOp::ScissorEnabled(enabled) => {
                        scissor_enabled = *enabled;
                        let effective = if scissor_enabled { scissor } else { full };
                        apply_scissor(&mut pass, effective, full);
                    }
                    FrameOp::Clear { slot, color, depth } => {
                        let key = PipelineKey::Clear {
                            color: *color,
                            depth: *depth,
                        };
                        let Some(pipeline) = self.pipelines.get(&key) else {
                            continue;
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_bind_group(0, &self.bind_group, &[slot * UNIFORM_SLOT_SIZE as u32]);
                        pass.draw(0..3, 0..1);
                    }
                    FrameOp::Draw {
                        pipeline,
                        mesh,
                        slot,
                    } => {
                        // Draws against disposed programs/meshes are dropped.
                        let (Some(pipeline), Some(mesh)) =
                            (self.pipelines.get(pipeline), self.meshes.get(mesh))
                        else {
                            continue;
                        };
                        pass.set_pipeline(pipeline);
                        pass.set_bind_group(0, &self.bind_group, &[slot * UNIFORM_SLOT_SIZE as u32]);
                        pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                        pass.set_index_buffer(
                            mesh.index_buffer.slice(..),
                            wgpu::IndexFormat::Uint32,
                        );
                        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    }
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl GraphicsLayer for WgpuGfx<'_> {
    fn create_program(&mut self, source: &str) -> Result<ProgramId, GraphicsError> {
        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Scene Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(GraphicsError::ProgramCreation(err.to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.programs.insert(id, module);
        Ok(id)
    }

    fn dispose_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.pipelines
            .retain(|key, _| !matches!(key, PipelineKey::Mesh { program: p, .. } if *p == program));
    }

    fn create_mesh(&mut self, data: &MeshData) -> MeshId {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Vertex Buffer"),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = self.next_id;
        self.next_id += 1;
        self.meshes.insert(
            id,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: data.indices.len() as u32,
            },
        );
        id
    }

    fn dispose_mesh(&mut self, mesh: MeshId) {
        self.meshes.remove(&mesh);
    }

    fn set_viewport(&mut self, rect: Rect) {
        self.ops.push(FrameOp::Viewport(rect));
    }

    fn set_scissor(&mut self, rect: Rect) {
        self.ops.push(FrameOp::Scissor(rect));
    }

    fn set_scissor_enabled(&mut self, enabled: bool) {
        self.ops.push(FrameOp::ScissorEnabled(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn set_cull_backfaces(&mut self, enabled: bool) {
        self.cull = enabled;
    }

    fn clear(&mut self, color: Option<RgbaColor>, depth: bool) {
        if color.is_none() && !depth {
            return;
        }
        let slot = self.push_uniform(
            cgmath::SquareMatrix::identity(),
            color.unwrap_or(RgbaColor::BLACK),
        );
        self.ops.push(FrameOp::Clear {
            slot,
            color: color.is_some(),
            depth,
        });
    }

    fn draw(&mut self, program: ProgramId, mesh: MeshId, mvp: Matrix4<f32>, tint: RgbaColor) {
        let slot = self.push_uniform(mvp, tint);
        let pipeline = PipelineKey::Mesh {
            program,
            depth_test: self.depth_test,
            cull: self.cull,
        };
        self.ops.push(FrameOp::Draw {
            pipeline,
            mesh,
            slot,
        });
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_uniform_arena(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    slots: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Arena"),
        size: slots as u64 * UNIFORM_SLOT_SIZE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Draw Uniform Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(UNIFORM_SLOT_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn apply_scissor(pass: &mut wgpu::RenderPass, rect: Rect, full: Rect) {
    let rect = rect.intersection(&full);
    pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
}
