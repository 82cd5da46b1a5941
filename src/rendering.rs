//! Rendering system: wgpu device, pipelines, per-mesh GPU buffers and frame
//! capture.
//!
//! A frame draws the sky gradient first, then every opaque mesh with depth
//! writes, then transparent meshes back to front with alpha blending. The
//! water surface uses its own pipeline with two normal maps. Opaque meshes
//! are first drawn depth-only from the sun into the shadow map that the
//! lighting samples.

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::params::{
    srgb_hex, FogParams, LightingPreset, RecordingConfig, ShadowParams, POINT_LIGHTS,
};
use crate::scene::{Material, MaterialKind, NodeId, SceneGraph, TextureKind, Vertex};
use crate::textures::TextureSet;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

/// Hemisphere light: sky color, ground color, intensity
const HEMISPHERE: (u32, u32, f32) = (0x87CEEB, 0x8A8070, 0.4);

/// Sky gradient horizon offset, exponent and dome radius
const SKY_OFFSET: f32 = 20.0;
const SKY_EXPONENT: f32 = 0.4;
const SKY_RADIUS: f32 = 500.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position_range: [f32; 4],
    pub color: [f32; 4],
}

/// Frame-wide uniforms (group 0 of the mesh pipelines)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub sun_direction: [f32; 4],
    pub sun_color: [f32; 4],
    pub ambient: [f32; 4],
    pub hemi_sky: [f32; 4],
    pub hemi_ground: [f32; 4],
    pub sky_top: [f32; 4],
    pub sky_bottom: [f32; 4],
    pub fog: [f32; 4],
    pub tone: [f32; 4],
    pub point_lights: [PointLightUniform; 5],
    pub light_view_proj: [[f32; 4]; 4],
    pub shadow: [f32; 4],
}

/// Group 0 of the shadow pipeline
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ShadowPassUniforms {
    pub light_view_proj: [[f32; 4]; 4],
}

/// Per-mesh uniforms (group 1)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub params: [f32; 4],
}

/// Water material uniforms (group 2 of the water pipeline)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WaterUniforms {
    pub params: [f32; 4],
    pub repeats: [f32; 4],
    pub specular: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkyUniforms {
    pub inv_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub top: [f32; 4],
    pub bottom: [f32; 4],
    pub params: [f32; 4],
}

/// Everything a frame needs besides the scene itself
#[derive(Debug, Clone, Copy)]
pub struct FrameParams<'a> {
    pub view_proj: Mat4,
    pub camera_pos: Vec3,
    pub lighting: &'a LightingPreset,
    pub fog: &'a FogParams,
    pub exposure: f32,
}

fn rgb(v: Vec3, w: f32) -> [f32; 4] {
    v.extend(w).to_array()
}

impl Globals {
    pub fn from_frame(frame: &FrameParams, shadows: &ShadowParams) -> Self {
        let lighting = frame.lighting;
        let (hemi_sky, hemi_ground, hemi_intensity) = HEMISPHERE;
        let fog_density = if frame.fog.enabled { frame.fog.density } else { 0.0 };

        let point_lights = POINT_LIGHTS.map(|light| PointLightUniform {
            position_range: rgb(light.position, light.range_m),
            color: rgb(srgb_hex(light.color_hex) * light.intensity, 0.0),
        });

        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            camera_pos: rgb(frame.camera_pos, 1.0),
            sun_direction: rgb(lighting.sun_direction(), 0.0),
            sun_color: rgb(lighting.sun_color * lighting.sun_intensity, 0.0),
            ambient: rgb(lighting.ambient_color * lighting.ambient_intensity, 0.0),
            hemi_sky: rgb(srgb_hex(hemi_sky), hemi_intensity),
            hemi_ground: rgb(srgb_hex(hemi_ground), 0.0),
            sky_top: rgb(lighting.sky_top, 0.0),
            sky_bottom: rgb(lighting.sky_bottom, 0.0),
            fog: rgb(lighting.fog_color, fog_density),
            tone: [frame.exposure, 0.0, 0.0, 0.0],
            point_lights,
            light_view_proj: shadows.light_view_proj(lighting.sun_position).to_cols_array_2d(),
            shadow: [
                shadows.bias,
                shadows.normal_bias_m,
                1.0 / shadows.map_size as f32,
                1.0,
            ],
        }
    }
}

impl SkyUniforms {
    pub fn from_frame(frame: &FrameParams) -> Self {
        Self {
            inv_view_proj: frame.view_proj.inverse().to_cols_array_2d(),
            camera_pos: rgb(frame.camera_pos, 1.0),
            top: rgb(frame.lighting.sky_top, 0.0),
            bottom: rgb(frame.lighting.sky_bottom, 0.0),
            params: [SKY_OFFSET, SKY_EXPONENT, SKY_RADIUS, 0.0],
        }
    }
}

impl ObjectUniforms {
    pub fn new(model: Mat4, material: &Material) -> Self {
        let unlit = matches!(material.kind, MaterialKind::Unlit);
        Self {
            model: model.to_cols_array_2d(),
            color: rgb(material.color, material.opacity),
            params: [
                material.roughness,
                material.uv_repeat.x,
                material.uv_repeat.y,
                if unlit { 1.0 } else { 0.0 },
            ],
        }
    }
}

impl WaterUniforms {
    /// None for non-water materials
    pub fn from_material(material: &Material) -> Option<Self> {
        let MaterialKind::Water(water) = &material.kind else {
            return None;
        };
        Some(Self {
            params: [
                water.surface_time,
                water.primary_normal_scale,
                water.detail_normal_scale,
                water.specular_intensity,
            ],
            repeats: [
                water.primary_repeat.x,
                water.primary_repeat.y,
                water.detail_repeat.x,
                water.detail_repeat.y,
            ],
            specular: rgb(water.specular_color, 0.0),
        })
    }
}

/// Strip row padding from a mapped capture buffer, swapping BGRA to RGBA
/// when the surface stores blue first
pub fn unpad_rows(data: &[u8], width: u32, height: u32, padded_bytes_per_row: u32, bgra: bool) -> Vec<u8> {
    let row_bytes = (width * 4) as usize;
    let mut image = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * padded_bytes_per_row as usize;
        image.extend_from_slice(&data[start..start + row_bytes]);
    }
    if bgra {
        image.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
    }
    image
}

struct GpuMesh {
    node: NodeId,
    vertex_buffer: wgpu::Buffer,
    vertex_count: usize,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    object_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    water: Option<(wgpu::Buffer, wgpu::BindGroup)>,

    /// Local-space bounding box center, for back-to-front sorting
    center: Vec3,
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    shadows: ShadowParams,
    shadow_view: wgpu::TextureView,
    shadow_pipeline: wgpu::RenderPipeline,
    shadow_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    sky_pipeline: wgpu::RenderPipeline,
    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    water_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    sky_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,
    meshes: Vec<GpuMesh>,
    recording_config: Option<RecordingConfig>,
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
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
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    image: &image::RgbaImage,
    format: wgpu::TextureFormat,
) -> wgpu::TextureView {
    device
        .create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: image.width(),
                    height: image.height(),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.as_raw(),
        )
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_shadow_view(device: &wgpu::Device, size: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// Depth-only pipeline rendering opaque meshes from the sun
fn shadow_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

struct PipelineDesc<'a> {
    label: &'a str,
    layout: &'a wgpu::PipelineLayout,
    module: &'a wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_write: bool,
}

fn mesh_pipeline(device: &wgpu::Device, desc: PipelineDesc) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(desc.layout),
        vertex: wgpu::VertexState {
            module: desc.module,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: desc.module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: desc.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            // Planes, flags and the water are seen from both sides
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl RenderSystem {
    /// Create the rendering system and upload every mesh in the scene
    pub async fn new(
        window: Arc<winit::window::Window>,
        scene: &SceneGraph,
        textures: &TextureSet,
        recording_config: Option<RecordingConfig>,
    ) -> Result<Self, RenderError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Window must have 'static lifetime via Arc
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;

        let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
        // Frame capture copies out of the swapchain texture
        if recording_config.is_some() {
            usage |= wgpu::TextureUsages::COPY_SRC;
        }

        let config = wgpu::SurfaceConfiguration {
            usage,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(
                concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/scene.wgsl")).into(),
            ),
        });
        let water_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Water Shader"),
            source: wgpu::ShaderSource::Wgsl(
                concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/water.wgsl")).into(),
            ),
        });
        let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sky Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/sky.wgsl").into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shadow.wgsl").into()),
        });

        // Bind group layouts
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[
                uniform_entry(0, vertex_fragment),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Depth,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[uniform_entry(0, vertex_fragment), texture_entry(1), sampler_entry(2)],
        });
        let water_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Water Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                texture_entry(2),
                sampler_entry(3),
            ],
        });
        let sky_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::FRAGMENT)],
        });
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        // Sun shadow map
        let shadows = ShadowParams::default();
        let shadow_view = create_shadow_view(&device, shadows.map_size);
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let shadow_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Pass Buffer"),
            size: std::mem::size_of::<ShadowPassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &shadow_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_buffer.as_entire_binding(),
            }],
        });

        // Frame uniforms
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &globals_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });
        let sky_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sky Uniform Buffer"),
            size: std::mem::size_of::<SkyUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Bind Group"),
            layout: &sky_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sky_buffer.as_entire_binding(),
            }],
        });

        // Pipelines
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let water_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Water Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &object_layout, &water_layout],
            push_constant_ranges: &[],
        });
        let sky_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sky Pipeline Layout"),
            bind_group_layouts: &[&sky_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&shadow_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let shadow_pipeline = shadow_pipeline(&device, &shadow_pipeline_layout, &shadow_shader);

        let opaque_pipeline = mesh_pipeline(
            &device,
            PipelineDesc {
                label: "Opaque Pipeline",
                layout: &scene_layout,
                module: &scene_shader,
                format: config.format,
                blend: None,
                depth_write: true,
            },
        );
        let transparent_pipeline = mesh_pipeline(
            &device,
            PipelineDesc {
                label: "Transparent Pipeline",
                layout: &scene_layout,
                module: &scene_shader,
                format: config.format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                depth_write: false,
            },
        );
        let water_pipeline = mesh_pipeline(
            &device,
            PipelineDesc {
                label: "Water Pipeline",
                layout: &water_pipeline_layout,
                module: &water_shader,
                format: config.format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                depth_write: false,
            },
        );

        let sky_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sky Pipeline"),
            layout: Some(&sky_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sky_shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sky_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
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
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Textures
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Repeat Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let white = upload_texture(
            &device,
            &queue,
            "White Texture",
            &image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4])),
            wgpu::TextureFormat::Rgba8UnormSrgb,
        );
        let color_textures: HashMap<TextureKind, wgpu::TextureView> = TextureKind::ALL
            .into_iter()
            .map(|kind| {
                let label = format!("{kind:?} Texture");
                let view = upload_texture(
                    &device,
                    &queue,
                    &label,
                    textures.get(kind),
                    wgpu::TextureFormat::Rgba8UnormSrgb,
                );
                (kind, view)
            })
            .collect();
        let water_primary = upload_texture(
            &device,
            &queue,
            "Water Primary Normals",
            &textures.water_primary,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        let water_detail = upload_texture(
            &device,
            &queue,
            "Water Detail Normals",
            &textures.water_detail,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        // Per-mesh buffers
        let mut meshes = Vec::new();
        for (node, mesh) in scene.mesh_nodes() {
            let geometry = &mesh.geometry;
            if geometry.indices.is_empty() {
                continue;
            }
            let name = &scene.node(node).name;

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Vertices")),
                contents: bytemuck::cast_slice(&geometry.vertices()),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Indices")),
                contents: bytemuck::cast_slice(&geometry.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let object_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{name} Uniforms")),
                contents: bytemuck::cast_slice(&[ObjectUniforms::new(Mat4::IDENTITY, &mesh.material)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

            let texture = mesh
                .material
                .texture
                .and_then(|kind| color_textures.get(&kind))
                .unwrap_or(&white);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{name} Bind Group")),
                layout: &object_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: object_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(texture),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });

            let water = WaterUniforms::from_material(&mesh.material).map(|uniforms| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Water Uniform Buffer"),
                    contents: bytemuck::cast_slice(&[uniforms]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Water Bind Group"),
                    layout: &water_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(&water_primary),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&water_detail),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: wgpu::BindingResource::Sampler(&sampler),
                        },
                    ],
                });
                (buffer, bind_group)
            });

            let (min, max) = geometry.positions.iter().fold(
                (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
                |(lo, hi), p| (lo.min(Vec3::from_array(*p)), hi.max(Vec3::from_array(*p))),
            );

            meshes.push(GpuMesh {
                node,
                vertex_buffer,
                vertex_count: geometry.vertex_count(),
                index_buffer,
                index_count: geometry.indices.len() as u32,
                object_buffer,
                bind_group,
                water,
                center: (min + max) / 2.0,
            });
        }
        log::info!("Uploaded {} meshes", meshes.len());

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_view,
            shadows,
            shadow_view,
            shadow_pipeline,
            shadow_buffer,
            shadow_bind_group,
            sky_pipeline,
            opaque_pipeline,
            transparent_pipeline,
            water_pipeline,
            globals_buffer,
            globals_bind_group,
            sky_buffer,
            sky_bind_group,
            meshes,
            recording_config,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigure the swapchain and depth buffer; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    pub fn reconfigure(&mut self) {
        let (width, height) = self.size();
        self.resize(width, height);
    }

    /// Push changed geometry and per-frame uniforms to the GPU
    fn sync_scene(&mut self, scene: &mut SceneGraph, frame: &FrameParams) {
        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::cast_slice(&[Globals::from_frame(frame, &self.shadows)]),
        );
        let light_view_proj = self.shadows.light_view_proj(frame.lighting.sun_position);
        self.queue.write_buffer(
            &self.shadow_buffer,
            0,
            bytemuck::cast_slice(&[ShadowPassUniforms {
                light_view_proj: light_view_proj.to_cols_array_2d(),
            }]),
        );
        self.queue.write_buffer(
            &self.sky_buffer,
            0,
            bytemuck::cast_slice(&[SkyUniforms::from_frame(frame)]),
        );

        for gpu in &mut self.meshes {
            let Some(mesh) = scene.node_mut(gpu.node).mesh.as_mut() else {
                continue;
            };

            if mesh.geometry.needs_upload {
                let vertices = mesh.geometry.vertices();
                if vertices.len() == gpu.vertex_count {
                    self.queue
                        .write_buffer(&gpu.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
                } else {
                    gpu.vertex_buffer =
                        self.device
                            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                                label: Some("Resized Vertices"),
                                contents: bytemuck::cast_slice(&vertices),
                                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                            });
                    gpu.vertex_count = vertices.len();
                }
                mesh.geometry.needs_upload = false;
            }

            if let (Some((buffer, _)), Some(uniforms)) =
                (&gpu.water, WaterUniforms::from_material(&mesh.material))
            {
                self.queue
                    .write_buffer(buffer, 0, bytemuck::cast_slice(&[uniforms]));
            }
        }
    }

    /// Render one frame; `frame_num` names the captured PNG in recording mode
    pub fn render(
        &mut self,
        scene: &mut SceneGraph,
        frame: &FrameParams,
        frame_num: usize,
    ) -> Result<(), wgpu::SurfaceError> {
        self.sync_scene(scene, frame);

        // Visible meshes with their world transforms
        let index_of: HashMap<NodeId, usize> = self
            .meshes
            .iter()
            .enumerate()
            .map(|(i, gpu)| (gpu.node, i))
            .collect();
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for (node, world) in scene.visible_meshes() {
            let Some(&i) = index_of.get(&node) else {
                continue;
            };
            let Some(mesh) = scene.node(node).mesh.as_ref() else {
                continue;
            };
            let gpu = &self.meshes[i];
            self.queue.write_buffer(
                &gpu.object_buffer,
                0,
                bytemuck::cast_slice(&[ObjectUniforms::new(world, &mesh.material)]),
            );
            if mesh.material.is_transparent() {
                let center = world.transform_point3(gpu.center);
                transparent.push((i, center.distance_squared(frame.camera_pos)));
            } else {
                opaque.push(i);
            }
        }
        transparent.sort_by(|a, b| b.1.total_cmp(&a.1));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.shadow_bind_group, &[]);
            for &i in &opaque {
                let gpu = &self.meshes[i];
                shadow_pass.set_bind_group(1, &gpu.bind_group, &[]);
                shadow_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                shadow_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                shadow_pass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.sky_pipeline);
            render_pass.set_bind_group(0, &self.sky_bind_group, &[]);
            render_pass.draw(0..3, 0..1); // Fullscreen triangle

            render_pass.set_pipeline(&self.opaque_pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            for &i in &opaque {
                let gpu = &self.meshes[i];
                render_pass.set_bind_group(1, &gpu.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }

            for &(i, _) in &transparent {
                let gpu = &self.meshes[i];
                match &gpu.water {
                    Some((_, water_bind_group)) => {
                        render_pass.set_pipeline(&self.water_pipeline);
                        render_pass.set_bind_group(2, water_bind_group, &[]);
                    }
                    None => render_pass.set_pipeline(&self.transparent_pipeline),
                }
                render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
                render_pass.set_bind_group(1, &gpu.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(ref config) = self.recording_config {
            self.capture_frame(frame_num, config, &output);
        }

        output.present();

        Ok(())
    }

    /// Capture a frame to disk (recording mode only)
    fn capture_frame(&self, frame_num: usize, config: &RecordingConfig, texture: &wgpu::SurfaceTexture) {
        let (width, height) = self.size();
        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Capture Buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Capture Encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, |_| {});
        self.device.poll(wgpu::Maintain::Wait);

        let bgra = matches!(
            self.config.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );
        let image_data = {
            let data = buffer_slice.get_mapped_range();
            unpad_rows(&data, width, height, padded_bytes_per_row, bgra)
        };
        buffer.unmap();

        let frame_path = format!("{}/frame_{:05}.png", config.frames_dir(), frame_num);
        if let Err(e) = image::save_buffer(
            &frame_path,
            &image_data,
            width,
            height,
            image::ColorType::Rgba8,
        ) {
            log::error!("Failed to save frame {}: {}", frame_num, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{RenderConfig, TimeOfDay};

    fn frame<'a>(lighting: &'a LightingPreset, fog: &'a FogParams) -> FrameParams<'a> {
        FrameParams {
            view_proj: Mat4::IDENTITY,
            camera_pos: Vec3::new(-30.0, 25.0, 80.0),
            lighting,
            fog,
            exposure: RenderConfig::default().exposure,
        }
    }

    #[test]
    fn test_uniform_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<Globals>(), 464);
        assert_eq!(std::mem::size_of::<ShadowPassUniforms>(), 64);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 96);
        assert_eq!(std::mem::size_of::<WaterUniforms>(), 48);
        assert_eq!(std::mem::size_of::<SkyUniforms>(), 128);
    }

    #[test]
    fn test_globals_follow_fog_toggle() {
        let lighting = TimeOfDay::Sunset.preset();
        let mut fog = FogParams::default();
        let globals = Globals::from_frame(&frame(&lighting, &fog), &ShadowParams::default());
        assert_eq!(globals.fog[3], 0.002);
        assert_eq!(globals.tone[0], 1.1);

        fog.enabled = false;
        let globals = Globals::from_frame(&frame(&lighting, &fog), &ShadowParams::default());
        assert_eq!(globals.fog[3], 0.0);
    }

    #[test]
    fn test_globals_pack_point_lights() {
        let lighting = TimeOfDay::Day.preset();
        let fog = FogParams::default();
        let globals = Globals::from_frame(&frame(&lighting, &fog), &ShadowParams::default());
        assert_eq!(globals.point_lights[2].position_range, [-80.0, 35.0, 0.0, 40.0]);
        let sun = Vec3::from_slice(&globals.sun_direction[..3]);
        assert!((sun.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_globals_carry_sun_shadow() {
        let lighting = TimeOfDay::Sunset.preset();
        let fog = FogParams::default();
        let shadows = ShadowParams::default();
        let globals = Globals::from_frame(&frame(&lighting, &fog), &shadows);
        assert_eq!(globals.shadow, [-0.0005, 0.02, 1.0 / 4096.0, 1.0]);

        let expected = shadows.light_view_proj(lighting.sun_position);
        assert_eq!(Mat4::from_cols_array_2d(&globals.light_view_proj), expected);
        let target = expected.project_point3(LightingPreset::SUN_TARGET);
        assert!((0.0..1.0).contains(&target.z));
    }

    #[test]
    fn test_object_uniforms_flag_unlit() {
        let tint = Material::unlit(0x031828, 0.55);
        let uniforms = ObjectUniforms::new(Mat4::IDENTITY, &tint);
        assert_eq!(uniforms.params[3], 1.0);
        assert_eq!(uniforms.color[3], 0.55);
        assert!(WaterUniforms::from_material(&tint).is_none());

        let mut water = Material::water(0x0B3D6B, 0.92);
        *water.surface_time_mut().unwrap() = 4.0;
        let uniforms = WaterUniforms::from_material(&water).unwrap();
        assert_eq!(uniforms.params[0], 4.0);
        assert_eq!(uniforms.repeats, [4.0, 8.0, 10.0, 20.0]);
    }

    #[test]
    fn test_unpad_rows_strips_padding_and_swizzles() {
        // 1x2 image, rows padded to 8 bytes
        let data = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        assert_eq!(unpad_rows(&data, 1, 2, 8, false), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(unpad_rows(&data, 1, 2, 8, true), vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }
}
