use anyhow::{Result, anyhow};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, BufferBindingType, ColorTargetState,
    CommandEncoder, Device, FragmentState, MultisampleState, PipelineCompilationOptions,
    PipelineLayout, PipelineLayoutDescriptor, PrimitiveState, Queue, RenderPipeline,
    SamplerBindingType, ShaderModule, ShaderStages, TextureFormat, TextureSampleType,
    TextureView, TextureViewDimension, VertexState,
};

use super::fullscreen_quad::VIDEO_QUAD_VERTICES;
use super::uniforms::{EffectUniforms, UniformBuffer};
use super::video_texture::VideoTexture;
use crate::effect::{EffectLoader, PostFx};
use crate::shader::compile_shader;

/// Background behind the letterboxed video: off-white, 245/255 sRGB.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.913,
    g: 0.913,
    b: 0.913,
    a: 1.0,
};

struct EffectPipeline {
    pipeline: RenderPipeline,
    source: String,
}

/// One render pipeline per `PostFx`, sharing a bind group layout:
/// video texture (0), sampler (1), uniforms (2).
pub struct EffectRenderer {
    format: TextureFormat,
    bind_group_layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    pipelines: Vec<EffectPipeline>,
    uniform_buffer: UniformBuffer,
    bind_group: Option<BindGroup>,
}

impl EffectRenderer {
    pub fn new(device: &Device, format: TextureFormat, loader: &EffectLoader) -> Result<Self> {
        let bind_group_layout = Self::create_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("effect-pipeline-layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines = Vec::with_capacity(PostFx::ALL.len());
        for fx in PostFx::ALL {
            let source = loader.load_effect_source(fx);
            let pipeline = match Self::build(device, format, &pipeline_layout, fx, &source) {
                Ok(p) => EffectPipeline { pipeline: p, source },
                Err(e) => {
                    // A broken file on disk must not stop startup
                    log::error!("{e}; using builtin {}", fx.file_name());
                    let builtin = EffectLoader::assemble(loader.builtin_fragment(fx));
                    let p = Self::build(device, format, &pipeline_layout, fx, &builtin)
                        .map_err(|e| anyhow!("builtin shader failed: {e}"))?;
                    EffectPipeline {
                        pipeline: p,
                        source: builtin,
                    }
                }
            };
            pipelines.push(pipeline);
        }

        Ok(Self {
            format,
            bind_group_layout,
            pipeline_layout,
            pipelines,
            uniform_buffer: UniformBuffer::new(device),
            bind_group: None,
        })
    }

    /// Rebuild the pipeline for `fx` from new source. Returns `Ok(false)` when
    /// the source is unchanged. On error the previous pipeline stays in use.
    pub fn recompile(&mut self, device: &Device, fx: PostFx, source: String) -> Result<bool, String> {
        if self.pipelines[fx.index()].source == source {
            return Ok(false);
        }
        let pipeline = Self::build(device, self.format, &self.pipeline_layout, fx, &source)?;
        self.pipelines[fx.index()] = EffectPipeline { pipeline, source };
        Ok(true)
    }

    /// Point the bind group at a newly allocated video texture.
    pub fn bind_video(&mut self, device: &Device, video: &VideoTexture) {
        self.bind_group = Some(device.create_bind_group(&BindGroupDescriptor {
            label: Some("effect-bind-group"),
            layout: &self.bind_group_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&video.view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&video.sampler),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.buffer.as_entire_binding(),
                },
            ],
        }));
    }

    pub fn clear_video(&mut self) {
        self.bind_group = None;
    }

    /// Clear the target, then draw the video through `fx` if one is bound.
    pub fn render(
        &self,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        target: &TextureView,
        fx: PostFx,
        uniforms: &EffectUniforms,
    ) {
        self.uniform_buffer.update(queue, uniforms);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("effect-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some(bind_group) = &self.bind_group {
            pass.set_pipeline(&self.pipelines[fx.index()].pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..VIDEO_QUAD_VERTICES, 0..1);
        }
    }

    fn build(
        device: &Device,
        format: TextureFormat,
        layout: &PipelineLayout,
        fx: PostFx,
        source: &str,
    ) -> Result<RenderPipeline, String> {
        let module = compile_shader(device, source, fx.file_name())?;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = Self::create_pipeline(device, format, layout, &module);
        match pollster::block_on(device.pop_error_scope()) {
            Some(err) => Err(format!("{}: {err}", fx.file_name())),
            None => Ok(pipeline),
        }
    }

    fn create_bind_group_layout(device: &Device) -> BindGroupLayout {
        device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("effect-bind-group-layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::VERTEX_FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        })
    }

    fn create_pipeline(
        device: &Device,
        format: TextureFormat,
        layout: &PipelineLayout,
        shader_module: &ShaderModule,
    ) -> RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("effect-render-pipeline"),
            layout: Some(layout),
            vertex: VertexState {
                module: shader_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}
