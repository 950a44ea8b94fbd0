pub mod context;
pub mod fullscreen_quad;
pub mod pipeline;
pub mod uniforms;
pub mod video_texture;

pub use context::GpuContext;
pub use pipeline::EffectRenderer;
pub use uniforms::EffectUniforms;
pub use video_texture::{VideoTexture, compute_letterbox};
