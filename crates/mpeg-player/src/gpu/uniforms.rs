use bytemuck::{Pod, Zeroable};
use wgpu::{Buffer, Device, Queue};

/// Effect uniforms packed for GPU consumption (48 bytes).
/// Must be kept in sync with the WGSL `EffectUniforms` struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct EffectUniforms {
    /// Seconds since startup (`iTime`).
    pub time: f32,
    /// 1.0 while playback is paused.
    pub paused: f32,
    /// Surface size in pixels (`iResolution`).
    pub resolution: [f32; 2],
    // 16 bytes
    pub video_size: [f32; 2],
    /// Letterbox rectangle as fractions of the surface.
    pub scale: [f32; 2],
    // 32 bytes
    pub offset: [f32; 2],
    pub _pad: [f32; 2],
}

impl EffectUniforms {
    pub fn zeroed() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

pub struct UniformBuffer {
    pub buffer: Buffer,
}

impl UniformBuffer {
    pub fn new(device: &Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect-uniforms"),
            size: std::mem::size_of::<EffectUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer }
    }

    pub fn update(&self, queue: &Queue, uniforms: &EffectUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_uniforms_size_48() {
        assert_eq!(std::mem::size_of::<EffectUniforms>(), 48);
        // Uniform buffers bind in 16-byte steps
        assert_eq!(std::mem::size_of::<EffectUniforms>() % 16, 0);
    }

    #[test]
    fn effect_uniforms_zeroed() {
        let u = EffectUniforms::zeroed();
        assert_eq!(u.time, 0.0);
        assert_eq!(u.paused, 0.0);
        assert_eq!(u.resolution, [0.0, 0.0]);
        assert_eq!(u.scale, [0.0, 0.0]);
    }

    #[test]
    fn field_offsets_match_wgsl_layout() {
        let u = EffectUniforms::zeroed();
        let base = &u as *const _ as usize;
        assert_eq!(&u.resolution as *const _ as usize - base, 8);
        assert_eq!(&u.video_size as *const _ as usize - base, 16);
        assert_eq!(&u.scale as *const _ as usize - base, 24);
        assert_eq!(&u.offset as *const _ as usize - base, 32);
    }
}
