use wgpu::{Device, Queue, Sampler, Texture, TextureView};

use crate::playback::FrameBuffer;

/// Rgba8UnormSrgb texture sized to the loaded video. Lives as long as the
/// load it was created for.
pub struct VideoTexture {
    texture: Texture,
    pub view: TextureView,
    pub sampler: Sampler,
    pub width: u32,
    pub height: u32,
    staging: Vec<u8>,
}

impl VideoTexture {
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("video-frame"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("video-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!("Video texture allocated: {width}x{height}");

        Self {
            texture,
            view,
            sampler,
            width,
            height,
            staging: Vec::with_capacity(width as usize * height as usize * 4),
        }
    }

    /// Upload a decoded frame. Frames of a different size are skipped.
    pub fn upload(&mut self, queue: &Queue, frame: &FrameBuffer) {
        if frame.width != self.width || frame.height != self.height {
            log::warn!(
                "Frame {}x{} does not match texture {}x{}",
                frame.width,
                frame.height,
                self.width,
                self.height
            );
            return;
        }
        frame.to_rgba(&mut self.staging);

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &self.staging,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Aspect-preserving fit of the video into the surface, centered.
/// Returns `(scale, offset)` as fractions of the surface size.
pub fn compute_letterbox(surface: (u32, u32), video: (u32, u32)) -> ([f32; 2], [f32; 2]) {
    let (sw, sh) = (surface.0.max(1) as f32, surface.1.max(1) as f32);
    let (vw, vh) = (video.0.max(1) as f32, video.1.max(1) as f32);
    let fit = (sw / vw).min(sh / vh);
    let scale = [vw * fit / sw, vh * fit / sh];
    let offset = [(1.0 - scale[0]) * 0.5, (1.0 - scale[1]) * 0.5];
    (scale, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-5 && (a[1] - b[1]).abs() < 1e-5
    }

    #[test]
    fn same_aspect_fills_surface() {
        let (scale, offset) = compute_letterbox((1920, 1080), (640, 360));
        assert!(close(scale, [1.0, 1.0]));
        assert!(close(offset, [0.0, 0.0]));
    }

    #[test]
    fn wide_surface_pillarboxes() {
        // 4:3 video in a 16:9 window: bars left and right
        let (scale, offset) = compute_letterbox((1600, 900), (640, 480));
        assert!(close(scale, [0.75, 1.0]));
        assert!(close(offset, [0.125, 0.0]));
    }

    #[test]
    fn tall_surface_letterboxes() {
        let (scale, offset) = compute_letterbox((800, 800), (400, 200));
        assert!(close(scale, [1.0, 0.5]));
        assert!(close(offset, [0.0, 0.25]));
    }

    #[test]
    fn degenerate_sizes_do_not_divide_by_zero() {
        let (scale, offset) = compute_letterbox((0, 0), (0, 0));
        assert!(scale.iter().chain(offset.iter()).all(|v| v.is_finite()));
    }
}
