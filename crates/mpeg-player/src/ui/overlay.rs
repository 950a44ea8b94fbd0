use winit::event::WindowEvent;
use winit::window::Window;

use super::hud::{HudInfo, HudResponse, draw_hud};

/// Tessellated HUD waiting to be drawn.
#[derive(Default)]
struct PendingHud {
    primitives: Vec<egui::ClippedPrimitive>,
    textures: egui::TexturesDelta,
    pixels_per_point: f32,
}

/// The player's on-screen HUD: egui input, layout and painting over the
/// video, one pass per redraw.
pub struct HudOverlay {
    input: egui_winit::State,
    painter: egui_wgpu::Renderer,
    pending: PendingHud,
    size: [u32; 2],
    /// Effect labels and frame counters; toggled with H.
    pub show_labels: bool,
}

impl HudOverlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, window: &Window) -> Self {
        let ctx = egui::Context::default();
        // Light visuals: HUD text sits on an off-white clear colour
        ctx.set_visuals(egui::Visuals::light());
        let input = egui_winit::State::new(ctx.clone(), ctx.viewport_id(), window, None, None, None);
        let options = egui_wgpu::RendererOptions {
            msaa_samples: 1,
            ..Default::default()
        };
        let painter = egui_wgpu::Renderer::new(device, format, options);
        let size = window.inner_size();

        Self {
            input,
            painter,
            pending: PendingHud::default(),
            size: [size.width, size.height],
            show_labels: true,
        }
    }

    /// Feed a window event to egui. True when egui used it.
    pub fn on_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.input.on_window_event(window, event).consumed
    }

    pub fn wants_keyboard(&self) -> bool {
        self.input.egui_ctx().wants_keyboard_input()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = [width, height];
    }

    /// Lay out this frame's HUD and report what the user clicked.
    pub fn run(&mut self, window: &Window, info: &HudInfo<'_>) -> HudResponse {
        let raw = self.input.take_egui_input(window);
        let ctx = self.input.egui_ctx().clone();
        let mut response = HudResponse::default();
        let output = ctx.run(raw, |ctx| response = draw_hud(ctx, info));
        self.input
            .handle_platform_output(window, output.platform_output);

        self.pending = PendingHud {
            primitives: ctx.tessellate(output.shapes, output.pixels_per_point),
            textures: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        };
        response
    }

    /// Paint the HUD prepared by the last `run` on top of `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let pending = std::mem::take(&mut self.pending);
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: self.size,
            pixels_per_point: pending.pixels_per_point,
        };

        for (id, delta) in &pending.textures.set {
            self.painter.update_texture(device, queue, *id, delta);
        }
        self.painter
            .update_buffers(device, queue, encoder, &pending.primitives, &screen);

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("hud-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        self.painter.render(&mut pass, &pending.primitives, &screen);
        drop(pass);

        for id in &pending.textures.free {
            self.painter.free_texture(id);
        }
    }
}
