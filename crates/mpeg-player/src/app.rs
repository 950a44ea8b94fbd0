use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use winit::window::Window;

use crate::audio::CpalAudio;
use crate::config::PlayerConfig;
use crate::effect::{EffectLoader, PostFx};
use crate::gpu::{EffectRenderer, EffectUniforms, GpuContext, VideoTexture, compute_letterbox};
use crate::input::{DropQueue, OpenError, SUPPORTED_EXTENSIONS, apply_drops};
use crate::media::FfmpegBackend;
use crate::playback::{PlaybackController, PlaybackState};
use crate::shader::ShaderWatcher;
use crate::ui::{HudInfo, HudOverlay};

pub const WINDOW_TITLE: &str = "MPEG Player w/ Post-Processing Shaders";

/// How long a transient error stays on the HUD.
const STATUS_ERROR_TTL: Duration = Duration::from_secs(6);

pub type Controller = PlaybackController<FfmpegBackend, CpalAudio>;

pub struct App {
    pub gpu: GpuContext,
    pub window: Arc<Window>,
    pub hud: HudOverlay,
    pub controller: Controller,
    pub drops: DropQueue,
    pub current_fx: PostFx,
    pub status_error: Option<(String, Instant)>,
    pub quit_requested: bool,
    renderer: EffectRenderer,
    effect_loader: EffectLoader,
    shader_watcher: Option<ShaderWatcher>,
    shader_error: Option<String>,
    file_dialog_rx: Option<Receiver<PathBuf>>,
    video_texture: Option<VideoTexture>,
    texture_epoch: Option<u64>,
    uniforms: EffectUniforms,
    start_time: Instant,
}

impl App {
    pub fn new(window: Arc<Window>, config: &PlayerConfig) -> Result<Self> {
        let gpu = GpuContext::new(window.clone())?;

        let effect_loader = EffectLoader::new(config.shader_dir.clone());
        let renderer = EffectRenderer::new(&gpu.device, gpu.format, &effect_loader)?;

        let shader_watcher = if config.hot_reload {
            match ShaderWatcher::new(effect_loader.shader_dir()) {
                Ok(w) => w,
                Err(e) => {
                    log::warn!("Shader hot reload unavailable: {e}");
                    None
                }
            }
        } else {
            None
        };

        let controller = PlaybackController::new(
            FfmpegBackend::new(),
            CpalAudio::new(config.audio_queue),
            config.sync_policy(),
        );

        let hud = HudOverlay::new(&gpu.device, gpu.format, &window);

        Ok(Self {
            gpu,
            window,
            hud,
            controller,
            drops: DropQueue::default(),
            current_fx: PostFx::default(),
            status_error: None,
            quit_requested: false,
            renderer,
            effect_loader,
            shader_watcher,
            shader_error: None,
            file_dialog_rx: None,
            video_texture: None,
            texture_epoch: None,
            uniforms: EffectUniforms::zeroed(),
            start_time: Instant::now(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
        self.hud.resize(width, height);
    }

    pub fn next_effect(&mut self) {
        self.set_effect(self.current_fx.next());
    }

    pub fn prev_effect(&mut self) {
        self.set_effect(self.current_fx.prev());
    }

    fn set_effect(&mut self, fx: PostFx) {
        self.current_fx = fx;
        log::info!("Effect: {}", fx.label());
    }

    fn set_status_error(&mut self, msg: String) {
        self.status_error = Some((msg, Instant::now()));
    }

    /// Open the native file dialog on a background thread; the chosen file
    /// goes through the same validation as a drop.
    pub fn open_file_dialog(&mut self) {
        if self.file_dialog_rx.is_some() {
            return;
        }
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.file_dialog_rx = Some(rx);
        let spawned = std::thread::Builder::new()
            .name("file-dialog".into())
            .spawn(move || {
                let dialog =
                    rfd::FileDialog::new().add_filter("MPEG video", SUPPORTED_EXTENSIONS);
                if let Some(path) = dialog.pick_file() {
                    let _ = tx.send(path);
                }
            });
        if let Err(e) = spawned {
            log::error!("Failed to open file dialog: {e}");
            self.file_dialog_rx = None;
        }
    }

    fn poll_file_dialog(&mut self) {
        let Some(rx) = &self.file_dialog_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(path) => {
                self.drops.push(path);
                self.file_dialog_rx = None;
            }
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                // Cancelled: sender dropped without sending
                self.file_dialog_rx = None;
            }
            Err(crossbeam_channel::TryRecvError::Empty) => {}
        }
    }

    fn handle_drops(&mut self) {
        match apply_drops(&mut self.drops, &mut self.controller) {
            Ok(true) => self.status_error = None,
            Ok(false) => {}
            Err(OpenError::Drop(e)) => {
                log::warn!("Ignoring drop: {e}");
                self.set_status_error(e.to_string());
            }
            Err(e) => self.set_status_error(e.to_string()),
        }
    }

    fn reload_shaders(&mut self) {
        let Some(watcher) = &self.shader_watcher else {
            return;
        };
        for path in watcher.drain_changes() {
            let Some(fx) = self.effect_loader.effect_for_path(&path) else {
                continue;
            };
            let source = self.effect_loader.load_effect_source(fx);
            match self.renderer.recompile(&self.gpu.device, fx, source) {
                Ok(true) => {
                    log::info!("Reloaded {}", fx.file_name());
                    self.shader_error = None;
                }
                Ok(false) => {}
                Err(e) => {
                    log::error!("Shader compilation failed: {e}");
                    self.shader_error = Some(e);
                }
            }
        }
    }

    /// Keep the video texture in step with the controller's current load,
    /// then upload the newest frame.
    fn sync_video_texture(&mut self) {
        let epoch = self.controller.loaded_epoch();
        if epoch != self.texture_epoch {
            self.texture_epoch = epoch;
            match self.controller.source_info() {
                Some(info) => {
                    let texture = VideoTexture::new(&self.gpu.device, info.width, info.height);
                    self.renderer.bind_video(&self.gpu.device, &texture);
                    self.video_texture = Some(texture);
                    let _ = self
                        .window
                        .request_inner_size(winit::dpi::PhysicalSize::new(info.width, info.height));
                    if let Some(name) = self.controller.path().and_then(|p| p.file_name()) {
                        self.window
                            .set_title(&format!("{WINDOW_TITLE} - {}", name.to_string_lossy()));
                    }
                }
                None => {
                    self.renderer.clear_video();
                    self.video_texture = None;
                    self.window.set_title(WINDOW_TITLE);
                }
            }
        }

        if let (Some(texture), Some(frame)) =
            (self.video_texture.as_mut(), self.controller.take_frame())
        {
            texture.upload(&self.gpu.queue, frame);
        }
    }

    pub fn update(&mut self) {
        self.poll_file_dialog();
        self.handle_drops();
        self.reload_shaders();

        let outcome = self.controller.tick(Instant::now());
        if outcome.end_of_stream {
            log::info!("Playback finished");
        }

        self.sync_video_texture();

        if self
            .status_error
            .as_ref()
            .is_some_and(|(_, at)| at.elapsed() > STATUS_ERROR_TTL)
        {
            self.status_error = None;
        }

        let (sw, sh) = self.gpu.size();
        self.uniforms.time = self.start_time.elapsed().as_secs_f32();
        self.uniforms.paused = f32::from(u8::from(
            self.controller.state() == PlaybackState::Paused,
        ));
        self.uniforms.resolution = [sw as f32, sh as f32];
        if let Some(texture) = &self.video_texture {
            let (scale, offset) = compute_letterbox((sw, sh), (texture.width, texture.height));
            self.uniforms.video_size = [texture.width as f32, texture.height as f32];
            self.uniforms.scale = scale;
            self.uniforms.offset = offset;
        }
    }

    /// Build the HUD for this frame and apply any transport-bar click.
    pub fn draw_ui(&mut self) {
        let status = self.controller.status();
        let error = self
            .shader_error
            .as_deref()
            .or(self.status_error.as_ref().map(|(msg, _)| msg.as_str()));
        let info = HudInfo {
            status: &status,
            effect: self.current_fx,
            error,
            show_labels: self.hud.show_labels,
        };
        let response = self.hud.run(&self.window, &info);

        if let Some(fraction) = response.seek {
            if let Err(e) = self.controller.seek(fraction) {
                self.set_status_error(format!("Seek failed: {e}"));
            }
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.gpu.surface.get_current_texture()?;
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("mpeg-player-encoder"),
                });

        self.renderer.render(
            &self.gpu.queue,
            &mut encoder,
            &surface_view,
            self.current_fx,
            &self.uniforms,
        );

        self.hud
            .render(&self.gpu.device, &self.gpu.queue, &mut encoder, &surface_view);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
