mod app;
mod audio;
mod config;
mod effect;
mod gpu;
mod input;
mod media;
mod playback;
mod shader;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use app::{App, WINDOW_TITLE};
use config::PlayerConfig;

struct PlayerApp {
    config: PlayerConfig,
    app: Option<App>,
    window: Option<Arc<Window>>,
}

impl PlayerApp {
    fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            app: None,
            window: None,
        }
    }
}

impl ApplicationHandler for PlayerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::PhysicalSize::new(960, 540));

        let window = Arc::new(event_loop.create_window(attrs).expect("Failed to create window"));

        // Center window on primary monitor
        if let Some(monitor) = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
        {
            let monitor_size = monitor.size();
            let window_size = window.outer_size();
            let monitor_pos = monitor.position();
            let x = (monitor_size.width.saturating_sub(window_size.width)) / 2;
            let y = (monitor_size.height.saturating_sub(window_size.height)) / 2;
            window.set_outer_position(winit::dpi::PhysicalPosition::new(
                monitor_pos.x + x as i32,
                monitor_pos.y + y as i32,
            ));
        }

        self.window = Some(window.clone());

        match App::new(window, &self.config) {
            Ok(mut app) => {
                // The command-line file goes through drop validation
                if let Some(file) = self.config.file.take() {
                    app.drops.push(file);
                }
                app.window.request_redraw();
                self.app = Some(app);
                log::info!("Player initialized");
            }
            Err(e) => {
                log::error!("Failed to initialize app: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(app) = self.app.as_mut() else {
            return;
        };

        let hud_consumed = app.hud.on_event(&app.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                app.quit_requested = true;
            }
            WindowEvent::Resized(size) => {
                app.resize(size.width, size.height);
            }
            WindowEvent::DroppedFile(path) => {
                app.drops.push(path);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if !hud_consumed || !app.hud.wants_keyboard() => match key {
                KeyCode::Escape => app.quit_requested = true,
                KeyCode::ArrowRight => app.next_effect(),
                KeyCode::ArrowLeft => app.prev_effect(),
                KeyCode::Space => app.controller.toggle_pause(),
                KeyCode::KeyR => app.controller.reset(),
                KeyCode::KeyO => app.open_file_dialog(),
                KeyCode::KeyH => app.hud.show_labels = !app.hud.show_labels,
                KeyCode::KeyF => {
                    let window = &app.window;
                    if window.fullscreen().is_some() {
                        window.set_fullscreen(None);
                    } else {
                        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                    }
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                app.update();
                app.draw_ui();

                match app.render() {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (w, h) = app.gpu.size();
                        app.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory");
                        event_loop.exit();
                    }
                    Err(e) => {
                        log::warn!("Surface error: {e}");
                    }
                }

                app.window.request_redraw();
            }
            _ => {}
        }

        if app.quit_requested {
            event_loop.exit();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = PlayerConfig::parse();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut app = PlayerApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
