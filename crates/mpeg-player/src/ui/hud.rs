use egui::{Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Vec2};

use crate::effect::PostFx;
use crate::playback::{PlaybackState, PlaybackStatus};

const TRANSPORT_BAR_HEIGHT: f32 = 10.0;

const DARK_BLUE: Color32 = Color32::from_rgb(0, 82, 172);
const RED: Color32 = Color32::from_rgb(230, 41, 55);
const LIGHT_GRAY: Color32 = Color32::from_rgb(200, 200, 200);
const GRAY: Color32 = Color32::from_rgb(130, 130, 130);
const BLUE: Color32 = Color32::from_rgb(0, 121, 241);
const OFF_WHITE: Color32 = Color32::from_rgb(245, 245, 245);

/// Everything the HUD shows for one frame.
pub struct HudInfo<'a> {
    pub status: &'a PlaybackStatus,
    pub effect: PostFx,
    pub error: Option<&'a str>,
    pub show_labels: bool,
}

/// What the user did on the HUD this frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct HudResponse {
    /// Transport bar clicked at this fraction of its width.
    pub seek: Option<f32>,
}

/// Transport-bar fraction for a click at `x` on a bar `width` wide.
pub fn seek_fraction(x: f32, width: f32) -> f32 {
    if width <= 0.0 {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0)
}

pub fn draw_hud(ctx: &egui::Context, info: &HudInfo<'_>) -> HudResponse {
    let mut response = HudResponse::default();

    egui::CentralPanel::default()
        .frame(egui::Frame::NONE)
        .show(ctx, |ui| {
            let screen = ui.max_rect();

            if info.status.state == PlaybackState::Empty {
                draw_idle_prompt(ui, screen);
            } else {
                if info.show_labels {
                    draw_labels(ui, screen, info);
                }
                response.seek = draw_transport_bar(ui, screen, info.status);
                if info.status.state == PlaybackState::Paused {
                    draw_pause_glyph(ui, screen);
                }
            }

            if let Some(err) = info.error {
                ui.painter().text(
                    Pos2::new(screen.min.x + 10.0, screen.max.y - TRANSPORT_BAR_HEIGHT - 8.0),
                    Align2::LEFT_BOTTOM,
                    err,
                    FontId::monospace(12.0),
                    RED,
                );
            }
        });

    response
}

fn draw_idle_prompt(ui: &egui::Ui, screen: Rect) {
    let painter = ui.painter();
    let center = screen.center();
    painter.text(
        center - Vec2::new(0.0, 30.0),
        Align2::CENTER_CENTER,
        "MPEG Video Player",
        FontId::proportional(30.0),
        LIGHT_GRAY,
    );
    painter.text(
        center + Vec2::new(0.0, 30.0),
        Align2::CENTER_CENTER,
        "Drag and drop your MPEG file",
        FontId::proportional(20.0),
        LIGHT_GRAY,
    );
}

fn draw_labels(ui: &egui::Ui, screen: Rect, info: &HudInfo<'_>) {
    let painter = ui.painter();
    let origin = screen.min + Vec2::new(10.0, 10.0);
    let font = FontId::proportional(30.0);

    let prompt = painter.text(
        origin,
        Align2::LEFT_TOP,
        "Change shader with <- ->: Current:",
        font.clone(),
        DARK_BLUE,
    );
    painter.text(
        Pos2::new(prompt.max.x + 10.0, origin.y),
        Align2::LEFT_TOP,
        info.effect.label(),
        font,
        RED,
    );

    let small = FontId::proportional(12.0);
    painter.text(
        origin + Vec2::new(0.0, 40.0),
        Align2::LEFT_TOP,
        format!("CURRENT VIDEO FRAME: {}", info.status.video_frame),
        small.clone(),
        LIGHT_GRAY,
    );
    painter.text(
        origin + Vec2::new(0.0, 60.0),
        Align2::LEFT_TOP,
        format!("CURRENT AUDIO FRAME: {}", info.status.audio_frame),
        small,
        LIGHT_GRAY,
    );
}

/// Returns the seek fraction when the bar was clicked.
fn draw_transport_bar(ui: &mut egui::Ui, screen: Rect, status: &PlaybackStatus) -> Option<f32> {
    let bar = Rect::from_min_max(
        Pos2::new(screen.min.x, screen.max.y - TRANSPORT_BAR_HEIGHT),
        screen.max,
    );
    let response = ui.allocate_rect(bar, Sense::click());

    let painter = ui.painter();
    painter.rect_filled(bar, CornerRadius::ZERO, GRAY);
    let fill = Rect::from_min_size(
        bar.min,
        Vec2::new(bar.width() * status.progress(), bar.height()),
    );
    painter.rect_filled(fill, CornerRadius::ZERO, BLUE);
    if response.hovered() {
        painter.rect_stroke(
            bar,
            CornerRadius::ZERO,
            Stroke::new(1.0, DARK_BLUE),
            StrokeKind::Inside,
        );
    }

    if response.clicked() {
        let pos = response.interact_pointer_pos()?;
        return Some(seek_fraction(pos.x - bar.min.x, bar.width()));
    }
    None
}

fn draw_pause_glyph(ui: &egui::Ui, screen: Rect) {
    let painter = ui.painter();
    let c = screen.center();
    for x in [c.x - 40.0, c.x + 10.0] {
        let bar = Rect::from_min_size(Pos2::new(x, c.y - 40.0), Vec2::new(20.0, 80.0));
        painter.rect_filled(bar, CornerRadius::ZERO, OFF_WHITE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_fraction_is_clamped() {
        assert_eq!(seek_fraction(0.0, 960.0), 0.0);
        assert_eq!(seek_fraction(480.0, 960.0), 0.5);
        assert_eq!(seek_fraction(960.0, 960.0), 1.0);
        assert_eq!(seek_fraction(1200.0, 960.0), 1.0);
        assert_eq!(seek_fraction(-5.0, 960.0), 0.0);
        assert_eq!(seek_fraction(10.0, 0.0), 0.0);
    }

    fn playing_status() -> PlaybackStatus {
        PlaybackStatus {
            state: PlaybackState::Playing,
            file_name: Some("clip.mpg".into()),
            video_frame: 60,
            audio_frame: 96,
            totals: crate::playback::transport::StreamTotals {
                video_frames: 240,
                audio_frames: 383,
            },
        }
    }

    /// Run one HUD frame on a headless 960x540 context.
    fn frame(
        ctx: &egui::Context,
        info: &HudInfo<'_>,
        time: f64,
        events: Vec<egui::Event>,
    ) -> HudResponse {
        let raw = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(960.0, 540.0))),
            time: Some(time),
            events,
            ..Default::default()
        };
        let mut response = HudResponse::default();
        let _ = ctx.run(raw, |ctx| response = draw_hud(ctx, info));
        response
    }

    fn button(pos: Pos2, pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::default(),
        }
    }

    #[test]
    fn clicking_transport_bar_requests_seek() {
        let ctx = egui::Context::default();
        let status = playing_status();
        let info = HudInfo {
            status: &status,
            effect: PostFx::Glitch,
            error: None,
            show_labels: true,
        };
        let at = Pos2::new(240.0, 535.0);

        assert_eq!(frame(&ctx, &info, 0.0, vec![]).seek, None);
        assert_eq!(frame(&ctx, &info, 0.02, vec![egui::Event::PointerMoved(at)]).seek, None);
        assert_eq!(frame(&ctx, &info, 0.04, vec![button(at, true)]).seek, None);
        let released = frame(&ctx, &info, 0.06, vec![button(at, false)]);
        assert_eq!(released.seek, Some(0.25));
    }

    #[test]
    fn clicks_outside_the_bar_or_while_idle_do_not_seek() {
        let ctx = egui::Context::default();
        let status = playing_status();
        let info = HudInfo {
            status: &status,
            effect: PostFx::None,
            error: Some("bad drop"),
            show_labels: false,
        };
        let above = Pos2::new(480.0, 300.0);
        frame(&ctx, &info, 0.0, vec![egui::Event::PointerMoved(above)]);
        frame(&ctx, &info, 0.02, vec![button(above, true)]);
        assert_eq!(frame(&ctx, &info, 0.04, vec![button(above, false)]).seek, None);

        let idle = PlaybackStatus {
            state: PlaybackState::Empty,
            ..playing_status()
        };
        let info = HudInfo {
            status: &idle,
            ..info
        };
        let bar = Pos2::new(480.0, 535.0);
        frame(&ctx, &info, 0.1, vec![egui::Event::PointerMoved(bar)]);
        frame(&ctx, &info, 0.12, vec![button(bar, true)]);
        assert_eq!(frame(&ctx, &info, 0.14, vec![button(bar, false)]).seek, None);
    }
}
