pub mod hud;
pub mod overlay;

pub use hud::HudInfo;
pub use overlay::HudOverlay;
