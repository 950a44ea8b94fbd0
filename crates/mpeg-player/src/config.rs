use std::path::PathBuf;

use clap::Parser;
use clap::builder::RangedU64ValueParser;

use crate::playback::SyncPolicy;

/// Plays an MPEG-1 file (.mpg/.mpeg) through a post-processing shader.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "mpeg-player",
    version,
    about,
    after_help = "Keys: <- -> shader, Space pause, R reset, O open, F fullscreen, H HUD, Esc quit"
)]
pub struct PlayerConfig {
    /// File to play on startup; anything else is dropped onto the window
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Directory holding none.wgsl, glitch.wgsl and scanlines.wgsl
    #[arg(long = "shaders", value_name = "DIR")]
    pub shader_dir: Option<PathBuf>,

    /// Measure frame drift against a fixed 40 ms instead of the frame duration
    #[arg(long)]
    pub fixed_slack: bool,

    /// Do not watch the shader directory for changes
    #[arg(long = "no-hot-reload", action = clap::ArgAction::SetFalse)]
    pub hot_reload: bool,

    /// Audio queue depth in decoded chunks
    #[arg(
        long,
        value_name = "N",
        default_value_t = 3,
        value_parser = RangedU64ValueParser::<usize>::new().range(2..=16)
    )]
    pub audio_queue: usize,
}

impl PlayerConfig {
    pub fn sync_policy(&self) -> SyncPolicy {
        if self.fixed_slack {
            SyncPolicy::fixed_slack()
        } else {
            SyncPolicy::default()
        }
    }
}
