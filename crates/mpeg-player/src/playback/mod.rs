//! Transport control: keeps decoded video, decoded audio, user commands and
//! the wall clock consistent. Single-threaded; every call runs to completion
//! inside the frame loop.

pub mod controller;
pub mod transport;


pub use controller::PlaybackController;
pub use transport::{FrameBuffer, PlaybackState, PlaybackStatus, SyncPolicy};
