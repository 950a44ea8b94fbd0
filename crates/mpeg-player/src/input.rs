use std::path::{Path, PathBuf};

use crate::audio::AudioBackend;
use crate::media::{MediaBackend, MediaError};
use crate::playback::PlaybackController;

/// Extensions accepted by drag-and-drop and the open dialog.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mpg", "mpeg"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DropError {
    #[error("drop one file at a time ({0} dropped)")]
    MultipleFiles(usize),
    #[error("unsupported file {}: only .mpg and .mpeg can be played", .0.display())]
    UnsupportedExtension(PathBuf),
}

/// Why a drop did not end up playing.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error(transparent)]
    Drop(#[from] DropError),
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Case-insensitive `.mpg` / `.mpeg` check.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// Files dropped onto the window since the last refresh. winit reports a
/// multi-file drop as one event per file, so the batch is collected here and
/// judged once per frame.
#[derive(Debug, Default)]
pub struct DropQueue {
    pending: Vec<PathBuf>,
}

impl DropQueue {
    pub fn push(&mut self, path: PathBuf) {
        self.pending.push(path);
    }

    /// Take this frame's batch. `Ok(None)` when nothing was dropped; the
    /// queue is always empty afterwards.
    pub fn take(&mut self) -> Result<Option<PathBuf>, DropError> {
        let mut batch = std::mem::take(&mut self.pending);
        match batch.len() {
            0 => Ok(None),
            1 => {
                let path = batch.remove(0);
                if is_supported(&path) {
                    Ok(Some(path))
                } else {
                    Err(DropError::UnsupportedExtension(path))
                }
            }
            n => Err(DropError::MultipleFiles(n)),
        }
    }
}

/// Load this frame's drop, if it passes validation. Rejected drops leave
/// the controller as it was. Returns whether a new source was loaded.
pub fn apply_drops<M, A>(
    drops: &mut DropQueue,
    controller: &mut PlaybackController<M, A>,
) -> Result<bool, OpenError>
where
    M: MediaBackend,
    A: AudioBackend,
{
    let Some(path) = drops.take()? else {
        return Ok(false);
    };
    controller.load(&path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_ignores_case() {
        assert!(is_supported(Path::new("a/clip.mpg")));
        assert!(is_supported(Path::new("clip.MPEG")));
        assert!(is_supported(Path::new("clip.Mpg")));
        assert!(!is_supported(Path::new("clip.mp4")));
        assert!(!is_supported(Path::new("clip")));
        assert!(!is_supported(Path::new("mpg")));
    }

    #[test]
    fn single_supported_drop_is_accepted() {
        let mut q = DropQueue::default();
        q.push(PathBuf::from("movie.mpeg"));
        assert_eq!(q.take(), Ok(Some(PathBuf::from("movie.mpeg"))));
        assert_eq!(q.take(), Ok(None));
    }

    #[test]
    fn multi_file_drop_is_rejected_and_cleared() {
        let mut q = DropQueue::default();
        q.push(PathBuf::from("a.mpg"));
        q.push(PathBuf::from("b.mpg"));
        assert_eq!(q.take(), Err(DropError::MultipleFiles(2)));
        assert_eq!(q.take(), Ok(None));
    }

    #[test]
    fn unsupported_drop_is_rejected() {
        let mut q = DropQueue::default();
        q.push(PathBuf::from("movie.avi"));
        assert_eq!(
            q.take(),
            Err(DropError::UnsupportedExtension(PathBuf::from("movie.avi")))
        );
    }

    #[test]
    fn nothing_dropped() {
        let mut q = DropQueue::default();
        assert_eq!(q.take(), Ok(None));
    }
}
