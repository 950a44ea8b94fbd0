use std::path::{Path, PathBuf};

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use notify_debouncer_mini::{DebouncedEventKind, Debouncer, new_debouncer};

pub struct ShaderWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<PathBuf>,
}

impl ShaderWatcher {
    /// Watch `shader_dir` for `.wgsl` changes. `Ok(None)` when the directory
    /// does not exist.
    pub fn new(shader_dir: &Path) -> Result<Option<Self>> {
        if !shader_dir.is_dir() {
            log::info!(
                "Shader directory {} not found; hot reload off",
                shader_dir.display()
            );
            return Ok(None);
        }

        let (tx, rx): (Sender<PathBuf>, Receiver<PathBuf>) = crossbeam_channel::unbounded();

        let mut debouncer = new_debouncer(
            std::time::Duration::from_millis(100),
            move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match res {
                    Ok(events) => {
                        for event in events {
                            if event.kind == DebouncedEventKind::Any
                                && event.path.extension().is_some_and(|ext| ext == "wgsl")
                            {
                                let _ = tx.send(event.path);
                            }
                        }
                    }
                    Err(e) => log::warn!("Shader watcher error: {e}"),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(shader_dir, notify::RecursiveMode::NonRecursive)?;
        log::info!("Watching {} for shader changes", shader_dir.display());

        Ok(Some(Self {
            _debouncer: debouncer,
            receiver: rx,
        }))
    }

    /// Drain all pending change events and return the unique paths.
    pub fn drain_changes(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        while let Ok(path) = self.receiver.try_recv() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_disables_watching() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(ShaderWatcher::new(&missing).unwrap().is_none());
    }

    #[test]
    fn existing_directory_starts_with_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = ShaderWatcher::new(dir.path()).unwrap().unwrap();
        assert!(watcher.drain_changes().is_empty());
    }
}
