//! Directory watch: forward created entries of one directory (non-recursive).

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Start watching `dir`. Each created path is sent on the returned channel.
/// Keep the watcher alive for as long as events are wanted.
pub fn watch_dir(
    dir: &Path,
) -> notify::Result<(RecommendedWatcher, mpsc::UnboundedReceiver<PathBuf>)> {
    std::fs::create_dir_all(dir).map_err(notify::Error::io)?;
    let (tx, rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for path in created_paths(event) {
                let _ = tx.send(path);
            }
        }
        Err(e) => tracing::warn!(error = %e, "watch error"),
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    tracing::info!(dir = %dir.display(), "watching for new images");
    Ok((watcher, rx))
}

/// Paths of a create event; every other kind yields nothing.
fn created_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) => event.paths,
        _ => Vec::new(),
    }
}
