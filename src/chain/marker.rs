//! Persistence of the "was connected" marker used for silent reconnects.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remembers whether a wallet was connected in a previous run.
pub trait MarkerStore: Send + Sync {
    /// Whether the marker is set.
    fn was_connected(&self) -> bool;

    /// Set the marker.
    fn remember(&self) -> io::Result<()>;

    /// Clear the marker.
    fn forget(&self) -> io::Result<()>;
}

/// Marker kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    connected: AtomicBool,
}

impl MemoryMarkerStore {
    /// Create a store with the marker already set or cleared.
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn was_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn remember(&self) -> io::Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn forget(&self) -> io::Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkerFile {
    wallet_connected: bool,
    updated_at: DateTime<Utc>,
}

/// Marker stored as a small JSON file.
///
/// A missing or unreadable file counts as "not connected".
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the marker file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MarkerStore for FileMarkerStore {
    fn was_connected(&self) -> bool {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return false;
        };
        match serde_json::from_str::<MarkerFile>(&content) {
            Ok(marker) => marker.wallet_connected,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt wallet marker");
                false
            }
        }
    }

    fn remember(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let marker = MarkerFile {
            wallet_connected: true,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&marker).map_err(io::Error::other)?;
        fs::write(&self.path, json)
    }

    fn forget(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
