// ── File-backed accessory registry ──
//
// Stands in for the automation host: accessories live in a `DashMap` and
// every change is written back to a JSON file, so a restart restores the
// previous set the way a host would.

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use unifi_leds_core::{AccessoryRegistry, CoreError, RegisteredAccessory};

use crate::error::CliError;

/// One persisted accessory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccessory {
    #[serde(flatten)]
    pub accessory: RegisteredAccessory,
    #[serde(default)]
    pub not_responding: bool,
}

pub struct FileRegistry {
    path: PathBuf,
    accessories: DashMap<Uuid, StoredAccessory>,
}

impl FileRegistry {
    /// Open the registry at `path`. A missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let accessories = DashMap::new();

        match std::fs::read(&path) {
            Ok(bytes) => {
                let stored: Vec<StoredAccessory> =
                    serde_json::from_slice(&bytes).map_err(|e| registry_error(&path, e))?;
                for entry in stored {
                    accessories.insert(entry.accessory.uuid, entry);
                }
                info!(path = %path.display(), count = accessories.len(), "accessories restored");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no accessory file yet");
            }
            Err(e) => return Err(registry_error(&path, e)),
        }

        Ok(Self { path, accessories })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot sorted by display name.
    pub fn entries(&self) -> Vec<StoredAccessory> {
        let mut entries: Vec<_> = self.accessories.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.accessory.display_name.cmp(&b.accessory.display_name));
        entries
    }

    /// Write the registry atomically (temp file + rename).
    fn persist(&self) -> Result<(), CoreError> {
        let persist_err = |e: &dyn std::fmt::Display| CoreError::Registry {
            message: format!("{}: {e}", self.path.display()),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| persist_err(&e))?;
        }
        let json = serde_json::to_vec_pretty(&self.entries()).map_err(|e| persist_err(&e))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| persist_err(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| persist_err(&e))?;
        Ok(())
    }
}

fn registry_error(path: &Path, err: impl std::error::Error + Send + Sync + 'static) -> CliError {
    CliError::Registry {
        path: path.display().to_string(),
        source: Box::new(err),
    }
}

impl AccessoryRegistry for FileRegistry {
    fn registered(&self) -> Vec<RegisteredAccessory> {
        self.accessories
            .iter()
            .map(|e| e.value().accessory.clone())
            .collect()
    }

    fn register(&self, accessory: RegisteredAccessory) -> Result<(), CoreError> {
        self.accessories.insert(
            accessory.uuid,
            StoredAccessory {
                accessory,
                not_responding: false,
            },
        );
        self.persist()
    }

    fn restore(&self, accessory: RegisteredAccessory) -> Result<(), CoreError> {
        self.register(accessory)
    }

    fn unregister(&self, uuid: Uuid) -> Result<(), CoreError> {
        if self.accessories.remove(&uuid).is_none() {
            return Ok(());
        }
        self.persist()
    }

    fn mark_not_responding(&self, uuid: Uuid) {
        let Some(mut entry) = self.accessories.get_mut(&uuid) else {
            return;
        };
        entry.not_responding = true;
        drop(entry);
        if let Err(e) = self.persist() {
            warn!(error = %e, "failed to persist not-responding state");
        }
    }
}
