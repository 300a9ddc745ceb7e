//! Optional persistence for ride records.
//!
//! The engine keeps all state in memory; a [`RideStore`] receives a copy of
//! every ride after each transition and is told when a ride is canceled.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::error::{Error, Result};
use crate::ledger::RideRequest;

/// Sink for ride records written by the dispatch engine.
pub trait RideStore: Send + Sync {
    fn save(&self, ride: &RideRequest) -> Result<()>;

    /// Forget a ride. Removing an unknown ride is not an error.
    fn remove(&self, ride_id: &str) -> Result<()>;
}

/// Stores each ride as `<dir>/<ride_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonRideStore {
    dir: PathBuf,
}

impl JsonRideStore {
    /// Open a store rooted at `dir`, creating the directory when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, ride_id: &str) -> Result<Option<RideRequest>> {
        match fs::read(self.path_for(ride_id)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Every stored ride ordered by creation time.
    pub fn load_all(&self) -> Result<Vec<RideRequest>> {
        let mut rides = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            rides.push(serde_json::from_slice::<RideRequest>(&bytes)?);
        }
        rides.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rides)
    }

    fn path_for(&self, ride_id: &str) -> PathBuf {
        self.dir.join(format!("{ride_id}.json"))
    }
}

impl RideStore for JsonRideStore {
    fn save(&self, ride: &RideRequest) -> Result<()> {
        let path = self.path_for(&ride.id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(ride)?)?;
        fs::rename(&tmp, &path)?;
        debug!(ride = %ride.id, path = %path.display(), "ride saved");
        Ok(())
    }

    fn remove(&self, ride_id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(ride_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Platform data directory for persisted rides.
pub fn default_store_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "ridedispatch", "ridedispatch")
        .ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join("rides"))
}
