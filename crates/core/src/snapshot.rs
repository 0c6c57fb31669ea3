use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::index::ContentIndex;
use crate::model::{IndexedFile, IndexedLocation};
use crate::paths::PathPolicy;
use crate::store::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub files: Vec<IndexedFile>,
    #[serde(default)]
    pub locations: Vec<IndexedLocation>,
}

impl Snapshot {
    pub fn capture<F, L>(index: &ContentIndex<F, L>) -> Self
    where
        F: RecordStore<IndexedFile>,
        L: RecordStore<IndexedLocation>,
    {
        Self {
            files: index.files().to_vec(),
            locations: index.locations().to_vec(),
        }
    }

    pub fn into_index(self, policy: PathPolicy) -> ContentIndex {
        ContentIndex::from_records(self.files, self.locations, policy)
    }
}

pub fn load(path: impl AsRef<Path>, policy: PathPolicy) -> Result<ContentIndex> {
    let path = path.as_ref();
    let shown = path.to_string_lossy().to_string();
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no snapshot at {}, starting empty", shown);
            return Ok(Snapshot::default().into_index(policy));
        }
        Err(err) => return Err(Error::io(shown, err)),
    };

    let snapshot: Snapshot = serde_json::from_str(&data).map_err(|source| Error::Snapshot {
        path: shown.clone(),
        source,
    })?;
    debug!(
        "loaded {} file(s) and {} location(s) from {}",
        snapshot.files.len(),
        snapshot.locations.len(),
        shown
    );
    Ok(snapshot.into_index(policy))
}

pub fn save<F, L>(index: &ContentIndex<F, L>, path: impl AsRef<Path>) -> Result<()>
where
    F: RecordStore<IndexedFile>,
    L: RecordStore<IndexedLocation>,
{
    let path = path.as_ref();
    let shown = path.to_string_lossy().to_string();
    let payload = serde_json::to_string_pretty(&Snapshot::capture(index)).map_err(|source| {
        Error::Snapshot {
            path: shown.clone(),
            source,
        }
    })?;
    fs::write(path, payload).map_err(|err| Error::io(shown, err))
}
