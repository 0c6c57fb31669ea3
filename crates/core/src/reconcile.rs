use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::hasher::hash_file;
use crate::index::ContentIndex;
use crate::model::{IndexedFile, IndexedLocation};
use crate::paths::PathPolicy;
use crate::progress::{percent, ProgressSink};
use crate::store::{MemoryStore, RecordStore};

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub search_pattern: String,
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            search_pattern: "*".to_string(),
            cancel_flag: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub hashed: usize,
    pub skipped: usize,
    pub removed: usize,
    pub total_steps: usize,
}

pub struct Reconciler<'a, FS, F = MemoryStore<IndexedFile>, L = MemoryStore<IndexedLocation>> {
    index: &'a mut ContentIndex<F, L>,
    fs: &'a FS,
    options: ReconcileOptions,
}

impl<'a, FS, F, L> Reconciler<'a, FS, F, L>
where
    FS: FileSystem,
    F: RecordStore<IndexedFile>,
    L: RecordStore<IndexedLocation>,
{
    pub fn new(index: &'a mut ContentIndex<F, L>, fs: &'a FS) -> Self {
        Self::with_options(index, fs, ReconcileOptions::default())
    }

    pub fn with_options(
        index: &'a mut ContentIndex<F, L>,
        fs: &'a FS,
        options: ReconcileOptions,
    ) -> Self {
        Self { index, fs, options }
    }

    pub fn scan(
        &mut self,
        locations: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<ReconcileSummary> {
        info!("full scan of {} location(s)", locations.len());
        self.index.purge_locations(Some(locations));

        let files = enumerate_all(self.fs, locations, &self.options.search_pattern)?;
        let total = files.len();
        let mut summary = ReconcileSummary {
            total_steps: total,
            ..ReconcileSummary::default()
        };

        for (position, path) in files.iter().enumerate() {
            self.check_cancelled()?;
            if self.index_file(path)? {
                summary.hashed += 1;
            } else {
                summary.skipped += 1;
            }
            progress.report(percent(position + 1, total));
        }

        self.record_locations(locations);
        info!(
            "full scan complete: {} hashed, {} skipped",
            summary.hashed, summary.skipped
        );
        Ok(summary)
    }

    // A path already on record is never hashed again.
    pub fn rescan(
        &mut self,
        locations: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<ReconcileSummary> {
        info!("rescan of {} location(s)", locations.len());

        let fs = self.fs;
        let pattern = self.options.search_pattern.as_str();
        let (stored, on_disk) = thread::scope(|scope| {
            let walker = scope.spawn(move || enumerate_all(fs, locations, pattern));
            let stored = self.index.list_file_paths(Some(locations));
            let on_disk = walker
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (stored, on_disk)
        });
        let on_disk = on_disk?;

        let policy = self.index.policy();
        let additions = difference(&on_disk, &stored, policy);
        let removals = difference(&stored, &on_disk, policy);
        let total = additions.len() + removals.len();
        debug!(
            "rescan diff: {} addition(s), {} removal(s)",
            additions.len(),
            removals.len()
        );

        let mut summary = ReconcileSummary {
            total_steps: total,
            ..ReconcileSummary::default()
        };
        let mut step = 0;

        for path in &additions {
            self.check_cancelled()?;
            if self.index_file(path)? {
                summary.hashed += 1;
            } else {
                summary.skipped += 1;
            }
            step += 1;
            progress.report(percent(step, total));
        }

        for path in &removals {
            self.check_cancelled()?;
            summary.removed += self.index.remove_files_by_path(path);
            debug!("removed records for vanished file {}", path);
            step += 1;
            progress.report(percent(step, total));
        }

        self.record_locations(locations);
        info!(
            "rescan complete: {} hashed, {} skipped, {} removed",
            summary.hashed, summary.skipped, summary.removed
        );
        Ok(summary)
    }

    fn index_file(&mut self, path: &str) -> Result<bool> {
        if !self.fs.exists(path) {
            debug!("skipping {}: no longer exists", path);
            return Ok(false);
        }

        let hashed = match hash_file(self.fs, path) {
            Ok(hashed) => hashed,
            Err(err) if err.is_not_found() => {
                debug!("skipping {}: removed while hashing", path);
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let full_path = self.fs.full_path(path)?;
        let name = self.fs.file_name(path);
        debug!("indexed {} ({})", full_path, hashed.digest.short_hex());
        self.index.insert_file(IndexedFile::new(
            full_path,
            name,
            hashed.digest,
            Some(hashed.length),
        ));
        Ok(true)
    }

    fn record_locations(&mut self, locations: &[String]) {
        for location in locations {
            self.index
                .insert_location(IndexedLocation::new(location.clone()));
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        let cancelled = self
            .options
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed));
        if cancelled {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

fn enumerate_all<FS: FileSystem>(
    fs: &FS,
    locations: &[String],
    pattern: &str,
) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for location in locations {
        files.extend(fs.enumerate_files(location, pattern)?);
    }
    Ok(files)
}

pub(crate) fn difference(left: &[String], right: &[String], policy: PathPolicy) -> Vec<String> {
    let exclude = right
        .iter()
        .map(|path| policy.key(path))
        .collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    left.iter()
        .filter(|path| {
            let key = policy.key(path);
            !exclude.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}
