use tracing::error;

use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::index::ContentIndex;
use crate::model::{DuplicateGroup, IndexedFile};
use crate::orchestrate::{synchronize, SyncReport};
use crate::progress::ProgressSink;
use crate::reconcile::{ReconcileOptions, ReconcileSummary, Reconciler};

pub struct Engine<FS = OsFileSystem> {
    index: ContentIndex,
    fs: FS,
    options: ReconcileOptions,
}

impl Engine<OsFileSystem> {
    pub fn on_disk(index: ContentIndex) -> Self {
        Self::new(index, OsFileSystem::default())
    }
}

impl<FS: FileSystem> Engine<FS> {
    pub fn new(index: ContentIndex, fs: FS) -> Self {
        Self {
            index,
            fs,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn index(&self) -> &ContentIndex {
        &self.index
    }

    pub fn into_index(self) -> ContentIndex {
        self.index
    }

    pub fn list_indexed_locations(&self) -> Vec<String> {
        self.index.list_locations()
    }

    pub fn scan(
        &mut self,
        locations: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<ReconcileSummary> {
        let locations = self.resolve(locations)?;
        Reconciler::with_options(&mut self.index, &self.fs, self.options.clone())
            .scan(&locations, progress)
    }

    pub fn rescan(
        &mut self,
        locations: &[String],
        progress: &dyn ProgressSink,
    ) -> Result<ReconcileSummary> {
        let locations = self.resolve(locations)?;
        Reconciler::with_options(&mut self.index, &self.fs, self.options.clone())
            .rescan(&locations, progress)
    }

    pub fn purge(&mut self, locations: Option<&[String]>) -> Result<()> {
        match locations {
            None => self.index.purge_locations(None),
            Some(locations) => {
                let locations = self.resolve(locations)?;
                self.index.purge_locations(Some(&locations));
            }
        }
        Ok(())
    }

    pub fn list_duplicates(&self) -> Vec<IndexedFile> {
        self.index.list_duplicates()
    }

    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        self.index.duplicate_groups()
    }

    pub fn synchronize(&mut self, target: &[String], progress: &dyn ProgressSink) -> SyncReport {
        let target = match self.resolve(target) {
            Ok(target) => target,
            Err(err) => {
                error!("could not resolve scan locations: {}", err);
                return SyncReport {
                    error: Some(err.to_string()),
                    ..SyncReport::default()
                };
            }
        };
        synchronize(&mut self.index, &self.fs, &target, progress, &self.options)
    }

    fn resolve(&self, locations: &[String]) -> Result<Vec<String>> {
        let policy = self.index.policy();
        locations
            .iter()
            .map(|location| {
                let full = self.fs.full_path(location)?;
                Ok(policy.canonical_location(&full).to_string())
            })
            .collect()
    }
}
