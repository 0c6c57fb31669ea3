use std::collections::HashMap;

use tracing::debug;

use crate::digest::Digest;
use crate::model::{DuplicateGroup, IndexedFile, IndexedLocation};
use crate::paths::PathPolicy;
use crate::store::{MemoryStore, RecordStore};

#[derive(Debug, Clone)]
pub struct ContentIndex<F = MemoryStore<IndexedFile>, L = MemoryStore<IndexedLocation>> {
    files: F,
    locations: L,
    policy: PathPolicy,
}

impl ContentIndex {
    pub fn new() -> Self {
        Self::with_stores(MemoryStore::new(), MemoryStore::new(), PathPolicy::default())
    }

    pub fn from_records(
        files: Vec<IndexedFile>,
        locations: Vec<IndexedLocation>,
        policy: PathPolicy,
    ) -> Self {
        Self::with_stores(MemoryStore::from(files), MemoryStore::from(locations), policy)
    }
}

impl Default for ContentIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl<F, L> ContentIndex<F, L>
where
    F: RecordStore<IndexedFile>,
    L: RecordStore<IndexedLocation>,
{
    pub fn with_stores(files: F, locations: L, policy: PathPolicy) -> Self {
        Self {
            files,
            locations,
            policy,
        }
    }

    pub fn policy(&self) -> PathPolicy {
        self.policy
    }

    pub fn files(&self) -> &[IndexedFile] {
        self.files.list()
    }

    pub fn locations(&self) -> &[IndexedLocation] {
        self.locations.list()
    }

    pub fn insert_file(&mut self, file: IndexedFile) -> bool {
        if self.files.list().contains(&file) {
            return false;
        }
        self.files.insert(file);
        true
    }

    pub fn insert_location(&mut self, location: IndexedLocation) -> bool {
        let policy = self.policy;
        if self
            .locations
            .list()
            .iter()
            .any(|existing| policy.same_path(&existing.path, &location.path))
        {
            return false;
        }
        self.locations.insert(location);
        true
    }

    pub fn list_locations(&self) -> Vec<String> {
        self.locations
            .list()
            .iter()
            .map(|location| location.path.clone())
            .collect()
    }

    pub fn list_file_paths(&self, locations: Option<&[String]>) -> Vec<String> {
        let files = self.files.list().iter();
        match locations {
            None => files.map(|file| file.path.clone()).collect(),
            Some(locations) => files
                .filter(|file| self.policy.is_under_any(&file.path, locations))
                .map(|file| file.path.clone())
                .collect(),
        }
    }

    // None empties the index, an empty slice does nothing.
    pub fn purge_locations(&mut self, locations: Option<&[String]>) {
        let policy = self.policy;
        let (files, dropped_locations) = match locations {
            None => (
                self.files.purge_where(&mut |_| true),
                self.locations.purge_where(&mut |_| true),
            ),
            Some([]) => return,
            Some(locations) => (
                self.files
                    .purge_where(&mut |file| policy.is_under_any(&file.path, locations)),
                self.locations.purge_where(&mut |location| {
                    locations
                        .iter()
                        .any(|path| policy.same_path(&location.path, path))
                }),
            ),
        };
        debug!(
            "purged {} file record(s) and {} location record(s)",
            files, dropped_locations
        );
    }

    pub fn remove_files_by_path(&mut self, path: &str) -> usize {
        let policy = self.policy;
        self.files
            .purge_where(&mut |file| policy.same_path(&file.path, path))
    }

    pub fn list_duplicates(&self) -> Vec<IndexedFile> {
        self.duplicate_groups()
            .into_iter()
            .flat_map(|group| group.files)
            .collect()
    }

    pub fn duplicate_groups(&self) -> Vec<DuplicateGroup> {
        let mut slots: HashMap<Option<&Digest>, usize> = HashMap::new();
        let mut groups: Vec<DuplicateGroup> = Vec::new();

        for file in self.files.list() {
            let slot = *slots.entry(file.digest.as_ref()).or_insert_with(|| {
                groups.push(DuplicateGroup {
                    digest: file.digest.clone(),
                    files: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].files.push(file.clone());
        }

        groups.retain(|group| group.files.len() > 1);
        groups
    }
}
