use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::Result;
use crate::fs::FileSystem;
use crate::index::ContentIndex;
use crate::model::{IndexedFile, IndexedLocation};
use crate::paths::PathPolicy;
use crate::progress::{ProgressScale, ProgressSink, ScaledProgress};
use crate::reconcile::{difference, ReconcileOptions, ReconcileSummary, Reconciler};
use crate::store::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub new_locations: Vec<String>,
    pub rescan_locations: Vec<String>,
    pub purge_locations: Vec<String>,
}

impl SyncPlan {
    pub fn new(target: &[String], previous: &[String], policy: PathPolicy) -> Self {
        let wanted = target
            .iter()
            .map(|path| policy.key(path))
            .collect::<HashSet<_>>();
        let mut seen = HashSet::new();
        let rescan_locations = previous
            .iter()
            .filter(|path| {
                let key = policy.key(path);
                wanted.contains(&key) && seen.insert(key)
            })
            .cloned()
            .collect();

        Self {
            new_locations: difference(target, previous, policy),
            rescan_locations,
            purge_locations: difference(previous, target, policy),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub plan: SyncPlan,
    pub scan: Option<ReconcileSummary>,
    pub rescan: Option<ReconcileSummary>,
    pub error: Option<String>,
}

impl SyncReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub fn synchronize<FS, F, L>(
    index: &mut ContentIndex<F, L>,
    fs: &FS,
    target: &[String],
    progress: &dyn ProgressSink,
    options: &ReconcileOptions,
) -> SyncReport
where
    FS: FileSystem,
    F: RecordStore<IndexedFile>,
    L: RecordStore<IndexedLocation>,
{
    let plan = SyncPlan::new(target, &index.list_locations(), index.policy());
    info!(
        "sync plan: {} new, {} rescan, {} purge",
        plan.new_locations.len(),
        plan.rescan_locations.len(),
        plan.purge_locations.len()
    );

    let mut report = SyncReport {
        plan,
        ..SyncReport::default()
    };
    if let Err(err) = run_plan(index, fs, progress, options, &mut report) {
        error!("an error occurred during the scanning process: {}", err);
        report.error = Some(err.to_string());
    }
    report
}

fn run_plan<FS, F, L>(
    index: &mut ContentIndex<F, L>,
    fs: &FS,
    progress: &dyn ProgressSink,
    options: &ReconcileOptions,
    report: &mut SyncReport,
) -> Result<()>
where
    FS: FileSystem,
    F: RecordStore<IndexedFile>,
    L: RecordStore<IndexedLocation>,
{
    index.purge_locations(Some(report.plan.purge_locations.as_slice()));

    let first_half = ScaledProgress::new(progress, ProgressScale::slice(0, 2)?);
    let scanned = Reconciler::with_options(index, fs, options.clone())
        .scan(&report.plan.new_locations, &first_half)?;
    report.scan = Some(scanned);

    let second_half = ScaledProgress::new(progress, ProgressScale::slice(1, 2)?);
    let rescanned = Reconciler::with_options(index, fs, options.clone())
        .rescan(&report.plan.rescan_locations, &second_half)?;
    report.rescan = Some(rescanned);

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};
    use std::sync::Mutex;

    use super::{synchronize, SyncPlan};
    use crate::error::{Error, Result};
    use crate::fs::{FileSystem, MemoryFileSystem};
    use crate::index::ContentIndex;
    use crate::model::IndexedLocation;
    use crate::paths::PathPolicy;
    use crate::reconcile::ReconcileOptions;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn plan_partitions_target_against_previous() {
        let plan = SyncPlan::new(
            &strings(&["/b", "/c", "/d"]),
            &strings(&["/a", "/b", "/c"]),
            PathPolicy::unix(),
        );
        assert_eq!(plan.new_locations, strings(&["/d"]));
        assert_eq!(plan.rescan_locations, strings(&["/b", "/c"]));
        assert_eq!(plan.purge_locations, strings(&["/a"]));
    }

    #[test]
    fn plan_follows_case_policy() {
        let plan = SyncPlan::new(
            &strings(&[r"C:\DATA"]),
            &strings(&[r"c:\data"]),
            PathPolicy::windows(),
        );
        assert!(plan.new_locations.is_empty());
        assert_eq!(plan.rescan_locations, strings(&[r"c:\data"]));
        assert!(plan.purge_locations.is_empty());
    }

    #[test]
    fn plan_ignores_trailing_separators() {
        let plan = SyncPlan::new(
            &strings(&["/data"]),
            &strings(&["/data/"]),
            PathPolicy::unix(),
        );
        assert!(plan.new_locations.is_empty());
        assert_eq!(plan.rescan_locations, strings(&["/data/"]));
        assert!(plan.purge_locations.is_empty());
    }

    fn fixture() -> MemoryFileSystem {
        let fs = MemoryFileSystem::new(PathPolicy::unix());
        fs.add_file("/old/a.txt", b"same".to_vec());
        fs.add_file("/kept/b.txt", b"same".to_vec());
        fs.add_file("/new/c.txt", b"same".to_vec());
        fs.add_file("/new/d.txt", b"unique".to_vec());
        fs
    }

    #[test]
    fn synchronize_runs_every_phase_on_half_scales() {
        let fs = fixture();
        let mut index = ContentIndex::from_records(Vec::new(), Vec::new(), PathPolicy::unix());
        let seed = synchronize(
            &mut index,
            &fs,
            &strings(&["/old", "/kept"]),
            &|_: u32| {},
            &ReconcileOptions::default(),
        );
        assert!(seed.succeeded());
        assert_eq!(index.list_locations(), strings(&["/old", "/kept"]));

        fs.add_file("/kept/e.txt", b"more".to_vec());
        let seen = Mutex::new(Vec::new());
        let report = synchronize(
            &mut index,
            &fs,
            &strings(&["/kept", "/new"]),
            &|value: u32| seen.lock().expect("lock").push(value),
            &ReconcileOptions::default(),
        );

        assert!(report.succeeded());
        assert_eq!(report.plan.purge_locations, strings(&["/old"]));
        assert_eq!(report.scan.as_ref().map(|s| s.hashed), Some(2));
        assert_eq!(report.rescan.as_ref().map(|s| s.hashed), Some(1));
        assert_eq!(*seen.lock().expect("lock"), vec![25, 50, 100]);

        assert_eq!(index.list_locations(), strings(&["/kept", "/new"]));
        assert_eq!(
            index.list_file_paths(None),
            strings(&["/kept/b.txt", "/new/c.txt", "/new/d.txt", "/kept/e.txt"])
        );
        assert_eq!(
            index
                .list_duplicates()
                .iter()
                .map(|file| file.path.as_str())
                .collect::<Vec<_>>(),
            vec!["/kept/b.txt", "/new/c.txt"]
        );
    }

    #[test]
    fn failures_are_reported_not_raised() {
        let fs = fixture();
        let mut index = ContentIndex::from_records(
            Vec::new(),
            vec![IndexedLocation::new("/kept")],
            PathPolicy::unix(),
        );

        let report = synchronize(
            &mut index,
            &fs,
            &strings(&["/missing", "/kept"]),
            &|_: u32| {},
            &ReconcileOptions::default(),
        );

        assert!(!report.succeeded());
        assert!(report.scan.is_none());
        assert!(report.rescan.is_none());
        assert!(report
            .error
            .as_deref()
            .is_some_and(|message| message.contains("/missing")));
    }

    struct FailingReads(MemoryFileSystem);

    impl FileSystem for FailingReads {
        fn enumerate_files(&self, root: &str, pattern: &str) -> Result<Vec<String>> {
            self.0.enumerate_files(root, pattern)
        }

        fn exists(&self, path: &str) -> bool {
            self.0.exists(path)
        }

        fn full_path(&self, path: &str) -> Result<String> {
            self.0.full_path(path)
        }

        fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send + '_>> {
            if path == "/kept/e.txt" {
                return Err(Error::io(path, io::Error::other("device error")));
            }
            self.0.open_read(path)
        }
    }

    #[test]
    fn read_failure_during_rescan_lands_in_report() {
        let mut index = ContentIndex::from_records(Vec::new(), Vec::new(), PathPolicy::unix());
        let seed = synchronize(
            &mut index,
            &fixture(),
            &strings(&["/kept"]),
            &|_: u32| {},
            &ReconcileOptions::default(),
        );
        assert!(seed.succeeded());

        let fs = FailingReads(fixture());
        fs.0.add_file("/kept/e.txt", b"more".to_vec());
        let report = synchronize(
            &mut index,
            &fs,
            &strings(&["/kept", "/new"]),
            &|_: u32| {},
            &ReconcileOptions::default(),
        );

        assert!(!report.succeeded());
        assert_eq!(report.scan.as_ref().map(|s| s.hashed), Some(2));
        assert!(report.rescan.is_none());
        assert!(report
            .error
            .as_deref()
            .is_some_and(|message| message.contains("/kept/e.txt")));
    }
}
