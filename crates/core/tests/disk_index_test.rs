use std::fs;
use std::sync::Mutex;

use anyhow::Result;
use dupe_index_core::{snapshot, ContentIndex, Engine, PathPolicy};
use tempfile::TempDir;

fn root_of(temp: &TempDir) -> Vec<String> {
    vec![temp.path().to_string_lossy().to_string()]
}

#[test]
fn scan_and_rescan_a_real_directory() -> Result<()> {
    let temp = TempDir::new()?;
    fs::create_dir(temp.path().join("nested"))?;
    fs::write(temp.path().join("one.txt"), b"duplicate-content")?;
    fs::write(temp.path().join("nested").join("two.txt"), b"duplicate-content")?;

    let mut engine = Engine::on_disk(ContentIndex::new());
    let seen = Mutex::new(Vec::new());
    let summary = engine.scan(&root_of(&temp), &|value: u32| {
        seen.lock().expect("lock").push(value)
    })?;

    assert_eq!(summary.hashed, 2);
    assert_eq!(seen.lock().expect("lock").last(), Some(&100));
    assert_eq!(engine.index().files().len(), 2);
    assert!(engine
        .index()
        .files()
        .iter()
        .all(|file| file.path.starts_with(&root_of(&temp)[0])));
    assert_eq!(engine.list_duplicates().len(), 2);

    fs::remove_file(temp.path().join("one.txt"))?;
    fs::write(temp.path().join("three.txt"), b"fresh")?;

    let seen = Mutex::new(Vec::new());
    let summary = engine.rescan(&root_of(&temp), &|value: u32| {
        seen.lock().expect("lock").push(value)
    })?;

    assert_eq!(summary.total_steps, 2);
    assert_eq!(summary.hashed, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(*seen.lock().expect("lock"), vec![50, 100]);
    assert!(engine.list_duplicates().is_empty());
    Ok(())
}

#[test]
fn snapshot_survives_a_restart() -> Result<()> {
    let temp = TempDir::new()?;
    let data = temp.path().join("data");
    fs::create_dir(&data)?;
    fs::write(data.join("a.bin"), b"same")?;
    fs::write(data.join("b.bin"), b"same")?;
    let state = temp.path().join("state.json");
    let target = vec![data.to_string_lossy().to_string()];

    let mut engine = Engine::on_disk(snapshot::load(&state, PathPolicy::default())?);
    let report = engine.synchronize(&target, &|_: u32| {});
    assert!(report.succeeded());
    snapshot::save(engine.index(), &state)?;

    let mut engine = Engine::on_disk(snapshot::load(&state, PathPolicy::default())?);
    assert_eq!(engine.list_indexed_locations(), target);
    let report = engine.synchronize(&target, &|_: u32| {});
    assert!(report.succeeded());
    assert_eq!(report.plan.rescan_locations, target);
    assert_eq!(report.rescan.map(|summary| summary.total_steps), Some(0));
    assert_eq!(engine.list_duplicates().len(), 2);
    Ok(())
}
