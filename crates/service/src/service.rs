use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use dupe_index_core::{
    snapshot, DuplicateGroup, Engine, PathPolicy, ReconcileOptions, SyncReport,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_search_pattern")]
    pub search_pattern: String,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("dupe-index.json")
}

fn default_search_pattern() -> String {
    "*".to_string()
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            session_id: None,
            paths: Vec::new(),
            state_path: default_state_path(),
            search_pattern: default_search_pattern(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    pub seq: u64,
    pub session_id: String,
    pub percent: u32,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub state_path: PathBuf,
    pub report: Option<SyncReport>,
    pub error: Option<String>,
    pub total_events: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub session_id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone)]
struct Session {
    status: SessionStatus,
    state_path: PathBuf,
    report: Option<SyncReport>,
    error: Option<String>,
    events: Vec<ProgressEvent>,
    cancel_flag: Arc<AtomicBool>,
}

static SESSIONS: Lazy<Mutex<HashMap<String, Session>>> = Lazy::new(|| Mutex::new(HashMap::new()));

pub fn start_sync(request: SyncRequest) -> Result<String> {
    let session_id = request
        .session_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let cancel_flag = Arc::new(AtomicBool::new(false));

    {
        let mut sessions = lock_sessions()?;
        if sessions.values().any(|session| {
            session.status == SessionStatus::Running && session.state_path == request.state_path
        }) {
            bail!(
                "another session is already writing {}",
                request.state_path.display()
            );
        }
        sessions.insert(
            session_id.clone(),
            Session {
                status: SessionStatus::Running,
                state_path: request.state_path.clone(),
                report: None,
                error: None,
                events: Vec::new(),
                cancel_flag: Arc::clone(&cancel_flag),
            },
        );
    }

    let thread_session_id = session_id.clone();
    thread::spawn(move || {
        let result = run_sync(&thread_session_id, &request, Arc::clone(&cancel_flag));

        if let Ok(mut sessions) = lock_sessions() {
            if let Some(session) = sessions.get_mut(&thread_session_id) {
                match result {
                    Ok(report) => {
                        session.status = if report.succeeded() {
                            SessionStatus::Completed
                        } else if cancel_flag.load(Ordering::Relaxed) {
                            SessionStatus::Cancelled
                        } else {
                            SessionStatus::Failed
                        };
                        session.error = report.error.clone();
                        session.report = Some(report);
                    }
                    Err(err) => {
                        session.status = SessionStatus::Failed;
                        session.error = Some(format!("{err:#}"));
                    }
                }
            }
        }
    });

    Ok(session_id)
}

fn run_sync(
    session_id: &str,
    request: &SyncRequest,
    cancel_flag: Arc<AtomicBool>,
) -> Result<SyncReport> {
    let index = snapshot::load(&request.state_path, PathPolicy::default())
        .with_context(|| format!("failed to load index {}", request.state_path.display()))?;
    let options = ReconcileOptions {
        search_pattern: request.search_pattern.clone(),
        cancel_flag: Some(cancel_flag),
    };
    let mut engine = Engine::on_disk(index).with_options(options);

    let report = engine.synchronize(&request.paths, &|percent: u32| {
        record_event(session_id, percent)
    });
    if !report.succeeded() {
        warn!("session {} ended early: {:?}", session_id, report.error);
    }

    snapshot::save(engine.index(), &request.state_path)
        .with_context(|| format!("failed to write index {}", request.state_path.display()))?;
    info!(
        "session {} saved index to {}",
        session_id,
        request.state_path.display()
    );
    Ok(report)
}

fn record_event(session_id: &str, percent: u32) {
    if let Ok(mut sessions) = lock_sessions() {
        if let Some(session) = sessions.get_mut(session_id) {
            let seq = session.events.len() as u64 + 1;
            session.events.push(ProgressEvent {
                seq,
                session_id: session_id.to_string(),
                percent,
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            });
        }
    }
}

pub fn poll_events(session_id: &str, from_seq: u64) -> Result<Vec<ProgressEvent>> {
    let sessions = lock_sessions()?;
    let session = sessions
        .get(session_id)
        .ok_or_else(|| anyhow!("session not found: {session_id}"))?;

    Ok(session
        .events
        .iter()
        .filter(|event| event.seq > from_seq)
        .cloned()
        .collect())
}

pub fn cancel_sync(session_id: &str) -> Result<CancelResponse> {
    let mut sessions = lock_sessions()?;
    let session = sessions
        .get_mut(session_id)
        .ok_or_else(|| anyhow!("session not found: {session_id}"))?;

    session.cancel_flag.store(true, Ordering::Relaxed);

    Ok(CancelResponse {
        session_id: session_id.to_string(),
        status: session.status.clone(),
    })
}

pub fn get_session(session_id: &str) -> Result<SessionSnapshot> {
    let sessions = lock_sessions()?;
    let session = sessions
        .get(session_id)
        .ok_or_else(|| anyhow!("session not found: {session_id}"))?;

    Ok(SessionSnapshot {
        session_id: session_id.to_string(),
        status: session.status.clone(),
        state_path: session.state_path.clone(),
        report: session.report.clone(),
        error: session.error.clone(),
        total_events: session.events.len() as u64,
    })
}

pub fn list_locations(state_path: impl AsRef<Path>) -> Result<Vec<String>> {
    let state_path = state_path.as_ref();
    let index = snapshot::load(state_path, PathPolicy::default())
        .with_context(|| format!("failed to load index {}", state_path.display()))?;
    Ok(index.list_locations())
}

pub fn load_duplicates(state_path: impl AsRef<Path>) -> Result<Vec<DuplicateGroup>> {
    let state_path = state_path.as_ref();
    let index = snapshot::load(state_path, PathPolicy::default())
        .with_context(|| format!("failed to load index {}", state_path.display()))?;
    Ok(index.duplicate_groups())
}

fn lock_sessions() -> Result<std::sync::MutexGuard<'static, HashMap<String, Session>>> {
    SESSIONS
        .lock()
        .map_err(|_| anyhow!("session registry lock poisoned"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use super::{
        cancel_sync, get_session, list_locations, load_duplicates, poll_events, start_sync,
        SessionSnapshot, SessionStatus, SyncRequest,
    };

    fn wait_for(session_id: &str) -> SessionSnapshot {
        let started = Instant::now();
        loop {
            let snapshot = get_session(session_id).expect("session exists");
            if snapshot.status != SessionStatus::Running {
                break snapshot;
            }
            assert!(started.elapsed() < Duration::from_secs(30));
            std::thread::sleep(Duration::from_millis(25));
        }
    }

    #[test]
    fn sync_session_indexes_and_persists() {
        let temp = TempDir::new().expect("tempdir");
        let data = temp.path().join("data");
        fs::create_dir(&data).expect("mkdir");
        fs::write(data.join("a.txt"), b"twin").expect("write a");
        fs::write(data.join("b.txt"), b"twin").expect("write b");
        let state_path = temp.path().join("state.json");

        let session_id = start_sync(SyncRequest {
            paths: vec![data.to_string_lossy().to_string()],
            state_path: state_path.clone(),
            ..SyncRequest::default()
        })
        .expect("session starts");

        let snapshot = wait_for(&session_id);
        assert_eq!(snapshot.status, SessionStatus::Completed);
        assert!(snapshot.total_events >= 1);

        let events = poll_events(&session_id, 0).expect("events");
        assert_eq!(events.last().map(|event| event.percent), Some(50));
        assert!(poll_events(&session_id, snapshot.total_events)
            .expect("events")
            .is_empty());

        assert_eq!(
            list_locations(&state_path).expect("locations"),
            vec![data.to_string_lossy().to_string()]
        );
        let groups = load_duplicates(&state_path).expect("duplicates");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].files.len(), 2);

        let cancel = cancel_sync(&session_id).expect("cancel response");
        assert_eq!(cancel.session_id, session_id);
        assert_eq!(cancel.status, SessionStatus::Completed);
    }

    #[test]
    fn missing_location_fails_the_session() {
        let temp = TempDir::new().expect("tempdir");
        let session_id = start_sync(SyncRequest {
            paths: vec![temp.path().join("absent").to_string_lossy().to_string()],
            state_path: temp.path().join("state.json"),
            ..SyncRequest::default()
        })
        .expect("session starts");

        let snapshot = wait_for(&session_id);
        assert_eq!(snapshot.status, SessionStatus::Failed);
        assert!(snapshot.error.is_some());
    }

    #[test]
    fn cancelling_a_running_session_stops_it() {
        let temp = TempDir::new().expect("tempdir");
        let data = temp.path().join("data");
        fs::create_dir(&data).expect("mkdir");
        let block = vec![7_u8; 16 * 1024];
        for number in 0..400 {
            fs::write(data.join(format!("file-{number:04}.bin")), &block).expect("write");
        }
        let state_path = temp.path().join("state.json");

        let session_id = start_sync(SyncRequest {
            paths: vec![data.to_string_lossy().to_string()],
            state_path: state_path.clone(),
            ..SyncRequest::default()
        })
        .expect("session starts");
        let cancel = cancel_sync(&session_id).expect("cancel response");
        assert_eq!(cancel.status, SessionStatus::Running);

        let snapshot = wait_for(&session_id);
        assert_eq!(snapshot.status, SessionStatus::Cancelled);
        assert!(snapshot
            .error
            .as_deref()
            .is_some_and(|message| message.contains("canceled")));
        assert!(state_path.exists());
        assert!(list_locations(&state_path).expect("locations").is_empty());
    }

    #[test]
    fn unknown_session_is_an_error() {
        assert!(get_session("no-such-session").is_err());
        assert!(cancel_sync("no-such-session").is_err());
    }
}
