pub mod service;

pub use service::{
    cancel_sync, get_session, list_locations, load_duplicates, poll_events, start_sync,
    CancelResponse, ProgressEvent, SessionSnapshot, SessionStatus, SyncRequest,
};
