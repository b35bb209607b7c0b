pub mod build_progress;
pub mod event_log;
