//! Background Tasks Module
//!
//! # Tasks
//! - TTL Cleanup: Purges entries that outlived their stale retention window

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_orchestrator_cleanup};
