// Copyright © 2025 Stephan Kunz

//! Process-wide configuration row.
//!
//! This is a plain data row read back through [`crate::storage::Storage`] — there is
//! deliberately no env/file loading layer here; a caller wires that up outside the crate.

use serde::{Deserialize, Serialize};

/// Configuration consulted when a new [`crate::batch::Batch`] is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Capacity of the `pipeline`/`done`/`err` channels a batch allocates.
    pub channel_size: usize,
    /// Capacity reserved for a [`crate::report::ReportDetail`]'s `url_map`.
    pub report_size: usize,
    /// Pause, in milliseconds, the producer loop sleeps between bots of one wave.
    pub enqueue_delay_ms: u64,
    /// Script run once against every bot's blackboard before the tree itself ticks.
    pub global_code: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel_size: 64,
            report_size: 16,
            enqueue_delay_ms: 0,
            global_code: String::new(),
        }
    }
}
