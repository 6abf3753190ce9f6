//! Configuration for opening a device.

use serde::{Deserialize, Serialize};

/// Upper bound on the default number of host worker threads.
const MAX_DEFAULT_WORKERS: usize = 8;

/// Configuration options for device creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Index selecting one device among several.
    pub index: usize,
    /// Queue priority, in `[0, 1]`.
    pub priority: f32,
    /// Worker threads used by the host backend.
    pub workers: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .clamp(1, MAX_DEFAULT_WORKERS);

        Self {
            index: 0,
            priority: 0.0,
            workers,
        }
    }
}

impl DeviceConfig {
    /// Creates a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the device index.
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Sets the queue priority, clamped to `[0, 1]`.
    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority.clamp(0.0, 1.0);
        self
    }

    /// Sets the number of host worker threads (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}
