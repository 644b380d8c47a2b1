//! ---
//! edc_section: "06-live-stream"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Fixed-capacity rolling history of load samples."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use std::collections::VecDeque;

use edc_model::HistoryPoint;

/// Points retained by the live view, matching the reference client.
pub const HISTORY_CAPACITY: usize = 20;

/// Bounded FIFO time series derived from stream samples.
///
/// Pure and synchronous: given the same ordered input sequence the buffer
/// contents are fully deterministic. Insertion order equals arrival order
/// and the oldest points are evicted first.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryBuffer {
    /// Buffer with the standard capacity of [`HISTORY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Buffer with an explicit capacity (non-zero).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "history buffer capacity must be non-zero");
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one point, evicting the oldest when full.
    pub fn push(&mut self, point: HistoryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Current contents in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Owned copy of the current contents in arrival order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }

    /// Most recently appended point.
    #[must_use]
    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
