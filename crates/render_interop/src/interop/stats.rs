//! Batch statistics.

/// Statistics from one batch phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Frame number of this batch.
    pub frame: u64,
    /// Entities taking part in the batch.
    pub entities: u32,
    /// Entities dropped from the enumeration because they were destroyed.
    pub entities_pruned: u32,
    /// Handles passed to the map call.
    pub handles_mapped: u32,
    /// Handles passed to the unmap call.
    pub handles_unmapped: u32,
    /// Handles given back by entities and unmapped after distribution.
    pub handles_released: u32,
    /// The map call failed.
    pub map_failed: bool,
    /// The unmap call failed.
    pub unmap_failed: bool,
    /// The release unmap call failed.
    pub release_failed: bool,
    /// Batch duration in microseconds.
    pub batch_time_us: u32,
}

impl BatchStats {
    /// Total driver handles touched this batch.
    #[must_use]
    pub const fn handles_total(&self) -> u32 {
        self.handles_mapped + self.handles_unmapped + self.handles_released
    }

    /// True if every driver call of this batch succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        !(self.map_failed || self.unmap_failed || self.release_failed)
    }
}

/// Totals over the coordinator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Batches run.
    pub total_batches: u64,
    /// Batches with at least one failed driver call.
    pub failed_batches: u64,
    /// Handles passed to all driver calls.
    pub total_handles: u64,
    /// Worst batch duration in microseconds.
    pub worst_batch_time_us: u32,
}

impl CoordinatorStats {
    pub(crate) fn record(&mut self, batch: &BatchStats) {
        self.total_batches += 1;
        if !batch.is_clean() {
            self.failed_batches += 1;
        }
        self.total_handles += u64::from(batch.handles_total());
        self.worst_batch_time_us = self.worst_batch_time_us.max(batch.batch_time_us);
    }
}
