//! Host memory sampling used to size the batches of the sweep

// external crates
use sysinfo::System;

/// Source of host memory readings in bytes
///
/// Either reading may be unavailable, in which case the sweep keeps its
/// current batch size.
pub trait MemoryProbe: std::fmt::Debug {
    /// Memory currently in use
    fn used(&mut self) -> Option<u64>;

    /// Memory currently available for new allocations
    fn available(&mut self) -> Option<u64>;
}

/// Read memory usage from the operating system
///
/// Platforms that report zero are treated as unable to report at all.
pub struct SystemMemory {
    system: System,
}

impl SystemMemory {
    /// Probe backed by the memory statistics of the host
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("SystemMemory")
    }
}

impl MemoryProbe for SystemMemory {
    fn used(&mut self) -> Option<u64> {
        self.system.refresh_memory();
        non_zero(self.system.used_memory())
    }

    fn available(&mut self) -> Option<u64> {
        self.system.refresh_memory();
        non_zero(self.system.available_memory())
    }
}

fn non_zero(bytes: u64) -> Option<u64> {
    (bytes > 0).then_some(bytes)
}

/// Never reports memory, so every batch has the minimum size
///
/// Useful for reproducible batching, and as the fallback on hosts that
/// cannot report memory usage.
///
/// ```rust
/// # use mutools_mudensity::{FixedBatch, MemoryProbe};
/// let mut probe = FixedBatch;
/// assert_eq!(probe.used(), None);
/// assert_eq!(probe.available(), None);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedBatch;

impl MemoryProbe for FixedBatch {
    fn used(&mut self) -> Option<u64> {
        None
    }

    fn available(&mut self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_unavailable() {
        assert_eq!(non_zero(0), None);
        assert_eq!(non_zero(42), Some(42));
    }
}
