//! Driver configuration
//!
//! Register addresses come from the [`RegisterMap`](crate::RegisterMap);
//! this module holds the tunables that are not fixed by the hardware:
//! boot timing and retry bounds, stream buffering, and recovery polling.
//! Every bound defaults to the behavior real hardware expects, which for
//! the retry loops means no bound at all.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default large-payload slice size
pub const DEFAULT_CHUNK_SIZE: usize = 15 * 1024;

/// Default number of single-byte polls before the read path gives up
pub const DEFAULT_SENTINEL_POLLS: usize = 4096;

/// Complete driver configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Boot handshake timing
    pub boot: BootConfig,
    /// Command stream buffering
    pub stream: StreamConfig,
    /// Fault recovery and polling bounds
    pub recovery: RecoveryConfig,
}

/// Boot handshake timing and retry bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BootConfig {
    /// Time the reset line is held released before the pulse (ms)
    pub settle_ms: u32,
    /// Time the reset line is held asserted (ms)
    pub hold_ms: u32,
    /// Time allowed for the chip to power up after release (ms)
    pub startup_ms: u32,
    /// Gap between clock-init preamble frames (us)
    pub command_gap_us: u32,
    /// Bound on the boot-status wait, measured from entering it (ms)
    ///
    /// Only the poll delays count towards it; time spent on the bus is not
    /// measured, so on slow links the wall-clock wait is longer.
    pub boot_status_timeout_ms: u32,
    /// Delay between boot-status polls (us)
    pub poll_interval_us: u32,
    /// Give up after this many reset cycles; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Retry after this many identification polls; `None` polls forever
    pub id_polls: Option<u32>,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            settle_ms: 200,
            hold_ms: 200,
            startup_ms: 300,
            command_gap_us: 1_000,
            boot_status_timeout_ms: 100,
            poll_interval_us: 1_000,
            max_attempts: None,
            id_polls: None,
        }
    }
}

/// Command stream buffering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamConfig {
    /// Flush once the pending buffer reaches this many bytes
    ///
    /// `None` derives the mark from the ring size: half the idle space,
    /// capped at the pending buffer's capacity.
    pub high_water: Option<usize>,
    /// Slice size used by `append_large` (rounded down to a multiple of 4)
    pub chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            high_water: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Polling bounds for recovery and idle waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecoveryConfig {
    /// Register polls allowed before a wait reports `Timeout`
    ///
    /// Applies to the pointer-reset wait, idle waits and backpressure
    /// refreshes. `None` polls forever.
    pub poll_limit: Option<u32>,
    /// Single-byte reads allowed while hunting for the ready byte
    pub sentinel_polls: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            poll_limit: None,
            sentinel_polls: DEFAULT_SENTINEL_POLLS,
        }
    }
}

/// Counts polls against an optional bound
#[derive(Debug, Clone, Copy)]
pub(crate) struct PollBudget {
    limit: Option<u32>,
    used: u32,
}

impl PollBudget {
    pub(crate) fn new(limit: Option<u32>) -> Self {
        Self { limit, used: 0 }
    }

    /// Take one poll; returns `false` once the bound is spent
    pub(crate) fn take(&mut self) -> bool {
        self.used = self.used.saturating_add(1);
        match self.limit {
            Some(limit) => self.used <= limit,
            None => true,
        }
    }

    pub(crate) fn used(&self) -> u32 {
        self.used
    }
}
