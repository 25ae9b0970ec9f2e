//! Ready-sentinel scanning for the read path
//!
//! After a read address frame the device clocks out filler while it fetches
//! the data, then a single [`READY_SENTINEL`] byte, then the payload. The
//! host does not know the latency in advance, so it reads a speculative
//! window and scans it; the scanner also accepts single bytes for the
//! fallback polling path.

/// Byte marking the start of valid read data
pub const READY_SENTINEL: u8 = 0x01;

/// Scanner progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanState {
    /// Discarding filler, waiting for the sentinel
    WaitingForReady,
    /// Sentinel seen, copying payload bytes
    ReadingPayload,
    /// All requested payload bytes collected
    Complete,
}

/// State machine that extracts a payload from a filler-prefixed response
#[derive(Debug, Clone)]
pub struct ReadyScanner {
    state: ScanState,
    wanted: usize,
    filled: usize,
    skipped: usize,
}

impl ReadyScanner {
    /// Create a scanner for a payload of `wanted` bytes
    pub fn new(wanted: usize) -> Self {
        Self {
            state: ScanState::WaitingForReady,
            wanted,
            filled: 0,
            skipped: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Whether the sentinel has been seen
    pub fn is_ready(&self) -> bool {
        self.state != ScanState::WaitingForReady
    }

    /// Whether the whole payload has been collected
    pub fn is_complete(&self) -> bool {
        self.state == ScanState::Complete
    }

    /// Payload bytes collected so far
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Payload bytes still missing
    pub fn remaining(&self) -> usize {
        self.wanted - self.filled
    }

    /// Filler bytes discarded before the sentinel
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Feed a single response byte
    ///
    /// Payload bytes are copied into `out` at the current fill position.
    /// `out` must be at least `wanted` bytes long.
    pub fn feed(&mut self, byte: u8, out: &mut [u8]) {
        match self.state {
            ScanState::WaitingForReady => {
                if byte == READY_SENTINEL {
                    self.state = if self.wanted == 0 {
                        ScanState::Complete
                    } else {
                        ScanState::ReadingPayload
                    };
                } else {
                    self.skipped += 1;
                }
            }
            ScanState::ReadingPayload => {
                out[self.filled] = byte;
                self.filled += 1;
                if self.filled == self.wanted {
                    self.state = ScanState::Complete;
                }
            }
            // Bytes past the payload are ignored
            ScanState::Complete => {}
        }
    }

    /// Feed a window of response bytes
    ///
    /// Stops consuming once the payload is complete. Returns the number of
    /// bytes consumed from `window`.
    pub fn feed_bytes(&mut self, window: &[u8], out: &mut [u8]) -> usize {
        for (i, &byte) in window.iter().enumerate() {
            if self.is_complete() {
                return i;
            }
            self.feed(byte, out);
        }
        window.len()
    }

    /// Record payload bytes that were read directly into `out`
    ///
    /// Used after the sentinel was found when the remainder is fetched with
    /// one bulk read instead of being fed byte by byte.
    pub fn advance(&mut self, count: usize) {
        debug_assert!(self.is_ready());
        self.filled = (self.filled + count).min(self.wanted);
        if self.filled == self.wanted {
            self.state = ScanState::Complete;
        }
    }
}
