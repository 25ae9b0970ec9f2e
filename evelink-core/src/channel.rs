//! Flow-controlled channel into the command ring
//!
//! The host keeps a cached count of free ring bytes and only re-reads the
//! space register once that count is exhausted. The count can only be an
//! underestimate, since the coprocessor frees space but never takes it, so
//! a write sized by it cannot overrun the ring.

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;
use evelink_protocol::Space;

use crate::config::PollBudget;
use crate::error::Error;
use crate::eve::Eve;

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Re-read the space register and update the cached count
    ///
    /// A raw value with bit 0 set is a fault, never a byte count: the
    /// cached count drops to zero and the decoded fault report is returned
    /// as [`Error::Fault`].
    pub fn refresh_space(&mut self) -> Result<u32, Error<L::Error>> {
        let raw = self.read32(self.regs.space)?;
        match Space::from_raw(raw) {
            Space::Free(free) => {
                self.space = free;
                Ok(free)
            }
            Space::Fault => {
                self.space = 0;
                Err(self.fault_error())
            }
        }
    }

    /// Write `bytes` into the ring, never exceeding its free space
    ///
    /// Blocks while the ring is full. Bytes bypass the pending buffer, so
    /// call [`flush`](Self::flush) first if ordering with queued commands
    /// matters.
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), Error<L::Error>> {
        let mut rest = bytes;
        while !rest.is_empty() {
            if self.space == 0 {
                self.wait_for_space()?;
            }
            let n = rest.len().min(self.space as usize);
            let (now, later) = rest.split_at(n);
            self.write_fifo(self.regs.write_data, now)?;
            self.space -= n as u32;
            rest = later;
        }
        Ok(())
    }

    /// Flush pending commands and block until the coprocessor has consumed
    /// the whole ring
    pub fn wait_idle(&mut self) -> Result<(), Error<L::Error>> {
        self.flush()?;
        let mut budget = PollBudget::new(self.config.recovery.poll_limit);
        loop {
            if self.refresh_space()? == self.regs.idle_space {
                return Ok(());
            }
            if !budget.take() {
                return Err(Error::Timeout);
            }
        }
    }

    fn wait_for_space(&mut self) -> Result<(), Error<L::Error>> {
        let mut budget = PollBudget::new(self.config.recovery.poll_limit);
        loop {
            if self.refresh_space()? > 0 {
                return Ok(());
            }
            trace!("command ring full");
            if !budget.take() {
                warn!("command ring still full after {} polls", budget.used());
                return Err(Error::Timeout);
            }
        }
    }
}
