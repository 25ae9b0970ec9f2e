//! Fault detection and recovery
//!
//! A faulted coprocessor sets bit 0 of the space register and writes a
//! short text report into a fixed buffer. Reporting and recovery are kept
//! separate: [`refresh_space`](crate::Eve::refresh_space) surfaces the
//! report as [`Error::Fault`], and the caller decides whether to call
//! [`recover`](crate::Eve::recover). Nothing is resubmitted automatically.

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;
use evelink_protocol::{FaultReport, MAX_FAULT_REPORT};

use crate::config::PollBudget;
use crate::error::Error;
use crate::eve::Eve;

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Read and decode the fault report buffer
    ///
    /// Does not check whether a fault is actually present; the buffer holds
    /// whatever the last fault left there.
    pub fn fault_report(&mut self) -> Result<FaultReport, Error<L::Error>> {
        let len = self.regs.fault_report_len.min(MAX_FAULT_REPORT);
        let mut raw = [0u8; MAX_FAULT_REPORT];
        self.read_mem(self.regs.fault_report, &mut raw[..len])?;
        Ok(FaultReport::from_bytes(&raw[..len]))
    }

    /// Reset the ring pointers after a fault
    ///
    /// Writes zero to the read pointer, waits for the write pointer to
    /// follow, then re-reads the free space. Pending commands are
    /// discarded.
    pub fn recover(&mut self) -> Result<(), Error<L::Error>> {
        warn!("resetting command ring");
        self.pending.clear();
        self.space = 0;

        self.write32(self.regs.read_pointer, 0)?;

        let mut budget = PollBudget::new(self.config.recovery.poll_limit);
        while self.read32(self.regs.write_pointer)? != 0 {
            if !budget.take() {
                warn!("write pointer did not reset after {} polls", budget.used());
                return Err(Error::Timeout);
            }
        }

        let free = self.refresh_space()?;
        info!("command ring recovered, {} bytes free", free);
        Ok(())
    }

    /// Build the error for a fault seen in the space register
    pub(crate) fn fault_error(&mut self) -> Error<L::Error> {
        match self.fault_report() {
            Ok(report) => {
                error!("coprocessor fault: {}", report.message());
                Error::Fault(report)
            }
            Err(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RecoveryConfig};
    use crate::testing::{map16, session, session_with};
    use evelink_protocol::RegisterMap;

    #[test]
    fn test_fault_report_decoded() {
        let mut eve = session(RegisterMap::FT81X);
        eve.link_mut().inject_fault("ERROR: image has no end");
        let report = eve.fault_report().unwrap();
        assert_eq!(report.message(), "ERROR: image has no end");
    }

    #[test]
    fn test_fault_then_recover() {
        let mut eve = session(map16());
        eve.link_mut().set_drain(0);
        eve.append(&[0u8; 4]).unwrap();
        eve.send(&[0u8; 8]).unwrap();
        eve.link_mut().inject_fault("ERROR: out of memory");

        let err = eve.wait_idle().unwrap_err();
        assert_eq!(err.fault_report().unwrap().message(), "ERROR: out of memory");

        eve.recover().unwrap();
        assert!(!eve.link().is_faulted());
        assert_eq!(eve.link().write_pointer(), 0);
        assert_eq!(eve.link().read_pointer(), 0);
        assert_eq!(eve.cached_space(), 16);
        assert_eq!(eve.pending_len(), 0);

        // The channel is usable again
        eve.send(&[0u8; 8]).unwrap();
        assert_eq!(eve.link().occupancy(), 8);
    }

    #[test]
    fn test_recover_discards_pending() {
        let mut eve = session(RegisterMap::FT81X);
        eve.append(&[0u8; 16]).unwrap();
        eve.recover().unwrap();
        assert_eq!(eve.pending_len(), 0);
        assert!(eve.link().ring_writes().is_empty());
    }

    #[test]
    fn test_recover_on_healthy_ring() {
        let mut eve = session(RegisterMap::BT82X);
        eve.recover().unwrap();
        assert_eq!(eve.cached_space(), RegisterMap::BT82X.idle_space);
    }

    #[test]
    fn test_recover_waits_for_write_pointer() {
        let mut eve = session(map16());
        eve.link_mut().set_drain(0);
        eve.link_mut().set_occupancy(8);
        eve.link_mut().set_reset_lag(3);
        eve.link_mut().inject_fault("ERROR: stuck");

        eve.recover().unwrap();
        assert_eq!(eve.cached_space(), 16);
    }

    #[test]
    fn test_recover_timeout() {
        let config = Config {
            recovery: RecoveryConfig {
                poll_limit: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut eve = session_with(map16(), config);
        eve.link_mut().set_drain(0);
        eve.link_mut().set_occupancy(8);
        eve.link_mut().set_reset_lag(10);

        assert_eq!(eve.recover(), Err(Error::Timeout));
    }
}
