//! Boot/reset handshake
//!
//! Brings the coprocessor from an unknown state to a verified running
//! state. Each attempt walks the states in order; any failed check sends
//! the machine back to [`BootState::Reset`]:
//!
//! ```text
//! Reset -> ClockInit -> WaitActive -> WaitId -> WaitBootStatus -> VerifyFrequency -> Ready
//!   ^                       |           |             |                  |
//!   +-----------------------+-----------+-------------+------------------+
//! ```
//!
//! `WaitActive` only applies to sentinel-framed families and
//! `WaitBootStatus` only to families with a boot-status register. The
//! boot-status wait is bounded by [`BootConfig::boot_status_timeout_ms`];
//! everything else retries forever unless the config sets a bound.
//!
//! Elapsed time is counted from the delays the driver itself issues, so the
//! handshake needs no clock beyond the [`DelayNs`] it was given.
//!
//! [`BootConfig::boot_status_timeout_ms`]: crate::BootConfig::boot_status_timeout_ms

use embedded_hal::delay::DelayNs;
use evelink_hal::{transaction, Link};
use evelink_protocol::Framing;

use crate::config::PollBudget;
use crate::error::Error;
use crate::eve::Eve;

/// Handshake states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootState {
    /// Pulse the reset line
    Reset,
    /// Send the clock-init preamble
    ClockInit,
    /// Wait for the chip to answer reads with the ready byte
    WaitActive,
    /// Poll the identification register
    WaitId,
    /// Poll the boot-status register, time-bounded
    WaitBootStatus,
    /// Check the system clock took the configured frequency
    VerifyFrequency,
    /// Handshake complete
    Ready,
}

/// Why a boot attempt was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootFailure {
    /// The chip never produced a ready byte
    NoResponse,
    /// The identification register never showed the expected value
    IdTimeout,
    /// Boot status stuck at this value
    BootStatus(u32),
    /// The clock ran at this frequency instead of the expected one
    Frequency(u32),
}

/// Outcome of a successful handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootReport {
    /// Reset cycles taken, including the successful one
    pub attempts: u32,
    /// Why the attempt before the successful one failed
    pub last_failure: Option<BootFailure>,
}

/// Per-call handshake bookkeeping, dropped once the chip is up
#[derive(Debug, Default)]
struct BootSession {
    attempt: u32,
    last_failure: Option<BootFailure>,
}

enum Step {
    Advance(BootState),
    Retry(BootFailure),
}

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Run the boot handshake until the chip is verified running
    ///
    /// Transport errors abort immediately. Every other failure is logged
    /// and retried from reset, for as many attempts as
    /// [`BootConfig::max_attempts`](crate::BootConfig::max_attempts) allows.
    pub fn boot(&mut self) -> Result<BootReport, Error<L::Error>> {
        let mut session = BootSession::default();
        let mut state = BootState::Reset;

        loop {
            let step = match state {
                BootState::Reset => {
                    if let Some(max) = self.config.boot.max_attempts {
                        if session.attempt >= max {
                            warn!("giving up after {} boot attempts", session.attempt);
                            return Err(Error::BootFailed {
                                attempts: session.attempt,
                            });
                        }
                    }
                    session.attempt += 1;
                    debug!("boot attempt {}", session.attempt);
                    self.reset_pulse()?;
                    Step::Advance(BootState::ClockInit)
                }
                BootState::ClockInit => {
                    self.send_preamble()?;
                    Step::Advance(match self.regs.framing {
                        Framing::ReadySentinel => BootState::WaitActive,
                        Framing::DummyByte => BootState::WaitId,
                    })
                }
                BootState::WaitActive => {
                    if self.probe_ready()? {
                        Step::Advance(BootState::WaitId)
                    } else {
                        Step::Retry(BootFailure::NoResponse)
                    }
                }
                BootState::WaitId => self.wait_id()?,
                BootState::WaitBootStatus => self.wait_boot_status()?,
                BootState::VerifyFrequency => self.verify_frequency()?,
                BootState::Ready => {
                    let free = self.refresh_space()?;
                    info!(
                        "coprocessor ready after {} attempts, {} ring bytes free",
                        session.attempt,
                        free
                    );
                    return Ok(BootReport {
                        attempts: session.attempt,
                        last_failure: session.last_failure,
                    });
                }
            };

            state = match step {
                Step::Advance(next) => next,
                Step::Retry(failure) => {
                    warn!(
                        "boot attempt {} failed in {}: {}",
                        session.attempt,
                        state,
                        failure
                    );
                    session.last_failure = Some(failure);
                    BootState::Reset
                }
            };
        }
    }

    /// Drive a clean power-on edge and forget all session state
    fn reset_pulse(&mut self) -> Result<(), Error<L::Error>> {
        let boot = self.config.boot;
        self.pending.clear();
        self.space = 0;

        self.link.release_reset()?;
        self.delay.delay_ms(boot.settle_ms);
        self.link.assert_reset()?;
        self.delay.delay_ms(boot.hold_ms);
        self.link.release_reset()?;
        self.delay.delay_ms(boot.startup_ms);
        Ok(())
    }

    /// One transaction per preamble frame
    fn send_preamble(&mut self) -> Result<(), Error<L::Error>> {
        let preamble = self.regs.preamble;
        let gap = self.config.boot.command_gap_us;
        for &frame in preamble {
            transaction(&mut self.link, |link| Ok::<_, Error<L::Error>>(link.write(frame)?))?;
            self.delay.delay_us(gap);
        }
        Ok(())
    }

    fn wait_id(&mut self) -> Result<Step, Error<L::Error>> {
        let mut budget = PollBudget::new(self.config.boot.id_polls);
        loop {
            match self.read8(self.regs.id) {
                Ok(id) if u32::from(id) == self.regs.expected_id => break,
                Ok(_) => {}
                Err(Error::Desync) => return Ok(Step::Retry(BootFailure::NoResponse)),
                Err(e) => return Err(e),
            }
            if !budget.take() {
                return Ok(Step::Retry(BootFailure::IdTimeout));
            }
        }

        Ok(Step::Advance(if self.regs.boot_status.is_some() {
            BootState::WaitBootStatus
        } else {
            BootState::VerifyFrequency
        }))
    }

    fn wait_boot_status(&mut self) -> Result<Step, Error<L::Error>> {
        let Some(addr) = self.regs.boot_status else {
            return Ok(Step::Advance(BootState::VerifyFrequency));
        };
        let timeout_us = u64::from(self.config.boot.boot_status_timeout_ms) * 1_000;
        let interval_us = self.config.boot.poll_interval_us.max(1);
        let mut elapsed_us = 0u64;

        loop {
            let status = match self.read32(addr) {
                Ok(status) => status,
                Err(Error::Desync) => return Ok(Step::Retry(BootFailure::NoResponse)),
                Err(e) => return Err(e),
            };
            if status == self.regs.boot_complete {
                return Ok(Step::Advance(BootState::VerifyFrequency));
            }
            if elapsed_us >= timeout_us {
                warn!("boot status stuck at {=u32:#x}", status);
                return Ok(Step::Retry(BootFailure::BootStatus(status)));
            }
            self.delay.delay_us(interval_us);
            elapsed_us += u64::from(interval_us);
        }
    }

    fn verify_frequency(&mut self) -> Result<Step, Error<L::Error>> {
        let frequency = match self.read32(self.regs.frequency) {
            Ok(frequency) => frequency,
            Err(Error::Desync) => return Ok(Step::Retry(BootFailure::NoResponse)),
            Err(e) => return Err(e),
        };
        if frequency == self.regs.expected_frequency {
            Ok(Step::Advance(BootState::Ready))
        } else {
            warn!(
                "clock at {} Hz, expected {} Hz",
                frequency,
                self.regs.expected_frequency
            );
            Ok(Step::Retry(BootFailure::Frequency(frequency)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BootConfig, Config};
    use crate::testing::{session, session_with};
    use evelink_drivers::sim::{BootScript, SimError, STUCK_BOOT_STATUS};
    use evelink_protocol::RegisterMap;

    fn bounded(max_attempts: u32) -> Config {
        Config {
            boot: BootConfig {
                max_attempts: Some(max_attempts),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_boot() {
        let mut eve = session(RegisterMap::BT82X);
        let report = eve.boot().unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(report.last_failure, None);
        assert_eq!(eve.link().resets(), 1);
        assert!(eve.link().is_active());
        assert_eq!(eve.link().host_commands().len(), RegisterMap::BT82X.preamble.len());
        assert_eq!(eve.cached_space(), RegisterMap::BT82X.idle_space);
    }

    #[test]
    fn test_boot_without_sentinel_or_status() {
        let mut eve = session(RegisterMap::FT81X);
        eve.link_mut().set_boot_script(BootScript {
            id_polls: 5,
            ..Default::default()
        });
        let report = eve.boot().unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(eve.link().host_commands()[0], &[0x44, 0x00, 0x00]);
        assert_eq!(eve.cached_space(), 4092);
    }

    #[test]
    fn test_wrong_frequency_retries() {
        for k in 0..4 {
            let mut eve = session(RegisterMap::BT82X);
            eve.link_mut().set_boot_script(BootScript {
                wrong_frequency_cycles: k,
                ..Default::default()
            });
            let report = eve.boot().unwrap();

            assert_eq!(report.attempts, k + 1);
            assert_eq!(eve.link().resets(), k + 1);
            if k > 0 {
                assert_eq!(
                    report.last_failure,
                    Some(BootFailure::Frequency(RegisterMap::BT82X.expected_frequency / 2))
                );
            }
        }
    }

    #[test]
    fn test_stuck_boot_status_times_out() {
        let mut eve = session(RegisterMap::BT82X);
        eve.link_mut().set_boot_script(BootScript {
            stuck_cycles: 1,
            ..Default::default()
        });
        let report = eve.boot().unwrap();
        assert_eq!(report.attempts, 2);
        assert_eq!(report.last_failure, Some(BootFailure::BootStatus(STUCK_BOOT_STATUS)));

        // Two full reset sequences plus at least one full status timeout
        let boot = BootConfig::default();
        let reset_us = u64::from(boot.settle_ms + boot.hold_ms + boot.startup_ms) * 1_000;
        let (_, delay) = eve.release();
        assert!(delay.elapsed_us() >= 2 * reset_us + 100_000);
    }

    #[test]
    fn test_slow_boot_status_within_timeout() {
        let mut eve = session(RegisterMap::BT82X);
        eve.link_mut().set_boot_script(BootScript {
            status_polls: 20,
            ..Default::default()
        });
        assert_eq!(eve.boot().unwrap().attempts, 1);
    }

    #[test]
    fn test_unresponsive_chip_retries() {
        let mut eve = session(RegisterMap::BT82X);
        eve.link_mut().set_boot_script(BootScript {
            unresponsive_cycles: 2,
            ..Default::default()
        });
        let report = eve.boot().unwrap();
        assert_eq!(report.attempts, 3);
        assert_eq!(report.last_failure, Some(BootFailure::NoResponse));
    }

    #[test]
    fn test_attempt_bound() {
        let mut eve = session_with(RegisterMap::BT82X, bounded(2));
        eve.link_mut().set_boot_script(BootScript {
            wrong_frequency_cycles: 5,
            ..Default::default()
        });
        assert_eq!(eve.boot(), Err(Error::BootFailed { attempts: 2 }));
        assert_eq!(eve.link().resets(), 2);
    }

    #[test]
    fn test_id_poll_bound() {
        let config = Config {
            boot: BootConfig {
                id_polls: Some(3),
                max_attempts: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut eve = session_with(RegisterMap::FT81X, config);
        eve.link_mut().set_boot_script(BootScript {
            id_polls: 10,
            ..Default::default()
        });
        assert_eq!(eve.boot(), Err(Error::BootFailed { attempts: 2 }));
    }

    #[test]
    fn test_boot_discards_session_state() {
        let mut eve = session(RegisterMap::FT81X);
        eve.append(&[0u8; 8]).unwrap();
        eve.send(&[0u8; 16]).unwrap();

        eve.boot().unwrap();
        assert_eq!(eve.pending_len(), 0);
        assert_eq!(eve.link().occupancy(), 0);
        assert_eq!(eve.cached_space(), 4092);
    }

    #[test]
    fn test_transport_error_aborts_boot() {
        let mut eve = session(RegisterMap::BT82X);
        eve.link_mut().fail_after(4);
        assert_eq!(eve.boot(), Err(Error::Link(SimError::Bus)));
    }
}
