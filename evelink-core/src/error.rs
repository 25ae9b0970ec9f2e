//! Driver errors
//!
//! Transport failures, protocol desynchronization and coprocessor faults are
//! kept apart so callers can choose between resubmitting, recovering the
//! ring, or rebooting the chip.

use core::fmt;

use evelink_protocol::FaultReport;

/// Errors returned by [`Eve`](crate::Eve) operations
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The link failed; not recoverable at this layer
    Link(E),
    /// No ready byte appeared within the polling bound
    Desync,
    /// The coprocessor reported an internal fault
    Fault(FaultReport),
    /// The boot handshake hit its configured attempt limit
    BootFailed {
        /// Attempts made, including the last failed one
        attempts: u32,
    },
    /// A bounded wait on device state expired
    Timeout,
}

impl<E> Error<E> {
    /// Whether the coprocessor reported a fault
    ///
    /// Faults are cleared with [`Eve::recover`](crate::Eve::recover).
    pub fn is_fault(&self) -> bool {
        matches!(self, Error::Fault(_))
    }

    /// Fault report carried by this error, if any
    pub fn fault_report(&self) -> Option<&FaultReport> {
        match self {
            Error::Fault(report) => Some(report),
            _ => None,
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Link(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Link(e) => write!(f, "link error: {:?}", e),
            Error::Desync => f.write_str("ready byte not found, bus out of sync"),
            Error::Fault(report) => write!(f, "coprocessor fault: {}", report),
            Error::BootFailed { attempts } => write!(f, "boot failed after {} attempts", attempts),
            Error::Timeout => f.write_str("timed out waiting for the coprocessor"),
        }
    }
}
