//! SPI transport tunables
//!
//! Settings shared by SPI-based [`Link`](crate::Link) implementations.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// SPI link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    /// Speculative read window while waiting for the ready byte
    pub read_window: usize,
    /// Largest single write the adapter accepts
    pub max_transfer: usize,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 10_000_000, // 10 MHz
            read_window: 16,
            max_transfer: 4096,
        }
    }
}

impl SpiConfig {
    /// Settings for USB-SPI bridges
    ///
    /// Every transfer costs a USB round trip, so a wide window avoids
    /// falling back to byte polling. Payloads are limited to what fits in
    /// the bridge's transfer buffer.
    pub const fn usb_bridge(frequency: u32) -> Self {
        Self {
            frequency,
            read_window: 32,
            max_transfer: 65_535,
        }
    }

    /// Settings for a microcontroller's native SPI peripheral
    pub const fn native(frequency: u32) -> Self {
        Self {
            frequency,
            read_window: 8,
            max_transfer: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpiConfig::default();
        assert_eq!(config.frequency, 10_000_000);
        assert_eq!(config.read_window, 16);
    }

    #[test]
    fn test_bridge_window_wider_than_native() {
        let bridge = SpiConfig::usb_bridge(30_000_000);
        let native = SpiConfig::native(30_000_000);
        assert!(bridge.read_window > native.read_window);
        assert!(bridge.max_transfer < native.max_transfer);
    }
}
