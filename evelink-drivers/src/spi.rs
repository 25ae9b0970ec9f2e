//! SPI link over embedded-hal
//!
//! Wires an `embedded-hal` 1.0 [`SpiBus`] together with a chip-select pin
//! and the coprocessor's power-down pin, which doubles as its reset line.
//!
//! # Pins
//!
//! - CS: active low, driven by this link rather than the bus, because the
//!   driver holds one select across several `write`/`read` calls
//! - PD_N: active low; held low for reset, high for normal operation

use embedded_hal::digital::{Error as _, ErrorKind, OutputPin};
use embedded_hal::spi::SpiBus;
use evelink_hal::{Link, SpiConfig};

/// SpiLink errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiLinkError<E> {
    /// Bus transfer failed
    Spi(E),
    /// Chip-select or power-down pin could not be driven
    Pin(ErrorKind),
}

/// Link built from an SPI bus and two GPIO outputs
pub struct SpiLink<SPI, CS, PD> {
    spi: SPI,
    cs: CS,
    pd: PD,
    config: SpiConfig,
}

impl<SPI, CS, PD> SpiLink<SPI, CS, PD>
where
    SPI: SpiBus,
    CS: OutputPin,
    PD: OutputPin,
{
    /// Create a new link
    ///
    /// The bus must already be clocked at `config.frequency`; the pins are
    /// left untouched until the first transaction or reset.
    pub fn new(spi: SPI, cs: CS, pd: PD, config: SpiConfig) -> Self {
        Self {
            spi,
            cs,
            pd,
            config,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    /// Release the bus and pins
    pub fn release(self) -> (SPI, CS, PD) {
        (self.spi, self.cs, self.pd)
    }
}

impl<SPI, CS, PD> Link for SpiLink<SPI, CS, PD>
where
    SPI: SpiBus,
    CS: OutputPin,
    PD: OutputPin,
{
    type Error = SpiLinkError<SPI::Error>;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low().map_err(|e| SpiLinkError::Pin(e.kind()))
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        // Let the last byte leave the shift register before releasing CS
        let flushed = self.spi.flush().map_err(SpiLinkError::Spi);
        self.cs.set_high().map_err(|e| SpiLinkError::Pin(e.kind()))?;
        flushed
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(data).map_err(SpiLinkError::Spi)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.read(buf).map_err(SpiLinkError::Spi)
    }

    fn assert_reset(&mut self) -> Result<(), Self::Error> {
        self.pd.set_low().map_err(|e| SpiLinkError::Pin(e.kind()))
    }

    fn release_reset(&mut self) -> Result<(), Self::Error> {
        self.pd.set_high().map_err(|e| SpiLinkError::Pin(e.kind()))
    }

    fn max_transfer(&self) -> usize {
        self.config.max_transfer
    }

    fn read_window(&self) -> usize {
        self.config.read_window
    }
}
