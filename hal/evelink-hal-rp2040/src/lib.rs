//! RP2040-specific link for the EVE coprocessor driver
//!
//! Binds the generic [`SpiLink`] to the RP2040's blocking SPI peripheral and
//! GPIO outputs. The driver runs synchronously, so the blocking SPI mode is
//! used even inside an embassy executor; the bus is the serialization point.
//!
//! ```ignore
//! let p = embassy_rp::init(Default::default());
//! let link = evelink_hal_rp2040::new_link(
//!     p.SPI0, p.PIN_2, p.PIN_3, p.PIN_4,
//!     Output::new(p.PIN_5, Level::High),
//!     Output::new(p.PIN_7, Level::High),
//!     SpiConfig::native(20_000_000),
//! );
//! let mut eve = Eve::new(link, Delay, DeviceFamily::Bt82x, Config::default());
//! eve.boot()?;
//! ```

#![no_std]

use embassy_rp::gpio::Output;
use embassy_rp::spi::{self, Blocking, ClkPin, Instance, MisoPin, MosiPin, Spi};
use embassy_rp::Peri;
use evelink_drivers::SpiLink;
use evelink_hal::SpiConfig;

pub use embassy_time::Delay;

/// Link over one of the RP2040's SPI blocks
pub type Rp2040Link<'d, T> = SpiLink<Spi<'d, T, Blocking>, Output<'d>, Output<'d>>;

/// Peripheral configuration for a link
///
/// EVE samples on the rising edge with the clock idling low (mode 0), which
/// is the peripheral default.
pub fn peripheral_config(config: &SpiConfig) -> spi::Config {
    let mut spi_config = spi::Config::default();
    spi_config.frequency = config.frequency;
    spi_config
}

/// Build a link from raw peripherals
///
/// `cs` and `pd` should be created high so the chip is deselected and out
/// of reset until the driver takes over.
pub fn new_link<'d, T: Instance>(
    inner: Peri<'d, T>,
    clk: Peri<'d, impl ClkPin<T>>,
    mosi: Peri<'d, impl MosiPin<T>>,
    miso: Peri<'d, impl MisoPin<T>>,
    cs: Output<'d>,
    pd: Output<'d>,
    config: SpiConfig,
) -> Rp2040Link<'d, T> {
    let spi = Spi::new_blocking(inner, clk, mosi, miso, peripheral_config(&config));
    SpiLink::new(spi, cs, pd, config)
}
