//! Link implementations
//!
//! This crate provides concrete implementations of the [`Link`] trait
//! defined in evelink-hal:
//!
//! - [`spi::SpiLink`] - any `embedded-hal` 1.0 SPI bus plus chip-select and
//!   power-down pins. This covers microcontroller SPI peripherals as well as
//!   host-side USB bridges (FTDI MPSSE, FT4222) that expose embedded-hal.
//! - [`sim::SimDevice`] - a simulated coprocessor for host-side testing
//!   (feature `sim`)
//!
//! [`Link`]: evelink_hal::Link

#![no_std]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "sim"))]
extern crate alloc;

#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod spi;

pub use spi::{SpiLink, SpiLinkError};
