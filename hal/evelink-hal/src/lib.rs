//! Evelink Hardware Abstraction Layer
//!
//! This crate defines the transport trait that every physical adapter
//! implements. The command-channel driver in `evelink-core` depends only on
//! this trait, so the same driver runs over a microcontroller's native SPI
//! peripheral, a USB-SPI bridge on a host, or a simulated device in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  evelink-core (Eve driver)              │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  evelink-hal (this crate - Link trait)  │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────────┐
//!         ▼           ▼               ▼
//! ┌─────────────┐ ┌──────────────┐ ┌──────────────┐
//! │  SpiLink    │ │  evelink-hal │ │  SimDevice   │
//! │ embedded-hal│ │    -rp2040   │ │  (tests)     │
//! └─────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! # Traits
//!
//! - [`link::Link`] - Chip-select scoped byte transport with a reset line
//! - [`spi::SpiConfig`] - Transport tunables shared by SPI-based links

#![no_std]
#![deny(unsafe_code)]

pub mod link;
pub mod spi;

// Re-export key items at crate root for convenience
pub use link::{transaction, Link};
pub use spi::SpiConfig;
