//! Command-channel driver for EVE-class graphics coprocessors
//!
//! This crate turns a sequence of encoded commands into a correctly framed,
//! flow-controlled stream into the coprocessor's command ring:
//!
//! - Register access over any [`Link`](evelink_hal::Link), including the
//!   ready-byte read framing
//! - Boot/reset handshake with retries
//! - Command stream encoder with a bounded local buffer
//! - Flow-controlled channel that never overruns the ring
//! - Fault detection, fault report decoding and pointer-reset recovery
//! - Result retrieval from behind the coprocessor's read pointer
//!
//! Everything is synchronous and blocking. The driver owns its link for the
//! whole session; share it across threads only behind external locking.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

mod fmt;

pub mod boot;
pub mod bus;
pub mod channel;
pub mod config;
pub mod error;
pub mod eve;
pub mod fault;
pub mod result;
pub mod stream;
pub mod surface;

#[cfg(test)]
mod testing;

pub use boot::{BootFailure, BootReport, BootState};
pub use config::{BootConfig, Config, RecoveryConfig, StreamConfig};
pub use error::Error;
pub use eve::Eve;
pub use result::RingWord;
pub use surface::{PixelFormat, Surface};

pub use evelink_protocol::{DeviceFamily, FaultReport, RegisterMap};
