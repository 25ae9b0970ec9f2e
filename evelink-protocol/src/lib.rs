//! EVE Coprocessor SPI Protocol
//!
//! This crate defines the byte-level contracts between a host and an
//! EVE-class graphics coprocessor. It performs no I/O; the driver in
//! `evelink-core` feeds it bytes and sends what it produces.
//!
//! # Protocol Overview
//!
//! Every transaction starts with an address frame. Families with a
//! ready-sentinel read path use a 32-bit address:
//! ```text
//! ┌────────────────────────────┬───────────────────────────────┐
//! │ ADDRESS (4B, big-endian)   │ write: PAYLOAD                │
//! │ bit 31 set for writes      │ read:  FILLER.. 0x01 PAYLOAD  │
//! └────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! Classic families use a 22-bit address in three bytes with the write flag
//! in bit 23, and a single dummy byte before read data.
//!
//! Command payloads are opaque to this crate. The only device data it
//! interprets is the available-space word (with its fault bit) and the
//! fault report text.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod fault;
pub mod frame;
pub mod ready;
pub mod regs;
pub mod ring;

pub use fault::{FaultReport, MAX_FAULT_REPORT};
pub use frame::{AddressFrame, FrameError, WRITE_FLAG};
pub use ready::{ReadyScanner, READY_SENTINEL};
pub use regs::{DeviceFamily, Framing, RegisterMap};
pub use ring::Space;
