//! Address frame encoding
//!
//! Frame formats:
//! - Ready-sentinel read:  `A31..A24 A23..A16 A15..A8 A7..A0` (bit 31 clear)
//! - Ready-sentinel write: same, with bit 31 set, followed by payload
//! - Dummy-byte read:      `00 A21..A16` `A15..A8` `A7..A0` `DUMMY`
//! - Dummy-byte write:     `10 A21..A16` `A15..A8` `A7..A0`, followed by payload

use crate::regs::Framing;

/// Write flag for 32-bit address frames
pub const WRITE_FLAG: u32 = 1 << 31;

/// Write flag for 22-bit address frames (top bits of the first byte)
const SHORT_WRITE_FLAG: u8 = 0x80;

/// Highest address reachable with a 22-bit frame
const SHORT_ADDRESS_MAX: u32 = 0x3F_FFFF;

/// Errors that can occur while encoding a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Address does not fit the family's address width
    AddressOutOfRange,
}

/// An encoded address frame, at most four bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFrame {
    bytes: [u8; 4],
    len: u8,
}

impl AddressFrame {
    /// Build the frame that starts a read at `addr`
    pub fn read(framing: Framing, addr: u32) -> Result<Self, FrameError> {
        match framing {
            Framing::ReadySentinel => {
                if addr & WRITE_FLAG != 0 {
                    return Err(FrameError::AddressOutOfRange);
                }
                Ok(Self {
                    bytes: addr.to_be_bytes(),
                    len: 4,
                })
            }
            Framing::DummyByte => {
                if addr > SHORT_ADDRESS_MAX {
                    return Err(FrameError::AddressOutOfRange);
                }
                Ok(Self {
                    bytes: [(addr >> 16) as u8, (addr >> 8) as u8, addr as u8, 0x00],
                    len: 4,
                })
            }
        }
    }

    /// Build the frame that starts a write at `addr`
    pub fn write(framing: Framing, addr: u32) -> Result<Self, FrameError> {
        match framing {
            Framing::ReadySentinel => {
                if addr & WRITE_FLAG != 0 {
                    return Err(FrameError::AddressOutOfRange);
                }
                Ok(Self {
                    bytes: (addr | WRITE_FLAG).to_be_bytes(),
                    len: 4,
                })
            }
            Framing::DummyByte => {
                if addr > SHORT_ADDRESS_MAX {
                    return Err(FrameError::AddressOutOfRange);
                }
                Ok(Self {
                    bytes: [
                        SHORT_WRITE_FLAG | (addr >> 16) as u8,
                        (addr >> 8) as u8,
                        addr as u8,
                        0,
                    ],
                    len: 3,
                })
            }
        }
    }

    /// The encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Decoded address frame, as seen by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decoded {
    /// Target address
    pub addr: u32,
    /// Whether the transaction writes
    pub write: bool,
    /// Bytes consumed by the frame, including any dummy byte
    pub len: usize,
}

/// Decode the address frame at the start of `bytes`
///
/// Returns `None` if `bytes` is too short to hold a frame.
pub fn decode(framing: Framing, bytes: &[u8]) -> Option<Decoded> {
    match framing {
        Framing::ReadySentinel => {
            let head: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
            let raw = u32::from_be_bytes(head);
            Some(Decoded {
                addr: raw & !WRITE_FLAG,
                write: raw & WRITE_FLAG != 0,
                len: 4,
            })
        }
        Framing::DummyByte => {
            let first = *bytes.first()?;
            let write = first & SHORT_WRITE_FLAG != 0;
            let len = if write { 3 } else { 4 };
            if bytes.len() < len {
                return None;
            }
            let addr = (((first & 0x3F) as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32;
            Some(Decoded { addr, write, len })
        }
    }
}
