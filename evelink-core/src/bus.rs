//! Register and memory access
//!
//! Every access is one chip-select transaction: an address frame followed
//! by the payload. Writes go out immediately. Reads on sentinel-framed
//! families have to wait out the device's latency:
//!
//! ```text
//! host:   A3 A2 A1 A0 | xx xx xx xx xx xx xx xx ...
//! device:             | 00 00 00 01 D0 D1 D2 D3 ...
//!                       filler    ^ready
//! ```
//!
//! The host reads `W + n` bytes in one go, `W` being the link's
//! [`read_window`](evelink_hal::Link::read_window), and scans for the ready
//! byte. If the latency was longer than `W` it keeps reading one byte at a
//! time, up to [`RecoveryConfig::sentinel_polls`](crate::RecoveryConfig),
//! before reporting [`Error::Desync`].

use embedded_hal::delay::DelayNs;
use evelink_hal::{transaction, Link};
use evelink_protocol::{AddressFrame, FrameError, Framing, ReadyScanner, READY_SENTINEL};

use crate::error::Error;
use crate::eve::Eve;

/// Largest speculative read, in bytes
///
/// Windows and payloads beyond this are read in a second bulk transfer
/// once the ready byte has been found.
pub const MAX_WINDOW: usize = 64;

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Read `buf.len()` bytes of device memory starting at `addr`
    pub fn read_mem(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error<L::Error>> {
        if buf.is_empty() {
            return Ok(());
        }
        let framing = self.regs.framing;
        let frame = address_frame(AddressFrame::read(framing, addr), addr);
        let window = self.link.read_window();
        let max_polls = self.config.recovery.sentinel_polls;

        transaction(&mut self.link, |link| {
            link.write(frame.as_bytes())?;
            match framing {
                // The frame already carries the dummy byte
                Framing::DummyByte => Ok(link.read(buf)?),
                Framing::ReadySentinel => read_after_ready(link, window, max_polls, buf),
            }
        })
    }

    /// Write `data` to device memory starting at `addr`
    ///
    /// Payloads longer than the link's transfer limit are split into
    /// several transactions at increasing addresses.
    pub fn write_mem(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<L::Error>> {
        let chunk = transfer_chunk(&self.link);
        let mut addr = addr;
        for part in data.chunks(chunk) {
            self.write_frame(addr, part)?;
            addr += part.len() as u32;
        }
        Ok(())
    }

    /// Write `data` to a single FIFO-style register
    ///
    /// Unlike [`write_mem`](Self::write_mem) every transaction targets the
    /// same address; the device advances its own pointer.
    pub(crate) fn write_fifo(&mut self, addr: u32, data: &[u8]) -> Result<(), Error<L::Error>> {
        let chunk = transfer_chunk(&self.link);
        for part in data.chunks(chunk) {
            self.write_frame(addr, part)?;
        }
        Ok(())
    }

    /// Read a 32-bit register
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not 4-byte aligned.
    pub fn read32(&mut self, addr: u32) -> Result<u32, Error<L::Error>> {
        assert!(addr % 4 == 0, "unaligned register address {:#010x}", addr);
        let mut raw = [0u8; 4];
        self.read_mem(addr, &mut raw)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Write a 32-bit register
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not 4-byte aligned.
    pub fn write32(&mut self, addr: u32, value: u32) -> Result<(), Error<L::Error>> {
        assert!(addr % 4 == 0, "unaligned register address {:#010x}", addr);
        self.write_frame(addr, &value.to_le_bytes())
    }

    /// Read a 16-bit register
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not 2-byte aligned.
    pub fn read16(&mut self, addr: u32) -> Result<u16, Error<L::Error>> {
        assert!(addr % 2 == 0, "unaligned register address {:#010x}", addr);
        let mut raw = [0u8; 2];
        self.read_mem(addr, &mut raw)?;
        Ok(u16::from_le_bytes(raw))
    }

    /// Read an 8-bit register
    pub fn read8(&mut self, addr: u32) -> Result<u8, Error<L::Error>> {
        let mut raw = [0u8; 1];
        self.read_mem(addr, &mut raw)?;
        Ok(raw[0])
    }

    /// Probe for the ready byte with a single windowed read of address zero
    ///
    /// Unlike the regular read path this never falls back to polling: a
    /// chip still in standby answers with filler forever.
    pub(crate) fn probe_ready(&mut self) -> Result<bool, Error<L::Error>> {
        let frame = address_frame(AddressFrame::read(self.regs.framing, 0), 0);
        let span = self.link.read_window().saturating_add(4).clamp(1, MAX_WINDOW);
        let mut window = [0u8; MAX_WINDOW];

        transaction(&mut self.link, |link| {
            link.write(frame.as_bytes())?;
            link.read(&mut window[..span])?;
            Ok::<_, Error<L::Error>>(())
        })?;
        Ok(window[..span].contains(&READY_SENTINEL))
    }

    fn write_frame(&mut self, addr: u32, payload: &[u8]) -> Result<(), Error<L::Error>> {
        let frame = address_frame(AddressFrame::write(self.regs.framing, addr), addr);
        transaction(&mut self.link, |link| {
            link.write(frame.as_bytes())?;
            Ok(link.write(payload)?)
        })
    }
}

/// Largest write payload per transaction
///
/// Word-aligned when the link allows at least one word, never above the
/// link's limit.
fn transfer_chunk<L: Link>(link: &L) -> usize {
    match link.max_transfer() {
        max if max >= 4 => max & !3,
        max => max.max(1),
    }
}

/// An address the framing cannot express is a caller bug
fn address_frame(frame: Result<AddressFrame, FrameError>, addr: u32) -> AddressFrame {
    match frame {
        Ok(frame) => frame,
        Err(_) => panic!("address {:#010x} out of range for this framing", addr),
    }
}

/// Read the response to a read frame, skipping filler up to the ready byte
fn read_after_ready<L: Link + ?Sized>(
    link: &mut L,
    window: usize,
    max_polls: usize,
    out: &mut [u8],
) -> Result<(), Error<L::Error>> {
    let mut scanner = ReadyScanner::new(out.len());
    let mut buf = [0u8; MAX_WINDOW];
    let span = window.saturating_add(out.len()).clamp(1, MAX_WINDOW);

    link.read(&mut buf[..span])?;
    scanner.feed_bytes(&buf[..span], out);

    if !scanner.is_ready() {
        debug!("ready byte not within {} bytes, polling", span);
        let mut polls = 0;
        while !scanner.is_ready() {
            if polls == max_polls {
                debug!("no ready byte after {} polls", max_polls);
                return Err(Error::Desync);
            }
            polls += 1;
            let mut byte = [0u8; 1];
            link.read(&mut byte)?;
            scanner.feed(byte[0], out);
        }
    }

    if !scanner.is_complete() {
        let filled = scanner.filled();
        link.read(&mut out[filled..])?;
        scanner.advance(out.len() - filled);
    }
    Ok(())
}
