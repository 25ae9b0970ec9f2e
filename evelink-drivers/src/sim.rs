//! Simulated coprocessor
//!
//! [`SimDevice`] implements [`Link`] by decoding address frames exactly as a
//! real chip would and answering from a sparse memory image. It models:
//!
//! - Read latency: a configurable number of filler bytes before the ready
//!   byte on sentinel-framed families
//! - The command ring: writes to the write-data register append at the
//!   write pointer, the coprocessor drains a configurable number of bytes
//!   each time the space register is read, and the peak occupancy is
//!   recorded so tests can check it never exceeded capacity
//! - Faults: an injected fault sets bit 0 of the space word and fills the
//!   fault report buffer until the read pointer is reset
//! - Boot: reset edges, the clock-init preamble, and scripted failures
//!   (no response, stuck boot status, wrong frequency) for the first `k`
//!   boot cycles
//! - Transport errors on demand
//!
//! [`SimDelay`] is a virtual clock implementing [`DelayNs`].

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;
use evelink_protocol::frame::{self, Decoded};
use evelink_protocol::{Framing, RegisterMap, READY_SENTINEL};

/// Simulated transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimError {
    /// Injected bus error
    Bus,
}

/// Boot behavior script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootScript {
    /// Boot cycles in which the chip never leaves standby
    pub unresponsive_cycles: u32,
    /// Boot cycles in which boot status never completes
    pub stuck_cycles: u32,
    /// Boot cycles in which the frequency register reads wrong
    pub wrong_frequency_cycles: u32,
    /// Identification reads that return zero before the real id appears
    pub id_polls: u32,
    /// Boot-status reads before the boot-complete value appears
    pub status_polls: u32,
}

/// Boot-status word reported by a stuck boot
pub const STUCK_BOOT_STATUS: u32 = 0x5245_5354;

/// Simulated EVE coprocessor
pub struct SimDevice {
    regs: RegisterMap,
    memory: BTreeMap<u32, u8>,

    // Current transaction
    selected: bool,
    request: Vec<u8>,
    decoded: Option<Decoded>,
    prefix: VecDeque<u8>,
    cursor: Option<u32>,

    // Command ring
    wp: u32,
    rp: u32,
    occupancy: u32,
    peak: u32,
    overrun: bool,
    drain: u32,
    ring_writes: Vec<usize>,
    result_word: Option<u32>,

    // Bus behavior
    latency: usize,
    read_window: usize,
    max_transfer: usize,
    fail_in: Option<u32>,

    // Boot
    active: bool,
    reset_asserted: bool,
    resets: u32,
    script: BootScript,
    id_reads: u32,
    status_reads: u32,
    host_commands: Vec<Vec<u8>>,

    // Fault
    fault: bool,
    space_reads: u32,
    reset_lag: u32,
    stale_wp: Option<(u32, u32)>,
}

impl SimDevice {
    /// Create a running device with the given register map
    ///
    /// The device starts booted and idle, as if a previous session had
    /// brought it up.
    pub fn new(regs: RegisterMap) -> Self {
        Self {
            regs,
            memory: BTreeMap::new(),
            selected: false,
            request: Vec::new(),
            decoded: None,
            prefix: VecDeque::new(),
            cursor: None,
            wp: 0,
            rp: 0,
            occupancy: 0,
            peak: 0,
            overrun: false,
            drain: u32::MAX,
            ring_writes: Vec::new(),
            result_word: None,
            latency: 0,
            read_window: 16,
            max_transfer: usize::MAX,
            fail_in: None,
            active: true,
            reset_asserted: false,
            resets: 0,
            script: BootScript::default(),
            id_reads: 0,
            status_reads: 0,
            host_commands: Vec::new(),
            fault: false,
            space_reads: 0,
            reset_lag: 0,
            stale_wp: None,
        }
    }

    /// Register map this device decodes against
    pub fn registers(&self) -> &RegisterMap {
        &self.regs
    }

    /// Filler bytes emitted before the ready byte
    pub fn set_latency(&mut self, latency: usize) {
        self.latency = latency;
    }

    /// Speculative window the link advertises
    pub fn set_read_window(&mut self, window: usize) {
        self.read_window = window;
    }

    /// Largest single write the link advertises
    pub fn set_max_transfer(&mut self, max: usize) {
        self.max_transfer = max;
    }

    /// Bytes the coprocessor consumes per space-register read
    ///
    /// `u32::MAX` (the default) drains the ring completely on every read.
    pub fn set_drain(&mut self, bytes: u32) {
        self.drain = bytes;
    }

    /// Put the ring in a state where `occupied` bytes are still unprocessed
    pub fn set_occupancy(&mut self, occupied: u32) {
        self.occupancy = occupied.min(self.regs.idle_space);
        self.wp = (self.rp + self.occupancy) % self.regs.ring_capacity;
        self.peak = self.peak.max(self.occupancy);
    }

    /// Word the next drained command block writes as its result
    ///
    /// When the ring next becomes empty, the last four bytes written are
    /// replaced with `value`, the way a command that returns a value
    /// overwrites its placeholder.
    pub fn set_result(&mut self, value: u32) {
        self.result_word = Some(value);
    }

    /// Fail the link operation after the next `ops` successful ones
    pub fn fail_after(&mut self, ops: u32) {
        self.fail_in = Some(ops);
    }

    /// Replace the boot behavior script
    pub fn set_boot_script(&mut self, script: BootScript) {
        self.script = script;
    }

    /// Put the coprocessor into the fault state with the given report
    pub fn inject_fault(&mut self, message: &str) {
        self.fault = true;
        let len = self.regs.fault_report_len;
        let base = self.regs.fault_report;
        let bytes = message.as_bytes();
        for i in 0..len {
            let byte = bytes.get(i).copied().unwrap_or(0);
            self.memory.insert(base + i as u32, byte);
        }
    }

    /// Keep reporting the old write pointer for `reads` reads after a
    /// pointer reset
    pub fn set_reset_lag(&mut self, reads: u32) {
        self.reset_lag = reads;
    }

    /// Whether the device is currently faulted
    pub fn is_faulted(&self) -> bool {
        self.fault
    }

    /// Number of completed reset pulses
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Whether the chip has left standby since the last reset
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw frames received while the chip was in standby
    pub fn host_commands(&self) -> &[Vec<u8>] {
        &self.host_commands
    }

    /// Payload sizes of every write to the write-data register
    pub fn ring_writes(&self) -> &[usize] {
        &self.ring_writes
    }

    /// Total bytes appended to the ring
    pub fn ring_bytes(&self) -> usize {
        self.ring_writes.iter().sum()
    }

    /// Bytes currently unprocessed in the ring
    pub fn occupancy(&self) -> u32 {
        self.occupancy
    }

    /// Highest occupancy ever observed
    pub fn peak_occupancy(&self) -> u32 {
        self.peak
    }

    /// Whether a write ever pushed occupancy past the ring's free space
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    /// Number of space-register reads
    pub fn space_reads(&self) -> u32 {
        self.space_reads
    }

    /// Coprocessor read pointer
    pub fn read_pointer(&self) -> u32 {
        self.rp
    }

    /// Host write pointer
    pub fn write_pointer(&self) -> u32 {
        self.wp
    }

    /// Read a little-endian word from device memory
    pub fn peek32(&self, addr: u32) -> u32 {
        let mut raw = [0u8; 4];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = self.byte_at(addr + i as u32);
        }
        u32::from_le_bytes(raw)
    }

    /// Write a little-endian word into device memory
    pub fn poke32(&mut self, addr: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().iter().enumerate() {
            self.memory.insert(addr + i as u32, *byte);
        }
    }

    fn byte_at(&self, addr: u32) -> u8 {
        self.memory.get(&addr).copied().unwrap_or(0)
    }

    fn tick(&mut self) -> Result<(), SimError> {
        match self.fail_in {
            Some(0) => {
                self.fail_in = None;
                Err(SimError::Bus)
            }
            Some(n) => {
                self.fail_in = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn boot_cycle_in(&self, cycles: u32) -> bool {
        self.resets >= 1 && self.resets <= cycles
    }

    /// Coprocessor progress: consume queued bytes
    fn drain_ring(&mut self) {
        if self.fault {
            return;
        }
        let consumed = self.occupancy.min(self.drain);
        self.rp = (self.rp + consumed) % self.regs.ring_capacity;
        self.occupancy -= consumed;

        if self.occupancy == 0 && consumed > 0 {
            if let Some(value) = self.result_word.take() {
                let cap = self.regs.ring_capacity;
                let offset = (self.wp + cap - 4) % cap;
                self.poke32(self.regs.ring_base + offset, value);
            }
        }
    }

    /// Refresh the memory image of a register about to be read
    fn latch_register(&mut self, addr: u32) {
        let regs = self.regs;
        if addr == regs.space {
            self.space_reads += 1;
            self.drain_ring();
            let free = regs.idle_space.saturating_sub(self.occupancy);
            let raw = if self.fault { free | 1 } else { free };
            self.poke32(addr, raw);
        } else if addr == regs.read_pointer {
            self.poke32(addr, self.rp);
        } else if addr == regs.write_pointer {
            let value = match self.stale_wp {
                Some((wp, left)) if left > 0 => {
                    self.stale_wp = Some((wp, left - 1));
                    wp
                }
                _ => self.wp,
            };
            self.poke32(addr, value);
        } else if addr == regs.id {
            self.id_reads += 1;
            let booting = self.resets >= 1 && self.id_reads <= self.script.id_polls;
            let value = if booting { 0 } else { regs.expected_id };
            self.poke32(addr, value);
        } else if Some(addr) == regs.boot_status {
            self.status_reads += 1;
            let value = if self.boot_cycle_in(self.script.stuck_cycles) {
                STUCK_BOOT_STATUS
            } else if self.resets >= 1 && self.status_reads <= self.script.status_polls {
                0
            } else {
                regs.boot_complete
            };
            self.poke32(addr, value);
        } else if addr == regs.frequency {
            let value = if self.boot_cycle_in(self.script.wrong_frequency_cycles) {
                regs.expected_frequency / 2
            } else {
                regs.expected_frequency
            };
            self.poke32(addr, value);
        }
    }

    /// Prepare the response for a read transaction
    fn begin_read(&mut self, decoded: Decoded) {
        self.latch_register(decoded.addr);
        self.cursor = Some(decoded.addr);
        if self.regs.framing == Framing::ReadySentinel {
            self.prefix.extend(core::iter::repeat(0x00).take(self.latency));
            self.prefix.push_back(READY_SENTINEL);
        }
    }

    fn next_response_byte(&mut self) -> u8 {
        if !self.active {
            return 0x00;
        }
        if self.decoded.is_none() {
            self.decoded = frame::decode(self.regs.framing, &self.request);
            match self.decoded {
                Some(decoded) if !decoded.write => self.begin_read(decoded),
                _ => return 0x00,
            }
        }
        if let Some(byte) = self.prefix.pop_front() {
            return byte;
        }
        match self.cursor {
            Some(addr) => {
                self.cursor = Some(addr + 1);
                self.byte_at(addr)
            }
            None => 0x00,
        }
    }

    fn push_ring(&mut self, payload: &[u8]) {
        let cap = self.regs.ring_capacity;
        for &byte in payload {
            self.memory.insert(self.regs.ring_base + self.wp, byte);
            self.wp = (self.wp + 1) % cap;
            self.occupancy += 1;
        }
        if self.occupancy > self.regs.idle_space {
            self.overrun = true;
        }
        self.peak = self.peak.max(self.occupancy);
        self.ring_writes.push(payload.len());
    }

    fn finish_standby(&mut self) {
        let request = core::mem::take(&mut self.request);
        if request.is_empty() {
            return;
        }
        // The active marker, or a read of address zero, wakes the chip
        if request.iter().all(|&b| b == 0) && !self.boot_cycle_in(self.script.unresponsive_cycles) {
            self.active = true;
        }
        self.host_commands.push(request);
    }

    fn finish_write(&mut self) {
        let request = core::mem::take(&mut self.request);
        let Some(decoded) = frame::decode(self.regs.framing, &request) else {
            return;
        };
        if !decoded.write {
            return;
        }
        let payload = &request[decoded.len..];
        let regs = self.regs;

        if decoded.addr == regs.write_data {
            self.push_ring(payload);
        } else if decoded.addr == regs.read_pointer && payload.iter().all(|&b| b == 0) {
            // Pointer reset clears the fault and empties the ring
            if self.reset_lag > 0 {
                self.stale_wp = Some((self.wp, self.reset_lag));
            }
            self.fault = false;
            self.rp = 0;
            self.wp = 0;
            self.occupancy = 0;
        } else {
            for (i, &byte) in payload.iter().enumerate() {
                self.memory.insert(decoded.addr + i as u32, byte);
            }
        }
    }
}

impl Link for SimDevice {
    type Error = SimError;

    fn select(&mut self) -> Result<(), SimError> {
        self.tick()?;
        self.selected = true;
        self.request.clear();
        self.decoded = None;
        self.prefix.clear();
        self.cursor = None;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), SimError> {
        self.selected = false;
        if self.active {
            self.finish_write();
        } else {
            self.finish_standby();
        }
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<(), SimError> {
        self.tick()?;
        assert!(self.selected, "write outside a transaction");
        self.request.extend_from_slice(data);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), SimError> {
        self.tick()?;
        assert!(self.selected, "read outside a transaction");
        if !self.active && self.request.iter().all(|&b| b == 0) && !self.request.is_empty() {
            // Reading address zero wakes the chip, like the active marker
            if !self.boot_cycle_in(self.script.unresponsive_cycles) {
                self.active = true;
            }
        }
        for byte in buf.iter_mut() {
            *byte = self.next_response_byte();
        }
        Ok(())
    }

    fn assert_reset(&mut self) -> Result<(), SimError> {
        self.tick()?;
        self.reset_asserted = true;
        Ok(())
    }

    fn release_reset(&mut self) -> Result<(), SimError> {
        self.tick()?;
        if self.reset_asserted {
            // Rising edge: the chip powers up in standby with a clean ring
            self.reset_asserted = false;
            self.resets += 1;
            self.active = false;
            self.fault = false;
            self.wp = 0;
            self.rp = 0;
            self.occupancy = 0;
            self.id_reads = 0;
            self.status_reads = 0;
        }
        Ok(())
    }

    fn max_transfer(&self) -> usize {
        self.max_transfer
    }

    fn read_window(&self) -> usize {
        self.read_window
    }
}

/// Virtual clock for boot timing in tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    /// Create a clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time waited, in microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1_000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evelink_protocol::AddressFrame;

    fn map16() -> RegisterMap {
        let mut map = RegisterMap::BT82X;
        map.ring_capacity = 16;
        map.idle_space = 16;
        map
    }

    fn read32(dev: &mut SimDevice, addr: u32, window: usize) -> u32 {
        let frame = AddressFrame::read(dev.registers().framing, addr).unwrap();
        let mut buf = [0u8; 64];
        dev.select().unwrap();
        dev.write(frame.as_bytes()).unwrap();
        dev.read(&mut buf[..window]).unwrap();
        dev.deselect().unwrap();

        let start = buf.iter().position(|&b| b == READY_SENTINEL).unwrap() + 1;
        u32::from_le_bytes(buf[start..start + 4].try_into().unwrap())
    }

    fn write(dev: &mut SimDevice, addr: u32, payload: &[u8]) {
        let frame = AddressFrame::write(dev.registers().framing, addr).unwrap();
        dev.select().unwrap();
        dev.write(frame.as_bytes()).unwrap();
        dev.write(payload).unwrap();
        dev.deselect().unwrap();
    }

    #[test]
    fn test_read_with_latency() {
        let mut dev = SimDevice::new(RegisterMap::BT82X);
        dev.set_latency(5);
        dev.poke32(0x1000, 0xDEAD_BEEF);
        assert_eq!(read32(&mut dev, 0x1000, 16), 0xDEAD_BEEF);
    }

    #[test]
    fn test_ring_accounting() {
        let regs = map16();
        let mut dev = SimDevice::new(regs);
        dev.set_drain(0);
        write(&mut dev, regs.write_data, &[0u8; 12]);

        assert_eq!(dev.occupancy(), 12);
        assert_eq!(read32(&mut dev, regs.space, 16), 4);
        assert!(!dev.overrun());

        write(&mut dev, regs.write_data, &[0u8; 8]);
        assert!(dev.overrun());
    }

    #[test]
    fn test_fault_sets_space_bit() {
        let regs = map16();
        let mut dev = SimDevice::new(regs);
        dev.inject_fault("ERROR: bad");
        let space = read32(&mut dev, regs.space, 16);
        assert_eq!(space & 1, 1);

        write(&mut dev, regs.read_pointer, &[0u8; 4]);
        assert!(!dev.is_faulted());
    }

    #[test]
    fn test_pointer_reset_lag() {
        let regs = map16();
        let mut dev = SimDevice::new(regs);
        dev.set_drain(0);
        dev.set_occupancy(8);
        dev.set_reset_lag(2);

        write(&mut dev, regs.read_pointer, &[0u8; 4]);
        assert_eq!(read32(&mut dev, regs.write_pointer, 16), 8);
        assert_eq!(read32(&mut dev, regs.write_pointer, 16), 8);
        assert_eq!(read32(&mut dev, regs.write_pointer, 16), 0);
    }

    #[test]
    fn test_reset_enters_standby() {
        let mut dev = SimDevice::new(RegisterMap::BT82X);
        dev.assert_reset().unwrap();
        dev.release_reset().unwrap();
        assert_eq!(dev.resets(), 1);
        assert!(!dev.is_active());

        write_raw(&mut dev, &[0xFF, 0xE4, 0x06, 0x00, 0x00]);
        write_raw(&mut dev, &[0x00; 5]);
        assert!(dev.is_active());
        assert_eq!(dev.host_commands().len(), 2);
    }

    #[test]
    fn test_unresponsive_cycle_stays_in_standby() {
        let mut dev = SimDevice::new(RegisterMap::BT82X);
        dev.set_boot_script(BootScript {
            unresponsive_cycles: 1,
            ..Default::default()
        });
        dev.assert_reset().unwrap();
        dev.release_reset().unwrap();
        write_raw(&mut dev, &[0x00; 5]);
        assert!(!dev.is_active());
    }

    #[test]
    fn test_injected_bus_error() {
        let mut dev = SimDevice::new(RegisterMap::BT82X);
        dev.fail_after(1);
        assert!(dev.select().is_ok());
        assert_eq!(dev.write(&[0]), Err(SimError::Bus));
        assert!(dev.write(&[0]).is_ok());
    }

    #[test]
    fn test_sim_delay_accumulates() {
        let mut delay = SimDelay::new();
        delay.delay_ms(2);
        delay.delay_us(500);
        assert_eq!(delay.elapsed_us(), 2_500);
    }

    fn write_raw(dev: &mut SimDevice, bytes: &[u8]) {
        dev.select().unwrap();
        dev.write(bytes).unwrap();
        dev.deselect().unwrap();
    }
}
