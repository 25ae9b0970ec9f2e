//! Register maps per device family
//!
//! Each family exposes the same set of symbolic registers at different
//! addresses. A [`RegisterMap`] is fixed for the lifetime of a session and
//! is chosen at construction, either from a [`DeviceFamily`] or built by
//! hand for a board variant.

/// How the device frames read responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    /// 32-bit address, filler bytes until a `0x01` ready byte, then data
    ReadySentinel,
    /// 22-bit address, one dummy byte, then data
    DummyByte,
}

/// Fixed addresses and constants for one device family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// Read/write framing used on the bus
    pub framing: Framing,

    /// Base address of the command ring in device memory
    pub ring_base: u32,
    /// Command ring size in bytes
    pub ring_capacity: u32,
    /// Value of the space register when the coprocessor has drained the ring
    pub idle_space: u32,

    /// Write-data register; writes here append to the ring
    pub write_data: u32,
    /// Coprocessor read pointer (offset into the ring)
    pub read_pointer: u32,
    /// Host write pointer (offset into the ring)
    pub write_pointer: u32,
    /// Available-space register; bit 0 is the fault flag
    pub space: u32,

    /// Chip identification register
    pub id: u32,
    /// Value the identification register reads once the chip is up
    pub expected_id: u32,
    /// Boot-status register, if the family reports one
    pub boot_status: Option<u32>,
    /// Boot-status value meaning boot has completed
    pub boot_complete: u32,
    /// System clock frequency register
    pub frequency: u32,
    /// Frequency the clock-init preamble configures, in Hz
    pub expected_frequency: u32,

    /// Fault report buffer address
    pub fault_report: u32,
    /// Fault report buffer length in bytes
    pub fault_report_len: usize,

    /// Clock-init preamble, one raw frame per transaction
    pub preamble: &'static [&'static [u8]],
}

/// BT82x clock-init preamble
///
/// PLL multiplier, system clock divider, DDR timing, boot control, core
/// reset pulse and finally the active marker.
const BT82X_PREAMBLE: &[&[u8]] = &[
    &[0xFF, 0xE4, 0x06, 0x00, 0x00],
    &[0xFF, 0xE6, 0x02, 0x00, 0x00],
    &[0xFF, 0xEB, 0x0C, 0x00, 0x00],
    &[0xFF, 0xE8, 0xF0, 0x00, 0x00],
    &[0xFF, 0xE7, 0x00, 0x00, 0x00],
    &[0x00, 0x00, 0x00, 0x00, 0x00],
];

/// FT81x/BT81x clock-init preamble
///
/// External clock select, PLL multiplier, core reset pulse, active marker.
const FT81X_PREAMBLE: &[&[u8]] = &[
    &[0x44, 0x00, 0x00],
    &[0x61, 0x46, 0x00],
    &[0x68, 0x00, 0x00],
    &[0x00, 0x00, 0x00],
];

impl RegisterMap {
    /// BT82x family (ready-sentinel framing, 16 KiB ring)
    pub const BT82X: Self = Self {
        framing: Framing::ReadySentinel,
        ring_base: 0x7F00_0000,
        ring_capacity: 16 * 1024,
        idle_space: 16 * 1024 - 4,
        write_data: 0x7F01_0000,
        read_pointer: 0x7F00_60F8,
        write_pointer: 0x7F00_60FC,
        space: 0x7F00_6594,
        id: 0x7F00_6000,
        expected_id: 0x7C,
        boot_status: Some(0x7F00_6628),
        boot_complete: 0x522E_2E2E,
        frequency: 0x7F00_600C,
        expected_frequency: 72_000_000,
        fault_report: 0x7F00_4800,
        fault_report_len: 128,
        preamble: BT82X_PREAMBLE,
    };

    /// FT81x and BT81x families (dummy-byte framing, 4 KiB ring)
    pub const FT81X: Self = Self {
        framing: Framing::DummyByte,
        ring_base: 0x30_8000,
        ring_capacity: 4096,
        idle_space: 4092,
        write_data: 0x30_2578,
        read_pointer: 0x30_20F8,
        write_pointer: 0x30_20FC,
        space: 0x30_2574,
        id: 0x30_2000,
        expected_id: 0x7C,
        boot_status: None,
        boot_complete: 0,
        frequency: 0x30_200C,
        expected_frequency: 60_000_000,
        fault_report: 0x30_9800,
        fault_report_len: 128,
        preamble: FT81X_PREAMBLE,
    };

    /// Check the map's internal consistency
    ///
    /// The ring capacity must be a nonzero multiple of 4 and the idle space
    /// cannot exceed it.
    pub fn is_valid(&self) -> bool {
        self.ring_capacity != 0
            && self.ring_capacity % 4 == 0
            && self.idle_space <= self.ring_capacity
            && self.idle_space % 4 == 0
    }
}

/// Supported device families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceFamily {
    /// BT820 and relatives
    Bt82x,
    /// FT810 through BT818
    Ft81x,
}

impl DeviceFamily {
    /// Register map for this family
    pub const fn registers(self) -> RegisterMap {
        match self {
            DeviceFamily::Bt82x => RegisterMap::BT82X,
            DeviceFamily::Ft81x => RegisterMap::FT81X,
        }
    }
}

impl From<DeviceFamily> for RegisterMap {
    fn from(family: DeviceFamily) -> Self {
        family.registers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_maps_valid() {
        assert!(RegisterMap::BT82X.is_valid());
        assert!(RegisterMap::FT81X.is_valid());
    }

    #[test]
    fn test_family_selection() {
        assert_eq!(DeviceFamily::Bt82x.registers().framing, Framing::ReadySentinel);
        assert_eq!(DeviceFamily::Ft81x.registers().framing, Framing::DummyByte);
        assert_eq!(RegisterMap::from(DeviceFamily::Ft81x), RegisterMap::FT81X);
    }

    #[test]
    fn test_registers_aligned() {
        for map in [RegisterMap::BT82X, RegisterMap::FT81X] {
            for addr in [
                map.ring_base,
                map.write_data,
                map.read_pointer,
                map.write_pointer,
                map.space,
                map.id,
                map.frequency,
                map.fault_report,
            ] {
                assert_eq!(addr % 4, 0, "address {:#x} unaligned", addr);
            }
        }
    }

    #[test]
    fn test_preamble_ends_with_active() {
        for map in [RegisterMap::BT82X, RegisterMap::FT81X] {
            let last = map.preamble.last().unwrap();
            assert!(last.iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_invalid_map() {
        let mut map = RegisterMap::FT81X;
        map.idle_space = map.ring_capacity + 4;
        assert!(!map.is_valid());

        map.idle_space = 4092;
        map.ring_capacity = 4094;
        assert!(!map.is_valid());
    }
}
