//! Command ring arithmetic
//!
//! The ring is a circular byte buffer of fixed capacity in device memory.
//! Pointers are byte offsets into it.

/// Fault flag in the raw available-space word
const FAULT_BIT: u32 = 1;

/// Decoded available-space register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Space {
    /// Bytes free in the ring
    Free(u32),
    /// The coprocessor has faulted; the value is not a byte count
    Fault,
}

impl Space {
    /// Decode a raw register value
    ///
    /// Bit 0 is checked before the value is treated as a count.
    pub fn from_raw(raw: u32) -> Self {
        if raw & FAULT_BIT != 0 {
            Space::Fault
        } else {
            Space::Free(raw)
        }
    }
}

/// Bytes between `read` and `write`, modulo `capacity`
pub fn occupied(write: u32, read: u32, capacity: u32) -> u32 {
    write.wrapping_sub(read) % capacity
}

/// Ring offset of a `size`-byte value that ends at `read`
pub fn offset_behind(read: u32, size: u32, capacity: u32) -> u32 {
    (read % capacity + capacity - size % capacity) % capacity
}

/// Split a `len`-byte access at `offset` into the part before the ring end
/// and the part that wraps to offset zero
pub fn split(offset: u32, len: u32, capacity: u32) -> (u32, u32) {
    let first = len.min(capacity - offset);
    (first, len - first)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_decoding() {
        assert_eq!(Space::from_raw(4092), Space::Free(4092));
        assert_eq!(Space::from_raw(0), Space::Free(0));
        assert_eq!(Space::from_raw(0xFFF), Space::Fault);
        assert_eq!(Space::from_raw(1), Space::Fault);
    }

    #[test]
    fn test_occupied_wraps() {
        assert_eq!(occupied(100, 40, 4096), 60);
        assert_eq!(occupied(8, 4088, 4096), 16);
        assert_eq!(occupied(0, 0, 4096), 0);
    }

    #[test]
    fn test_offset_behind() {
        assert_eq!(offset_behind(100, 4, 4096), 96);
        assert_eq!(offset_behind(0, 4, 4096), 4092);
        assert_eq!(offset_behind(2, 4, 16), 14);
        assert_eq!(offset_behind(4096, 4, 4096), 4092);
    }

    #[test]
    fn test_split() {
        assert_eq!(split(4092, 4, 4096), (4, 0));
        assert_eq!(split(4094, 4, 4096), (2, 2));
        assert_eq!(split(0, 16, 16), (16, 0));
    }
}
