//! Result retrieval
//!
//! Commands that compute a value write it into the ring, over their own
//! trailing parameter words. Once the coprocessor is idle its read pointer
//! sits right after that value, so the result is read from behind it.

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;
use evelink_protocol::ring;

use crate::error::Error;
use crate::eve::Eve;

/// Largest value [`Eve::previous`] decodes
const MAX_WORD: usize = 8;

/// A little-endian value that can be read back from the ring
pub trait RingWord: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Decode from exactly `SIZE` little-endian bytes
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! ring_word {
    ($($ty:ty),*) => {
        $(
            impl RingWord for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; core::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

ring_word!(u8, i8, u16, i16, u32, i32);

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Read the `out.len()` bytes the coprocessor last wrote before its
    /// read pointer
    ///
    /// Flushes and waits for the ring to go idle first. A value that
    /// straddles the end of the ring is read in two parts.
    ///
    /// # Panics
    ///
    /// Panics if `out` is larger than the ring.
    pub fn previous_bytes(&mut self, out: &mut [u8]) -> Result<(), Error<L::Error>> {
        let capacity = self.regs.ring_capacity;
        assert!(
            out.len() <= capacity as usize,
            "result of {} bytes larger than the ring",
            out.len()
        );
        self.wait_idle()?;

        let read = self.read32(self.regs.read_pointer)?;
        let size = out.len() as u32;
        let offset = ring::offset_behind(read, size, capacity);
        let (first, _) = ring::split(offset, size, capacity);

        let (head, tail) = out.split_at_mut(first as usize);
        self.read_mem(self.regs.ring_base + offset, head)?;
        self.read_mem(self.regs.ring_base, tail)
    }

    /// Read a value of type `T` from behind the read pointer
    pub fn previous<T: RingWord>(&mut self) -> Result<T, Error<L::Error>> {
        assert!(T::SIZE <= MAX_WORD, "result type too large");
        let mut raw = [0u8; MAX_WORD];
        self.previous_bytes(&mut raw[..T::SIZE])?;
        Ok(T::from_le_slice(&raw[..T::SIZE]))
    }

    /// Append a placeholder word and read back what the coprocessor
    /// wrote over it
    ///
    /// For commands whose result is the last word they write.
    pub fn result(&mut self) -> Result<u32, Error<L::Error>> {
        self.append(&[0u8; 4])?;
        self.previous::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{map16, session};
    use evelink_protocol::RegisterMap;

    #[test]
    fn test_result_round_trip() {
        let mut eve = session(RegisterMap::BT82X);
        eve.append_word(0xFFFF_FF26).unwrap();
        eve.link_mut().set_result(0xDEAD_BEEF);

        assert_eq!(eve.result().unwrap(), 0xDEAD_BEEF);
        assert_eq!(eve.pending_len(), 0);
    }

    #[test]
    fn test_previous_reads_behind_read_pointer() {
        let mut eve = session(RegisterMap::FT81X);
        eve.append_word(0x0000_1234).unwrap();
        eve.append_word(0x8765_FFFE).unwrap();

        assert_eq!(eve.previous::<u32>().unwrap(), 0x8765_FFFE);
        assert_eq!(eve.previous::<i16>().unwrap(), 0x8765_u16 as i16);
        assert_eq!(eve.previous::<u8>().unwrap(), 0x87);
    }

    #[test]
    fn test_previous_wraps_ring_end() {
        let mut eve = session(map16());
        eve.send(&[0u8; 12]).unwrap();
        eve.wait_idle().unwrap();

        // Read pointer is now 12; the next 8 bytes wrap to offset 4
        assert_eq!(eve.link().read_pointer(), 12);
        eve.append(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let mut out = [0u8; 8];
        eve.previous_bytes(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(eve.link().read_pointer(), 4);
    }

    #[test]
    fn test_ring_word_decoding() {
        assert_eq!(u16::from_le_slice(&[0x34, 0x12]), 0x1234);
        assert_eq!(i32::from_le_slice(&[0xFF, 0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(i8::SIZE, 1);
    }
}
