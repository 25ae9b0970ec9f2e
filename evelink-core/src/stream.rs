//! Command stream encoder
//!
//! Commands are opaque, word-aligned byte sequences. Small ones accumulate
//! in the pending buffer and go out in blocks once it reaches the high-water
//! mark; bulk payloads bypass the buffer and are streamed in fixed slices.

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;

use crate::error::Error;
use crate::eve::Eve;

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Queue encoded command bytes
    ///
    /// Flushes when the pending buffer reaches the high-water mark, or
    /// beforehand if `bytes` would not fit.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len()` is not a multiple of 4.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), Error<L::Error>> {
        assert!(
            bytes.len() % 4 == 0,
            "command length {} is not a multiple of 4",
            bytes.len()
        );

        if bytes.len() > self.pending.capacity() - self.pending.len() {
            self.flush()?;
            if bytes.len() > self.pending.capacity() {
                return self.send(bytes);
            }
        }

        let queued = self.pending.extend_from_slice(bytes);
        debug_assert!(queued.is_ok());

        if self.pending.len() >= self.high_water {
            self.flush()?;
        }
        Ok(())
    }

    /// Queue a single command word
    pub fn append_word(&mut self, word: u32) -> Result<(), Error<L::Error>> {
        self.append(&word.to_le_bytes())
    }

    /// Stream a payload that may be larger than the ring
    ///
    /// Pending commands are flushed first so ordering is preserved, then
    /// `bytes` is handed to the channel in slices of
    /// [`StreamConfig::chunk_size`](crate::StreamConfig) without being
    /// copied.
    ///
    /// # Panics
    ///
    /// Panics if `bytes.len()` is not a multiple of 4.
    pub fn append_large(&mut self, bytes: &[u8]) -> Result<(), Error<L::Error>> {
        assert!(
            bytes.len() % 4 == 0,
            "payload length {} is not a multiple of 4",
            bytes.len()
        );
        self.flush()?;

        let chunk = (self.config.stream.chunk_size & !3).max(4);
        for slice in bytes.chunks(chunk) {
            self.send(slice)?;
        }
        Ok(())
    }

    /// Send everything in the pending buffer
    ///
    /// The buffer is emptied even if sending fails; after an error the ring
    /// state is unknown and the commands must be resubmitted.
    pub fn flush(&mut self) -> Result<(), Error<L::Error>> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let pending = core::mem::take(&mut self.pending);
        self.send(&pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StreamConfig};
    use crate::eve::PENDING_CAPACITY;
    use crate::testing::{map16, session, session_with};
    use evelink_protocol::RegisterMap;
    use proptest::prelude::*;
    use std::vec::Vec;

    #[test]
    fn test_append_buffers_below_high_water() {
        let mut eve = session(RegisterMap::FT81X);
        eve.append(&[0u8; 8]).unwrap();
        eve.append_word(0xFFFF_FF00).unwrap();

        assert_eq!(eve.pending_len(), 12);
        assert!(eve.link().ring_writes().is_empty());
    }

    #[test]
    fn test_append_flushes_at_high_water() {
        let mut eve = session(map16());
        assert_eq!(eve.high_water(), 8);

        eve.append(&[0u8; 4]).unwrap();
        eve.append(&[0u8; 4]).unwrap();

        assert_eq!(eve.pending_len(), 0);
        assert_eq!(eve.link().ring_writes(), &[8]);
    }

    #[test]
    fn test_flush_preserves_order() {
        let mut eve = session(RegisterMap::FT81X);
        eve.append_word(1).unwrap();
        eve.append_word(2).unwrap();
        eve.flush().unwrap();
        eve.flush().unwrap();

        let base = RegisterMap::FT81X.ring_base;
        assert_eq!(eve.link().peek32(base), 1);
        assert_eq!(eve.link().peek32(base + 4), 2);
        assert_eq!(eve.link().ring_bytes(), 8);
    }

    #[test]
    fn test_append_larger_than_buffer() {
        let config = Config {
            stream: StreamConfig {
                high_water: Some(PENDING_CAPACITY),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut eve = session_with(RegisterMap::BT82X, config);
        eve.append(&[0u8; 4]).unwrap();
        eve.append(&[0u8; PENDING_CAPACITY + 4]).unwrap();

        assert_eq!(eve.pending_len(), 0);
        assert_eq!(eve.link().ring_bytes(), PENDING_CAPACITY + 8);
    }

    #[test]
    fn test_append_large_slices() {
        let config = Config {
            stream: StreamConfig {
                chunk_size: 1024,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut eve = session_with(RegisterMap::BT82X, config);
        eve.append(&[0u8; 4]).unwrap();
        eve.append_large(&[0xAAu8; 2560]).unwrap();

        assert_eq!(eve.link().ring_writes(), &[4, 1024, 1024, 512]);
        assert_eq!(eve.pending_len(), 0);
    }

    #[test]
    #[should_panic(expected = "not a multiple of 4")]
    fn test_append_unaligned_panics() {
        let mut eve = session(RegisterMap::FT81X);
        let _ = eve.append(&[0u8; 6]);
    }

    proptest! {
        #[test]
        fn prop_pending_stays_aligned(words in proptest::collection::vec(0usize..600, 1..16)) {
            let mut eve = session(RegisterMap::FT81X);
            for count in words {
                let bytes: Vec<u8> = (0..count * 4).map(|i| i as u8).collect();
                eve.append(&bytes).unwrap();
                prop_assert_eq!(eve.pending_len() % 4, 0);
                prop_assert!(eve.pending_len() < eve.high_water());
            }
        }
    }
}
