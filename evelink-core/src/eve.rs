//! Driver session
//!
//! [`Eve`] owns the link and a delay source for the lifetime of a session
//! with one physical coprocessor. All state the protocol needs between
//! calls lives here: the pending command buffer and the cached count of
//! free ring bytes. Operations are split across modules by concern:
//!
//! | Module | Operations |
//! |--------|------------|
//! | [`bus`](crate::bus) | register and memory access, read framing |
//! | [`stream`](crate::stream) | `append`, `append_large`, `flush` |
//! | [`channel`](crate::channel) | `send`, `refresh_space`, `wait_idle` |
//! | [`fault`](crate::fault) | `fault_report`, `recover` |
//! | [`result`](crate::result) | `previous`, `result` |
//! | [`boot`](crate::boot) | `boot` |
//! | [`surface`](crate::surface) | `render_target` |

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;
use evelink_protocol::RegisterMap;
use heapless::Vec;

use crate::config::Config;

/// Capacity of the pending command buffer in bytes
pub const PENDING_CAPACITY: usize = 4096;

/// A command-channel session with one coprocessor
pub struct Eve<L, D> {
    pub(crate) link: L,
    pub(crate) delay: D,
    pub(crate) regs: RegisterMap,
    pub(crate) config: Config,
    pub(crate) pending: Vec<u8, PENDING_CAPACITY>,
    pub(crate) space: u32,
    pub(crate) high_water: usize,
}

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Create a session
    ///
    /// `regs` is usually a [`DeviceFamily`](crate::DeviceFamily). The chip is
    /// not touched until the first operation; call [`boot`](Self::boot)
    /// first unless it is already running.
    ///
    /// # Panics
    ///
    /// Panics if the register map is inconsistent (see
    /// [`RegisterMap::is_valid`]).
    pub fn new(link: L, delay: D, regs: impl Into<RegisterMap>, config: Config) -> Self {
        let regs = regs.into();
        assert!(regs.is_valid(), "inconsistent register map");

        let high_water = high_water_mark(&regs, &config);
        Self {
            link,
            delay,
            regs,
            config,
            pending: Vec::new(),
            space: 0,
            high_water,
        }
    }

    /// Tear down the session, returning the link and delay
    ///
    /// Pending commands that were never flushed are dropped.
    pub fn release(self) -> (L, D) {
        (self.link, self.delay)
    }

    /// Register map in use
    pub fn registers(&self) -> &RegisterMap {
        &self.regs
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrow the link
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the link
    ///
    /// Transactions issued directly on the link bypass the cached space
    /// count; call [`refresh_space`](Self::refresh_space) afterwards if they
    /// touched the ring.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Bytes waiting in the pending buffer
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending-buffer length that triggers an automatic flush
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Free ring bytes as last observed, minus bytes written since
    pub fn cached_space(&self) -> u32 {
        self.space
    }
}

/// Derive the flush threshold
///
/// Half the idle ring leaves room for the coprocessor to keep working on the
/// previous block while the next one is written in a single pass.
fn high_water_mark(regs: &RegisterMap, config: &Config) -> usize {
    let mark = config
        .stream
        .high_water
        .unwrap_or(regs.idle_space as usize / 2);
    (mark & !3).clamp(4, PENDING_CAPACITY)
}
