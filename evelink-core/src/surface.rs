//! Render surfaces
//!
//! A [`Surface`] names a rectangular pixel buffer in device memory. It is
//! plain data; the only command that consumes it here is the render-target
//! selection.

use embedded_hal::delay::DelayNs;
use evelink_hal::Link;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::eve::Eve;

/// Render-target selection command
pub const CMD_RENDERTARGET: u32 = 0xFFFF_FF8D;

/// Bitmap pixel formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PixelFormat {
    Argb1555,
    L1,
    L4,
    L8,
    Rgb332,
    Argb2,
    Argb4,
    Rgb565,
    Paletted8,
    L2,
    Rgb8,
    Argb8,
}

impl PixelFormat {
    /// Format code as the coprocessor expects it
    pub const fn code(self) -> u16 {
        match self {
            PixelFormat::Argb1555 => 0,
            PixelFormat::L1 => 1,
            PixelFormat::L4 => 2,
            PixelFormat::L8 => 3,
            PixelFormat::Rgb332 => 4,
            PixelFormat::Argb2 => 5,
            PixelFormat::Argb4 => 6,
            PixelFormat::Rgb565 => 7,
            PixelFormat::Paletted8 => 16,
            PixelFormat::L2 => 17,
            PixelFormat::Rgb8 => 19,
            PixelFormat::Argb8 => 20,
        }
    }

    /// Bits per pixel
    pub const fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::L1 => 1,
            PixelFormat::L2 => 2,
            PixelFormat::L4 => 4,
            PixelFormat::L8
            | PixelFormat::Rgb332
            | PixelFormat::Argb2
            | PixelFormat::Paletted8 => 8,
            PixelFormat::Argb1555 | PixelFormat::Argb4 | PixelFormat::Rgb565 => 16,
            PixelFormat::Rgb8 => 24,
            PixelFormat::Argb8 => 32,
        }
    }
}

/// A pixel buffer in device memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Surface {
    /// Start address
    pub addr: u32,
    /// Pixel format
    pub format: PixelFormat,
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
}

impl Surface {
    pub const fn new(addr: u32, format: PixelFormat, width: u16, height: u16) -> Self {
        Self {
            addr,
            format,
            width,
            height,
        }
    }

    /// Bytes per row, rounded up to whole bytes
    pub const fn stride(&self) -> u32 {
        (self.width as u32 * self.format.bits_per_pixel() + 7) / 8
    }

    /// Total buffer size in bytes
    ///
    /// Large surfaces exceed 4 GiB, hence the wider type.
    pub const fn bytes(&self) -> u64 {
        self.stride() as u64 * self.height as u64
    }
}

impl<L, D> Eve<L, D>
where
    L: Link,
    D: DelayNs,
{
    /// Queue a command directing rendering into `surface`
    pub fn render_target(&mut self, surface: &Surface) -> Result<(), Error<L::Error>> {
        let mut cmd = [0u8; 16];
        cmd[0..4].copy_from_slice(&CMD_RENDERTARGET.to_le_bytes());
        cmd[4..8].copy_from_slice(&surface.addr.to_le_bytes());
        cmd[8..10].copy_from_slice(&surface.format.code().to_le_bytes());
        cmd[10..12].copy_from_slice(&surface.width.to_le_bytes());
        cmd[12..14].copy_from_slice(&surface.height.to_le_bytes());
        self.append(&cmd)
    }
}
