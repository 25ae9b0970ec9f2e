//! Coprocessor fault reports
//!
//! When the coprocessor faults it writes a NUL-terminated ASCII message into
//! a fixed-size buffer, e.g. `"ERROR: image has no end"`.

use core::fmt;

use heapless::String;

/// Largest fault report any supported family produces
pub const MAX_FAULT_REPORT: usize = 128;

/// Decoded fault message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultReport {
    message: String<MAX_FAULT_REPORT>,
}

impl FaultReport {
    /// Decode a raw fault buffer
    ///
    /// The message ends at the first zero byte. Bytes outside printable
    /// ASCII are replaced with `?`.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let mut message = String::new();
        for &byte in &raw[..end] {
            let ch = if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '?'
            };
            if message.push(ch).is_err() {
                break;
            }
        }
        Self { message }
    }

    /// The message text
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Whether the report holds no text
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

impl fmt::Display for FaultReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_at_nul() {
        let mut raw = [0u8; 128];
        raw[..21].copy_from_slice(b"ERROR: invalid format");
        raw[30] = b'x'; // junk after terminator

        let report = FaultReport::from_bytes(&raw);
        assert_eq!(report.message(), "ERROR: invalid format");
    }

    #[test]
    fn test_unterminated_buffer() {
        let report = FaultReport::from_bytes(b"out of memory");
        assert_eq!(report.message(), "out of memory");
    }

    #[test]
    fn test_non_ascii_replaced() {
        let report = FaultReport::from_bytes(&[b'o', b'k', 0xFF, b'\n', 0]);
        assert_eq!(report.message(), "ok??");
    }

    #[test]
    fn test_empty_report() {
        let report = FaultReport::from_bytes(&[0u8; 16]);
        assert!(report.is_empty());
    }
}
