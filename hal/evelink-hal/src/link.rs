//! Byte-level transport abstraction
//!
//! A [`Link`] moves raw bytes to and from the coprocessor. It knows nothing
//! about addresses, ready bytes or the command ring; those live in
//! `evelink-protocol` and `evelink-core`.

/// Raw byte transport to the coprocessor
///
/// Implementations differ by physical adapter. The driver owns its link
/// exclusively for the lifetime of a session, so no method needs to be
/// re-entrant.
pub trait Link {
    /// Error type for transport operations
    type Error;

    /// Assert chip select, starting a transaction
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Release chip select, ending a transaction
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Clock out `data` within the current transaction
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Clock in `buf.len()` bytes within the current transaction
    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Drive the hardware reset (power-down) line active
    fn assert_reset(&mut self) -> Result<(), Self::Error>;

    /// Release the hardware reset line
    fn release_reset(&mut self) -> Result<(), Self::Error>;

    /// Largest payload a single `write` call may carry
    ///
    /// Bridges with small USB packets override this; callers chunk longer
    /// writes.
    fn max_transfer(&self) -> usize {
        usize::MAX
    }

    /// Number of bytes to read speculatively while waiting for the ready
    /// sentinel
    ///
    /// This is a heuristic for the device's read latency on this transport.
    /// The read path falls back to byte polling when it is too small.
    fn read_window(&self) -> usize {
        16
    }
}

/// Run `f` inside a chip-select scope
///
/// The device is deselected on every exit path. If `f` fails, its error is
/// returned even when the deselect also fails; otherwise a deselect failure
/// is reported.
pub fn transaction<L, R, E, F>(link: &mut L, f: F) -> Result<R, E>
where
    L: Link + ?Sized,
    E: From<L::Error>,
    F: FnOnce(&mut L) -> Result<R, E>,
{
    link.select()?;
    let result = f(link);
    let released = link.deselect();

    let value = result?;
    released?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum Op {
        Select,
        Deselect,
        Write(usize),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct BusError;

    struct Recorder {
        ops: [Option<Op>; 8],
        len: usize,
        fail_deselect: bool,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                ops: Default::default(),
                len: 0,
                fail_deselect: false,
            }
        }

        fn push(&mut self, op: Op) {
            self.ops[self.len] = Some(op);
            self.len += 1;
        }
    }

    impl Link for Recorder {
        type Error = BusError;

        fn select(&mut self) -> Result<(), BusError> {
            self.push(Op::Select);
            Ok(())
        }

        fn deselect(&mut self) -> Result<(), BusError> {
            self.push(Op::Deselect);
            if self.fail_deselect {
                Err(BusError)
            } else {
                Ok(())
            }
        }

        fn write(&mut self, data: &[u8]) -> Result<(), BusError> {
            self.push(Op::Write(data.len()));
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<(), BusError> {
            buf.fill(0);
            Ok(())
        }

        fn assert_reset(&mut self) -> Result<(), BusError> {
            Ok(())
        }

        fn release_reset(&mut self) -> Result<(), BusError> {
            Ok(())
        }
    }

    #[test]
    fn test_transaction_wraps_select() {
        let mut link = Recorder::new();
        let out: Result<u8, BusError> = transaction(&mut link, |l| {
            l.write(&[1, 2, 3])?;
            Ok(7)
        });

        assert_eq!(out, Ok(7));
        assert_eq!(link.ops[0], Some(Op::Select));
        assert_eq!(link.ops[1], Some(Op::Write(3)));
        assert_eq!(link.ops[2], Some(Op::Deselect));
        assert_eq!(link.len, 3);
    }

    #[test]
    fn test_transaction_deselects_on_error() {
        let mut link = Recorder::new();
        let out: Result<(), BusError> = transaction(&mut link, |_| Err(BusError));

        assert_eq!(out, Err(BusError));
        assert_eq!(link.ops[1], Some(Op::Deselect));
    }

    #[test]
    fn test_transaction_reports_deselect_failure() {
        let mut link = Recorder::new();
        link.fail_deselect = true;
        let out: Result<(), BusError> = transaction(&mut link, |_| Ok(()));

        assert_eq!(out, Err(BusError));
    }

    #[test]
    fn test_default_tunables() {
        let link = Recorder::new();
        assert_eq!(link.max_transfer(), usize::MAX);
        assert_eq!(link.read_window(), 16);
    }
}
