use bstr::{BStr, ByteSlice};

/// Like `FromStr`, but for input that might not be valid UTF-8, e.g., lines
/// read from stdin.
pub trait FromBytes: Sized {
    type Err;

    fn from_bytes(bytes: &[u8]) -> Result<Self, Self::Err>;
}

/// Adds `str::parse` to byte slices, for any type implementing `FromBytes`.
pub trait BytesExt {
    // Not `as_bytes`, which `bstr` and `str` already claim.
    fn as_byte_slice(&self) -> &[u8];

    fn parse<T: FromBytes>(&self) -> Result<T, <T as FromBytes>::Err> {
        FromBytes::from_bytes(self.as_byte_slice())
    }
}

impl BytesExt for [u8] {
    fn as_byte_slice(&self) -> &[u8] {
        self
    }
}

/// A line of datetimes read from stdin.
#[derive(Clone, Copy, Debug)]
pub struct Line<'a> {
    /// Counted from 1.
    number: usize,
    /// Includes the `\n` or `\r\n` terminator, except possibly on the last
    /// line.
    raw: &'a BStr,
}

impl<'a> Line<'a> {
    pub fn new(number: usize, raw: &'a [u8]) -> Line<'a> {
        Line { number, raw: raw.as_bstr() }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Returns the line without its terminator.
    pub fn content(&self) -> &'a BStr {
        let raw: &'a [u8] = self.raw;
        let line = raw.strip_suffix(b"\n").unwrap_or(raw);
        line.strip_suffix(b"\r").unwrap_or(line).as_bstr()
    }
}

/// Line iteration over byte oriented readers, where the callback can fail
/// with an `anyhow::Error`.
pub trait BufReadExt: std::io::BufRead {
    /// Calls `for_each_line` with every line in this reader until it returns
    /// `false` or an error, or until the reader is exhausted.
    ///
    /// Lines don't have to be valid UTF-8.
    fn for_byte_line<F>(&mut self, mut for_each_line: F) -> anyhow::Result<()>
    where
        Self: Sized,
        F: FnMut(Line<'_>) -> anyhow::Result<bool>,
    {
        let mut buf = vec![];
        for number in 1.. {
            buf.clear();
            if self.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            if !for_each_line(Line::new(number, &buf))? {
                break;
            }
        }
        Ok(())
    }
}

impl<B: std::io::BufRead> BufReadExt for B {}
