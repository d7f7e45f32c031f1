//! `Write` adapter that masks everything passing through it.

use std::io::{self, ErrorKind, Read, Write};

use crate::masking::{BindingStats, MaskingFilter};

/// Decorates a writer with a [`MaskingFilter`].
///
/// `flush` does not release the held tail, since more input could still
/// complete a match; call [`MaskingWriter::finish`] at end of stream.
pub struct MaskingWriter<W: Write> {
    inner: W,
    filter: MaskingFilter,
}

impl<W: Write> MaskingWriter<W> {
    pub fn new(inner: W, filter: MaskingFilter) -> Self {
        Self { inner, filter }
    }

    pub fn filter(&self) -> &MaskingFilter {
        &self.filter
    }

    /// Mutable access for registering secrets mid-stream.
    pub fn filter_mut(&mut self) -> &mut MaskingFilter {
        &mut self.filter
    }

    /// Close the filter, write the held tail and return the inner writer
    /// together with the final match counts.
    pub fn finish(mut self) -> io::Result<(W, Vec<BindingStats>)> {
        let tail = self.filter.finish().map_err(io::Error::other)?;
        self.inner.write_all(&tail)?;
        self.inner.flush()?;
        let stats = self.filter.stats();
        Ok((self.inner, stats))
    }
}

impl<W: Write> Write for MaskingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let masked = self.filter.feed(buf).map_err(io::Error::other)?;
        self.inner.write_all(&masked)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Copy `reader` into `writer` in reads of `chunk_size` bytes, flushing
/// after every chunk. Returns the number of bytes read.
pub fn pump<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut MaskingWriter<W>,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        writer.flush()?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::Dialect;

    fn writer() -> MaskingWriter<Vec<u8>> {
        let mut filter = MaskingFilter::new();
        filter
            .register_secret("TOKEN", b"ab'cd", Dialect::Posix)
            .unwrap();
        MaskingWriter::new(Vec::new(), filter)
    }

    #[test]
    fn test_write_and_finish() {
        let mut w = writer();
        w.write_all(b"+ echo 'ab'\"'").unwrap();
        w.write_all(b"\"'cd'\nab'cd\n").unwrap();
        let (out, stats) = w.finish().unwrap();
        assert_eq!(out, b"+ echo ****\n****\n");
        assert_eq!(stats[0].masked, 2);
    }

    #[test]
    fn test_pump_small_chunks() {
        let mut w = writer();
        let mut input: &[u8] = b"start \"ab'cd\" end";
        let read = pump(&mut input, &mut w, 3).unwrap();
        assert_eq!(read, 17);
        let (out, _) = w.finish().unwrap();
        assert_eq!(out, b"start **** end");
    }

    #[test]
    fn test_write_after_finish_fails() {
        let mut filter = MaskingFilter::new();
        filter.finish().unwrap();
        let mut w = MaskingWriter::new(Vec::new(), filter);
        assert!(w.write(b"x").is_err());
    }
}
