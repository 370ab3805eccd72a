use std::io;

use crate::error::Error;
use crate::pool::{self, PooledBuffer};

use super::{private, Read, ReadSeek};

/// Bytes pulled from the transport per refill
const REFILL_CHUNK: usize = 4096;

/// Adapts a forward-only [`std::io::Read`] into a [`ReadSeek`] by caching
/// every byte it has read in a pooled buffer.
///
/// Required by skip functions when the underlying transport cannot seek.
/// The wrapper owns an internal offset and an EOF flag; it is not
/// thread-safe and caches the whole visited prefix of the stream, so scope
/// one to a single decode/skip pass.
#[derive(Debug)]
pub struct BufferedSeeker<R> {
    inner: R,
    cache: PooledBuffer,
    pos: usize,
    eof: bool,
}

impl<R: io::Read> BufferedSeeker<R> {
    /// Creates a new seekable wrapper over a forward-only reader
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: pool::acquire(REFILL_CHUNK),
            pos: 0,
            eof: false,
        }
    }

    /// Consume the wrapper and obtain the inner reader.
    ///
    /// Cached bytes beyond the current position are lost to the caller.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Whether the end of the transport has been observed
    pub fn saw_eof(&self) -> bool {
        self.eof
    }

    /// Make at least `n` unconsumed bytes available in the cache
    fn ensure(&mut self, n: usize) -> Result<(), Error> {
        while self.cache.len() - self.pos < n {
            if self.eof {
                return Err(Error::eof());
            }
            let len = self.cache.len();
            self.cache.resize(len + REFILL_CHUNK, 0);
            let read = self.inner.read(&mut self.cache[len..]).map_err(Error::reading)?;
            self.cache.truncate(len + read);
            if read == 0 {
                self.eof = true;
            }
        }
        Ok(())
    }
}

impl<R: io::Read> private::Sealed for BufferedSeeker<R> {}

impl<R: io::Read> Read for BufferedSeeker<R> {
    fn peek(&mut self) -> Result<u8, Error> {
        self.ensure(1)?;
        Ok(self.cache[self.pos])
    }

    fn next(&mut self) -> Result<u8, Error> {
        self.ensure(1)?;
        let b = self.cache[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.ensure(buf.len())?;
        buf.copy_from_slice(&self.cache[self.pos..self.pos + buf.len()]);
        self.pos += buf.len();
        Ok(())
    }
}

impl<R: io::Read> ReadSeek for BufferedSeeker<R> {
    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn seek_ahead(&mut self, n: usize) -> Result<(), Error> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    fn rewind_to(&mut self, position: u64) -> Result<(), Error> {
        if position > self.pos as u64 {
            return Err(
                Error::invalid_value("cannot rewind forward").with_detail("position", position)
            );
        }
        self.pos = position as usize;
        Ok(())
    }

    fn as_read(&mut self) -> &mut (dyn Read + '_) {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{BufferedSeeker, Read, ReadSeek};

    /// An io::Read that hands out one byte at a time
    struct Trickle<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> std::io::Read for Trickle<'a> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos == self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    const DATA: &[u8] = &[10, 11, 12, 13, 14, 15];

    #[test]
    fn test_read_through_cache() {
        let mut seeker = BufferedSeeker::new(DATA);

        assert_eq!(seeker.peek().unwrap(), 10);
        assert_eq!(seeker.next().unwrap(), 10);

        let mut buf = [0u8; 3];
        seeker.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [11, 12, 13]);
        assert_eq!(seeker.position(), 4);
    }

    #[test]
    fn test_seek_and_rewind() {
        let mut seeker = BufferedSeeker::new(DATA);

        seeker.seek_ahead(4).unwrap();
        assert_eq!(seeker.next().unwrap(), 14);

        seeker.rewind_to(1).unwrap();
        assert_eq!(seeker.next().unwrap(), 11);
        assert!(seeker.rewind_to(100).is_err());
    }

    #[test]
    fn test_trickling_transport() {
        let mut seeker = BufferedSeeker::new(Trickle { data: DATA, pos: 0 });

        seeker.seek_ahead(5).unwrap();
        assert_eq!(seeker.next().unwrap(), 15);
        assert!(seeker.next().is_err());
        assert!(seeker.saw_eof());
    }

    #[test]
    fn test_seek_past_end() {
        let mut seeker = BufferedSeeker::new(DATA);
        assert!(seeker.seek_ahead(DATA.len() + 1).is_err());
    }
}
