use std::io;

use crate::error::Error;

use super::{private, Read};

/// A forward-only reader over an IO stream
#[derive(Debug)]
pub struct IoReader<R> {
    // an io reader
    reader: R,
    buf: Vec<u8>,
}

impl<R: io::Read> IoReader<R> {
    /// Creates a new reader over an IO stream
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Consume the wrapper and obtain the inner reader.
    ///
    /// Bytes already pulled into the peek buffer are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Pop the first buffered byte
    fn pop_first(&mut self) -> Option<u8> {
        match self.buf.is_empty() {
            true => None,
            false => Some(self.buf.remove(0)),
        }
    }

    /// Fill the internal buffer up to the given length
    fn fill_buffer(&mut self, len: usize) -> Result<(), Error> {
        let l = self.buf.len();
        if l < len {
            self.buf.resize(len, 0);
            self.reader
                .read_exact(&mut self.buf[l..])
                .map_err(Error::reading)?;
        }
        Ok(())
    }
}

impl<R: io::Read> private::Sealed for IoReader<R> {}

impl<R: io::Read> Read for IoReader<R> {
    fn peek(&mut self) -> Result<u8, Error> {
        match self.buf.first() {
            Some(b) => Ok(*b),
            None => {
                self.fill_buffer(1)?;
                Ok(self.buf[0])
            }
        }
    }

    fn next(&mut self) -> Result<u8, Error> {
        match self.pop_first() {
            Some(b) => Ok(b),
            None => {
                let mut buf = [0u8; 1];
                self.reader.read_exact(&mut buf).map_err(Error::reading)?;
                Ok(buf[0])
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let n = buf.len();
        let l = self.buf.len();

        if l < n {
            buf[..l].copy_from_slice(&self.buf);
            self.reader
                .read_exact(&mut buf[l..])
                .map_err(Error::reading)?;
            self.buf.clear();
        } else {
            buf.copy_from_slice(&self.buf[..n]);
            self.buf.drain(..n);
        }
        Ok(())
    }
}
