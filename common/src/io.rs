use std::error;
use std::fmt;
use std::io;
use std::io::Read;

use crate::num::Widen;

struct SeekOverflow(());

pub fn seek_overflow() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, SeekOverflow(()))
}

impl fmt::Debug for SeekOverflow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SeekOverflow").finish()
    }
}

impl error::Error for SeekOverflow {}

impl fmt::Display for SeekOverflow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("overflow while calculating seek offset")
    }
}

pub trait ReadExt: Read {
    /// Reads until `buffer` is full or the end of the input is reached,
    /// retrying on `Interrupted`. Returns the number of bytes read.
    fn read_retry(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut read = 0;
        while read != buffer.len() {
            match self.read(&mut buffer[read..]) {
                Ok(0) => break,
                Ok(r) => read += r,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(read)
    }
}

impl<T: Read> ReadExt for T {}

pub trait FileExt {
    /// Positional variant of `ReadExt::read_retry`. Doesn't move the file
    /// cursor.
    fn read_offset_retry(&self, buffer: &mut [u8], offset: u64) -> io::Result<usize>;
}

#[cfg(feature = "file_offset")]
impl FileExt for std::fs::File {
    fn read_offset_retry(&self, buffer: &mut [u8], offset: u64) -> io::Result<usize> {
        // Make sure the additions in this function don't overflow.
        offset
            .checked_add(buffer.len().u64())
            .ok_or_else(seek_overflow)?;

        let mut read = 0;
        while read != buffer.len() {
            match file_offset::FileExt::read_offset(self, &mut buffer[read..], offset + read.u64())
            {
                Ok(0) => break,
                Ok(r) => read += r,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(read)
    }
}

#[cfg(test)]
mod test {
    use super::ReadExt;

    #[test]
    fn read_retry_stops_at_end() {
        let mut input: &[u8] = b"abc";
        let mut buffer = [0; 8];
        assert_eq!(input.read_retry(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer[..3], b"abc");
    }
}
