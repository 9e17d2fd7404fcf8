//! Minimal safe wrapper around the one-shot zlib functions.
//!
//! Datafile blocks are compressed as a whole with `compress` and restored
//! with `uncompress` into a buffer of the size recorded next to them, so the
//! streaming API is not needed.

extern crate libz_sys as raw;

use libc::c_ulong;
use std::error;
use std::fmt;

#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Error {
    inner: i32,
}

impl Error {
    pub fn from_raw(val: i32) -> Result<(), Error> {
        if val == raw::Z_OK {
            Ok(())
        } else {
            Err(Error { inner: val })
        }
    }
    pub fn kind(self) -> Option<ErrorKind> {
        Some(match self.inner {
            raw::Z_MEM_ERROR => ErrorKind::OutOfMemory,
            raw::Z_BUF_ERROR => ErrorKind::OutputBufferTooSmall,
            raw::Z_DATA_ERROR => ErrorKind::InvalidInput,
            _ => return None,
        })
    }
    pub fn raw_error(self) -> i32 {
        self.inner
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    OutOfMemory,
    OutputBufferTooSmall,
    InvalidInput,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            Some(k) => k.fmt(f),
            None => write!(f, "UnknownZlibError({})", self.raw_error()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            Some(ErrorKind::OutOfMemory) => f.write_str("zlib ran out of memory"),
            Some(ErrorKind::OutputBufferTooSmall) => f.write_str("zlib output buffer too small"),
            Some(ErrorKind::InvalidInput) => f.write_str("corrupt zlib stream"),
            None => write!(f, "unknown zlib error {}", self.raw_error()),
        }
    }
}

impl error::Error for Error {}

/// Uncompresses `src` into `dest`, returning the number of bytes written.
///
/// On error, `dest` may or may not have been modified.
pub fn uncompress(dest: &mut [u8], src: &[u8]) -> Result<usize, Error> {
    let mut output_size = dest.len() as c_ulong;
    Error::from_raw(unsafe {
        raw::uncompress(
            dest.as_mut_ptr(),
            &mut output_size,
            src.as_ptr(),
            src.len() as c_ulong,
        )
    })
    .map(|()| output_size as usize)
}

/// Uncompresses `src`, which is expected to expand to exactly `len` bytes.
///
/// A stream that decodes to a different length is reported as
/// `ErrorKind::InvalidInput`.
pub fn uncompress_vec(src: &[u8], len: usize) -> Result<Vec<u8>, Error> {
    let mut dest = vec![0; len];
    let written = uncompress(&mut dest, src)?;
    if written != len {
        return Err(Error { inner: raw::Z_DATA_ERROR });
    }
    Ok(dest)
}

/// Compresses `src` into `dest`, returning the number of bytes written.
///
/// On error, `dest` may or may not have been modified.
pub fn compress(dest: &mut [u8], src: &[u8]) -> Result<usize, Error> {
    let mut output_size = dest.len() as c_ulong;
    Error::from_raw(unsafe {
        raw::compress(
            dest.as_mut_ptr(),
            &mut output_size,
            src.as_ptr(),
            src.len() as c_ulong,
        )
    })
    .map(|()| output_size as usize)
}

/// Upper bound on the output size of `compress` for `source_len` input bytes.
pub fn compress_bound(source_len: usize) -> usize {
    (unsafe { raw::compressBound(source_len as c_ulong) }) as usize
}

pub fn compress_vec(source: &[u8]) -> Result<Vec<u8>, Error> {
    let mut dest = vec![0; compress_bound(source.len())];
    let output_length = compress(&mut dest, source)?;
    dest.truncate(output_length);
    Ok(dest)
}

#[cfg(test)]
mod test {
    use super::compress_vec;
    use super::uncompress_vec;
    use super::ErrorKind;

    #[test]
    fn restores_input() {
        let input: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        let compressed = compress_vec(&input).unwrap();
        assert!(compressed.len() < input.len());
        assert_eq!(uncompress_vec(&compressed, input.len()).unwrap(), input);
    }

    #[test]
    fn empty() {
        let compressed = compress_vec(b"").unwrap();
        assert_eq!(uncompress_vec(&compressed, 0).unwrap(), b"");
    }

    #[test]
    fn wrong_length() {
        let compressed = compress_vec(b"teeworlds").unwrap();
        let err = uncompress_vec(&compressed, 20).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
        let err = uncompress_vec(&compressed, 3).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::OutputBufferTooSmall));
    }

    #[test]
    fn garbage() {
        let err = uncompress_vec(b"not zlib at all", 16).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::InvalidInput));
    }
}
