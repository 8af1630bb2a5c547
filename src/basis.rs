// Random-access basis for patch application.
//
// COPY commands name absolute basis ranges, so the patcher needs positioned
// reads. In-memory bases also expose direct slices to skip the copy buffer.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Basis trait
// ---------------------------------------------------------------------------

/// Provides basis data for COPY commands.
pub trait Basis {
    /// Total basis length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes at `offset..offset + buf.len()`.
    ///
    /// Callers check the range against [`len`](Self::len) first.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Direct slice access for in-memory bases.
    fn slice(&self, _offset: u64, _len: usize) -> Option<&[u8]> {
        None
    }
}

fn mem_range(data: &[u8], offset: u64, len: usize) -> Option<std::ops::Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(len)?;
    (end <= data.len()).then_some(start..end)
}

fn mem_read(data: &[u8], offset: u64, buf: &mut [u8]) -> Result<()> {
    let range = mem_range(data, offset, buf.len()).ok_or(Error::OutOfRangeCopy {
        offset,
        len: buf.len() as u64,
        basis_len: data.len() as u64,
    })?;
    buf.copy_from_slice(&data[range]);
    Ok(())
}

impl Basis for &[u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        mem_read(self, offset, buf)
    }

    fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        mem_range(self, offset, len).map(|r| &self[r])
    }
}

impl Basis for Vec<u8> {
    fn len(&self) -> u64 {
        Vec::len(self) as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        mem_read(self, offset, buf)
    }

    fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        mem_range(self, offset, len).map(|r| &self[r])
    }
}

impl<B: Basis + ?Sized> Basis for &mut B {
    fn len(&self) -> u64 {
        (**self).len()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_at(offset, buf)
    }

    fn slice(&self, offset: u64, len: usize) -> Option<&[u8]> {
        (**self).slice(offset, len)
    }
}

/// Placeholder basis for jobs that never copy (signature, delta).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBasis;

impl Basis for NoBasis {
    fn len(&self) -> u64 {
        0
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        Err(Error::OutOfRangeCopy {
            offset,
            len: buf.len() as u64,
            basis_len: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// Seekable basis
// ---------------------------------------------------------------------------

/// Basis backed by any `Read + Seek` (typically a `File`).
///
/// The length is measured once, at construction, by seeking to the end.
#[derive(Debug)]
pub struct SeekBasis<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> SeekBasis<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Basis for SeekBasis<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(buf)?;
        Ok(())
    }
}
