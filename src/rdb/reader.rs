use std::io::{self, Read};

use crc::{Crc, Digest, CRC_64_REDIS};

use crate::common::{ErrorKind, Result};

static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_REDIS);

// Chunk size used when skipping over payloads we do not need to look at.
const SKIP_CHUNK_BYTES: usize = 8 * 1024;

/// Sequential, bounded view of the dump file.
///
/// Every read is checked against the number of bytes left in the file before touching
/// the underlying reader, so a corrupt length field can never trigger a huge allocation.
pub(crate) trait Source {
    /// Bytes consumed so far.
    fn offset(&self) -> u64;

    /// Bytes left until the end of the input.
    fn remaining(&self) -> u64;

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    fn skip(&mut self, n: u64) -> Result<()>;

    fn ensure(&self, n: u64) -> Result<()> {
        let remaining = self.remaining();
        if n > remaining {
            Err(ErrorKind::TruncatedInput {
                offset: self.offset(),
                needed: n,
                remaining,
            }
            .into())
        } else {
            Ok(())
        }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0_u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_u32_be(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    fn read_u64_be(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_be_bytes)
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_i64_le(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    fn read_vec(&mut self, n: u64) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut buf = vec![0_u8; n as usize];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// [`Source`] backed by any [`Read`] whose total size is known up front.
pub(crate) struct Reader<R> {
    inner: R,
    offset: u64,
    size: u64,
    // None when checksum verification is turned off.
    digest: Option<Digest<'static, u64>>,
}

impl<R: Read> Reader<R> {
    pub(crate) fn new(inner: R, size: u64, verify_checksum: bool) -> Self {
        Self {
            inner,
            offset: 0,
            size,
            digest: verify_checksum.then(|| CRC64.digest()),
        }
    }

    /// Finish the running crc64 over everything read so far and restart it.
    pub(crate) fn take_checksum(&mut self) -> Option<u64> {
        self.digest
            .as_mut()
            .map(|digest| std::mem::replace(digest, CRC64.digest()).finalize())
    }
}

impl<R: Read> Source for Reader<R> {
    fn offset(&self) -> u64 {
        self.offset
    }

    fn remaining(&self) -> u64 {
        self.size.saturating_sub(self.offset)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let n = buf.len() as u64;
        self.ensure(n)?;

        let offset = self.offset;
        self.inner.read_exact(buf).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                // The file shrank under us or the declared size was wrong.
                crate::Error::from(ErrorKind::TruncatedInput {
                    offset,
                    needed: n,
                    remaining: 0,
                })
            } else {
                crate::Error::from(err)
            }
        })?;

        if let Some(digest) = self.digest.as_mut() {
            digest.update(buf);
        }
        self.offset += n;

        Ok(())
    }

    fn skip(&mut self, n: u64) -> Result<()> {
        self.ensure(n)?;

        let mut scratch = [0_u8; SKIP_CHUNK_BYTES];
        let mut left = n;
        while left > 0 {
            let chunk = std::cmp::min(left, SKIP_CHUNK_BYTES as u64) as usize;
            self.read_exact(&mut scratch[..chunk])?;
            left -= chunk as u64;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn checksum(bytes: &[u8]) -> u64 {
    CRC64.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_advances_offset() {
        let data = [1_u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut reader = Reader::new(&data[..], data.len() as u64, false);

        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_u32_be().unwrap(), 0x02030405);
        assert_eq!(reader.offset(), 5);
        assert_eq!(reader.remaining(), 4);

        reader.skip(3).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 9);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn declared_length_past_end() {
        let data = [0_u8; 4];
        let mut reader = Reader::new(&data[..], data.len() as u64, false);
        reader.skip(1).unwrap();

        let err = reader.read_vec(1 << 40).unwrap_err();
        match err.kind() {
            ErrorKind::TruncatedInput {
                offset,
                needed,
                remaining,
            } => {
                assert_eq!(*offset, 1);
                assert_eq!(*needed, 1 << 40);
                assert_eq!(*remaining, 3);
            }
            kind => panic!("unexpected {:?}", kind),
        }
        // Nothing consumed on failure.
        assert_eq!(reader.offset(), 1);
    }

    #[test]
    fn short_underlying_reader() {
        // Declared size larger than the actual data.
        let data = [0_u8; 2];
        let mut reader = Reader::new(&data[..], 10, false);

        let err = reader.read_vec(4).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TruncatedInput { .. }));
    }

    #[test]
    fn checksum_covers_skipped_bytes() {
        let data: Vec<u8> = (0..20_000_u32).map(|n| (n % 251) as u8).collect();
        let mut reader = Reader::new(&data[..], data.len() as u64, true);

        reader.read_vec(100).unwrap();
        reader.skip(data.len() as u64 - 100).unwrap();

        assert_eq!(reader.take_checksum(), Some(checksum(&data)));
    }

    #[test]
    fn checksum_disabled() {
        let data = [0_u8; 1];
        let mut reader = Reader::new(&data[..], 1, false);
        reader.read_u8().unwrap();
        assert_eq!(reader.take_checksum(), None);
    }
}
