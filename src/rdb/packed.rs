//! Walkers over packed (compact) encodings.
//!
//! Each walker validates the structure of an in-memory blob and returns the number of
//! entries it holds without materializing them.

use bytes::Buf;

use crate::common::{ErrorKind, Result};

const ZIPLIST_HEADER_BYTES: usize = 4 + 4 + 2;
const ZIPLIST_END: u8 = 0xFF;
const ZIPLIST_BIG_PREVLEN: u8 = 0xFE;
// zllen saturates at this value, the real count must be found by walking.
const ZIPLIST_UNKNOWN_COUNT: u16 = u16::MAX;

const LISTPACK_HEADER_BYTES: usize = 4 + 2;
const LISTPACK_END: u8 = 0xFF;
const LISTPACK_UNKNOWN_COUNT: u16 = u16::MAX;

const INTSET_HEADER_BYTES: usize = 4 + 4;

const ZIPMAP_BIG_LEN: u8 = 254;
const ZIPMAP_END: u8 = 0xFF;

/// Packed structure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Packed {
    Ziplist,
    Listpack,
    Intset,
    Zipmap,
}

impl Packed {
    fn name(self) -> &'static str {
        match self {
            Packed::Ziplist => "ziplist",
            Packed::Listpack => "listpack",
            Packed::Intset => "intset",
            Packed::Zipmap => "zipmap",
        }
    }

    /// Count the entries of `blob`. `offset` is the file offset of the blob for errors.
    pub(crate) fn entries(self, blob: &[u8], offset: u64) -> Result<u64> {
        let mut walker = Walker {
            kind: self,
            blob,
            buf: blob,
            offset,
        };
        match self {
            Packed::Ziplist => walker.ziplist(),
            Packed::Listpack => walker.listpack(),
            Packed::Intset => walker.intset(),
            Packed::Zipmap => walker.zipmap(),
        }
    }

    /// Count entries that come in groups of `group` (field/value pairs, member/score pairs...).
    pub(crate) fn groups(self, blob: &[u8], offset: u64, group: u64) -> Result<u64> {
        let entries = self.entries(blob, offset)?;
        if entries % group != 0 {
            return Err(ErrorKind::MalformedLength {
                offset,
                description: format!(
                    "{} holds {} entries, not a multiple of {}",
                    self.name(),
                    entries,
                    group
                ),
            }
            .into());
        }
        Ok(entries / group)
    }
}

struct Walker<'a> {
    kind: Packed,
    blob: &'a [u8],
    buf: &'a [u8],
    offset: u64,
}

impl<'a> Walker<'a> {
    fn ziplist(&mut self) -> Result<u64> {
        self.need(ZIPLIST_HEADER_BYTES)?;
        let total = self.buf.get_u32_le();
        let _tail = self.buf.get_u32_le();
        let declared = self.buf.get_u16_le();
        self.check_total(u64::from(total))?;

        let mut count: u64 = 0;
        loop {
            self.need(1)?;
            if self.buf[0] == ZIPLIST_END {
                self.buf.advance(1);
                break;
            }

            if self.buf.get_u8() == ZIPLIST_BIG_PREVLEN {
                self.skip(4)?;
            }

            self.need(1)?;
            let encoding = self.buf.get_u8();
            let data_len = match encoding >> 6 {
                0 => usize::from(encoding & 0x3F),
                1 => {
                    self.need(1)?;
                    (usize::from(encoding & 0x3F) << 8) | usize::from(self.buf.get_u8())
                }
                2 => {
                    self.need(4)?;
                    self.buf.get_u32() as usize
                }
                _ => match encoding {
                    0xC0 => 2,
                    0xD0 => 4,
                    0xE0 => 8,
                    0xF0 => 3,
                    0xFE => 1,
                    // 4 bit immediate integer.
                    0xF1..=0xFD => 0,
                    _ => return Err(self.unsupported(encoding)),
                },
            };
            self.skip(data_len)?;
            count += 1;
        }

        self.check_count(declared, ZIPLIST_UNKNOWN_COUNT, count)?;
        self.check_consumed()?;
        Ok(count)
    }

    fn listpack(&mut self) -> Result<u64> {
        self.need(LISTPACK_HEADER_BYTES)?;
        let total = self.buf.get_u32_le();
        let declared = self.buf.get_u16_le();
        self.check_total(u64::from(total))?;

        let mut count: u64 = 0;
        loop {
            self.need(1)?;
            let encoding = self.buf[0];
            if encoding == LISTPACK_END {
                self.buf.advance(1);
                break;
            }

            let (header, data) = match encoding {
                // 7 bit unsigned int.
                0x00..=0x7F => (1, 0),
                // 6 bit string length.
                0x80..=0xBF => (1, usize::from(encoding & 0x3F)),
                // 13 bit int.
                0xC0..=0xDF => (2, 0),
                // 12 bit string length.
                0xE0..=0xEF => {
                    self.need(2)?;
                    (2, (usize::from(encoding & 0x0F) << 8) | usize::from(self.buf[1]))
                }
                0xF0 => {
                    self.need(5)?;
                    let len = u32::from_le_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]]);
                    (5, len as usize)
                }
                0xF1 => (3, 0),
                0xF2 => (4, 0),
                0xF3 => (5, 0),
                0xF4 => (9, 0),
                _ => return Err(self.unsupported(encoding)),
            };

            let entry = header + data;
            self.skip(entry + listpack_backlen_bytes(entry))?;
            count += 1;
        }

        self.check_count(declared, LISTPACK_UNKNOWN_COUNT, count)?;
        self.check_consumed()?;
        Ok(count)
    }

    fn intset(&mut self) -> Result<u64> {
        self.need(INTSET_HEADER_BYTES)?;
        let encoding = self.buf.get_u32_le();
        let len = self.buf.get_u32_le();

        if !matches!(encoding, 2 | 4 | 8) {
            return Err(ErrorKind::UnsupportedEncoding {
                offset: self.offset,
                what: "intset encoding",
                tag: encoding as u8,
            }
            .into());
        }

        let want = INTSET_HEADER_BYTES as u64 + u64::from(encoding) * u64::from(len);
        self.check_total(want)?;

        Ok(u64::from(len))
    }

    fn zipmap(&mut self) -> Result<u64> {
        self.need(1)?;
        let declared = self.buf.get_u8();

        let mut count: u64 = 0;
        loop {
            self.need(1)?;
            if self.buf[0] == ZIPMAP_END {
                self.buf.advance(1);
                break;
            }

            let key_len = self.zipmap_len()?;
            self.skip(key_len)?;

            let value_len = self.zipmap_len()?;
            self.need(1)?;
            let free = usize::from(self.buf.get_u8());
            self.skip(value_len + free)?;

            count += 1;
        }

        // zmlen is only meaningful below 254.
        if declared < ZIPMAP_BIG_LEN && u64::from(declared) != count {
            return Err(self.malformed(format!(
                "declared {} pairs, found {}",
                declared, count
            )));
        }
        self.check_consumed()?;
        Ok(count)
    }

    fn zipmap_len(&mut self) -> Result<usize> {
        self.need(1)?;
        match self.buf.get_u8() {
            ZIPMAP_BIG_LEN => {
                self.need(4)?;
                Ok(self.buf.get_u32_le() as usize)
            }
            ZIPMAP_END => Err(self.malformed("unexpected end marker".into())),
            len => Ok(usize::from(len)),
        }
    }

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            Err(self.malformed(format!(
                "entry at {} needs {} bytes, {} left",
                self.position(),
                n,
                self.buf.remaining()
            )))
        } else {
            Ok(())
        }
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.need(n)?;
        self.buf.advance(n);
        Ok(())
    }

    fn check_total(&self, declared: u64) -> Result<()> {
        if declared != self.blob.len() as u64 {
            return Err(self.malformed(format!(
                "declared {} bytes, blob holds {}",
                declared,
                self.blob.len()
            )));
        }
        Ok(())
    }

    fn check_count(&self, declared: u16, unknown: u16, count: u64) -> Result<()> {
        if declared != unknown && u64::from(declared) != count {
            return Err(self.malformed(format!(
                "declared {} entries, found {}",
                declared, count
            )));
        }
        Ok(())
    }

    fn check_consumed(&self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(self.malformed(format!(
                "{} trailing bytes after end marker",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn position(&self) -> usize {
        self.blob.len() - self.buf.remaining()
    }

    fn malformed(&self, description: String) -> crate::Error {
        ErrorKind::MalformedLength {
            offset: self.offset,
            description: format!("{}: {}", self.kind.name(), description),
        }
        .into()
    }

    fn unsupported(&self, tag: u8) -> crate::Error {
        ErrorKind::UnsupportedEncoding {
            offset: self.offset,
            what: match self.kind {
                Packed::Ziplist => "ziplist entry encoding",
                _ => "listpack entry encoding",
            },
            tag,
        }
        .into()
    }
}

// Bytes used by the backward length of a listpack entry of `entry` bytes.
fn listpack_backlen_bytes(entry: usize) -> usize {
    match entry {
        0..=127 => 1,
        128..=16382 => 2,
        16383..=2097150 => 3,
        2097151..=268435454 => 4,
        _ => 5,
    }
}
