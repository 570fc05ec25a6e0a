//! Variable width length encoding.
//!
//! The two most significant bits of the first byte select the format:
//!
//! ```text
//! 00pppppp                      6 bit length
//! 01pppppp qqqqqqqq             14 bit length (big endian)
//! 10000000 [4 bytes]            32 bit length (big endian)
//! 10000001 [8 bytes]            64 bit length (big endian)
//! 11pppppp                      special encoding, pppppp selects int8/int16/int32/lzf
//! ```

use crate::common::{ErrorKind, Result};
use crate::rdb::reader::Source;

const LEN_6BIT: u8 = 0;
const LEN_14BIT: u8 = 1;
const LEN_32OR64BIT: u8 = 2;
const LEN_32BIT: u8 = 0x80;
const LEN_64BIT: u8 = 0x81;

const ENC_INT8: u8 = 0;
const ENC_INT16: u8 = 1;
const ENC_INT32: u8 = 2;
const ENC_LZF: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Length {
    Len(u64),
    // Integer stored inline in place of a string.
    Int(i64),
    // An lzf compressed string follows.
    Lzf { compressed: u64, original: u64 },
}

// Single prefix without following the lzf marker.
enum Prefix {
    Len(u64),
    Int(i64),
    Lzf,
}

fn read_prefix<S: Source>(src: &mut S) -> Result<Prefix> {
    let offset = src.offset();
    let first = src.read_u8()?;

    let prefix = match first >> 6 {
        LEN_6BIT => Prefix::Len(u64::from(first & 0x3F)),
        LEN_14BIT => {
            let next = src.read_u8()?;
            Prefix::Len((u64::from(first & 0x3F) << 8) | u64::from(next))
        }
        LEN_32OR64BIT => match first {
            LEN_32BIT => Prefix::Len(u64::from(src.read_u32_be()?)),
            LEN_64BIT => Prefix::Len(src.read_u64_be()?),
            _ => {
                return Err(ErrorKind::MalformedLength {
                    offset,
                    description: format!("unknown length prefix 0x{:02x}", first),
                }
                .into())
            }
        },
        _ => match first & 0x3F {
            ENC_INT8 => Prefix::Int(i64::from(src.read_u8()? as i8)),
            ENC_INT16 => Prefix::Int(i64::from(i16::from_le_bytes(src.read_array()?))),
            ENC_INT32 => Prefix::Int(i64::from(i32::from_le_bytes(src.read_array()?))),
            ENC_LZF => Prefix::Lzf,
            _ => {
                return Err(ErrorKind::MalformedLength {
                    offset,
                    description: format!("unknown special encoding 0x{:02x}", first),
                }
                .into())
            }
        },
    };

    Ok(prefix)
}

/// Read a plain length. Special encodings are rejected.
pub(crate) fn read_length<S: Source>(src: &mut S) -> Result<u64> {
    let offset = src.offset();
    match read_prefix(src)? {
        Prefix::Len(n) => Ok(n),
        Prefix::Int(_) | Prefix::Lzf => Err(ErrorKind::MalformedLength {
            offset,
            description: "special encoding where a length is expected".into(),
        }
        .into()),
    }
}

/// Read a length or one of the special string encodings.
pub(crate) fn read_length_or_special<S: Source>(src: &mut S) -> Result<Length> {
    match read_prefix(src)? {
        Prefix::Len(n) => Ok(Length::Len(n)),
        Prefix::Int(v) => Ok(Length::Int(v)),
        Prefix::Lzf => {
            let compressed = read_length(src)?;
            let original = read_length(src)?;
            Ok(Length::Lzf {
                compressed,
                original,
            })
        }
    }
}

/// Read a length that counts items of at least `min_item_bytes` bytes each,
/// rejecting counts that could not possibly fit in the rest of the file.
pub(crate) fn read_count<S: Source>(src: &mut S, min_item_bytes: u64) -> Result<u64> {
    let offset = src.offset();
    let count = read_length(src)?;
    let needed = count.saturating_mul(min_item_bytes);
    if needed > src.remaining() {
        return Err(ErrorKind::TruncatedInput {
            offset,
            needed,
            remaining: src.remaining(),
        }
        .into());
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdb::reader::Reader;
    use crate::rdb::testutil::encode_length;

    fn reader(data: &[u8]) -> Reader<&[u8]> {
        Reader::new(data, data.len() as u64, false)
    }

    #[test]
    fn lengths() {
        let cases: &[(&[u8], u64)] = &[
            (&[0x00], 0),
            (&[0x3F], 63),
            (&[0x40, 0x40], 64),
            (&[0x7F, 0xFF], 16383),
            (&[0x80, 0x00, 0x01, 0x00, 0x00], 65536),
            (&[0x81, 0, 0, 0, 1, 0, 0, 0, 0], 1 << 32),
        ];

        for (data, want) in cases {
            let mut src = reader(data);
            assert_eq!(read_length(&mut src).unwrap(), *want);
            assert_eq!(src.offset(), data.len() as u64);
        }
    }

    #[test]
    fn encoder_agrees() {
        for n in [0_u64, 1, 63, 64, 300, 16383, 16384, u32::MAX as u64, 1 << 40] {
            let data = encode_length(n);
            assert_eq!(read_length(&mut reader(&data)).unwrap(), n);
        }
    }

    #[test]
    fn special_integers() {
        let cases: &[(&[u8], i64)] = &[
            (&[0xC0, 0xFF], -1),
            (&[0xC0, 0x7B], 123),
            (&[0xC1, 0x39, 0x30], 12345),
            (&[0xC2, 0x87, 0xD6, 0x12, 0x00], 1234567),
            (&[0xC2, 0xFF, 0xFF, 0xFF, 0xFF], -1),
        ];

        for (data, want) in cases {
            let mut src = reader(data);
            assert_eq!(read_length_or_special(&mut src).unwrap(), Length::Int(*want));
            assert_eq!(src.remaining(), 0);
        }
    }

    #[test]
    fn lzf_marker() {
        let data = [0xC3, 0x05, 0x0A];
        assert_eq!(
            read_length_or_special(&mut reader(&data)).unwrap(),
            Length::Lzf {
                compressed: 5,
                original: 10
            }
        );
    }

    #[test]
    fn nested_lzf_marker_is_rejected() {
        let data = [0xC3, 0xC3, 0xC3, 0x01];
        let err = read_length_or_special(&mut reader(&data)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedLength { offset: 1, .. }));
    }

    #[test]
    fn malformed_prefixes() {
        for data in [&[0x82_u8, 0, 0, 0, 0][..], &[0xC4], &[0xFF]] {
            let err = read_length_or_special(&mut reader(data)).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::MalformedLength { offset: 0, .. }),
                "{:?}",
                err
            );
        }

        let err = read_length(&mut reader(&[0xC0, 0x01])).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MalformedLength { .. }));
    }

    #[test]
    fn truncated() {
        for data in [&[][..], &[0x40], &[0x80, 0, 0], &[0xC1, 0x00]] {
            let err = read_length_or_special(&mut reader(data)).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::TruncatedInput { .. }),
                "{:?}",
                err
            );
        }
    }

    #[test]
    fn implausible_count() {
        let mut data = encode_length(1_000_000);
        data.extend_from_slice(&[0; 16]);

        let err = read_count(&mut reader(&data), 1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TruncatedInput { offset: 0, .. }));

        let mut data = encode_length(4);
        data.extend_from_slice(&[0; 16]);
        assert_eq!(read_count(&mut reader(&data), 4).unwrap(), 4);
    }
}
