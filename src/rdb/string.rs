use crate::common::{ErrorKind, Result};
use crate::rdb::length::{read_length_or_special, Length};
use crate::rdb::reader::Source;

// lzf back references expand 3 bytes into at most 264, so anything beyond this ratio
// can not be produced by a real compressor.
const MAX_LZF_EXPANSION: u64 = 96;

/// Read a string, expanding integer and lzf encodings.
pub(crate) fn read_string<S: Source>(src: &mut S) -> Result<Vec<u8>> {
    let offset = src.offset();
    match read_length_or_special(src)? {
        Length::Len(n) => src.read_vec(n),
        Length::Int(v) => Ok(v.to_string().into_bytes()),
        Length::Lzf {
            compressed,
            original,
        } => {
            let data = src.read_vec(compressed)?;
            decompress(offset, &data, original)
        }
    }
}

/// Read a string holding a packed structure (ziplist, listpack, intset, zipmap).
pub(crate) fn read_blob<S: Source>(src: &mut S) -> Result<Vec<u8>> {
    let offset = src.offset();
    match read_length_or_special(src)? {
        Length::Int(_) => Err(ErrorKind::MalformedLength {
            offset,
            description: "integer encoded string where a packed structure is expected".into(),
        }
        .into()),
        Length::Len(n) => src.read_vec(n),
        Length::Lzf {
            compressed,
            original,
        } => {
            let data = src.read_vec(compressed)?;
            decompress(offset, &data, original)
        }
    }
}

/// Skip over a string without materializing it. Returns the decoded length.
pub(crate) fn skip_string<S: Source>(src: &mut S) -> Result<u64> {
    match read_length_or_special(src)? {
        Length::Len(n) => {
            src.skip(n)?;
            Ok(n)
        }
        Length::Int(v) => Ok(decimal_len(v)),
        Length::Lzf {
            compressed,
            original,
        } => {
            src.skip(compressed)?;
            Ok(original)
        }
    }
}

pub(crate) fn decompress(offset: u64, data: &[u8], original: u64) -> Result<Vec<u8>> {
    let limit = (data.len() as u64)
        .saturating_mul(MAX_LZF_EXPANSION)
        .saturating_add(16);
    if original == 0 || original > limit {
        return Err(ErrorKind::MalformedLength {
            offset,
            description: format!(
                "lzf original length {} implausible for {} compressed bytes",
                original,
                data.len()
            ),
        }
        .into());
    }

    let out = lzf::decompress(data, original as usize).map_err(|err| {
        ErrorKind::DecompressionFailed {
            offset,
            description: format!("{:?}", err),
        }
    })?;

    if out.len() as u64 != original {
        return Err(ErrorKind::DecompressionFailed {
            offset,
            description: format!("expected {} bytes, got {}", original, out.len()),
        }
        .into());
    }

    Ok(out)
}

// Length of the decimal representation of v.
fn decimal_len(v: i64) -> u64 {
    let sign = u64::from(v < 0);
    let mut n = v.unsigned_abs();
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    sign + digits
}
