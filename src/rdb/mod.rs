//! Decoder for the redis rdb dump file format.
//!
//! ```text
//! "REDIS" <4 ascii digits version>
//! ( AUX | SELECTDB | RESIZEDB | EXPIRE* | IDLE | FREQ | MODULE_AUX | FUNCTION | <type> <key> <value> )*
//! EOF [<crc64 little endian>]
//! ```
//!
//! [`Decoder`] walks the file one opcode at a time and yields one [`Entry`] per key,
//! recording how many bytes of the file each key occupies.

mod decoder;
pub use decoder::{Checksum, DecodeCursor, Decoder, Outcome, Step};

mod encoding;
pub use encoding::{
    Encoding, HashEncoding, ListEncoding, SetEncoding, SortedSetEncoding, StreamEncoding,
};

mod entry;
pub use entry::{Entry, Type};

pub(crate) mod length;
pub(crate) mod packed;
pub(crate) mod reader;
pub(crate) mod string;
pub(crate) mod value;

#[cfg(test)]
pub(crate) mod testutil;

pub const MAGIC: &[u8; 5] = b"REDIS";
pub const MIN_VERSION: u32 = 1;
pub const MAX_VERSION: u32 = 12;

// Magic + version digits.
pub const HEADER_BYTES: u64 = 9;

// First version which writes a crc64 trailer.
pub(crate) const CHECKSUM_VERSION: u32 = 5;

pub(crate) mod opcode {
    pub(crate) const SLOT_INFO: u8 = 0xF4;
    pub(crate) const FUNCTION2: u8 = 0xF5;
    pub(crate) const FUNCTION_PRE_GA: u8 = 0xF6;
    pub(crate) const MODULE_AUX: u8 = 0xF7;
    pub(crate) const IDLE: u8 = 0xF8;
    pub(crate) const FREQ: u8 = 0xF9;
    pub(crate) const AUX: u8 = 0xFA;
    pub(crate) const RESIZEDB: u8 = 0xFB;
    pub(crate) const EXPIRETIME_MS: u8 = 0xFC;
    pub(crate) const EXPIRETIME: u8 = 0xFD;
    pub(crate) const SELECTDB: u8 = 0xFE;
    pub(crate) const EOF: u8 = 0xFF;
}

// Opcodes inside module serialized values.
pub(crate) mod module_opcode {
    pub(crate) const EOF: u64 = 0;
    pub(crate) const SINT: u64 = 1;
    pub(crate) const UINT: u64 = 2;
    pub(crate) const FLOAT: u64 = 3;
    pub(crate) const DOUBLE: u64 = 4;
    pub(crate) const STRING: u64 = 5;
}
