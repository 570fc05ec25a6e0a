//! Encoders used to build dump file fixtures in tests.

use crate::rdb::reader::checksum;
use crate::rdb::{opcode, StreamEncoding, CHECKSUM_VERSION, MAGIC};

pub(crate) fn encode_length(n: u64) -> Vec<u8> {
    if n < 1 << 6 {
        vec![n as u8]
    } else if n < 1 << 14 {
        vec![0x40 | (n >> 8) as u8, n as u8]
    } else if n <= u64::from(u32::MAX) {
        let mut buf = vec![0x80];
        buf.extend((n as u32).to_be_bytes());
        buf
    } else {
        let mut buf = vec![0x81];
        buf.extend(n.to_be_bytes());
        buf
    }
}

pub(crate) fn encode_string(s: &[u8]) -> Vec<u8> {
    let mut buf = encode_length(s.len() as u64);
    buf.extend_from_slice(s);
    buf
}

pub(crate) fn encode_lzf_string(s: &[u8]) -> Vec<u8> {
    let compressed = lzf::compress(s).expect("compressible input");
    let mut buf = vec![0xC3];
    buf.extend(encode_length(compressed.len() as u64));
    buf.extend(encode_length(s.len() as u64));
    buf.extend(compressed);
    buf
}

pub(crate) enum ZlItem<'a> {
    Str(&'a [u8]),
    Int(i64),
}

pub(crate) fn ziplist(items: &[ZlItem]) -> Vec<u8> {
    const HEADER: usize = 10;

    let mut body = Vec::new();
    let mut prev = 0_usize;
    let mut tail = HEADER;
    for item in items {
        tail = HEADER + body.len();

        let mut entry = Vec::new();
        if prev < 254 {
            entry.push(prev as u8);
        } else {
            entry.push(0xFE);
            entry.extend((prev as u32).to_le_bytes());
        }

        match item {
            ZlItem::Str(s) => {
                let len = s.len();
                if len < 1 << 6 {
                    entry.push(len as u8);
                } else if len < 1 << 14 {
                    entry.push(0x40 | (len >> 8) as u8);
                    entry.push(len as u8);
                } else {
                    entry.push(0x80);
                    entry.extend((len as u32).to_be_bytes());
                }
                entry.extend_from_slice(s);
            }
            ZlItem::Int(v) => {
                let v = *v;
                if (0..=12).contains(&v) {
                    entry.push(0xF1 + v as u8);
                } else if i8::try_from(v).is_ok() {
                    entry.push(0xFE);
                    entry.push(v as i8 as u8);
                } else if i16::try_from(v).is_ok() {
                    entry.push(0xC0);
                    entry.extend((v as i16).to_le_bytes());
                } else if (-(1 << 23)..(1 << 23)).contains(&v) {
                    entry.push(0xF0);
                    entry.extend(&(v as i32).to_le_bytes()[..3]);
                } else if i32::try_from(v).is_ok() {
                    entry.push(0xD0);
                    entry.extend((v as i32).to_le_bytes());
                } else {
                    entry.push(0xE0);
                    entry.extend(v.to_le_bytes());
                }
            }
        }

        prev = entry.len();
        body.extend(entry);
    }

    let total = HEADER + body.len() + 1;
    let mut buf = Vec::with_capacity(total);
    buf.extend((total as u32).to_le_bytes());
    buf.extend((tail as u32).to_le_bytes());
    buf.extend((items.len().min(u16::MAX as usize) as u16).to_le_bytes());
    buf.extend(body);
    buf.push(0xFF);
    buf
}

pub(crate) enum LpItem<'a> {
    Str(&'a [u8]),
    Int(i64),
}

pub(crate) fn listpack(items: &[LpItem]) -> Vec<u8> {
    let mut body = Vec::new();
    for item in items {
        let mut entry = Vec::new();
        match item {
            LpItem::Str(s) if s.len() < 1 << 6 => {
                entry.push(0x80 | s.len() as u8);
                entry.extend_from_slice(s);
            }
            LpItem::Str(s) if s.len() < 1 << 12 => {
                entry.push(0xE0 | (s.len() >> 8) as u8);
                entry.push(s.len() as u8);
                entry.extend_from_slice(s);
            }
            LpItem::Str(s) => {
                entry.push(0xF0);
                entry.extend((s.len() as u32).to_le_bytes());
                entry.extend_from_slice(s);
            }
            LpItem::Int(v) if (0..128).contains(v) => entry.push(*v as u8),
            LpItem::Int(v) if (-4096..4096).contains(v) => {
                let u = (*v as u16) & 0x1FFF;
                entry.push(0xC0 | (u >> 8) as u8);
                entry.push(u as u8);
            }
            LpItem::Int(v) if i16::try_from(*v).is_ok() => {
                entry.push(0xF1);
                entry.extend((*v as i16).to_le_bytes());
            }
            LpItem::Int(v) if i32::try_from(*v).is_ok() => {
                entry.push(0xF3);
                entry.extend((*v as i32).to_le_bytes());
            }
            LpItem::Int(v) => {
                entry.push(0xF4);
                entry.extend(v.to_le_bytes());
            }
        }
        let backlen = encode_backlen(entry.len());
        entry.extend(backlen);
        body.extend(entry);
    }

    let total = 4 + 2 + body.len() + 1;
    let mut buf = Vec::with_capacity(total);
    buf.extend((total as u32).to_le_bytes());
    buf.extend((items.len().min(u16::MAX as usize) as u16).to_le_bytes());
    buf.extend(body);
    buf.push(0xFF);
    buf
}

// Backward length, most significant group first.
fn encode_backlen(mut len: usize) -> Vec<u8> {
    let mut groups = vec![(len & 127) as u8];
    len >>= 7;
    while len > 0 {
        groups.push((len & 127) as u8 | 128);
        len >>= 7;
    }
    groups.reverse();
    groups
}

pub(crate) fn intset(encoding: u32, values: &[i64]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend(encoding.to_le_bytes());
    buf.extend((values.len() as u32).to_le_bytes());
    for v in values {
        buf.extend(&v.to_le_bytes()[..encoding as usize]);
    }
    buf
}

pub(crate) fn zipmap(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    fn len(buf: &mut Vec<u8>, n: usize) {
        if n < 254 {
            buf.push(n as u8);
        } else {
            buf.push(254);
            buf.extend((n as u32).to_le_bytes());
        }
    }

    let mut buf = vec![pairs.len().min(254) as u8];
    for (key, value) in pairs {
        len(&mut buf, key.len());
        buf.extend_from_slice(key);
        len(&mut buf, value.len());
        // free bytes
        buf.push(0);
        buf.extend_from_slice(value);
    }
    buf.push(0xFF);
    buf
}

/// Module id for a 9 character type name and encoding version.
pub(crate) fn module_id(name: &str, version: u64) -> u64 {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    assert_eq!(name.len(), 9);
    let id = name.bytes().fold(0_u64, |id, c| {
        let pos = CHARSET.iter().position(|&x| x == c).expect("module name charset");
        (id << 6) | pos as u64
    });
    (id << 10) | version
}

/// Serialized stream value with one node, one group, one consumer and one pending entry.
pub(crate) fn stream_value(encoding: StreamEncoding, length: u64) -> Vec<u8> {
    let mut buf = encode_length(1);
    buf.extend(encode_string(&[0_u8; 16]));
    buf.extend(encode_string(&listpack(&[
        LpItem::Int(1),
        LpItem::Int(0),
        LpItem::Int(1),
        LpItem::Str(b"field"),
        LpItem::Int(0),
        LpItem::Int(0),
        LpItem::Int(0),
        LpItem::Str(b"value"),
        LpItem::Int(2),
    ])));

    buf.extend(encode_length(length));
    // last id
    buf.extend(encode_length(1_700_000_000_000));
    buf.extend(encode_length(0));

    if encoding >= StreamEncoding::Listpacks2 {
        buf.extend(encode_length(1_700_000_000_000));
        buf.extend(encode_length(0));
        buf.extend(encode_length(0));
        buf.extend(encode_length(0));
        buf.extend(encode_length(length));
    }

    buf.extend(encode_length(1));
    buf.extend(encode_string(b"group"));
    buf.extend(encode_length(1_700_000_000_000));
    buf.extend(encode_length(0));
    if encoding >= StreamEncoding::Listpacks2 {
        buf.extend(encode_length(1));
    }

    buf.extend(encode_length(1));
    buf.extend([0_u8; 16]);
    buf.extend(1_700_000_000_000_u64.to_le_bytes());
    buf.extend(encode_length(1));

    buf.extend(encode_length(1));
    buf.extend(encode_string(b"consumer"));
    buf.extend(1_700_000_000_000_u64.to_le_bytes());
    if encoding >= StreamEncoding::Listpacks3 {
        buf.extend(1_700_000_000_000_u64.to_le_bytes());
    }
    buf.extend(encode_length(1));
    buf.extend([0_u8; 16]);

    buf
}

/// Builds a dump file.
pub(crate) struct RdbWriter {
    version: u32,
    buf: Vec<u8>,
}

impl RdbWriter {
    pub(crate) fn new(version: u32) -> Self {
        let mut buf = MAGIC.to_vec();
        buf.extend(format!("{:04}", version).into_bytes());
        Self { version, buf }
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub(crate) fn aux(&mut self, key: &str, value: &str) -> &mut Self {
        self.buf.push(opcode::AUX);
        self.buf.extend(encode_string(key.as_bytes()));
        self.buf.extend(encode_string(value.as_bytes()));
        self
    }

    pub(crate) fn select_db(&mut self, db: u64) -> &mut Self {
        self.buf.push(opcode::SELECTDB);
        self.buf.extend(encode_length(db));
        self
    }

    pub(crate) fn resize_db(&mut self, keys: u64, expires: u64) -> &mut Self {
        self.buf.push(opcode::RESIZEDB);
        self.buf.extend(encode_length(keys));
        self.buf.extend(encode_length(expires));
        self
    }

    pub(crate) fn expire_ms(&mut self, at: i64) -> &mut Self {
        self.buf.push(opcode::EXPIRETIME_MS);
        self.buf.extend(at.to_le_bytes());
        self
    }

    pub(crate) fn expire_secs(&mut self, at: u32) -> &mut Self {
        self.buf.push(opcode::EXPIRETIME);
        self.buf.extend(at.to_le_bytes());
        self
    }

    /// Write a key and an already encoded value. Returns the key and value bytes.
    pub(crate) fn key_value(&mut self, tag: u8, key: &[u8], value: &[u8]) -> u64 {
        self.buf.push(tag);
        let start = self.buf.len();
        self.buf.extend(encode_string(key));
        self.buf.extend_from_slice(value);
        (self.buf.len() - start) as u64
    }

    pub(crate) fn string(&mut self, key: &[u8], value: &[u8]) -> u64 {
        self.key_value(0, key, &encode_string(value))
    }

    /// Append the end marker and a valid checksum.
    pub(crate) fn finish(&self) -> Vec<u8> {
        let mut buf = self.finish_without_checksum();
        if self.version >= CHECKSUM_VERSION {
            let crc = checksum(&buf);
            buf.extend(crc.to_le_bytes());
        }
        buf
    }

    pub(crate) fn finish_with_checksum(&self, crc: u64) -> Vec<u8> {
        let mut buf = self.finish_without_checksum();
        buf.extend(crc.to_le_bytes());
        buf
    }

    pub(crate) fn finish_without_checksum(&self) -> Vec<u8> {
        let mut buf = self.buf.clone();
        buf.push(opcode::EOF);
        buf
    }
}
