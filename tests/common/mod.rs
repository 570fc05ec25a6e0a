#![allow(dead_code)]

use std::path::PathBuf;

use crc::{Crc, CRC_64_REDIS};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_REDIS);

pub const TYPE_STRING: u8 = 0;
pub const TYPE_LIST: u8 = 1;
pub const TYPE_SET: u8 = 2;
pub const TYPE_HASH: u8 = 4;

pub fn temp_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().unwrap()
}

pub fn length(n: u64) -> Vec<u8> {
    if n < 1 << 6 {
        vec![n as u8]
    } else if n < 1 << 14 {
        vec![0x40 | (n >> 8) as u8, n as u8]
    } else {
        let mut buf = vec![0x80];
        buf.extend((n as u32).to_be_bytes());
        buf
    }
}

pub fn string(s: &[u8]) -> Vec<u8> {
    let mut buf = length(s.len() as u64);
    buf.extend_from_slice(s);
    buf
}

// Linked list or hashtable set: a count followed by plain strings.
pub fn strings(items: &[&[u8]]) -> Vec<u8> {
    let mut buf = length(items.len() as u64);
    for item in items {
        buf.extend(string(item));
    }
    buf
}

// Hashtable hash: a pair count followed by field and value strings.
pub fn pairs(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut buf = length(pairs.len() as u64);
    for (field, value) in pairs {
        buf.extend(string(field));
        buf.extend(string(value));
    }
    buf
}

/// Dump file builder.
pub struct Fixture {
    version: u32,
    buf: Vec<u8>,
}

impl Fixture {
    pub fn new(version: u32) -> Self {
        let mut buf = b"REDIS".to_vec();
        buf.extend(format!("{:04}", version).into_bytes());
        Self { version, buf }
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn aux(&mut self, key: &str, value: &str) -> &mut Self {
        self.buf.push(0xFA);
        self.buf.extend(string(key.as_bytes()));
        self.buf.extend(string(value.as_bytes()));
        self
    }

    pub fn select_db(&mut self, db: u64) -> &mut Self {
        self.buf.push(0xFE);
        self.buf.extend(length(db));
        self
    }

    pub fn expire_ms(&mut self, at: i64) -> &mut Self {
        self.buf.push(0xFC);
        self.buf.extend(at.to_le_bytes());
        self
    }

    /// Returns the bytes of key and value.
    pub fn key_value(&mut self, tag: u8, key: &[u8], value: &[u8]) -> u64 {
        self.buf.push(tag);
        let start = self.buf.len();
        self.buf.extend(string(key));
        self.buf.extend_from_slice(value);
        (self.buf.len() - start) as u64
    }

    pub fn string(&mut self, key: &[u8], value: &[u8]) -> u64 {
        self.key_value(TYPE_STRING, key, &string(value))
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut buf = self.buf.clone();
        buf.push(0xFF);
        if self.version >= 5 {
            let crc = CRC64.checksum(&buf);
            buf.extend(crc.to_le_bytes());
        }
        buf
    }

    pub fn finish_with_checksum(&self, crc: u64) -> Vec<u8> {
        let mut buf = self.buf.clone();
        buf.push(0xFF);
        buf.extend(crc.to_le_bytes());
        buf
    }

    pub fn write(&self, dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, self.finish()).unwrap();
        path
    }
}
