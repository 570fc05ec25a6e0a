use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;

use crate::common::{debug, trace, warn, Error, ErrorKind, Result};
use crate::rdb::length::read_length;
use crate::rdb::module_opcode;
use crate::rdb::reader::{Reader, Source};
use crate::rdb::string::{read_string, skip_string};
use crate::rdb::value::{self, module_name};
use crate::rdb::{
    opcode, Encoding, Entry, CHECKSUM_VERSION, HEADER_BYTES, MAGIC, MAX_VERSION, MIN_VERSION,
};

const READ_BUFFER_BYTES: usize = 64 * 1024;

/// Checksum status of a fully decoded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Checksum {
    // Version predates checksums or the trailer is missing.
    Absent,
    // Written with checksums turned off (zero trailer).
    Disabled,
    // Verification turned off by the caller.
    Skipped { stored: u64 },
    Valid { value: u64 },
    Mismatch { stored: u64, computed: u64 },
}

impl Checksum {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Checksum::Mismatch { .. })
    }
}

/// Result of a clean decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub version: u32,
    pub keys: u64,
    pub bytes: u64,
    pub aux: BTreeMap<String, String>,
    pub checksum: Checksum,
}

/// Progress of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodeCursor {
    pub offset: u64,
    pub database: u64,
    pub keys: u64,
}

/// What one call to [`Decoder::step`] produced.
#[derive(Debug)]
pub enum Step {
    Entry(Entry),
    // Header or an opcode which does not yield a key.
    Metadata,
    Done(Outcome),
}

enum State {
    Header,
    Scanning,
    Done(Outcome),
    Failed,
}

struct PendingExpire {
    at: i64,
    // Payload bytes of the expire record.
    width: u64,
}

/// Streaming decoder of a dump file.
pub struct Decoder<R> {
    reader: Reader<R>,
    state: State,
    version: u32,
    database: u64,
    keys: u64,
    pending_expire: Option<PendingExpire>,
    aux: BTreeMap<String, String>,
}

impl Decoder<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>, verify_checksum: bool) -> Result<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Decoder::new(
            BufReader::with_capacity(READ_BUFFER_BYTES, file),
            size,
            verify_checksum,
        ))
    }
}

impl<R: Read> Decoder<R> {
    /// `size` is the total number of bytes `read` will yield.
    pub fn new(read: R, size: u64, verify_checksum: bool) -> Self {
        Self {
            reader: Reader::new(read, size, verify_checksum),
            state: State::Header,
            version: 0,
            database: 0,
            keys: 0,
            pending_expire: None,
            aux: BTreeMap::new(),
        }
    }

    pub fn cursor(&self) -> DecodeCursor {
        DecodeCursor {
            offset: self.reader.offset(),
            database: self.database,
            keys: self.keys,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, State::Done(_) | State::Failed)
    }

    /// Run a single opcode handler.
    pub fn step(&mut self) -> Result<Step> {
        let result = match self.state {
            State::Header => self.read_header().map(|()| Step::Metadata),
            State::Scanning => self.scan(),
            State::Done(ref outcome) => return Ok(Step::Done(outcome.clone())),
            State::Failed => {
                return Err(ErrorKind::Internal("step on a failed decoder".into()).into())
            }
        };

        match result {
            Ok(Step::Done(outcome)) => {
                self.state = State::Done(outcome.clone());
                Ok(Step::Done(outcome))
            }
            Err(err) => {
                self.state = State::Failed;
                Err(err)
            }
            step => step,
        }
    }

    /// Step until the next key. Returns None once the end of the file is reached.
    pub fn next_entry(&mut self) -> Result<Option<Entry>> {
        loop {
            match self.step()? {
                Step::Entry(entry) => return Ok(Some(entry)),
                Step::Metadata => continue,
                Step::Done(_) => return Ok(None),
            }
        }
    }

    /// Drain the remaining entries and return the outcome.
    pub fn finish(&mut self) -> Result<Outcome> {
        loop {
            if let Step::Done(outcome) = self.step()? {
                return Ok(outcome);
            }
        }
    }

    pub(crate) fn cancelled(&self) -> Error {
        ErrorKind::Cancelled {
            keys: self.keys,
            offset: self.reader.offset(),
        }
        .into()
    }

    fn read_header(&mut self) -> Result<()> {
        let head = self
            .reader
            .read_vec(std::cmp::min(HEADER_BYTES, self.reader.remaining()))?;

        if head.len() < MAGIC.len() || &head[..MAGIC.len()] != MAGIC {
            return Err(ErrorKind::BadMagic {
                found: head[..std::cmp::min(head.len(), MAGIC.len())].to_vec(),
            }
            .into());
        }

        let digits = &head[MAGIC.len()..];
        let unsupported = || {
            Error::from(ErrorKind::UnsupportedVersion {
                version: String::from_utf8_lossy(digits).into_owned(),
            })
        };
        if digits.len() != 4 || !digits.iter().all(u8::is_ascii_digit) {
            return Err(unsupported());
        }
        let version = atoi::atoi::<u32>(digits).ok_or_else(unsupported)?;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(unsupported());
        }

        debug!(version, "rdb header");
        self.version = version;
        self.state = State::Scanning;
        Ok(())
    }

    fn scan(&mut self) -> Result<Step> {
        let offset = self.reader.offset();
        let op = self.reader.read_u8()?;

        match op {
            opcode::EOF => self.finish_file().map(Step::Done),
            opcode::SELECTDB => {
                self.drop_pending_expire("database selector");
                self.database = read_length(&mut self.reader)?;
                debug!(db = self.database, offset, "select db");
                Ok(Step::Metadata)
            }
            opcode::RESIZEDB => {
                let db_size = read_length(&mut self.reader)?;
                let expires_size = read_length(&mut self.reader)?;
                debug!(db_size, expires_size, "resize db");
                Ok(Step::Metadata)
            }
            opcode::AUX => {
                let key = read_string(&mut self.reader)?;
                let value = read_string(&mut self.reader)?;
                let key = String::from_utf8_lossy(&key).into_owned();
                let value = String::from_utf8_lossy(&value).into_owned();
                debug!(%key, %value, "aux field");
                self.aux.insert(key, value);
                Ok(Step::Metadata)
            }
            opcode::EXPIRETIME => {
                let secs = self.reader.read_u32_le()?;
                self.set_pending_expire(i64::from(secs) * 1000, 4);
                Ok(Step::Metadata)
            }
            opcode::EXPIRETIME_MS => {
                let ms = self.reader.read_i64_le()?;
                self.set_pending_expire(ms, 8);
                Ok(Step::Metadata)
            }
            opcode::IDLE => {
                read_length(&mut self.reader)?;
                Ok(Step::Metadata)
            }
            opcode::FREQ => {
                self.reader.read_u8()?;
                Ok(Step::Metadata)
            }
            opcode::MODULE_AUX => {
                self.read_module_aux()?;
                Ok(Step::Metadata)
            }
            opcode::FUNCTION2 => {
                let len = skip_string(&mut self.reader)?;
                trace!(len, "function library");
                Ok(Step::Metadata)
            }
            opcode::SLOT_INFO => {
                let slot = read_length(&mut self.reader)?;
                let slot_size = read_length(&mut self.reader)?;
                let expires_slot_size = read_length(&mut self.reader)?;
                trace!(slot, slot_size, expires_slot_size, "slot info");
                Ok(Step::Metadata)
            }
            tag => match Encoding::from_tag(tag) {
                Some(encoding) => self.read_key_value(encoding).map(Step::Entry),
                None => Err(ErrorKind::UnsupportedEncoding {
                    offset,
                    what: if tag == opcode::FUNCTION_PRE_GA {
                        "opcode"
                    } else {
                        "value type"
                    },
                    tag,
                }
                .into()),
            },
        }
    }

    fn read_key_value(&mut self, encoding: Encoding) -> Result<Entry> {
        let start = self.reader.offset();
        let key = read_string(&mut self.reader)?;
        let value = value::decode_value(&mut self.reader, encoding)?;
        let expire = self.pending_expire.take();

        let bytes = self.reader.offset() - start + expire.as_ref().map_or(0, |e| e.width);
        self.keys += 1;

        trace!(
            offset = start,
            bytes,
            elements = value.elements,
            %encoding,
            "key"
        );

        Ok(Entry {
            key,
            data_type: value.data_type,
            encoding,
            bytes,
            elements: value.elements,
            expire_at: expire.map(|e| e.at),
            database: self.database,
        })
    }

    fn read_module_aux(&mut self) -> Result<()> {
        let module_id = read_length(&mut self.reader)?;
        let offset = self.reader.offset();
        let when_opcode = read_length(&mut self.reader)?;
        if when_opcode != module_opcode::UINT {
            return Err(ErrorKind::MalformedLength {
                offset,
                description: format!("module aux when opcode {}", when_opcode),
            }
            .into());
        }
        let when = read_length(&mut self.reader)?;
        value::skip_module_opcodes(&mut self.reader)?;
        debug!(module = %module_name(module_id), when, "module aux");
        Ok(())
    }

    fn set_pending_expire(&mut self, at: i64, width: u64) {
        if self.pending_expire.is_some() {
            warn!(offset = self.reader.offset(), "expire record without a key, replaced");
        }
        self.pending_expire = Some(PendingExpire { at, width });
    }

    fn drop_pending_expire(&mut self, reason: &str) {
        if let Some(expire) = self.pending_expire.take() {
            warn!(
                offset = self.reader.offset(),
                expire_at = expire.at,
                "expire record followed by {}, dropped",
                reason
            );
        }
    }

    fn finish_file(&mut self) -> Result<Outcome> {
        self.drop_pending_expire("end of file");

        let computed = self.reader.take_checksum();
        let checksum = if self.version < CHECKSUM_VERSION {
            Checksum::Absent
        } else if self.reader.remaining() == 0 {
            warn!("checksum trailer missing");
            Checksum::Absent
        } else {
            match (self.reader.read_u64_le()?, computed) {
                (0, _) => Checksum::Disabled,
                (stored, None) => Checksum::Skipped { stored },
                (stored, Some(computed)) if stored == computed => {
                    Checksum::Valid { value: stored }
                }
                (stored, Some(computed)) => {
                    warn!(
                        stored = %format!("{:016x}", stored),
                        computed = %format!("{:016x}", computed),
                        "checksum mismatch"
                    );
                    Checksum::Mismatch { stored, computed }
                }
            }
        };

        let trailing = self.reader.remaining();
        if trailing > 0 {
            warn!(trailing, offset = self.reader.offset(), "trailing bytes after dump");
        }

        Ok(Outcome {
            version: self.version,
            keys: self.keys,
            bytes: self.reader.offset(),
            aux: std::mem::take(&mut self.aux),
            checksum,
        })
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }
        self.next_entry().transpose()
    }
}
