use crate::common::{trace, ErrorKind, Result};
use crate::rdb::length::{read_count, read_length};
use crate::rdb::module_opcode;
use crate::rdb::packed::Packed;
use crate::rdb::reader::Source;
use crate::rdb::string::{read_blob, skip_string};
use crate::rdb::{
    Encoding, HashEncoding, ListEncoding, SetEncoding, SortedSetEncoding, StreamEncoding, Type,
};

const QUICKLIST_NODE_PLAIN: u64 = 1;
const QUICKLIST_NODE_PACKED: u64 = 2;

const STREAM_ID_BYTES: u64 = 16;
const MILLISECOND_TIME_BYTES: u64 = 8;

// Legacy ascii doubles use these lengths as markers.
const DOUBLE_NAN: u8 = 253;
const DOUBLE_POS_INF: u8 = 254;
const DOUBLE_NEG_INF: u8 = 255;

const MODULE_NAME_CHARSET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// What decoding one value yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Value {
    pub(crate) data_type: Type,
    // File bytes consumed by the value.
    pub(crate) bytes: u64,
    pub(crate) elements: u64,
}

pub(crate) fn decode_value<S: Source>(src: &mut S, encoding: Encoding) -> Result<Value> {
    let start = src.offset();
    let elements = match encoding {
        Encoding::String => decode_string(src)?,
        Encoding::List(list) => decode_list(src, list)?,
        Encoding::Set(set) => decode_set(src, set)?,
        Encoding::SortedSet(zset) => decode_sorted_set(src, zset)?,
        Encoding::Hash(hash) => decode_hash(src, hash)?,
        Encoding::Stream(stream) => decode_stream(src, stream)?,
        Encoding::Module => decode_module(src)?,
    };

    Ok(Value {
        data_type: encoding.data_type(),
        bytes: src.offset() - start,
        elements,
    })
}

fn decode_string<S: Source>(src: &mut S) -> Result<u64> {
    skip_string(src)
}

fn decode_list<S: Source>(src: &mut S, encoding: ListEncoding) -> Result<u64> {
    match encoding {
        ListEncoding::Linked => skip_strings(src, 1),
        ListEncoding::Ziplist => packed(src, Packed::Ziplist, 1),
        ListEncoding::Quicklist => {
            let nodes = read_count(src, 1)?;
            let mut elements = 0;
            for _ in 0..nodes {
                elements += packed(src, Packed::Ziplist, 1)?;
            }
            Ok(elements)
        }
        ListEncoding::Quicklist2 => {
            // container + node string.
            let nodes = read_count(src, 2)?;
            let mut elements = 0;
            for _ in 0..nodes {
                let offset = src.offset();
                match read_length(src)? {
                    QUICKLIST_NODE_PLAIN => {
                        skip_string(src)?;
                        elements += 1;
                    }
                    QUICKLIST_NODE_PACKED => elements += packed(src, Packed::Listpack, 1)?,
                    container => {
                        return Err(ErrorKind::UnsupportedEncoding {
                            offset,
                            what: "quicklist container",
                            tag: u8::try_from(container).unwrap_or(u8::MAX),
                        }
                        .into())
                    }
                }
            }
            Ok(elements)
        }
    }
}

fn decode_set<S: Source>(src: &mut S, encoding: SetEncoding) -> Result<u64> {
    match encoding {
        SetEncoding::Hashtable => skip_strings(src, 1),
        SetEncoding::Intset => packed(src, Packed::Intset, 1),
        SetEncoding::Listpack => packed(src, Packed::Listpack, 1),
    }
}

fn decode_sorted_set<S: Source>(src: &mut S, encoding: SortedSetEncoding) -> Result<u64> {
    match encoding {
        SortedSetEncoding::Skiplist => {
            // member + ascii score.
            let members = read_count(src, 2)?;
            for _ in 0..members {
                skip_string(src)?;
                skip_ascii_double(src)?;
            }
            Ok(members)
        }
        SortedSetEncoding::Skiplist2 => {
            // member + binary double.
            let members = read_count(src, 1 + 8)?;
            for _ in 0..members {
                skip_string(src)?;
                src.skip(8)?;
            }
            Ok(members)
        }
        SortedSetEncoding::Ziplist => packed(src, Packed::Ziplist, 2),
        SortedSetEncoding::Listpack => packed(src, Packed::Listpack, 2),
    }
}

fn decode_hash<S: Source>(src: &mut S, encoding: HashEncoding) -> Result<u64> {
    match encoding {
        HashEncoding::Hashtable => skip_strings(src, 2),
        // zipmap walker already counts pairs.
        HashEncoding::Zipmap => packed(src, Packed::Zipmap, 1),
        HashEncoding::Ziplist => packed(src, Packed::Ziplist, 2),
        HashEncoding::Listpack => packed(src, Packed::Listpack, 2),
        HashEncoding::HashtableTtl => {
            // Minimum field expire time, field ttls are relative to it.
            src.skip(MILLISECOND_TIME_BYTES)?;
            let fields = read_count(src, 3)?;
            for _ in 0..fields {
                read_length(src)?;
                skip_string(src)?;
                skip_string(src)?;
            }
            Ok(fields)
        }
        HashEncoding::ListpackTtl => {
            src.skip(MILLISECOND_TIME_BYTES)?;
            // field, value, ttl triplets.
            packed(src, Packed::Listpack, 3)
        }
    }
}

fn decode_stream<S: Source>(src: &mut S, encoding: StreamEncoding) -> Result<u64> {
    // master id + listpack.
    let nodes = read_count(src, 2)?;
    for _ in 0..nodes {
        let offset = src.offset();
        let node_key = read_blob(src)?;
        if node_key.len() as u64 != STREAM_ID_BYTES {
            return Err(ErrorKind::MalformedLength {
                offset,
                description: format!("stream node key of {} bytes", node_key.len()),
            }
            .into());
        }

        let offset = src.offset();
        let listpack = read_blob(src)?;
        if Packed::Listpack.entries(&listpack, offset)? == 0 {
            return Err(ErrorKind::MalformedLength {
                offset,
                description: "empty stream listpack".into(),
            }
            .into());
        }
    }

    let length = read_length(src)?;
    // last id
    read_length(src)?;
    read_length(src)?;

    if encoding >= StreamEncoding::Listpacks2 {
        // first id
        read_length(src)?;
        read_length(src)?;
        // max deleted entry id
        read_length(src)?;
        read_length(src)?;
        // entries added
        read_length(src)?;
    }

    // name, last id, pel and consumers counts.
    let groups = read_count(src, 5)?;
    for _ in 0..groups {
        skip_string(src)?;
        read_length(src)?;
        read_length(src)?;
        if encoding >= StreamEncoding::Listpacks2 {
            // entries read
            read_length(src)?;
        }

        // id + delivery time + delivery count.
        let pending = read_count(src, STREAM_ID_BYTES + MILLISECOND_TIME_BYTES + 1)?;
        for _ in 0..pending {
            src.skip(STREAM_ID_BYTES + MILLISECOND_TIME_BYTES)?;
            read_length(src)?;
        }

        // name, seen time, pel count.
        let consumers = read_count(src, 1 + MILLISECOND_TIME_BYTES + 1)?;
        for _ in 0..consumers {
            skip_string(src)?;
            src.skip(MILLISECOND_TIME_BYTES)?;
            if encoding >= StreamEncoding::Listpacks3 {
                // active time
                src.skip(MILLISECOND_TIME_BYTES)?;
            }
            let pending = read_count(src, STREAM_ID_BYTES)?;
            src.skip(pending * STREAM_ID_BYTES)?;
        }
    }

    Ok(length)
}

fn decode_module<S: Source>(src: &mut S) -> Result<u64> {
    let module_id = read_length(src)?;
    trace!(module = %module_name(module_id), "module value");
    skip_module_opcodes(src)?;
    Ok(0)
}

/// Skip a module serialized payload up to its EOF opcode.
pub(crate) fn skip_module_opcodes<S: Source>(src: &mut S) -> Result<()> {
    loop {
        let offset = src.offset();
        match read_length(src)? {
            module_opcode::EOF => return Ok(()),
            module_opcode::SINT | module_opcode::UINT => {
                read_length(src)?;
            }
            module_opcode::FLOAT => src.skip(4)?,
            module_opcode::DOUBLE => src.skip(8)?,
            module_opcode::STRING => {
                skip_string(src)?;
            }
            opcode => {
                return Err(ErrorKind::UnsupportedEncoding {
                    offset,
                    what: "module opcode",
                    tag: u8::try_from(opcode).unwrap_or(u8::MAX),
                }
                .into())
            }
        }
    }
}

/// Module type name encoded in the upper 54 bits of a module id.
pub(crate) fn module_name(module_id: u64) -> String {
    let mut name = [0_u8; 9];
    let mut id = module_id >> 10;
    for c in name.iter_mut().rev() {
        *c = MODULE_NAME_CHARSET[(id & 63) as usize];
        id >>= 6;
    }
    String::from_utf8_lossy(&name).into_owned()
}

fn skip_strings<S: Source>(src: &mut S, per_item: u64) -> Result<u64> {
    let items = read_count(src, per_item)?;
    for _ in 0..items {
        for _ in 0..per_item {
            skip_string(src)?;
        }
    }
    Ok(items)
}

fn skip_ascii_double<S: Source>(src: &mut S) -> Result<()> {
    match src.read_u8()? {
        DOUBLE_NAN | DOUBLE_POS_INF | DOUBLE_NEG_INF => Ok(()),
        len => src.skip(u64::from(len)),
    }
}

// Read a packed blob and count its entries in groups of `group`.
fn packed<S: Source>(src: &mut S, kind: Packed, group: u64) -> Result<u64> {
    let offset = src.offset();
    let blob = read_blob(src)?;
    kind.groups(&blob, offset, group)
}
