use std::fmt;

use serde::Serialize;

use crate::rdb::Type;

/// On disk representation of a value, resolved from the value type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "encoding", rename_all = "lowercase")]
pub enum Encoding {
    String,
    List(ListEncoding),
    Set(SetEncoding),
    #[serde(rename = "sortedset")]
    SortedSet(SortedSetEncoding),
    Hash(HashEncoding),
    Stream(StreamEncoding),
    Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListEncoding {
    Linked,
    Ziplist,
    Quicklist,
    Quicklist2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetEncoding {
    Hashtable,
    Intset,
    Listpack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortedSetEncoding {
    // Scores stored as length prefixed ascii.
    Skiplist,
    // Scores stored as binary doubles.
    Skiplist2,
    Ziplist,
    Listpack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashEncoding {
    Hashtable,
    Zipmap,
    Ziplist,
    Listpack,
    // Hashtable with per field expiration.
    HashtableTtl,
    // Listpack with per field expiration.
    ListpackTtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEncoding {
    Listpacks,
    // Adds first id, max deleted id, entries added and group entries read.
    Listpacks2,
    // Adds consumer active time.
    Listpacks3,
}

mod tag {
    pub(super) const STRING: u8 = 0;
    pub(super) const LIST: u8 = 1;
    pub(super) const SET: u8 = 2;
    pub(super) const ZSET: u8 = 3;
    pub(super) const HASH: u8 = 4;
    pub(super) const ZSET_2: u8 = 5;
    pub(super) const MODULE_2: u8 = 7;
    pub(super) const HASH_ZIPMAP: u8 = 9;
    pub(super) const LIST_ZIPLIST: u8 = 10;
    pub(super) const SET_INTSET: u8 = 11;
    pub(super) const ZSET_ZIPLIST: u8 = 12;
    pub(super) const HASH_ZIPLIST: u8 = 13;
    pub(super) const LIST_QUICKLIST: u8 = 14;
    pub(super) const STREAM_LISTPACKS: u8 = 15;
    pub(super) const HASH_LISTPACK: u8 = 16;
    pub(super) const ZSET_LISTPACK: u8 = 17;
    pub(super) const LIST_QUICKLIST_2: u8 = 18;
    pub(super) const STREAM_LISTPACKS_2: u8 = 19;
    pub(super) const SET_LISTPACK: u8 = 20;
    pub(super) const STREAM_LISTPACKS_3: u8 = 21;
    pub(super) const HASH_METADATA: u8 = 24;
    pub(super) const HASH_LISTPACK_EX: u8 = 25;
}

impl Encoding {
    /// Resolve a value type tag. Returns None for tags this decoder does not know.
    pub fn from_tag(t: u8) -> Option<Encoding> {
        let encoding = match t {
            tag::STRING => Encoding::String,
            tag::LIST => Encoding::List(ListEncoding::Linked),
            tag::SET => Encoding::Set(SetEncoding::Hashtable),
            tag::ZSET => Encoding::SortedSet(SortedSetEncoding::Skiplist),
            tag::HASH => Encoding::Hash(HashEncoding::Hashtable),
            tag::ZSET_2 => Encoding::SortedSet(SortedSetEncoding::Skiplist2),
            tag::MODULE_2 => Encoding::Module,
            tag::HASH_ZIPMAP => Encoding::Hash(HashEncoding::Zipmap),
            tag::LIST_ZIPLIST => Encoding::List(ListEncoding::Ziplist),
            tag::SET_INTSET => Encoding::Set(SetEncoding::Intset),
            tag::ZSET_ZIPLIST => Encoding::SortedSet(SortedSetEncoding::Ziplist),
            tag::HASH_ZIPLIST => Encoding::Hash(HashEncoding::Ziplist),
            tag::LIST_QUICKLIST => Encoding::List(ListEncoding::Quicklist),
            tag::STREAM_LISTPACKS => Encoding::Stream(StreamEncoding::Listpacks),
            tag::HASH_LISTPACK => Encoding::Hash(HashEncoding::Listpack),
            tag::ZSET_LISTPACK => Encoding::SortedSet(SortedSetEncoding::Listpack),
            tag::LIST_QUICKLIST_2 => Encoding::List(ListEncoding::Quicklist2),
            tag::STREAM_LISTPACKS_2 => Encoding::Stream(StreamEncoding::Listpacks2),
            tag::SET_LISTPACK => Encoding::Set(SetEncoding::Listpack),
            tag::STREAM_LISTPACKS_3 => Encoding::Stream(StreamEncoding::Listpacks3),
            tag::HASH_METADATA => Encoding::Hash(HashEncoding::HashtableTtl),
            tag::HASH_LISTPACK_EX => Encoding::Hash(HashEncoding::ListpackTtl),
            _ => return None,
        };
        Some(encoding)
    }

    pub fn tag(self) -> u8 {
        match self {
            Encoding::String => tag::STRING,
            Encoding::List(list) => match list {
                ListEncoding::Linked => tag::LIST,
                ListEncoding::Ziplist => tag::LIST_ZIPLIST,
                ListEncoding::Quicklist => tag::LIST_QUICKLIST,
                ListEncoding::Quicklist2 => tag::LIST_QUICKLIST_2,
            },
            Encoding::Set(set) => match set {
                SetEncoding::Hashtable => tag::SET,
                SetEncoding::Intset => tag::SET_INTSET,
                SetEncoding::Listpack => tag::SET_LISTPACK,
            },
            Encoding::SortedSet(zset) => match zset {
                SortedSetEncoding::Skiplist => tag::ZSET,
                SortedSetEncoding::Skiplist2 => tag::ZSET_2,
                SortedSetEncoding::Ziplist => tag::ZSET_ZIPLIST,
                SortedSetEncoding::Listpack => tag::ZSET_LISTPACK,
            },
            Encoding::Hash(hash) => match hash {
                HashEncoding::Hashtable => tag::HASH,
                HashEncoding::Zipmap => tag::HASH_ZIPMAP,
                HashEncoding::Ziplist => tag::HASH_ZIPLIST,
                HashEncoding::Listpack => tag::HASH_LISTPACK,
                HashEncoding::HashtableTtl => tag::HASH_METADATA,
                HashEncoding::ListpackTtl => tag::HASH_LISTPACK_EX,
            },
            Encoding::Stream(stream) => match stream {
                StreamEncoding::Listpacks => tag::STREAM_LISTPACKS,
                StreamEncoding::Listpacks2 => tag::STREAM_LISTPACKS_2,
                StreamEncoding::Listpacks3 => tag::STREAM_LISTPACKS_3,
            },
            Encoding::Module => tag::MODULE_2,
        }
    }

    pub fn data_type(self) -> Type {
        match self {
            Encoding::String => Type::String,
            Encoding::List(_) => Type::List,
            Encoding::Set(_) => Type::Set,
            Encoding::SortedSet(_) => Type::SortedSet,
            Encoding::Hash(_) => Type::Hash,
            Encoding::Stream(_) => Type::Stream,
            Encoding::Module => Type::Module,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Encoding::String => write!(f, "string"),
            Encoding::List(e) => write!(f, "list/{:?}", e),
            Encoding::Set(e) => write!(f, "set/{:?}", e),
            Encoding::SortedSet(e) => write!(f, "sortedset/{:?}", e),
            Encoding::Hash(e) => write!(f, "hash/{:?}", e),
            Encoding::Stream(e) => write!(f, "stream/{:?}", e),
            Encoding::Module => write!(f, "module"),
        }
    }
}
