use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::common::Time;
use crate::rdb::Encoding;

/// Logical type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    String,
    List,
    Hash,
    Set,
    #[serde(rename = "sortedset")]
    SortedSet,
    Stream,
    Module,
    Unknown,
}

impl Type {
    pub const ALL: [Type; 8] = [
        Type::String,
        Type::List,
        Type::Hash,
        Type::Set,
        Type::SortedSet,
        Type::Stream,
        Type::Module,
        Type::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Type::String => "string",
            Type::List => "list",
            Type::Hash => "hash",
            Type::Set => "set",
            Type::SortedSet => "sortedset",
            Type::Stream => "stream",
            Type::Module => "module",
            Type::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Type {
    type Err = std::convert::Infallible;

    // Names that are not recognized map to Unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Type::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(Type::Unknown))
    }
}

/// One top level key of the dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Vec<u8>,
    pub data_type: Type,
    pub encoding: Encoding,
    // Serialized bytes of the record (key, value and expire payload).
    pub bytes: u64,
    // Members of the value, or string length for strings.
    pub elements: u64,
    // Milliseconds since January 1,1970 UTC
    pub expire_at: Option<i64>,
    pub database: u64,
}

impl Entry {
    pub fn key_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    pub fn expire_time(&self) -> Option<Time> {
        self.expire_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        for t in Type::ALL {
            assert_eq!(t.as_str().parse::<Type>().unwrap(), t);
        }
        assert_eq!("ZSET".parse::<Type>().unwrap(), Type::Unknown);
        assert_eq!("Hash".parse::<Type>().unwrap(), Type::Hash);
        assert_eq!(
            serde_json::to_string(&Type::SortedSet).unwrap(),
            r#""sortedset""#
        );
    }

    #[test]
    fn lossy_key_and_expire() {
        let entry = Entry {
            key: vec![b'k', 0xFF, b'y'],
            data_type: Type::String,
            encoding: Encoding::String,
            bytes: 10,
            elements: 3,
            expire_at: Some(1_700_000_000_000),
            database: 0,
        };
        assert_eq!(entry.key_lossy(), "k\u{FFFD}y");
        assert_eq!(
            entry.expire_time().unwrap().to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }
}
