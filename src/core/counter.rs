use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use serde::Serialize;

use crate::core::Config;
use crate::rdb::{Entry, Type};

const DEFAULT_SEPARATORS: &[u8] = b":";

/// Count and serialized bytes of a group of keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    pub count: u64,
    pub bytes: u64,
}

impl TypeStats {
    fn add(&mut self, bytes: u64) {
        self.count += 1;
        self.bytes += bytes;
    }
}

/// Bucket of element counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum LengthLevel {
    #[serde(rename = "<100")]
    Under100,
    #[serde(rename = "<1000")]
    Under1000,
    #[serde(rename = "<10000")]
    Under10000,
    #[serde(rename = "<100000")]
    Under100000,
    #[serde(rename = ">=100000")]
    Huge,
}

impl LengthLevel {
    pub fn of(elements: u64) -> Self {
        match elements {
            0..=99 => LengthLevel::Under100,
            100..=999 => LengthLevel::Under1000,
            1000..=9999 => LengthLevel::Under10000,
            10000..=99999 => LengthLevel::Under100000,
            _ => LengthLevel::Huge,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LengthLevel::Under100 => "<100",
            LengthLevel::Under1000 => "<1000",
            LengthLevel::Under10000 => "<10000",
            LengthLevel::Under100000 => "<100000",
            LengthLevel::Huge => ">=100000",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixStats {
    pub data_type: Type,
    pub prefix: String,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub data_type: Type,
    pub level: LengthLevel,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    pub data_type: Type,
    pub count: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySummary {
    pub key: String,
    pub data_type: Type,
    pub encoding: String,
    pub bytes: u64,
    pub elements: u64,
    pub database: u64,
    pub expire_at: Option<String>,
}

impl From<&Entry> for KeySummary {
    fn from(entry: &Entry) -> Self {
        Self {
            key: entry.key_lossy().into_owned(),
            data_type: entry.data_type,
            encoding: entry.encoding.to_string(),
            bytes: entry.bytes,
            elements: entry.elements,
            database: entry.database,
            expire_at: entry.expire_time().map(|t| t.to_rfc3339()),
        }
    }
}

/// Serializable snapshot of a [`Counter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: TypeStats,
    pub types: Vec<TypeSummary>,
    pub largest_keys: Vec<KeySummary>,
    pub largest_prefixes: Vec<PrefixStats>,
    pub length_levels: Vec<LevelStats>,
}

// Entry retained in the top-N heap.
struct Ranked {
    entry: Entry,
    // Arrival order.
    seq: u64,
}

impl Ranked {
    fn bytes(&self) -> u64 {
        self.entry.bytes
    }
}

// Smaller bytes rank lower, later arrivals rank lower among equals, so
// the heap minimum is the first candidate for eviction.
impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes()
            .cmp(&other.bytes())
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Aggregates entries of one dump file.
pub struct Counter {
    capacity: usize,
    seq: u64,
    largest: BinaryHeap<Reverse<Ranked>>,
    total: TypeStats,
    types: BTreeMap<Type, TypeStats>,
    levels: BTreeMap<(Type, LengthLevel), TypeStats>,
    // None when prefix counting is disabled.
    prefixes: Option<HashMap<(Type, Vec<u8>), TypeStats>>,
    prefix_limit: usize,
    separators: Vec<u8>,
}

impl Counter {
    /// Counter retaining the `capacity` largest keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seq: 0,
            largest: BinaryHeap::with_capacity(capacity.min(1024) + 1),
            total: TypeStats::default(),
            types: BTreeMap::new(),
            levels: BTreeMap::new(),
            prefixes: Some(HashMap::new()),
            prefix_limit: capacity,
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }

    pub fn with_config(config: &Config) -> Self {
        let mut counter = Counter::new(config.top_keys());
        counter.prefix_limit = config.top_prefixes();
        if counter.prefix_limit == 0 {
            counter.prefixes = None;
        }
        counter.separators = config.separators().as_bytes().to_vec();
        counter
    }

    pub fn count(&mut self, entry: Entry) {
        let data_type = entry.data_type;

        self.total.add(entry.bytes);
        self.types.entry(data_type).or_default().add(entry.bytes);
        self.levels
            .entry((data_type, LengthLevel::of(entry.elements)))
            .or_default()
            .add(entry.bytes);

        if let Some(prefixes) = self.prefixes.as_mut() {
            for prefix in key_prefixes(&entry.key, &self.separators) {
                prefixes
                    .entry((data_type, prefix.to_vec()))
                    .or_default()
                    .add(entry.bytes);
            }
        }

        self.offer(entry);
    }

    fn offer(&mut self, entry: Entry) {
        if self.capacity == 0 {
            return;
        }

        let ranked = Ranked {
            entry,
            seq: self.seq,
        };
        self.seq += 1;

        if self.largest.len() < self.capacity {
            self.largest.push(Reverse(ranked));
            return;
        }

        let replace = match self.largest.peek() {
            Some(Reverse(min)) => ranked.bytes() > min.bytes(),
            None => false,
        };
        if replace {
            self.largest.pop();
            self.largest.push(Reverse(ranked));
        }
    }

    /// Retained entries, largest first, ties in arrival order.
    pub fn largest(&self, n: usize) -> Vec<&Entry> {
        let mut ranked: Vec<&Ranked> = self.largest.iter().map(|Reverse(r)| r).collect();
        ranked.sort_by(|a, b| b.cmp(a));
        ranked.into_iter().take(n).map(|r| &r.entry).collect()
    }

    pub fn total(&self) -> TypeStats {
        self.total
    }

    pub fn types(&self) -> Vec<(Type, TypeStats)> {
        self.types.iter().map(|(t, s)| (*t, *s)).collect()
    }

    /// Prefixes ranked by bytes, then by name.
    pub fn largest_prefixes(&self, n: usize) -> Vec<PrefixStats> {
        let prefixes = match self.prefixes.as_ref() {
            Some(prefixes) => prefixes,
            None => return Vec::new(),
        };

        let mut ranked: Vec<_> = prefixes.iter().collect();
        ranked.sort_by(|((ta, pa), a), ((tb, pb), b)| {
            b.bytes
                .cmp(&a.bytes)
                .then_with(|| pa.cmp(pb))
                .then_with(|| ta.cmp(tb))
        });

        ranked
            .into_iter()
            .take(n)
            .map(|((data_type, prefix), stats)| PrefixStats {
                data_type: *data_type,
                prefix: String::from_utf8_lossy(prefix).into_owned(),
                count: stats.count,
                bytes: stats.bytes,
            })
            .collect()
    }

    pub fn length_levels(&self) -> Vec<LevelStats> {
        self.levels
            .iter()
            .map(|((data_type, level), stats)| LevelStats {
                data_type: *data_type,
                level: *level,
                count: stats.count,
                bytes: stats.bytes,
            })
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total: self.total,
            types: self
                .types
                .iter()
                .map(|(data_type, stats)| TypeSummary {
                    data_type: *data_type,
                    count: stats.count,
                    bytes: stats.bytes,
                })
                .collect(),
            largest_keys: self
                .largest(self.capacity)
                .into_iter()
                .map(KeySummary::from)
                .collect(),
            largest_prefixes: self.largest_prefixes(self.prefix_limit),
            length_levels: self.length_levels(),
        }
    }
}

// Leading segments of key ending before each separator. Trailing separators are
// trimmed, empty and repeated prefixes are skipped.
fn key_prefixes<'a>(key: &'a [u8], separators: &[u8]) -> Vec<&'a [u8]> {
    let mut prefixes: Vec<&[u8]> = Vec::new();
    for (i, b) in key.iter().enumerate() {
        if !separators.contains(b) {
            continue;
        }
        let mut prefix = &key[..i];
        while let Some((last, rest)) = prefix.split_last() {
            if !separators.contains(last) {
                break;
            }
            prefix = rest;
        }
        if prefix.is_empty() || prefixes.last() == Some(&prefix) {
            continue;
        }
        prefixes.push(prefix);
    }
    prefixes
}
