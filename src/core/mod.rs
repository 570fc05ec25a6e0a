//! Consumers of the decoder: the producer pipeline, the aggregator and per-file reports.

mod config;
pub use self::config::Config;

mod counter;
pub use self::counter::{
    Counter, KeySummary, LengthLevel, LevelStats, PrefixStats, Summary, TypeStats, TypeSummary,
};

mod pipeline;
pub use self::pipeline::{count_file, decode_file, decode_reader, EntryStream};

mod report;
pub use self::report::{FileIndex, FileReport};
