use serde::Deserialize;

// Analyzer configuration.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    // Entries buffered between the decoder and its consumer.
    channel_capacity: Option<usize>,
    // Compute the crc64 of the file and compare it with the trailer.
    verify_checksum: Option<bool>,
    // Largest keys retained per file.
    top_keys: Option<usize>,
    // Largest key prefixes reported per file, 0 disables prefix counting.
    top_prefixes: Option<usize>,
    // Characters splitting a key into prefixes.
    separators: Option<String>,
}

impl Config {
    const DEFAULT_CHANNEL_CAPACITY: usize = 64;
    const DEFAULT_VERIFY_CHECKSUM: bool = true;
    const DEFAULT_TOP_KEYS: usize = 100;
    const DEFAULT_TOP_PREFIXES: usize = 100;
    const DEFAULT_SEPARATORS: &'static str = ":";

    pub fn set_channel_capacity(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.channel_capacity = Some(std::cmp::max(val, 1));
        }
    }
    pub fn set_verify_checksum(&mut self, val: Option<bool>) {
        if let Some(val) = val {
            self.verify_checksum = Some(val);
        }
    }
    pub fn set_top_keys(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.top_keys = Some(val);
        }
    }
    pub fn set_top_prefixes(&mut self, val: Option<usize>) {
        if let Some(val) = val {
            self.top_prefixes = Some(val);
        }
    }
    pub fn set_separators(&mut self, val: &mut Option<String>) {
        if let Some(val) = val.take() {
            self.separators = Some(val);
        }
    }
    pub(crate) fn override_merge(&mut self, other: &mut Config) {
        self.set_channel_capacity(other.channel_capacity);
        self.set_verify_checksum(other.verify_checksum);
        self.set_top_keys(other.top_keys);
        self.set_top_prefixes(other.top_prefixes);
        self.set_separators(&mut other.separators);
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
            .unwrap_or(Config::DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn verify_checksum(&self) -> bool {
        self.verify_checksum
            .unwrap_or(Config::DEFAULT_VERIFY_CHECKSUM)
    }

    pub fn top_keys(&self) -> usize {
        self.top_keys.unwrap_or(Config::DEFAULT_TOP_KEYS)
    }

    pub fn top_prefixes(&self) -> usize {
        self.top_prefixes.unwrap_or(Config::DEFAULT_TOP_PREFIXES)
    }

    pub fn separators(&self) -> &str {
        self.separators
            .as_deref()
            .unwrap_or(Config::DEFAULT_SEPARATORS)
    }
}
