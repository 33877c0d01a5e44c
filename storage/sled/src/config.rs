use std::path::{Path, PathBuf};

/// Settings for [`crate::SledStorageEngine`].
///
/// Each database lives in its own sled directory under `path`, or in a temporary
/// directory that disappears with the engine when `temporary` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SledConfig {
    pub path: Option<PathBuf>,
    pub temporary: bool,
    /// Flush to disk after every write before reporting it complete.
    pub durable: bool,
    pub cache_capacity: Option<u64>,
    /// Background flush interval; `None` disables background flushing.
    pub flush_every_ms: Option<u64>,
}

impl Default for SledConfig {
    fn default() -> Self { Self { path: None, temporary: false, durable: true, cache_capacity: None, flush_every_ms: Some(500) } }
}

impl SledConfig {
    pub fn new() -> Self { Self::default() }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = Some(bytes);
        self
    }

    pub fn flush_every_ms(mut self, every: Option<u64>) -> Self {
        self.flush_every_ms = every;
        self
    }

    /// Directory holding the database `name`, if the config is not temporary.
    pub fn database_path(&self, name: &str) -> Option<PathBuf> {
        if self.temporary {
            return None;
        }
        self.path.as_ref().map(|p| p.join(name))
    }

    pub(crate) fn sled_config(&self, name: &str) -> sled::Config {
        let mut config = sled::Config::new().temporary(self.temporary).flush_every_ms(self.flush_every_ms);
        if let Some(path) = self.database_path(name) {
            config = config.path(path);
        }
        if let Some(bytes) = self.cache_capacity {
            config = config.cache_capacity(bytes);
        }
        config
    }
}
