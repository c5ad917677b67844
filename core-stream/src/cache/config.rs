//! Disk cache configuration and policies

use std::path::{Path, PathBuf};

/// Configuration for the chunked disk cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Base directory the cache directory is created under.
    pub root_dir: PathBuf,

    /// Name of the cache directory (relative to `root_dir`).
    pub directory: String,

    /// Maximum cache size in bytes. `None` (the default) means the cache is
    /// never evicted; consistency, not durability, is the guarantee either way.
    pub max_size_bytes: Option<u64>,
}

impl CacheConfig {
    /// Create a configuration rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            directory: "stream_cache".to_string(),
            max_size_bytes: None,
        }
    }

    /// Set the cache directory name.
    pub fn with_directory(mut self, dir: impl Into<String>) -> Self {
        self.directory = dir.into();
        self
    }

    /// Bound the cache size; oldest tracks are evicted once exceeded.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = Some(bytes);
        self
    }

    /// The full cache directory path.
    pub fn cache_path(&self) -> PathBuf {
        self.root_dir.join(&self.directory)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.root_dir.as_os_str().is_empty() {
            return Err("root_dir cannot be empty".to_string());
        }

        if self.directory.is_empty() {
            return Err("directory cannot be empty".to_string());
        }

        if Path::new(&self.directory).components().count() != 1 {
            return Err("directory must be a single path component".to_string());
        }

        if self.max_size_bytes == Some(0) {
            return Err("max_size_bytes must be greater than 0 when set".to_string());
        }

        Ok(())
    }
}
