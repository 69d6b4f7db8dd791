//! Configuration for the local row store.

// ============================================================================
// StoreConfig
// ============================================================================

/// RocksDB tuning for a [`RowStore`](super::RowStore).
///
/// One LRU block cache is shared by every column family of the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Total block cache size in bytes.
    /// Default: 64MB.
    pub cache_size_bytes: usize,

    /// Data block size for every column family.
    /// Default: 4KB. Row prefixes are short, so small blocks keep point
    /// reads cheap.
    pub block_size: usize,

    /// Bloom filter bits per key. `0.0` disables the filter.
    /// Default: 10.
    pub bloom_bits_per_key: f64,

    /// Whether to cache index and filter blocks in the block cache.
    /// Default: true.
    pub cache_index_and_filter_blocks: bool,

    /// Create the database directory on a read-write open if it is missing.
    /// Default: true. Ignored by read-only opens.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_size_bytes: 64 * 1024 * 1024, // 64MB
            block_size: 4 * 1024,               // 4KB
            bloom_bits_per_key: 10.0,
            cache_index_and_filter_blocks: true,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Create config with specified cache size, using defaults for other settings.
    pub fn with_cache_size(cache_size_bytes: usize) -> Self {
        Self {
            cache_size_bytes,
            ..Default::default()
        }
    }

    /// Config that refuses to create a new database.
    pub fn existing_only() -> Self {
        Self {
            create_if_missing: false,
            ..Default::default()
        }
    }
}
