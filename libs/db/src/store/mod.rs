//! Local RocksDB row store.
//!
//! Each wide-column family is its own RocksDB column family. Within a
//! family, one stored entry per `(row, qualifier)` holds the newest cell;
//! see [`keys`] for the layout.
//!
//! ```text
//!   RowMutation ──apply──▶ WriteBatch ──▶ CF "<family>"
//!   read_row(key) ◀── prefix scan of every CF ◀── row_prefix(key)
//! ```

mod config;
pub mod keys;

pub use config::StoreConfig;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rocksdb::{BlockBasedOptions, ColumnFamilyDescriptor, Options, WriteBatch, DB};

use crate::row::{Column, Family, Row, RowMutation};

/// RocksDB's built-in column family. Never used for row data.
const DEFAULT_CF: &str = rocksdb::DEFAULT_COLUMN_FAMILY_NAME;

// ============================================================================
// RowStore
// ============================================================================

pub struct RowStore {
    db: DB,
    path: PathBuf,
    families: Vec<String>,
    read_only: bool,
    // Shared by every CF's table options; kept alive with the DB.
    _block_cache: rocksdb::Cache,
}

impl RowStore {
    /// Open read-write, creating any of `families` that do not exist yet.
    /// Families already present on disk stay available.
    #[tracing::instrument(skip(path, families, config), fields(path = ?path.as_ref()))]
    pub fn open<I, S>(path: impl AsRef<Path>, families: I, config: &StoreConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.as_ref();
        validate_path(path)?;

        let mut names: BTreeSet<String> = existing_families(path).into_iter().collect();
        for family in families {
            let family = family.into();
            if family.is_empty() || family == DEFAULT_CF {
                anyhow::bail!("Invalid column family name: {:?}", family);
            }
            names.insert(family);
        }

        let cache = rocksdb::Cache::new_lru_cache(config.cache_size_bytes);
        let descriptors = descriptors(&names, &cache, config);

        let mut options = Options::default();
        options.set_error_if_exists(false);
        options.create_if_missing(config.create_if_missing);
        options.create_missing_column_families(true);
        let num_cpus = std::thread::available_parallelism()
            .map(|p| p.get() as i32)
            .unwrap_or(4);
        options.increase_parallelism(num_cpus);

        let db = DB::open_cf_descriptors(&options, path, descriptors)
            .with_context(|| format!("Failed to open row store at {}", path.display()))?;

        tracing::info!(
            families = names.len(),
            cache_mb = config.cache_size_bytes / (1024 * 1024),
            "Opened row store"
        );
        Ok(RowStore {
            db,
            path: path.to_path_buf(),
            families: names.into_iter().collect(),
            read_only: false,
            _block_cache: cache,
        })
    }

    /// Open an existing store read-only with every family found on disk.
    #[tracing::instrument(skip(path, config), fields(path = ?path.as_ref()))]
    pub fn open_readonly(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        validate_path(path)?;
        if !path.exists() {
            anyhow::bail!("Row store does not exist: {}", path.display());
        }

        let names: BTreeSet<String> = DB::list_cf(&Options::default(), path)
            .with_context(|| format!("Failed to list column families at {}", path.display()))?
            .into_iter()
            .filter(|name| name != DEFAULT_CF)
            .collect();

        let cache = rocksdb::Cache::new_lru_cache(config.cache_size_bytes);
        let descriptors = descriptors(&names, &cache, config);

        let mut options = Options::default();
        options.create_if_missing(false);
        options.create_missing_column_families(false);

        let db = DB::open_cf_descriptors_read_only(&options, path, descriptors, false)
            .with_context(|| format!("Failed to open row store at {}", path.display()))?;

        tracing::info!(families = names.len(), "Opened row store read-only");
        Ok(RowStore {
            db,
            path: path.to_path_buf(),
            families: names.into_iter().collect(),
            read_only: true,
            _block_cache: cache,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Family names, sorted.
    pub fn families(&self) -> &[String] {
        &self.families
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Write every cell of `mutation` atomically.
    ///
    /// All families are checked before anything is written. Repeated writes
    /// to one qualifier within a mutation keep the cell
    /// [`Row::from_mutation`] reads first: newest timestamp, and among equal
    /// timestamps the later write. A stored cell is replaced by the next
    /// `apply` regardless of timestamps.
    #[tracing::instrument(skip(self, mutation), fields(cells = mutation.len()))]
    pub fn apply(&self, mutation: &RowMutation) -> Result<()> {
        if self.read_only {
            anyhow::bail!("Row store is read-only: {}", self.path.display());
        }

        let row = Row::from_mutation(mutation);
        let mut batch = WriteBatch::default();
        for family in row.families() {
            let cf = self.cf(&family.name)?;
            for column in &family.columns {
                let Some(cell) = column.first_cell() else {
                    continue;
                };
                let key = keys::cell_key(&mutation.row_key, &column.qualifier)?;
                batch.put_cf(cf, key, keys::encode_cell_value(cell));
            }
        }

        self.db.write(batch)?;
        tracing::debug!(row_key_len = mutation.row_key.len(), "Applied row mutation");
        Ok(())
    }

    /// Read every family of one row. `None` when nothing is stored.
    #[tracing::instrument(skip(self, row_key))]
    pub fn read_row(&self, row_key: &[u8]) -> Result<Option<Row>> {
        let prefix = keys::row_prefix(row_key)?;
        let mut row = Row::new(row_key);

        for name in &self.families {
            let cf = self.cf(name)?;
            let mut columns = Vec::new();
            for item in self.db.prefix_iterator_cf(cf, &prefix) {
                let (key, value) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                let cell = keys::decode_cell_value(&value)
                    .with_context(|| format!("Corrupt cell in family {name}"))?;
                columns.push(Column::new(&key[prefix.len()..], vec![cell]));
            }
            if !columns.is_empty() {
                row.insert_family(Family::new(name.clone(), columns));
            }
        }

        if row.families().is_empty() {
            tracing::debug!("Row not found");
            return Ok(None);
        }
        Ok(Some(row))
    }

    /// Delete every stored cell of one row. Returns the number removed.
    #[tracing::instrument(skip(self, row_key))]
    pub fn delete_row(&self, row_key: &[u8]) -> Result<usize> {
        if self.read_only {
            anyhow::bail!("Row store is read-only: {}", self.path.display());
        }

        let prefix = keys::row_prefix(row_key)?;
        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for name in &self.families {
            let cf = self.cf(name)?;
            for item in self.db.prefix_iterator_cf(cf, &prefix) {
                let (key, _) = item?;
                if !key.starts_with(&prefix) {
                    break;
                }
                batch.delete_cf(cf, key);
                removed += 1;
            }
        }

        self.db.write(batch)?;
        tracing::debug!(removed, "Deleted row");
        Ok(removed)
    }

    fn cf(&self, family: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(family)
            .filter(|_| family != DEFAULT_CF)
            .ok_or_else(|| anyhow::anyhow!("Unknown column family: {}", family))
    }
}

impl std::fmt::Debug for RowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStore")
            .field("path", &self.path)
            .field("families", &self.families)
            .field("read_only", &self.read_only)
            .finish()
    }
}

fn validate_path(path: &Path) -> Result<()> {
    match path.try_exists() {
        Err(e) => Err(e.into()),
        Ok(true) if path.is_symlink() => {
            Err(anyhow::anyhow!("Path is a symlink: {}", path.display()))
        }
        Ok(true) if path.is_file() => Err(anyhow::anyhow!("Path is a file: {}", path.display())),
        Ok(_) => Ok(()),
    }
}

fn existing_families(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }
    DB::list_cf(&Options::default(), path)
        .map(|names| names.into_iter().filter(|n| n != DEFAULT_CF).collect())
        .unwrap_or_default()
}

fn descriptors(
    names: &BTreeSet<String>,
    cache: &rocksdb::Cache,
    config: &StoreConfig,
) -> Vec<ColumnFamilyDescriptor> {
    names
        .iter()
        .map(|name| ColumnFamilyDescriptor::new(name, family_options(cache, config)))
        .collect()
}

fn family_options(cache: &rocksdb::Cache, config: &StoreConfig) -> Options {
    let mut block_opts = BlockBasedOptions::default();
    block_opts.set_block_cache(cache);
    block_opts.set_block_size(config.block_size);
    if config.cache_index_and_filter_blocks {
        block_opts.set_cache_index_and_filter_blocks(true);
    }
    if config.bloom_bits_per_key > 0.0 {
        block_opts.set_bloom_filter(config.bloom_bits_per_key, false);
    }

    let mut opts = Options::default();
    opts.set_block_based_table_factory(&block_opts);
    opts
}
