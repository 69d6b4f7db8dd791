//! Typed record shapes and the per-shape schema cache.
//!
//! A Rust struct opts in by implementing [`RecordShape`]. Its schema is
//! built on first use and memoized in a [`SchemaCache`] keyed by the
//! shape's `TypeId`.
//!
//! # Thread Safety
//!
//! The cache uses `DashMap`. A miss builds the schema without holding any
//! shard lock, then inserts with first-writer-wins, so concurrent misses
//! for one shape may build twice but every caller ends up sharing the same
//! `Arc<Schema>`.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::codec::ShapeCodec;
use crate::error::Result;
use crate::schema::Schema;
use crate::value::RecordValue;

/// A Rust type with a fixed record schema.
pub trait RecordShape: Sized + 'static {
    /// Build the schema for this shape. Called at most a few times per
    /// process when used through a [`SchemaCache`].
    fn schema() -> Result<Schema>;

    fn to_record(&self) -> RecordValue;

    fn from_record(record: RecordValue) -> Result<Self>;
}

#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: DashMap<TypeId, Arc<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache.
    pub fn global() -> &'static SchemaCache {
        static GLOBAL: OnceLock<SchemaCache> = OnceLock::new();
        GLOBAL.get_or_init(SchemaCache::new)
    }

    /// Schema of `R`, building and caching it on first request.
    pub fn get_or_build<R: RecordShape>(&self) -> Result<Arc<Schema>> {
        let key = TypeId::of::<R>();
        if let Some(schema) = self.schemas.get(&key) {
            return Ok(schema.value().clone());
        }

        let built = Arc::new(R::schema()?);
        tracing::debug!(
            schema = built.name(),
            shape = std::any::type_name::<R>(),
            "cached schema for record shape"
        );
        let schema = self.schemas.entry(key).or_insert(built).value().clone();
        Ok(schema)
    }

    /// Typed codec for `R` backed by the cached schema.
    pub fn codec<R: RecordShape>(&self) -> Result<ShapeCodec<R>> {
        self.get_or_build::<R>().map(ShapeCodec::from_schema)
    }

    pub fn contains<R: RecordShape>(&self) -> bool {
        self.schemas.contains_key(&TypeId::of::<R>())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
