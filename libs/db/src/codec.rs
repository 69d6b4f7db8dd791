//! Record codec facade.
//!
//! [`RecordCodec`] drives the resolver over a shared [`Schema`] for dynamic
//! [`RecordValue`]s; [`ShapeCodec`] does the same for a typed
//! [`RecordShape`]. Both are cheap to clone and safe to use from many
//! threads at once.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::Result;
use crate::index::ColumnIndex;
use crate::resolver::{self, Resolution};
use crate::row::{Column, Family, Row, RowMutation, TimestampMicros};
use crate::schema::Schema;
use crate::shape::{RecordShape, SchemaCache};
use crate::value::RecordValue;

// ============================================================================
// RecordCodec
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordCodec {
    schema: Arc<Schema>,
}

impl RecordCodec {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        RecordCodec {
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Flatten `record` into `(qualifier, bytes)` entries in declared field
    /// order. Absent optionals contribute nothing.
    pub fn encode(&self, record: &RecordValue) -> Result<Vec<(String, Vec<u8>)>> {
        let mut entries = Vec::new();
        resolver::flatten_fields(None, self.schema.fields(), record, &mut entries)?;
        tracing::trace!(
            schema = self.schema.name(),
            columns = entries.len(),
            "encoded record"
        );
        Ok(entries)
    }

    /// Encode into a qualifier-sorted family, every cell stamped `timestamp`.
    pub fn encode_family(
        &self,
        family: &str,
        timestamp: TimestampMicros,
        record: &RecordValue,
    ) -> Result<Family> {
        Ok(Family::assemble(family, timestamp, self.encode(record)?))
    }

    /// Encode into a single-family write request.
    pub fn to_mutation(
        &self,
        row_key: impl Into<Vec<u8>>,
        family: &str,
        timestamp: TimestampMicros,
        record: &RecordValue,
    ) -> Result<RowMutation> {
        Ok(RowMutation::from_entries(
            row_key,
            family,
            timestamp,
            self.encode(record)?,
        ))
    }

    /// Rebuild a record from a qualifier-sorted column list.
    ///
    /// Fails with `UnsortedColumns` if the list is out of order and with
    /// `MissingRequiredField` if a required leaf has neither a stored value
    /// nor a default.
    pub fn decode(&self, columns: &[Column]) -> Result<Resolution<RecordValue>> {
        let index = ColumnIndex::new(columns)?;
        let resolved = resolver::resolve_fields(index, None, self.schema.fields())?;
        tracing::trace!(
            schema = self.schema.name(),
            columns = columns.len(),
            resolution = resolved.label(),
            "decoded record"
        );
        Ok(resolved)
    }

    /// Decode the named family of `row`. A missing family reads as empty.
    pub fn decode_row(&self, row: &Row, family: &str) -> Result<Resolution<RecordValue>> {
        self.decode(row.columns(family))
    }
}

// ============================================================================
// ShapeCodec
// ============================================================================

/// [`RecordCodec`] over a typed shape.
pub struct ShapeCodec<R> {
    inner: RecordCodec,
    _shape: PhantomData<fn() -> R>,
}

impl<R> Clone for ShapeCodec<R> {
    fn clone(&self) -> Self {
        ShapeCodec {
            inner: self.inner.clone(),
            _shape: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for ShapeCodec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeCodec")
            .field("schema", &self.inner.schema.name())
            .finish()
    }
}

impl<R: RecordShape> ShapeCodec<R> {
    /// Codec for `R` using the process-wide [`SchemaCache`].
    pub fn new() -> Result<Self> {
        SchemaCache::global().codec::<R>()
    }

    pub(crate) fn from_schema(schema: Arc<Schema>) -> Self {
        ShapeCodec {
            inner: RecordCodec::new(schema),
            _shape: PhantomData,
        }
    }

    pub fn record_codec(&self) -> &RecordCodec {
        &self.inner
    }

    pub fn encode(&self, value: &R) -> Result<Vec<(String, Vec<u8>)>> {
        self.inner.encode(&value.to_record())
    }

    pub fn encode_family(
        &self,
        family: &str,
        timestamp: TimestampMicros,
        value: &R,
    ) -> Result<Family> {
        self.inner.encode_family(family, timestamp, &value.to_record())
    }

    pub fn to_mutation(
        &self,
        row_key: impl Into<Vec<u8>>,
        family: &str,
        timestamp: TimestampMicros,
        value: &R,
    ) -> Result<RowMutation> {
        self.inner
            .to_mutation(row_key, family, timestamp, &value.to_record())
    }

    pub fn decode(&self, columns: &[Column]) -> Result<Resolution<R>> {
        Ok(match self.inner.decode(columns)? {
            Resolution::Found(record) => Resolution::Found(R::from_record(record)?),
            Resolution::Default(record) => Resolution::Default(R::from_record(record)?),
            Resolution::Absent => Resolution::Absent,
        })
    }

    pub fn decode_row(&self, row: &Row, family: &str) -> Result<Resolution<R>> {
        self.decode(row.columns(family))
    }
}
