// Record <-> wide-column codec engine for widerow

mod error;
pub use error::{CodecError, Result, ValueError};

pub mod primitive;
pub use primitive::{Adapter, Codec, Decimal};

pub mod value;
pub use value::{RecordValue, ScalarCodec, ScalarType, ScalarValue, TypedScalar, Value};

pub mod qualifier;

pub mod row;
pub use row::{Cell, Column, Family, Row, RowMutation, SetCell, TimestampMicros};

pub mod index;
pub use index::ColumnIndex;

mod resolver;
pub use resolver::Resolution;

pub mod schema;
pub use schema::{FieldKind, FieldSpec, Schema, SchemaDescription};

pub mod shape;
pub use shape::{RecordShape, SchemaCache};

mod codec;
pub use codec::{RecordCodec, ShapeCodec};

pub mod json;

pub mod store;
pub use store::{RowStore, StoreConfig};
