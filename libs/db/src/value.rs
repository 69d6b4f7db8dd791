//! Dynamic record values and the scalar codecs that store them.
//!
//! [`Value`] is the runtime representation of a record tree. Scalar fields
//! carry a [`ScalarCodec`], an object-safe codec over `Value`s; the built-in
//! ones come from [`ScalarType::codec`], and any typed [`Codec`] (including
//! [`Adapter`](crate::primitive::Adapter)-derived ones) can be lifted into one
//! with [`TypedScalar`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::primitive::{self, Codec, Decimal};

// ============================================================================
// Value
// ============================================================================

/// A node of a record tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    Char(u16),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    BigInt(BigInt),
    Decimal(Decimal),
    Optional(Option<Box<Value>>),
    Record(RecordValue),
}

impl Value {
    /// Short name of the variant, used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int8(_) => "int8",
            Value::Char(_) => "char",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Text(_) => "text",
            Value::BigInt(_) => "big_int",
            Value::Decimal(_) => "decimal",
            Value::Optional(_) => "optional",
            Value::Record(_) => "record",
        }
    }

    pub fn none() -> Self {
        Value::Optional(None)
    }

    pub fn some(inner: Value) -> Self {
        Value::Optional(Some(Box::new(inner)))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<RecordValue> for Value {
    fn from(record: RecordValue) -> Self {
        Value::Record(record)
    }
}

// ============================================================================
// RecordValue
// ============================================================================

/// Field values of one record, in declared field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordValue {
    fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        RecordValue {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style append.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }

    /// Remove and return the named field's value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let position = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(position).1)
    }

    /// Remove the named scalar field and convert it to `T`.
    pub fn take_scalar<T: ScalarValue>(&mut self, name: &str) -> crate::Result<T> {
        let value = self.take_required(name)?;
        let found = value.type_name();
        T::from_value(value).ok_or_else(|| {
            crate::CodecError::mismatch(
                name,
                format!("expected {}, found {}", T::SCALAR_TYPE.name(), found),
            )
        })
    }

    /// Remove the named nested record field.
    pub fn take_record(&mut self, name: &str) -> crate::Result<RecordValue> {
        match self.take_required(name)? {
            Value::Record(record) => Ok(record),
            other => Err(crate::CodecError::mismatch(
                name,
                format!("expected record, found {}", other.type_name()),
            )),
        }
    }

    /// Remove the named optional field, unwrapping one level of `Optional`.
    pub fn take_optional(&mut self, name: &str) -> crate::Result<Option<Value>> {
        match self.take_required(name)? {
            Value::Optional(inner) => Ok(inner.map(|boxed| *boxed)),
            other => Err(crate::CodecError::mismatch(
                name,
                format!("expected optional, found {}", other.type_name()),
            )),
        }
    }

    fn take_required(&mut self, name: &str) -> crate::Result<Value> {
        self.take(name)
            .ok_or_else(|| crate::CodecError::mismatch(name, "field missing from record value"))
    }
}

impl FromIterator<(String, Value)> for RecordValue {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        RecordValue {
            fields: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// ScalarType
// ============================================================================

/// Built-in scalar leaf types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Int8,
    Char,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Bytes,
    Text,
    BigInt,
    Decimal,
}

impl ScalarType {
    pub const ALL: [ScalarType; 12] = [
        ScalarType::Int8,
        ScalarType::Char,
        ScalarType::Int16,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::Bool,
        ScalarType::Bytes,
        ScalarType::Text,
        ScalarType::BigInt,
        ScalarType::Decimal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Int8 => "int8",
            ScalarType::Char => "char",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Bool => "bool",
            ScalarType::Bytes => "bytes",
            ScalarType::Text => "text",
            ScalarType::BigInt => "big_int",
            ScalarType::Decimal => "decimal",
        }
    }

    /// Shared codec for this type. Built once per process.
    pub fn codec(self) -> Arc<dyn ScalarCodec> {
        static CODECS: OnceLock<Vec<Arc<dyn ScalarCodec>>> = OnceLock::new();
        let codecs = CODECS.get_or_init(|| ScalarType::ALL.iter().map(|ty| ty.build()).collect());
        codecs[self as usize].clone()
    }

    fn build(self) -> Arc<dyn ScalarCodec> {
        use primitive::native;

        match self {
            ScalarType::Int8 => Arc::new(TypedScalar::<_, i8>::new(native::<i8>())),
            ScalarType::Char => Arc::new(TypedScalar::<_, u16>::new(native::<u16>())),
            ScalarType::Int16 => Arc::new(TypedScalar::<_, i16>::new(native::<i16>())),
            ScalarType::Int32 => Arc::new(TypedScalar::<_, i32>::new(native::<i32>())),
            ScalarType::Int64 => Arc::new(TypedScalar::<_, i64>::new(native::<i64>())),
            ScalarType::Float32 => Arc::new(TypedScalar::<_, f32>::new(native::<f32>())),
            ScalarType::Float64 => Arc::new(TypedScalar::<_, f64>::new(native::<f64>())),
            ScalarType::Bool => Arc::new(TypedScalar::<_, bool>::new(primitive::bool_codec())),
            ScalarType::Bytes => Arc::new(TypedScalar::<_, Vec<u8>>::new(native::<Vec<u8>>())),
            ScalarType::Text => Arc::new(TypedScalar::<_, String>::new(primitive::text_codec())),
            ScalarType::BigInt => {
                Arc::new(TypedScalar::<_, BigInt>::new(primitive::big_int_codec()))
            }
            ScalarType::Decimal => {
                Arc::new(TypedScalar::<_, Decimal>::new(primitive::decimal_codec()))
            }
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// ScalarValue
// ============================================================================

/// A Rust type that lives in exactly one scalar [`Value`] variant.
pub trait ScalarValue: Sized + Send + Sync + 'static {
    const SCALAR_TYPE: ScalarType;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Option<Self>;

    fn from_value_ref(value: &Value) -> Option<&Self>;
}

macro_rules! scalar_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ScalarValue for $ty {
                const SCALAR_TYPE: ScalarType = ScalarType::$variant;

                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn from_value_ref(value: &Value) -> Option<&Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

scalar_value! {
    i8 => Int8,
    u16 => Char,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    bool => Bool,
    Vec<u8> => Bytes,
    String => Text,
    BigInt => BigInt,
    Decimal => Decimal,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

// ============================================================================
// ScalarCodec
// ============================================================================

/// Object-safe codec over scalar [`Value`]s, attached to scalar fields.
pub trait ScalarCodec: fmt::Debug + Send + Sync {
    /// The `Value` variant this codec reads and writes.
    fn value_type(&self) -> ScalarType;

    fn fixed_width(&self) -> Option<usize>;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, ValueError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, ValueError>;
}

/// Lifts a typed [`Codec<T>`] into a [`ScalarCodec`].
pub struct TypedScalar<C, T> {
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<C, T> TypedScalar<C, T>
where
    C: Codec<T>,
    T: ScalarValue,
{
    pub fn new(codec: C) -> Self {
        TypedScalar {
            codec,
            _marker: PhantomData,
        }
    }
}

impl<C, T> fmt::Debug for TypedScalar<C, T>
where
    T: ScalarValue,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedScalar<{}>", T::SCALAR_TYPE)
    }
}

impl<C, T> ScalarCodec for TypedScalar<C, T>
where
    C: Codec<T>,
    T: ScalarValue,
{
    fn value_type(&self) -> ScalarType {
        T::SCALAR_TYPE
    }

    fn fixed_width(&self) -> Option<usize> {
        self.codec.width()
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, ValueError> {
        let typed = T::from_value_ref(value).ok_or(ValueError::TypeMismatch {
            expected: T::SCALAR_TYPE.name(),
            found: value.type_name(),
        })?;
        Ok(self.codec.encode(typed))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, ValueError> {
        self.codec.decode(bytes).map(T::into_value)
    }
}
