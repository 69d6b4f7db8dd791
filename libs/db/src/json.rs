//! JSON form of record values.
//!
//! | kind               | JSON                               |
//! |--------------------|------------------------------------|
//! | int8..int64, char  | number                             |
//! | float32, float64   | number (finite only)               |
//! | bool               | bool                               |
//! | bytes              | array of numbers 0..=255           |
//! | text               | string                             |
//! | big_int, decimal   | string (`"-12.50"`)                |
//! | optional           | `null` or the inner value          |
//! | record             | object keyed by field name         |
//!
//! Reading accepts integers for `big_int`/`decimal` and a one-character
//! string for `char`. A field missing from an object takes its declared
//! default, then `None` for optionals, and a missing record is read as an
//! empty object so its own defaults apply; anything else is a schema mismatch.

use std::str::FromStr;

use num_bigint::BigInt;
use serde_json::{Map, Number, Value as JsonValue};

use crate::error::{CodecError, Result};
use crate::primitive::Decimal;
use crate::qualifier::join;
use crate::schema::{FieldKind, FieldSpec, Schema};
use crate::value::{RecordValue, ScalarType, Value};

/// Render `record` as a JSON object shaped by `schema`.
pub fn record_to_json(schema: &Schema, record: &RecordValue) -> Result<JsonValue> {
    fields_to_json(None, schema.fields(), record)
}

/// Read a record shaped by `schema` from a JSON object.
pub fn record_from_json(schema: &Schema, json: &JsonValue) -> Result<RecordValue> {
    let object = json.as_object().ok_or_else(|| {
        CodecError::mismatch("", format!("expected object, found {}", json_kind(json)))
    })?;
    fields_from_json(None, schema.fields(), object)
}

fn fields_to_json(
    path: Option<&str>,
    fields: &[FieldSpec],
    record: &RecordValue,
) -> Result<JsonValue> {
    let mut object = Map::with_capacity(fields.len());
    for field in fields {
        let qualifier = join(path, field.name());
        let value = record
            .get(field.name())
            .ok_or_else(|| CodecError::mismatch(&qualifier, "field missing from record value"))?;
        object.insert(field.name().to_string(), value_to_json(&qualifier, field.kind(), value)?);
    }
    Ok(JsonValue::Object(object))
}

fn value_to_json(qualifier: &str, kind: &FieldKind, value: &Value) -> Result<JsonValue> {
    match (kind, value) {
        (FieldKind::Optional(_), Value::Optional(None)) => Ok(JsonValue::Null),
        (FieldKind::Optional(inner), Value::Optional(Some(inner_value))) => {
            value_to_json(qualifier, inner, inner_value)
        }
        (FieldKind::Record(fields), Value::Record(record)) => {
            fields_to_json(Some(qualifier), fields, record)
        }
        (FieldKind::Scalar(_), value) => scalar_to_json(qualifier, value),
        (kind, value) => Err(CodecError::mismatch(
            qualifier,
            format!("expected {}, found {}", kind.describe(), value.type_name()),
        )),
    }
}

fn scalar_to_json(qualifier: &str, value: &Value) -> Result<JsonValue> {
    let float = |f: f64| {
        Number::from_f64(f)
            .map(JsonValue::Number)
            .ok_or_else(|| CodecError::mismatch(qualifier, format!("non-finite float {f}")))
    };

    Ok(match value {
        Value::Int8(v) => JsonValue::from(*v),
        Value::Char(v) => JsonValue::from(*v),
        Value::Int16(v) => JsonValue::from(*v),
        Value::Int32(v) => JsonValue::from(*v),
        Value::Int64(v) => JsonValue::from(*v),
        Value::Float32(v) => float(f64::from(*v))?,
        Value::Float64(v) => float(*v)?,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Bytes(v) => JsonValue::Array(v.iter().map(|b| JsonValue::from(*b)).collect()),
        Value::Text(v) => JsonValue::String(v.clone()),
        Value::BigInt(v) => JsonValue::String(v.to_string()),
        Value::Decimal(v) => JsonValue::String(v.to_string()),
        Value::Optional(_) | Value::Record(_) => {
            return Err(CodecError::mismatch(
                qualifier,
                format!("expected scalar, found {}", value.type_name()),
            ))
        }
    })
}

fn fields_from_json(
    path: Option<&str>,
    fields: &[FieldSpec],
    object: &Map<String, JsonValue>,
) -> Result<RecordValue> {
    if let Some(key) = object
        .keys()
        .find(|key| !fields.iter().any(|field| field.name() == key.as_str()))
    {
        return Err(CodecError::mismatch(
            join(path, key),
            "field not declared in schema",
        ));
    }

    let mut record = RecordValue::with_capacity(fields.len());
    for field in fields {
        let qualifier = join(path, field.name());
        let value = match (object.get(field.name()), field.default(), field.kind()) {
            (Some(json), _, kind) => value_from_json(&qualifier, kind, json)?,
            (None, Some(default), _) => default.clone(),
            (None, None, FieldKind::Optional(_)) => Value::none(),
            (None, None, FieldKind::Record(nested)) => {
                Value::Record(fields_from_json(Some(&qualifier), nested, &Map::new())?)
            }
            (None, None, _) => {
                return Err(CodecError::mismatch(&qualifier, "field missing from JSON object"))
            }
        };
        record.push(field.name(), value);
    }
    Ok(record)
}

/// Read one value of kind `kind` from JSON.
pub(crate) fn value_from_json(
    qualifier: &str,
    kind: &FieldKind,
    json: &JsonValue,
) -> Result<Value> {
    match kind {
        FieldKind::Optional(_) if json.is_null() => Ok(Value::none()),
        FieldKind::Optional(inner) => value_from_json(qualifier, inner, json).map(Value::some),
        FieldKind::Record(fields) => {
            let object = json.as_object().ok_or_else(|| {
                let found = json_kind(json);
                CodecError::mismatch(qualifier, format!("expected object, found {found}"))
            })?;
            fields_from_json(Some(qualifier), fields, object).map(Value::Record)
        }
        FieldKind::Scalar(codec) => scalar_from_json(qualifier, codec.value_type(), json),
    }
}

fn scalar_from_json(qualifier: &str, ty: ScalarType, json: &JsonValue) -> Result<Value> {
    let mismatch = || {
        CodecError::mismatch(
            qualifier,
            format!("expected {}, found {}", ty.name(), json_kind(json)),
        )
    };
    let out_of_range =
        || CodecError::mismatch(qualifier, format!("{json} out of range for {}", ty.name()));
    let int = || json.as_i64().ok_or_else(mismatch);

    Ok(match ty {
        ScalarType::Int8 => Value::Int8(i8::try_from(int()?).map_err(|_| out_of_range())?),
        ScalarType::Int16 => Value::Int16(i16::try_from(int()?).map_err(|_| out_of_range())?),
        ScalarType::Int32 => Value::Int32(i32::try_from(int()?).map_err(|_| out_of_range())?),
        ScalarType::Int64 => Value::Int64(int()?),
        ScalarType::Char => match json {
            JsonValue::String(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => {
                        Value::Char(u16::try_from(u32::from(c)).map_err(|_| out_of_range())?)
                    }
                    _ => return Err(mismatch()),
                }
            }
            _ => Value::Char(u16::try_from(int()?).map_err(|_| out_of_range())?),
        },
        ScalarType::Float32 => {
            let wide = json.as_f64().ok_or_else(mismatch)?;
            if wide.abs() > f64::from(f32::MAX) {
                return Err(out_of_range());
            }
            Value::Float32(wide as f32)
        }
        ScalarType::Float64 => Value::Float64(json.as_f64().ok_or_else(mismatch)?),
        ScalarType::Bool => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
        ScalarType::Bytes => {
            let items = json.as_array().ok_or_else(mismatch)?;
            let bytes = items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| {
                            CodecError::mismatch(qualifier, format!("{item} is not a byte"))
                        })
                })
                .collect::<Result<Vec<u8>>>()?;
            Value::Bytes(bytes)
        }
        ScalarType::Text => Value::Text(json.as_str().ok_or_else(mismatch)?.to_string()),
        ScalarType::BigInt => {
            let text = numeric_text(json).ok_or_else(mismatch)?;
            let parsed = BigInt::from_str(&text)
                .map_err(|e| CodecError::mismatch(qualifier, e.to_string()))?;
            Value::BigInt(parsed)
        }
        ScalarType::Decimal => {
            let text = numeric_text(json).ok_or_else(mismatch)?;
            let parsed = Decimal::from_str(&text)
                .map_err(|e| CodecError::mismatch(qualifier, e.to_string()))?;
            Value::Decimal(parsed)
        }
    })
}

fn numeric_text(json: &JsonValue) -> Option<String> {
    match json {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
