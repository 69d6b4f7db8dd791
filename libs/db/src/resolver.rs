//! Recursive record resolver: flattens records into qualifier/value entries
//! and rebuilds them from a sorted column list.
//!
//! Decode classifies every field as [`Resolution::Found`] (a stored value was
//! read), [`Resolution::Default`] (a fallback was used) or
//! [`Resolution::Absent`] (nothing stored, no fallback). A record is `Found`
//! as soon as one of its children is `Found`, so a record whose leaves all
//! fell back to defaults is itself reported as `Default`.
//!
//! The resolver only reads the schema tree; it holds no state of its own
//! and is safe to run on many threads against one shared schema.

use std::slice;

use crate::error::{CodecError, Result};
use crate::index::ColumnIndex;
use crate::qualifier::join;
use crate::row::Column;
use crate::schema::{FieldKind, FieldSpec};
use crate::value::{RecordValue, Value};

// ============================================================================
// Resolution
// ============================================================================

/// Decode outcome of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// Built from at least one stored value.
    Found(T),
    /// Built entirely from declared defaults (or an absent optional).
    Default(T),
    /// No stored value and no fallback.
    Absent,
}

impl<T> Resolution<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Found(v) => Resolution::Found(f(v)),
            Resolution::Default(v) => Resolution::Default(f(v)),
            Resolution::Absent => Resolution::Absent,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Resolution::Default(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Resolution::Absent)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Resolution::Found(v) | Resolution::Default(v) => Some(v),
            Resolution::Absent => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Resolution::Found(v) | Resolution::Default(v) => Some(v),
            Resolution::Absent => None,
        }
    }

    /// `"found"`, `"default"` or `"absent"`.
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Found(_) => "found",
            Resolution::Default(_) => "default",
            Resolution::Absent => "absent",
        }
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Rebuild the record described by `fields` rooted at `path`.
pub(crate) fn resolve_fields(
    index: ColumnIndex<'_>,
    path: Option<&str>,
    fields: &[FieldSpec],
) -> Result<Resolution<RecordValue>> {
    let mut record = RecordValue::with_capacity(fields.len());
    let mut any_found = false;

    for field in fields {
        let qualifier = join(path, field.name());
        let value = match (resolve(index, &qualifier, field.kind())?, field.default()) {
            (Resolution::Found(value), _) => {
                any_found = true;
                value
            }
            (Resolution::Default(_), Some(default)) => default.clone(),
            (Resolution::Default(value), None) => value,
            (Resolution::Absent, Some(default)) => default.clone(),
            (Resolution::Absent, None) => {
                tracing::debug!(%qualifier, "required column not found");
                return Err(CodecError::missing(qualifier));
            }
        };
        record.push(field.name(), value);
    }

    Ok(if any_found {
        Resolution::Found(record)
    } else {
        Resolution::Default(record)
    })
}

/// Resolve one field of kind `kind` stored at `qualifier`.
pub(crate) fn resolve(
    index: ColumnIndex<'_>,
    qualifier: &str,
    kind: &FieldKind,
) -> Result<Resolution<Value>> {
    match kind {
        FieldKind::Scalar(codec) => {
            let Some(cell) = index
                .exact(qualifier.as_bytes())
                .and_then(Column::first_cell)
            else {
                return Ok(Resolution::Absent);
            };
            let value = codec
                .decode(&cell.value)
                .map_err(|source| CodecError::malformed(qualifier, source))?;
            Ok(Resolution::Found(value))
        }
        FieldKind::Optional(inner) => {
            let scope = if inner.is_prefix_addressed() {
                index.descendants(qualifier.as_bytes())
            } else {
                index
                    .exact(qualifier.as_bytes())
                    .map(|column| ColumnIndex::from_sorted(slice::from_ref(column)))
            };
            let Some(scope) = scope else {
                return Ok(Resolution::Default(Value::none()));
            };

            Ok(match resolve(scope, qualifier, inner)? {
                Resolution::Found(value) => Resolution::Found(Value::some(value)),
                Resolution::Default(value) => Resolution::Default(Value::some(value)),
                Resolution::Absent => Resolution::Default(Value::none()),
            })
        }
        FieldKind::Record(fields) => {
            resolve_fields(index, Some(qualifier), fields).map(|r| r.map(Value::Record))
        }
    }
}

// ============================================================================
// Encode
// ============================================================================

/// Append the entries of `record` (shaped by `fields`, rooted at `path`) to
/// `out`, in declared field order.
pub(crate) fn flatten_fields(
    path: Option<&str>,
    fields: &[FieldSpec],
    record: &RecordValue,
    out: &mut Vec<(String, Vec<u8>)>,
) -> Result<()> {
    if let Some((name, _)) = record
        .iter()
        .find(|(name, _)| !fields.iter().any(|field| field.name() == *name))
    {
        return Err(CodecError::mismatch(
            join(path, name),
            "field not declared in schema",
        ));
    }
    if record.len() > fields.len() {
        return Err(CodecError::mismatch(
            path.unwrap_or_default(),
            "record value repeats a field",
        ));
    }

    for field in fields {
        let qualifier = join(path, field.name());
        let value = record
            .get(field.name())
            .ok_or_else(|| CodecError::mismatch(&qualifier, "field missing from record value"))?;
        flatten(&qualifier, field.kind(), value, out)?;
    }
    Ok(())
}

/// Append the entries of `value` (of kind `kind`, stored at `qualifier`).
pub(crate) fn flatten(
    qualifier: &str,
    kind: &FieldKind,
    value: &Value,
    out: &mut Vec<(String, Vec<u8>)>,
) -> Result<()> {
    match (kind, value) {
        (FieldKind::Scalar(codec), value) => {
            let bytes = codec
                .encode(value)
                .map_err(|e| CodecError::mismatch(qualifier, e.to_string()))?;
            out.push((qualifier.to_string(), bytes));
            Ok(())
        }
        (FieldKind::Optional(_), Value::Optional(None)) => Ok(()),
        (FieldKind::Optional(inner), Value::Optional(Some(value))) => {
            flatten(qualifier, inner, value, out)
        }
        (FieldKind::Record(fields), Value::Record(record)) => {
            flatten_fields(Some(qualifier), fields, record, out)
        }
        (kind, value) => Err(CodecError::mismatch(
            qualifier,
            format!("expected {}, found {}", kind.describe(), value.type_name()),
        )),
    }
}
