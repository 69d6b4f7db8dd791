//! Record schemas: the field tree both encode and decode walk.
//!
//! ```text
//!   Schema(name)
//!    └── FieldSpec(name, kind, default?)
//!         ├── Scalar(codec)          one column at the field's qualifier
//!         ├── Optional(kind)         absent => no columns written
//!         └── Record(FieldSpec...)   children at `<qualifier>.<child>`
//! ```
//!
//! A schema is immutable once built and is shared behind an `Arc` (see
//! [`SchemaCache`](crate::shape::SchemaCache)).
//!
//! Schemas can also be described in JSON through [`SchemaDescription`]:
//!
//! ```json
//! { "name": "profile",
//!   "fields": [
//!     { "name": "x", "type": "int32", "default": 0 },
//!     { "name": "opt",
//!       "type": { "optional": { "record": [ { "name": "a", "type": "int32" } ] } } } ] }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::json;
use crate::qualifier::{join, SEPARATOR};
use crate::resolver;
use crate::value::{ScalarCodec, ScalarType, Value};

// ============================================================================
// FieldKind / FieldSpec
// ============================================================================

#[derive(Debug, Clone)]
pub enum FieldKind {
    Scalar(Arc<dyn ScalarCodec>),
    Optional(Box<FieldKind>),
    Record(Vec<FieldSpec>),
}

impl FieldKind {
    /// Built-in scalar.
    pub fn scalar(ty: ScalarType) -> Self {
        FieldKind::Scalar(ty.codec())
    }

    /// Scalar stored through a caller-supplied codec.
    pub fn custom(codec: Arc<dyn ScalarCodec>) -> Self {
        FieldKind::Scalar(codec)
    }

    pub fn optional(inner: FieldKind) -> Self {
        FieldKind::Optional(Box::new(inner))
    }

    pub fn record(fields: Vec<FieldSpec>) -> Self {
        FieldKind::Record(fields)
    }

    /// Whether values of this kind live under `<qualifier>.` rather than at
    /// `<qualifier>` itself.
    pub(crate) fn is_prefix_addressed(&self) -> bool {
        match self {
            FieldKind::Scalar(_) => false,
            FieldKind::Optional(inner) => inner.is_prefix_addressed(),
            FieldKind::Record(_) => true,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(codec) => codec.value_type().name().to_string(),
            FieldKind::Optional(inner) => format!("optional<{}>", inner.describe()),
            FieldKind::Record(_) => "record".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    default: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        FieldSpec {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        FieldSpec::new(name, FieldKind::scalar(ty))
    }

    pub fn custom(name: impl Into<String>, codec: Arc<dyn ScalarCodec>) -> Self {
        FieldSpec::new(name, FieldKind::custom(codec))
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        FieldSpec::new(name, FieldKind::record(fields))
    }

    pub fn optional(name: impl Into<String>, inner: FieldKind) -> Self {
        FieldSpec::new(name, FieldKind::optional(inner))
    }

    /// Value used on decode when nothing is stored for this field.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Build and validate a schema.
    ///
    /// Rejects empty or dotted field names, repeated names within one
    /// record, records without fields, and defaults that do not fit their
    /// field's kind.
    pub fn new(name: impl Into<String>, fields: Vec<FieldSpec>) -> Result<Self> {
        let name = name.into();
        validate_fields(None, &fields)?;
        tracing::debug!(schema = %name, fields = fields.len(), "built schema");
        Ok(Schema { name, fields })
    }

    /// Build a schema from its JSON description.
    pub fn from_description(description: &SchemaDescription) -> Result<Self> {
        let fields = fields_from_description(None, &description.fields)?;
        Schema::new(description.name.clone(), fields)
    }

    /// Parse a JSON schema description.
    pub fn from_json(text: &str) -> Result<Self> {
        let description: SchemaDescription = serde_json::from_str(text)
            .map_err(|e| CodecError::InvalidSchema(format!("unreadable description: {e}")))?;
        Schema::from_description(&description)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Every scalar leaf qualifier, in declared order.
    pub fn qualifiers(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_qualifiers(None, &self.fields, &mut out);
        out
    }
}

fn collect_qualifiers(path: Option<&str>, fields: &[FieldSpec], out: &mut Vec<String>) {
    for field in fields {
        let qualifier = join(path, field.name());
        collect_kind(&qualifier, field.kind(), out);
    }
}

fn collect_kind(qualifier: &str, kind: &FieldKind, out: &mut Vec<String>) {
    match kind {
        FieldKind::Scalar(_) => out.push(qualifier.to_string()),
        FieldKind::Optional(inner) => collect_kind(qualifier, inner, out),
        FieldKind::Record(fields) => collect_qualifiers(Some(qualifier), fields, out),
    }
}

fn validate_fields(path: Option<&str>, fields: &[FieldSpec]) -> Result<()> {
    if fields.is_empty() {
        return Err(CodecError::InvalidSchema(format!(
            "record at '{}' has no fields",
            path.unwrap_or_default()
        )));
    }

    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        let qualifier = join(path, field.name());
        if field.name().is_empty() {
            return Err(CodecError::InvalidSchema(format!(
                "empty field name under '{}'",
                path.unwrap_or_default()
            )));
        }
        if field.name().contains(SEPARATOR) {
            return Err(CodecError::InvalidSchema(format!(
                "field name '{qualifier}' contains '{SEPARATOR}'"
            )));
        }
        if !seen.insert(field.name()) {
            return Err(CodecError::InvalidSchema(format!(
                "duplicate field '{qualifier}'"
            )));
        }
        if let Some(default) = field.default() {
            resolver::flatten(&qualifier, field.kind(), default, &mut Vec::new()).map_err(|e| {
                CodecError::InvalidSchema(format!("default for '{qualifier}' does not fit: {e}"))
            })?;
        }
        validate_kind(&qualifier, field.kind())?;
    }
    Ok(())
}

fn validate_kind(qualifier: &str, kind: &FieldKind) -> Result<()> {
    match kind {
        FieldKind::Scalar(_) => Ok(()),
        FieldKind::Optional(inner) => validate_kind(qualifier, inner),
        FieldKind::Record(fields) => validate_fields(Some(qualifier), fields),
    }
}

// ============================================================================
// SchemaDescription
// ============================================================================

/// Serializable description of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDescription {
    pub name: String,
    pub fields: Vec<FieldDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescription,
    /// JSON form of the default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDescription {
    Scalar(ScalarType),
    Compound(CompoundType),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundType {
    Record(Vec<FieldDescription>),
    Optional(Box<TypeDescription>),
}

fn fields_from_description(
    path: Option<&str>,
    fields: &[FieldDescription],
) -> Result<Vec<FieldSpec>> {
    fields
        .iter()
        .map(|field| {
            let qualifier = join(path, &field.name);
            let kind = kind_from_description(&qualifier, &field.ty)?;
            let described = match &field.default {
                Some(default) => {
                    let value = json::value_from_json(&qualifier, &kind, default)
                        .map_err(|e| CodecError::InvalidSchema(e.to_string()))?;
                    FieldSpec::new(field.name.clone(), kind).with_default(value)
                }
                None => FieldSpec::new(field.name.clone(), kind),
            };
            Ok(described)
        })
        .collect()
}

fn kind_from_description(qualifier: &str, ty: &TypeDescription) -> Result<FieldKind> {
    Ok(match ty {
        TypeDescription::Scalar(ty) => FieldKind::scalar(*ty),
        TypeDescription::Compound(CompoundType::Optional(inner)) => {
            FieldKind::optional(kind_from_description(qualifier, inner)?)
        }
        TypeDescription::Compound(CompoundType::Record(fields)) => {
            FieldKind::record(fields_from_description(Some(qualifier), fields)?)
        }
    })
}
