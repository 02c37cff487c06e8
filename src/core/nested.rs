//! Optional nested descriptors
//!
//! A nested field renders either as an embedded child object or, when the
//! client does not ask for embedding, as a cheap plain value (or nothing).

use super::field::{FieldFormat, LeafField};
use super::registry::TypeRef;
use super::schema::{Fieldset, FieldsetType};
use serde_json::Value;
use std::sync::Arc;

/// Reference to the child schema of a nested field
#[derive(Debug, Clone)]
pub enum FieldsetRef {
    /// A fieldset type, resolved and memoized through the registry
    Type(TypeRef),
    /// An already built fieldset
    Instance(Arc<Fieldset>),
}

impl FieldsetRef {
    /// Name of the referenced fieldset
    pub fn name(&self) -> &str {
        match self {
            FieldsetRef::Type(t) => t.name(),
            FieldsetRef::Instance(f) => f.name(),
        }
    }
}

/// Parameters propagated into the embedded representation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedKwargs {
    /// Attribute holding the child object (field name if unset)
    pub attribute: Option<String>,
    /// Rendered when the child object is null or absent
    pub default: Option<Value>,
    /// Render `null` for a null or absent child instead of an empty object
    pub allow_null: bool,
}

/// Declaration of a nested field, before its child schema is resolved
#[derive(Debug, Clone)]
pub struct NestedDecl {
    target: FieldsetRef,
    kwargs: NestedKwargs,
    plain_key: Option<String>,
    plain_format: FieldFormat,
}

impl NestedDecl {
    /// Nest the fieldset type `T`
    pub fn of<T: FieldsetType>() -> Self {
        Self::new(FieldsetRef::Type(TypeRef::of::<T>()))
    }

    /// Nest an already built fieldset
    pub fn instance(fieldset: Arc<Fieldset>) -> Self {
        Self::new(FieldsetRef::Instance(fieldset))
    }

    fn new(target: FieldsetRef) -> Self {
        Self {
            target,
            kwargs: NestedKwargs::default(),
            plain_key: None,
            plain_format: FieldFormat::Raw,
        }
    }

    /// Member of the child object rendered when it is not embedded
    pub fn plain_key(mut self, key: impl Into<String>) -> Self {
        self.plain_key = Some(key.into());
        self
    }

    /// Format applied to the plain value (passthrough by default)
    pub fn plain_format(mut self, format: FieldFormat) -> Self {
        self.plain_format = format;
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.kwargs.attribute = Some(attribute.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.kwargs.default = Some(default.into());
        self
    }

    pub fn allow_null(mut self, allow_null: bool) -> Self {
        self.kwargs.allow_null = allow_null;
        self
    }

    pub fn target(&self) -> &FieldsetRef {
        &self.target
    }

    /// Bind the declaration to its resolved child schema
    pub(crate) fn resolve(self, fieldset: Arc<Fieldset>) -> NestedField {
        let key_field = self.plain_key.as_ref().map(|key| {
            let mut leaf = LeafField::member_as(key.clone(), self.plain_format.clone());
            if let Some(attribute) = &self.kwargs.attribute {
                leaf = leaf.attribute(attribute.clone());
            }
            Arc::new(leaf)
        });

        NestedField {
            fieldset,
            kwargs: self.kwargs,
            plain_key: self.plain_key,
            key_field,
        }
    }
}

/// A nested field bound to its child schema
#[derive(Debug)]
pub struct NestedField {
    fieldset: Arc<Fieldset>,
    kwargs: NestedKwargs,
    plain_key: Option<String>,
    key_field: Option<Arc<LeafField>>,
}

impl NestedField {
    /// Child schema used when embedding
    pub fn nested_fieldset(&self) -> &Arc<Fieldset> {
        &self.fieldset
    }

    /// Leaf rendering the plain value, `None` when the field must be omitted
    pub fn key_field(&self) -> Option<&Arc<LeafField>> {
        self.key_field.as_ref()
    }

    pub fn plain_key(&self) -> Option<&str> {
        self.plain_key.as_deref()
    }

    pub fn nested_kwargs(&self) -> &NestedKwargs {
        &self.kwargs
    }
}
