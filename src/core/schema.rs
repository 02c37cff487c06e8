//! Fieldset schemas
//!
//! A [`FieldsetDef`] is the declaration: an ordered list of named descriptors
//! plus a [`FieldsetMeta`]. Building it yields an immutable [`Fieldset`] that
//! caches the recursive name universes and owns one selector parser per axis.
//!
//! # Example
//!
//! ```rust,ignore
//! use fieldsets::prelude::*;
//!
//! struct AuthorFields;
//!
//! impl FieldsetType for AuthorFields {
//!     const NAME: &'static str = "author";
//!
//!     fn declare() -> FieldsetDef {
//!         FieldsetDef::new(Self::NAME)
//!             .field("id", LeafField::integer())
//!             .field("name", LeafField::string())
//!     }
//! }
//!
//! struct PostFields;
//!
//! impl FieldsetType for PostFields {
//!     const NAME: &'static str = "post";
//!
//!     fn declare() -> FieldsetDef {
//!         FieldsetDef::new(Self::NAME)
//!             .field("pid", LeafField::integer())
//!             .nested("author", NestedDecl::of::<AuthorFields>().plain_key("id"))
//!     }
//! }
//! ```

use super::error::{MarshalError, SchemaError, SelectionError};
use super::field::{LeafField, is_valid_field_name};
use super::marshal::marshal;
use super::meta::FieldsetMeta;
use super::nested::{NestedDecl, NestedField};
use super::plan::{MarshalPlan, PlanEntry};
use super::registry::FieldsetRegistry;
use super::selection::{Selection, SelectionParser};
use crate::config::QueryConfig;
use axum::extract::Query;
use axum::http::Uri;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// A declared field, before nested targets are resolved
#[derive(Debug, Clone)]
pub enum FieldDecl {
    Leaf(LeafField),
    Nested(NestedDecl),
}

/// A field of a built fieldset
#[derive(Debug, Clone)]
pub enum Field {
    Leaf(Arc<LeafField>),
    Nested(Arc<NestedField>),
}

impl Field {
    pub fn is_nested(&self) -> bool {
        matches!(self, Field::Nested(_))
    }

    pub fn as_leaf(&self) -> Option<&Arc<LeafField>> {
        match self {
            Field::Leaf(leaf) => Some(leaf),
            Field::Nested(_) => None,
        }
    }

    pub fn as_nested(&self) -> Option<&Arc<NestedField>> {
        match self {
            Field::Nested(nested) => Some(nested),
            Field::Leaf(_) => None,
        }
    }
}

/// Declaration of a fieldset
#[derive(Debug, Clone)]
pub struct FieldsetDef {
    name: String,
    fields: IndexMap<String, FieldDecl>,
    meta: FieldsetMeta,
}

impl FieldsetDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            meta: FieldsetMeta::default(),
        }
    }

    /// Declare a leaf field
    pub fn field(mut self, name: impl Into<String>, field: LeafField) -> Self {
        self.fields.insert(name.into(), FieldDecl::Leaf(field));
        self
    }

    /// Declare a nested field
    pub fn nested(mut self, name: impl Into<String>, nested: NestedDecl) -> Self {
        self.fields.insert(name.into(), FieldDecl::Nested(nested));
        self
    }

    /// Layer `meta` over the current meta, key by key
    pub fn meta(mut self, meta: FieldsetMeta) -> Self {
        self.meta = self.meta.merge(&meta);
        self
    }

    /// Inherit fields and meta from `parent`
    ///
    /// Parent fields come first; fields declared here replace parent fields of
    /// the same name. Meta keys set here win over the parent's.
    pub fn inherit(self, parent: FieldsetDef) -> Self {
        let mut fields = parent.fields;
        for (name, decl) in self.fields {
            fields.insert(name, decl);
        }
        Self {
            name: self.name,
            fields,
            meta: parent.meta.merge(&self.meta),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn declared_meta(&self) -> &FieldsetMeta {
        &self.meta
    }

    pub(crate) fn into_parts(self) -> (String, IndexMap<String, FieldDecl>, FieldsetMeta) {
        (self.name, self.fields, self.meta)
    }

    /// Build with a default registry
    ///
    /// Use [`FieldsetRegistry::build`] to share memoized nested types and apply
    /// configuration overrides.
    pub fn build(self) -> Result<Arc<Fieldset>, SchemaError> {
        FieldsetRegistry::default().build(self)
    }
}

/// A fieldset type whose schema is built once and memoized by the registry
pub trait FieldsetType: 'static {
    /// Name used in logs, error chains and configuration overrides
    const NAME: &'static str;

    fn declare() -> FieldsetDef;
}

/// An immutable, built fieldset schema
#[derive(Debug)]
pub struct Fieldset {
    name: String,
    fields: IndexMap<String, Field>,
    nested: Vec<String>,
    all_field_names: Vec<String>,
    nested_field_names: Vec<String>,
    default_fields: HashSet<String>,
    default_embed: HashSet<String>,
    fields_kw: String,
    embed_kw: String,
    fields_parser: SelectionParser,
    embed_parser: SelectionParser,
    depth: usize,
}

impl Fieldset {
    pub(crate) fn from_parts(
        name: String,
        fields: IndexMap<String, Field>,
        meta: FieldsetMeta,
        query: &QueryConfig,
        max_depth: usize,
    ) -> Result<Self, SchemaError> {
        if let Some(bad) = fields.keys().find(|n| !is_valid_field_name(n)) {
            return Err(SchemaError::InvalidFieldName {
                fieldset: name,
                name: bad.clone(),
            });
        }

        let nested: Vec<String> = fields
            .iter()
            .filter(|(_, field)| field.is_nested())
            .map(|(n, _)| n.clone())
            .collect();

        let depth = 1 + fields
            .values()
            .filter_map(Field::as_nested)
            .map(|n| n.nested_fieldset().depth())
            .max()
            .unwrap_or(0);
        if depth > max_depth {
            return Err(SchemaError::TooDeep {
                fieldset: name,
                depth,
                max: max_depth,
            });
        }

        let mut all_field_names: Vec<String> = fields.keys().cloned().collect();
        let mut nested_field_names = Vec::new();
        for (field_name, nested_field) in fields
            .iter()
            .filter_map(|(n, f)| f.as_nested().map(|nested| (n, nested)))
        {
            let child = nested_field.nested_fieldset();
            nested_field_names.push(field_name.clone());
            nested_field_names.extend(
                child
                    .nested_field_names()
                    .iter()
                    .map(|c| format!("{}.{}", field_name, c)),
            );
            all_field_names.extend(
                child
                    .all_field_names()
                    .iter()
                    .map(|c| format!("{}.{}", field_name, c)),
            );
        }

        let default_fields: HashSet<String> = match meta.default_fields {
            Some(names) => names.into_iter().collect(),
            None => fields.keys().cloned().collect(),
        };
        check_defaults(&name, "fields", &default_fields, &all_field_names)?;

        let default_embed: HashSet<String> = match meta.default_embed {
            Some(names) => names.into_iter().collect(),
            None => nested.iter().cloned().collect(),
        };
        check_defaults(&name, "embeds", &default_embed, &nested_field_names)?;

        Ok(Self {
            fields_parser: SelectionParser::new(all_field_names.iter().cloned()),
            embed_parser: SelectionParser::new(nested_field_names.iter().cloned()),
            fields_kw: meta.fields_kw.unwrap_or_else(|| query.fields_kw.clone()),
            embed_kw: meta.embed_kw.unwrap_or_else(|| query.embed_kw.clone()),
            name,
            fields,
            nested,
            all_field_names,
            nested_field_names,
            default_fields,
            default_embed,
            depth,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct fields, in declaration order
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Names of the direct nested fields
    pub fn nested(&self) -> &[String] {
        &self.nested
    }

    /// Recursive universe of selectable field names
    pub fn all_field_names(&self) -> &[String] {
        &self.all_field_names
    }

    /// Recursive universe of embeddable names
    pub fn nested_field_names(&self) -> &[String] {
        &self.nested_field_names
    }

    pub fn default_fields(&self) -> &HashSet<String> {
        &self.default_fields
    }

    pub fn default_embed(&self) -> &HashSet<String> {
        &self.default_embed
    }

    pub fn fields_kw(&self) -> &str {
        &self.fields_kw
    }

    pub fn embed_kw(&self) -> &str {
        &self.embed_kw
    }

    pub fn fields_parser(&self) -> &SelectionParser {
        &self.fields_parser
    }

    pub fn embed_parser(&self) -> &SelectionParser {
        &self.embed_parser
    }

    /// Nesting depth, 1 for a fieldset without nested fields
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Build the marshalling plan for a selection
    ///
    /// `None` or empty selections fall back to the defaults. Dotted names are
    /// grouped by their first segment and handed to the child fieldset of an
    /// embedded field; an empty grouping makes the child use its own defaults.
    pub fn marshall_dict(
        &self,
        selected_fields: Option<&HashSet<String>>,
        selected_embed: Option<&HashSet<String>>,
    ) -> MarshalPlan {
        let fields = match selected_fields {
            Some(set) if !set.is_empty() => set,
            _ => &self.default_fields,
        };
        let embed = match selected_embed {
            Some(set) if !set.is_empty() => set,
            _ => &self.default_embed,
        };

        let child_fields = self.group_by_child(fields);
        let child_embed = self.group_by_child(embed);

        let mut plan = MarshalPlan::new();
        for (name, field) in &self.fields {
            if !fields.contains(name) {
                continue;
            }
            let entry = match field {
                Field::Leaf(leaf) => PlanEntry::Leaf(leaf.clone()),
                Field::Nested(nested) if embed.contains(name) => PlanEntry::Embedded {
                    field: nested.clone(),
                    plan: nested
                        .nested_fieldset()
                        .marshall_dict(child_fields.get(name.as_str()), child_embed.get(name.as_str())),
                },
                Field::Nested(nested) => match nested.key_field() {
                    Some(key_field) => PlanEntry::Plain(key_field.clone()),
                    None => PlanEntry::Absent,
                },
            };
            plan.insert(name.clone(), entry);
        }

        tracing::debug!(
            fieldset = %self.name,
            entries = plan.len(),
            "built marshalling plan"
        );
        plan
    }

    /// Group dotted, non-direct names by their first segment
    fn group_by_child<'a>(&self, names: &'a HashSet<String>) -> HashMap<&'a str, HashSet<String>> {
        let mut groups: HashMap<&str, HashSet<String>> = HashMap::new();
        for name in names {
            if self.fields.contains_key(name) {
                continue;
            }
            if let Some((head, rest)) = name.split_once('.') {
                groups.entry(head).or_default().insert(rest.to_string());
            }
        }
        groups
    }

    /// Plan for the default selection
    pub fn default_plan(&self) -> MarshalPlan {
        self.marshall_dict(None, None)
    }

    pub fn plan(&self, selection: &Selection) -> MarshalPlan {
        self.marshall_dict(selection.fields.as_ref(), selection.embed.as_ref())
    }

    /// Shape a payload (object or list of objects) for a selection
    pub fn shape(&self, payload: &Value, selection: &Selection) -> Result<Value, MarshalError> {
        marshal(payload, &self.plan(selection))
    }

    /// Parse raw selector strings
    ///
    /// Fields are validated before embeds; the first failing axis aborts.
    pub fn parse_selection(
        &self,
        fields: Option<&str>,
        embed: Option<&str>,
    ) -> Result<Selection, SelectionError> {
        let parsed = self
            .fields_parser
            .parse(fields)
            .map_err(|e| e.for_parameter(&self.fields_kw))
            .and_then(|fields| {
                let embed = self
                    .embed_parser
                    .parse(embed)
                    .map_err(|e| e.for_parameter(&self.embed_kw))?;
                Ok(Selection { fields, embed })
            });

        match &parsed {
            Ok(selection) => tracing::debug!(
                fieldset = %self.name,
                fields = ?selection.fields,
                embed = ?selection.embed,
                "parsed selection"
            ),
            Err(e) => tracing::warn!(fieldset = %self.name, error = %e, "rejected selection"),
        }
        parsed
    }

    /// Read the selection from decoded query parameters
    pub fn parse_params(&self, params: &HashMap<String, String>) -> Result<Selection, SelectionError> {
        self.parse_selection(
            params.get(&self.fields_kw).map(String::as_str),
            params.get(&self.embed_kw).map(String::as_str),
        )
    }

    /// Read the selection from a request URI
    pub fn parse_uri(&self, uri: &Uri) -> Result<Selection, SelectionError> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).map_err(|e| {
            SelectionError::MalformedQuery {
                message: e.body_text(),
            }
        })?;
        self.parse_params(&params)
    }

    /// Read the selection from a raw query string such as `fields=a,b&embedd=b`
    pub fn parse_query(&self, query: Option<&str>) -> Result<Selection, SelectionError> {
        let Some(query) = query.filter(|q| !q.is_empty()) else {
            return self.parse_selection(None, None);
        };
        let uri: Uri = format!("/?{}", query)
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| SelectionError::MalformedQuery {
                message: e.to_string(),
            })?;
        self.parse_uri(&uri)
    }
}

fn check_defaults(
    fieldset: &str,
    kind: &'static str,
    defaults: &HashSet<String>,
    universe: &[String],
) -> Result<(), SchemaError> {
    let unknown: BTreeSet<&String> = defaults
        .iter()
        .filter(|name| !universe.contains(*name))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(SchemaError::UnknownDefault {
        fieldset: fieldset.to_string(),
        kind,
        names: unknown.into_iter().cloned().collect(),
    })
}
