//! Default-selection configuration of a fieldset
//!
//! Every key is optional so that metas can be layered: a fieldset inherits
//! its parent's meta and overrides it key by key, and deployment config can
//! override both.

use serde::{Deserialize, Serialize};

/// Default selection and query keywords of a fieldset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldsetMeta {
    /// Fields rendered when the client selects none (all direct fields if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_fields: Option<Vec<String>>,

    /// Nested fields embedded when the client selects none (all nested if unset)
    #[serde(alias = "default_embedd", skip_serializing_if = "Option::is_none")]
    pub default_embed: Option<Vec<String>>,

    /// Query parameter carrying the field selector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_kw: Option<String>,

    /// Query parameter carrying the embed selector
    #[serde(alias = "embedd_kw", skip_serializing_if = "Option::is_none")]
    pub embed_kw: Option<String>,
}

impl FieldsetMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_fields = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_embed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_embed = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn fields_kw(mut self, kw: impl Into<String>) -> Self {
        self.fields_kw = Some(kw.into());
        self
    }

    pub fn embed_kw(mut self, kw: impl Into<String>) -> Self {
        self.embed_kw = Some(kw.into());
        self
    }

    /// Layer `inner` over `self`; keys set in `inner` win
    pub fn merge(&self, inner: &FieldsetMeta) -> FieldsetMeta {
        FieldsetMeta {
            default_fields: inner
                .default_fields
                .clone()
                .or_else(|| self.default_fields.clone()),
            default_embed: inner
                .default_embed
                .clone()
                .or_else(|| self.default_embed.clone()),
            fields_kw: inner.fields_kw.clone().or_else(|| self.fields_kw.clone()),
            embed_kw: inner.embed_kw.clone().or_else(|| self.embed_kw.clone()),
        }
    }
}
