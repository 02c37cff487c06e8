//! # Fieldsets
//!
//! Declarative field selection and response shaping for JSON APIs.
//!
//! ## Features
//!
//! - **Declarative Schemas**: Leaf and nested descriptors registered on a fieldset
//! - **Client Selection**: `?fields=a,b.c` picks fields, `?embedd=b` expands nested objects
//! - **Plain Fallback**: Nested fields that are not embedded degrade to a key (or vanish)
//! - **Strict Validation**: Unknown names are rejected with `400` listing every offender
//! - **Memoized Schemas**: One immutable schema per type, with cycle detection
//! - **Configuration-Based**: Override defaults and query keywords via YAML
//! - **Tower Integration**: A `MarshalLayer` shapes any axum route's JSON body
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fieldsets::prelude::*;
//!
//! struct MemberFields;
//!
//! impl FieldsetType for MemberFields {
//!     const NAME: &'static str = "member";
//!
//!     fn declare() -> FieldsetDef {
//!         FieldsetDef::new(Self::NAME)
//!             .field("id", LeafField::integer())
//!             .field("name", LeafField::string())
//!     }
//! }
//!
//! struct TopicFields;
//!
//! impl FieldsetType for TopicFields {
//!     const NAME: &'static str = "topic";
//!
//!     fn declare() -> FieldsetDef {
//!         FieldsetDef::new(Self::NAME)
//!             .field("tid", LeafField::integer())
//!             .field("title", LeafField::string())
//!             .nested("author", NestedDecl::of::<MemberFields>().plain_key("id"))
//!             .meta(FieldsetMeta::new().default_embed(Vec::<String>::new()))
//!     }
//! }
//!
//! let registry = FieldsetRegistry::default();
//! let app: Router = Router::new().route(
//!     "/topics",
//!     get(list_topics).layer(registry.layer::<TopicFields>()?),
//! );
//!
//! // GET /topics                          -> {"tid": 1, "title": "...", "author": 7}
//! // GET /topics?embedd=author            -> {"tid": 1, ..., "author": {"id": 7, "name": "..."}}
//! // GET /topics?fields=title,author.name -> 400 {"message": "Unknown fields: ..."} when misspelled
//! ```

pub mod config;
pub mod core;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Descriptors and Schemas ===
    pub use crate::core::{
        field::{DateFormat, FieldFormat, LeafField},
        meta::FieldsetMeta,
        nested::{FieldsetRef, NestedDecl, NestedField, NestedKwargs},
        registry::{FieldsetRegistry, TypeRef},
        schema::{Field, FieldDecl, Fieldset, FieldsetDef, FieldsetType},
    };

    // === Selection and Shaping ===
    pub use crate::core::{
        marshal::marshal,
        plan::{MarshalPlan, PlanEntry},
        query::LimitParams,
        selection::{Selection, SelectionParser},
    };

    // === Errors ===
    pub use crate::core::error::{
        ErrorResponse, FieldsetError, FieldsetResult, MarshalError, SchemaError, SelectionError,
    };

    // === Config ===
    pub use crate::config::{FieldsetsConfig, QueryConfig};

    // === Server ===
    pub use crate::server::{MarshalLayer, MarshalService};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        routing::{get, post},
    };
}
