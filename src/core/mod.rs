//! Core module containing descriptors, schemas and the serializer

pub mod error;
pub mod field;
pub mod marshal;
pub mod meta;
pub mod nested;
pub mod plan;
pub mod query;
pub mod registry;
pub mod schema;
pub mod selection;

pub use error::{
    ErrorResponse, FieldsetError, FieldsetResult, MarshalError, SchemaError, SelectionError,
};
pub use field::{DateFormat, FieldFormat, LeafField};
pub use marshal::marshal;
pub use meta::FieldsetMeta;
pub use nested::{FieldsetRef, NestedDecl, NestedField, NestedKwargs};
pub use plan::{MarshalPlan, PlanEntry};
pub use query::LimitParams;
pub use registry::{FieldsetRegistry, TypeRef};
pub use schema::{Field, FieldDecl, Fieldset, FieldsetDef, FieldsetType};
pub use selection::{Selection, SelectionParser};
