//! Registry memoizing one schema per fieldset type

use super::error::SchemaError;
use super::nested::FieldsetRef;
use super::schema::{Field, FieldDecl, Fieldset, FieldsetDef, FieldsetType};
use crate::config::FieldsetsConfig;
use crate::server::MarshalLayer;
use indexmap::IndexMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Type-erased handle to a [`FieldsetType`]
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    declare: fn() -> FieldsetDef,
}

impl TypeRef {
    pub fn of<T: FieldsetType>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::NAME,
            declare: T::declare,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

/// Builds fieldsets and memoizes them per type
///
/// Schemas are built on first use (or eagerly through [`register`]) and shared
/// read-only afterwards.
///
/// [`register`]: FieldsetRegistry::register
pub struct FieldsetRegistry {
    config: Arc<FieldsetsConfig>,
    schemas: RwLock<HashMap<TypeId, Arc<Fieldset>>>,
}

impl Default for FieldsetRegistry {
    fn default() -> Self {
        Self::new(Arc::new(FieldsetsConfig::default()))
    }
}

impl fmt::Debug for FieldsetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldsetRegistry")
            .field("config", &self.config)
            .field("schemas", &self.len())
            .finish()
    }
}

impl FieldsetRegistry {
    pub fn new(config: Arc<FieldsetsConfig>) -> Self {
        Self {
            config,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FieldsetsConfig {
        &self.config
    }

    /// Get the memoized schema of `T`, building it on first use
    pub fn get<T: FieldsetType>(&self) -> Result<Arc<Fieldset>, SchemaError> {
        self.resolve(TypeRef::of::<T>(), &mut Vec::new())
    }

    /// Build the schema of `T` now so declaration errors surface at startup
    pub fn register<T: FieldsetType>(&self) -> Result<&Self, SchemaError> {
        self.get::<T>()?;
        Ok(self)
    }

    /// Build an ad-hoc declaration; nested types go through the memo
    pub fn build(&self, def: FieldsetDef) -> Result<Arc<Fieldset>, SchemaError> {
        self.build_def(def, &mut Vec::new())
    }

    /// Layer shaping responses of a route with the schema of `T`
    pub fn layer<T: FieldsetType>(&self) -> Result<MarshalLayer, SchemaError> {
        Ok(MarshalLayer::new(self.get::<T>()?).with_body_limit(self.config.max_body_bytes))
    }

    /// Number of memoized schemas
    pub fn len(&self) -> usize {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the memoized schemas, sorted
    pub fn names(&self) -> Vec<String> {
        let schemas = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = schemas.values().map(|f| f.name().to_string()).collect();
        names.sort();
        names
    }

    fn cached(&self, id: TypeId) -> Option<Arc<Fieldset>> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    fn resolve(&self, ty: TypeRef, stack: &mut Vec<TypeRef>) -> Result<Arc<Fieldset>, SchemaError> {
        if let Some(fieldset) = self.cached(ty.id) {
            return Ok(fieldset);
        }

        if let Some(start) = stack.iter().position(|t| t.id == ty.id) {
            let chain = stack[start..]
                .iter()
                .map(|t| t.name.to_string())
                .chain(std::iter::once(ty.name.to_string()))
                .collect();
            return Err(SchemaError::Cyclic { chain });
        }

        if stack.len() >= self.config.max_depth {
            return Err(SchemaError::TooDeep {
                fieldset: ty.name.to_string(),
                depth: stack.len() + 1,
                max: self.config.max_depth,
            });
        }

        stack.push(ty);
        let built = self.build_def((ty.declare)(), stack);
        stack.pop();
        let built = built?;

        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        let fieldset = schemas.entry(ty.id).or_insert(built).clone();
        drop(schemas);

        tracing::info!(
            fieldset = ty.name,
            fields = fieldset.fields().len(),
            names = fieldset.all_field_names().len(),
            "fieldset schema built"
        );
        Ok(fieldset)
    }

    fn build_def(&self, def: FieldsetDef, stack: &mut Vec<TypeRef>) -> Result<Arc<Fieldset>, SchemaError> {
        let (name, decls, meta) = def.into_parts();
        let meta = match self.config.meta_for(&name) {
            Some(overrides) => meta.merge(overrides),
            None => meta,
        };

        let mut fields = IndexMap::with_capacity(decls.len());
        for (field_name, decl) in decls {
            let field = match decl {
                FieldDecl::Leaf(leaf) => Field::Leaf(Arc::new(leaf)),
                FieldDecl::Nested(nested) => {
                    let child = match nested.target() {
                        FieldsetRef::Type(ty) => self.resolve(*ty, stack)?,
                        FieldsetRef::Instance(fieldset) => fieldset.clone(),
                    };
                    Field::Nested(Arc::new(nested.resolve(child)))
                }
            };
            fields.insert(field_name, field);
        }

        Fieldset::from_parts(name, fields, meta, &self.config.query, self.config.max_depth).map(Arc::new)
    }
}
