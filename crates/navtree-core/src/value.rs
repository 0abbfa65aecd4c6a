//! Generic property values and named-property extraction.
//!
//! Backends describe how to reach child collections by registering a
//! [`PropertyTable`] per domain object type. The loader reads item slots only
//! through [`PropertyRegistry::read_named_property`]; there is no runtime
//! introspection of backend types.
//!
//! ```
//! use navtree_core::domain::{DomainObject, ObjectRef};
//! use navtree_core::progress::VoidProgress;
//! use navtree_core::value::{PropertyRegistry, PropertyTable, Value};
//!
//! struct Schema {
//!     tables: Vec<ObjectRef>,
//! }
//!
//! impl DomainObject for Schema {
//!     fn name(&self) -> String {
//!         "public".into()
//!     }
//! }
//!
//! let mut registry = PropertyRegistry::new();
//! registry.register(
//!     PropertyTable::<Schema>::new()
//!         .with("tables", |schema, _monitor| Ok(Value::objects(schema.tables.clone()))),
//! );
//!
//! let schema = ObjectRef::new(Schema { tables: Vec::new() });
//! let value = registry.read_named_property(&schema, "tables", &VoidProgress).unwrap();
//! assert!(value.as_list().is_some_and(|items| items.is_empty()));
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{DomainObject, ObjectRef};
use crate::error::{DomainError, PropertyError};
use crate::progress::ProgressMonitor;

/// A dynamically typed property value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Object(ObjectRef),
    List(Vec<Value>),
}

impl Value {
    /// A list of domain objects.
    pub fn objects(objects: impl IntoIterator<Item = ObjectRef>) -> Self {
        Self::List(objects.into_iter().map(Value::Object).collect())
    }

    /// Short name of the value's variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Object(_) => "object",
            Self::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Interpret the value as a homogeneous collection of domain objects.
    ///
    /// `Null` elements are skipped. Any non-object element, or objects of more
    /// than one concrete type, make the whole value unusable.
    pub fn into_object_collection(self, property: &str) -> Result<Vec<ObjectRef>, PropertyError> {
        let items = match self {
            Self::List(items) => items,
            other => {
                return Err(PropertyError::type_mismatch(property, "list", other.kind_name()));
            }
        };
        let mut objects = Vec::with_capacity(items.len());
        let mut element_type: Option<TypeId> = None;
        for item in items {
            match item {
                Self::Null => continue,
                Self::Object(object) => {
                    let type_id = object.object_type_id();
                    match element_type {
                        None => element_type = Some(type_id),
                        Some(expected) if expected != type_id => {
                            return Err(PropertyError::type_mismatch(
                                property,
                                "homogeneous object list",
                                "mixed object list",
                            ));
                        }
                        Some(_) => {}
                    }
                    objects.push(object);
                }
                other => {
                    return Err(PropertyError::type_mismatch(
                        property,
                        "object",
                        other.kind_name(),
                    ));
                }
            }
        }
        Ok(objects)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<ObjectRef>> for Value {
    fn from(value: Vec<ObjectRef>) -> Self {
        Self::objects(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Typed accessor for one named property.
pub type PropertyAccessor<T> =
    Arc<dyn Fn(&T, &dyn ProgressMonitor) -> Result<Value, DomainError> + Send + Sync>;

/// Named property accessors for one domain object type.
pub struct PropertyTable<T> {
    accessors: HashMap<String, PropertyAccessor<T>>,
}

impl<T: DomainObject> PropertyTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            accessors: HashMap::new(),
        }
    }

    /// Add an accessor (builder style).
    pub fn with<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T, &dyn ProgressMonitor) -> Result<Value, DomainError> + Send + Sync + 'static,
    {
        self.insert(name, accessor);
        self
    }

    /// Add or replace an accessor.
    pub fn insert<F>(&mut self, name: impl Into<String>, accessor: F)
    where
        F: Fn(&T, &dyn ProgressMonitor) -> Result<Value, DomainError> + Send + Sync + 'static,
    {
        self.accessors.insert(name.into(), Arc::new(accessor));
    }

    /// Whether an accessor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.accessors.contains_key(name)
    }

    /// Registered property names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.accessors.keys().map(String::as_str)
    }
}

impl<T: DomainObject> Default for PropertyTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

type ErasedAccessor =
    Arc<dyn Fn(&dyn Any, &dyn ProgressMonitor) -> Result<Value, DomainError> + Send + Sync>;

struct ErasedTable {
    type_name: &'static str,
    accessors: HashMap<String, ErasedAccessor>,
}

/// Property accessor tables for every registered domain object type.
#[derive(Default)]
pub struct PropertyRegistry {
    tables: HashMap<TypeId, ErasedTable>,
}

impl PropertyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Accessors of an already registered type are merged,
    /// later registrations winning on name clashes.
    pub fn register<T: DomainObject>(&mut self, table: PropertyTable<T>) {
        let entry = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| ErasedTable {
                type_name: std::any::type_name::<T>(),
                accessors: HashMap::new(),
            });
        for (name, accessor) in table.accessors {
            let erased: ErasedAccessor = Arc::new(move |object: &dyn Any, monitor: &dyn ProgressMonitor| {
                match object.downcast_ref::<T>() {
                    Some(object) => accessor(object, monitor),
                    None => Err(format!(
                        "accessor expects {}",
                        std::any::type_name::<T>()
                    )
                    .into()),
                }
            });
            entry.accessors.insert(name, erased);
        }
    }

    /// Whether `object`'s type has an accessor for `name`.
    pub fn has_property(&self, object: &ObjectRef, name: &str) -> bool {
        self.tables
            .get(&object.object_type_id())
            .is_some_and(|table| table.accessors.contains_key(name))
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.tables.len()
    }

    /// Read property `name` of `object`.
    pub fn read_named_property(
        &self,
        object: &ObjectRef,
        name: &str,
        monitor: &dyn ProgressMonitor,
    ) -> Result<Value, PropertyError> {
        let accessor = self
            .tables
            .get(&object.object_type_id())
            .and_then(|table| table.accessors.get(name))
            .ok_or_else(|| PropertyError::not_found(object.type_name(), name))?;
        accessor(object.as_any(), monitor).map_err(|source| PropertyError::extraction(name, source))
    }
}

impl fmt::Debug for PropertyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for table in self.tables.values() {
            let mut names: Vec<&str> = table.accessors.keys().map(String::as_str).collect();
            names.sort_unstable();
            map.entry(&table.type_name, &names);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::VoidProgress;

    struct Schema {
        tables: Vec<ObjectRef>,
    }

    impl DomainObject for Schema {
        fn name(&self) -> String {
            "public".into()
        }
    }

    struct Table(&'static str);

    impl DomainObject for Table {
        fn name(&self) -> String {
            self.0.into()
        }
    }

    struct View;

    impl DomainObject for View {
        fn name(&self) -> String {
            "v".into()
        }
    }

    fn registry() -> PropertyRegistry {
        let mut registry = PropertyRegistry::new();
        registry.register(
            PropertyTable::<Schema>::new()
                .with("tables", |schema, _| Ok(Value::objects(schema.tables.clone())))
                .with("owner", |_, _| Ok(Value::from("postgres")))
                .with("broken", |_, _| Err("backend went away".into())),
        );
        registry
    }

    #[test]
    fn test_read_named_property() {
        let table = ObjectRef::new(Table("orders"));
        let schema = ObjectRef::new(Schema {
            tables: vec![table.clone()],
        });
        let registry = registry();

        let value = registry
            .read_named_property(&schema, "tables", &VoidProgress)
            .unwrap();
        let objects = value.into_object_collection("tables").unwrap();
        assert_eq!(objects, vec![table]);
        assert!(registry.has_property(&schema, "owner"));
        assert!(!registry.has_property(&schema, "views"));
    }

    #[test]
    fn test_missing_property_and_type() {
        let registry = registry();
        let table = ObjectRef::new(Table("orders"));
        let err = registry
            .read_named_property(&table, "columns", &VoidProgress)
            .unwrap_err();
        assert!(matches!(err, PropertyError::NotFound { .. }));
    }

    #[test]
    fn test_accessor_failure_is_extraction_error() {
        let registry = registry();
        let schema = ObjectRef::new(Schema { tables: Vec::new() });
        let err = registry
            .read_named_property(&schema, "broken", &VoidProgress)
            .unwrap_err();
        assert!(matches!(err, PropertyError::Extraction { .. }));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_collection_shape_checks() {
        let scalar = Value::from("postgres");
        assert!(scalar.into_object_collection("owner").is_err());

        let mixed = Value::objects([ObjectRef::new(Table("t")), ObjectRef::new(View)]);
        assert!(mixed.into_object_collection("items").is_err());

        let with_nulls = Value::List(vec![Value::Null, Value::Object(ObjectRef::new(View))]);
        assert_eq!(with_nulls.into_object_collection("views").unwrap().len(), 1);

        let with_text = Value::List(vec![Value::from("x")]);
        assert!(with_text.into_object_collection("views").is_err());
    }

    #[test]
    fn test_register_merges_tables() {
        let mut registry = registry();
        registry.register(PropertyTable::<Schema>::new().with("views", |_, _| Ok(Value::Null)));
        let schema = ObjectRef::new(Schema { tables: Vec::new() });
        assert!(registry.has_property(&schema, "tables"));
        assert!(registry.has_property(&schema, "views"));
        assert_eq!(registry.type_count(), 1);
    }
}
