//! Capability contract for backend domain objects.
//!
//! The tree never compiles against concrete backend types. It sees connections,
//! schemas, tables and so on only through [`DomainObject`] and reaches their
//! child collections by name through the
//! [`PropertyRegistry`](crate::value::PropertyRegistry).
//!
//! Objects are shared as [`ObjectRef`], whose equality and hash are *reference*
//! identity: two distinct allocations describing the same table are two
//! different objects as far as the identity registry is concerned.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use crate::error::DomainError;
use crate::progress::ProgressMonitor;
use crate::shape::Icon;

/// A backend entity (connection, schema, table, column, ...).
///
/// Only [`name`](Self::name) is required; everything else has a neutral default.
pub trait DomainObject: Any + Send + Sync {
    /// Object name as shown in the tree.
    fn name(&self) -> String;

    /// Optional human-readable description.
    fn description(&self) -> Option<String> {
        None
    }

    /// Fully qualified name (e.g. `schema.table`).
    fn full_name(&self) -> String {
        self.name()
    }

    /// Name used when [`name`](Self::name) is empty.
    fn fallback_name(&self) -> String {
        String::from("<unnamed>")
    }

    /// The owning object, climbing towards the connection handle.
    fn parent_object(&self) -> Option<ObjectRef> {
        None
    }

    /// Reload the object's own state from the backend.
    ///
    /// Returns `false` when the object cannot refresh itself; the tree then asks
    /// an ancestor instead.
    fn refresh_object(&self, _monitor: &dyn ProgressMonitor) -> bool {
        false
    }

    /// Prepare the object for children enumeration (e.g. connect).
    ///
    /// `Ok(false)` means "not available right now"; nothing is cached and a later
    /// load retries.
    fn initialize(&self, _monitor: &dyn ProgressMonitor) -> Result<bool, DomainError> {
        Ok(true)
    }

    /// Hidden objects are never shown.
    fn is_hidden(&self) -> bool {
        false
    }

    /// System objects are shown only when the model is configured to.
    fn is_system(&self) -> bool {
        false
    }

    /// Object-supplied icon, preferred over shape icon rules.
    fn object_icon(&self) -> Option<Icon> {
        None
    }
}

/// Shared handle to a domain object with reference identity.
#[derive(Clone)]
pub struct ObjectRef {
    object: Arc<dyn DomainObject>,
    type_name: &'static str,
}

impl ObjectRef {
    /// Wrap a new object.
    pub fn new<T: DomainObject>(object: T) -> Self {
        Self::from_arc(Arc::new(object))
    }

    /// Wrap an already shared object. Clones of `object` share identity.
    pub fn from_arc<T: DomainObject>(object: Arc<T>) -> Self {
        Self {
            object,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Whether both handles refer to the same allocation.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        self.addr() == other.addr()
    }

    /// Concrete type of the wrapped object.
    pub fn object_type_id(&self) -> TypeId {
        self.as_any().type_id()
    }

    /// Concrete type name of the wrapped object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Short type name without the module path.
    pub fn short_type_name(&self) -> &'static str {
        self.type_name.rsplit("::").next().unwrap_or(self.type_name)
    }

    /// Downcast to the concrete backend type.
    pub fn downcast_ref<T: DomainObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Node label: the name, or the fallback name when empty.
    pub fn display_name(&self) -> String {
        let name = self.object.name();
        if name.is_empty() {
            self.object.fallback_name()
        } else {
            name
        }
    }

    pub(crate) fn as_any(&self) -> &dyn Any {
        let object: &dyn DomainObject = &*self.object;
        object
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.object) as *const ()
    }
}

impl Deref for ObjectRef {
    type Target = dyn DomainObject;

    fn deref(&self) -> &Self::Target {
        &*self.object
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({:?} @ {:p})",
            self.short_type_name(),
            self.object.name(),
            self.addr()
        )
    }
}

/// Ancestors of `object` from the topmost one down to its direct parent.
pub fn ancestor_chain(object: &ObjectRef) -> Vec<ObjectRef> {
    let mut chain = Vec::new();
    let mut current = object.parent_object();
    while let Some(parent) = current {
        // A cyclic parent chain is a backend bug; stop rather than spin.
        if parent.ptr_eq(object) || chain.iter().any(|seen: &ObjectRef| seen.ptr_eq(&parent)) {
            break;
        }
        current = parent.parent_object();
        chain.push(parent);
    }
    chain.reverse();
    chain
}
