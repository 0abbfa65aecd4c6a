//! Lazily loaded navigator tree over a hierarchical backend.
//!
//! This crate provides the model behind a database-navigator style tree view:
//!
//! - **Shapes**: a declarative description of which children a node type has
//!   ([`Shape`]), shared across all nodes of that type
//! - **Lazy loading**: children are fetched from the backend on first access
//!   and cached until the node is refreshed
//! - **Identity registry**: each domain object maps to at most one live node
//! - **Events**: structural changes are reported to registered listeners,
//!   directly or through a queue
//! - **Paths**: dotted display paths and stable node paths that can be
//!   resolved back to nodes
//!
//! # Example
//!
//! ```
//! use navtree_core::domain::{DomainObject, ObjectRef};
//! use navtree_core::progress::VoidProgress;
//! use navtree_core::shape::Shape;
//! use navtree_core::value::{PropertyRegistry, PropertyTable, Value};
//! use navtree_core::NavigatorModel;
//!
//! struct Server {
//!     databases: Vec<ObjectRef>,
//! }
//!
//! impl DomainObject for Server {
//!     fn name(&self) -> String {
//!         "local".into()
//!     }
//! }
//!
//! struct Database(&'static str);
//!
//! impl DomainObject for Database {
//!     fn name(&self) -> String {
//!         self.0.into()
//!     }
//! }
//!
//! let mut properties = PropertyRegistry::new();
//! properties.register(
//!     PropertyTable::<Server>::new()
//!         .with("databases", |server, _| Ok(Value::objects(server.databases.clone()))),
//! );
//!
//! let shape = Shape::container("server")
//!     .child(Shape::folder("Databases").child(Shape::item("Database", "databases")))
//!     .into_shared();
//!
//! let mut model = NavigatorModel::new(properties);
//! let server = ObjectRef::new(Server {
//!     databases: vec![ObjectRef::new(Database("sales")), ObjectRef::new(Database("hr"))],
//! });
//! let connection = model.add_connection(server, shape).unwrap();
//!
//! let folders = model.children(connection, &VoidProgress).unwrap().into_loaded().unwrap();
//! let databases = model.children(folders[0], &VoidProgress).unwrap().into_loaded().unwrap();
//! assert_eq!(model.node_name(databases[1]).unwrap(), "hr");
//! assert_eq!(model.node_path(databases[1]).unwrap(), "local/Databases/hr");
//! ```

pub mod config;
pub mod domain;
mod error;
pub mod event;
pub mod filter;
mod icon;
pub mod loader;
pub mod logging;
pub mod model;
pub mod node;
pub mod path;
pub mod progress;
pub mod registry;
pub mod shape;
pub mod signal;
pub mod value;

pub use config::{EventDelivery, NavigatorConfig, NavigatorConfigBuilder};
pub use domain::{DomainObject, ObjectRef};
pub use error::{DomainError, NavigatorError, PropertyError, Result};
pub use event::{EventAction, ListenerId, NavigatorEvent, NavigatorListener, NodeChange};
pub use filter::ObjectFilter;
pub use loader::{ChildrenOutcome, FetchedChildren, LoadPlan, LoadRequest};
pub use logging::{NodeTreeDebug, TreeFormatOptions, TreeStyle};
pub use model::{NavigatorModel, NodeTarget, SharedNavigatorModel};
pub use node::{NodeId, NodeKind, NodeView};
pub use progress::{CancellationToken, ProgressMonitor, TaskProgress, VoidProgress};
pub use shape::{EditorAssociation, Icon, Shape, SlotKind};
pub use value::{PropertyRegistry, PropertyTable, Value};
