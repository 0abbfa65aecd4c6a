//! A small in-memory database backend used by the integration tests.
//!
//! Server -> Database -> Schema -> Table -> Column, with parent links so
//! objects can be revealed by their ancestor chain, plus hooks for scripting
//! connection failures, refresh support and cancellation.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use navtree_core::{
    CancellationToken, DomainError, DomainObject, EditorAssociation, Icon, NavigatorConfig,
    NavigatorEvent, NavigatorModel, NodeId, ObjectRef, ProgressMonitor, PropertyRegistry,
    PropertyTable, Shape, Value, VoidProgress,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn refs<T: DomainObject>(items: &[Arc<T>]) -> Value {
    Value::objects(items.iter().map(|item| ObjectRef::from_arc(Arc::clone(item))))
}

// =========================================================================
// Server
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Online,
    Offline,
    Failing,
}

pub struct Server {
    name: String,
    databases: RwLock<Vec<Arc<Database>>>,
    availability: Mutex<Availability>,
    connects: AtomicUsize,
    refreshable: AtomicBool,
    refreshes: AtomicUsize,
}

impl Server {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            databases: RwLock::new(Vec::new()),
            availability: Mutex::new(Availability::Online),
            connects: AtomicUsize::new(0),
            refreshable: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn handle(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::from_arc(Arc::clone(self))
    }

    pub fn add_database(self: &Arc<Self>, name: &str) -> Arc<Database> {
        let database = Database::new(name, Arc::downgrade(self), false);
        self.databases.write().push(Arc::clone(&database));
        database
    }

    pub fn add_system_database(self: &Arc<Self>, name: &str) -> Arc<Database> {
        let database = Database::new(name, Arc::downgrade(self), true);
        self.databases.write().push(Arc::clone(&database));
        database
    }

    pub fn drop_database(&self, name: &str) {
        self.databases.write().retain(|database| database.name != name);
    }

    pub fn set_availability(&self, availability: Availability) {
        *self.availability.lock() = availability;
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn set_refreshable(&self, refreshable: bool) {
        self.refreshable.store(refreshable, Ordering::SeqCst);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl DomainObject for Server {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> Option<String> {
        Some(format!("Server {}", self.name))
    }

    fn initialize(&self, _monitor: &dyn ProgressMonitor) -> Result<bool, DomainError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match *self.availability.lock() {
            Availability::Online => Ok(true),
            Availability::Offline => Ok(false),
            Availability::Failing => Err("connection refused".into()),
        }
    }

    fn refresh_object(&self, _monitor: &dyn ProgressMonitor) -> bool {
        if self.refreshable.load(Ordering::SeqCst) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

// =========================================================================
// Database
// =========================================================================

pub struct Database {
    name: String,
    server: Weak<Server>,
    schemas: RwLock<Vec<Arc<Schema>>>,
    tables: RwLock<Vec<Arc<Table>>>,
    views: RwLock<Vec<Arc<Table>>>,
    system: bool,
}

impl Database {
    fn new(name: &str, server: Weak<Server>, system: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            server,
            schemas: RwLock::new(Vec::new()),
            tables: RwLock::new(Vec::new()),
            views: RwLock::new(Vec::new()),
            system,
        })
    }

    pub fn handle(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::from_arc(Arc::clone(self))
    }

    pub fn add_schema(self: &Arc<Self>, name: &str) -> Arc<Schema> {
        let schema = Schema::new(name, Arc::downgrade(self));
        self.schemas.write().push(Arc::clone(&schema));
        schema
    }

    /// A table owned directly by the database, for backends without schemas.
    pub fn add_table(self: &Arc<Self>, name: &str) -> Arc<Table> {
        let table = Table::new(name, Owner::Database(Arc::downgrade(self)), false, false);
        self.tables.write().push(Arc::clone(&table));
        table
    }
}

impl DomainObject for Database {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parent_object(&self) -> Option<ObjectRef> {
        self.server.upgrade().map(ObjectRef::from_arc)
    }

    fn is_system(&self) -> bool {
        self.system
    }
}

// =========================================================================
// Schema
// =========================================================================

pub struct Schema {
    name: String,
    database: Weak<Database>,
    tables: RwLock<Vec<Arc<Table>>>,
    views: RwLock<Vec<Arc<Table>>>,
    cancel_on_read: Mutex<Option<CancellationToken>>,
    reads: Mutex<Vec<&'static str>>,
    refreshable: AtomicBool,
    refreshes: AtomicUsize,
}

impl Schema {
    fn new(name: &str, database: Weak<Database>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            database,
            tables: RwLock::new(Vec::new()),
            views: RwLock::new(Vec::new()),
            cancel_on_read: Mutex::new(None),
            reads: Mutex::new(Vec::new()),
            refreshable: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
        })
    }

    /// A detached schema, used as a connection handle by flat-shape tests.
    pub fn standalone(name: &str) -> Arc<Self> {
        Self::new(name, Weak::new())
    }

    pub fn handle(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::from_arc(Arc::clone(self))
    }

    pub fn add_table(self: &Arc<Self>, name: &str) -> Arc<Table> {
        let table = Table::new(name, Owner::Schema(Arc::downgrade(self)), false, false);
        self.tables.write().push(Arc::clone(&table));
        table
    }

    pub fn add_hidden_table(self: &Arc<Self>, name: &str) -> Arc<Table> {
        let table = Table::new(name, Owner::Schema(Arc::downgrade(self)), true, false);
        self.tables.write().push(Arc::clone(&table));
        table
    }

    pub fn add_view(self: &Arc<Self>, name: &str) -> Arc<Table> {
        let view = Table::new(name, Owner::Schema(Arc::downgrade(self)), false, true);
        self.views.write().push(Arc::clone(&view));
        view
    }

    pub fn drop_table(&self, name: &str) {
        self.tables.write().retain(|table| table.name != name);
    }

    /// Cancel `token` the next time the table list is read.
    pub fn cancel_on_table_read(&self, token: CancellationToken) {
        *self.cancel_on_read.lock() = Some(token);
    }

    /// Collections read so far, in order.
    pub fn reads(&self) -> Vec<&'static str> {
        self.reads.lock().clone()
    }

    pub fn set_refreshable(&self, refreshable: bool) {
        self.refreshable.store(refreshable, Ordering::SeqCst);
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    fn record(&self, property: &'static str) {
        self.reads.lock().push(property);
    }
}

impl DomainObject for Schema {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parent_object(&self) -> Option<ObjectRef> {
        self.database.upgrade().map(ObjectRef::from_arc)
    }

    fn refresh_object(&self, _monitor: &dyn ProgressMonitor) -> bool {
        if self.refreshable.load(Ordering::SeqCst) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

// =========================================================================
// Table and Column
// =========================================================================

enum Owner {
    Database(Weak<Database>),
    Schema(Weak<Schema>),
}

pub struct Table {
    name: String,
    owner: Owner,
    columns: RwLock<Vec<Arc<Column>>>,
    hidden: bool,
    view: bool,
}

impl Table {
    fn new(name: &str, owner: Owner, hidden: bool, view: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            owner,
            columns: RwLock::new(Vec::new()),
            hidden,
            view,
        })
    }

    pub fn handle(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::from_arc(Arc::clone(self))
    }

    pub fn add_column(self: &Arc<Self>, name: &str) -> Arc<Column> {
        let column = Arc::new(Column {
            name: name.to_string(),
            table: Arc::downgrade(self),
        });
        self.columns.write().push(Arc::clone(&column));
        column
    }

    pub fn is_view(&self) -> bool {
        self.view
    }
}

impl DomainObject for Table {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn full_name(&self) -> String {
        match self.parent_object() {
            Some(parent) => format!("{}.{}", parent.name(), self.name),
            None => self.name.clone(),
        }
    }

    fn parent_object(&self) -> Option<ObjectRef> {
        match &self.owner {
            Owner::Database(database) => database.upgrade().map(ObjectRef::from_arc),
            Owner::Schema(schema) => schema.upgrade().map(ObjectRef::from_arc),
        }
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }
}

pub struct Column {
    name: String,
    table: Weak<Table>,
}

impl Column {
    pub fn handle(self: &Arc<Self>) -> ObjectRef {
        ObjectRef::from_arc(Arc::clone(self))
    }
}

impl DomainObject for Column {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn parent_object(&self) -> Option<ObjectRef> {
        self.table.upgrade().map(ObjectRef::from_arc)
    }
}

// =========================================================================
// Property tables and shapes
// =========================================================================

pub fn properties() -> PropertyRegistry {
    let mut properties = PropertyRegistry::new();
    properties.register(
        PropertyTable::<Server>::new()
            .with("databases", |server, _| Ok(refs(&server.databases.read()))),
    );
    properties.register(
        PropertyTable::<Database>::new()
            .with("schemas", |database, _| Ok(refs(&database.schemas.read())))
            .with("tables", |database, _| Ok(refs(&database.tables.read())))
            .with("views", |database, _| Ok(refs(&database.views.read()))),
    );
    properties.register(
        PropertyTable::<Schema>::new()
            .with("tables", |schema, _| {
                schema.record("tables");
                if let Some(token) = schema.cancel_on_read.lock().as_ref() {
                    token.cancel();
                }
                Ok(refs(&schema.tables.read()))
            })
            .with("views", |schema, _| {
                schema.record("views");
                Ok(refs(&schema.views.read()))
            })
            .with("sequences", |schema, _| {
                schema.record("sequences");
                Ok(Value::Null)
            }),
    );
    properties.register(
        PropertyTable::<Table>::new().with("columns", |table, _| Ok(refs(&table.columns.read()))),
    );
    properties
}

fn columns_folder() -> Shape {
    Shape::folder("Columns")
        .type_tag("columns")
        .child(Shape::item("Column", "columns").icon(Icon::new("column")))
}

/// Server -> Databases/ -> Database -> Schema (optional) -> Tables/, Views/, Console.
pub fn server_shape() -> Arc<Shape> {
    let tables = Shape::folder("Tables")
        .type_tag("tables")
        .child(Shape::item("Table", "tables").icon(Icon::new("table")).child(columns_folder()));
    let views = Shape::folder("Views")
        .type_tag("views")
        .child(Shape::item("View", "views").icon(Icon::new("view")).child(columns_folder()));
    let console =
        Shape::object("Console").editor(EditorAssociation::new("sql-console", Icon::new("console")));
    let schema = Shape::item("Schema", "schemas")
        .optional()
        .child(tables)
        .child(views)
        .child(console);
    let database = Shape::item("Database", "databases").child(schema);

    Shape::container("server")
        .icon(Icon::new("server"))
        .child(Shape::folder("Databases").type_tag("databases").child(database))
        .into_shared()
}

pub fn model() -> NavigatorModel {
    init_tracing();
    NavigatorModel::new(properties())
}

pub fn model_with(config: NavigatorConfig) -> NavigatorModel {
    init_tracing();
    NavigatorModel::with_config(properties(), config)
}

// =========================================================================
// Navigation helpers
// =========================================================================

pub fn load(model: &mut NavigatorModel, node: NodeId) -> Vec<NodeId> {
    model
        .children(node, &VoidProgress)
        .unwrap()
        .into_loaded()
        .expect("children should load")
}

pub fn names(model: &NavigatorModel, nodes: &[NodeId]) -> Vec<String> {
    nodes.iter().map(|&node| model.node_name(node).unwrap()).collect()
}

pub fn loaded_names(model: &mut NavigatorModel, node: NodeId) -> Vec<String> {
    let children = load(model, node);
    names(model, &children)
}

/// Find the child named `name`, failing the test if there is none.
pub fn child(model: &mut NavigatorModel, parent: NodeId, name: &str) -> NodeId {
    let children = load(model, parent);
    children
        .into_iter()
        .find(|&node| model.node_name(node).unwrap() == name)
        .unwrap_or_else(|| panic!("no child named {name}"))
}

/// Follow `names` down from `from`, loading as needed.
pub fn walk(model: &mut NavigatorModel, from: NodeId, names: &[&str]) -> NodeId {
    names
        .iter()
        .fold(from, |node, name| child(model, node, name))
}

/// A fresh model with the fixture's server added as a connection.
pub fn connect(fixture: &Fixture) -> (NavigatorModel, NodeId) {
    let mut model = model();
    let connection = model
        .add_connection(fixture.server.handle(), server_shape())
        .unwrap();
    (model, connection)
}

/// Records every delivered event.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<NavigatorEvent>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<NavigatorEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<NavigatorEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl navtree_core::NavigatorListener for Recorder {
    fn on_event(&self, event: &NavigatorEvent) {
        self.events.lock().push(event.clone());
    }
}

/// A populated backend: one server with `sales` (schemas `public` and
/// `audit`) and `hr` (no schemas, tables owned by the database).
pub struct Fixture {
    pub server: Arc<Server>,
    pub sales: Arc<Database>,
    pub hr: Arc<Database>,
    pub public: Arc<Schema>,
    pub audit: Arc<Schema>,
    pub orders: Arc<Table>,
    pub customers: Arc<Table>,
    pub order_id: Arc<Column>,
}

impl Fixture {
    pub fn new() -> Self {
        let server = Server::new("local");
        let sales = server.add_database("sales");
        let hr = server.add_database("hr");

        let public = sales.add_schema("public");
        let orders = public.add_table("orders");
        let order_id = orders.add_column("id");
        orders.add_column("customer_id");
        let customers = public.add_table("customers");
        customers.add_column("id");
        public.add_view("v_orders");

        let audit = sales.add_schema("audit");
        audit.add_table("log");

        hr.add_table("employees");

        Self {
            server,
            sales,
            hr,
            public,
            audit,
            orders,
            customers,
            order_id,
        }
    }
}
