//! Integration tests for path naming, path lookups, icons and tree dumps.

mod support;

use navtree_core::{
    Icon, NavigatorConfig, NodeTreeDebug, ObjectFilter, TreeFormatOptions, TreeStyle,
    VoidProgress,
};
use support::{Fixture, Server, child, connect, load, names, walk};

#[test]
fn test_path_name_skips_folders() {
    let fixture = Fixture::new();
    let (mut model, connection) = connect(&fixture);
    let orders = walk(
        &mut model,
        connection,
        &["Databases", "sales", "public", "Tables", "orders"],
    );
    let column = walk(&mut model, orders, &["Columns", "id"]);
    let tables = model.parent(orders).unwrap();

    assert_eq!(model.path_name(column).unwrap(), "sales.public.orders.id");
    assert_eq!(model.path_name(tables).unwrap(), "sales.public.Tables");
    assert_eq!(model.path_name(connection).unwrap(), "local");
    assert_eq!(model.node_full_name(orders).unwrap(), "public.orders");
}

#[test]
fn test_path_separator_is_configurable() {
    let fixture = Fixture::new();
    let mut model =
        support::model_with(NavigatorConfig::builder().path_separator("::").build());
    let connection = model
        .add_connection(fixture.server.handle(), support::server_shape())
        .unwrap();
    let orders = walk(
        &mut model,
        connection,
        &["Databases", "sales", "public", "Tables", "orders"],
    );
    assert_eq!(model.path_name(orders).unwrap(), "sales::public::orders");
}

#[test]
fn test_node_path_round_trip() {
    let fixture = Fixture::new();
    let (mut model, connection) = connect(&fixture);
    let column = walk(
        &mut model,
        connection,
        &["Databases", "sales", "public", "Tables", "orders", "Columns", "id"],
    );
    let path = model.node_path(column).unwrap();
    assert_eq!(path, "local/databases/sales/public/tables/orders/columns/id");
    assert_eq!(model.node_path(model.root()).unwrap(), "");

    // A fresh model resolves the path by loading along the way.
    let (mut fresh, _) = connect(&fixture);
    let found = fresh
        .find_node_by_path(&path, &VoidProgress)
        .unwrap()
        .expect("path should resolve");
    assert_eq!(fresh.node_name(found).unwrap(), "id");
    assert_eq!(fresh.lookup(&fixture.order_id.handle()), Some(found));
    assert_eq!(fresh.node_path(found).unwrap(), path);
}

#[test]
fn test_find_node_by_path_misses() {
    let fixture = Fixture::new();
    let (mut model, _) = connect(&fixture);

    assert_eq!(model.find_node_by_path("", &VoidProgress).unwrap(), None);
    assert_eq!(model.find_node_by_path("elsewhere", &VoidProgress).unwrap(), None);
    assert_eq!(
        model
            .find_node_by_path("local/databases/nope", &VoidProgress)
            .unwrap(),
        None
    );
    let databases = model
        .find_node_by_path("/local/databases/", &VoidProgress)
        .unwrap()
        .expect("folder path should resolve");
    assert_eq!(model.node_name(databases).unwrap(), "Databases");
}

#[test]
fn test_find_node_by_path_tries_every_connection_with_the_name() {
    let fixture = Fixture::new();
    let (mut model, first) = connect(&fixture);
    let twin = Server::new("local");
    twin.add_database("archive");
    let second = model
        .add_connection(twin.handle(), support::server_shape())
        .unwrap();

    let archive = model
        .find_node_by_path("local/databases/archive", &VoidProgress)
        .unwrap()
        .expect("second connection should be searched");
    assert_eq!(model.node_name(archive).unwrap(), "archive");
    assert_eq!(model.parent(model.parent(archive).unwrap()), Some(second));

    let sales = model
        .find_node_by_path("local/databases/sales", &VoidProgress)
        .unwrap()
        .expect("first connection should match");
    assert_eq!(model.parent(model.parent(sales).unwrap()), Some(first));
    assert_eq!(model.find_node_by_path("local", &VoidProgress).unwrap(), Some(first));
}

#[test]
fn test_lookup_by_path_expands_ancestors() {
    let fixture = Fixture::new();
    let (mut model, _) = connect(&fixture);
    let orders = fixture.orders.handle();

    assert_eq!(model.lookup_by_path(&orders, false, &VoidProgress).unwrap(), None);
    let node = model
        .lookup_by_path(&orders, true, &VoidProgress)
        .unwrap()
        .expect("orders should be reachable");
    assert_eq!(model.node_path(node).unwrap(), "local/databases/sales/public/tables/orders");

    // Tables owned by a schema-less database sit in the inlined folder.
    let payroll = fixture.hr.add_table("payroll").handle();
    let node = model
        .lookup_by_path(&payroll, true, &VoidProgress)
        .unwrap()
        .expect("payroll should be reachable");
    assert_eq!(model.node_path(node).unwrap(), "local/databases/hr/tables/payroll");
}

#[test]
fn test_lookup_by_path_requires_a_connected_ancestor() {
    let fixture = Fixture::new();
    let mut model = support::model();
    assert_eq!(
        model
            .lookup_by_path(&fixture.orders.handle(), true, &VoidProgress)
            .unwrap(),
        None
    );
}

#[test]
fn test_reveal_filtered_object() {
    let fixture = Fixture::new();
    let (mut model, connection) = connect(&fixture);
    model
        .set_filter(
            None,
            "tables",
            Some(ObjectFilter::from_masks(["cust%"], std::iter::empty::<&str>()).unwrap()),
        )
        .unwrap();
    let orders = fixture.orders.handle();
    let view = fixture.public.add_view("v_customers").handle();

    assert_eq!(model.lookup_by_path(&orders, true, &VoidProgress).unwrap(), None);

    let node = model
        .reveal_object(&orders, &VoidProgress)
        .unwrap()
        .expect("filtered object should be revealed");
    let tables = walk(&mut model, connection, &["Databases", "sales", "public", "Tables"]);
    assert_eq!(model.parent(node), Some(tables));
    assert_eq!(
        names(&model, model.cached_children(tables).unwrap()),
        ["customers", "orders"]
    );

    // Views are not filtered, so revealing one does not touch the tables folder.
    let node = model
        .reveal_object(&view, &VoidProgress)
        .unwrap()
        .expect("view should be reachable");
    assert_eq!(model.node_path(node).unwrap(), "local/databases/sales/public/views/v_customers");
    assert_eq!(model.cached_children(tables).unwrap().len(), 2);
}

#[test]
fn test_icons() {
    let fixture = Fixture::new();
    let (mut model, connection) = connect(&fixture);
    let public = walk(&mut model, connection, &["Databases", "sales", "public"]);
    let children = load(&mut model, public);
    let orders = child(&mut model, children[0], "orders");

    assert_eq!(model.icon(connection).unwrap(), Icon::new("server"));
    assert_eq!(model.icon(orders).unwrap(), Icon::new("table"));
    assert_eq!(model.icon(children[2]).unwrap(), Icon::new("console"));
    assert_eq!(model.icon(children[1]).unwrap(), Icon::folder());
}

#[test]
fn test_tree_dump() {
    let fixture = Fixture::new();
    let (mut model, connection) = connect(&fixture);
    walk(&mut model, connection, &["Databases", "sales"]);

    let dump = NodeTreeDebug::with_options(TreeFormatOptions {
        style: TreeStyle::Ascii,
        show_ids: false,
        show_kinds: true,
        show_state: true,
        ..TreeFormatOptions::default()
    })
    .format_all(&model);

    let lines: Vec<&str> = dump.lines().collect();
    assert_eq!(lines[0], format!("Navigator Tree ({} nodes):", model.node_count()));
    assert_eq!(lines[1], "Root (root)");
    assert_eq!(lines[2], "`-- local (connection)");
    assert_eq!(lines[3], "|  `-- Databases (folder)");
    assert_eq!(lines[4], "|  |  +-- sales (item) <unloaded>");
    assert_eq!(lines[5], "|  |  `-- hr (item) <unloaded>");

    let subtree = NodeTreeDebug::with_options(TreeFormatOptions::minimal())
        .format_subtree(&model, connection)
        .unwrap();
    assert!(subtree.starts_with("local\n"));

    let empty = NodeTreeDebug::new().format_all(&support::model());
    assert!(empty.contains("(empty)"));
}
