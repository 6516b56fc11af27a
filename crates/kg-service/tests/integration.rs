//! Integration tests: source collection, merge, build, and queries end to end.

use kg_graph::{InMemoryGraphStore, SqliteGraphStore};
use kg_service::{Direction, KgContext, MergePolicy, SourceSet, StaticExtractor};
use kg_source::MockExtractor;
use kg_types::{
    ColumnModel, GraphStore, KgConfig, LineStyle, RelationKind, StaticSchema, StaticTable,
    TableModel, TableRelationModel,
};
use std::collections::HashSet;
use std::sync::Arc;

fn memory_context() -> KgContext {
    KgContext::new(Arc::new(InMemoryGraphStore::new()), &KgConfig::default())
}

fn table(name: &str, columns: &[&str]) -> TableModel {
    let mut cols = vec![ColumnModel::new("id", "int").primary()];
    cols.extend(columns.iter().map(|c| ColumnModel::new(*c, "int")));
    TableModel::new("shop", name, cols)
}

fn fk(from: &str, col: &str, to: &str) -> TableRelationModel {
    TableRelationModel::new(from, col, to, "id", RelationKind::ForeignKey)
}

fn shop_tables() -> Vec<TableModel> {
    vec![
        table("orders", &["customer_id"]),
        table("customers", &[]),
        table("order_items", &["order_id", "product_id"]),
        table("products", &[]),
    ]
}

fn shop_relations() -> Vec<TableRelationModel> {
    vec![
        fk("orders", "customer_id", "customers"),
        fk("order_items", "order_id", "orders"),
        fk("order_items", "product_id", "products"),
    ]
}

async fn shop_context() -> KgContext {
    let ctx = memory_context();
    let mut sources = SourceSet::new().with_relational(MockExtractor::new(
        "catalog",
        shop_tables(),
        shop_relations(),
    ));
    let result = ctx.init_graph(&mut sources, MergePolicy::Merge).await.unwrap();
    assert!(result.success, "{:?}", result.error_message);
    ctx
}

#[tokio::test]
async fn direct_join_path() {
    let ctx = shop_context().await;
    let res = ctx
        .service()
        .find_shortest_path("orders", "customers", None, None)
        .await
        .unwrap();
    assert!(res.found);
    assert_eq!(res.path.as_ref().unwrap().length, 1);
    assert_eq!(
        res.sql_hint.as_deref(),
        Some("FROM orders\n  INNER JOIN customers ON orders.customer_id = customers.id")
    );
    assert_eq!(
        res.explanation.as_deref(),
        Some("'orders' is directly connected to 'customers' via customer_id → id.")
    );
}

#[tokio::test]
async fn two_hop_path_through_junction_table() {
    let ctx = shop_context().await;
    let res = ctx
        .service()
        .find_shortest_path("orders", "products", None, None)
        .await
        .unwrap();
    assert!(res.found);
    let path = res.path.unwrap();
    assert_eq!(path.length, 2);
    assert_eq!(
        path.nodes,
        vec![
            "table:shop.orders".to_string(),
            "table:shop.order_items".to_string(),
            "table:shop.products".to_string()
        ]
    );
    let hint = res.sql_hint.unwrap();
    let joins: Vec<&str> = hint.lines().filter(|l| l.contains("JOIN")).collect();
    assert_eq!(joins.len(), 2);
    assert!(joins[0].contains("JOIN order_items"));
    assert!(joins[1].contains("JOIN products"));
}

#[tokio::test]
async fn undeclared_id_column_becomes_one_semantic_relation() {
    let ctx = memory_context();
    let tables = vec![table("orders", &["customer_id"]), table("customers", &[])];
    let result = ctx.rebuild(&tables, &[], true).await;
    assert!(result.success);
    assert_eq!(result.edges_created, 1);

    let edges = ctx.store().get_all_edges().await.unwrap();
    assert_eq!(edges.len(), 1);
    let edge = &edges[0];
    assert_eq!(edge.kind, RelationKind::Semantic);
    assert_eq!(edge.properties.confidence, 0.5);
    assert!(edge.properties.inferred);
    assert_eq!(edge.style.line, LineStyle::Dashed);
}

#[tokio::test]
async fn relation_to_missing_table_is_skipped() {
    let ctx = memory_context();
    let relations = vec![
        fk("orders", "customer_id", "customers"),
        fk("orders", "warehouse_id", "ghost_table"),
    ];
    let tables = vec![table("orders", &["customer_id"]), table("customers", &[])];
    let result = ctx.rebuild(&tables, &relations, true).await;
    assert!(result.success);
    assert_eq!(result.edges_created, 1);
    assert_eq!(result.relations_skipped, 1);
    assert!(result.error_message.is_none());
}

#[tokio::test]
async fn static_only_with_empty_static_schema_builds_nothing() {
    let ctx = memory_context();
    let mock = MockExtractor::new("catalog", shop_tables(), shop_relations());
    let connects = mock.connect_counter();
    let mut sources = SourceSet::new()
        .with_relational(mock)
        .with_static(StaticExtractor::new(StaticSchema::default()));
    let result = ctx
        .init_graph(&mut sources, MergePolicy::StaticOnly)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.tables_processed, 0);
    assert_eq!(result.relations_processed, 0);
    assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(ctx.store().get_all_nodes().await.unwrap().is_empty());
}

#[tokio::test]
async fn static_override_replaces_relational_definitions() {
    let ctx = memory_context();
    let schema = StaticSchema {
        database: "shop".to_string(),
        tables: vec![StaticTable {
            name: "customers".to_string(),
            database: None,
            columns: vec![ColumnModel::new("id", "int").primary()],
            primary_keys: Vec::new(),
            row_count: Some(5_000_000),
            comment: "curated".to_string(),
            graph_node_id: None,
        }],
        relations: Vec::new(),
    };
    let mut sources = SourceSet::new()
        .with_relational(MockExtractor::new("catalog", shop_tables(), shop_relations()))
        .with_static(StaticExtractor::new(schema));
    let result = ctx
        .init_graph(&mut sources, MergePolicy::StaticOverride)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.tables_processed, 4);

    let customers = ctx.service().get_node("customers").await.unwrap().unwrap();
    assert_eq!(customers.properties["comment"], "curated");
    assert!(customers.semantic_labels().contains(&"大表".to_string()));
}

#[tokio::test]
async fn no_edge_is_left_dangling() {
    let ctx = memory_context();
    let mut relations = shop_relations();
    relations.push(fk("products", "supplier_id", "suppliers"));
    relations.push(fk("ghost", "x_id", "orders"));
    ctx.rebuild(&shop_tables(), &relations, true).await;

    let ids: HashSet<String> = ctx
        .store()
        .get_all_nodes()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    for edge in ctx.store().get_all_edges().await.unwrap() {
        assert!(ids.contains(&edge.source), "dangling source {}", edge.id);
        assert!(ids.contains(&edge.target), "dangling target {}", edge.id);
    }
}

#[tokio::test]
async fn enrichment_never_removes_declared_relations() {
    let ctx = memory_context();
    ctx.rebuild(&shop_tables(), &shop_relations(), true).await;
    let edges = ctx.store().get_all_edges().await.unwrap();
    for relation in shop_relations() {
        let edge = edges
            .iter()
            .find(|e| e.id == relation.key())
            .expect("declared relation kept");
        assert_eq!(edge.kind, RelationKind::ForeignKey);
        assert!(!edge.properties.inferred);
    }
    assert!(edges.iter().all(|e| e.kind != RelationKind::Semantic));
}

#[tokio::test]
async fn paths_and_neighbors_are_symmetric() {
    let ctx = shop_context().await;
    let svc = ctx.service();
    let names = ["orders", "customers", "order_items", "products"];
    for a in names {
        for b in names {
            let ab = svc.find_shortest_path(a, b, None, None).await.unwrap();
            let ba = svc.find_shortest_path(b, a, None, None).await.unwrap();
            assert_eq!(ab.found, ba.found);
            assert_eq!(
                ab.path.map(|p| p.length),
                ba.path.map(|p| p.length),
                "{} <-> {}",
                a,
                b
            );
        }
    }

    let of_customers: Vec<String> = svc
        .find_neighbor_nodes("customers", 1, None)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.label)
        .collect();
    assert_eq!(of_customers, vec!["orders".to_string()]);
    let of_orders: Vec<String> = svc
        .find_neighbor_nodes("orders", 1, None)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.label)
        .collect();
    assert!(of_orders.contains(&"customers".to_string()));
}

#[tokio::test]
async fn path_length_respects_hop_bound() {
    let ctx = shop_context().await;
    let svc = ctx.service();
    let res = svc
        .find_shortest_path("customers", "products", Some(2), None)
        .await
        .unwrap();
    assert!(!res.found);
    let res = svc
        .find_shortest_path("customers", "products", Some(3), None)
        .await
        .unwrap();
    assert!(res.found);
    assert!(res.path.unwrap().length <= 3);
}

#[tokio::test]
async fn path_exists_iff_reachable_as_neighbor() {
    let ctx = shop_context().await;
    let svc = ctx.service();
    let names = ["orders", "customers", "order_items", "products"];
    for hops in 1..=3 {
        for a in names {
            let reachable: HashSet<String> = svc
                .find_neighbor_nodes(a, hops, None)
                .await
                .unwrap()
                .into_iter()
                .map(|n| n.label)
                .collect();
            for b in names.iter().filter(|b| **b != a) {
                let res = svc.find_shortest_path(a, b, Some(hops), None).await.unwrap();
                assert_eq!(res.found, reachable.contains(*b), "{} -> {} in {}", a, b, hops);
            }
        }
    }
}

#[tokio::test]
async fn responses_serialize_without_empty_fields() {
    let ctx = shop_context().await;
    let svc = ctx.service();

    let missing = svc
        .find_shortest_path("orders", "nowhere", None, None)
        .await
        .unwrap();
    let v = serde_json::to_value(&missing).unwrap();
    assert_eq!(v["found"], false);
    assert_eq!(v["message"], "Table 'nowhere' not found");
    assert!(v.get("path").is_none());
    assert!(v.get("sql_hint").is_none());

    let found = svc
        .find_shortest_path("orders", "customers", None, None)
        .await
        .unwrap();
    let v = serde_json::to_value(&found).unwrap();
    assert_eq!(v["path"]["length"], 1);
    assert_eq!(v["path"]["edges"][0]["relation_type"], "foreign_key");
    assert_eq!(v["path"]["edges"][0]["properties"]["join_type"], "INNER");
    assert!(v.get("message").is_none());
}

#[tokio::test]
async fn relation_kind_filter_limits_traversal() {
    let ctx = memory_context();
    let tables = vec![table("orders", &[]), table("customers", &[])];
    let relations = vec![TableRelationModel::new(
        "orders",
        "buyer",
        "customers",
        "id",
        RelationKind::Join,
    )];
    ctx.rebuild(&tables, &relations, true).await;
    let svc = ctx.service();
    let only_fk = [RelationKind::ForeignKey];
    let res = svc
        .find_shortest_path("orders", "customers", None, Some(&only_fk))
        .await
        .unwrap();
    assert!(!res.found);
    let joins = [RelationKind::Join];
    let res = svc
        .find_shortest_path("orders", "customers", None, Some(&joins))
        .await
        .unwrap();
    assert!(res.found);
}

#[tokio::test]
async fn relations_for_table_from_both_sides() {
    let ctx = shop_context().await;
    let relations = ctx
        .service()
        .get_relations_for_table("orders", Direction::Both)
        .await
        .unwrap();
    assert_eq!(relations.len(), 2);
    assert!(relations
        .iter()
        .any(|r| r.related_table == "customers" && r.direction == Direction::Out));
    assert!(relations
        .iter()
        .any(|r| r.related_table == "order_items" && r.direction == Direction::In));
}

#[tokio::test]
async fn sqlite_store_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kg.db");
    {
        let store = Arc::new(SqliteGraphStore::new(&path).unwrap());
        let ctx = KgContext::new(store, &KgConfig::default());
        let result = ctx.rebuild(&shop_tables(), &shop_relations(), true).await;
        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.nodes_created, 4);
        assert_eq!(result.edges_created, 3);
    }

    let store: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::new(&path).unwrap());
    let ctx = KgContext::new(store, &KgConfig::default());
    let res = ctx
        .service()
        .find_shortest_path("orders", "products", None, None)
        .await
        .unwrap();
    assert!(res.found);
    assert_eq!(res.path.unwrap().length, 2);
    let stats = ctx.service().get_statistics().await.unwrap();
    assert_eq!(stats.table_count, 4);
    assert_eq!(stats.relation_kind_counts.get("foreign_key"), Some(&3));
    assert!(stats.is_connected);
}
