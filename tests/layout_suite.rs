use std::collections::HashSet;
use std::path::Path;

use pipeline_diagram_layout::layout::{
    ContainmentMode, EdgeDropReason, NodeDropReason, PlacementSource, Port, select_ports,
};
use pipeline_diagram_layout::{
    Graph, Layout, LayoutConfig, LayoutOptions, LayoutStrategy, Position, Theme, UserEdits,
    compute_layout, compute_layout_with_edits, layout_json, parse_config,
};

fn load_fixture(name: &str) -> Graph {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    Graph::from_path(&path).expect("fixture should parse")
}

fn layout_fixture(name: &str) -> Layout {
    compute_layout(&load_fixture(name), &Theme::default(), &LayoutConfig::default())
}

fn assert_boundaries_contain_members(layout: &Layout) {
    for boundary in &layout.boundaries {
        for id in &boundary.nodes {
            let node = layout.node(id).expect("member exists");
            assert!(
                boundary.contains_rect(node.x, node.y, node.width, node.height),
                "{} escapes boundary {}",
                id,
                boundary.id
            );
        }
    }
}

fn assert_ports_match_positions(layout: &Layout) {
    for edge in &layout.edges {
        let source = layout.node(&edge.source).unwrap();
        let target = layout.node(&edge.target).unwrap();
        assert_eq!(edge.ports, select_ports(source, target), "edge {}", edge.id);
        assert_eq!(edge.points.len(), 2);
    }
}

fn assert_boundaries_stay_apart(layout: &Layout, primary: &str) {
    for (i, a) in layout.boundaries.iter().enumerate() {
        for b in &layout.boundaries[i + 1..] {
            assert!(!a.intersects(b), "{} overlaps {}", a.id, b.id);
        }
    }
    for external in layout.boundaries.iter().filter(|b| b.provider != primary) {
        for node in layout.nodes.values() {
            if external.nodes.contains(&node.id) {
                continue;
            }
            let overlaps = node.x < external.x + external.width
                && external.x < node.x + node.width
                && node.y < external.y + external.height
                && external.y < node.y + node.height;
            assert!(!overlaps, "{} sits inside {}", node.id, external.id);
        }
    }
}

#[test]
fn kafka_medallion_end_to_end() {
    let layout = layout_fixture("kafka_medallion.json");

    assert_eq!(layout.nodes.len(), 10);
    assert_eq!(layout.edges.len(), 10);
    assert!(layout.report.is_clean());
    assert_eq!(layout.placement, PlacementSource::Columns);

    for node in layout.nodes.values() {
        assert!(node.x.is_finite() && node.y.is_finite(), "{} unplaced", node.id);
        assert_eq!((node.width, node.height), (180.0, 72.0));
    }
    let bands: HashSet<i64> = layout.nodes.values().map(|n| n.y.round() as i64).collect();
    assert!(bands.len() >= 2, "expected more than one row, got {bands:?}");

    let snowflake = layout.boundary_for("snowflake").expect("primary boundary");
    assert_eq!(snowflake.id, "account_boundary_snowflake");
    assert_eq!(snowflake.mode, ContainmentMode::MeasureOnly);
    let kafka = layout.boundary_for("kafka").expect("kafka boundary");
    assert!(kafka.synthesized);
    assert_eq!(kafka.mode, ContainmentMode::Reposition);
    assert!(kafka.nodes.contains(&"sf_kafka_connector".to_string()));
    assert!(!snowflake.nodes.contains(&"sf_kafka_connector".to_string()));
    assert!(!snowflake.intersects(kafka));

    assert_boundaries_contain_members(&layout);
    assert_boundaries_stay_apart(&layout, "snowflake");
    assert_ports_match_positions(&layout);
}

#[test]
fn two_stream_medallion_is_not_flat() {
    let layout = layout_fixture("two_stream_medallion.json");

    assert_eq!(layout.nodes.len(), 10);
    assert_eq!(layout.edges.len(), 10);
    assert!(layout.report.is_clean());

    // The second stream is fed by silver, so it lands right of it.
    let x = |id: &str| layout.node(id).unwrap().x;
    assert!(x("sf_silver") < x("sf_silver_stream"));
    assert!(x("sf_silver_stream") < x("sf_gold_task"));
    assert!(x("sf_gold_task") < x("sf_gold"));
    assert!(x("sf_gold") < x("sf_warehouse"));
    assert!(x("sf_warehouse") < x("bi_tableau"));

    let bands: HashSet<i64> = layout.nodes.values().map(|n| n.y.round() as i64).collect();
    assert!(bands.len() >= 2, "expected more than one row, got {bands:?}");

    // The gold -> BI edge passes the warehouse column without touching it.
    let gold = layout.node("sf_gold").unwrap();
    let warehouse = layout.node("sf_warehouse").unwrap();
    let line_y = gold.y + gold.height / 2.0;
    assert!(line_y < warehouse.y || line_y > warehouse.y + warehouse.height);

    assert_boundaries_contain_members(&layout);
    assert_boundaries_stay_apart(&layout, "snowflake");
    assert_ports_match_positions(&layout);
}

#[test]
fn mid_flow_external_never_lands_on_other_nodes() {
    let mut graph = Graph::new();
    graph.ensure_node("kafka", Some("Kafka Orders"), Some("external-kafka"));
    graph.ensure_node("snowpipe", Some("Snowpipe"), Some("pipe"));
    graph.ensure_node("sf_bronze", Some("Bronze Layer"), Some("sf_bronze_layer"));
    graph.ensure_node("aws_lambda", Some("AWS Lambda Enricher"), Some("lambda"));
    graph.ensure_node("sf_silver", Some("Silver Layer"), Some("sf_silver_layer"));
    graph.ensure_node("sf_gold", Some("Gold Layer"), Some("sf_gold_layer"));
    graph.add_edge("kafka", "snowpipe");
    graph.add_edge("snowpipe", "sf_bronze");
    graph.add_edge("sf_bronze", "aws_lambda");
    graph.add_edge("aws_lambda", "sf_silver");
    graph.add_edge("sf_silver", "sf_gold");

    let layout = compute_layout(&graph, &Theme::default(), &LayoutConfig::default());
    assert!(layout.boundary_for("aws").is_some());
    assert!(layout.boundary_for("kafka").is_some());
    assert_boundaries_contain_members(&layout);
    assert_boundaries_stay_apart(&layout, "snowflake");
    assert_ports_match_positions(&layout);
}

#[test]
fn stages_increase_along_every_edge() {
    let layout = layout_fixture("kafka_medallion.json");
    for edge in &layout.edges {
        let source = layout.node(&edge.source).unwrap();
        let target = layout.node(&edge.target).unwrap();
        assert!(
            target.stage > source.stage,
            "{} ({}) -> {} ({})",
            source.id,
            source.stage,
            target.id,
            target.stage
        );
    }
    assert_eq!(layout.node("sf_bronze").unwrap().stage, 2.0);
    assert_eq!(layout.node("sf_cdc_stream").unwrap().stage, 2.5);
    assert_eq!(layout.node("streamlit_app").unwrap().stage, 6.0);
}

#[test]
fn primary_nodes_read_left_to_right() {
    let layout = layout_fixture("kafka_medallion.json");
    let x = |id: &str| layout.node(id).unwrap().x;
    assert!(x("sf_bronze") < x("sf_cdc_stream"));
    assert!(x("sf_cdc_stream") < x("sf_transform_task"));
    assert!(x("sf_silver") < x("sf_gold"));
    assert!(x("sf_analytics_view") < x("streamlit_app"));
}

#[test]
fn noisy_generator_output_is_cleaned() {
    let layout = layout_fixture("noisy_generator.json");

    // Two CDC streams share a type but are distinct components.
    let a = layout.node("sf_orders_stream").expect("orders stream");
    let b = layout.node("sf_customers_stream").expect("customers stream");
    assert_eq!(a.component_type, "stream");
    assert_eq!(a.x, b.x);
    assert_ne!(a.y, b.y);
    assert_eq!(layout.nodes.len(), 6);
    assert_eq!(layout.edges.len(), 6);

    let snowflake: Vec<_> = layout
        .boundaries
        .iter()
        .filter(|b| b.provider == "snowflake")
        .collect();
    assert_eq!(snowflake.len(), 1);
    assert_eq!(snowflake[0].id, "account_boundary_snowflake");
    assert_eq!(snowflake[0].label, "Snowflake Account");
    assert!(layout.boundary_for("aws").is_some());

    let node_reasons: Vec<_> = layout.report.dropped_nodes.iter().map(|d| d.reason).collect();
    assert!(node_reasons.contains(&NodeDropReason::DuplicateBoundary));
    assert!(node_reasons.contains(&NodeDropReason::DuplicateId));

    let edge_reasons: Vec<_> = layout.report.dropped_edges.iter().map(|d| d.reason).collect();
    for reason in [
        EdgeDropReason::SelfLoop,
        EdgeDropReason::DanglingTarget,
        EdgeDropReason::BoundaryEndpoint,
        EdgeDropReason::Duplicate,
    ] {
        assert!(edge_reasons.contains(&reason), "missing {reason:?}");
    }

    let ids: HashSet<&str> = layout.edges.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids.len(), layout.edges.len());
    assert_boundaries_contain_members(&layout);
}

#[test]
fn explicit_positions_bypass_placement() {
    let graph = load_fixture("explicit_positions.json");
    let layout = compute_layout(&graph, &Theme::default(), &LayoutConfig::default());

    assert_eq!(layout.placement, PlacementSource::Explicit);
    for input in graph.nodes.iter().filter(|n| !n.is_boundary) {
        let node = layout.node(&input.id).unwrap();
        let expected = input.position.unwrap();
        assert_eq!((node.x, node.y), (expected.x, expected.y), "{} moved", input.id);
    }
    assert!(layout
        .boundaries
        .iter()
        .all(|b| b.mode == ContainmentMode::MeasureOnly));
    assert_boundaries_contain_members(&layout);

    let down = layout
        .edges
        .iter()
        .find(|e| e.source == "sf_bronze" && e.target == "sf_gold")
        .unwrap();
    assert_eq!((down.ports.source, down.ports.target), (Port::Bottom, Port::Top));
    assert_ports_match_positions(&layout);
}

#[test]
fn user_edits_survive_regeneration() {
    let graph = load_fixture("kafka_medallion.json");
    let theme = Theme::default();
    let config = LayoutConfig::default();
    let first = compute_layout(&graph, &theme, &config);

    let mut edits = UserEdits::default();
    edits.pin("sf_gold", Position::new(2400.0, 900.0));
    edits.pin("ext_kafka", Position::new(15.0, 700.0));
    let second = compute_layout_with_edits(&graph, &edits, &theme, &config);

    let gold = second.node("sf_gold").unwrap();
    assert_eq!((gold.x, gold.y), (2400.0, 900.0));
    let kafka = second.node("ext_kafka").unwrap();
    assert_eq!((kafka.x, kafka.y), (15.0, 700.0));

    // Unpinned primary nodes keep their computed slots.
    let bronze_before = first.node("sf_bronze").unwrap();
    let bronze_after = second.node("sf_bronze").unwrap();
    assert!(bronze_after.x.is_finite() && bronze_after.y.is_finite());
    assert!(!bronze_after.pinned && !bronze_before.pinned);

    assert_boundaries_contain_members(&second);
    assert_ports_match_positions(&second);
}

#[test]
fn layout_is_deterministic() {
    let a = layout_fixture("kafka_medallion.json");
    let b = layout_fixture("kafka_medallion.json");
    for (id, node) in &a.nodes {
        let other = b.node(id).unwrap();
        assert_eq!((node.x, node.y), (other.x, other.y), "{id} differs");
    }
    let ports_a: Vec<_> = a.edges.iter().map(|e| (e.id.clone(), e.ports)).collect();
    let ports_b: Vec<_> = b.edges.iter().map(|e| (e.id.clone(), e.ports)).collect();
    assert_eq!(ports_a, ports_b);
}

#[test]
fn cyclic_graph_still_lays_out() {
    let mut graph = Graph::new();
    graph.ensure_node("a", Some("Orders Task"), Some("sf_task"));
    graph.ensure_node("b", Some("Orders Table"), Some("sf_table"));
    graph.ensure_node("c", Some("Orders Stream"), Some("sf_stream"));
    graph.add_edge("a", "b");
    graph.add_edge("b", "c");
    graph.add_edge("c", "a");

    let layout = compute_layout(&graph, &Theme::default(), &LayoutConfig::default());
    assert_eq!(layout.nodes.len(), 3);
    assert_eq!(layout.edges.len(), 3);
    for node in layout.nodes.values() {
        assert!(node.x.is_finite() && node.y.is_finite());
        assert!(node.stage.is_finite());
    }
}

#[test]
fn solver_strategy_places_every_node() {
    let graph = load_fixture("kafka_medallion.json");
    let config = LayoutConfig {
        strategy: LayoutStrategy::Solver,
        ..LayoutConfig::default()
    };
    let layout = compute_layout(&graph, &Theme::default(), &config);
    assert!(matches!(
        layout.placement,
        PlacementSource::Solver | PlacementSource::SolverFallback
    ));
    assert_eq!(layout.nodes.len(), 10);
    for node in layout.nodes.values() {
        assert!(node.x.is_finite() && node.y.is_finite(), "{} unplaced", node.id);
    }
    assert_boundaries_contain_members(&layout);
    assert_ports_match_positions(&layout);
}

#[test]
fn json_api_round_trip() {
    let input = std::fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/kafka_medallion.json"),
    )
    .unwrap();
    let output = layout_json(&input, &LayoutOptions::default()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();

    let nodes = value["nodes"].as_array().unwrap();
    let boundaries = nodes.iter().filter(|n| n["isBoundary"] == true).count();
    assert_eq!(nodes.len() - boundaries, 10);
    assert_eq!(nodes[0]["isBoundary"], true);
    assert_eq!(nodes[0]["zIndex"], -1);
    assert_eq!(value["edges"].as_array().unwrap().len(), 10);
    assert_eq!(value["placement"], "columns");

    assert!(layout_json("{not json", &LayoutOptions::default()).is_err());

    let sloppy = r#"{
        "nodes": [
            {"id": "a", "label": null, "flowStage": 3},
            {"id": "b", "label": "Gold Layer", "componentType": null}
        ],
        "edges": [{"source": "a", "target": "b"}]
    }"#;
    let output = layout_json(sloppy, &LayoutOptions::default()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["edges"].as_array().unwrap().len(), 1);
}

#[test]
fn dark_config_tints_boundaries() {
    let config = parse_config(r#"{ mode: "dark", boundary: { strokeDasharray: "4 2" } }"#).unwrap();
    let options = LayoutOptions::from_config(config);
    let graph = load_fixture("kafka_medallion.json");
    let layout = pipeline_diagram_layout::layout_graph(&graph, &options);
    let kafka = layout.boundary_for("kafka").unwrap();
    assert_eq!(kafka.style.stroke, options.theme.provider_color("kafka"));
    assert_eq!(kafka.style.stroke_dasharray, "4 2");
}
