use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pipeline_diagram_layout::config::{LayoutConfig, LayoutStrategy};
use pipeline_diagram_layout::ir::Graph;
use pipeline_diagram_layout::layout::{compute_layout, normalize};
use pipeline_diagram_layout::layout_dump::LayoutDump;
use pipeline_diagram_layout::theme::Theme;
use std::hint::black_box;

const STAGE_TYPES: &[(&str, &str)] = &[
    ("external-kafka", "Kafka Topic"),
    ("sf_snowpipe", "Snowpipe"),
    ("pipeline-bronze-layer", "Bronze"),
    ("sf_cdc_stream", "CDC Stream"),
    ("sf_task", "Transform Task"),
    ("pipeline-silver-layer", "Silver"),
    ("pipeline-gold-layer", "Gold"),
    ("sf_view", "Analytics View"),
    ("bi-tool", "Dashboard"),
];

/// `lanes` parallel pipelines, each running through every stage, with a
/// cross-feed between neighbouring lanes every few stages.
fn pipeline_graph(lanes: usize) -> Graph {
    let mut graph = Graph::new();
    for lane in 0..lanes {
        for (stage, (kind, label)) in STAGE_TYPES.iter().enumerate() {
            let id = format!("n{lane}_{stage}");
            graph.ensure_node(&id, Some(&format!("{label} {lane}")), Some(kind));
            if stage > 0 {
                graph.add_edge(&format!("n{lane}_{}", stage - 1), &id);
            }
            if lane > 0 && stage % 3 == 2 {
                graph.add_edge(&format!("n{}_{}", lane - 1, stage - 1), &id);
            }
        }
    }
    graph
}

fn fixture(name: &str) -> &'static str {
    match name {
        "kafka_medallion" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/kafka_medallion.json"
        )),
        "noisy_generator" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/noisy_generator.json"
        )),
        _ => panic!("unknown fixture"),
    }
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for lanes in [1usize, 8, 32] {
        let graph = pipeline_graph(lanes);
        group.bench_with_input(BenchmarkId::from_parameter(lanes), &graph, |b, graph| {
            b.iter(|| {
                let normalized = normalize(black_box(graph));
                black_box(normalized.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let theme = Theme::default();
    let config = LayoutConfig::default();
    for lanes in [1usize, 8, 32] {
        let graph = pipeline_graph(lanes);
        group.bench_with_input(BenchmarkId::from_parameter(lanes), &graph, |b, graph| {
            b.iter(|| {
                let layout = compute_layout(black_box(graph), &theme, &config);
                black_box(layout.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_solver(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver");
    let theme = Theme::default();
    let config = LayoutConfig {
        strategy: LayoutStrategy::Solver,
        ..LayoutConfig::default()
    };
    for lanes in [1usize, 8] {
        let graph = pipeline_graph(lanes);
        group.bench_with_input(BenchmarkId::from_parameter(lanes), &graph, |b, graph| {
            b.iter(|| {
                let layout = compute_layout(black_box(graph), &theme, &config);
                black_box(layout.placement);
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let theme = Theme::default();
    let config = LayoutConfig::default();
    for name in ["kafka_medallion", "noisy_generator"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| {
                let graph = Graph::from_json_str(black_box(data)).expect("parse failed");
                let layout = compute_layout(&graph, &theme, &config);
                let json = LayoutDump::from_layout(&layout).to_json().expect("serialize failed");
                black_box(json.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_normalize, bench_layout, bench_solver, bench_end_to_end
);
criterion_main!(benches);
