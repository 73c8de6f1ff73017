use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::ir::Position;

use super::normalize::NormalizedGraph;
use super::ranking::{order_columns, topological_depths};

/// Stage values are compared at a 1/1000 resolution so 2.5 and 2.5000001
/// share a column.
fn stage_key(stage: f32) -> i64 {
    (stage * 1000.0).round() as i64
}

/// Groups node ids into columns by stage, leftmost stage first. Within a
/// column nodes start in topological-depth order, then input order.
pub(super) fn bucket_columns(
    graph: &NormalizedGraph,
    stages: &HashMap<String, f32>,
    depths: &HashMap<String, usize>,
    default_stage: f32,
) -> Vec<Vec<String>> {
    let mut buckets: BTreeMap<i64, Vec<(usize, usize, &str)>> = BTreeMap::new();
    for node in &graph.nodes {
        let stage = stages.get(&node.id).copied().unwrap_or(default_stage);
        let depth = depths.get(&node.id).copied().unwrap_or(0);
        buckets
            .entry(stage_key(stage))
            .or_default()
            .push((depth, node.input_index, node.id.as_str()));
    }
    buckets
        .into_values()
        .map(|mut bucket| {
            bucket.sort();
            bucket.into_iter().map(|(_, _, id)| id.to_string()).collect()
        })
        .collect()
}

/// Fixed-pitch grid: x by column, y by row. Every column is centered on the
/// midline of the tallest one so short columns never hang off the top.
pub(super) fn assign_column_positions(
    columns: &[Vec<String>],
    config: &LayoutConfig,
) -> HashMap<String, Position> {
    let column_pitch = config.column_spacing.max(config.node_width);
    let row_pitch = config.row_spacing.max(config.node_height);
    let tallest = columns.iter().map(Vec::len).max().unwrap_or(0);

    let mut positions = HashMap::new();
    for (col, bucket) in columns.iter().enumerate() {
        let x = config.margin + col as f32 * column_pitch;
        let offset = (tallest - bucket.len()) as f32 * row_pitch / 2.0;
        for (row, id) in bucket.iter().enumerate() {
            let y = config.margin + offset + row as f32 * row_pitch;
            positions.insert(id.clone(), Position::new(x, y));
        }
    }
    positions
}

/// Threads every edge spanning more than one column through a placeholder
/// slot in each column it crosses. Placeholders take part in ordering and
/// row assignment so a straight edge never runs through an unrelated node in
/// between. Returns the edge chain to order by.
fn reserve_span_slots(columns: &mut [Vec<String>], edges: &[(&str, &str)]) -> Vec<(String, String)> {
    let spans: Vec<(String, String, usize, usize)> = {
        let column_of: HashMap<&str, usize> = columns
            .iter()
            .enumerate()
            .flat_map(|(col, bucket)| bucket.iter().map(move |id| (id.as_str(), col)))
            .collect();
        edges
            .iter()
            .filter_map(|(from, to)| {
                let from_col = *column_of.get(from)?;
                let to_col = *column_of.get(to)?;
                Some((from.to_string(), to.to_string(), from_col, to_col))
            })
            .collect()
    };

    let mut chained = Vec::with_capacity(spans.len());
    let mut counter = 0usize;
    for (from, to, from_col, to_col) in spans {
        if to_col <= from_col + 1 {
            chained.push((from, to));
            continue;
        }
        let mut prev = from;
        for col in from_col + 1..to_col {
            let slot = format!("{SPAN_SLOT_PREFIX}{counter}__");
            counter += 1;
            columns[col].push(slot.clone());
            chained.push((prev, slot.clone()));
            prev = slot;
        }
        chained.push((prev, to));
    }
    chained
}

const SPAN_SLOT_PREFIX: &str = "__span_";

fn is_span_slot(id: &str) -> bool {
    id.starts_with(SPAN_SLOT_PREFIX)
}

/// Deterministic stage-column placement. Also the fallback when the external
/// solver fails.
pub(super) fn place_columns(
    graph: &NormalizedGraph,
    stages: &HashMap<String, f32>,
    config: &LayoutConfig,
) -> HashMap<String, Position> {
    let ids: Vec<String> = graph.nodes.iter().map(|node| node.id.clone()).collect();
    let edges = graph.edge_pairs();
    let depths = topological_depths(&ids, &edges);
    let mut columns = bucket_columns(graph, stages, &depths, config.default_stage);
    let chained = reserve_span_slots(&mut columns, &edges);
    let chained_refs: Vec<(&str, &str)> = chained
        .iter()
        .map(|(from, to)| (from.as_str(), to.as_str()))
        .collect();
    let node_order: HashMap<String, usize> = graph
        .nodes
        .iter()
        .map(|node| (node.id.clone(), node.input_index))
        .collect();
    order_columns(&mut columns, &chained_refs, &node_order, config.order_passes);

    tracing::debug!(
        columns = columns.len(),
        tallest = columns.iter().map(Vec::len).max().unwrap_or(0),
        span_slots = chained.len().saturating_sub(edges.len()),
        "placed stage columns"
    );

    let mut positions = assign_column_positions(&columns, config);
    positions.retain(|id, _| !is_span_slot(id));
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Graph;
    use crate::layout::normalize::normalize;

    fn setup(
        nodes: &[(&str, f32)],
        edges: &[(&str, &str)],
    ) -> (NormalizedGraph, HashMap<String, f32>) {
        let mut graph = Graph::new();
        for (id, _) in nodes {
            graph.ensure_node(id, None, Some("widget"));
        }
        for (source, target) in edges {
            graph.add_edge(source, target);
        }
        let stages = nodes
            .iter()
            .map(|(id, stage)| (id.to_string(), *stage))
            .collect();
        (normalize(&graph), stages)
    }

    #[test]
    fn chain_moves_left_to_right() {
        let (graph, stages) = setup(
            &[("a", 3.0), ("b", 3.5), ("c", 4.0)],
            &[("a", "b"), ("b", "c")],
        );
        let positions = place_columns(&graph, &stages, &LayoutConfig::default());
        assert!(positions["a"].x < positions["b"].x);
        assert!(positions["b"].x < positions["c"].x);
    }

    #[test]
    fn equal_stage_shares_x_and_splits_y() {
        let (graph, stages) = setup(
            &[("a", 0.0), ("b", 1.0), ("c", 1.0)],
            &[("a", "b"), ("a", "c")],
        );
        let positions = place_columns(&graph, &stages, &LayoutConfig::default());
        assert_eq!(positions["b"].x, positions["c"].x);
        assert_ne!(positions["b"].y, positions["c"].y);
    }

    #[test]
    fn single_node_column_is_centered_on_pair() {
        let config = LayoutConfig::default();
        let (graph, stages) = setup(
            &[("a", 0.0), ("b", 1.0), ("c", 1.0)],
            &[("a", "b"), ("a", "c")],
        );
        let positions = place_columns(&graph, &stages, &config);
        let pair_mid = (positions["b"].y + positions["c"].y) / 2.0;
        assert!((positions["a"].y - pair_mid).abs() <= config.node_height / 2.0);
    }

    #[test]
    fn fractional_stages_sit_between_layers() {
        let (graph, stages) = setup(&[("raw", 2.0), ("cdc", 2.5), ("task", 3.0)], &[]);
        let positions = place_columns(&graph, &stages, &LayoutConfig::default());
        assert!(positions["raw"].x < positions["cdc"].x);
        assert!(positions["cdc"].x < positions["task"].x);
    }

    #[test]
    fn long_edge_keeps_a_lane_clear() {
        let config = LayoutConfig::default();
        let (graph, stages) = setup(
            &[("gold", 5.0), ("warehouse", 5.5), ("bi", 6.0)],
            &[("gold", "bi"), ("gold", "warehouse"), ("warehouse", "bi")],
        );
        let positions = place_columns(&graph, &stages, &config);
        assert_eq!(positions.len(), 3);
        assert_eq!(positions["gold"].y, positions["bi"].y);
        // The gold -> bi segment runs at gold's center height; the warehouse
        // box must sit clear of it.
        let line_y = positions["gold"].y + config.node_height / 2.0;
        let top = positions["warehouse"].y;
        assert!(line_y < top || line_y > top + config.node_height);
    }

    #[test]
    fn adjacent_edges_reserve_nothing() {
        let (graph, stages) = setup(&[("a", 0.0), ("b", 1.0)], &[("a", "b")]);
        let positions = place_columns(&graph, &stages, &LayoutConfig::default());
        assert_eq!(positions["a"].y, positions["b"].y);
    }

    #[test]
    fn rows_never_overlap() {
        let config = LayoutConfig::default();
        let (graph, stages) = setup(&[("a", 1.0), ("b", 1.0), ("c", 1.0)], &[]);
        let positions = place_columns(&graph, &stages, &config);
        let mut ys: Vec<f32> = positions.values().map(|p| p.y).collect();
        ys.sort_by(f32::total_cmp);
        for pair in ys.windows(2) {
            assert!(pair[1] - pair[0] >= config.node_height);
        }
    }
}
