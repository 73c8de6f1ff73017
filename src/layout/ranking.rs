use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// Longest-path depth of every node along forward edges.
///
/// Kahn's walk, ordered by declaration. When no node has zero in-degree the
/// walk is seeded from every node; when it stalls mid-way on a cycle, the
/// earliest remaining node is released and its incoming edges act as back
/// edges. Depth never decreases along a forward edge and every node gets one.
pub(super) fn topological_depths(
    node_ids: &[String],
    edges: &[(&str, &str)],
) -> HashMap<String, usize> {
    let set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
    let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut indeg: HashMap<&str, usize> = node_ids.iter().map(|id| (id.as_str(), 0)).collect();

    for (from, to) in edges {
        if from == to || !set.contains(from) || !set.contains(to) {
            continue;
        }
        adj.entry(*from).or_default().push(*to);
        if let Some(deg) = indeg.get_mut(to) {
            *deg += 1;
        }
    }

    let order_key: HashMap<&str, usize> = node_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let key = |id: &str| order_key.get(id).copied().unwrap_or(usize::MAX);

    let mut ready: BinaryHeap<Reverse<(usize, &str)>> = BinaryHeap::new();
    for id in node_ids {
        if indeg.get(id.as_str()).copied().unwrap_or(0) == 0 {
            ready.push(Reverse((key(id.as_str()), id.as_str())));
        }
    }
    if ready.is_empty() {
        // Fully cyclic: every node is a candidate root.
        for id in node_ids {
            ready.push(Reverse((key(id.as_str()), id.as_str())));
        }
    }

    let mut order: Vec<&str> = Vec::with_capacity(set.len());
    let mut processed: HashSet<&str> = HashSet::new();
    loop {
        while let Some(Reverse((_key, id))) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id);
            if let Some(nexts) = adj.get(id) {
                for next in nexts {
                    if processed.contains(next) {
                        continue;
                    }
                    if let Some(deg) = indeg.get_mut(next) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.push(Reverse((key(*next), *next)));
                        }
                    }
                }
            }
        }

        if processed.len() >= set.len() {
            break;
        }

        // Cycle detected: release the remaining node earliest in
        // declaration order.
        let next = node_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !processed.contains(id))
            .min_by_key(|id| key(*id));
        match next {
            Some(id) => ready.push(Reverse((key(id), id))),
            None => break,
        }
    }

    let order_index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx))
        .collect();

    let mut depths: HashMap<String, usize> = HashMap::new();
    for node in &order {
        let depth = *depths.entry((*node).to_string()).or_insert(0);
        let Some(nexts) = adj.get(node) else {
            continue;
        };
        let from_idx = order_index.get(node).copied().unwrap_or(0);
        for next in nexts {
            let to_idx = order_index.get(next).copied().unwrap_or(from_idx);
            if to_idx <= from_idx {
                continue;
            }
            let entry = depths.entry((*next).to_string()).or_insert(0);
            *entry = (*entry).max(depth + 1);
        }
    }

    depths
}

/// Slot offset from the column's middle. Columns are drawn centered on one
/// midline, so this is proportional to the rendered y.
fn centered_slot(idx: usize, len: usize) -> f32 {
    idx as f32 - (len.saturating_sub(1)) as f32 / 2.0
}

/// Reorders each column by the barycenter of its neighbours in other columns.
///
/// Forward sweeps use incoming neighbours, backward sweeps outgoing ones.
/// Nodes without placed neighbours keep their slot; ties fall back to the
/// current slot and then to `node_order`.
pub(super) fn order_columns(
    columns: &mut [Vec<String>],
    edges: &[(&str, &str)],
    node_order: &HashMap<String, usize>,
    passes: usize,
) {
    if columns.len() <= 1 || passes == 0 {
        return;
    }
    let mut incoming: HashMap<String, Vec<String>> = HashMap::new();
    let mut outgoing: HashMap<String, Vec<String>> = HashMap::new();
    for (from, to) in edges {
        outgoing
            .entry((*from).to_string())
            .or_default()
            .push((*to).to_string());
        incoming
            .entry((*to).to_string())
            .or_default()
            .push((*from).to_string());
    }

    let mut column_of: HashMap<String, usize> = HashMap::new();
    for (col, bucket) in columns.iter().enumerate() {
        for id in bucket {
            column_of.insert(id.clone(), col);
        }
    }

    let mut positions: HashMap<String, f32> = HashMap::new();
    let update_positions = |columns: &[Vec<String>], positions: &mut HashMap<String, f32>| {
        positions.clear();
        for bucket in columns {
            for (idx, id) in bucket.iter().enumerate() {
                positions.insert(id.clone(), centered_slot(idx, bucket.len()));
            }
        }
    };
    update_positions(columns, &mut positions);

    let sort_bucket = |bucket: &mut Vec<String>,
                       col: usize,
                       neighbors: &HashMap<String, Vec<String>>,
                       positions: &HashMap<String, f32>| {
        let current: HashMap<String, usize> = bucket
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();
        let scores: HashMap<String, f32> = bucket
            .iter()
            .map(|id| {
                let score = barycenter(id, col, neighbors, positions, &column_of)
                    .unwrap_or_else(|| {
                        centered_slot(current.get(id).copied().unwrap_or(0), current.len())
                    });
                (id.clone(), score)
            })
            .collect();
        bucket.sort_by(|a, b| {
            let a_score = scores.get(a).copied().unwrap_or(0.0);
            let b_score = scores.get(b).copied().unwrap_or(0.0);
            a_score
                .total_cmp(&b_score)
                .then_with(|| current.get(a).cmp(&current.get(b)))
                .then_with(|| {
                    node_order
                        .get(a)
                        .copied()
                        .unwrap_or(usize::MAX)
                        .cmp(&node_order.get(b).copied().unwrap_or(usize::MAX))
                })
        });
    };

    for _ in 0..passes {
        for col in 1..columns.len() {
            if columns[col].len() <= 1 {
                continue;
            }
            sort_bucket(&mut columns[col], col, &incoming, &positions);
            update_positions(columns, &mut positions);
        }
        for col in (0..columns.len().saturating_sub(1)).rev() {
            if columns[col].len() <= 1 {
                continue;
            }
            sort_bucket(&mut columns[col], col, &outgoing, &positions);
            update_positions(columns, &mut positions);
        }
    }
}

/// Mean centered slot of the neighbours that live in other columns.
pub(super) fn barycenter(
    node_id: &str,
    col: usize,
    neighbors: &HashMap<String, Vec<String>>,
    positions: &HashMap<String, f32>,
    column_of: &HashMap<String, usize>,
) -> Option<f32> {
    let list = neighbors.get(node_id)?;
    let mut total = 0.0f32;
    let mut count = 0usize;
    for neighbor in list {
        if column_of.get(neighbor) == Some(&col) {
            continue;
        }
        if let Some(pos) = positions.get(neighbor) {
            total += *pos;
            count += 1;
        }
    }
    (count > 0).then(|| total / count as f32)
}
