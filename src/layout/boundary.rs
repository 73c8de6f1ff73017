//! Provider boundaries: grouping, containment and separation.
//!
//! External providers are processed before the primary one. Each external
//! group claims its members and restacks them in a single column; the
//! primary box is then measured around whatever nodes are left, so it never
//! stretches to cover an external node.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::config::{BoundaryConfig, LayoutConfig};
use crate::ir::FlowStage;
use crate::theme::Theme;

use super::normalize::{NormalBoundary, NormalizedGraph};
use super::provider::{match_provider, title_for};
use super::types::{BoundaryLayout, BoundaryStyle, ContainmentMode, NodeLayout};

/// Provider owning a node, if any. Source-stage nodes nobody claims belong to
/// the generic external group.
pub(super) fn provider_for_node(
    id: &str,
    label: &str,
    raw_type: &str,
    stage: f32,
    primary: &str,
) -> Option<String> {
    match_provider([label, raw_type, id], primary).or_else(|| {
        (stage <= FlowStage::Source.order() && primary != "external")
            .then(|| "external".to_string())
    })
}

struct Group<'a> {
    provider: String,
    explicit: Option<&'a NormalBoundary>,
    members: Vec<String>,
}

fn collect_groups<'a>(
    graph: &'a NormalizedGraph,
    nodes: &mut BTreeMap<String, NodeLayout>,
    boundary: &BoundaryConfig,
) -> Vec<Group<'a>> {
    let mut groups: Vec<Group<'a>> = graph
        .boundaries
        .iter()
        .map(|explicit| Group {
            provider: explicit.provider.clone(),
            explicit: Some(explicit),
            members: Vec::new(),
        })
        .collect();

    for node in &graph.nodes {
        let Some(layout) = nodes.get_mut(&node.id) else {
            continue;
        };
        let Some(provider) = provider_for_node(
            &node.id,
            &node.label,
            &node.raw_type,
            layout.stage,
            &boundary.primary_provider,
        ) else {
            continue;
        };
        let idx = match groups.iter().position(|group| group.provider == provider) {
            Some(idx) => idx,
            None if boundary.auto_create => {
                groups.push(Group {
                    provider: provider.clone(),
                    explicit: None,
                    members: Vec::new(),
                });
                groups.len() - 1
            }
            None => continue,
        };
        layout.provider = Some(provider);
        groups[idx].members.push(node.id.clone());
    }

    // Externals first, primary last; otherwise first-seen order.
    groups.sort_by_key(|group| group.provider == boundary.primary_provider);
    groups
}

/// Restacks unpinned members in one column at the group's top-left member
/// slot. Pinned members keep their coordinates.
fn stack_members(
    members: &[String],
    nodes: &mut BTreeMap<String, NodeLayout>,
    spacing: f32,
) {
    let mut movable: Vec<(f32, f32, String)> = members
        .iter()
        .filter_map(|id| nodes.get(id))
        .filter(|node| !node.pinned)
        .map(|node| (node.y, node.x, node.id.clone()))
        .collect();
    if movable.is_empty() {
        return;
    }
    movable.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.total_cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });
    let anchor_x = movable
        .iter()
        .map(|(_, x, _)| *x)
        .fold(f32::MAX, f32::min);
    let anchor_y = movable[0].0;
    for (idx, (_, _, id)) in movable.iter().enumerate() {
        if let Some(node) = nodes.get_mut(id) {
            node.x = anchor_x;
            node.y = anchor_y + idx as f32 * spacing;
        }
    }
}

fn member_bounds(
    members: &[String],
    nodes: &BTreeMap<String, NodeLayout>,
) -> Option<(f32, f32, f32, f32)> {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for id in members {
        if let Some(node) = nodes.get(id) {
            min_x = min_x.min(node.x);
            min_y = min_y.min(node.y);
            max_x = max_x.max(node.right());
            max_y = max_y.max(node.bottom());
        }
    }
    (min_x != f32::MAX).then_some((min_x, min_y, max_x, max_y))
}

fn boundary_style(provider: &str, theme: &Theme, boundary: &BoundaryConfig) -> BoundaryStyle {
    let color = theme.provider_color(provider).to_string();
    BoundaryStyle {
        fill: color.clone(),
        fill_opacity: boundary.fill_opacity,
        stroke: color,
        stroke_width: boundary.stroke_width,
        stroke_dasharray: boundary.stroke_dasharray.clone(),
        text_color: theme.boundary_label_color.clone(),
        z_index: -1,
    }
}

fn measure(
    group: &Group<'_>,
    mode: ContainmentMode,
    nodes: &BTreeMap<String, NodeLayout>,
    theme: &Theme,
    config: &LayoutConfig,
) -> BoundaryLayout {
    let boundary = &config.boundary;
    let top = boundary.pad_top + boundary.title_height;
    let (x, y, width, height) = match member_bounds(&group.members, nodes) {
        Some((min_x, min_y, max_x, max_y)) => (
            min_x - boundary.pad_x,
            min_y - top,
            (max_x - min_x) + boundary.pad_x * 2.0,
            (max_y - min_y) + top + boundary.pad_bottom,
        ),
        None => {
            // Empty explicit boundary: keep its slot, one node wide.
            let origin = group
                .explicit
                .and_then(|explicit| explicit.position)
                .filter(|position| position.is_finite());
            let (x, y) = origin.map_or((config.margin, config.margin), |p| (p.x, p.y));
            (
                x,
                y,
                config.node_width + boundary.pad_x * 2.0,
                config.node_height + top + boundary.pad_bottom,
            )
        }
    };

    let label = group
        .explicit
        .map(|explicit| explicit.label.trim())
        .filter(|label| !label.is_empty())
        .map_or_else(|| title_for(&group.provider), str::to_string);
    let id = group
        .explicit
        .map_or_else(|| format!("boundary_{}", group.provider), |explicit| explicit.id.clone());
    let component_type = group
        .explicit
        .map(|explicit| explicit.component_type.trim())
        .filter(|kind| !kind.is_empty())
        .map_or_else(
            || format!("account_boundary_{}", group.provider),
            str::to_string,
        );

    BoundaryLayout {
        id,
        provider: group.provider.clone(),
        component_type,
        label,
        mode,
        nodes: group.members.clone(),
        x,
        y,
        width,
        height,
        style: boundary_style(&group.provider, theme, boundary),
        synthesized: group.explicit.is_none(),
    }
}

fn shift_group(
    boundary: &mut BoundaryLayout,
    nodes: &mut BTreeMap<String, NodeLayout>,
    dx: f32,
    dy: f32,
) -> bool {
    let pinned = boundary
        .nodes
        .iter()
        .any(|id| nodes.get(id).is_some_and(|node| node.pinned));
    if pinned {
        return false;
    }
    for id in &boundary.nodes {
        if let Some(node) = nodes.get_mut(id) {
            node.x += dx;
            node.y += dy;
        }
    }
    boundary.x += dx;
    boundary.y += dy;
    true
}

fn overlaps_node(boundary: &BoundaryLayout, node: &NodeLayout) -> bool {
    node.x < boundary.x + boundary.width
        && boundary.x < node.right()
        && node.y < boundary.y + boundary.height
        && boundary.y < node.bottom()
}

enum Obstacle {
    Primary,
    /// Bottom edge of an already placed box or a loose node.
    Above(f32),
}

fn first_obstacle(
    boundaries: &[BoundaryLayout],
    idx: usize,
    primary_idx: Option<usize>,
    settled: &[usize],
    loose: &[&NodeLayout],
) -> Option<Obstacle> {
    let current = &boundaries[idx];
    if primary_idx.is_some_and(|primary| current.intersects(&boundaries[primary])) {
        return Some(Obstacle::Primary);
    }
    if let Some(&other) = settled
        .iter()
        .find(|&&other| current.intersects(&boundaries[other]))
    {
        let other = &boundaries[other];
        return Some(Obstacle::Above(other.y + other.height));
    }
    loose
        .iter()
        .find(|node| !current.nodes.contains(&node.id) && overlaps_node(current, node))
        .map(|node| Obstacle::Above(node.bottom()))
}

/// Settles external boxes one at a time. A box that hits the primary box is
/// moved sideways off it; a box that hits an earlier external box or a node
/// outside every external group is pushed down below it. Groups holding a
/// pinned node never move.
fn separate(
    boundaries: &mut [BoundaryLayout],
    nodes: &mut BTreeMap<String, NodeLayout>,
    primary: &str,
    gap: f32,
) {
    let primary_idx = boundaries.iter().position(|b| b.provider == primary);
    let external: Vec<usize> = (0..boundaries.len())
        .filter(|idx| Some(*idx) != primary_idx)
        .collect();
    let grouped: HashSet<String> = external
        .iter()
        .flat_map(|&idx| boundaries[idx].nodes.iter().cloned())
        .collect();

    for (pos, &idx) in external.iter().enumerate() {
        let settled = &external[..pos];
        let limit = settled.len() + nodes.len() + 2;
        for _ in 0..limit {
            let obstacle = {
                let loose: Vec<&NodeLayout> = nodes
                    .values()
                    .filter(|node| !grouped.contains(&node.id))
                    .collect();
                first_obstacle(boundaries, idx, primary_idx, settled, &loose)
            };
            let Some(obstacle) = obstacle else {
                break;
            };
            let (dx, dy) = match obstacle {
                Obstacle::Primary => {
                    let Some(primary_idx) = primary_idx else {
                        break;
                    };
                    let (px, pw) = (boundaries[primary_idx].x, boundaries[primary_idx].width);
                    let ext = &boundaries[idx];
                    let dx = if ext.x + ext.width / 2.0 <= px + pw / 2.0 {
                        px - gap - (ext.x + ext.width)
                    } else {
                        px + pw + gap - ext.x
                    };
                    (dx, 0.0)
                }
                Obstacle::Above(bottom) => (0.0, bottom + gap - boundaries[idx].y),
            };
            tracing::debug!(provider = %boundaries[idx].provider, dx, dy, "separating external boundary");
            if !shift_group(&mut boundaries[idx], nodes, dx, dy) {
                tracing::debug!(provider = %boundaries[idx].provider, "pinned boundary left in place");
                break;
            }
        }
    }
}

/// Builds every provider boundary and moves external members into their box.
///
/// With `allow_reposition` off (explicit-position input) every boundary is
/// measure-only.
pub(super) fn build_boundaries(
    graph: &NormalizedGraph,
    nodes: &mut BTreeMap<String, NodeLayout>,
    allow_reposition: bool,
    theme: &Theme,
    config: &LayoutConfig,
) -> Vec<BoundaryLayout> {
    let boundary = &config.boundary;
    let groups = collect_groups(graph, nodes, boundary);

    let mut claimed: HashSet<String> = HashSet::new();
    let mut boundaries = Vec::with_capacity(groups.len());
    for mut group in groups {
        let is_primary = group.provider == boundary.primary_provider;
        group.members.retain(|id| !claimed.contains(id));
        let mode = if allow_reposition && !is_primary {
            stack_members(&group.members, nodes, boundary.stack_spacing);
            ContainmentMode::Reposition
        } else {
            ContainmentMode::MeasureOnly
        };
        claimed.extend(group.members.iter().cloned());
        let layout = measure(&group, mode, nodes, theme, config);
        tracing::debug!(
            provider = %layout.provider,
            members = layout.nodes.len(),
            mode = ?layout.mode,
            "boundary measured"
        );
        boundaries.push(layout);
    }

    if allow_reposition {
        separate(&mut boundaries, nodes, &boundary.primary_provider, boundary.gap);
    }

    // Largest first so nested-looking boxes paint behind smaller ones.
    boundaries.sort_by(|a, b| {
        let area_a = a.width * a.height;
        let area_b = b.width * b.height;
        area_b.partial_cmp(&area_a).unwrap_or(Ordering::Equal)
    });
    boundaries
}
