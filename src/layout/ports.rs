use crate::config::PortConfig;

use super::normalize::NormalEdge;
use super::types::{EdgeLayout, EdgeRenderHint, NodeLayout, Port, PortPair};

/// Picks the port pair facing along the dominant center-to-center axis.
/// Ties go horizontal.
pub fn select_ports(source: &NodeLayout, target: &NodeLayout) -> PortPair {
    let (from_cx, from_cy) = source.center();
    let (to_cx, to_cy) = target.center();
    let dx = to_cx - from_cx;
    let dy = to_cy - from_cy;

    let source_port = if dx.abs() >= dy.abs() {
        if dx >= 0.0 { Port::Right } else { Port::Left }
    } else if dy > 0.0 {
        Port::Bottom
    } else {
        Port::Top
    };
    PortPair {
        source: source_port,
        target: source_port.opposite(),
    }
}

/// Midpoint of the given side of the node's box.
pub fn anchor_point(node: &NodeLayout, port: Port) -> (f32, f32) {
    let (cx, cy) = node.center();
    match port {
        Port::Left => (node.x, cy),
        Port::Right => (node.right(), cy),
        Port::Top => (cx, node.y),
        Port::Bottom => (cx, node.bottom()),
    }
}

fn explicit_pair(edge: &NormalEdge) -> Option<PortPair> {
    let source = Port::from_handle(edge.source_handle.as_deref()?)?;
    let target = Port::from_handle(edge.target_handle.as_deref()?)?;
    Some(PortPair { source, target })
}

pub(super) fn route_edge(
    edge: &NormalEdge,
    source: &NodeLayout,
    target: &NodeLayout,
    config: &PortConfig,
) -> EdgeLayout {
    let ports = config
        .respect_explicit
        .then(|| explicit_pair(edge))
        .flatten()
        .unwrap_or_else(|| select_ports(source, target));
    EdgeLayout {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        ports,
        points: vec![
            anchor_point(source, ports.source),
            anchor_point(target, ports.target),
        ],
        render: EdgeRenderHint::Straight,
        flow: edge.flow,
    }
}
