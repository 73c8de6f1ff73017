use crate::ir::{FlowDirection, Position, Size};
use crate::layout::{BoundaryStyle, ContainmentMode, Layout, NormalizeReport, PlacementSource};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Canvas-ready view of a [`Layout`]: boundaries come first as
/// `isBoundary` nodes so the renderer paints them behind everything else.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub placement: PlacementSource,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub report: NormalizeReport,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub component_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    pub position: Position,
    pub size: Size,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_stage_order: Option<f32>,
    pub is_boundary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub z_index: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<BoundaryStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containment: Option<ContainmentMode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub points: Vec<[f32; 2]>,
    pub flow: FlowDirection,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let mut nodes: Vec<NodeDump> = layout
            .boundaries
            .iter()
            .map(|boundary| NodeDump {
                id: boundary.id.clone(),
                label: boundary.label.clone(),
                component_type: boundary.component_type.clone(),
                shape: None,
                position: Position::new(boundary.x, boundary.y),
                size: Size {
                    width: boundary.width,
                    height: boundary.height,
                },
                flow_stage_order: None,
                is_boundary: true,
                provider: Some(boundary.provider.clone()),
                z_index: boundary.style.z_index,
                style: Some(boundary.style.clone()),
                containment: Some(boundary.mode),
                children: boundary.nodes.clone(),
                pinned: false,
            })
            .collect();

        nodes.extend(layout.ordered_nodes().map(|node| NodeDump {
            id: node.id.clone(),
            label: node.label.clone(),
            component_type: node.component_type.clone(),
            shape: serde_json::to_value(node.shape)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string)),
            position: Position::new(node.x, node.y),
            size: Size {
                width: node.width,
                height: node.height,
            },
            flow_stage_order: Some(node.stage),
            is_boundary: false,
            provider: node.provider.clone(),
            z_index: 0,
            style: None,
            containment: None,
            children: Vec::new(),
            pinned: node.pinned,
        }));

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source.clone(),
                target: edge.target.clone(),
                source_handle: edge.ports.source.source_handle(),
                target_handle: edge.ports.target.target_handle(),
                kind: serde_json::to_value(edge.render)
                    .ok()
                    .and_then(|value| value.as_str().map(str::to_string))
                    .unwrap_or_else(|| "straight".to_string()),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
                flow: edge.flow,
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            placement: layout.placement,
            nodes,
            edges,
            report: layout.report.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
