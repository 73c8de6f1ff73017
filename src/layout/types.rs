use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ir::{FlowDirection, Position};

use super::normalize::NormalizeReport;

/// A connection point on one side of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Port {
    Top,
    Right,
    Bottom,
    Left,
}

impl Port {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }

    pub fn source_handle(self) -> String {
        format!("{}-source", self.as_str())
    }

    pub fn target_handle(self) -> String {
        format!("{}-target", self.as_str())
    }

    /// Accepts `"right"`, `"right-source"`, `"Right_target"` and similar.
    pub fn from_handle(handle: &str) -> Option<Self> {
        let lower = handle.trim().to_ascii_lowercase();
        let side = lower
            .split(|c: char| c == '-' || c == '_')
            .next()
            .unwrap_or_default();
        match side {
            "top" => Some(Self::Top),
            "right" => Some(Self::Right),
            "bottom" => Some(Self::Bottom),
            "left" => Some(Self::Left),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Right => Self::Left,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortPair {
    pub source: Port,
    pub target: Port,
}

/// Renderer shape hint derived from the canonical component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeShape {
    Generic,
    Database,
    Table,
    Stream,
    Task,
    Warehouse,
    Pipe,
    Broker,
    Storage,
    View,
    Dashboard,
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: String,
    pub label: String,
    pub component_type: String,
    pub shape: NodeShape,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub stage: f32,
    pub provider: Option<String>,
    pub pinned: bool,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainmentMode {
    /// Members keep their positions; only the box is fitted.
    MeasureOnly,
    /// Members are restacked in a single column inside the box.
    Reposition,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryStyle {
    pub fill: String,
    pub fill_opacity: f32,
    pub stroke: String,
    pub stroke_width: f32,
    pub stroke_dasharray: String,
    pub text_color: String,
    pub z_index: i32,
}

#[derive(Debug, Clone)]
pub struct BoundaryLayout {
    pub id: String,
    pub provider: String,
    /// Generator's boundary type, or `account_boundary_<provider>` when the
    /// box was synthesized.
    pub component_type: String,
    pub label: String,
    pub mode: ContainmentMode,
    pub nodes: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: BoundaryStyle,
    /// Created by the layout rather than sent by the generator.
    pub synthesized: bool,
}

impl BoundaryLayout {
    pub fn contains_rect(&self, x: f32, y: f32, width: f32, height: f32) -> bool {
        x >= self.x
            && y >= self.y
            && x + width <= self.x + self.width
            && y + height <= self.y + self.height
    }

    pub fn intersects(&self, other: &BoundaryLayout) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRenderHint {
    Straight,
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub id: String,
    pub source: String,
    pub target: String,
    pub ports: PortPair,
    pub points: Vec<(f32, f32)>,
    pub render: EdgeRenderHint,
    pub flow: FlowDirection,
}

/// Which placement produced the node coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementSource {
    Explicit,
    Columns,
    Solver,
    SolverFallback,
}

/// Positions the user dragged since the last regeneration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserEdits {
    #[serde(default)]
    pub pinned: BTreeMap<String, Position>,
}

impl UserEdits {
    pub fn pin(&mut self, id: &str, position: Position) {
        self.pinned.insert(id.to_string(), position);
    }

    pub fn is_empty(&self) -> bool {
        self.pinned.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: BTreeMap<String, NodeLayout>,
    /// Node ids in input order.
    pub node_order: Vec<String>,
    pub boundaries: Vec<BoundaryLayout>,
    pub edges: Vec<EdgeLayout>,
    pub width: f32,
    pub height: f32,
    pub placement: PlacementSource,
    pub report: NormalizeReport,
}

impl Layout {
    pub fn node(&self, id: &str) -> Option<&NodeLayout> {
        self.nodes.get(id)
    }

    pub fn boundary_for(&self, provider: &str) -> Option<&BoundaryLayout> {
        self.boundaries.iter().find(|b| b.provider == provider)
    }

    pub fn ordered_nodes(&self) -> impl Iterator<Item = &NodeLayout> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }
}
