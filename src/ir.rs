use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid graph json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read graph: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Named pipeline layers, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStage {
    Source,
    Ingest,
    Raw,
    Cdc,
    Transform,
    Curated,
    Refined,
    Serve,
    Consume,
}

impl FlowStage {
    pub fn order(self) -> f32 {
        match self {
            Self::Source => 0.0,
            Self::Ingest => 1.0,
            Self::Raw => 2.0,
            Self::Cdc => 2.5,
            Self::Transform => 3.0,
            Self::Curated => 3.5,
            Self::Refined => 4.0,
            Self::Serve => 5.0,
            Self::Consume => 6.0,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "source" | "sources" | "external" => Some(Self::Source),
            "ingest" | "ingestion" | "load" => Some(Self::Ingest),
            "raw" | "bronze" | "landing" => Some(Self::Raw),
            "cdc" | "stream" | "change_stream" | "change-stream" => Some(Self::Cdc),
            "transform" | "transformation" | "task" => Some(Self::Transform),
            "curated" | "silver" => Some(Self::Curated),
            "refined" | "gold" => Some(Self::Refined),
            "serve" | "serving" | "warehouse" => Some(Self::Serve),
            "consume" | "consumption" | "bi" => Some(Self::Consume),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawNode")]
pub struct Node {
    pub id: String,
    pub label: String,
    pub component_type: String,
    /// Stage name as sent by the generator (`"bronze"`, `"serve"`, ...).
    pub stage: Option<String>,
    pub stage_order: Option<f32>,
    pub position: Option<Position>,
    pub is_boundary: bool,
}

/// Generators send stages both as names and as numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f32),
    String(String),
}

/// Wire shape of a node. Every field tolerates `null` so one sloppy field
/// never rejects the whole graph.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    label: String,
    #[serde(default, alias = "type", deserialize_with = "null_as_default")]
    component_type: String,
    #[serde(default, alias = "flowStage")]
    stage: Option<NumberOrString>,
    #[serde(default, alias = "flowStageOrder")]
    stage_order: Option<NumberOrString>,
    #[serde(default)]
    position: Option<Position>,
    #[serde(default, deserialize_with = "null_as_default")]
    is_boundary: bool,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        let explicit_order = match raw.stage_order {
            Some(NumberOrString::Number(v)) => Some(v),
            Some(NumberOrString::String(text)) => text.trim().parse().ok(),
            None => None,
        };
        let (stage, stage_from_name) = match raw.stage {
            Some(NumberOrString::Number(v)) => (None, Some(v)),
            Some(NumberOrString::String(text)) => match text.trim().parse::<f32>() {
                Ok(v) => (None, Some(v)),
                Err(_) => (Some(text), None),
            },
            None => (None, None),
        };
        Self {
            id: raw.id,
            label: raw.label,
            component_type: raw.component_type,
            stage,
            stage_order: explicit_order.or(stage_from_name),
            position: raw.position,
            is_boundary: raw.is_boundary,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Only drives edge animation in the renderer; layout ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    #[default]
    Forward,
    Bidirectional,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub flow: FlowDirection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(input: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn ensure_node(&mut self, id: &str, label: Option<&str>, component_type: Option<&str>) {
        let idx = match self.nodes.iter().position(|node| node.id == id) {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node {
                    id: id.to_string(),
                    label: id.to_string(),
                    ..Default::default()
                });
                self.nodes.len() - 1
            }
        };
        let entry = &mut self.nodes[idx];
        if let Some(label) = label {
            entry.label = label.to_string();
        }
        if let Some(component_type) = component_type {
            entry.component_type = component_type.to_string();
        }
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.edges.push(Edge {
            source: source.to_string(),
            target: target.to_string(),
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generator_json() {
        let input = r#"{
            "nodes": [
                {"id": "sf_bronze_layer", "label": "Bronze Layer", "componentType": "pipeline-bronze-layer"},
                {"id": "ext_kafka", "label": "Kafka", "type": "external-kafka", "flowStage": "source"},
                {"id": "acct", "label": "Snowflake", "componentType": "account_boundary_snowflake", "isBoundary": true,
                 "position": {"x": 10, "y": 20}}
            ],
            "edges": [
                {"source": "ext_kafka", "target": "sf_bronze_layer", "flow": "bidirectional"}
            ]
        }"#;
        let graph = Graph::from_json_str(input).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.nodes[1].component_type, "external-kafka");
        assert_eq!(graph.nodes[1].stage.as_deref(), Some("source"));
        assert!(graph.nodes[2].is_boundary);
        assert_eq!(graph.nodes[2].position, Some(Position::new(10.0, 20.0)));
        assert_eq!(graph.edges[0].flow, FlowDirection::Bidirectional);
        assert!(graph.edges[0].id.is_none());
    }

    #[test]
    fn sloppy_node_fields_do_not_reject_the_graph() {
        let input = r#"{
            "nodes": [
                {"id": "a", "label": null, "componentType": null, "isBoundary": null},
                {"id": "b", "label": "Gold Layer", "flowStage": 3},
                {"id": "c", "label": "Thing", "flowStage": "4.5"},
                {"id": "d", "label": "Other", "flowStage": "serve", "flowStageOrder": "2"}
            ],
            "edges": [{"source": "a", "target": null}]
        }"#;
        let graph = Graph::from_json_str(input).unwrap();
        assert_eq!(graph.nodes[0].label, "");
        assert_eq!(graph.nodes[0].component_type, "");
        assert!(!graph.nodes[0].is_boundary);
        assert_eq!(graph.nodes[1].stage, None);
        assert_eq!(graph.nodes[1].stage_order, Some(3.0));
        assert_eq!(graph.nodes[2].stage_order, Some(4.5));
        assert_eq!(graph.nodes[3].stage.as_deref(), Some("serve"));
        assert_eq!(graph.nodes[3].stage_order, Some(2.0));
        assert_eq!(graph.edges[0].target, "");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Graph::from_json_str("{\"nodes\": [").unwrap_err();
        assert!(matches!(err, GraphError::Json(_)));
    }

    #[test]
    fn stage_tokens_map_to_orders() {
        assert_eq!(FlowStage::from_token("Silver").map(FlowStage::order), Some(3.5));
        assert_eq!(FlowStage::from_token("cdc").map(FlowStage::order), Some(2.5));
        assert_eq!(FlowStage::from_token("nonsense"), None);
    }

    #[test]
    fn ensure_node_updates_existing() {
        let mut graph = Graph::new();
        graph.ensure_node("a", None, None);
        graph.ensure_node("a", Some("Alpha"), Some("task"));
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].label, "Alpha");
        assert_eq!(graph.nodes[0].component_type, "task");
    }
}
