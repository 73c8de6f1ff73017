//! Graph normalization: canonical component types, node dedup, edge cleanup.
//!
//! The output is internally consistent: unique ids, one boundary per
//! provider, and every edge resolving to two distinct non-boundary nodes.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::ir::{Edge, FlowDirection, Graph, Node, Position};

use super::classify::normalize_text;
use super::provider::{boundary_provider, contains_phrase};
use super::types::NodeShape;

/// Tokens generators put in front of the real type.
const GENERATOR_PREFIXES: &[&str] = &[
    "sf",
    "snowflake",
    "ext",
    "external",
    "pipeline",
    "component",
    "node",
    "type",
];

/// Canonical category and the surface spellings that map to it, most
/// specific first.
const TYPE_ALIASES: &[(&str, &[&str])] = &[
    ("bronze-layer", &["bronze", "bronze layer", "raw layer", "landing"]),
    ("silver-layer", &["silver", "silver layer", "curated layer"]),
    ("gold-layer", &["gold", "gold layer", "refined layer"]),
    (
        "ingestion-pipe",
        &[
            "snowpipe",
            "snowpipe streaming",
            "pipe",
            "kafka connector",
            "connector",
            "openflow",
            "fivetran",
            "copy into",
        ],
    ),
    (
        "stream",
        &["stream", "streams", "cdc", "cdc stream", "change stream", "change data capture"],
    ),
    ("dynamic-table", &["dynamic table", "dynamic tables", "dt"]),
    ("task", &["task", "tasks", "transform task", "scheduled task"]),
    (
        "materialized-view",
        &["materialized view", "materialized views", "mv", "mat view"],
    ),
    ("view", &["view", "views", "secure view", "analytics view", "analytics views"]),
    ("table", &["table", "tables"]),
    ("schema", &["schema", "schemas"]),
    ("database", &["database", "databases", "db"]),
    ("warehouse", &["warehouse", "warehouses", "wh", "virtual warehouse"]),
    (
        "message-broker",
        &[
            "kafka",
            "confluent",
            "kinesis",
            "event hub",
            "event hubs",
            "pubsub",
            "pub sub",
            "message broker",
            "queue",
        ],
    ),
    (
        "object-storage",
        &["s3", "blob", "adls", "gcs", "bucket", "object storage", "stage"],
    ),
    (
        "bi-tool",
        &["tableau", "power bi", "powerbi", "looker", "bi", "bi tool", "dashboard"],
    ),
    ("streamlit-app", &["streamlit", "streamlit app"]),
    ("notebook", &["notebook", "notebooks"]),
];

static GENERATED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[_-](\d+|copy|dup|duplicate)$").unwrap());

/// Hash-like tails; only counted when they contain a digit, so words such as
/// `facade` or `decade` stay part of the id.
static HEX_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[_-]([0-9a-f]{6,})$").unwrap());

pub fn is_boundary_node(node: &Node) -> bool {
    node.is_boundary || contains_phrase(&normalize_text(&node.component_type), "boundary")
}

/// Canonical component type. Boundary types pass through untouched; unknown
/// types come back as a kebab-case slug with generator prefixes removed.
pub fn canonicalize_component_type(component_type: &str) -> String {
    let normalized = normalize_text(component_type);
    if contains_phrase(&normalized, "boundary") {
        return component_type.to_string();
    }

    let mut tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    while tokens.len() > 1 && GENERATOR_PREFIXES.contains(&tokens[0]) {
        tokens.remove(0);
    }
    while tokens.len() > 1
        && tokens
            .last()
            .is_some_and(|t| t.chars().all(|c| c.is_ascii_digit()))
    {
        tokens.pop();
    }
    if tokens.is_empty() {
        return "generic".to_string();
    }
    let stripped = tokens.join(" ");

    for (canonical, aliases) in TYPE_ALIASES {
        if aliases.iter().any(|alias| *alias == stripped) {
            return (*canonical).to_string();
        }
    }
    for (canonical, aliases) in TYPE_ALIASES {
        if aliases.iter().any(|alias| contains_phrase(&stripped, alias)) {
            return (*canonical).to_string();
        }
    }
    tokens.join("-")
}

pub fn shape_for(canonical_type: &str) -> NodeShape {
    match canonical_type {
        "bronze-layer" | "silver-layer" | "gold-layer" | "table" | "dynamic-table" => {
            NodeShape::Table
        }
        "database" | "schema" => NodeShape::Database,
        "stream" => NodeShape::Stream,
        "task" => NodeShape::Task,
        "warehouse" => NodeShape::Warehouse,
        "ingestion-pipe" => NodeShape::Pipe,
        "message-broker" => NodeShape::Broker,
        "object-storage" => NodeShape::Storage,
        "view" | "materialized-view" => NodeShape::View,
        "bi-tool" | "streamlit-app" | "notebook" => NodeShape::Dashboard,
        _ => NodeShape::Generic,
    }
}

/// Dedup key: boundaries collapse per provider, everything else is keyed by
/// id. Keying ordinary nodes by type would merge e.g. two distinct CDC
/// streams into one.
pub fn key_for_node(node: &Node) -> String {
    if is_boundary_node(node) {
        let provider = boundary_provider(&node.id, &node.label, &node.component_type);
        format!("boundary:{provider}")
    } else {
        node.id.clone()
    }
}

fn has_generated_suffix(id: &str) -> bool {
    GENERATED_SUFFIX.is_match(id)
        || HEX_SUFFIX
            .captures(id)
            .and_then(|caps| caps.get(1))
            .is_some_and(|run| run.as_str().bytes().any(|b| b.is_ascii_digit()))
}

#[derive(Debug, Clone)]
pub struct NormalNode {
    pub id: String,
    pub label: String,
    pub component_type: String,
    /// Type as the generator sent it; keeps provider hints canonicalization drops.
    pub raw_type: String,
    pub shape: NodeShape,
    pub position: Option<Position>,
    /// Index of the surviving node in the input list.
    pub input_index: usize,
}

#[derive(Debug, Clone)]
pub struct NormalBoundary {
    pub id: String,
    pub label: String,
    pub provider: String,
    pub component_type: String,
    pub position: Option<Position>,
}

#[derive(Debug, Clone)]
pub struct NormalEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub flow: FlowDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeDropReason {
    EmptyId,
    DuplicateId,
    DuplicateBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeDropReason {
    SelfLoop,
    DanglingSource,
    DanglingTarget,
    BoundaryEndpoint,
    Duplicate,
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedNode {
    pub id: String,
    pub reason: NodeDropReason,
    /// Surviving node that absorbed this one.
    pub kept: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedEdge {
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    pub reason: EdgeDropReason,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizeReport {
    pub dropped_nodes: Vec<DroppedNode>,
    pub dropped_edges: Vec<DroppedEdge>,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        self.dropped_nodes.is_empty() && self.dropped_edges.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedGraph {
    pub nodes: Vec<NormalNode>,
    pub boundaries: Vec<NormalBoundary>,
    pub edges: Vec<NormalEdge>,
    pub report: NormalizeReport,
}

impl NormalizedGraph {
    pub fn node(&self, id: &str) -> Option<&NormalNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge_pairs(&self) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .map(|edge| (edge.source.as_str(), edge.target.as_str()))
            .collect()
    }
}

enum Entry {
    Node(NormalNode),
    Boundary(NormalBoundary),
}

impl Entry {
    fn id(&self) -> &str {
        match self {
            Entry::Node(node) => &node.id,
            Entry::Boundary(boundary) => &boundary.id,
        }
    }
}

fn build_entry(node: &Node, input_index: usize) -> Entry {
    if is_boundary_node(node) {
        Entry::Boundary(NormalBoundary {
            id: node.id.clone(),
            label: node.label.clone(),
            provider: boundary_provider(&node.id, &node.label, &node.component_type),
            component_type: node.component_type.clone(),
            position: node.position,
        })
    } else {
        let component_type = canonicalize_component_type(&node.component_type);
        let label = if node.label.trim().is_empty() {
            node.id.clone()
        } else {
            node.label.clone()
        };
        Entry::Node(NormalNode {
            id: node.id.clone(),
            label,
            shape: shape_for(&component_type),
            component_type,
            raw_type: node.component_type.clone(),
            position: node.position,
            input_index,
        })
    }
}

pub fn normalize(graph: &Graph) -> NormalizedGraph {
    let mut report = NormalizeReport::default();
    let mut entries: Vec<Entry> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut taken_ids: HashMap<String, usize> = HashMap::new();
    // Discarded id -> surviving id, for edge remapping.
    let mut aliases: HashMap<String, String> = HashMap::new();

    for (input_index, node) in graph.nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            tracing::warn!(label = %node.label, "dropping node without an id");
            report.dropped_nodes.push(DroppedNode {
                id: node.id.clone(),
                reason: NodeDropReason::EmptyId,
                kept: None,
            });
            continue;
        }

        let key = key_for_node(node);
        let entry = build_entry(node, input_index);

        if let Some(&slot) = by_key.get(&key) {
            let existing_id = entries[slot].id().to_string();
            let reason = if matches!(entry, Entry::Boundary(_)) {
                NodeDropReason::DuplicateBoundary
            } else {
                NodeDropReason::DuplicateId
            };
            let replace = existing_id != node.id
                && has_generated_suffix(&existing_id)
                && !has_generated_suffix(&node.id)
                && !taken_ids.contains_key(&node.id);
            let (kept, dropped) = if replace {
                taken_ids.remove(&existing_id);
                taken_ids.insert(node.id.clone(), slot);
                entries[slot] = entry;
                (node.id.clone(), existing_id)
            } else {
                (existing_id, node.id.clone())
            };
            tracing::warn!(dropped = %dropped, kept = %kept, ?reason, "dropping duplicate node");
            if dropped != kept {
                // Earlier aliases may point at the instance just replaced.
                for target in aliases.values_mut() {
                    if *target == dropped {
                        *target = kept.clone();
                    }
                }
                aliases.insert(dropped.clone(), kept.clone());
            }
            report.dropped_nodes.push(DroppedNode {
                id: dropped,
                reason,
                kept: Some(kept),
            });
            continue;
        }

        if taken_ids.contains_key(&node.id) {
            // A boundary and an ordinary node sharing one id.
            tracing::warn!(id = %node.id, "dropping node whose id is already taken");
            report.dropped_nodes.push(DroppedNode {
                id: node.id.clone(),
                reason: NodeDropReason::DuplicateId,
                kept: Some(node.id.clone()),
            });
            continue;
        }

        taken_ids.insert(node.id.clone(), entries.len());
        by_key.insert(key, entries.len());
        entries.push(entry);
    }

    let mut nodes = Vec::new();
    let mut boundaries = Vec::new();
    for entry in entries {
        match entry {
            Entry::Node(node) => nodes.push(node),
            Entry::Boundary(boundary) => boundaries.push(boundary),
        }
    }

    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let boundary_ids: HashSet<&str> = boundaries.iter().map(|b| b.id.as_str()).collect();
    let edges = normalize_edges(&graph.edges, &node_ids, &boundary_ids, &aliases, &mut report);

    tracing::debug!(
        nodes = nodes.len(),
        boundaries = boundaries.len(),
        edges = edges.len(),
        dropped_nodes = report.dropped_nodes.len(),
        dropped_edges = report.dropped_edges.len(),
        "normalized graph"
    );

    NormalizedGraph {
        nodes,
        boundaries,
        edges,
        report,
    }
}

fn normalize_edges(
    input: &[Edge],
    node_ids: &HashSet<&str>,
    boundary_ids: &HashSet<&str>,
    aliases: &HashMap<String, String>,
    report: &mut NormalizeReport,
) -> Vec<NormalEdge> {
    let resolve = |id: &str| -> String {
        aliases
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    };

    let mut edges = Vec::new();
    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    let mut used_ids: HashSet<String> = HashSet::new();

    for edge in input {
        let source = resolve(&edge.source);
        let target = resolve(&edge.target);
        let reason = if source == target {
            Some(EdgeDropReason::SelfLoop)
        } else if boundary_ids.contains(source.as_str()) || boundary_ids.contains(target.as_str())
        {
            Some(EdgeDropReason::BoundaryEndpoint)
        } else if !node_ids.contains(source.as_str()) {
            Some(EdgeDropReason::DanglingSource)
        } else if !node_ids.contains(target.as_str()) {
            Some(EdgeDropReason::DanglingTarget)
        } else if !seen_pairs.insert((source.clone(), target.clone())) {
            Some(EdgeDropReason::Duplicate)
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::warn!(source = %source, target = %target, ?reason, "dropping edge");
            report.dropped_edges.push(DroppedEdge {
                id: edge.id.clone(),
                source,
                target,
                reason,
            });
            continue;
        }

        let base_id = edge
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("e-{source}-{target}"));
        let mut id = base_id.clone();
        let mut suffix = 2usize;
        while !used_ids.insert(id.clone()) {
            id = format!("{base_id}-{suffix}");
            suffix += 1;
        }

        edges.push(NormalEdge {
            id,
            source,
            target,
            source_handle: edge.source_handle.clone(),
            target_handle: edge.target_handle.clone(),
            flow: edge.flow,
        });
    }

    edges
}
