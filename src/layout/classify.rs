//! Pipeline-stage classification.
//!
//! Every node gets a numeric `flowStageOrder`: integers are primary pipeline
//! layers (source, ingest, raw, transform, refined, serve, consume) and halves
//! slot connector nodes between them (change streams after raw, curated after
//! transform). Keyword rules beat explicit stage hints on the node because
//! generators routinely mislabel stages but rarely misname components.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::LayoutConfig;
use crate::ir::{FlowStage, Node};

/// Ordered `(name, pattern, stage)` triples; the first match wins.
const BUILTIN_RULES: &[(&str, &str, f32)] = &[
    (
        "cdc",
        r"\b(cdc|change data capture|change streams?|changes feed)\b",
        2.5,
    ),
    (
        "ingest",
        r"\b(snowpipe|snowpipe streaming|ingest|ingestion|loader|load|loading|pipes?|copy into|openflow|fivetran|connectors?|kafka connect)\b",
        1.0,
    ),
    (
        "source",
        r"\b(source|sources|external|kafka|confluent|kinesis|event hubs?|pub sub|pubsub|s3|blob|adls|gcs|object storage|bucket|postgres|mysql|oracle|sql server|salesforce|sap|api|iot|on prem)\b",
        0.0,
    ),
    ("stream", r"\b(streams?)\b", 2.5),
    ("raw", r"\b(raw|bronze|landing)\b", 2.0),
    (
        "curated",
        r"\b(silver|curated|cleansed|cleaned|conformed)\b",
        3.5,
    ),
    (
        "refined",
        r"\b(gold|refined|aggregated?|aggregates|marts?)\b",
        4.0,
    ),
    (
        "transform",
        r"\b(transform|transformation|tasks?|dynamic tables?|dbt|procedures?|udfs?|snowpark)\b",
        3.0,
    ),
    (
        "consume",
        r"\b(bi|tableau|power bi|powerbi|looker|dashboards?|streamlit|reports?|reporting|consumers?|consumption|notebooks?|ml|apps?|analysts?|end users)\b",
        6.0,
    ),
    (
        "serve",
        r"\b(serve|serving|warehouses?|semantic|views?|materialized views?|analytics|share|sharing)\b",
        5.0,
    ),
];

static BUILTIN: Lazy<StageRules> = Lazy::new(|| {
    let rules = BUILTIN_RULES
        .iter()
        .map(|(name, pattern, stage)| StageRule {
            name: (*name).to_string(),
            pattern: Regex::new(pattern).unwrap(),
            stage: *stage,
        })
        .collect();
    StageRules { rules }
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercases and collapses every non-alphanumeric run to one space, so
/// `sf_bronze_layer`, `pipeline-bronze-layer` and `Bronze Layer` all read
/// as `... bronze layer`.
pub fn normalize_text(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    SEPARATORS.replace_all(&lower, " ").trim().to_string()
}

#[derive(Debug, Clone)]
pub struct StageRule {
    pub name: String,
    pattern: Regex,
    pub stage: f32,
}

impl StageRule {
    pub fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

/// Ordered keyword rule table.
#[derive(Debug, Clone)]
pub struct StageRules {
    rules: Vec<StageRule>,
}

impl Default for StageRules {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StageRules {
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[StageRule] {
        &self.rules
    }

    /// Appends a rule with the lowest priority.
    pub fn push(&mut self, name: &str, pattern: &str, stage: f32) -> Result<(), regex::Error> {
        self.rules.push(StageRule {
            name: name.to_string(),
            pattern: Regex::new(pattern)?,
            stage,
        });
        Ok(())
    }

    /// Inserts a rule ahead of every existing one.
    pub fn prepend(&mut self, name: &str, pattern: &str, stage: f32) -> Result<(), regex::Error> {
        self.rules.insert(
            0,
            StageRule {
                name: name.to_string(),
                pattern: Regex::new(pattern)?,
                stage,
            },
        );
        Ok(())
    }

    pub fn match_text(&self, text: &str) -> Option<&StageRule> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return None;
        }
        self.rules.iter().find(|rule| rule.matches(&normalized))
    }

    /// Keyword stage from componentType, then label, then id.
    pub fn keyword_stage(&self, node: &Node) -> Option<f32> {
        [
            node.component_type.as_str(),
            node.label.as_str(),
            node.id.as_str(),
        ]
        .into_iter()
        .find_map(|text| self.match_text(text))
        .map(|rule| rule.stage)
    }

    pub fn classify(&self, node: &Node, config: &LayoutConfig) -> f32 {
        if let Some(stage) = self.keyword_stage(node) {
            return stage;
        }
        if let Some(stage) = node.stage.as_deref().and_then(FlowStage::from_token) {
            return stage.order();
        }
        if let Some(order) = node.stage_order.filter(|v| v.is_finite()) {
            return order;
        }
        config.default_stage
    }
}

pub fn classify(node: &Node, config: &LayoutConfig) -> f32 {
    BUILTIN.classify(node, config)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationOutcome {
    pub passes: usize,
    pub raised: usize,
    pub converged: bool,
}

/// Raises edge targets so every edge moves strictly rightwards.
///
/// A target sitting at or before its source is lifted to the source stage
/// plus `increment`; with several predecessors the largest one wins. Passes
/// stop at a fixpoint or after `max_passes` (cycles never converge).
pub fn propagate_stages(
    stages: &mut HashMap<String, f32>,
    edges: &[(&str, &str)],
    increment: f32,
    max_passes: usize,
) -> PropagationOutcome {
    let increment = if increment > 0.0 { increment } else { 0.5 };
    let max_passes = max_passes.max(1);
    let mut raised = 0usize;
    let mut passes = 0usize;

    while passes < max_passes {
        passes += 1;
        let mut changed = false;
        for (source, target) in edges {
            if source == target {
                continue;
            }
            let Some(source_stage) = stages.get(*source).copied() else {
                continue;
            };
            let Some(target_stage) = stages.get_mut(*target) else {
                continue;
            };
            if *target_stage <= source_stage {
                *target_stage = source_stage + increment;
                raised += 1;
                changed = true;
            }
        }
        if !changed {
            return PropagationOutcome {
                passes,
                raised,
                converged: true,
            };
        }
    }

    tracing::warn!(
        passes,
        raised,
        "stage propagation hit its pass cap; graph likely contains a cycle"
    );
    PropagationOutcome {
        passes,
        raised,
        converged: false,
    }
}
