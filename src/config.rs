use crate::theme::{Theme, ThemeMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStrategy {
    /// Deterministic stage columns with barycenter ordering.
    #[default]
    Columns,
    /// External layered solver, falling back to `Columns` on failure.
    Solver,
}

impl LayoutStrategy {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "columns" | "column" | "dag" => Some(Self::Columns),
            "solver" | "dagre" | "layered" => Some(Self::Solver),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryConfig {
    pub pad_x: f32,
    pub pad_top: f32,
    pub pad_bottom: f32,
    pub title_height: f32,
    /// Row pitch for members stacked inside an external boundary.
    pub stack_spacing: f32,
    pub gap: f32,
    pub primary_provider: String,
    pub auto_create: bool,
    pub fill_opacity: f32,
    pub stroke_width: f32,
    pub stroke_dasharray: String,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            pad_x: 40.0,
            pad_top: 24.0,
            pad_bottom: 32.0,
            title_height: 32.0,
            stack_spacing: 110.0,
            gap: 48.0,
            primary_provider: "snowflake".to_string(),
            auto_create: true,
            fill_opacity: 0.08,
            stroke_width: 2.0,
            stroke_dasharray: "8 4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortConfig {
    pub respect_explicit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            node_spacing: 60.0,
            rank_spacing: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    /// Distance between the left edges of neighbouring columns.
    pub column_spacing: f32,
    /// Distance between the top edges of neighbouring rows.
    pub row_spacing: f32,
    pub margin: f32,
    pub order_passes: usize,
    pub stage_increment: f32,
    pub propagation_max_passes: Option<usize>,
    pub default_stage: f32,
    pub strategy: LayoutStrategy,
    pub boundary: BoundaryConfig,
    pub ports: PortConfig,
    pub solver: SolverConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 72.0,
            column_spacing: 260.0,
            row_spacing: 120.0,
            margin: 40.0,
            order_passes: 4,
            stage_increment: 0.5,
            propagation_max_passes: None,
            default_stage: 3.0,
            strategy: LayoutStrategy::Columns,
            boundary: BoundaryConfig::default(),
            ports: PortConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    mode: Option<String>,
    provider_colors: Option<std::collections::BTreeMap<String, String>>,
    layout: Option<LayoutConfigFile>,
    boundary: Option<BoundaryConfigFile>,
    ports: Option<PortConfigFile>,
    solver: Option<SolverConfigFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    node_width: Option<f32>,
    node_height: Option<f32>,
    column_spacing: Option<f32>,
    row_spacing: Option<f32>,
    margin: Option<f32>,
    order_passes: Option<usize>,
    stage_increment: Option<f32>,
    propagation_max_passes: Option<usize>,
    default_stage: Option<f32>,
    strategy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BoundaryConfigFile {
    pad_x: Option<f32>,
    pad_top: Option<f32>,
    pad_bottom: Option<f32>,
    title_height: Option<f32>,
    stack_spacing: Option<f32>,
    gap: Option<f32>,
    primary_provider: Option<String>,
    auto_create: Option<bool>,
    fill_opacity: Option<f32>,
    stroke_width: Option<f32>,
    stroke_dasharray: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortConfigFile {
    respect_explicit: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SolverConfigFile {
    node_spacing: Option<f32>,
    rank_spacing: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 document of partial overrides on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(mode) = parsed.mode.as_deref() {
        let mode = ThemeMode::from_token(mode)
            .ok_or_else(|| anyhow::anyhow!("unknown theme mode '{mode}'"))?;
        config.theme = Theme::for_mode(mode);
    }
    if let Some(colors) = parsed.provider_colors {
        for (provider, color) in colors {
            config
                .theme
                .provider_colors
                .insert(provider.to_ascii_lowercase(), color);
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.node_width {
            target.node_width = v.max(1.0);
        }
        if let Some(v) = layout.node_height {
            target.node_height = v.max(1.0);
        }
        if let Some(v) = layout.column_spacing {
            target.column_spacing = v;
        }
        if let Some(v) = layout.row_spacing {
            target.row_spacing = v;
        }
        if let Some(v) = layout.margin {
            target.margin = v;
        }
        if let Some(v) = layout.order_passes {
            target.order_passes = v;
        }
        if let Some(v) = layout.stage_increment {
            if v > 0.0 {
                target.stage_increment = v;
            }
        }
        if layout.propagation_max_passes.is_some() {
            target.propagation_max_passes = layout.propagation_max_passes;
        }
        if let Some(v) = layout.default_stage {
            target.default_stage = v;
        }
        if let Some(strategy) = layout.strategy.as_deref() {
            target.strategy = LayoutStrategy::from_token(strategy)
                .ok_or_else(|| anyhow::anyhow!("unknown layout strategy '{strategy}'"))?;
        }
    }

    if let Some(boundary) = parsed.boundary {
        let target = &mut config.layout.boundary;
        if let Some(v) = boundary.pad_x {
            target.pad_x = v;
        }
        if let Some(v) = boundary.pad_top {
            target.pad_top = v;
        }
        if let Some(v) = boundary.pad_bottom {
            target.pad_bottom = v;
        }
        if let Some(v) = boundary.title_height {
            target.title_height = v;
        }
        if let Some(v) = boundary.stack_spacing {
            target.stack_spacing = v;
        }
        if let Some(v) = boundary.gap {
            target.gap = v;
        }
        if let Some(v) = boundary.primary_provider {
            target.primary_provider = v.to_ascii_lowercase();
        }
        if let Some(v) = boundary.auto_create {
            target.auto_create = v;
        }
        if let Some(v) = boundary.fill_opacity {
            target.fill_opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = boundary.stroke_width {
            target.stroke_width = v;
        }
        if let Some(v) = boundary.stroke_dasharray {
            target.stroke_dasharray = v;
        }
    }

    if let Some(ports) = parsed.ports {
        if let Some(v) = ports.respect_explicit {
            config.layout.ports.respect_explicit = v;
        }
    }

    if let Some(solver) = parsed.solver {
        if let Some(v) = solver.node_spacing {
            config.layout.solver.node_spacing = v;
        }
        if let Some(v) = solver.rank_spacing {
            config.layout.solver.rank_spacing = v;
        }
    }

    // Stacked rows must never overlap.
    let min_stack = config.layout.node_height;
    if config.layout.boundary.stack_spacing < min_stack {
        config.layout.boundary.stack_spacing = min_stack;
    }
    if config.layout.row_spacing < config.layout.node_height {
        config.layout.row_spacing = config.layout.node_height;
    }

    Ok(config)
}
