#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;

pub use config::{Config, LayoutConfig, LayoutStrategy, load_config, parse_config};
pub use ir::{Edge, Graph, GraphError, Node, Position};
pub use layout::{Layout, UserEdits, compute_layout, compute_layout_with_edits};
pub use layout_dump::{LayoutDump, write_layout_dump};
pub use theme::{Theme, ThemeMode};

/// Everything one layout run needs besides the graph.
#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub edits: UserEdits,
}

impl LayoutOptions {
    pub fn from_config(config: Config) -> Self {
        Self {
            theme: config.theme,
            layout: config.layout,
            edits: UserEdits::default(),
        }
    }

    pub fn with_edits(mut self, edits: UserEdits) -> Self {
        self.edits = edits;
        self
    }
}

pub fn layout_graph(graph: &Graph, options: &LayoutOptions) -> Layout {
    compute_layout_with_edits(graph, &options.edits, &options.theme, &options.layout)
}

/// Graph JSON in, canvas layout JSON out.
pub fn layout_json(input: &str, options: &LayoutOptions) -> Result<String, GraphError> {
    let graph = Graph::from_json_str(input)?;
    let layout = layout_graph(&graph, options);
    Ok(LayoutDump::from_layout(&layout).to_json()?)
}
