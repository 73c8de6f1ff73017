use pipeline_diagram_layout::{LayoutOptions, LayoutStrategy, ThemeMode, UserEdits, layout_json};
use pipeline_diagram_layout::theme::Theme;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipelineLayoutOptions {
    theme: Option<String>,
    strategy: Option<String>,
    primary_provider: Option<String>,
    respect_explicit_ports: Option<bool>,
    #[serde(default)]
    edits: Option<UserEdits>,
}

fn build_layout_options(options: PipelineLayoutOptions) -> LayoutOptions {
    let mut layout_options = LayoutOptions::default();

    if let Some(mode) = options.theme.as_deref().and_then(ThemeMode::from_token) {
        layout_options.theme = Theme::for_mode(mode);
    }
    if let Some(strategy) = options.strategy.as_deref().and_then(LayoutStrategy::from_token) {
        layout_options.layout.strategy = strategy;
    }
    if let Some(primary) = options.primary_provider {
        layout_options.layout.boundary.primary_provider = primary.to_ascii_lowercase();
    }
    if let Some(respect) = options.respect_explicit_ports {
        layout_options.layout.ports.respect_explicit = respect;
    }
    if let Some(edits) = options.edits {
        layout_options.edits = edits;
    }

    layout_options
}

#[wasm_bindgen]
pub fn layout_pipeline_json(graph_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<PipelineLayoutOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        PipelineLayoutOptions::default()
    };

    let layout_options = build_layout_options(options);
    layout_json(graph_json, &layout_options).map_err(|error| JsValue::from_str(&error.to_string()))
}
