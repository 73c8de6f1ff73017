use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "light" | "default" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub mode: ThemeMode,
    pub boundary_label_color: String,
    pub cluster_border: String,
    /// Brand tint per canonical provider name.
    pub provider_colors: BTreeMap<String, String>,
}

fn brand_colors() -> BTreeMap<String, String> {
    [
        ("snowflake", "#29B5E8"),
        ("aws", "#FF9900"),
        ("azure", "#0078D4"),
        ("gcp", "#34A853"),
        ("kafka", "#231F20"),
        ("external", "#6B7280"),
    ]
    .into_iter()
    .map(|(name, color)| (name.to_string(), color.to_string()))
    .collect()
}

impl Theme {
    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            boundary_label_color: "#1C2430".to_string(),
            cluster_border: "#D7E0F0".to_string(),
            provider_colors: brand_colors(),
        }
    }

    pub fn dark() -> Self {
        let mut provider_colors = brand_colors();
        // The Kafka mark is near-black and disappears on a dark canvas.
        provider_colors.insert("kafka".to_string(), "#E5E7EB".to_string());
        Self {
            mode: ThemeMode::Dark,
            boundary_label_color: "#E2E8F0".to_string(),
            cluster_border: "#475569".to_string(),
            provider_colors,
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }

    pub fn provider_color(&self, provider: &str) -> &str {
        self.provider_colors
            .get(provider)
            .map(String::as_str)
            .unwrap_or(self.cluster_border.as_str())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}
