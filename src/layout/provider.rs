//! Provider/platform table shared by boundary dedup and boundary grouping.

use super::classify::normalize_text;

#[derive(Debug, Clone, Copy)]
pub struct Provider {
    pub name: &'static str,
    pub title: &'static str,
    pub keywords: &'static [&'static str],
}

/// External providers, checked before the primary platform.
pub const EXTERNAL_PROVIDERS: &[Provider] = &[
    Provider {
        name: "kafka",
        title: "Apache Kafka",
        keywords: &["kafka", "confluent", "msk"],
    },
    Provider {
        name: "aws",
        title: "AWS",
        keywords: &[
            "aws", "amazon", "s3", "kinesis", "firehose", "glue", "lambda", "redshift", "dynamodb", "rds",
        ],
    },
    Provider {
        name: "azure",
        title: "Microsoft Azure",
        keywords: &[
            "azure", "adls", "blob", "event hub", "event hubs", "synapse", "cosmos", "data factory",
        ],
    },
    Provider {
        name: "gcp",
        title: "Google Cloud",
        keywords: &["gcp", "google cloud", "gcs", "bigquery", "pub sub", "pubsub", "dataflow"],
    },
    Provider {
        name: "external",
        title: "External Sources",
        keywords: &[
            "external", "ext", "on prem", "on premise", "on premises", "third party", "saas",
            "salesforce", "sap", "postgres", "mysql", "oracle", "sql server",
        ],
    },
];

/// Primary platform keywords. Bridge terms (pipe, connector, ingest, stage,
/// stream) are left out: they name ingestion components owned by whichever
/// external provider feeds them.
pub const PRIMARY_PROVIDERS: &[Provider] = &[Provider {
    name: "snowflake",
    title: "Snowflake",
    keywords: &[
        "snowflake",
        "sf",
        "bronze",
        "silver",
        "gold",
        "raw layer",
        "curated",
        "refined",
        "warehouse",
        "task",
        "tasks",
        "dynamic table",
        "dynamic tables",
        "materialized view",
        "view",
        "views",
        "table",
        "tables",
        "schema",
        "database",
        "snowpark",
        "cortex",
        "streamlit",
        "semantic",
    ],
}];

/// Boundary-only tokens stripped when guessing an unknown provider name.
const BOUNDARY_TOKENS: &[&str] = &[
    "account", "boundary", "provider", "platform", "cloud", "region", "group", "zone", "workspace",
];

/// Whole-word phrase test on normalized text.
pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    if phrase.is_empty() || normalized.is_empty() {
        return false;
    }
    let haystack = format!(" {normalized} ");
    let needle = format!(" {phrase} ");
    haystack.contains(&needle)
}

fn provider_matches(provider: &Provider, normalized: &str) -> bool {
    provider
        .keywords
        .iter()
        .any(|keyword| contains_phrase(normalized, keyword))
}

pub fn lookup(name: &str) -> Option<&'static Provider> {
    EXTERNAL_PROVIDERS
        .iter()
        .chain(PRIMARY_PROVIDERS.iter())
        .find(|provider| provider.name == name)
}

pub fn title_for(name: &str) -> String {
    match lookup(name) {
        Some(provider) => provider.title.to_string(),
        None => {
            let mut chars = name.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Matches free text against external providers first, then the primary one.
///
/// A primary provider missing from the table matches on its own name.
pub fn match_provider<'a, I>(texts: I, primary: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized: Vec<String> = texts.into_iter().map(normalize_text).collect();
    for provider in EXTERNAL_PROVIDERS {
        if provider.name == primary {
            continue;
        }
        if normalized.iter().any(|text| provider_matches(provider, text)) {
            return Some(provider.name.to_string());
        }
    }
    let hit = match lookup(primary) {
        Some(provider) => normalized.iter().any(|text| provider_matches(provider, text)),
        None => normalized.iter().any(|text| contains_phrase(text, primary)),
    };
    hit.then(|| primary.to_string())
}

/// Canonical provider for a boundary node.
///
/// Boundary labels are short and explicit ("Snowflake", "AWS Account"), so the
/// primary provider is only a fallback after the table and not preferred.
pub fn boundary_provider(id: &str, label: &str, component_type: &str) -> String {
    let texts = [component_type, label, id];
    for text in texts {
        let normalized = normalize_text(text);
        for provider in EXTERNAL_PROVIDERS.iter().chain(PRIMARY_PROVIDERS.iter()) {
            if contains_phrase(&normalized, provider.name) {
                return provider.name.to_string();
            }
        }
    }
    for text in texts {
        let normalized = normalize_text(text);
        for provider in EXTERNAL_PROVIDERS.iter().chain(PRIMARY_PROVIDERS.iter()) {
            if provider_matches(provider, &normalized) {
                return provider.name.to_string();
            }
        }
    }
    for text in texts {
        let normalized = normalize_text(text);
        let remaining: Vec<&str> = normalized
            .split(' ')
            .filter(|token| !token.is_empty() && !BOUNDARY_TOKENS.contains(token))
            .collect();
        if !remaining.is_empty() {
            return remaining.join("-");
        }
    }
    "external".to_string()
}
