//! The service registry: an immutable mapping from provider identifiers
//! to upstream API base URLs.
//!
//! The table is built once at startup via [`Registry::from_env`] and
//! shared read-only through `AppState` for the lifetime of the process.
//! Lookups are case-insensitive and exact (no prefix matching); an
//! unknown identifier is a normal outcome, not a fault.

/// Default upstream base URLs, keyed by lowercase service identifier.
///
/// Base URLs carry no trailing slash. The `azure_openai` entry contains a
/// literal `{your-resource-name}` placeholder; the registry never performs
/// substitution — operators replace it via the `LLM_RELAY_UPSTREAM_AZURE_OPENAI`
/// environment variable.
const DEFAULT_UPSTREAMS: &[(&str, &str)] = &[
    ("openai", "https://api.openai.com/v1"),
    ("anthropic", "https://api.anthropic.com"),
    ("azure_openai", "https://{your-resource-name}.openai.azure.com"),
    ("google_vertexai", "https://vertexai.googleapis.com"),
    ("google_genai", "https://genai.googleapis.com"),
    ("bedrock", "https://bedrock.aws"),
    ("bedrock_converse", "https://bedrock.aws"),
    ("cohere", "https://api.cohere.ai"),
    ("fireworks", "https://api.fireworks.ai"),
    ("together", "https://api.together.ai"),
    ("mistralai", "https://api.mistralai.com"),
    ("huggingface", "https://api-inference.huggingface.co"),
    ("groq", "https://api.groq.com"),
    ("google_anthropic_vertex", "https://vertexai.googleapis.com"),
    ("deepseek", "https://api.deepseek.ai"),
    ("ibm", "https://api.ibm.com"),
    ("nvidia", "https://api.nvidia.com"),
    ("xai", "https://api.xai.example.com"),
];

/// Env var prefix for per-service base URL overrides,
/// e.g. `LLM_RELAY_UPSTREAM_OPENAI=https://eu.api.openai.com/v1`.
const UPSTREAM_ENV_PREFIX: &str = "LLM_RELAY_UPSTREAM_";

#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<(String, String)>,
}

impl Registry {
    /// Build a registry from explicit entries. Identifiers are stored
    /// lowercase; trailing slashes on base URLs are dropped.
    #[must_use]
    pub fn new(entries: Vec<(String, String)>) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, url)| {
                (
                    name.to_ascii_lowercase(),
                    url.trim_end_matches('/').to_string(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Build the default registry, applying `LLM_RELAY_UPSTREAM_<NAME>`
    /// environment overrides. Called once at startup.
    #[must_use]
    pub fn from_env() -> Self {
        let entries = DEFAULT_UPSTREAMS
            .iter()
            .map(|&(name, default_url)| {
                let env_key = format!("{UPSTREAM_ENV_PREFIX}{}", name.to_ascii_uppercase());
                let url = match std::env::var(&env_key) {
                    Ok(value) if !value.is_empty() => {
                        tracing::info!(service = name, "upstream base URL overridden from env");
                        value
                    }
                    _ => default_url.to_string(),
                };
                (name.to_string(), url)
            })
            .collect();
        Self::new(entries)
    }

    /// Resolve a service identifier to its base URL.
    ///
    /// Matching is case-insensitive and exact. `None` means the service
    /// is not supported. A linear scan over ~18 entries beats hashing
    /// here and sidesteps key-normalization bugs entirely.
    #[must_use]
    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(identifier))
            .map(|(_, url)| url.as_str())
    }

    /// Iterate over `(identifier, base_url)` pairs in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::from_env()
    }
}
