//! `llm-relay services` — print the effective service registry.
//!
//! Shows each identifier with the base URL that requests will be
//! forwarded to, after applying `LLM_RELAY_UPSTREAM_*` env overrides.

use crate::registry::Registry;

pub fn execute() {
    let registry = Registry::from_env();

    println!("{} supported services (request format: /{{service}}/{{path}}):\n", registry.len());
    for (name, base_url) in registry.entries() {
        println!("  {name:<26} {base_url}");
    }
    println!(
        "\nOverride any base URL with LLM_RELAY_UPSTREAM_<NAME>, e.g.\n  \
         LLM_RELAY_UPSTREAM_AZURE_OPENAI=https://my-resource.openai.azure.com"
    );
}
