//! Shared test helpers for configuration tests.

use ortho_config::MergeComposer;
use serde_json::Value;

use crate::PullhouseConfig;

/// Unprefixed variables read as fallbacks by the configuration layer.
const LEGACY_VARIABLES: [&str; 9] = [
    "GITHUB_TOKEN",
    "SYNAPSE_SERVER",
    "SYNAPSE_DB",
    "SYNAPSE_USER",
    "SYNAPSE_PASS",
    "DAYS_BACK",
    "REPOS",
    "IDENTITY_ENDPOINT",
    "IDENTITY_HEADER",
];

/// Applies a configuration layer to the composer based on the layer type.
pub fn apply_layer(composer: &mut MergeComposer, layer_type: &str, value: Value) {
    match layer_type {
        "defaults" => composer.push_defaults(value),
        "file" => composer.push_file(value, None),
        "environment" => composer.push_environment(value),
        "cli" => composer.push_cli(value),
        _ => panic!("unknown layer type: {layer_type}"),
    }
}

/// Helper to compose a [`PullhouseConfig`] from a sequence of `(layer_type, value)` pairs.
pub fn build_config_from_layers(layers: &[(&str, Value)]) -> PullhouseConfig {
    let mut composer = MergeComposer::new();

    for (layer_type, value) in layers {
        apply_layer(&mut composer, layer_type, value.clone());
    }

    PullhouseConfig::merge_from_layers(composer.layers()).expect("merge should succeed")
}

/// Environment for `env_lock::lock_env` with every legacy variable cleared
/// except the given overrides.
pub fn legacy_environment(
    overrides: &[(&'static str, &'static str)],
) -> Vec<(&'static str, Option<&'static str>)> {
    LEGACY_VARIABLES
        .iter()
        .map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| *value);
            (*name, value)
        })
        .collect()
}
