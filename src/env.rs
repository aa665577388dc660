use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::registry::Registry;
use crate::tree;

/// Build a tree from the environment variables bound by `registry`.
///
/// Each setting with an env binding looks up its variable by exact name. A
/// present variable is written as a string at the setting's dotted path,
/// even when empty; an absent one contributes nothing. Type coercion happens
/// later, when the merged tree is bound onto the destination.
///
/// Takes an iterator so tests can pass synthetic data instead of `std::env::vars()`.
pub fn env_to_tree(
    registry: &Registry,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Map<String, Value> {
    let vars: HashMap<String, String> = vars.into_iter().collect();
    let mut out = Map::new();

    for setting in registry.settings() {
        let Some(name) = setting.env_name() else {
            continue;
        };
        if let Some(value) = vars.get(name) {
            tree::insert(&mut out, setting.path(), Value::String(value.clone()));
        }
    }

    out
}
