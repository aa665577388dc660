//! Core resolution pipeline: turn pre-loaded sources into merged layers.
//!
//! Operates on pre-loaded data (`ResolveInput`) with no I/O, making the full
//! pipeline testable with synthetic inputs. Steps:
//!
//! 1. Parse the argument vector; a help request short-circuits everything
//! 2. Build the env layer from the registered variables
//! 3. Deep-merge defaults, file, env and cli (later overrides earlier)
//!
//! The layers are returned individually as well as merged, so a reload can
//! swap in a fresh file layer and merge again without re-reading the
//! environment or the command line.

use serde_json::{Map, Value};

use crate::cli::{self, Parsed};
use crate::env;
use crate::merge::merge_all;
use crate::registry::Registry;

/// All pre-loaded data needed to resolve a config. No I/O happens here.
pub struct ResolveInput<'a> {
    pub registry: &'a Registry,
    /// Programmatic defaults, lowest priority.
    pub defaults: Map<String, Value>,
    /// The parsed configuration file (empty when there is none).
    pub file: Map<String, Value>,
    /// Raw environment variable pairs (pass `std::env::vars()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Command-line arguments without the program name.
    pub args: Vec<String>,
}

/// The four sources in precedence order, lowest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layers {
    pub defaults: Map<String, Value>,
    pub file: Map<String, Value>,
    pub env: Map<String, Value>,
    pub cli: Map<String, Value>,
}

impl Layers {
    /// Deep-merge all layers: defaults < file < env < cli.
    pub fn merged(&self) -> Map<String, Value> {
        merge_all([
            self.defaults.clone(),
            self.file.clone(),
            self.env.clone(),
            self.cli.clone(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The command line asked for usage information.
    Help,
    Layers(Layers),
}

/// Resolve configuration layers from pre-loaded inputs.
pub fn resolve(input: ResolveInput<'_>) -> Resolution {
    let cli = match cli::parse(&input.args, input.registry) {
        Parsed::Help => return Resolution::Help,
        Parsed::Values(tree) => tree,
    };

    Resolution::Layers(Layers {
        defaults: input.defaults,
        file: input.file,
        env: env::env_to_tree(input.registry, input.env_vars),
        cli,
    })
}
