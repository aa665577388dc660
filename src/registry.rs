//! The setting registry: which dotted paths exist, which environment variable
//! feeds each one, and which command-line aliases select it.
//!
//! Aliases are written the way users type them: `-n` for a short alias,
//! `--name` for a long one. A trailing `:` marks the alias as greedy, meaning
//! it always takes a value (the rest of its token, or the whole next token)
//! rather than acting as a boolean switch.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

/// Suffix that marks an alias as greedy.
pub const GREEDY_SUFFIX: char = ':';

/// A command-line alias, without its dash prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AliasName {
    Short(char),
    Long(String),
}

/// A parsed option alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: AliasName,
    pub greedy: bool,
}

impl Alias {
    /// Parse `-x`, `--name`, `-x:` or `--name:`. Anything else is rejected.
    pub fn parse(option: &str) -> Option<Self> {
        let (text, greedy) = match option.strip_suffix(GREEDY_SUFFIX) {
            Some(text) => (text, true),
            None => (option, false),
        };

        let name = if let Some(long) = text.strip_prefix("--") {
            if long.is_empty() || long.starts_with('-') || long.contains('=') {
                return None;
            }
            AliasName::Long(long.to_string())
        } else if let Some(short) = text.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c != '-' => AliasName::Short(c),
                _ => return None,
            }
        } else {
            return None;
        };

        Some(Self { name, greedy })
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            AliasName::Short(c) => write!(f, "-{c}"),
            AliasName::Long(name) => write!(f, "--{name}"),
        }
    }
}

/// A named setting.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Setting {
    path: String,
    description: String,
    env: Option<String>,
    aliases: Vec<Alias>,
}

impl Setting {
    /// Start a setting for the dotted `path` (e.g. `"database.url"`).
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Self::default()
        }
    }

    /// Human-readable description shown in help output.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Bind an environment variable. An empty name is ignored.
    pub fn env(mut self, name: &str) -> Self {
        if !name.is_empty() {
            self.env = Some(name.to_string());
        }
        self
    }

    /// Add a command-line alias such as `-n`, `--name` or greedy `--name:`.
    /// Malformed aliases are dropped with a warning.
    pub fn alias(mut self, option: &str) -> Self {
        match Alias::parse(option) {
            Some(alias) => self.aliases.push(alias),
            None => warn!(path = %self.path, option, "Ignoring malformed option alias"),
        }
        self
    }

    /// Add several aliases at once.
    pub fn aliases<'a>(self, options: impl IntoIterator<Item = &'a str>) -> Self {
        options.into_iter().fold(self, Setting::alias)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn env_name(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn alias_list(&self) -> &[Alias] {
        &self.aliases
    }

    /// A setting is usable when it has a path and at least one source that
    /// can feed it: an environment variable or a command-line alias.
    fn is_registrable(&self) -> bool {
        !self.path.is_empty() && (self.env.is_some() || !self.aliases.is_empty())
    }
}

/// Ordered settings plus alias lookup tables and help metadata.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    settings: Vec<Setting>,
    short: HashMap<char, (usize, bool)>,
    long: HashMap<String, (usize, bool)>,
    description: String,
    examples: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a setting. Returns `false` (and registers nothing) when the
    /// setting has no path, or neither an env binding nor an alias.
    pub fn add(&mut self, setting: Setting) -> bool {
        if !setting.is_registrable() {
            debug!(path = %setting.path, "Rejecting setting without env binding or aliases");
            return false;
        }

        let index = self.settings.len();
        for alias in &setting.aliases {
            match &alias.name {
                AliasName::Short(c) => {
                    self.short.insert(*c, (index, alias.greedy));
                }
                AliasName::Long(name) => {
                    self.long.insert(name.clone(), (index, alias.greedy));
                }
            }
        }
        self.settings.push(setting);
        true
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn add_example(&mut self, example: &str) {
        self.examples.push(example.to_string());
    }

    pub fn settings(&self) -> &[Setting] {
        &self.settings
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Look up a short alias. Returns the setting and whether the alias is greedy.
    pub fn short(&self, c: char) -> Option<(&Setting, bool)> {
        self.short
            .get(&c)
            .map(|&(index, greedy)| (&self.settings[index], greedy))
    }

    /// Look up a long alias by name (without `--`).
    pub fn long(&self, name: &str) -> Option<(&Setting, bool)> {
        self.long
            .get(name)
            .map(|&(index, greedy)| (&self.settings[index], greedy))
    }
}
