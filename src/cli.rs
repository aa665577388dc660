//! Command-line parsing against the setting registry.
//!
//! A single left-to-right pass over the arguments. Recognized aliases deposit
//! a value at their setting's dotted path; everything else is ignored. The
//! grammar:
//!
//! - `help`, or `-h` / `--help` when the registry has a description, as the
//!   first argument: stop and report [`Parsed::Help`].
//! - `--`: stop; all remaining arguments are ignored.
//! - `--name=value`: inline value. An empty inline value means `true`.
//! - `--name`: greedy aliases take the next argument verbatim; plain aliases
//!   take the next argument only if it does not start with `-`, otherwise
//!   they are `true`.
//! - `-abc`: a cluster of short aliases. Plain aliases are `true` while more
//!   characters follow. A greedy alias takes the rest of the cluster as its
//!   value. The last alias of the cluster may take the next argument, as in
//!   the long form. An unknown character ends the cluster.

use serde_json::{Map, Value};

use crate::registry::Registry;
use crate::tree;

const BYPASS: &str = "--";

/// Result of parsing the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    /// The user asked for usage information.
    Help,
    /// Values keyed by dotted path, expanded into a nested tree.
    Values(Map<String, Value>),
}

/// Parse `args` (without the program name) against `registry`.
pub fn parse<S: AsRef<str>>(args: &[S], registry: &Registry) -> Parsed {
    let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();

    if let Some(&first) = args.first()
        && is_help_request(first, registry)
    {
        return Parsed::Help;
    }

    let mut out = Map::new();
    let mut cursor = Cursor { args: &args, next: 0 };

    while let Some(arg) = cursor.advance() {
        if arg == BYPASS {
            break;
        }
        if let Some(long) = arg.strip_prefix("--") {
            parse_long(long, &mut cursor, registry, &mut out);
        } else if let Some(cluster) = arg.strip_prefix('-') {
            parse_short(cluster, &mut cursor, registry, &mut out);
        }
    }

    Parsed::Values(out)
}

fn is_help_request(first: &str, registry: &Registry) -> bool {
    match first {
        "help" => true,
        "-h" | "--help" => !registry.description().is_empty(),
        _ => false,
    }
}

struct Cursor<'a> {
    args: &'a [&'a str],
    next: usize,
}

impl<'a> Cursor<'a> {
    fn advance(&mut self) -> Option<&'a str> {
        let arg = self.args.get(self.next).copied();
        if arg.is_some() {
            self.next += 1;
        }
        arg
    }

    /// Value for an alias that ended its token. Greedy aliases swallow the
    /// next argument whatever it looks like, except the bypass separator.
    /// Plain aliases only take a next argument that is not itself a flag.
    fn take_value(&mut self, greedy: bool) -> Value {
        match self.args.get(self.next).copied() {
            Some(next) if next != BYPASS && (greedy || !next.starts_with('-')) => {
                self.next += 1;
                Value::String(next.to_string())
            }
            _ => Value::Bool(true),
        }
    }
}

fn parse_long(long: &str, cursor: &mut Cursor<'_>, registry: &Registry, out: &mut Map<String, Value>) {
    let (name, inline) = match long.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (long, None),
    };
    let Some((setting, greedy)) = registry.long(name) else {
        return;
    };

    let value = match inline {
        Some("") => Value::Bool(true),
        Some(value) => Value::String(value.to_string()),
        None => cursor.take_value(greedy),
    };
    tree::insert(out, setting.path(), value);
}

fn parse_short(cluster: &str, cursor: &mut Cursor<'_>, registry: &Registry, out: &mut Map<String, Value>) {
    for (pos, c) in cluster.char_indices() {
        let Some((setting, greedy)) = registry.short(c) else {
            break;
        };
        let rest = &cluster[pos + c.len_utf8()..];

        if greedy {
            let value = if rest.is_empty() {
                cursor.take_value(true)
            } else {
                Value::String(rest.to_string())
            };
            tree::insert(out, setting.path(), value);
            break;
        }

        let value = if rest.is_empty() {
            cursor.take_value(false)
        } else {
            Value::Bool(true)
        };
        tree::insert(out, setting.path(), value);
    }
}
