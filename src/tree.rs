//! Dotted-path insertion into the untyped value tree.
//!
//! Every source (command line, environment, defaults) deposits values at a
//! dotted path such as `"database.url"`. The path is expanded into nested
//! objects so the result can be deep-merged with the file layer.

use serde_json::{Map, Value};

/// Insert `value` at `dotted_path`, creating intermediate objects as needed.
///
/// `("database.url", "pg://")` becomes `{"database": {"url": "pg://"}}`.
///
/// An intermediate segment that currently holds a scalar is replaced by a new
/// object, so the last write wins at any depth. Empty segments are skipped
/// (`"a..b"` is `"a.b"`); a path with no segments inserts nothing.
pub fn insert(tree: &mut Map<String, Value>, dotted_path: &str, value: Value) {
    let segments: Vec<&str> = dotted_path.split('.').filter(|s| !s.is_empty()).collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let slot = current
            .entry(*segment)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }

    current.insert(leaf.to_string(), value);
}

/// Build a tree from `(dotted_path, value)` pairs. Later pairs win.
pub fn from_pairs<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut tree = Map::new();
    for (path, value) in pairs {
        insert(&mut tree, path.as_ref(), value);
    }
    tree
}
