//! Binding a merged tree onto a typed destination.
//!
//! A destination type describes its fields once, through [`Bind::schema`]:
//!
//! ```ignore
//! impl Bind for AppConfig {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field("name", |c: &mut Self| &mut c.name)
//!             .field("port", |c: &mut Self| &mut c.port)
//!             .nested("database", |c: &mut Self| &mut c.database)
//!             .embed(|c: &mut Self| &mut c.common)
//!     }
//! }
//! ```
//!
//! - `field` binds a leaf whose type implements [`Castable`].
//! - `nested` binds a sub-structure under its own key; it is only entered when
//!   the tree holds an object at that key.
//! - `embed` lifts the fields of a sub-structure into this level. If an
//!   embedded key collides with one declared on the outer type, the outer one
//!   wins regardless of registration order.
//!
//! Members that are not registered (locks, loggers, callbacks, secrets) are
//! never touched.
//!
//! Keys are matched case-sensitively first, then ignoring ASCII case. Values
//! that cannot be coerced to the field type are skipped and the field keeps
//! its previous value.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// A destination type with a binding schema.
pub trait Bind: Sized + 'static {
    fn schema() -> Schema<Self>;
}

/// Bind `tree` onto `target` in place. Returns how many fields were assigned.
pub fn to<T: Bind>(target: &mut T, tree: &Map<String, Value>) -> usize {
    T::schema().bind(target, tree)
}

/// Coerce `tree` against `T`'s schema without touching any instance.
///
/// The result holds, under each field's key, the value that binding would
/// store. Unknown keys and values that fail coercion are left out.
pub fn cast<T: Bind>(tree: &Map<String, Value>) -> Map<String, Value> {
    T::schema().cast(tree)
}

/// Conversion from a loosely typed tree value into a concrete field type.
pub trait Castable: Serialize + Sized {
    /// `None` when `value` does not fit the type.
    fn cast(value: &Value) -> Option<Self>;
}

impl Castable for bool {
    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) => parse_bool(s),
            _ => None,
        }
    }
}

/// The usual boolean literals: `1 t T TRUE true True` and `0 f F FALSE false False`.
fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// A JSON number, or a string that parses as a float.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

macro_rules! castable_int {
    ($($ty:ty),*) => {$(
        impl Castable for $ty {
            fn cast(value: &Value) -> Option<Self> {
                if let Value::Number(n) = value {
                    if let Some(i) = n.as_i64() {
                        return <$ty>::try_from(i).ok();
                    }
                    if let Some(u) = n.as_u64() {
                        return <$ty>::try_from(u).ok();
                    }
                }
                if let Value::String(s) = value
                    && let Ok(i) = s.parse::<i128>()
                {
                    return <$ty>::try_from(i).ok();
                }
                // MAX + 1.0 is a power of two, so the upper bound is exact.
                let f = number(value)?;
                if f.fract() != 0.0 || f < <$ty>::MIN as f64 || f >= <$ty>::MAX as f64 + 1.0 {
                    return None;
                }
                Some(f as $ty)
            }
        }
    )*};
}

castable_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Castable for f64 {
    fn cast(value: &Value) -> Option<Self> {
        number(value).filter(|f| f.is_finite())
    }
}

impl Castable for f32 {
    fn cast(value: &Value) -> Option<Self> {
        f64::cast(value)
            .filter(|f| f.abs() <= f32::MAX as f64)
            .map(|f| f as f32)
    }
}

impl Castable for String {
    fn cast(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl Castable for PathBuf {
    fn cast(value: &Value) -> Option<Self> {
        value.as_str().map(PathBuf::from)
    }
}

impl Castable for Value {
    fn cast(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: Castable> Castable for Option<T> {
    fn cast(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::cast(other).map(Some),
        }
    }
}

impl<T: Castable> Castable for Vec<T> {
    fn cast(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::cast).collect()
    }
}

type Assign<T> = Arc<dyn Fn(&mut T, &Value) -> bool + Send + Sync>;

struct FieldSpec<T> {
    key: &'static str,
    /// 0 for fields declared on `T`, +1 per level of embedding.
    depth: usize,
    assign: Assign<T>,
    preview: fn(&Value) -> Option<Value>,
}

/// The binding table for a destination type.
pub struct Schema<T> {
    fields: Vec<FieldSpec<T>>,
}

impl<T: 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Schema<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Bind the leaf at `key` to the member returned by `get`.
    pub fn field<V: Castable + 'static>(mut self, key: &'static str, get: fn(&mut T) -> &mut V) -> Self {
        let assign: Assign<T> = Arc::new(move |target: &mut T, value: &Value| match V::cast(value) {
            Some(v) => {
                *get(target) = v;
                true
            }
            None => false,
        });
        self.push(FieldSpec {
            key,
            depth: 0,
            assign,
            preview: preview_leaf::<V>,
        });
        self
    }

    /// Bind the object at `key` onto the sub-structure returned by `get`.
    pub fn nested<U: Bind>(mut self, key: &'static str, get: fn(&mut T) -> &mut U) -> Self {
        let assign: Assign<T> = Arc::new(move |target: &mut T, value: &Value| match value {
            Value::Object(tree) => {
                U::schema().bind(get(target), tree);
                true
            }
            _ => false,
        });
        self.push(FieldSpec {
            key,
            depth: 0,
            assign,
            preview: preview_nested::<U>,
        });
        self
    }

    /// Lift every field of the sub-structure returned by `get` into this level.
    pub fn embed<U: Bind>(mut self, get: fn(&mut T) -> &mut U) -> Self {
        for inner in U::schema().fields {
            let inner_assign = inner.assign;
            let assign: Assign<T> =
                Arc::new(move |target: &mut T, value: &Value| inner_assign(get(target), value));
            self.push(FieldSpec {
                key: inner.key,
                depth: inner.depth + 1,
                assign,
                preview: inner.preview,
            });
        }
        self
    }

    /// Keys bound at this level, in registration order (embedded keys included).
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    /// Assign every matching value in `tree` to `target`. Returns the count.
    pub fn bind(&self, target: &mut T, tree: &Map<String, Value>) -> usize {
        let mut assigned = 0;
        for field in &self.fields {
            let Some(value) = lookup(tree, field.key) else {
                continue;
            };
            if (field.assign)(target, value) {
                assigned += 1;
            } else {
                debug!(key = field.key, %value, "Skipping value that does not fit its field");
            }
        }
        assigned
    }

    /// Coerce every matching value in `tree` without assigning it.
    pub fn cast(&self, tree: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for field in &self.fields {
            if let Some(value) = lookup(tree, field.key).and_then(field.preview) {
                out.insert(field.key.to_string(), value);
            }
        }
        out
    }

    /// Shallower fields shadow deeper ones with the same key; at equal depth
    /// the first registration stays.
    fn push(&mut self, field: FieldSpec<T>) {
        match self.fields.iter().position(|f| f.key == field.key) {
            Some(i) if field.depth < self.fields[i].depth => self.fields[i] = field,
            Some(_) => {}
            None => self.fields.push(field),
        }
    }
}

fn lookup<'a>(tree: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    tree.get(key).or_else(|| {
        tree.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn preview_leaf<V: Castable>(value: &Value) -> Option<Value> {
    V::cast(value).and_then(|v| serde_json::to_value(v).ok())
}

fn preview_nested<U: Bind>(value: &Value) -> Option<Value> {
    value.as_object().map(|tree| Value::Object(U::schema().cast(tree)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Composite, MockConfig};
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    // --- Castable ---

    #[test]
    fn bool_from_literals() {
        for s in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(bool::cast(&json!(s)), Some(true), "{s}");
        }
        for s in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(bool::cast(&json!(s)), Some(false), "{s}");
        }
        assert_eq!(bool::cast(&json!("yes")), None);
        assert_eq!(bool::cast(&json!(1)), None);
        assert_eq!(bool::cast(&json!(true)), Some(true));
    }

    #[test]
    fn floats_from_numbers_and_strings() {
        assert_eq!(f64::cast(&json!(15.9)), Some(15.9));
        assert_eq!(f64::cast(&json!("15.9")), Some(15.9));
        assert_eq!(f64::cast(&json!(" 2 ")), None);
        assert_eq!(f64::cast(&json!("banana")), None);
        assert_eq!(f64::cast(&json!("inf")), None);
        assert_eq!(f32::cast(&json!("15.9")), Some(15.9f32));
        assert_eq!(f32::cast(&json!(true)), None);
    }

    #[test]
    fn integers_require_integral_in_range_values() {
        assert_eq!(i32::cast(&json!(123)), Some(123));
        assert_eq!(i32::cast(&json!("42")), Some(42));
        assert_eq!(i32::cast(&json!(42.0)), Some(42));
        assert_eq!(i32::cast(&json!("4.5")), None);
        assert_eq!(u8::cast(&json!(256)), None);
        assert_eq!(u16::cast(&json!(-1)), None);
        assert_eq!(u64::cast(&json!(u64::MAX)), Some(u64::MAX));
        assert_eq!(i64::cast(&json!(i64::MIN)), Some(i64::MIN));
        assert_eq!(usize::cast(&json!("1e3")), Some(1000));
    }

    #[test]
    fn integers_just_past_the_range_are_rejected() {
        assert_eq!(u64::cast(&json!("18446744073709551616")), None);
        assert_eq!(u64::cast(&json!(18446744073709551616.0)), None);
        assert_eq!(i64::cast(&json!("9223372036854775808")), None);
        assert_eq!(i64::cast(&json!(9223372036854775808.0)), None);
        assert_eq!(i64::cast(&json!("-9223372036854775809")), None);
        assert_eq!(u8::cast(&json!("256")), None);
        assert_eq!(u8::cast(&json!(255.0)), Some(255));
    }

    #[test]
    fn integer_strings_keep_full_precision() {
        assert_eq!(u64::cast(&json!("18446744073709551615")), Some(u64::MAX));
        assert_eq!(i64::cast(&json!("-9223372036854775808")), Some(i64::MIN));
        assert_eq!(u64::cast(&json!("9007199254740993")), Some(9_007_199_254_740_993));
    }

    #[test]
    fn numeric_strings_are_not_trimmed() {
        assert_eq!(i32::cast(&json!(" 42")), None);
        assert_eq!(f32::cast(&json!("1.5 ")), None);
    }

    #[test]
    fn strings_only_from_strings() {
        assert_eq!(String::cast(&json!("x")), Some("x".to_string()));
        assert_eq!(String::cast(&json!(1)), None);
        assert_eq!(String::cast(&json!(true)), None);
        assert_eq!(PathBuf::cast(&json!("/etc/app")), Some(PathBuf::from("/etc/app")));
    }

    #[test]
    fn options_and_vectors() {
        assert_eq!(Option::<u16>::cast(&Value::Null), Some(None));
        assert_eq!(Option::<u16>::cast(&json!("80")), Some(Some(80)));
        assert_eq!(Option::<u16>::cast(&json!("x")), None);
        assert_eq!(Vec::<u8>::cast(&json!([1, "2", 3])), Some(vec![1, 2, 3]));
        assert_eq!(Vec::<u8>::cast(&json!([1, "x"])), None);
        assert_eq!(Vec::<u8>::cast(&json!("1,2")), None);
    }

    // --- Schema::bind ---

    #[test]
    fn binds_with_exact_then_case_insensitive_keys() {
        let mut c = MockConfig::default();
        let tree = obj(json!({
            "number": 15.9,
            "Number": "banana",
            "name": "hammock",
            "Boolean": true,
            "extra": "pay me no mind",
            "named": {"Data": 123},
        }));
        to(&mut c, &tree);
        assert_eq!(c.number, 15.9f32);
        assert_eq!(c.name, "hammock");
        assert!(c.boolean);
        assert_eq!(c.named.data, 123);
    }

    #[test]
    fn string_values_are_coerced() {
        let mut c = MockConfig::default();
        let tree = obj(json!({
            "name": "casey",
            "number": "15.9",
            "boolean": "true",
            "named": {"data": "42"},
        }));
        assert_eq!(to(&mut c, &tree), 4);
        assert_eq!(c.number, 15.9f32);
        assert!(c.boolean);
        assert_eq!(c.named.data, 42);
    }

    #[test]
    fn failed_coercion_keeps_previous_value() {
        let mut c = MockConfig {
            number: 1.5,
            name: "casey".into(),
            ..MockConfig::default()
        };
        let tree = obj(json!({"number": "banana", "name": 7, "boolean": "maybe"}));
        assert_eq!(to(&mut c, &tree), 0);
        assert_eq!(c.number, 1.5);
        assert_eq!(c.name, "casey");
        assert!(!c.boolean);
    }

    #[test]
    fn outer_field_shadows_embedded_field() {
        let mut c = MockConfig::default();
        to(&mut c, &obj(json!({"conflict": "42"})));
        assert_eq!(c.conflict, "42");
        assert_eq!(c.composite.conflict, 0);
    }

    #[test]
    fn embedded_fields_bind_at_top_level() {
        let mut c = MockConfig::default();
        to(&mut c, &obj(json!({"implicit": 7, "Implicit": true})));
        assert_eq!(c.composite.tagged, 7);
        assert!(c.composite.implicit);
    }

    #[test]
    fn embedded_struct_binds_alone() {
        let mut inner = Composite::default();
        to(&mut inner, &obj(json!({"conflict": "42"})));
        assert_eq!(inner.conflict, 42);
    }

    #[test]
    fn unregistered_members_are_untouched() {
        let mut c = MockConfig::default();
        c.log.push("kept".into());
        let tree = obj(json!({"ignored": true, "log": ["overwritten"], "Ignored": "true"}));
        assert_eq!(to(&mut c, &tree), 0);
        assert!(!c.ignored);
        assert_eq!(c.log, vec!["kept".to_string()]);
    }

    #[test]
    fn nested_requires_an_object() {
        let mut c = MockConfig::default();
        c.named.data = 5;
        to(&mut c, &obj(json!({"named": 42})));
        assert_eq!(c.named.data, 5);
    }

    #[test]
    fn optional_field_accepts_null() {
        let mut c = MockConfig {
            nickname: Some("cas".into()),
            ..MockConfig::default()
        };
        to(&mut c, &obj(json!({"nickname": null})));
        assert_eq!(c.nickname, None);
    }

    #[test]
    fn schema_keys_reflect_shadowing() {
        let keys: Vec<&str> = MockConfig::schema().keys().collect();
        assert_eq!(keys.iter().filter(|k| **k == "conflict").count(), 1);
        assert!(keys.contains(&"implicit"));
        assert!(keys.contains(&"Implicit"));
        assert!(keys.contains(&"named"));
        assert!(!keys.contains(&"ignored"));
    }

    // --- Schema::cast ---

    #[test]
    fn cast_previews_coerced_values() {
        let tree = obj(json!({
            "name": "casey",
            "number": "15.9",
            "boolean": "true",
            "conflict": "42",
            "named": {"data": "42"},
            "extra": "dropped",
        }));
        let out = cast::<MockConfig>(&tree);
        assert_eq!(out["name"], "casey");
        assert_eq!(out["boolean"], true);
        assert_eq!(out["conflict"], "42");
        assert_eq!(out["named"], json!({"data": 42}));
        assert!(out["number"].is_f64());
        assert!(!out.contains_key("extra"));
    }

    #[test]
    fn cast_leaves_out_failures() {
        let out = cast::<MockConfig>(&obj(json!({"number": "banana", "boolean": 3})));
        assert!(out.is_empty());
    }

    // --- round trip ---

    #[test]
    fn bound_fields_survive_serialization() {
        let mut c = MockConfig::default();
        let tree = obj(json!({
            "name": "hammock",
            "conflict": "outer",
            "boolean": "t",
            "named": {"data": "9"},
            "implicit": 3,
            "number": "nope",
        }));
        to(&mut c, &tree);
        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["name"], "hammock");
        assert_eq!(back["conflict"], "outer");
        assert_eq!(back["boolean"], true);
        assert_eq!(back["named"]["data"], 9);
        assert_eq!(back["implicit"], 3);
        assert_eq!(back["number"], 0.0);
    }
}
