//! The pattern registry: named parameter types, each a cast function
//! paired with a validating regular expression.
//!
//! Mirrors `original_source/sanic_routing/patterns.py`'s `REGEX_TYPES`
//! table, generalized into a type a caller can extend at runtime via
//! [`PatternRegistry::register`].

use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::RouterError;
use crate::value::{Date, Value};

/// A cast function: takes a raw captured segment and produces a typed
/// [`Value`], or fails with a message describing why the segment
/// doesn't fit the type. Cast failures are never fatal — see
/// `matcher.rs` — they just mean "this branch doesn't match".
pub type CastFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// Whether a pattern's capture is a plain single value, or needs the
/// two-part filename/extension post-processing described in spec.md
/// §4.2's ext-parameter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoClass {
    Plain,
    /// Filename-with-extension. `process` (in `route.rs`) splits the
    /// captured segment into a name and an extension and checks the
    /// extension against the declaration's allow-list, if any.
    Extension,
}

/// A single registered parameter type.
#[derive(Clone)]
pub struct ParamType {
    pub label: String,
    pub cast: CastFn,
    pub regex: Regex,
    pub info: InfoClass,
    /// 1-based index in the registry's declaration order at the time
    /// this entry was (last) inserted; `0` is reserved for unrecognized
    /// labels (see [`PatternRegistry::priority_of`]). Ties at a tree
    /// node break on this; see `tree.rs`.
    pub priority: usize,
}

impl std::fmt::Debug for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamType")
            .field("label", &self.label)
            .field("regex", &self.regex.as_str())
            .field("info", &self.info)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Named parameter types available to path declarations: built-ins
/// plus anything registered with [`PatternRegistry::register`].
#[derive(Clone, Debug)]
pub struct PatternRegistry {
    types: IndexMap<String, ParamType>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl PatternRegistry {
    /// A registry containing only the built-in labels from spec.md §4.1,
    /// in the order they're looked up for tie-breaking priority.
    ///
    /// Priorities start at `1`, not `0`: `0` is reserved for an
    /// unrecognized label (see [`PatternRegistry::priority_of`]), so it
    /// sorts after every registered type under `tree.rs`'s descending
    /// priority comparison instead of tying with the first-declared one.
    pub fn with_builtins() -> Self {
        let mut types = IndexMap::default();
        for (label, cast, regex, info) in builtins() {
            let regex = Regex::new(regex).expect("built-in pattern regex must compile");
            let priority = types.len() + 1;
            types.insert(
                label.to_string(),
                ParamType { label: label.to_string(), cast, regex, info, priority },
            );
        }
        PatternRegistry { types }
    }

    /// Registers (or overwrites) a named parameter type. Duplicate
    /// labels overwrite in place, keeping the original declaration-order
    /// priority (mirrors Python dict semantics, which the source relies
    /// on for its `REGEX_TYPES.keys().index(...)` priority lookup).
    pub fn register(
        &mut self,
        label: impl Into<String>,
        cast: CastFn,
        regex: &str,
    ) -> Result<(), RouterError> {
        let label = label.into();
        if label.is_empty() {
            return Err(RouterError::InvalidUsage("pattern label must not be empty".into()));
        }
        let compiled = Regex::new(regex)
            .map_err(|e| RouterError::InvalidUsage(format!("invalid pattern regex '{regex}': {e}")))?;

        if let Some(existing) = self.types.get(&label) {
            tracing::debug!(label = %label, "register_pattern overwrote an existing label");
            let priority = existing.priority;
            self.types.insert(
                label.clone(),
                ParamType { label: label.clone(), cast, regex: compiled, info: InfoClass::Plain, priority },
            );
        } else {
            let priority = self.types.len() + 1;
            self.types.insert(
                label.clone(),
                ParamType { label: label.clone(), cast, regex: compiled, info: InfoClass::Plain, priority },
            );
        }
        Ok(())
    }

    /// Looks up a label, transparently resolving the `string`/`number`
    /// deprecated aliases (spec.md §9 open question) and emitting a
    /// warning when one is used.
    pub fn get(&self, label: &str) -> Option<&ParamType> {
        match label {
            "string" => {
                tracing::warn!("path type 'string' is deprecated, use 'str' instead");
                self.types.get("str")
            }
            "number" => {
                tracing::warn!("path type 'number' is deprecated, use 'float' instead");
                self.types.get("float")
            }
            _ => self.types.get(label),
        }
    }

    /// Priority used to order tree siblings: the label's position in
    /// declaration order (1-based), or `0` for an unrecognized label.
    /// `tree.rs`'s sibling comparison sorts higher priority first, so
    /// `0` is what makes an unknown label sort last (spec.md §4.5 rule
    /// 3: "unknown label gets last").
    pub fn priority_of(&self, label: &str) -> usize {
        self.get(label).map(|t| t.priority).unwrap_or(0)
    }

    pub fn contains(&self, label: &str) -> bool {
        matches!(label, "string" | "number") || self.types.contains_key(label)
    }
}

fn builtins() -> Vec<(&'static str, CastFn, &'static str, InfoClass)> {
    vec![
        ("str", cast_str(), r"^[^/]+$", InfoClass::Plain),
        ("strorempty", cast_str(), r"^[^/]*$", InfoClass::Plain),
        ("slug", cast_slug(), r"^[a-z0-9]+(?:-[a-z0-9]+)*$", InfoClass::Plain),
        ("alpha", cast_alpha(), r"^[A-Za-z]+$", InfoClass::Plain),
        ("int", cast_int(), r"^-?\d+$", InfoClass::Plain),
        ("float", cast_float(), r"^-?(?:\d+(?:\.\d*)?|\.\d+)$", InfoClass::Plain),
        (
            "ymd",
            cast_ymd(),
            r"^[12]\d{3}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12]\d|3[01])$",
            InfoClass::Plain,
        ),
        (
            "uuid",
            cast_uuid(),
            r"^[A-Fa-f0-9]{8}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{4}-[A-Fa-f0-9]{12}$",
            InfoClass::Plain,
        ),
        ("ext", cast_str(), r"^[^/]+$", InfoClass::Extension),
        ("path", cast_path(), r"^[^/]?.*$", InfoClass::Plain),
    ]
}

fn cast_str() -> CastFn {
    Arc::new(|s: &str| Ok(Value::Str(s.to_string())))
}

fn cast_path() -> CastFn {
    Arc::new(|s: &str| Ok(Value::Path(s.to_string())))
}

fn cast_alpha() -> CastFn {
    Arc::new(|s: &str| {
        if s.chars().all(|c| c.is_ascii_alphabetic()) && !s.is_empty() {
            Ok(Value::Str(s.to_string()))
        } else {
            Err(format!("'{s}' contains non-alphabetic characters"))
        }
    })
}

fn cast_slug() -> CastFn {
    let re = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    Arc::new(move |s: &str| {
        if re.is_match(s) {
            Ok(Value::Str(s.to_string()))
        } else {
            Err(format!("'{s}' does not match the slug format"))
        }
    })
}

fn cast_int() -> CastFn {
    Arc::new(|s: &str| s.parse::<i64>().map(Value::Int).map_err(|e| e.to_string()))
}

fn cast_float() -> CastFn {
    Arc::new(|s: &str| s.parse::<f64>().map(Value::Float).map_err(|e| e.to_string()))
}

fn cast_ymd() -> CastFn {
    Arc::new(|s: &str| Date::parse(s).map(Value::Date))
}

fn cast_uuid() -> CastFn {
    Arc::new(|s: &str| uuid::Uuid::parse_str(s).map(Value::Uuid).map_err(|e| e.to_string()))
}
