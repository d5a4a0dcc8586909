//! A single registered path pattern: its parsed segments, resolved
//! parameter slots, and the methods/handlers attached to it.
//!
//! Grounded on `original_source/sanic_routing/route.py`'s `Route` and
//! `ParamInfo`, reshaped into an owned, type-checked Rust struct
//! instead of a mutable `defaultdict`-accumulated one.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use regex::Regex;

use crate::error::RouterError;
use crate::parser::{self, ExtDecl, Segment};
use crate::patterns::{CastFn, InfoClass, PatternRegistry};

/// One resolved `<name:label>` declaration, positioned at a segment
/// index within its route.
#[derive(Clone)]
pub struct ParamSlot {
    pub idx: usize,
    pub name: String,
    pub label: String,
    pub cast: CastFn,
    /// The validating regex for this segment: the registry's regex for
    /// a known label, or the declaration's own text treated as a raw
    /// pattern for an unrecognized one (spec.md §4.1's "unknown label"
    /// rule).
    pub pattern: Regex,
    /// Declaration-order priority, used to break tree sibling ties.
    pub priority: usize,
    /// `true` when `label` was not found in the registry — this slot's
    /// route is forced into regex mode (spec.md §4.5 rule governing
    /// the "combined tree" construction).
    pub unregistered: bool,
    /// `true` when this slot's declared pattern can itself span the
    /// path delimiter — either the built-in `path` label, or a custom
    /// regex body whose text contains the delimiter character. Such a
    /// slot is necessarily the last segment of its route (`Route::parse`
    /// rejects any other placement), and `tree.rs` skips this slot's own
    /// per-segment descent check for it (see `tree.rs::Tree::insert`):
    /// its `pattern`, tested one raw segment at a time, can never match
    /// text that's supposed to span several of them.
    pub spans_delimiter: bool,
    pub ext: Option<ExtDecl>,
}

impl std::fmt::Debug for ParamSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSlot")
            .field("idx", &self.idx)
            .field("name", &self.name)
            .field("label", &self.label)
            .field("priority", &self.priority)
            .field("unregistered", &self.unregistered)
            .field("spans_delimiter", &self.spans_delimiter)
            .finish()
    }
}

/// A single registered route: one path pattern, one set of HTTP
/// methods, and the handler they dispatch to.
#[derive(Clone)]
pub struct Route<H> {
    /// Canonical, percent-encoded path string.
    pub path: String,
    /// Canonical segment text (literal or verbatim parameter
    /// declaration) — the grouping and tree-identity key.
    pub parts: Vec<String>,
    pub strict: bool,
    pub unquote: bool,
    /// `true` when the path contains no parameter declarations.
    pub static_: bool,
    /// `true` when any parameter slot carries an unrecognized label or
    /// a multi-segment-spanning type (`path`) — such a route is placed
    /// in the combined dynamic/regex tree and verified, on reaching its
    /// terminal node, against [`Route::whole_regex`] instead of relying
    /// solely on per-segment tests (see `matcher.rs`).
    pub regex: bool,
    pub params: Vec<ParamSlot>,
    pub methods: IndexSet<String>,
    pub requirements: BTreeMap<String, String>,
    pub name: Option<String>,
    pub handler: H,
    /// Precompiled whole-path regex, present only when `regex` is
    /// `true`. Anchored, one capture group per parameter slot in
    /// segment order.
    pub whole_regex: Option<Regex>,
}

impl<H> Route<H> {
    /// Parses `raw_path` and resolves its parameter declarations
    /// against `registry`, producing an unpopulated route (no methods,
    /// no handler yet — those are layered on by `RouteGroup`/`Router`).
    pub fn parse(
        raw_path: &str,
        delimiter: char,
        strict: bool,
        unquote: bool,
        requirements: BTreeMap<String, String>,
        registry: &PatternRegistry,
    ) -> Result<RouteTemplate, RouterError> {
        let segments = parser::parse_path(raw_path, delimiter, strict)?;
        let path = parser::segments_to_path(&segments, delimiter);
        let parts: Vec<String> = segments
            .iter()
            .map(|s| match s {
                Segment::Literal(t) => t.clone(),
                Segment::Param(p) => p.raw.clone(),
            })
            .collect();

        let static_ = segments.iter().all(|s| matches!(s, Segment::Literal(_)));
        let mut params = Vec::new();
        let mut seen_names: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut regex = false;

        for (idx, seg) in segments.iter().enumerate() {
            let Segment::Param(decl) = seg else { continue };
            if !seen_names.insert(decl.name.clone()) {
                return Err(RouterError::ParameterNameConflicts {
                    path: path.clone(),
                    name: decl.name.clone(),
                });
            }

            let (cast, pattern, priority, unregistered) = match registry.get(&decl.label) {
                Some(t) => (t.cast.clone(), t.regex.clone(), t.priority, t.info == InfoClass::Extension),
                None => {
                    let custom = Regex::new(&decl.label).map_err(|e| {
                        RouterError::InvalidUsage(format!(
                            "unknown path type '{}' is not a valid fallback regex: {e}",
                            decl.label
                        ))
                    })?;
                    // A body with its own capturing group(s) desynchronizes
                    // `build_whole_regex`'s positional group-per-param
                    // mapping for every slot after it (spec.md §4.3).
                    if custom.captures_len() > 1 {
                        return Err(RouterError::InvalidUsage(format!(
                            "custom path type '{}' must not contain capturing groups",
                            decl.label
                        )));
                    }
                    let fallback_cast: CastFn =
                        std::sync::Arc::new(|s: &str| Ok(crate::value::Value::Str(s.to_string())));
                    (fallback_cast, custom, registry.priority_of(&decl.label), true)
                }
            };

            let spans_delimiter =
                decl.label == "path" || (unregistered && decl.label.contains(delimiter));
            if spans_delimiter || unregistered {
                regex = true;
            }
            if spans_delimiter && idx != segments.len() - 1 {
                return Err(RouterError::InvalidUsage(format!(
                    "delimiter-spanning parameter '{}' must be the last segment of '{}'",
                    decl.name, path
                )));
            }

            params.push(ParamSlot {
                idx,
                name: decl.name.clone(),
                label: decl.label.clone(),
                cast,
                pattern,
                priority,
                unregistered,
                spans_delimiter,
                ext: decl.ext.clone(),
            });
        }

        let whole_regex = if regex {
            Some(build_whole_regex(&segments, delimiter, registry)?)
        } else {
            None
        };

        Ok(RouteTemplate { path, parts, static_, strict, unquote, regex, params, requirements, whole_regex })
    }
}

/// The parsed, registry-resolved shape of a route, before a method set
/// and handler are attached to turn it into a [`Route`].
pub struct RouteTemplate {
    pub path: String,
    pub parts: Vec<String>,
    pub static_: bool,
    pub strict: bool,
    pub unquote: bool,
    pub regex: bool,
    pub params: Vec<ParamSlot>,
    pub requirements: BTreeMap<String, String>,
    pub whole_regex: Option<Regex>,
}

impl RouteTemplate {
    pub fn into_route<H>(self, methods: IndexSet<String>, name: Option<String>, handler: H) -> Route<H> {
        Route {
            path: self.path,
            parts: self.parts,
            strict: self.strict,
            unquote: self.unquote,
            static_: self.static_,
            regex: self.regex,
            params: self.params,
            methods,
            requirements: self.requirements,
            name,
            handler,
            whole_regex: self.whole_regex,
        }
    }
}

/// Builds the anchored whole-path regex used to verify a regex-tree
/// route once per-segment descent reaches its terminal node. One
/// capture group per parameter, in path order.
///
/// A `path`-typed segment captures everything through the end of the
/// string. An unregistered (custom raw-regex) label is embedded
/// verbatim as its own capture body — it's the only validation that
/// segment ever gets when its route is in regex mode (descent can
/// still check it per-segment along the way, but when the label spans
/// the delimiter itself, like `<bar:[a-z]+/[0-9]+>`, descent never
/// reaches a node for the second half at all, so the whole-path regex
/// is the sole place that constraint is enforced). A known registered
/// type keeps the generic `[^delimiter]+` placeholder here since its
/// real validation happens through `ParamSlot::cast` after capture.
///
/// `matcher::build_params` maps capture groups to parameter slots
/// purely by position, so every custom body spliced in here must
/// contribute exactly one capturing group — `Route::parse` rejects a
/// label whose compiled regex reports more than one before this
/// function ever runs.
fn build_whole_regex(segments: &[Segment], delimiter: char, registry: &PatternRegistry) -> Result<Regex, RouterError> {
    let mut pattern = String::from("^");
    let mut first = true;
    for seg in segments {
        if !first {
            pattern.push_str(&regex::escape(&delimiter.to_string()));
        }
        first = false;
        match seg {
            Segment::Literal(t) => pattern.push_str(&regex::escape(t)),
            Segment::Param(p) => {
                if p.label == "path" {
                    pattern.push_str("(.*)");
                } else if registry.contains(&p.label) {
                    pattern.push('(');
                    pattern.push_str(&format!("[^{}]+", regex::escape(&delimiter.to_string())));
                    pattern.push(')');
                } else {
                    pattern.push('(');
                    pattern.push_str(&p.label);
                    pattern.push(')');
                }
            }
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
        .map_err(|e| RouterError::InvalidUsage(format!("failed to build route regex: {e}")))
}
