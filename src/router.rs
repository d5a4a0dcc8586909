//! The public entry point: registers routes, finalizes them into a
//! decision tree, and resolves incoming paths against it.
//!
//! Grounded on `original_source/sanic_routing/router.py`'s
//! `BaseRouter`, with the OPEN/FINALIZED lifecycle it describes but
//! without the code-generation/`exec()` step — see `matcher.rs`.

use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::AHashMap;
use indexmap::{IndexMap, IndexSet};

use crate::error::RouterError;
use crate::group::RouteGroup;
use crate::matcher;
use crate::parser::{self, Segment};
use crate::patterns::{CastFn, PatternRegistry};
use crate::route::Route;
use crate::tree::{Tree, TreeNode};
use crate::value::Value;

/// The outcome of a successful [`Router::resolve`] call.
pub struct Resolved<H> {
    pub handler: H,
    pub params: AHashMap<String, Value>,
    pub name: Option<String>,
}

/// A decision-tree path router. `H` is the handler type attached to
/// each route; it must be `Clone` since a single registered route can
/// be returned from many concurrent resolutions.
pub struct Router<H: Clone> {
    delimiter: char,
    allowed_methods: Option<Vec<String>>,
    registry: PatternRegistry,
    finalized: bool,

    static_open: IndexMap<Vec<String>, RouteGroup<H>>,
    dynamic_open: IndexMap<Vec<String>, RouteGroup<H>>,
    regex_open: IndexMap<Vec<String>, RouteGroup<H>>,

    static_finalized: AHashMap<Vec<String>, Rc<RouteGroup<H>>>,
    tree: Tree<H>,

    name_index: AHashMap<String, Vec<String>>,
}

impl<H: Clone> Router<H> {
    /// The method assumed for a route registered without an explicit
    /// method set.
    pub const DEFAULT_METHOD: &'static str = "GET";

    /// A router with the built-in pattern registry, restricted by
    /// default to the nine HTTP/1.1 request methods (mirrors
    /// `original_source/router.py`'s `BaseRouter.ALLOWED_METHODS`,
    /// populated by a concrete router subclass rather than left open by
    /// the base class). Use [`Router::unrestricted`] to accept any
    /// method string unchecked, or [`Router::with_allowed_methods`] for
    /// a narrower or differently-shaped set.
    pub fn new(delimiter: char) -> Self {
        let mut router = Self::with_registry(delimiter, PatternRegistry::with_builtins());
        router.allowed_methods = Some(
            ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "CONNECT", "TRACE"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        router
    }

    /// A router that accepts any method string unchecked, bypassing the
    /// [`RouterError::BadMethod`] check `add()` otherwise applies.
    pub fn unrestricted(delimiter: char) -> Self {
        let mut router = Self::with_registry(delimiter, PatternRegistry::with_builtins());
        router.allowed_methods = None;
        router
    }

    pub fn with_registry(delimiter: char, registry: PatternRegistry) -> Self {
        Router {
            delimiter,
            allowed_methods: None,
            registry,
            finalized: false,
            static_open: IndexMap::default(),
            dynamic_open: IndexMap::default(),
            regex_open: IndexMap::default(),
            static_finalized: AHashMap::default(),
            tree: Tree::new(),
            name_index: AHashMap::default(),
        }
    }

    /// A router restricted to `methods` — `add()` rejects any other
    /// method with [`RouterError::BadMethod`].
    pub fn with_allowed_methods(delimiter: char, methods: Vec<String>) -> Self {
        let mut router = Self::with_registry(delimiter, PatternRegistry::with_builtins());
        router.allowed_methods = Some(methods);
        router
    }

    /// `GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS` — a conventional
    /// CRUD-ish subset for callers who want a narrower restricted set
    /// than `Router::new()`'s own default (e.g. excluding `TRACE` and
    /// `CONNECT`) without spelling it out by hand.
    pub fn standard_http_methods() -> Vec<String> {
        ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Registers a custom parameter type (spec.md §4.1). Rejected after
    /// `finalize()`.
    pub fn register_pattern(
        &mut self,
        label: impl Into<String>,
        cast: CastFn,
        regex: &str,
    ) -> Result<(), RouterError> {
        if self.finalized {
            return Err(RouterError::FinalizationError(
                "cannot register a pattern after finalize()".into(),
            ));
        }
        self.registry.register(label, cast, regex)
    }

    /// Registers a path pattern. See spec.md §4.4 for the full
    /// add-time algorithm this mirrors.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        path: &str,
        handler: H,
        methods: Option<&[&str]>,
        name: Option<&str>,
        requirements: BTreeMap<String, String>,
        strict: bool,
        unquote: bool,
        overwrite: bool,
        append: bool,
    ) -> Result<(), RouterError> {
        if self.finalized {
            return Err(RouterError::FinalizationError("cannot add a route after finalize()".into()));
        }
        if overwrite && append {
            return Err(RouterError::InvalidUsage(
                "overwrite and append cannot both be true".into(),
            ));
        }

        let methods: IndexSet<String> = match methods {
            Some(ms) if !ms.is_empty() => ms.iter().map(|m| m.to_uppercase()).collect(),
            _ => {
                let mut set = IndexSet::new();
                set.insert(Self::DEFAULT_METHOD.to_string());
                set
            }
        };

        if let Some(allowed) = &self.allowed_methods {
            let bad: Vec<String> = methods.iter().filter(|m| !allowed.contains(m)).cloned().collect();
            if !bad.is_empty() {
                return Err(RouterError::BadMethod { method: bad.join(","), allowed: allowed.clone() });
            }
        }

        let static_candidate = !path.contains('<') && requirements.is_empty();
        let template = Route::<H>::parse(path, self.delimiter, strict, unquote, requirements, &self.registry)?;
        let is_regex = template.regex;
        let route = template.into_route(methods, name.map(str::to_string), handler);
        let key = route.parts.clone();

        if static_candidate && !is_regex {
            if let Some(mut existing) = self.dynamic_open.shift_remove(&key) {
                existing.push(route, overwrite, append)?;
                self.dynamic_open.insert(key.clone(), existing);
            } else if let Some(existing) = self.static_open.get_mut(&key) {
                existing.push(route, overwrite, append)?;
            } else {
                self.static_open.insert(key.clone(), RouteGroup::new(route));
            }
        } else {
            let target = if is_regex { &mut self.regex_open } else { &mut self.dynamic_open };
            if let Some(mut existing) = self.static_open.shift_remove(&key) {
                existing.push(route, overwrite, append)?;
                target.insert(key.clone(), existing);
            } else if let Some(existing) = target.get_mut(&key) {
                existing.push(route, overwrite, append)?;
            } else {
                target.insert(key.clone(), RouteGroup::new(route));
            }
        }

        if let Some(name) = name {
            self.name_index.insert(name.to_string(), key);
        }
        Ok(())
    }

    /// Merges another (already-open) router's routes into this one,
    /// e.g. when mounting a sub-router under a prefix (spec.md §4.4).
    pub fn merge(&mut self, other: Router<H>, overwrite: bool, append: bool) -> Result<(), RouterError> {
        if self.finalized || other.finalized {
            return Err(RouterError::FinalizationError(
                "cannot merge a finalized router; merge before finalize()".into(),
            ));
        }
        for (key, group) in other.static_open {
            merge_into(&mut self.static_open, key, group, overwrite, append)?;
        }
        for (key, group) in other.dynamic_open {
            merge_into(&mut self.dynamic_open, key, group, overwrite, append)?;
        }
        for (key, group) in other.regex_open {
            merge_into(&mut self.regex_open, key, group, overwrite, append)?;
        }
        self.name_index.extend(other.name_index);
        Ok(())
    }

    /// Builds the decision tree from every dynamic/regex route
    /// registered so far, and locks the router against further
    /// mutation (spec.md §4.6's OPEN → FINALIZED transition).
    pub fn finalize(&mut self) -> Result<(), RouterError> {
        if self.finalized {
            return Err(RouterError::FinalizationError("cannot finalize a router more than once".into()));
        }
        if self.static_open.is_empty() && self.dynamic_open.is_empty() && self.regex_open.is_empty() {
            return Err(RouterError::FinalizationError("cannot finalize a router with no routes defined".into()));
        }

        let mut tree = Tree::new();
        for (_, group) in std::mem::take(&mut self.dynamic_open) {
            tree.insert(Rc::new(group), &self.registry);
        }
        for (_, group) in std::mem::take(&mut self.regex_open) {
            tree.insert(Rc::new(group), &self.registry);
        }
        tree.finalize();
        self.tree = tree;

        for (key, group) in std::mem::take(&mut self.static_open) {
            self.static_finalized.insert(key, Rc::new(group));
        }

        self.finalized = true;
        Ok(())
    }

    /// Reverses `finalize()`, returning the router to the OPEN state
    /// so routes can be added again (spec.md §4.6).
    pub fn reset(&mut self) -> Result<(), RouterError> {
        if !self.finalized {
            return Err(RouterError::FinalizationError(
                "cannot reset a router that has not been finalized".into(),
            ));
        }
        self.finalized = false;

        let old_tree = std::mem::replace(&mut self.tree, Tree::new());
        for rc in drain_groups(old_tree.root) {
            let group = Rc::try_unwrap(rc)
                .unwrap_or_else(|_| panic!("tree uniquely owns its terminal route groups"));
            let key = group.parts().to_vec();
            if group.regex() {
                self.regex_open.insert(key, group);
            } else {
                self.dynamic_open.insert(key, group);
            }
        }
        for (key, rc) in std::mem::take(&mut self.static_finalized) {
            let group = Rc::try_unwrap(rc)
                .unwrap_or_else(|_| panic!("static routes are uniquely owned outside the tree"));
            self.static_open.insert(key, group);
        }
        Ok(())
    }

    /// Resolves `path` for `method`, with no extra requirements
    /// context (spec.md §4.7).
    pub fn resolve(&self, path: &str, method: &str) -> Result<Resolved<H>, RouterError> {
        self.resolve_with_requirements(path, method, &BTreeMap::new())
    }

    /// Resolves `path` for `method`, breaking ties between
    /// requirements-qualified routes in the same group using `extra`
    /// (spec.md §4.8).
    pub fn resolve_with_requirements(
        &self,
        path: &str,
        method: &str,
        extra: &BTreeMap<String, String>,
    ) -> Result<Resolved<H>, RouterError> {
        if !self.finalized {
            return Err(RouterError::FinalizationError("cannot resolve before finalize()".into()));
        }
        self.resolve_inner(path, method, extra, None)
    }

    fn resolve_inner(
        &self,
        path: &str,
        method: &str,
        extra: &BTreeMap<String, String>,
        orig: Option<&str>,
    ) -> Result<Resolved<H>, RouterError> {
        match self.resolve_once(path, method, extra, orig) {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.is_dispatch_error() => {
                if orig.is_none() && path.ends_with(self.delimiter) {
                    let trimmed = &path[..path.len() - self.delimiter.len_utf8()];
                    return self.resolve_inner(trimmed, method, extra, Some(path));
                }
                Err(RouterError::NotFound { path: path.to_string() })
            }
            Err(e) => Err(e),
        }
    }

    fn resolve_once(
        &self,
        path: &str,
        method: &str,
        extra: &BTreeMap<String, String>,
        orig: Option<&str>,
    ) -> Result<Resolved<H>, RouterError> {
        let (group, params) =
            self.try_match(path).ok_or_else(|| RouterError::NotFound { path: path.to_string() })?;

        if group.strict() {
            if let Some(orig) = orig {
                if orig.chars().last() != group.path().chars().last() {
                    return Err(RouterError::NotFound { path: path.to_string() });
                }
            }
        }

        let route = group.resolve_method(method, extra).ok_or_else(|| RouterError::NoMethod {
            method: method.to_string(),
            allowed_methods: group.methods(),
        })?;

        Ok(Resolved { handler: route.handler.clone(), params, name: route.name.clone() })
    }

    fn try_match(&self, path: &str) -> Option<(Rc<RouteGroup<H>>, AHashMap<String, Value>)> {
        // A request path is parsed with the trailing-segment preserved
        // (`strict = true` here just means "don't drop it"): whether a
        // trailing delimiter should match depends on the route that's
        // eventually found, not on anything knowable at parse time. The
        // `/` vs no-`/` distinction is settled by an exact parts-tuple
        // match here and the trailing-delimiter retry in `resolve_inner`.
        let segments = parser::parse_path(path, self.delimiter, true).ok()?;
        let parts: Vec<String> = segments
            .iter()
            .map(|s| match s {
                Segment::Literal(t) => t.clone(),
                Segment::Param(p) => p.raw.clone(),
            })
            .collect();

        if let Some(group) = self.static_finalized.get(&parts) {
            return Some((group.clone(), AHashMap::default()));
        }

        let canonical_raw = parser::segments_to_path(&segments, self.delimiter);
        matcher::resolve(&self.tree, &parts, &canonical_raw).map(|m| (m.group, m.params))
    }
}

fn merge_into<H: Clone>(
    target: &mut IndexMap<Vec<String>, RouteGroup<H>>,
    key: Vec<String>,
    group: RouteGroup<H>,
    overwrite: bool,
    append: bool,
) -> Result<(), RouterError> {
    match target.shift_remove(&key) {
        Some(mut existing) => {
            existing.merge(group, overwrite, append)?;
            target.insert(key, existing);
        }
        None => {
            target.insert(key, group);
        }
    }
    Ok(())
}

/// Consumes a tree, collecting every terminal route group by value.
/// Used only by `reset()`, where the tree is the sole owner of each
/// `Rc<RouteGroup<H>>` it holds.
fn drain_groups<H>(node: TreeNode<H>) -> Vec<Rc<RouteGroup<H>>> {
    let mut out = Vec::new();
    if let Some(group) = node.group {
        out.push(group);
    }
    for (_, child) in node.children {
        out.extend(drain_groups(child));
    }
    out
}
