//! Groups sibling [`Route`]s that share a path pattern under one tree
//! terminal node, each carrying its own method set, requirements, and
//! handler.
//!
//! Grounded on `original_source/sanic_routing/group.py`'s `RouteGroup`.

use crate::error::RouterError;
use crate::route::{ParamSlot, Route};

/// A non-empty collection of [`Route`]s that share the same canonical
/// `parts` and `strict` setting. Dispatch picks one member by method
/// and, among same-method candidates, by requirements (spec.md §4.8).
pub struct RouteGroup<H> {
    routes: Vec<Route<H>>,
}

impl<H> RouteGroup<H> {
    pub fn new(route: Route<H>) -> Self {
        RouteGroup { routes: vec![route] }
    }

    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    pub fn path(&self) -> &str {
        &self.routes[0].path
    }

    pub fn parts(&self) -> &[String] {
        &self.routes[0].parts
    }

    pub fn strict(&self) -> bool {
        self.routes[0].strict
    }

    pub fn unquote(&self) -> bool {
        self.routes[0].unquote
    }

    pub fn regex(&self) -> bool {
        self.routes[0].regex
    }

    pub fn static_(&self) -> bool {
        self.routes[0].static_
    }

    pub fn params(&self) -> &[ParamSlot] {
        &self.routes[0].params
    }

    pub fn whole_regex(&self) -> Option<&regex::Regex> {
        self.routes[0].whole_regex.as_ref()
    }

    /// All distinct methods registered across member routes.
    pub fn methods(&self) -> Vec<String> {
        let mut out: Vec<String> = self.routes.iter().flat_map(|r| r.methods.iter().cloned()).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Finds the member route matching `method`, preferring the most
    /// specific requirements match (spec.md §4.8): among routes
    /// registered for `method`, one whose `requirements` map is
    /// exactly equal to the dispatch-time `extra` map wins (mirrors
    /// `original_source/sanic_routing/tree.py`'s generated
    /// `if extra == reqs:` gate); a route with no requirements is the
    /// fallback.
    pub fn resolve_method<'a>(
        &'a self,
        method: &str,
        extra: &std::collections::BTreeMap<String, String>,
    ) -> Option<&'a Route<H>> {
        let mut fallback = None;
        for route in &self.routes {
            if !route.methods.contains(method) {
                continue;
            }
            if route.requirements.is_empty() {
                fallback = fallback.or(Some(route));
                continue;
            }
            if route.requirements == *extra {
                return Some(route);
            }
        }
        fallback
    }

    /// Adds `route` to this group, applying the same
    /// overwrite/append/requirements-conflict rules as a fresh `add()`
    /// (spec.md §4.4 step 6). `route` must already have been checked
    /// to share this group's `parts`/`strict`.
    pub fn push(
        &mut self,
        route: Route<H>,
        overwrite: bool,
        append: bool,
    ) -> Result<(), RouterError> {
        if self.strict() != route.strict {
            return Err(RouterError::InvalidUsage(format!(
                "cannot group routes with differing strictness at '{}'",
                self.path()
            )));
        }
        if !append {
            for existing in &self.routes {
                let overlaps_methods = existing.methods.iter().any(|m| route.methods.contains(m));
                let same_specificity = (existing.requirements.is_empty()
                    && route.requirements.is_empty())
                    || (!existing.requirements.is_empty() && !route.requirements.is_empty()
                        && existing.requirements == route.requirements);
                if overlaps_methods && same_specificity {
                    if overwrite {
                        continue;
                    }
                    return Err(RouterError::RouteExists {
                        path: route.path.clone(),
                        methods: route.methods.iter().cloned().collect::<Vec<_>>().join(","),
                    });
                }
            }
        }
        if overwrite {
            self.routes.retain(|existing| {
                !(existing.requirements == route.requirements
                    && existing.methods.iter().any(|m| route.methods.contains(m)))
            });
        }
        self.routes.push(route);
        Ok(())
    }

    /// Merges another group's routes into this one — used when a
    /// sub-router mounted under a prefix contributes a group whose
    /// `parts` coincide with one already present in the parent
    /// (spec.md §4.4's "merge" path). Strictness must match exactly;
    /// this is a stricter check than a fresh `add()`'s, since two
    /// independently built groups have no natural tie-breaker for a
    /// strictness mismatch.
    pub fn merge(&mut self, other: RouteGroup<H>, overwrite: bool, append: bool) -> Result<(), RouterError> {
        if self.strict() != other.strict() {
            return Err(RouterError::InvalidUsage(format!(
                "cannot merge routes with differing strictness at '{}'",
                self.path()
            )));
        }
        for route in other.routes {
            self.push(route, overwrite, append)?;
        }
        Ok(())
    }
}

impl<H> std::ops::Index<usize> for RouteGroup<H> {
    type Output = Route<H>;
    fn index(&self, idx: usize) -> &Route<H> {
        &self.routes[idx]
    }
}
