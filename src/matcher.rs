//! Walks a [`Tree`] against a split path as a recursive backtracking
//! interpreter, and casts whatever it captures into typed parameter
//! values.
//!
//! The teacher's and the original `sanic_routing`'s approach both
//! compile the tree into a generated `find_route` function body ahead
//! of time. That code-generation step is explicitly out of scope here
//! (see DESIGN.md) — this module walks the tree directly at dispatch
//! time instead, which is the idiomatic shape for a tree matcher that
//! doesn't need to touch a code generator at all.
//!
//! One wrinkle the direct walk has to handle that the generated code
//! handled implicitly: a `path`-typed (or otherwise delimiter-spanning)
//! parameter can capture more than one raw segment, while the tree
//! descends one segment at a time. A terminal node belonging to a
//! route in "regex mode" (`RouteGroup::regex() == true`) is allowed to
//! match as soon as descent reaches it — even with segments left over —
//! by testing the route's precompiled whole-path regex against the
//! full raw path string, rather than requiring `idx == num` the way an
//! ordinary terminal does.

use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::RouterError;
use crate::group::RouteGroup;
use crate::tree::{Tree, TreeNode};
use crate::value::Value;

/// The result of a successful tree walk: the matched group, plus the
/// typed parameter values captured along the way.
pub struct Matched<H> {
    pub group: Rc<RouteGroup<H>>,
    pub params: AHashMap<String, Value>,
}

/// Attempts to resolve `parts` (and the original `raw_path`, needed for
/// whole-path regex verification) against `tree`.
pub fn resolve<H>(tree: &Tree<H>, parts: &[String], raw_path: &str) -> Option<Matched<H>> {
    let num = parts.len();
    let mut captured: BTreeMap<usize, String> = BTreeMap::new();
    let node = walk(&tree.root, parts, 0, num, raw_path, &mut captured)?;
    let group = node.group.clone().expect("walk only returns nodes carrying a group");
    let params = build_params(&group, &captured, raw_path).ok()?;
    Some(Matched { group, params })
}

fn walk<'a, H>(
    node: &'a TreeNode<H>,
    parts: &[String],
    idx: usize,
    num: usize,
    raw_path: &str,
    captured: &mut BTreeMap<usize, String>,
) -> Option<&'a TreeNode<H>> {
    if idx < num {
        let seg = &parts[idx];
        for child in node.children.values() {
            let matches = if child.dynamic {
                child.pattern.as_ref().map(|p| p.is_match(seg)).unwrap_or(true)
            } else {
                child.part == *seg
            };
            if !matches {
                continue;
            }
            if child.dynamic {
                captured.insert(idx, seg.clone());
            }
            if let Some(found) = walk(child, parts, idx + 1, num, raw_path, captured) {
                return Some(found);
            }
            if child.dynamic {
                captured.remove(&idx);
            }
        }
    }

    if let Some(group) = &node.group {
        if idx == num && !group.regex() {
            return Some(node);
        }
        if group.regex() {
            if let Some(re) = group.whole_regex() {
                if re.is_match(raw_path) {
                    return Some(node);
                }
            }
        }
    }
    None
}

/// Casts captured raw segment text into typed [`Value`]s, handling the
/// filename/extension split for ext-parameters (spec.md §4.2).
///
/// For an ordinary (non-regex) group, raw values come from the
/// per-segment captures made during descent. For a regex-mode group,
/// descent captures are discarded in favor of re-deriving every
/// parameter directly from the whole-path regex's capture groups,
/// which alone knows the true bounds of a delimiter-spanning capture.
fn build_params<H>(
    group: &RouteGroup<H>,
    captured: &BTreeMap<usize, String>,
    raw_path: &str,
) -> Result<AHashMap<String, Value>, RouterError> {
    let mut out = AHashMap::default();
    let unquote = group.unquote();

    let raw_for_slot: Vec<Option<String>> = if group.regex() {
        let re = group.whole_regex().expect("regex group always has whole_regex");
        let caps = re
            .captures(raw_path)
            .ok_or_else(|| RouterError::NotFound { path: raw_path.to_string() })?;
        group
            .params()
            .iter()
            .enumerate()
            .map(|(i, _)| caps.get(i + 1).map(|m| m.as_str().to_string()))
            .collect()
    } else {
        group.params().iter().map(|p| captured.get(&p.idx).cloned()).collect()
    };

    for (slot, raw) in group.params().iter().zip(raw_for_slot) {
        let raw = raw.ok_or_else(|| RouterError::NotFound { path: raw_path.to_string() })?;
        let raw = if unquote {
            percent_encoding::percent_decode_str(&raw).decode_utf8_lossy().into_owned()
        } else {
            raw
        };

        if let Some(ext) = &slot.ext {
            let (name_part, ext_part) = raw
                .rsplit_once('.')
                .ok_or_else(|| RouterError::NotFound { path: raw_path.to_string() })?;
            if !ext.allowed.is_empty() && !ext.allowed.iter().any(|e| e == ext_part) {
                return Err(RouterError::NotFound { path: raw_path.to_string() });
            }
            out.insert(slot.name.clone(), Value::Str(name_part.to_string()));
            out.insert("ext".to_string(), Value::Str(ext_part.to_string()));
            continue;
        }

        let value = (slot.cast)(&raw).map_err(|_| RouterError::NotFound { path: raw_path.to_string() })?;
        out.insert(slot.name.clone(), value);
    }

    Ok(out)
}
