//! The decision tree built from the union of a router's dynamic and
//! regex route groups (spec.md §4.5).
//!
//! Grounded on `original_source/sanic_routing/tree.py`'s `Node`/`Tree`,
//! minus the source-code-generation step: `matcher.rs` walks this tree
//! directly as a recursive backtracking interpreter instead of
//! compiling it to a `find_route` function body.

use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;
use regex::Regex;

use crate::group::RouteGroup;
use crate::patterns::PatternRegistry;

/// One node in the decision tree. The root has an empty `part` and is
/// never itself a match target.
pub struct TreeNode<H> {
    pub part: String,
    /// The text compared at sibling-ordering rule 7 ("segment key" tie
    /// break). For a literal node this is `part` itself; for a dynamic
    /// node it is the parameter's bare name with the type annotation
    /// stripped (`<bar:int>` and `<bar>` both sort-key to `bar`) — the
    /// type itself is compared earlier, via `priority`. Two same-named
    /// declarations that differ only in type would otherwise tie-break
    /// on `part`'s raw text (which embeds the type) before priority
    /// ever gets a chance to run, silently undoing "higher type
    /// priority first".
    pub sort_key: String,
    pub dynamic: bool,
    /// Type priority used only for sibling ordering; `0` for a static
    /// node, a pattern's (1-based) declaration-order priority for a
    /// dynamic one. `0` is also what an unregistered label's slot
    /// carries, so it sorts last among dynamic siblings.
    pub priority: usize,
    /// The validating regex for a dynamic node's parameter type. Tried
    /// against the segment at this node's position during descent.
    pub pattern: Option<Regex>,
    pub children: IndexMap<String, TreeNode<H>>,
    /// Present when a route terminates at this node.
    pub group: Option<Rc<RouteGroup<H>>>,
    /// Height of the subtree rooted here: `0` for a leaf, otherwise one
    /// more than its deepest child. Computed bottom-up by
    /// [`TreeNode::compute_depth`] before sorting; sibling comparison
    /// only ever needs it relative to siblings sharing the same parent,
    /// so subtree height stands in for spec.md §4.5 rule 4's "max level
    /// among descendants" without tracking each node's absolute level.
    pub depth: usize,
}

impl<H> TreeNode<H> {
    fn new(part: String, sort_key: String, dynamic: bool, priority: usize, pattern: Option<Regex>) -> Self {
        TreeNode { part, sort_key, dynamic, priority, pattern, children: IndexMap::default(), group: None, depth: 0 }
    }

    fn root() -> Self {
        TreeNode::new(String::new(), String::new(), false, 0, None)
    }

    fn compute_depth(&mut self) -> usize {
        let deepest = self.children.values_mut().map(TreeNode::compute_depth).max();
        self.depth = deepest.map(|d| d + 1).unwrap_or(0);
        self.depth
    }

    fn sort_children(&mut self) {
        self.children.sort_by(|_, a, _, b| sibling_order(a, b));
        for child in self.children.values_mut() {
            child.sort_children();
        }
    }
}

/// Whether `node` is itself a route's terminal node reached only
/// through its whole-path regex (spec.md §4.5 rule 6).
fn is_regex_terminal<H>(node: &TreeNode<H>) -> bool {
    node.group.as_ref().is_some_and(|g| g.regex())
}

/// Sibling ordering used at every tree node (spec.md §4.5), most to
/// least significant:
///
/// 1. A node terminating a group before one that doesn't.
/// 2. Static before dynamic.
/// 3. Higher type priority first (more specific types, declared later
///    in the registry; an unregistered label's `0` sorts last).
/// 4. Deeper sub-trees first.
/// 5. More children first (the branch more likely to lead somewhere).
/// 6. Among dynamic nodes, a regex-terminating one last.
/// 7. Lexical order on the node's own text, as a final tie-break.
fn sibling_order<H>(a: &TreeNode<H>, b: &TreeNode<H>) -> Ordering {
    b.group.is_some()
        .cmp(&a.group.is_some())
        .then_with(|| a.dynamic.cmp(&b.dynamic))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.depth.cmp(&a.depth))
        .then_with(|| b.children.len().cmp(&a.children.len()))
        .then_with(|| is_regex_terminal(a).cmp(&is_regex_terminal(b)))
        .then_with(|| a.sort_key.cmp(&b.sort_key))
}

/// The decision tree itself.
pub struct Tree<H> {
    pub root: TreeNode<H>,
}

impl<H> Default for Tree<H> {
    fn default() -> Self {
        Tree { root: TreeNode::root() }
    }
}

impl<H> Tree<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `group` along the path described by its own `parts`,
    /// creating intermediate nodes as needed.
    pub fn insert(&mut self, group: Rc<RouteGroup<H>>, _registry: &PatternRegistry) {
        let parts = group.parts().to_vec();
        let mut current = &mut self.root;
        for (idx, part) in parts.iter().enumerate() {
            let dynamic = part.starts_with('<');
            let slot = if dynamic { group.params().iter().find(|p| p.idx == idx) } else { None };
            let priority = slot.map(|p| p.priority).unwrap_or(0);
            // A custom regex that spans the delimiter can never match
            // against a single raw segment (it was written to span several),
            // so descent must not even try — it lets the (necessarily
            // last-segment) terminal node through unconditionally and
            // leaves real validation to the route's whole-path regex. The
            // built-in `path` type keeps its own pattern: its regex is
            // permissive enough to match a lone segment by design.
            let pattern = slot.and_then(|p| {
                if p.spans_delimiter && p.unregistered {
                    None
                } else {
                    Some(p.pattern.clone())
                }
            });
            let sort_key = slot.map(|p| p.name.clone()).unwrap_or_else(|| part.clone());
            current = current
                .children
                .entry(part.clone())
                .or_insert_with(|| TreeNode::new(part.clone(), sort_key, dynamic, priority, pattern));
        }
        current.group = Some(group);
    }

    /// Sorts every node's children in-place per [`sibling_order`]. Must
    /// run once after all routes are inserted, before matching. Depth
    /// is computed in a single bottom-up pass first, since sorting a
    /// node's children needs each child's already-final depth.
    pub fn finalize(&mut self) {
        self.root.compute_depth();
        self.root.sort_children();
    }
}
