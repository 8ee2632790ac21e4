//! Permission forest traversal
//!
//! Rows are kept flat and keyed by id. Subtrees are walked level by level
//! with an explicit frontier, so depth never grows the call stack and a
//! store can answer each level with a single `parent_id = ANY(..)` query.

use std::collections::{BTreeMap, HashMap, HashSet};

use shared::rbac::{FULL_CODE_SEPARATOR, Permission, TreeNode};

/// Split `admin.user.create` into its segments.
///
/// Returns `None` for an empty code or one with an empty segment.
pub fn split_full_code(full_code: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = full_code.trim().split(FULL_CODE_SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return None;
    }
    Some(segments)
}

/// Breadth-first walk over descendant ids.
///
/// The caller feeds the children of [`frontier`](Self::frontier) back through
/// [`advance`](Self::advance) until [`is_done`](Self::is_done). Ids seen twice
/// are dropped, so a corrupted parent chain still terminates.
#[derive(Debug)]
pub struct LevelWalk {
    seen: HashSet<i64>,
    frontier: Vec<i64>,
    visited: Vec<i64>,
}

impl LevelWalk {
    pub fn new(root: i64) -> Self {
        Self {
            seen: HashSet::from([root]),
            frontier: vec![root],
            visited: Vec::new(),
        }
    }

    pub fn frontier(&self) -> &[i64] {
        &self.frontier
    }

    pub fn is_done(&self) -> bool {
        self.frontier.is_empty()
    }

    pub fn advance(&mut self, children: impl IntoIterator<Item = i64>) {
        let next: Vec<i64> = children
            .into_iter()
            .filter(|id| self.seen.insert(*id))
            .collect();
        self.visited.extend(next.iter().copied());
        self.frontier = next;
    }

    pub fn contains(&self, id: i64) -> bool {
        self.visited.contains(&id)
    }

    /// Descendants in breadth-first order, the root excluded
    pub fn descendants(&self) -> &[i64] {
        &self.visited
    }

    /// Descendants deepest first, the order a cascading delete removes them
    pub fn into_post_order(self) -> Vec<i64> {
        let mut ids = self.visited;
        ids.reverse();
        ids
    }
}

/// Collect every descendant of `root` from a flat row set
pub fn descendants_in<'a>(rows: impl IntoIterator<Item = &'a Permission>, root: i64) -> LevelWalk {
    let children = children_index(rows);
    let mut walk = LevelWalk::new(root);
    while !walk.is_done() {
        let next: Vec<i64> = walk
            .frontier()
            .iter()
            .flat_map(|id| children.get(id).into_iter().flatten())
            .map(|p| p.id)
            .collect();
        walk.advance(next);
    }
    walk
}

fn children_index<'a>(
    rows: impl IntoIterator<Item = &'a Permission>,
) -> HashMap<i64, Vec<&'a Permission>> {
    let mut index: HashMap<i64, Vec<&Permission>> = HashMap::new();
    for row in rows {
        index.entry(row.parent_id).or_default().push(row);
    }
    for siblings in index.values_mut() {
        siblings.sort_by_key(|p| (p.sort, p.id));
    }
    index
}

/// Build the nested children lists below `parent_id`.
///
/// `rows` may contain unrelated nodes; only those reachable from
/// `parent_id` are placed. Siblings come out ordered by `(sort, id)`.
pub fn assemble_subtree(parent_id: i64, rows: Vec<Permission>) -> Vec<TreeNode> {
    let mut by_parent: HashMap<i64, Vec<Permission>> = HashMap::new();
    for row in rows {
        by_parent.entry(row.parent_id).or_default().push(row);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|p| (p.sort, p.id));
    }

    // Breadth-first placement order, parents always before their children.
    let mut order: Vec<Permission> = Vec::new();
    let mut seen = HashSet::from([parent_id]);
    let mut frontier = vec![parent_id];
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in frontier {
            for child in by_parent.remove(&id).unwrap_or_default() {
                if seen.insert(child.id) {
                    next.push(child.id);
                    order.push(child);
                }
            }
        }
        frontier = next;
    }

    // Walk backwards so every node's children are finished before the node itself.
    let mut built: BTreeMap<i64, Vec<TreeNode>> = BTreeMap::new();
    for permission in order.into_iter().rev() {
        let mut children = built.remove(&permission.id).unwrap_or_default();
        children.reverse();
        let parent = permission.parent_id;
        built.entry(parent).or_default().push(TreeNode {
            permission,
            children,
        });
    }

    let mut roots = built.remove(&parent_id).unwrap_or_default();
    roots.reverse();
    roots
}
