//! Opener lineage, derived at read time.
//!
//! `openerTabId` is a relation resolved by lookup, never ownership: an
//! opener that has been removed simply means "no parent".

use std::collections::HashSet;

use crate::model::TabId;
use crate::store::TabStore;

/// The opener of `id`, if both still exist.
pub fn parent(store: &TabStore, id: TabId) -> Option<TabId> {
    let opener = store.get(id)?.opener_tab_id?;
    (opener != id && store.contains(opener)).then_some(opener)
}

/// Number of live ancestors above `id`. Stops at the first repeated id, so
/// lineage loops cannot hang the walk.
pub fn depth(store: &TabStore, id: TabId) -> usize {
    let mut seen = HashSet::from([id]);
    let mut current = id;
    let mut depth = 0;
    while let Some(next) = parent(store, current) {
        if !seen.insert(next) {
            break;
        }
        depth += 1;
        current = next;
    }
    depth
}

/// Direct children of `id`, insertion order.
pub fn children(store: &TabStore, id: TabId) -> Vec<TabId> {
    store
        .iter()
        .filter(|record| record.id != id && parent(store, record.id) == Some(id))
        .map(|record| record.id)
        .collect()
}

/// Depth-first listing for tree display: `(id, depth)` with every child right
/// after its parent. Records only reachable through a loop are appended as
/// roots.
pub fn flatten(store: &TabStore) -> Vec<(TabId, usize)> {
    let mut out = Vec::with_capacity(store.len());
    let mut visited = HashSet::new();

    let roots: Vec<TabId> = store
        .iter()
        .filter(|record| parent(store, record.id).is_none())
        .map(|record| record.id)
        .collect();
    for root in roots {
        visit(store, root, 0, &mut visited, &mut out);
    }

    let leftovers: Vec<TabId> = store
        .iter()
        .map(|record| record.id)
        .filter(|id| !visited.contains(id))
        .collect();
    for id in leftovers {
        if !visited.contains(&id) {
            visit(store, id, 0, &mut visited, &mut out);
        }
    }
    out
}

fn visit(
    store: &TabStore,
    id: TabId,
    depth: usize,
    visited: &mut HashSet<TabId>,
    out: &mut Vec<(TabId, usize)>,
) {
    if !visited.insert(id) {
        return;
    }
    out.push((id, depth));
    for child in children(store, id) {
        visit(store, child, depth + 1, visited, out);
    }
}
