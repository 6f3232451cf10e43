//! Pure hierarchy-closure computation.
//!
//! The closure table equals the transitive closure of parent edges. It is
//! rebuilt by the application inside the same transaction as the chunk
//! mutation, which keeps the logic testable without a database and the
//! store portable to backends without recursive CTEs.

use std::collections::HashMap;

use uuid::Uuid;

/// One row of the hierarchy closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosureRow {
    /// Ancestor chunk id.
    pub ancestor_id: Uuid,
    /// Descendant chunk id.
    pub descendant_id: Uuid,
    /// Number of parent edges between ancestor and descendant.
    pub depth: i32,
    /// Slash-joined id chain from ancestor to descendant inclusive.
    pub path: String,
}

impl ClosureRow {
    /// The depth-0 self pair every chunk carries.
    pub fn self_pair(id: Uuid) -> Self {
        Self {
            ancestor_id: id,
            descendant_id: id,
            depth: 0,
            path: id.to_string(),
        }
    }
}

/// Computes the full closure for a forest given as (child, parent) edges.
///
/// `edges` maps each chunk to its optional parent; chunks absent from the
/// map are treated as roots. Returns `Err` with the offending chunk id when
/// a cycle is detected or a chain exceeds `max_depth`.
pub fn build_closure(
    edges: &HashMap<Uuid, Option<Uuid>>,
    max_depth: i32,
) -> Result<Vec<ClosureRow>, ClosureError> {
    let mut rows = Vec::with_capacity(edges.len() * 2);

    for &chunk in edges.keys() {
        rows.push(ClosureRow::self_pair(chunk));

        // walk the ancestor chain, accumulating the path bottom-up
        let mut chain = vec![chunk];
        let mut current = chunk;
        while let Some(&Some(parent)) = edges.get(&current) {
            if chain.contains(&parent) {
                return Err(ClosureError::Cycle(parent));
            }
            chain.push(parent);
            if chain.len() as i32 - 1 > max_depth {
                return Err(ClosureError::TooDeep(chunk));
            }

            let path = chain
                .iter()
                .rev()
                .map(Uuid::to_string)
                .collect::<Vec<_>>()
                .join("/");
            rows.push(ClosureRow {
                ancestor_id: parent,
                descendant_id: chunk,
                depth: chain.len() as i32 - 1,
                path,
            });
            current = parent;
        }
    }

    Ok(rows)
}

/// Returns the maximum depth of any chain in the closure rows rooted at `root`.
pub fn subtree_depth(rows: &[ClosureRow], root: Uuid) -> i32 {
    rows.iter()
        .filter(|row| row.ancestor_id == root)
        .map(|row| row.depth)
        .max()
        .unwrap_or(0)
}

/// Failure modes of closure construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClosureError {
    /// The parent edges contain a cycle through the given chunk.
    #[error("hierarchy cycle through chunk {0}")]
    Cycle(Uuid),

    /// A chain exceeds the maximum allowed depth starting at the given chunk.
    #[error("hierarchy too deep at chunk {0}")]
    TooDeep(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::now_v7()).collect()
    }

    #[test]
    fn single_root_has_only_self_pair() {
        let root = Uuid::now_v7();
        let edges = HashMap::from([(root, None)]);

        let rows = build_closure(&edges, 100).unwrap();
        assert_eq!(rows, vec![ClosureRow::self_pair(root)]);
    }

    #[test]
    fn three_level_chain_produces_all_pairs() {
        let v = ids(3);
        let (root, child, grandchild) = (v[0], v[1], v[2]);
        let edges = HashMap::from([
            (root, None),
            (child, Some(root)),
            (grandchild, Some(child)),
        ]);

        let mut rows = build_closure(&edges, 100).unwrap();
        rows.sort_by_key(|r| (r.descendant_id, r.depth));

        // 3 self pairs + (root,child) + (root,gc) + (child,gc)
        assert_eq!(rows.len(), 6);

        let deep = rows
            .iter()
            .find(|r| r.ancestor_id == root && r.descendant_id == grandchild)
            .unwrap();
        assert_eq!(deep.depth, 2);
        assert_eq!(deep.path, format!("{root}/{child}/{grandchild}"));
    }

    #[test]
    fn cycle_is_rejected() {
        let v = ids(2);
        let edges = HashMap::from([(v[0], Some(v[1])), (v[1], Some(v[0]))]);

        assert!(matches!(
            build_closure(&edges, 100),
            Err(ClosureError::Cycle(_))
        ));
    }

    #[test]
    fn self_parent_is_rejected() {
        let id = Uuid::now_v7();
        let edges = HashMap::from([(id, Some(id))]);

        assert!(matches!(build_closure(&edges, 100), Err(ClosureError::Cycle(_))));
    }

    #[test]
    fn depth_cap_is_enforced() {
        let v = ids(5);
        let mut edges = HashMap::from([(v[0], None)]);
        for i in 1..5 {
            edges.insert(v[i], Some(v[i - 1]));
        }

        assert!(build_closure(&edges, 100).is_ok());
        assert!(matches!(build_closure(&edges, 3), Err(ClosureError::TooDeep(_))));
    }

    #[test]
    fn subtree_depth_reports_longest_chain() {
        let v = ids(3);
        let edges = HashMap::from([(v[0], None), (v[1], Some(v[0])), (v[2], Some(v[1]))]);

        let rows = build_closure(&edges, 100).unwrap();
        assert_eq!(subtree_depth(&rows, v[0]), 2);
        assert_eq!(subtree_depth(&rows, v[1]), 1);
        assert_eq!(subtree_depth(&rows, v[2]), 0);
    }
}
