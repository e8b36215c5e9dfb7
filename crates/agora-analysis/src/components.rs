//! Connected-component partitioning of a run's I-nodes.
//!
//! Schemes are replayed in creation order against a union-find; a scheme
//! whose premise and conclusion sides sit in two different components at
//! the moment it is applied is a *bridge* between those (pre-merge)
//! components. Final component ids are the representative node's id.

use std::collections::HashMap;

use uuid::Uuid;

/// A scheme found to join two previously disjoint components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bridge {
    /// The bridging scheme.
    pub scheme_id: Uuid,
    /// Component on the premise side, before the merge.
    pub component_a: Uuid,
    /// Component on the conclusion side, before the merge.
    pub component_b: Uuid,
}

/// One scheme's I-node footprint, in creation order.
#[derive(Debug, Clone)]
pub struct SchemeNodes {
    /// The scheme.
    pub scheme_id: Uuid,
    /// I-nodes on premise edges.
    pub premises: Vec<Uuid>,
    /// I-nodes on conclusion edges.
    pub conclusions: Vec<Uuid>,
}

/// Result of one partitioning pass.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Component id for every node (the representative node's id).
    pub assignments: HashMap<Uuid, Uuid>,
    /// Bridges found while replaying the schemes.
    pub bridges: Vec<Bridge>,
}

/// Path-halving union-find over node ids.
struct UnionFind {
    parent: HashMap<Uuid, Uuid>,
}

impl UnionFind {
    fn new(nodes: &[Uuid]) -> Self {
        Self {
            parent: nodes.iter().map(|&n| (n, n)).collect(),
        }
    }

    fn find(&mut self, node: Uuid) -> Uuid {
        let mut current = node;
        loop {
            let parent = *self.parent.get(&current).unwrap_or(&current);
            if parent == current {
                return current;
            }
            let grandparent = *self.parent.get(&parent).unwrap_or(&parent);
            self.parent.insert(current, grandparent);
            current = grandparent;
        }
    }

    fn union(&mut self, a: Uuid, b: Uuid) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent.insert(root_b, root_a);
        }
    }
}

/// Partition `nodes` by replaying `schemes` in order.
///
/// Every node starts in its own singleton component. Applying a scheme
/// first checks whether its premise side and conclusion side currently
/// live in two different components -- if so, the scheme is recorded as a
/// bridge between them -- then unions every node the scheme touches.
pub fn partition(nodes: &[Uuid], schemes: &[SchemeNodes]) -> Partition {
    let mut uf = UnionFind::new(nodes);
    let mut bridges = Vec::new();

    for scheme in schemes {
        let premise_root = scheme.premises.first().map(|&n| uf.find(n));
        let conclusion_root = scheme.conclusions.first().map(|&n| uf.find(n));

        if let (Some(a), Some(b)) = (premise_root, conclusion_root) {
            if a != b {
                bridges.push(Bridge {
                    scheme_id: scheme.scheme_id,
                    component_a: a,
                    component_b: b,
                });
            }
        }

        let all: Vec<Uuid> = scheme
            .premises
            .iter()
            .chain(scheme.conclusions.iter())
            .copied()
            .collect();
        if let Some((&first, rest)) = all.split_first() {
            for &other in rest {
                uf.union(first, other);
            }
        }
    }

    let assignments = nodes.iter().map(|&n| (n, uf.find(n))).collect();
    Partition {
        assignments,
        bridges,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn nodes(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn isolated_nodes_are_singletons() {
        let ns = nodes(3);
        let result = partition(&ns, &[]);
        assert_eq!(result.assignments.len(), 3);
        for n in &ns {
            assert_eq!(result.assignments.get(n), Some(n));
        }
        assert!(result.bridges.is_empty());
    }

    #[test]
    fn scheme_joining_two_singletons_is_a_bridge() {
        let ns = nodes(2);
        let scheme_id = Uuid::new_v4();
        let schemes = vec![SchemeNodes {
            scheme_id,
            premises: vec![ns[0]],
            conclusions: vec![ns[1]],
        }];
        let result = partition(&ns, &schemes);
        assert_eq!(result.bridges.len(), 1);
        assert_eq!(result.bridges[0].scheme_id, scheme_id);
        // Both nodes end in the same component.
        assert_eq!(
            result.assignments.get(&ns[0]),
            result.assignments.get(&ns[1])
        );
    }

    #[test]
    fn second_scheme_within_one_component_is_not_a_bridge() {
        let ns = nodes(2);
        let schemes = vec![
            SchemeNodes {
                scheme_id: Uuid::new_v4(),
                premises: vec![ns[0]],
                conclusions: vec![ns[1]],
            },
            SchemeNodes {
                scheme_id: Uuid::new_v4(),
                premises: vec![ns[1]],
                conclusions: vec![ns[0]],
            },
        ];
        let result = partition(&ns, &schemes);
        assert_eq!(result.bridges.len(), 1, "only the first join bridges");
    }

    #[test]
    fn chains_collapse_into_one_component() {
        let ns = nodes(4);
        let schemes: Vec<SchemeNodes> = (0..3)
            .map(|i| SchemeNodes {
                scheme_id: Uuid::new_v4(),
                premises: vec![ns[i]],
                conclusions: vec![ns[i + 1]],
            })
            .collect();
        let result = partition(&ns, &schemes);
        let roots: std::collections::BTreeSet<_> = result.assignments.values().collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(result.bridges.len(), 3);
    }
}
