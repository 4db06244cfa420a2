//! Pattern-finding primitives used by aggregation rules.
//!
//! Every traversal visits elements in ascending id order and returns its
//! results sorted, so the same graph always yields the same matches.

use std::collections::{BTreeMap, BTreeSet};

use tp_core::{ElementId, PortId, within};
use tp_elements::{AttributeName, ElementType};
use tracing::debug;

use crate::graph::ConnectionGraph;

/// Node-induced subgraph: a node set plus the edges running inside it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subgraph {
    nodes: BTreeSet<ElementId>,
    edges: Vec<(PortId, PortId)>,
    adjacency: BTreeMap<ElementId, BTreeSet<ElementId>>,
}

impl Subgraph {
    pub fn nodes(&self) -> &BTreeSet<ElementId> {
        &self.nodes
    }

    pub fn edges(&self) -> &[(PortId, PortId)] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains(&id)
    }

    /// Distinct neighbours inside the subgraph.
    pub fn degree(&self, id: ElementId) -> usize {
        self.adjacency.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn is_connected(&self) -> bool {
        let Some(start) = self.nodes.first() else {
            return true;
        };
        let mut seen = BTreeSet::from([*start]);
        let mut stack = vec![*start];
        while let Some(n) = stack.pop() {
            for next in self.adjacency.get(&n).into_iter().flatten() {
                if seen.insert(*next) {
                    stack.push(*next);
                }
            }
        }
        seen.len() == self.nodes.len()
    }

    /// Connected, acyclic and without branching.
    pub fn is_simple_path(&self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        self.edges.len() + 1 == self.nodes.len()
            && self.is_connected()
            && self.nodes.iter().all(|n| self.degree(*n) <= 2)
    }
}

/// One side of a parallel group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Side {
    /// The element the branches attach to, widened to its cluster of
    /// directly adjacent junctions.
    pub nodes: Vec<ElementId>,
    /// True when the side consists of junctions of an inert type, which a
    /// rule may absorb together with the branches.
    pub junction: bool,
}

/// Branches running in parallel between the same two sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parallel {
    /// Each branch is ordered from `sides[0]` to `sides[1]`.
    pub branches: Vec<Vec<ElementId>>,
    pub sides: [Side; 2],
}

impl Parallel {
    /// Branch nodes plus the junction sides.
    pub fn nodes(&self) -> BTreeSet<ElementId> {
        let mut nodes: BTreeSet<ElementId> = self.branches.iter().flatten().copied().collect();
        for side in self.sides.iter().filter(|s| s.junction) {
            nodes.extend(side.nodes.iter().copied());
        }
        nodes
    }
}

impl ConnectionGraph {
    /// Induced subgraph on the active elements among `nodes`.
    pub fn subgraph(&self, nodes: impl IntoIterator<Item = ElementId>) -> Subgraph {
        let nodes: BTreeSet<ElementId> = nodes.into_iter().filter(|n| self.contains(*n)).collect();
        let edges = self.inner_connections(&nodes);
        let mut adjacency: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
        for (a, b) in &edges {
            if let (Ok(oa), Ok(ob)) = (self.owner(*a), self.owner(*b)) {
                adjacency.entry(oa).or_default().insert(ob);
                adjacency.entry(ob).or_default().insert(oa);
            }
        }
        Subgraph {
            nodes,
            edges,
            adjacency,
        }
    }

    fn has_type(&self, id: ElementId, types: &[ElementType]) -> bool {
        self.element(id).is_ok_and(|e| types.contains(&e.kind))
    }

    /// Maximal simple paths over elements whose type is in `types` and whose
    /// degree is at most 2.
    ///
    /// Chains are oriented so the first id is smaller than the last; a pure
    /// ring starts at its smallest id. Chains of a single element are only
    /// returned with `include_singles`.
    pub fn get_type_chains(&self, types: &[ElementType], include_singles: bool) -> Vec<Vec<ElementId>> {
        let candidates: BTreeSet<ElementId> = self
            .elements()
            .filter(|e| types.contains(&e.kind) && self.degree(e.id) <= 2)
            .map(|e| e.id)
            .collect();
        let candidate_neighbors = |id: ElementId| -> Vec<ElementId> {
            self.neighbors(id)
                .into_iter()
                .filter(|n| candidates.contains(n))
                .collect()
        };

        let mut visited: BTreeSet<ElementId> = BTreeSet::new();
        let mut chains = Vec::new();
        for &start in &candidates {
            if !visited.insert(start) {
                continue;
            }
            let mut halves: Vec<Vec<ElementId>> = Vec::new();
            for first in candidate_neighbors(start) {
                let mut half = Vec::new();
                let (mut prev, mut current) = (start, first);
                while visited.insert(current) {
                    half.push(current);
                    let Some(next) = candidate_neighbors(current)
                        .into_iter()
                        .find(|n| *n != prev && !visited.contains(n))
                    else {
                        break;
                    };
                    prev = current;
                    current = next;
                }
                halves.push(half);
            }
            let mut chain: Vec<ElementId> = halves
                .first()
                .map(|h| h.iter().rev().copied().collect())
                .unwrap_or_default();
            chain.push(start);
            if let Some(second) = halves.get(1) {
                chain.extend(second.iter().copied());
            }
            if chain.first() > chain.last() {
                chain.reverse();
            }
            if chain.len() > 1 || include_singles {
                chains.push(chain);
            }
        }
        chains.sort();
        chains
    }

    /// Cluster of directly adjacent junctions (degree ≥ 3, inert type)
    /// around `id`; any other element is its own side.
    fn side_of(&self, id: ElementId, inert: &[ElementType]) -> Side {
        let is_junction = |n: ElementId| self.has_type(n, inert) && self.degree(n) >= 3;
        if !is_junction(id) {
            return Side {
                nodes: vec![id],
                junction: false,
            };
        }
        let mut seen = BTreeSet::from([id]);
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            for next in self.neighbors(n) {
                if is_junction(next) && seen.insert(next) {
                    stack.push(next);
                }
            }
        }
        Side {
            nodes: seen.into_iter().collect(),
            junction: true,
        }
    }

    /// The single outside neighbour at each end of a branch.
    fn branch_ends(&self, branch: &[ElementId]) -> Option<(ElementId, ElementId)> {
        let inside: BTreeSet<ElementId> = branch.iter().copied().collect();
        let outside = |id: ElementId| -> Vec<ElementId> {
            self.neighbors(id)
                .into_iter()
                .filter(|n| !inside.contains(n))
                .collect()
        };
        match branch {
            [] => None,
            [single] => match outside(*single).as_slice() {
                [a, b] => Some((*a, *b)),
                _ => None,
            },
            [first, .., last] => match (outside(*first).as_slice(), outside(*last).as_slice()) {
                ([a], [b]) => Some((*a, *b)),
                _ => None,
            },
        }
    }

    /// Grouping key of a branch, compared in each attribute's canonical unit.
    ///
    /// `None` when a wanted element lacks a value or the wanted elements of
    /// the branch disagree by more than `threshold`.
    fn branch_key(
        &self,
        branch: &[ElementId],
        wanted: &[ElementType],
        grouping: &[AttributeName],
        threshold: f64,
    ) -> Option<Vec<f64>> {
        let mut key = Vec::with_capacity(grouping.len());
        for attribute in grouping {
            let mut values = Vec::new();
            for id in branch.iter().filter(|id| self.has_type(**id, wanted)) {
                let element = self.element(*id).ok()?;
                let unit = element.def(*attribute)?.unit?;
                values.push(element.get_in(*attribute, unit)?);
            }
            let first = *values.first()?;
            if !values.iter().all(|v| within(*v, first, threshold)) {
                return None;
            }
            key.push(first);
        }
        Some(key)
    }

    /// Branches containing `wanted` elements that run in parallel between the
    /// same two sides, clustered by `grouping` within `threshold`.
    ///
    /// Branches are type chains over `wanted` and `inert`. Only clusters of
    /// at least two branches are returned.
    pub fn get_parallels(
        &self,
        wanted: &[ElementType],
        inert: &[ElementType],
        grouping: &[AttributeName],
        threshold: f64,
    ) -> Vec<Parallel> {
        let types: Vec<ElementType> = wanted.iter().chain(inert).copied().collect();
        let mut by_sides: BTreeMap<(ElementId, ElementId), (Side, Side, Vec<(Vec<f64>, Vec<ElementId>)>)> =
            BTreeMap::new();

        for mut branch in self.get_type_chains(&types, true) {
            if !branch.iter().any(|id| self.has_type(*id, wanted)) {
                continue;
            }
            let Some((end_a, end_b)) = self.branch_ends(&branch) else {
                continue;
            };
            let (mut side_a, mut side_b) = (self.side_of(end_a, inert), self.side_of(end_b, inert));
            let (mut key_a, mut key_b) = (side_a.nodes[0], side_b.nodes[0]);
            if key_a == key_b {
                continue;
            }
            if key_a > key_b {
                std::mem::swap(&mut side_a, &mut side_b);
                std::mem::swap(&mut key_a, &mut key_b);
                branch.reverse();
            }
            let Some(key) = self.branch_key(&branch, wanted, grouping, threshold) else {
                debug!(first = %branch[0], "branch excluded from parallel grouping");
                continue;
            };
            by_sides
                .entry((key_a, key_b))
                .or_insert_with(|| (side_a, side_b, Vec::new()))
                .2
                .push((key, branch));
        }

        let mut parallels = Vec::new();
        for (_, (side_a, side_b, mut branches)) in by_sides {
            branches.sort_by(|(ka, ba), (kb, bb)| {
                ka.iter()
                    .zip(kb)
                    .map(|(x, y)| x.total_cmp(y))
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| ba.cmp(bb))
            });
            let mut clusters: Vec<(Vec<f64>, Vec<Vec<ElementId>>)> = Vec::new();
            for (key, branch) in branches {
                match clusters.last_mut() {
                    Some((anchor, members))
                        if anchor.iter().zip(&key).all(|(a, k)| within(*a, *k, threshold)) =>
                    {
                        members.push(branch)
                    }
                    _ => clusters.push((key, vec![branch])),
                }
            }
            for (_, members) in clusters.into_iter().filter(|(_, m)| m.len() >= 2) {
                parallels.push(Parallel {
                    branches: members,
                    sides: [side_a.clone(), side_b.clone()],
                });
            }
        }
        parallels
    }

    /// Clusters of `wanted` elements adjacent directly or through chains of
    /// `inert` elements of degree ≤ 2.
    ///
    /// Each cluster holds at least two wanted elements plus the inert
    /// elements connecting them, sorted by id.
    pub fn get_connections_between(
        &self,
        wanted: &[ElementType],
        inert: &[ElementType],
    ) -> Vec<Vec<ElementId>> {
        let wanted_ids: Vec<ElementId> = self
            .elements()
            .filter(|e| wanted.contains(&e.kind))
            .map(|e| e.id)
            .collect();
        let mut parent: BTreeMap<ElementId, ElementId> =
            wanted_ids.iter().map(|id| (*id, *id)).collect();
        let mut bridges: Vec<(ElementId, Vec<ElementId>)> = Vec::new();

        for &w in &wanted_ids {
            for n in self.neighbors(w) {
                if parent.contains_key(&n) {
                    union(&mut parent, w, n);
                    continue;
                }
                if !self.has_type(n, inert) || self.degree(n) > 2 {
                    continue;
                }
                let mut path = vec![n];
                let (mut prev, mut current) = (w, n);
                loop {
                    let next: Vec<ElementId> = self
                        .neighbors(current)
                        .into_iter()
                        .filter(|x| *x != prev)
                        .collect();
                    let [next] = next.as_slice() else { break };
                    let next = *next;
                    if parent.contains_key(&next) {
                        if next != w {
                            union(&mut parent, w, next);
                            bridges.push((w, path));
                        }
                        break;
                    }
                    if !self.has_type(next, inert) || self.degree(next) > 2 || path.contains(&next) {
                        break;
                    }
                    path.push(next);
                    prev = current;
                    current = next;
                }
            }
        }

        let mut clusters: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
        let mut sizes: BTreeMap<ElementId, usize> = BTreeMap::new();
        for &w in &wanted_ids {
            let root = find(&mut parent, w);
            clusters.entry(root).or_default().insert(w);
            *sizes.entry(root).or_default() += 1;
        }
        for (w, path) in bridges {
            let root = find(&mut parent, w);
            clusters.entry(root).or_default().extend(path);
        }
        let mut out: Vec<Vec<ElementId>> = clusters
            .into_iter()
            .filter(|(root, _)| sizes.get(root).copied().unwrap_or(0) >= 2)
            .map(|(_, nodes)| nodes.into_iter().collect())
            .collect();
        out.sort();
        out
    }
}

fn find(parent: &mut BTreeMap<ElementId, ElementId>, id: ElementId) -> ElementId {
    let mut root = id;
    while let Some(p) = parent.get(&root).copied() {
        if p == root {
            break;
        }
        root = p;
    }
    parent.insert(id, root);
    root
}

fn union(parent: &mut BTreeMap<ElementId, ElementId>, a: ElementId, b: ElementId) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        let (low, high) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent.insert(high, low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;

    /// Builds a line of two-port elements and returns the graph with ids.
    fn line(kinds: &[ElementType]) -> (ConnectionGraph, Vec<ElementId>) {
        let mut b = GraphBuilder::new();
        let mut ids = Vec::new();
        let mut last: Option<PortId> = None;
        for (i, kind) in kinds.iter().enumerate() {
            let id = b.add_element(*kind, format!("e{i}"));
            let pa = b.add_port(id).unwrap();
            let pb = b.add_port(id).unwrap();
            if let Some(prev) = last {
                b.connect(prev, pa).unwrap();
            }
            last = Some(pb);
            ids.push(id);
        }
        (b.build().unwrap(), ids)
    }

    #[test]
    fn chain_stops_at_foreign_type() {
        use ElementType::*;
        let (g, ids) = line(&[Pipe, Pipe, Pump, Pipe, Pipe, Pipe]);
        let chains = g.get_type_chains(&[Pipe], false);
        assert_eq!(chains, vec![ids[0..2].to_vec(), ids[3..6].to_vec()]);
    }

    #[test]
    fn singles_are_optional() {
        use ElementType::*;
        let (g, ids) = line(&[Pump, Pipe, Pump]);
        assert!(g.get_type_chains(&[Pipe], false).is_empty());
        assert_eq!(g.get_type_chains(&[Pipe], true), vec![vec![ids[1]]]);
    }

    #[test]
    fn ring_starts_at_smallest_id() {
        use ElementType::*;
        let mut b = GraphBuilder::new();
        let mut ports = Vec::new();
        let mut ids = Vec::new();
        for i in 0..4 {
            let id = b.add_element(Pipe, format!("r{i}"));
            ports.push((b.add_port(id).unwrap(), b.add_port(id).unwrap()));
            ids.push(id);
        }
        for i in 0..4 {
            b.connect(ports[i].1, ports[(i + 1) % 4].0).unwrap();
        }
        let g = b.build().unwrap();
        let chains = g.get_type_chains(&[Pipe], false);
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 4);
        assert_eq!(chains[0][0], ids[0]);
    }

    #[test]
    fn subgraph_path_detection() {
        use ElementType::*;
        let (g, ids) = line(&[Pipe, Pipe, Pipe]);
        assert!(g.subgraph(ids.clone()).is_simple_path());
        assert!(!g.subgraph([ids[0], ids[2]]).is_simple_path());
        assert_eq!(g.subgraph(ids.clone()).degree(ids[1]), 2);
    }

    #[test]
    fn fittings_joined_through_pipes() {
        use ElementType::*;
        let (g, ids) = line(&[PipeFitting, Pipe, Pipe, PipeFitting, Pump, PipeFitting]);
        let clusters = g.get_connections_between(&[PipeFitting], &[Pipe]);
        assert_eq!(clusters, vec![ids[0..4].to_vec()]);
        let direct = g.get_connections_between(&[PipeFitting], &[]);
        assert!(direct.is_empty());
    }
}
