// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! The half-edge graph of the skeletal trapezoidation.
//!
//! Nodes and edges live in index-addressable arenas; every cross reference is
//! a [`NodeId`] or [`EdgeId`]. Deleting marks the slot dead and leaves all
//! other indices stable. The graph invariants are:
//!
//! * every live edge has a twin, and `twin.twin == self`,
//!   `twin.from == to`, `twin.to == from`
//! * `next`/`prev` are mutual; an edge without `next` ends a quad side on the
//!   outline
//! * `incident_edge` of a node is an outgoing edge, and all outgoing edges
//!   are reachable by `e = e.twin.next`
//! * `distance_to_boundary` is `0` exactly on outline nodes; a rib
//!   (`EdgeKind::ExtraVd`) has exactly one outline endpoint

#[cfg(test)]
mod tests;

use crate::{
    WallrError,
    geo::{Coord, Point, closest_on_segment, shorter_than, vsize},
};
use smallvec::SmallVec;

/// Iteration guard for cyclic walks on a possibly corrupted graph.
const MAX_WALK: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl NodeId {
    #[inline(always)]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl EdgeId {
    #[inline(always)]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Copied from the voronoi diagram.
    Normal,
    /// A rib introduced to connect a skeleton node to the outline.
    ExtraVd,
    /// A rib introduced at the end of a bead count transition.
    TransitionEnd,
}

/// Which way an "upward" race between equidistant skeleton branches is
/// decided when neither side climbs; see `HalfEdgeGraph::is_upward`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// The lexicographically smaller destination wins.
    #[default]
    PreferInner,
    /// The lexicographically larger destination wins.
    PreferOuter,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub p: Point,
    /// Distance to the closest point of the input outline, `-1` until set.
    pub distance_to_boundary: Coord,
    /// Bead count assigned from the beading strategy, `-1` until set.
    pub bead_count: i32,
    /// Fraction of a transition this node sits at when a transition end was
    /// clamped onto the outline; `0.0` everywhere else.
    pub transition_ratio: f64,
    pub incident_edge: Option<EdgeId>,
}

impl Node {
    fn new(p: Point) -> Self {
        Self {
            p,
            distance_to_boundary: -1,
            bead_count: -1,
            transition_ratio: 0.0,
            incident_edge: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub twin: Option<EdgeId>,
    pub next: Option<EdgeId>,
    pub prev: Option<EdgeId>,
    pub kind: EdgeKind,
    /// Whether the edge belongs to the central skeleton; `None` until the
    /// marking phase ran.
    pub is_central: Option<bool>,
}

#[derive(Debug)]
pub struct HalfEdgeGraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    dead_nodes: vob::Vob<u32>,
    dead_edges: vob::Vob<u32>,
}

impl Default for HalfEdgeGraph {
    fn default() -> Self {
        Self::with_capacity(0, 0)
    }
}

impl HalfEdgeGraph {
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(nodes),
            edges: Vec::with_capacity(edges),
            dead_nodes: vob::Vob::<u32>::new_with_storage_type(nodes),
            dead_edges: vob::Vob::<u32>::new_with_storage_type(edges),
        }
    }

    #[inline(always)]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline(always)]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    #[inline(always)]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    #[inline(always)]
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    pub fn add_node(&mut self, p: Point) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(p));
        self.dead_nodes.push(false);
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            from,
            to,
            twin: None,
            next: None,
            prev: None,
            kind,
            is_central: None,
        });
        self.dead_edges.push(false);
        id
    }

    /// Couple two half edges as twins.
    #[inline(always)]
    pub fn set_twins(&mut self, a: EdgeId, b: EdgeId) {
        self.edges[a.index()].twin = Some(b);
        self.edges[b.index()].twin = Some(a);
    }

    pub fn kill_edge(&mut self, id: EdgeId) {
        let _ = self.dead_edges.set(id.index(), true);
    }

    pub fn kill_node(&mut self, id: NodeId) {
        let _ = self.dead_nodes.set(id.index(), true);
    }

    #[inline(always)]
    pub fn is_live_edge(&self, id: EdgeId) -> bool {
        !self.dead_edges[id.index()]
    }

    #[inline(always)]
    pub fn is_live_node(&self, id: NodeId) -> bool {
        !self.dead_nodes[id.index()]
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len() as u32)
            .map(EdgeId)
            .filter(|id| self.is_live_edge(*id))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32)
            .map(NodeId)
            .filter(|id| self.is_live_node(*id))
    }

    pub fn live_edge_count(&self) -> usize {
        self.edge_ids().count()
    }

    pub fn live_node_count(&self) -> usize {
        self.node_ids().count()
    }

    #[inline(always)]
    pub fn edge_length(&self, id: EdgeId) -> Coord {
        let edge = self.edge(id);
        vsize(self.node(edge.to).p - self.node(edge.from).p)
    }

    /// All outgoing edges of a node, in `e = e.twin.next` order starting at
    /// the incident edge. Stops early at the outline (missing `next`).
    pub fn outgoing_edges(&self, node: NodeId) -> SmallVec<[EdgeId; 8]> {
        let mut result = SmallVec::new();
        let Some(start) = self.node(node).incident_edge else {
            return result;
        };
        let mut e = start;
        for _ in 0..MAX_WALK {
            result.push(e);
            let Some(twin) = self.edge(e).twin else {
                break;
            };
            let Some(next) = self.edge(twin).next else {
                break;
            };
            e = next;
            if e == start {
                return result;
            }
        }
        result
    }

    /// The first and last outline point of the quad side containing `edge`.
    pub fn source_span(&self, edge: EdgeId) -> (Point, Point) {
        let mut from_edge = edge;
        for _ in 0..MAX_WALK {
            match self.edge(from_edge).prev {
                Some(prev) => from_edge = prev,
                None => break,
            }
        }
        let mut to_edge = edge;
        for _ in 0..MAX_WALK {
            match self.edge(to_edge).next {
                Some(next) => to_edge = next,
                None => break,
            }
        }
        (
            self.node(self.edge(from_edge).from).p,
            self.node(self.edge(to_edge).to).p,
        )
    }

    /// Whether a strictly higher `distance_to_boundary` is reachable through
    /// this edge. For equidistant edges the search continues through the
    /// destination's other outgoing edges.
    pub fn can_go_up(&self, edge: EdgeId, strict: bool) -> bool {
        self.dist_to_go_up_impl(edge, strict, &mut vob::Vob::<u32>::from_elem_with_storage_type(false, self.edges.len()))
            .is_some()
    }

    /// The equidistant length to travel from this edge before the distance to
    /// boundary rises, or `None` if it never does.
    pub fn dist_to_go_up(&self, edge: EdgeId) -> Option<Coord> {
        self.dist_to_go_up_impl(edge, false, &mut vob::Vob::<u32>::from_elem_with_storage_type(false, self.edges.len()))
    }

    fn dist_to_go_up_impl(
        &self,
        edge: EdgeId,
        strict: bool,
        visited: &mut vob::Vob<u32>,
    ) -> Option<Coord> {
        let e = self.edge(edge);
        let from_r = self.node(e.from).distance_to_boundary;
        let to_r = self.node(e.to).distance_to_boundary;
        if to_r > from_r {
            return Some(0);
        }
        if to_r < from_r || strict {
            return None;
        }
        if visited[edge.index()] {
            return None;
        }
        let _ = visited.set(edge.index(), true);

        // equidistant edge, recurse through the other outgoing edges of `to`
        let twin = e.twin?;
        let mut ret: Option<Coord> = None;
        let mut current = e.next;
        for _ in 0..MAX_WALK {
            let Some(out) = current else {
                break;
            };
            if out == twin {
                break;
            }
            if let Some(dist) = self.dist_to_go_up_impl(out, false, visited) {
                ret = Some(ret.map_or(dist, |r: Coord| r.min(dist)));
            }
            let Some(out_twin) = self.edge(out).twin else {
                break;
            };
            current = self.edge(out_twin).next;
        }
        ret.map(|r| r + self.edge_length(edge))
    }

    /// Whether this half edge points from lower to higher distance to
    /// boundary, with a deterministic decision for equidistant edges.
    pub fn is_upward(&self, edge: EdgeId, tie_break: TieBreak) -> bool {
        let e = self.edge(edge);
        let from_r = self.node(e.from).distance_to_boundary;
        let to_r = self.node(e.to).distance_to_boundary;
        if to_r > from_r {
            return true;
        }
        if to_r < from_r {
            return false;
        }
        let forward_up_dist = self.dist_to_go_up(edge);
        let backward_up_dist = e.twin.and_then(|twin| self.dist_to_go_up(twin));
        match (forward_up_dist, backward_up_dist) {
            (Some(f), Some(b)) => f < b,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => {
                // stable ordering; yields the opposite for the twin edge
                let to_p = self.node(e.to).p;
                let from_p = self.node(e.from).p;
                match tie_break {
                    TieBreak::PreferInner => to_p < from_p,
                    TieBreak::PreferOuter => from_p < to_p,
                }
            }
        }
    }

    /// Whether no outgoing edge of the node can reach a higher distance to
    /// boundary. Outline nodes are never local maxima.
    pub fn is_local_maximum(&self, node: NodeId, strict: bool) -> bool {
        if self.node(node).distance_to_boundary == 0 {
            return false;
        }
        for out in self.outgoing_edges(node) {
            if self.can_go_up(out, strict) {
                return false;
            }
            let Some(twin) = self.edge(out).twin else {
                return false;
            };
            if self.edge(twin).next.is_none() {
                // the node is on the boundary
                return false;
            }
        }
        true
    }

    /// Whether any edge at this node is central.
    pub fn node_is_central(&self, node: NodeId) -> bool {
        self.outgoing_edges(node)
            .iter()
            .any(|e| self.edge(*e).is_central == Some(true))
    }

    /// Whether more than two central paths meet at this node.
    pub fn is_multi_intersection(&self, node: NodeId) -> bool {
        let mut central_count = 0;
        for out in self.outgoing_edges(node) {
            if self.edge(out).is_central == Some(true) {
                central_count += 1;
            }
        }
        central_count > 2
    }

    /// Append a rib from the end of `prev_edge` perpendicular onto the source
    /// outline segment, and make the rib's returning half the new `prev_edge`.
    pub fn make_rib(&mut self, prev_edge: &mut EdgeId, source_start: Point, source_end: Point) {
        let skeleton_node = self.edge(*prev_edge).to;
        let p = closest_on_segment(self.node(skeleton_node).p, source_start, source_end);
        let dist = vsize(self.node(skeleton_node).p - p);
        self.node_mut(skeleton_node).distance_to_boundary = dist;

        let outline_node = self.add_node(p);
        self.node_mut(outline_node).distance_to_boundary = 0;

        let forth_edge = self.add_edge(skeleton_node, outline_node, EdgeKind::ExtraVd);
        let back_edge = self.add_edge(outline_node, skeleton_node, EdgeKind::ExtraVd);

        self.edge_mut(*prev_edge).next = Some(forth_edge);
        self.edge_mut(forth_edge).prev = Some(*prev_edge);
        self.set_twins(forth_edge, back_edge);
        self.node_mut(outline_node).incident_edge = Some(back_edge);

        *prev_edge = back_edge;
    }

    /// Collapse edges whose endpoints round to (nearly) the same coordinate.
    ///
    /// Middle edges of a quad are fused endpoint-into-endpoint; when both the
    /// start and the end rib collapse the whole quad is removed and its two
    /// outline ribs merge into a single pair. A small start or end rib alone
    /// is not collapsed, which preserves `next == None ⟺ outline rib`.
    pub fn collapse_small_edges(&mut self, snap_dist: Coord) {
        let original_count = self.edges.len() as u32;
        for raw in 0..original_count {
            let quad_start = EdgeId(raw);
            if !self.is_live_edge(quad_start) || self.edge(quad_start).prev.is_some() {
                continue;
            }
            let mut quad_end = quad_start;
            for _ in 0..MAX_WALK {
                match self.edge(quad_end).next {
                    Some(next) => quad_end = next,
                    None => break,
                }
            }
            let quad_mid = if self.edge(quad_start).next == Some(quad_end) {
                None
            } else {
                self.edge(quad_start).next
            };

            let should_collapse = |graph: &Self, a: NodeId, b: NodeId| {
                shorter_than(graph.node(a).p - graph.node(b).p, snap_dist)
            };

            if let Some(mid) = quad_mid {
                let mid_from = self.edge(mid).from;
                let mid_to = self.edge(mid).to;
                if should_collapse(self, mid_from, mid_to) {
                    let Some(mid_twin) = self.edge(mid).twin else {
                        log::warn!("encountered quad edge without a twin");
                        continue;
                    };
                    // rewire every edge leaving the collapsed endpoint
                    let mut edge_from_3 = quad_end;
                    for _ in 0..MAX_WALK {
                        if edge_from_3 == mid_twin {
                            break;
                        }
                        self.edge_mut(edge_from_3).from = mid_from;
                        let twin = self.edge(edge_from_3).twin;
                        let Some(twin) = twin else { break };
                        self.edge_mut(twin).to = mid_from;
                        let Some(next) = self.edge(twin).next else {
                            break;
                        };
                        edge_from_3 = next;
                    }
                    if self.node(mid_from).incident_edge == Some(mid) {
                        let replacement = self
                            .edge(mid_twin)
                            .next
                            .or_else(|| self.edge(mid).prev.and_then(|p| self.edge(p).twin));
                        self.node_mut(mid_from).incident_edge = replacement;
                    }
                    self.kill_node(mid_to);

                    let mid_prev = self.edge(mid).prev;
                    let mid_next = self.edge(mid).next;
                    if let Some(prev) = mid_prev {
                        self.edge_mut(prev).next = mid_next;
                    }
                    if let Some(next) = mid_next {
                        self.edge_mut(next).prev = mid_prev;
                    }
                    let twin_prev = self.edge(mid_twin).prev;
                    let twin_next = self.edge(mid_twin).next;
                    if let Some(next) = twin_next {
                        self.edge_mut(next).prev = twin_prev;
                    }
                    if let Some(prev) = twin_prev {
                        self.edge_mut(prev).next = twin_next;
                    }

                    self.kill_edge(mid);
                    self.kill_edge(mid_twin);
                }
            }

            let start_from = self.edge(quad_start).from;
            let start_to = self.edge(quad_start).to;
            let end_from = self.edge(quad_end).from;
            let end_to = self.edge(quad_end).to;
            if should_collapse(self, start_from, end_to) && should_collapse(self, start_to, end_from)
            {
                // collapse the start and end rib and remove the whole quad
                let Some(start_twin) = self.edge(quad_start).twin else {
                    log::warn!("encountered quad start without a twin");
                    continue;
                };
                let Some(end_twin) = self.edge(quad_end).twin else {
                    log::warn!("encountered quad end without a twin");
                    continue;
                };
                self.edge_mut(start_twin).to = end_to;
                self.node_mut(end_to).incident_edge = Some(end_twin);
                if self.node(end_from).incident_edge == Some(quad_end) {
                    let replacement = self
                        .edge(end_twin)
                        .next
                        .or_else(|| self.edge(quad_end).prev.and_then(|p| self.edge(p).twin));
                    self.node_mut(end_from).incident_edge = replacement;
                }
                self.kill_node(start_from);

                self.set_twins(start_twin, end_twin);
                self.kill_edge(quad_start);
                self.kill_edge(quad_end);
            }
        }
    }

    /// Split `edge` (and its twin) at `mid` and insert rib pairs so the new
    /// node is reachable from the outline like any other skeleton node.
    /// Returns the second half of the original edge.
    pub fn insert_node(
        &mut self,
        edge: EdgeId,
        mid: Point,
        mid_node_bead_count: i32,
    ) -> Result<EdgeId, WallrError> {
        let mid_node = self.add_node(mid);

        let twin = self.edge(edge).twin.ok_or_else(|| {
            WallrError::GraphInconsistency("cannot split an edge without a twin".to_string())
        })?;
        self.edge_mut(edge).twin = None;
        self.edge_mut(twin).twin = None;
        let (first_half, second_half) = self.insert_rib(edge, mid_node)?;
        let (first_twin_half, second_twin_half) = self.insert_rib(twin, mid_node)?;

        self.set_twins(first_half, second_twin_half);
        self.set_twins(second_half, first_twin_half);

        self.node_mut(mid_node).bead_count = mid_node_bead_count;
        Ok(second_half)
    }

    /// Split one half edge at `mid_node` and hang a fresh transition-end rib
    /// pair between the new node and the source outline. Twins of the two
    /// halves are left unset; `insert_node` couples them.
    fn insert_rib(&mut self, edge: EdgeId, mid_node: NodeId) -> Result<(EdgeId, EdgeId), WallrError> {
        let edge_before = self.edge(edge).prev;
        let edge_after = self.edge(edge).next;
        let node_before = self.edge(edge).from;
        let node_after = self.edge(edge).to;

        let p = self.node(mid_node).p;
        let (source_start, source_end) = self.source_span(edge);
        let px = closest_on_segment(p, source_start, source_end);
        let dist = vsize(p - px);
        if dist <= 0 {
            return Err(WallrError::GraphInconsistency(
                "transition rib would have zero length".to_string(),
            ));
        }
        self.node_mut(mid_node).distance_to_boundary = dist;
        // a whole number of beads fits at a transition end
        self.node_mut(mid_node).transition_ratio = 0.0;

        let source_node = self.add_node(px);
        self.node_mut(source_node).distance_to_boundary = 0;

        let first = edge;
        let second = self.add_edge(mid_node, node_after, EdgeKind::Normal);
        let outward_edge = self.add_edge(mid_node, source_node, EdgeKind::TransitionEnd);
        let inward_edge = self.add_edge(source_node, mid_node, EdgeKind::TransitionEnd);

        if let Some(before) = edge_before {
            self.edge_mut(before).next = Some(first);
        }
        self.edge_mut(first).next = Some(outward_edge);
        self.edge_mut(outward_edge).next = None;
        self.edge_mut(inward_edge).next = Some(second);
        self.edge_mut(second).next = edge_after;

        if let Some(after) = edge_after {
            self.edge_mut(after).prev = Some(second);
        }
        self.edge_mut(second).prev = Some(inward_edge);
        self.edge_mut(inward_edge).prev = None;
        self.edge_mut(outward_edge).prev = Some(first);
        self.edge_mut(first).prev = edge_before;

        self.edge_mut(first).to = mid_node;
        self.edge_mut(first).from = node_before;

        self.node_mut(node_before).incident_edge = Some(first);
        self.node_mut(mid_node).incident_edge = Some(outward_edge);
        self.node_mut(source_node).incident_edge = Some(inward_edge);
        if let Some(after) = edge_after {
            let after_from = self.edge(after).from;
            self.node_mut(after_from).incident_edge = Some(after);
        }

        self.edge_mut(first).is_central = Some(true);
        self.edge_mut(outward_edge).is_central = Some(false);
        self.edge_mut(inward_edge).is_central = Some(false);
        self.edge_mut(second).is_central = Some(true);

        self.set_twins(outward_edge, inward_edge);
        self.edge_mut(first).twin = None;
        self.edge_mut(second).twin = None;

        Ok((first, second))
    }

    /// Verify the graph invariants. Violations are programming bugs; the
    /// caller aborts the layer.
    pub fn check_consistency(&self) -> Result<(), WallrError> {
        for edge_id in self.edge_ids() {
            let edge = self.edge(edge_id);
            let twin = edge.twin.ok_or_else(|| {
                WallrError::GraphInconsistency(format!("edge {:?} has no twin", edge_id))
            })?;
            if !self.is_live_edge(twin) {
                return Err(WallrError::GraphInconsistency(format!(
                    "edge {:?} has a dead twin",
                    edge_id
                )));
            }
            let twin_edge = self.edge(twin);
            if twin_edge.twin != Some(edge_id) || twin_edge.from != edge.to || twin_edge.to != edge.from
            {
                return Err(WallrError::GraphInconsistency(format!(
                    "twin mismatch at edge {:?}",
                    edge_id
                )));
            }
            if let Some(next) = edge.next {
                let next_edge = self.edge(next);
                if next_edge.prev != Some(edge_id) || next_edge.from != edge.to {
                    return Err(WallrError::GraphInconsistency(format!(
                        "next/prev mismatch at edge {:?}",
                        edge_id
                    )));
                }
            }
            if edge.kind == EdgeKind::ExtraVd {
                let from_r = self.node(edge.from).distance_to_boundary;
                let to_r = self.node(edge.to).distance_to_boundary;
                // a sliver rib may have rounded fully onto the outline; a rib
                // touching it at neither end is broken
                if from_r != 0 && to_r != 0 {
                    return Err(WallrError::GraphInconsistency(format!(
                        "rib {:?} does not touch the outline",
                        edge_id
                    )));
                }
            }
        }
        for node_id in self.node_ids() {
            let node = self.node(node_id);
            if node.distance_to_boundary < 0 {
                return Err(WallrError::GraphInconsistency(format!(
                    "node {:?} has no distance to boundary",
                    node_id
                )));
            }
            if let Some(incident) = node.incident_edge {
                if !self.is_live_edge(incident) || self.edge(incident).from != node_id {
                    return Err(WallrError::GraphInconsistency(format!(
                        "incident edge of node {:?} is not outgoing",
                        node_id
                    )));
                }
            }
        }
        Ok(())
    }
}
