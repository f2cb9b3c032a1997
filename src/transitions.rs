// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Planning of bead count transitions: where along the skeleton the bead
//! count changes (transition middles), how far each change is spread out
//! (transition ends), and the graph surgery that anchors the ends with fresh
//! ribs.

#[cfg(test)]
mod tests;

use crate::{
    WallrError,
    geo::{Coord, lerp},
    graph::{EdgeId, NodeId},
    walls::WallSkeleton,
};
use rustc_hash::FxHashMap;

/// The location along an edge where the optimal bead count changes. The host
/// edge is always the half edge oriented from lower to higher distance to
/// boundary; `pos` is measured from its `from` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransitionMiddle {
    pub pos: Coord,
    pub lower_bead_count: i32,
}

/// The lower or upper end of a transition region, on the upward half edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransitionEnd {
    pub pos: Coord,
    pub lower_bead_count: i32,
    pub is_lower_end: bool,
}

type MidMap = FxHashMap<EdgeId, Vec<TransitionMiddle>>;
type EndMap = FxHashMap<EdgeId, Vec<TransitionEnd>>;

impl WallSkeleton<'_> {
    /// Plan all transitions and anchor them in the graph.
    pub(crate) fn generate_transitioning_ribs(&mut self) -> Result<(), WallrError> {
        let mut edge_mids = self.generate_transition_mids();
        self.filter_transition_mids(&mut edge_mids);
        let mut edge_ends = EndMap::default();
        self.generate_transition_ends(&edge_mids, &mut edge_ends);
        self.apply_transitions(&mut edge_ends)
    }

    /// For every upward central edge whose endpoint bead counts differ,
    /// place one transition middle per skipped count at the position where
    /// the interpolated radius crosses the strategy's transition thickness.
    fn generate_transition_mids(&self) -> MidMap {
        let mut edge_mids = MidMap::default();
        for e in self.graph.edge_ids() {
            let edge = self.graph.edge(e);
            if edge.is_central != Some(true) {
                continue;
            }
            let from = self.graph.node(edge.from);
            let to = self.graph.node(edge.to);
            let start_r = from.distance_to_boundary;
            let end_r = to.distance_to_boundary;
            if start_r >= end_r {
                // only the upward half carries the transitions; horizontal
                // edges carry none at all
                continue;
            }
            let start_count = from.bead_count;
            let end_count = to.bead_count;
            if start_count < 0 || end_count <= start_count {
                continue;
            }
            let length = self.graph.edge_length(e);
            let mut mids = Vec::with_capacity((end_count - start_count) as usize);
            for k in start_count..end_count {
                let transition_thickness = self.strategy.transition_thickness(k as usize);
                if transition_thickness >= Coord::MAX / 8 {
                    // above a bead count cap there is no transition
                    continue;
                }
                let mid_r = (transition_thickness / 2).clamp(start_r, end_r);
                let pos = (length as i128 * (mid_r - start_r) as i128
                    / (end_r - start_r) as i128) as Coord;
                mids.push(TransitionMiddle {
                    pos,
                    lower_bead_count: k,
                });
            }
            if !mids.is_empty() {
                let _ = edge_mids.insert(e, mids);
            }
        }
        edge_mids
    }

    /// Dissolve transitions that would only exist because of a local bump:
    /// pairs of opposite transitions closer than the filter distance, and
    /// pointed local maxima whose higher count holds for less than the filter
    /// distance.
    fn filter_transition_mids(&mut self, edge_mids: &mut MidMap) {
        // deterministic processing order: lower end radius first, then id
        let mut edges: Vec<EdgeId> = edge_mids.keys().copied().collect();
        edges.sort_by_key(|e| {
            (
                self.graph.node(self.graph.edge(*e).from).distance_to_boundary,
                *e,
            )
        });

        for e in edges {
            let Some(mids) = edge_mids.get(&e) else {
                continue;
            };
            if mids.is_empty() {
                continue;
            }

            // upward: does the count drop back shortly above the last mid?
            let last = *mids.last().unwrap();
            let length = self.graph.edge_length(e);
            if self.fold_deviation(last.lower_bead_count) <= self.cfg.allowed_filter_deviation {
                let up = self.dissolve_nearby_transitions(
                    e,
                    last.lower_bead_count,
                    length - last.pos,
                    self.cfg.transition_filter_dist,
                    true,
                    edge_mids,
                );
                if up.dissolve_origin {
                    for (other_edge, idx) in up.found {
                        if let Some(list) = edge_mids.get_mut(&other_edge) {
                            if idx < list.len() {
                                let _ = list.remove(idx);
                            }
                        }
                    }
                    self.dissolve_bead_count_region(
                        e,
                        last.lower_bead_count + 1,
                        last.lower_bead_count,
                    );
                    if let Some(list) = edge_mids.get_mut(&e) {
                        let _ = list.pop();
                    }
                }
            }

            let Some(mids) = edge_mids.get(&e) else {
                continue;
            };
            if mids.is_empty() {
                continue;
            }
            // downward: does the count rise back shortly below the first mid?
            let first = mids[0];
            if self.fold_deviation(first.lower_bead_count) > self.cfg.allowed_filter_deviation {
                continue;
            }
            let Some(twin) = self.graph.edge(e).twin else {
                continue;
            };
            let down = self.dissolve_nearby_transitions(
                twin,
                first.lower_bead_count,
                first.pos,
                self.cfg.transition_filter_dist,
                false,
                edge_mids,
            );
            if down.dissolve_origin && !down.found.is_empty() {
                for (other_edge, idx) in down.found {
                    if let Some(list) = edge_mids.get_mut(&other_edge) {
                        if idx < list.len() {
                            let _ = list.remove(idx);
                        }
                    }
                }
                // the dip between the two dissolved transitions is raised to
                // the surrounding count
                self.dissolve_bead_count_region(
                    twin,
                    first.lower_bead_count,
                    first.lower_bead_count + 1,
                );
                if let Some(list) = edge_mids.get_mut(&e) {
                    if !list.is_empty() {
                        let _ = list.remove(0);
                    }
                }
            }
        }
        edge_mids.retain(|_, mids| !mids.is_empty());
    }

    /// How much every remaining bead widens when a plateau is folded from
    /// `k + 1` down to `k` beads. Dissolution is only allowed while this
    /// stays within the configured filter deviation.
    fn fold_deviation(&self, k: i32) -> Coord {
        let thickness = self.strategy.transition_thickness(k.max(0) as usize);
        if k <= 0 {
            thickness
        } else {
            thickness / k as Coord - thickness / (k as Coord + 1)
        }
    }

    /// Search for transitions of the same lower bead count within `max_dist`
    /// of the start edge's destination, walking in the vertical direction
    /// given by `going_up`.
    fn dissolve_nearby_transitions(
        &self,
        edge_to_start: EdgeId,
        origin_count: i32,
        traveled_dist: Coord,
        max_dist: Coord,
        going_up: bool,
        edge_mids: &MidMap,
    ) -> DissolveResult {
        let mut result = DissolveResult::default();
        if traveled_dist > max_dist {
            return result;
        }
        let twin = self.graph.edge(edge_to_start).twin;
        let Some(mut out) = self.graph.edge(edge_to_start).next else {
            return result;
        };
        let mut went_anywhere = false;
        loop {
            if Some(out) == twin {
                break;
            }
            if self.graph.edge(out).is_central == Some(true) {
                let aligned = self.graph.is_upward(out, self.cfg.tie_break);
                let length = self.graph.edge_length(out);
                if aligned == going_up {
                    // same vertical direction, keep walking
                    went_anywhere = true;
                    let deeper = self.dissolve_nearby_transitions(
                        out,
                        origin_count,
                        traveled_dist + length,
                        max_dist,
                        going_up,
                        edge_mids,
                    );
                    result.merge(deeper);
                } else {
                    // opposite direction: a transition back to the origin
                    // count dissolves the pair
                    went_anywhere = true;
                    let host = if aligned { out } else { self.graph.edge(out).twin.unwrap_or(out) };
                    if let Some(mids) = edge_mids.get(&host) {
                        for (idx, mid) in mids.iter().enumerate() {
                            // distance from the walk node to the mid along
                            // the host's upward orientation
                            let dist_on_edge = if host == out {
                                mid.pos
                            } else {
                                length - mid.pos
                            };
                            if mid.lower_bead_count == origin_count
                                && traveled_dist + dist_on_edge <= max_dist
                            {
                                result.dissolve_origin = true;
                                result.found.push((host, idx));
                            }
                        }
                    }
                }
            }
            let Some(out_twin) = self.graph.edge(out).twin else {
                break;
            };
            match self.graph.edge(out_twin).next {
                Some(n) => out = n,
                None => break,
            }
        }
        if going_up && !went_anywhere {
            // a pointed local maximum inside the filter distance folds the
            // region above the origin into the lower count
            let node = self.graph.edge(edge_to_start).to;
            if self.graph.is_local_maximum(node, false) {
                result.dissolve_origin = true;
            }
        }
        result
    }

    /// Reassign the bead count of a dissolved plateau.
    fn dissolve_bead_count_region(
        &mut self,
        edge_to_start: EdgeId,
        from_bead_count: i32,
        to_bead_count: i32,
    ) {
        debug_assert_ne!(from_bead_count, to_bead_count);
        let to_node = self.graph.edge(edge_to_start).to;
        if self.graph.node(to_node).bead_count != from_bead_count {
            return;
        }
        self.graph.node_mut(to_node).bead_count = to_bead_count;

        let twin = self.graph.edge(edge_to_start).twin;
        let Some(mut out) = self.graph.edge(edge_to_start).next else {
            return;
        };
        loop {
            if Some(out) == twin {
                break;
            }
            if self.graph.edge(out).is_central == Some(true) {
                self.dissolve_bead_count_region(out, from_bead_count, to_bead_count);
            }
            let Some(out_twin) = self.graph.edge(out).twin else {
                break;
            };
            match self.graph.edge(out_twin).next {
                Some(n) => out = n,
                None => break,
            }
        }
    }

    /// Walk outward from every surviving transition middle and record where
    /// the transition begins and ends.
    fn generate_transition_ends(&mut self, edge_mids: &MidMap, edge_ends: &mut EndMap) {
        let mut edges: Vec<EdgeId> = edge_mids.keys().copied().collect();
        edges.sort_by_key(|e| {
            (
                self.graph.node(self.graph.edge(*e).from).distance_to_boundary,
                *e,
            )
        });
        for e in edges {
            for mid in &edge_mids[&e] {
                let half_length = self
                    .strategy
                    .transitioning_length(mid.lower_bead_count.max(0) as usize);
                self.generate_lower_end(e, mid.pos, mid.lower_bead_count, half_length, edge_ends);
                self.generate_upper_end(e, mid.pos, mid.lower_bead_count, half_length, edge_ends);
            }
        }
    }

    /// Place the lower end `half_length` below the middle, walking down
    /// through the central region and splitting over all downward branches.
    fn generate_lower_end(
        &mut self,
        edge: EdgeId,
        mid_pos: Coord,
        lower_bead_count: i32,
        remaining: Coord,
        edge_ends: &mut EndMap,
    ) {
        if mid_pos >= remaining {
            // the end fits on this edge
            edge_ends.entry(edge).or_default().push(TransitionEnd {
                pos: mid_pos - remaining,
                lower_bead_count,
                is_lower_end: true,
            });
            return;
        }
        let node = self.graph.edge(edge).from;
        let rest = remaining - mid_pos;
        if self.graph.node(node).distance_to_boundary == 0 {
            // clamped at the outline
            self.clamp_end_at_outline(node, lower_bead_count, rest, remaining);
            return;
        }
        let mut went_down = false;
        for out in self.graph.outgoing_edges(node) {
            if out == edge {
                continue;
            }
            if self.graph.edge(out).is_central != Some(true) {
                continue;
            }
            if self.graph.is_upward(out, self.cfg.tie_break) {
                continue;
            }
            // descend along `out`; the end is recorded on its upward twin
            let Some(upward) = self.graph.edge(out).twin else {
                continue;
            };
            let length = self.graph.edge_length(out);
            went_down = true;
            if length >= rest {
                edge_ends.entry(upward).or_default().push(TransitionEnd {
                    pos: length - rest,
                    lower_bead_count,
                    is_lower_end: true,
                });
            } else {
                self.generate_lower_end(upward, 0, lower_bead_count, rest - length, edge_ends);
            }
        }
        if !went_down {
            // clamped at the central region boundary
            edge_ends.entry(edge).or_default().push(TransitionEnd {
                pos: 0,
                lower_bead_count,
                is_lower_end: true,
            });
        }
    }

    /// Place the upper end `half_length` above the middle, walking up
    /// through the central region and splitting over all upward branches.
    fn generate_upper_end(
        &mut self,
        edge: EdgeId,
        mid_pos: Coord,
        lower_bead_count: i32,
        remaining: Coord,
        edge_ends: &mut EndMap,
    ) {
        let length = self.graph.edge_length(edge);
        if mid_pos + remaining <= length {
            edge_ends.entry(edge).or_default().push(TransitionEnd {
                pos: mid_pos + remaining,
                lower_bead_count,
                is_lower_end: false,
            });
            return;
        }
        let node = self.graph.edge(edge).to;
        let rest = mid_pos + remaining - length;
        if self.graph.node(node).distance_to_boundary == 0 {
            self.clamp_end_at_outline(node, lower_bead_count + 1, rest, remaining);
            return;
        }
        let twin = self.graph.edge(edge).twin;
        let mut went_up = false;
        for out in self.graph.outgoing_edges(node) {
            if Some(out) == twin {
                continue;
            }
            if self.graph.edge(out).is_central != Some(true) {
                continue;
            }
            if !self.graph.is_upward(out, self.cfg.tie_break) {
                continue;
            }
            went_up = true;
            self.generate_upper_end(out, 0, lower_bead_count, rest, edge_ends);
        }
        if !went_up {
            // clamped at the central region boundary
            edge_ends.entry(edge).or_default().push(TransitionEnd {
                pos: length,
                lower_bead_count,
                is_lower_end: false,
            });
        }
    }

    /// A transition end that ran off the skeleton onto the outline: the node
    /// keeps a transition ratio instead of a rib.
    fn clamp_end_at_outline(
        &mut self,
        node: NodeId,
        bead_count: i32,
        rest: Coord,
        half_length: Coord,
    ) {
        let node_mut = self.graph.node_mut(node);
        node_mut.bead_count = bead_count;
        node_mut.transition_ratio = rest as f64 / half_length.max(1) as f64;
    }

    /// Anchor the recorded transition ends: split the host edges and hang
    /// fresh ribs at the split nodes, or reuse the edge endpoints when an end
    /// lands within snap distance of one.
    fn apply_transitions(&mut self, edge_ends: &mut EndMap) -> Result<(), WallrError> {
        let mut edges: Vec<EdgeId> = edge_ends.keys().copied().collect();
        edges.sort();
        for e in edges {
            let Some(mut ends) = edge_ends.remove(&e) else {
                continue;
            };
            ends.sort_by_key(|end| (end.pos, end.lower_bead_count, end.is_lower_end));
            ends.dedup();
            // split from the far end; earlier positions stay valid on the
            // shrinking first half
            for end in ends.iter().rev() {
                let length = self.graph.edge_length(e);
                let end_bead_count = end.lower_bead_count + if end.is_lower_end { 0 } else { 1 };
                if end.pos <= self.cfg.snap_dist {
                    let from = self.graph.edge(e).from;
                    let node = self.graph.node_mut(from);
                    node.bead_count = end_bead_count;
                    node.transition_ratio = 0.0;
                } else if end.pos >= length - self.cfg.snap_dist {
                    let to = self.graph.edge(e).to;
                    let node = self.graph.node_mut(to);
                    node.bead_count = end_bead_count;
                    node.transition_ratio = 0.0;
                } else {
                    let from_p = self.graph.node(self.graph.edge(e).from).p;
                    let to_p = self.graph.node(self.graph.edge(e).to).p;
                    let mid = lerp(from_p, to_p, end.pos, length);
                    let _ = self.graph.insert_node(e, mid, end_bead_count)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct DissolveResult {
    /// Transition middles found to cancel against the origin, as
    /// (host edge, index into its middle list).
    found: Vec<(EdgeId, usize)>,
    /// Whether the origin middle itself has to go.
    dissolve_origin: bool,
}

impl DissolveResult {
    fn merge(&mut self, other: DissolveResult) {
        self.found.extend(other.found);
        self.dissolve_origin |= other.dissolve_origin;
    }
}
