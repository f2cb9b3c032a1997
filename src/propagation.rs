// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Propagation of beadings from the central regions to every node of the
//! graph.
//!
//! Central nodes are seeded from the beading strategy. The beading then
//! travels upward into local maxima that carry no own bead count, and
//! downward toward the outline; where an upward and a downward propagated
//! beading meet they are interpolated by traveled distance.

use crate::{
    beading::Beading,
    geo::Coord,
    graph::{EdgeId, NodeId},
    walls::WallSkeleton,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// How far to search for an adjacent beading before giving up and computing
/// one locally.
const BEAD_SEARCH_MAX: Coord = 1000;

#[derive(Debug, Clone)]
pub(crate) struct BeadingPropagation {
    pub beading: Beading,
    pub dist_to_bottom_source: Coord,
    pub dist_from_top_source: Coord,
    pub is_upward_propagated_only: bool,
}

impl BeadingPropagation {
    fn new(beading: Beading) -> Self {
        Self {
            beading,
            dist_to_bottom_source: 0,
            dist_from_top_source: 0,
            is_upward_propagated_only: false,
        }
    }
}

pub(crate) type NodeBeadings = FxHashMap<NodeId, BeadingPropagation>;

impl WallSkeleton<'_> {
    /// Seed and propagate; afterwards every node reachable from the central
    /// region has a beading.
    pub(crate) fn propagate_beadings(&mut self) -> NodeBeadings {
        let mut node_beadings = NodeBeadings::default();

        // seeds: nodes with an assigned bead count
        for n in self.graph.node_ids() {
            let node = self.graph.node(n);
            if node.bead_count >= 0 && node.distance_to_boundary > 0 {
                let beading = self
                    .checked_compute(node.distance_to_boundary * 2, node.bead_count as usize);
                let _ = node_beadings.insert(n, BeadingPropagation::new(beading));
            }
        }

        // all upward halves of inner skeleton edges (neither endpoint on the
        // outline), sorted on the higher endpoint's distance, descending
        let mut upward_quad_mids: Vec<EdgeId> = self
            .graph
            .edge_ids()
            .filter(|e| {
                let edge = self.graph.edge(*e);
                self.graph.node(edge.from).distance_to_boundary > 0
                    && self.graph.node(edge.to).distance_to_boundary > 0
                    && self.graph.is_upward(*e, self.cfg.tie_break)
            })
            .collect();
        upward_quad_mids.sort_by_key(|e| {
            let to = self.graph.edge(*e).to;
            (-self.graph.node(to).distance_to_boundary, *e)
        });

        self.propagate_upward(&upward_quad_mids, &mut node_beadings);
        self.propagate_downward(&upward_quad_mids, &mut node_beadings);
        node_beadings
    }

    /// Copy beadings from lower to higher nodes, bottom up, without
    /// overriding nodes that carry their own bead count.
    fn propagate_upward(&self, upward_quad_mids: &[EdgeId], node_beadings: &mut NodeBeadings) {
        for &e in upward_quad_mids.iter().rev() {
            let edge = self.graph.edge(e);
            if self.graph.node(edge.to).bead_count >= 0 {
                continue;
            }
            if node_beadings.contains_key(&edge.to) {
                continue;
            }
            let Some(lower) = node_beadings.get(&edge.from) else {
                continue;
            };
            let mut upper = lower.clone();
            upper.dist_to_bottom_source += self.graph.edge_length(e);
            upper.is_upward_propagated_only = true;
            let _ = node_beadings.insert(edge.to, upper);
        }
    }

    /// Copy beadings from higher to lower nodes, top down, merging with
    /// beadings the upward pass left behind.
    fn propagate_downward(&self, upward_quad_mids: &[EdgeId], node_beadings: &mut NodeBeadings) {
        for &e in upward_quad_mids {
            let edge = self.graph.edge(e);
            let length = self.graph.edge_length(e);
            let Some(top) = node_beadings.get(&edge.to).cloned() else {
                continue;
            };
            let bottom = node_beadings.get(&edge.from).cloned();
            match bottom {
                None => {
                    let mut prop = top;
                    prop.dist_from_top_source += length;
                    prop.is_upward_propagated_only = false;
                    let _ = node_beadings.insert(edge.from, prop);
                }
                Some(bottom) if bottom.is_upward_propagated_only => {
                    let total =
                        bottom.dist_to_bottom_source + top.dist_from_top_source + length;
                    let ratio_top = if total > 0 {
                        bottom.dist_to_bottom_source as f64 / total as f64
                    } else {
                        0.5
                    };
                    let from_r = self.graph.node(edge.from).distance_to_boundary;
                    let merged =
                        self.interpolate_beadings(&top.beading, ratio_top, &bottom.beading, from_r);
                    let _ = node_beadings.insert(
                        edge.from,
                        BeadingPropagation {
                            beading: merged,
                            dist_to_bottom_source: bottom.dist_to_bottom_source,
                            dist_from_top_source: top.dist_from_top_source + length,
                            is_upward_propagated_only: false,
                        },
                    );
                }
                Some(_) => {} // the node already has a settled beading
            }
        }
    }

    /// Blend two beadings that meet at a node of radius `radius`.
    fn interpolate_beadings(
        &self,
        top: &Beading,
        ratio_top: f64,
        bottom: &Beading,
        radius: Coord,
    ) -> Beading {
        let ratio = ratio_top.clamp(0.0, 1.0);
        if top.bead_count() == bottom.bead_count() {
            return lerp_beading(top, ratio, bottom);
        }
        let min_count = top.bead_count().min(bottom.bead_count());
        let diff = top.bead_count().abs_diff(bottom.bead_count());
        let transition_thickness = self.strategy.transition_thickness(min_count);
        let in_transition_band = (radius * 2 - transition_thickness).abs()
            <= self.cfg.beading_propagation_transition_dist;
        if diff == 1 && in_transition_band {
            let (rich, rich_ratio, poor) = if top.bead_count() > bottom.bead_count() {
                (top, ratio, bottom)
            } else {
                (bottom, 1.0 - ratio, top)
            };
            let mut merged = lerp_beading_partial(rich, rich_ratio, poor, min_count);
            // the extra innermost bead of the richer side fades out with its
            // propagation share
            if let (Some(&w), Some(&loc)) = (
                rich.bead_widths.get(min_count),
                rich.toolpath_locations.get(min_count),
            ) {
                merged.bead_widths.push((w as f64 * rich_ratio) as Coord);
                merged.toolpath_locations.push(loc);
            }
            merged
        } else if ratio >= 0.5 {
            top.clone()
        } else {
            bottom.clone()
        }
    }

    /// The beading to use at a node during junction generation. Nodes the
    /// propagation could not reach borrow from the nearest beading within a
    /// bounded search, or compute their own as a last resort.
    pub(crate) fn beading_for_node(
        &self,
        node: NodeId,
        node_beadings: &mut NodeBeadings,
    ) -> Beading {
        if let Some(prop) = node_beadings.get(&node) {
            return prop.beading.clone();
        }
        if let Some(found) = self.nearest_beading(node, node_beadings) {
            let _ = node_beadings.insert(node, BeadingPropagation::new(found.clone()));
            return found;
        }
        let r = self.graph.node(node).distance_to_boundary;
        let count = self.strategy.optimal_bead_count(r * 2);
        log::debug!(
            "node {:?} was not reached by beading propagation; computing locally",
            node
        );
        let beading = self.checked_compute(r * 2, count);
        let _ = node_beadings.insert(node, BeadingPropagation::new(beading.clone()));
        beading
    }

    /// Breadth-first search for any nearby node that already has a beading.
    fn nearest_beading(&self, node: NodeId, node_beadings: &NodeBeadings) -> Option<Beading> {
        let mut queue = VecDeque::new();
        queue.push_back((node, 0));
        let mut visited = vob::Vob::<u32>::from_elem_with_storage_type(false, self.graph.nodes.len());
        let _ = visited.set(node.index(), true);
        while let Some((current, dist)) = queue.pop_front() {
            for out in self.graph.outgoing_edges(current) {
                let other = self.graph.edge(out).to;
                if visited[other.index()] {
                    continue;
                }
                let _ = visited.set(other.index(), true);
                let other_dist = dist + self.graph.edge_length(out);
                if other_dist > BEAD_SEARCH_MAX {
                    continue;
                }
                if let Some(prop) = node_beadings.get(&other) {
                    return Some(prop.beading.clone());
                }
                queue.push_back((other, other_dist));
            }
        }
        None
    }

    /// Compute a beading and log when the strategy overfills the requested
    /// thickness by more than the snap distance. Underfilling is legitimate:
    /// a capped strategy leaves the center of thick parts over on purpose.
    pub(crate) fn checked_compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let beading = self.strategy.compute(thickness, bead_count);
        if bead_count > 0 && beading.total_width() > beading.total_thickness + self.cfg.snap_dist {
            log::warn!(
                "beading strategy widths sum to {} for a thickness of {}; keeping the strategy's answer",
                beading.total_width(),
                beading.total_thickness
            );
        }
        beading
    }
}

/// Pairwise linear interpolation of two beadings with equal counts.
fn lerp_beading(left: &Beading, ratio_left: f64, right: &Beading) -> Beading {
    let mut merged = lerp_beading_partial(left, ratio_left, right, left.bead_count());
    merged.total_thickness = lerp_coord(left.total_thickness, ratio_left, right.total_thickness);
    merged
}

/// Interpolate the first `count` beads of two beadings.
fn lerp_beading_partial(left: &Beading, ratio_left: f64, right: &Beading, count: usize) -> Beading {
    let mut widths = Vec::with_capacity(count + 1);
    let mut locations = Vec::with_capacity(count + 1);
    for i in 0..count {
        widths.push(lerp_coord(
            left.bead_widths[i],
            ratio_left,
            right.bead_widths[i],
        ));
        locations.push(lerp_coord(
            left.toolpath_locations[i],
            ratio_left,
            right.toolpath_locations[i],
        ));
    }
    Beading {
        total_thickness: lerp_coord(left.total_thickness, ratio_left, right.total_thickness),
        bead_widths: widths,
        toolpath_locations: locations,
    }
}

#[inline(always)]
fn lerp_coord(left: Coord, ratio_left: f64, right: Coord) -> Coord {
    (left as f64 * ratio_left + right as f64 * (1.0 - ratio_left)).round() as Coord
}
