// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Classification of skeleton edges as central, plus the bead count
//! assignment on central nodes.
//!
//! An edge is central when the source feature it witnesses is sharper than
//! the transitioning angle. In slope form: |dR| < dD / tan((π − α)/2), which
//! flips at the breakpoints the discretization inserted. Central regions
//! smaller than the marking filter distance are rounding artifacts and get
//! unmarked again.

use crate::{
    geo::{Coord, Point, shorter_than, vsize},
    graph::{EdgeId, EdgeKind, NodeId},
    walls::WallSkeleton,
};
use rustc_hash::FxHashMap;

impl WallSkeleton<'_> {
    /// Set `is_central` on every edge.
    pub(crate) fn update_central_marking(&mut self) {
        let cap = 1.0 / ((std::f64::consts::PI - self.cfg.transitioning_angle) / 2.0).tan();
        // regions too thin to hold a single bead never become central
        let outer_edge_filter_length = self.strategy.transition_thickness(0) / 2;

        let edge_ids: Vec<EdgeId> = self.graph.edge_ids().collect();
        for e in edge_ids {
            let edge = self.graph.edge(e);
            let twin_marking = edge
                .twin
                .and_then(|twin| self.graph.edge(twin).is_central);
            let central = if let Some(marking) = twin_marking {
                marking
            } else if edge.kind != EdgeKind::Normal {
                false
            } else {
                let from = self.graph.node(edge.from);
                let to = self.graph.node(edge.to);
                if from.distance_to_boundary.max(to.distance_to_boundary)
                    < outer_edge_filter_length
                {
                    false
                } else {
                    let d_r = (to.distance_to_boundary - from.distance_to_boundary).abs();
                    let d_d = vsize(to.p - from.p);
                    (d_r as f64) < (d_d as f64) * cap
                }
            };
            self.graph.edge_mut(e).is_central = Some(central);
        }
    }

    /// Unmark central regions whose geometric extent is below `max_length`.
    /// Regions containing a local maximum of the distance function are kept;
    /// they are the tips the walls have to fill.
    pub(crate) fn filter_central(&mut self, max_length: Coord) {
        // connected components over the central subgraph
        let mut component_of: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut components: Vec<Vec<EdgeId>> = Vec::new();

        let central_edges: Vec<EdgeId> = self
            .graph
            .edge_ids()
            .filter(|e| self.graph.edge(*e).is_central == Some(true))
            .collect();
        for &e in &central_edges {
            let from = self.graph.edge(e).from;
            let to = self.graph.edge(e).to;
            let component = match (component_of.get(&from), component_of.get(&to)) {
                (Some(&c), _) | (_, Some(&c)) => c,
                (None, None) => {
                    components.push(Vec::new());
                    components.len() - 1
                }
            };
            // flood the whole component at once so late edges cannot bridge
            // two previously distinct components
            let mut stack = vec![from, to];
            while let Some(node) = stack.pop() {
                if component_of.insert(node, component).is_some() {
                    continue;
                }
                for out in self.graph.outgoing_edges(node) {
                    if self.graph.edge(out).is_central == Some(true) {
                        let other = self.graph.edge(out).to;
                        if !component_of.contains_key(&other) {
                            stack.push(other);
                        }
                    }
                }
            }
            components[component].push(e);
        }

        for edges in components {
            let mut min = (Coord::MAX, Coord::MAX);
            let mut max = (Coord::MIN, Coord::MIN);
            let mut has_local_maximum = false;
            for &e in &edges {
                for node in [self.graph.edge(e).from, self.graph.edge(e).to] {
                    let p = self.graph.node(node).p;
                    min.0 = min.0.min(p.x);
                    min.1 = min.1.min(p.y);
                    max.0 = max.0.max(p.x);
                    max.1 = max.1.max(p.y);
                    if self.graph.is_local_maximum(node, false) {
                        has_local_maximum = true;
                    }
                }
            }
            let extent = vsize(Point::new(max.0 - min.0, max.1 - min.1));
            if extent < max_length && !has_local_maximum {
                for e in edges {
                    self.graph.edge_mut(e).is_central = Some(false);
                    if let Some(twin) = self.graph.edge(e).twin {
                        self.graph.edge_mut(twin).is_central = Some(false);
                    }
                }
            }
        }
    }

    /// Assign the strategy's optimal bead count on the endpoints of every
    /// central edge, and on every local maximum of the distance function so
    /// regions without central edges (a perfect square, a disk) still seed
    /// the beading propagation from their deepest point.
    pub(crate) fn update_bead_counts(&mut self) {
        let edge_ids: Vec<EdgeId> = self.graph.edge_ids().collect();
        for e in edge_ids {
            if self.graph.edge(e).is_central != Some(true) {
                continue;
            }
            for node in [self.graph.edge(e).from, self.graph.edge(e).to] {
                let r = self.graph.node(node).distance_to_boundary;
                let count = self.strategy.optimal_bead_count(r * 2) as i32;
                self.graph.node_mut(node).bead_count = count;
            }
        }
        let node_ids: Vec<NodeId> = self.graph.node_ids().collect();
        for n in node_ids {
            let node = self.graph.node(n);
            if node.bead_count < 0
                && node.distance_to_boundary > 0
                && self.graph.is_local_maximum(n, false)
            {
                let count = self
                    .strategy
                    .optimal_bead_count(node.distance_to_boundary * 2) as i32;
                self.graph.node_mut(n).bead_count = count;
            }
        }
    }

    /// Whether this central edge leaves the central region at its `to` node.
    pub(crate) fn is_end_of_central(&self, edge: EdgeId) -> bool {
        if self.graph.edge(edge).is_central != Some(true) {
            return false;
        }
        let Some(next) = self.graph.edge(edge).next else {
            return true;
        };
        let twin = self.graph.edge(edge).twin;
        let mut out = next;
        loop {
            if self.graph.edge(out).is_central == Some(true) {
                return false;
            }
            let Some(out_twin) = self.graph.edge(out).twin else {
                return true;
            };
            match self.graph.edge(out_twin).next {
                Some(n) if Some(n) != twin => out = n,
                _ => return true,
            }
        }
    }

    /// Re-mark regions where the bead count would only dip transiently: an
    /// unmarked stretch flanked by central regions with the same bead count
    /// becomes central itself.
    pub(crate) fn filter_noncentral_regions(&mut self) {
        let edge_ids: Vec<EdgeId> = self.graph.edge_ids().collect();
        for e in edge_ids {
            if !self.is_end_of_central(e) {
                continue;
            }
            let to = self.graph.edge(e).to;
            let bead_count = self.graph.node(to).bead_count;
            if bead_count < 0 {
                continue;
            }
            let max_dist = self.cfg.transition_filter_dist;
            let _ = self.filter_noncentral_region(e, bead_count, 0, max_dist);
        }
    }

    /// Walk upward from the end of a central region. Returns whether the
    /// traversed stretch was dissolved into the surrounding bead count.
    fn filter_noncentral_region(
        &mut self,
        to_edge: EdgeId,
        bead_count: i32,
        traveled_dist: Coord,
        max_dist: Coord,
    ) -> bool {
        let to_node = self.graph.edge(to_edge).to;
        let r = self.graph.node(to_node).distance_to_boundary;
        let twin = self.graph.edge(to_edge).twin;

        let mut out = match self.graph.edge(to_edge).next {
            Some(next) => next,
            None => return false,
        };
        loop {
            let next_to = self.graph.edge(out).to;
            let length = self.graph.edge_length(out);
            let goes_down = self.graph.node(next_to).distance_to_boundary < r
                && !shorter_than(
                    self.graph.node(next_to).p - self.graph.node(self.graph.edge(out).from).p,
                    self.cfg.snap_dist,
                );
            if !goes_down {
                // only one edge can continue upward from here
                let next_bead = self.graph.node(next_to).bead_count;
                let dissolve = if next_bead == bead_count {
                    true
                } else if next_bead < 0 && traveled_dist + length <= max_dist {
                    self.filter_noncentral_region(out, bead_count, traveled_dist + length, max_dist)
                } else {
                    false
                };
                if dissolve {
                    self.graph.edge_mut(out).is_central = Some(true);
                    if let Some(out_twin) = self.graph.edge(out).twin {
                        self.graph.edge_mut(out_twin).is_central = Some(true);
                    }
                    self.graph.node_mut(next_to).bead_count = bead_count;
                    self.graph.node_mut(next_to).transition_ratio = 0.0;
                }
                return dissolve;
            }
            let Some(out_twin) = self.graph.edge(out).twin else {
                return false;
            };
            match self.graph.edge(out_twin).next {
                Some(n) if Some(n) != twin => out = n,
                _ => return false,
            }
        }
    }
}
