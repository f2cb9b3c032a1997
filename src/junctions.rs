// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Junction generation and toolpath stitching.
//!
//! Each skeleton edge is intersected with the bead centerline radii of its
//! upper node's beading, yielding junctions. Per trapezoid face the junctions
//! of the two skeleton sides are paired into segments, and the segments are
//! chained into closed loops and open odd lines by snap-distance endpoint
//! matching.

#[cfg(test)]
mod tests;

use crate::{
    WallrError,
    geo::{Coord, Point, lerp, shorter_than, vsize},
    graph::{EdgeId, NodeId},
    propagation::NodeBeadings,
    walls::{ExtrusionJunction, ExtrusionLine, WallSkeleton},
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

type EdgeJunctions = FxHashMap<EdgeId, Vec<ExtrusionJunction>>;

/// One straight piece of a wall, from the high side of a trapezoid face to
/// its low side.
#[derive(Debug, Clone, Copy)]
struct Segment {
    from: ExtrusionJunction,
    to: ExtrusionJunction,
    is_odd: bool,
}

impl WallSkeleton<'_> {
    /// Propagate beadings, generate junctions, pair them per face and stitch
    /// the result into extrusion lines.
    pub(crate) fn generate_segments(&mut self) -> Result<Vec<ExtrusionLine>, WallrError> {
        let mut node_beadings = self.propagate_beadings();
        let mut edge_junctions = EdgeJunctions::default();
        self.generate_junctions(&mut node_beadings, &mut edge_junctions);
        let segments = self.connect_junctions(&edge_junctions);
        let mut lines = stitch_segments(segments, self.cfg.snap_dist);
        self.add_local_maxima_single_beads(&node_beadings, &mut lines);
        reduce_overlaps(&mut lines, self.cfg.overlap_fraction, self.cfg.snap_dist);
        Ok(lines)
    }

    /// Intersect every upward edge with the bead radii of its upper node.
    /// Junctions are stored on the upward half edge, ordered from the high
    /// end to the low end. Edges at constant radius yield none.
    fn generate_junctions(
        &self,
        node_beadings: &mut NodeBeadings,
        edge_junctions: &mut EdgeJunctions,
    ) {
        let edge_ids: Vec<EdgeId> = self.graph.edge_ids().collect();
        for e in edge_ids {
            let edge = self.graph.edge(e);
            let from_r = self.graph.node(edge.from).distance_to_boundary;
            let to_r = self.graph.node(edge.to).distance_to_boundary;
            if from_r >= to_r {
                // only upward halves carry junctions; horizontal edges get
                // theirs from the adjacent ribs
                continue;
            }
            let from_p = self.graph.node(edge.from).p;
            let to_p = self.graph.node(edge.to).p;
            let beading = self.beading_for_node(edge.to, node_beadings);

            // Each side of the skeleton generates the beads nearest to its
            // own outline; the middle bead of an odd count belongs to both.
            let num_junctions = beading.bead_count().div_ceil(2);
            let mut junctions = Vec::new();
            for i in (0..num_junctions).rev() {
                let location = beading.toolpath_locations[i];
                if location > to_r {
                    continue;
                }
                if location < from_r {
                    break;
                }
                let p = lerp(from_p, to_p, location - from_r, to_r - from_r);
                junctions.push(ExtrusionJunction {
                    p,
                    w: beading.bead_widths[i],
                    inset_idx: i,
                });
            }
            if !junctions.is_empty() {
                let _ = edge_junctions.insert(e, junctions);
            }
        }
    }

    /// The edge of a quad side chain that points to the node with the
    /// maximum distance to boundary.
    fn quad_max_r_edge(&self, quad_start: EdgeId) -> EdgeId {
        let mut max_r = -1;
        let mut ret = quad_start;
        let mut current = Some(quad_start);
        while let Some(e) = current {
            let r = self.graph.node(self.graph.edge(e).to).distance_to_boundary;
            if r > max_r {
                max_r = r;
                ret = e;
            }
            current = self.graph.edge(e).next;
        }
        ret
    }

    /// Junctions along one quad side up to the peak. A side consists of the
    /// peak edge and at most one predecessor; overlapping bead indices at
    /// the shared node are dropped from the inner list.
    fn side_junctions(
        &self,
        peak_side_edge: EdgeId,
        prev_edge: Option<EdgeId>,
        edge_junctions: &EdgeJunctions,
    ) -> Vec<ExtrusionJunction> {
        let mut junctions = edge_junctions
            .get(&peak_side_edge)
            .cloned()
            .unwrap_or_default();
        if let Some(prev) = prev_edge {
            if let Some(prev_junctions) = edge_junctions.get(&prev) {
                while junctions
                    .last()
                    .zip(prev_junctions.first())
                    .is_some_and(|(a, b)| a.inset_idx <= b.inset_idx)
                {
                    let _ = junctions.pop();
                }
                junctions.extend(prev_junctions.iter().copied());
            }
        }
        junctions
    }

    /// Pair the junctions of the two skeleton sides of every trapezoid face
    /// into straight segments.
    fn connect_junctions(&self, edge_junctions: &EdgeJunctions) -> Vec<Segment> {
        let mut segments = Vec::new();
        let quad_starts: Vec<EdgeId> = self
            .graph
            .edge_ids()
            .filter(|e| self.graph.edge(*e).prev.is_none())
            .collect();
        for quad_start in quad_starts {
            let edge_to_peak = self.quad_max_r_edge(quad_start);
            let Some(edge_from_peak) = self.graph.edge(edge_to_peak).next else {
                continue;
            };

            let from_junctions = self.side_junctions(
                edge_to_peak,
                self.graph.edge(edge_to_peak).prev,
                edge_junctions,
            );
            // the descending side stores its junctions on the upward twin
            let to_side_edge = match self.graph.edge(edge_from_peak).twin {
                Some(twin) => twin,
                None => continue,
            };
            let to_next_twin = self
                .graph
                .edge(edge_from_peak)
                .next
                .and_then(|n| self.graph.edge(n).twin);
            let to_junctions = self.side_junctions(to_side_edge, to_next_twin, edge_junctions);

            let segment_count = from_junctions.len().min(to_junctions.len());
            let peak_node = self.graph.edge(edge_to_peak).to;
            let peak_count = self.graph.node(peak_node).bead_count;
            for rev_idx in 0..segment_count {
                let from = from_junctions[from_junctions.len() - 1 - rev_idx];
                let to = to_junctions[to_junctions.len() - 1 - rev_idx];
                if from.p == to.p {
                    continue;
                }
                let is_odd = peak_count > 0
                    && peak_count % 2 == 1
                    && from.inset_idx == (peak_count / 2) as usize
                    && to.inset_idx == from.inset_idx;
                segments.push(Segment { from, to, is_odd });
            }
        }
        segments
    }

    /// Emit a minimal line for odd local maxima that no segment reaches:
    /// strict maxima outside the central skeleton, whose center bead is
    /// therefore never threaded by `connect_junctions`. The dab is centered
    /// on the node and as long as the bead is wide.
    fn add_local_maxima_single_beads(
        &self,
        node_beadings: &NodeBeadings,
        lines: &mut Vec<ExtrusionLine>,
    ) {
        let node_ids: Vec<NodeId> = self.graph.node_ids().collect();
        for n in node_ids {
            let Some(prop) = node_beadings.get(&n) else {
                continue;
            };
            let count = prop.beading.bead_count();
            if count % 2 == 1
                && self.graph.is_local_maximum(n, true)
                && !self.graph.node_is_central(n)
            {
                let inset_idx = count / 2;
                let width = prop.beading.bead_widths[inset_idx];
                let p = self.graph.node(n).p;
                lines.push(ExtrusionLine {
                    inset_idx,
                    is_odd: true,
                    is_closed: false,
                    junctions: vec![
                        ExtrusionJunction {
                            p: p + Point::new(-width / 2, 0),
                            w: width,
                            inset_idx,
                        },
                        ExtrusionJunction {
                            p: p + Point::new(width / 2, 0),
                            w: width,
                            inset_idx,
                        },
                    ],
                });
            }
        }
    }
}

/// Chain segments with coincident endpoints into polylines, binned by inset
/// index. Chains that close onto themselves become loops; odd chains stay
/// open.
fn stitch_segments(segments: Vec<Segment>, snap_dist: Coord) -> Vec<ExtrusionLine> {
    let mut buckets: FxHashMap<(usize, bool), Vec<Segment>> = FxHashMap::default();
    for segment in segments {
        buckets
            .entry((segment.from.inset_idx, segment.is_odd))
            .or_default()
            .push(segment);
    }
    let mut keys: Vec<(usize, bool)> = buckets.keys().copied().collect();
    keys.sort();

    let mut lines = Vec::new();
    for key in keys {
        let bucket = &buckets[&key];
        let (inset_idx, is_odd) = key;
        let index = EndpointIndex::new(bucket, snap_dist);
        let mut used = vec![false; bucket.len()];

        for seed in 0..bucket.len() {
            if used[seed] {
                continue;
            }
            used[seed] = true;
            let mut junctions = vec![bucket[seed].from, bucket[seed].to];

            // grow at the tail, then at the head
            loop {
                let tail = junctions.last().unwrap().p;
                let Some((idx, end)) = index.find_unused(tail, &used) else {
                    break;
                };
                used[idx] = true;
                let segment = bucket[idx];
                junctions.push(if end == 0 { segment.to } else { segment.from });
            }
            loop {
                let head = junctions.first().unwrap().p;
                let Some((idx, end)) = index.find_unused(head, &used) else {
                    break;
                };
                used[idx] = true;
                let segment = bucket[idx];
                junctions.insert(0, if end == 0 { segment.to } else { segment.from });
            }

            let is_closed = !is_odd
                && junctions.len() > 2
                && shorter_than(junctions[0].p - junctions.last().unwrap().p, snap_dist);
            if is_closed {
                // snap the tail onto the head so the loop closes exactly
                let first = junctions[0];
                *junctions.last_mut().unwrap() = first;
            }
            lines.push(ExtrusionLine {
                inset_idx,
                is_odd,
                is_closed,
                junctions,
            });
        }
    }
    lines
}

/// Spatial hash over segment endpoints for snap-distance matching.
struct EndpointIndex {
    grid: FxHashMap<(Coord, Coord), SmallVec<[(usize, u8, Point); 4]>>,
    snap_dist: Coord,
}

impl EndpointIndex {
    fn new(segments: &[Segment], snap_dist: Coord) -> Self {
        let snap = snap_dist.max(1);
        let mut grid: FxHashMap<(Coord, Coord), SmallVec<[(usize, u8, Point); 4]>> =
            FxHashMap::default();
        for (i, segment) in segments.iter().enumerate() {
            for (end, p) in [(0u8, segment.from.p), (1u8, segment.to.p)] {
                grid.entry((p.x.div_euclid(snap), p.y.div_euclid(snap)))
                    .or_default()
                    .push((i, end, p));
            }
        }
        Self {
            grid,
            snap_dist: snap,
        }
    }

    /// The first unused segment with an endpoint within snap distance of
    /// `p`, lowest segment index first for determinism.
    fn find_unused(&self, p: Point, used: &[bool]) -> Option<(usize, u8)> {
        let cell = (
            p.x.div_euclid(self.snap_dist),
            p.y.div_euclid(self.snap_dist),
        );
        let mut best: Option<(usize, u8)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(entries) = self.grid.get(&(cell.0 + dx, cell.1 + dy)) else {
                    continue;
                };
                for &(idx, end, endpoint) in entries {
                    if used[idx] || !shorter_than(endpoint - p, self.snap_dist) {
                        continue;
                    }
                    if best.is_none_or(|(b, _)| idx < b) {
                        best = Some((idx, end));
                    }
                }
            }
        }
        best
    }
}

/// Shorten the ends of open odd lines that run into closed loops, by a
/// fraction of the penetration depth, to compensate for double extrusion.
fn reduce_overlaps(lines: &mut [ExtrusionLine], overlap_fraction: f64, snap_dist: Coord) {
    // collect the loop segments once
    let mut loop_segments: Vec<(Point, Point, Coord)> = Vec::new();
    for line in lines.iter() {
        if !line.is_closed {
            continue;
        }
        for w in line.junctions.windows(2) {
            loop_segments.push((w[0].p, w[1].p, (w[0].w + w[1].w) / 2));
        }
    }
    if loop_segments.is_empty() {
        return;
    }

    for line in lines.iter_mut() {
        if line.is_closed || !line.is_odd || line.junctions.len() < 2 {
            continue;
        }
        for head in [true, false] {
            let end = if head {
                line.junctions[0]
            } else {
                *line.junctions.last().unwrap()
            };
            let mut min_dist = Coord::MAX;
            let mut loop_width = 0;
            for &(a, b, w) in &loop_segments {
                let d2 = crate::geo::dist2_to_segment(end.p, a, b);
                let d = (d2 as f64).sqrt() as Coord;
                if d < min_dist {
                    min_dist = d;
                    loop_width = w;
                }
            }
            let overlap = end.w / 2 + loop_width / 2 - min_dist;
            if overlap <= snap_dist {
                continue;
            }
            let trim = (overlap as f64 * overlap_fraction) as Coord;
            shorten_line_end(line, head, trim, snap_dist);
        }
    }
}

/// Move one end of a polyline inward by `trim`, interpolating position and
/// width at the cut.
fn shorten_line_end(line: &mut ExtrusionLine, head: bool, trim: Coord, snap_dist: Coord) {
    if !head {
        line.junctions.reverse();
    }
    let mut remaining = trim;
    while line.junctions.len() > 2 {
        let length = vsize(line.junctions[1].p - line.junctions[0].p);
        if length > remaining {
            break;
        }
        remaining -= length;
        let _ = line.junctions.remove(0);
    }
    let length = vsize(line.junctions[1].p - line.junctions[0].p);
    if length > remaining + snap_dist && remaining > 0 {
        let a = line.junctions[0];
        let b = line.junctions[1];
        line.junctions[0] = ExtrusionJunction {
            p: lerp(a.p, b.p, remaining, length),
            w: a.w + ((b.w - a.w) as i128 * remaining as i128 / length as i128) as Coord,
            inset_idx: a.inset_idx,
        };
    }
    if !head {
        line.junctions.reverse();
    }
}
