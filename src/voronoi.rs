// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Construction of the skeletal half-edge graph from the segment voronoi
//! diagram of the input region.
//!
//! Every polygon edge becomes one voronoi input segment, in winding order.
//! Each voronoi cell that lies inside the region is walked from its starting
//! to its ending edge and copied into the graph; parabolic edges are
//! discretized on the way, and after every copied edge a perpendicular rib is
//! dropped onto the source outline so all interior faces become trapezoids.

#[cfg(test)]
mod tests;

use crate::{
    WallrError,
    geo::{
        Coord, Point, Region, closest_on_line, dot, is_inside_corner, shorter_than, turn90_ccw,
        vsize,
    },
    graph::{EdgeId, EdgeKind, HalfEdgeGraph, NodeId},
};
use boostvoronoi::prelude as BV;
use rustc_hash::{FxHashMap, FxHashSet};

/// Build the skeletal graph of `region`.
///
/// The returned graph satisfies the half-edge invariants; cells the voronoi
/// constructor produced in a degenerate way are skipped with a log record.
pub(crate) fn build_skeleton_graph(
    region: &Region,
    transitioning_angle: f64,
    discretization_step_size: Coord,
    snap_dist: Coord,
) -> Result<HalfEdgeGraph, WallrError> {
    let vertex_count = region.vertex_count();
    let mut segments = Vec::with_capacity(vertex_count);
    let mut segment_sources = Vec::with_capacity(vertex_count);
    for (poly_idx, poly) in region.polygons.iter().enumerate() {
        for i in 0..poly.len() {
            let a = poly.points[i];
            let b = poly.points[(i + 1) % poly.len()];
            segments.push(BV::Line::new(
                BV::Point { x: a.x, y: a.y },
                BV::Point { x: b.x, y: b.y },
            ));
            segment_sources.push((poly_idx, i));
        }
    }

    let diagram = BV::Builder::<i64>::default()
        .with_segments(segments.iter())?
        .build()?;

    let mut importer = Importer {
        diagram,
        segments,
        segment_sources,
        region,
        // skeleton nodes tend to land near 10x the polygon vertex count
        graph: HalfEdgeGraph::with_capacity(vertex_count * 10, vertex_count * 30),
        vd_edge_to_he_edge: FxHashMap::default(),
        vd_vertex_to_node: FxHashMap::default(),
        transitioning_angle,
        discretization_step_size,
        snap_dist,
    };
    importer.import_cells()?;
    importer.separate_pointy_quad_end_nodes();

    let mut graph = importer.graph;
    graph.collapse_small_edges(snap_dist);

    // seed every quad start as the incident edge of its from node, so that
    // iterating e = e.twin.next never needs to walk backward
    let quad_starts: Vec<EdgeId> = graph
        .edge_ids()
        .filter(|e| graph.edge(*e).prev.is_none())
        .collect();
    for e in quad_starts {
        let from = graph.edge(e).from;
        graph.node_mut(from).incident_edge = Some(e);
    }

    graph.check_consistency()?;
    Ok(graph)
}

struct Importer<'a> {
    diagram: BV::Diagram,
    segments: Vec<BV::Line<i64>>,
    /// (polygon index, first vertex index) of each input segment
    segment_sources: Vec<(usize, usize)>,
    region: &'a Region,
    graph: HalfEdgeGraph,
    /// voronoi edge id to the *last* half edge of its discretized chain
    vd_edge_to_he_edge: FxHashMap<usize, EdgeId>,
    vd_vertex_to_node: FxHashMap<usize, NodeId>,
    transitioning_angle: f64,
    discretization_step_size: Coord,
    snap_dist: Coord,
}

impl Importer<'_> {
    fn import_cells(&mut self) -> Result<(), WallrError> {
        for cell_index in 0..self.diagram.cells().len() {
            let cell = self.diagram.cells()[cell_index];
            let cell_id = cell.id();
            let cell_edges: Vec<BV::EdgeIndex> =
                self.diagram.cell_edge_iterator(cell_id).collect();
            if cell_edges.is_empty() {
                continue;
            }
            let range = if cell.contains_point() {
                self.point_cell_range(cell_id, &cell_edges)
            } else {
                self.segment_cell_range(cell_id, &cell_edges)
            };
            let (start_i, end_i, start_source_point, end_source_point) = match range {
                Ok(Some(range)) => range,
                Ok(None) => continue, // cell lies outside of the region
                Err(err) => {
                    log::warn!("skipping degenerate voronoi cell {}: {}", cell_id.u32(), err);
                    continue;
                }
            };
            if let Err(err) = self.import_cell_range(
                &cell_edges,
                start_i,
                end_i,
                start_source_point,
                end_source_point,
            ) {
                log::warn!("skipping voronoi cell {}: {}", cell_id.u32(), err);
            }
        }
        Ok(())
    }

    /// Copy the edges from `start_i` to `end_i` (inclusive, cyclic) into the
    /// half-edge graph, dropping a rib after each edge but the last.
    fn import_cell_range(
        &mut self,
        cell_edges: &[BV::EdgeIndex],
        start_i: usize,
        end_i: usize,
        start_source_point: Point,
        end_source_point: Point,
    ) -> Result<(), WallrError> {
        let start_edge = cell_edges[start_i];
        let start_v0 = self.edge_vertex0(start_edge)?;
        let start_v1 = self.edge_vertex1(start_edge)?;
        let v1_p = self.vertex_point(start_v1)?;

        let mut prev_edge: Option<EdgeId> = None;
        self.transfer_edge(
            start_source_point,
            v1_p,
            start_edge,
            &mut prev_edge,
            start_source_point,
            end_source_point,
        )?;
        let starting_node = *self.vd_vertex_to_node.get(&start_v0.usize()).ok_or_else(|| {
            WallrError::DegenerateVoronoi("cell start vertex was never imported".to_string())
        })?;
        self.graph.node_mut(starting_node).distance_to_boundary = 0;
        self.rib(&mut prev_edge, start_source_point, end_source_point)?;

        let mut i = (start_i + 1) % cell_edges.len();
        while i != end_i {
            let vd_edge = cell_edges[i];
            let v0_p = self.vertex_point(self.edge_vertex0(vd_edge)?)?;
            let v1_p = self.vertex_point(self.edge_vertex1(vd_edge)?)?;
            self.transfer_edge(
                v0_p,
                v1_p,
                vd_edge,
                &mut prev_edge,
                start_source_point,
                end_source_point,
            )?;
            self.rib(&mut prev_edge, start_source_point, end_source_point)?;
            i = (i + 1) % cell_edges.len();
        }

        let end_edge = cell_edges[end_i];
        let v0_p = self.vertex_point(self.edge_vertex0(end_edge)?)?;
        self.transfer_edge(
            v0_p,
            end_source_point,
            end_edge,
            &mut prev_edge,
            start_source_point,
            end_source_point,
        )?;
        let last = prev_edge.ok_or_else(|| {
            WallrError::DegenerateVoronoi("cell walk produced no edges".to_string())
        })?;
        let last_to = self.graph.edge(last).to;
        self.graph.node_mut(last_to).distance_to_boundary = 0;
        Ok(())
    }

    /// Transfer one voronoi edge into the graph, discretizing it on first
    /// contact or mirroring the already transferred twin chain.
    fn transfer_edge(
        &mut self,
        from: Point,
        to: Point,
        vd_edge: BV::EdgeIndex,
        prev_edge: &mut Option<EdgeId>,
        source_start: Point,
        source_end: Point,
    ) -> Result<(), WallrError> {
        let twin_id = self.diagram.edge_get_twin(vd_edge)?;
        if let Some(&source_twin) = self.vd_edge_to_he_edge.get(&twin_id.usize()) {
            // twin chain already exists; walk it backward and mirror it
            let end_vertex = self.edge_vertex1(vd_edge)?;
            let end_node = *self.vd_vertex_to_node.get(&end_vertex.usize()).ok_or_else(|| {
                WallrError::DegenerateVoronoi(
                    "end node of a transferred twin chain is missing".to_string(),
                )
            })?;
            let mut twin = source_twin;
            loop {
                let twin_from = self.graph.edge(twin).from;
                let twin_to = self.graph.edge(twin).to;
                let edge = self.graph.add_edge(twin_to, twin_from, EdgeKind::Normal);
                self.graph.set_twins(edge, twin);
                self.graph.node_mut(twin_to).incident_edge = Some(edge);

                if let Some(prev) = *prev_edge {
                    self.graph.edge_mut(edge).prev = Some(prev);
                    self.graph.edge_mut(prev).next = Some(edge);
                }
                *prev_edge = Some(edge);

                if twin_from == end_node {
                    return Ok(());
                }

                // advance one discretization step: twin = twin.prev.twin.prev
                let step = self
                    .graph
                    .edge(twin)
                    .prev
                    .and_then(|back_rib| self.graph.edge(back_rib).twin)
                    .and_then(|forth_rib| self.graph.edge(forth_rib).prev);
                let Some(step) = step else {
                    log::error!("discretized voronoi segment behaves oddly");
                    return Ok(());
                };
                twin = step;
                self.rib(prev_edge, source_start, source_end)?;
            }
        }

        let discretized = self.discretize(vd_edge)?;
        if discretized.len() < 2 {
            return Err(WallrError::DegenerateVoronoi(
                "discretized voronoi edge is degenerate".to_string(),
            ));
        }
        let v0_vd = self.edge_vertex0(vd_edge)?;
        let v1_vd = self.edge_vertex1(vd_edge)?;

        let mut v0 = match *prev_edge {
            Some(prev) => self.graph.edge(prev).to,
            None => self.make_node(v0_vd, from),
        };
        for p1_idx in 1..discretized.len() {
            let p1 = discretized[p1_idx];
            let v1 = if p1_idx < discretized.len() - 1 {
                self.graph.add_node(p1)
            } else {
                self.make_node(v1_vd, to)
            };
            let edge = self.graph.add_edge(v0, v1, EdgeKind::Normal);
            self.graph.node_mut(v0).incident_edge = Some(edge);

            if let Some(prev) = *prev_edge {
                self.graph.edge_mut(edge).prev = Some(prev);
                self.graph.edge_mut(prev).next = Some(edge);
            }
            *prev_edge = Some(edge);
            v0 = v1;

            if p1_idx < discretized.len() - 1 {
                // the rib for the last segment is introduced by the caller
                self.rib(prev_edge, source_start, source_end)?;
            }
        }
        let last = prev_edge.ok_or_else(|| {
            WallrError::InternalError("discretized chain created no edges".to_string())
        })?;
        let _ = self.vd_edge_to_he_edge.insert(vd_edge.usize(), last);
        Ok(())
    }

    /// Discretize one voronoi edge into integer polyline vertices.
    fn discretize(&self, vd_edge: BV::EdgeIndex) -> Result<Vec<Point>, WallrError> {
        let edge = *self.diagram.edge(vd_edge)?;
        let twin_id = edge.twin()?;
        let left_cell_id = edge.cell()?;
        let right_cell_id = self.diagram.edge_get_cell(twin_id)?;
        let left_cell = *self.diagram.cell(left_cell_id)?;
        let right_cell = *self.diagram.cell(right_cell_id)?;

        let start = self.vertex_point(self.edge_vertex0(vd_edge)?)?;
        let end = self.vertex_point(self.edge_vertex1(vd_edge)?)?;

        let point_left = left_cell.contains_point();
        let point_right = right_cell.contains_point();
        if (!point_left && !point_right) || edge.is_secondary() {
            // the source vertex is directly connected to its source segment
            return Ok(vec![start, end]);
        }
        if point_left != point_right {
            // parabolic edge between a point and a segment
            let (p, _) = self.retrieve_point(if point_left {
                left_cell_id
            } else {
                right_cell_id
            })?;
            let segment = self.retrieve_segment(if point_left {
                right_cell_id
            } else {
                left_cell_id
            })?;
            let s0 = Point::new(segment.start.x, segment.start.y);
            let s1 = Point::new(segment.end.x, segment.end.y);
            return Ok(discretize_parabola(
                p,
                s0,
                s1,
                start,
                end,
                self.discretization_step_size,
                self.transitioning_angle,
                self.snap_dist,
            ));
        }
        // Straight edge between two point sources. It is still discretized
        // because the part narrows between the two points, so different
        // beadings may be needed along the way.
        let (left_point, _) = self.retrieve_point(left_cell_id)?;
        let (right_point, _) = self.retrieve_point(right_cell_id)?;
        Ok(discretize_point_point(
            left_point,
            right_point,
            start,
            end,
            self.discretization_step_size,
            self.transitioning_angle,
        ))
    }

    /// Find the walkable range of a cell whose source is a polygon vertex.
    /// Returns `None` for cells outside the region (reflex corners, infinite
    /// cells).
    fn point_cell_range(
        &self,
        cell_id: BV::CellIndex,
        cell_edges: &[BV::EdgeIndex],
    ) -> Result<Option<(usize, usize, Point, Point)>, WallrError> {
        for &e in cell_edges {
            if self.diagram.edge_is_infinite(e)? {
                // infinite edges only occur outside of the polygon
                return Ok(None);
            }
        }
        let (source_point, (poly_idx, vert_idx)) = self.retrieve_point(cell_id)?;
        let poly = &self.region.polygons[poly_idx];
        let n = poly.len();
        let prev = poly.points[(vert_idx + n - 1) % n];
        let here = poly.points[vert_idx];
        let next = poly.points[(vert_idx + 1) % n];

        // Sample one cell vertex that is not the corner itself; the cell is
        // inside the region exactly when the sample is inside the corner.
        let mut some_point = self.vertex_point(self.edge_vertex0(cell_edges[0])?)?;
        if some_point == source_point {
            some_point = self.vertex_point(self.edge_vertex1(cell_edges[0])?)?;
        }
        if !is_inside_corner(prev, here, next, some_point) {
            return Ok(None);
        }

        let mut start_i = None;
        let mut end_i = None;
        for (i, &e) in cell_edges.iter().enumerate() {
            let p1 = self.vertex_point(self.edge_vertex1(e)?)?;
            if p1 == source_point {
                end_i = Some(i);
                start_i = Some((i + 1) % cell_edges.len());
            }
        }
        match (start_i, end_i) {
            (Some(start), Some(end)) if start != end => {
                Ok(Some((start, end, source_point, source_point)))
            }
            _ => Err(WallrError::DegenerateVoronoi(
                "point cell does not end in its source vertex".to_string(),
            )),
        }
    }

    /// Find the walkable range of a cell whose source is a polygon edge: the
    /// chain on the interior side, running from the segment's end point back
    /// to its start point.
    fn segment_cell_range(
        &self,
        cell_id: BV::CellIndex,
        cell_edges: &[BV::EdgeIndex],
    ) -> Result<Option<(usize, usize, Point, Point)>, WallrError> {
        let segment = self.retrieve_segment(cell_id)?;
        let from = Point::new(segment.start.x, segment.start.y);
        let to = Point::new(segment.end.x, segment.end.y);

        let mut starting_i = None;
        let mut ending_i = None;
        let mut seen_possible_start = false;
        let mut after_start = false;
        let mut ending_edge_is_set_before_start = false;
        for (i, &e) in cell_edges.iter().enumerate() {
            if self.diagram.edge_is_infinite(e)? {
                continue;
            }
            let v0 = self.vertex_point(self.edge_vertex0(e)?)?;
            let v1 = self.vertex_point(self.edge_vertex1(e)?)?;
            if v0 == to && v1 == from {
                return Err(WallrError::DegenerateVoronoi(
                    "cell edge runs along its own source segment".to_string(),
                ));
            }
            if v0 == to && !after_start {
                // use the last edge starting in the segment's end point
                starting_i = Some(i);
                seen_possible_start = true;
            } else if seen_possible_start {
                after_start = true;
            }
            if v1 == from && (ending_i.is_none() || ending_edge_is_set_before_start) {
                ending_edge_is_set_before_start = !after_start;
                ending_i = Some(i);
            }
        }
        match (starting_i, ending_i) {
            (Some(start), Some(end)) if start != end => Ok(Some((start, end, to, from))),
            _ => Err(WallrError::DegenerateVoronoi(
                "segment cell has no start or end edge".to_string(),
            )),
        }
    }

    /// When several cells meet in an outline polygon vertex, duplicate the
    /// node per incident cell so that `e = e.twin.next` stays inside one
    /// cell.
    fn separate_pointy_quad_end_nodes(&mut self) {
        let mut visited = FxHashSet::default();
        let edge_count = self.graph.edges.len() as u32;
        for raw in 0..edge_count {
            let quad_start = EdgeId(raw);
            if !self.graph.is_live_edge(quad_start) || self.graph.edge(quad_start).prev.is_some() {
                continue;
            }
            let from = self.graph.edge(quad_start).from;
            if !visited.insert(from) {
                let copied_r = self.graph.node(from).distance_to_boundary;
                let copied_p = self.graph.node(from).p;
                let new_node = self.graph.add_node(copied_p);
                self.graph.node_mut(new_node).distance_to_boundary = copied_r;
                self.graph.node_mut(new_node).incident_edge = Some(quad_start);
                self.graph.edge_mut(quad_start).from = new_node;
                if let Some(twin) = self.graph.edge(quad_start).twin {
                    self.graph.edge_mut(twin).to = new_node;
                }
            }
        }
    }

    fn rib(
        &mut self,
        prev_edge: &mut Option<EdgeId>,
        source_start: Point,
        source_end: Point,
    ) -> Result<(), WallrError> {
        let Some(mut pe) = *prev_edge else {
            return Err(WallrError::DegenerateVoronoi(
                "no edge to attach a rib to".to_string(),
            ));
        };
        self.graph.make_rib(&mut pe, source_start, source_end);
        *prev_edge = Some(pe);
        Ok(())
    }

    fn make_node(&mut self, vd_vertex: BV::VertexIndex, p: Point) -> NodeId {
        if let Some(&node) = self.vd_vertex_to_node.get(&vd_vertex.usize()) {
            return node;
        }
        let node = self.graph.add_node(p);
        let _ = self.vd_vertex_to_node.insert(vd_vertex.usize(), node);
        node
    }

    fn edge_vertex0(&self, e: BV::EdgeIndex) -> Result<BV::VertexIndex, WallrError> {
        self.diagram
            .edge(e)?
            .vertex0()
            .ok_or_else(|| WallrError::DegenerateVoronoi("edge without start vertex".to_string()))
    }

    fn edge_vertex1(&self, e: BV::EdgeIndex) -> Result<BV::VertexIndex, WallrError> {
        self.diagram
            .edge_get_vertex1(e)?
            .ok_or_else(|| WallrError::DegenerateVoronoi("edge without end vertex".to_string()))
    }

    fn vertex_point(&self, v: BV::VertexIndex) -> Result<Point, WallrError> {
        let vertex = *self.diagram.vertex(v)?;
        Ok(Point::new(
            vertex.x().round() as Coord,
            vertex.y().round() as Coord,
        ))
    }

    /// The source segment of a segment cell, in input order.
    fn retrieve_segment(&self, cell_id: BV::CellIndex) -> Result<BV::Line<i64>, WallrError> {
        let cell = *self.diagram.cell(cell_id)?;
        Ok(self.segments[cell.source_index().usize()])
    }

    /// The source polygon vertex of a point cell, with its (polygon, vertex)
    /// index for inside/outside tests.
    fn retrieve_point(
        &self,
        cell_id: BV::CellIndex,
    ) -> Result<(Point, (usize, usize)), WallrError> {
        let (index, category) = self.diagram.cell(cell_id)?.source_index_2();
        let index = index.usize();
        match category {
            BV::SourceCategory::SegmentStart => {
                let line = self.segments[index];
                let (poly, vert) = self.segment_sources[index];
                Ok((Point::new(line.start.x, line.start.y), (poly, vert)))
            }
            BV::SourceCategory::Segment | BV::SourceCategory::SegmentEnd => {
                let line = self.segments[index];
                let (poly, vert) = self.segment_sources[index];
                let n = self.region.polygons[poly].len();
                Ok((Point::new(line.end.x, line.end.y), (poly, (vert + 1) % n)))
            }
            BV::SourceCategory::SinglePoint => Err(WallrError::DegenerateVoronoi(
                "unexpected point source in a segment-only diagram".to_string(),
            )),
        }
    }
}

/// Discretize a parabolic voronoi edge between point source `p` and segment
/// source `s0`..`s1` into integer polyline vertices.
///
/// Extra breakpoints are inserted where the witnessed source-feature angle
/// crosses the transitioning angle, since the `is_central` classification
/// flips there. The step count is kept even so a midpoint vertex always
/// exists. A breakpoint colliding with an existing sample within `snap_dist`
/// is dropped.
pub(crate) fn discretize_parabola(
    p: Point,
    s0: Point,
    s1: Point,
    start: Point,
    end: Point,
    approximate_step_size: Coord,
    transitioning_angle: f64,
    snap_dist: Coord,
) -> Vec<Point> {
    let a = s0;
    let b = s1;
    let ab = b - a;
    let ab_size = vsize(ab);
    if ab_size == 0 {
        return vec![start, end];
    }
    // x is the position projected onto the segment, relative to the foot of
    // the perpendicular from p; pxx is that foot
    let sx = (dot(start - a, ab) / ab_size as i128) as Coord;
    let ex = (dot(end - a, ab) / ab_size as i128) as Coord;
    let px = (dot(p - a, ab) / ab_size as i128) as Coord;

    let pxx = closest_on_line(p, a, b);
    let ppxx = pxx - p;
    let d = vsize(ppxx);
    if d == 0 {
        return vec![start, end];
    }

    // local frame: x along the segment, y from the line toward the focus
    let world = |x: Coord, y: Coord| -> Point {
        let xdir = turn90_ccw(ppxx);
        Point::new(
            pxx.x + ((x as i128 * xdir.x as i128 - y as i128 * ppxx.x as i128) / d as i128) as Coord,
            pxx.y + ((x as i128 * xdir.y as i128 - y as i128 * ppxx.y as i128) / d as i128) as Coord,
        )
    };
    let parabola_y =
        |x: Coord| -> Coord { ((x as i128 * x as i128) / (2 * d as i128) + (d / 2) as i128) as Coord };

    let marking_bound = (transitioning_angle * 0.5).atan();
    let mut msx = (-marking_bound * d as f64) as Coord;
    let mut mex = (marking_bound * d as f64) as Coord;
    let marking_h = parabola_y(msx);
    let mut marking_start = world(msx, marking_h);
    let mut marking_end = world(mex, marking_h);
    let dir: Coord = if sx > ex { -1 } else { 1 };
    if dir < 0 {
        std::mem::swap(&mut marking_start, &mut marking_end);
        std::mem::swap(&mut msx, &mut mex);
    }

    let mut add_marking_start = msx * dir > (sx - px) * dir && msx * dir < (ex - px) * dir;
    let mut add_marking_end = mex * dir > (sx - px) * dir && mex * dir < (ex - px) * dir;
    let apex = world(0, d / 2);
    let mut add_apex = (sx - px) * dir < 0 && (ex - px) * dir > 0;

    let mut step_count =
        ((ex - sx).abs() as f64 / approximate_step_size as f64 + 0.5) as Coord;
    if step_count % 2 == 1 {
        step_count += 1;
    }

    let mut discretized = Vec::with_capacity(step_count as usize + 4);
    discretized.push(start);
    let push_extra = |vec: &mut Vec<Point>, pt: Point| {
        if vec.last().is_none_or(|last| !shorter_than(*last - pt, snap_dist)) {
            vec.push(pt);
        }
    };
    for step in 1..step_count {
        let x = sx + (ex - sx) * step / step_count - px;
        let y = parabola_y(x);

        if add_marking_start && msx * dir < x * dir {
            push_extra(&mut discretized, marking_start);
            add_marking_start = false;
        }
        if add_apex && x * dir > 0 {
            push_extra(&mut discretized, apex);
            add_apex = false;
        }
        if add_marking_end && mex * dir < x * dir {
            push_extra(&mut discretized, marking_end);
            add_marking_end = false;
        }
        push_extra(&mut discretized, world(x, y));
    }
    if add_apex {
        push_extra(&mut discretized, apex);
    }
    if add_marking_end {
        push_extra(&mut discretized, marking_end);
    }
    if discretized.last() != Some(&end) {
        discretized.push(end);
    }
    discretized
}

/// Discretize the straight edge between two point sources. Breakpoints where
/// the central classification flips sit symmetrically around the middle, at
/// a distance proportional to the separation of the source points.
pub(crate) fn discretize_point_point(
    left_point: Point,
    right_point: Point,
    start: Point,
    end: Point,
    step_size: Coord,
    transitioning_angle: f64,
) -> Vec<Point> {
    let d = vsize(right_point - left_point);
    let middle = (left_point + right_point) / 2;
    let x_axis_dir = turn90_ccw(right_point - left_point);
    let x_axis_length = vsize(x_axis_dir);
    if x_axis_length == 0 || d == 0 {
        return vec![start, end];
    }
    let projected_x =
        |from: Point| -> Coord { (dot(from - middle, x_axis_dir) / x_axis_length as i128) as Coord };
    let start_x = projected_x(start);
    let end_x = projected_x(end);

    let bound = 0.5 / ((std::f64::consts::PI - transitioning_angle) * 0.5).tan();
    let mut marking_start_x = (-(d as f64) * bound) as Coord;
    let mut marking_end_x = ((d as f64) * bound) as Coord;
    let marking_point = |mx: Coord| {
        Point::new(
            middle.x + (x_axis_dir.x as i128 * mx as i128 / x_axis_length as i128) as Coord,
            middle.y + (x_axis_dir.y as i128 * mx as i128 / x_axis_length as i128) as Coord,
        )
    };
    let mut marking_start = marking_point(marking_start_x);
    let mut marking_end = marking_point(marking_end_x);
    let mut dir: Coord = 1;
    if start_x > end_x {
        dir = -1;
        std::mem::swap(&mut marking_start, &mut marking_end);
        std::mem::swap(&mut marking_start_x, &mut marking_end_x);
    }

    let mut ret = vec![start];
    let mut add_marking_start = marking_start_x * dir > start_x * dir;
    let mut add_marking_end = marking_end_x * dir > start_x * dir;

    let ab = end - start;
    let ab_size = vsize(ab);
    let mut step_count = (ab_size + step_size / 2) / step_size;
    if step_count % 2 == 1 {
        // enforce a discretization point in the middle
        step_count += 1;
    }
    for step in 1..step_count {
        let here = start + ab * step / step_count;
        let x_here = projected_x(here);
        if add_marking_start && marking_start_x * dir < x_here * dir {
            ret.push(marking_start);
            add_marking_start = false;
        }
        if add_marking_end && marking_end_x * dir < x_here * dir {
            ret.push(marking_end);
            add_marking_end = false;
        }
        ret.push(here);
    }
    if add_marking_end && marking_end_x * dir < end_x * dir {
        ret.push(marking_end);
    }
    ret.push(end);
    ret.dedup();
    ret
}
