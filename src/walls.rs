// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! The wall generation entry points and the phase driver.


use crate::{
    WallrError,
    beading::{BeadCountLimitStrategy, BeadingStrategy, OuterInsetStrategy},
    geo::{Coord, Point, Region},
    graph::{HalfEdgeGraph, TieBreak},
    simplify::SimplifyConfig,
    voronoi,
};
use rayon::prelude::*;

/// Tuning options of the wall generator. The defaults match common
/// fused-filament printing at micrometer resolution.
#[derive(Debug, Clone)]
pub struct WallConfig {
    /// Threshold angle of a source feature above which skeleton edges become
    /// central. Smaller values make more features grow their own walls.
    pub transitioning_angle: f64,
    /// Maximum segment length when discretizing parabolic skeleton edges.
    pub discretization_step_size: Coord,
    /// Transitions shorter than this are dissolved.
    pub transition_filter_dist: Coord,
    /// Area deviation allowed while dissolving transitions.
    pub allowed_filter_deviation: Coord,
    /// Maximum distance over which upward and downward propagated beadings
    /// interpolate.
    pub beading_propagation_transition_dist: Coord,
    /// Central regions smaller than this are unmarked.
    pub marking_filter_dist: Coord,
    /// Distance below which two points are treated as identical.
    pub snap_dist: Coord,
    /// Fraction of the overlap length by which an open line end inside a
    /// closed loop is shortened.
    pub overlap_fraction: f64,
    /// Decision rule for equidistant skeleton branches.
    pub tie_break: TieBreak,
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            transitioning_angle: std::f64::consts::FRAC_PI_3,
            discretization_step_size: 200,
            transition_filter_dist: 1000,
            allowed_filter_deviation: 100,
            beading_propagation_transition_dist: 400,
            marking_filter_dist: 20,
            snap_dist: 10,
            overlap_fraction: 0.25,
            tie_break: TieBreak::PreferInner,
        }
    }
}

/// One vertex of an extruded path: position, width and which wall it belongs
/// to. Walls are counted from the outside inward, the outer wall has index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtrusionJunction {
    pub p: Point,
    pub w: Coord,
    pub inset_idx: usize,
}

/// An output polyline with per-vertex widths.
#[derive(Debug, Clone, Default)]
pub struct ExtrusionLine {
    pub inset_idx: usize,
    /// Center lines of thin features; never closed into loops.
    pub is_odd: bool,
    pub is_closed: bool,
    pub junctions: Vec<ExtrusionJunction>,
}

impl ExtrusionLine {
    pub fn length(&self) -> Coord {
        self.junctions
            .windows(2)
            .map(|w| crate::geo::vsize(w[1].p - w[0].p))
            .sum()
    }
}

/// Per-layer state shared by the pipeline phases: the half-edge graph, the
/// configuration and the beading strategy.
pub(crate) struct WallSkeleton<'a> {
    pub(crate) graph: HalfEdgeGraph,
    pub(crate) cfg: &'a WallConfig,
    pub(crate) strategy: &'a dyn BeadingStrategy,
}

impl WallSkeleton<'_> {
    /// Run all phases after graph construction and emit the raw toolpaths.
    pub(crate) fn generate_toolpaths(&mut self) -> Result<Vec<ExtrusionLine>, WallrError> {
        self.update_central_marking();
        self.filter_central(self.cfg.marking_filter_dist);
        self.update_bead_counts();
        self.filter_noncentral_regions();
        self.graph.check_consistency()?;
        self.generate_transitioning_ribs()?;
        self.graph.check_consistency()?;
        self.generate_segments()
    }
}

/// Generate the variable-width walls of one layer region.
///
/// Returns the extrusion lines binned by inset index ascending, outer wall
/// first. Anomalies in single voronoi cells are recovered and logged;
/// structural failures abort the layer and yield an empty result with a log
/// record, so neighboring layers are unaffected.
pub fn generate_walls(
    region: &Region,
    nominal_width: Coord,
    inset_count: usize,
    outer_inset_offset: Coord,
    strategy: &dyn BeadingStrategy,
    simplify_cfg: &SimplifyConfig,
) -> Vec<ExtrusionLine> {
    let cfg = WallConfig::default();
    generate_walls_with_config(
        region,
        nominal_width,
        inset_count,
        outer_inset_offset,
        strategy,
        &cfg,
        simplify_cfg,
    )
}

/// Like [`generate_walls`] but with explicit tuning options.
pub fn generate_walls_with_config(
    region: &Region,
    nominal_width: Coord,
    inset_count: usize,
    outer_inset_offset: Coord,
    strategy: &dyn BeadingStrategy,
    cfg: &WallConfig,
    simplify_cfg: &SimplifyConfig,
) -> Vec<ExtrusionLine> {
    match try_generate_walls(
        region,
        nominal_width,
        inset_count,
        outer_inset_offset,
        strategy,
        cfg,
        simplify_cfg,
    ) {
        Ok(lines) => lines,
        Err(err) => {
            log::error!("wall generation aborted for this layer: {}", err);
            Vec::new()
        }
    }
}

/// Error-typed core of [`generate_walls`].
pub fn try_generate_walls(
    region: &Region,
    nominal_width: Coord,
    inset_count: usize,
    outer_inset_offset: Coord,
    strategy: &dyn BeadingStrategy,
    cfg: &WallConfig,
    simplify_cfg: &SimplifyConfig,
) -> Result<Vec<ExtrusionLine>, WallrError> {
    if inset_count == 0 {
        return Ok(Vec::new());
    }
    region.validate()?;
    if strategy.optimal_width() != nominal_width {
        log::debug!(
            "strategy optimal width {} differs from nominal width {}",
            strategy.optimal_width(),
            nominal_width
        );
    }

    // the caller's inset count and outer inset are realized as strategy
    // decorators around the supplied stack
    let strategy = BeadCountLimitStrategy::new(
        OuterInsetStrategy::new(strategy, outer_inset_offset),
        2 * inset_count,
    );

    let graph = voronoi::build_skeleton_graph(
        region,
        cfg.transitioning_angle,
        cfg.discretization_step_size,
        cfg.snap_dist,
    )?;
    let mut skeleton = WallSkeleton {
        graph,
        cfg,
        strategy: &strategy,
    };
    let mut lines = skeleton.generate_toolpaths()?;

    crate::simplify::simplify_lines(&mut lines, simplify_cfg);
    lines.retain(|line| line.junctions.len() >= 2);
    // bin by inset index, outer wall first; stable for determinism
    lines.sort_by_key(|line| line.inset_idx);
    Ok(lines)
}

/// Generate walls for many layers in parallel. One layer is one independent,
/// internally single-threaded task.
pub fn generate_walls_for_layers(
    layers: &[Region],
    nominal_width: Coord,
    inset_count: usize,
    outer_inset_offset: Coord,
    strategy: &dyn BeadingStrategy,
    simplify_cfg: &SimplifyConfig,
) -> Vec<Vec<ExtrusionLine>> {
    layers
        .par_iter()
        .map(|region| {
            generate_walls(
                region,
                nominal_width,
                inset_count,
                outer_inset_offset,
                strategy,
                simplify_cfg,
            )
        })
        .collect()
}
