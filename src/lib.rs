// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

#![deny(
    rust_2018_compatibility,
    rust_2018_idioms,
    nonstandard_style,
    unused,
    future_incompatible,
    non_camel_case_types,
    unused_parens,
    non_upper_case_globals,
    unused_qualifications,
    unused_results,
    unused_imports,
    unused_variables,
    bare_trait_objects,
    ellipsis_inclusive_range_patterns,
    elided_lifetimes_in_paths
)]
#![warn(clippy::explicit_into_iter_loop)]

//! Variable-width wall (perimeter) generation for fused-filament slicing.
//!
//! Given the 2D cross section of one layer as a set of closed polygons, the
//! crate produces concentric wall toolpaths whose individual widths vary so
//! that the walls fill the cross section without gaps or overlaps. The method
//! builds a skeletal trapezoidation of the region (a half-edge subdivision of
//! the segment Voronoi diagram), assigns a bead count along the skeleton,
//! inserts transition ribs where that count changes, and emits polylines with
//! per-vertex widths.
//!
//! The main entry point is [`walls::generate_walls`].

pub mod beading;
pub mod geo;
pub mod graph;
mod junctions;
mod marking;
mod propagation;
pub mod simplify;
mod transitions;
#[cfg(feature = "visualize")]
pub mod visualize;
pub mod voronoi;
pub mod walls;

pub mod prelude {
    pub use crate::{
        WallrError,
        beading::{Beading, BeadingStrategy, standard_stack},
        geo::{Coord, Point, Polygon, Region},
        simplify::SimplifyConfig,
        walls::{ExtrusionJunction, ExtrusionLine, WallConfig, generate_walls},
    };
}

#[derive(thiserror::Error, Debug)]
pub enum WallrError {
    #[error(transparent)]
    BvError(#[from] boostvoronoi::BvError),

    #[error("Invalid input data: {0}")]
    InvalidInput(String),

    #[error("Degenerate voronoi cell: {0}")]
    DegenerateVoronoi(String),

    #[error("Graph inconsistency: {0}")]
    GraphInconsistency(String),

    #[error("Beading strategy out of range: {0}")]
    StrategyOutOfRange(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
