// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Beading strategies: how a wall of a given thickness is divided into
//! individual beads (extruded lines) and what width each bead gets.
//!
//! A strategy answers four queries: the optimal bead count for a thickness,
//! the perfect thickness for a count, the thickness at which the optimal
//! count switches, and the concrete bead layout. Concrete strategies compose
//! decorator style, each wrapping a parent strategy.


use crate::geo::Coord;

/// One millimeter in internal units.
const MM: Coord = 1000;

/// An ordered bead layout across a wall thickness.
///
/// `toolpath_locations[i]` is the radial distance of bead `i`'s centerline
/// from the outline; locations are strictly increasing. `bead_widths` is
/// parallel to it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Beading {
    pub total_thickness: Coord,
    pub bead_widths: Vec<Coord>,
    pub toolpath_locations: Vec<Coord>,
}

impl Beading {
    #[inline(always)]
    pub fn bead_count(&self) -> usize {
        self.bead_widths.len()
    }

    /// Sum of all bead widths.
    pub fn total_width(&self) -> Coord {
        self.bead_widths.iter().sum()
    }
}

/// The capability interface of a beading strategy. Implementations must be
/// pure; one instance is shared immutably between layer tasks.
pub trait BeadingStrategy: Sync {
    /// The width this strategy would ideally print every bead at.
    fn optimal_width(&self) -> Coord;

    /// The wall thickness for which `bead_count` beads fit perfectly.
    fn optimal_thickness(&self, bead_count: usize) -> Coord;

    /// The thickness at which the optimal bead count switches from
    /// `lower_bead_count` to `lower_bead_count + 1`.
    fn transition_thickness(&self, lower_bead_count: usize) -> Coord;

    /// The ideal number of beads for a wall of the given thickness.
    fn optimal_bead_count(&self, thickness: Coord) -> usize;

    /// Produce the bead layout for the given thickness and count.
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading;

    /// Half the length over which a transition from `lower_bead_count` to
    /// `lower_bead_count + 1` beads is spread, capped at one millimeter.
    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        (self.optimal_width() * lower_bead_count.max(1) as Coord / 2).clamp(1, MM)
    }
}

impl<S: BeadingStrategy + ?Sized> BeadingStrategy for &S {
    fn optimal_width(&self) -> Coord {
        (**self).optimal_width()
    }
    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        (**self).optimal_thickness(bead_count)
    }
    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        (**self).transition_thickness(lower_bead_count)
    }
    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        (**self).optimal_bead_count(thickness)
    }
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        (**self).compute(thickness, bead_count)
    }
    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        (**self).transitioning_length(lower_bead_count)
    }
}

impl<S: BeadingStrategy + ?Sized> BeadingStrategy for Box<S> {
    fn optimal_width(&self) -> Coord {
        (**self).optimal_width()
    }
    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        (**self).optimal_thickness(bead_count)
    }
    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        (**self).transition_thickness(lower_bead_count)
    }
    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        (**self).optimal_bead_count(thickness)
    }
    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        (**self).compute(thickness, bead_count)
    }
    fn transitioning_length(&self, lower_bead_count: usize) -> Coord {
        (**self).transitioning_length(lower_bead_count)
    }
}

/// Derive centerline locations from a list of bead widths laid side by side
/// starting at the outline.
fn locations_from_widths(widths: &[Coord]) -> Vec<Coord> {
    let mut locations = Vec::with_capacity(widths.len());
    let mut acc = 0;
    for &w in widths {
        locations.push(acc + w / 2);
        acc += w;
    }
    locations
}

/// Spreads thickness deviation evenly over all beads.
#[derive(Debug, Clone)]
pub struct DistributedStrategy {
    optimal_width: Coord,
}

impl DistributedStrategy {
    pub fn new(optimal_width: Coord) -> Self {
        debug_assert!(optimal_width > 0);
        Self { optimal_width }
    }
}

impl BeadingStrategy for DistributedStrategy {
    fn optimal_width(&self) -> Coord {
        self.optimal_width
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.optimal_width * bead_count as Coord
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.optimal_thickness(lower_bead_count) + self.optimal_width / 2
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness <= 0 {
            return 0;
        }
        ((thickness + self.optimal_width / 2) / self.optimal_width) as usize
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 || thickness <= 0 {
            return Beading {
                total_thickness: thickness.max(0),
                ..Beading::default()
            };
        }
        let n = bead_count as Coord;
        // telescoping split, sums to the exact thickness
        let widths: Vec<Coord> = (0..bead_count)
            .map(|i| {
                let i = i as Coord;
                (i + 1) * thickness / n - i * thickness / n
            })
            .collect();
        let toolpath_locations = locations_from_widths(&widths);
        Beading {
            total_thickness: thickness,
            bead_widths: widths,
            toolpath_locations,
        }
    }
}

/// Keeps every bead at the preferred width and absorbs all thickness
/// deviation in the centermost bead (the two centermost for even counts).
#[derive(Debug, Clone)]
pub struct CenterDeviationStrategy {
    optimal_width: Coord,
}

impl CenterDeviationStrategy {
    pub fn new(optimal_width: Coord) -> Self {
        debug_assert!(optimal_width > 0);
        Self { optimal_width }
    }
}

impl BeadingStrategy for CenterDeviationStrategy {
    fn optimal_width(&self) -> Coord {
        self.optimal_width
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.optimal_width * bead_count as Coord
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.optimal_thickness(lower_bead_count) + self.optimal_width / 2
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness <= 0 {
            return 0;
        }
        ((thickness + self.optimal_width / 2) / self.optimal_width) as usize
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 || thickness <= 0 {
            return Beading {
                total_thickness: thickness.max(0),
                ..Beading::default()
            };
        }
        let mut widths = vec![self.optimal_width; bead_count];
        let deviation = thickness - self.optimal_thickness(bead_count);
        if bead_count % 2 == 1 {
            widths[bead_count / 2] += deviation;
        } else {
            widths[bead_count / 2 - 1] += deviation / 2;
            widths[bead_count / 2] += deviation - deviation / 2;
        }
        let toolpath_locations = locations_from_widths(&widths);
        Beading {
            total_thickness: thickness,
            bead_widths: widths,
            toolpath_locations,
        }
    }
}

/// Clamps the widths produced by the parent to `[min_width, max_width]`.
/// Centerline locations are kept, only the printed widths change.
#[derive(Debug, Clone)]
pub struct WidthLimitStrategy<P: BeadingStrategy> {
    parent: P,
    min_width: Coord,
    max_width: Coord,
}

impl<P: BeadingStrategy> WidthLimitStrategy<P> {
    pub fn new(parent: P, min_width: Coord, max_width: Coord) -> Self {
        debug_assert!(0 < min_width && min_width <= max_width);
        Self {
            parent,
            min_width,
            max_width,
        }
    }
}

impl<P: BeadingStrategy> BeadingStrategy for WidthLimitStrategy<P> {
    fn optimal_width(&self) -> Coord {
        self.parent.optimal_width()
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        // a wall thinner than min_width cannot hold any bead at all
        if lower_bead_count == 0 {
            return self
                .parent
                .transition_thickness(0)
                .max(self.min_width);
        }
        self.parent.transition_thickness(lower_bead_count)
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        if thickness < self.min_width {
            return 0;
        }
        self.parent.optimal_bead_count(thickness)
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let mut beading = self.parent.compute(thickness, bead_count);
        for w in beading.bead_widths.iter_mut() {
            *w = (*w).clamp(self.min_width, self.max_width);
        }
        beading
    }
}

/// Forces the outermost bead on each side to the preferred width and lets the
/// parent distribute the remaining thickness over the inner beads.
#[derive(Debug, Clone)]
pub struct OuterWallPreferredStrategy<P: BeadingStrategy> {
    parent: P,
}

impl<P: BeadingStrategy> OuterWallPreferredStrategy<P> {
    pub fn new(parent: P) -> Self {
        Self { parent }
    }
}

impl<P: BeadingStrategy> BeadingStrategy for OuterWallPreferredStrategy<P> {
    fn optimal_width(&self) -> Coord {
        self.parent.optimal_width()
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.parent.transition_thickness(lower_bead_count)
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        self.parent.optimal_bead_count(thickness)
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let w = self.parent.optimal_width();
        if bead_count < 3 || thickness <= 2 * w {
            return self.parent.compute(thickness, bead_count);
        }
        let inner = self.parent.compute(thickness - 2 * w, bead_count - 2);
        let mut widths = Vec::with_capacity(bead_count);
        let mut locations = Vec::with_capacity(bead_count);
        widths.push(w);
        locations.push(w / 2);
        for (iw, il) in inner
            .bead_widths
            .iter()
            .zip(inner.toolpath_locations.iter())
        {
            widths.push(*iw);
            locations.push(il + w);
        }
        widths.push(w);
        locations.push(thickness - w / 2);
        Beading {
            total_thickness: thickness,
            bead_widths: widths,
            toolpath_locations: locations,
        }
    }
}

/// Redistributes the thickness deviation with a convexity bias: beads close
/// to the center absorb more of it than beads close to the outline.
#[derive(Debug, Clone)]
pub struct RedistributeStrategy<P: BeadingStrategy> {
    parent: P,
}

impl<P: BeadingStrategy> RedistributeStrategy<P> {
    pub fn new(parent: P) -> Self {
        Self { parent }
    }
}

impl<P: BeadingStrategy> BeadingStrategy for RedistributeStrategy<P> {
    fn optimal_width(&self) -> Coord {
        self.parent.optimal_width()
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.parent.transition_thickness(lower_bead_count)
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        self.parent.optimal_bead_count(thickness)
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count == 0 {
            return self.parent.compute(thickness, bead_count);
        }
        let w = self.parent.optimal_width();
        let deviation = thickness - self.optimal_thickness(bead_count);
        if deviation == 0 {
            return self.parent.compute(thickness, bead_count);
        }
        let n = bead_count as i64;
        // parabolic weights, largest at the center bead
        let weights: Vec<i64> = (0..n)
            .map(|i| {
                let c = 2 * i + 1 - n; // in (-n, n), 0 at the center
                n * n - c * c
            })
            .collect();
        let weight_sum: i64 = weights.iter().sum();
        let mut widths: Vec<Coord> = weights
            .iter()
            .map(|&wt| w + deviation * wt / weight_sum)
            .collect();
        // rounding rest goes to the center bead
        let rest = thickness - widths.iter().sum::<Coord>();
        widths[bead_count / 2] += rest;
        let toolpath_locations = locations_from_widths(&widths);
        Beading {
            total_thickness: thickness,
            bead_widths: widths,
            toolpath_locations,
        }
    }
}

/// Caps the bead count. Above the cap the beads hug both outlines at their
/// optimal spacing and the center of the part is intentionally left over for
/// the surrounding stages (infill) to fill.
#[derive(Debug, Clone)]
pub struct BeadCountLimitStrategy<P: BeadingStrategy> {
    parent: P,
    max_bead_count: usize,
}

/// Stands in for "never transition" thicknesses above the bead count cap.
const INFINITE_THICKNESS: Coord = Coord::MAX / 4;

impl<P: BeadingStrategy> BeadCountLimitStrategy<P> {
    pub fn new(parent: P, max_bead_count: usize) -> Self {
        Self {
            parent,
            max_bead_count,
        }
    }
}

impl<P: BeadingStrategy> BeadingStrategy for BeadCountLimitStrategy<P> {
    fn optimal_width(&self) -> Coord {
        self.parent.optimal_width()
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        if bead_count <= self.max_bead_count {
            return self.parent.optimal_thickness(bead_count);
        }
        INFINITE_THICKNESS
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        if lower_bead_count < self.max_bead_count {
            return self.parent.transition_thickness(lower_bead_count);
        }
        // no transition past the cap
        INFINITE_THICKNESS
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        let count = self.parent.optimal_bead_count(thickness);
        if count <= self.max_bead_count {
            count
        } else {
            // an even marker value above the cap; compute() resolves it to
            // max_bead_count outline-hugging beads
            self.max_bead_count + 2
        }
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        if bead_count <= self.max_bead_count {
            return self.parent.compute(thickness, bead_count);
        }
        let optimal_thickness = self.parent.optimal_thickness(self.max_bead_count);
        let mut beading = self.parent.compute(optimal_thickness, self.max_bead_count);
        beading.total_thickness = thickness;
        // mirror the inner half of the beads onto the far outline
        for idx in self.max_bead_count / 2..beading.toolpath_locations.len() {
            beading.toolpath_locations[idx] =
                thickness - (optimal_thickness - beading.toolpath_locations[idx]);
        }
        beading
    }
}

/// Moves the outermost bead inward by a fixed offset without changing its
/// width, to compensate for outer-contour shrinkage.
#[derive(Debug, Clone)]
pub struct OuterInsetStrategy<P: BeadingStrategy> {
    parent: P,
    outer_inset: Coord,
}

impl<P: BeadingStrategy> OuterInsetStrategy<P> {
    pub fn new(parent: P, outer_inset: Coord) -> Self {
        debug_assert!(outer_inset >= 0);
        Self {
            parent,
            outer_inset,
        }
    }
}

impl<P: BeadingStrategy> BeadingStrategy for OuterInsetStrategy<P> {
    fn optimal_width(&self) -> Coord {
        self.parent.optimal_width()
    }

    fn optimal_thickness(&self, bead_count: usize) -> Coord {
        self.parent.optimal_thickness(bead_count)
    }

    fn transition_thickness(&self, lower_bead_count: usize) -> Coord {
        self.parent.transition_thickness(lower_bead_count)
    }

    fn optimal_bead_count(&self, thickness: Coord) -> usize {
        self.parent.optimal_bead_count(thickness)
    }

    fn compute(&self, thickness: Coord, bead_count: usize) -> Beading {
        let mut beading = self.parent.compute(thickness, bead_count);
        if self.outer_inset == 0 || beading.bead_count() == 0 {
            return beading;
        }
        beading.toolpath_locations[0] += self.outer_inset;
        if beading.bead_count() > 1 {
            // keep the locations ordered when the walls are squeezed together
            beading.toolpath_locations[0] =
                beading.toolpath_locations[0].min(beading.toolpath_locations[1]);
        }
        beading
    }
}

/// The canonical strategy composition: distributed deviation, limited to the
/// printable width range, with a center-biased redistribution on top.
pub fn standard_stack(
    nominal_width: Coord,
    min_width: Coord,
    max_width: Coord,
) -> impl BeadingStrategy {
    RedistributeStrategy::new(WidthLimitStrategy::new(
        DistributedStrategy::new(nominal_width),
        min_width,
        max_width,
    ))
}
