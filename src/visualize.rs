// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2023 lacklustr@protonmail.com https://github.com/eadf
// This file is part of the wallr crate.

//! Debug output of the skeletal graph and the generated toolpaths as SVG.
//!
//! Only compiled with the `visualize` feature; the core never depends on it.

use crate::{
    geo::{Coord, Point, Region},
    graph::{EdgeKind, HalfEdgeGraph},
    walls::ExtrusionLine,
};
use std::io::{self, Write};

struct ViewBox {
    min: Point,
    max: Point,
}

impl ViewBox {
    fn of(points: impl Iterator<Item = Point>) -> Self {
        let mut min = Point::new(Coord::MAX, Coord::MAX);
        let mut max = Point::new(Coord::MIN, Coord::MIN);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }

    fn header(&self, out: &mut impl Write) -> io::Result<()> {
        let margin = 500;
        writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\">",
            self.min.x - margin,
            self.min.y - margin,
            (self.max.x - self.min.x) + 2 * margin,
            (self.max.y - self.min.y) + 2 * margin,
        )
    }
}

/// Write the half-edge graph: ribs gray, plain skeleton edges blue, central
/// edges red.
pub fn write_graph_svg(graph: &HalfEdgeGraph, out: &mut impl Write) -> io::Result<()> {
    let view = ViewBox::of(graph.node_ids().map(|n| graph.node(n).p));
    view.header(out)?;
    for e in graph.edge_ids() {
        let edge = graph.edge(e);
        let from = graph.node(edge.from).p;
        let to = graph.node(edge.to).p;
        let color = match (edge.kind, edge.is_central) {
            (EdgeKind::Normal, Some(true)) => "red",
            (EdgeKind::Normal, _) => "blue",
            _ => "gray",
        };
        writeln!(
            out,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-width=\"20\"/>",
            from.x, from.y, to.x, to.y, color
        )?;
    }
    writeln!(out, "</svg>")
}

/// Write the region outline and the toolpaths with their real widths; odd
/// lines green, loops black.
pub fn write_toolpaths_svg(
    region: &Region,
    lines: &[ExtrusionLine],
    out: &mut impl Write,
) -> io::Result<()> {
    let view = ViewBox::of(region.polygons.iter().flat_map(|p| p.points.iter().copied()));
    view.header(out)?;
    for poly in &region.polygons {
        write!(out, "<polygon fill=\"none\" stroke=\"orange\" stroke-width=\"30\" points=\"")?;
        for p in &poly.points {
            write!(out, "{},{} ", p.x, p.y)?;
        }
        writeln!(out, "\"/>")?;
    }
    for line in lines {
        let color = if line.is_odd { "green" } else { "black" };
        for pair in line.junctions.windows(2) {
            let width = (pair[0].w + pair[1].w) / 2;
            writeln!(
                out,
                "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" \
                 stroke-width=\"{}\" stroke-opacity=\"0.5\" stroke-linecap=\"round\"/>",
                pair[0].p.x, pair[0].p.y, pair[1].p.x, pair[1].p.y, color, width
            )?;
        }
    }
    writeln!(out, "</svg>")
}
