//! Buffer construction.
//!
//! The pure-Rust `geo` stack has no general-purpose buffer operation, so the
//! buffer region is assembled here from circumscribed circle approximations
//! and per-segment capsules, merged with [`geo::BooleanOps`]. Circles are
//! circumscribed (edges tangent to the true circle) so the buffer never
//! under-covers: a feature exactly at the threshold distance always touches
//! the region, and the matcher's exact distance check trims the overshoot.

use geo::{BooleanOps, HasDimensions};
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};

use crate::error::{GeomError, Result};

/// Default segments per quarter-circle for round buffer approximation.
pub const DEFAULT_QUADRANT_SEGMENTS: u32 = 16;

/// Build the buffer region of `geom` at `radius` coordinate units.
///
/// `quadrant_segments` controls the approximation quality of round parts
/// (segments per quarter-circle). The radius must be strictly positive and
/// the geometry non-empty.
pub fn buffer(
    geom: &Geometry<f64>,
    radius: f64,
    quadrant_segments: u32,
) -> Result<MultiPolygon<f64>> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(GeomError::InvalidRadius(radius));
    }
    if geom.is_empty() {
        return Err(GeomError::EmptyGeometry);
    }
    let segments = quadrant_segments.max(1);

    match geom {
        Geometry::Point(p) => Ok(MultiPolygon(vec![circle(p.0, radius, segments)])),
        Geometry::MultiPoint(mp) => {
            let circles = mp.iter().map(|p| circle(p.0, radius, segments));
            Ok(union_all(circles))
        }
        Geometry::Line(line) => Ok(capsule(line.start, line.end, radius, segments)),
        Geometry::LineString(ls) => Ok(line_buffer(ls, radius, segments)),
        Geometry::MultiLineString(mls) => {
            let parts = mls
                .iter()
                .filter(|ls| !ls.0.is_empty())
                .map(|ls| line_buffer(ls, radius, segments));
            Ok(union_all_multi(parts))
        }
        Geometry::Polygon(poly) => Ok(polygon_buffer(poly, radius, segments)),
        Geometry::MultiPolygon(mp) => {
            let parts = mp
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| polygon_buffer(p, radius, segments));
            Ok(union_all_multi(parts))
        }
        Geometry::Rect(r) => Ok(polygon_buffer(&r.to_polygon(), radius, segments)),
        Geometry::Triangle(t) => Ok(polygon_buffer(&t.to_polygon(), radius, segments)),
        Geometry::GeometryCollection(gc) => {
            let mut acc = MultiPolygon::<f64>(vec![]);
            for part in gc.iter().filter(|g| !g.is_empty()) {
                acc = acc.union(&buffer(part, radius, quadrant_segments)?);
            }
            Ok(acc)
        }
    }
}

/// Regular polygon circumscribing the circle of `radius` around `center`.
fn circle(center: Coord<f64>, radius: f64, quadrant_segments: u32) -> Polygon<f64> {
    let n = (quadrant_segments * 4) as usize;
    // Circumradius so that polygon edges are tangent to the true circle.
    let r = radius / (std::f64::consts::PI / n as f64).cos();
    let mut ring = Vec::with_capacity(n + 1);
    for i in 0..n {
        let theta = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
        ring.push(Coord {
            x: center.x + r * theta.cos(),
            y: center.y + r * theta.sin(),
        });
    }
    ring.push(ring[0]);
    Polygon::new(LineString(ring), vec![])
}

/// Buffer of a single segment: offset rectangle plus endpoint circles.
fn capsule(a: Coord<f64>, b: Coord<f64>, radius: f64, segments: u32) -> MultiPolygon<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return MultiPolygon(vec![circle(a, radius, segments)]);
    }
    // Unit normal scaled to the radius.
    let nx = -dy / len * radius;
    let ny = dx / len * radius;
    let rect = Polygon::new(
        LineString(vec![
            Coord { x: a.x + nx, y: a.y + ny },
            Coord { x: b.x + nx, y: b.y + ny },
            Coord { x: b.x - nx, y: b.y - ny },
            Coord { x: a.x - nx, y: a.y - ny },
            Coord { x: a.x + nx, y: a.y + ny },
        ]),
        vec![],
    );
    rect.union(&circle(a, radius, segments))
        .union(&circle(b, radius, segments))
}

fn line_buffer(ls: &LineString<f64>, radius: f64, segments: u32) -> MultiPolygon<f64> {
    let coords = &ls.0;
    if coords.len() < 2 {
        return match coords.first() {
            Some(c) => MultiPolygon(vec![circle(*c, radius, segments)]),
            None => MultiPolygon(vec![]),
        };
    }
    let capsules = coords
        .windows(2)
        .map(|w| capsule(w[0], w[1], radius, segments));
    union_all_multi(capsules)
}

/// Outward buffer of a polygon: the polygon itself merged with the buffers
/// of its rings (interior rings grow into the holes as well).
fn polygon_buffer(poly: &Polygon<f64>, radius: f64, segments: u32) -> MultiPolygon<f64> {
    let mut acc = MultiPolygon(vec![poly.clone()]);
    acc = acc.union(&line_buffer(poly.exterior(), radius, segments));
    for ring in poly.interiors() {
        acc = acc.union(&line_buffer(ring, radius, segments));
    }
    acc
}

/// Dissolved buffer of several geometries: the union of their individual
/// buffers as a single region. Empty geometries are skipped; the result is
/// empty only when every input is.
pub fn dissolved_buffer<'a>(
    geoms: impl IntoIterator<Item = &'a Geometry<f64>>,
    radius: f64,
    quadrant_segments: u32,
) -> Result<MultiPolygon<f64>> {
    let mut acc = MultiPolygon::<f64>(vec![]);
    for geom in geoms.into_iter().filter(|g| !g.is_empty()) {
        acc = acc.union(&buffer(geom, radius, quadrant_segments)?);
    }
    Ok(acc)
}

fn union_all(polys: impl Iterator<Item = Polygon<f64>>) -> MultiPolygon<f64> {
    union_all_multi(polys.map(|p| MultiPolygon(vec![p])))
}

fn union_all_multi(parts: impl Iterator<Item = MultiPolygon<f64>>) -> MultiPolygon<f64> {
    let mut acc = MultiPolygon::<f64>(vec![]);
    for part in parts {
        acc = acc.union(&part);
    }
    acc
}
