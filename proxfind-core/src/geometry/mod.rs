//! Geometry operations over the `geo` ecosystem.
//!
//! This module is the matcher's entire geometry surface: buffer construction,
//! intersection tests, distance measurement, centroids and envelopes. All of
//! it delegates to `geo` algorithms; the only construction done here is the
//! buffer approximation in [`buffer`].

mod buffer;

pub use buffer::{buffer, dissolved_buffer, DEFAULT_QUADRANT_SEGMENTS};

use geo::{BoundingRect, Centroid, Distance, Euclidean, Haversine, HasDimensions, Intersects};
use geo_types::{Geometry, Point, Rect};

use crate::error::{GeomError, Result};

/// True geometric intersection test (boundaries included).
pub fn intersects(a: &Geometry<f64>, b: &Geometry<f64>) -> bool {
    a.intersects(b)
}

/// Planar geometry-to-geometry distance in coordinate units.
///
/// Returns an error when the result is non-finite (NaN coordinates).
pub fn distance(a: &Geometry<f64>, b: &Geometry<f64>) -> Result<f64> {
    let dist = Euclidean.distance(a, b);
    if dist.is_finite() {
        Ok(dist)
    } else {
        Err(GeomError::NonFiniteDistance)
    }
}

/// Centroid of a geometry.
pub fn centroid(g: &Geometry<f64>) -> Result<Point<f64>> {
    g.centroid().ok_or(GeomError::NoCentroid)
}

/// Great-circle distance in meters between two lon/lat points.
pub fn haversine_distance(a: Point<f64>, b: Point<f64>) -> Result<f64> {
    let dist = Haversine.distance(a, b);
    if dist.is_finite() {
        Ok(dist)
    } else {
        Err(GeomError::NonFiniteDistance)
    }
}

/// Envelope of a geometry, for spatial-index queries.
pub fn bounding_rect(g: &Geometry<f64>) -> Result<Rect<f64>> {
    g.bounding_rect().ok_or(GeomError::NoBoundingRect)
}

/// Whether a geometry has no coordinates at all.
pub fn is_empty(g: &Geometry<f64>) -> bool {
    g.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{LineString, Polygon};

    #[test]
    fn test_distance_points() {
        let a = Geometry::Point(Point::new(0.0, 0.0));
        let b = Geometry::Point(Point::new(3.0, 4.0));
        assert_relative_eq!(distance(&a, &b).unwrap(), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_distance_non_finite() {
        let a = Geometry::Point(Point::new(f64::NAN, 0.0));
        let b = Geometry::Point(Point::new(1.0, 0.0));
        assert_eq!(distance(&a, &b), Err(GeomError::NonFiniteDistance));
    }

    #[test]
    fn test_centroid_of_empty_linestring() {
        let g = Geometry::LineString(LineString::new(vec![]));
        assert_eq!(centroid(&g), Err(GeomError::NoCentroid));
    }

    #[test]
    fn test_haversine_one_degree_longitude_at_equator() {
        // One degree of longitude at the equator is roughly 111.2 km.
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let dist = haversine_distance(a, b).unwrap();
        assert!((dist - 111_195.0).abs() < 500.0, "got {}", dist);
    }

    #[test]
    fn test_bounding_rect_missing_for_empty() {
        let g = Geometry::LineString(LineString::new(vec![]));
        assert_eq!(bounding_rect(&g), Err(GeomError::NoBoundingRect));
    }

    #[test]
    fn test_is_empty() {
        assert!(is_empty(&Geometry::LineString(LineString::new(vec![]))));
        assert!(!is_empty(&Geometry::Point(Point::new(1.0, 2.0))));
    }

    #[test]
    fn test_intersects_point_in_polygon() {
        let poly = Geometry::Polygon(Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]),
            vec![],
        ));
        assert!(intersects(&poly, &Geometry::Point(Point::new(2.0, 2.0))));
        assert!(!intersects(&poly, &Geometry::Point(Point::new(9.0, 9.0))));
    }
}
