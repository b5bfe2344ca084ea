use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use geo::{Area, BoundingRect, Buffer, HasDimensions, Intersects, Rect, Relate};

mod overlay;

/// The geometry type of a layer or of a single geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum GeometryType {
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// Returns `true` for area geometry types
    pub fn is_polygonal(self) -> bool {
        matches!(self, GeometryType::Polygon | GeometryType::MultiPolygon)
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GeometryType::Unknown => "Unknown",
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::GeometryCollection => "GeometryCollection",
        };
        write!(f, "{}", name)
    }
}

/// A feature geometry. All set-theoretic algebra is delegated to the `geo`
/// crate; this type only decides how geometries of different dimensions
/// combine.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry(geo::Geometry<f64>);

impl Geometry {
    /// Wraps any `geo` geometry
    pub fn new(geometry: impl Into<geo::Geometry<f64>>) -> Self {
        Self(geometry.into())
    }

    /// Returns the wrapped `geo` geometry
    pub fn as_geo(&self) -> &geo::Geometry<f64> {
        &self.0
    }

    pub fn into_geo(self) -> geo::Geometry<f64> {
        self.0
    }

    pub fn geometry_type(&self) -> GeometryType {
        match &self.0 {
            geo::Geometry::Point(_) => GeometryType::Point,
            geo::Geometry::Line(_) | geo::Geometry::LineString(_) => GeometryType::LineString,
            geo::Geometry::Polygon(_) | geo::Geometry::Rect(_) | geo::Geometry::Triangle(_) => {
                GeometryType::Polygon
            }
            geo::Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            geo::Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            geo::Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            geo::Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unsigned planar area (zero for points and lines)
    pub fn area(&self) -> f64 {
        self.0.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        self.0.bounding_rect()
    }

    /// Returns the polygon covering every point within `distance` of this
    /// geometry
    pub fn buffer(&self, distance: f64) -> Geometry {
        Geometry::new(self.0.buffer(distance))
    }

    pub fn intersects(&self, other: &Geometry) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.0.intersects(&other.0)
    }

    /// Returns `true` if `other` lies completely inside this geometry
    pub fn contains(&self, other: &Geometry) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.0.relate(&other.0).is_contains()
    }

    pub fn intersection(&self, other: &Geometry) -> Geometry {
        Geometry(overlay::intersection(&self.0, &other.0))
    }

    /// Returns the part of this geometry not covered by `other`
    pub fn difference(&self, other: &Geometry) -> Geometry {
        Geometry(overlay::difference(&self.0, &other.0))
    }
}

impl From<geo::Geometry<f64>> for Geometry {
    fn from(value: geo::Geometry<f64>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use assertor::{assert_that, BooleanAssertion, EqualityAssertion};
    use geo::{line_string, point, Rect};

    use super::{Geometry, GeometryType};

    fn square(x: f64, y: f64, size: f64) -> Geometry {
        Geometry::new(Rect::new((x, y), (x + size, y + size)).to_polygon())
    }

    #[test]
    fn overlapping_squares() {
        let a = square(0.0, 0.0, 2.0);
        let b = square(1.0, 1.0, 2.0);
        assert_that!(a.intersects(&b)).is_true();
        assert_that!(a.contains(&b)).is_false();
        assert_relative_eq!(a.intersection(&b).area(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(a.difference(&b).area(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn nested_squares() {
        let outer = square(0.0, 0.0, 4.0);
        let inner = square(1.0, 1.0, 1.0);
        assert_that!(outer.contains(&inner)).is_true();
        assert_that!(inner.contains(&outer)).is_false();
    }

    #[test]
    fn line_clipped_by_polygon() {
        let line = Geometry::new(line_string![(x: -1.0, y: 1.0), (x: 3.0, y: 1.0)]);
        let area = square(0.0, 0.0, 2.0);

        let inside = line.intersection(&area);
        assert_that!(inside.geometry_type()).is_equal_to(GeometryType::MultiLineString);
        assert_that!(inside.is_empty()).is_false();

        // subtracting a line from an area leaves the area untouched
        assert_relative_eq!(area.difference(&line).area(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn crossing_lines() {
        let a = Geometry::new(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)]);
        let b = Geometry::new(line_string![(x: 0.0, y: 2.0), (x: 2.0, y: 0.0)]);
        let crossing = a.intersection(&b);
        assert_that!(crossing.as_geo().clone())
            .is_equal_to(geo::Geometry::MultiPoint(vec![point!(x: 1.0, y: 1.0)].into()));
    }

    #[test]
    fn lines_running_along_each_other() {
        let a = Geometry::new(line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]);
        let b = Geometry::new(line_string![(x: 2.0, y: 0.0), (x: 6.0, y: 0.0)]);

        let geo::Geometry::MultiLineString(shared) = a.intersection(&b).into_geo() else {
            panic!("expected the shared stretch as lines");
        };
        assert_that!(shared.0.len()).is_equal_to(1);
        let mut coords = shared.0[0].coords().map(|c| (c.x, c.y)).collect::<Vec<_>>();
        coords.sort_by(|p, q| p.0.total_cmp(&q.0));
        assert_that!(coords).is_equal_to(vec![(2.0, 0.0), (4.0, 0.0)]);

        assert_that!(a.difference(&b).into_geo()).is_equal_to(geo::Geometry::MultiLineString(
            geo::MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0)]]),
        ));
    }

    #[test]
    fn line_difference_keeps_both_ends() {
        let a = Geometry::new(line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 3.0)]);
        let b = Geometry::new(line_string![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0)]);
        assert_that!(a.difference(&b).into_geo()).is_equal_to(geo::Geometry::MultiLineString(
            geo::MultiLineString::new(vec![
                line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
                line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 3.0)],
            ]),
        ));

        // lines that only cross remove nothing
        let crossing = Geometry::new(line_string![(x: 1.5, y: -1.0), (x: 1.5, y: 1.0)]);
        assert_that!(b.difference(&crossing).into_geo()).is_equal_to(geo::Geometry::MultiLineString(
            geo::MultiLineString::new(vec![line_string![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0)]]),
        ));
    }

    #[test]
    fn crossing_and_shared_lines() {
        let a = Geometry::new(line_string![(x: 0.0, y: 0.0), (x: 4.0, y: 0.0)]);
        let b = Geometry::new(geo::MultiLineString::new(vec![
            line_string![(x: 2.0, y: 0.0), (x: 6.0, y: 0.0)],
            line_string![(x: 1.0, y: -1.0), (x: 1.0, y: 1.0)],
        ]));
        let geo::Geometry::GeometryCollection(parts) = a.intersection(&b).into_geo() else {
            panic!("expected lines and points");
        };
        assert_that!(parts.0.len()).is_equal_to(2);
        assert_that!(parts.0[1].clone())
            .is_equal_to(geo::Geometry::MultiPoint(vec![point!(x: 1.0, y: 0.0)].into()));
    }

    #[test]
    fn points_filtered_by_area() {
        let points = Geometry::new(geo::MultiPoint::new(vec![
            point!(x: 0.5, y: 0.5),
            point!(x: 5.0, y: 5.0),
        ]));
        let area = square(0.0, 0.0, 1.0);
        assert_that!(points.intersection(&area).as_geo().clone())
            .is_equal_to(geo::Geometry::MultiPoint(vec![point!(x: 0.5, y: 0.5)].into()));
        assert_that!(points.difference(&area).as_geo().clone())
            .is_equal_to(geo::Geometry::MultiPoint(vec![point!(x: 5.0, y: 5.0)].into()));
    }

    #[test]
    fn buffer_of_point_is_polygonal() {
        let p = Geometry::new(point!(x: 0.0, y: 0.0));
        let b = p.buffer(10.0);
        assert_that!(b.geometry_type().is_polygonal()).is_true();
        let expected = std::f64::consts::PI * 100.0;
        assert!((b.area() - expected).abs() / expected < 0.02);
    }
}
