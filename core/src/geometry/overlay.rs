use std::cmp::Ordering;

use geo::{
    algorithm::line_intersection::{line_intersection, LineIntersection},
    BooleanOps, Coord, Geometry, GeometryCollection, Intersects, Line, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Point,
};

/// A geometry split by topological dimension
enum Parts {
    Areal(MultiPolygon<f64>),
    Lineal(MultiLineString<f64>),
    Puntal(MultiPoint<f64>),
    Collection(Vec<Geometry<f64>>),
}

fn parts(geometry: &Geometry<f64>) -> Parts {
    match geometry {
        Geometry::Point(p) => Parts::Puntal(MultiPoint::new(vec![*p])),
        Geometry::MultiPoint(mp) => Parts::Puntal(mp.clone()),
        Geometry::Line(l) => Parts::Lineal(MultiLineString::new(vec![LineString::new(vec![
            l.start, l.end,
        ])])),
        Geometry::LineString(ls) => Parts::Lineal(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Parts::Lineal(mls.clone()),
        Geometry::Polygon(p) => Parts::Areal(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Parts::Areal(mp.clone()),
        Geometry::Rect(r) => Parts::Areal(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Parts::Areal(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => Parts::Collection(gc.0.clone()),
    }
}

fn collection(members: impl Iterator<Item = Geometry<f64>>) -> Geometry<f64> {
    use geo::HasDimensions;
    Geometry::GeometryCollection(GeometryCollection(
        members.filter(|m| !m.is_empty()).collect(),
    ))
}

/// Keeps the points that do (`inside == true`) or do not intersect `other`
fn filter_points(points: MultiPoint<f64>, other: &Geometry<f64>, inside: bool) -> Geometry<f64> {
    let kept = points
        .into_iter()
        .filter(|p| Geometry::Point(*p).intersects(other) == inside)
        .collect::<Vec<_>>();
    Geometry::MultiPoint(MultiPoint::new(kept))
}

/// Joins segments into line strings wherever a segment starts where the
/// previous one ended
fn join(segments: impl IntoIterator<Item = Line<f64>>) -> MultiLineString<f64> {
    let mut lines: Vec<LineString<f64>> = Vec::new();
    for s in segments {
        if s.start == s.end {
            continue;
        }
        match lines.last_mut() {
            Some(ls) if ls.0.last() == Some(&s.start) => ls.0.push(s.end),
            _ => lines.push(LineString::new(vec![s.start, s.end])),
        }
    }
    MultiLineString::new(lines)
}

/// Where `c` lies on `line`: 0 at its start, 1 at its end
fn position(line: &Line<f64>, c: Coord<f64>) -> f64 {
    let d = line.delta();
    let len2 = d.x * d.x + d.y * d.y;
    if len2 == 0.0 {
        return 0.0;
    }
    ((c.x - line.start.x) * d.x + (c.y - line.start.y) * d.y) / len2
}

/// Where two sets of lines meet. Crossings become points and stretches
/// where the lines run along each other become line strings.
fn crossings(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> Geometry<f64> {
    let mut points: Vec<Point<f64>> = Vec::new();
    let mut overlaps: Vec<Line<f64>> = Vec::new();
    for la in a.iter().flat_map(LineString::lines) {
        for lb in b.iter().flat_map(LineString::lines) {
            match line_intersection(la, lb) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    points.push(intersection.into())
                }
                Some(LineIntersection::Collinear { intersection }) => overlaps.push(intersection),
                None => {}
            }
        }
    }

    let shared = join(overlaps);
    points.retain(|p| !p.intersects(&shared));
    points.sort_by(|p, q| {
        p.x()
            .partial_cmp(&q.x())
            .unwrap_or(Ordering::Equal)
            .then(p.y().partial_cmp(&q.y()).unwrap_or(Ordering::Equal))
    });
    points.dedup();

    match (shared.0.is_empty(), points.is_empty()) {
        (true, _) => Geometry::MultiPoint(MultiPoint::new(points)),
        (false, true) => Geometry::MultiLineString(shared),
        (false, false) => Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::MultiLineString(shared),
            Geometry::MultiPoint(MultiPoint::new(points)),
        ])),
    }
}

/// Removes from `a` every stretch along which it runs on top of `b`
fn subtract_lines(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> MultiLineString<f64> {
    let mut kept: Vec<Line<f64>> = Vec::new();
    for la in a.iter().flat_map(LineString::lines) {
        let mut covered = b
            .iter()
            .flat_map(LineString::lines)
            .filter_map(|lb| match line_intersection(la, lb) {
                Some(LineIntersection::Collinear { intersection }) => {
                    let s = (position(&la, intersection.start), intersection.start);
                    let e = (position(&la, intersection.end), intersection.end);
                    Some(if s.0 <= e.0 { (s, e) } else { (e, s) })
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        covered.sort_by(|x, y| x.0 .0.partial_cmp(&y.0 .0).unwrap_or(Ordering::Equal));

        let mut from = (0.0, la.start);
        for (start, end) in covered {
            if start.0 > from.0 {
                kept.push(Line::new(from.1, start.1));
            }
            if end.0 > from.0 {
                from = end;
            }
        }
        if from.0 < 1.0 {
            kept.push(Line::new(from.1, la.end));
        }
    }
    join(kept)
}

pub(super) fn intersection(a: &Geometry<f64>, b: &Geometry<f64>) -> Geometry<f64> {
    match (parts(a), parts(b)) {
        (Parts::Collection(members), _) => collection(members.iter().map(|m| intersection(m, b))),
        (_, Parts::Collection(members)) => collection(members.iter().map(|m| intersection(a, m))),
        (Parts::Areal(pa), Parts::Areal(pb)) => Geometry::MultiPolygon(pa.intersection(&pb)),
        (Parts::Lineal(l), Parts::Areal(p)) | (Parts::Areal(p), Parts::Lineal(l)) => {
            Geometry::MultiLineString(p.clip(&l, false))
        }
        (Parts::Lineal(la), Parts::Lineal(lb)) => crossings(&la, &lb),
        (Parts::Puntal(points), _) => filter_points(points, b, true),
        (_, Parts::Puntal(points)) => filter_points(points, a, true),
    }
}

pub(super) fn difference(a: &Geometry<f64>, b: &Geometry<f64>) -> Geometry<f64> {
    match (parts(a), parts(b)) {
        (Parts::Collection(members), _) => collection(members.iter().map(|m| difference(m, b))),
        (_, Parts::Collection(members)) => members
            .iter()
            .fold(a.clone(), |rest, m| difference(&rest, m)),
        (Parts::Areal(pa), Parts::Areal(pb)) => Geometry::MultiPolygon(pa.difference(&pb)),
        (Parts::Lineal(l), Parts::Areal(p)) => Geometry::MultiLineString(p.clip(&l, true)),
        (Parts::Lineal(la), Parts::Lineal(lb)) => {
            Geometry::MultiLineString(subtract_lines(&la, &lb))
        }
        (Parts::Puntal(points), _) => filter_points(points, b, false),
        // removing something of lower dimension leaves `a` unchanged
        _ => a.clone(),
    }
}
