//! Layer file format: the magic bytes `SVL1` followed by the bincode
//! encoding (standard configuration) of the datasource.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use bincode::{config, Decode, Encode};
use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

use crate::geometry::{Geometry, GeometryType};

use super::{DatasourceError, FieldDefn, FieldType, FieldValue, Layer, SpatialReference};

/// Extension of layer files
pub const LAYER_FILE_EXTENSION: &str = "svl";

const MAGIC: &[u8; 4] = b"SVL1";

type StoredCoord = (f64, f64);
type StoredRing = Vec<StoredCoord>;

#[derive(Encode, Decode)]
enum StoredGeometry {
    Point(StoredCoord),
    LineString(StoredRing),
    Polygon(Vec<StoredRing>),
    MultiPoint(Vec<StoredCoord>),
    MultiLineString(Vec<StoredRing>),
    MultiPolygon(Vec<Vec<StoredRing>>),
    Collection(Vec<StoredGeometry>),
}

#[derive(Encode, Decode)]
struct StoredFeature {
    fid: u64,
    geometry: Option<StoredGeometry>,
    fields: Vec<FieldValue>,
}

#[derive(Encode, Decode)]
struct StoredLayer {
    name: String,
    geometry_type: GeometryType,
    wkt: String,
    fields: Vec<(String, FieldType)>,
    features: Vec<StoredFeature>,
}

#[derive(Encode, Decode)]
struct StoredDatasource {
    name: String,
    layers: Vec<StoredLayer>,
}

fn coords(ls: &LineString) -> StoredRing {
    ls.coords().map(|c| (c.x, c.y)).collect()
}

fn polygon_rings(p: &Polygon) -> Vec<StoredRing> {
    std::iter::once(p.exterior())
        .chain(p.interiors())
        .map(coords)
        .collect()
}

impl From<&geo::Geometry> for StoredGeometry {
    fn from(g: &geo::Geometry) -> Self {
        match g {
            geo::Geometry::Point(p) => StoredGeometry::Point((p.x(), p.y())),
            geo::Geometry::Line(l) => {
                StoredGeometry::LineString(vec![(l.start.x, l.start.y), (l.end.x, l.end.y)])
            }
            geo::Geometry::LineString(ls) => StoredGeometry::LineString(coords(ls)),
            geo::Geometry::Polygon(p) => StoredGeometry::Polygon(polygon_rings(p)),
            geo::Geometry::MultiPoint(mp) => {
                StoredGeometry::MultiPoint(mp.iter().map(|p| (p.x(), p.y())).collect())
            }
            geo::Geometry::MultiLineString(mls) => {
                StoredGeometry::MultiLineString(mls.iter().map(coords).collect())
            }
            geo::Geometry::MultiPolygon(mp) => {
                StoredGeometry::MultiPolygon(mp.iter().map(polygon_rings).collect())
            }
            geo::Geometry::GeometryCollection(gc) => {
                StoredGeometry::Collection(gc.iter().map(StoredGeometry::from).collect())
            }
            geo::Geometry::Rect(r) => StoredGeometry::Polygon(polygon_rings(&r.to_polygon())),
            geo::Geometry::Triangle(t) => StoredGeometry::Polygon(polygon_rings(&t.to_polygon())),
        }
    }
}

fn line_string(ring: StoredRing) -> LineString {
    LineString::new(ring.into_iter().map(Coord::from).collect())
}

fn polygon(mut rings: Vec<StoredRing>) -> Polygon {
    if rings.is_empty() {
        return Polygon::new(LineString::new(vec![]), vec![]);
    }
    let exterior = line_string(rings.remove(0));
    Polygon::new(exterior, rings.into_iter().map(line_string).collect())
}

impl From<StoredGeometry> for geo::Geometry {
    fn from(g: StoredGeometry) -> Self {
        match g {
            StoredGeometry::Point(c) => geo::Geometry::Point(Point::from(c)),
            StoredGeometry::LineString(ring) => geo::Geometry::LineString(line_string(ring)),
            StoredGeometry::Polygon(rings) => geo::Geometry::Polygon(polygon(rings)),
            StoredGeometry::MultiPoint(cs) => {
                geo::Geometry::MultiPoint(MultiPoint::new(cs.into_iter().map(Point::from).collect()))
            }
            StoredGeometry::MultiLineString(rings) => geo::Geometry::MultiLineString(
                MultiLineString::new(rings.into_iter().map(line_string).collect()),
            ),
            StoredGeometry::MultiPolygon(polygons) => geo::Geometry::MultiPolygon(
                MultiPolygon::new(polygons.into_iter().map(polygon).collect()),
            ),
            StoredGeometry::Collection(members) => geo::Geometry::GeometryCollection(
                geo::GeometryCollection(members.into_iter().map(geo::Geometry::from).collect()),
            ),
        }
    }
}

impl From<&Layer> for StoredLayer {
    fn from(layer: &Layer) -> Self {
        Self {
            name: layer.name().to_string(),
            geometry_type: layer.geometry_type(),
            wkt: layer.spatial_reference().wkt().to_string(),
            fields: layer
                .fields()
                .iter()
                .map(|f| (f.name().to_string(), f.field_type()))
                .collect(),
            features: layer
                .features()
                .map(|f| StoredFeature {
                    fid: f.fid().unwrap_or_default(),
                    geometry: f.geometry().map(|g| StoredGeometry::from(g.as_geo())),
                    fields: f.fields().to_vec(),
                })
                .collect(),
        }
    }
}

impl From<StoredLayer> for Layer {
    fn from(stored: StoredLayer) -> Self {
        Layer::from_parts(
            stored.name,
            stored.geometry_type,
            SpatialReference::from_wkt(stored.wkt),
            stored
                .fields
                .into_iter()
                .map(|(name, field_type)| FieldDefn::new(name, field_type))
                .collect(),
            stored
                .features
                .into_iter()
                .map(|f| {
                    (
                        f.fid,
                        f.geometry.map(|g| Geometry::new(geo::Geometry::from(g))),
                        f.fields,
                    )
                })
                .collect(),
        )
    }
}

/// Writes the given layers to a layer file
pub fn write(path: &Path, name: &str, layers: &[Layer]) -> Result<(), DatasourceError> {
    let stored = StoredDatasource {
        name: name.to_string(),
        layers: layers.iter().map(StoredLayer::from).collect(),
    };
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(MAGIC)?;
    bincode::encode_into_std_write(&stored, &mut writer, config::standard())?;
    writer.flush()?;
    Ok(())
}

/// Reads the datasource name and its layers from a layer file
pub fn read(path: &Path) -> Result<(String, Vec<Layer>), DatasourceError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut magic = [0u8; 4];
    if reader.read_exact(&mut magic).is_err() || &magic != MAGIC {
        return Err(DatasourceError::NotALayerFile(path.to_path_buf()));
    }
    let stored: StoredDatasource = bincode::decode_from_std_read(&mut reader, config::standard())?;
    Ok((
        stored.name,
        stored.layers.into_iter().map(Layer::from).collect(),
    ))
}
