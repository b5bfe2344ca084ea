use std::path::Path;

use geo::Rect;

use crate::{
    datasource::{Feature, FieldDefn, FieldType, FieldValue, Layer, SpatialReference},
    geometry::{Geometry, GeometryType},
};

use super::OperationConfig;

pub const UTM_21S: &str = r#"PROJCS["WGS 84 / UTM zone 21S",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]],UNIT["metre",1]]"#;

pub const WGS84: &str =
    r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]]]"#;

pub fn square(x: f64, y: f64, size: f64) -> Geometry {
    Geometry::new(Rect::new((x, y), (x + size, y + size)).to_polygon())
}

/// Builds a layer from geometries and their field values
pub fn layer(
    name: &str,
    geometry_type: GeometryType,
    wkt: &str,
    fields: &[(&str, FieldType)],
    features: Vec<(Geometry, Vec<FieldValue>)>,
) -> Layer {
    let mut layer = Layer::new(name, geometry_type, SpatialReference::from_wkt(wkt));
    for (field_name, field_type) in fields {
        layer
            .create_field(FieldDefn::new(*field_name, *field_type), false)
            .unwrap();
    }
    for (geometry, values) in features {
        let mut f = Feature::for_layer(&layer).with_geometry(geometry);
        for (i, v) in values.into_iter().enumerate() {
            f.set_field(i, v);
        }
        layer.create_feature(f);
    }
    layer
}

/// A projected polygon layer
pub fn polygon_layer(
    name: &str,
    fields: &[(&str, FieldType)],
    features: Vec<(Geometry, Vec<FieldValue>)>,
) -> Layer {
    layer(name, GeometryType::Polygon, UTM_21S, fields, features)
}

pub fn config(output_dir: &Path) -> OperationConfig {
    OperationConfig {
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    }
}

/// Sum of the pairwise overlap areas of the given geometries
pub fn overlap_area(geometries: &[&Geometry]) -> f64 {
    let mut total = 0.0;
    for (i, a) in geometries.iter().enumerate() {
        for b in &geometries[i + 1..] {
            total += a.intersection(b).area();
        }
    }
    total
}
