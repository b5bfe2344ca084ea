use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;

use crate::{
    datasource::{
        Datasource, Feature, FieldDefn, FieldType, FieldValue, SpatialReference,
        SpatialReferenceKind, VectorSource,
    },
    geometry::{Geometry, GeometryType},
};

use super::{
    copy_field_schema, copy_field_values, create_output, first_layer, OperationConfig,
    OperationType, VectorOperation,
};

/// Approximate length of one degree at the equator in meters
const METERS_PER_DEGREE: f64 = 111_120.0;

/// Field receiving the sequential ring ID
pub const ID_FIELD: &str = "ID";

/// Field receiving the outer distance of a ring
pub const DISTANCE_FIELD: &str = "DistBufer";

/// Field receiving the name of the input layer
pub const ORIGIN_FIELD: &str = "Origen";

/// Creates concentric buffer rings around every feature of the first layer
/// of the first source
pub struct BufferOperation {
    distance_field: Option<String>,
    distance: f64,
    ring_count: u32,
    conversion_factor: f64,
    output_dir: PathBuf,
}

impl BufferOperation {
    pub fn new(config: &OperationConfig) -> Self {
        Self {
            distance_field: config.distance_field.clone(),
            distance: config.distance,
            ring_count: config.ring_count,
            conversion_factor: config.conversion_factor,
            output_dir: config.output_dir.clone(),
        }
    }

    /// The factor turning a raw distance into layer units
    fn distance_scale(&self, spatial_reference: &SpatialReference) -> f64 {
        match spatial_reference.kind() {
            SpatialReferenceKind::Projected => self.conversion_factor,
            SpatialReferenceKind::Geographic => self.conversion_factor / METERS_PER_DEGREE,
            SpatialReferenceKind::Unknown => 0.0,
        }
    }
}

impl VectorOperation for BufferOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Buffer
    }

    fn process(&self, sources: &[&dyn VectorSource]) -> Result<Datasource> {
        let Some(source) = sources.first() else {
            bail!("Buffer requires an input datasource");
        };
        let layer = first_layer(*source)?;

        let distance_field_index = match &self.distance_field {
            Some(name) => Some(layer.field_index(name).with_context(|| {
                format!("Layer `{}' has no distance field `{}'", layer.name(), name)
            })?),
            None => None,
        };
        let scale = self.distance_scale(layer.spatial_reference());

        let mut output = create_output(&self.output_dir, source.name())?;
        let out_layer = output.create_layer(
            layer.name(),
            GeometryType::Polygon,
            layer.spatial_reference().clone(),
        );
        copy_field_schema(layer, out_layer)?;
        let id_index = out_layer.create_field(FieldDefn::new(ID_FIELD, FieldType::Integer), true)?;
        let distance_index =
            out_layer.create_field(FieldDefn::new(DISTANCE_FIELD, FieldType::Real), true)?;
        let origin_index =
            out_layer.create_field(FieldDefn::new(ORIGIN_FIELD, FieldType::String), true)?;

        let rings = self.ring_count.max(1);
        let mut next_id: i64 = 1;
        for feature in layer.features() {
            let Some(geometry) = feature.geometry() else {
                continue;
            };
            let raw_distance = match distance_field_index {
                Some(i) => feature.field(i).and_then(FieldValue::as_f64).unwrap_or(0.0),
                None => self.distance,
            };
            let distance = raw_distance * scale;

            // every ring is buffered from the input geometry; the previous
            // full buffer is cut out so that rings do not overlap
            let mut previous: Option<Geometry> = None;
            for ring in 1..=rings {
                let ring_distance = f64::from(ring) * distance;
                let outer = geometry.buffer(ring_distance);
                let band = match &previous {
                    Some(inner) => outer.difference(inner),
                    None => outer.clone(),
                };

                let mut out = Feature::for_layer(out_layer).with_geometry(band);
                copy_field_values(feature, &mut out, layer.field_count(), 0);
                out.set_field(id_index, next_id.into());
                out.set_field(distance_index, ring_distance.into());
                out.set_field(origin_index, layer.name().into());
                out_layer.create_feature(out);

                next_id += 1;
                previous = Some(outer);
            }
        }

        output.flush()?;
        info!(
            "Buffered {} features of `{}' into {} rings",
            layer.feature_count(),
            layer.name(),
            next_id - 1
        );
        Ok(output)
    }
}
