use std::path::PathBuf;

use anyhow::Result;
use itertools::Itertools;
use log::{info, warn};

use crate::datasource::{Datasource, Feature, VectorSource};

use super::{
    copy_field_schema, copy_field_values, create_output, first_layers, verify_layers_type,
    OperationConfig, OperationType, VectorOperation,
};

/// Intersects every feature of the first layer with every feature of the
/// second layer
pub struct IntersectionOperation {
    output_dir: PathBuf,
}

impl IntersectionOperation {
    pub fn new(config: &OperationConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
        }
    }
}

impl VectorOperation for IntersectionOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Intersection
    }

    fn process(&self, sources: &[&dyn VectorSource]) -> Result<Datasource> {
        let (first, second) = first_layers(sources)?;
        if !verify_layers_type(&sources[..2]) {
            warn!(
                "Intersecting layers of different geometry types ({} and {})",
                first.geometry_type(),
                second.geometry_type()
            );
        }

        let mut output = create_output(&self.output_dir, sources[0].name())?;
        let out_layer = output.create_layer(
            first.name(),
            first.geometry_type(),
            first.spatial_reference().clone(),
        );
        copy_field_schema(first, out_layer)?;
        copy_field_schema(second, out_layer)?;
        let first_count = first.field_count();
        let total_count = out_layer.field_count();

        for (f1, f2) in first.features().cartesian_product(second.features()) {
            let (Some(g1), Some(g2)) = (f1.geometry(), f2.geometry()) else {
                continue;
            };
            if !g1.intersects(g2) {
                continue;
            }
            let common = g1.intersection(g2);
            if common.is_empty() {
                continue;
            }
            let mut out = Feature::for_layer(out_layer).with_geometry(common);
            copy_field_values(f1, &mut out, first_count, 0);
            copy_field_values(f2, &mut out, total_count, first_count);
            out_layer.create_feature(out);
        }

        output.flush()?;
        if let Some(l) = output.first_layer() {
            info!(
                "Intersection of `{}' and `{}' produced {} features",
                first.name(),
                second.name(),
                l.feature_count()
            );
        }
        Ok(output)
    }
}
