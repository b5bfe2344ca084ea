use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};

use crate::datasource::{Datasource, Feature, VectorSource};

use super::{
    copy_field_schema, copy_field_values, create_output, first_layers, OperationConfig,
    OperationType, VectorOperation,
};

/// Subtracts every feature of the second layer from each feature of the
/// first layer. Only the attributes of the first layer are kept.
pub struct TrimOperation {
    output_dir: PathBuf,
}

impl TrimOperation {
    pub fn new(config: &OperationConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
        }
    }
}

impl VectorOperation for TrimOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Trim
    }

    fn process(&self, sources: &[&dyn VectorSource]) -> Result<Datasource> {
        let (first, second) = first_layers(sources)?;

        let mut output = create_output(&self.output_dir, sources[0].name())?;
        let out_layer = output.create_layer(
            first.name(),
            first.geometry_type(),
            first.spatial_reference().clone(),
        );
        copy_field_schema(first, out_layer)?;
        let field_count = out_layer.field_count();

        let mut removed = 0;
        for f1 in first.features() {
            let Some(g1) = f1.geometry() else {
                continue;
            };
            let trimmed = second
                .features()
                .filter_map(Feature::geometry)
                .fold(g1.clone(), |acc, g2| {
                    if acc.intersects(g2) {
                        acc.difference(g2)
                    } else {
                        acc
                    }
                });
            if trimmed.is_empty() {
                removed += 1;
                continue;
            }

            let mut out = Feature::for_layer(out_layer).with_geometry(trimmed);
            copy_field_values(f1, &mut out, field_count, 0);
            out_layer.create_feature(out);
        }
        debug!("{removed} features of `{}' were trimmed away", first.name());

        output.flush()?;
        if let Some(l) = output.first_layer() {
            info!(
                "Trimmed `{}' by `{}' into {} features",
                first.name(),
                second.name(),
                l.feature_count()
            );
        }
        Ok(output)
    }
}
