use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::{
    datasource::{Datasource, Feature, Layer, VectorSource},
    geometry::Geometry,
};

use super::{
    copy_field_schema, copy_field_values, create_output, first_layers, OperationConfig,
    OperationType, VectorOperation,
};

/// Merges the first layers of two sources so that overlapping areas are
/// represented exactly once
pub struct UnionOperation {
    output_dir: PathBuf,
}

impl UnionOperation {
    pub fn new(config: &OperationConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
        }
    }
}

/// Two polygons are split into common and remaining parts only if they
/// overlap partially
fn splits(a: &Geometry, b: &Geometry) -> bool {
    a.geometry_type().is_polygonal()
        && b.geometry_type().is_polygonal()
        && (a.intersects(b) || b.intersects(a))
        && !a.contains(b)
        && !b.contains(a)
}

/// Writes a feature with the given geometry and the fields of `sources`,
/// each copied to its offset. Empty geometries are dropped.
fn emit(out_layer: &mut Layer, geometry: Geometry, sources: &[(&Feature, usize, usize)]) {
    if geometry.is_empty() {
        debug!("skipping empty union part");
        return;
    }
    let mut out = Feature::for_layer(out_layer).with_geometry(geometry);
    for &(source, limit, offset) in sources {
        copy_field_values(source, &mut out, limit, offset);
    }
    out_layer.create_feature(out);
}

impl VectorOperation for UnionOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::Union
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
        copy_field_schema(second, out_layer)?;
        let first_count = first.field_count();
        let total_count = out_layer.field_count();

        // Parts of second-layer features that may still be consumed by later
        // first-layer features, keyed by the feature's position in the
        // second layer. What survives all first-layer features is the
        // intersection of a bucket.
        let mut pending: FxHashMap<usize, Vec<Geometry>> = FxHashMap::default();

        for f1 in first.features() {
            let Some(g1) = f1.geometry() else {
                continue;
            };
            let mut remainder = g1.clone();
            for (index, f2) in second.features().enumerate() {
                let Some(g2) = f2.geometry() else {
                    continue;
                };
                let bucket = pending.entry(index).or_default();
                if splits(&remainder, g2) {
                    emit(
                        out_layer,
                        remainder.intersection(g2),
                        &[(f1, first_count, 0), (f2, total_count, first_count)],
                    );
                    bucket.push(g2.difference(&remainder));
                    remainder = remainder.difference(g2);
                } else {
                    bucket.push(g2.clone());
                }
            }
            emit(out_layer, remainder, &[(f1, first_count, 0)]);
        }

        for (index, f2) in second.features().enumerate() {
            let leftover = match pending.remove(&index) {
                Some(bucket) => bucket.into_iter().reduce(|acc, g| acc.intersection(&g)),
                // nothing in the first layer could have consumed it
                None => f2.geometry().cloned(),
            };
            if let Some(leftover) = leftover {
                emit(out_layer, leftover, &[(f2, total_count, first_count)]);
            }
        }

        output.flush()?;
        if let Some(l) = output.first_layer() {
            info!(
                "Union of `{}' and `{}' produced {} features",
                first.name(),
                second.name(),
                l.feature_count()
            );
        }
        Ok(output)
    }
}
