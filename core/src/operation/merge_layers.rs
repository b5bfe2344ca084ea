use std::path::PathBuf;

use anyhow::{bail, Result};
use itertools::Itertools;
use log::{info, warn};

use crate::{
    datasource::{Datasource, DatasourceError, Feature, Layer, VectorSource},
    geometry::GeometryType,
};

use super::{
    create_output, first_layer, verify_layers_type, FieldMergeMap, OperationConfig,
    OperationType, VectorOperation,
};

/// Position of a selected field in its source layer and in the output layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FieldMapping {
    source: usize,
    dest: usize,
}

/// Concatenates the features of several layers into one layer, copying only
/// the fields selected for each source. Geometries are left unchanged.
pub struct MergeLayersOperation {
    merge_fields: FieldMergeMap,
    output_dir: PathBuf,
}

impl MergeLayersOperation {
    pub fn new(config: &OperationConfig) -> Self {
        Self {
            merge_fields: config.merge_fields.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Creates a destination field for every field selected for `source`
    /// and returns where values must be copied from and to
    fn merge_fields(
        &self,
        source_name: &str,
        source: &Layer,
        dest: &mut Layer,
    ) -> Result<Vec<FieldMapping>, DatasourceError> {
        let mut mappings = Vec::new();
        for name in self.merge_fields.fields_for(source_name) {
            let Some(index) = source.field_index(name) else {
                warn!("Layer `{}' has no field `{name}', skipping it", source.name());
                continue;
            };
            let Some(defn) = source.field(index) else {
                continue;
            };
            let dest_index = dest.create_field(defn.clone(), true)?;
            mappings.push(FieldMapping {
                source: index,
                dest: dest_index,
            });
        }
        Ok(mappings)
    }

    /// Copies every feature of `source` into `dest`
    fn merge_features(source: &Layer, dest: &mut Layer, mappings: &[FieldMapping]) {
        for feature in source.features() {
            let out = Self::create_feature(feature, dest, mappings);
            dest.create_feature(out);
        }
    }

    fn create_feature(feature: &Feature, dest: &Layer, mappings: &[FieldMapping]) -> Feature {
        let mut out = Feature::for_layer(dest);
        if let Some(g) = feature.geometry() {
            out.set_geometry(g.clone());
        }
        for m in mappings {
            if let Some(value) = feature.field(m.source) {
                out.set_field(m.dest, value.clone());
            }
        }
        out
    }
}

/// Names shared by more than one source. Each of these sources gets its own
/// copy of the fields selected for the name.
fn colliding_names<'a>(sources: &[&'a dyn VectorSource]) -> Vec<&'a str> {
    sources.iter().copied().map(|s| s.name()).duplicates().collect()
}

impl VectorOperation for MergeLayersOperation {
    fn operation_type(&self) -> OperationType {
        OperationType::MergeLayers
    }

    fn process(&self, sources: &[&dyn VectorSource]) -> Result<Datasource> {
        let Some(head) = sources.first() else {
            bail!("Merging layers requires at least one datasource");
        };
        let layers = sources
            .iter()
            .map(|s| first_layer(*s).map(|l| (s.name(), l)))
            .collect::<Result<Vec<_>>>()?;
        let (_, first) = layers[0];
        for name in colliding_names(sources) {
            warn!("Several datasources are named `{name}', their selected fields are duplicated");
        }

        let geometry_type = if layers.len() == 1 || verify_layers_type(sources) {
            first.geometry_type()
        } else {
            warn!("Merging layers of different geometry types");
            GeometryType::Unknown
        };

        let mut output = create_output(&self.output_dir, head.name())?;
        let out_layer =
            output.create_layer(first.name(), geometry_type, first.spatial_reference().clone());

        let mut mappings = Vec::with_capacity(layers.len());
        for (name, layer) in &layers {
            mappings.push(self.merge_fields(name, layer, out_layer)?);
        }
        for ((_, layer), m) in layers.iter().zip(&mappings) {
            Self::merge_features(layer, out_layer, m);
        }

        output.flush()?;
        if let Some(l) = output.first_layer() {
            info!(
                "Merged {} layers into {} features with {} fields",
                layers.len(),
                l.feature_count(),
                l.field_count()
            );
        }
        Ok(output)
    }
}
