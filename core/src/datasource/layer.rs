use geo::Rect;

use crate::geometry::{Geometry, GeometryType};

use super::{
    value::{FieldType, FieldValue},
    DatasourceError, SpatialReference, VectorSource,
};

/// The definition of one attribute field in a layer schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefn {
    name: String,
    field_type: FieldType,
}

impl FieldDefn {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// One row of a layer: an optional geometry plus field values that are
/// positionally aligned with the layer's schema
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    fid: Option<u64>,
    geometry: Option<Geometry>,
    fields: Vec<FieldValue>,
}

impl Feature {
    /// Creates a blank feature with `field_count` unset fields
    pub fn new(field_count: usize) -> Self {
        Self {
            fid: None,
            geometry: None,
            fields: vec![FieldValue::Null; field_count],
        }
    }

    /// Creates a blank feature matching the schema of the given layer
    pub fn for_layer(layer: &Layer) -> Self {
        Self::new(layer.field_count())
    }

    /// The feature ID. `None` until the feature has been added to a layer.
    pub fn fid(&self) -> Option<u64> {
        self.fid
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = Some(geometry);
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldValue> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    /// Sets the field at `index`. Returns `false` if the index is outside the
    /// feature's schema.
    pub fn set_field(&mut self, index: usize, value: FieldValue) -> bool {
        match self.fields.get_mut(index) {
            Some(f) => {
                *f = value;
                true
            }
            None => false,
        }
    }

    pub fn with_field(mut self, index: usize, value: impl Into<FieldValue>) -> Self {
        self.set_field(index, value.into());
        self
    }
}

/// A geometry and attribute table
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    geometry_type: GeometryType,
    spatial_reference: SpatialReference,
    fields: Vec<FieldDefn>,
    features: Vec<Feature>,
    next_fid: u64,
}

impl Layer {
    /// Creates an empty layer without fields
    pub fn new(
        name: impl Into<String>,
        geometry_type: GeometryType,
        spatial_reference: SpatialReference,
    ) -> Self {
        Self {
            name: name.into(),
            geometry_type,
            spatial_reference,
            fields: Vec::new(),
            features: Vec::new(),
            next_fid: 0,
        }
    }

    /// Reassembles a layer whose features already carry IDs
    pub(crate) fn from_parts(
        name: String,
        geometry_type: GeometryType,
        spatial_reference: SpatialReference,
        fields: Vec<FieldDefn>,
        features: Vec<(u64, Option<Geometry>, Vec<FieldValue>)>,
    ) -> Self {
        let next_fid = features
            .iter()
            .map(|(fid, _, _)| fid + 1)
            .max()
            .unwrap_or_default();
        let field_count = fields.len();
        let features = features
            .into_iter()
            .map(|(fid, geometry, mut values)| {
                values.resize(field_count, FieldValue::Null);
                Feature {
                    fid: Some(fid),
                    geometry,
                    fields: values,
                }
            })
            .collect();
        Self {
            name,
            geometry_type,
            spatial_reference,
            fields,
            features,
            next_fid,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    pub fn spatial_reference(&self) -> &SpatialReference {
        &self.spatial_reference
    }

    pub fn fields(&self) -> &[FieldDefn] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldDefn> {
        self.fields.get(index)
    }

    /// Returns the index of the field with the given name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Appends a field to the schema and returns its index. A field whose
    /// name is already taken is rejected, or renamed with a numeric suffix
    /// if `approx_ok` is set. Existing features receive a `Null` value for
    /// the new field.
    pub fn create_field(
        &mut self,
        mut defn: FieldDefn,
        approx_ok: bool,
    ) -> Result<usize, DatasourceError> {
        if self.field_index(&defn.name).is_some() {
            if !approx_ok {
                return Err(DatasourceError::DuplicateField(defn.name));
            }
            let base = defn.name.clone();
            let mut n = 1;
            while self.field_index(&defn.name).is_some() {
                defn.name = format!("{base}_{n}");
                n += 1;
            }
        }
        self.fields.push(defn);
        for feature in &mut self.features {
            feature.fields.push(FieldValue::Null);
        }
        Ok(self.fields.len() - 1)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Iterates over all features from the first one
    pub fn features(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn feature(&self, fid: u64) -> Option<&Feature> {
        self.features.iter().find(|f| f.fid == Some(fid))
    }

    /// Adds a feature to the layer and returns its newly assigned ID. The
    /// feature's fields are truncated or padded to match the schema.
    pub fn create_feature(&mut self, mut feature: Feature) -> u64 {
        let fid = self.next_fid;
        self.next_fid += 1;
        feature.fid = Some(fid);
        feature.fields.resize(self.fields.len(), FieldValue::Null);
        self.features.push(feature);
        fid
    }

    /// Replaces the feature with the same ID
    pub fn set_feature(&mut self, mut feature: Feature) -> Result<(), DatasourceError> {
        let fid = feature.fid.ok_or(DatasourceError::MissingFid)?;
        let existing = self
            .features
            .iter_mut()
            .find(|f| f.fid == Some(fid))
            .ok_or(DatasourceError::UnknownFeature(fid))?;
        feature.fields.resize(self.fields.len(), FieldValue::Null);
        *existing = feature;
        Ok(())
    }

    pub fn delete_feature(&mut self, fid: u64) -> Result<Feature, DatasourceError> {
        let pos = self
            .features
            .iter()
            .position(|f| f.fid == Some(fid))
            .ok_or(DatasourceError::UnknownFeature(fid))?;
        Ok(self.features.remove(pos))
    }

    /// The bounding rectangle of all feature geometries
    pub fn extent(&self) -> Option<Rect> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })
    }
}

impl VectorSource for Layer {
    fn name(&self) -> &str {
        &self.name
    }

    fn layers(&self) -> &[Layer] {
        std::slice::from_ref(self)
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion, OptionAssertion};
    use geo::{point, Rect};
    use pretty_assertions::assert_eq;

    use crate::{
        datasource::{DatasourceError, FieldType, FieldValue, SpatialReference},
        geometry::{Geometry, GeometryType},
    };

    use super::{Feature, FieldDefn, Layer};

    fn layer() -> Layer {
        Layer::new("roads", GeometryType::Point, SpatialReference::default())
    }

    #[test]
    fn duplicate_fields() {
        let mut l = layer();
        assert_eq!(
            l.create_field(FieldDefn::new("NAME", FieldType::String), false)
                .unwrap(),
            0
        );
        assert!(matches!(
            l.create_field(FieldDefn::new("NAME", FieldType::String), false),
            Err(DatasourceError::DuplicateField(_))
        ));
        assert_eq!(
            l.create_field(FieldDefn::new("NAME", FieldType::Integer), true)
                .unwrap(),
            1
        );
        assert_eq!(
            l.create_field(FieldDefn::new("NAME", FieldType::Real), true)
                .unwrap(),
            2
        );

        let names = l.fields().iter().map(FieldDefn::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["NAME", "NAME_1", "NAME_2"]);
    }

    #[test]
    fn feature_ids_and_schema_padding() {
        let mut l = layer();
        l.create_field(FieldDefn::new("A", FieldType::Integer), false)
            .unwrap();
        let fid0 = l.create_feature(Feature::new(0));
        let fid1 = l.create_feature(Feature::for_layer(&l).with_field(0, 7i64));
        assert_that!(fid0).is_equal_to(0);
        assert_that!(fid1).is_equal_to(1);
        assert_that!(l.feature(0).unwrap().field(0).cloned())
            .is_equal_to(Some(FieldValue::Null));

        // adding a field extends existing features
        l.create_field(FieldDefn::new("B", FieldType::String), false)
            .unwrap();
        assert_that!(l.feature(1).unwrap().field_count()).is_equal_to(2);

        l.delete_feature(0).unwrap();
        assert_that!(l.feature(0)).is_none();
        assert_that!(l.create_feature(Feature::for_layer(&l))).is_equal_to(2);
    }

    #[test]
    fn replace_feature() {
        let mut l = layer();
        l.create_field(FieldDefn::new("A", FieldType::Integer), false)
            .unwrap();
        let fid = l.create_feature(Feature::for_layer(&l));
        let mut f = l.feature(fid).unwrap().clone();
        f.set_field(0, 42i64.into());
        l.set_feature(f).unwrap();
        assert_that!(l.feature(fid).unwrap().field(0).cloned())
            .is_equal_to(Some(FieldValue::Integer(42)));

        assert!(matches!(
            l.set_feature(Feature::for_layer(&l)),
            Err(DatasourceError::MissingFid)
        ));
    }

    #[test]
    fn extent() {
        let mut l = layer();
        assert_that!(l.extent()).is_none();
        l.create_feature(Feature::new(0).with_geometry(Geometry::new(point!(x: 1.0, y: 5.0))));
        l.create_feature(Feature::new(0).with_geometry(Geometry::new(point!(x: -2.0, y: 3.0))));
        assert_that!(l.extent()).is_equal_to(Some(Rect::new((-2.0, 3.0), (1.0, 5.0))));
    }
}
