use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::geometry::GeometryType;

pub use self::layer::{Feature, FieldDefn, Layer};
pub use self::srs::{SpatialReference, SpatialReferenceKind};
pub use self::value::{FieldType, FieldValue};

pub mod layer;
pub mod srs;
pub mod storage;
pub mod value;

/// Errors that can occur while accessing a datasource
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("field `{0}' already exists")]
    DuplicateField(String),

    #[error("no feature with FID {0}")]
    UnknownFeature(u64),

    #[error("feature has not been added to a layer yet")]
    MissingFid,

    #[error("datasource `{0}' has no backing file")]
    NotFileBacked(String),

    #[error("`{0}' is not a vector layer file")]
    NotALayerFile(PathBuf),

    #[error("unable to encode datasource")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("unable to decode datasource")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Read access to named vector layers. Operations only depend on this
/// interface, never on a concrete datasource kind.
pub trait VectorSource {
    /// The name identifying this source
    fn name(&self) -> &str;

    /// All layers in their storage order
    fn layers(&self) -> &[Layer];

    /// The layer operations work on
    fn first_layer(&self) -> Option<&Layer> {
        self.layers().first()
    }
}

/// A named collection of vector layers, optionally backed by a layer file
#[derive(Debug, Clone, PartialEq)]
pub struct Datasource {
    name: String,
    path: Option<PathBuf>,
    layers: Vec<Layer>,
}

impl Datasource {
    /// Creates a datasource that only lives in memory
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            layers: Vec::new(),
        }
    }

    /// Creates an empty datasource that will be written to `path` on
    /// [`flush`](Self::flush)
    pub fn create(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            layers: Vec::new(),
        }
    }

    /// Reads a datasource from a layer file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatasourceError> {
        let path = path.as_ref();
        let (name, layers) = storage::read(path)?;
        Ok(Self {
            name,
            path: Some(path.to_path_buf()),
            layers,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends a new empty layer and returns it
    pub fn create_layer(
        &mut self,
        name: impl Into<String>,
        geometry_type: GeometryType,
        spatial_reference: SpatialReference,
    ) -> &mut Layer {
        self.push_layer(Layer::new(name, geometry_type, spatial_reference))
    }

    /// Appends an existing layer and returns it
    pub fn push_layer(&mut self, layer: Layer) -> &mut Layer {
        self.layers.push(layer);
        let last = self.layers.len() - 1;
        &mut self.layers[last]
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    /// Writes the datasource to its backing file
    pub fn flush(&self) -> Result<(), DatasourceError> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| DatasourceError::NotFileBacked(self.name.clone()))?;
        storage::write(path, &self.name, &self.layers)
    }
}

impl VectorSource for Datasource {
    fn name(&self) -> &str {
        &self.name
    }

    fn layers(&self) -> &[Layer] {
        &self.layers
    }
}
