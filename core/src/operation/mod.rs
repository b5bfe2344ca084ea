use std::{
    fmt::{Display, Formatter},
    fs::OpenOptions,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use thiserror::Error;
use ulid::Ulid;

use crate::datasource::{
    storage::LAYER_FILE_EXTENSION, Datasource, DatasourceError, Feature, Layer, VectorSource,
};

pub use self::buffer::BufferOperation;
pub use self::builder::OperationBuilder;
pub use self::intersection::IntersectionOperation;
pub use self::merge_layers::MergeLayersOperation;
pub use self::options::{FieldMergeMap, OperationConfig, OperationOptions, OptionsError};
pub use self::trim::TrimOperation;
pub use self::union::UnionOperation;

pub mod buffer;
pub mod builder;
pub mod intersection;
pub mod merge_layers;
pub mod options;
pub mod trim;
pub mod union;

#[cfg(test)]
mod test_support;

/// Selects the handler that services a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Union,
    Intersection,
    Trim,
    Buffer,
    MergeLayers,
}

impl OperationType {
    pub const ALL: [OperationType; 5] = [
        OperationType::Union,
        OperationType::Intersection,
        OperationType::Trim,
        OperationType::Buffer,
        OperationType::MergeLayers,
    ];
}

impl Display for OperationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationType::Union => "union",
            OperationType::Intersection => "intersection",
            OperationType::Trim => "trim",
            OperationType::Buffer => "buffer",
            OperationType::MergeLayers => "merge-layers",
        };
        write!(f, "{}", name)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown operation `{0}'")]
pub struct UnknownOperationType(String);

impl FromStr for OperationType {
    type Err = UnknownOperationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "union" => Ok(OperationType::Union),
            "intersection" => Ok(OperationType::Intersection),
            "trim" | "difference" | "clip" => Ok(OperationType::Trim),
            "buffer" => Ok(OperationType::Buffer),
            "merge-layers" | "mergelayers" | "merge" => Ok(OperationType::MergeLayers),
            _ => Err(UnknownOperationType(s.to_string())),
        }
    }
}

/// A handler in an [`OperationChain`]
pub trait VectorOperation {
    /// The only operation type this handler services
    fn operation_type(&self) -> OperationType;

    /// Runs the operation on the given sources and returns a new output
    /// datasource flushed to a temporary file
    fn process(&self, sources: &[&dyn VectorSource]) -> Result<Datasource>;
}

/// An ordered sequence of operation handlers. A request is serviced by the
/// first handler whose type matches.
#[derive(Default)]
pub struct OperationChain {
    handlers: Vec<Box<dyn VectorOperation>>,
}

impl OperationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to the tail of the chain
    pub fn add_successor(&mut self, handler: impl VectorOperation + 'static) -> &mut Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The types of all handlers in chain order
    pub fn operation_types(&self) -> impl Iterator<Item = OperationType> + '_ {
        self.handlers.iter().map(|h| h.operation_type())
    }

    /// Passes the request down the chain. Returns `None` if no handler
    /// accepts `operation` or if every accepting handler fails.
    pub fn process_datasource(
        &self,
        operation: OperationType,
        sources: &[&dyn VectorSource],
    ) -> Option<Datasource> {
        for handler in &self.handlers {
            if handler.operation_type() != operation {
                continue;
            }
            match handler.process(sources) {
                Ok(output) => return Some(output),
                Err(err) => warn!("{operation} operation could not be completed: {err:#}"),
            }
        }
        debug!("no handler produced a result for {operation}");
        None
    }
}

/// Reserves a new uniquely named file for an output datasource in `dir`
pub fn create_temporary_output_file(dir: &Path) -> Result<PathBuf> {
    loop {
        let path = dir.join(format!("{}.{}", Ulid::new(), LAYER_FILE_EXTENSION));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => return Ok(path),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Unable to create temporary output file in `{}'", dir.display())
                })
            }
        }
    }
}

/// Creates an empty output datasource backed by a new temporary file
pub(crate) fn create_output(dir: &Path, name: &str) -> Result<Datasource> {
    let path = create_temporary_output_file(dir)?;
    debug!("writing output to `{}'", path.display());
    Ok(Datasource::create(path, name))
}

/// Appends every field definition of `source` to `dest`, keeping order and
/// type. Names already present in `dest` get a numeric suffix.
pub fn copy_field_schema(source: &Layer, dest: &mut Layer) -> Result<(), DatasourceError> {
    for field in source.fields() {
        dest.create_field(field.clone(), true)?;
    }
    Ok(())
}

/// Copies field values by position: `dest[i] = source[i - dest_start_offset]`
/// for every `i` in `dest_start_offset..field_count_limit`
pub fn copy_field_values(
    source: &Feature,
    dest: &mut Feature,
    field_count_limit: usize,
    dest_start_offset: usize,
) {
    for (dest_index, value) in (dest_start_offset..field_count_limit).zip(source.fields()) {
        dest.set_field(dest_index, value.clone());
    }
}

/// Returns `true` if at least two sources are given and all their first
/// layers have the same geometry type
pub fn verify_layers_type(sources: &[&dyn VectorSource]) -> bool {
    if sources.len() < 2 {
        return false;
    }
    let mut types = sources
        .iter()
        .map(|s| s.first_layer().map(Layer::geometry_type));
    let Some(Some(first)) = types.next() else {
        return false;
    };
    types.all(|t| t == Some(first))
}

/// Returns the first layers of the first two sources
pub(crate) fn first_layers<'a>(sources: &[&'a dyn VectorSource]) -> Result<(&'a Layer, &'a Layer)> {
    let [a, b, ..] = sources else {
        bail!("Operation requires two datasources but got {}", sources.len());
    };
    Ok((first_layer(*a)?, first_layer(*b)?))
}

pub(crate) fn first_layer(source: &dyn VectorSource) -> Result<&Layer> {
    source
        .first_layer()
        .with_context(|| format!("Datasource `{}' has no layer", source.name()))
}
