use std::{collections::BTreeMap, path::PathBuf};

use thiserror::Error;

/// Name of the field holding a per-feature buffer distance
pub const DISTANCE_FIELD: &str = "distancefield";

/// Fixed buffer distance
pub const DISTANCE_VALUE: &str = "distancevalue";

/// Number of concentric buffer rings
pub const RING_COUNT: &str = "Nrings";

/// Multiplier converting distances into meters
pub const CONVERSION_FACTOR: &str = "conversionfactor";

/// Fields to merge, encoded as `key=field,key=field`
pub const MERGE_FIELDS: &str = "mergefields";

/// Directory where temporary outputs are created
pub const OUTPUT_DIR: &str = "outputdir";

/// Errors in operation options
#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionsError {
    #[error("option `{option}' must be a number but was `{value}'")]
    InvalidNumber { option: String, value: String },
}

/// A flat key/value bag of operation parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationOptions {
    values: BTreeMap<String, String>,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing a previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn parse_number<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, OptionsError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| OptionsError::InvalidNumber {
                    option: key.to_string(),
                    value: v.to_string(),
                }),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for OperationOptions
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Selected fields per datasource. Keys are datasource names; a key may
/// select several fields and a field name may appear under several keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMergeMap {
    entries: Vec<(String, String)>,
}

impl FieldMergeMap {
    /// Parses `key1=field1,key2=field2,...`. Parsing stops at the first
    /// entry that does not consist of exactly two `=`-separated tokens;
    /// everything after it is dropped.
    pub fn parse(encoded: &str) -> Self {
        let mut entries = Vec::new();
        for pair in encoded.split(',') {
            let tokens = pair.split('=').collect::<Vec<_>>();
            let [key, field] = tokens.as_slice() else {
                break;
            };
            entries.push((key.to_string(), field.to_string()));
        }
        Self { entries }
    }

    pub fn insert(&mut self, key: impl Into<String>, field: impl Into<String>) {
        self.entries.push((key.into(), field.into()));
    }

    /// All fields selected for the given key in insertion order
    pub fn fields_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, f)| f.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, f)| (k.as_str(), f.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Typed operation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct OperationConfig {
    /// Field holding a per-feature buffer distance
    pub distance_field: Option<String>,

    /// Fixed buffer distance used when no distance field is configured
    pub distance: f64,

    /// Number of concentric buffer rings
    pub ring_count: u32,

    /// Multiplier converting distances into meters
    pub conversion_factor: f64,

    /// Fields to copy in a layer merge
    pub merge_fields: FieldMergeMap,

    /// Directory for temporary output files
    pub output_dir: PathBuf,
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            distance_field: None,
            distance: 0.0,
            ring_count: 1,
            conversion_factor: 1.0,
            merge_fields: FieldMergeMap::default(),
            output_dir: std::env::temp_dir(),
        }
    }
}

impl TryFrom<&OperationOptions> for OperationConfig {
    type Error = OptionsError;

    fn try_from(options: &OperationOptions) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        Ok(Self {
            distance_field: options
                .get(DISTANCE_FIELD)
                .filter(|f| !f.is_empty())
                .map(str::to_string),
            distance: options
                .parse_number(DISTANCE_VALUE)?
                .unwrap_or(defaults.distance),
            ring_count: options
                .parse_number(RING_COUNT)?
                .unwrap_or(defaults.ring_count),
            conversion_factor: options
                .parse_number(CONVERSION_FACTOR)?
                .unwrap_or(defaults.conversion_factor),
            merge_fields: options
                .get(MERGE_FIELDS)
                .map(FieldMergeMap::parse)
                .unwrap_or_default(),
            output_dir: options
                .get(OUTPUT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
        })
    }
}

#[cfg(test)]
mod tests {
    use assertor::{assert_that, EqualityAssertion};
    use pretty_assertions::assert_eq;

    use super::{
        FieldMergeMap, OperationConfig, OperationOptions, OptionsError, CONVERSION_FACTOR,
        DISTANCE_FIELD, DISTANCE_VALUE, MERGE_FIELDS, RING_COUNT,
    };

    #[test]
    fn parse_merge_fields() {
        let map = FieldMergeMap::parse("roads=NAME,rivers=NAME,roads=TYPE");
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("roads", "NAME"), ("rivers", "NAME"), ("roads", "TYPE")]
        );
        assert_eq!(map.fields_for("roads").collect::<Vec<_>>(), vec!["NAME", "TYPE"]);
        assert_eq!(map.fields_for("lakes").count(), 0);
    }

    #[test]
    fn merge_fields_truncate_at_malformed_entry() {
        let map = FieldMergeMap::parse("a=X,broken,b=Y");
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("a", "X")]);

        let map = FieldMergeMap::parse("a=X,b=Y=Z,c=W");
        assert_eq!(map.len(), 1);

        assert!(FieldMergeMap::parse("").is_empty());
    }

    #[test]
    fn config_from_options() {
        let options = [
            (DISTANCE_FIELD, "RADIUS"),
            (DISTANCE_VALUE, "12.5"),
            (RING_COUNT, "3"),
            (CONVERSION_FACTOR, " 1000 "),
            (MERGE_FIELDS, "a=X"),
        ]
        .into_iter()
        .collect::<OperationOptions>();
        let config = OperationConfig::try_from(&options).unwrap();
        assert_that!(config.distance_field).is_equal_to(Some("RADIUS".to_string()));
        assert_that!(config.distance).is_equal_to(12.5);
        assert_that!(config.ring_count).is_equal_to(3);
        assert_that!(config.conversion_factor).is_equal_to(1000.0);
        assert_that!(config.merge_fields.len()).is_equal_to(1);
    }

    #[test]
    fn config_defaults() {
        let config = OperationConfig::try_from(&OperationOptions::new()).unwrap();
        assert_eq!(config, OperationConfig::default());

        let empty_field = [(DISTANCE_FIELD, "")].into_iter().collect::<OperationOptions>();
        let config = OperationConfig::try_from(&empty_field).unwrap();
        assert_that!(config.distance_field).is_equal_to(None);
    }

    #[test]
    fn invalid_number() {
        let options = [(RING_COUNT, "three")]
            .into_iter()
            .collect::<OperationOptions>();
        assert_eq!(
            OperationConfig::try_from(&options),
            Err(OptionsError::InvalidNumber {
                option: RING_COUNT.to_string(),
                value: "three".to_string(),
            })
        );
    }
}
