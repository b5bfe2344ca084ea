use std::{
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::Args;
use humantime::format_duration;
use log::info;
use surivector_core::{
    datasource::{Datasource, VectorSource},
    operation::{OperationBuilder, OperationOptions, OperationType},
};
use thiserror::Error;
use yansi::Paint;

/// A malformed `key=value` option
#[derive(Error, Debug)]
#[error("option `{0}' must have the form key=value")]
pub struct OptionSyntaxError(String);

fn parse_option(s: &str) -> Result<(String, String), OptionSyntaxError> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(OptionSyntaxError(s.to_string())),
    }
}

/// Run a vector operation on one or more layer files
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The operation to run (buffer, union, intersection, trim, merge-layers)
    pub operation: OperationType,

    /// The input layer files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// An operation option such as `distancevalue=100` or
    /// `mergefields=roads=NAME`
    #[arg(short = 'o', long = "option", value_parser = parse_option)]
    pub options: Vec<(String, String)>,

    /// Where to put the result. By default it stays in the temporary
    /// output directory.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Run the `run` command
pub fn run_operation(args: RunArgs) -> Result<()> {
    let options = args.options.into_iter().collect::<OperationOptions>();
    let builder = OperationBuilder::new(&options)?;

    let inputs = args
        .inputs
        .iter()
        .map(|p| {
            Datasource::open(p).with_context(|| format!("Unable to open `{}'", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;
    let sources = inputs
        .iter()
        .map(|ds| ds as &dyn VectorSource)
        .collect::<Vec<_>>();

    let start = Instant::now();
    let chain = builder.get_operation(args.operation);
    let Some(output) = chain.process_datasource(args.operation, &sources) else {
        bail!("Operation `{}' could not be completed", args.operation);
    };

    let Some(temp_path) = output.path() else {
        bail!("Operation `{}' produced no output file", args.operation);
    };
    let path = match args.output {
        Some(dest) => {
            fs::copy(temp_path, &dest).with_context(|| {
                format!("Unable to copy result to `{}'", dest.display())
            })?;
            fs::remove_file(temp_path)?;
            dest
        }
        None => temp_path.to_path_buf(),
    };
    info!("Result written to `{}'", path.display());

    let features = output
        .layers()
        .iter()
        .map(|l| l.feature_count())
        .sum::<usize>();
    eprintln!(
        "{} {} features in {}",
        args.operation.to_string().bold(),
        features,
        format_duration(Duration::from_millis(start.elapsed().as_millis() as u64))
    );
    println!("{}", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use assertor::{assert_that, EqualityAssertion};
    use geo::Rect;
    use surivector_core::{
        datasource::{Datasource, Feature, FieldDefn, FieldType, SpatialReference, VectorSource},
        geometry::{Geometry, GeometryType},
        operation::OperationType,
    };
    use tempdir::TempDir;

    use super::{parse_option, run_operation, RunArgs};
    use crate::commands::info::{run_info, InfoArgs};

    const UTM_21S: &str = r#"PROJCS["WGS 84 / UTM zone 21S",GEOGCS["WGS 84"]]"#;

    /// Writes a layer file with one square per feature
    fn write_squares(path: &Path, name: &str, squares: &[(f64, f64, f64)]) {
        let mut ds = Datasource::create(path, name);
        let layer = ds.create_layer(
            name,
            GeometryType::Polygon,
            SpatialReference::from_wkt(UTM_21S),
        );
        layer
            .create_field(FieldDefn::new("NAME", FieldType::String), false)
            .unwrap();
        for (i, &(x, y, size)) in squares.iter().enumerate() {
            let square = Rect::new((x, y), (x + size, y + size)).to_polygon();
            let feature = Feature::for_layer(layer)
                .with_geometry(Geometry::new(square))
                .with_field(0, format!("{name}{i}"));
            layer.create_feature(feature);
        }
        ds.flush().unwrap();
    }

    #[test]
    fn trim_layer_files() {
        let dir = TempDir::new("surivector_cli").unwrap();
        let temp_dir = dir.path().join("temp");
        fs::create_dir(&temp_dir).unwrap();
        let lots = dir.path().join("lots.svl");
        let roads = dir.path().join("roads.svl");
        let result = dir.path().join("result.svl");
        write_squares(&lots, "lots", &[(0.0, 0.0, 4.0), (10.0, 0.0, 1.0)]);
        write_squares(&roads, "roads", &[(0.0, 0.0, 1.0), (9.0, -1.0, 3.0)]);

        run_operation(RunArgs {
            operation: OperationType::Trim,
            inputs: vec![lots, roads],
            options: vec![(
                "outputdir".to_string(),
                temp_dir.to_string_lossy().into_owned(),
            )],
            output: Some(result.clone()),
        })
        .unwrap();

        let output = Datasource::open(&result).unwrap();
        let layer = output.first_layer().unwrap();
        assert_that!(layer.feature_count()).is_equal_to(1);
        let feature = layer.features().next().unwrap();
        assert_that!(feature.field(0).cloned()).is_equal_to(Some("lots0".into()));
        assert!((feature.geometry().unwrap().area() - 15.0).abs() < 1e-6);

        // the temporary output was moved to the requested place
        assert_that!(fs::read_dir(&temp_dir).unwrap().count()).is_equal_to(0);

        assert!(run_info(InfoArgs { file: result }).is_ok());
    }

    #[test]
    fn failing_operation_is_an_error() {
        let dir = TempDir::new("surivector_cli").unwrap();
        let lots = dir.path().join("lots.svl");
        write_squares(&lots, "lots", &[(0.0, 0.0, 4.0)]);

        // trimming needs two inputs
        let result = run_operation(RunArgs {
            operation: OperationType::Trim,
            inputs: vec![lots],
            options: vec![(
                "outputdir".to_string(),
                dir.path().to_string_lossy().into_owned(),
            )],
            output: None,
        });
        assert!(result.is_err());
    }

    #[test]
    fn option_syntax() {
        assert_that!(parse_option("Nrings=3").unwrap())
            .is_equal_to(("Nrings".to_string(), "3".to_string()));
        assert_that!(parse_option("mergefields=a=NAME,b=CODE").unwrap())
            .is_equal_to(("mergefields".to_string(), "a=NAME,b=CODE".to_string()));
        assert!(parse_option("Nrings").is_err());
        assert!(parse_option("=3").is_err());
    }
}
