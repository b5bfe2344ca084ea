use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use surivector_core::datasource::{Datasource, VectorSource};
use yansi::Paint;

/// Show the layers of a layer file
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// The layer file to inspect
    pub file: PathBuf,
}

/// Run the `info` command
pub fn run_info(args: InfoArgs) -> Result<()> {
    let ds = Datasource::open(&args.file)
        .with_context(|| format!("Unable to open `{}'", args.file.display()))?;

    println!("{}", ds.name().bold());
    for layer in ds.layers() {
        println!();
        println!("  {} {}", "Layer:".bold(), layer.name());
        println!("  {} {}", "Geometry:".bold(), layer.geometry_type());
        println!("  {} {}", "Features:".bold(), layer.feature_count());
        println!(
            "  {} {:?}",
            "Spatial reference:".bold(),
            layer.spatial_reference().kind()
        );
        if let Some(extent) = layer.extent() {
            println!(
                "  {} ({}, {}) - ({}, {})",
                "Extent:".bold(),
                extent.min().x,
                extent.min().y,
                extent.max().x,
                extent.max().y
            );
        }
        for field in layer.fields() {
            println!("    {} ({})", field.name().green(), field.field_type());
        }
    }

    Ok(())
}
