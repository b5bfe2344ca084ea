use clap::{Parser, Subcommand};
use commands::{
    info::{run_info, InfoArgs},
    run::{run_operation, RunArgs},
};
use yansi::Condition;

mod commands;

#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Run(RunArgs),
    Info(InfoArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    yansi::whenever(Condition::TTY_AND_COLOR);

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_operation(args),
        Commands::Info(args) => run_info(args),
    }
}
