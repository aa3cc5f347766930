use anyhow::Result;
use clap::Parser;
use env_logger::Env;

mod args;
mod ops;

use args::{Cli, Commands};

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Render {
            output,
            width,
            height,
            zoom,
            center,
            select,
        } => ops::render(cli, output, (*width, *height), *zoom, *center, *select),
        Commands::Political { output } => ops::political(cli, output),
        Commands::Borders { output, province } => ops::borders(cli, output, *province),
        Commands::Labels { zoom } => ops::labels(cli, *zoom),
        Commands::Lookup { x, y } => ops::lookup(cli, *x, *y),
        Commands::Import {
            input,
            rules,
            output,
        } => ops::import(cli, input, rules, output),
        Commands::Export { output } => ops::export(cli, output.as_deref()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    run(&cli)
}
