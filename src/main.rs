mod aggregator;
mod cli;
mod db;
mod error;
mod fmt;
mod grid;
mod mapping;
mod matcher;
mod models;
mod reconciler;
mod runner;
mod settings;
mod simulator;

use clap::Parser;

use cli::{Cli, Commands, VendorsCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, company } => cli::init::run(data_dir, company),
        Commands::Import {
            file,
            mapping,
            chunk_size,
            max_rows,
            force,
        } => cli::import::run(&file, &mapping, chunk_size, max_rows, force),
        Commands::Simulate { file, mapping } => cli::simulate::run(&file, &mapping),
        Commands::Vendors { command } => match command {
            VendorsCommands::Add { name } => cli::vendors::add(&name),
            VendorsCommands::List => cli::vendors::list(),
        },
        Commands::Deals { date } => cli::deals::run(date.as_deref()),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
