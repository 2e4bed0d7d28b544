use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use piece_manager_mod::config::loader;
use piece_manager_mod::pieces::PieceRegistry;
use piece_manager_mod::plugin;

#[derive(Parser)]
#[command(name = "piece-mod-cli")]
#[command(about = "Inspect the piece manager mod and its config file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a config file and list its entries
    Check {
        /// Path to the .cfg file
        path: PathBuf,
    },
    /// Print the pieces the mod declares as JSON
    Pieces,
    /// Print the config file name the mod uses
    Path {
        #[arg(short, long, default_value = "BepInEx/config")]
        config_dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Check { path } => {
            let entries = loader::flatten(loader::read_table(&path)?);
            let mut section: Option<&str> = None;
            for (definition, value) in &entries {
                if section != Some(definition.section.as_str()) {
                    println!("[{}]", definition.section);
                    section = Some(definition.section.as_str());
                }
                println!("  {} = {}", definition.key, value);
            }
            println!("{} entries OK", entries.len());
        }
        Commands::Pieces => {
            let mut registry = PieceRegistry::new();
            plugin::register_example_pieces(&mut registry)?;
            println!("{}", serde_json::to_string_pretty(&registry)?);
        }
        Commands::Path { config_dir } => {
            let location = piece_manager_mod::config::ConfigFileLocation::new(
                &config_dir,
                &plugin::metadata().guid(),
            );
            println!("{}", location.full_path().display());
        }
    }
    Ok(())
}
