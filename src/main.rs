//! `switchyard` command line: inspect and check a route configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use switchyard::config::{load_config, AppConfig};
use switchyard::observability::init_tracing;
use switchyard::routing::{Router, Verb};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Inspect switchyard route tables", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "switchyard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and compile the route table
    Check,
    /// Print the compiled route table in match order
    Routes,
    /// Resolve a verb and path against the route table
    Resolve {
        /// get, post, patch or delete
        verb: String,
        path: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}: {}", cli.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.observability);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &AppConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let router = Router::from_definitions(config.route_definitions())?;

    match command {
        Commands::Check => {
            println!(
                "OK: {} definitions, {} compiled routes",
                config.routes.len(),
                router.table().len()
            );
        }
        Commands::Routes => {
            for route in router.table() {
                let metadata = route
                    .metadata()
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{:<7} {:<32} {:<48} {}",
                    route.verb().as_str().to_uppercase(),
                    route.template(),
                    route.pattern(),
                    metadata
                );
            }
        }
        Commands::Resolve { verb, path } => {
            let verb: Verb = verb.parse()?;
            match router.resolve(&path, verb) {
                Some(params) => println!("{}", serde_json::to_string_pretty(&params)?),
                None => {
                    println!("no match");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
