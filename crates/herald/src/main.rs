//! Herald CLI binary.
//!
//! - `herald call <route>` sends one API call and prints its result
//! - `herald config` prints the effective layered configuration

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{CallArgs, Cli, Commands, run_call, show_config};

    // Pick up HERALD_TOKEN and friends from .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn,herald=info" };
    if let Err(e) = herald::init_tracing_with(filter) {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    match cli.command {
        Commands::Call {
            route,
            method,
            json,
            query,
            token,
            key,
        } => {
            run_call(CallArgs {
                route,
                method,
                json,
                query,
                token,
                key,
            })
            .await?;
        }

        Commands::Config => {
            show_config()?;
        }
    }

    Ok(())
}
