mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "zipdeploy",
    about = "Package a project into an environment-specific deployment zip"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployment archive for an environment
    Pack {
        /// Environment name
        env: String,
        /// Package the staged index instead of HEAD
        #[arg(long)]
        staged: bool,
        /// Where to write the zip (default: <tmpdir>/<label>.zip)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the files that would be packaged
    Ls {
        /// Environment name
        env: String,
        /// List the staged index instead of HEAD
        #[arg(long)]
        staged: bool,
    },
    /// List environments configured in zipdeploy.toml
    Envs,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            env,
            staged,
            output,
            json,
        } => commands::pack(&env, staged, output, json)?,
        Commands::Ls { env, staged } => commands::ls(&env, staged)?,
        Commands::Envs => commands::envs()?,
    }

    Ok(())
}
