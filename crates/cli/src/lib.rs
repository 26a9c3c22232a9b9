mod clear;
mod index;
mod query;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "stylescope",
    version,
    about = "Class and dependency index for CSS modules",
    long_about = "Stylescope indexes the class names declared in CSS module stylesheets and the \
                  scripts that import them. It reports unresolved imports and undefined classes \
                  through a language server and answers index queries from the command line."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build (or load) the index of a workspace and print its statistics
    #[command(
        long_about = "Scans the workspace for CSS modules and scripts and records every import. \
                            The resulting index is persisted under ~/.stylescope/cache/."
    )]
    Index {
        /// Path to the workspace root
        #[arg(value_name = "WORKSPACE_PATH")]
        path: PathBuf,
    },
    /// Query the classes and dependents of one CSS module
    Query {
        /// Path to the workspace root
        #[arg(value_name = "WORKSPACE_PATH")]
        path: PathBuf,
        /// The CSS module, absolute or relative to the workspace root
        #[arg(value_name = "MODULE")]
        module: PathBuf,
        /// Only show the declarations of this class
        #[arg(long, value_name = "NAME")]
        class: Option<String>,
        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Remove the persisted index
    #[command(
        long_about = "Removes the persisted index of one workspace. Without a path every cached \
                            workspace index is removed."
    )]
    Clear {
        /// Path to the workspace root (optional)
        #[arg(value_name = "WORKSPACE_PATH")]
        path: Option<PathBuf>,
    },
    /// Start the Language Server Protocol (LSP) server on stdio
    Lsp,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let component = match &cli.command {
        Commands::Lsp => "lsp",
        _ => "cli",
    };
    let _guard = stylescope_core::logging::init_logging(
        component,
        !matches!(cli.command, Commands::Lsp),
    );

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Index { path } => rt.block_on(index::run(path)),
        Commands::Query {
            path,
            module,
            class,
            json,
        } => rt.block_on(query::run(path, module, class, json)),
        Commands::Clear { path } => rt.block_on(clear::run(path)),
        Commands::Lsp => rt.block_on(stylescope_lsp::run_server()),
    }
}
