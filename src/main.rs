//! sitediag - diagnostics dashboard for WordPress image-optimization setups

use clap::Parser;

mod actions;
mod cache;
mod cli;
mod config;
mod error;
mod output;
mod probe;
mod probes;
mod report;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init => cli::init::run(&opts),
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("sitediag version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Report => cli::report::run(&opts).await,
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts),
            CacheCommands::Clear(args) => cli::cache::clear(&args, &opts),
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Completion { shell } => cli::completions::run(shell),
    }
}

/// `--debug` turns on debug output for this crate; otherwise `RUST_LOG`
/// applies, defaulting to warnings only
fn init_logging(debug: bool) {
    let env = env_logger::Env::default().default_filter_or("warn");
    let mut builder = env_logger::Builder::from_env(env);
    builder.format_timestamp(None);

    if debug {
        builder.filter_module(env!("CARGO_PKG_NAME"), log::LevelFilter::Debug);
    }

    if builder.try_init().is_err() {
        eprintln!("Logger already initialized");
    }
}
