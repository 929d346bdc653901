//! torvpn CLI
//!
//! Command-line interface for transparent Tor routing.

mod app;
mod args;
mod commands;
mod logging;
mod settings;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use app::App;
use args::Args;
use commands::Command;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // A broken config file only matters to commands that use it
    let loaded = settings::load(args.config.as_deref());

    // Initialize logging
    logging::init(&args, loaded.as_ref().ok().map(|l| &l.config.logging))?;

    if args.command.is_lifecycle() && !args.quiet {
        print_banner();
    }

    let result = run(args, loaded);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn run(args: Args, loaded: Result<settings::Loaded>) -> Result<()> {
    let (strategy, dry_run) = (args.strategy, args.dry_run);
    let app = move || -> Result<App> { Ok(App::new(loaded?, strategy, dry_run)) };

    match args.command {
        Command::Start => commands::start::execute(&app()?),
        Command::Stop => commands::stop::execute(&app()?),
        Command::Restart => commands::restart::execute(&app()?),
        Command::Status => commands::status::execute(&app()?),
        Command::Run(run_args) => commands::run::execute(&app()?, run_args),
        Command::Check(check_args) => commands::check::execute(&app()?, check_args),
        Command::Config(config_args) => commands::config::execute(config_args, args.config.as_deref()),
        Command::Completions(comp_args) => commands::completions::execute(comp_args),
    }
}

fn print_banner() {
    use colored::Colorize;

    println!("{} {}", "torvpn".green().bold(), env!("CARGO_PKG_VERSION").dimmed());
    println!("{}", "Transparent Tor routing".white());
    println!();
}
