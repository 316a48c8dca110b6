//! Prometeo CLI - banking data from the Prometeo API in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use prometeo_core::config::ApiKeyStore;
use prometeo_core::Config;

mod app;
mod console;
mod context;
mod output;
mod plugins;
mod prompt;

use app::{resolve_api_key, App};
use console::{Console, TerminalConsole};
use context::{get_logger, get_prometeo_dir};
use output::{format_line, Level};
use plugins::PluginRegistry;

/// Prometeo - interactive client for the Prometeo banking API
#[derive(Parser)]
#[command(name = "prometeo", version, about, long_about = None)]
struct Cli {
    /// Your API key. Prefer the key file: flags end up in shell history
    #[arg(short = 'k', long, env = "PROMETEO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Do not use colors for console output
    #[arg(long)]
    no_color: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color || !atty::is(atty::Stream::Stdout) {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format_line(Level::Error, &format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let dir = get_prometeo_dir()?;
    let config = Config::load(&dir)?;
    let mut console = TerminalConsole::new();

    let Some(api_key) = resolve_api_key(cli.api_key, &ApiKeyStore::new(&dir), &mut console)? else {
        console.error("An API key is required to use the Prometeo API.");
        return Ok(ExitCode::FAILURE);
    };

    if config.demo_mode {
        console.info("Demo mode: using offline sample data.");
    }

    let client = prometeo_core::open_client(&config, api_key)?;
    let logger = get_logger(&dir);

    let mut app = App::new(client, console, &dir, logger);
    app.load_plugins(&PluginRegistry::builtin(), &config);
    app.run()?;

    Ok(ExitCode::SUCCESS)
}
