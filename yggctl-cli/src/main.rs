//! yggctl: command-line client for the Yggdrasil admin API
//!
//! Sends one operation to the router's admin socket and prints the reply
//! payload as JSON on stdout.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use yggctl_utils::{init_logging_with_config, Config, LogConfig, YggctlError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr; filter from YGGCTL_LOG, default warn
    let log_config = if cli.verbose {
        LogConfig::cli().with_filter("warn,yggctl_client=debug,yggctl_cli=debug")
    } else {
        LogConfig::cli()
    };
    if let Err(e) = init_logging_with_config(log_config) {
        eprintln!("yggctl: {}", e);
    }

    let config = Config::load_or_default();

    let exit_code = match commands::execute(cli, &config).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("yggctl: {}", e);
            exit_code(&e)
        }
    };

    std::process::exit(exit_code);
}

/// 1 when the router refused the operation, 2 for everything else
fn exit_code(err: &YggctlError) -> i32 {
    if err.is_remote() {
        1
    } else {
        2
    }
}
