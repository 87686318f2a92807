use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fundamenta",
    about = "Fundamenta API Health - upstream health and rate-limit monitor",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "FUNDAMENTA_PORT", default_value = "8046", global = true)]
    pub port: u16,

    #[arg(short, long, default_value = "127.0.0.1", global = true)]
    pub bind: IpAddr,

    #[arg(short, long, env = "FUNDAMENTA_CONFIG", global = true, help = "Path to monitor config JSON")]
    pub config: Option<PathBuf>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the health server (default if no command specified)")]
    Serve,

    #[command(about = "Probe every configured API once and print the result")]
    Check {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(subcommand, about = "Inspect or initialise configuration")]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show the effective configuration")]
    Show {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Validate the configuration file and exit")]
    Validate,

    #[command(about = "Write the default configuration to --config")]
    Init {
        #[arg(short, long, help = "Overwrite an existing file")]
        force: bool,
    },
}
