//! RepMarket CLI - drive the application shell from a terminal.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// RepMarket - sales rep marketplace shell
#[derive(Parser, Debug)]
#[command(name = "repmarket")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./repmarket.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and persist the session
    Login {
        /// Account email
        email: String,
        /// Account password
        #[arg(short, long)]
        password: String,
        /// Page to continue to after login
        #[arg(short, long)]
        redirect: Option<String>,
    },

    /// End the persisted session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Create an account and log in
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        /// Account email
        #[arg(long)]
        email: String,
        /// Password
        #[arg(long)]
        password: String,
        /// Account role (rep or business)
        #[arg(long)]
        role: String,
        /// Company name
        #[arg(long)]
        company: Option<String>,
        /// Industry
        #[arg(long)]
        industry: Option<String>,
        /// Sales territory
        #[arg(long)]
        territory: Option<String>,
    },

    /// Render a route and print the document
    Navigate {
        /// Route path, e.g. /rep/dashboard
        path: String,
        /// Print the full document instead of a summary
        #[arg(long)]
        html: bool,
    },

    /// Print the header for the current session
    Header,

    /// Run a two-tab walkthrough in memory
    Demo,

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("repmarket={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Login {
            email,
            password,
            redirect,
        } => commands::login(config, &email, &password, redirect.as_deref()),
        Commands::Logout => commands::logout(config),
        Commands::Whoami => commands::whoami(config),
        Commands::Register {
            name,
            email,
            password,
            role,
            company,
            industry,
            territory,
        } => commands::register(
            config,
            commands::RegisterArgs {
                name,
                email,
                password,
                role,
                company,
                industry,
                territory,
            },
        ),
        Commands::Navigate { path, html } => commands::navigate(config, &path, html),
        Commands::Header => commands::header(config),
        Commands::Demo => commands::demo(config),
        Commands::Version => {
            println!("repmarket {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
