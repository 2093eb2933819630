// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, initialise logging, load settings once
//   and hand them to the matching `ui` handler.
// - Any error ends the process with a non-zero exit code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ox45::api::{ListKind, ListQuery, ShortenOptions, SortKey, UploadOptions};
use ox45::config::{Overrides, Settings, API_KEY_ENV, API_URL_ENV};
use ox45::ui;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "0x45", version)]
#[command(about = "A CLI client for the 0x45.st paste and URL shortening service", long_about = None)]
struct Cli {
    /// Config file (default is $HOME/.0x45.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// API key for authentication
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the service
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Log filter written to stderr (e.g. "debug", "ox45=trace")
    #[arg(long, global = true, env = "OX45_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Upload a file, or content piped through stdin
    Upload {
        /// File to upload (reads stdin when omitted)
        file: Option<PathBuf>,
        /// Expiration time (e.g. 24h, 7d)
        #[arg(short, long)]
        expires: Option<String>,
        /// Make the paste private (requires an API key)
        #[arg(short, long)]
        private: bool,
        /// Override the filename
        #[arg(short, long)]
        filename: Option<String>,
        /// Override the file extension
        #[arg(short = 'x', long)]
        ext: Option<String>,
    },

    /// Shorten a URL
    Shorten {
        url: String,
        /// Expiration time (e.g. 24h, 7d)
        #[arg(short, long)]
        expires: Option<String>,
        /// URL title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List your pastes or shortened URLs
    List {
        /// What to list: "pastes" or "urls"
        kind: ListKind,
        /// Page number
        #[arg(short, long, default_value_t = ox45::api::DEFAULT_PAGE,
              value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        /// Number of results per page
        #[arg(short, long, default_value_t = ox45::api::DEFAULT_LIMIT,
              value_parser = clap::value_parser!(u32).range(1..))]
        limit: u32,
        /// Sort by created_at, expires_at or clicks
        #[arg(short, long, default_value = "created_at")]
        sort: SortKey,
    },

    /// Delete a paste or shortened URL by its delete ID
    Delete { id: String },

    /// Manage API keys
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Show click statistics for a shortened URL
    Stats { id: String },

    /// Change when a shortened URL expires
    Expire {
        id: String,
        /// New expiration time (e.g. 30d)
        expires: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Set a configuration value
    Set { key: String, value: String },
    /// Get a configuration value
    Get { key: String },
    /// List all configuration values
    List,
    /// Remove a configuration value
    Unset { key: String },
}

#[derive(Subcommand, Debug)]
enum KeyCommands {
    /// Request a new API key
    Request {
        /// Your email address
        #[arg(long)]
        email: Option<String>,
        /// Your name
        #[arg(long)]
        name: Option<String>,
    },
    /// Show API key status
    Status,
}

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        api_key: cli.api_key,
        api_url: cli.api_url,
    };
    let mut settings =
        Settings::load(cli.config.as_deref(), overrides).context("loading configuration")?;

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Set { key, value } => ui::config_set(&mut settings, &key, &value),
            ConfigCommands::Get { key } => ui::config_get(&settings, &key),
            ConfigCommands::List => ui::config_list(&settings),
            ConfigCommands::Unset { key } => ui::config_unset(&mut settings, &key),
        },
        Commands::Upload {
            file,
            expires,
            private,
            filename,
            ext,
        } => {
            let opts = UploadOptions {
                filename,
                ext,
                expires,
                private,
            };
            ui::upload(&settings, file.as_deref(), opts)
        }
        Commands::Shorten { url, expires, title } => {
            ui::shorten(&settings, ShortenOptions { url, title, expires })
        }
        Commands::List {
            kind,
            page,
            limit,
            sort,
        } => ui::list(
            &settings,
            &ListQuery {
                kind,
                page,
                limit,
                sort,
            },
        ),
        Commands::Delete { id } => ui::delete(&settings, &id),
        Commands::Key { command } => match command {
            KeyCommands::Request { email, name } => ui::key_request(&settings, email, name),
            KeyCommands::Status => ui::key_status(&settings),
        },
        Commands::Stats { id } => ui::stats(&settings, &id),
        Commands::Expire { id, expires } => ui::expire(&settings, &id, &expires),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
