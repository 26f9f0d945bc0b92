use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reposcan::config::Config;

mod cli;

#[derive(Parser)]
#[command(name = "reposcan")]
#[command(about = "Scan git repositories with bandit and semgrep and merge the findings")]
#[command(version)]
struct Cli {
    /// Working directory used to find .reposcan/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Path to the config file (defaults to .reposcan/config.toml, then ~/.reposcan/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and execute submitted scans
    Serve {
        /// Address to bind (overrides settings.http.bind)
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on (overrides settings.http.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Scan a repository in this process and print the report
    Scan {
        /// Repository URL or local git checkout
        repo: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a scan to a running server
    Submit {
        /// Repository URL
        repo_url: String,

        /// Poll until the scan finishes and print the result
        #[arg(long)]
        wait: bool,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show the status and result of a scan
    Status {
        scan_id: String,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List recent scans
    List {
        /// Show only scans with this status
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of scans to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show configured analyzers and whether they are installed
    Tools,

    /// Write a default configuration file
    Init {
        /// Write .reposcan/config.toml in the working directory instead of ~/.reposcan
        #[arg(long)]
        local: bool,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    // Determine the working directory
    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    if let Commands::Init { local, force } = cli.command {
        cli::init::init_command(&work_dir, cli.config, local, force)?;
        return Ok(());
    }

    let config = Config::load(&work_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind, port } => {
            cli::serve::serve_command(&config, bind, port).await?;
        }
        Commands::Scan { repo, json } => {
            cli::scan::scan_command(&config, &repo, json).await?;
        }
        Commands::Submit {
            repo_url,
            wait,
            json,
        } => {
            cli::submit::submit_command(&config, &repo_url, wait, json).await?;
        }
        Commands::Status { scan_id, json } => {
            cli::status::status_command(&config, &scan_id, json)?;
        }
        Commands::List { status, limit } => {
            cli::list::list_command(&config, status, limit)?;
        }
        Commands::Tools => {
            cli::tools::tools_command(&config)?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}
