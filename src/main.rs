//! CLI entry point for galaxy-explorer

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "galaxy-explorer")]
#[command(author = "Eduardo Henrique")]
#[command(version)]
#[command(about = "A static blog generator backed by a headless CMS", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new blog
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Read content at this ref instead of the published one
        #[arg(long = "ref")]
        reference: Option<String>,
    },

    /// Start the development server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,
    },

    /// Clean the public folder
    Clean,

    /// List all posts
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "galaxy_explorer=debug,info"
    } else {
        "galaxy_explorer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Cannot determine current directory")?,
    };

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing blog in {:?}", target_dir);
            galaxy_explorer::commands::init::init_site(&target_dir)?;
            println!("Initialized blog in {:?}", target_dir);
        }

        Commands::Generate { reference } => {
            let blog = galaxy_explorer::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate(reference).await?;
            println!("Generated successfully!");
        }

        Commands::Server { port, ip } => {
            let blog = galaxy_explorer::Blog::new(&base_dir)?;

            // Generate first
            tracing::info!("Generating static files...");
            blog.generate(None).await?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            galaxy_explorer::server::start(&blog, &ip, port).await?;
        }

        Commands::Clean => {
            let blog = galaxy_explorer::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List => {
            let blog = galaxy_explorer::Blog::new(&base_dir)?;
            galaxy_explorer::commands::list::run(&blog).await?;
        }

        Commands::Version => {
            println!("galaxy-explorer version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
