use clap::{Parser, Subcommand};
use skiff::core::SkiffError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cli;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Deployment and self-update engine for desktop applications")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build full and delta packages from the artifacts directory
    Pack {
        /// Application id (must match skiff.yaml)
        #[arg(long)]
        app_id: String,
        /// Version to build (semver)
        #[arg(long)]
        version: String,
        /// Runtime identifier override (e.g. linux-x64)
        #[arg(long)]
        rid: Option<String>,
        /// Overwrite an already-built version
        #[arg(long)]
        force: bool,
        /// Artifacts directory (defaults to ./artifacts)
        #[arg(long)]
        artifacts_dir: Option<PathBuf>,
    },
    /// Push built packages to a channel's feed
    Push {
        /// Package artifacts to push
        packages: Vec<PathBuf>,
        /// Channel name (defaults to the descriptor's default channel)
        #[arg(short, long)]
        channel: Option<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Install a package into a root directory
    Install {
        /// Package artifact
        #[arg(long)]
        package: PathBuf,
        /// Installation root directory
        #[arg(long)]
        root: PathBuf,
    },
    /// Update an existing installation from a package
    Update {
        /// Package artifact (full or delta)
        #[arg(long)]
        package: PathBuf,
        /// Installation root directory
        #[arg(long)]
        root: PathBuf,
    },
    /// List releases in the packages directory
    Releases {
        /// Packages directory (defaults to ./packages)
        #[arg(long)]
        packages_dir: Option<PathBuf>,
    },
    /// Store a feed API key in the OS keychain
    Login {
        /// Name the key is stored under (referenced from skiff.yaml)
        #[arg(long)]
        feed: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), SkiffError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Pack {
            app_id,
            version,
            rid,
            force,
            artifacts_dir,
        } => cli::pack::run(app_id, version, rid, force, artifacts_dir).await,
        Commands::Push {
            packages,
            channel,
            yes,
        } => cli::push::run(packages, channel, yes).await,
        Commands::Install { package, root } => cli::install::run(package, root).await,
        Commands::Update { package, root } => cli::update::run(package, root).await,
        Commands::Releases { packages_dir } => cli::releases::run(packages_dir),
        Commands::Login { feed } => cli::login::run(feed),
    };

    if let Err(ref e) = result {
        eprintln!("\nError: {}", e);
    }

    result
}
