use clap::{Parser, Subcommand};
use mdpages::cli;
use mdpages::config::AppConfig;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var("RUST_LOG", "debug");
        }
    }

    mdpages::init()?;

    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Init(args) => cli::commands::init(args, config),
        Commands::Update(args) => cli::commands::update(args, config),
        Commands::Reindex(args) => cli::commands::reindex(args, config),
        Commands::Render(args) => cli::commands::render(args, config),
    }
}

#[derive(Parser)]
#[command(name = "mdpages")]
#[command(about = "Git-synced Markdown wiki engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(short, long, default_value = "mdpages.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone the content repository and build the page index
    Init(cli::InitArgs),

    /// Pull upstream changes and re-index what changed
    Update(cli::UpdateArgs),

    /// Rebuild the page index from the content tree on disk
    Reindex(cli::ReindexArgs),

    /// Render one page to HTML on stdout
    Render(cli::RenderArgs),
}
