use super::*;
use crate::config::AppConfig;
use crate::core::sync::{SyncOutcome, Syncer};
use crate::core::IndexSummary;
use crate::render::Renderer;
use crate::store::PageStore;
use crate::vcs::Git;
use anyhow::{Context, Result};
use tracing::info;

pub fn init(args: InitArgs, config: AppConfig) -> Result<()> {
    let url = args
        .url
        .clone()
        .or_else(|| config.repository_url.clone())
        .context("No repository URL given; pass one or set `repository_url` in the config")?;

    info!(%url, "initializing content repository");
    let store = open_store(&config)?;
    let git = Git::new(&config.remote, &config.branch);
    let syncer = Syncer::new(&config, &store, &git);

    let (log, summary) = syncer.init(&url)?;
    print!("{}", log);
    print_summary(&summary);
    if summary.has_errors() {
        anyhow::bail!("Init completed with errors");
    }
    Ok(())
}

pub fn update(_args: UpdateArgs, config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let git = Git::new(&config.remote, &config.branch);
    let syncer = Syncer::new(&config, &store, &git);

    match syncer.update()? {
        SyncOutcome::NoContent => {
            println!(
                "No content directory at {:?}; run `mdpages init <url>` first",
                config.content_root()
            );
        }
        SyncOutcome::NoChanges { .. } => {
            println!("No changes detected");
        }
        SyncOutcome::Indexed { log, summary } => {
            print!("{}", log);
            print_summary(&summary);
            if summary.has_errors() {
                anyhow::bail!("Update completed with errors");
            }
        }
    }
    Ok(())
}

pub fn reindex(_args: ReindexArgs, config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let git = Git::new(&config.remote, &config.branch);
    let syncer = Syncer::new(&config, &store, &git);

    let summary = syncer.reindex()?;
    print_summary(&summary);
    if summary.has_errors() {
        anyhow::bail!("Reindex completed with errors");
    }
    Ok(())
}

pub fn render(args: RenderArgs, config: AppConfig) -> Result<()> {
    let store = open_store(&config)?;
    let renderer = Renderer::new(&config, &store);

    let (_, rendered) = renderer.render_page(&args.url)?;
    print!("{}", rendered.html);
    Ok(())
}

fn open_store(config: &AppConfig) -> Result<PageStore> {
    PageStore::open(&config.collection_root())
}

fn print_summary(summary: &IndexSummary) {
    println!(
        "Indexed: {}  Removed: {}  Skipped: {}",
        summary.indexed, summary.removed, summary.skipped
    );
    if !summary.errors.is_empty() {
        println!("Errors:");
        for (path, error) in &summary.errors {
            println!("  - {}: {}", path, error);
        }
    }
}
