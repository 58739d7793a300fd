use clap::Args;

pub mod commands;

#[derive(Args)]
pub struct InitArgs {
    /// URL of the content repository to clone (falls back to the
    /// `repository_url` configuration key)
    pub url: Option<String>,
}

#[derive(Args)]
pub struct UpdateArgs {}

#[derive(Args)]
pub struct ReindexArgs {}

#[derive(Args)]
pub struct RenderArgs {
    /// URL of the page to render
    pub url: String,
}
