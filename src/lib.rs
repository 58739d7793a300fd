pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod render;
pub mod store;
pub mod vcs;

pub use error::Error;

pub fn init() -> anyhow::Result<()> {
    // Initialize global state if needed (e.g. logging)
    tracing_subscriber::fmt::init();
    Ok(())
}
