//! Synchronized-state bridge for catpad notebooks.
//!
//! Projects a Loro-replicated notebook document into a local reactive store,
//! routes scoped mutations back into it, and composes the bridge with the
//! editor controller and derived state into a single editing surface.

pub mod bridge;
pub mod crdt;
pub mod reconcile;
pub mod session;

pub use bridge::SyncBridge;
pub use crdt::{DocHandle, LoroNotebookDoc, Mutation, SyncPacket};
pub use reconcile::reconcile;
pub use session::{standard_constructors, NotebookSession};

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber for bridge and session diagnostics.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
